//! OCSP verifier behavior: CertID matching by recomputed issuer hashes,
//! responder validation, and revocation-date precedence.

mod common;

use common::{
    build_crl, build_identity, build_ocsp_response, build_ocsp_response_with_certs, issue,
    self_signed_ca, CertSpec, TestIdentity, NOW,
};
use der::asn1::Null;
use pdf_ltv::clients::{CrlClient, OcspClient};
use pdf_ltv::ocsp::{CertStatus, RevokedInfo};
use pdf_ltv::verify::{CertificateVerifier, OcspVerifier};
use pdf_ltv::{Certificate, Error, TrustAnchorStore, TrustScope};

/// Serves one canned CRL regardless of certificate or URL.
struct StubCrl {
    bytes: Vec<u8>,
}

impl CrlClient for StubCrl {
    fn fetch_crl(&self, _cert: &Certificate, _url: &str) -> Option<Vec<u8>> {
        Some(self.bytes.clone())
    }
}

/// Serves one canned OCSP response regardless of certificate or URL.
struct StubOcsp {
    bytes: Vec<u8>,
}

impl OcspClient for StubOcsp {
    fn fetch_ocsp(
        &self,
        _cert: &Certificate,
        _issuer: &Certificate,
        _url: &str,
    ) -> Option<Vec<u8>> {
        Some(self.bytes.clone())
    }
}

/// A delegated responder issued by `ca`: OCSP-signing EKU, no
/// id-pkix-ocsp-nocheck, so its own revocation must be checked.
fn delegated_responder(
    ca: &TestIdentity,
    serial: &[u8],
    aia_ocsp: Option<&str>,
    crl_dp: Option<&str>,
) -> TestIdentity {
    build_identity(
        CertSpec {
            subject_cn: "Delegated Responder",
            serial,
            is_ca: false,
            aia_ca_issuers: None,
            aia_ocsp,
            crl_dp,
            eku_ocsp_signing: true,
        },
        Some(ca),
    )
}

#[test]
fn test_good_status_yields_evidence() {
    let ca = self_signed_ca("OCSP CA");
    let leaf = issue(&ca, "OCSP Leaf", &[0x40]);
    let response = build_ocsp_response(
        &ca,
        &leaf.cert,
        &ca.cert,
        CertStatus::Good(Null),
        NOW - 600,
        Some(NOW + 3600),
    );

    let trusted = TrustAnchorStore::new();
    let verifier = OcspVerifier::new(&trusted, vec![response]);
    let evidence = verifier
        .verify(&leaf.cert, Some(&ca.cert), NOW)
        .expect("verification");
    assert_eq!(evidence.len(), 1);
    assert_eq!(evidence[0].verifier, "ocsp");
}

#[test]
fn test_response_for_other_issuer_does_not_match() {
    // Same serial number, different issuer: the recomputed CertID hashes
    // must not match.
    let ca = self_signed_ca("Hash CA");
    let other_ca = self_signed_ca("Other Hash CA");
    let leaf = issue(&ca, "Hash Leaf", &[0x41]);
    let other_leaf = issue(&other_ca, "Other Hash Leaf", &[0x41]);

    let response = build_ocsp_response(
        &other_ca,
        &other_leaf.cert,
        &other_ca.cert,
        CertStatus::Good(Null),
        NOW - 600,
        Some(NOW + 3600),
    );

    let trusted = TrustAnchorStore::new();
    let verifier = OcspVerifier::new(&trusted, vec![response]);
    let evidence = verifier
        .verify(&leaf.cert, Some(&ca.cert), NOW)
        .expect("verification");
    assert!(evidence.is_empty());
}

#[test]
fn test_revoked_before_signing_is_a_hard_failure() {
    let ca = self_signed_ca("Revoking OCSP CA");
    let leaf = issue(&ca, "Revoked OCSP Leaf", &[0x42]);
    let response = build_ocsp_response(
        &ca,
        &leaf.cert,
        &ca.cert,
        CertStatus::Revoked(RevokedInfo {
            revocation_time: common::gt(NOW - 1000),
            revocation_reason: None,
        }),
        NOW - 600,
        Some(NOW + 3600),
    );

    let trusted = TrustAnchorStore::new();
    let verifier = OcspVerifier::new(&trusted, vec![response]);
    let err = verifier.verify(&leaf.cert, Some(&ca.cert), NOW).unwrap_err();
    assert!(matches!(err, Error::CertificateRevoked { .. }));
}

#[test]
fn test_revoked_after_signing_still_counts_as_evidence() {
    let ca = self_signed_ca("Late OCSP CA");
    let leaf = issue(&ca, "Late OCSP Leaf", &[0x43]);
    let response = build_ocsp_response(
        &ca,
        &leaf.cert,
        &ca.cert,
        CertStatus::Revoked(RevokedInfo {
            revocation_time: common::gt(NOW + 1000),
            revocation_reason: None,
        }),
        NOW - 600,
        Some(NOW + 3600),
    );

    let trusted = TrustAnchorStore::new();
    let verifier = OcspVerifier::new(&trusted, vec![response]);
    let evidence = verifier
        .verify(&leaf.cert, Some(&ca.cert), NOW)
        .expect("verification");
    assert_eq!(evidence.len(), 1);
}

#[test]
fn test_unknown_status_is_no_evidence() {
    let ca = self_signed_ca("Unknown OCSP CA");
    let leaf = issue(&ca, "Unknown OCSP Leaf", &[0x44]);
    let response = build_ocsp_response(
        &ca,
        &leaf.cert,
        &ca.cert,
        CertStatus::Unknown(Null),
        NOW - 600,
        Some(NOW + 3600),
    );

    let trusted = TrustAnchorStore::new();
    let verifier = OcspVerifier::new(&trusted, vec![response]);
    let evidence = verifier
        .verify(&leaf.cert, Some(&ca.cert), NOW)
        .expect("verification");
    assert!(evidence.is_empty());
}

#[test]
fn test_expired_response_is_skipped() {
    let ca = self_signed_ca("Expired OCSP CA");
    let leaf = issue(&ca, "Expired OCSP Leaf", &[0x45]);
    let response = build_ocsp_response(
        &ca,
        &leaf.cert,
        &ca.cert,
        CertStatus::Good(Null),
        NOW - 7200,
        Some(NOW - 3600),
    );

    let trusted = TrustAnchorStore::new();
    let verifier = OcspVerifier::new(&trusted, vec![response]);
    let evidence = verifier
        .verify(&leaf.cert, Some(&ca.cert), NOW)
        .expect("verification");
    assert!(evidence.is_empty());
}

#[test]
fn test_response_signed_by_untrusted_third_party_is_skipped() {
    let ca = self_signed_ca("Strict OCSP CA");
    let leaf = issue(&ca, "Strict OCSP Leaf", &[0x46]);
    let stranger = self_signed_ca("Stranger");
    let response = build_ocsp_response(
        &stranger,
        &leaf.cert,
        &ca.cert,
        CertStatus::Good(Null),
        NOW - 600,
        Some(NOW + 3600),
    );

    let trusted = TrustAnchorStore::new();
    let verifier = OcspVerifier::new(&trusted, vec![response]);
    let evidence = verifier
        .verify(&leaf.cert, Some(&ca.cert), NOW)
        .expect("verification");
    assert!(evidence.is_empty(), "responder validation must fail closed");
}

#[test]
fn test_anchor_trusted_for_ocsp_issuance_validates_response() {
    let ca = self_signed_ca("Delegating CA");
    let leaf = issue(&ca, "Delegated Leaf", &[0x47]);
    let responder = self_signed_ca("Central Responder");
    let response = build_ocsp_response(
        &responder,
        &leaf.cert,
        &ca.cert,
        CertStatus::Good(Null),
        NOW - 600,
        Some(NOW + 3600),
    );

    let mut trusted = TrustAnchorStore::new();
    trusted.add(responder.cert.clone(), TrustScope::OcspIssuance);

    let verifier = OcspVerifier::new(&trusted, vec![response]);
    let evidence = verifier
        .verify(&leaf.cert, Some(&ca.cert), NOW)
        .expect("verification");
    assert_eq!(evidence.len(), 1);
}

#[test]
fn test_forged_crl_does_not_clear_a_delegated_responder() {
    // The response is signed by a delegated responder whose revocation is
    // checked through its CRL distribution point. The served CRL carries
    // the CA's name but a stranger's signature; it must not be believed.
    let ca = self_signed_ca("Delegating CRL CA");
    let leaf = issue(&ca, "Delegated CRL Leaf", &[0x49]);
    let responder = delegated_responder(
        &ca,
        &[0x4A],
        None,
        Some("http://example.test/responder.crl"),
    );
    let response = build_ocsp_response_with_certs(
        &responder,
        &leaf.cert,
        &ca.cert,
        CertStatus::Good(Null),
        NOW - 600,
        Some(NOW + 3600),
        &[&responder.cert],
    );

    let forger = self_signed_ca("Delegating CRL CA");
    let forged_crl = build_crl(&forger, &[], NOW - 3600, NOW + 3600);

    let trusted = TrustAnchorStore::new();
    let verifier = OcspVerifier::new(&trusted, vec![response])
        .with_crl_client(Box::new(StubCrl { bytes: forged_crl }));
    let evidence = verifier
        .verify(&leaf.cert, Some(&ca.cert), NOW)
        .expect("verification");
    assert!(
        evidence.is_empty(),
        "an unauthenticated CRL must not clear the responder"
    );
}

#[test]
fn test_ca_signed_crl_clears_a_delegated_responder() {
    let ca = self_signed_ca("Delegating CRL CA");
    let leaf = issue(&ca, "Delegated CRL Leaf", &[0x4B]);
    let responder = delegated_responder(
        &ca,
        &[0x4C],
        None,
        Some("http://example.test/responder.crl"),
    );
    let response = build_ocsp_response_with_certs(
        &responder,
        &leaf.cert,
        &ca.cert,
        CertStatus::Good(Null),
        NOW - 600,
        Some(NOW + 3600),
        &[&responder.cert],
    );
    let crl = build_crl(&ca, &[], NOW - 3600, NOW + 3600);

    let trusted = TrustAnchorStore::new();
    let verifier = OcspVerifier::new(&trusted, vec![response])
        .with_crl_client(Box::new(StubCrl { bytes: crl }));
    let evidence = verifier
        .verify(&leaf.cert, Some(&ca.cert), NOW)
        .expect("verification");
    assert_eq!(evidence.len(), 1);
}

#[test]
fn test_forged_nested_response_does_not_clear_a_delegated_responder() {
    // The responder's own status is queried over OCSP; the answer comes
    // back signed by a stranger and must not be believed.
    let ca = self_signed_ca("Delegating Nested CA");
    let leaf = issue(&ca, "Delegated Nested Leaf", &[0x4D]);
    let responder = delegated_responder(
        &ca,
        &[0x4E],
        Some("http://example.test/responder-ocsp"),
        None,
    );
    let response = build_ocsp_response_with_certs(
        &responder,
        &leaf.cert,
        &ca.cert,
        CertStatus::Good(Null),
        NOW - 600,
        Some(NOW + 3600),
        &[&responder.cert],
    );

    let stranger = self_signed_ca("Meddler");
    let forged_nested = build_ocsp_response(
        &stranger,
        &responder.cert,
        &ca.cert,
        CertStatus::Good(Null),
        NOW - 600,
        Some(NOW + 3600),
    );

    let trusted = TrustAnchorStore::new();
    let verifier = OcspVerifier::new(&trusted, vec![response])
        .with_ocsp_client(Box::new(StubOcsp {
            bytes: forged_nested,
        }));
    let evidence = verifier
        .verify(&leaf.cert, Some(&ca.cert), NOW)
        .expect("verification");
    assert!(
        evidence.is_empty(),
        "an unauthenticated nested response must not clear the responder"
    );
}

#[test]
fn test_ca_signed_nested_response_clears_a_delegated_responder() {
    let ca = self_signed_ca("Delegating Nested CA");
    let leaf = issue(&ca, "Delegated Nested Leaf", &[0x4F]);
    let responder = delegated_responder(
        &ca,
        &[0x50],
        Some("http://example.test/responder-ocsp"),
        None,
    );
    let response = build_ocsp_response_with_certs(
        &responder,
        &leaf.cert,
        &ca.cert,
        CertStatus::Good(Null),
        NOW - 600,
        Some(NOW + 3600),
        &[&responder.cert],
    );
    let nested = build_ocsp_response(
        &ca,
        &responder.cert,
        &ca.cert,
        CertStatus::Good(Null),
        NOW - 600,
        Some(NOW + 3600),
    );

    let trusted = TrustAnchorStore::new();
    let verifier = OcspVerifier::new(&trusted, vec![response])
        .with_ocsp_client(Box::new(StubOcsp { bytes: nested }));
    let evidence = verifier
        .verify(&leaf.cert, Some(&ca.cert), NOW)
        .expect("verification");
    assert_eq!(evidence.len(), 1);
}

#[test]
fn test_no_issuer_means_no_evidence() {
    let ca = self_signed_ca("Issuerless CA");
    let leaf = issue(&ca, "Issuerless Leaf", &[0x48]);
    let response = build_ocsp_response(
        &ca,
        &leaf.cert,
        &ca.cert,
        CertStatus::Good(Null),
        NOW - 600,
        Some(NOW + 3600),
    );

    let trusted = TrustAnchorStore::new();
    let verifier = OcspVerifier::new(&trusted, vec![response]);
    let evidence = verifier.verify(&leaf.cert, None, NOW).expect("verification");
    assert!(evidence.is_empty(), "CertID hashes need the issuer");
}
