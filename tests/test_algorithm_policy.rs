//! Algorithm-policy enforcement on the signing path: RSASSA-PSS parameter
//! consistency and the EdDSA digest requirements.

mod common;

use common::{issue, self_signed_ca};
use der::Encode;
use pdf_ltv::cms::CmsSigner;
use pdf_ltv::digest::DigestAlgorithm;
use pdf_ltv::{oid, CertificateChain, Error};

fn test_chain() -> CertificateChain {
    let ca = self_signed_ca("Policy CA");
    let leaf = issue(&ca, "Policy Signer", &[0x60]);
    vec![leaf.cert, ca.cert]
}

fn pss_params_for_sha384() -> Vec<u8> {
    pkcs1::RsaPssParams::new::<sha2::Sha384>(48)
        .to_der()
        .expect("PSS params encoding")
}

#[test]
fn test_pss_digest_mismatch_fails_before_signing() {
    // Outer digest SHA-256, PSS parameters say SHA-384: rejected up front,
    // no signature is ever requested.
    let err = CmsSigner::new(test_chain(), DigestAlgorithm::Sha256, oid::RSASSA_PSS)
        .with_mechanism_params(pss_params_for_sha384())
        .build_signed_attributes(&[0u8; 32])
        .unwrap_err();
    assert!(matches!(err, Error::AlgorithmMismatch { .. }));
}

#[test]
fn test_pss_matching_params_are_accepted() {
    let phase = CmsSigner::new(test_chain(), DigestAlgorithm::Sha384, oid::RSASSA_PSS)
        .with_mechanism_params(pss_params_for_sha384())
        .build_signed_attributes(&[0u8; 48])
        .expect("consistent PSS configuration");
    assert!(!phase.signed_attributes_der().is_empty());
}

#[test]
fn test_pss_without_params_is_rejected() {
    let err = CmsSigner::new(test_chain(), DigestAlgorithm::Sha256, oid::RSASSA_PSS)
        .build_signed_attributes(&[0u8; 32])
        .unwrap_err();
    assert!(matches!(err, Error::AlgorithmMismatch { .. }));
}

#[test]
fn test_ed25519_demands_sha512() {
    let err = CmsSigner::new(test_chain(), DigestAlgorithm::Sha256, oid::ED25519)
        .build_signed_attributes(&[0u8; 32])
        .unwrap_err();
    assert!(matches!(err, Error::AlgorithmMismatch { .. }));

    CmsSigner::new(test_chain(), DigestAlgorithm::Sha512, oid::ED25519)
        .build_signed_attributes(&[0u8; 64])
        .expect("Ed25519 with SHA-512 is the valid combination");
}

#[test]
fn test_ed448_signing_is_unsupported() {
    let err = CmsSigner::new(test_chain(), DigestAlgorithm::Sha512, oid::ED448)
        .build_signed_attributes(&[0u8; 64])
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedAlgorithm(_)));
}
