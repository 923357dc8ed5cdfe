//! OCSP-based revocation checking, including responder validation.

use x509_parser::prelude::*;

use crate::cert::{normalize_serial, Certificate};
use crate::clients::{CrlClient, OcspClient};
use crate::error::{Error, Result};
use crate::ocsp::{generalized_time_secs, BasicOcspResponse, CertStatus, SingleResponse};
use crate::trust::{TrustAnchorStore, TrustScope};
use crate::verify::crl::crl_signature_valid;
use crate::verify::{CertificateVerifier, VerificationEvidence};

/// Checks certificates against locally supplied OCSP responses, falling
/// back to an online query when an [`OcspClient`] is available.
///
/// Responses are used only after responder validation: the response must be
/// signed by the issuer itself, by an embedded delegated responder with the
/// OCSP-signing extended key usage, or by an anchor trusted for OCSP
/// issuance. A delegated responder's own revocation status is checked
/// unless it carries id-pkix-ocsp-nocheck; when no revocation source is
/// available for it the response is skipped, never silently accepted.
pub struct OcspVerifier<'a> {
    trusted: &'a TrustAnchorStore,
    responses: Vec<Vec<u8>>,
    ocsp_client: Option<Box<dyn OcspClient + 'a>>,
    crl_client: Option<Box<dyn CrlClient + 'a>>,
}

impl<'a> OcspVerifier<'a> {
    /// Verifier over locally available DER `BasicOCSPResponse`s.
    pub fn new(trusted: &'a TrustAnchorStore, responses: Vec<Vec<u8>>) -> Self {
        OcspVerifier {
            trusted,
            responses,
            ocsp_client: None,
            crl_client: None,
        }
    }

    /// Allow online OCSP queries, both for the certificate under test and
    /// for delegated responder certificates.
    pub fn with_ocsp_client(mut self, client: Box<dyn OcspClient + 'a>) -> Self {
        self.ocsp_client = Some(client);
        self
    }

    /// Allow CRL fallback when checking a delegated responder's own
    /// revocation.
    pub fn with_crl_client(mut self, client: Box<dyn CrlClient + 'a>) -> Self {
        self.crl_client = Some(client);
        self
    }

    /// Apply one response to `cert`. `None` when the response does not
    /// apply or cannot be validated; `Error::CertificateRevoked` on a
    /// definitive revoked status effective at `sign_date`.
    fn check_response(
        &self,
        response_der: &[u8],
        cert: &Certificate,
        issuer: &Certificate,
        sign_date: i64,
    ) -> Result<Option<VerificationEvidence>> {
        let response = match BasicOcspResponse::parse(response_der) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("skipping unparseable OCSP response: {}", e);
                return Ok(None);
            },
        };

        let single = match response.find_response(cert, issuer) {
            Ok(Some(single)) => single,
            Ok(None) => return Ok(None),
            Err(e) => {
                log::warn!("skipping OCSP response with undecodable data: {}", e);
                return Ok(None);
            },
        };

        if let Some(next_update) = &single.next_update {
            if sign_date > generalized_time_secs(next_update) {
                log::debug!(
                    "OCSP response for '{}' expired before sign date",
                    cert.subject()
                );
                return Ok(None);
            }
        }

        if !self.responder_validated(&response, issuer, sign_date) {
            log::warn!(
                "OCSP response for '{}' skipped: responder could not be validated",
                cert.subject()
            );
            return Ok(None);
        }

        self.interpret_status(&single, cert, sign_date)
    }

    fn interpret_status(
        &self,
        single: &SingleResponse,
        cert: &Certificate,
        sign_date: i64,
    ) -> Result<Option<VerificationEvidence>> {
        match &single.cert_status {
            CertStatus::Good(_) => Ok(Some(VerificationEvidence::new(
                cert,
                self.name(),
                "valid OCSP response, status good".to_string(),
            ))),
            CertStatus::Revoked(info) => {
                let revocation_time = generalized_time_secs(&info.revocation_time);
                if sign_date < revocation_time {
                    // Signed before the revocation took effect.
                    Ok(Some(VerificationEvidence::new(
                        cert,
                        self.name(),
                        format!("OCSP reports revocation at {}, after signing", revocation_time),
                    )))
                } else {
                    Err(Error::CertificateRevoked {
                        subject: cert.subject().to_string(),
                        detail: format!("OCSP revoked status effective {}", revocation_time),
                    })
                }
            },
            CertStatus::Unknown(_) => {
                log::debug!("OCSP responder does not know '{}'", cert.subject());
                Ok(None)
            },
        }
    }

    /// Establish who signed the response and whether that signer may be
    /// relied on.
    fn responder_validated(
        &self,
        response: &BasicOcspResponse,
        issuer: &Certificate,
        sign_date: i64,
    ) -> bool {
        // The CA answered for its own certificates, or an anchor trusted
        // for OCSP response signing did.
        if self.signed_by_issuer_or_anchor(response, issuer) {
            return true;
        }

        // A delegated responder: must verify the response, carry the
        // OCSP-signing EKU, be issued by the same CA, be within its
        // validity window, and not itself be revoked.
        for responder in response.embedded_certificates() {
            if response.verify_signed_by(&responder).is_err() {
                continue;
            }
            if !responder.has_ocsp_signing_eku() {
                log::warn!(
                    "embedded responder '{}' lacks the OCSP-signing EKU",
                    responder.subject()
                );
                continue;
            }
            if responder.verify_signed_by(issuer).is_err()
                && !self.trusted.is_trusted(&responder, TrustScope::OcspIssuance)
            {
                log::warn!(
                    "embedded responder '{}' is neither issued by the CA nor trusted",
                    responder.subject()
                );
                continue;
            }
            if !responder.valid_at(sign_date) {
                log::warn!(
                    "embedded responder '{}' was not valid at the signing date",
                    responder.subject()
                );
                continue;
            }
            if self.responder_not_revoked(&responder, issuer, sign_date) {
                return true;
            }
        }
        false
    }

    /// Whether `response` is signed by `issuer` itself or by an anchor
    /// trusted for OCSP response signing.
    fn signed_by_issuer_or_anchor(
        &self,
        response: &BasicOcspResponse,
        issuer: &Certificate,
    ) -> bool {
        if response.verify_signed_by(issuer).is_ok() {
            return true;
        }
        self.trusted.all_anchors().any(|anchor| {
            (self.trusted.is_trusted(anchor, TrustScope::OcspIssuance)
                || self.trusted.is_generally_trusted(anchor))
                && response.verify_signed_by(anchor).is_ok()
        })
    }

    /// Check a delegated responder's own revocation. Fail closed: when no
    /// source can vouch for the responder, it is not used. Fetched material
    /// gets the same authentication as the top-level paths: a nested OCSP
    /// response must be signed by the CA or an OCSP-trusted anchor, a
    /// fetched CRL by the CA or a CRL-trusted anchor.
    fn responder_not_revoked(
        &self,
        responder: &Certificate,
        issuer: &Certificate,
        sign_date: i64,
    ) -> bool {
        if responder.has_ocsp_nocheck() {
            return true;
        }

        if let Some(client) = &self.ocsp_client {
            for url in responder.aia_ocsp_urls() {
                let bytes = match client.fetch_ocsp(responder, issuer, url) {
                    Some(bytes) if !bytes.is_empty() => bytes,
                    _ => continue,
                };
                let response = match BasicOcspResponse::parse(&bytes) {
                    Ok(r) => r,
                    Err(_) => continue,
                };
                // Embedded responders are not recursed into here; only the
                // CA or an anchor may vouch for a responder.
                if !self.signed_by_issuer_or_anchor(&response, issuer) {
                    log::warn!(
                        "nested OCSP response for responder '{}' failed signature validation",
                        responder.subject()
                    );
                    continue;
                }
                if let Ok(Some(single)) = response.find_response(responder, issuer) {
                    return matches!(single.cert_status, CertStatus::Good(_));
                }
            }
        }

        if let Some(client) = &self.crl_client {
            for url in responder.crl_distribution_point_urls() {
                let bytes = match client.fetch_crl(responder, url) {
                    Some(bytes) if !bytes.is_empty() => bytes,
                    _ => continue,
                };
                if !crl_signature_valid(&bytes, Some(issuer), self.trusted) {
                    log::warn!(
                        "CRL for responder '{}' failed signature validation",
                        responder.subject()
                    );
                    continue;
                }
                if let Some(listed) = crl_lists_certificate(&bytes, responder, sign_date) {
                    return !listed;
                }
            }
        }

        log::warn!(
            "no revocation source available for OCSP responder '{}', failing closed",
            responder.subject()
        );
        false
    }
}

/// Whether the CRL (if parseable, issued for `cert`'s issuer, and covering
/// `sign_date`) lists `cert` as revoked at `sign_date`. `None` when the CRL
/// does not apply. Signature validation is the caller's responsibility.
fn crl_lists_certificate(crl_der: &[u8], cert: &Certificate, sign_date: i64) -> Option<bool> {
    let (_, crl) = CertificateRevocationList::from_der(crl_der).ok()?;
    if crl.issuer().to_string() != cert.issuer() {
        return None;
    }
    let next_update = crl.next_update()?.timestamp();
    if sign_date < crl.last_update().timestamp() || sign_date >= next_update {
        return None;
    }
    let listed = crl.iter_revoked_certificates().any(|revoked| {
        normalize_serial(revoked.raw_serial()) == cert.serial()
            && revoked.revocation_date.timestamp() <= sign_date
    });
    Some(listed)
}

impl CertificateVerifier for OcspVerifier<'_> {
    fn name(&self) -> &'static str {
        "ocsp"
    }

    fn verify(
        &self,
        cert: &Certificate,
        issuer: Option<&Certificate>,
        sign_date: i64,
    ) -> Result<Vec<VerificationEvidence>> {
        // The CertID hashes are computed over issuer fields; without an
        // issuer no response can be matched.
        let issuer = match issuer {
            Some(issuer) => issuer,
            None => return Ok(Vec::new()),
        };

        let mut evidence = Vec::new();

        for response_der in &self.responses {
            if let Some(found) = self.check_response(response_der, cert, issuer, sign_date)? {
                evidence.push(found);
            }
        }

        if evidence.is_empty() {
            if let Some(client) = &self.ocsp_client {
                for url in cert.aia_ocsp_urls() {
                    let fetched = match client.fetch_ocsp(cert, issuer, url) {
                        Some(bytes) if !bytes.is_empty() => bytes,
                        _ => continue,
                    };
                    if let Some(found) = self.check_response(&fetched, cert, issuer, sign_date)? {
                        evidence.push(found);
                    }
                    break;
                }
            }
        }

        Ok(evidence)
    }
}
