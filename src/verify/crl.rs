//! CRL-based revocation checking.

use der::{Decode, Encode};
use x509_parser::prelude::*;

use crate::cert::{normalize_serial, Certificate};
use crate::clients::CrlClient;
use crate::crypto::{self, RawSigned};
use crate::error::{Error, Result};
use crate::trust::{TrustAnchorStore, TrustScope};
use crate::verify::{CertificateVerifier, VerificationEvidence};

/// Checks certificates against locally supplied CRLs, falling back to a
/// single online fetch from the certificate's CRL distribution point when
/// a [`CrlClient`] is available.
pub struct CrlVerifier<'a> {
    trusted: &'a TrustAnchorStore,
    crls: Vec<Vec<u8>>,
    client: Option<Box<dyn CrlClient + 'a>>,
}

impl<'a> CrlVerifier<'a> {
    /// Verifier over locally available DER CRLs.
    pub fn new(trusted: &'a TrustAnchorStore, crls: Vec<Vec<u8>>) -> Self {
        CrlVerifier {
            trusted,
            crls,
            client: None,
        }
    }

    /// Allow one online CRL fetch per certificate when no local CRL
    /// applies.
    pub fn with_client(mut self, client: Box<dyn CrlClient + 'a>) -> Self {
        self.client = Some(client);
        self
    }

    /// Apply one CRL to `cert`. Returns evidence if the CRL is applicable
    /// and validated, `None` if it does not apply, and
    /// `Error::CertificateRevoked` if it lists `cert` with a revocation
    /// date at or before `sign_date`.
    fn check_crl(
        &self,
        crl_der: &[u8],
        cert: &Certificate,
        issuer: Option<&Certificate>,
        sign_date: i64,
    ) -> Result<Option<VerificationEvidence>> {
        let (_, crl) = match CertificateRevocationList::from_der(crl_der) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("skipping unparseable CRL: {}", e);
                return Ok(None);
            },
        };

        if crl.issuer().to_string() != cert.issuer() {
            return Ok(None);
        }

        let this_update = crl.last_update().timestamp();
        let next_update = match crl.next_update() {
            Some(t) => t.timestamp(),
            None => {
                log::debug!("CRL from '{}' has no nextUpdate, skipping", cert.issuer());
                return Ok(None);
            },
        };
        if sign_date < this_update || sign_date >= next_update {
            log::debug!(
                "CRL window [{}, {}) does not cover sign date {}",
                this_update,
                next_update,
                sign_date
            );
            return Ok(None);
        }

        if !crl_signature_valid(crl_der, issuer, self.trusted) {
            log::warn!("CRL from '{}' failed signature validation", cert.issuer());
            return Ok(None);
        }

        for revoked in crl.iter_revoked_certificates() {
            if normalize_serial(revoked.raw_serial()) != cert.serial() {
                continue;
            }
            let revocation_date = revoked.revocation_date.timestamp();
            if revocation_date <= sign_date {
                return Err(Error::CertificateRevoked {
                    subject: cert.subject().to_string(),
                    detail: format!("listed on CRL with revocation date {}", revocation_date),
                });
            }
            // Revoked after the signing date: the signature itself was
            // made while the certificate was still good.
            log::debug!(
                "'{}' revoked at {} but signed at {}",
                cert.subject(),
                revocation_date,
                sign_date
            );
        }

        Ok(Some(VerificationEvidence::new(
            cert,
            self.name(),
            format!("valid CRL found, not listing '{}'", cert.subject()),
        )))
    }
}

/// Validate a CRL signature against the supplied issuer, then against any
/// anchor trusted for CRL issuance. Shared with the OCSP verifier's
/// delegated-responder revocation check.
pub(crate) fn crl_signature_valid(
    crl_der: &[u8],
    issuer: Option<&Certificate>,
    trusted: &TrustAnchorStore,
) -> bool {
    let raw = match RawSigned::from_der(crl_der) {
        Ok(raw) => raw,
        Err(_) => return false,
    };
    let tbs = match raw.tbs.to_der() {
        Ok(tbs) => tbs,
        Err(_) => return false,
    };
    let signature = match raw.signature.as_bytes() {
        Some(bytes) => bytes,
        None => return false,
    };

    let verifies = |candidate: &Certificate| {
        crypto::verify_signature(
            candidate.spki_der(),
            &raw.signature_algorithm,
            None,
            &tbs,
            signature,
        )
        .is_ok()
    };

    if let Some(issuer) = issuer {
        if verifies(issuer) {
            return true;
        }
    }
    trusted.all_anchors().any(|anchor| {
        (trusted.is_trusted(anchor, TrustScope::CrlIssuance)
            || trusted.is_generally_trusted(anchor))
            && verifies(anchor)
    })
}

impl CertificateVerifier for CrlVerifier<'_> {
    fn name(&self) -> &'static str {
        "crl"
    }

    fn verify(
        &self,
        cert: &Certificate,
        issuer: Option<&Certificate>,
        sign_date: i64,
    ) -> Result<Vec<VerificationEvidence>> {
        let mut evidence = Vec::new();

        for crl_der in &self.crls {
            if let Some(found) = self.check_crl(crl_der, cert, issuer, sign_date)? {
                evidence.push(found);
            }
        }

        if evidence.is_empty() {
            if let Some(client) = &self.client {
                for url in cert.crl_distribution_point_urls() {
                    let fetched = match client.fetch_crl(cert, url) {
                        Some(bytes) if !bytes.is_empty() => bytes,
                        _ => continue,
                    };
                    if let Some(found) = self.check_crl(&fetched, cert, issuer, sign_date)? {
                        evidence.push(found);
                    }
                    // One online attempt per certificate.
                    break;
                }
            }
        }

        Ok(evidence)
    }
}
