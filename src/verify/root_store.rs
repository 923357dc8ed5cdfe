//! Root-store verification: anchor membership and anchor-key signature
//! checks.

use crate::cert::Certificate;
use crate::error::Result;
use crate::trust::TrustAnchorStore;
use crate::verify::{CertificateVerifier, VerificationEvidence};

/// Accepts certificates that are trust anchors themselves or whose
/// signature validates under a generally-trusted anchor's key.
pub struct RootStoreVerifier<'a> {
    trusted: &'a TrustAnchorStore,
}

impl<'a> RootStoreVerifier<'a> {
    /// Verifier over the generally-trusted anchors of `trusted`.
    pub fn new(trusted: &'a TrustAnchorStore) -> Self {
        RootStoreVerifier { trusted }
    }
}

impl CertificateVerifier for RootStoreVerifier<'_> {
    fn name(&self) -> &'static str {
        "root-store"
    }

    fn verify(
        &self,
        cert: &Certificate,
        _issuer: Option<&Certificate>,
        _sign_date: i64,
    ) -> Result<Vec<VerificationEvidence>> {
        let mut evidence = Vec::new();

        if self.trusted.is_generally_trusted(cert) {
            evidence.push(VerificationEvidence::new(
                cert,
                self.name(),
                "certificate is a trust anchor".to_string(),
            ));
        }

        for anchor in self.trusted.general_anchors() {
            if cert.verify_signed_by(anchor).is_ok() {
                evidence.push(VerificationEvidence::new(
                    cert,
                    self.name(),
                    format!("signature validated by trust anchor '{}'", anchor.subject()),
                ));
                break;
            }
        }

        Ok(evidence)
    }
}
