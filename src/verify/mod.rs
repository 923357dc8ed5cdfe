//! Certificate verification pipeline.
//!
//! Verifiers implement [`CertificateVerifier`] and are run in order by a
//! [`VerifierPipeline`]. Each verifier reports the positive evidence it
//! found for a certificate at the claimed signing date; "I cannot tell" is
//! an empty list, never an error. The only hard failure is an explicit
//! revocation finding, which aborts the whole chain walk.
//!
//! The usual pipeline is root store, then CRL, then OCSP, each checking
//! local material before going online.

mod crl;
mod ocsp;
mod root_store;

pub use crl::CrlVerifier;
pub use ocsp::OcspVerifier;
pub use root_store::RootStoreVerifier;

use crate::cert::Certificate;
use crate::error::Result;

/// One piece of positive evidence about a certificate's validity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationEvidence {
    /// Subject of the certificate the evidence is about.
    pub subject: String,
    /// Which verifier produced the evidence.
    pub verifier: &'static str,
    /// Human-readable description of what was established.
    pub message: String,
}

impl VerificationEvidence {
    pub(crate) fn new(cert: &Certificate, verifier: &'static str, message: String) -> Self {
        VerificationEvidence {
            subject: cert.subject().to_string(),
            verifier,
            message,
        }
    }
}

/// A single verification strategy (root store membership, CRL, OCSP).
pub trait CertificateVerifier {
    /// Short name used in evidence and log lines.
    fn name(&self) -> &'static str;

    /// Check `cert` (issued by `issuer`, when known) at `sign_date`
    /// (unix seconds).
    ///
    /// Returns the positive evidence found; an empty list means this
    /// verifier has nothing to say and the pipeline moves on. A definitive
    /// revocation finding returns [`Error::CertificateRevoked`] and aborts
    /// verification.
    ///
    /// [`Error::CertificateRevoked`]: crate::error::Error::CertificateRevoked
    fn verify(
        &self,
        cert: &Certificate,
        issuer: Option<&Certificate>,
        sign_date: i64,
    ) -> Result<Vec<VerificationEvidence>>;
}

/// Verification outcome for one certificate of a chain.
#[derive(Debug, Clone)]
pub struct CertificateVerification {
    /// Subject of the verified certificate.
    pub subject: String,
    /// Evidence gathered across all verifiers. Empty means nothing could
    /// be established; the caller decides whether that is acceptable.
    pub evidence: Vec<VerificationEvidence>,
}

/// Ordered list of verifiers, run in sequence for every certificate.
#[derive(Default)]
pub struct VerifierPipeline<'a> {
    verifiers: Vec<Box<dyn CertificateVerifier + 'a>>,
}

impl<'a> VerifierPipeline<'a> {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        VerifierPipeline {
            verifiers: Vec::new(),
        }
    }

    /// Append a verifier; verifiers run in insertion order.
    pub fn push(&mut self, verifier: Box<dyn CertificateVerifier + 'a>) {
        self.verifiers.push(verifier);
    }

    /// Run every verifier against one certificate, accumulating evidence.
    pub fn verify_certificate(
        &self,
        cert: &Certificate,
        issuer: Option<&Certificate>,
        sign_date: i64,
    ) -> Result<Vec<VerificationEvidence>> {
        let mut evidence = Vec::new();
        for verifier in &self.verifiers {
            log::debug!(
                "running {} for '{}' at {}",
                verifier.name(),
                cert.subject(),
                sign_date
            );
            evidence.extend(verifier.verify(cert, issuer, sign_date)?);
        }
        Ok(evidence)
    }

    /// Verify a whole chain (leaf first) at `sign_date`.
    ///
    /// Each certificate is checked with its in-chain issuer as context. A
    /// successful signature check against that issuer, for a certificate
    /// whose validity window covers `sign_date`, is recorded as baseline
    /// evidence in addition to whatever the verifiers find. The first
    /// revocation finding aborts the walk.
    pub fn walk_chain(
        &self,
        chain: &[Certificate],
        sign_date: i64,
    ) -> Result<Vec<CertificateVerification>> {
        let mut results = Vec::with_capacity(chain.len());
        for (i, cert) in chain.iter().enumerate() {
            let issuer = chain.get(i + 1);
            let mut evidence = self.verify_certificate(cert, issuer, sign_date)?;

            if !cert.valid_at(sign_date) {
                log::debug!(
                    "'{}' outside its validity window at {}",
                    cert.subject(),
                    sign_date
                );
            } else if let Some(issuer) = issuer {
                if cert.verify_signed_by(issuer).is_ok() {
                    evidence.push(VerificationEvidence::new(
                        cert,
                        "chain",
                        format!("signature validated by chain issuer '{}'", issuer.subject()),
                    ));
                }
            }

            results.push(CertificateVerification {
                subject: cert.subject().to_string(),
                evidence,
            });
        }
        Ok(results)
    }
}
