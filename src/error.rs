//! Error types for the signature and validation library.
//!
//! The taxonomy distinguishes hard failures (revocation findings, malformed
//! CMS structures, algorithm-consistency violations) from conditions that are
//! absorbed by the caller. Soft conditions never surface here: a failed CRL
//! download or an unverifiable anchor is logged and treated as "no evidence".

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during signing and verification.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A CRL or OCSP source definitively reported the certificate revoked
    /// as of the verification date. Aborts the whole chain walk.
    #[error("Certificate '{subject}' has been revoked: {detail}")]
    CertificateRevoked {
        /// Subject name of the revoked certificate
        subject: String,
        /// Which source reported the revocation and when
        detail: String,
    },

    /// The CMS certificate set does not contain the signing certificate
    /// referenced by the SignerInfo issuer+serial.
    #[error("Signing certificate not found in the CMS certificate set")]
    SigningCertificateNotFound,

    /// Structurally invalid CMS/PKCS#7 data
    #[error("Malformed CMS structure: {0}")]
    MalformedCms(String),

    /// Multi-signer CMS containers are rejected on parse
    #[error("Unsupported CMS structure: expected exactly 1 SignerInfo, found {0}")]
    MultipleSignerInfos(usize),

    /// A CAdES structural requirement was violated (missing or mismatched
    /// ESS signing-certificate attribute)
    #[error("CAdES requirement violated: {0}")]
    CadesViolation(String),

    /// Digest/signature algorithm combination violates a consistency rule
    /// (Ed25519 requires SHA-512, Ed448 requires SHAKE-256, RSASSA-PSS
    /// parameters must agree with the outer digest algorithm)
    #[error("Algorithm mismatch: expected {expected}, found {found}")]
    AlgorithmMismatch {
        /// What the policy requires
        expected: String,
        /// What was actually present
        found: String,
    },

    /// Algorithm OID or name not known to this library
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The encoded signature container does not fit the reserved space
    #[error("Signature container ({needed} bytes) exceeds reserved space ({reserved} bytes)")]
    ReservedSpaceExceeded {
        /// Encoded container size
        needed: usize,
        /// Space reserved by the caller
        reserved: usize,
    },

    /// Cryptographic signature check failed
    #[error("Signature verification failed: {0}")]
    SignatureInvalid(String),

    /// X.509 certificate or CRL could not be parsed
    #[error("Certificate parse error: {0}")]
    CertificateParse(String),

    /// Timestamp token error (malformed TSTInfo, imprint mismatch, TSA failure)
    #[error("Timestamp error: {0}")]
    Timestamp(String),

    /// Signing-capability provider failed irrecoverably
    #[error("Signer error: {0}")]
    Signer(String),

    /// ASN.1 encode/decode error
    #[error("ASN.1 error: {0}")]
    Asn1(#[from] der::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors that must abort a chain walk immediately.
    pub fn is_revocation(&self) -> bool {
        matches!(self, Error::CertificateRevoked { .. })
    }
}
