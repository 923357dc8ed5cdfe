//! Pluggable client traits for network-dependent operations.
//!
//! The library never opens a connection itself. Revocation data, issuer
//! certificates, and timestamp tokens come in through these traits, and the
//! signing operation itself is behind [`ExternalSigner`] so keys can live in
//! an HSM, a remote service, or the in-crate [`RsaSigner`].
//!
//! Revocation and AIA fetches must not fail: `None` means "unavailable" and
//! callers treat it as absence of evidence, never as an error.

use der::asn1::ObjectIdentifier;

use crate::cert::Certificate;
use crate::digest::DigestAlgorithm;
use crate::error::{Error, Result};
use crate::oid;

/// Fetches certificate revocation lists.
pub trait CrlClient {
    /// Fetch the DER-encoded CRL for `cert` from `url`. Returns `None` when
    /// the CRL is unavailable for any reason.
    fn fetch_crl(&self, cert: &Certificate, url: &str) -> Option<Vec<u8>>;
}

/// Fetches OCSP responses.
pub trait OcspClient {
    /// Query the responder at `url` about `cert`, issued by `issuer`.
    ///
    /// The returned bytes must be a DER `BasicOCSPResponse`, not the
    /// `OCSPResponse` status wrapper. `None` means unavailable.
    fn fetch_ocsp(&self, cert: &Certificate, issuer: &Certificate, url: &str) -> Option<Vec<u8>>;
}

/// Fetches issuer certificates from AIA caIssuers URLs.
pub trait AiaClient {
    /// Download the payload at `url`: a single DER certificate, several DER
    /// certificates concatenated, or a PEM bundle. `None` means unavailable.
    fn fetch(&self, url: &str) -> Option<Vec<u8>>;
}

/// RFC 3161 timestamp authority client.
pub trait TimestampClient {
    /// Upper bound on the encoded token size, used to reserve space in the
    /// signature container before the token exists.
    fn estimate_token_size(&self) -> usize;

    /// Digest algorithm to use for the message imprint.
    fn digest_algorithm(&self) -> DigestAlgorithm;

    /// Request a token over the message `imprint` (already digested).
    /// Returns the DER-encoded `TimeStampToken` (a CMS ContentInfo).
    fn request_token(&self, imprint: &[u8]) -> Result<Vec<u8>>;
}

/// Produces raw signature values; the keys never pass through this library.
pub trait ExternalSigner {
    /// Name of the digest algorithm the signer applies, e.g. "SHA-256".
    fn digest_algorithm_name(&self) -> &str;

    /// OID of the signature mechanism the signer implements.
    fn signature_mechanism_oid(&self) -> ObjectIdentifier;

    /// DER-encoded mechanism parameters, when the mechanism has any
    /// (RSASSA-PSS). `None` encodes as absent parameters.
    fn mechanism_params(&self) -> Option<Vec<u8>>;

    /// Sign `data` (the DER signed-attributes set, or the document content
    /// when signing without attributes) and return the raw signature value.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Local RSA PKCS#1 v1.5 signing capability over a parsed private key.
pub struct RsaSigner {
    key: rsa::RsaPrivateKey,
    digest: DigestAlgorithm,
}

impl RsaSigner {
    /// Build a signer from a PKCS#8 DER private key.
    pub fn from_pkcs8_der(key_der: &[u8], digest: DigestAlgorithm) -> Result<Self> {
        use rsa::pkcs8::DecodePrivateKey;
        let key = rsa::RsaPrivateKey::from_pkcs8_der(key_der)
            .map_err(|e| Error::Signer(format!("PKCS#8 key: {}", e)))?;
        Ok(RsaSigner { key, digest })
    }

    /// Build a signer from an already-parsed key.
    pub fn new(key: rsa::RsaPrivateKey, digest: DigestAlgorithm) -> Self {
        RsaSigner { key, digest }
    }
}

impl ExternalSigner for RsaSigner {
    fn digest_algorithm_name(&self) -> &str {
        self.digest.name()
    }

    fn signature_mechanism_oid(&self) -> ObjectIdentifier {
        oid::RSA_ENCRYPTION
    }

    fn mechanism_params(&self) -> Option<Vec<u8>> {
        None
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        use rsa::Pkcs1v15Sign;
        use sha1::Sha1;
        use sha2::{Sha256, Sha384, Sha512};

        let hashed = self.digest.digest(data);
        let scheme = match self.digest {
            DigestAlgorithm::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
            DigestAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
            DigestAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
            DigestAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
        };
        self.key
            .sign(scheme, &hashed)
            .map_err(|e| Error::Signer(format!("RSA signing: {}", e)))
    }
}
