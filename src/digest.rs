//! Digest algorithm registry.
//!
//! Maps algorithm identifiers (OIDs or names) to concrete digest
//! implementations. Timestamp clients use the streaming [`Hasher`]; the CMS
//! engine and the OCSP matcher use one-shot [`DigestAlgorithm::digest`].

use der::asn1::ObjectIdentifier;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::error::{Error, Result};
use crate::oid;

/// Digest algorithm used for signing and verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestAlgorithm {
    /// SHA-1 (deprecated, but still common in legacy signatures and
    /// mandated for DSS/VRI keys)
    Sha1,
    /// SHA-256 (recommended)
    #[default]
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl DigestAlgorithm {
    /// Get the OID for this digest algorithm.
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            DigestAlgorithm::Sha1 => oid::SHA1,
            DigestAlgorithm::Sha256 => oid::SHA256,
            DigestAlgorithm::Sha384 => oid::SHA384,
            DigestAlgorithm::Sha512 => oid::SHA512,
        }
    }

    /// Get the name of this algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "SHA-1",
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
        }
    }

    /// Digest output length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 => 64,
        }
    }

    /// Resolve an algorithm from its OID.
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        match *oid {
            o if o == oid::SHA1 => Ok(DigestAlgorithm::Sha1),
            o if o == oid::SHA256 => Ok(DigestAlgorithm::Sha256),
            o if o == oid::SHA384 => Ok(DigestAlgorithm::Sha384),
            o if o == oid::SHA512 => Ok(DigestAlgorithm::Sha512),
            _ => Err(Error::UnsupportedAlgorithm(format!("digest OID {}", oid))),
        }
    }

    /// Resolve an algorithm from a name such as "SHA-256" or "SHA256".
    pub fn from_name(name: &str) -> Result<Self> {
        let oid = crate::oid::digest_oid_by_name(name)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("digest name {}", name)))?;
        Self::from_oid(&oid)
    }

    /// Compute the digest of `data` in one shot.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            DigestAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            DigestAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// Start a streaming hasher for this algorithm.
    pub fn hasher(&self) -> Hasher {
        match self {
            DigestAlgorithm::Sha1 => Hasher::Sha1(Sha1::new()),
            DigestAlgorithm::Sha256 => Hasher::Sha256(Sha256::new()),
            DigestAlgorithm::Sha384 => Hasher::Sha384(Sha384::new()),
            DigestAlgorithm::Sha512 => Hasher::Sha512(Sha512::new()),
        }
    }
}

/// Streaming digest context over the registered algorithms.
pub enum Hasher {
    /// SHA-1 context
    Sha1(Sha1),
    /// SHA-256 context
    Sha256(Sha256),
    /// SHA-384 context
    Sha384(Sha384),
    /// SHA-512 context
    Sha512(Sha512),
}

impl Hasher {
    /// Feed more input into the digest.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha1(h) => h.update(data),
            Hasher::Sha256(h) => h.update(data),
            Hasher::Sha384(h) => h.update(data),
            Hasher::Sha512(h) => h.update(data),
        }
    }

    /// Finish and return the digest value.
    pub fn finalize(self) -> Vec<u8> {
        match self {
            Hasher::Sha1(h) => h.finalize().to_vec(),
            Hasher::Sha256(h) => h.finalize().to_vec(),
            Hasher::Sha384(h) => h.finalize().to_vec(),
            Hasher::Sha512(h) => h.finalize().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_lengths() {
        assert_eq!(DigestAlgorithm::Sha1.digest(b"abc").len(), 20);
        assert_eq!(DigestAlgorithm::Sha256.digest(b"abc").len(), 32);
        assert_eq!(DigestAlgorithm::Sha384.digest(b"abc").len(), 48);
        assert_eq!(DigestAlgorithm::Sha512.digest(b"abc").len(), 64);
    }

    #[test]
    fn test_known_sha256_vector() {
        let d = DigestAlgorithm::Sha256.digest(b"abc");
        assert_eq!(
            d[..4],
            [0xba, 0x78, 0x16, 0xbf],
            "SHA-256(\"abc\") should start with ba7816bf"
        );
    }

    #[test]
    fn test_from_oid_roundtrip() {
        for alg in [
            DigestAlgorithm::Sha1,
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha384,
            DigestAlgorithm::Sha512,
        ] {
            assert_eq!(DigestAlgorithm::from_oid(&alg.oid()).unwrap(), alg);
            assert_eq!(alg.output_len(), alg.digest(b"x").len());
        }
    }

    #[test]
    fn test_from_name() {
        assert_eq!(DigestAlgorithm::from_name("sha512").unwrap(), DigestAlgorithm::Sha512);
        assert!(DigestAlgorithm::from_name("MD2").is_err());
    }

    #[test]
    fn test_streaming_matches_oneshot() {
        let mut h = DigestAlgorithm::Sha384.hasher();
        h.update(b"hello ");
        h.update(b"world");
        assert_eq!(h.finalize(), DigestAlgorithm::Sha384.digest(b"hello world"));
    }

    #[test]
    fn test_shake256_is_rejected_by_registry() {
        // Recognized in the OID catalog for the Ed448 policy check, but no
        // digest implementation is registered for it.
        assert!(DigestAlgorithm::from_oid(&crate::oid::SHAKE256).is_err());
    }
}
