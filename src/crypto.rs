//! Raw signature verification and algorithm-consistency policy.
//!
//! Dispatches a DER signature value, signed bytes, and a SubjectPublicKeyInfo
//! to the right verification primitive: RSA PKCS#1 v1.5, RSASSA-PSS, ECDSA
//! over P-256/P-384, or Ed25519. The strict parameter rules live here too:
//! RSASSA-PSS parameters must be internally consistent and agree with the
//! outer digest algorithm, Ed25519 mandates SHA-512, Ed448 mandates
//! SHAKE-256 (and is otherwise unsupported for verification).

use der::asn1::{Any, BitString, ObjectIdentifier};
use der::{Decode, Encode, Sequence};
use pkcs1::RsaPssParams;
use rsa::{Pkcs1v15Sign, Pss, RsaPublicKey};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use signature::hazmat::PrehashVerifier;
use signature::Verifier;
use spki::AlgorithmIdentifierOwned;

use crate::digest::DigestAlgorithm;
use crate::error::{Error, Result};
use crate::oid;

/// Generic outer shell shared by certificates, CRLs, and OCSP responses:
/// `SEQUENCE { tbs, signatureAlgorithm, signature }`. Keeping the TBS as an
/// opaque `Any` preserves the exact bytes that were signed.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct RawSigned {
    pub tbs: Any,
    pub signature_algorithm: AlgorithmIdentifierOwned,
    pub signature: BitString,
}

/// Verify `signature` over `message` with the public key in `spki_der`.
///
/// `digest_hint` is the digest algorithm declared alongside the mechanism
/// (the SignerInfo digest algorithm for CMS); mechanisms with a combined
/// OID ignore it except for the EdDSA policy checks, while plain
/// `rsaEncryption` requires it.
pub fn verify_signature(
    spki_der: &[u8],
    sig_alg: &AlgorithmIdentifierOwned,
    digest_hint: Option<DigestAlgorithm>,
    message: &[u8],
    signature: &[u8],
) -> Result<()> {
    let mech = sig_alg.oid;

    if mech == oid::SHA1_WITH_RSA
        || mech == oid::SHA256_WITH_RSA
        || mech == oid::SHA384_WITH_RSA
        || mech == oid::SHA512_WITH_RSA
    {
        let digest_oid = oid::digest_oid_for_signature_oid(&mech)
            .ok_or_else(|| Error::UnsupportedAlgorithm(mech.to_string()))?;
        return rsa_pkcs1v15_verify(
            spki_der,
            DigestAlgorithm::from_oid(&digest_oid)?,
            message,
            signature,
        );
    }

    if mech == oid::RSA_ENCRYPTION {
        let alg = digest_hint.ok_or_else(|| {
            Error::UnsupportedAlgorithm("rsaEncryption without a digest algorithm".to_string())
        })?;
        return rsa_pkcs1v15_verify(spki_der, alg, message, signature);
    }

    if mech == oid::RSASSA_PSS {
        let params_der = encode_params(sig_alg)?.ok_or_else(|| Error::AlgorithmMismatch {
            expected: "RSASSA-PSS with explicit parameters".to_string(),
            found: "absent parameters".to_string(),
        })?;
        let (alg, salt_len) = validate_pss_params(&params_der, digest_hint)?;
        return rsa_pss_verify(spki_der, alg, salt_len, message, signature);
    }

    if mech == oid::ECDSA_WITH_SHA256 || mech == oid::ECDSA_WITH_SHA384 || mech == oid::ECDSA_WITH_SHA512
    {
        let digest_oid = oid::digest_oid_for_signature_oid(&mech)
            .ok_or_else(|| Error::UnsupportedAlgorithm(mech.to_string()))?;
        return ecdsa_verify(
            spki_der,
            DigestAlgorithm::from_oid(&digest_oid)?,
            message,
            signature,
        );
    }

    if mech == oid::ED25519 {
        enforce_eddsa_digest_policy(&mech, digest_hint.map(|d| d.oid()))?;
        return ed25519_verify(spki_der, message, signature);
    }

    if mech == oid::ED448 {
        enforce_eddsa_digest_policy(&mech, digest_hint.map(|d| d.oid()))?;
        return Err(Error::UnsupportedAlgorithm(
            "Ed448 signature verification".to_string(),
        ));
    }

    Err(Error::UnsupportedAlgorithm(format!(
        "signature mechanism {}",
        mech
    )))
}

/// Ed25519 signatures mandate SHA-512 as the only acceptable digest;
/// Ed448 mandates SHAKE-256. Any other declared digest is a hard error.
pub fn enforce_eddsa_digest_policy(
    mechanism: &ObjectIdentifier,
    declared_digest: Option<ObjectIdentifier>,
) -> Result<()> {
    let required = if *mechanism == oid::ED25519 {
        oid::SHA512
    } else if *mechanism == oid::ED448 {
        oid::SHAKE256
    } else {
        return Ok(());
    };
    match declared_digest {
        None => Ok(()),
        Some(d) if d == required => Ok(()),
        Some(d) => Err(Error::AlgorithmMismatch {
            expected: format!(
                "{} with {}",
                oid::signature_mechanism_name(mechanism).unwrap_or("EdDSA"),
                oid::digest_name(&required).unwrap_or("mandated digest")
            ),
            found: oid::digest_name(&d).map(str::to_string).unwrap_or_else(|| d.to_string()),
        }),
    }
}

/// Parse and validate RSASSA-PSS parameters.
///
/// Checks that the mask generation function is MGF1, that the MGF1 digest
/// equals the params digest, and (when given) that the outer digest
/// algorithm matches the embedded one. Returns the digest and salt length
/// to verify with. Mismatches fail fast; they are never downgraded to a
/// warning.
pub fn validate_pss_params(
    params_der: &[u8],
    outer_digest: Option<DigestAlgorithm>,
) -> Result<(DigestAlgorithm, usize)> {
    let params = RsaPssParams::from_der(params_der)?;

    let hash_oid = params.hash.oid;
    let alg = DigestAlgorithm::from_oid(&hash_oid)?;

    if params.mask_gen.oid != oid::MGF1 {
        return Err(Error::AlgorithmMismatch {
            expected: "MGF1 mask generation function".to_string(),
            found: params.mask_gen.oid.to_string(),
        });
    }

    let mgf_digest = params
        .mask_gen
        .parameters
        .ok_or_else(|| Error::AlgorithmMismatch {
            expected: "MGF1 with an explicit digest".to_string(),
            found: "absent MGF1 parameters".to_string(),
        })?;
    let mgf_digest_oid = mgf_digest.oid;
    if mgf_digest_oid != hash_oid {
        return Err(Error::AlgorithmMismatch {
            expected: format!("MGF1 digest {}", hash_oid),
            found: mgf_digest_oid.to_string(),
        });
    }

    if let Some(outer) = outer_digest {
        if outer.oid() != hash_oid {
            return Err(Error::AlgorithmMismatch {
                expected: format!("outer digest {}", outer.name()),
                found: oid::digest_name(&hash_oid)
                    .map(str::to_string)
                    .unwrap_or_else(|| hash_oid.to_string()),
            });
        }
    }

    Ok((alg, params.salt_len as usize))
}

/// Build DER RSASSA-PSS parameters for `digest` and `salt_len`, with MGF1
/// over the same digest and trailer field 0xBC.
pub fn build_pss_params(digest: DigestAlgorithm, salt_len: u8) -> Result<Vec<u8>> {
    let params = match digest {
        DigestAlgorithm::Sha1 => RsaPssParams::new::<Sha1>(salt_len),
        DigestAlgorithm::Sha256 => RsaPssParams::new::<Sha256>(salt_len),
        DigestAlgorithm::Sha384 => RsaPssParams::new::<Sha384>(salt_len),
        DigestAlgorithm::Sha512 => RsaPssParams::new::<Sha512>(salt_len),
    };
    Ok(params.to_der()?)
}

fn rsa_pkcs1v15_verify(
    spki_der: &[u8],
    alg: DigestAlgorithm,
    message: &[u8],
    signature: &[u8],
) -> Result<()> {
    let key = rsa_public_key(spki_der)?;
    let hashed = alg.digest(message);
    let scheme = match alg {
        DigestAlgorithm::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
        DigestAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
        DigestAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
        DigestAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
    };
    key.verify(scheme, &hashed, signature)
        .map_err(|e| Error::SignatureInvalid(format!("RSA PKCS#1 v1.5: {}", e)))
}

fn rsa_pss_verify(
    spki_der: &[u8],
    alg: DigestAlgorithm,
    salt_len: usize,
    message: &[u8],
    signature: &[u8],
) -> Result<()> {
    let key = rsa_public_key(spki_der)?;
    let hashed = alg.digest(message);
    let scheme = match alg {
        DigestAlgorithm::Sha1 => Pss::new_with_salt::<Sha1>(salt_len),
        DigestAlgorithm::Sha256 => Pss::new_with_salt::<Sha256>(salt_len),
        DigestAlgorithm::Sha384 => Pss::new_with_salt::<Sha384>(salt_len),
        DigestAlgorithm::Sha512 => Pss::new_with_salt::<Sha512>(salt_len),
    };
    key.verify(scheme, &hashed, signature)
        .map_err(|e| Error::SignatureInvalid(format!("RSASSA-PSS: {}", e)))
}

fn ecdsa_verify(
    spki_der: &[u8],
    alg: DigestAlgorithm,
    message: &[u8],
    signature: &[u8],
) -> Result<()> {
    let spki = spki::SubjectPublicKeyInfoRef::from_der(spki_der)
        .map_err(|e| Error::CertificateParse(format!("SPKI: {}", e)))?;
    let curve = spki
        .algorithm
        .parameters_oid()
        .map_err(|e| Error::CertificateParse(format!("EC curve parameters: {}", e)))?;
    let key_bits = spki
        .subject_public_key
        .as_bytes()
        .ok_or_else(|| Error::CertificateParse("EC public key has unused bits".to_string()))?;
    let hashed = alg.digest(message);

    if curve == oid::SECP256R1 {
        let vk = p256::ecdsa::VerifyingKey::from_sec1_bytes(key_bits)
            .map_err(|e| Error::CertificateParse(format!("P-256 key: {}", e)))?;
        let sig = p256::ecdsa::Signature::from_der(signature)
            .map_err(|e| Error::SignatureInvalid(format!("ECDSA signature: {}", e)))?;
        vk.verify_prehash(&hashed, &sig)
            .map_err(|e| Error::SignatureInvalid(format!("ECDSA P-256: {}", e)))
    } else if curve == oid::SECP384R1 {
        let vk = p384::ecdsa::VerifyingKey::from_sec1_bytes(key_bits)
            .map_err(|e| Error::CertificateParse(format!("P-384 key: {}", e)))?;
        let sig = p384::ecdsa::Signature::from_der(signature)
            .map_err(|e| Error::SignatureInvalid(format!("ECDSA signature: {}", e)))?;
        vk.verify_prehash(&hashed, &sig)
            .map_err(|e| Error::SignatureInvalid(format!("ECDSA P-384: {}", e)))
    } else {
        Err(Error::UnsupportedAlgorithm(format!("EC curve {}", curve)))
    }
}

fn ed25519_verify(spki_der: &[u8], message: &[u8], signature: &[u8]) -> Result<()> {
    let spki = spki::SubjectPublicKeyInfoRef::from_der(spki_der)
        .map_err(|e| Error::CertificateParse(format!("SPKI: {}", e)))?;
    let key_bits = spki
        .subject_public_key
        .as_bytes()
        .ok_or_else(|| Error::CertificateParse("Ed25519 key has unused bits".to_string()))?;
    let key_bytes: [u8; 32] = key_bits
        .try_into()
        .map_err(|_| Error::CertificateParse("Ed25519 key must be 32 bytes".to_string()))?;
    let vk = ed25519_dalek::VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| Error::CertificateParse(format!("Ed25519 key: {}", e)))?;
    let sig = ed25519_dalek::Signature::from_slice(signature)
        .map_err(|e| Error::SignatureInvalid(format!("Ed25519 signature: {}", e)))?;
    vk.verify(message, &sig)
        .map_err(|e| Error::SignatureInvalid(format!("Ed25519: {}", e)))
}

fn rsa_public_key(spki_der: &[u8]) -> Result<RsaPublicKey> {
    use rsa::pkcs8::DecodePublicKey;
    RsaPublicKey::from_public_key_der(spki_der)
        .map_err(|e| Error::CertificateParse(format!("RSA public key: {}", e)))
}

/// DER-encode the parameters of an AlgorithmIdentifier, if present.
pub(crate) fn encode_params(alg: &AlgorithmIdentifierOwned) -> Result<Option<Vec<u8>>> {
    match &alg.parameters {
        Some(any) => Ok(Some(any.to_der()?)),
        None => Ok(None),
    }
}
