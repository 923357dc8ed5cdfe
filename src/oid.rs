//! Static OID catalog for digest and signature mechanisms.
//!
//! Maps object identifiers to human-readable algorithm names and back. The
//! tables are immutable and built once at first use; everything here is a
//! pure lookup. Covers the mechanisms this library signs and verifies with,
//! including RSASSA-PSS and the EdDSA variants, plus the CMS/PKIX OIDs used
//! by the signed-data engine and the revocation verifiers.

use der::asn1::ObjectIdentifier;
use lazy_static::lazy_static;
use std::collections::HashMap;

// Digest algorithms
/// SHA-1 (1.3.14.3.2.26)
pub const SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");
/// SHA-256 (2.16.840.1.101.3.4.2.1)
pub const SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");
/// SHA-384 (2.16.840.1.101.3.4.2.2)
pub const SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.2");
/// SHA-512 (2.16.840.1.101.3.4.2.3)
pub const SHA512: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.3");
/// SHAKE-256 (2.16.840.1.101.3.4.2.12), mandated digest for Ed448
pub const SHAKE256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.12");

// RSA signature mechanisms
/// rsaEncryption (1.2.840.113549.1.1.1)
pub const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
/// sha1WithRSAEncryption
pub const SHA1_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5");
/// sha256WithRSAEncryption
pub const SHA256_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
/// sha384WithRSAEncryption
pub const SHA384_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12");
/// sha512WithRSAEncryption
pub const SHA512_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");
/// id-RSASSA-PSS (1.2.840.113549.1.1.10)
pub const RSASSA_PSS: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.10");
/// id-mgf1 (1.2.840.113549.1.1.8)
pub const MGF1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.8");

// ECDSA signature mechanisms
/// id-ecPublicKey (1.2.840.10045.2.1)
pub const EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
/// ecdsa-with-SHA256
pub const ECDSA_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
/// ecdsa-with-SHA384
pub const ECDSA_WITH_SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3");
/// ecdsa-with-SHA512
pub const ECDSA_WITH_SHA512: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.4");
/// NIST P-256 curve (1.2.840.10045.3.1.7)
pub const SECP256R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
/// NIST P-384 curve (1.3.132.0.34)
pub const SECP384R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");

// EdDSA
/// Ed25519 (1.3.101.112)
pub const ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");
/// Ed448 (1.3.101.113)
pub const ED448: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.113");

// CMS content types
/// id-data (1.2.840.113549.1.7.1)
pub const ID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
/// id-signedData (1.2.840.113549.1.7.2)
pub const ID_SIGNED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");
/// id-ct-TSTInfo (1.2.840.113549.1.9.16.1.4)
pub const ID_CT_TST_INFO: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.1.4");

// CMS attributes
/// content-type attribute (1.2.840.113549.1.9.3)
pub const ATTR_CONTENT_TYPE: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.3");
/// message-digest attribute (1.2.840.113549.1.9.4)
pub const ATTR_MESSAGE_DIGEST: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");
/// signing-time attribute (1.2.840.113549.1.9.5)
pub const ATTR_SIGNING_TIME: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.5");
/// id-aa-signingCertificate, ESS v1 (1.2.840.113549.1.9.16.2.12)
pub const ATTR_SIGNING_CERTIFICATE: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.2.12");
/// id-aa-signingCertificateV2 (1.2.840.113549.1.9.16.2.47)
pub const ATTR_SIGNING_CERTIFICATE_V2: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.2.47");
/// id-aa-signatureTimeStampToken (1.2.840.113549.1.9.16.2.14)
pub const ATTR_TIMESTAMP_TOKEN: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.2.14");
/// adbe-revocationInfoArchival (1.2.840.113583.1.1.8)
pub const ATTR_ADBE_REVOCATION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113583.1.1.8");

// PKIX access methods and extensions
/// id-ad-caIssuers (1.3.6.1.5.5.7.48.2)
pub const AD_CA_ISSUERS: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.2");
/// id-ad-ocsp (1.3.6.1.5.5.7.48.1)
pub const AD_OCSP: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.1");
/// id-pkix-ocsp-basic (1.3.6.1.5.5.7.48.1.1)
pub const ID_PKIX_OCSP_BASIC: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.1.1");
/// id-pkix-ocsp-nocheck (1.3.6.1.5.5.7.48.1.5)
pub const ID_PKIX_OCSP_NOCHECK: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.1.5");
/// id-kp-OCSPSigning extended key usage (1.3.6.1.5.5.7.3.9)
pub const EKU_OCSP_SIGNING: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.9");

lazy_static! {
    static ref DIGEST_NAMES: HashMap<ObjectIdentifier, &'static str> = {
        let mut m = HashMap::new();
        m.insert(SHA1, "SHA-1");
        m.insert(SHA256, "SHA-256");
        m.insert(SHA384, "SHA-384");
        m.insert(SHA512, "SHA-512");
        m.insert(SHAKE256, "SHAKE-256");
        m
    };
    static ref DIGEST_OIDS: HashMap<&'static str, ObjectIdentifier> = {
        let mut m = HashMap::new();
        m.insert("SHA-1", SHA1);
        m.insert("SHA1", SHA1);
        m.insert("SHA-256", SHA256);
        m.insert("SHA256", SHA256);
        m.insert("SHA-384", SHA384);
        m.insert("SHA384", SHA384);
        m.insert("SHA-512", SHA512);
        m.insert("SHA512", SHA512);
        m.insert("SHAKE-256", SHAKE256);
        m.insert("SHAKE256", SHAKE256);
        m
    };
    static ref MECHANISM_NAMES: HashMap<ObjectIdentifier, &'static str> = {
        let mut m = HashMap::new();
        m.insert(RSA_ENCRYPTION, "RSA");
        m.insert(SHA1_WITH_RSA, "SHA1withRSA");
        m.insert(SHA256_WITH_RSA, "SHA256withRSA");
        m.insert(SHA384_WITH_RSA, "SHA384withRSA");
        m.insert(SHA512_WITH_RSA, "SHA512withRSA");
        m.insert(RSASSA_PSS, "RSASSA-PSS");
        m.insert(EC_PUBLIC_KEY, "ECDSA");
        m.insert(ECDSA_WITH_SHA256, "SHA256withECDSA");
        m.insert(ECDSA_WITH_SHA384, "SHA384withECDSA");
        m.insert(ECDSA_WITH_SHA512, "SHA512withECDSA");
        m.insert(ED25519, "Ed25519");
        m.insert(ED448, "Ed448");
        m
    };
    static ref MECHANISM_DIGESTS: HashMap<ObjectIdentifier, ObjectIdentifier> = {
        let mut m = HashMap::new();
        m.insert(SHA1_WITH_RSA, SHA1);
        m.insert(SHA256_WITH_RSA, SHA256);
        m.insert(SHA384_WITH_RSA, SHA384);
        m.insert(SHA512_WITH_RSA, SHA512);
        m.insert(ECDSA_WITH_SHA256, SHA256);
        m.insert(ECDSA_WITH_SHA384, SHA384);
        m.insert(ECDSA_WITH_SHA512, SHA512);
        // Ed25519 is defined over SHA-512, Ed448 over SHAKE-256
        m.insert(ED25519, SHA512);
        m.insert(ED448, SHAKE256);
        m
    };
}

/// Human-readable name of a digest algorithm OID, if known.
pub fn digest_name(oid: &ObjectIdentifier) -> Option<&'static str> {
    DIGEST_NAMES.get(oid).copied()
}

/// Digest algorithm OID for a human-readable name ("SHA-256", "SHA256", ...).
pub fn digest_oid_by_name(name: &str) -> Option<ObjectIdentifier> {
    DIGEST_OIDS.get(name.to_ascii_uppercase().as_str()).copied()
}

/// Human-readable name of a signature mechanism OID, if known.
pub fn signature_mechanism_name(oid: &ObjectIdentifier) -> Option<&'static str> {
    MECHANISM_NAMES.get(oid).copied()
}

/// Digest algorithm implied by a combined signature mechanism OID
/// (e.g. sha256WithRSAEncryption implies SHA-256). Mechanisms that carry
/// the digest in their parameters (RSASSA-PSS) or leave it to the SignerInfo
/// (plain rsaEncryption) return None.
pub fn digest_oid_for_signature_oid(oid: &ObjectIdentifier) -> Option<ObjectIdentifier> {
    MECHANISM_DIGESTS.get(oid).copied()
}
