//! X.509 certificate handling.
//!
//! [`Certificate`] is an immutable wrapper that owns the DER encoding and
//! extracts the fields this library needs at construction time: names,
//! serial, validity, public key, and the extensions driving chain
//! reconstruction and revocation checking (AIA, CRL distribution points,
//! extended key usage, id-pkix-ocsp-nocheck). Everything else in the
//! certificate is treated as opaque.

use der::{Decode, Encode};
use x509_parser::prelude::*;

use crate::crypto::{self, RawSigned};
use crate::error::{Error, Result};
use crate::oid;

/// Ordered certificate sequence: index 0 is the signer/leaf, increasing
/// index moves toward the root.
pub type CertificateChain = Vec<Certificate>;

/// Immutable X.509 identity record.
#[derive(Clone)]
pub struct Certificate {
    der: Vec<u8>,
    tbs_der: Vec<u8>,
    signature_algorithm: spki::AlgorithmIdentifierOwned,
    signature_value: Vec<u8>,
    subject: String,
    issuer: String,
    subject_raw: Vec<u8>,
    issuer_raw: Vec<u8>,
    serial: Vec<u8>,
    not_before: i64,
    not_after: i64,
    spki_der: Vec<u8>,
    public_key_bits: Vec<u8>,
    aia_ca_issuers: Vec<String>,
    aia_ocsp: Vec<String>,
    crl_distribution_points: Vec<String>,
    ocsp_signing_eku: bool,
    ocsp_nocheck: bool,
    is_ca: bool,
}

impl Certificate {
    /// Parse a certificate from its DER encoding.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| Error::CertificateParse(e.to_string()))?;

        // The outer SEQUENCE is re-read with the strict DER codec to keep
        // the exact TBS bytes and an owned signature AlgorithmIdentifier.
        let raw = RawSigned::from_der(der)?;

        let mut aia_ca_issuers = Vec::new();
        let mut aia_ocsp = Vec::new();
        let mut crl_distribution_points = Vec::new();
        let mut ocsp_signing_eku = false;
        let mut ocsp_nocheck = false;
        let mut is_ca = false;

        for ext in cert.extensions() {
            if ext.oid.to_id_string() == oid::ID_PKIX_OCSP_NOCHECK.to_string() {
                ocsp_nocheck = true;
            }
            match ext.parsed_extension() {
                ParsedExtension::AuthorityInfoAccess(aia) => {
                    for desc in &aia.accessdescs {
                        if let GeneralName::URI(uri) = &desc.access_location {
                            let method = desc.access_method.to_id_string();
                            if method == oid::AD_CA_ISSUERS.to_string() {
                                aia_ca_issuers.push(uri.to_string());
                            } else if method == oid::AD_OCSP.to_string() {
                                aia_ocsp.push(uri.to_string());
                            }
                        }
                    }
                },
                ParsedExtension::CRLDistributionPoints(points) => {
                    for point in &points.points {
                        if let Some(DistributionPointName::FullName(names)) =
                            &point.distribution_point
                        {
                            for name in names {
                                if let GeneralName::URI(uri) = name {
                                    crl_distribution_points.push(uri.to_string());
                                }
                            }
                        }
                    }
                },
                ParsedExtension::ExtendedKeyUsage(eku) => {
                    ocsp_signing_eku = eku.ocsp_signing;
                },
                ParsedExtension::BasicConstraints(bc) => {
                    is_ca = bc.ca;
                },
                _ => {},
            }
        }

        Ok(Certificate {
            tbs_der: raw.tbs.to_der()?,
            signature_algorithm: raw.signature_algorithm,
            signature_value: raw.signature.raw_bytes().to_vec(),
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            subject_raw: cert.subject().as_raw().to_vec(),
            issuer_raw: cert.issuer().as_raw().to_vec(),
            serial: normalize_serial(cert.raw_serial()),
            not_before: cert.validity().not_before.timestamp(),
            not_after: cert.validity().not_after.timestamp(),
            spki_der: cert.public_key().raw.to_vec(),
            public_key_bits: cert.public_key().subject_public_key.data.to_vec(),
            aia_ca_issuers,
            aia_ocsp,
            crl_distribution_points,
            ocsp_signing_eku,
            ocsp_nocheck,
            is_ca,
            der: der.to_vec(),
        })
    }

    /// The DER encoding this certificate was parsed from.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Subject distinguished name as a display string.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Issuer distinguished name as a display string.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Raw DER bytes of the subject Name.
    pub fn subject_raw(&self) -> &[u8] {
        &self.subject_raw
    }

    /// Raw DER bytes of the issuer Name.
    pub fn issuer_raw(&self) -> &[u8] {
        &self.issuer_raw
    }

    /// Serial number, big-endian with leading zero octets stripped.
    pub fn serial(&self) -> &[u8] {
        &self.serial
    }

    /// DER encoding of the SubjectPublicKeyInfo.
    pub fn spki_der(&self) -> &[u8] {
        &self.spki_der
    }

    /// Content bytes of the subjectPublicKey BIT STRING (used for OCSP
    /// issuerKeyHash computation).
    pub fn public_key_bits(&self) -> &[u8] {
        &self.public_key_bits
    }

    /// AIA caIssuers URLs, in certificate order.
    pub fn aia_ca_issuer_urls(&self) -> &[String] {
        &self.aia_ca_issuers
    }

    /// AIA OCSP responder URLs, in certificate order.
    pub fn aia_ocsp_urls(&self) -> &[String] {
        &self.aia_ocsp
    }

    /// CRL distribution point URLs, in certificate order.
    pub fn crl_distribution_point_urls(&self) -> &[String] {
        &self.crl_distribution_points
    }

    /// Whether the certificate carries the OCSP-signing extended key usage.
    pub fn has_ocsp_signing_eku(&self) -> bool {
        self.ocsp_signing_eku
    }

    /// Whether the certificate carries id-pkix-ocsp-nocheck.
    pub fn has_ocsp_nocheck(&self) -> bool {
        self.ocsp_nocheck
    }

    /// Whether basicConstraints marks this certificate as a CA.
    pub fn is_ca(&self) -> bool {
        self.is_ca
    }

    /// Issuer and subject names are equal, i.e. the certificate claims to
    /// be a root. The claim is not cryptographically checked here.
    pub fn is_self_signed(&self) -> bool {
        self.subject == self.issuer
    }

    /// Whether `ts` (unix seconds) falls inside the validity interval.
    pub fn valid_at(&self, ts: i64) -> bool {
        ts >= self.not_before && ts <= self.not_after
    }

    /// Validity interval as unix seconds (notBefore, notAfter).
    pub fn validity(&self) -> (i64, i64) {
        (self.not_before, self.not_after)
    }

    /// Signature algorithm of the certificate itself.
    pub fn signature_algorithm(&self) -> &spki::AlgorithmIdentifierOwned {
        &self.signature_algorithm
    }

    /// Verify this certificate's signature against the issuer's public key.
    pub fn verify_signed_by(&self, issuer: &Certificate) -> Result<()> {
        crypto::verify_signature(
            issuer.spki_der(),
            &self.signature_algorithm,
            None,
            &self.tbs_der,
            &self.signature_value,
        )
    }

    /// True when `name_der` and `serial` identify this certificate
    /// (used to locate the signing certificate for a SignerInfo).
    pub fn matches_issuer_and_serial(&self, name_der: &[u8], serial: &[u8]) -> bool {
        self.issuer_raw == name_der && self.serial == normalize_serial(serial)
    }

    /// Re-decode into the owned `x509-cert` representation for CMS embedding.
    pub fn to_x509(&self) -> Result<x509_cert::Certificate> {
        Ok(x509_cert::Certificate::from_der(&self.der)?)
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .field("serial", &hex_string(&self.serial))
            .finish()
    }
}

/// Strip leading zero octets from an INTEGER's content bytes so serial
/// numbers compare equal regardless of sign-padding.
pub(crate) fn normalize_serial(raw: &[u8]) -> Vec<u8> {
    let start = raw.iter().position(|&b| b != 0).unwrap_or(raw.len().saturating_sub(1));
    raw[start..].to_vec()
}

/// Uppercase hex rendering (serials, VRI keys).
pub(crate) fn hex_string(bytes: &[u8]) -> String {
    const HEX_CHARS: &[u8] = b"0123456789ABCDEF";
    let mut hex = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        hex.push(HEX_CHARS[(byte >> 4) as usize] as char);
        hex.push(HEX_CHARS[(byte & 0x0F) as usize] as char);
    }
    hex
}

/// Parse one or more certificates from `bytes`.
///
/// Accepts a single DER certificate, several DER certificates concatenated
/// back to back (the common AIA caIssuers payload), or PEM. Entries that
/// fail to parse are skipped with a warning; an empty result is a valid
/// outcome, not an error.
pub fn parse_certificates(bytes: &[u8]) -> Vec<Certificate> {
    let mut found = Vec::new();

    if bytes.starts_with(b"-----BEGIN") {
        for pem in Pem::iter_from_buffer(bytes).flatten() {
            if pem.label == "CERTIFICATE" {
                match Certificate::from_der(&pem.contents) {
                    Ok(cert) => found.push(cert),
                    Err(e) => log::warn!("skipping unparseable PEM certificate: {}", e),
                }
            }
        }
        return found;
    }

    let mut rest = bytes;
    while !rest.is_empty() {
        match X509Certificate::from_der(rest) {
            Ok((rem, _)) => {
                let consumed = rest.len() - rem.len();
                match Certificate::from_der(&rest[..consumed]) {
                    Ok(cert) => found.push(cert),
                    Err(e) => log::warn!("skipping unparseable certificate: {}", e),
                }
                rest = rem;
            },
            Err(e) => {
                log::warn!("stopping certificate scan: {}", e);
                break;
            },
        }
    }
    found
}

/// Check the full chain invariant: each entry is issued by the next one,
/// by subject/issuer linkage AND an actual signature check, and the last
/// entry is self-signed.
pub fn is_complete_chain(chain: &[Certificate]) -> bool {
    if chain.is_empty() {
        return false;
    }
    for pair in chain.windows(2) {
        if pair[0].issuer() != pair[1].subject() || pair[0].verify_signed_by(&pair[1]).is_err() {
            return false;
        }
    }
    let last = &chain[chain.len() - 1];
    last.is_self_signed() && last.verify_signed_by(last).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_serial_strips_sign_padding() {
        assert_eq!(normalize_serial(&[0x00, 0x8f, 0x01]), vec![0x8f, 0x01]);
        assert_eq!(normalize_serial(&[0x01, 0x02]), vec![0x01, 0x02]);
        assert_eq!(normalize_serial(&[0x00]), vec![0x00]);
    }

    #[test]
    fn test_hex_string_uppercase() {
        assert_eq!(hex_string(&[0xab, 0x01, 0xff]), "AB01FF");
        assert_eq!(hex_string(&[]), "");
    }

    #[test]
    fn test_parse_certificates_empty_input() {
        assert!(parse_certificates(&[]).is_empty());
        assert!(parse_certificates(b"not a certificate").is_empty());
    }
}
