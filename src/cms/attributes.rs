//! CMS signed/unsigned attribute construction and extraction.
//!
//! Covers the PKCS#9 core attributes (content-type, message-digest,
//! signing-time), the ESS signing-certificate attributes (RFC 5035) used by
//! CAdES, the Adobe revocation-info-archival attribute, and the RFC 3161
//! timestamp-token unsigned attribute.

use der::asn1::{
    Any, GeneralizedTime, ObjectIdentifier, OctetString, SetOfVec, UtcTime,
};
use der::{Decode, Encode, Reader as _, Sequence};
use spki::AlgorithmIdentifierOwned;
use x509_cert::attr::{Attribute, Attributes};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::serial_number::SerialNumber;

use crate::cert::Certificate;
use crate::digest::DigestAlgorithm;
use crate::error::{Error, Result};
use crate::oid;

/// `IssuerSerial` (RFC 5035 §6).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct IssuerSerial {
    /// Issuer of the referenced certificate, as GeneralNames.
    pub issuer: Vec<GeneralName>,
    /// Its serial number.
    pub serial_number: SerialNumber,
}

/// `ESSCertIDv2` (RFC 5035 §4): a hash reference to a certificate.
///
/// `Sequence` is implemented by hand because `der_derive` cannot express a
/// `default` on a non-`Copy` field; the impls mirror what
/// `#[asn1(default = "sha256_algorithm")]` would generate.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EssCertIdV2 {
    /// Hash algorithm; SHA-256 when omitted.
    pub hash_algorithm: AlgorithmIdentifierOwned,
    /// Hash of the whole DER certificate.
    pub cert_hash: OctetString,
    /// Issuer and serial of the referenced certificate.
    pub issuer_serial: Option<IssuerSerial>,
}

impl<'a> der::DecodeValue<'a> for EssCertIdV2 {
    fn decode_value<R: der::Reader<'a>>(
        reader: &mut R,
        header: der::Header,
    ) -> der::Result<Self> {
        reader.read_nested(header.length, |reader| {
            let hash_algorithm = Option::<AlgorithmIdentifierOwned>::decode(reader)?
                .unwrap_or_else(sha256_algorithm);
            let cert_hash = reader.decode()?;
            let issuer_serial = reader.decode()?;
            Ok(Self {
                hash_algorithm,
                cert_hash,
                issuer_serial,
            })
        })
    }
}

impl der::EncodeValue for EssCertIdV2 {
    fn value_len(&self) -> der::Result<der::Length> {
        let mut len = der::Length::ZERO;
        if self.hash_algorithm != sha256_algorithm() {
            len = (len + self.hash_algorithm.encoded_len()?)?;
        }
        len = (len + self.cert_hash.encoded_len()?)?;
        len = (len + self.issuer_serial.encoded_len()?)?;
        Ok(len)
    }

    fn encode_value(&self, writer: &mut impl der::Writer) -> der::Result<()> {
        if self.hash_algorithm != sha256_algorithm() {
            self.hash_algorithm.encode(writer)?;
        }
        self.cert_hash.encode(writer)?;
        self.issuer_serial.encode(writer)?;
        Ok(())
    }
}

impl der::Sequence<'_> for EssCertIdV2 {}

/// `SigningCertificateV2` (RFC 5035 §4).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SigningCertificateV2 {
    /// References; the first entry must be the signing certificate.
    pub certs: Vec<EssCertIdV2>,
    /// Certification policies, kept opaque.
    #[asn1(optional = "true")]
    pub policies: Option<Any>,
}

/// `ESSCertID` (RFC 2634 §5.4.1), the SHA-1 predecessor.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct EssCertId {
    /// SHA-1 hash of the whole DER certificate.
    pub cert_hash: OctetString,
    /// Issuer and serial of the referenced certificate.
    #[asn1(optional = "true")]
    pub issuer_serial: Option<IssuerSerial>,
}

/// `SigningCertificate` (RFC 2634 §5.4).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SigningCertificate {
    /// References; the first entry must be the signing certificate.
    pub certs: Vec<EssCertId>,
    /// Certification policies, kept opaque.
    #[asn1(optional = "true")]
    pub policies: Option<Any>,
}

/// Adobe `RevocationInfoArchival` (PDF 32000-1 §12.8.3.3.2): revocation
/// material captured at signing time inside a signed attribute. Entries are
/// kept as opaque [`Any`] so the archived bytes survive verbatim.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct RevocationInfoArchival {
    /// DER CRLs.
    #[asn1(context_specific = "0", optional = "true", tag_mode = "EXPLICIT")]
    pub crls: Option<Vec<Any>>,
    /// DER `OCSPResponse` wrappers (not bare basic responses).
    #[asn1(context_specific = "1", optional = "true", tag_mode = "EXPLICIT")]
    pub ocsps: Option<Vec<Any>>,
    /// Other formats, kept opaque.
    #[asn1(context_specific = "2", optional = "true", tag_mode = "EXPLICIT")]
    pub other_rev_info: Option<Vec<Any>>,
}

fn sha256_algorithm() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: oid::SHA256,
        parameters: None,
    }
}

/// Build an attribute with a single value.
pub fn single_valued_attribute(attr_oid: ObjectIdentifier, value: Any) -> Result<Attribute> {
    let mut values = SetOfVec::new();
    values.insert(value)?;
    Ok(Attribute {
        oid: attr_oid,
        values,
    })
}

/// content-type attribute (PKCS#9).
pub fn content_type_attribute(content_type: ObjectIdentifier) -> Result<Attribute> {
    single_valued_attribute(oid::ATTR_CONTENT_TYPE, Any::encode_from(&content_type)?)
}

/// message-digest attribute (PKCS#9).
pub fn message_digest_attribute(digest: &[u8]) -> Result<Attribute> {
    single_valued_attribute(
        oid::ATTR_MESSAGE_DIGEST,
        Any::encode_from(&OctetString::new(digest)?)?,
    )
}

/// signing-time attribute (PKCS#9). Encoded as UTCTime up to 2049 and
/// GeneralizedTime beyond, per RFC 5652 §11.3.
pub fn signing_time_attribute(unix_secs: i64) -> Result<Attribute> {
    let duration = std::time::Duration::from_secs(
        u64::try_from(unix_secs)
            .map_err(|_| Error::MalformedCms("signing time before 1970".to_string()))?,
    );
    let value = match UtcTime::from_unix_duration(duration) {
        Ok(utc) => Any::encode_from(&utc)?,
        Err(_) => Any::encode_from(&GeneralizedTime::from_unix_duration(duration)?)?,
    };
    single_valued_attribute(oid::ATTR_SIGNING_TIME, value)
}

/// signingCertificateV2 attribute over the signing certificate, hashing it
/// with `digest`.
pub fn signing_certificate_v2_attribute(
    cert: &Certificate,
    digest: DigestAlgorithm,
) -> Result<Attribute> {
    let issuer = x509_cert::name::Name::from_der(cert.issuer_raw())?;
    let value = SigningCertificateV2 {
        certs: vec![EssCertIdV2 {
            hash_algorithm: AlgorithmIdentifierOwned {
                oid: digest.oid(),
                parameters: None,
            },
            cert_hash: OctetString::new(digest.digest(cert.der()))?,
            issuer_serial: Some(IssuerSerial {
                issuer: vec![GeneralName::DirectoryName(issuer)],
                serial_number: SerialNumber::new(cert.serial())?,
            }),
        }],
        policies: None,
    };
    single_valued_attribute(oid::ATTR_SIGNING_CERTIFICATE_V2, Any::encode_from(&value)?)
}

/// adbe-revocationInfoArchival attribute. `ocsps` entries must already be
/// `OCSPResponse` wrappers.
pub fn revocation_archival_attribute(
    crls: &[Vec<u8>],
    wrapped_ocsps: &[Vec<u8>],
) -> Result<Attribute> {
    let to_any = |items: &[Vec<u8>]| -> Result<Option<Vec<Any>>> {
        if items.is_empty() {
            return Ok(None);
        }
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(Any::from_der(item)?);
        }
        Ok(Some(out))
    };
    let value = RevocationInfoArchival {
        crls: to_any(crls)?,
        ocsps: to_any(wrapped_ocsps)?,
        other_rev_info: None,
    };
    single_valued_attribute(oid::ATTR_ADBE_REVOCATION, Any::encode_from(&value)?)
}

/// Find an attribute by OID.
pub fn find_attribute<'a>(attrs: &'a Attributes, attr_oid: &ObjectIdentifier) -> Option<&'a Attribute> {
    attrs.iter().find(|attr| attr.oid == *attr_oid)
}

/// Decode the single value of an attribute. Multi-valued or empty
/// attributes are malformed for every attribute this library reads.
pub fn single_value<T: for<'a> Decode<'a>>(attr: &Attribute) -> Result<T> {
    if attr.values.len() != 1 {
        return Err(Error::MalformedCms(format!(
            "attribute {} must have exactly one value, found {}",
            attr.oid,
            attr.values.len()
        )));
    }
    let any = attr
        .values
        .get(0)
        .ok_or_else(|| Error::MalformedCms("empty attribute value set".to_string()))?;
    Ok(T::from_der(&any.to_der()?)?)
}

/// Check an ESS signing-certificate (v1 or v2) attribute against the
/// located signing certificate. Returns `CadesViolation` on any mismatch.
pub fn check_signing_certificate_attr(attr: &Attribute, cert: &Certificate) -> Result<()> {
    if attr.oid == oid::ATTR_SIGNING_CERTIFICATE_V2 {
        let value: SigningCertificateV2 = single_value(attr)?;
        let first = value.certs.first().ok_or_else(|| {
            Error::CadesViolation("signingCertificateV2 has no certificate reference".to_string())
        })?;
        let alg = DigestAlgorithm::from_oid(&first.hash_algorithm.oid)?;
        if alg.digest(cert.der()) != first.cert_hash.as_bytes() {
            return Err(Error::CadesViolation(
                "signingCertificateV2 hash does not match the signing certificate".to_string(),
            ));
        }
        Ok(())
    } else if attr.oid == oid::ATTR_SIGNING_CERTIFICATE {
        let value: SigningCertificate = single_value(attr)?;
        let first = value.certs.first().ok_or_else(|| {
            Error::CadesViolation("signingCertificate has no certificate reference".to_string())
        })?;
        if DigestAlgorithm::Sha1.digest(cert.der()) != first.cert_hash.as_bytes() {
            return Err(Error::CadesViolation(
                "signingCertificate hash does not match the signing certificate".to_string(),
            ));
        }
        Ok(())
    } else {
        Err(Error::CadesViolation(format!(
            "attribute {} is not a signing-certificate attribute",
            attr.oid
        )))
    }
}

/// Read the signing-time attribute value (UTCTime or GeneralizedTime) as
/// unix seconds.
pub fn signing_time_value(attr: &Attribute) -> Result<i64> {
    if attr.values.len() != 1 {
        return Err(Error::MalformedCms(
            "signing-time must have exactly one value".to_string(),
        ));
    }
    let any = attr
        .values
        .get(0)
        .ok_or_else(|| Error::MalformedCms("empty signing-time value".to_string()))?;
    if let Ok(utc) = any.decode_as::<UtcTime>() {
        return Ok(utc.to_unix_duration().as_secs() as i64);
    }
    let generalized = any.decode_as::<GeneralizedTime>()?;
    Ok(generalized.to_unix_duration().as_secs() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_attribute_roundtrip() {
        let attr = content_type_attribute(oid::ID_DATA).unwrap();
        assert_eq!(attr.oid, oid::ATTR_CONTENT_TYPE);
        let value: ObjectIdentifier = single_value(&attr).unwrap();
        assert_eq!(value, oid::ID_DATA);
    }

    #[test]
    fn test_message_digest_attribute_roundtrip() {
        let digest = DigestAlgorithm::Sha256.digest(b"content");
        let attr = message_digest_attribute(&digest).unwrap();
        let value: OctetString = single_value(&attr).unwrap();
        assert_eq!(value.as_bytes(), digest.as_slice());
    }

    #[test]
    fn test_signing_time_roundtrip_utc_and_generalized() {
        // 2024: fits in UTCTime
        let attr = signing_time_attribute(1_700_000_000).unwrap();
        assert_eq!(signing_time_value(&attr).unwrap(), 1_700_000_000);

        // 2060: must fall back to GeneralizedTime
        let far = 2_858_000_000;
        let attr = signing_time_attribute(far).unwrap();
        assert_eq!(signing_time_value(&attr).unwrap(), far);
    }

    #[test]
    fn test_revocation_archival_empty_lists_are_absent() {
        let attr = revocation_archival_attribute(&[], &[]).unwrap();
        let value: RevocationInfoArchival = single_value(&attr).unwrap();
        assert!(value.crls.is_none());
        assert!(value.ocsps.is_none());
    }

    #[test]
    fn test_ess_cert_id_v2_default_hash_algorithm() {
        let id = EssCertIdV2 {
            hash_algorithm: sha256_algorithm(),
            cert_hash: OctetString::new([0u8; 32].as_slice()).unwrap(),
            issuer_serial: None,
        };
        let der = id.to_der().unwrap();
        let decoded = EssCertIdV2::from_der(&der).unwrap();
        assert_eq!(decoded.hash_algorithm.oid, oid::SHA256);
    }
}
