//! OCSP response structures (RFC 6960) and response matching.
//!
//! Only the response side is modeled: clients deliver DER
//! `BasicOCSPResponse` bytes, and this module parses them, matches
//! `SingleResponse` entries against a certificate/issuer pair by recomputing
//! the CertID hashes, and verifies the response signature. The
//! `OCSPResponse` status wrapper exists only for embedding responses into
//! the adbe-revocationInfoArchival attribute, which requires the wrapped
//! form.

use der::asn1::{Any, BitString, GeneralizedTime, Null, OctetString, ObjectIdentifier};
use der::{Choice, Decode, Encode, Enumerated, Sequence};
use spki::AlgorithmIdentifierOwned;
use x509_cert::ext::pkix::CrlReason;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;

use crate::cert::{normalize_serial, Certificate};
use crate::digest::DigestAlgorithm;
use crate::error::{Error, Result};
use crate::{crypto, oid};

/// `CertID` (RFC 6960 §4.1.1): identifies the certificate a single response
/// is about, via hashes of the issuer name and key.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct CertId {
    /// Hash algorithm for both hashes.
    pub hash_algorithm: AlgorithmIdentifierOwned,
    /// Hash of the issuer's DER-encoded subject name.
    pub issuer_name_hash: OctetString,
    /// Hash of the issuer's subjectPublicKey BIT STRING content.
    pub issuer_key_hash: OctetString,
    /// Serial number of the certificate in question.
    pub serial_number: SerialNumber,
}

/// `RevokedInfo` (RFC 6960 §4.2.1).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct RevokedInfo {
    /// When the certificate was revoked.
    pub revocation_time: GeneralizedTime,
    /// Optional CRL reason code.
    #[asn1(context_specific = "0", optional = "true", tag_mode = "EXPLICIT")]
    pub revocation_reason: Option<CrlReason>,
}

/// `CertStatus` (RFC 6960 §4.2.1).
#[derive(Clone, Debug, Eq, PartialEq, Choice)]
pub enum CertStatus {
    /// The responder knows of no revocation.
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT")]
    Good(Null),
    /// The certificate is revoked, permanently or on hold.
    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", constructed = "true")]
    Revoked(RevokedInfo),
    /// The responder does not know the certificate.
    #[asn1(context_specific = "2", tag_mode = "IMPLICIT")]
    Unknown(Null),
}

/// `SingleResponse` (RFC 6960 §4.2.1).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SingleResponse {
    /// Which certificate this status is about.
    pub cert_id: CertId,
    /// Revocation status.
    pub cert_status: CertStatus,
    /// Start of the interval this status is known to be correct for.
    pub this_update: GeneralizedTime,
    /// End of that interval, when the responder states one.
    #[asn1(context_specific = "0", optional = "true", tag_mode = "EXPLICIT")]
    pub next_update: Option<GeneralizedTime>,
    /// Per-response extensions, kept opaque.
    #[asn1(context_specific = "1", optional = "true", tag_mode = "EXPLICIT")]
    pub single_extensions: Option<Any>,
}

/// `ResponderID` (RFC 6960 §4.2.1).
#[derive(Clone, Debug, Eq, PartialEq, Choice)]
pub enum ResponderId {
    /// Responder identified by subject name.
    #[asn1(context_specific = "1", tag_mode = "EXPLICIT", constructed = "true")]
    ByName(Name),
    /// Responder identified by SHA-1 of its public key.
    #[asn1(context_specific = "2", tag_mode = "EXPLICIT", constructed = "true")]
    ByKey(OctetString),
}

/// `ResponseData` (RFC 6960 §4.2.1): the signed portion of a basic
/// response.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct ResponseData {
    /// Response syntax version; only v1 (0) exists.
    #[asn1(
        context_specific = "0",
        default = "Default::default",
        tag_mode = "EXPLICIT"
    )]
    pub version: u8,
    /// Who produced the response.
    pub responder_id: ResponderId,
    /// When the response was produced.
    pub produced_at: GeneralizedTime,
    /// One entry per certificate asked about.
    pub responses: Vec<SingleResponse>,
    /// Response-level extensions, kept opaque.
    #[asn1(context_specific = "1", optional = "true", tag_mode = "EXPLICIT")]
    pub response_extensions: Option<Any>,
}

/// `BasicOCSPResponse` (RFC 6960 §4.2.1).
///
/// The `tbs` field is kept as an opaque [`Any`] so the exact signed bytes
/// survive the parse; [`BasicOcspResponse::response_data`] decodes it on
/// demand.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct BasicOcspResponse {
    /// `tbsResponseData`, byte-exact.
    pub tbs: Any,
    /// Signature algorithm over the TBS bytes.
    pub signature_algorithm: AlgorithmIdentifierOwned,
    /// Signature value.
    pub signature: BitString,
    /// Certificates the responder chose to include, usually its own
    /// delegated responder certificate.
    #[asn1(context_specific = "0", optional = "true", tag_mode = "EXPLICIT")]
    pub certs: Option<Vec<x509_cert::Certificate>>,
}

impl BasicOcspResponse {
    /// Parse from DER `BasicOCSPResponse` bytes.
    pub fn parse(der: &[u8]) -> Result<Self> {
        Ok(BasicOcspResponse::from_der(der)?)
    }

    /// Decode the signed `ResponseData`.
    pub fn response_data(&self) -> Result<ResponseData> {
        let tbs_der = self.tbs.to_der()?;
        Ok(ResponseData::from_der(&tbs_der)?)
    }

    /// Certificates embedded in the response, re-parsed into the library
    /// representation. Unparseable entries are skipped with a warning.
    pub fn embedded_certificates(&self) -> Vec<Certificate> {
        let mut out = Vec::new();
        for cert in self.certs.iter().flatten() {
            match cert.to_der().map_err(Error::from).and_then(|der| Certificate::from_der(&der)) {
                Ok(c) => out.push(c),
                Err(e) => log::warn!("skipping unparseable embedded OCSP certificate: {}", e),
            }
        }
        out
    }

    /// Verify the response signature with `signer`'s public key.
    pub fn verify_signed_by(&self, signer: &Certificate) -> Result<()> {
        let tbs_der = self.tbs.to_der()?;
        let signature = self
            .signature
            .as_bytes()
            .ok_or_else(|| Error::MalformedCms("OCSP signature has unused bits".to_string()))?;
        crypto::verify_signature(
            signer.spki_der(),
            &self.signature_algorithm,
            None,
            &tbs_der,
            signature,
        )
    }

    /// Find the `SingleResponse` that is about `cert` as issued by
    /// `issuer`.
    ///
    /// A response matches when the serial number is equal and both CertID
    /// hashes, recomputed with the response's own declared hash algorithm
    /// over the issuer's name DER and public-key bits, are equal. Entries
    /// with an unsupported hash algorithm are skipped.
    pub fn find_response(
        &self,
        cert: &Certificate,
        issuer: &Certificate,
    ) -> Result<Option<SingleResponse>> {
        let data = self.response_data()?;
        for single in data.responses {
            if cert_id_matches(&single.cert_id, cert, issuer) {
                return Ok(Some(single));
            }
        }
        Ok(None)
    }
}

/// Whether `cert_id` identifies `cert` as issued by `issuer`, by serial
/// equality and recomputed issuer hashes.
pub fn cert_id_matches(cert_id: &CertId, cert: &Certificate, issuer: &Certificate) -> bool {
    if normalize_serial(cert_id.serial_number.as_bytes()) != cert.serial() {
        return false;
    }
    let alg = match DigestAlgorithm::from_oid(&cert_id.hash_algorithm.oid) {
        Ok(alg) => alg,
        Err(_) => {
            log::debug!(
                "skipping OCSP CertID with unsupported hash algorithm {}",
                cert_id.hash_algorithm.oid
            );
            return false;
        },
    };
    alg.digest(issuer.subject_raw()) == cert_id.issuer_name_hash.as_bytes()
        && alg.digest(issuer.public_key_bits()) == cert_id.issuer_key_hash.as_bytes()
}

/// Build a `CertID` for `cert`/`issuer` with the given digest algorithm.
pub fn build_cert_id(
    cert: &Certificate,
    issuer: &Certificate,
    alg: DigestAlgorithm,
) -> Result<CertId> {
    Ok(CertId {
        hash_algorithm: AlgorithmIdentifierOwned {
            oid: alg.oid(),
            parameters: Some(Any::new(der::Tag::Null, vec![])?),
        },
        issuer_name_hash: OctetString::new(alg.digest(issuer.subject_raw()))?,
        issuer_key_hash: OctetString::new(alg.digest(issuer.public_key_bits()))?,
        serial_number: SerialNumber::new(cert.serial())?,
    })
}

/// `OCSPResponseStatus` (RFC 6960 §4.2.1).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Enumerated)]
#[asn1(type = "ENUMERATED")]
#[repr(u8)]
pub enum OcspResponseStatus {
    /// Response has valid confirmations.
    Successful = 0,
    /// Illegal confirmation request.
    MalformedRequest = 1,
    /// Internal error in issuer.
    InternalError = 2,
    /// Try again later.
    TryLater = 3,
    /// Must sign the request.
    SigRequired = 5,
    /// Request unauthorized.
    Unauthorized = 6,
}

/// `ResponseBytes` (RFC 6960 §4.2.1).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct ResponseBytes {
    /// Always id-pkix-ocsp-basic here.
    pub response_type: ObjectIdentifier,
    /// DER `BasicOCSPResponse` wrapped in an OCTET STRING.
    pub response: OctetString,
}

/// `OCSPResponse` (RFC 6960 §4.2.1): the status wrapper around a basic
/// response. The adbe-revocationInfoArchival attribute stores responses in
/// this form.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct OcspResponse {
    /// Whether the responder produced a response at all.
    pub response_status: OcspResponseStatus,
    /// The basic response, present on success.
    #[asn1(context_specific = "0", optional = "true", tag_mode = "EXPLICIT")]
    pub response_bytes: Option<ResponseBytes>,
}

/// Wrap DER `BasicOCSPResponse` bytes into a successful `OCSPResponse`.
pub fn wrap_basic_response(basic_der: &[u8]) -> Result<Vec<u8>> {
    let wrapper = OcspResponse {
        response_status: OcspResponseStatus::Successful,
        response_bytes: Some(ResponseBytes {
            response_type: oid::ID_PKIX_OCSP_BASIC,
            response: OctetString::new(basic_der)?,
        }),
    };
    Ok(wrapper.to_der()?)
}

/// Unix-seconds view of a DER `GeneralizedTime`.
pub(crate) fn generalized_time_secs(t: &GeneralizedTime) -> i64 {
    t.to_unix_duration().as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_status_wrapper_roundtrip() {
        let basic = b"\x30\x03\x02\x01\x00";
        let wrapped = wrap_basic_response(basic).unwrap();
        let parsed = OcspResponse::from_der(&wrapped).unwrap();
        assert_eq!(parsed.response_status, OcspResponseStatus::Successful);
        let bytes = parsed.response_bytes.unwrap();
        assert_eq!(bytes.response_type, oid::ID_PKIX_OCSP_BASIC);
        assert_eq!(bytes.response.as_bytes(), basic);
    }

    #[test]
    fn test_cert_status_choice_encoding() {
        let good = CertStatus::Good(Null);
        let der = good.to_der().unwrap();
        // [0] IMPLICIT NULL: primitive context tag 0, zero length
        assert_eq!(der, vec![0x80, 0x00]);
        assert_eq!(CertStatus::from_der(&der).unwrap(), good);

        let revoked = CertStatus::Revoked(RevokedInfo {
            revocation_time: GeneralizedTime::from_unix_duration(
                std::time::Duration::from_secs(1_700_000_000),
            )
            .unwrap(),
            revocation_reason: None,
        });
        let der = revoked.to_der().unwrap();
        assert_eq!(der[0], 0xA1, "revoked uses constructed [1]");
        assert_eq!(CertStatus::from_der(&der).unwrap(), revoked);
    }

    #[test]
    fn test_generalized_time_secs() {
        let t = GeneralizedTime::from_unix_duration(std::time::Duration::from_secs(1_700_000_000))
            .unwrap();
        assert_eq!(generalized_time_secs(&t), 1_700_000_000);
    }
}
