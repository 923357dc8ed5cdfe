//! RFC 3161 timestamp token structures and imprint checks.
//!
//! A timestamp token is itself a CMS ContentInfo whose encapsulated content
//! is a `TSTInfo`. Only the fields needed here are interpreted; the rest is
//! carried opaquely.

use der::asn1::{Any, GeneralizedTime, Int, ObjectIdentifier, OctetString};
use der::{Decode, Sequence};
use spki::AlgorithmIdentifierOwned;

use crate::digest::DigestAlgorithm;
use crate::error::{Error, Result};
use crate::oid;

/// `MessageImprint` (RFC 3161 §2.4.2).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct MessageImprint {
    /// Hash algorithm the imprint was computed with.
    pub hash_algorithm: AlgorithmIdentifierOwned,
    /// Hash of the timestamped data.
    pub hashed_message: OctetString,
}

/// `Accuracy` (RFC 3161 §2.4.2).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct Accuracy {
    /// Whole seconds.
    #[asn1(optional = "true")]
    pub seconds: Option<u32>,
    /// Milliseconds, 1..=999.
    #[asn1(context_specific = "0", optional = "true", tag_mode = "IMPLICIT")]
    pub millis: Option<u16>,
    /// Microseconds, 1..=999.
    #[asn1(context_specific = "1", optional = "true", tag_mode = "IMPLICIT")]
    pub micros: Option<u16>,
}

/// `TSTInfo` (RFC 3161 §2.4.2): the signed statement of a timestamp
/// authority.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct TstInfo {
    /// Always 1.
    pub version: u8,
    /// TSA policy under which the token was issued.
    pub policy: ObjectIdentifier,
    /// What was timestamped.
    pub message_imprint: MessageImprint,
    /// Token serial number.
    pub serial_number: Int,
    /// Time of issuance.
    pub gen_time: GeneralizedTime,
    /// Accuracy of `gen_time`.
    #[asn1(optional = "true")]
    pub accuracy: Option<Accuracy>,
    /// Whether tokens from this TSA are strictly ordered.
    #[asn1(default = "bool::default")]
    pub ordering: bool,
    /// Request nonce, echoed back.
    #[asn1(optional = "true")]
    pub nonce: Option<Int>,
    /// TSA name, kept opaque.
    #[asn1(context_specific = "0", optional = "true", tag_mode = "EXPLICIT")]
    pub tsa: Option<Any>,
    /// Extensions, kept opaque.
    #[asn1(
        context_specific = "1",
        optional = "true",
        tag_mode = "IMPLICIT",
        constructed = "true"
    )]
    pub extensions: Option<Vec<x509_cert::ext::Extension>>,
}

impl TstInfo {
    /// Token issuance time in unix seconds.
    pub fn gen_time_secs(&self) -> i64 {
        self.gen_time.to_unix_duration().as_secs() as i64
    }

    /// Whether the message imprint equals the hash of `message`, computed
    /// with the imprint's own declared algorithm.
    pub fn imprint_matches(&self, message: &[u8]) -> Result<bool> {
        let alg = DigestAlgorithm::from_oid(&self.message_imprint.hash_algorithm.oid)?;
        Ok(alg.digest(message) == self.message_imprint.hashed_message.as_bytes())
    }
}

/// Extract the `TSTInfo` from a DER timestamp token (a CMS ContentInfo
/// with eContentType id-ct-TSTInfo).
pub fn parse_timestamp_token(token_der: &[u8]) -> Result<TstInfo> {
    let content_info = cms::content_info::ContentInfo::from_der(token_der)
        .map_err(|e| Error::Timestamp(format!("token is not a ContentInfo: {}", e)))?;
    if content_info.content_type != oid::ID_SIGNED_DATA {
        return Err(Error::Timestamp(format!(
            "token content type is {}, expected id-signedData",
            content_info.content_type
        )));
    }
    let signed_data: cms::signed_data::SignedData = content_info
        .content
        .decode_as()
        .map_err(|e| Error::Timestamp(format!("token SignedData: {}", e)))?;
    extract_tst_info(&signed_data)
}

/// Extract the `TSTInfo` carried by a parsed SignedData.
pub fn extract_tst_info(signed_data: &cms::signed_data::SignedData) -> Result<TstInfo> {
    if signed_data.encap_content_info.econtent_type != oid::ID_CT_TST_INFO {
        return Err(Error::Timestamp(format!(
            "encapsulated content type is {}, expected id-ct-TSTInfo",
            signed_data.encap_content_info.econtent_type
        )));
    }
    let econtent = signed_data
        .encap_content_info
        .econtent
        .as_ref()
        .ok_or_else(|| Error::Timestamp("timestamp token has no eContent".to_string()))?;
    let wrapped: OctetString = econtent
        .decode_as()
        .map_err(|e| Error::Timestamp(format!("eContent is not an OCTET STRING: {}", e)))?;
    TstInfo::from_der(wrapped.as_bytes())
        .map_err(|e| Error::Timestamp(format!("TSTInfo: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use der::Encode;

    fn sample_tst_info(message: &[u8]) -> TstInfo {
        TstInfo {
            version: 1,
            policy: ObjectIdentifier::new_unwrap("1.2.3.4.1"),
            message_imprint: MessageImprint {
                hash_algorithm: AlgorithmIdentifierOwned {
                    oid: crate::oid::SHA256,
                    parameters: None,
                },
                hashed_message: OctetString::new(DigestAlgorithm::Sha256.digest(message))
                    .unwrap(),
            },
            serial_number: Int::new(&[0x2a]).unwrap(),
            gen_time: GeneralizedTime::from_unix_duration(std::time::Duration::from_secs(
                1_700_000_000,
            ))
            .unwrap(),
            accuracy: None,
            ordering: false,
            nonce: None,
            tsa: None,
            extensions: None,
        }
    }

    #[test]
    fn test_tst_info_roundtrip() {
        let info = sample_tst_info(b"signature bytes");
        let der = info.to_der().unwrap();
        let decoded = TstInfo::from_der(&der).unwrap();
        assert_eq!(decoded, info);
        assert_eq!(decoded.gen_time_secs(), 1_700_000_000);
    }

    #[test]
    fn test_imprint_match_and_mismatch() {
        let info = sample_tst_info(b"signature bytes");
        assert!(info.imprint_matches(b"signature bytes").unwrap());
        assert!(!info.imprint_matches(b"tampered").unwrap());
    }

    #[test]
    fn test_parse_rejects_non_token() {
        assert!(parse_timestamp_token(b"junk").is_err());
    }
}
