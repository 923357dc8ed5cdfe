//! CMS signed-data engine.
//!
//! The creation path is a phased builder: [`CmsSigner`] fixes the
//! configuration, [`CmsWithAttributes`] exposes the exact signed-attribute
//! bytes for an external signer, and [`CmsWithSignature`] attaches the
//! signature (and optionally a timestamp) and encodes the final
//! ContentInfo. The verification path is [`CmsSignedData`], which parses a
//! container, locates the signing certificate, and checks integrity and
//! authenticity.

pub mod attributes;
mod builder;
mod parser;
pub mod timestamp;

pub use builder::{CmsSigner, CmsWithAttributes, CmsWithSignature};
pub use parser::CmsSignedData;
pub use timestamp::{parse_timestamp_token, TstInfo};

/// PDF signature SubFilter values this library produces and recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubFilter {
    /// Detached CMS signature (adbe.pkcs7.detached).
    #[default]
    AdbePkcs7Detached,
    /// CMS signature with an encapsulated SHA-1 digest (adbe.pkcs7.sha1).
    AdbePkcs7Sha1,
    /// CAdES baseline detached signature (ETSI.CAdES.detached).
    EtsiCadesDetached,
    /// RFC 3161 document timestamp (ETSI.RFC3161).
    EtsiRfc3161,
}

impl SubFilter {
    /// The PDF name for this sub-filter.
    pub fn as_pdf_name(&self) -> &'static str {
        match self {
            SubFilter::AdbePkcs7Detached => "adbe.pkcs7.detached",
            SubFilter::AdbePkcs7Sha1 => "adbe.pkcs7.sha1",
            SubFilter::EtsiCadesDetached => "ETSI.CAdES.detached",
            SubFilter::EtsiRfc3161 => "ETSI.RFC3161",
        }
    }

    /// Parse from a PDF name.
    pub fn from_pdf_name(name: &str) -> Option<Self> {
        match name {
            "adbe.pkcs7.detached" => Some(SubFilter::AdbePkcs7Detached),
            "adbe.pkcs7.sha1" => Some(SubFilter::AdbePkcs7Sha1),
            "ETSI.CAdES.detached" => Some(SubFilter::EtsiCadesDetached),
            "ETSI.RFC3161" => Some(SubFilter::EtsiRfc3161),
            _ => None,
        }
    }

    /// Whether containers with this sub-filter must carry an ESS
    /// signing-certificate attribute.
    pub fn requires_cades(&self) -> bool {
        matches!(self, SubFilter::EtsiCadesDetached)
    }

    /// Whether the container is an RFC 3161 document timestamp rather
    /// than a signature.
    pub fn is_document_timestamp(&self) -> bool {
        matches!(self, SubFilter::EtsiRfc3161)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_filter_name_roundtrip() {
        for sf in [
            SubFilter::AdbePkcs7Detached,
            SubFilter::AdbePkcs7Sha1,
            SubFilter::EtsiCadesDetached,
            SubFilter::EtsiRfc3161,
        ] {
            assert_eq!(SubFilter::from_pdf_name(sf.as_pdf_name()), Some(sf));
        }
        assert_eq!(SubFilter::from_pdf_name("adbe.x509.rsa_sha1"), None);
    }

    #[test]
    fn test_sub_filter_classification() {
        assert!(SubFilter::EtsiCadesDetached.requires_cades());
        assert!(!SubFilter::AdbePkcs7Detached.requires_cades());
        assert!(SubFilter::EtsiRfc3161.is_document_timestamp());
    }
}
