//! Signing-path construction of CMS signed-data containers.
//!
//! The builder is a state machine mirroring the external-signature flow:
//! configure a [`CmsSigner`], derive the signed attributes from the document
//! digest ([`CmsWithAttributes`]), hand the attribute bytes to whoever holds
//! the key, install the signature value ([`CmsWithSignature`]), optionally
//! add a signature timestamp, and encode. Each phase only offers the
//! operations that are valid at that point, so attributes cannot change
//! after they have been signed.

use der::asn1::{Any, OctetString, SetOfVec};
use der::{Decode, Encode, Tag};
use spki::AlgorithmIdentifierOwned;
use x509_cert::attr::Attribute;

use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
use cms::content_info::{CmsVersion, ContentInfo};
use cms::revocation::{OtherRevocationInfoFormat, RevocationInfoChoice, RevocationInfoChoices};
use cms::signed_data::{
    CertificateSet, EncapsulatedContentInfo, SignedData, SignerInfo, SignerInfos,
    SignerIdentifier,
};

use crate::cert::CertificateChain;
use crate::clients::{ExternalSigner, TimestampClient};
use crate::cms::attributes;
use crate::digest::DigestAlgorithm;
use crate::error::{Error, Result};
use crate::{crypto, oid, ocsp};

/// Configuration phase of the signing path.
#[derive(Debug)]
pub struct CmsSigner {
    chain: CertificateChain,
    digest: DigestAlgorithm,
    mechanism: der::asn1::ObjectIdentifier,
    mechanism_params: Option<Vec<u8>>,
    cades: bool,
    content_type: der::asn1::ObjectIdentifier,
    content: Option<Vec<u8>>,
    reserved_size: Option<usize>,
    signing_time: Option<i64>,
    crls: Vec<Vec<u8>>,
    ocsps: Vec<Vec<u8>>,
}

impl CmsSigner {
    /// Start building a container signed by `chain[0]` with the given
    /// digest algorithm and signature mechanism.
    pub fn new(
        chain: CertificateChain,
        digest: DigestAlgorithm,
        mechanism: der::asn1::ObjectIdentifier,
    ) -> Self {
        CmsSigner {
            chain,
            digest,
            mechanism,
            mechanism_params: None,
            cades: false,
            content_type: oid::ID_DATA,
            content: None,
            reserved_size: None,
            signing_time: None,
            crls: Vec::new(),
            ocsps: Vec::new(),
        }
    }

    /// Start from an [`ExternalSigner`]'s declared algorithms.
    pub fn for_signer(chain: CertificateChain, signer: &dyn ExternalSigner) -> Result<Self> {
        let digest = DigestAlgorithm::from_name(signer.digest_algorithm_name())?;
        let mut builder = CmsSigner::new(chain, digest, signer.signature_mechanism_oid());
        builder.mechanism_params = signer.mechanism_params();
        Ok(builder)
    }

    /// DER mechanism parameters (RSASSA-PSS).
    pub fn with_mechanism_params(mut self, params: Vec<u8>) -> Self {
        self.mechanism_params = Some(params);
        self
    }

    /// Add the ESS signingCertificateV2 attribute (CAdES baseline).
    pub fn with_cades(mut self) -> Self {
        self.cades = true;
        self
    }

    /// Encapsulate `content` instead of producing a detached signature.
    pub fn with_attached_content(mut self, content: Vec<u8>) -> Self {
        self.content = Some(content);
        self
    }

    /// Encapsulated content type other than id-data. Document timestamps
    /// encapsulate a TSTInfo under id-ct-TSTInfo.
    pub fn with_content_type(mut self, content_type: der::asn1::ObjectIdentifier) -> Self {
        self.content_type = content_type;
        self
    }

    /// Fail encoding when the container exceeds `size` bytes.
    pub fn with_reserved_size(mut self, size: usize) -> Self {
        self.reserved_size = Some(size);
        self
    }

    /// Claimed signing time (unix seconds), emitted as the signing-time
    /// signed attribute.
    pub fn with_signing_time(mut self, unix_secs: i64) -> Self {
        self.signing_time = Some(unix_secs);
        self
    }

    /// Archive revocation material in the container: DER CRLs and DER
    /// `BasicOCSPResponse`s. They populate both the
    /// adbe-revocationInfoArchival signed attribute and the SignedData
    /// `crls` field.
    pub fn with_revocation_evidence(mut self, crls: Vec<Vec<u8>>, ocsps: Vec<Vec<u8>>) -> Self {
        self.crls = crls;
        self.ocsps = ocsps;
        self
    }

    /// Build the signed attributes over the digest of the signed content.
    ///
    /// Rejects inconsistent algorithm choices up front: Ed25519 demands
    /// SHA-512, Ed448 is not supported for signing, and RSASSA-PSS
    /// parameters must be present and agree with the digest algorithm.
    pub fn build_signed_attributes(self, document_digest: &[u8]) -> Result<CmsWithAttributes> {
        self.check_algorithm_policy()?;
        if self.chain.is_empty() {
            return Err(Error::SigningCertificateNotFound);
        }

        let mut attrs: SetOfVec<Attribute> = SetOfVec::new();
        attrs.insert(attributes::content_type_attribute(self.content_type)?)?;
        attrs.insert(attributes::message_digest_attribute(document_digest)?)?;
        if let Some(time) = self.signing_time {
            attrs.insert(attributes::signing_time_attribute(time)?)?;
        }
        if !self.crls.is_empty() || !self.ocsps.is_empty() {
            let wrapped: Vec<Vec<u8>> = self
                .ocsps
                .iter()
                .map(|basic| ocsp::wrap_basic_response(basic))
                .collect::<Result<_>>()?;
            attrs.insert(attributes::revocation_archival_attribute(&self.crls, &wrapped)?)?;
        }
        if self.cades {
            attrs.insert(attributes::signing_certificate_v2_attribute(
                &self.chain[0],
                self.digest,
            )?)?;
        }

        // The DER SET OF encoding is exactly what gets signed (RFC 5652
        // §5.4).
        let attrs_der = attrs.to_der()?;

        Ok(CmsWithAttributes {
            config: self,
            attrs,
            attrs_der,
        })
    }

    fn check_algorithm_policy(&self) -> Result<()> {
        if self.mechanism == oid::ED25519 && self.digest != DigestAlgorithm::Sha512 {
            return Err(Error::AlgorithmMismatch {
                expected: "Ed25519 with SHA-512".to_string(),
                found: self.digest.name().to_string(),
            });
        }
        if self.mechanism == oid::ED448 {
            return Err(Error::UnsupportedAlgorithm("Ed448 signing".to_string()));
        }
        if self.mechanism == oid::RSASSA_PSS {
            let params = self.mechanism_params.as_ref().ok_or_else(|| {
                Error::AlgorithmMismatch {
                    expected: "RSASSA-PSS with explicit parameters".to_string(),
                    found: "absent parameters".to_string(),
                }
            })?;
            crypto::validate_pss_params(params, Some(self.digest))?;
        }
        Ok(())
    }
}

/// Attributes are fixed; the signature value is still outstanding.
#[derive(Debug)]
pub struct CmsWithAttributes {
    config: CmsSigner,
    attrs: SetOfVec<Attribute>,
    attrs_der: Vec<u8>,
}

impl CmsWithAttributes {
    /// The exact bytes to be signed: the DER `SET OF` of the signed
    /// attributes.
    pub fn signed_attributes_der(&self) -> &[u8] {
        &self.attrs_der
    }

    /// Install an externally produced signature value.
    pub fn set_signature(self, signature: Vec<u8>) -> CmsWithSignature {
        CmsWithSignature {
            config: self.config,
            attrs: self.attrs,
            signature,
            unsigned: Vec::new(),
        }
    }

    /// Sign the attribute bytes with `signer` and install the result.
    pub fn sign_with(self, signer: &dyn ExternalSigner) -> Result<CmsWithSignature> {
        let signature = signer.sign(&self.attrs_der)?;
        Ok(self.set_signature(signature))
    }
}

/// Signature installed; unsigned attributes and encoding remain.
pub struct CmsWithSignature {
    config: CmsSigner,
    attrs: SetOfVec<Attribute>,
    signature: Vec<u8>,
    unsigned: Vec<Attribute>,
}

impl CmsWithSignature {
    /// Request an RFC 3161 token over the signature value and attach it as
    /// the id-aa-timeStampToken unsigned attribute.
    pub fn add_timestamp(&mut self, client: &dyn TimestampClient) -> Result<()> {
        let imprint = client.digest_algorithm().digest(&self.signature);
        let token = client.request_token(&imprint)?;
        let value = Any::from_der(&token)
            .map_err(|e| Error::Timestamp(format!("token is not valid DER: {}", e)))?;
        self.unsigned
            .push(attributes::single_valued_attribute(oid::ATTR_TIMESTAMP_TOKEN, value)?);
        Ok(())
    }

    /// Assemble and DER-encode the final ContentInfo.
    pub fn encode(self) -> Result<Vec<u8>> {
        let config = &self.config;
        let leaf = config
            .chain
            .first()
            .ok_or(Error::SigningCertificateNotFound)?;

        let digest_alg = AlgorithmIdentifierOwned {
            oid: config.digest.oid(),
            parameters: Some(Any::new(Tag::Null, vec![])?),
        };
        let signature_algorithm = AlgorithmIdentifierOwned {
            oid: config.mechanism,
            parameters: match &config.mechanism_params {
                Some(params) => Some(Any::from_der(params)?),
                None if config.mechanism == oid::RSA_ENCRYPTION => {
                    Some(Any::new(Tag::Null, vec![])?)
                },
                None => None,
            },
        };

        let sid = SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
            issuer: x509_cert::name::Name::from_der(leaf.issuer_raw())?,
            serial_number: x509_cert::serial_number::SerialNumber::new(leaf.serial())?,
        });

        let crls = self.revocation_choices()?;

        let unsigned_attrs = if self.unsigned.is_empty() {
            None
        } else {
            let mut set = SetOfVec::new();
            for attr in self.unsigned {
                set.insert(attr)?;
            }
            Some(set)
        };

        let signer_info = SignerInfo {
            version: CmsVersion::V1,
            sid,
            digest_alg: digest_alg.clone(),
            signed_attrs: Some(self.attrs),
            signature_algorithm,
            signature: OctetString::new(self.signature.as_slice())?,
            unsigned_attrs,
        };

        let mut digest_algorithms = SetOfVec::new();
        digest_algorithms.insert(digest_alg)?;

        let mut cert_choices = Vec::with_capacity(config.chain.len());
        for cert in &config.chain {
            cert_choices.push(CertificateChoices::Certificate(cert.to_x509()?));
        }

        let version = if crls
            .as_ref()
            .map(|c| c.0.iter().any(|r| matches!(r, RevocationInfoChoice::Other(_))))
            .unwrap_or(false)
        {
            CmsVersion::V5
        } else {
            CmsVersion::V1
        };

        let signed_data = SignedData {
            version,
            digest_algorithms,
            encap_content_info: EncapsulatedContentInfo {
                econtent_type: config.content_type,
                econtent: match &config.content {
                    Some(content) => Some(Any::new(Tag::OctetString, content.clone())?),
                    None => None,
                },
            },
            certificates: Some(CertificateSet(SetOfVec::try_from(cert_choices)?)),
            crls,
            signer_infos: SignerInfos(SetOfVec::try_from(vec![signer_info])?),
        };

        let content_info = ContentInfo {
            content_type: oid::ID_SIGNED_DATA,
            content: Any::encode_from(&signed_data)?,
        };
        let encoded = content_info.to_der()?;

        if let Some(reserved) = config.reserved_size {
            if encoded.len() > reserved {
                return Err(Error::ReservedSpaceExceeded {
                    needed: encoded.len(),
                    reserved,
                });
            }
        }
        Ok(encoded)
    }

    fn revocation_choices(&self) -> Result<Option<RevocationInfoChoices>> {
        let config = &self.config;
        if config.crls.is_empty() && config.ocsps.is_empty() {
            return Ok(None);
        }
        let mut choices = Vec::new();
        for crl in &config.crls {
            choices.push(RevocationInfoChoice::Crl(
                x509_cert::crl::CertificateList::from_der(crl)?,
            ));
        }
        for basic in &config.ocsps {
            choices.push(RevocationInfoChoice::Other(OtherRevocationInfoFormat {
                other_format: AlgorithmIdentifierOwned {
                    oid: oid::ID_PKIX_OCSP_BASIC,
                    parameters: None,
                },
                other: Any::from_der(basic)?,
            }));
        }
        Ok(Some(RevocationInfoChoices(SetOfVec::try_from(choices)?)))
    }
}
