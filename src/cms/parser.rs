//! Verification-path parsing of CMS signed-data containers.
//!
//! [`CmsSignedData::parse`] performs the structural checks up front (single
//! signer, locatable signing certificate, consistent attributes) and
//! extracts everything verification and LTV collection need: the chain,
//! archived revocation material, the timestamp token, and the exact signed
//! attribute bytes. The cryptographic integrity predicate is separate and
//! cached, since callers ask for it repeatedly.

use std::cell::Cell;

use der::asn1::{ObjectIdentifier, OctetString};
use der::{Decode, Encode};

use cms::cert::CertificateChoices;
use cms::content_info::ContentInfo;
use cms::revocation::RevocationInfoChoice;
use cms::signed_data::{SignedData, SignerIdentifier, SignerInfo};

use crate::cert::{Certificate, CertificateChain};
use crate::cms::attributes::{
    self, check_signing_certificate_attr, find_attribute, RevocationInfoArchival,
};
use crate::cms::timestamp::{self, TstInfo};
use crate::digest::DigestAlgorithm;
use crate::error::{Error, Result};
use crate::ocsp::{OcspResponse, OcspResponseStatus};
use crate::{crypto, oid};

/// A parsed single-signer CMS signed-data container.
#[derive(Debug)]
pub struct CmsSignedData {
    signer_info: SignerInfo,
    certificates: CertificateChain,
    signing_certificate: Certificate,
    chain: CertificateChain,
    signed_attrs_der: Option<Vec<u8>>,
    message_digest: Option<Vec<u8>>,
    signing_time: Option<i64>,
    has_signing_certificate_attr: bool,
    econtent_type: ObjectIdentifier,
    econtent: Option<Vec<u8>>,
    crls: Vec<Vec<u8>>,
    ocsps: Vec<Vec<u8>>,
    other_revocation_info: Vec<(String, Vec<u8>)>,
    verified: Cell<Option<bool>>,
}

impl CmsSignedData {
    /// Parse a DER ContentInfo holding signed data.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let content_info = ContentInfo::from_der(bytes)
            .map_err(|e| Error::MalformedCms(format!("not a ContentInfo: {}", e)))?;
        if content_info.content_type != oid::ID_SIGNED_DATA {
            return Err(Error::MalformedCms(format!(
                "content type {} is not id-signedData",
                content_info.content_type
            )));
        }
        let signed_data: SignedData = content_info
            .content
            .decode_as()
            .map_err(|e| Error::MalformedCms(format!("SignedData: {}", e)))?;

        let signer_count = signed_data.signer_infos.0.len();
        if signer_count != 1 {
            return Err(Error::MultipleSignerInfos(signer_count));
        }
        let signer_info = signed_data
            .signer_infos
            .0
            .iter()
            .next()
            .cloned()
            .ok_or(Error::MultipleSignerInfos(0))?;

        let certificates = extract_certificates(&signed_data);
        let signing_certificate = locate_signing_certificate(&signer_info, &certificates)?;
        let chain = order_chain(&signing_certificate, &certificates);

        let econtent_type = signed_data.encap_content_info.econtent_type;
        let econtent = match &signed_data.encap_content_info.econtent {
            Some(any) => {
                let wrapped: OctetString = any.decode_as().map_err(|e| {
                    Error::MalformedCms(format!("eContent is not an OCTET STRING: {}", e))
                })?;
                Some(wrapped.as_bytes().to_vec())
            },
            None => None,
        };

        let mut crls = Vec::new();
        let mut ocsps = Vec::new();
        let mut other_revocation_info = Vec::new();
        for choice in signed_data.crls.iter().flat_map(|c| c.0.iter()) {
            match choice {
                RevocationInfoChoice::Crl(list) => crls.push(list.to_der()?),
                RevocationInfoChoice::Other(other) => {
                    let bytes = other.other.to_der()?;
                    if other.other_format.oid == oid::ID_PKIX_OCSP_BASIC {
                        ocsps.push(bytes);
                    } else {
                        other_revocation_info.push((other.other_format.oid.to_string(), bytes));
                    }
                },
            }
        }

        let mut parsed = CmsSignedData {
            signer_info,
            certificates,
            signing_certificate,
            chain,
            signed_attrs_der: None,
            message_digest: None,
            signing_time: None,
            has_signing_certificate_attr: false,
            econtent_type,
            econtent,
            crls,
            ocsps,
            other_revocation_info,
            verified: Cell::new(None),
        };
        parsed.extract_signed_attributes()?;
        Ok(parsed)
    }

    fn extract_signed_attributes(&mut self) -> Result<()> {
        let attrs = match &self.signer_info.signed_attrs {
            Some(attrs) => attrs,
            None => return Ok(()),
        };
        self.signed_attrs_der = Some(attrs.to_der()?);

        if let Some(attr) = find_attribute(attrs, &oid::ATTR_CONTENT_TYPE) {
            let declared: ObjectIdentifier = attributes::single_value(attr)?;
            if declared != self.econtent_type {
                return Err(Error::MalformedCms(format!(
                    "content-type attribute {} does not match eContentType {}",
                    declared, self.econtent_type
                )));
            }
        }
        if let Some(attr) = find_attribute(attrs, &oid::ATTR_MESSAGE_DIGEST) {
            let value: OctetString = attributes::single_value(attr)?;
            self.message_digest = Some(value.as_bytes().to_vec());
        }
        if let Some(attr) = find_attribute(attrs, &oid::ATTR_SIGNING_TIME) {
            self.signing_time = Some(attributes::signing_time_value(attr)?);
        }

        let ess_attr = find_attribute(attrs, &oid::ATTR_SIGNING_CERTIFICATE_V2)
            .or_else(|| find_attribute(attrs, &oid::ATTR_SIGNING_CERTIFICATE));
        if let Some(attr) = ess_attr {
            check_signing_certificate_attr(attr, &self.signing_certificate)?;
            self.has_signing_certificate_attr = true;
        }

        if let Some(attr) = find_attribute(attrs, &oid::ATTR_ADBE_REVOCATION) {
            let archival: RevocationInfoArchival = attributes::single_value(attr)?;
            self.extract_archival(&archival);
        }
        Ok(())
    }

    /// Pull archived revocation material out of the Adobe attribute.
    /// Entries that fail to parse are shunted into the other-formats
    /// bucket rather than aborting the parse.
    fn extract_archival(&mut self, archival: &RevocationInfoArchival) {
        for crl in archival.crls.iter().flatten() {
            match crl
                .to_der()
                .map_err(Error::from)
                .and_then(|der| {
                    x509_cert::crl::CertificateList::from_der(&der)?;
                    Ok(der)
                })
            {
                Ok(der) => self.crls.push(der),
                Err(e) => {
                    log::warn!("archived CRL does not parse, keeping as opaque bytes: {}", e);
                    if let Ok(der) = crl.to_der() {
                        self.other_revocation_info
                            .push((oid::ATTR_ADBE_REVOCATION.to_string(), der));
                    }
                },
            }
        }
        for entry in archival.ocsps.iter().flatten() {
            let der = match entry.to_der() {
                Ok(der) => der,
                Err(e) => {
                    log::warn!("archived OCSP entry cannot be re-encoded: {}", e);
                    continue;
                },
            };
            match OcspResponse::from_der(&der) {
                Ok(wrapper) if wrapper.response_status == OcspResponseStatus::Successful => {
                    match wrapper.response_bytes {
                        Some(bytes) if bytes.response_type == oid::ID_PKIX_OCSP_BASIC => {
                            self.ocsps.push(bytes.response.as_bytes().to_vec());
                        },
                        _ => {
                            log::warn!("archived OCSP response has no basic response");
                            self.other_revocation_info
                                .push((oid::ATTR_ADBE_REVOCATION.to_string(), der));
                        },
                    }
                },
                _ => {
                    log::warn!("archived OCSP entry is not a successful OCSPResponse");
                    self.other_revocation_info
                        .push((oid::ATTR_ADBE_REVOCATION.to_string(), der));
                },
            }
        }
        for other in archival.other_rev_info.iter().flatten() {
            if let Ok(der) = other.to_der() {
                self.other_revocation_info
                    .push((oid::ATTR_ADBE_REVOCATION.to_string(), der));
            }
        }
    }

    /// The certificate referenced by the SignerInfo.
    pub fn signing_certificate(&self) -> &Certificate {
        &self.signing_certificate
    }

    /// Chain from the signing certificate toward the root, as orderable
    /// from the container's certificate set. Possibly incomplete.
    pub fn chain(&self) -> &CertificateChain {
        &self.chain
    }

    /// Every certificate carried by the container.
    pub fn certificates(&self) -> &CertificateChain {
        &self.certificates
    }

    /// Archived DER CRLs, from both the SignedData `crls` field and the
    /// Adobe archival attribute.
    pub fn crls(&self) -> &[Vec<u8>] {
        &self.crls
    }

    /// Archived DER `BasicOCSPResponse`s.
    pub fn ocsp_responses(&self) -> &[Vec<u8>] {
        &self.ocsps
    }

    /// Revocation material in formats this library does not interpret,
    /// as (format OID, DER bytes) pairs.
    pub fn other_revocation_info(&self) -> &[(String, Vec<u8>)] {
        &self.other_revocation_info
    }

    /// DER of the signed-attributes SET, the bytes the signature covers.
    pub fn signed_attributes_der(&self) -> Option<&[u8]> {
        self.signed_attrs_der.as_deref()
    }

    /// Claimed signing time from the signing-time attribute (unix
    /// seconds). Unauthenticated unless a timestamp confirms it.
    pub fn signing_time(&self) -> Option<i64> {
        self.signing_time
    }

    /// Whether an ESS signing-certificate attribute was present (and
    /// already validated against the signing certificate).
    pub fn is_cades(&self) -> bool {
        self.has_signing_certificate_attr
    }

    /// Error unless the container carries a validated ESS
    /// signing-certificate attribute, as CAdES requires.
    pub fn require_cades(&self) -> Result<()> {
        if self.has_signing_certificate_attr {
            Ok(())
        } else {
            Err(Error::CadesViolation(
                "missing signingCertificate/signingCertificateV2 attribute".to_string(),
            ))
        }
    }

    /// Encapsulated content type.
    pub fn econtent_type(&self) -> ObjectIdentifier {
        self.econtent_type
    }

    /// Encapsulated content bytes, when attached.
    pub fn econtent(&self) -> Option<&[u8]> {
        self.econtent.as_deref()
    }

    /// The raw signature value.
    pub fn signature_value(&self) -> &[u8] {
        self.signer_info.signature.as_bytes()
    }

    /// Declared digest algorithm OID of the signer.
    pub fn digest_algorithm_oid(&self) -> ObjectIdentifier {
        self.signer_info.digest_alg.oid
    }

    /// Declared signature mechanism OID.
    pub fn signature_mechanism_oid(&self) -> ObjectIdentifier {
        self.signer_info.signature_algorithm.oid
    }

    /// The DER timestamp token from the id-aa-timeStampToken unsigned
    /// attribute, when present.
    pub fn timestamp_token(&self) -> Option<Vec<u8>> {
        let attrs = self.signer_info.unsigned_attrs.as_ref()?;
        let attr = find_attribute(attrs, &oid::ATTR_TIMESTAMP_TOKEN)?;
        let any = attr.values.get(0)?;
        any.to_der().ok()
    }

    /// Parse the signature timestamp's TSTInfo, when a token is attached.
    pub fn timestamp_info(&self) -> Result<Option<TstInfo>> {
        match self.timestamp_token() {
            Some(token) => Ok(Some(timestamp::parse_timestamp_token(&token)?)),
            None => Ok(None),
        }
    }

    /// Whether the attached signature timestamp's imprint matches the
    /// signature value. `None` when no token is attached.
    pub fn timestamp_imprint_matches(&self) -> Result<Option<bool>> {
        match self.timestamp_info()? {
            Some(info) => Ok(Some(info.imprint_matches(self.signature_value())?)),
            None => Ok(None),
        }
    }

    /// For document-timestamp containers (eContentType id-ct-TSTInfo),
    /// the encapsulated TSTInfo.
    pub fn document_tst_info(&self) -> Result<Option<TstInfo>> {
        if self.econtent_type != oid::ID_CT_TST_INFO {
            return Ok(None);
        }
        let econtent = self
            .econtent
            .as_deref()
            .ok_or_else(|| Error::Timestamp("document timestamp has no eContent".to_string()))?;
        Ok(Some(
            TstInfo::from_der(econtent).map_err(|e| Error::Timestamp(format!("TSTInfo: {}", e)))?,
        ))
    }

    /// For document-timestamp containers: whether the encapsulated
    /// imprint matches `message` (the timestamped byte range).
    pub fn document_timestamp_imprint_matches(&self, message: &[u8]) -> Result<bool> {
        match self.document_tst_info()? {
            Some(info) => info.imprint_matches(message),
            None => Err(Error::Timestamp(
                "container is not a document timestamp".to_string(),
            )),
        }
    }

    /// Check the cryptographic integrity and authenticity of the
    /// signature.
    ///
    /// With signed attributes all three conditions must hold: the
    /// message-digest attribute equals the digest of the signed content,
    /// the signature verifies over the DER of the attribute set, and an
    /// attached encapsulated content (when the content was also supplied
    /// externally) hashes to the same value. Without attributes the
    /// signature is checked over the content directly.
    ///
    /// `external_content` carries the detached content (the PDF byte
    /// range). The result is cached; repeated calls do not re-verify.
    pub fn verify_signature_integrity_and_authenticity(
        &self,
        external_content: Option<&[u8]>,
    ) -> Result<bool> {
        if let Some(done) = self.verified.get() {
            return Ok(done);
        }
        let outcome = self.verify_uncached(external_content)?;
        self.verified.set(Some(outcome));
        Ok(outcome)
    }

    fn verify_uncached(&self, external_content: Option<&[u8]>) -> Result<bool> {
        let mechanism = &self.signer_info.signature_algorithm;
        let digest_oid = self.signer_info.digest_alg.oid;
        crypto::enforce_eddsa_digest_policy(&mechanism.oid, Some(digest_oid))?;
        let digest = DigestAlgorithm::from_oid(&digest_oid)?;

        let content = external_content
            .or(self.econtent.as_deref())
            .ok_or_else(|| {
                Error::MalformedCms(
                    "detached signature verified without external content".to_string(),
                )
            })?;

        let spki = self.signing_certificate.spki_der();
        let check = |message: &[u8]| -> Result<bool> {
            match crypto::verify_signature(
                spki,
                mechanism,
                Some(digest),
                message,
                self.signature_value(),
            ) {
                Ok(()) => Ok(true),
                Err(Error::SignatureInvalid(reason)) => {
                    log::debug!("signature check failed: {}", reason);
                    Ok(false)
                },
                Err(other) => Err(other),
            }
        };

        match &self.signed_attrs_der {
            Some(attrs_der) => {
                let declared = self.message_digest.as_deref().ok_or_else(|| {
                    Error::MalformedCms("signed attributes without message-digest".to_string())
                })?;
                if digest.digest(content) != declared {
                    return Ok(false);
                }
                if let (Some(econtent), Some(_)) = (&self.econtent, external_content) {
                    if digest.digest(econtent) != declared {
                        return Ok(false);
                    }
                }
                check(attrs_der)
            },
            None => check(content),
        }
    }
}

fn extract_certificates(signed_data: &SignedData) -> CertificateChain {
    let mut out = Vec::new();
    for choice in signed_data.certificates.iter().flat_map(|set| set.0.iter()) {
        match choice {
            CertificateChoices::Certificate(cert) => {
                match cert
                    .to_der()
                    .map_err(Error::from)
                    .and_then(|der| Certificate::from_der(&der))
                {
                    Ok(parsed) => out.push(parsed),
                    Err(e) => log::warn!("skipping unparseable container certificate: {}", e),
                }
            },
            _ => log::debug!("skipping non-certificate entry in certificate set"),
        }
    }
    out
}

fn locate_signing_certificate(
    signer_info: &SignerInfo,
    certificates: &[Certificate],
) -> Result<Certificate> {
    let ias = match &signer_info.sid {
        SignerIdentifier::IssuerAndSerialNumber(ias) => ias,
        SignerIdentifier::SubjectKeyIdentifier(_) => {
            return Err(Error::MalformedCms(
                "subjectKeyIdentifier signer identification is not supported".to_string(),
            ));
        },
    };
    let issuer_der = ias.issuer.to_der()?;
    let serial = ias.serial_number.as_bytes();
    certificates
        .iter()
        .find(|cert| cert.matches_issuer_and_serial(&issuer_der, serial))
        .cloned()
        .ok_or(Error::SigningCertificateNotFound)
}

/// Order the container's certificates leaf-first by subject/issuer
/// linkage, starting at the signing certificate. Unrelated certificates
/// are left out.
fn order_chain(leaf: &Certificate, certificates: &[Certificate]) -> CertificateChain {
    let mut chain = vec![leaf.clone()];
    loop {
        let tail = match chain.last() {
            Some(cert) => cert.clone(),
            None => break,
        };
        if tail.is_self_signed() {
            break;
        }
        let next = certificates.iter().find(|cand| {
            cand.subject() == tail.issuer()
                && !chain.contains(cand)
                && tail.verify_signed_by(cand).is_ok()
        });
        match next {
            Some(cert) => chain.push(cert.clone()),
            None => break,
        }
    }
    chain
}
