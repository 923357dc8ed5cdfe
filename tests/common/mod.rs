//! Shared fixtures: an in-memory CA hierarchy plus CRL and OCSP response
//! builders, all signed with freshly generated RSA keys.

#![allow(dead_code)]

use der::asn1::{Any, BitString, GeneralizedTime, Ia5String, OctetString, SetOfVec, UtcTime};
use der::{Decode, Encode};
use spki::AlgorithmIdentifierOwned;

use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::certificate::{TbsCertificate, Version};
use x509_cert::ext::pkix::crl::dp::DistributionPoint;
use x509_cert::ext::pkix::crl::CrlDistributionPoints;
use x509_cert::ext::pkix::name::{DistributionPointName, GeneralName};
use x509_cert::ext::pkix::{
    AccessDescription, AuthorityInfoAccessSyntax, BasicConstraints, ExtendedKeyUsage,
};
use x509_cert::ext::Extension;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use x509_cert::time::{Time, Validity};

use pdf_ltv::digest::DigestAlgorithm;
use pdf_ltv::ocsp::{
    build_cert_id, BasicOcspResponse, CertStatus, ResponderId, ResponseData, SingleResponse,
};
use pdf_ltv::{oid, Certificate};

/// A reference point inside every fixture certificate's validity window.
pub const NOW: i64 = 1_700_000_000;

/// Route library logs to the test harness (`RUST_LOG=debug` to see them).
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const OID_CN: der::asn1::ObjectIdentifier = der::asn1::ObjectIdentifier::new_unwrap("2.5.4.3");
const OID_BASIC_CONSTRAINTS: der::asn1::ObjectIdentifier =
    der::asn1::ObjectIdentifier::new_unwrap("2.5.29.19");
const OID_AIA: der::asn1::ObjectIdentifier =
    der::asn1::ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.1.1");
const OID_EKU: der::asn1::ObjectIdentifier =
    der::asn1::ObjectIdentifier::new_unwrap("2.5.29.37");
const OID_CRL_DP: der::asn1::ObjectIdentifier =
    der::asn1::ObjectIdentifier::new_unwrap("2.5.29.31");

/// A key pair and the certificate carrying its public half.
pub struct TestIdentity {
    pub key: rsa::RsaPrivateKey,
    pub cert: Certificate,
}

/// Knobs for [`build_identity`]; the helpers below cover the common cases.
pub struct CertSpec<'a> {
    pub subject_cn: &'a str,
    pub serial: &'a [u8],
    pub is_ca: bool,
    pub aia_ca_issuers: Option<&'a str>,
    pub aia_ocsp: Option<&'a str>,
    pub crl_dp: Option<&'a str>,
    pub eku_ocsp_signing: bool,
}

fn rsa_key() -> rsa::RsaPrivateKey {
    let mut rng = rand::thread_rng();
    rsa::RsaPrivateKey::new(&mut rng, 2048).expect("RSA key generation failed")
}

fn sign_sha256(key: &rsa::RsaPrivateKey, message: &[u8]) -> Vec<u8> {
    let hashed = DigestAlgorithm::Sha256.digest(message);
    key.sign(rsa::Pkcs1v15Sign::new::<sha2::Sha256>(), &hashed)
        .expect("RSA signing failed")
}

fn sha256_with_rsa() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: oid::SHA256_WITH_RSA,
        parameters: Some(Any::new(der::Tag::Null, vec![]).expect("NULL params")),
    }
}

fn cn_name(cn: &str) -> Name {
    let value = Any::new(der::Tag::Utf8String, cn.as_bytes()).expect("CN value");
    let attr = AttributeTypeAndValue {
        oid: OID_CN,
        value,
    };
    let mut rdn_set = SetOfVec::new();
    rdn_set.insert(attr).expect("RDN set");
    RdnSequence(vec![RelativeDistinguishedName::from(rdn_set)])
}

fn spki_for(key: &rsa::RsaPrivateKey) -> SubjectPublicKeyInfoOwned {
    use rsa::pkcs8::EncodePublicKey;
    let der = rsa::RsaPublicKey::from(key)
        .to_public_key_der()
        .expect("SPKI encoding");
    SubjectPublicKeyInfoOwned::from_der(der.as_bytes()).expect("SPKI decoding")
}

fn utc(secs: i64) -> Time {
    Time::UtcTime(
        UtcTime::from_unix_duration(std::time::Duration::from_secs(secs as u64))
            .expect("UTCTime"),
    )
}

/// GeneralizedTime from unix seconds.
pub fn gt(secs: i64) -> GeneralizedTime {
    GeneralizedTime::from_unix_duration(std::time::Duration::from_secs(secs as u64))
        .expect("GeneralizedTime")
}

fn extensions_for(spec: &CertSpec) -> Option<Vec<Extension>> {
    let mut extensions = Vec::new();

    let bc = BasicConstraints {
        ca: spec.is_ca,
        path_len_constraint: None,
    };
    extensions.push(Extension {
        extn_id: OID_BASIC_CONSTRAINTS,
        critical: true,
        extn_value: OctetString::new(bc.to_der().expect("basicConstraints"))
            .expect("extension value"),
    });

    let mut access = Vec::new();
    if let Some(url) = spec.aia_ca_issuers {
        access.push(AccessDescription {
            access_method: oid::AD_CA_ISSUERS,
            access_location: GeneralName::UniformResourceIdentifier(
                Ia5String::new(url).expect("AIA URL"),
            ),
        });
    }
    if let Some(url) = spec.aia_ocsp {
        access.push(AccessDescription {
            access_method: oid::AD_OCSP,
            access_location: GeneralName::UniformResourceIdentifier(
                Ia5String::new(url).expect("OCSP URL"),
            ),
        });
    }
    if !access.is_empty() {
        let aia = AuthorityInfoAccessSyntax(access);
        extensions.push(Extension {
            extn_id: OID_AIA,
            critical: false,
            extn_value: OctetString::new(aia.to_der().expect("AIA")).expect("extension value"),
        });
    }

    if let Some(url) = spec.crl_dp {
        let points = CrlDistributionPoints(vec![DistributionPoint {
            distribution_point: Some(DistributionPointName::FullName(vec![
                GeneralName::UniformResourceIdentifier(Ia5String::new(url).expect("CRL-DP URL")),
            ])),
            reasons: None,
            crl_issuer: None,
        }]);
        extensions.push(Extension {
            extn_id: OID_CRL_DP,
            critical: false,
            extn_value: OctetString::new(points.to_der().expect("CRL-DP"))
                .expect("extension value"),
        });
    }

    if spec.eku_ocsp_signing {
        let eku = ExtendedKeyUsage(vec![oid::EKU_OCSP_SIGNING]);
        extensions.push(Extension {
            extn_id: OID_EKU,
            critical: false,
            extn_value: OctetString::new(eku.to_der().expect("EKU")).expect("extension value"),
        });
    }

    Some(extensions)
}

/// Build a certificate for a fresh key, signed by `issuer` (or self-signed
/// when `issuer` is `None`).
pub fn build_identity(spec: CertSpec, issuer: Option<&TestIdentity>) -> TestIdentity {
    let key = rsa_key();
    let subject = cn_name(spec.subject_cn);
    let (issuer_name, signing_key) = match issuer {
        Some(id) => (
            Name::from_der(id.cert.subject_raw()).expect("issuer name"),
            &id.key,
        ),
        None => (subject.clone(), &key),
    };

    let tbs = TbsCertificate {
        version: Version::V3,
        serial_number: SerialNumber::new(spec.serial).expect("serial"),
        signature: sha256_with_rsa(),
        issuer: issuer_name,
        validity: Validity {
            not_before: utc(NOW - 86_400),
            not_after: utc(NOW + 365 * 86_400),
        },
        subject,
        subject_public_key_info: spki_for(&key),
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: extensions_for(&spec),
    };

    let signature = sign_sha256(signing_key, &tbs.to_der().expect("TBS encoding"));
    let cert = x509_cert::Certificate {
        tbs_certificate: tbs,
        signature_algorithm: sha256_with_rsa(),
        signature: BitString::from_bytes(&signature).expect("signature bits"),
    };
    let der = cert.to_der().expect("certificate encoding");
    TestIdentity {
        key,
        cert: Certificate::from_der(&der).expect("certificate parse"),
    }
}

/// A self-signed CA.
pub fn self_signed_ca(cn: &str) -> TestIdentity {
    build_identity(
        CertSpec {
            subject_cn: cn,
            serial: &[0x01],
            is_ca: true,
            aia_ca_issuers: None,
            aia_ocsp: None,
            crl_dp: None,
            eku_ocsp_signing: false,
        },
        None,
    )
}

/// An end-entity certificate issued by `ca`.
pub fn issue(ca: &TestIdentity, cn: &str, serial: &[u8]) -> TestIdentity {
    build_identity(
        CertSpec {
            subject_cn: cn,
            serial,
            is_ca: false,
            aia_ca_issuers: None,
            aia_ocsp: None,
            crl_dp: None,
            eku_ocsp_signing: false,
        },
        Some(ca),
    )
}

/// A CRL signed by `issuer`, listing the given (serial, revocation date)
/// pairs.
pub fn build_crl(
    issuer: &TestIdentity,
    revoked: &[(&[u8], i64)],
    this_update: i64,
    next_update: i64,
) -> Vec<u8> {
    use x509_cert::crl::{CertificateList, RevokedCert, TbsCertList};

    let revoked_certificates = if revoked.is_empty() {
        None
    } else {
        Some(
            revoked
                .iter()
                .map(|(serial, date)| RevokedCert {
                    serial_number: SerialNumber::new(serial).expect("revoked serial"),
                    revocation_date: utc(*date),
                    crl_entry_extensions: None,
                })
                .collect(),
        )
    };

    let tbs = TbsCertList {
        version: Version::V2,
        signature: sha256_with_rsa(),
        issuer: Name::from_der(issuer.cert.subject_raw()).expect("CRL issuer name"),
        this_update: utc(this_update),
        next_update: Some(utc(next_update)),
        revoked_certificates,
        crl_extensions: None,
    };

    let signature = sign_sha256(&issuer.key, &tbs.to_der().expect("TBS cert list"));
    let crl = CertificateList {
        tbs_cert_list: tbs,
        signature_algorithm: sha256_with_rsa(),
        signature: BitString::from_bytes(&signature).expect("CRL signature bits"),
    };
    crl.to_der().expect("CRL encoding")
}

/// A DER `BasicOCSPResponse` about `cert`/`issuer`, signed by `signer`.
pub fn build_ocsp_response(
    signer: &TestIdentity,
    cert: &Certificate,
    issuer: &Certificate,
    status: CertStatus,
    this_update: i64,
    next_update: Option<i64>,
) -> Vec<u8> {
    build_ocsp_response_with_certs(signer, cert, issuer, status, this_update, next_update, &[])
}

/// Like [`build_ocsp_response`], with certificates embedded in the
/// response (the delegated-responder layout).
pub fn build_ocsp_response_with_certs(
    signer: &TestIdentity,
    cert: &Certificate,
    issuer: &Certificate,
    status: CertStatus,
    this_update: i64,
    next_update: Option<i64>,
    embedded: &[&Certificate],
) -> Vec<u8> {
    let data = ResponseData {
        version: 0,
        responder_id: ResponderId::ByName(
            Name::from_der(signer.cert.subject_raw()).expect("responder name"),
        ),
        produced_at: gt(this_update),
        responses: vec![SingleResponse {
            cert_id: build_cert_id(cert, issuer, DigestAlgorithm::Sha256).expect("CertID"),
            cert_status: status,
            this_update: gt(this_update),
            next_update: next_update.map(gt),
            single_extensions: None,
        }],
        response_extensions: None,
    };

    let tbs = Any::encode_from(&data).expect("ResponseData encoding");
    let signature = sign_sha256(&signer.key, &tbs.to_der().expect("TBS bytes"));
    let certs = if embedded.is_empty() {
        None
    } else {
        Some(
            embedded
                .iter()
                .map(|c| c.to_x509().expect("embedded certificate"))
                .collect(),
        )
    };
    let response = BasicOcspResponse {
        tbs,
        signature_algorithm: sha256_with_rsa(),
        signature: BitString::from_bytes(&signature).expect("OCSP signature bits"),
        certs,
    };
    response.to_der().expect("BasicOCSPResponse encoding")
}
