// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::match_like_matches_macro)]

//! # pdf-ltv
//!
//! PDF digital-signature creation and long-term-validation (LTV) core.
//!
//! ## Core Features
//!
//! ### Signing
//! - **CMS/PKCS#7 containers**: phased builder producing RFC 5652
//!   SignedData with authenticated attributes, suitable for
//!   adbe.pkcs7.detached and ETSI.CAdES.detached signatures
//! - **External signers**: signing is delegated through a trait, so HSMs
//!   and remote services plug in; a PKCS#1 v1.5 RSA signer is included
//! - **Timestamps**: RFC 3161 tokens attached as the
//!   id-aa-timeStampToken unsigned attribute
//! - **Archived revocation data**: CRLs and OCSP responses embedded in
//!   the SignedData `crls` field or the Adobe revocation attribute
//!
//! ### Verification
//! - **Container parsing**: single-signer SignedData with CAdES
//!   signing-certificate binding checks and a cached integrity predicate
//! - **Chain reconstruction**: missing issuers retrieved via the AIA
//!   caIssuers extension and known/trusted certificate lookup
//! - **Verifier chain**: root-store, CRL and OCSP verifiers accumulate
//!   positive evidence per certificate at a given date; "revoked" is a
//!   hard error, "no evidence" is not
//!
//! ### Long-term validation
//! - **DSS/VRI model**: revocation evidence merged into shared stream
//!   arrays with per-signature index entries, keyed by signature hash
//!
//! ## Architecture
//! - **Pluggable I/O**: CRL, OCSP, AIA and timestamp fetching go through
//!   traits; the core never opens a socket
//! - **Opaque DER ownership**: parsed structures keep the exact bytes
//!   signatures were computed over, so verification never depends on
//!   re-encoding round-trips
//!
//! ## Quick Start
//!
//! ```ignore
//! use pdf_ltv::cms::{CmsSigner, CmsSignedData};
//! use pdf_ltv::clients::RsaSigner;
//! use pdf_ltv::digest::DigestAlgorithm;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Sign: build attributes, sign them externally, encode.
//! let signer = RsaSigner::from_pkcs8_der(&key_der, DigestAlgorithm::Sha256)?;
//! let container = CmsSigner::for_signer(chain, &signer)
//!     .with_signing_time(unix_now)
//!     .build_signed_attributes(&document_digest)?
//!     .sign_with(&signer)?
//!     .encode()?;
//!
//! // Verify: parse and check integrity against the signed byte range.
//! let parsed = CmsSignedData::parse(&container)?;
//! assert!(parsed.verify_signature_integrity_and_authenticity(Some(&byte_range))?);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// Algorithm tables and digests
pub mod digest;
pub mod oid;

// Certificates, trust anchors, chain reconstruction
pub mod cert;
pub mod retriever;
pub mod trust;

// Pluggable I/O and signing interfaces
pub mod clients;

// Revocation data structures
pub mod ocsp;

// Certificate verification chain
pub mod verify;

// CMS signed-data engine
pub mod cms;

// DSS/VRI evidence accumulation
pub mod ltv;

pub(crate) mod crypto;

pub use cert::{is_complete_chain, parse_certificates, Certificate, CertificateChain};
pub use cms::{CmsSignedData, CmsSigner, SubFilter};
pub use digest::DigestAlgorithm;
pub use error::{Error, Result};
pub use ltv::{DssData, LtvStore};
pub use retriever::IssuingCertificateRetriever;
pub use trust::{TrustAnchorStore, TrustScope};
pub use verify::{CrlVerifier, OcspVerifier, RootStoreVerifier, VerifierPipeline};
