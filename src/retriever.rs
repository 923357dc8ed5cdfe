//! Issuing-certificate retrieval: completing certificate chains.
//!
//! Signature containers frequently ship an incomplete chain. This module
//! rebuilds the path toward a self-signed root using, in order: the
//! remaining input certificates, the AIA caIssuers extension (through a
//! pluggable [`AiaClient`]), the trust anchor store, and a side map of
//! previously seen certificates. Reconstruction is best-effort: when no
//! issuer can be found the partial chain is returned as-is, never an error.

use std::collections::HashMap;

use x509_parser::prelude::*;

use crate::cert::{parse_certificates, Certificate, CertificateChain};
use crate::clients::AiaClient;
use crate::ocsp::BasicOcspResponse;
use crate::oid;
use crate::trust::TrustAnchorStore;

/// Hard cap on reconstructed chain length, against issuer cycles.
const MAX_CHAIN_LEN: usize = 32;

/// Completes certificate chains and locates issuer certificates for CRLs
/// and OCSP responses.
pub struct IssuingCertificateRetriever<'a> {
    trusted: &'a TrustAnchorStore,
    aia_client: Option<Box<dyn AiaClient + 'a>>,
    known: HashMap<String, Vec<Certificate>>,
}

impl<'a> IssuingCertificateRetriever<'a> {
    /// Create a retriever over the given trust anchors, with no network
    /// access.
    pub fn new(trusted: &'a TrustAnchorStore) -> Self {
        IssuingCertificateRetriever {
            trusted,
            aia_client: None,
            known: HashMap::new(),
        }
    }

    /// Enable AIA caIssuers fetching through `client`.
    pub fn with_aia_client(mut self, client: Box<dyn AiaClient + 'a>) -> Self {
        self.aia_client = Some(client);
        self
    }

    /// Record certificates that have been seen (in a CMS container, a
    /// previous fetch, a DSS) but are not necessarily trusted. They become
    /// issuer candidates for later lookups.
    pub fn add_known_certificates(&mut self, certs: &[Certificate]) {
        for cert in certs {
            let entry = self.known.entry(cert.subject().to_string()).or_default();
            if !entry.contains(cert) {
                entry.push(cert.clone());
            }
        }
    }

    /// Complete `chain` (leaf first) toward a self-signed root.
    ///
    /// Each step extends the chain with, in order of preference: the next
    /// input certificate when it is the issuer, a certificate fetched from
    /// the current tail's AIA caIssuers URL, a trust anchor, or a known
    /// certificate. When no issuer is found the remaining input
    /// certificates are appended verbatim and the partial chain is
    /// returned.
    pub fn retrieve_missing_certificates(&self, chain: &[Certificate]) -> CertificateChain {
        let mut result: CertificateChain = match chain.first() {
            Some(leaf) => vec![leaf.clone()],
            None => return Vec::new(),
        };
        let mut input = chain[1..].iter();

        loop {
            let tail = match result.last() {
                Some(cert) => cert.clone(),
                None => break,
            };
            if tail.is_self_signed() || result.len() >= MAX_CHAIN_LEN {
                break;
            }

            let candidate = self
                .next_input_issuer(&tail, &mut input)
                .or_else(|| self.fetch_aia_issuer(&tail))
                .or_else(|| self.lookup_issuer(tail.issuer(), &tail));

            match candidate {
                Some(issuer) if !result.contains(&issuer) => result.push(issuer),
                _ => {
                    // Give up: keep whatever the caller supplied.
                    for rest in input {
                        if !result.contains(rest) {
                            result.push(rest.clone());
                        }
                    }
                    break;
                },
            }
        }
        result
    }

    /// Find the certificate that signed `response`.
    ///
    /// Embedded responder certificates are tried first, then every trust
    /// anchor. `None` is a normal outcome; the caller decides whether an
    /// unattributable response is usable.
    pub fn retrieve_ocsp_responder_certificate(
        &self,
        response: &BasicOcspResponse,
    ) -> Option<Certificate> {
        for cert in response.embedded_certificates() {
            if response.verify_signed_by(&cert).is_ok() {
                return Some(cert);
            }
        }
        for anchor in self.trusted.all_anchors() {
            if response.verify_signed_by(anchor).is_ok() {
                return Some(anchor.clone());
            }
        }
        None
    }

    /// Certificates forming the issuer chain of a DER-encoded CRL.
    ///
    /// Tries the CRL's own AIA extension first, then the trust anchors and
    /// known certificates by the CRL's issuer name, and completes the chain
    /// of whatever issuer is found. An empty result means the CRL issuer
    /// could not be located.
    pub fn crl_issuer_certificates(&self, crl_der: &[u8]) -> Vec<Certificate> {
        let (_, crl) = match CertificateRevocationList::from_der(crl_der) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("cannot parse CRL while locating its issuer: {}", e);
                return Vec::new();
            },
        };
        let issuer_name = crl.issuer().to_string();

        let mut issuers = Vec::new();
        for ext in crl.extensions() {
            if let ParsedExtension::AuthorityInfoAccess(aia) = ext.parsed_extension() {
                for desc in &aia.accessdescs {
                    if desc.access_method.to_id_string() != oid::AD_CA_ISSUERS.to_string() {
                        continue;
                    }
                    if let GeneralName::URI(url) = &desc.access_location {
                        issuers.extend(self.fetch_certificates(url));
                    }
                }
            }
        }
        if issuers.is_empty() {
            issuers.extend(self.trusted.by_subject(&issuer_name).into_iter().cloned());
        }
        if issuers.is_empty() {
            if let Some(known) = self.known.get(&issuer_name) {
                issuers.extend(known.iter().cloned());
            }
        }

        match issuers.into_iter().next() {
            Some(issuer) => self.retrieve_missing_certificates(&[issuer]),
            None => Vec::new(),
        }
    }

    /// Issuer candidates for `subject` from the trust anchors, then the
    /// known-certificates map, filtered to keys that actually verify
    /// `child`'s signature.
    fn lookup_issuer(&self, subject: &str, child: &Certificate) -> Option<Certificate> {
        for anchor in self.trusted.by_subject(subject) {
            if child.verify_signed_by(anchor).is_ok() {
                return Some(anchor.clone());
            }
        }
        for known in self.known.get(subject).into_iter().flatten() {
            if child.verify_signed_by(known).is_ok() {
                return Some(known.clone());
            }
        }
        None
    }

    fn next_input_issuer<'b>(
        &self,
        child: &Certificate,
        input: &mut std::slice::Iter<'b, Certificate>,
    ) -> Option<Certificate> {
        let next = input.clone().next()?;
        if next.subject() == child.issuer() {
            input.next();
            return Some(next.clone());
        }
        None
    }

    fn fetch_aia_issuer(&self, child: &Certificate) -> Option<Certificate> {
        for url in child.aia_ca_issuer_urls() {
            for cert in self.fetch_certificates(url) {
                if cert.subject() == child.issuer() && child.verify_signed_by(&cert).is_ok() {
                    return Some(cert);
                }
            }
        }
        None
    }

    /// Download and parse certificates from an AIA URL. Failures of any
    /// kind come back as an empty list.
    fn fetch_certificates(&self, url: &str) -> Vec<Certificate> {
        let client = match &self.aia_client {
            Some(client) => client,
            None => return Vec::new(),
        };
        match client.fetch(url) {
            Some(bytes) if !bytes.is_empty() => parse_certificates(&bytes),
            _ => {
                log::debug!("AIA fetch from {} returned nothing", url);
                Vec::new()
            },
        }
    }
}
