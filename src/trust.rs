//! Trust anchor store with scoped trust partitions.
//!
//! Anchors are trusted for everything, or only for CRL issuance, OCSP
//! response signing, or timestamping. The store is filled once before
//! verification begins and then only read; there is no interior mutability.

use std::collections::HashMap;

use crate::cert::Certificate;

/// What a certificate in the store is trusted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrustScope {
    /// Trusted for any purpose, including issuing end-entity chains.
    GenerallyTrusted,
    /// Trusted only as a CRL issuer.
    CrlIssuance,
    /// Trusted only as an OCSP response signer.
    OcspIssuance,
    /// Trusted only as a timestamping authority.
    Timestamping,
}

/// Collection of trust anchors, partitioned by [`TrustScope`] and indexed
/// by subject name for issuer lookup.
#[derive(Default)]
pub struct TrustAnchorStore {
    anchors: Vec<(Certificate, TrustScope)>,
    by_subject: HashMap<String, Vec<usize>>,
}

impl TrustAnchorStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an anchor under the given scope. The same certificate may be
    /// added under several scopes.
    pub fn add(&mut self, cert: Certificate, scope: TrustScope) {
        let subject = cert.subject().to_string();
        let idx = self.anchors.len();
        self.anchors.push((cert, scope));
        self.by_subject.entry(subject).or_default().push(idx);
    }

    /// Add a generally-trusted anchor.
    pub fn add_trusted(&mut self, cert: Certificate) {
        self.add(cert, TrustScope::GenerallyTrusted);
    }

    /// All anchors whose subject name equals `subject` exactly. Subject
    /// names are not unique, so this returns every candidate.
    pub fn by_subject(&self, subject: &str) -> Vec<&Certificate> {
        self.by_subject
            .get(subject)
            .map(|idxs| idxs.iter().map(|&i| &self.anchors[i].0).collect())
            .unwrap_or_default()
    }

    /// Whether `cert` (by DER byte equality) is in the store under a scope
    /// that covers `scope`. Generally-trusted anchors cover every scope.
    pub fn is_trusted(&self, cert: &Certificate, scope: TrustScope) -> bool {
        self.anchors.iter().any(|(anchor, s)| {
            anchor == cert && (*s == TrustScope::GenerallyTrusted || *s == scope)
        })
    }

    /// Whether `cert` is a generally-trusted anchor.
    pub fn is_generally_trusted(&self, cert: &Certificate) -> bool {
        self.is_trusted(cert, TrustScope::GenerallyTrusted)
    }

    /// Iterate over the generally-trusted anchors.
    pub fn general_anchors(&self) -> impl Iterator<Item = &Certificate> {
        self.anchors
            .iter()
            .filter(|(_, s)| *s == TrustScope::GenerallyTrusted)
            .map(|(c, _)| c)
    }

    /// Iterate over every anchor regardless of scope.
    pub fn all_anchors(&self) -> impl Iterator<Item = &Certificate> {
        self.anchors.iter().map(|(c, _)| c)
    }

    /// Number of anchors, counting one per (certificate, scope) entry.
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Whether the store has no anchors.
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}
