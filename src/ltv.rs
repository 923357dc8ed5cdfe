//! Long-term-validation evidence accumulation (DSS/VRI).
//!
//! [`LtvStore`] collects certificate, CRL and OCSP bytes per signature and
//! merges them into a [`DssData`] model: shared `/Certs`, `/CRLs` and
//! `/OCSPs` stream arrays plus a `/VRI` map keyed by the uppercase-hex
//! SHA-1 of each signature's contents, whose entries reference the shared
//! arrays by index. Serializing the model into PDF objects is the
//! orchestration layer's job.

use std::collections::{BTreeMap, BTreeSet};

use der::{Decode, Encode, SliceReader};

use crate::cert::hex_string;
use crate::cms::SubFilter;
use crate::digest::DigestAlgorithm;
use crate::error::{Error, Result};

/// One signature's entry in the VRI dictionary: index references into the
/// shared [`DssData`] arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VriEntry {
    /// Indices into [`DssData::certs`].
    pub certs: Vec<usize>,
    /// Indices into [`DssData::crls`].
    pub crls: Vec<usize>,
    /// Indices into [`DssData::ocsps`].
    pub ocsps: Vec<usize>,
}

/// The persisted DSS structure, document-order arrays of DER streams and
/// the per-signature VRI index.
#[derive(Debug, Clone, Default)]
pub struct DssData {
    /// Shared certificate streams (DER).
    pub certs: Vec<Vec<u8>>,
    /// Shared CRL streams (DER).
    pub crls: Vec<Vec<u8>>,
    /// Shared OCSP response streams (DER `BasicOCSPResponse`).
    pub ocsps: Vec<Vec<u8>>,
    /// VRI entries keyed by uppercase-hex SHA-1 of the signature contents.
    pub vri: BTreeMap<String, VriEntry>,
}

impl DssData {
    /// An empty DSS model.
    pub fn new() -> Self {
        DssData::default()
    }
}

#[derive(Debug, Default)]
struct PendingEvidence {
    signature_name: String,
    certs: Vec<Vec<u8>>,
    crls: Vec<Vec<u8>>,
    ocsps: Vec<Vec<u8>>,
}

/// Accumulates revocation evidence per signature for a later one-shot
/// merge into a [`DssData`].
#[derive(Debug, Default)]
pub struct LtvStore {
    pending: BTreeMap<String, PendingEvidence>,
    used: bool,
}

impl LtvStore {
    /// An empty store.
    pub fn new() -> Self {
        LtvStore::default()
    }

    /// Record evidence for one signature.
    ///
    /// `contents` is the DER signature container from the PDF Contents
    /// entry. The VRI key is the uppercase-hex SHA-1 of those bytes; for
    /// ETSI.RFC3161 sub-filters it is the SHA-1 of the re-encoded
    /// timestamp token instead. Returns `false` without recording anything
    /// when all evidence lists are empty. Re-adding a signature replaces
    /// its pending evidence entirely.
    pub fn add_verification(
        &mut self,
        signature_name: &str,
        contents: &[u8],
        sub_filter: SubFilter,
        crls: Vec<Vec<u8>>,
        ocsps: Vec<Vec<u8>>,
        certs: Vec<Vec<u8>>,
    ) -> Result<bool> {
        if crls.is_empty() && ocsps.is_empty() && certs.is_empty() {
            log::debug!("no LTV evidence collected for '{}'", signature_name);
            return Ok(false);
        }
        let key = vri_key(contents, sub_filter)?;
        log::debug!(
            "recording LTV evidence for '{}' under VRI key {}",
            signature_name,
            key
        );
        self.pending.insert(
            key,
            PendingEvidence {
                signature_name: signature_name.to_string(),
                certs,
                crls,
                ocsps,
            },
        );
        Ok(true)
    }

    /// Merge all pending evidence into `dss`.
    ///
    /// One-shot: the first call consumes the pending evidence and returns
    /// `true`; later calls are no-ops returning `false`. VRI keys already
    /// present in `dss` are replaced: their old entries are removed first,
    /// dropping shared streams only they referenced, then the new evidence
    /// is appended with byte-equality de-duplication against the shared
    /// arrays.
    pub fn merge(&mut self, dss: &mut DssData) -> bool {
        if self.used {
            log::warn!("LtvStore::merge called twice, ignoring");
            return false;
        }
        self.used = true;
        if self.pending.is_empty() {
            return false;
        }

        let replaced: Vec<String> = self
            .pending
            .keys()
            .filter(|key| dss.vri.contains_key(*key))
            .cloned()
            .collect();
        remove_vri_entries(dss, &replaced);

        for (key, evidence) in std::mem::take(&mut self.pending) {
            log::info!(
                "merging LTV evidence for '{}' ({} certs, {} CRLs, {} OCSPs)",
                evidence.signature_name,
                evidence.certs.len(),
                evidence.crls.len(),
                evidence.ocsps.len()
            );
            let entry = VriEntry {
                certs: append_deduplicated(&mut dss.certs, evidence.certs),
                crls: append_deduplicated(&mut dss.crls, evidence.crls),
                ocsps: append_deduplicated(&mut dss.ocsps, evidence.ocsps),
            };
            dss.vri.insert(key, entry);
        }
        true
    }
}

/// Compute the VRI dictionary key for a signature's contents.
pub fn vri_key(contents: &[u8], sub_filter: SubFilter) -> Result<String> {
    let hashed = if sub_filter.is_document_timestamp() {
        // Key the VRI entry off the canonical DER of the inner token.
        // PDF Contents values are zero-padded to their reserved size, so
        // only a prefix of the bytes is decoded.
        let mut reader = SliceReader::new(contents)
            .map_err(|e| Error::Timestamp(format!("document timestamp contents: {}", e)))?;
        let token = cms::content_info::ContentInfo::decode(&mut reader)
            .map_err(|e| Error::Timestamp(format!("document timestamp contents: {}", e)))?;
        DigestAlgorithm::Sha1.digest(&token.to_der()?)
    } else {
        DigestAlgorithm::Sha1.digest(contents)
    };
    Ok(hex_string(&hashed))
}

/// Append each blob to `array` unless an identical blob is already there,
/// returning the index of every blob in input order (duplicates collapse
/// to one index).
fn append_deduplicated(array: &mut Vec<Vec<u8>>, blobs: Vec<Vec<u8>>) -> Vec<usize> {
    let mut indices = Vec::with_capacity(blobs.len());
    for blob in blobs {
        let index = match array.iter().position(|existing| *existing == blob) {
            Some(found) => found,
            None => {
                array.push(blob);
                array.len() - 1
            },
        };
        if !indices.contains(&index) {
            indices.push(index);
        }
    }
    indices
}

/// Remove the given VRI keys, dropping shared streams that no remaining
/// entry references and remapping the survivors' indices.
fn remove_vri_entries(dss: &mut DssData, keys: &[String]) {
    let mut removed_refs = (BTreeSet::new(), BTreeSet::new(), BTreeSet::new());
    for key in keys {
        if let Some(entry) = dss.vri.remove(key) {
            removed_refs.0.extend(entry.certs);
            removed_refs.1.extend(entry.crls);
            removed_refs.2.extend(entry.ocsps);
        }
    }

    let mut kept_refs = (BTreeSet::new(), BTreeSet::new(), BTreeSet::new());
    for entry in dss.vri.values() {
        kept_refs.0.extend(entry.certs.iter().copied());
        kept_refs.1.extend(entry.crls.iter().copied());
        kept_refs.2.extend(entry.ocsps.iter().copied());
    }

    let cert_map = drop_streams(&mut dss.certs, &removed_refs.0, &kept_refs.0);
    let crl_map = drop_streams(&mut dss.crls, &removed_refs.1, &kept_refs.1);
    let ocsp_map = drop_streams(&mut dss.ocsps, &removed_refs.2, &kept_refs.2);

    for entry in dss.vri.values_mut() {
        remap(&mut entry.certs, &cert_map);
        remap(&mut entry.crls, &crl_map);
        remap(&mut entry.ocsps, &ocsp_map);
    }
}

/// Drop every stream in `removed` that is not also in `kept`; return the
/// old-index → new-index map for the survivors.
fn drop_streams(
    array: &mut Vec<Vec<u8>>,
    removed: &BTreeSet<usize>,
    kept: &BTreeSet<usize>,
) -> BTreeMap<usize, usize> {
    let mut map = BTreeMap::new();
    let mut next = 0;
    let mut index = 0;
    array.retain(|_| {
        let dropping = removed.contains(&index) && !kept.contains(&index);
        if !dropping {
            map.insert(index, next);
            next += 1;
        }
        index += 1;
        !dropping
    });
    map
}

fn remap(indices: &mut [usize], map: &BTreeMap<usize, usize>) {
    for index in indices.iter_mut() {
        if let Some(new) = map.get(index) {
            *index = *new;
        }
    }
}
