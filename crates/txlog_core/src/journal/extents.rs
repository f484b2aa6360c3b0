//! Per-source replication extents.

use serde::Serialize;
use std::collections::HashMap;

/// The range of source transactions a journal holds from one upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceExtent {
    /// Hash of the source name.
    pub source_name_hash: u64,
    /// Replication path of the first record seen from the source.
    pub replication_path: Vec<u8>,
    /// Source txid of the first record seen.
    pub first: u64,
    /// Source txid of the latest record seen.
    pub latest: u64,
}

impl SourceExtent {
    /// The source name: the final component of the replication path.
    #[must_use]
    pub fn source_name(&self) -> String {
        let path = String::from_utf8_lossy(&self.replication_path);
        path.rsplit('/').next().unwrap_or_default().to_string()
    }
}

/// Source extents keyed by source name hash, in order of first sight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceExtents {
    entries: Vec<SourceExtent>,
    index: HashMap<u64, usize>,
}

impl SourceExtents {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a replicated transaction.
    ///
    /// The first sighting of a source fixes its path and `first`; later ones
    /// only move `latest`.
    pub fn observe(&mut self, source_name_hash: u64, replication_path: &[u8], source_txid: u64) {
        if let Some(&slot) = self.index.get(&source_name_hash) {
            self.entries[slot].latest = source_txid;
            return;
        }
        self.index.insert(source_name_hash, self.entries.len());
        self.entries.push(SourceExtent {
            source_name_hash,
            replication_path: replication_path.to_vec(),
            first: source_txid,
            latest: source_txid,
        });
    }

    /// Returns the extent for a source.
    #[must_use]
    pub fn get(&self, source_name_hash: u64) -> Option<&SourceExtent> {
        self.index.get(&source_name_hash).map(|&slot| &self.entries[slot])
    }

    /// Iterates in order of first sight.
    pub fn iter(&self) -> impl Iterator<Item = &SourceExtent> {
        self.entries.iter()
    }

    /// Number of sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no replicated record was seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for SourceExtents {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}
