//! Process-local similarity index over perceptual signatures.
//!
//! Holds one `(contentHash, signature)` pair per accepted content record and
//! answers nearest-match queries. The index is a derived cache: the ownership
//! ledger is the source of truth and the index can be rebuilt from it at any
//! time (see [`SimilarityIndex::rebuild`]).
//!
//! Queries are a linear scan over all entries. That is the one O(n) hot path
//! per registration; the projected single-process dataset keeps it bounded.
//! The infringement threshold lives in the registration coordinator, not
//! here: the index only reports similarity, it never decides.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::{ImprintError, Result};
use crate::fingerprint::{ContentHash, PerceptualSignature};

/// One indexed content record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub content_hash: ContentHash,
    pub signature: PerceptualSignature,
}

/// Result of a nearest-match query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityMatch {
    pub content_hash: ContentHash,
    pub signature: PerceptualSignature,
    /// Normalized similarity in [0, 1]; higher is more similar.
    pub score: f64,
}

#[derive(Default)]
struct Inner {
    /// Insertion order is load-bearing: ties resolve to the first-inserted entry.
    entries: Vec<IndexEntry>,
    positions: HashMap<ContentHash, usize>,
}

/// Shared, serialized similarity index.
///
/// Concurrent inserts and queries go through a reader/writer lock so a query
/// never observes a partially-inserted entry.
#[derive(Default)]
pub struct SimilarityIndex {
    inner: RwLock<Inner>,
}

impl SimilarityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry.
    ///
    /// Idempotent for an identical `(hash, signature)` pair; fails with
    /// [`ImprintError::ConflictingSignature`] when the hash is already
    /// indexed under a different signature.
    pub fn insert(&self, content_hash: ContentHash, signature: PerceptualSignature) -> Result<()> {
        let mut inner = self.inner.write().expect("similarity index lock poisoned");

        if let Some(&pos) = inner.positions.get(&content_hash) {
            if inner.entries[pos].signature == signature {
                return Ok(());
            }
            return Err(ImprintError::ConflictingSignature { content_hash });
        }

        let pos = inner.entries.len();
        inner.entries.push(IndexEntry {
            content_hash,
            signature,
        });
        inner.positions.insert(content_hash, pos);
        Ok(())
    }

    /// Scan all entries for the one most similar to `signature`.
    ///
    /// Returns `None` on an empty index. The first-inserted entry wins ties.
    pub fn query_most_similar(&self, signature: &PerceptualSignature) -> Option<SimilarityMatch> {
        let inner = self.inner.read().expect("similarity index lock poisoned");

        let mut best: Option<SimilarityMatch> = None;
        for entry in &inner.entries {
            let score = signature.similarity(&entry.signature);
            // Strict comparison keeps the earlier entry on equal scores.
            if best.map_or(true, |b| score > b.score) {
                best = Some(SimilarityMatch {
                    content_hash: entry.content_hash,
                    signature: entry.signature,
                    score,
                });
            }
        }
        best
    }

    pub fn contains(&self, content_hash: &ContentHash) -> bool {
        self.inner
            .read()
            .expect("similarity index lock poisoned")
            .positions
            .contains_key(content_hash)
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .expect("similarity index lock poisoned")
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the index contents wholesale, typically with the ownership
    /// ledger's full record set after a crash left the cache stale.
    pub fn rebuild(&self, entries: Vec<IndexEntry>) -> Result<()> {
        let mut fresh = Inner::default();
        for entry in entries {
            if let Some(&pos) = fresh.positions.get(&entry.content_hash) {
                if fresh.entries[pos].signature == entry.signature {
                    continue;
                }
                return Err(ImprintError::ConflictingSignature {
                    content_hash: entry.content_hash,
                });
            }
            fresh.positions.insert(entry.content_hash, fresh.entries.len());
            fresh.entries.push(entry);
        }

        let mut inner = self.inner.write().expect("similarity index lock poisoned");
        *inner = fresh;
        Ok(())
    }

    /// Checkpoint the index to disk as a CBOR flat list of entries.
    ///
    /// The format round-trips exactly through [`SimilarityIndex::load_checkpoint`].
    pub fn save_checkpoint(&self, path: &Path) -> Result<()> {
        let entries = {
            let inner = self.inner.read().expect("similarity index lock poisoned");
            inner.entries.clone()
        };

        let mut bytes = Vec::new();
        ciborium::into_writer(&entries, &mut bytes)
            .map_err(|e| ImprintError::Serialization(format!("checkpoint write failed: {e}")))?;

        // Write-then-rename so a crash mid-write never leaves a torn
        // checkpoint at `path`.
        let mut tmp = path.as_os_str().to_os_string();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)?;

        tracing::debug!(path = %path.display(), entries = entries.len(), "index checkpoint saved");
        Ok(())
    }

    /// Load an index from a checkpoint file written by `save_checkpoint`.
    pub fn load_checkpoint(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let entries: Vec<IndexEntry> = ciborium::from_reader(bytes.as_slice())
            .map_err(|e| ImprintError::Serialization(format!("checkpoint read failed: {e}")))?;

        let index = Self::new();
        index.rebuild(entries)?;
        Ok(index)
    }

    /// Snapshot of all entries in insertion order.
    pub fn entries(&self) -> Vec<IndexEntry> {
        self.inner
            .read()
            .expect("similarity index lock poisoned")
            .entries
            .clone()
    }
}
