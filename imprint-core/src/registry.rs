//! Registration coordination.
//!
//! Orchestrates fingerprinting, duplicate checking, and the ledger write for
//! a single registration request: received → fingerprinted → checked →
//! committed. Steps before the commit are pure reads and safely retryable;
//! the commit itself is never retried automatically — for two registrations
//! racing on the same content hash, the ownership ledger's serialized order
//! is the single arbiter of who got there first.

use std::sync::Arc;

use chrono::Utc;

use crate::error::{ImprintError, Result};
use crate::fingerprint::{ContentHash, FingerprintEngine};
use crate::index::{IndexEntry, SimilarityIndex, SimilarityMatch};
use crate::ledger::{AccountId, ContentRecord, OwnershipLedger};
use crate::storage::ObjectStore;

/// Registration policy configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Similarity score in [0, 1] at or above which two different owners'
    /// content is treated as a policy conflict requiring adjudication.
    pub infringement_threshold: f64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            infringement_threshold: 0.85,
        }
    }
}

impl RegistryConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional: `IMPRINT_INFRINGEMENT_THRESHOLD` (default: 0.85)
    pub fn from_env() -> Self {
        let infringement_threshold = std::env::var("IMPRINT_INFRINGEMENT_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|t| (0.0..=1.0).contains(t))
            .unwrap_or(0.85);

        Self {
            infringement_threshold,
        }
    }
}

/// Outcome of a non-mutating similarity check.
#[derive(Debug, Clone)]
pub struct SimilarityReport {
    /// Best match in the index, if any.
    pub matched: Option<SimilarityMatch>,
    /// Registered owner of the matched content, when the ledger knows it.
    pub owner: Option<AccountId>,
    /// Winning similarity score; 0 on an empty index.
    pub score: f64,
    /// Whether the score crosses the infringement threshold.
    pub infringing: bool,
}

/// Coordinates a registration request across the fingerprint engine, the
/// similarity index, and the ownership ledger.
pub struct RegistrationCoordinator {
    engine: FingerprintEngine,
    index: Arc<SimilarityIndex>,
    ledger: Arc<dyn OwnershipLedger>,
    objects: Option<Arc<dyn ObjectStore>>,
    config: RegistryConfig,
}

impl RegistrationCoordinator {
    pub fn new(
        index: Arc<SimilarityIndex>,
        ledger: Arc<dyn OwnershipLedger>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            engine: FingerprintEngine::new(),
            index,
            ledger,
            objects: None,
            config,
        }
    }

    /// Also persist accepted bytes to an object store after commit.
    pub fn with_object_store(mut self, objects: Arc<dyn ObjectStore>) -> Self {
        self.objects = Some(objects);
        self
    }

    /// Register content for `claimed_owner`. Returns the content hash.
    ///
    /// Fails with [`ImprintError::AlreadyRegistered`] when the exact bytes
    /// are already on the ledger (including when a concurrent writer won the
    /// race), and with [`ImprintError::PotentialInfringement`] when a
    /// different owner's content sits within the infringement threshold —
    /// the matched record is carried in the error for adjudication. A
    /// same-owner near-duplicate is not infringement and proceeds.
    pub async fn register(&self, content: &[u8], claimed_owner: &AccountId) -> Result<ContentHash> {
        let fingerprint = self.engine.fingerprint(content)?;
        let content_hash = fingerprint.content_hash;
        tracing::debug!(%content_hash, signature = %fingerprint.signature, "fingerprinted");

        // Exact-match guard: registering the same bytes twice never creates
        // two records.
        if self.ledger.read(&content_hash).await?.is_some() {
            return Err(ImprintError::AlreadyRegistered { content_hash });
        }

        // Near-duplicate policy check. The threshold lives here, not in the
        // index.
        if let Some(matched) = self.index.query_most_similar(&fingerprint.signature) {
            if matched.score >= self.config.infringement_threshold {
                match self.ledger.read(&matched.content_hash).await? {
                    Some(record) if record.owner != *claimed_owner => {
                        tracing::warn!(
                            %content_hash,
                            matched = %matched.content_hash,
                            owner = %record.owner,
                            score = matched.score,
                            "registration blocked pending adjudication"
                        );
                        return Err(ImprintError::PotentialInfringement {
                            matched: matched.content_hash,
                            owner: record.owner,
                            score: matched.score,
                        });
                    }
                    Some(_) => {
                        tracing::debug!(
                            matched = %matched.content_hash,
                            score = matched.score,
                            "near-duplicate belongs to the claimant, proceeding"
                        );
                    }
                    None => {
                        // Index entry with no ledger record: the index is a
                        // cache and this entry is stale. Not a policy hit.
                        tracing::warn!(
                            matched = %matched.content_hash,
                            "similarity hit has no ledger record, ignoring stale index entry"
                        );
                    }
                }
            }
        }

        let record = ContentRecord {
            content_hash,
            owner: claimed_owner.clone(),
            registered_at: Utc::now(),
            signature: fingerprint.signature,
        };
        match self.ledger.write(&record).await {
            Ok(()) => {}
            Err(ImprintError::LedgerRejected(reason)) => {
                // Another writer registered the same hash first; the
                // ledger's serialized order decides.
                tracing::debug!(%content_hash, %reason, "ledger refused commit, lost the race");
                return Err(ImprintError::AlreadyRegistered { content_hash });
            }
            Err(e) => return Err(e),
        }

        // The record is durably committed at this point. The index is a
        // lazily-consistent cache that reconcile_index heals, so a failed
        // insert must not fail the registration.
        if let Err(e) = self.index.insert(content_hash, fingerprint.signature) {
            tracing::warn!(%content_hash, error = %e, "index insert failed after ledger commit");
        }

        if let Some(objects) = &self.objects {
            objects.store(&content_hash, content).await?;
        }

        tracing::info!(%content_hash, owner = %claimed_owner, "content registered");
        Ok(content_hash)
    }

    /// Check how similar a payload is to already-registered content without
    /// writing anything.
    pub async fn check_similarity(&self, content: &[u8]) -> Result<SimilarityReport> {
        let fingerprint = self.engine.fingerprint(content)?;

        match self.index.query_most_similar(&fingerprint.signature) {
            None => Ok(SimilarityReport {
                matched: None,
                owner: None,
                score: 0.0,
                infringing: false,
            }),
            Some(matched) => {
                let owner = self
                    .ledger
                    .read(&matched.content_hash)
                    .await?
                    .map(|record| record.owner);
                Ok(SimilarityReport {
                    score: matched.score,
                    infringing: matched.score >= self.config.infringement_threshold,
                    matched: Some(matched),
                    owner,
                })
            }
        }
    }

    /// Look up a content record on the ownership ledger.
    pub async fn content_details(&self, content_hash: &ContentHash) -> Result<Option<ContentRecord>> {
        self.ledger.read(content_hash).await
    }

    /// Every content record registered by one owner.
    pub async fn contents_for_owner(&self, owner: &AccountId) -> Result<Vec<ContentRecord>> {
        self.ledger.records_for_owner(owner).await
    }

    /// Rebuild the similarity index from the ledger's full record set.
    ///
    /// The index is a lazily-consistent cache: a crash between ledger commit
    /// and index insert leaves it behind the ledger until this runs. Returns
    /// the number of indexed records.
    pub async fn reconcile_index(&self) -> Result<usize> {
        let records = self.ledger.records().await?;
        let entries: Vec<IndexEntry> = records
            .into_iter()
            .map(|record| IndexEntry {
                content_hash: record.content_hash,
                signature: record.signature,
            })
            .collect();
        let count = entries.len();

        self.index.rebuild(entries)?;
        tracing::info!(records = count, "similarity index reconciled with ledger");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_threshold() {
        let config = RegistryConfig::default();
        assert!((config.infringement_threshold - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_config_from_env_rejects_out_of_range() {
        // Out-of-range values fall back to the default rather than
        // producing a threshold no score can ever reach.
        std::env::set_var("IMPRINT_INFRINGEMENT_THRESHOLD", "1.5");
        let config = RegistryConfig::from_env();
        std::env::remove_var("IMPRINT_INFRINGEMENT_THRESHOLD");
        assert!((config.infringement_threshold - 0.85).abs() < 1e-9);
    }
}
