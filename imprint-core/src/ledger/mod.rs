//! Ledger clients.
//!
//! Thin façades over the external append-only ledgers. The ownership ledger
//! maps content identity to owner and timestamp; the license ledger holds
//! templates and issued licenses per content identity. Both are the sources
//! of truth — everything local (the similarity index in particular) is a
//! rebuildable projection.
//!
//! Failure contract: write operations fail with
//! [`ImprintError::LedgerUnavailable`] on transport failure and
//! [`ImprintError::LedgerRejected`] when the ledger's own invariant check
//! refuses the write (duplicate key, insufficient authorization). Reads
//! return `Ok(None)` when the key does not exist — not-found is a sentinel,
//! never an error. Writes are committed-or-not; callers see no partial state.

pub mod memory;

#[cfg(feature = "http-ledger")]
pub mod http;

pub use memory::{MemoryLicenseLedger, MemoryOwnershipLedger};

#[cfg(feature = "http-ledger")]
pub use http::{HttpLedgerConfig, HttpLicenseLedger, HttpOwnershipLedger};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fingerprint::{ContentHash, PerceptualSignature};
use crate::license::{License, LicenseTemplate, LicenseTerms, TemplateId};

/// Account identifier of a creator or licensee.
///
/// Opaque to this core: the upload intake verifies that the caller actually
/// controls this identity before any coordinator sees it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One registered piece of content.
///
/// Exactly one record may exist per content hash; once committed it is
/// immutable and never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub content_hash: ContentHash,
    pub owner: AccountId,
    pub registered_at: DateTime<Utc>,
    /// Carried so the similarity index can be rebuilt from the ledger alone.
    pub signature: PerceptualSignature,
}

/// Append-only ownership ledger: content identity → owner, timestamp.
#[async_trait]
pub trait OwnershipLedger: Send + Sync {
    /// Append a content record. The ledger serializes concurrent writes for
    /// the same hash to exactly one winner; losers get `LedgerRejected`.
    async fn write(&self, record: &ContentRecord) -> Result<()>;

    /// Look up a record by content hash. `Ok(None)` when absent.
    async fn read(&self, content_hash: &ContentHash) -> Result<Option<ContentRecord>>;

    /// Full record set, for rebuilding the similarity index.
    async fn records(&self) -> Result<Vec<ContentRecord>>;

    /// Every record registered by one owner.
    async fn records_for_owner(&self, owner: &AccountId) -> Result<Vec<ContentRecord>>;
}

/// Append-only license ledger, scoped by `(contentHash, templateId)`.
#[async_trait]
pub trait LicenseLedger: Send + Sync {
    /// Append a template. The ledger assigns the next template id for the
    /// content and stamps the creation time.
    async fn append_template(
        &self,
        content_hash: &ContentHash,
        owner: &AccountId,
        terms: &LicenseTerms,
    ) -> Result<LicenseTemplate>;

    async fn template(
        &self,
        content_hash: &ContentHash,
        template_id: TemplateId,
    ) -> Result<Option<LicenseTemplate>>;

    async fn templates_for_content(&self, content_hash: &ContentHash)
        -> Result<Vec<LicenseTemplate>>;

    /// Append an issued license. The ledger serializes appends per content:
    /// a duplicate identity, or a second active license under an exclusive
    /// template, is refused with `LedgerRejected`.
    async fn append_license(&self, license: &License) -> Result<()>;

    /// Accumulate a royalty payment onto the licensee's most recent license
    /// under the template. Returns the new cumulative total.
    async fn record_royalty(
        &self,
        content_hash: &ContentHash,
        template_id: TemplateId,
        licensee: &AccountId,
        amount: u64,
    ) -> Result<u64>;

    /// The licensee's most recently issued license under the template.
    async fn license(
        &self,
        content_hash: &ContentHash,
        template_id: TemplateId,
        licensee: &AccountId,
    ) -> Result<Option<License>>;

    async fn licenses_for_content(&self, content_hash: &ContentHash) -> Result<Vec<License>>;

    async fn licenses_for_user(&self, licensee: &AccountId) -> Result<Vec<License>>;

    async fn licenses_for_template(
        &self,
        content_hash: &ContentHash,
        template_id: TemplateId,
    ) -> Result<Vec<License>>;
}
