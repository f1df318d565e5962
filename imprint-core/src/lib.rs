//! Imprint Core - content registration and licensing against an append-only ledger
//!
//! This crate lets a creator register digital content (images) against a
//! tamper-evident ownership ledger, detect whether near-identical content has
//! already been registered, and manage time-bounded, fee-gated licenses for
//! reuse of registered content.
//!
//! # Components
//!
//! - [`FingerprintEngine`] — deterministic content identity (SHA3-256) plus a
//!   perceptual signature (Blockhash64) per image payload
//! - [`SimilarityIndex`] — rebuildable nearest-match projection over all
//!   accepted signatures
//! - [`OwnershipLedger`] / [`LicenseLedger`] — thin clients for the external
//!   append-only ledgers (in-memory and HTTP implementations provided)
//! - [`RegistrationCoordinator`] — idempotent registration with an
//!   infringement policy check
//! - [`LicenseCoordinator`] — template → issuance → royalty lifecycle
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use imprint_core::{
//!     MemoryOwnershipLedger, RegistrationCoordinator, RegistryConfig, SimilarityIndex,
//! };
//!
//! # async fn example() -> imprint_core::Result<()> {
//! let index = Arc::new(SimilarityIndex::new());
//! let ledger = Arc::new(MemoryOwnershipLedger::new());
//! let registry = RegistrationCoordinator::new(index, ledger, RegistryConfig::default());
//!
//! let image_bytes = std::fs::read("image.jpg")?;
//! let content_hash = registry.register(&image_bytes, &"alice".into()).await?;
//! println!("registered as {content_hash}");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod fingerprint;
pub mod index;
pub mod ledger;
pub mod license;
pub mod registry;
pub mod storage;

// Re-export main types for convenience
pub use error::{ErrorKind, ImprintError, Result};
pub use fingerprint::{ContentHash, Fingerprint, FingerprintEngine, PerceptualSignature, SIGNATURE_BITS};
pub use index::{IndexEntry, SimilarityIndex, SimilarityMatch};
pub use ledger::{
    AccountId, ContentRecord, LicenseLedger, MemoryLicenseLedger, MemoryOwnershipLedger,
    OwnershipLedger,
};
pub use license::{License, LicenseCoordinator, LicenseTemplate, LicenseTerms, TemplateId};
pub use registry::{RegistrationCoordinator, RegistryConfig, SimilarityReport};
pub use storage::{FsObjectStore, MemoryObjectStore, ObjectStore};

#[cfg(feature = "http-ledger")]
pub use ledger::{HttpLedgerConfig, HttpLicenseLedger, HttpOwnershipLedger};
