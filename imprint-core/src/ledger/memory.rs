//! In-memory ledger implementations.
//!
//! Process-local stand-ins for the external ledgers, with the same
//! commit-or-reject semantics: racing writes for one content hash resolve
//! to exactly one winner. Used for tests and single-process deployments.
//! A fault-injection switch simulates transport failure so callers can
//! exercise their `LedgerUnavailable` paths.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{AccountId, ContentRecord, LicenseLedger, OwnershipLedger};
use crate::error::{ImprintError, Result};
use crate::fingerprint::ContentHash;
use crate::license::{License, LicenseTemplate, LicenseTerms, TemplateId};

/// In-memory ownership ledger.
#[derive(Default)]
pub struct MemoryOwnershipLedger {
    records: DashMap<ContentHash, ContentRecord>,
    unavailable: AtomicBool,
}

impl MemoryOwnershipLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle simulated transport failure.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ImprintError::LedgerUnavailable(
                "ownership ledger offline".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl OwnershipLedger for MemoryOwnershipLedger {
    async fn write(&self, record: &ContentRecord) -> Result<()> {
        self.check_available()?;

        // Entry API makes the duplicate check and the insert one atomic
        // step, so concurrent writers for the same hash get one winner.
        match self.records.entry(record.content_hash) {
            Entry::Occupied(_) => Err(ImprintError::LedgerRejected(format!(
                "content {} already registered",
                record.content_hash
            ))),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn read(&self, content_hash: &ContentHash) -> Result<Option<ContentRecord>> {
        self.check_available()?;
        Ok(self.records.get(content_hash).map(|r| r.value().clone()))
    }

    async fn records(&self) -> Result<Vec<ContentRecord>> {
        self.check_available()?;
        Ok(self.records.iter().map(|r| r.value().clone()).collect())
    }

    async fn records_for_owner(&self, owner: &AccountId) -> Result<Vec<ContentRecord>> {
        self.check_available()?;
        Ok(self
            .records
            .iter()
            .filter(|r| r.owner == *owner)
            .map(|r| r.value().clone())
            .collect())
    }
}

/// Per-content license book: templates in id order plus issued licenses.
#[derive(Default)]
struct LicenseBook {
    templates: Vec<LicenseTemplate>,
    licenses: Vec<License>,
}

/// In-memory license ledger.
#[derive(Default)]
pub struct MemoryLicenseLedger {
    books: DashMap<ContentHash, LicenseBook>,
    unavailable: AtomicBool,
}

impl MemoryLicenseLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle simulated transport failure.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ImprintError::LedgerUnavailable(
                "license ledger offline".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LicenseLedger for MemoryLicenseLedger {
    async fn append_template(
        &self,
        content_hash: &ContentHash,
        owner: &AccountId,
        terms: &LicenseTerms,
    ) -> Result<LicenseTemplate> {
        self.check_available()?;

        let mut book = self.books.entry(*content_hash).or_default();
        let template = LicenseTemplate {
            content_hash: *content_hash,
            template_id: book.templates.len() as TemplateId,
            owner: owner.clone(),
            terms: terms.clone(),
            created_at: Utc::now(),
        };
        book.templates.push(template.clone());
        Ok(template)
    }

    async fn template(
        &self,
        content_hash: &ContentHash,
        template_id: TemplateId,
    ) -> Result<Option<LicenseTemplate>> {
        self.check_available()?;
        Ok(self
            .books
            .get(content_hash)
            .and_then(|book| book.templates.get(template_id as usize).cloned()))
    }

    async fn templates_for_content(
        &self,
        content_hash: &ContentHash,
    ) -> Result<Vec<LicenseTemplate>> {
        self.check_available()?;
        Ok(self
            .books
            .get(content_hash)
            .map(|book| book.templates.clone())
            .unwrap_or_default())
    }

    async fn append_license(&self, license: &License) -> Result<()> {
        self.check_available()?;

        // The whole check-and-append runs under the book's entry lock, so
        // racing issuances for one template serialize here.
        let mut book = self.books.entry(license.content_hash).or_default();
        let exclusive = book
            .templates
            .get(license.template_id as usize)
            .map(|template| template.terms.exclusive)
            .ok_or_else(|| {
                ImprintError::LedgerRejected(format!(
                    "no template {} for content {}",
                    license.template_id, license.content_hash
                ))
            })?;
        if exclusive {
            let now = Utc::now();
            let active = book
                .licenses
                .iter()
                .any(|l| l.template_id == license.template_id && !l.is_expired(now));
            if active {
                return Err(ImprintError::LedgerRejected(format!(
                    "exclusive template {} of {} already has an active license",
                    license.template_id, license.content_hash
                )));
            }
        }
        let duplicate = book.licenses.iter().any(|existing| {
            existing.template_id == license.template_id
                && existing.licensee == license.licensee
                && existing.issued_at == license.issued_at
        });
        if duplicate {
            return Err(ImprintError::LedgerRejected(format!(
                "license ({}, {}, {}, {}) already issued",
                license.content_hash, license.template_id, license.licensee, license.issued_at
            )));
        }
        book.licenses.push(license.clone());
        Ok(())
    }

    async fn record_royalty(
        &self,
        content_hash: &ContentHash,
        template_id: TemplateId,
        licensee: &AccountId,
        amount: u64,
    ) -> Result<u64> {
        self.check_available()?;

        let mut book = self
            .books
            .get_mut(content_hash)
            .ok_or_else(|| ImprintError::LedgerRejected(format!(
                "no licenses for content {content_hash}"
            )))?;

        // Royalties accrue to the most recently issued license for the pair.
        let license = book
            .licenses
            .iter_mut()
            .rev()
            .find(|l| l.template_id == template_id && l.licensee == *licensee)
            .ok_or_else(|| {
                ImprintError::LedgerRejected(format!(
                    "no license for {licensee} under template {template_id} of {content_hash}"
                ))
            })?;

        license.royalty_paid = license.royalty_paid.checked_add(amount).ok_or_else(|| {
            ImprintError::LedgerRejected("royalty total would overflow".into())
        })?;
        Ok(license.royalty_paid)
    }

    async fn license(
        &self,
        content_hash: &ContentHash,
        template_id: TemplateId,
        licensee: &AccountId,
    ) -> Result<Option<License>> {
        self.check_available()?;
        Ok(self.books.get(content_hash).and_then(|book| {
            book.licenses
                .iter()
                .rev()
                .find(|l| l.template_id == template_id && l.licensee == *licensee)
                .cloned()
        }))
    }

    async fn licenses_for_content(&self, content_hash: &ContentHash) -> Result<Vec<License>> {
        self.check_available()?;
        Ok(self
            .books
            .get(content_hash)
            .map(|book| book.licenses.clone())
            .unwrap_or_default())
    }

    async fn licenses_for_user(&self, licensee: &AccountId) -> Result<Vec<License>> {
        self.check_available()?;
        Ok(self
            .books
            .iter()
            .flat_map(|book| {
                book.licenses
                    .iter()
                    .filter(|l| l.licensee == *licensee)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect())
    }

    async fn licenses_for_template(
        &self,
        content_hash: &ContentHash,
        template_id: TemplateId,
    ) -> Result<Vec<License>> {
        self.check_available()?;
        Ok(self
            .books
            .get(content_hash)
            .map(|book| {
                book.licenses
                    .iter()
                    .filter(|l| l.template_id == template_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
