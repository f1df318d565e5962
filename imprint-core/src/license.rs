//! License model and lifecycle coordination.
//!
//! A content owner publishes reusable [`LicenseTemplate`]s; a licensee
//! obtains a concrete [`License`] from a template by paying its fee, then
//! pays royalties against it while the validity window lasts. Terms are
//! frozen into the license at issuance — later template edits can never
//! retroactively alter granted rights. Expiry is a derived read-time
//! property, not a stored transition.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ImprintError, Result};
use crate::fingerprint::ContentHash;
use crate::ledger::{AccountId, LicenseLedger, OwnershipLedger};

/// Template identifier, unique per content hash. Assigned by the ledger in
/// issuance order.
pub type TemplateId = u64;

/// Reusable license terms published by a content owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseTerms {
    /// Validity window.
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub commercial_use: bool,
    pub modification_allowed: bool,
    /// At most one active license may exist at a time under an exclusive template.
    pub exclusive: bool,
    /// Fee due in full at issuance.
    pub license_fee: u64,
    /// Royalty rate in basis points (0..=10000).
    pub royalty_rate_bps: u32,
    pub attribution_text: String,
}

impl LicenseTerms {
    /// Validate terms before they reach the ledger.
    pub fn validate(&self) -> Result<()> {
        if self.end_date < self.start_date {
            return Err(ImprintError::MalformedTerms(format!(
                "end date {} precedes start date {}",
                self.end_date, self.start_date
            )));
        }
        if self.royalty_rate_bps > 10_000 {
            return Err(ImprintError::MalformedTerms(format!(
                "royalty rate {} bps exceeds 100%",
                self.royalty_rate_bps
            )));
        }
        Ok(())
    }
}

/// A published template: `(contentHash, templateId)` identity, owned by the
/// content's registered owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseTemplate {
    pub content_hash: ContentHash,
    pub template_id: TemplateId,
    pub owner: AccountId,
    pub terms: LicenseTerms,
    pub created_at: DateTime<Utc>,
}

/// A concrete grant issued from a template to one licensee.
///
/// `terms` is a frozen copy taken at issuance. `royalty_paid` only ever
/// increases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub content_hash: ContentHash,
    pub template_id: TemplateId,
    pub licensee: AccountId,
    pub issued_at: DateTime<Utc>,
    pub terms: LicenseTerms,
    pub fee_paid: u64,
    pub royalty_paid: u64,
}

impl License {
    /// Whether the license's validity window has passed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.terms.end_date
    }
}

/// Orchestrates template creation, license issuance, and royalty recording
/// against the injected ledger clients.
pub struct LicenseCoordinator {
    ownership: Arc<dyn OwnershipLedger>,
    licenses: Arc<dyn LicenseLedger>,
}

impl LicenseCoordinator {
    pub fn new(ownership: Arc<dyn OwnershipLedger>, licenses: Arc<dyn LicenseLedger>) -> Self {
        Self {
            ownership,
            licenses,
        }
    }

    /// Publish a license template for registered content.
    ///
    /// Fails with [`ImprintError::UnknownContent`] when no content record
    /// exists and [`ImprintError::NotOwner`] when the caller is not the
    /// recorded owner.
    pub async fn create_template(
        &self,
        content_hash: ContentHash,
        caller: &AccountId,
        terms: LicenseTerms,
    ) -> Result<LicenseTemplate> {
        terms.validate()?;

        let record = self
            .ownership
            .read(&content_hash)
            .await?
            .ok_or(ImprintError::UnknownContent(content_hash))?;

        if record.owner != *caller {
            return Err(ImprintError::NotOwner {
                content_hash,
                caller: caller.clone(),
            });
        }

        let template = self
            .licenses
            .append_template(&content_hash, caller, &terms)
            .await?;

        tracing::info!(
            content_hash = %content_hash,
            template_id = template.template_id,
            owner = %caller,
            exclusive = terms.exclusive,
            "license template created"
        );
        Ok(template)
    }

    /// Issue a license from a template to `licensee`.
    ///
    /// The payment must cover the template's fee in full; exclusive
    /// templates refuse issuance while an active (non-expired) license
    /// exists — enforced by the ledger's serialized append, so concurrent
    /// issuances resolve to one winner. Terms are frozen from the template
    /// at this moment.
    pub async fn obtain_license(
        &self,
        content_hash: ContentHash,
        template_id: TemplateId,
        licensee: &AccountId,
        payment: u64,
    ) -> Result<License> {
        let template = self
            .licenses
            .template(&content_hash, template_id)
            .await?
            .ok_or(ImprintError::TemplateNotFound {
                content_hash,
                template_id,
            })?;

        if payment < template.terms.license_fee {
            return Err(ImprintError::InsufficientPayment {
                required: template.terms.license_fee,
                offered: payment,
            });
        }

        let exclusive = template.terms.exclusive;
        if exclusive {
            let now = Utc::now();
            let issued = self
                .licenses
                .licenses_for_template(&content_hash, template_id)
                .await?;
            if issued.iter().any(|license| !license.is_expired(now)) {
                return Err(ImprintError::ExclusivityViolation {
                    content_hash,
                    template_id,
                });
            }
        }

        let license = License {
            content_hash,
            template_id,
            licensee: licensee.clone(),
            issued_at: Utc::now(),
            terms: template.terms,
            fee_paid: payment,
            royalty_paid: 0,
        };
        // The exclusivity read above is only a fast path. The ledger
        // re-checks under its own serialization; losing a concurrent
        // issuance race surfaces as a rejection here.
        match self.licenses.append_license(&license).await {
            Ok(()) => {}
            Err(ImprintError::LedgerRejected(reason)) if exclusive => {
                tracing::debug!(
                    %content_hash,
                    template_id,
                    %reason,
                    "ledger refused issuance, lost the exclusivity race"
                );
                return Err(ImprintError::ExclusivityViolation {
                    content_hash,
                    template_id,
                });
            }
            Err(e) => return Err(e),
        }

        tracing::info!(
            content_hash = %content_hash,
            template_id,
            licensee = %licensee,
            fee_paid = license.fee_paid,
            "license issued"
        );
        Ok(license)
    }

    /// Record a royalty payment against an issued license.
    ///
    /// No accrual past expiry. Returns the new cumulative royalty total.
    pub async fn pay_royalty(
        &self,
        content_hash: ContentHash,
        template_id: TemplateId,
        licensee: &AccountId,
        amount: u64,
    ) -> Result<u64> {
        let license = self
            .licenses
            .license(&content_hash, template_id, licensee)
            .await?
            .ok_or_else(|| ImprintError::LicenseNotFound {
                content_hash,
                template_id,
                licensee: licensee.clone(),
            })?;

        if license.is_expired(Utc::now()) {
            return Err(ImprintError::LicenseExpired {
                expired_at: license.terms.end_date,
            });
        }

        let total = self
            .licenses
            .record_royalty(&content_hash, template_id, licensee, amount)
            .await?;

        tracing::info!(
            content_hash = %content_hash,
            template_id,
            licensee = %licensee,
            amount,
            royalty_paid = total,
            "royalty recorded"
        );
        Ok(total)
    }

    /// Every license issued for a piece of content.
    ///
    /// Reads go straight to the ledger; they reflect every committed write.
    pub async fn licenses_for_content(&self, content_hash: &ContentHash) -> Result<Vec<License>> {
        self.licenses.licenses_for_content(content_hash).await
    }

    /// Every license a user has acquired.
    pub async fn licenses_for_user(&self, licensee: &AccountId) -> Result<Vec<License>> {
        self.licenses.licenses_for_user(licensee).await
    }

    /// Every license issued from one template.
    pub async fn licenses_for_template(
        &self,
        content_hash: &ContentHash,
        template_id: TemplateId,
    ) -> Result<Vec<License>> {
        self.licenses
            .licenses_for_template(content_hash, template_id)
            .await
    }

    /// Templates published for a piece of content.
    pub async fn templates_for_content(
        &self,
        content_hash: &ContentHash,
    ) -> Result<Vec<LicenseTemplate>> {
        self.licenses.templates_for_content(content_hash).await
    }
}
