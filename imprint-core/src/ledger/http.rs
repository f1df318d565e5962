//! HTTP ledger clients.
//!
//! Talks JSON to a ledger gateway. Read operations retry transient failures
//! with exponential backoff; write operations are single-shot — the core
//! cannot prove non-duplication on its own, so write retry is deferred to
//! the caller.
//!
//! Status mapping: 404 on a read is the not-found sentinel (`Ok(None)`);
//! 409 and other 4xx on a write mean the ledger's invariant check refused it
//! (`LedgerRejected`); timeouts, connection failures, and 5xx are
//! `LedgerUnavailable`.

use std::time::Duration;

use async_trait::async_trait;
use backoff::{future::retry_notify, ExponentialBackoff};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{AccountId, ContentRecord, LicenseLedger, OwnershipLedger};
use crate::error::{ImprintError, Result};
use crate::fingerprint::ContentHash;
use crate::license::{License, LicenseTemplate, LicenseTerms, TemplateId};

/// Configuration for the HTTP ledger clients.
#[derive(Debug, Clone)]
pub struct HttpLedgerConfig {
    /// Base URL of the ledger gateway.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum retry attempts for transient read failures.
    pub max_retries: u32,
    /// Initial retry interval.
    pub initial_interval: Duration,
    /// Maximum retry interval.
    pub max_interval: Duration,
}

impl Default for HttpLedgerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:7545".to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
            initial_interval: Duration::from_millis(250),
            max_interval: Duration::from_secs(2),
        }
    }
}

impl HttpLedgerConfig {
    /// Load configuration from environment variables.
    ///
    /// Required: `IMPRINT_LEDGER_URL`
    /// Optional: `IMPRINT_LEDGER_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("IMPRINT_LEDGER_URL").map_err(|_| {
            ImprintError::LedgerUnavailable("IMPRINT_LEDGER_URL environment variable not set".into())
        })?;

        let timeout_secs = std::env::var("IMPRINT_LEDGER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
            ..Self::default()
        })
    }
}

/// Shared JSON-over-HTTP transport for both ledger clients.
#[derive(Clone)]
struct LedgerHttpClient {
    client: Client,
    config: HttpLedgerConfig,
}

impl LedgerHttpClient {
    fn new(config: HttpLedgerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ImprintError::LedgerUnavailable(format!("failed to create HTTP client: {e}"))
            })?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// GET with retry on transient failures. 404 is the not-found sentinel.
    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<Option<R>> {
        let backoff = self.build_backoff();

        retry_notify(
            backoff,
            || async move { self.get_once(path).await },
            |err: ImprintError, duration: Duration| {
                warn!(
                    error = %err,
                    retry_after_ms = duration.as_millis() as u64,
                    "ledger read retry scheduled"
                );
            },
        )
        .await
    }

    async fn get_once<R: DeserializeOwned>(
        &self,
        path: &str,
    ) -> std::result::Result<Option<R>, backoff::Error<ImprintError>> {
        let url = self.url(path);
        let response = self.client.get(&url).send().await.map_err(|e| {
            let err = ImprintError::LedgerUnavailable(format!("GET {url} failed: {e}"));
            if is_transient_error(&e) {
                backoff::Error::transient(err)
            } else {
                backoff::Error::permanent(err)
            }
        })?;

        let status = response.status();
        debug!(%status, %url, "ledger read response");

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let err = ImprintError::LedgerUnavailable(format!("GET {url} returned {status}"));
            return if is_transient_status(status) {
                Err(backoff::Error::transient(err))
            } else {
                Err(backoff::Error::permanent(err))
            };
        }

        let parsed = response.json().await.map_err(|e| {
            backoff::Error::permanent(ImprintError::Serialization(format!(
                "failed to parse ledger response: {e}"
            )))
        })?;
        Ok(Some(parsed))
    }

    /// Single-shot POST; never retried here.
    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self.post_raw(path, body).await?;
        response
            .json()
            .await
            .map_err(|e| ImprintError::Serialization(format!("failed to parse ledger response: {e}")))
    }

    /// Single-shot POST whose response body is irrelevant.
    async fn post_unit<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<()> {
        self.post_raw(path, body).await.map(|_| ())
    }

    async fn post_raw<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response> {
        let url = self.url(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ImprintError::LedgerUnavailable(format!("POST {url} failed: {e}")))?;

        let status = response.status();
        debug!(%status, %url, "ledger write response");

        if status.is_success() {
            return Ok(response);
        }

        let detail = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            Err(ImprintError::LedgerRejected(format!(
                "POST {url} returned {status}: {detail}"
            )))
        } else {
            Err(ImprintError::LedgerUnavailable(format!(
                "POST {url} returned {status}"
            )))
        }
    }

    fn build_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.config.initial_interval,
            max_interval: self.config.max_interval,
            max_elapsed_time: Some(self.config.timeout * self.config.max_retries),
            ..Default::default()
        }
    }
}

/// Whether a reqwest error is transient and worth retrying.
fn is_transient_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

/// Whether an HTTP status indicates a transient condition.
fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
            | StatusCode::BAD_GATEWAY
    )
}

/// Ownership ledger over the HTTP gateway.
#[derive(Clone)]
pub struct HttpOwnershipLedger {
    http: LedgerHttpClient,
}

impl HttpOwnershipLedger {
    pub fn new(config: HttpLedgerConfig) -> Result<Self> {
        Ok(Self {
            http: LedgerHttpClient::new(config)?,
        })
    }
}

#[async_trait]
impl OwnershipLedger for HttpOwnershipLedger {
    async fn write(&self, record: &ContentRecord) -> Result<()> {
        self.http.post_unit("contents", record).await
    }

    async fn read(&self, content_hash: &ContentHash) -> Result<Option<ContentRecord>> {
        self.http
            .get(&format!("contents/{}", content_hash.to_hex()))
            .await
    }

    async fn records(&self) -> Result<Vec<ContentRecord>> {
        Ok(self.http.get("contents").await?.unwrap_or_default())
    }

    async fn records_for_owner(&self, owner: &AccountId) -> Result<Vec<ContentRecord>> {
        Ok(self
            .http
            .get(&format!("accounts/{owner}/contents"))
            .await?
            .unwrap_or_default())
    }
}

#[derive(Serialize)]
struct TemplateRequest<'a> {
    owner: &'a AccountId,
    terms: &'a LicenseTerms,
}

#[derive(Serialize)]
struct RoyaltyRequest {
    amount: u64,
}

#[derive(Deserialize)]
struct RoyaltyReceipt {
    royalty_paid: u64,
}

/// License ledger over the HTTP gateway.
#[derive(Clone)]
pub struct HttpLicenseLedger {
    http: LedgerHttpClient,
}

impl HttpLicenseLedger {
    pub fn new(config: HttpLedgerConfig) -> Result<Self> {
        Ok(Self {
            http: LedgerHttpClient::new(config)?,
        })
    }
}

#[async_trait]
impl LicenseLedger for HttpLicenseLedger {
    async fn append_template(
        &self,
        content_hash: &ContentHash,
        owner: &AccountId,
        terms: &LicenseTerms,
    ) -> Result<LicenseTemplate> {
        self.http
            .post(
                &format!("contents/{}/templates", content_hash.to_hex()),
                &TemplateRequest { owner, terms },
            )
            .await
    }

    async fn template(
        &self,
        content_hash: &ContentHash,
        template_id: TemplateId,
    ) -> Result<Option<LicenseTemplate>> {
        self.http
            .get(&format!(
                "contents/{}/templates/{template_id}",
                content_hash.to_hex()
            ))
            .await
    }

    async fn templates_for_content(
        &self,
        content_hash: &ContentHash,
    ) -> Result<Vec<LicenseTemplate>> {
        Ok(self
            .http
            .get(&format!("contents/{}/templates", content_hash.to_hex()))
            .await?
            .unwrap_or_default())
    }

    async fn append_license(&self, license: &License) -> Result<()> {
        self.http
            .post_unit(
                &format!(
                    "contents/{}/templates/{}/licenses",
                    license.content_hash.to_hex(),
                    license.template_id
                ),
                license,
            )
            .await
    }

    async fn record_royalty(
        &self,
        content_hash: &ContentHash,
        template_id: TemplateId,
        licensee: &AccountId,
        amount: u64,
    ) -> Result<u64> {
        let receipt: RoyaltyReceipt = self
            .http
            .post(
                &format!(
                    "contents/{}/templates/{template_id}/licenses/{licensee}/royalties",
                    content_hash.to_hex()
                ),
                &RoyaltyRequest { amount },
            )
            .await?;
        Ok(receipt.royalty_paid)
    }

    async fn license(
        &self,
        content_hash: &ContentHash,
        template_id: TemplateId,
        licensee: &AccountId,
    ) -> Result<Option<License>> {
        self.http
            .get(&format!(
                "contents/{}/templates/{template_id}/licenses/{licensee}",
                content_hash.to_hex()
            ))
            .await
    }

    async fn licenses_for_content(&self, content_hash: &ContentHash) -> Result<Vec<License>> {
        Ok(self
            .http
            .get(&format!("contents/{}/licenses", content_hash.to_hex()))
            .await?
            .unwrap_or_default())
    }

    async fn licenses_for_user(&self, licensee: &AccountId) -> Result<Vec<License>> {
        Ok(self
            .http
            .get(&format!("accounts/{licensee}/licenses"))
            .await?
            .unwrap_or_default())
    }

    async fn licenses_for_template(
        &self,
        content_hash: &ContentHash,
        template_id: TemplateId,
    ) -> Result<Vec<License>> {
        Ok(self
            .http
            .get(&format!(
                "contents/{}/templates/{template_id}/licenses",
                content_hash.to_hex()
            ))
            .await?
            .unwrap_or_default())
    }
}
