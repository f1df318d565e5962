pub mod check;
pub mod compare;
pub mod fingerprint;
pub mod register;

use anyhow::{Context, Result};
use imprint_core::{HttpLedgerConfig, RegistryConfig};

/// Resolve the ledger gateway configuration from a CLI override or the
/// environment.
pub(crate) fn ledger_config(ledger_url: Option<String>) -> Result<HttpLedgerConfig> {
    match ledger_url {
        Some(base_url) => Ok(HttpLedgerConfig {
            base_url,
            ..Default::default()
        }),
        None => HttpLedgerConfig::from_env()
            .context("no --ledger-url given and IMPRINT_LEDGER_URL is not set"),
    }
}

/// Infringement threshold from a CLI override or the environment.
pub(crate) fn threshold(flag: Option<f64>) -> f64 {
    flag.unwrap_or_else(|| RegistryConfig::from_env().infringement_threshold)
}
