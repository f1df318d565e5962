//! Register command - commit an image to the ownership ledger.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use imprint_core::{
    AccountId, HttpOwnershipLedger, ImprintError, RegistrationCoordinator, RegistryConfig,
    SimilarityIndex,
};

pub async fn execute(file: PathBuf, owner: String, ledger_url: Option<String>) -> Result<()> {
    let config = super::ledger_config(ledger_url)?;
    let ledger = Arc::new(HttpOwnershipLedger::new(config)?);
    let index = Arc::new(SimilarityIndex::new());
    let registry = RegistrationCoordinator::new(index, ledger, RegistryConfig::from_env());

    println!("{}", "🔄 Rebuilding similarity index from ledger...".dimmed());
    let count = registry
        .reconcile_index()
        .await
        .context("Failed to rebuild index from ledger")?;
    println!("{}", format!("   {count} records indexed").dimmed());

    let bytes = std::fs::read(&file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;

    match registry.register(&bytes, &AccountId::new(owner)).await {
        Ok(content_hash) => {
            println!();
            println!("{}", "📜 Content registered!".green().bold());
            println!("   {} {}", "Hash:".dimmed(), content_hash);
            Ok(())
        }
        Err(ImprintError::AlreadyRegistered { content_hash }) => {
            println!();
            println!("{}", "⛔ Already registered".yellow().bold());
            println!("   {} {}", "Hash:".dimmed(), content_hash);
            bail!("content is already on the ledger");
        }
        Err(ImprintError::PotentialInfringement {
            matched,
            owner,
            score,
        }) => {
            println!();
            println!("{}", "🚨 Potential infringement".red().bold());
            println!("   {} {}", "Matched:   ".dimmed(), matched);
            println!("   {} {}", "Owner:     ".dimmed(), owner);
            println!("   {} {score:.3}", "Similarity:".dimmed());
            bail!("registration blocked pending adjudication");
        }
        Err(e) => Err(e).context("Registration failed"),
    }
}
