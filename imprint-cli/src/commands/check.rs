//! Check command - non-mutating similarity check against the ledger.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use imprint_core::{
    HttpOwnershipLedger, RegistrationCoordinator, RegistryConfig, SimilarityIndex,
};

pub async fn execute(file: PathBuf, ledger_url: Option<String>) -> Result<()> {
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

    let report = registry
        .check_similarity(&bytes)
        .await
        .context("Similarity check failed")?;

    println!();
    match report.matched {
        None => println!("{}", "✅ No similar content registered".green().bold()),
        Some(matched) => {
            if report.infringing {
                println!("{}", "🚨 Similar content found".red().bold());
            } else {
                println!("{}", "🔍 Nearest registered content".green().bold());
            }
            println!("   {} {}", "Match:     ".dimmed(), matched.content_hash);
            if let Some(owner) = &report.owner {
                println!("   {} {}", "Owner:     ".dimmed(), owner);
            }
            println!("   {} {:.3}", "Similarity:".dimmed(), report.score);
        }
    }

    Ok(())
}
