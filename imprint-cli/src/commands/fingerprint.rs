//! Fingerprint command - print content hash and perceptual signature.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use imprint_core::FingerprintEngine;

pub fn execute(file: PathBuf) -> Result<()> {
    let bytes = std::fs::read(&file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;

    let fingerprint = FingerprintEngine::new()
        .fingerprint(&bytes)
        .with_context(|| format!("Failed to fingerprint {}", file.display()))?;

    println!("{}", format!("🖼  {}", file.display()).dimmed());
    println!(
        "   {} {}",
        "Content hash:".dimmed(),
        fingerprint.content_hash
    );
    println!(
        "   {} {}",
        "Signature:   ".dimmed(),
        fingerprint.signature
    );

    Ok(())
}
