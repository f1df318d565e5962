//! Compare command - similarity score between two images.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use imprint_core::FingerprintEngine;

pub fn execute(a: PathBuf, b: PathBuf, threshold_flag: Option<f64>) -> Result<()> {
    let engine = FingerprintEngine::new();

    let bytes_a =
        std::fs::read(&a).with_context(|| format!("Failed to read file: {}", a.display()))?;
    let bytes_b =
        std::fs::read(&b).with_context(|| format!("Failed to read file: {}", b.display()))?;

    let fp_a = engine
        .fingerprint(&bytes_a)
        .with_context(|| format!("Failed to fingerprint {}", a.display()))?;
    let fp_b = engine
        .fingerprint(&bytes_b)
        .with_context(|| format!("Failed to fingerprint {}", b.display()))?;

    let threshold = super::threshold(threshold_flag);
    let distance = fp_a.signature.hamming_distance(&fp_b.signature);
    let score = fp_a.signature.similarity(&fp_b.signature);

    println!("   {} {}", "A:".dimmed(), fp_a.signature);
    println!("   {} {}", "B:".dimmed(), fp_b.signature);
    println!(
        "   {} {score:.3} ({distance} bits apart, threshold {threshold:.2})",
        "Similarity:".dimmed()
    );
    println!();

    if fp_a.content_hash == fp_b.content_hash {
        println!("{}", "🟰 Byte-identical content".green().bold());
    } else if score >= threshold {
        println!("{}", "⚠️  Near-duplicates".yellow().bold());
    } else {
        println!("{}", "✅ Distinct content".green().bold());
    }

    Ok(())
}
