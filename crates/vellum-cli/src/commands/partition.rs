use anyhow::Result;
use chrono::Local;
use std::path::PathBuf;
use vellum_migrate::{partition_domains, PartitionConfig, Tier};

/// Cluster pre-filtered notes into per-domain migration catalogs.
pub fn execute(
    tier: Tier,
    max_domain_size: usize,
    source_path: String,
    input: Option<PathBuf>,
) -> Result<()> {
    let input =
        input.unwrap_or_else(|| PathBuf::from("migration").join("_pre-filter-scores.jsonl"));
    let output_dir = input
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("migration"));

    println!(
        "Partitioning notes (tier: {}, cutoff: {})",
        tier,
        tier.cutoff()
    );

    let now = Local::now();
    let config = PartitionConfig {
        tier,
        max_domain_size,
        source_path,
        input,
        output_dir,
        today: now.format("%Y-%m-%d").to_string(),
        timestamp: now.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    };

    let report = partition_domains(&config)?;
    if report.domains.is_empty() {
        println!("No notes above cutoff threshold. Nothing to partition.");
        return Ok(());
    }

    println!("  {} notes above cutoff", report.notes_partitioned);
    for (name, count) in &report.domains {
        println!("  Domain '{name}': {count} notes");
    }

    println!();
    println!("Partitioning complete:");
    println!("  {} domain catalog(s) created", report.domains.len());
    println!("  Progress file: {}", report.progress_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Review samples per domain and triage each catalog");
    println!("  2. Execute: vellum migrate --catalog migration/catalog-domain-<name>.json");

    Ok(())
}
