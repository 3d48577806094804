use crate::config::CliConfig;
use anyhow::{bail, Result};
use vellum_migrate::merge_linkmaps;

/// Merge per-domain link maps and rewrite cross-domain wikilinks.
pub fn execute(config: &CliConfig, dry_run: bool) -> Result<()> {
    let vault_root = match config.resolve_vault() {
        Some(root) => root,
        None => bail!("vault root not found (missing _meta/conventions.md marker)"),
    };

    let migration_dir = config.resolve_migration_dir(&vault_root);
    if !migration_dir.is_dir() {
        bail!("migration directory not found at {}", migration_dir.display());
    }

    println!("Loading per-domain link maps...");
    let report = merge_linkmaps(&vault_root, &migration_dir, dry_run)?;

    if report.mappings == 0 {
        println!("No link maps found. Nothing to merge.");
        println!("Link maps are created during triage as migration/_linkmap-<domain>.json");
        return Ok(());
    }

    println!("  Unified cross-domain index: {} mappings", report.mappings);
    println!("  Scanned {} migrated notes", report.notes_scanned);

    let would = if dry_run { "would be " } else { "" };
    println!();
    println!("Cross-domain link resolution complete:");
    println!("  Files {would}modified: {}", report.files_modified);
    println!("  Links {would}rewritten: {}", report.links_rewritten);

    if report.links_rewritten > 0 && !dry_run {
        println!();
        println!("Next steps:");
        println!("  1. Run: vellum index");
        println!("  2. Run: vellum maintain (spot-check review)");
    }

    Ok(())
}
