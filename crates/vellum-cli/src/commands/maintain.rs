use crate::config::CliConfig;
use anyhow::{bail, Result};
use chrono::Local;
use colored::Colorize;
use vellum_graph::{run_health_checks, EdgeList, HealthReport, Priority, VaultContents};
use vellum_graph::health::HealthStats;

/// Run the five structural health checks and write both report forms.
pub fn execute(config: &CliConfig) -> Result<()> {
    let vault_root = match config.resolve_vault() {
        Some(root) => root,
        None => bail!("vault root not found (missing _meta/conventions.md marker)"),
    };

    println!("Loading vault data...");
    let contents = VaultContents::load(&vault_root);
    let edges = EdgeList::load(&EdgeList::path_for(&vault_root));
    println!(
        "  {} notes, {} sources",
        contents.notes.len(),
        contents.sources.len()
    );

    println!("Running checks...");
    let findings = run_health_checks(&contents, &edges);

    let report = HealthReport::new(
        findings,
        HealthStats {
            total_notes: contents.notes.len(),
            total_sources: contents.sources.len(),
        },
    );

    let generated = Local::now().format("%Y-%m-%d %H:%M").to_string();
    let (md_path, jsonl_path) = report.write(&vault_root, &generated)?;

    let high = report
        .findings
        .iter()
        .filter(|f| f.priority == Priority::High)
        .count();
    let medium = report
        .findings
        .iter()
        .filter(|f| f.priority == Priority::Medium)
        .count();
    let low = report
        .findings
        .iter()
        .filter(|f| f.priority == Priority::Low)
        .count();

    println!();
    println!("Findings:  {}", report.findings.len());
    println!("  {}    {}", "HIGH:".red().bold(), high);
    println!("  {}  {}", "MEDIUM:".yellow(), medium);
    println!("  {}     {}", "LOW:".normal(), low);
    println!();
    println!("Outputs:");
    println!("  {}", md_path.display());
    println!("  {}", jsonl_path.display());

    Ok(())
}
