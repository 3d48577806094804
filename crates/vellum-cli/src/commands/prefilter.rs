use anyhow::Result;
use chrono::Local;
use std::path::PathBuf;
use vellum_migrate::{prefilter_vault, Tier};

/// Score an external note collection and stream results to JSONL.
pub fn execute(source: PathBuf, tier: Tier, output: Option<PathBuf>) -> Result<()> {
    let output_path =
        output.unwrap_or_else(|| PathBuf::from("migration").join("_pre-filter-scores.jsonl"));

    println!("Pre-filtering source vault: {}", source.display());
    println!("Tier: {} (cutoff score: {})", tier, tier.cutoff());

    let today = Local::now().date_naive();
    let report = prefilter_vault(&source, &output_path, tier, today)?;

    let filtered_out = report.total - report.above_cutoff;
    let reduction = if report.total > 0 {
        filtered_out as f64 / report.total as f64 * 100.0
    } else {
        0.0
    };

    println!();
    println!("Results:");
    println!("  Total notes scanned: {}", report.total);
    println!(
        "  Above cutoff (score >= {}): {}",
        tier.cutoff(),
        report.above_cutoff
    );
    println!("  Filtered out: {filtered_out} ({reduction:.0}% reduction)");
    println!();
    println!("Output: {}", output_path.display());
    println!();
    println!("Next step: vellum partition --tier {tier}");

    Ok(())
}
