use crate::config::CliConfig;
use anyhow::{bail, Result};
use chrono::Local;
use std::path::PathBuf;
use vellum_graph::index::META_DIR;
use vellum_migrate::{run_batch, BatchOptions, Catalog};

/// Execute the next batch of a prepared migration catalog.
pub fn execute(
    config: &CliConfig,
    dry_run: bool,
    batch_size: usize,
    catalog_path: Option<PathBuf>,
) -> Result<()> {
    let vault_root = match config.resolve_vault() {
        Some(root) => root,
        None => bail!("vault root not found (missing _meta/conventions.md marker)"),
    };

    let catalog_path = catalog_path
        .unwrap_or_else(|| vault_root.join(META_DIR).join("migration-catalog.json"));
    if !catalog_path.exists() {
        bail!(
            "no migration catalog found at {} (run `vellum partition` or triage one first)",
            catalog_path.display()
        );
    }

    let mut catalog = Catalog::load(&catalog_path)?;
    let options = BatchOptions {
        dry_run,
        batch_size: (batch_size > 0).then_some(batch_size),
        auto_promote_threshold: None,
    };

    let today = Local::now().date_naive();
    let outcome = run_batch(&mut catalog, &catalog_path, &vault_root, today, &options)?;

    if outcome.complete && outcome.imported == 0 && outcome.skipped == 0 {
        println!(
            "Migration complete: all {} import notes have been processed.",
            outcome.total_imports
        );
        print_merge_pending(&outcome.merge_pending);
        return Ok(());
    }

    println!(
        "Migration batch {}: notes {}-{} of {} imports",
        outcome.batch_number,
        outcome.start + 1,
        outcome.end,
        outcome.total_imports
    );
    if dry_run {
        println!("(DRY RUN \u{2014} no files will be written)");
    }
    println!();

    for message in &outcome.messages {
        println!("{message}");
    }

    println!();
    println!(
        "Batch complete: {} imported, {} skipped",
        outcome.imported, outcome.skipped
    );

    let remaining = outcome.total_imports - outcome.end;
    if remaining > 0 {
        println!("{remaining} import notes remain in future batches.");
        println!();
        println!("Next steps:");
        println!("  1. Run: vellum index");
        println!("  2. Run: vellum maintain (review proposed notes)");
        println!("  3. Re-run: vellum migrate --catalog {}", catalog_path.display());
    } else {
        println!("All import notes processed.");
        println!();
        println!("Next steps:");
        println!("  1. Run: vellum index");
        println!("  2. Run: vellum maintain (review all proposed notes)");
    }

    print_merge_pending(&outcome.merge_pending);
    Ok(())
}

fn print_merge_pending(merge_pending: &[(String, String, String)]) {
    if merge_pending.is_empty() {
        return;
    }
    println!();
    println!(
        "{} merge candidate(s) remain \u{2014} handle these in a review session:",
        merge_pending.len()
    );
    for (source, target, reason) in merge_pending {
        println!("  {source} -> {target}: {reason}");
    }
}
