use crate::config::CliConfig;
use anyhow::Result;
use chrono::Local;
use tracing::warn;
use vellum_graph::{build_index, NoteIndex};

/// Rebuild and persist the vault index.
///
/// A missing vault or a failed write degrades to a reported warning, not a
/// failure: index building is invoked from hooks that must never block.
pub fn execute(config: &CliConfig) -> Result<()> {
    let mut warnings = 0usize;

    let vault_root = match config.resolve_vault() {
        Some(root) => root,
        None => {
            warn!("vault root not found");
            println!("Index built: 0 notes indexed, 0 warnings");
            return Ok(());
        }
    };

    let today = Local::now().date_naive();
    let (index, report) = build_index(&vault_root, today)?;
    warnings += report.skipped;

    let index_path = NoteIndex::path_for(&vault_root);
    if let Err(err) = index.save(&index_path) {
        warn!(error = %err, "could not write index");
        warnings += 1;
    }

    println!(
        "Index built: {} notes indexed, {} warnings",
        report.indexed, warnings
    );
    Ok(())
}
