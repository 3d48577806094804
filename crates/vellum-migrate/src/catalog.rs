//! Migration catalogs
//!
//! A catalog is a per-domain batch of candidate notes awaiting triage. The
//! structural fields are machine-written by the partitioner; `action`,
//! `type`, `filename`, and `reason` are filled in by a human review step
//! external to this crate. Progress counters make batch execution
//! resumable: a rerun re-reads the last saved state and continues.

use crate::error::{MigrateError, MigrateResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const CATALOG_VERSION: &str = "1.0";

fn default_batch_size() -> usize {
    8
}

fn default_current_batch() -> usize {
    1
}

/// Resumable batch position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    /// Import entries processed so far.
    #[serde(default)]
    pub processed: usize,
    #[serde(default = "default_current_batch")]
    pub current_batch: usize,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            processed: 0,
            current_batch: 1,
        }
    }
}

/// One candidate note in a catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Path relative to the catalog's `source_path`.
    pub source: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_type: Option<String>,
    /// Triage decision: "import", "skip", or "merge". Null until reviewed.
    pub action: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub filename: Option<String>,
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_target: Option<String>,
}

impl CatalogEntry {
    /// A fresh, untriaged entry as the partitioner writes it.
    pub fn untriaged(source: String, score: i64, suggested_type: String) -> Self {
        Self {
            source,
            score,
            suggested_type: Some(suggested_type),
            action: None,
            kind: None,
            filename: None,
            reason: None,
            merge_target: None,
        }
    }
}

/// A per-domain migration catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub version: String,
    #[serde(default)]
    pub domain: String,
    pub source_path: String,
    #[serde(default)]
    pub created: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub source_count: usize,
    #[serde(default)]
    pub filtered_count: usize,
    /// Old reference text to new resolved path, or null for "unwrap to
    /// plain text".
    pub link_map: BTreeMap<String, Option<String>>,
    pub notes: Vec<CatalogEntry>,
    pub progress: Progress,
}

impl Catalog {
    /// Load and validate a catalog file. The required fields are checked
    /// explicitly so a hand-edited catalog fails with a usable message.
    pub fn load(path: &Path) -> MigrateResult<Catalog> {
        let text = fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&text)?;

        for field in ["version", "source_path", "link_map", "notes", "progress"] {
            if value.get(field).is_none() {
                return Err(MigrateError::CatalogField(field));
            }
        }

        Ok(serde_json::from_value(value)?)
    }

    /// Save with the exact persisted-JSON format: 2-space indent, trailing
    /// newline.
    pub fn save(&self, path: &Path) -> MigrateResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        fs::write(path, text)?;
        Ok(())
    }

    /// Entries triaged for import.
    pub fn import_entries(&self) -> Vec<&CatalogEntry> {
        self.notes
            .iter()
            .filter(|entry| entry.action.as_deref() == Some("import"))
            .collect()
    }

    /// Entries triaged for merge: reported, never executed automatically.
    pub fn merge_entries(&self) -> Vec<&CatalogEntry> {
        self.notes
            .iter()
            .filter(|entry| entry.action.as_deref() == Some("merge"))
            .collect()
    }
}
