//! Persisted note index
//!
//! The index is a single JSON file under `_meta/` that is fully rebuilt from
//! source files on each build. Two maintenance-tracking fields survive
//! rebuilds by reading the previous index before overwriting it. The file is
//! written with 2-space indentation and a trailing newline so rebuilds of an
//! unchanged vault are byte-identical and diff cleanly.

use crate::error::IndexResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use vellum_core::Note;

/// Directory under the vault root holding index and convention files.
pub const META_DIR: &str = "_meta";
/// Index file name within [`META_DIR`].
pub const INDEX_FILE: &str = "index.json";
/// Marker file that identifies a directory as a vault root.
pub const MARKER_FILE: &str = "conventions.md";

/// The full note collection plus maintenance-tracking metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteIndex {
    pub last_updated: String,
    pub last_maintained: String,
    pub notes_since_maintenance: u32,
    pub notes: BTreeMap<String, Note>,
}

impl NoteIndex {
    /// An empty index stamped with today's date.
    pub fn new(today: NaiveDate) -> Self {
        let date = today.format("%Y-%m-%d").to_string();
        Self {
            last_updated: date.clone(),
            last_maintained: date,
            notes_since_maintenance: 0,
            notes: BTreeMap::new(),
        }
    }

    /// Path of the index file for a vault root.
    pub fn path_for(vault_root: &Path) -> PathBuf {
        vault_root.join(META_DIR).join(INDEX_FILE)
    }

    /// Load a persisted index. Missing or corrupt files return `None`:
    /// corrupt state is treated as absent, with safe defaults substituted
    /// by the caller.
    pub fn load(path: &Path) -> Option<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => return None,
        };
        match serde_json::from_str(&text) {
            Ok(index) => Some(index),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring corrupt index file");
                None
            }
        }
    }

    /// Write the index with exact formatting: 2-space indent, trailing
    /// newline. Creates `_meta/` if needed.
    pub fn save(&self, path: &Path) -> IndexResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        fs::write(path, text)?;
        Ok(())
    }

    /// Count of notes in `proposed` lifecycle.
    pub fn proposed_count(&self) -> usize {
        self.notes
            .values()
            .filter(|note| note.lifecycle == vellum_core::Lifecycle::Proposed)
            .count()
    }

    /// Count of notes not in `dormant` lifecycle.
    pub fn non_dormant_count(&self) -> usize {
        self.notes
            .values()
            .filter(|note| note.lifecycle != vellum_core::Lifecycle::Dormant)
            .count()
    }
}
