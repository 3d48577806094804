//! Graph index builder
//!
//! Two passes over the vault: the first parses every note file and fills
//! all fields except `links_in`; the second resolves backlinks by exact key
//! match. Files with malformed frontmatter are skipped with a warning and
//! counted, never fatal. Enumeration is sorted so a rebuild of an
//! unchanged vault is byte-identical.

use crate::error::IndexResult;
use crate::index::{NoteIndex, META_DIR};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;
use vellum_core::{
    dedupe_preserving_order, extract_keywords, extract_title, extract_wikilinks, read_document,
    strip_code, Lifecycle, Note,
};

/// Outcome of an index build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub indexed: usize,
    pub skipped: usize,
}

/// True if any path component is hidden (starts with a dot).
fn has_hidden_component(rel: &Path) -> bool {
    rel.components().any(|component| {
        matches!(component, Component::Normal(name) if name.to_string_lossy().starts_with('.'))
    })
}

/// True if the path lives under the vault's `_meta/` directory.
fn is_meta(rel: &Path) -> bool {
    matches!(rel.components().next(), Some(Component::Normal(name)) if name == META_DIR)
}

/// Note key for a vault-relative path: slash-separated, no extension.
fn note_key(rel: &Path) -> String {
    let without_ext = rel.with_extension("");
    without_ext
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// All indexable markdown files under the vault root, sorted by path.
pub fn list_note_files(vault_root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(vault_root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
        .filter(|path| {
            let rel = path.strip_prefix(vault_root).unwrap_or(path);
            !is_meta(rel) && !has_hidden_component(rel)
        })
        .collect();
    files.sort();
    files
}

/// Parse one note file into a `Note` record (without `links_in`).
pub fn parse_note(path: &Path) -> Result<Note, vellum_core::ParseError> {
    let (fm, body_lines) = read_document(path)?;

    let title = extract_title(&body_lines);

    // Code regions are stripped before link discovery; heading-derived
    // keywords use the raw lines.
    let body_text = strip_code(&body_lines.join("\n"));
    let raw_links = extract_wikilinks(&body_text);
    let links_out = dedupe_preserving_order(&raw_links);
    let keywords = extract_keywords(&body_lines, &links_out);

    Ok(Note {
        kind: fm.str_or("type", "").to_string(),
        status: fm.str_or("status", "").to_string(),
        lifecycle: Lifecycle::parse(fm.str_or("lifecycle", "active")),
        created: fm.str_or("created", "").to_string(),
        last_touched: fm.str_or("last_touched", "").to_string(),
        origin: fm.str_or("origin", "").to_string(),
        keywords,
        links_out,
        links_in: Vec::new(),
        title,
    })
}

/// First pass: parse every vault note. Returns the note map and the count
/// of files skipped for malformed frontmatter or read failures.
pub fn scan_notes(vault_root: &Path) -> (BTreeMap<String, Note>, usize) {
    let mut notes = BTreeMap::new();
    let mut skipped = 0;

    for path in list_note_files(vault_root) {
        let rel = path.strip_prefix(vault_root).unwrap_or(&path);
        let key = note_key(rel);

        match parse_note(&path) {
            Ok(note) => {
                debug!(key = %key, "indexed note");
                notes.insert(key, note);
            }
            Err(err) => {
                warn!(key = %key, error = %err, "skipping note (malformed or missing frontmatter)");
                skipped += 1;
            }
        }
    }

    (notes, skipped)
}

/// Resolve `links_in` across a note map: exact key match only, idempotent,
/// sorted for determinism.
pub fn resolve_backlinks(notes: &mut BTreeMap<String, Note>) {
    let sources: Vec<(String, Vec<String>)> = notes
        .iter()
        .map(|(key, note)| (key.clone(), note.links_out.clone()))
        .collect();

    for (source_key, links_out) in sources {
        for target in links_out {
            if let Some(target_note) = notes.get_mut(&target) {
                if !target_note.links_in.contains(&source_key) {
                    target_note.links_in.push(source_key.clone());
                }
            }
        }
    }

    for note in notes.values_mut() {
        note.links_in.sort();
    }
}

/// Build the full index for a vault, carrying maintenance-tracking fields
/// forward from any previous index file.
pub fn build_index(vault_root: &Path, today: NaiveDate) -> IndexResult<(NoteIndex, BuildReport)> {
    let today_str = today.format("%Y-%m-%d").to_string();

    // Preserve maintenance fields from the existing index, if readable.
    let existing = NoteIndex::load(&NoteIndex::path_for(vault_root));
    let (last_maintained, notes_since_maintenance) = match existing {
        Some(previous) => (previous.last_maintained, previous.notes_since_maintenance),
        None => (today_str.clone(), 0),
    };

    let (mut notes, skipped) = scan_notes(vault_root);
    resolve_backlinks(&mut notes);

    let report = BuildReport {
        indexed: notes.len(),
        skipped,
    };

    let index = NoteIndex {
        last_updated: today_str,
        last_maintained,
        notes_since_maintenance,
        notes,
    };

    Ok((index, report))
}
