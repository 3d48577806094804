//! Cross-domain link-map merging
//!
//! After every domain has been imported, per-domain link maps are unified
//! into a single old-reference → vault-path index, and wikilinks in the
//! migrated notes that the per-domain maps could not resolve are rewritten
//! against it. Display text in `[[target|display]]` references survives
//! the rewrite.

use crate::error::MigrateResult;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;
use vellum_core::read_document;

/// Unified index file written next to the per-domain link maps.
pub const CROSS_INDEX_FILE: &str = "_cross-domain-index.json";

/// Summary of one merge run.
#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    pub mappings: usize,
    pub notes_scanned: usize,
    pub files_modified: usize,
    pub links_rewritten: usize,
}

/// Load all `_linkmap-*.json` files in the migration directory into one
/// mapping. Null values (explicitly unresolvable) are dropped; unreadable
/// files are skipped with a warning.
pub fn load_linkmaps(migration_dir: &Path) -> MigrateResult<BTreeMap<String, String>> {
    let mut unified = BTreeMap::new();

    let mut linkmap_files: Vec<PathBuf> = fs::read_dir(migration_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("_linkmap-") && name.ends_with(".json"))
        })
        .collect();
    linkmap_files.sort();

    for path in linkmap_files {
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not read link map");
                continue;
            }
        };
        let data: Value = match serde_json::from_str(&text) {
            Ok(data) => data,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not parse link map");
                continue;
            }
        };

        if let Value::Object(map) = data {
            for (old, new) in map {
                if let Value::String(target) = new {
                    unified.insert(old, target);
                }
            }
        }
    }

    Ok(unified)
}

fn is_hidden_or_meta(rel: &Path) -> bool {
    let mut components = rel.components();
    let first_is_meta =
        matches!(components.next(), Some(Component::Normal(name)) if name == "_meta");
    first_is_meta
        || rel.components().any(|component| {
            matches!(component, Component::Normal(name) if name.to_string_lossy().starts_with('.'))
        })
}

/// Vault notes with `origin: migration`, sorted by path.
pub fn find_migrated_notes(vault_root: &Path) -> Vec<PathBuf> {
    let mut notes: Vec<PathBuf> = WalkDir::new(vault_root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
        .filter(|path| {
            let rel = path.strip_prefix(vault_root).unwrap_or(path);
            !is_hidden_or_meta(rel)
        })
        .filter(|path| match read_document(path) {
            Ok((fm, _)) => fm.get_str("origin") == Some("migration"),
            Err(_) => false,
        })
        .collect();
    notes.sort();
    notes
}

/// Rewrite unresolved wikilinks using the cross-domain index.
///
/// Returns the new content and the number of mappings that changed it.
pub fn rewrite_links(content: &str, cross_index: &BTreeMap<String, String>) -> (String, usize) {
    let mut content = content.to_string();
    let mut count = 0;

    for (old_text, new_path) in cross_index {
        let pattern = format!(r"\[\[{}(\|[^\]]*)?\]\]", regex::escape(old_text));
        let re = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(_) => continue,
        };
        if !re.is_match(&content) {
            continue;
        }
        let rewritten = re
            .replace_all(&content, |caps: &regex::Captures| {
                let display = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("[[{new_path}{display}]]")
            })
            .into_owned();
        if rewritten != content {
            count += 1;
            content = rewritten;
        }
    }

    (content, count)
}

/// Merge all per-domain link maps, write the unified index, and rewrite
/// cross-domain links in migrated notes.
pub fn merge_linkmaps(
    vault_root: &Path,
    migration_dir: &Path,
    dry_run: bool,
) -> MigrateResult<MergeReport> {
    let cross_index = load_linkmaps(migration_dir)?;
    let mut report = MergeReport {
        mappings: cross_index.len(),
        ..MergeReport::default()
    };
    if cross_index.is_empty() {
        return Ok(report);
    }

    // Persist the unified index for reference before touching any note.
    if !dry_run {
        let index_path = migration_dir.join(CROSS_INDEX_FILE);
        let mut text = serde_json::to_string_pretty(&cross_index)?;
        text.push('\n');
        fs::write(index_path, text)?;
    }

    let migrated = find_migrated_notes(vault_root);
    report.notes_scanned = migrated.len();

    for path in migrated {
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not read migrated note");
                continue;
            }
        };

        let (new_content, rewrites) = rewrite_links(&content, &cross_index);
        if rewrites == 0 {
            continue;
        }

        debug!(path = %path.display(), rewrites, "rewriting cross-domain links");
        if !dry_run {
            fs::write(&path, new_content)?;
        }
        report.files_modified += 1;
        report.links_rewritten += rewrites;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_preserves_display_text() {
        let mut index = BTreeMap::new();
        index.insert("Old Note".to_string(), "atoms/old-note".to_string());

        let (content, count) =
            rewrite_links("See [[Old Note]] and [[Old Note|the classic]].", &index);
        assert_eq!(
            content,
            "See [[atoms/old-note]] and [[atoms/old-note|the classic]]."
        );
        assert_eq!(count, 1);
    }

    #[test]
    fn test_rewrite_leaves_unmapped_links() {
        let index = BTreeMap::new();
        let original = "Nothing to do with [[whatever]].";
        let (content, count) = rewrite_links(original, &index);
        assert_eq!(content, original);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_rewrite_escapes_regex_metacharacters() {
        let mut index = BTreeMap::new();
        index.insert("What (really)?".to_string(), "questions/what".to_string());

        let (content, count) = rewrite_links("Ask [[What (really)?]].", &index);
        assert_eq!(content, "Ask [[questions/what]].");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_load_linkmaps_drops_nulls_and_merges() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("_linkmap-alpha.json"),
            r#"{"A": "atoms/a", "Dead": null}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("_linkmap-beta.json"),
            r#"{"B": "atoms/b"}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("_linkmap-bad.json"), "{broken").unwrap();
        std::fs::write(dir.path().join("unrelated.json"), r#"{"X": "y"}"#).unwrap();

        let unified = load_linkmaps(dir.path()).unwrap();
        assert_eq!(unified.len(), 2);
        assert_eq!(unified["A"], "atoms/a");
        assert_eq!(unified["B"], "atoms/b");
        assert!(!unified.contains_key("Dead"));
        assert!(!unified.contains_key("X"));
    }

    #[test]
    fn test_merge_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let vault = dir.path().join("vault");
        let migration = dir.path().join("migration");
        std::fs::create_dir_all(vault.join("atoms")).unwrap();
        std::fs::create_dir_all(&migration).unwrap();

        std::fs::write(
            vault.join("atoms/imported.md"),
            "---\ntype: atom\norigin: migration\n---\nLinks to [[External Ref]].\n",
        )
        .unwrap();
        std::fs::write(
            vault.join("atoms/native.md"),
            "---\ntype: atom\n---\nAlso [[External Ref]], but native notes are left alone.\n",
        )
        .unwrap();
        std::fs::write(
            migration.join("_linkmap-test.json"),
            r#"{"External Ref": "positions/external-ref"}"#,
        )
        .unwrap();

        let report = merge_linkmaps(&vault, &migration, false).unwrap();
        assert_eq!(report.mappings, 1);
        assert_eq!(report.notes_scanned, 1);
        assert_eq!(report.files_modified, 1);
        assert_eq!(report.links_rewritten, 1);

        let rewritten = std::fs::read_to_string(vault.join("atoms/imported.md")).unwrap();
        assert!(rewritten.contains("[[positions/external-ref]]"));

        let native = std::fs::read_to_string(vault.join("atoms/native.md")).unwrap();
        assert!(native.contains("[[External Ref]]"));

        assert!(migration.join(CROSS_INDEX_FILE).exists());
    }

    #[test]
    fn test_dry_run_modifies_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let vault = dir.path().join("vault");
        let migration = dir.path().join("migration");
        std::fs::create_dir_all(vault.join("atoms")).unwrap();
        std::fs::create_dir_all(&migration).unwrap();

        let original = "---\norigin: migration\n---\n[[Ref]]\n";
        std::fs::write(vault.join("atoms/note.md"), original).unwrap();
        std::fs::write(
            migration.join("_linkmap-x.json"),
            r#"{"Ref": "atoms/ref"}"#,
        )
        .unwrap();

        let report = merge_linkmaps(&vault, &migration, true).unwrap();
        assert_eq!(report.files_modified, 1);
        assert_eq!(
            std::fs::read_to_string(vault.join("atoms/note.md")).unwrap(),
            original
        );
        assert!(!migration.join(CROSS_INDEX_FILE).exists());
    }
}
