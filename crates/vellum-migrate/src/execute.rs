//! Catalog-driven batch import
//!
//! Consumes a triaged catalog: each `action: import` entry is read from the
//! source tree, its original frontmatter stripped, its wikilinks rewritten
//! through the catalog's link map, and the result written into the vault
//! with synthesized frontmatter. Processing happens in batches; progress is
//! persisted back into the catalog after each batch so an interrupted run
//! resumes where it left off. Existing target files are never overwritten.

use crate::catalog::Catalog;
use crate::error::{MigrateError, MigrateResult};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use vellum_core::count_unique_wikilinks;

/// Score at or above which an imported note skips the proposed/unverified
/// stage and lands as active/working.
pub const AUTO_PROMOTE_THRESHOLD: i64 = 90;

/// Note type to vault directory.
const TYPE_DIRS: &[(&str, &str)] = &[
    ("atom", "atoms"),
    ("tension", "tensions"),
    ("encounter", "encounters"),
    ("position", "positions"),
    ("question", "questions"),
    ("revision", "revisions"),
    ("anti-library", "anti-library"),
    ("falsification", "falsifications"),
];

/// Directory name for a note type, if known.
pub fn type_dir(kind: &str) -> Option<&'static str> {
    TYPE_DIRS
        .iter()
        .find(|(t, _)| *t == kind)
        .map(|(_, dir)| *dir)
}

/// Remove a leading frontmatter block. Content with no block, or with an
/// unterminated block, is returned untouched.
pub fn strip_frontmatter(content: &str) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    match lines.first() {
        Some(first) if first.trim() == "---" => {}
        _ => return content.to_string(),
    }

    for (i, line) in lines.iter().enumerate().skip(1) {
        if line.trim() == "---" {
            return lines[i + 1..].join("\n").trim_start_matches('\n').to_string();
        }
    }
    content.to_string()
}

/// Rewrite wikilinks according to the link map.
///
/// Mapped text is replaced with its target; a null mapping unwraps the
/// reference to plain text; unmapped links are left unchanged (broken links
/// are acceptable, they resolve to nothing downstream).
pub fn apply_link_map(content: &str, link_map: &BTreeMap<String, Option<String>>) -> String {
    let mut content = content.to_string();
    for (old_link, new_link) in link_map {
        if !content.contains(old_link.as_str()) {
            continue;
        }
        match new_link {
            Some(target) => content = content.replace(old_link.as_str(), target),
            None => {
                let plain = old_link.trim_start_matches('[').trim_end_matches(']');
                content = content.replace(old_link.as_str(), plain);
            }
        }
    }
    content
}

/// Vault-standard frontmatter for an imported note.
fn synthesize_frontmatter(
    kind: &str,
    status: &str,
    lifecycle: &str,
    today: &str,
    links_out: usize,
) -> String {
    format!(
        "---\n\
         type: {kind}\n\
         status: {status}\n\
         lifecycle: {lifecycle}\n\
         created: {today}\n\
         last_touched: {today}\n\
         links_out: {links_out}\n\
         origin: migration\n\
         ---\n"
    )
}

/// Calibrated-filter overrides produced by a review session.
#[derive(Debug, Deserialize)]
struct CalibratedFilters {
    #[serde(default)]
    auto_promote_threshold: Option<i64>,
    #[serde(default)]
    domain_overrides: BTreeMap<String, DomainOverride>,
}

#[derive(Debug, Deserialize)]
struct DomainOverride {
    #[serde(default)]
    auto_promote_threshold: Option<i64>,
}

/// Auto-promotion threshold for a domain, honoring calibrated filters when
/// present. Unreadable filter files fall back to the default.
pub fn load_auto_promote_threshold(migration_dir: &Path, domain: &str) -> i64 {
    let path = migration_dir.join("_calibrated-filters.json");
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(_) => return AUTO_PROMOTE_THRESHOLD,
    };
    let filters: CalibratedFilters = match serde_json::from_str(&text) {
        Ok(filters) => filters,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring corrupt calibrated filters");
            return AUTO_PROMOTE_THRESHOLD;
        }
    };

    filters
        .domain_overrides
        .get(domain)
        .and_then(|o| o.auto_promote_threshold)
        .or(filters.auto_promote_threshold)
        .unwrap_or(AUTO_PROMOTE_THRESHOLD)
}

/// Options for one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub dry_run: bool,
    /// Overrides the catalog's batch size when non-zero.
    pub batch_size: Option<usize>,
    /// Overrides the calibrated/default auto-promotion threshold.
    pub auto_promote_threshold: Option<i64>,
}

/// What one batch run did.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub batch_number: usize,
    /// 0-based range of import entries this batch covered.
    pub start: usize,
    pub end: usize,
    pub total_imports: usize,
    pub imported: usize,
    pub skipped: usize,
    /// Per-note result lines, in processing order.
    pub messages: Vec<String>,
    /// True when every import entry has been processed.
    pub complete: bool,
    /// Merge candidates awaiting manual handling: (source, target, reason).
    pub merge_pending: Vec<(String, String, String)>,
}

struct NoteResult {
    imported: bool,
    message: String,
}

fn process_entry(
    entry: &crate::catalog::CatalogEntry,
    catalog: &Catalog,
    vault_root: &Path,
    today: &str,
    dry_run: bool,
    promote_threshold: i64,
) -> NoteResult {
    let source_rel = &entry.source;

    let (kind, filename) = match (&entry.kind, &entry.filename) {
        (Some(kind), Some(filename)) if !kind.is_empty() && !filename.is_empty() => {
            (kind.clone(), filename.clone())
        }
        _ => {
            return NoteResult {
                imported: false,
                message: format!("  SKIP {source_rel}: missing type or filename"),
            }
        }
    };

    let dir = match type_dir(&kind) {
        Some(dir) => dir,
        None => {
            return NoteResult {
                imported: false,
                message: format!("  SKIP {source_rel}: unknown type '{kind}'"),
            }
        }
    };

    let target_dir = vault_root.join(dir);
    let target_path = target_dir.join(&filename);

    // Idempotency: a rerun must not clobber already-imported notes.
    if target_path.exists() {
        return NoteResult {
            imported: false,
            message: format!("  SKIP {source_rel}: target already exists at {dir}/{filename}"),
        };
    }

    let source_path = resolve_source(source_rel, &catalog.source_path);
    if !source_path.exists() {
        return NoteResult {
            imported: false,
            message: format!(
                "  SKIP {source_rel}: source file not found at {}",
                source_path.display()
            ),
        };
    }

    let content = match fs::read_to_string(&source_path) {
        Ok(content) => content,
        Err(err) => {
            return NoteResult {
                imported: false,
                message: format!("  SKIP {source_rel}: could not read source: {err}"),
            }
        }
    };

    let content = strip_frontmatter(&content);
    let content = apply_link_map(&content, &catalog.link_map);
    let links_out = count_unique_wikilinks(&content);

    let promoted = entry.score >= promote_threshold;
    let (lifecycle, status) = if promoted {
        ("active", "working")
    } else {
        ("proposed", "unverified")
    };

    let frontmatter = synthesize_frontmatter(&kind, status, lifecycle, today, links_out);
    let mut final_content = format!("{frontmatter}\n{content}");
    if !final_content.ends_with('\n') {
        final_content.push('\n');
    }

    let promo_tag = if promoted { " [auto-promoted]" } else { "" };

    if dry_run {
        return NoteResult {
            imported: true,
            message: format!(
                "  DRY-RUN: would write {dir}/{filename} ({links_out} links){promo_tag}"
            ),
        };
    }

    if let Err(err) = fs::create_dir_all(&target_dir) {
        return NoteResult {
            imported: false,
            message: format!("  ERROR {source_rel}: could not write: {err}"),
        };
    }
    if let Err(err) = fs::write(&target_path, final_content) {
        return NoteResult {
            imported: false,
            message: format!("  ERROR {source_rel}: could not write: {err}"),
        };
    }

    NoteResult {
        imported: true,
        message: format!("  OK: {dir}/{filename} ({links_out} links){promo_tag}"),
    }
}

fn resolve_source(source_rel: &str, source_path: &str) -> PathBuf {
    let rel = PathBuf::from(source_rel);
    if rel.is_absolute() || source_path.is_empty() {
        rel
    } else {
        Path::new(source_path).join(rel)
    }
}

/// Process the next batch of import entries and persist updated progress.
pub fn run_batch(
    catalog: &mut Catalog,
    catalog_path: &Path,
    vault_root: &Path,
    today: NaiveDate,
    options: &BatchOptions,
) -> MigrateResult<BatchOutcome> {
    if !vault_root.is_dir() {
        return Err(MigrateError::MissingInput(vault_root.display().to_string()));
    }

    let today_str = today.format("%Y-%m-%d").to_string();
    let batch_size = match options.batch_size {
        Some(size) if size > 0 => size,
        _ => catalog.batch_size,
    };
    let promote_threshold = options.auto_promote_threshold.unwrap_or_else(|| {
        let migration_dir = catalog_path.parent().unwrap_or(Path::new("."));
        load_auto_promote_threshold(migration_dir, &catalog.domain)
    });

    let import_indices: Vec<usize> = catalog
        .notes
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.action.as_deref() == Some("import"))
        .map(|(i, _)| i)
        .collect();
    let total_imports = import_indices.len();

    let merge_pending: Vec<(String, String, String)> = catalog
        .merge_entries()
        .iter()
        .map(|entry| {
            (
                entry.source.clone(),
                entry.merge_target.clone().unwrap_or_else(|| "???".to_string()),
                entry.reason.clone().unwrap_or_default(),
            )
        })
        .collect();

    let start = catalog.progress.processed;
    if start >= total_imports {
        return Ok(BatchOutcome {
            batch_number: catalog.progress.current_batch,
            start,
            end: start,
            total_imports,
            complete: true,
            merge_pending,
            ..BatchOutcome::default()
        });
    }

    let end = (start + batch_size).min(total_imports);
    let batch_number = catalog.progress.current_batch;
    debug!(batch = batch_number, start, end, "processing migration batch");

    let mut outcome = BatchOutcome {
        batch_number,
        start,
        end,
        total_imports,
        complete: end >= total_imports,
        merge_pending,
        ..BatchOutcome::default()
    };

    for &idx in &import_indices[start..end] {
        let result = process_entry(
            &catalog.notes[idx],
            catalog,
            vault_root,
            &today_str,
            options.dry_run,
            promote_threshold,
        );
        if result.imported {
            outcome.imported += 1;
        } else {
            outcome.skipped += 1;
        }
        outcome.messages.push(result.message);
    }

    // A dry run shows what would happen without moving the cursor.
    if !options.dry_run {
        catalog.progress.processed = end;
        catalog.progress.current_batch += 1;
        catalog.save(catalog_path)?;
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogEntry, Progress, CATALOG_VERSION};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 8).unwrap()
    }

    #[test]
    fn test_strip_frontmatter_variants() {
        assert_eq!(
            strip_frontmatter("---\ntype: note\n---\nBody here\n"),
            "Body here\n"
        );
        // no frontmatter: untouched
        assert_eq!(strip_frontmatter("Body only\n"), "Body only\n");
        // unterminated: untouched, nothing leaks
        let unterminated = "---\ntype: note\nBody?\n";
        assert_eq!(strip_frontmatter(unterminated), unterminated);
    }

    #[test]
    fn test_apply_link_map_cases() {
        let mut link_map = BTreeMap::new();
        link_map.insert(
            "[[External]]".to_string(),
            Some("[[positions/target]]".to_string()),
        );
        link_map.insert("[[Gone]]".to_string(), None);

        let content = "See [[External]] and [[Gone]] and [[Unmapped]].";
        let rewritten = apply_link_map(content, &link_map);
        assert_eq!(
            rewritten,
            "See [[positions/target]] and Gone and [[Unmapped]]."
        );
    }

    fn triaged_entry(source: &str, kind: &str, filename: &str, score: i64) -> CatalogEntry {
        CatalogEntry {
            source: source.to_string(),
            score,
            suggested_type: None,
            action: Some("import".to_string()),
            kind: Some(kind.to_string()),
            filename: Some(filename.to_string()),
            reason: None,
            merge_target: None,
        }
    }

    fn setup() -> (tempfile::TempDir, PathBuf, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        let vault = dir.path().join("vault");
        let catalog_path = dir.path().join("migration/catalog-domain-test.json");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::create_dir_all(&vault).unwrap();
        (dir, source, vault, catalog_path)
    }

    fn catalog_with(source: &Path, notes: Vec<CatalogEntry>) -> Catalog {
        Catalog {
            version: CATALOG_VERSION.to_string(),
            domain: "test".to_string(),
            source_path: source.display().to_string(),
            created: "2026-08-08".to_string(),
            batch_size: 2,
            source_count: notes.len(),
            filtered_count: notes.len(),
            link_map: BTreeMap::new(),
            notes,
            progress: Progress::default(),
        }
    }

    #[test]
    fn test_import_writes_with_synthesized_frontmatter() {
        let (_dir, source, vault, catalog_path) = setup();
        std::fs::write(
            source.join("idea.md"),
            "---\nold: frontmatter\n---\nThe idea links [[a]] and [[b]].\n",
        )
        .unwrap();

        let mut catalog =
            catalog_with(&source, vec![triaged_entry("idea.md", "atom", "idea.md", 50)]);
        let outcome = run_batch(
            &mut catalog,
            &catalog_path,
            &vault,
            today(),
            &BatchOptions::default(),
        )
        .unwrap();

        assert_eq!(outcome.imported, 1);
        assert!(outcome.complete);

        let written = std::fs::read_to_string(vault.join("atoms/idea.md")).unwrap();
        assert!(written.starts_with("---\ntype: atom\nstatus: unverified\nlifecycle: proposed\n"));
        assert!(written.contains("links_out: 2"));
        assert!(written.contains("origin: migration"));
        assert!(!written.contains("old: frontmatter"));
        assert!(written.ends_with('\n'));
    }

    #[test]
    fn test_high_score_auto_promoted() {
        let (_dir, source, vault, catalog_path) = setup();
        std::fs::write(source.join("hot.md"), "Important content.\n").unwrap();

        let mut catalog =
            catalog_with(&source, vec![triaged_entry("hot.md", "atom", "hot.md", 95)]);
        let outcome = run_batch(
            &mut catalog,
            &catalog_path,
            &vault,
            today(),
            &BatchOptions::default(),
        )
        .unwrap();

        assert!(outcome.messages[0].contains("[auto-promoted]"));
        let written = std::fs::read_to_string(vault.join("atoms/hot.md")).unwrap();
        assert!(written.contains("status: working"));
        assert!(written.contains("lifecycle: active"));
    }

    #[test]
    fn test_existing_target_not_overwritten() {
        let (_dir, source, vault, catalog_path) = setup();
        std::fs::write(source.join("idea.md"), "new content\n").unwrap();
        std::fs::create_dir_all(vault.join("atoms")).unwrap();
        std::fs::write(vault.join("atoms/idea.md"), "precious existing content\n").unwrap();

        let mut catalog =
            catalog_with(&source, vec![triaged_entry("idea.md", "atom", "idea.md", 50)]);
        let outcome = run_batch(
            &mut catalog,
            &catalog_path,
            &vault,
            today(),
            &BatchOptions::default(),
        )
        .unwrap();

        assert_eq!(outcome.skipped, 1);
        assert_eq!(
            std::fs::read_to_string(vault.join("atoms/idea.md")).unwrap(),
            "precious existing content\n"
        );
    }

    #[test]
    fn test_unknown_type_skipped() {
        let (_dir, source, vault, catalog_path) = setup();
        std::fs::write(source.join("x.md"), "content\n").unwrap();

        let mut catalog =
            catalog_with(&source, vec![triaged_entry("x.md", "widget", "x.md", 50)]);
        let outcome = run_batch(
            &mut catalog,
            &catalog_path,
            &vault,
            today(),
            &BatchOptions::default(),
        )
        .unwrap();

        assert_eq!(outcome.skipped, 1);
        assert!(outcome.messages[0].contains("unknown type 'widget'"));
    }

    #[test]
    fn test_batches_resume_from_persisted_progress() {
        let (_dir, source, vault, catalog_path) = setup();
        for i in 0..5 {
            std::fs::write(source.join(format!("n{i}.md")), format!("note {i}\n")).unwrap();
        }
        let entries: Vec<CatalogEntry> = (0..5)
            .map(|i| triaged_entry(&format!("n{i}.md"), "atom", &format!("n{i}.md"), 50))
            .collect();

        let mut catalog = catalog_with(&source, entries);
        catalog.save(&catalog_path).unwrap();

        // Batch 1: two notes.
        let outcome = run_batch(
            &mut catalog,
            &catalog_path,
            &vault,
            today(),
            &BatchOptions::default(),
        )
        .unwrap();
        assert_eq!((outcome.start, outcome.end), (0, 2));
        assert!(!outcome.complete);

        // Simulate interruption: reload the catalog from disk.
        let mut reloaded = Catalog::load(&catalog_path).unwrap();
        assert_eq!(reloaded.progress.processed, 2);
        assert_eq!(reloaded.progress.current_batch, 2);

        let outcome = run_batch(
            &mut reloaded,
            &catalog_path,
            &vault,
            today(),
            &BatchOptions::default(),
        )
        .unwrap();
        assert_eq!((outcome.start, outcome.end), (2, 4));

        // Batch 3 finishes; a fourth call reports completion idempotently.
        let outcome = run_batch(
            &mut reloaded,
            &catalog_path,
            &vault,
            today(),
            &BatchOptions::default(),
        )
        .unwrap();
        assert_eq!((outcome.start, outcome.end), (4, 5));
        assert!(outcome.complete);

        let outcome = run_batch(
            &mut reloaded,
            &catalog_path,
            &vault,
            today(),
            &BatchOptions::default(),
        )
        .unwrap();
        assert!(outcome.complete);
        assert_eq!(outcome.imported, 0);

        for i in 0..5 {
            assert!(vault.join(format!("atoms/n{i}.md")).exists());
        }
    }

    #[test]
    fn test_dry_run_leaves_no_trace() {
        let (_dir, source, vault, catalog_path) = setup();
        std::fs::write(source.join("idea.md"), "content\n").unwrap();

        let mut catalog =
            catalog_with(&source, vec![triaged_entry("idea.md", "atom", "idea.md", 50)]);
        let options = BatchOptions {
            dry_run: true,
            ..BatchOptions::default()
        };
        let outcome = run_batch(&mut catalog, &catalog_path, &vault, today(), &options).unwrap();

        assert!(outcome.messages[0].contains("DRY-RUN"));
        assert!(!vault.join("atoms/idea.md").exists());
        assert_eq!(catalog.progress.processed, 0);
        assert!(!catalog_path.exists());
    }

    #[test]
    fn test_merge_entries_reported_not_executed() {
        let (_dir, source, vault, catalog_path) = setup();
        let mut merge_entry = triaged_entry("dupe.md", "atom", "dupe.md", 50);
        merge_entry.action = Some("merge".to_string());
        merge_entry.merge_target = Some("atoms/original".to_string());
        merge_entry.reason = Some("near duplicate".to_string());

        let mut catalog = catalog_with(&source, vec![merge_entry]);
        let outcome = run_batch(
            &mut catalog,
            &catalog_path,
            &vault,
            today(),
            &BatchOptions::default(),
        )
        .unwrap();

        assert!(outcome.complete);
        assert_eq!(outcome.merge_pending.len(), 1);
        assert_eq!(outcome.merge_pending[0].1, "atoms/original");
        assert!(!vault.join("atoms/dupe.md").exists());
    }
}
