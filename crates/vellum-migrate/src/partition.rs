//! Domain partitioning by link co-occurrence signature
//!
//! Pre-filtered notes are clustered into coherent migration batches: each
//! note's signature is its top-5 most globally-referenced outbound link
//! targets, notes sharing an identical signature form a cluster, undersized
//! clusters are merged into their structurally closest neighbor, and each
//! surviving cluster becomes a named per-domain catalog.

use crate::catalog::{Catalog, CatalogEntry, Progress, CATALOG_VERSION};
use crate::error::MigrateResult;
use crate::prefilter::{load_scored, ScoredNote, Tier};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::info;

/// Clusters smaller than this are merged into a larger neighbor.
pub const MIN_CLUSTER_SIZE: usize = 3;

/// Signature assigned to notes with no outbound links at all.
const UNLINKED_SIGNATURE: &str = "__unlinked__";

static TARGET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]|]+)").expect("target regex"));

static DATE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("date prefix regex"));

static NAME_SANITIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9-]").expect("name sanitize regex"));

/// Partition parameters.
#[derive(Debug, Clone)]
pub struct PartitionConfig {
    pub tier: Tier,
    /// Maximum notes per domain catalog before splitting.
    pub max_domain_size: usize,
    /// Source vault path recorded in catalogs for the execute step.
    pub source_path: String,
    /// Pre-filter JSONL input.
    pub input: PathBuf,
    /// Directory receiving catalog and progress files.
    pub output_dir: PathBuf,
    /// Date stamp for `created` fields (YYYY-MM-DD).
    pub today: String,
    /// Timestamp for the progress file (RFC 3339-ish, to the second).
    pub timestamp: String,
}

/// What got written where.
#[derive(Debug, Clone, Default)]
pub struct PartitionReport {
    /// Domain name and note count, in output order.
    pub domains: Vec<(String, usize)>,
    pub notes_partitioned: usize,
    pub progress_path: PathBuf,
}

/// Bare targets from raw `[[target]]` strings.
fn extract_targets(wikilinks: &[String]) -> Vec<String> {
    wikilinks
        .iter()
        .filter_map(|link| TARGET_RE.captures(link))
        .map(|cap| cap[1].trim().to_string())
        .collect()
}

type Signature = Vec<String>;

/// Compute each note's signature: its top-5 outbound targets ranked by
/// global reference frequency across the whole candidate set.
fn build_signatures(notes: &[ScoredNote]) -> Vec<(usize, Signature)> {
    let mut global_counts: HashMap<String, usize> = HashMap::new();
    let mut per_note_targets: Vec<Vec<String>> = Vec::with_capacity(notes.len());

    for note in notes {
        let targets = extract_targets(&note.wikilinks);
        for target in &targets {
            *global_counts.entry(target.clone()).or_insert(0) += 1;
        }
        per_note_targets.push(targets);
    }

    per_note_targets
        .into_iter()
        .enumerate()
        .map(|(idx, targets)| {
            if targets.is_empty() {
                return (idx, vec![UNLINKED_SIGNATURE.to_string()]);
            }
            let unique: BTreeSet<String> = targets.into_iter().collect();
            let mut scored: Vec<(usize, String)> = unique
                .into_iter()
                .map(|target| (global_counts[&target], target))
                .collect();
            // Frequency descending, then reverse-lexicographic: fully
            // deterministic regardless of input order.
            scored.sort_by(|a, b| b.cmp(a));
            let signature = scored.into_iter().take(5).map(|(_, t)| t).collect();
            (idx, signature)
        })
        .collect()
}

/// Group note indices by identical signature, first-encounter order.
fn cluster_by_signature(signatures: Vec<(usize, Signature)>) -> Vec<(Signature, Vec<usize>)> {
    let mut clusters: Vec<(Signature, Vec<usize>)> = Vec::new();
    let mut positions: HashMap<Signature, usize> = HashMap::new();

    for (idx, signature) in signatures {
        match positions.get(&signature) {
            Some(&pos) => clusters[pos].1.push(idx),
            None => {
                positions.insert(signature.clone(), clusters.len());
                clusters.push((signature, vec![idx]));
            }
        }
    }
    clusters
}

/// Merge clusters below the minimum size into the larger cluster with the
/// highest signature overlap; first-encountered wins ties. If every cluster
/// is small, they pass through unmerged.
fn merge_small_clusters(clusters: Vec<(Signature, Vec<usize>)>) -> Vec<(Signature, Vec<usize>)> {
    let any_large = clusters.iter().any(|(_, notes)| notes.len() >= MIN_CLUSTER_SIZE);
    if !any_large {
        return clusters;
    }

    let mut large: Vec<(Signature, Vec<usize>)> = Vec::new();
    let mut small: Vec<(Signature, Vec<usize>)> = Vec::new();
    for cluster in clusters {
        if cluster.1.len() >= MIN_CLUSTER_SIZE {
            large.push(cluster);
        } else {
            small.push(cluster);
        }
    }

    for (signature, notes) in small {
        let sig_set: HashSet<&String> = signature.iter().collect();
        let mut best = 0;
        let mut best_overlap = -1i64;
        for (pos, (large_sig, _)) in large.iter().enumerate() {
            let overlap = large_sig.iter().filter(|t| sig_set.contains(t)).count() as i64;
            if overlap > best_overlap {
                best_overlap = overlap;
                best = pos;
            }
        }
        large[best].1.extend(notes);
    }

    large
}

/// Name a cluster from its single most-frequent link target.
fn name_domain(signature: &Signature, notes: &[ScoredNote], members: &[usize]) -> String {
    if signature.len() == 1 && signature[0] == UNLINKED_SIGNATURE {
        return "unlinked".to_string();
    }

    // First-encounter counting so ties resolve deterministically.
    let mut counts: Vec<(String, usize)> = Vec::new();
    for &idx in members {
        for target in extract_targets(&notes[idx].wikilinks) {
            match counts.iter_mut().find(|(t, _)| *t == target) {
                Some((_, count)) => *count += 1,
                None => counts.push((target, 1)),
            }
        }
    }

    // First-encountered target wins a frequency tie.
    let mut most_common: Option<(&String, usize)> = None;
    for (target, count) in &counts {
        if most_common.map_or(true, |(_, best)| *count > best) {
            most_common = Some((target, *count));
        }
    }
    let most_common = most_common.map(|(t, _)| t.clone());

    match most_common {
        Some(target) => {
            let basename = target.rsplit('/').next().unwrap_or(&target);
            let stem = basename.rsplit_once('.').map_or(basename, |(s, _)| s);
            let name = NAME_SANITIZE_RE
                .replace_all(stem, "-")
                .to_lowercase()
                .trim_matches('-')
                .to_string();
            if name.is_empty() {
                "misc".to_string()
            } else {
                name
            }
        }
        None => "misc".to_string(),
    }
}

/// Split a domain exceeding `max_size` by first letter of source filename,
/// then greedily rechunk.
fn split_oversized(
    name: String,
    members: Vec<usize>,
    notes: &[ScoredNote],
    max_size: usize,
) -> Vec<(String, Vec<usize>)> {
    if members.len() <= max_size {
        return vec![(name, members)];
    }

    let mut char_groups: BTreeMap<char, Vec<usize>> = BTreeMap::new();
    for idx in members {
        let basename = notes[idx]
            .source
            .rsplit('/')
            .next()
            .unwrap_or(&notes[idx].source);
        let stem = basename.rsplit_once('.').map_or(basename, |(s, _)| s);
        let first = stem
            .chars()
            .next()
            .map(|c| c.to_ascii_lowercase())
            .unwrap_or('_');
        char_groups.entry(first).or_default().push(idx);
    }

    let mut result = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut suffix = 0;

    for group in char_groups.into_values() {
        if !current.is_empty() && current.len() + group.len() > max_size {
            suffix += 1;
            result.push((format!("{name}-{suffix}"), std::mem::take(&mut current)));
        }
        current.extend(group);
    }
    if !current.is_empty() {
        suffix += 1;
        result.push((format!("{name}-{suffix}"), current));
    }

    result
}

/// Suggested vault type for a candidate, from filename and shape heuristics.
fn suggest_type(note: &ScoredNote) -> &'static str {
    let basename = note
        .source
        .to_lowercase()
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();
    let stem = basename
        .rsplit_once('.')
        .map_or(basename.as_str(), |(s, _)| s)
        .to_string();

    if DATE_PREFIX_RE.is_match(&stem) {
        return "encounter";
    }
    if stem.contains("vs") || stem.contains("tension") || stem.contains("tradeoff") {
        return "tension";
    }
    if note.word_count < 150 && note.wikilinks.len() >= 2 {
        return "atom";
    }
    if stem.ends_with('?') || stem.contains("question") {
        return "question";
    }
    "encounter"
}

#[derive(Serialize)]
struct DomainProgress {
    status: &'static str,
    notes_filtered: usize,
    notes_processed: usize,
    last_batch: usize,
}

#[derive(Serialize)]
struct GlobalProgress {
    tier: String,
    source_vault: String,
    total_source_notes: usize,
    total_filtered_notes: usize,
    domains: BTreeMap<String, DomainProgress>,
    last_updated: String,
}

fn build_catalog(config: &PartitionConfig, name: &str, members: &[usize], notes: &[ScoredNote], total_source: usize) -> Catalog {
    let entries = members
        .iter()
        .map(|&idx| {
            let note = &notes[idx];
            CatalogEntry::untriaged(
                note.source.clone(),
                note.score,
                suggest_type(note).to_string(),
            )
        })
        .collect();

    Catalog {
        version: CATALOG_VERSION.to_string(),
        domain: name.to_string(),
        source_path: config.source_path.clone(),
        created: config.today.clone(),
        batch_size: config.tier.batch_size(),
        source_count: total_source,
        filtered_count: members.len(),
        link_map: BTreeMap::new(),
        notes: entries,
        progress: Progress::default(),
    }
}

/// Partition pre-filtered notes into per-domain catalogs and write them,
/// along with the global progress tracker.
pub fn partition_domains(config: &PartitionConfig) -> MigrateResult<PartitionReport> {
    let notes = load_scored(&config.input, config.tier.cutoff())?;
    if notes.is_empty() {
        return Ok(PartitionReport::default());
    }

    // Total lines in the input approximates the scanned source size.
    let total_source = fs::read_to_string(&config.input)?
        .lines()
        .filter(|line| !line.trim().is_empty())
        .count();

    let signatures = build_signatures(&notes);
    let raw_clusters = cluster_by_signature(signatures);
    info!(clusters = raw_clusters.len(), "raw signature clusters");

    let merged = merge_small_clusters(raw_clusters);

    // Name, split oversized, then disambiguate collisions with a numeric
    // suffix.
    let mut named: Vec<(String, Vec<usize>)> = Vec::new();
    for (signature, members) in merged {
        let name = name_domain(&signature, &notes, &members);
        named.extend(split_oversized(name, members, &notes, config.max_domain_size));
    }

    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut final_domains: Vec<(String, Vec<usize>)> = Vec::new();
    for (name, members) in named {
        let count = seen.entry(name.clone()).or_insert(0);
        *count += 1;
        let unique_name = if *count > 1 {
            format!("{name}-{count}")
        } else {
            name
        };
        final_domains.push((unique_name, members));
    }

    fs::create_dir_all(&config.output_dir)?;

    let mut report = PartitionReport {
        notes_partitioned: notes.len(),
        ..PartitionReport::default()
    };
    let mut domain_progress: BTreeMap<String, DomainProgress> = BTreeMap::new();

    for (name, members) in &final_domains {
        let catalog = build_catalog(config, name, members, &notes, total_source);
        let catalog_path = config.output_dir.join(format!("catalog-domain-{name}.json"));
        catalog.save(&catalog_path)?;

        domain_progress.insert(
            name.clone(),
            DomainProgress {
                status: "pending",
                notes_filtered: members.len(),
                notes_processed: 0,
                last_batch: 0,
            },
        );
        report.domains.push((name.clone(), members.len()));
    }

    let progress = GlobalProgress {
        tier: config.tier.as_str().to_string(),
        source_vault: config.source_path.clone(),
        total_source_notes: total_source,
        total_filtered_notes: notes.len(),
        domains: domain_progress,
        last_updated: config.timestamp.clone(),
    };
    let progress_path = config.output_dir.join("_progress.json");
    let mut text = serde_json::to_string_pretty(&progress)?;
    text.push('\n');
    fs::write(&progress_path, text)?;
    report.progress_path = progress_path;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(source: &str, links: &[&str]) -> ScoredNote {
        ScoredNote {
            source: source.to_string(),
            score: 50,
            wikilinks: links.iter().map(|l| format!("[[{l}]]")).collect(),
            word_count: 300,
            heading_count: 2,
            bidirectional_links: 0,
            mtime: String::new(),
        }
    }

    #[test]
    fn test_extract_targets_handles_aliases() {
        let links = vec!["[[a/b|shown]]".to_string(), "[[plain]]".to_string()];
        assert_eq!(extract_targets(&links), vec!["a/b", "plain"]);
    }

    #[test]
    fn test_signature_is_top_five_by_global_frequency() {
        // "hub" is referenced by all three notes, so it ranks first in
        // every signature that contains it.
        let notes = vec![
            scored("a.md", &["hub", "x1", "x2", "x3", "x4", "x5"]),
            scored("b.md", &["hub"]),
            scored("c.md", &["hub"]),
        ];
        let signatures = build_signatures(&notes);
        let (_, sig_a) = &signatures[0];
        assert_eq!(sig_a.len(), 5);
        assert_eq!(sig_a[0], "hub");
        assert_eq!(signatures[1].1, vec!["hub"]);
    }

    #[test]
    fn test_unlinked_notes_get_sentinel_signature() {
        let notes = vec![scored("a.md", &[])];
        let signatures = build_signatures(&notes);
        assert_eq!(signatures[0].1, vec![UNLINKED_SIGNATURE]);
    }

    #[test]
    fn test_identical_signatures_cluster_together() {
        let notes = vec![
            scored("a.md", &["hub"]),
            scored("b.md", &["hub"]),
            scored("c.md", &["other"]),
        ];
        let clusters = cluster_by_signature(build_signatures(&notes));
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].1, vec![0, 1]);
        assert_eq!(clusters[1].1, vec![2]);
    }

    #[test]
    fn test_small_clusters_merge_into_best_overlap() {
        let clusters = vec![
            (
                vec!["hub".to_string(), "alpha".to_string()],
                vec![0, 1, 2],
            ),
            (
                vec!["hub".to_string(), "beta".to_string()],
                vec![3, 4, 5],
            ),
            // Small cluster sharing "beta": merges into the second.
            (vec!["beta".to_string()], vec![6]),
        ];
        let merged = merge_small_clusters(clusters);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].1, vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_all_small_clusters_pass_through() {
        let clusters = vec![
            (vec!["a".to_string()], vec![0]),
            (vec!["b".to_string()], vec![1]),
        ];
        assert_eq!(merge_small_clusters(clusters).len(), 2);
    }

    #[test]
    fn test_domain_naming_sanitized() {
        let notes = vec![
            scored("a.md", &["concepts/Deep Work.md"]),
            scored("b.md", &["concepts/Deep Work.md"]),
        ];
        let name = name_domain(
            &vec!["concepts/Deep Work.md".to_string()],
            &notes,
            &[0, 1],
        );
        assert_eq!(name, "deep-work");
    }

    #[test]
    fn test_unlinked_domain_name() {
        let notes = vec![scored("a.md", &[])];
        assert_eq!(
            name_domain(&vec![UNLINKED_SIGNATURE.to_string()], &notes, &[0]),
            "unlinked"
        );
    }

    #[test]
    fn test_split_oversized_by_first_letter() {
        let notes: Vec<ScoredNote> = ["apple.md", "avocado.md", "banana.md", "cherry.md"]
            .iter()
            .map(|s| scored(s, &["hub"]))
            .collect();
        let splits = split_oversized("fruit".to_string(), vec![0, 1, 2, 3], &notes, 2);

        assert_eq!(splits.len(), 2);
        assert_eq!(splits[0].0, "fruit-1");
        assert_eq!(splits[0].1, vec![0, 1]); // a's
        assert_eq!(splits[1].0, "fruit-2");
        assert_eq!(splits[1].1, vec![2, 3]); // b + c
    }

    #[test]
    fn test_split_not_applied_under_max() {
        let notes = vec![scored("a.md", &["hub"])];
        let splits = split_oversized("solo".to_string(), vec![0], &notes, 10);
        assert_eq!(splits, vec![("solo".to_string(), vec![0])]);
    }

    #[test]
    fn test_suggest_type_heuristics() {
        assert_eq!(suggest_type(&scored("2026-01-01-standup.md", &[])), "encounter");
        assert_eq!(suggest_type(&scored("rest-vs-grpc.md", &[])), "tension");
        let mut atom = scored("dense.md", &["a", "b"]);
        atom.word_count = 100;
        assert_eq!(suggest_type(&atom), "atom");
        let mut question = scored("open-question.md", &[]);
        question.word_count = 100;
        assert_eq!(suggest_type(&question), "question");
        assert_eq!(suggest_type(&scored("meeting-notes.md", &[])), "encounter");
    }

    #[test]
    fn test_partition_end_to_end_with_collision_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("scores.jsonl");

        // Two clusters that will both be named after "hub" because their
        // dominant target basenames sanitize identically.
        let mut lines = Vec::new();
        for i in 0..3 {
            lines.push(serde_json::to_string(&scored(&format!("a{i}.md"), &["x/hub"])).unwrap());
        }
        for i in 0..3 {
            lines.push(serde_json::to_string(&scored(&format!("b{i}.md"), &["y/hub"])).unwrap());
        }
        std::fs::write(&input, lines.join("\n") + "\n").unwrap();

        let config = PartitionConfig {
            tier: Tier::Medium,
            max_domain_size: 5000,
            source_path: "/tmp/source".to_string(),
            input,
            output_dir: dir.path().join("migration"),
            today: "2026-08-08".to_string(),
            timestamp: "2026-08-08T12:00:00Z".to_string(),
        };

        let report = partition_domains(&config).unwrap();
        assert_eq!(report.notes_partitioned, 6);
        assert_eq!(report.domains.len(), 2);

        let names: Vec<&str> = report.domains.iter().map(|(n, _)| n.as_str()).collect();
        assert!(names.contains(&"hub"));
        assert!(names.contains(&"hub-2"));

        for (name, _) in &report.domains {
            let path = dir
                .path()
                .join("migration")
                .join(format!("catalog-domain-{name}.json"));
            let catalog = Catalog::load(&path).unwrap();
            assert_eq!(catalog.domain, *name);
            assert_eq!(catalog.filtered_count, 3);
            assert_eq!(catalog.batch_size, Tier::Medium.batch_size());
            assert!(catalog.notes.iter().all(|n| n.action.is_none()));
        }

        let progress_text = std::fs::read_to_string(&report.progress_path).unwrap();
        assert!(progress_text.contains("\"total_filtered_notes\": 6"));
        assert!(progress_text.ends_with('\n'));
    }

    #[test]
    fn test_empty_input_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("scores.jsonl");
        std::fs::write(&input, "").unwrap();

        let config = PartitionConfig {
            tier: Tier::Medium,
            max_domain_size: 5000,
            source_path: String::new(),
            input,
            output_dir: dir.path().join("migration"),
            today: "2026-08-08".to_string(),
            timestamp: "2026-08-08T12:00:00Z".to_string(),
        };

        let report = partition_domains(&config).unwrap();
        assert!(report.domains.is_empty());
        assert!(!dir.path().join("migration").exists());
    }
}
