//! Structural health checking
//!
//! Five checks over the vault: disconnected notes, near-duplicate pairs,
//! low-quality notes (3+ failures of 7 content sub-checks), orphan sources,
//! and MOC drift. Connectivity comes from a separately persisted edge list,
//! not from the index's own `links_in`/`links_out`; the two graph
//! representations are deliberately kept distinct.
//!
//! Findings are emitted in priority order (HIGH, MEDIUM, LOW) with
//! check-type grouping preserved within each tier, and rendered both as a
//! structured markdown report and as line-delimited JSON. Both forms are
//! serializations of the same finding list.

use crate::error::IndexResult;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::warn;
use vellum_core::read_document;

/// Jaccard similarity above which two same-type notes are near-duplicates.
pub const NEAR_DUPLICATE_THRESHOLD: f64 = 0.70;

/// Quality-check failures at which a note counts as low-quality.
pub const LOW_QUALITY_FAILURES: usize = 3;

/// Edge-list file name under the vault's `_meta/` directory.
pub const EDGES_FILE: &str = "graph.json";

/// Report file names, written to the vault root.
pub const REPORT_MD: &str = "maintenance-report.md";
pub const REPORT_JSONL: &str = "maintenance-report.jsonl";

static TITLE_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z]+").expect("title word regex"));

static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)## (Source|Related|Diagram)\n.*").expect("section regex")
});

static MOC_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^|\]]+)").expect("moc link regex"));

// Placeholder text commonly left behind by extraction pipelines.
static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)core insight extracted|key takeaway extracted|no unique insights found|placeholder content|todo:? extract|^\s*#\s+[\w\s-]+\s*$",
    )
    .expect("placeholder regex")
});

/// A note as seen by the health checker.
#[derive(Debug, Clone, Default)]
pub struct HealthNote {
    pub id: String,
    pub title: String,
    pub kind: String,
    pub summary: String,
    pub source: String,
    pub tags: Vec<String>,
    pub path: PathBuf,
    pub body: String,
}

/// A source document (frontmatter `type: source`).
#[derive(Debug, Clone, Default)]
pub struct SourceNote {
    pub id: String,
    pub title: String,
    pub path: PathBuf,
}

/// Everything the checks need, loaded in one pass over the vault.
#[derive(Debug, Clone, Default)]
pub struct VaultContents {
    pub notes: BTreeMap<String, HealthNote>,
    pub sources: BTreeMap<String, SourceNote>,
    /// Note ids linked from any MOC document.
    pub moc_coverage: HashSet<String>,
}

impl VaultContents {
    /// Load notes, sources, and MOC coverage from the vault.
    ///
    /// Files named `MOC-*` contribute link coverage instead of being notes;
    /// frontmatter `type: source` routes a file to the sources map.
    /// Unreadable files are skipped with a warning.
    pub fn load(vault_root: &Path) -> Self {
        let mut contents = VaultContents::default();

        for path in crate::builder::list_note_files(vault_root) {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();

            if stem.starts_with("MOC-") {
                if let Ok(text) = fs::read_to_string(&path) {
                    for cap in MOC_LINK_RE.captures_iter(&text) {
                        contents.moc_coverage.insert(cap[1].to_string());
                    }
                }
                continue;
            }

            let (fm, body_lines) = match read_document(&path) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable note");
                    continue;
                }
            };

            let id = fm.str_or("id", &stem).to_string();
            let title = fm.str_or("title", &stem).to_string();

            if fm.get_str("type") == Some("source") {
                contents.sources.insert(
                    id.clone(),
                    SourceNote {
                        id,
                        title,
                        path: path.clone(),
                    },
                );
                continue;
            }

            contents.notes.insert(
                id.clone(),
                HealthNote {
                    id,
                    title,
                    kind: fm.str_or("type", "").to_string(),
                    summary: fm.str_or("summary", "").to_string(),
                    source: fm.str_or("source", "").to_string(),
                    tags: fm.list("tags"),
                    path: path.clone(),
                    body: body_lines.join("\n"),
                },
            );
        }

        contents
    }
}

/// Undirected adjacency derived from a persisted edge list
/// (`_meta/graph.json`, `{"edges": [{"from": ..., "to": ...}]}`).
#[derive(Debug, Clone, Default)]
pub struct EdgeList {
    adjacency: HashMap<String, HashSet<String>>,
}

#[derive(Deserialize)]
struct EdgeFile {
    #[serde(default)]
    edges: Vec<Edge>,
}

#[derive(Deserialize)]
struct Edge {
    from: String,
    to: String,
}

impl EdgeList {
    /// Load the edge file. Missing or corrupt files yield an empty list,
    /// so every note then reads as disconnected, the safe default.
    pub fn load(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => return EdgeList::default(),
        };
        match serde_json::from_str::<EdgeFile>(&text) {
            Ok(file) => {
                let pairs = file.edges.into_iter().map(|e| (e.from, e.to)).collect();
                EdgeList::from_pairs(pairs)
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring corrupt edge list");
                EdgeList::default()
            }
        }
    }

    pub fn path_for(vault_root: &Path) -> PathBuf {
        vault_root.join(crate::index::META_DIR).join(EDGES_FILE)
    }

    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut adjacency: HashMap<String, HashSet<String>> = HashMap::new();
        for (from, to) in pairs {
            adjacency.entry(from.clone()).or_default().insert(to.clone());
            adjacency.entry(to).or_default().insert(from);
        }
        EdgeList { adjacency }
    }

    /// True if the note has at least one edge.
    pub fn is_connected(&self, id: &str) -> bool {
        self.adjacency.contains_key(id)
    }
}

/// Finding priority, assigned by a fixed decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }
}

/// One maintenance finding.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub priority: Priority,
    #[serde(flatten)]
    pub detail: FindingDetail,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum FindingDetail {
    Staleness {
        note_id: String,
        title: String,
        #[serde(rename = "type")]
        kind: String,
    },
    NearDuplicate {
        note_a: String,
        note_b: String,
        title_a: String,
        title_b: String,
        jaccard: f64,
    },
    LowQuality {
        note_id: String,
        title: String,
        failures: Vec<String>,
        failure_count: usize,
    },
    OrphanSource {
        source_id: String,
        title: String,
    },
    MocDrift {
        note_id: String,
        title: String,
        #[serde(rename = "type")]
        kind: String,
    },
}

impl FindingDetail {
    fn check_name(&self) -> &'static str {
        match self {
            FindingDetail::Staleness { .. } => "staleness",
            FindingDetail::NearDuplicate { .. } => "near_duplicate",
            FindingDetail::LowQuality { .. } => "low_quality",
            FindingDetail::OrphanSource { .. } => "orphan_source",
            FindingDetail::MocDrift { .. } => "moc_drift",
        }
    }
}

/// Body text with the Source/Related/Diagram sections removed, trimmed.
fn core_body_text(body: &str) -> String {
    SECTION_RE.replace_all(body, "").trim().to_string()
}

/// Contents of the `## Related` section, if present.
fn related_section(body: &str) -> Option<&str> {
    let start = body.find("## Related\n\n")? + "## Related\n\n".len();
    let rest = &body[start..];
    match rest.find("\n## ") {
        Some(end) => Some(&rest[..end]),
        None => Some(rest),
    }
}

/// Run the 7 content sub-checks on a note. Returns failed check ids.
pub fn quality_failures(note: &HealthNote) -> Vec<String> {
    let mut failures = Vec::new();
    let body_text = core_body_text(&note.body);

    // Q1: enough body content outside the boilerplate sections
    if body_text.chars().count() < 100 {
        failures.push("Q1_short_body".to_string());
    }

    // Q2: summary exists and is not just the title restated
    let summary = note.summary.trim().to_lowercase();
    if summary.is_empty() || summary == note.title.trim().to_lowercase() {
        failures.push("Q2_placeholder_summary".to_string());
    }

    // Q3: at least one link in the Related section
    let has_related_link = related_section(&note.body)
        .map(|section| section.contains("[["))
        .unwrap_or(false);
    if !has_related_link {
        failures.push("Q3_no_related_links".to_string());
    }

    // Q4: at least three tags beyond the type tag and pipeline tags
    let non_type_tags = note
        .tags
        .iter()
        .filter(|t| t.as_str() != note.kind && !matches!(t.as_str(), "youtube" | "extracted" | "doc"))
        .count();
    if non_type_tags < 3 {
        failures.push("Q4_few_tags".to_string());
    }

    // Q5: non-empty source reference
    if note.source.is_empty() {
        failures.push("Q5_no_source".to_string());
    }

    // Q6: thin note
    if body_text.split_whitespace().count() < 50 {
        failures.push("Q6_thin_note".to_string());
    }

    // Q7: extraction-template placeholder text
    if !body_text.is_empty() && PLACEHOLDER_RE.is_match(&body_text) {
        failures.push("Q7_placeholder_body".to_string());
    }

    failures
}

fn check_staleness(contents: &VaultContents, edges: &EdgeList) -> Vec<FindingDetail> {
    contents
        .notes
        .values()
        .filter(|note| !edges.is_connected(&note.id))
        .map(|note| FindingDetail::Staleness {
            note_id: note.id.clone(),
            title: note.title.clone(),
            kind: note.kind.clone(),
        })
        .collect()
}

fn check_near_duplicates(contents: &VaultContents) -> Vec<FindingDetail> {
    let ids: Vec<&String> = contents.notes.keys().collect();

    let keyword_sets: HashMap<&str, HashSet<String>> = contents
        .notes
        .values()
        .map(|note| {
            let mut set: HashSet<String> =
                note.tags.iter().map(|t| t.to_lowercase()).collect();
            for m in TITLE_WORD_RE.find_iter(&note.title.to_lowercase()) {
                set.insert(m.as_str().to_string());
            }
            (note.id.as_str(), set)
        })
        .collect();

    let mut results = Vec::new();
    for i in 0..ids.len() {
        for j in (i + 1)..ids.len() {
            let (a, b) = (ids[i], ids[j]);
            let set_a = &keyword_sets[a.as_str()];
            let set_b = &keyword_sets[b.as_str()];
            if set_a.is_empty() || set_b.is_empty() {
                continue;
            }

            let intersection = set_a.intersection(set_b).count();
            let union = set_a.union(set_b).count();
            if union == 0 {
                continue;
            }

            let jaccard = intersection as f64 / union as f64;
            if jaccard > NEAR_DUPLICATE_THRESHOLD
                && contents.notes[a].kind == contents.notes[b].kind
            {
                results.push(FindingDetail::NearDuplicate {
                    note_a: a.clone(),
                    note_b: b.clone(),
                    title_a: contents.notes[a].title.clone(),
                    title_b: contents.notes[b].title.clone(),
                    jaccard: (jaccard * 1000.0).round() / 1000.0,
                });
            }
        }
    }
    results
}

fn check_low_quality(contents: &VaultContents) -> Vec<FindingDetail> {
    contents
        .notes
        .values()
        .filter_map(|note| {
            let failures = quality_failures(note);
            (failures.len() >= LOW_QUALITY_FAILURES).then(|| FindingDetail::LowQuality {
                note_id: note.id.clone(),
                title: note.title.clone(),
                failure_count: failures.len(),
                failures,
            })
        })
        .collect()
}

fn check_orphan_sources(contents: &VaultContents) -> Vec<FindingDetail> {
    let referenced: HashSet<&str> = contents
        .notes
        .values()
        .filter(|note| !note.source.is_empty())
        .map(|note| note.source.as_str())
        .collect();

    contents
        .sources
        .values()
        .filter(|source| !referenced.contains(source.id.as_str()))
        .map(|source| FindingDetail::OrphanSource {
            source_id: source.id.clone(),
            title: source.title.clone(),
        })
        .collect()
}

fn check_moc_drift(contents: &VaultContents) -> Vec<FindingDetail> {
    contents
        .notes
        .values()
        .filter(|note| !contents.moc_coverage.contains(&note.id))
        .map(|note| FindingDetail::MocDrift {
            note_id: note.id.clone(),
            title: note.title.clone(),
            kind: note.kind.clone(),
        })
        .collect()
}

/// Fixed priority decision table combining check type with connectivity and
/// quality-failure status.
fn assign_priority(
    detail: &FindingDetail,
    edges: &EdgeList,
    low_quality_ids: &HashSet<String>,
) -> Priority {
    match detail {
        FindingDetail::Staleness { note_id, .. } => {
            if low_quality_ids.contains(note_id) {
                Priority::High // disconnected and low-quality
            } else {
                Priority::Low // disconnected but quality-passing
            }
        }
        FindingDetail::NearDuplicate { .. } => Priority::Medium,
        FindingDetail::LowQuality { note_id, .. } => {
            if edges.is_connected(note_id) {
                Priority::Medium // low quality but connected
            } else {
                Priority::High // low quality and disconnected
            }
        }
        FindingDetail::OrphanSource { .. } => Priority::Low,
        FindingDetail::MocDrift { .. } => Priority::Low,
    }
}

/// Run all five checks and return findings sorted by priority, with
/// check-type grouping preserved within each tier.
pub fn run_health_checks(contents: &VaultContents, edges: &EdgeList) -> Vec<Finding> {
    let stale = check_staleness(contents, edges);
    let dupes = check_near_duplicates(contents);
    let low_quality = check_low_quality(contents);
    let orphans = check_orphan_sources(contents);
    let drift = check_moc_drift(contents);

    let low_quality_ids: HashSet<String> = low_quality
        .iter()
        .filter_map(|detail| match detail {
            FindingDetail::LowQuality { note_id, .. } => Some(note_id.clone()),
            _ => None,
        })
        .collect();

    let mut findings: Vec<Finding> = stale
        .into_iter()
        .chain(dupes)
        .chain(low_quality)
        .chain(orphans)
        .chain(drift)
        .map(|detail| Finding {
            priority: assign_priority(&detail, edges, &low_quality_ids),
            detail,
        })
        .collect();

    // Stable sort: check order within a tier survives.
    findings.sort_by_key(|finding| finding.priority.rank());
    findings
}

/// Vault totals carried into the report header.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthStats {
    pub total_notes: usize,
    pub total_sources: usize,
}

/// The finding list plus stats, renderable in both report forms.
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub findings: Vec<Finding>,
    pub stats: HealthStats,
}

impl HealthReport {
    pub fn new(findings: Vec<Finding>, stats: HealthStats) -> Self {
        Self { findings, stats }
    }

    fn priority_count(&self, priority: Priority) -> usize {
        self.findings
            .iter()
            .filter(|f| f.priority == priority)
            .count()
    }

    /// Check-name counts, most common first; first-appearance order breaks
    /// ties.
    fn check_counts(&self) -> Vec<(&'static str, usize)> {
        let mut counts: Vec<(&'static str, usize)> = Vec::new();
        for finding in &self.findings {
            let name = finding.detail.check_name();
            match counts.iter_mut().find(|(n, _)| *n == name) {
                Some((_, count)) => *count += 1,
                None => counts.push((name, 1)),
            }
        }
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
    }

    fn tier<'a>(&'a self, priority: Priority) -> impl Iterator<Item = &'a Finding> {
        self.findings.iter().filter(move |f| f.priority == priority)
    }

    /// Human-readable report, priority-grouped. `generated` is the
    /// timestamp string for the header.
    pub fn render_markdown(&self, generated: &str) -> String {
        let mut lines: Vec<String> = Vec::new();
        lines.push("# Vault Maintenance Report".to_string());
        lines.push(String::new());
        lines.push(format!("**Generated:** {generated}"));
        lines.push(format!("**Total notes:** {}", self.stats.total_notes));
        lines.push(format!("**Total sources:** {}", self.stats.total_sources));
        lines.push(String::new());

        lines.push("## Summary".to_string());
        lines.push(String::new());
        lines.push("| Priority | Count |".to_string());
        lines.push("|----------|-------|".to_string());
        for priority in [Priority::High, Priority::Medium, Priority::Low] {
            lines.push(format!(
                "| {} | {} |",
                priority.as_str(),
                self.priority_count(priority)
            ));
        }
        lines.push(String::new());

        lines.push("| Check | Count |".to_string());
        lines.push("|-------|-------|".to_string());
        for (check, count) in self.check_counts() {
            lines.push(format!("| {check} | {count} |"));
        }
        lines.push(String::new());

        let high: Vec<&Finding> = self.tier(Priority::High).collect();
        if !high.is_empty() {
            lines.push("## HIGH Priority".to_string());
            lines.push(String::new());
            for finding in high {
                match &finding.detail {
                    FindingDetail::Staleness { note_id, title, .. } => lines.push(format!(
                        "- **Disconnected + Low-Quality:** `{note_id}` \u{2014} {title}"
                    )),
                    FindingDetail::LowQuality {
                        note_id,
                        title,
                        failures,
                        ..
                    } => lines.push(format!(
                        "- **Low-Quality + Disconnected:** `{note_id}` \u{2014} {title} (failed: {})",
                        failures.join(", ")
                    )),
                    _ => {}
                }
            }
            lines.push(String::new());
        }

        let medium: Vec<&Finding> = self.tier(Priority::Medium).collect();
        if !medium.is_empty() {
            lines.push("## MEDIUM Priority".to_string());
            lines.push(String::new());
            for finding in medium {
                match &finding.detail {
                    FindingDetail::NearDuplicate {
                        note_a,
                        note_b,
                        jaccard,
                        ..
                    } => lines.push(format!(
                        "- **Near-Duplicate** (Jaccard {jaccard:.2}): `{note_a}` vs `{note_b}`"
                    )),
                    FindingDetail::LowQuality {
                        note_id,
                        title,
                        failures,
                        ..
                    } => lines.push(format!(
                        "- **Low-Quality:** `{note_id}` \u{2014} {title} (failed: {})",
                        failures.join(", ")
                    )),
                    _ => {}
                }
            }
            lines.push(String::new());
        }

        let low: Vec<&Finding> = self.tier(Priority::Low).collect();
        if !low.is_empty() {
            lines.push("## LOW Priority".to_string());
            lines.push(String::new());

            let stale: Vec<&Finding> = low
                .iter()
                .copied()
                .filter(|f| matches!(f.detail, FindingDetail::Staleness { .. }))
                .collect();
            let orphans: Vec<&Finding> = low
                .iter()
                .copied()
                .filter(|f| matches!(f.detail, FindingDetail::OrphanSource { .. }))
                .collect();
            let drift: Vec<&Finding> = low
                .iter()
                .copied()
                .filter(|f| matches!(f.detail, FindingDetail::MocDrift { .. }))
                .collect();

            if !stale.is_empty() {
                lines.push(format!("### Disconnected Notes ({})", stale.len()));
                lines.push(String::new());
                for finding in stale.iter().take(20) {
                    if let FindingDetail::Staleness { note_id, title, .. } = &finding.detail {
                        lines.push(format!("- `{note_id}` \u{2014} {title}"));
                    }
                }
                if stale.len() > 20 {
                    lines.push(format!("- ... and {} more", stale.len() - 20));
                }
                lines.push(String::new());
            }

            if !orphans.is_empty() {
                lines.push(format!("### Orphan Sources ({})", orphans.len()));
                lines.push(String::new());
                for finding in &orphans {
                    if let FindingDetail::OrphanSource { source_id, title } = &finding.detail {
                        lines.push(format!("- `{source_id}` \u{2014} {title}"));
                    }
                }
                lines.push(String::new());
            }

            if !drift.is_empty() {
                lines.push(format!("### MOC Drift ({})", drift.len()));
                lines.push(String::new());
                for finding in drift.iter().take(20) {
                    if let FindingDetail::MocDrift { note_id, title, .. } = &finding.detail {
                        lines.push(format!("- `{note_id}` \u{2014} {title}"));
                    }
                }
                if drift.len() > 20 {
                    lines.push(format!("- ... and {} more", drift.len() - 20));
                }
                lines.push(String::new());
            }
        }

        lines.join("\n")
    }

    /// Machine-readable form: one finding object per line, same order as
    /// the markdown report.
    pub fn render_jsonl(&self) -> String {
        let mut out = String::new();
        for finding in &self.findings {
            out.push_str(&serde_json::to_string(finding).expect("finding serializes"));
            out.push('\n');
        }
        out
    }

    /// Write both report forms. Returns (markdown path, jsonl path).
    pub fn write(&self, dir: &Path, generated: &str) -> IndexResult<(PathBuf, PathBuf)> {
        let md_path = dir.join(REPORT_MD);
        let jsonl_path = dir.join(REPORT_JSONL);
        fs::write(&md_path, self.render_markdown(generated))?;
        fs::write(&jsonl_path, self.render_jsonl())?;
        Ok((md_path, jsonl_path))
    }
}
