//! Structural pre-filtering of an external note collection
//!
//! Scores every markdown file in a source tree on structural quality
//! signals (wikilink density, word count, heading structure, file recency,
//! bidirectional links) and streams the results to JSONL for downstream
//! partitioning. Two passes: the first scores individual notes and builds
//! an inverted link index, the second adds bidirectional credit from that
//! index.

use crate::error::{MigrateError, MigrateResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use tracing::debug;
use walkdir::WalkDir;
use vellum_core::{extract_wikilinks, parse_frontmatter, strip_code};

/// Migration tier: larger collections need a higher cutoff to reduce the
/// candidate set to a reviewable size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// 200-10K notes, ~30-50% reduction
    Medium,
    /// 10K-100K notes, ~70-80% reduction
    Large,
    /// 100K-1M notes, ~90-95% reduction
    Massive,
}

impl Tier {
    /// Minimum score a note must reach to survive the filter.
    pub fn cutoff(&self) -> i64 {
        match self {
            Tier::Medium => 40,
            Tier::Large => 60,
            Tier::Massive => 75,
        }
    }

    /// Batch size used when executing a migration at this tier.
    pub fn batch_size(&self) -> usize {
        match self {
            Tier::Medium => 20,
            Tier::Large => 50,
            Tier::Massive => 100,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Medium => "medium",
            Tier::Large => "large",
            Tier::Massive => "massive",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "medium" => Ok(Tier::Medium),
            "large" => Ok(Tier::Large),
            "massive" => Ok(Tier::Massive),
            other => Err(format!("unknown tier '{other}' (medium|large|massive)")),
        }
    }
}

/// One scored entry in the pre-filter output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredNote {
    /// Path relative to the source root, with extension.
    pub source: String,
    pub score: i64,
    /// Wikilinks as raw `[[target]]` strings, duplicates included.
    pub wikilinks: Vec<String>,
    pub word_count: usize,
    pub heading_count: usize,
    pub bidirectional_links: usize,
    /// File modification date (YYYY-MM-DD), or empty if unavailable.
    pub mtime: String,
}

/// Outcome counts for one pre-filter run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefilterReport {
    pub total: usize,
    pub above_cutoff: usize,
}

/// Wikilinks per 100 words. Max 30 points.
fn score_link_density(wikilink_count: usize, word_count: usize) -> i64 {
    if word_count == 0 {
        return 0;
    }
    let density = wikilink_count as f64 / (word_count as f64 / 100.0);
    if density >= 0.10 {
        30
    } else if density >= 0.05 {
        15
    } else {
        0
    }
}

/// Word count sweet spot 200-800. Max 20 points.
fn score_word_count(word_count: usize) -> i64 {
    if (200..=800).contains(&word_count) {
        20
    } else if (100..=1500).contains(&word_count) {
        10
    } else {
        0
    }
}

/// File modification recency. Max 15 points.
fn score_recency(mtime: &str, today: NaiveDate) -> i64 {
    match vellum_core::days_since(mtime, today) {
        Some(days) if days <= 90 => 15,
        Some(days) if days <= 365 => 5,
        _ => 0,
    }
}

/// Heading structure. Max 10 points.
fn score_headings(heading_count: usize) -> i64 {
    if heading_count >= 3 {
        10
    } else {
        0
    }
}

/// Inbound-reference credit from the inverted index. Max 25 points.
fn score_bidirectional(referrers: usize) -> i64 {
    if referrers >= 3 {
        25
    } else if referrers >= 1 {
        10
    } else {
        0
    }
}

fn count_headings(body_lines: &[String]) -> usize {
    body_lines
        .iter()
        .filter(|line| {
            let stripped = line.trim();
            stripped.starts_with("## ") || stripped.starts_with("### ")
        })
        .count()
}

fn mtime_string(path: &Path) -> String {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map(|time| {
            chrono::DateTime::<chrono::Local>::from(time)
                .format("%Y-%m-%d")
                .to_string()
        })
        .unwrap_or_default()
}

fn is_hidden(rel: &Path) -> bool {
    rel.components().any(|component| {
        matches!(component, Component::Normal(name) if name.to_string_lossy().starts_with('.'))
    })
}

/// All markdown files under the source root, sorted, with relative paths.
fn scan_source(source_root: &Path) -> Vec<(PathBuf, String)> {
    let mut files: Vec<(PathBuf, String)> = WalkDir::new(source_root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
        .filter_map(|path| {
            let rel = path.strip_prefix(source_root).ok()?.to_path_buf();
            if is_hidden(&rel) {
                return None;
            }
            let rel_str = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            Some((path, rel_str))
        })
        .collect();
    files.sort_by(|a, b| a.1.cmp(&b.1));
    files
}

struct Pass1Entry {
    source: String,
    base_score: i64,
    wikilinks: Vec<String>,
    word_count: usize,
    heading_count: usize,
    mtime: String,
}

/// Count how many other files link to this one, by path or basename.
fn bidirectional_count(source: &str, inverted: &HashMap<String, HashSet<String>>) -> usize {
    let source_key = source.strip_suffix(".md").unwrap_or(source);
    let basename = source_key.rsplit('/').next().unwrap_or(source_key);

    inverted
        .iter()
        .filter(|(target, _)| target.as_str() == source_key || target.as_str() == basename)
        .map(|(_, sources)| sources.len())
        .sum()
}

/// Score a source tree and write the results as JSONL.
pub fn prefilter_vault(
    source_root: &Path,
    output_path: &Path,
    tier: Tier,
    today: NaiveDate,
) -> MigrateResult<PrefilterReport> {
    if !source_root.is_dir() {
        return Err(MigrateError::MissingInput(
            source_root.display().to_string(),
        ));
    }

    // Pass 1: score individual notes and build the inverted link index.
    let mut inverted: HashMap<String, HashSet<String>> = HashMap::new();
    let mut entries: Vec<Pass1Entry> = Vec::new();

    for (path, rel) in scan_source(source_root) {
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "skipping unreadable file");
                continue;
            }
        };

        // Source vaults may not use frontmatter; score the whole file then.
        let body_lines: Vec<String> = match parse_frontmatter(&text) {
            Ok((_, body)) => body,
            Err(_) => text.lines().map(String::from).collect(),
        };

        let body_text = strip_code(&body_lines.join("\n"));
        let wikilinks = extract_wikilinks(&body_text);
        let word_count = body_text.split_whitespace().count();
        let heading_count = count_headings(&body_lines);
        let mtime = mtime_string(&path);

        let base_score = score_link_density(wikilinks.len(), word_count)
            + score_word_count(word_count)
            + score_recency(&mtime, today)
            + score_headings(heading_count);

        for link in &wikilinks {
            inverted.entry(link.clone()).or_default().insert(rel.clone());
        }

        entries.push(Pass1Entry {
            source: rel,
            base_score,
            wikilinks,
            word_count,
            heading_count,
            mtime,
        });
    }

    // Pass 2: add bidirectional link credit and stream the final entries.
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(fs::File::create(output_path)?);

    let cutoff = tier.cutoff();
    let mut report = PrefilterReport::default();

    for entry in entries {
        let referrers = bidirectional_count(&entry.source, &inverted);
        let score = entry.base_score + score_bidirectional(referrers);

        let scored = ScoredNote {
            source: entry.source,
            score,
            wikilinks: entry
                .wikilinks
                .iter()
                .map(|link| format!("[[{link}]]"))
                .collect(),
            word_count: entry.word_count,
            heading_count: entry.heading_count,
            bidirectional_links: referrers,
            mtime: entry.mtime,
        };

        serde_json::to_writer(&mut writer, &scored)?;
        writer.write_all(b"\n")?;

        report.total += 1;
        if score >= cutoff {
            report.above_cutoff += 1;
        }
    }
    writer.flush()?;

    Ok(report)
}

/// Load scored entries at or above a cutoff from a pre-filter JSONL file.
pub fn load_scored(path: &Path, cutoff: i64) -> MigrateResult<Vec<ScoredNote>> {
    if !path.exists() {
        return Err(MigrateError::MissingInput(path.display().to_string()));
    }

    let reader = BufReader::new(fs::File::open(path)?);
    let mut notes = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let note: ScoredNote = serde_json::from_str(&line)?;
        if note.score >= cutoff {
            notes.push(note);
        }
    }
    Ok(notes)
}
