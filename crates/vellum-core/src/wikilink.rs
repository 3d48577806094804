//! Wikilink extraction
//!
//! Finds `[[target]]` and `[[target|display]]` references in body text.
//! Callers are expected to have stripped code regions first (see
//! [`crate::markdown::strip_code`]).
//!
//! Deduplication is a separate, explicitly invoked step: link-count scoring
//! wants duplicates, `links_out` wants the ordered set.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static WIKILINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]|]+)(?:\|[^\]]*)?\]\]").expect("wikilink regex"));

/// All wikilink targets in order of appearance, duplicates included.
///
/// Targets are trimmed and a trailing `.md` suffix is removed; display text
/// after `|` is discarded.
pub fn extract_wikilinks(body_text: &str) -> Vec<String> {
    WIKILINK_RE
        .captures_iter(body_text)
        .map(|cap| {
            let target = cap[1].trim();
            target.strip_suffix(".md").unwrap_or(target).to_string()
        })
        .collect()
}

/// Deduplicate while preserving first-appearance order.
pub fn dedupe_preserving_order(links: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    links
        .iter()
        .filter(|link| seen.insert(link.as_str()))
        .cloned()
        .collect()
}

/// Count distinct raw wikilink targets in content.
///
/// Used when synthesizing a `links_out` frontmatter field for imported
/// notes; operates on raw match text, without trim or suffix normalization.
pub fn count_unique_wikilinks(content: &str) -> usize {
    WIKILINK_RE
        .captures_iter(content)
        .map(|cap| cap.get(1).expect("capture group").as_str())
        .collect::<HashSet<_>>()
        .len()
}
