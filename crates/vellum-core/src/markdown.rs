//! Body-text helpers: code stripping, title and heading extraction.
//!
//! Code stripping is applied before wikilink and keyword extraction so that
//! example syntax inside fences or inline spans is never treated as a real
//! link. Title and heading extraction deliberately run on the unstripped
//! lines; a heading is a heading even when the body also contains code.

use regex::Regex;
use std::sync::LazyLock;

static FENCED_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[\s\S]*?```").expect("fenced code regex"));

static INLINE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`]+`").expect("inline code regex"));

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-zA-Z]+").expect("word regex"));

/// Remove fenced code regions and inline code spans.
///
/// Fences are greedy and non-nested: the region runs from one triple-backtick
/// marker to the next, wherever they appear.
pub fn strip_code(text: &str) -> String {
    let without_fences = FENCED_CODE_RE.replace_all(text, "");
    INLINE_CODE_RE.replace_all(&without_fences, "").into_owned()
}

/// First H1 heading in the body, or empty string if there is none.
pub fn extract_title(body_lines: &[String]) -> String {
    for line in body_lines {
        let stripped = line.trim();
        if stripped.starts_with("# ") && !stripped.starts_with("## ") {
            return stripped[2..].trim().to_string();
        }
    }
    String::new()
}

/// Lowercased words from `##` and `###` headings.
pub fn extract_heading_words(body_lines: &[String]) -> Vec<String> {
    let mut words = Vec::new();
    for line in body_lines {
        let stripped = line.trim();
        if stripped.starts_with("## ") || stripped.starts_with("### ") {
            let heading_text = stripped.trim_start_matches('#');
            for m in WORD_RE.find_iter(heading_text) {
                words.push(m.as_str().to_lowercase());
            }
        }
    }
    words
}
