//! Frontmatter block parsing
//!
//! Notes open with a metadata block delimited by `---` lines:
//!
//! ```text
//! ---
//! type: atom
//! status: working
//! tags: [graph, scoring]
//! ---
//! ```
//!
//! Each line inside the block is split on the first colon; lines without a
//! colon are ignored. Values are resolved into a tagged [`FrontmatterValue`]
//! once at parse time, so downstream code never re-inspects bracket syntax.
//! A block with no closing delimiter fails the whole parse: partial body
//! content must not leak into link or keyword extraction.

use crate::error::{ParseError, ParseResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A frontmatter value, resolved at parse time.
///
/// Inline-list syntax (`[a, b, c]`) becomes `List`; everything else is a
/// `Scalar` with surrounding double quotes stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrontmatterValue {
    Scalar(String),
    List(Vec<String>),
}

impl FrontmatterValue {
    fn resolve(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') && trimmed.len() >= 2 {
            let inner = &trimmed[1..trimmed.len() - 1];
            let items = inner
                .split(',')
                .map(|item| item.trim().trim_matches(['"', '\'']).to_string())
                .filter(|item| !item.is_empty())
                .collect();
            return FrontmatterValue::List(items);
        }
        if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
            return FrontmatterValue::Scalar(trimmed[1..trimmed.len() - 1].to_string());
        }
        FrontmatterValue::Scalar(trimmed.to_string())
    }

    /// The scalar form of this value, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FrontmatterValue::Scalar(s) => Some(s),
            FrontmatterValue::List(_) => None,
        }
    }

    /// The list form of this value, if it is one.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FrontmatterValue::Scalar(_) => None,
            FrontmatterValue::List(items) => Some(items),
        }
    }

    /// The value as a list, promoting a scalar to a single-element list.
    ///
    /// Tag-style fields are written both ways in the wild (`tags: a` and
    /// `tags: [a, b]`); consumers that want "all the tags" use this.
    pub fn to_list(&self) -> Vec<String> {
        match self {
            FrontmatterValue::Scalar(s) if s.is_empty() => Vec::new(),
            FrontmatterValue::Scalar(s) => vec![s.clone()],
            FrontmatterValue::List(items) => items.clone(),
        }
    }
}

/// Parsed frontmatter: an insertion-ordered key/value mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frontmatter {
    entries: Vec<(String, FrontmatterValue)>,
}

impl Frontmatter {
    /// Look up a value by key. Later duplicates shadow earlier ones.
    pub fn get(&self, key: &str) -> Option<&FrontmatterValue> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Scalar value for `key`, or `None` if absent or a list.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FrontmatterValue::as_str)
    }

    /// Scalar value for `key`, or `default` if absent or a list.
    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get_str(key).unwrap_or(default)
    }

    /// List value for `key`, with scalar promotion. Empty if absent.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.get(key).map(FrontmatterValue::to_list).unwrap_or_default()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, key: String, value: FrontmatterValue) {
        self.entries.push((key, value));
    }
}

/// Parse a document into frontmatter and body lines.
///
/// The first line must be exactly `---` (after trimming); the block runs to
/// the next `---` line. Errors if the opening delimiter is absent or the
/// block never closes; callers treat either case as "skip this note".
pub fn parse_frontmatter(text: &str) -> ParseResult<(Frontmatter, Vec<String>)> {
    let mut lines = text.lines();
    match lines.next() {
        Some(first) if first.trim() == "---" => {}
        _ => return Err(ParseError::MissingDelimiter),
    }

    let mut frontmatter = Frontmatter::default();
    let mut body = Vec::new();
    let mut closed = false;

    for line in lines {
        if !closed {
            if line.trim() == "---" {
                closed = true;
                continue;
            }
            if let Some((key, value)) = line.split_once(':') {
                frontmatter.push(key.trim().to_string(), FrontmatterValue::resolve(value));
            }
            // Lines without a colon are silently ignored.
        } else {
            body.push(line.to_string());
        }
    }

    if !closed {
        return Err(ParseError::UnterminatedFrontmatter);
    }
    Ok((frontmatter, body))
}

/// Read and parse a note file from disk.
pub fn read_document(path: &Path) -> ParseResult<(Frontmatter, Vec<String>)> {
    let text = fs::read_to_string(path)?;
    parse_frontmatter(&text)
}
