//! Keyword derivation
//!
//! A note's searchable terms come from two sources: words in its `##`/`###`
//! headings and the basenames of its wikilink targets (split on hyphens).
//! Both are lowercased, filtered against the stop-word list and a minimum
//! length, then unioned and sorted for deterministic output.

use crate::markdown::extract_heading_words;
use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

/// Minimum keyword length
pub const MIN_KEYWORD_LEN: usize = 3;

/// Words too common to be useful as keywords
static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
        "from", "is", "it", "its", "this", "that", "are", "was", "be", "as", "has", "had", "not",
        "no", "if", "do", "did", "does", "will", "would", "could", "should", "can", "may",
        "might", "about", "what", "when", "where", "which", "who", "how", "why", "all", "each",
        "every", "both", "few", "more", "most", "other", "some", "such", "than", "too", "very",
        "just", "also", "into", "over", "after", "before", "between", "through", "during",
        "without", "again", "further", "then", "once", "here", "there", "these", "those", "my",
        "your", "his", "her", "our", "their", "i", "me", "we", "you", "he", "she", "they",
        "them", "been", "being", "have", "having", "any", "up", "out", "so", "only", "own",
        "same", "don", "doesn", "didn", "won", "isn", "aren", "wasn", "weren", "hasn", "haven",
        "hadn", "couldn", "shouldn", "wouldn", "mustn", "needn", "ve", "re", "ll", "t", "s",
        "d", "m",
    ]
    .into_iter()
    .collect()
});

fn is_keyword(word: &str) -> bool {
    word.len() >= MIN_KEYWORD_LEN && !STOP_WORDS.contains(word)
}

/// Derive the sorted keyword set for a note.
///
/// `body_lines` is the unstripped body (headings count even near code);
/// `wikilinks` is the already-deduplicated `links_out` list.
pub fn extract_keywords(body_lines: &[String], wikilinks: &[String]) -> Vec<String> {
    let mut keywords = BTreeSet::new();

    for word in extract_heading_words(body_lines) {
        if is_keyword(&word) {
            keywords.insert(word);
        }
    }

    for link in wikilinks {
        let basename = link.rsplit('/').next().unwrap_or(link);
        for part in basename.split('-') {
            let word = part.to_lowercase();
            if is_keyword(&word) {
                keywords.insert(word);
            }
        }
    }

    keywords.into_iter().collect()
}
