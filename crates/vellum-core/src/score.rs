//! Relevance scoring
//!
//! Assigns an integer priority to a note from status, staleness, link
//! density, and contextual keyword match. The exact rule is depended on by
//! sorting and threshold behavior downstream; every term is additive and
//! checked independently:
//!
//! - dormant lifecycle: excluded outright, no other term applies
//! - status "working": +10, status "unverified": +5 (both can apply)
//! - +1 per outbound link, capped at +5
//! - staleness: >60 days untouched +5, else >30 days +3
//! - recency: touched within 7 days +3
//! - +2 per contextual keyword present in the note's keywords, capped at +6
//!
//! Only strictly positive scores are surfacing candidates.

use crate::note::{Lifecycle, Note};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_.\s]+").expect("separator regex"));

static CAMEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z])([A-Z])").expect("camel-case regex"));

/// Scoring outcome for one note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relevance {
    /// Dormant notes are never surfaced; no score exists for them.
    Excluded,
    Scored {
        score: i64,
        /// Whether any contextual keyword matched (drives the reasoning tag).
        matched_keyword: bool,
    },
}

impl Relevance {
    /// The score if this note is a surfacing candidate (score > 0).
    pub fn candidate_score(&self) -> Option<i64> {
        match self {
            Relevance::Scored { score, .. } if *score > 0 => Some(*score),
            _ => None,
        }
    }

    pub fn matched_keyword(&self) -> bool {
        matches!(
            self,
            Relevance::Scored {
                matched_keyword: true,
                ..
            }
        )
    }
}

/// Whole days elapsed since an ISO `YYYY-MM-DD` date, or `None` if the
/// string does not parse.
pub fn days_since(date_str: &str, today: NaiveDate) -> Option<i64> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .ok()
        .map(|date| (today - date).num_days())
}

/// Score a note against the current date and optional contextual keywords.
pub fn score_note(note: &Note, today: NaiveDate, project_keywords: &[String]) -> Relevance {
    if note.lifecycle == Lifecycle::Dormant {
        return Relevance::Excluded;
    }

    let mut score: i64 = 0;

    if note.status == "working" {
        score += 10;
    }
    if note.status == "unverified" {
        score += 5;
    }

    score += (note.links_out.len() as i64).min(5);

    let elapsed = days_since(&note.last_touched, today);
    if let Some(days) = elapsed {
        if days > 60 {
            score += 5;
        } else if days > 30 {
            score += 3;
        }
        if days <= 7 {
            score += 3;
        }
    }

    let mut matched_keyword = false;
    if !project_keywords.is_empty() {
        let keywords: Vec<String> = note.keywords.iter().map(|k| k.to_lowercase()).collect();
        let matches = project_keywords
            .iter()
            .filter(|pk| keywords.contains(pk))
            .count() as i64;
        if matches > 0 {
            matched_keyword = true;
            score += (matches * 2).min(6);
        }
    }

    Relevance::Scored {
        score,
        matched_keyword,
    }
}

/// Why a note was surfaced. Exactly one tag per note, by strict priority:
/// proposed > stale > matches-project > working > recent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonTag {
    Proposed,
    Stale,
    MatchesProject,
    Working,
    Recent,
}

impl ReasonTag {
    pub fn label(&self) -> &'static str {
        match self {
            ReasonTag::Proposed => "(proposed \u{2014} unreviewed)",
            ReasonTag::Stale => "(stale \u{2014} revisit?)",
            ReasonTag::MatchesProject => "(matches project)",
            ReasonTag::Working => "(working)",
            ReasonTag::Recent => "(recent)",
        }
    }
}

/// Select the single highest-priority reasoning tag for a surfaced note.
pub fn reasoning_tag(note: &Note, today: NaiveDate, matched_keyword: bool) -> Option<ReasonTag> {
    if note.lifecycle == Lifecycle::Proposed {
        return Some(ReasonTag::Proposed);
    }

    let elapsed = days_since(&note.last_touched, today);
    if matches!(elapsed, Some(days) if days > 30) {
        return Some(ReasonTag::Stale);
    }

    if matched_keyword {
        return Some(ReasonTag::MatchesProject);
    }

    if note.status == "working" {
        return Some(ReasonTag::Working);
    }

    if matches!(elapsed, Some(days) if days <= 7) {
        return Some(ReasonTag::Recent);
    }

    None
}

/// Lowercase keyword tokens from a directory or project name.
///
/// Splits on hyphens, underscores, dots, whitespace, and camelCase
/// boundaries; tokens of length 1 are dropped.
pub fn context_keywords(name: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for part in SEPARATOR_RE.split(name) {
        let expanded = CAMEL_RE.replace_all(part, "$1 $2");
        for word in expanded.split_whitespace() {
            if word.len() > 1 {
                tokens.push(word.to_lowercase());
            }
        }
    }
    tokens
}
