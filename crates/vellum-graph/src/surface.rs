//! Session-start surfacing
//!
//! Produces the "working notes" context block shown at the start of a
//! session. The primary path scores notes straight from the persisted index
//! with no per-file I/O; if the index is missing or corrupt, an explicit
//! second stage rescans the vault files. Both stages share the single
//! scoring rule in `vellum_core::score`.
//!
//! This is invoked as a hook that must never block the invoking process:
//! every failure degrades to an empty payload.

use crate::builder::{resolve_backlinks, scan_notes};
use crate::index::NoteIndex;
use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;
use tracing::debug;
use vellum_core::{days_since, reasoning_tag, score_note, Lifecycle, Note};

/// Below this many non-dormant notes, scoring is skipped entirely and all
/// eligible notes are surfaced; a human can review the whole collection.
pub const SMALL_VAULT_THRESHOLD: usize = 8;

/// Maximum notes surfaced when scoring applies.
pub const SURFACE_LIMIT: usize = 5;

/// Proposed-note count at which capture is paused outright.
pub const CAPTURE_CEILING: usize = 10;

/// Structured payload handed to the external session-orchestration layer.
/// Serializes to `{}` when there is nothing to surface.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SurfacePayload {
    #[serde(rename = "sessionContext", skip_serializing_if = "Option::is_none")]
    pub session_context: Option<SessionContext>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionContext {
    pub event: String,
    pub context: String,
}

impl SurfacePayload {
    fn empty() -> Self {
        Self::default()
    }

    fn with_context(context: String) -> Self {
        Self {
            session_context: Some(SessionContext {
                event: "session-start".to_string(),
                context,
            }),
        }
    }

    /// The human-readable text block, if any.
    pub fn context_text(&self) -> Option<&str> {
        self.session_context.as_ref().map(|c| c.context.as_str())
    }
}

fn keyword_match(note: &Note, project_keywords: &[String]) -> bool {
    if project_keywords.is_empty() {
        return false;
    }
    let keywords: Vec<String> = note.keywords.iter().map(|k| k.to_lowercase()).collect();
    project_keywords.iter().any(|pk| keywords.contains(pk))
}

struct Selected<'a> {
    key: &'a str,
    note: &'a Note,
    matched_keyword: bool,
}

/// Surface notes from a loaded index.
pub fn surface_from_index(
    index: &NoteIndex,
    today: NaiveDate,
    project_keywords: &[String],
) -> SurfacePayload {
    let non_dormant: Vec<(&String, &Note)> = index
        .notes
        .iter()
        .filter(|(_, note)| note.lifecycle != Lifecycle::Dormant)
        .collect();

    let selected: Vec<Selected> = if non_dormant.len() < SMALL_VAULT_THRESHOLD {
        // Small collection: everything eligible, unscored.
        non_dormant
            .iter()
            .map(|&(key, note)| Selected {
                key,
                note,
                matched_keyword: keyword_match(note, project_keywords),
            })
            .collect()
    } else {
        let mut scored: Vec<(i64, Selected)> = Vec::new();
        for (key, note) in &index.notes {
            let relevance = score_note(note, today, project_keywords);
            if let Some(score) = relevance.candidate_score() {
                scored.push((
                    score,
                    Selected {
                        key,
                        note,
                        matched_keyword: relevance.matched_keyword(),
                    },
                ));
            }
        }
        // Stable sort: ties stay in key order.
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored
            .into_iter()
            .take(SURFACE_LIMIT)
            .map(|(_, sel)| sel)
            .collect()
    };

    if selected.is_empty() {
        return SurfacePayload::empty();
    }

    let proposed_count = index.proposed_count();
    let mut lines: Vec<String> = Vec::new();

    // Hard ceiling is a distinct, stronger signal than the maintenance-due
    // warning below; both can appear together.
    if proposed_count >= CAPTURE_CEILING {
        lines.push(
            "\u{26a0} 10+ unreviewed vault notes. \
             Capture paused until `vellum maintain` runs.\n"
                .to_string(),
        );
    }

    lines.push("## Vault Context \u{2014} Working Notes\n".to_string());
    lines.push(
        "You have active notes in the vault. \
         These were surfaced based on status and relevance.\n"
            .to_string(),
    );

    for sel in &selected {
        let tag = reasoning_tag(sel.note, today, sel.matched_keyword);
        let tag_str = tag.map(|t| format!(" {}", t.label())).unwrap_or_default();

        lines.push(format!("### vault/{}.md{}", sel.key, tag_str));
        lines.push(format!(
            "**Type:** {} | **Status:** {}",
            sel.note.kind, sel.note.status
        ));
        if !sel.note.keywords.is_empty() {
            lines.push(format!("**Keywords:** {}", sel.note.keywords.join(", ")));
        }
        if !sel.note.links_out.is_empty() || !sel.note.links_in.is_empty() {
            lines.push(format!(
                "**Links:** {} out, {} in",
                sel.note.links_out.len(),
                sel.note.links_in.len()
            ));
        }
        lines.push(String::new());
    }

    let days_since_maintained = days_since(&index.last_maintained, today);
    let maintenance_due = index.notes_since_maintenance >= 5
        || matches!(days_since_maintained, Some(days) if days >= 7)
        || proposed_count >= 3;

    if maintenance_due {
        let days_str = days_since_maintained
            .map(|d| d.to_string())
            .unwrap_or_else(|| "?".to_string());
        lines.push(format!(
            "\u{26a0} Vault maintenance recommended \u{2014} \
             {proposed_count} proposed notes, last maintained {days_str} days ago. \
             Consider `vellum maintain`."
        ));
    }

    lines.push("---".to_string());
    lines.push(
        "**Vault commands:** `vellum index`, `vellum surface`, `vellum maintain`".to_string(),
    );

    SurfacePayload::with_context(lines.join("\n"))
}

/// Surface notes for a vault, using the index when available.
///
/// Two-stage strategy selection, made explicit rather than exception-driven:
/// stage 1 loads the persisted index and proceeds if that succeeds; stage 2
/// rescans the vault files and scores from the fresh in-memory collection.
pub fn surface(vault_root: &Path, today: NaiveDate, project_keywords: &[String]) -> SurfacePayload {
    let index = NoteIndex::load(&NoteIndex::path_for(vault_root));

    let index = match index {
        Some(index) => index,
        None => {
            debug!("index unavailable, falling back to file scan");
            let (mut notes, _skipped) = scan_notes(vault_root);
            resolve_backlinks(&mut notes);
            let mut fresh = NoteIndex::new(today);
            fresh.notes = notes;
            fresh
        }
    };

    surface_from_index(&index, today, project_keywords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 8).unwrap()
    }

    fn days_ago(days: i64) -> String {
        (today() - chrono::Duration::days(days))
            .format("%Y-%m-%d")
            .to_string()
    }

    fn working_note(touched_days_ago: i64) -> Note {
        Note {
            status: "working".to_string(),
            last_touched: days_ago(touched_days_ago),
            ..Note::default()
        }
    }

    fn index_with(notes: Vec<(String, Note)>) -> NoteIndex {
        let mut index = NoteIndex::new(today());
        index.notes = notes.into_iter().collect::<BTreeMap<_, _>>();
        index
    }

    #[test]
    fn test_small_vault_surfaces_all_non_dormant() {
        // 7 non-dormant notes, none of which would score positively.
        let notes: Vec<(String, Note)> = (0..7)
            .map(|i| (format!("atoms/n{i}"), Note::default()))
            .collect();
        let mut index = NoteIndex::new(today());
        index.notes = notes.into_iter().collect();

        let payload = surface_from_index(&index, today(), &[]);
        let text = payload.context_text().expect("payload");
        for i in 0..7 {
            assert!(text.contains(&format!("atoms/n{i}.md")), "missing note {i}");
        }
    }

    #[test]
    fn test_at_threshold_only_positive_scores_surface() {
        // 8 non-dormant notes: scoring applies, zero-score notes drop out.
        let mut notes = vec![("atoms/hot".to_string(), working_note(1))];
        let cold: Vec<String> = (0..7).map(|i| format!("atoms/cold{i}")).collect();
        for key in &cold {
            notes.push((key.clone(), Note::default()));
        }
        let index = index_with(notes);

        let payload = surface_from_index(&index, today(), &[]);
        let text = payload.context_text().expect("payload");
        assert!(text.contains("atoms/hot.md"));
        for key in &cold {
            assert!(!text.contains(&format!("{key}.md")));
        }
    }

    #[test]
    fn test_top_five_by_score() {
        let mut notes = vec![];
        // Six positively-scoring notes with increasing link counts.
        for i in 0..6usize {
            let note = Note {
                status: "unverified".to_string(),
                links_out: (0..i).map(|j| format!("t{j}")).collect(),
                ..Note::default()
            };
            notes.push((format!("atoms/n{i}"), note));
        }
        // Pad past the small-vault threshold with dormant notes (ineligible
        // but the threshold counts non-dormant only, so add zero-score ones).
        for i in 0..3usize {
            notes.push((format!("atoms/pad{i}"), Note::default()));
        }
        let mut index = NoteIndex::new(today());
        index.notes = notes.into_iter().collect();

        let payload = surface_from_index(&index, today(), &[]);
        let text = payload.context_text().expect("payload");
        // Lowest-scoring of the six (n0, score 5 with zero links) is the tie
        // loser against nothing: all six score >0, so exactly five appear
        // and the weakest (n0) is cut.
        assert!(!text.contains("atoms/n0.md"));
        for i in 1..6 {
            assert!(text.contains(&format!("atoms/n{i}.md")));
        }
    }

    #[test]
    fn test_dormant_never_surfaced() {
        let mut notes = vec![(
            "atoms/sleeping".to_string(),
            Note {
                status: "working".to_string(),
                lifecycle: Lifecycle::Dormant,
                last_touched: days_ago(1),
                ..Note::default()
            },
        )];
        for i in 0..8usize {
            notes.push((format!("atoms/n{i}"), working_note(1)));
        }
        let index = index_with(notes);

        let payload = surface_from_index(&index, today(), &[]);
        let text = payload.context_text().expect("payload");
        assert!(!text.contains("atoms/sleeping.md"));
    }

    #[test]
    fn test_empty_vault_empty_payload() {
        let index = NoteIndex::new(today());
        let payload = surface_from_index(&index, today(), &[]);
        assert!(payload.context_text().is_none());
        assert_eq!(serde_json::to_string(&payload).unwrap(), "{}");
    }

    #[test]
    fn test_maintenance_warning_via_notes_since_clause() {
        // notes_since_maintenance = 6, maintained 3 days ago, 1 proposed:
        // only the >=5 notes-since clause fires, and that is enough.
        let mut index = index_with(vec![
            (
                "atoms/pending".to_string(),
                Note {
                    lifecycle: Lifecycle::Proposed,
                    status: "working".to_string(),
                    last_touched: days_ago(1),
                    ..Note::default()
                },
            ),
            ("atoms/other".to_string(), working_note(1)),
        ]);
        index.notes_since_maintenance = 6;
        index.last_maintained = days_ago(3);

        let payload = surface_from_index(&index, today(), &[]);
        let text = payload.context_text().expect("payload");
        assert!(text.contains("Vault maintenance recommended"));
        assert!(text.contains("1 proposed notes"));
        assert!(text.contains("3 days ago"));
    }

    #[test]
    fn test_no_maintenance_warning_when_all_clauses_clear() {
        let mut index = index_with(vec![("atoms/only".to_string(), working_note(1))]);
        index.notes_since_maintenance = 2;
        index.last_maintained = days_ago(3);

        let payload = surface_from_index(&index, today(), &[]);
        let text = payload.context_text().expect("payload");
        assert!(!text.contains("maintenance recommended"));
    }

    #[test]
    fn test_capture_pause_and_maintenance_warning_together() {
        let mut notes: Vec<(String, Note)> = (0..10)
            .map(|i| {
                (
                    format!("atoms/p{i}"),
                    Note {
                        lifecycle: Lifecycle::Proposed,
                        status: "unverified".to_string(),
                        ..Note::default()
                    },
                )
            })
            .collect();
        notes.push(("atoms/live".to_string(), working_note(1)));

        let mut index = NoteIndex::new(today());
        index.notes = notes.into_iter().collect();
        index.last_maintained = days_ago(1);

        let payload = surface_from_index(&index, today(), &[]);
        let text = payload.context_text().expect("payload");
        assert!(text.contains("Capture paused"));
        assert!(text.contains("Vault maintenance recommended"));
    }

    #[test]
    fn test_project_keyword_tag() {
        let mut notes = vec![(
            "atoms/matching".to_string(),
            Note {
                status: "unverified".to_string(),
                keywords: vec!["graph".to_string()],
                last_touched: days_ago(10),
                ..Note::default()
            },
        )];
        // Zero-score padding past the small-vault threshold: the matching
        // note is the only candidate that survives scoring.
        for i in 0..8usize {
            notes.push((format!("atoms/n{i}"), Note::default()));
        }
        let index = index_with(notes);

        let keywords = vec!["graph".to_string()];
        let payload = surface_from_index(&index, today(), &keywords);
        let text = payload.context_text().expect("payload");
        assert!(text.contains("atoms/matching.md (matches project)"));
    }

    #[test]
    fn test_missing_index_falls_back_to_scan() {
        let dir = tempfile::tempdir().unwrap();
        let vault = dir.path();
        std::fs::create_dir_all(vault.join("atoms")).unwrap();
        std::fs::write(
            vault.join("atoms/solo.md"),
            "---\ntype: atom\nstatus: working\n---\n# Solo\n",
        )
        .unwrap();

        let payload = surface(vault, today(), &[]);
        let text = payload.context_text().expect("fallback payload");
        assert!(text.contains("atoms/solo.md"));
    }
}
