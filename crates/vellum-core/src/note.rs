//! Note data model

use serde::{Deserialize, Deserializer, Serialize};

/// Coarse lifecycle state controlling a note's visibility.
///
/// Unknown or absent values resolve to `Active`; `Dormant` excludes a note
/// from surfacing entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Proposed,
    #[default]
    Active,
    Dormant,
}

// Manual impl so unknown strings in persisted indexes degrade to Active
// instead of failing the whole load.
impl<'de> Deserialize<'de> for Lifecycle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Lifecycle::parse(&value))
    }
}

impl Lifecycle {
    pub fn parse(value: &str) -> Self {
        match value {
            "proposed" => Lifecycle::Proposed,
            "dormant" => Lifecycle::Dormant,
            _ => Lifecycle::Active,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Proposed => "proposed",
            Lifecycle::Active => "active",
            Lifecycle::Dormant => "dormant",
        }
    }
}

/// A single indexed note. The note's key (relative path without extension)
/// is the map key in the index, not a field of the record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Categorical tag (atom, encounter, position, ...); free-form.
    #[serde(rename = "type")]
    pub kind: String,
    /// Lifecycle stage marker ("working", "unverified", ...); affects scoring.
    pub status: String,
    pub lifecycle: Lifecycle,
    /// ISO date (YYYY-MM-DD) or empty if absent.
    pub created: String,
    /// ISO date (YYYY-MM-DD) or empty; drives staleness scoring.
    pub last_touched: String,
    /// Provenance marker; "migration" for imported notes.
    pub origin: String,
    /// Sorted lowercase terms from headings and link basenames.
    pub keywords: Vec<String>,
    /// Deduplicated outbound wikilink targets in first-appearance order.
    pub links_out: Vec<String>,
    /// Keys of notes referencing this one; resolved targets only, sorted.
    pub links_in: Vec<String>,
    /// First H1 of the body, or empty.
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_parse_defaults_to_active() {
        assert_eq!(Lifecycle::parse("proposed"), Lifecycle::Proposed);
        assert_eq!(Lifecycle::parse("dormant"), Lifecycle::Dormant);
        assert_eq!(Lifecycle::parse("active"), Lifecycle::Active);
        assert_eq!(Lifecycle::parse(""), Lifecycle::Active);
        assert_eq!(Lifecycle::parse("archived"), Lifecycle::Active);
    }

    #[test]
    fn test_lifecycle_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&Lifecycle::Dormant).unwrap(),
            "\"dormant\""
        );
        let parsed: Lifecycle = serde_json::from_str("\"proposed\"").unwrap();
        assert_eq!(parsed, Lifecycle::Proposed);
        // Unknown strings deserialize to the default rather than failing.
        let unknown: Lifecycle = serde_json::from_str("\"whatever\"").unwrap();
        assert_eq!(unknown, Lifecycle::Active);
    }

    #[test]
    fn test_note_serializes_type_field() {
        let note = Note {
            kind: "atom".to_string(),
            ..Note::default()
        };
        let json = serde_json::to_string(&note).unwrap();
        assert!(json.contains("\"type\":\"atom\""));
        assert!(!json.contains("\"kind\""));
    }

    #[test]
    fn test_note_round_trip_preserves_lifecycle() {
        let note = Note {
            lifecycle: Lifecycle::Dormant,
            links_out: vec!["a/b".to_string()],
            ..Note::default()
        };
        let json = serde_json::to_string(&note).unwrap();
        let back: Note = serde_json::from_str(&json).unwrap();
        assert_eq!(back, note);
    }
}
