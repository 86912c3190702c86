//! Candidate and consolidated topic assignments.
//!
//! A `Candidate` is whatever the model proposed for a paragraph; it is not
//! validated against the codebook yet. An `Assignment` is a candidate that
//! survived consolidation and is written to the analysis work file.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One raw (topic, orientation, evidence) proposal for a paragraph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Topic name (trimmed, never empty)
    pub topic: String,

    /// Orientation label; `None` when absent, null or blank
    pub orientation: Option<String>,

    /// Evidence quote as returned
    pub evidence: String,
}

impl Candidate {
    /// Create a candidate, normalizing blank orientations to `None`
    pub fn new(topic: impl Into<String>, orientation: Option<&str>, evidence: impl Into<String>) -> Self {
        Self {
            topic: topic.into().trim().to_string(),
            orientation: orientation
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string),
            evidence: evidence.into(),
        }
    }

    /// Parse a candidate from an untyped JSON object.
    ///
    /// Returns `None` for malformed shapes: a missing, blank or non-string
    /// topic, a non-string evidence, or an orientation that is neither a
    /// string nor null/absent.
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let topic = obj.get("topic")?.as_str()?;
        if topic.trim().is_empty() {
            return None;
        }

        let evidence = obj.get("evidence")?.as_str()?;

        let orientation = match obj.get("orientation") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.as_str()),
            Some(_) => return None,
        };

        Some(Self::new(topic, orientation, evidence))
    }

    /// Orientation label or the empty string
    pub fn orientation_label(&self) -> &str {
        self.orientation.as_deref().unwrap_or("")
    }

    /// Key for exact-duplicate detection: (topic, orientation, trimmed evidence)
    pub fn dedup_key(&self) -> (&str, &str, &str) {
        (&self.topic, self.orientation_label(), self.evidence.trim())
    }
}

/// A consolidated assignment as persisted in the analysis work file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub topic: String,

    /// Orientation label (empty for topics without orientations)
    #[serde(default)]
    pub orientation: String,

    pub evidence: String,
}

impl From<Candidate> for Assignment {
    fn from(candidate: Candidate) -> Self {
        Self {
            orientation: candidate.orientation.unwrap_or_default(),
            topic: candidate.topic,
            evidence: candidate.evidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_accepts_null_and_missing_orientation() {
        let c = Candidate::from_json(&json!({"topic": " Trust ", "orientation": null, "evidence": "q"})).unwrap();
        assert_eq!(c.topic, "Trust");
        assert_eq!(c.orientation, None);

        let c = Candidate::from_json(&json!({"topic": "Trust", "evidence": "q"})).unwrap();
        assert_eq!(c.orientation, None);

        let c = Candidate::from_json(&json!({"topic": "Trust", "orientation": "  ", "evidence": "q"})).unwrap();
        assert_eq!(c.orientation_label(), "");
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        assert!(Candidate::from_json(&json!("not an object")).is_none());
        assert!(Candidate::from_json(&json!({"topic": 3, "evidence": "q"})).is_none());
        assert!(Candidate::from_json(&json!({"topic": "   ", "evidence": "q"})).is_none());
        assert!(Candidate::from_json(&json!({"topic": "T", "evidence": ["q"]})).is_none());
        assert!(Candidate::from_json(&json!({"topic": "T"})).is_none());
        assert!(Candidate::from_json(&json!({"topic": "T", "orientation": 1, "evidence": "q"})).is_none());
    }

    #[test]
    fn test_dedup_key_trims_evidence() {
        let a = Candidate::new("T", Some("Clear"), " quote ");
        let b = Candidate::new("T", Some(" Clear"), "quote");
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn test_assignment_from_candidate() {
        let a: Assignment = Candidate::new("T", None, "q").into();
        assert_eq!(a.orientation, "");
        assert_eq!(a.topic, "T");
    }
}
