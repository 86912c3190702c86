//! Orientation consolidation policy.
//!
//! The model may return several candidates for the same topic in the same
//! paragraph: exact duplicates, or competing orientations. Consolidation
//! reduces them to a rule-compliant set:
//!
//! 1. Exact duplicates of (topic, orientation, trimmed evidence) collapse to
//!    the first occurrence.
//! 2. Topics that allow multiple orientations keep every remaining candidate.
//! 3. Otherwise one candidate wins by rank and a `PolicyWarning` records the
//!    distinct orientations that were dropped, if any.
//!
//! The per-topic table is built once from the codebook and never mutated.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Assignment, Candidate, Codebook, Topic};

/// How exact score ties are broken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The candidate returned first wins
    #[default]
    FirstSeen,
    /// The candidate returned last wins
    LastSeen,
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstSeen => write!(f, "first_seen"),
            Self::LastSeen => write!(f, "last_seen"),
        }
    }
}

/// Scores used for orientations that are not in the rank table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringDefaults {
    /// Score of an orientation label unknown to the topic
    #[serde(default = "default_unknown_score")]
    pub unknown_score: i64,

    /// Score of a missing or blank orientation
    #[serde(default = "default_missing_score")]
    pub missing_score: i64,

    #[serde(default)]
    pub tie_break: TieBreak,
}

fn default_unknown_score() -> i64 {
    -100
}
fn default_missing_score() -> i64 {
    -1_000_000
}

impl Default for ScoringDefaults {
    fn default() -> Self {
        Self {
            unknown_score: default_unknown_score(),
            missing_score: default_missing_score(),
            tie_break: TieBreak::default(),
        }
    }
}

/// Multiplicity rule and orientation ranks for one topic
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicPolicy {
    pub allow_multiple: bool,

    /// Orientation label -> rank (higher = stronger)
    pub rank: HashMap<String, i64>,
}

impl TopicPolicy {
    /// Ranks follow declaration order: the first label gets the highest rank.
    /// A repeated label keeps the rank of its first occurrence.
    pub fn from_topic(topic: &Topic) -> Self {
        let total = topic.orientations.len() as i64;
        let mut rank = HashMap::new();
        for (idx, label) in topic.orientations.iter().enumerate() {
            rank.entry(label.trim().to_string())
                .or_insert(total - idx as i64);
        }

        Self {
            allow_multiple: topic.allow_multiple_orientations,
            rank,
        }
    }

    fn score(&self, candidate: &Candidate, defaults: &ScoringDefaults) -> i64 {
        match candidate.orientation.as_deref() {
            None => defaults.missing_score,
            Some(label) => self.rank.get(label).copied().unwrap_or(defaults.unknown_score),
        }
    }
}

/// Informational record of a single-winner resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyWarning {
    pub topic: String,
    pub paragraph_id: String,

    /// Orientation that was kept (empty when it had none)
    pub kept: String,

    /// Distinct non-empty orientations that were dropped, excluding the winner's
    pub dropped: Vec<String>,
}

impl fmt::Display for PolicyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dropped: Vec<String> = self.dropped.iter().map(|d| format!("'{}'", d)).collect();
        write!(
            f,
            "Filtered multiple orientations for topic '{}' in paragraph {}: kept '{}', dropped [{}]",
            self.topic,
            self.paragraph_id,
            self.kept,
            dropped.join(", ")
        )
    }
}

/// Result of consolidating one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Consolidation {
    /// Paragraph id -> surviving assignments (paragraphs without any are absent)
    pub assignments: BTreeMap<String, Vec<Assignment>>,
    pub warnings: Vec<PolicyWarning>,
}

/// Per-topic policy table for a codebook
#[derive(Debug, Clone, Default)]
pub struct OrientationPolicy {
    topics: HashMap<String, TopicPolicy>,
    defaults: ScoringDefaults,
}

impl OrientationPolicy {
    /// Build the table from a normalized codebook
    pub fn from_codebook(codebook: &Codebook) -> Self {
        let topics = codebook
            .topics
            .iter()
            .map(|t| (t.topic.clone(), TopicPolicy::from_topic(t)))
            .collect();

        Self {
            topics,
            defaults: ScoringDefaults::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: ScoringDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_topic(mut self, name: impl Into<String>, policy: TopicPolicy) -> Self {
        self.topics.insert(name.into(), policy);
        self
    }

    pub fn defaults(&self) -> &ScoringDefaults {
        &self.defaults
    }

    pub fn topic(&self, name: &str) -> Option<&TopicPolicy> {
        self.topics.get(name)
    }

    /// Consolidate typed candidates for every paragraph of a document
    pub fn consolidate(&self, candidates: &BTreeMap<String, Vec<Candidate>>) -> Consolidation {
        let mut out = Consolidation::default();

        for (paragraph_id, items) in candidates {
            let kept = self.consolidate_paragraph(paragraph_id, items, &mut out.warnings);
            if !kept.is_empty() {
                out.assignments.insert(paragraph_id.clone(), kept);
            }
        }

        out
    }

    /// Consolidate untyped candidates, silently discarding malformed ones
    pub fn consolidate_json(&self, raw: &BTreeMap<String, Vec<Value>>) -> Consolidation {
        let typed: BTreeMap<String, Vec<Candidate>> = raw
            .iter()
            .map(|(pid, values)| {
                (
                    pid.clone(),
                    values.iter().filter_map(Candidate::from_json).collect(),
                )
            })
            .collect();
        self.consolidate(&typed)
    }

    fn consolidate_paragraph(
        &self,
        paragraph_id: &str,
        items: &[Candidate],
        warnings: &mut Vec<PolicyWarning>,
    ) -> Vec<Assignment> {
        // Group by topic, keeping first-seen topic order
        let mut topic_order: Vec<&str> = Vec::new();
        let mut by_topic: HashMap<&str, Vec<&Candidate>> = HashMap::new();
        for candidate in items {
            let topic = candidate.topic.as_str();
            if topic.is_empty() {
                continue;
            }
            by_topic
                .entry(topic)
                .or_insert_with(|| {
                    topic_order.push(topic);
                    Vec::new()
                })
                .push(candidate);
        }

        let fallback = TopicPolicy::default();
        let mut kept = Vec::new();

        for topic in topic_order {
            let group = &by_topic[topic];
            let policy = self.topics.get(topic).unwrap_or(&fallback);

            let mut unique: Vec<&Candidate> = Vec::with_capacity(group.len());
            for candidate in group {
                if !unique.iter().any(|u| u.dedup_key() == candidate.dedup_key()) {
                    unique.push(*candidate);
                }
            }

            if policy.allow_multiple || unique.len() <= 1 {
                kept.extend(unique.into_iter().cloned().map(Assignment::from));
                continue;
            }

            let winner = self.pick_winner(policy, &unique);
            let chosen = unique[winner];
            let kept_label = chosen.orientation_label().to_string();

            let mut dropped: Vec<String> = Vec::new();
            for (idx, candidate) in unique.iter().enumerate() {
                let label = candidate.orientation_label();
                if idx == winner || label.is_empty() || label == kept_label {
                    continue;
                }
                if !dropped.iter().any(|d| d == label) {
                    dropped.push(label.to_string());
                }
            }

            if !dropped.is_empty() {
                warnings.push(PolicyWarning {
                    topic: topic.to_string(),
                    paragraph_id: paragraph_id.to_string(),
                    kept: kept_label,
                    dropped,
                });
            }
            kept.push(Assignment::from(chosen.clone()));
        }

        kept
    }

    fn pick_winner(&self, policy: &TopicPolicy, unique: &[&Candidate]) -> usize {
        let mut best = 0usize;
        let mut best_score = policy.score(unique[0], &self.defaults);

        for (idx, candidate) in unique.iter().enumerate().skip(1) {
            let score = policy.score(candidate, &self.defaults);
            let better = match self.defaults.tie_break {
                TieBreak::FirstSeen => score > best_score,
                TieBreak::LastSeen => score >= best_score,
            };
            if better {
                best = idx;
                best_score = score;
            }
        }

        best
    }
}
