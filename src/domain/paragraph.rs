//! Paragraphs and document metadata produced by the transcript readers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One speaker statement (or metadata record) from a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    /// 1-based position among the document's statements.
    /// `0` marks a metadata record that never enters segmentation.
    pub source_index: u32,

    /// Whitespace-collapsed statement text
    pub text: String,
}

impl Paragraph {
    /// Create a new paragraph
    pub fn new(source_index: u32, text: impl Into<String>) -> Self {
        Self {
            source_index,
            text: text.into(),
        }
    }

    /// Whether this record carries `key = value` metadata instead of a statement
    pub fn is_metadata(&self) -> bool {
        self.source_index == 0
    }
}

/// Stable paragraph identifier: `{doc_id}:p{source_index:04}`.
///
/// The id only depends on the document id and the paragraph's source index,
/// so the same paragraph keeps its id in every segment that contains it.
pub fn paragraph_id(doc_id: &str, source_index: u32) -> String {
    format!("{}:p{:04}", doc_id, source_index)
}

/// A metadata field value. Repeated keys with distinct values become a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Single(String),
    Multiple(Vec<String>),
}

impl MetadataValue {
    /// Merge another value for the same key, ignoring exact repeats
    pub fn merge(&mut self, value: String) {
        match self {
            Self::Single(existing) => {
                if *existing != value {
                    *self = Self::Multiple(vec![std::mem::take(existing), value]);
                }
            }
            Self::Multiple(values) => {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
        }
    }
}

/// Metadata extracted from `key = value` records of a transcript
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Interviewer speaker labels, deduplicated case-insensitively
    #[serde(default)]
    pub interviewers: Vec<String>,

    /// Number of metadata records removed from the statement list
    #[serde(default)]
    pub metadata_paragraphs_removed: usize,

    /// Any other `key = value` fields
    #[serde(default)]
    pub fields: BTreeMap<String, MetadataValue>,
}
