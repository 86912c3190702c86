//! Segments: overlapping paragraph windows submitted together for coding.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role of a paragraph inside a specific segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// First appearance; the paragraph is coded in this segment
    New,

    /// Leading overlap shown only as context (already coded earlier)
    Ref,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Ref => write!(f, "ref"),
        }
    }
}

/// A paragraph as it appears inside one segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentParagraph {
    /// Stable paragraph id (same in every segment)
    pub id: String,

    /// Source index of the paragraph
    pub index: u32,

    /// Whether the paragraph is new here or overlap context
    pub role: Role,

    /// Statement text
    pub text: String,
}

/// A contiguous window over a document's paragraphs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// `{doc_id}:p{start:04}-p{end:04}`
    pub id: String,

    /// 1-based emission order
    pub segment_index: usize,

    /// Source index of the first paragraph (inclusive)
    pub start_paragraph: u32,

    /// Source index of the last paragraph (inclusive)
    pub end_paragraph: u32,

    /// Paragraphs shared with the previous segment (0 for the first)
    pub overlap_paragraphs: usize,

    /// Paragraph entries in source order
    pub paragraphs: Vec<SegmentParagraph>,
}

impl Segment {
    /// Paragraphs first introduced by this segment
    pub fn new_paragraphs(&self) -> impl Iterator<Item = &SegmentParagraph> {
        self.paragraphs.iter().filter(|p| p.role == Role::New)
    }
}

/// Stable segment identifier derived from the spanned source indices
pub fn segment_id(doc_id: &str, start: u32, end: u32) -> String {
    format!("{}:p{:04}-p{:04}", doc_id, start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_id_format() {
        assert_eq!(segment_id("intro-0123456789", 1, 12), "intro-0123456789:p0001-p0012");
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Ref).unwrap(), "\"ref\"");
        let role: Role = serde_json::from_str("\"new\"").unwrap();
        assert_eq!(role, Role::New);
    }
}
