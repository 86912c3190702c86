//! Analysis work files and the analysis index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::segments_file::{DocumentStatus, SourceInfo};
use crate::config::Strategy;
use crate::domain::{Assignment, Codebook, DocumentMetadata, Role};

/// Inputs an analysis was derived from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisInput {
    pub segments_file: String,
    pub segments_digest: String,
    pub codebook_hash: String,
}

/// Coding settings recorded with the result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSettingsRecord {
    pub strategy: Strategy,
    pub exclude_interviewer: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<String>,
}

/// Why a paragraph was not a coding target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// Overlap context already coded in an earlier segment
    OverlapReference,
    /// Spoken by an interviewer while `exclude_interviewer` is set
    InterviewerStatement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzedParagraph {
    pub id: String,
    pub index: u32,
    pub role: Role,
    pub text: String,

    /// Whether the paragraph was coded in this segment
    pub target: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_reason: Option<ExclusionReason>,

    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzedSegment {
    pub id: String,
    pub segment_index: usize,
    pub start_paragraph: u32,
    pub end_paragraph: u32,
    pub paragraphs: Vec<AnalyzedParagraph>,

    /// Failed or malformed model calls for this segment
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// `analysis/<doc_id>.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisFile {
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,

    /// Inputs this file was computed from
    pub fingerprint: serde_json::Value,

    pub input: AnalysisInput,
    pub document_id: String,
    pub source: SourceInfo,
    pub metadata: DocumentMetadata,
    pub analysis: AnalysisSettingsRecord,
    pub codebook: Codebook,
    pub segments: Vec<AnalyzedSegment>,

    /// Consolidation warnings for the whole document
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl AnalysisFile {
    /// Total consolidated assignments across all segments
    pub fn assignments_total(&self) -> usize {
        self.segments
            .iter()
            .flat_map(|s| s.paragraphs.iter())
            .map(|p| p.assignments.len())
            .sum()
    }

    /// Total segment errors
    pub fn errors_total(&self) -> usize {
        self.segments.iter().map(|s| s.errors.len()).sum()
    }
}

/// One document in `analysis/index.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisIndexEntry {
    pub document_id: String,
    pub source_path: String,

    #[serde(default)]
    pub status: DocumentStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_file: Option<String>,

    #[serde(default)]
    pub segments_total: usize,

    #[serde(default)]
    pub assignments_total: usize,

    #[serde(default)]
    pub errors_total: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `analysis/index.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisIndex {
    pub schema_version: u32,
    pub documents: Vec<AnalysisIndexEntry>,
}
