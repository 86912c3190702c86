//! Segments work files and the segmentation index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::segmentation::SegmentationParams;
use crate::domain::{DocumentMetadata, Segment};

/// Source transcript of a work file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Path relative to the configuration directory
    pub path: String,

    /// `sha256:` digest of the transcript bytes
    pub digest: String,
}

/// Segmentation parameters as recorded in the work file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationInfo {
    pub unit: String,
    pub segment_paragraphs: usize,
    pub overlap_paragraphs: usize,
    pub step_paragraphs: usize,
}

impl From<&SegmentationParams> for SegmentationInfo {
    fn from(params: &SegmentationParams) -> Self {
        Self {
            unit: "paragraph".to_string(),
            segment_paragraphs: params.window(),
            overlap_paragraphs: params.overlap(),
            step_paragraphs: params.step(),
        }
    }
}

/// `segments/<doc_id>.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentsFile {
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,

    /// Inputs this file was computed from
    pub fingerprint: serde_json::Value,

    pub transcript_parsing_version: u32,
    pub source: SourceInfo,
    pub document_id: String,
    pub metadata: DocumentMetadata,
    pub segmentation: SegmentationInfo,

    /// Parsed records including metadata records
    pub source_paragraphs_total: usize,

    /// Statements that entered segmentation
    pub paragraphs_total: usize,

    pub segments: Vec<Segment>,
}

/// Outcome for one document in an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    #[default]
    Ok,
    Failed,
}

/// One document in `segments/index.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentsIndexEntry {
    pub document_id: String,
    pub source_path: String,

    #[serde(default)]
    pub status: DocumentStatus,

    /// Work file path relative to the configuration directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments_file: Option<String>,

    #[serde(default)]
    pub paragraphs_total: usize,

    #[serde(default)]
    pub segments_total: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `segments/index.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentsIndex {
    pub schema_version: u32,
    pub documents: Vec<SegmentsIndexEntry>,
}

impl SegmentsIndex {
    /// Documents that were segmented successfully
    pub fn ok_documents(&self) -> impl Iterator<Item = &SegmentsIndexEntry> {
        self.documents
            .iter()
            .filter(|d| d.status == DocumentStatus::Ok && d.segments_file.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_entry_defaults() {
        let yaml = "document_id: a-0123456789\nsource_path: t/a.txt\nsegments_file: work/segments/a.yaml\n";
        let entry: SegmentsIndexEntry = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(entry.status, DocumentStatus::Ok);
        assert_eq!(entry.segments_total, 0);
        assert!(entry.error.is_none());
    }

    #[test]
    fn test_ok_documents_skips_failures() {
        let index = SegmentsIndex {
            schema_version: 1,
            documents: vec![
                SegmentsIndexEntry {
                    document_id: "a".to_string(),
                    source_path: "a.txt".to_string(),
                    status: DocumentStatus::Failed,
                    segments_file: None,
                    paragraphs_total: 0,
                    segments_total: 0,
                    error: Some("boom".to_string()),
                },
                SegmentsIndexEntry {
                    document_id: "b".to_string(),
                    source_path: "b.txt".to_string(),
                    status: DocumentStatus::Ok,
                    segments_file: Some("work/segments/b.yaml".to_string()),
                    paragraphs_total: 3,
                    segments_total: 1,
                    error: None,
                },
            ],
        };
        let ids: Vec<&str> = index.ok_documents().map(|d| d.document_id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }
}
