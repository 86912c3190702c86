//! Overlapping segmentation of a document's paragraphs.
//!
//! A document is cut into windows of `window` paragraphs that advance by
//! `window - overlap`. The leading `overlap` paragraphs of every segment after
//! the first are tagged `ref`: they were already coded in an earlier segment
//! and are only repeated as context. Every paragraph is `new` exactly once.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{paragraph_id, segment_id, Paragraph, Role, Segment, SegmentParagraph};

/// Invalid segmentation parameters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentationError {
    #[error("segmentation.segment_paragraphs must be > 0 (got {0})")]
    WindowNotPositive(i64),

    #[error("segmentation.overlap_paragraphs must be >= 0 (got {0})")]
    NegativeOverlap(i64),

    #[error("segmentation.overlap_paragraphs must be < segmentation.segment_paragraphs ({overlap} >= {window})")]
    OverlapTooLarge { overlap: i64, window: i64 },
}

/// Validated window/overlap sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationParams {
    window: usize,
    overlap: usize,
}

impl SegmentationParams {
    pub const DEFAULT_WINDOW: i64 = 12;
    pub const DEFAULT_OVERLAP: i64 = 3;

    /// Validate raw configuration values
    pub fn new(window: i64, overlap: i64) -> Result<Self, SegmentationError> {
        if window <= 0 {
            return Err(SegmentationError::WindowNotPositive(window));
        }
        if overlap < 0 {
            return Err(SegmentationError::NegativeOverlap(overlap));
        }
        if overlap >= window {
            return Err(SegmentationError::OverlapTooLarge { overlap, window });
        }

        Ok(Self {
            window: window as usize,
            overlap: overlap as usize,
        })
    }

    /// Paragraphs per segment
    pub fn window(&self) -> usize {
        self.window
    }

    /// Paragraphs repeated from the previous segment
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between the starts of consecutive segments (always >= 1)
    pub fn step(&self) -> usize {
        self.window - self.overlap
    }
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            window: Self::DEFAULT_WINDOW as usize,
            overlap: Self::DEFAULT_OVERLAP as usize,
        }
    }
}

/// Split a document's paragraphs into overlapping segments.
///
/// Metadata records (`source_index == 0`) are skipped. Ids depend only on
/// `doc_id` and source indices, so the output is reproducible.
pub fn build_segments(doc_id: &str, paragraphs: &[Paragraph], params: &SegmentationParams) -> Vec<Segment> {
    let body: Vec<&Paragraph> = paragraphs.iter().filter(|p| !p.is_metadata()).collect();
    let total = body.len();

    let mut segments = Vec::new();
    let mut start = 0usize;

    while start < total {
        let end = (start + params.window()).min(total);
        let is_first = segments.is_empty();
        let window = &body[start..end];

        let entries: Vec<SegmentParagraph> = window
            .iter()
            .enumerate()
            .map(|(offset, p)| SegmentParagraph {
                id: paragraph_id(doc_id, p.source_index),
                index: p.source_index,
                role: if !is_first && offset < params.overlap() {
                    Role::Ref
                } else {
                    Role::New
                },
                text: p.text.clone(),
            })
            .collect();

        let overlap_paragraphs = if is_first {
            0
        } else {
            params.overlap().min(window.len())
        };

        let first_index = window[0].source_index;
        let last_index = window[window.len() - 1].source_index;

        segments.push(Segment {
            id: segment_id(doc_id, first_index, last_index),
            segment_index: segments.len() + 1,
            start_paragraph: first_index,
            end_paragraph: last_index,
            overlap_paragraphs,
            paragraphs: entries,
        });

        start += params.step();
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraphs(n: u32) -> Vec<Paragraph> {
        (1..=n).map(|i| Paragraph::new(i, format!("S{}: statement {}", i, i))).collect()
    }

    #[test]
    fn test_params_validation() {
        assert!(SegmentationParams::new(12, 3).is_ok());
        assert!(SegmentationParams::new(1, 0).is_ok());
        assert_eq!(
            SegmentationParams::new(0, 0),
            Err(SegmentationError::WindowNotPositive(0))
        );
        assert_eq!(
            SegmentationParams::new(5, -1),
            Err(SegmentationError::NegativeOverlap(-1))
        );
        assert_eq!(
            SegmentationParams::new(5, 5),
            Err(SegmentationError::OverlapTooLarge { overlap: 5, window: 5 })
        );
    }

    #[test]
    fn test_empty_document_has_no_segments() {
        let params = SegmentationParams::default();
        assert!(build_segments("doc", &[], &params).is_empty());
    }

    #[test]
    fn test_short_document_single_segment() {
        let params = SegmentationParams::new(12, 3).unwrap();
        let segments = build_segments("doc", &paragraphs(5), &params);

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].id, "doc:p0001-p0005");
        assert_eq!(segments[0].overlap_paragraphs, 0);
        assert!(segments[0].paragraphs.iter().all(|p| p.role == Role::New));
    }

    #[test]
    fn test_fourteen_paragraphs_two_segments() {
        let params = SegmentationParams::new(12, 3).unwrap();
        let segments = build_segments("doc", &paragraphs(14), &params);

        assert_eq!(segments.len(), 2);

        let first = &segments[0];
        assert_eq!((first.start_paragraph, first.end_paragraph), (1, 12));
        assert!(first.paragraphs.iter().all(|p| p.role == Role::New));

        let second = &segments[1];
        assert_eq!(second.segment_index, 2);
        assert_eq!((second.start_paragraph, second.end_paragraph), (10, 14));
        assert_eq!(second.overlap_paragraphs, 3);
        let roles: Vec<(u32, Role)> = second.paragraphs.iter().map(|p| (p.index, p.role)).collect();
        assert_eq!(
            roles,
            vec![
                (10, Role::Ref),
                (11, Role::Ref),
                (12, Role::Ref),
                (13, Role::New),
                (14, Role::New),
            ]
        );
    }

    #[test]
    fn test_metadata_records_are_skipped() {
        let mut input = vec![Paragraph::new(0, "interviewer = Anna")];
        input.extend(paragraphs(3));
        let segments = build_segments("doc", &input, &SegmentationParams::default());

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].paragraphs.len(), 3);
        assert_eq!(segments[0].start_paragraph, 1);
    }

    #[test]
    fn test_zero_overlap_has_no_ref_paragraphs() {
        let params = SegmentationParams::new(4, 0).unwrap();
        let segments = build_segments("doc", &paragraphs(10), &params);

        assert_eq!(segments.len(), 3);
        assert!(segments
            .iter()
            .flat_map(|s| s.paragraphs.iter())
            .all(|p| p.role == Role::New));
        assert_eq!(segments[2].paragraphs.len(), 2);
    }
}
