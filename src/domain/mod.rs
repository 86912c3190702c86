//! Domain types for transcript coding.
//!
//! This module contains the core data structures:
//! - Paragraph: One normalized statement from a transcript
//! - Segment: An overlapping window of paragraphs sent for coding
//! - Assignment: Candidate and consolidated topic/orientation codes
//! - Codebook: Topics and their ranked orientations

pub mod assignment;
pub mod codebook;
pub mod paragraph;
pub mod segment;

// Re-export commonly used types
pub use assignment::{Assignment, Candidate};
pub use codebook::{Codebook, Orientation, Topic, TopicSpec};
pub use paragraph::{paragraph_id, DocumentMetadata, MetadataValue, Paragraph};
pub use segment::{segment_id, Role, Segment, SegmentParagraph};
