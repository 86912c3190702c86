//! Core coding logic.
//!
//! This module contains:
//! - Segmentation: overlapping paragraph windows with `new`/`ref` roles
//! - Fingerprint: cache validity decisions for work files
//! - Policy: orientation consolidation per paragraph and topic
//! - Prompt: model payloads and response parsing
//! - Orchestrator: the incremental segment and analyze stages

pub mod fingerprint;
pub mod orchestrator;
pub mod policy;
pub mod progress;
pub mod prompt;
pub mod segmentation;

// Re-export commonly used types
pub use fingerprint::{should_recompute, Fingerprint, FingerprintValue};
pub use orchestrator::{normalize_candidate, Orchestrator, StageSummary};
pub use policy::{Consolidation, OrientationPolicy, PolicyWarning, ScoringDefaults, TieBreak, TopicPolicy};
pub use progress::{NoProgress, Progress, ProgressEvent, Stage, TracingProgress};
pub use segmentation::{build_segments, SegmentationError, SegmentationParams};
