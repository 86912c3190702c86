//! interview-coder - Evidence-based qualitative coding of interview transcripts
//!
//! Transcripts are split into overlapping paragraph segments, each segment is
//! coded against a codebook of topics and orientations by a language model,
//! and the results are consolidated and aggregated into an evidence report.
//!
//! # Architecture
//!
//! The work is split into incremental stages:
//! - `segment`: transcripts are parsed and windowed into segments
//! - `analyze`: every segment is coded; candidates are consolidated per paragraph
//! - `write-output`: the analysis files are folded into a report
//!
//! Each work file records a fingerprint of its inputs, so unchanged documents
//! are never recomputed.
//!
//! # Modules
//!
//! - `adapters`: Language model backends (OpenAI-compatible)
//! - `core`: Segmentation, fingerprints, consolidation policy and stages
//! - `domain`: Data structures (Paragraph, Segment, Codebook, Assignment)
//! - `transcripts`: Readers for `.txt`, `.md` and `.odt` transcripts
//! - `workdir`: Work file layout and persistence
//! - `report`: Evidence report
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! interview-coder template
//! interview-coder segment
//! interview-coder analyze
//! interview-coder write-output
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod report;
pub mod transcripts;
pub mod workdir;

// Re-export main types at crate root for convenience
pub use config::{ConfigError, InterviewConfig};
pub use core::{Orchestrator, OrientationPolicy, SegmentationParams};
pub use domain::{Assignment, Candidate, Codebook, Paragraph, Segment};
pub use report::EvidenceReport;
