//! Progress reporting for the segment and analyze stages.
//!
//! The pipeline never prints. It emits `ProgressEvent`s to an injected
//! `Progress` implementation; the CLI uses `TracingProgress`, tests use a
//! recorder or `NoProgress`.

use std::fmt;

use tracing::{debug, info, warn};

/// Pipeline stage an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Segment,
    Analyze,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Segment => write!(f, "segment"),
            Self::Analyze => write!(f, "analyze"),
        }
    }
}

/// A single progress event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Stage is starting on `total` documents
    StageStarted { stage: Stage, total: usize },

    /// Processing document `position` of `total`
    DocumentStarted {
        stage: Stage,
        document_id: String,
        position: usize,
        total: usize,
    },

    /// The cached work file was reused
    DocumentReused { stage: Stage, document_id: String },

    /// A document was (re)computed and written
    DocumentCompleted { stage: Stage, document_id: String },

    /// A document could not be processed; the stage continues
    DocumentFailed {
        stage: Stage,
        document_id: String,
        error: String,
    },

    /// Coding request for one segment (and optionally one topic)
    SegmentCoding {
        segment_id: String,
        position: usize,
        total: usize,
        topic: Option<String>,
    },
}

/// Receives progress events. Implementations must be cheap and non-blocking.
pub trait Progress: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Forwards progress to `tracing`
pub struct TracingProgress;

impl Progress for TracingProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::StageStarted { stage, total } => {
                info!(%stage, documents = total, "Stage started");
            }
            ProgressEvent::DocumentStarted {
                stage,
                document_id,
                position,
                total,
            } => {
                info!(%stage, %document_id, "[{}/{}] Processing", position, total);
            }
            ProgressEvent::DocumentReused { stage, document_id } => {
                info!(%stage, %document_id, "Up to date, skipping");
            }
            ProgressEvent::DocumentCompleted { stage, document_id } => {
                info!(%stage, %document_id, "Written");
            }
            ProgressEvent::DocumentFailed {
                stage,
                document_id,
                error,
            } => {
                warn!(%stage, %document_id, %error, "Document failed");
            }
            ProgressEvent::SegmentCoding {
                segment_id,
                position,
                total,
                topic,
            } => match topic {
                Some(topic) => debug!(%segment_id, %topic, "[{}/{}] Coding topic", position, total),
                None => debug!(%segment_id, "[{}/{}] Coding segment", position, total),
            },
        }
    }
}

/// Discards all events
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}
