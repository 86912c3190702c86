//! Transcript readers.
//!
//! Format readers only extract raw text blocks. `statements` turns blocks
//! into statement paragraphs and `metadata` separates `key = value` records
//! from the statements:
//! - `text`: `.txt` / `.md`, blocks separated by blank lines
//! - `odt`: OpenDocument text, one block per paragraph

pub mod metadata;
pub mod odt;
pub mod statements;
pub mod text;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::{DocumentMetadata, Paragraph};

pub use metadata::{extract_metadata, InterviewerMatcher};
pub use odt::OdtReader;
pub use statements::StatementParser;
pub use text::TextReader;

/// Bumped whenever parsing output changes, so cached segments are rebuilt
pub const TRANSCRIPT_PARSING_VERSION: u32 = 5;

/// Errors raised while reading a transcript
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid archive {path}: {message}")]
    Archive { path: PathBuf, message: String },

    #[error("Invalid XML in {path}: {message}")]
    Xml { path: PathBuf, message: String },

    #[error("No reader for transcript format: {0}")]
    Unsupported(PathBuf),

    #[error("Invalid statement pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Extracts raw text blocks from one transcript format
pub trait TranscriptReader: Send + Sync {
    /// Reader name for logging
    fn name(&self) -> &str;

    /// Whether this reader handles the file (by extension)
    fn can_read(&self, path: &Path) -> bool;

    /// Raw text blocks in document order
    fn read_blocks(&self, path: &Path) -> Result<Vec<String>, ParserError>;
}

/// A parsed transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    /// Statements, 1-based and gap-free
    pub paragraphs: Vec<Paragraph>,

    /// Metadata pulled out of `key = value` records
    pub metadata: DocumentMetadata,

    /// Statements before metadata removal (including `source_index == 0` records)
    pub source_paragraphs_total: usize,
}

/// Selects a reader by file extension
pub struct ReaderRegistry {
    readers: Vec<Box<dyn TranscriptReader>>,
    parser: StatementParser,
}

impl ReaderRegistry {
    /// Registry with the built-in text and ODT readers
    pub fn new() -> Result<Self, ParserError> {
        Ok(Self {
            readers: vec![Box::new(TextReader), Box::new(OdtReader::default())],
            parser: StatementParser::new()?,
        })
    }

    /// Add a reader; later readers are only consulted when earlier ones decline
    pub fn register(&mut self, reader: Box<dyn TranscriptReader>) {
        self.readers.push(reader);
    }

    pub fn reader_for(&self, path: &Path) -> Option<&dyn TranscriptReader> {
        self.readers
            .iter()
            .find(|r| r.can_read(path))
            .map(|r| r.as_ref())
    }

    pub fn can_read(&self, path: &Path) -> bool {
        self.reader_for(path).is_some()
    }

    /// Read, parse and split a transcript into statements and metadata
    pub fn read_transcript(&self, path: &Path) -> Result<Transcript, ParserError> {
        let reader = self
            .reader_for(path)
            .ok_or_else(|| ParserError::Unsupported(path.to_path_buf()))?;

        let blocks = reader.read_blocks(path)?;
        let parsed = self.parser.parse(blocks.iter().map(String::as_str));
        let source_paragraphs_total = parsed.len();
        let (paragraphs, metadata) = extract_metadata(parsed);

        Ok(Transcript {
            paragraphs,
            metadata,
            source_paragraphs_total,
        })
    }
}

/// Lowercased file extension, if any
pub(crate) fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}
