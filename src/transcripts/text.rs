//! Plain text and Markdown transcripts.
//!
//! Statements are separated by at least one blank line.

use std::path::Path;

use super::{extension, ParserError, TranscriptReader};

/// Reader for `.txt` and `.md` files
pub struct TextReader;

impl TextReader {
    /// Split text into blank-line separated blocks
    pub fn split_blocks(raw: &str) -> Vec<String> {
        let text = raw.replace("\r\n", "\n").replace('\r', "\n");

        let mut blocks = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for line in text.split('\n') {
            if line.trim().is_empty() {
                if !current.is_empty() {
                    blocks.push(current.join("\n").trim().to_string());
                    current.clear();
                }
                continue;
            }
            current.push(line);
        }
        if !current.is_empty() {
            blocks.push(current.join("\n").trim().to_string());
        }

        blocks
    }
}

impl TranscriptReader for TextReader {
    fn name(&self) -> &str {
        "text"
    }

    fn can_read(&self, path: &Path) -> bool {
        matches!(extension(path).as_deref(), Some("txt") | Some("md"))
    }

    fn read_blocks(&self, path: &Path) -> Result<Vec<String>, ParserError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ParserError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::split_blocks(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_blocks_normalizes_line_endings() {
        let blocks = TextReader::split_blocks("A: one\r\ntwo\r\n\r\n\r\nB: three\n   \nC: four");
        assert_eq!(blocks, vec!["A: one\ntwo", "B: three", "C: four"]);
    }

    #[test]
    fn test_split_blocks_empty() {
        assert!(TextReader::split_blocks("\n\n  \n").is_empty());
    }
}
