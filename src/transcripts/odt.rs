//! OpenDocument text (`.odt`) transcripts.
//!
//! An ODT file is a ZIP archive; the body lives in `content.xml`. Every
//! `text:p` / `text:h` element becomes one raw block. Spans inside a
//! paragraph are flattened and `text:s`, `text:tab` and `text:line-break`
//! are rendered as a space.

use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;

use super::{extension, ParserError, TranscriptReader};

const CONTENT_ENTRY: &str = "content.xml";

/// Reader for `.odt` files
pub struct OdtReader {
    /// Upper bound for the uncompressed `content.xml`
    max_content_bytes: u64,
}

impl Default for OdtReader {
    fn default() -> Self {
        Self {
            max_content_bytes: 64 * 1024 * 1024,
        }
    }
}

impl OdtReader {
    /// Extract paragraph blocks from an in-memory ODT archive
    pub fn blocks_from_bytes(&self, path: &Path, bytes: &[u8]) -> Result<Vec<String>, ParserError> {
        let archive_err = |message: String| ParserError::Archive {
            path: path.to_path_buf(),
            message,
        };

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
            .map_err(|e| archive_err(e.to_string()))?;
        let entry = archive
            .by_name(CONTENT_ENTRY)
            .map_err(|e| archive_err(format!("{}: {}", CONTENT_ENTRY, e)))?;

        let mut xml = Vec::new();
        entry
            .take(self.max_content_bytes)
            .read_to_end(&mut xml)
            .map_err(|e| archive_err(e.to_string()))?;
        if xml.len() as u64 >= self.max_content_bytes {
            return Err(archive_err(format!(
                "{} exceeds size limit ({} bytes)",
                CONTENT_ENTRY, self.max_content_bytes
            )));
        }

        paragraphs_from_xml(&xml).map_err(|message| ParserError::Xml {
            path: path.to_path_buf(),
            message,
        })
    }
}

impl TranscriptReader for OdtReader {
    fn name(&self) -> &str {
        "odt"
    }

    fn can_read(&self, path: &Path) -> bool {
        extension(path).as_deref() == Some("odt")
    }

    fn read_blocks(&self, path: &Path) -> Result<Vec<String>, ParserError> {
        let bytes = std::fs::read(path).map_err(|source| ParserError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.blocks_from_bytes(path, &bytes)
    }
}

fn is_paragraph(local_name: &[u8]) -> bool {
    matches!(local_name, b"p" | b"h")
}

/// Collect the text of every top-level paragraph element
fn paragraphs_from_xml(xml: &[u8]) -> Result<Vec<String>, String> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut blocks = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if is_paragraph(e.local_name().as_ref()) {
                    depth += 1;
                }
            }
            Ok(Event::End(e)) => {
                if is_paragraph(e.local_name().as_ref()) && depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        blocks.push(std::mem::take(&mut current));
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if depth > 0 && matches!(e.local_name().as_ref(), b"s" | b"tab" | b"line-break") {
                    current.push(' ');
                }
            }
            Ok(Event::Text(t)) => {
                if depth > 0 {
                    let text = t.unescape().map_err(|e| e.to_string())?;
                    current.push_str(&text);
                }
            }
            Ok(Event::CData(t)) => {
                if depth > 0 {
                    current.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }

    Ok(blocks)
}
