//! Turns raw text blocks into statement paragraphs.
//!
//! - `Label: text` starts a new statement (Markdown quote, bullet and
//!   numbered-list prefixes are tolerated in front of the label)
//! - `key = value` becomes a metadata record with `source_index = 0`
//! - Unlabeled blocks continue the previous statement
//! - Unlabeled blocks before the first statement are dropped (tool headers)

use regex::Regex;

use crate::domain::Paragraph;

const MARKDOWN_PREFIX: &str = r"^\s*(?:>\s*)*(?:[-+*]\s+|\d+[.)]\s+)?";

/// Compiled statement patterns
#[derive(Debug, Clone)]
pub struct StatementParser {
    label: Regex,
    metadata: Regex,
}

impl StatementParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            label: Regex::new(&format!(r"{}(?P<label>[^:\n]{{1,80}}):\s*\S", MARKDOWN_PREFIX))?,
            metadata: Regex::new(&format!(
                r"(?i){}(?P<key>[A-Za-z][A-Za-z0-9_\-]{{0,63}})\s*=\s*(?P<value>.*?)\s*$",
                MARKDOWN_PREFIX
            ))?,
        })
    }

    /// Parse blocks into statements (1-based) and metadata records (index 0)
    pub fn parse<'a>(&self, blocks: impl IntoIterator<Item = &'a str>) -> Vec<Paragraph> {
        let mut out: Vec<Paragraph> = Vec::new();
        let mut statement_index = 0u32;
        // Position in `out` of the most recent statement
        let mut last_statement: Option<usize> = None;

        for block in blocks {
            let cleaned = collapse_whitespace(block);
            if cleaned.is_empty() {
                continue;
            }

            if let Some(caps) = self.metadata.captures(&cleaned) {
                let key = caps.name("key").map_or("", |m| m.as_str()).trim().to_lowercase();
                let value = caps.name("value").map_or("", |m| m.as_str()).trim();
                out.push(Paragraph::new(0, format!("{} = {}", key, value)));
                continue;
            }

            if self.label.is_match(&cleaned) {
                statement_index += 1;
                last_statement = Some(out.len());
                out.push(Paragraph::new(statement_index, cleaned));
                continue;
            }

            if let Some(idx) = last_statement {
                let text = &mut out[idx].text;
                text.push(' ');
                text.push_str(&cleaned);
            }
        }

        out
    }
}

/// Collapse all whitespace runs (including newlines) to single spaces
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(blocks: &[&str]) -> Vec<Paragraph> {
        StatementParser::new().unwrap().parse(blocks.iter().copied())
    }

    #[test]
    fn test_labels_and_continuations() {
        let out = parse(&["Header line", "I: Hello", "there", "B: Hi\n  again"]);
        assert_eq!(
            out,
            vec![Paragraph::new(1, "I: Hello there"), Paragraph::new(2, "B: Hi again")]
        );
    }

    #[test]
    fn test_markdown_prefixes() {
        let out = parse(&["> **I**: quoted", "- B: bullet", "3. C: numbered"]);
        assert_eq!(out.len(), 3);
        assert_eq!(out[2].source_index, 3);
    }

    #[test]
    fn test_metadata_record() {
        let out = parse(&["I: Hello", "Interviewer =  Anna, Ben ", "follow-up"]);
        assert_eq!(out[1], Paragraph::new(0, "interviewer = Anna, Ben"));
        // Continuation skips the metadata record
        assert_eq!(out[0].text, "I: Hello follow-up");
    }

    #[test]
    fn test_label_requires_text_after_colon() {
        let out = parse(&["Topic:", "A: answer"]);
        assert_eq!(out, vec![Paragraph::new(1, "A: answer")]);
    }
}
