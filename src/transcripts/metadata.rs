//! Document metadata carried in `key = value` records.
//!
//! `interviewer = Anna, Ben` declares interviewer speaker labels; any other
//! key is kept as a free-form field. Metadata records are removed from the
//! statement list so they never shift paragraph ids.

use regex::Regex;

use crate::domain::{DocumentMetadata, MetadataValue, Paragraph};

const INTERVIEWER_KEY: &str = "interviewer";

/// Split parsed paragraphs into statements and metadata
pub fn extract_metadata(paragraphs: Vec<Paragraph>) -> (Vec<Paragraph>, DocumentMetadata) {
    let mut metadata = DocumentMetadata::default();
    let mut statements = Vec::with_capacity(paragraphs.len());

    for paragraph in paragraphs {
        if !paragraph.is_metadata() {
            statements.push(paragraph);
            continue;
        }

        metadata.metadata_paragraphs_removed += 1;

        let Some((key, value)) = paragraph.text.split_once('=') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        if key == INTERVIEWER_KEY {
            for part in value.split(',') {
                let label = normalize_label(part);
                let folded = label.to_lowercase();
                if !label.is_empty()
                    && !metadata
                        .interviewers
                        .iter()
                        .any(|existing| existing.to_lowercase() == folded)
                {
                    metadata.interviewers.push(label);
                }
            }
            continue;
        }

        if value.is_empty() {
            continue;
        }

        match metadata.fields.get_mut(&key) {
            Some(existing) => existing.merge(value.to_string()),
            None => {
                metadata
                    .fields
                    .insert(key, MetadataValue::Single(value.to_string()));
            }
        }
    }

    (statements, metadata)
}

/// Collapse whitespace and strip trailing label punctuation (`Anna:` -> `Anna`)
fn normalize_label(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches([' ', ':', '\t', '-', '–', '—'])
        .trim()
        .to_string()
}

/// Recognizes statements spoken by one of the interviewers
#[derive(Debug, Clone)]
pub struct InterviewerMatcher {
    patterns: Vec<Regex>,
}

impl InterviewerMatcher {
    /// Case-insensitive `Label:` / `Label -` / `Label –` prefixes
    pub fn new(labels: &[String]) -> Result<Self, regex::Error> {
        let patterns = labels
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(|l| Regex::new(&format!(r"(?i)^{}\s*[:\-–]\s+", regex::escape(l))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn is_interviewer(&self, text: &str) -> bool {
        let text = text.trim();
        self.patterns.iter().any(|p| p.is_match(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interviewers_are_deduplicated() {
        let input = vec![
            Paragraph::new(0, "interviewer = Anna:, BEN ,  ben"),
            Paragraph::new(1, "Anna: Hello"),
            Paragraph::new(0, "interviewer = anna"),
        ];
        let (statements, meta) = extract_metadata(input);

        assert_eq!(statements, vec![Paragraph::new(1, "Anna: Hello")]);
        assert_eq!(meta.interviewers, vec!["Anna".to_string(), "BEN".to_string()]);
        assert_eq!(meta.metadata_paragraphs_removed, 2);
    }

    #[test]
    fn test_other_fields_collect_values() {
        let input = vec![
            Paragraph::new(0, "date = 2024-03-01"),
            Paragraph::new(0, "site = Berlin"),
            Paragraph::new(0, "site = Hamburg"),
            Paragraph::new(0, "site = Berlin"),
            Paragraph::new(0, "empty = "),
        ];
        let (_, meta) = extract_metadata(input);

        assert_eq!(
            meta.fields.get("date"),
            Some(&MetadataValue::Single("2024-03-01".to_string()))
        );
        assert_eq!(
            meta.fields.get("site"),
            Some(&MetadataValue::Multiple(vec!["Berlin".to_string(), "Hamburg".to_string()]))
        );
        assert!(!meta.fields.contains_key("empty"));
        assert_eq!(meta.metadata_paragraphs_removed, 5);
    }

    #[test]
    fn test_interviewer_matcher() {
        let matcher = InterviewerMatcher::new(&["Dr. Smith".to_string(), "I".to_string()]).unwrap();

        assert!(matcher.is_interviewer("dr. smith: So tell me"));
        assert!(matcher.is_interviewer("  I - next question"));
        assert!(matcher.is_interviewer("I – next question"));
        assert!(!matcher.is_interviewer("Interviewee: answer"));
        assert!(!matcher.is_interviewer("Dr. Smithers: hi"));
    }

    #[test]
    fn test_empty_matcher() {
        let matcher = InterviewerMatcher::new(&[]).unwrap();
        assert!(matcher.is_empty());
        assert!(!matcher.is_interviewer("I: hello"));
    }
}
