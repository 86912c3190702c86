//! Starter `interviews.yaml` written by the `template` command.

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::ConfigError;

/// Ready-to-edit configuration with all optional sections documented
pub const TEMPLATE_YAML: &str = r#"# Glob patterns for transcript files to include/exclude
# Supported transcript formats: .odt, .txt, .md
# 'include' can be a string or a list of strings.
include: ["transcripts/**/*.odt", "transcripts/**/*.txt", "transcripts/**/*.md"]
# 'exclude' is optional and can be a string or a list of strings.
exclude: "private/**"

# Working directory for intermediate files
workdir: ./work

# Final report (.json writes JSON, anything else writes YAML)
outfile: results.json

# Segmentation options (optional; defaults shown)
# segmentation:
#   segment_paragraphs: 12
#   overlap_paragraphs: 3

# Analysis options (optional; defaults shown)
# analysis:
#   # If true, exclude interviewer statements from coding.
#   # To enable this, add a single metadata paragraph to each transcript:
#   #   interviewer = Name1, Name2
#   exclude_interviewer: false
#
#   # Optional: general coding rules applied across all topics.
#   rules:
#     - Statements about how a method will be used in the future are coded under Future intentions, not Implementation approach.
#
#   # Strategy for model calls:
#   #   segment: one call per segment with the full codebook
#   #   topic: one call per segment per topic (more robust, more costly)
#   strategy: segment
#
#   # Parallel requests per segment with the topic strategy
#   max_concurrent_requests: 4
#   request_timeout_seconds: 120
#   retry:
#     max_attempts: 3
#     initial_delay_ms: 1000
#     max_delay_ms: 30000
#     backoff_multiplier: 2.0
#
#   # Scores for orientations missing from a topic's ranking
#   scoring:
#     unknown_score: -100
#     missing_score: -1000000
#     tie_break: first_seen

# Topics (codebook)
#
# Supported formats for each entry in the 'topics' list:
#   1) Simple:  - Topic: [Orientation1, Orientation2]
#   2) No orientations:  - "Topic"
#   3) Expanded:
#        - topic: "Topic"
#          orientations: [ ... ]   # optional; strings or mappings with descriptions
#          description: "..."      # optional (hint for the model)
topics:
  - topic: Perceived lecturer motivations for participation
    # Optional: allow assigning multiple orientations for the same topic
    # to the same statement. Defaults to false.
    allow_multiple_orientations: false
    orientations:
      # When allow_multiple_orientations is false, list orientations from
      # highest rank to lowest rank. If the model returns multiple
      # orientations anyway, the highest-ranked one is kept.
      - label: Clear / plausible
        description: The motivation is stated clearly and seems plausible.
      - label: Mixed / ambiguous
        description: The motivation is mentioned but with ambiguity or mixed signals.
      - label: Unclear or questioned
        description: The motivation is missing, unclear, or explicitly questioned.
    description: >-
      Use this when the speaker explains why lecturers participate or do not participate.

  - Offered participation opportunities

  - topic: Clarity and transparency of participation offers
    orientations:
      - Clear
      - Partially clear
      - Unclear
    description: >-
      Use this when the speaker evaluates how clearly participation was communicated.
"#;

/// Write the template, refusing to overwrite unless `force` is set
pub fn write_template(dest: &Path, force: bool) -> Result<()> {
    if dest.exists() && !force {
        return Err(ConfigError::Usage(format!(
            "Refusing to overwrite existing file: {} (use --force)",
            dest.display()
        ))
        .into());
    }

    if let Some(dir) = dest.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }
    std::fs::write(dest, TEMPLATE_YAML)
        .with_context(|| format!("Failed to write template: {}", dest.display()))?;

    println!("Wrote template config to: {}", dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InterviewConfig;
    use tempfile::TempDir;

    #[test]
    fn test_template_is_a_valid_config() {
        let config = InterviewConfig::from_yaml(
            TEMPLATE_YAML,
            Path::new("/proj/interviews.yaml"),
            Path::new("/proj"),
        )
        .unwrap();

        assert_eq!(config.include.len(), 3);
        assert_eq!(config.topics.len(), 3);
        assert_eq!(config.topics[0].orientations.len(), 3);
        assert!(config.topics[1].orientations.is_empty());
        assert_eq!(config.topics[2].orientations[1].label, "Partially clear");
    }

    #[test]
    fn test_write_template_refuses_overwrite() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("nested/interviews.yaml");

        write_template(&dest, false).unwrap();
        assert!(dest.exists());

        let err = write_template(&dest, false).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());

        write_template(&dest, true).unwrap();
    }
}
