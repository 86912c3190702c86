//! Configuration loaded from `interviews.yaml`.
//!
//! Config file discovery:
//! - `--config PATH` when given
//! - Otherwise `interviews.yaml` in the current directory
//!
//! Relative paths (`workdir`, `outfile`, include/exclude patterns) are
//! resolved against the config file's parent directory.
//!
//! Topics accept three YAML shapes:
//! - Plain name: `- Offered participation opportunities`
//! - Legacy mapping: `- Clarity: [Clear, Unclear]`
//! - Expanded: `- topic: Clarity` with `orientations`, `description`
//!   (or `hint`) and `allow_multiple_orientations`

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapters::RetryPolicy;
use crate::core::policy::ScoringDefaults;
use crate::core::segmentation::{SegmentationError, SegmentationParams};
use crate::domain::{Orientation, TopicSpec};

/// Default config file name
pub const DEFAULT_CONFIG_FILE: &str = "interviews.yaml";

/// Configuration errors (reported with exit code 2)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid configuration: {0}")]
    Segmentation(#[from] SegmentationError),

    /// A command refused to run as requested (e.g. overwrite without `--force`)
    #[error("{0}")]
    Usage(String),
}

/// How model calls are organized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One call per segment with the full codebook
    #[default]
    Segment,
    /// One call per segment per topic
    Topic,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Segment => write!(f, "segment"),
            Self::Topic => write!(f, "topic"),
        }
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "segment" => Ok(Self::Segment),
            "topic" => Ok(Self::Topic),
            other => Err(ConfigError::Invalid(format!(
                "analysis.strategy must be 'segment' or 'topic' (got '{}')",
                other
            ))),
        }
    }
}

/// A string or a list of strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    fn into_vec(self) -> Vec<String> {
        let items = match self {
            Self::One(s) => vec![s],
            Self::Many(v) => v,
        };
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    include: Option<StringOrList>,
    exclude: Option<StringOrList>,
    workdir: Option<String>,
    outfile: Option<String>,
    topics: Option<Vec<RawTopic>>,
    #[serde(default)]
    segmentation: RawSegmentation,
    #[serde(default)]
    analysis: RawAnalysis,
}

#[derive(Debug, Clone, Deserialize)]
struct RawSegmentation {
    #[serde(default = "default_segment_paragraphs")]
    segment_paragraphs: i64,
    #[serde(default = "default_overlap_paragraphs")]
    overlap_paragraphs: i64,
}

fn default_segment_paragraphs() -> i64 {
    SegmentationParams::DEFAULT_WINDOW
}
fn default_overlap_paragraphs() -> i64 {
    SegmentationParams::DEFAULT_OVERLAP
}

impl Default for RawSegmentation {
    fn default() -> Self {
        Self {
            segment_paragraphs: default_segment_paragraphs(),
            overlap_paragraphs: default_overlap_paragraphs(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    exclude_interviewer: bool,
    strategy: Option<String>,
    #[serde(default)]
    rules: Option<StringOrList>,
    max_concurrent_requests: Option<usize>,
    request_timeout_seconds: Option<u64>,
    #[serde(default)]
    retry: Option<RetryPolicy>,
    #[serde(default)]
    scoring: Option<ScoringDefaults>,
}

/// Supported topic formats
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawTopic {
    Name(String),
    Expanded(RawExpandedTopic),
    Legacy(BTreeMap<String, Option<Vec<RawOrientation>>>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawExpandedTopic {
    topic: String,
    #[serde(default)]
    orientations: Option<Vec<RawOrientation>>,
    description: Option<String>,
    hint: Option<String>,
    #[serde(default)]
    allow_multiple_orientations: bool,
}

/// Supported orientation formats
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawOrientation {
    Label(String),
    Detailed(RawOrientationDetail),
    Named(BTreeMap<String, Option<String>>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOrientationDetail {
    label: Option<String>,
    orientation: Option<String>,
    description: Option<String>,
    hint: Option<String>,
}

/// Coding settings
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    /// Interviewer statements are not coded
    pub exclude_interviewer: bool,

    pub strategy: Strategy,

    /// Extra instructions appended to the system prompt
    pub rules: Vec<String>,

    /// Parallel topic requests per segment (topic strategy)
    pub max_concurrent_requests: usize,

    /// Timeout for a single model request
    pub request_timeout_seconds: u64,

    pub retry: RetryPolicy,

    pub scoring: ScoringDefaults,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            exclude_interviewer: false,
            strategy: Strategy::default(),
            rules: Vec::new(),
            max_concurrent_requests: 4,
            request_timeout_seconds: 120,
            retry: RetryPolicy::default(),
            scoring: ScoringDefaults::default(),
        }
    }
}

/// Validated configuration with absolute paths
#[derive(Debug, Clone)]
pub struct InterviewConfig {
    /// Path of the loaded file
    pub config_path: PathBuf,

    /// Directory relative paths are resolved against
    pub base_dir: PathBuf,

    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub workdir: PathBuf,
    pub outfile: PathBuf,
    pub topics: Vec<TopicSpec>,
    pub segmentation: SegmentationParams,
    pub analysis: AnalysisSettings,
}

impl InterviewConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config_path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let base_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Self::from_yaml(&content, &config_path, &base_dir)
    }

    /// Parse and validate YAML content
    pub fn from_yaml(content: &str, config_path: &Path, base_dir: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            path: config_path.to_path_buf(),
            message: e.to_string(),
        })?;

        let include = raw.include.map(StringOrList::into_vec).unwrap_or_default();
        if include.is_empty() {
            return Err(ConfigError::Invalid("'include' must list at least one pattern".to_string()));
        }
        let exclude = raw.exclude.map(StringOrList::into_vec).unwrap_or_default();

        let workdir = required_path(raw.workdir, "workdir", base_dir)?;
        let outfile = required_path(raw.outfile, "outfile", base_dir)?;

        let raw_topics = raw.topics.unwrap_or_default();
        if raw_topics.is_empty() {
            return Err(ConfigError::Invalid("'topics' must list at least one topic".to_string()));
        }
        let topics = raw_topics
            .into_iter()
            .enumerate()
            .map(|(idx, t)| parse_topic(idx + 1, t))
            .collect::<Result<Vec<_>, _>>()?;

        let segmentation = SegmentationParams::new(
            raw.segmentation.segment_paragraphs,
            raw.segmentation.overlap_paragraphs,
        )?;

        let analysis = parse_analysis(raw.analysis)?;

        Ok(Self {
            config_path: config_path.to_path_buf(),
            base_dir: base_dir.to_path_buf(),
            include,
            exclude,
            workdir,
            outfile,
            topics,
            segmentation,
            analysis,
        })
    }
}

/// Config path from the CLI flag or the default in the current directory
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(DEFAULT_CONFIG_FILE),
    }
}

/// Resolve a path that may be relative to the config file's parent
pub fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn required_path(value: Option<String>, key: &str, base_dir: &Path) -> Result<PathBuf, ConfigError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(resolve_path(base_dir, v)),
        _ => Err(ConfigError::Invalid(format!("'{}' is required", key))),
    }
}

fn parse_topic(position: usize, raw: RawTopic) -> Result<TopicSpec, ConfigError> {
    let blank_name = || ConfigError::Invalid(format!("topics[{}]: topic name must not be empty", position));

    let (name, orientations, description, allow_multiple) = match raw {
        RawTopic::Name(name) => (name, Vec::new(), None, false),
        RawTopic::Expanded(t) => (
            t.topic,
            t.orientations.unwrap_or_default(),
            t.description.or(t.hint),
            t.allow_multiple_orientations,
        ),
        RawTopic::Legacy(map) => {
            if map.len() != 1 {
                return Err(ConfigError::Invalid(format!(
                    "topics[{}]: expected a single 'Topic: [orientations]' entry or a mapping with 'topic'",
                    position
                )));
            }
            let Some((name, orientations)) = map.into_iter().next() else {
                return Err(blank_name());
            };
            (name, orientations.unwrap_or_default(), None, false)
        }
    };

    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(blank_name());
    }

    let orientations = orientations
        .into_iter()
        .map(|o| parse_orientation(position, &name, o))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TopicSpec {
        name,
        orientations,
        description: description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
        allow_multiple_orientations: allow_multiple,
    })
}

fn parse_orientation(position: usize, topic: &str, raw: RawOrientation) -> Result<Orientation, ConfigError> {
    let (label, description) = match raw {
        RawOrientation::Label(label) => (label, None),
        RawOrientation::Detailed(d) => (
            d.label.or(d.orientation).unwrap_or_default(),
            d.description.or(d.hint),
        ),
        RawOrientation::Named(map) => {
            if map.len() != 1 {
                return Err(ConfigError::Invalid(format!(
                    "topics[{}] ({}): orientation mapping must have exactly one entry",
                    position, topic
                )));
            }
            map.into_iter().next().unwrap_or_default()
        }
    };

    let label = label.trim().to_string();
    if label.is_empty() {
        return Err(ConfigError::Invalid(format!(
            "topics[{}] ({}): orientation label must not be empty",
            position, topic
        )));
    }

    Ok(Orientation {
        label,
        description: description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
    })
}

fn parse_analysis(raw: RawAnalysis) -> Result<AnalysisSettings, ConfigError> {
    let defaults = AnalysisSettings::default();

    let strategy = match raw.strategy {
        Some(s) => s.parse()?,
        None => defaults.strategy,
    };

    let max_concurrent_requests = raw
        .max_concurrent_requests
        .unwrap_or(defaults.max_concurrent_requests);
    if max_concurrent_requests == 0 {
        return Err(ConfigError::Invalid(
            "analysis.max_concurrent_requests must be > 0".to_string(),
        ));
    }

    let retry = raw.retry.unwrap_or(defaults.retry);
    if retry.max_attempts == 0 {
        return Err(ConfigError::Invalid(
            "analysis.retry.max_attempts must be > 0".to_string(),
        ));
    }

    Ok(AnalysisSettings {
        exclude_interviewer: raw.exclude_interviewer,
        strategy,
        rules: raw.rules.map(StringOrList::into_vec).unwrap_or_default(),
        max_concurrent_requests,
        request_timeout_seconds: raw
            .request_timeout_seconds
            .unwrap_or(defaults.request_timeout_seconds),
        retry,
        scoring: raw.scoring.unwrap_or(defaults.scoring),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn parse(yaml: &str) -> Result<InterviewConfig, ConfigError> {
        InterviewConfig::from_yaml(yaml, Path::new("/proj/interviews.yaml"), Path::new("/proj"))
    }

    const MINIMAL: &str = r#"
include: "**.txt"
workdir: ./work
outfile: results.json
topics:
  - Offers
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = parse(MINIMAL).unwrap();

        assert_eq!(config.include, vec!["**.txt".to_string()]);
        assert!(config.exclude.is_empty());
        assert_eq!(config.workdir, PathBuf::from("/proj/./work"));
        assert_eq!(config.outfile, PathBuf::from("/proj/results.json"));
        assert_eq!(config.segmentation.window(), 12);
        assert_eq!(config.segmentation.overlap(), 3);
        assert_eq!(config.analysis.strategy, Strategy::Segment);
        assert!(!config.analysis.exclude_interviewer);
        assert_eq!(config.topics, vec![TopicSpec::new("Offers")]);
    }

    #[test]
    fn test_all_topic_formats() {
        let yaml = r#"
include: ["a/*.odt", "b/*.md"]
exclude: private/**
workdir: /abs/work
outfile: out.yaml
topics:
  - Plain topic
  - Legacy: [Yes, "No"]
  - topic: Expanded
    hint: Use when unsure
    allow_multiple_orientations: true
    orientations:
      - label: Clear
        description: Stated clearly
      - orientation: Mixed
        hint: Some doubt
      - Unclear: Not stated
      - Plain
"#;
        let config = parse(yaml).unwrap();

        assert_eq!(config.include.len(), 2);
        assert_eq!(config.exclude, vec!["private/**".to_string()]);
        assert_eq!(config.workdir, PathBuf::from("/abs/work"));
        assert_eq!(config.topics.len(), 3);

        assert_eq!(config.topics[0].name, "Plain topic");
        assert!(config.topics[0].orientations.is_empty());

        let legacy = &config.topics[1];
        assert_eq!(legacy.name, "Legacy");
        assert_eq!(legacy.orientations.len(), 2);
        assert_eq!(legacy.orientations[1].label, "No");

        let expanded = &config.topics[2];
        assert!(expanded.allow_multiple_orientations);
        assert_eq!(expanded.description.as_deref(), Some("Use when unsure"));
        let labels: Vec<&str> = expanded.orientations.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["Clear", "Mixed", "Unclear", "Plain"]);
        assert_eq!(expanded.orientations[1].description.as_deref(), Some("Some doubt"));
        assert_eq!(expanded.orientations[2].description.as_deref(), Some("Not stated"));
    }

    #[test]
    fn test_segmentation_validation() {
        let base = MINIMAL.to_string();

        let err = parse(&format!("{}segmentation:\n  segment_paragraphs: 0\n", base)).unwrap_err();
        assert!(err.to_string().contains("segment_paragraphs must be > 0"));

        let err = parse(&format!("{}segmentation:\n  overlap_paragraphs: -1\n", base)).unwrap_err();
        assert!(err.to_string().contains("overlap_paragraphs must be >= 0"));

        let err = parse(&format!(
            "{}segmentation:\n  segment_paragraphs: 4\n  overlap_paragraphs: 4\n",
            base
        ))
        .unwrap_err();
        assert!(err.to_string().contains("must be < segmentation.segment_paragraphs"));
    }

    #[test]
    fn test_missing_required_keys() {
        assert!(parse("include: x\noutfile: o\ntopics: [A]\n")
            .unwrap_err()
            .to_string()
            .contains("'workdir' is required"));
        assert!(parse("include: x\nworkdir: w\noutfile: o\ntopics: []\n").is_err());
        assert!(parse("include: []\nworkdir: w\noutfile: o\ntopics: [A]\n").is_err());
    }

    #[test]
    fn test_analysis_settings() {
        let yaml = format!(
            "{}analysis:\n  exclude_interviewer: true\n  strategy: topic\n  rules: Code future plans separately\n  retry:\n    max_attempts: 5\n  scoring:\n    tie_break: last_seen\n",
            MINIMAL
        );
        let config = parse(&yaml).unwrap();
        assert!(config.analysis.exclude_interviewer);
        assert_eq!(config.analysis.strategy, Strategy::Topic);
        assert_eq!(config.analysis.rules, vec!["Code future plans separately".to_string()]);
        assert_eq!(config.analysis.retry.max_attempts, 5);
        assert_eq!(config.analysis.retry.initial_delay_ms, 1000);
        assert_eq!(
            config.analysis.scoring.tie_break,
            crate::core::policy::TieBreak::LastSeen
        );
        assert_eq!(config.analysis.scoring.unknown_score, -100);

        let bad = format!("{}analysis:\n  strategy: paragraph\n", MINIMAL);
        assert!(parse(&bad).is_err());
    }

    #[test]
    fn test_blank_orientation_label_rejected() {
        let yaml = "include: x\nworkdir: w\noutfile: o\ntopics:\n  - T: ['  ']\n";
        assert!(parse(yaml).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_CONFIG_FILE);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{}", MINIMAL).unwrap();

        let config = InterviewConfig::load(&path).unwrap();
        assert_eq!(config.base_dir, temp.path().canonicalize().unwrap());

        let missing = InterviewConfig::load(&temp.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(missing, ConfigError::NotFound(_)));
    }
}
