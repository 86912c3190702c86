//! Fingerprint cache decisions for incremental recomputation.
//!
//! Every work file stores a fingerprint record of the inputs that produced
//! it. On the next run the current fingerprint is compared against that
//! record; any difference (including fields added or removed since the
//! record was written, or a record that cannot be read) forces a recompute.
//!
//! Nothing in here touches the filesystem.

use std::path::{Component, Path, PathBuf};

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::policy::ScoringDefaults;
use super::segmentation::SegmentationParams;

/// A single comparison key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FingerprintValue {
    Text(String),
    Integer(i64),
    Flag(bool),
    /// A path as written; compared literally first, then lexically resolved
    Path(String),
}

impl FingerprintValue {
    fn to_json(&self) -> Value {
        match self {
            Self::Text(s) | Self::Path(s) => Value::String(s.clone()),
            Self::Integer(n) => Value::from(*n),
            Self::Flag(b) => Value::Bool(*b),
        }
    }
}

/// An ordered set of named comparison keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fingerprint {
    fields: Vec<(String, FingerprintValue)>,

    /// Directory relative paths are resolved against when comparing paths
    base_dir: Option<PathBuf>,
}

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative path fields against this directory
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    pub fn text(self, name: &str, value: impl Into<String>) -> Self {
        self.field(name, FingerprintValue::Text(value.into()))
    }

    pub fn integer(self, name: &str, value: i64) -> Self {
        self.field(name, FingerprintValue::Integer(value))
    }

    pub fn flag(self, name: &str, value: bool) -> Self {
        self.field(name, FingerprintValue::Flag(value))
    }

    pub fn path(self, name: &str, value: impl Into<String>) -> Self {
        self.field(name, FingerprintValue::Path(value.into()))
    }

    /// Set a field, replacing any earlier value under the same name
    pub fn field(mut self, name: &str, value: FingerprintValue) -> Self {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name.to_string(), value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&FingerprintValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Render as the record stored in work files
    pub fn to_record(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        Value::Object(map)
    }

    fn matches_stored(&self, expected: &FingerprintValue, stored: &Value) -> bool {
        match expected {
            FingerprintValue::Text(s) => stored.as_str() == Some(s.as_str()),
            FingerprintValue::Integer(n) => stored.as_i64() == Some(*n),
            FingerprintValue::Flag(b) => stored.as_bool() == Some(*b),
            FingerprintValue::Path(literal) => {
                let Some(stored) = stored.as_str() else {
                    return false;
                };
                if stored == literal {
                    return true;
                }
                let Some(base) = self.base_dir.as_deref() else {
                    return false;
                };
                match (lexical_resolve(base, literal), lexical_resolve(base, stored)) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
        }
    }
}

/// Decide whether a cached result must be recomputed.
///
/// Returns `false` only when `existing` is an object holding exactly the
/// candidate's fields, each with an equal value of the same type.
pub fn should_recompute(existing: Option<&Value>, candidate: &Fingerprint) -> bool {
    let Some(Value::Object(record)) = existing else {
        return true;
    };

    if record.len() != candidate.fields.len() {
        return true;
    }

    candidate.fields.iter().any(|(name, expected)| match record.get(name) {
        Some(stored) => !candidate.matches_stored(expected, stored),
        None => true,
    })
}

/// Fingerprint of the inputs to segmenting one transcript
pub fn segmentation_fingerprint(
    source_path: &str,
    source_digest: &str,
    parsing_version: u32,
    params: &SegmentationParams,
) -> Fingerprint {
    Fingerprint::new()
        .text("source_path", source_path)
        .text("source_digest", source_digest)
        .integer("transcript_parsing_version", i64::from(parsing_version))
        .integer("segment_paragraphs", params.window() as i64)
        .integer("overlap_paragraphs", params.overlap() as i64)
}

/// Inputs that determine an analysis result
#[derive(Debug, Clone)]
pub struct AnalysisInputs<'a> {
    /// Segments work file as referenced from the segments index
    pub segments_file: &'a str,
    pub segments_digest: &'a str,
    pub codebook_hash: &'a str,
    pub strategy: &'a str,
    pub exclude_interviewer: bool,
    pub rules_digest: &'a str,

    /// Consolidation scores decide which candidate survives
    pub scoring: ScoringDefaults,
}

/// Fingerprint of the inputs to coding one document
pub fn analysis_fingerprint(base_dir: &Path, inputs: &AnalysisInputs<'_>) -> Fingerprint {
    Fingerprint::new()
        .with_base_dir(base_dir)
        .path("segments_file", inputs.segments_file)
        .text("segments_digest", inputs.segments_digest)
        .text("codebook_hash", inputs.codebook_hash)
        .text("strategy", inputs.strategy)
        .flag("exclude_interviewer", inputs.exclude_interviewer)
        .text("rules_digest", inputs.rules_digest)
        .integer("unknown_score", inputs.scoring.unknown_score)
        .integer("missing_score", inputs.scoring.missing_score)
        .text("tie_break", inputs.scoring.tie_break.to_string())
}

/// `sha256:{hex}` digest of raw bytes
pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// Digest of an ordered list of strings (e.g. coding rules)
pub fn digest_lines(lines: &[String]) -> String {
    content_digest(lines.join("\n").as_bytes())
}

/// Resolve `raw` against `base` without touching the filesystem.
///
/// `.` components are dropped and `..` pops the previous component. Returns
/// `None` for empty input or when `..` would climb above the root.
pub fn lexical_resolve(base: &Path, raw: &str) -> Option<PathBuf> {
    if raw.trim().is_empty() {
        return None;
    }

    let path = Path::new(raw);
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                out.push(component.as_os_str())
            }
            Component::CurDir => {}
            Component::ParentDir => {
                let poppable = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if !poppable {
                    return None;
                }
                out.pop();
            }
        }
    }

    Some(out)
}
