//! Work directory layout and file helpers.
//!
//! ```text
//! <workdir>/
//!   .lock                   held while a stage runs
//!   segments/index.yaml     segmentation index
//!   segments/<doc_id>.yaml  one segments work file per transcript
//!   analysis/index.yaml     analysis index
//!   analysis/<doc_id>.yaml  one analysis work file per transcript
//! ```

pub mod analysis_file;
pub mod segments_file;

use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use glob::{MatchOptions, Pattern};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::core::fingerprint::content_digest;

pub use analysis_file::{
    AnalysisFile, AnalysisIndex, AnalysisIndexEntry, AnalysisInput, AnalysisSettingsRecord,
    AnalyzedParagraph, AnalyzedSegment, ExclusionReason,
};
pub use segments_file::{
    DocumentStatus, SegmentationInfo, SegmentsFile, SegmentsIndex, SegmentsIndexEntry, SourceInfo,
};

/// Version of the work file layout
pub const SCHEMA_VERSION: u32 = 1;

/// Paths inside the work directory
#[derive(Debug, Clone)]
pub struct Workdir {
    root: PathBuf,
}

impl Workdir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn segments_dir(&self) -> PathBuf {
        self.root.join("segments")
    }

    pub fn analysis_dir(&self) -> PathBuf {
        self.root.join("analysis")
    }

    pub fn segments_file(&self, document_id: &str) -> PathBuf {
        self.segments_dir().join(format!("{}.yaml", document_id))
    }

    pub fn analysis_file(&self, document_id: &str) -> PathBuf {
        self.analysis_dir().join(format!("{}.yaml", document_id))
    }

    pub fn segments_index(&self) -> PathBuf {
        self.segments_dir().join("index.yaml")
    }

    pub fn analysis_index(&self) -> PathBuf {
        self.analysis_dir().join("index.yaml")
    }

    /// Create the directory tree
    pub fn ensure(&self) -> Result<()> {
        for dir in [self.segments_dir(), self.analysis_dir()] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }

    /// Take the exclusive work directory lock (released on drop)
    pub fn lock(&self) -> Result<WorkdirLock> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create workdir: {}", self.root.display()))?;

        let path = self.root.join(".lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))?;

        file.try_lock_exclusive().with_context(|| {
            format!(
                "Workdir {} is in use by another process",
                self.root.display()
            )
        })?;

        debug!(path = %path.display(), "Acquired workdir lock");
        Ok(WorkdirLock { _file: file })
    }
}

/// Guard for the work directory lock
pub struct WorkdirLock {
    _file: File,
}

/// Expand include patterns relative to `base_dir` and drop excluded files.
///
/// Exclude patterns are matched against the path relative to `base_dir`
/// (`*` also matches `/`). The result is sorted and deduplicated.
pub fn discover_inputs(base_dir: &Path, include: &[String], exclude: &[String]) -> Result<Vec<PathBuf>> {
    let exclude_patterns = exclude
        .iter()
        .map(|p| {
            Pattern::new(&normalize_glob_pattern(p))
                .with_context(|| format!("Invalid exclude pattern: {}", p))
        })
        .collect::<Result<Vec<_>>>()?;

    let match_options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    let mut found = BTreeSet::new();

    for raw in include {
        let normalized = normalize_glob_pattern(raw);
        let full = if Path::new(&normalized).is_absolute() {
            normalized
        } else {
            format!(
                "{}/{}",
                Pattern::escape(&base_dir.to_string_lossy()),
                normalized
            )
        };

        let entries = glob::glob(&full).with_context(|| format!("Invalid include pattern: {}", raw))?;

        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable path");
                    continue;
                }
            };

            if !path.is_file() {
                continue;
            }

            let rel = rel_posix(base_dir, &path);
            if exclude_patterns
                .iter()
                .any(|p| p.matches_with(&rel, match_options))
            {
                debug!(path = %rel, "Excluded");
                continue;
            }

            found.insert(path.canonicalize().unwrap_or(path));
        }
    }

    Ok(found.into_iter().collect())
}

/// Accept the shorthand `**.ext` for `**/*.ext` and `**` for `**/*`
pub fn normalize_glob_pattern(pattern: &str) -> String {
    let p = pattern.trim();
    if let Some(ext) = p.strip_prefix("**.") {
        if !p.contains('/') {
            return format!("**/*.{}", ext);
        }
    }
    if p == "**" || p == "**/" {
        return "**/*".to_string();
    }
    p.to_string()
}

/// Path relative to `base_dir` with `/` separators; absolute when outside it
pub fn rel_posix(base_dir: &Path, path: &Path) -> String {
    let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let base = base_dir
        .canonicalize()
        .unwrap_or_else(|_| base_dir.to_path_buf());

    match resolved.strip_prefix(&base) {
        Ok(rel) => rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => resolved.to_string_lossy().replace('\\', "/"),
    }
}

/// Stable, filesystem-friendly document id: `{stem}-{hash(rel path)[..10]}`
pub fn document_id(base_dir: &Path, path: &Path) -> String {
    let rel = rel_posix(base_dir, path);
    let mut hasher = Sha256::new();
    hasher.update(rel.as_bytes());
    let digest = hex::encode(hasher.finalize());

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let safe: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let safe = safe.trim_matches('_');
    let safe = if safe.is_empty() { "document" } else { safe };

    format!("{}-{}", safe, &digest[..10])
}

/// `sha256:` digest of a file's bytes
pub fn file_digest(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(content_digest(&bytes))
}

/// Read and deserialize a YAML file
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse YAML: {}", path.display()))
}

/// Read a YAML file as an untyped value; `None` when missing or unreadable
pub fn read_value(path: &Path) -> Option<serde_json::Value> {
    if !path.exists() {
        return None;
    }
    match read_yaml(path) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable work file");
            None
        }
    }
}

/// Serialize to YAML and atomically replace `path`
pub fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path
        .parent()
        .with_context(|| format!("No parent directory: {}", path.display()))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let content = serde_yaml::to_string(value)
        .with_context(|| format!("Failed to serialize: {}", path.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write: {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("Failed to replace: {}", path.display()))?;

    Ok(())
}
