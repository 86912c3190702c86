//! Evidence report built from the analysis work files.
//!
//! The report has a summary table (one row per topic and orientation with a
//! count and the first example quote) and one evidence sheet per transcript,
//! sorted by paragraph. It is written as JSON for `.json` outfiles and as
//! YAML otherwise.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::resolve_path;
use crate::workdir::{read_yaml, write_yaml, AnalysisFile, AnalysisIndex, DocumentStatus, Workdir};

/// Spreadsheet sheet names are limited to this many characters
pub const MAX_SHEET_NAME: usize = 31;

const SUMMARY_SHEET: &str = "Summary";

/// Topic and orientation totals across all transcripts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub topic: String,
    pub orientation: String,
    pub count: usize,

    /// First quote seen for this pair
    pub example_quote: String,
}

/// One piece of evidence in a transcript sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRow {
    pub topic: String,
    pub orientation: String,

    /// `{segment id} / {paragraph id}`
    pub where_found: String,
    pub evidence: String,
    pub paragraph_index: u32,
}

/// Evidence track record for one transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSheet {
    pub sheet_name: String,
    pub document_id: String,
    pub source_path: String,
    pub rows: Vec<EvidenceRow>,
}

/// The full report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceReport {
    pub generated_at: DateTime<Utc>,
    pub summary: Vec<SummaryRow>,
    pub documents: Vec<DocumentSheet>,
}

/// Output encoding, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Yaml,
}

impl ReportFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

impl EvidenceReport {
    /// Load every successfully analyzed document listed in `analysis/index.yaml`.
    ///
    /// Missing or unreadable analysis files are skipped with a warning.
    pub fn from_workdir(base_dir: &Path, workdir: &Workdir) -> Result<Self> {
        let index_path = workdir.analysis_index();
        if !index_path.exists() {
            anyhow::bail!(
                "No analysis index found. Run the 'analyze' command first: {}",
                index_path.display()
            );
        }

        info!(path = %index_path.display(), "Loading analysis index");
        let index: AnalysisIndex = read_yaml(&index_path)?;

        let mut files = Vec::with_capacity(index.documents.len());
        for entry in &index.documents {
            if entry.status != DocumentStatus::Ok {
                continue;
            }
            let Some(rel) = entry.analysis_file.as_deref() else {
                continue;
            };

            let path = resolve_path(base_dir, rel);
            if !path.exists() {
                warn!(path = %path.display(), "Skipping missing analysis file");
                continue;
            }
            match read_yaml::<AnalysisFile>(&path) {
                Ok(file) => files.push(file),
                Err(e) => warn!(path = %path.display(), error = %format!("{:#}", e), "Skipping unreadable analysis file"),
            }
        }

        Ok(Self::from_analyses(&files))
    }

    /// Aggregate analysis files in the given order
    pub fn from_analyses(files: &[AnalysisFile]) -> Self {
        let mut summary: BTreeMap<(String, String), SummaryRow> = BTreeMap::new();
        let mut used_names: HashSet<String> = HashSet::from([SUMMARY_SHEET.to_string()]);
        let mut documents = Vec::with_capacity(files.len());

        for file in files {
            let mut rows = Vec::new();

            for segment in &file.segments {
                for paragraph in &segment.paragraphs {
                    for assignment in &paragraph.assignments {
                        let topic = assignment.topic.trim();
                        if topic.is_empty() {
                            continue;
                        }
                        let orientation = assignment.orientation.trim();

                        summary
                            .entry((topic.to_string(), orientation.to_string()))
                            .or_insert_with(|| SummaryRow {
                                topic: topic.to_string(),
                                orientation: orientation.to_string(),
                                count: 0,
                                example_quote: assignment.evidence.clone(),
                            })
                            .count += 1;

                        rows.push(EvidenceRow {
                            topic: topic.to_string(),
                            orientation: orientation.to_string(),
                            where_found: format!("{} / {}", segment.id, paragraph.id),
                            evidence: assignment.evidence.clone(),
                            paragraph_index: paragraph.index,
                        });
                    }
                }
            }

            rows.sort_by(|a, b| {
                a.paragraph_index
                    .cmp(&b.paragraph_index)
                    .then_with(|| a.where_found.cmp(&b.where_found))
            });

            let sheet_name = unique_sheet_name(
                &sheet_base_name(&file.document_id, &file.source.path),
                &used_names,
            );
            used_names.insert(sheet_name.clone());

            documents.push(DocumentSheet {
                sheet_name,
                document_id: file.document_id.clone(),
                source_path: file.source.path.clone(),
                rows,
            });
        }

        Self {
            generated_at: Utc::now(),
            summary: summary.into_values().collect(),
            documents,
        }
    }

    /// Write the report in the format implied by the file extension
    pub fn write(&self, path: &Path) -> Result<PathBuf> {
        match ReportFormat::from_path(path) {
            ReportFormat::Yaml => write_yaml(path, self)?,
            ReportFormat::Json => {
                if let Some(dir) = path.parent() {
                    std::fs::create_dir_all(dir)
                        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
                }
                let content = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
                std::fs::write(path, content)
                    .with_context(|| format!("Failed to write report: {}", path.display()))?;
            }
        }
        Ok(path.to_path_buf())
    }
}

/// Sheet name from the source file stem (or the document id), at most 31 characters
pub fn sheet_base_name(document_id: &str, source_path: &str) -> String {
    let stem = Path::new(source_path)
        .file_stem()
        .map(|s| s.to_string_lossy().trim().to_string())
        .filter(|s| !s.is_empty());

    let base = stem.unwrap_or_else(|| document_id.to_string());
    truncate_chars(&base.replace(['/', '\\'], "_"), MAX_SHEET_NAME)
}

/// Append `_2`, `_3`, ... until the name is unused, staying within 31 characters
pub fn unique_sheet_name(name: &str, used: &HashSet<String>) -> String {
    let candidate = truncate_chars(name, MAX_SHEET_NAME);
    if !used.contains(&candidate) {
        return candidate;
    }

    let mut idx = 2usize;
    loop {
        let suffix = format!("_{}", idx);
        let keep = MAX_SHEET_NAME.saturating_sub(suffix.len()).max(1);
        let trimmed = format!("{}{}", truncate_chars(&candidate, keep), suffix);
        if !used.contains(&trimmed) {
            return trimmed;
        }
        idx += 1;
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
