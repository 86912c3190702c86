//! Stage orchestration for segmenting and coding transcripts.
//!
//! Both stages are incremental: every work file carries the fingerprint of
//! the inputs it was computed from, and a document is only recomputed when
//! `should_recompute` says so. A document that fails is recorded in the
//! stage index and the stage moves on.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::adapters::{complete_with_retry, AdapterError, ChatRequest, LlmAdapter};
use crate::config::{resolve_path, InterviewConfig, Strategy};
use crate::domain::{Candidate, Codebook, Role, Segment};
use crate::transcripts::{InterviewerMatcher, ReaderRegistry, TRANSCRIPT_PARSING_VERSION};
use crate::workdir::{
    discover_inputs, document_id, file_digest, read_value, read_yaml, rel_posix, write_yaml,
    AnalysisFile, AnalysisIndex, AnalysisIndexEntry, AnalysisInput, AnalysisSettingsRecord,
    AnalyzedParagraph, AnalyzedSegment, DocumentStatus, ExclusionReason, SegmentationInfo,
    SegmentsFile, SegmentsIndex, SegmentsIndexEntry, SourceInfo, Workdir, SCHEMA_VERSION,
};

use super::fingerprint::{
    analysis_fingerprint, digest_lines, segmentation_fingerprint, should_recompute, AnalysisInputs,
};
use super::policy::OrientationPolicy;
use super::progress::{NoProgress, Progress, ProgressEvent, Stage};
use super::prompt::{parse_segment_response, parse_topic_response, PromptContext, PromptParagraph, RawCandidates};
use super::segmentation::build_segments;

/// Counts for one stage run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageSummary {
    /// Documents (re)computed and written
    pub written: usize,

    /// Documents whose cached work file was still valid
    pub reused: usize,

    /// Documents recorded as failed
    pub failed: usize,
}

/// Runs the segment and analyze stages for one configuration
pub struct Orchestrator {
    config: InterviewConfig,
    readers: ReaderRegistry,
    adapter: Option<Arc<dyn LlmAdapter>>,
    progress: Arc<dyn Progress>,
}

impl Orchestrator {
    /// Create an orchestrator without a model backend
    pub fn new(config: InterviewConfig) -> Result<Self> {
        Ok(Self {
            config,
            readers: ReaderRegistry::new().context("Failed to set up transcript readers")?,
            adapter: None,
            progress: Arc::new(NoProgress),
        })
    }

    /// Model backend used by the analyze stage
    pub fn with_adapter(mut self, adapter: Arc<dyn LlmAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &InterviewConfig {
        &self.config
    }

    pub fn workdir(&self) -> Workdir {
        Workdir::new(&self.config.workdir)
    }

    /// Segment every matching transcript and write `segments/index.yaml`
    #[instrument(skip(self), fields(workdir = %self.config.workdir.display()))]
    pub fn run_segment_stage(&self) -> Result<StageSummary> {
        let workdir = self.workdir();
        let _lock = workdir.lock()?;
        workdir.ensure()?;

        let base_dir = &self.config.base_dir;
        let inputs: Vec<_> = discover_inputs(base_dir, &self.config.include, &self.config.exclude)?
            .into_iter()
            .filter(|path| {
                let supported = self.readers.can_read(path);
                if !supported {
                    debug!(path = %path.display(), "Skipping unsupported file");
                }
                supported
            })
            .collect();

        if inputs.is_empty() {
            warn!("No transcripts matched the include patterns");
        }

        let total = inputs.len();
        self.progress.report(ProgressEvent::StageStarted {
            stage: Stage::Segment,
            total,
        });

        let mut summary = StageSummary::default();
        let mut documents = Vec::with_capacity(total);

        for (idx, path) in inputs.iter().enumerate() {
            let doc_id = document_id(base_dir, path);
            let source_path = rel_posix(base_dir, path);

            self.progress.report(ProgressEvent::DocumentStarted {
                stage: Stage::Segment,
                document_id: doc_id.clone(),
                position: idx + 1,
                total,
            });

            match self.segment_document(&workdir, path, &doc_id, &source_path) {
                Ok((entry, reused)) => {
                    self.report_done(Stage::Segment, &doc_id, reused, &mut summary);
                    documents.push(entry);
                }
                Err(e) => {
                    let error = format!("{:#}", e);
                    self.report_failed(Stage::Segment, &doc_id, &error, &mut summary);
                    documents.push(SegmentsIndexEntry {
                        document_id: doc_id,
                        source_path,
                        status: DocumentStatus::Failed,
                        segments_file: None,
                        paragraphs_total: 0,
                        segments_total: 0,
                        error: Some(error),
                    });
                }
            }
        }

        write_yaml(
            &workdir.segments_index(),
            &SegmentsIndex {
                schema_version: SCHEMA_VERSION,
                documents,
            },
        )?;

        info!(
            written = summary.written,
            reused = summary.reused,
            failed = summary.failed,
            "Segmentation finished"
        );
        Ok(summary)
    }

    fn segment_document(
        &self,
        workdir: &Workdir,
        path: &Path,
        doc_id: &str,
        source_path: &str,
    ) -> Result<(SegmentsIndexEntry, bool)> {
        let base_dir = &self.config.base_dir;
        let params = &self.config.segmentation;
        let out_path = workdir.segments_file(doc_id);

        let digest = file_digest(path)?;
        let fingerprint = segmentation_fingerprint(source_path, &digest, TRANSCRIPT_PARSING_VERSION, params);

        let existing = read_value(&out_path);
        if !should_recompute(existing.as_ref().and_then(|v| v.get("fingerprint")), &fingerprint) {
            match read_yaml::<SegmentsFile>(&out_path) {
                Ok(cached) => {
                    let entry = segments_entry(&cached, rel_posix(base_dir, &out_path));
                    return Ok((entry, true));
                }
                Err(e) => debug!(error = %e, "Cached segments file unusable, recomputing"),
            }
        }

        let transcript = self
            .readers
            .read_transcript(path)
            .with_context(|| format!("Failed to parse transcript: {}", path.display()))?;

        let segments = build_segments(doc_id, &transcript.paragraphs, params);

        let file = SegmentsFile {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            fingerprint: fingerprint.to_record(),
            transcript_parsing_version: TRANSCRIPT_PARSING_VERSION,
            source: SourceInfo {
                path: source_path.to_string(),
                digest,
            },
            document_id: doc_id.to_string(),
            metadata: transcript.metadata,
            segmentation: SegmentationInfo::from(params),
            source_paragraphs_total: transcript.source_paragraphs_total,
            paragraphs_total: transcript.paragraphs.len(),
            segments,
        };
        write_yaml(&out_path, &file)?;

        Ok((segments_entry(&file, rel_posix(base_dir, &out_path)), false))
    }

    /// Code every segmented document and write `analysis/index.yaml`
    #[instrument(skip(self), fields(workdir = %self.config.workdir.display()))]
    pub async fn run_analyze_stage(&self) -> Result<StageSummary> {
        let workdir = self.workdir();
        let _lock = workdir.lock()?;
        workdir.ensure()?;

        let index_path = workdir.segments_index();
        if !index_path.exists() {
            anyhow::bail!(
                "No segments index at {}; run the segment stage first",
                index_path.display()
            );
        }
        let segments_index: SegmentsIndex = read_yaml(&index_path)?;

        let codebook = Codebook::build(&self.config.topics);
        let run = AnalysisRun {
            codebook_hash: codebook.hash()?,
            policy: OrientationPolicy::from_codebook(&codebook)
                .with_defaults(self.config.analysis.scoring),
            rules_digest: digest_lines(&self.config.analysis.rules),
            codebook,
        };

        let total = segments_index.documents.len();
        self.progress.report(ProgressEvent::StageStarted {
            stage: Stage::Analyze,
            total,
        });

        let mut summary = StageSummary::default();
        let mut documents = Vec::with_capacity(total);

        for (idx, entry) in segments_index.documents.iter().enumerate() {
            let doc_id = entry.document_id.clone();

            self.progress.report(ProgressEvent::DocumentStarted {
                stage: Stage::Analyze,
                document_id: doc_id.clone(),
                position: idx + 1,
                total,
            });

            let outcome = match (&entry.status, &entry.segments_file) {
                (DocumentStatus::Ok, Some(segments_file)) => {
                    self.analyze_document(&workdir, &run, entry, segments_file).await
                }
                _ => Err(anyhow::anyhow!(
                    "Segmentation failed: {}",
                    entry.error.as_deref().unwrap_or("no segments file")
                )),
            };

            match outcome {
                Ok((index_entry, reused)) => {
                    self.report_done(Stage::Analyze, &doc_id, reused, &mut summary);
                    documents.push(index_entry);
                }
                Err(e) => {
                    let error = format!("{:#}", e);
                    self.report_failed(Stage::Analyze, &doc_id, &error, &mut summary);
                    documents.push(AnalysisIndexEntry {
                        document_id: doc_id,
                        source_path: entry.source_path.clone(),
                        status: DocumentStatus::Failed,
                        analysis_file: None,
                        segments_total: entry.segments_total,
                        assignments_total: 0,
                        errors_total: 0,
                        error: Some(error),
                    });
                }
            }
        }

        write_yaml(
            &workdir.analysis_index(),
            &AnalysisIndex {
                schema_version: SCHEMA_VERSION,
                documents,
            },
        )?;

        info!(
            written = summary.written,
            reused = summary.reused,
            failed = summary.failed,
            "Analysis finished"
        );
        Ok(summary)
    }

    async fn analyze_document(
        &self,
        workdir: &Workdir,
        run: &AnalysisRun,
        entry: &SegmentsIndexEntry,
        segments_file: &str,
    ) -> Result<(AnalysisIndexEntry, bool)> {
        let base_dir = &self.config.base_dir;
        let analysis = &self.config.analysis;
        let out_path = workdir.analysis_file(&entry.document_id);
        let segments_path = resolve_path(base_dir, segments_file);

        let segments_digest = file_digest(&segments_path)?;
        let strategy = analysis.strategy.to_string();
        let fingerprint = analysis_fingerprint(
            base_dir,
            &AnalysisInputs {
                segments_file,
                segments_digest: &segments_digest,
                codebook_hash: &run.codebook_hash,
                strategy: &strategy,
                exclude_interviewer: analysis.exclude_interviewer,
                rules_digest: &run.rules_digest,
                scoring: analysis.scoring,
            },
        );

        let existing = read_value(&out_path);
        if !should_recompute(existing.as_ref().and_then(|v| v.get("fingerprint")), &fingerprint) {
            match read_yaml::<AnalysisFile>(&out_path) {
                // Segments that failed to code are retried on every run
                Ok(cached) if cached.errors_total() > 0 => {
                    info!(
                        document = %entry.document_id,
                        errors = cached.errors_total(),
                        "Cached analysis has failed segments, recomputing"
                    );
                }
                Ok(cached) => {
                    let entry = analysis_entry(&cached, rel_posix(base_dir, &out_path));
                    return Ok((entry, true));
                }
                Err(e) => debug!(error = %e, "Cached analysis file unusable, recomputing"),
            }
        }

        let adapter = self
            .adapter
            .clone()
            .ok_or_else(|| AdapterError::NotConfigured("LLM_OPENAI_API_KEY".to_string()))?;

        let segments: SegmentsFile = read_yaml(&segments_path)?;
        let coded = self.code_document(&adapter, run, &segments).await?;

        let file = AnalysisFile {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            fingerprint: fingerprint.to_record(),
            input: AnalysisInput {
                segments_file: segments_file.to_string(),
                segments_digest,
                codebook_hash: run.codebook_hash.clone(),
            },
            document_id: entry.document_id.clone(),
            source: segments.source.clone(),
            metadata: segments.metadata.clone(),
            analysis: AnalysisSettingsRecord {
                strategy: analysis.strategy,
                exclude_interviewer: analysis.exclude_interviewer,
                rules: analysis.rules.clone(),
            },
            codebook: run.codebook.clone(),
            segments: coded.segments,
            warnings: coded.warnings,
        };
        write_yaml(&out_path, &file)?;

        Ok((analysis_entry(&file, rel_posix(base_dir, &out_path)), false))
    }

    /// Code all segments of one document and consolidate once over the union
    async fn code_document(
        &self,
        adapter: &Arc<dyn LlmAdapter>,
        run: &AnalysisRun,
        segments: &SegmentsFile,
    ) -> Result<CodedDocument> {
        let analysis = &self.config.analysis;
        let matcher = InterviewerMatcher::new(&segments.metadata.interviewers)
            .context("Invalid interviewer label")?;

        let context = PromptContext {
            exclude_interviewer: analysis.exclude_interviewer,
            interviewer_labels: segments.metadata.interviewers.clone(),
            rules: analysis.rules.clone(),
        };

        let total = segments.segments.len();
        let mut candidates: BTreeMap<String, Vec<Candidate>> = BTreeMap::new();
        let mut analyzed = Vec::with_capacity(total);

        for (idx, segment) in segments.segments.iter().enumerate() {
            let paragraphs = prompt_paragraphs(segment, &matcher, analysis.exclude_interviewer);
            let targets: HashSet<&str> = paragraphs
                .iter()
                .filter(|p| p.target)
                .map(|p| p.id.as_str())
                .collect();

            let mut errors = Vec::new();
            if targets.is_empty() {
                debug!(segment_id = %segment.id, "No coding targets, skipping request");
            } else {
                let raw = match analysis.strategy {
                    Strategy::Segment => {
                        self.progress.report(ProgressEvent::SegmentCoding {
                            segment_id: segment.id.clone(),
                            position: idx + 1,
                            total,
                            topic: None,
                        });
                        self.code_segment(adapter, &context, run, segment, &paragraphs, &mut errors)
                            .await?
                    }
                    Strategy::Topic => {
                        self.code_segment_by_topic(
                            adapter,
                            &context,
                            run,
                            segment,
                            (idx + 1, total),
                            &paragraphs,
                            &mut errors,
                        )
                        .await?
                    }
                };

                for (pid, values) in raw {
                    if !targets.contains(pid.as_str()) {
                        debug!(segment_id = %segment.id, paragraph_id = %pid, "Discarding candidates for non-target paragraph");
                        continue;
                    }
                    candidates
                        .entry(pid)
                        .or_default()
                        .extend(values.iter().filter_map(|v| normalize_candidate(&run.codebook, v)));
                }
            }

            analyzed.push(AnalyzedSegment {
                id: segment.id.clone(),
                segment_index: segment.segment_index,
                start_paragraph: segment.start_paragraph,
                end_paragraph: segment.end_paragraph,
                paragraphs: paragraphs
                    .into_iter()
                    .zip(segment.paragraphs.iter())
                    .map(|(p, source)| AnalyzedParagraph {
                        excluded_reason: exclusion_reason(&p, source.role),
                        id: p.id,
                        index: source.index,
                        role: p.role,
                        text: p.text,
                        target: p.target,
                        assignments: Vec::new(),
                    })
                    .collect(),
                errors,
            });
        }

        let mut consolidation = run.policy.consolidate(&candidates);
        for warning in &consolidation.warnings {
            warn!(document_id = %segments.document_id, "{}", warning);
        }

        for segment in &mut analyzed {
            for paragraph in segment.paragraphs.iter_mut().filter(|p| p.target) {
                if let Some(assignments) = consolidation.assignments.remove(&paragraph.id) {
                    paragraph.assignments = assignments;
                }
            }
        }

        Ok(CodedDocument {
            segments: analyzed,
            warnings: consolidation.warnings.iter().map(ToString::to_string).collect(),
        })
    }

    /// One request per segment carrying the full codebook
    async fn code_segment(
        &self,
        adapter: &Arc<dyn LlmAdapter>,
        context: &PromptContext,
        run: &AnalysisRun,
        segment: &Segment,
        paragraphs: &[PromptParagraph],
        errors: &mut Vec<String>,
    ) -> Result<RawCandidates> {
        let request = ChatRequest {
            messages: context.segment_messages(&segment.id, &run.codebook, paragraphs)?,
            timeout: self.request_timeout(),
        };

        let outcome = complete_with_retry(adapter.as_ref(), &request, &self.config.analysis.retry)
            .await
            .map_err(|e| e.to_string())
            .and_then(|value| parse_segment_response(&value));

        Ok(outcome.unwrap_or_else(|e| {
            warn!(segment_id = %segment.id, error = %e, "Segment coding failed");
            errors.push(e);
            RawCandidates::new()
        }))
    }

    /// One request per topic, issued concurrently and merged in codebook order
    #[allow(clippy::too_many_arguments)]
    async fn code_segment_by_topic(
        &self,
        adapter: &Arc<dyn LlmAdapter>,
        context: &PromptContext,
        run: &AnalysisRun,
        segment: &Segment,
        (position, total): (usize, usize),
        paragraphs: &[PromptParagraph],
        errors: &mut Vec<String>,
    ) -> Result<RawCandidates> {
        let semaphore = Arc::new(Semaphore::new(self.config.analysis.max_concurrent_requests));
        let mut tasks = JoinSet::new();

        for (idx, topic) in run.codebook.topics.iter().enumerate() {
            let request = ChatRequest {
                messages: context.topic_messages(&segment.id, topic, paragraphs)?,
                timeout: self.request_timeout(),
            };

            self.progress.report(ProgressEvent::SegmentCoding {
                segment_id: segment.id.clone(),
                position,
                total,
                topic: Some(topic.topic.clone()),
            });

            let adapter = Arc::clone(adapter);
            let semaphore = Arc::clone(&semaphore);
            let retry = self.config.analysis.retry.clone();
            let name = topic.topic.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = complete_with_retry(adapter.as_ref(), &request, &retry).await;
                (idx, name, result)
            });
        }

        let mut results = Vec::with_capacity(run.codebook.topics.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => errors.push(format!("Coding task failed: {}", e)),
            }
        }
        results.sort_by_key(|(idx, _, _)| *idx);

        let mut merged = RawCandidates::new();
        for (_, name, result) in results {
            let parsed = result
                .map_err(|e| format!("{}: {}", name, e))
                .and_then(|value| parse_topic_response(&name, &value));

            match parsed {
                Ok(raw) => {
                    for (pid, values) in raw {
                        merged.entry(pid).or_default().extend(values);
                    }
                }
                Err(e) => {
                    warn!(segment_id = %segment.id, error = %e, "Topic coding failed");
                    errors.push(e);
                }
            }
        }

        Ok(merged)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.analysis.request_timeout_seconds)
    }

    fn report_done(&self, stage: Stage, doc_id: &str, reused: bool, summary: &mut StageSummary) {
        let document_id = doc_id.to_string();
        if reused {
            summary.reused += 1;
            self.progress
                .report(ProgressEvent::DocumentReused { stage, document_id });
        } else {
            summary.written += 1;
            self.progress
                .report(ProgressEvent::DocumentCompleted { stage, document_id });
        }
    }

    fn report_failed(&self, stage: Stage, doc_id: &str, error: &str, summary: &mut StageSummary) {
        summary.failed += 1;
        self.progress.report(ProgressEvent::DocumentFailed {
            stage,
            document_id: doc_id.to_string(),
            error: error.to_string(),
        });
    }
}

/// Per-run coding inputs shared by all documents
struct AnalysisRun {
    codebook: Codebook,
    codebook_hash: String,
    policy: OrientationPolicy,
    rules_digest: String,
}

struct CodedDocument {
    segments: Vec<AnalyzedSegment>,
    warnings: Vec<String>,
}

/// Validate a raw model candidate against the codebook.
///
/// Evidence must be non-blank. For topics with orientations the orientation
/// must be one of the allowed labels; otherwise it is cleared.
pub fn normalize_candidate(codebook: &Codebook, value: &Value) -> Option<Candidate> {
    let candidate = Candidate::from_json(value)?;
    if candidate.evidence.trim().is_empty() {
        return None;
    }

    let allowed = codebook.allowed_orientations(&candidate.topic);
    if allowed.is_empty() {
        return Some(Candidate {
            orientation: None,
            ..candidate
        });
    }

    match candidate.orientation.as_deref() {
        Some(label) if allowed.iter().any(|a| a == label) => Some(candidate),
        _ => None,
    }
}

/// Paragraphs as sent to the model, with their coding-target flag
fn prompt_paragraphs(segment: &Segment, matcher: &InterviewerMatcher, exclude_interviewer: bool) -> Vec<PromptParagraph> {
    segment
        .paragraphs
        .iter()
        .map(|p| PromptParagraph {
            id: p.id.clone(),
            role: p.role,
            target: p.role == Role::New && !(exclude_interviewer && matcher.is_interviewer(&p.text)),
            text: p.text.clone(),
        })
        .collect()
}

fn exclusion_reason(paragraph: &PromptParagraph, role: Role) -> Option<ExclusionReason> {
    if paragraph.target {
        None
    } else if role == Role::Ref {
        Some(ExclusionReason::OverlapReference)
    } else {
        Some(ExclusionReason::InterviewerStatement)
    }
}

fn segments_entry(file: &SegmentsFile, segments_file: String) -> SegmentsIndexEntry {
    SegmentsIndexEntry {
        document_id: file.document_id.clone(),
        source_path: file.source.path.clone(),
        status: DocumentStatus::Ok,
        segments_file: Some(segments_file),
        paragraphs_total: file.paragraphs_total,
        segments_total: file.segments.len(),
        error: None,
    }
}

fn analysis_entry(file: &AnalysisFile, analysis_file: String) -> AnalysisIndexEntry {
    AnalysisIndexEntry {
        document_id: file.document_id.clone(),
        source_path: file.source.path.clone(),
        status: DocumentStatus::Ok,
        analysis_file: Some(analysis_file),
        segments_total: file.segments.len(),
        assignments_total: file.assignments_total(),
        errors_total: file.errors_total(),
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SegmentParagraph, TopicSpec};
    use serde_json::json;

    fn codebook() -> Codebook {
        Codebook::build(&[
            TopicSpec::new("Clarity").with_orientations(["Clear", "Unclear"]),
            TopicSpec::new("Offers"),
        ])
    }

    #[test]
    fn test_normalize_candidate() {
        let cb = codebook();

        let ok = normalize_candidate(&cb, &json!({"topic": "Clarity", "orientation": "Clear", "evidence": "q"}));
        assert_eq!(ok.unwrap().orientation.as_deref(), Some("Clear"));

        // Orientation outside the allowed list
        assert!(normalize_candidate(&cb, &json!({"topic": "Clarity", "orientation": "Maybe", "evidence": "q"})).is_none());
        // Missing orientation where one is required
        assert!(normalize_candidate(&cb, &json!({"topic": "Clarity", "evidence": "q"})).is_none());
        // Blank evidence
        assert!(normalize_candidate(&cb, &json!({"topic": "Offers", "evidence": "  "})).is_none());

        let cleared = normalize_candidate(&cb, &json!({"topic": "Offers", "orientation": "Any", "evidence": "q"})).unwrap();
        assert!(cleared.orientation.is_none());
    }

    #[test]
    fn test_prompt_paragraphs_mark_targets() {
        let segment = Segment {
            id: "d:p0001-p0003".to_string(),
            segment_index: 1,
            start_paragraph: 1,
            end_paragraph: 3,
            overlap_paragraphs: 1,
            paragraphs: vec![
                SegmentParagraph {
                    id: "d:p0001".to_string(),
                    index: 1,
                    role: Role::Ref,
                    text: "B: earlier".to_string(),
                },
                SegmentParagraph {
                    id: "d:p0002".to_string(),
                    index: 2,
                    role: Role::New,
                    text: "Anna: question?".to_string(),
                },
                SegmentParagraph {
                    id: "d:p0003".to_string(),
                    index: 3,
                    role: Role::New,
                    text: "B: answer".to_string(),
                },
            ],
        };
        let matcher = InterviewerMatcher::new(&["Anna".to_string()]).unwrap();

        let excluded = prompt_paragraphs(&segment, &matcher, true);
        let targets: Vec<bool> = excluded.iter().map(|p| p.target).collect();
        assert_eq!(targets, vec![false, false, true]);
        assert_eq!(
            exclusion_reason(&excluded[0], Role::Ref),
            Some(ExclusionReason::OverlapReference)
        );
        assert_eq!(
            exclusion_reason(&excluded[1], Role::New),
            Some(ExclusionReason::InterviewerStatement)
        );
        assert_eq!(exclusion_reason(&excluded[2], Role::New), None);

        let included = prompt_paragraphs(&segment, &matcher, false);
        assert!(included[1].target);
    }
}
