//! Idempotency Integration Tests
//!
//! Tests for fingerprint records surviving the work file round trip and for
//! the segment stage skipping unchanged transcripts.

use std::path::Path;

use tempfile::TempDir;

use interview_coder::config::InterviewConfig;
use interview_coder::core::fingerprint::{analysis_fingerprint, segmentation_fingerprint, AnalysisInputs};
use interview_coder::core::{should_recompute, Orchestrator, ScoringDefaults, SegmentationParams, StageSummary};
use interview_coder::transcripts::TRANSCRIPT_PARSING_VERSION;
use interview_coder::workdir::{read_value, read_yaml, write_yaml, SegmentsIndex};

fn write_project(dir: &Path, overlap: u32) -> InterviewConfig {
    std::fs::create_dir_all(dir.join("transcripts")).unwrap();
    if !dir.join("transcripts/a.txt").exists() {
        std::fs::write(
            dir.join("transcripts/a.txt"),
            "A: one\n\nB: two\n\nA: three\n\nB: four\n\nA: five\n",
        )
        .unwrap();
    }

    let yaml = format!(
        "include: transcripts/*.txt\nworkdir: work\noutfile: out.yaml\nsegmentation:\n  segment_paragraphs: 3\n  overlap_paragraphs: {}\ntopics: [Topic]\n",
        overlap
    );
    let path = dir.join("interviews.yaml");
    std::fs::write(&path, yaml).unwrap();
    InterviewConfig::load(&path).unwrap()
}

fn segments_file(config: &InterviewConfig) -> std::path::PathBuf {
    let index: SegmentsIndex = read_yaml(&config.workdir.join("segments/index.yaml")).unwrap();
    config
        .base_dir
        .join(index.documents[0].segments_file.clone().unwrap())
}

#[test]
fn test_record_survives_yaml_round_trip() {
    let temp = TempDir::new().unwrap();
    let params = SegmentationParams::new(12, 3).unwrap();
    let fingerprint = segmentation_fingerprint("t/a.txt", "sha256:abc", TRANSCRIPT_PARSING_VERSION, &params);

    let path = temp.path().join("record.yaml");
    write_yaml(&path, &serde_json::json!({"fingerprint": fingerprint.to_record()})).unwrap();
    let stored = read_value(&path).unwrap();

    assert!(!should_recompute(stored.get("fingerprint"), &fingerprint));

    let other = SegmentationParams::new(12, 2).unwrap();
    let changed = segmentation_fingerprint("t/a.txt", "sha256:abc", TRANSCRIPT_PARSING_VERSION, &other);
    assert!(should_recompute(stored.get("fingerprint"), &changed));
}

#[test]
fn test_equivalent_segment_paths_are_reused() {
    fn inputs(segments_file: &str) -> AnalysisInputs<'_> {
        AnalysisInputs {
            segments_file,
            segments_digest: "sha256:1",
            codebook_hash: "sha256:2",
            strategy: "segment",
            exclude_interviewer: false,
            rules_digest: "sha256:3",
            scoring: ScoringDefaults::default(),
        }
    }

    let base = Path::new("/proj");

    let stored = analysis_fingerprint(base, &inputs("work/segments/a.yaml")).to_record();
    let candidate = analysis_fingerprint(base, &inputs("./work/x/../segments/a.yaml"));
    assert!(!should_recompute(Some(&stored), &candidate));

    let moved = analysis_fingerprint(base, &inputs("work2/segments/a.yaml"));
    assert!(should_recompute(Some(&stored), &moved));
}

#[test]
fn test_segment_stage_skips_unchanged_transcripts() {
    let temp = TempDir::new().unwrap();
    let config = write_project(temp.path(), 1);
    let orchestrator = Orchestrator::new(config.clone()).unwrap();

    let summary = orchestrator.run_segment_stage().unwrap();
    assert_eq!(summary, StageSummary { written: 1, reused: 0, failed: 0 });

    let file = segments_file(&config);
    let index_path = config.workdir.join("segments/index.yaml");
    let file_before = std::fs::read(&file).unwrap();
    let index_before = std::fs::read(&index_path).unwrap();

    let summary = orchestrator.run_segment_stage().unwrap();
    assert_eq!(summary, StageSummary { written: 0, reused: 1, failed: 0 });
    assert_eq!(std::fs::read(&file).unwrap(), file_before);
    assert_eq!(std::fs::read(&index_path).unwrap(), index_before);
}

#[test]
fn test_segment_stage_recomputes_on_changes() {
    let temp = TempDir::new().unwrap();
    let config = write_project(temp.path(), 1);
    Orchestrator::new(config.clone()).unwrap().run_segment_stage().unwrap();

    // Transcript content
    std::fs::write(temp.path().join("transcripts/a.txt"), "A: one\n\nB: changed\n").unwrap();
    let summary = Orchestrator::new(config.clone()).unwrap().run_segment_stage().unwrap();
    assert_eq!(summary.written, 1);

    // Segmentation parameters
    let config = write_project(temp.path(), 0);
    let summary = Orchestrator::new(config.clone()).unwrap().run_segment_stage().unwrap();
    assert_eq!(summary.written, 1);

    // A damaged record is a cache miss, never an error
    let file = segments_file(&config);
    let content = std::fs::read_to_string(&file).unwrap();
    let damaged = content.replacen("fingerprint:", "fingerprint: broken\nold_fingerprint:", 1);
    std::fs::write(&file, damaged).unwrap();

    let summary = Orchestrator::new(config.clone()).unwrap().run_segment_stage().unwrap();
    assert_eq!(summary, StageSummary { written: 1, reused: 0, failed: 0 });

    let summary = Orchestrator::new(config).unwrap().run_segment_stage().unwrap();
    assert_eq!(summary.reused, 1);
}
