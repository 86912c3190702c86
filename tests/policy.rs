//! Consolidation Policy Integration Tests

use std::collections::BTreeMap;

use interview_coder::core::OrientationPolicy;
use interview_coder::domain::{Candidate, Codebook, TopicSpec};

fn policy() -> OrientationPolicy {
    let codebook = Codebook::build(&[
        TopicSpec::new("Clarity").with_orientations(["Clear", "Unclear"]),
        TopicSpec::new("Offers")
            .with_orientations(["Positive", "Negative"])
            .allow_multiple(true),
    ]);
    OrientationPolicy::from_codebook(&codebook)
}

fn one_paragraph(candidates: Vec<Candidate>) -> BTreeMap<String, Vec<Candidate>> {
    BTreeMap::from([("doc:p0001".to_string(), candidates)])
}

#[test]
fn test_competing_orientations_keep_the_higher_rank() {
    let result = policy().consolidate(&one_paragraph(vec![
        Candidate::new("Clarity", Some("Unclear"), "x"),
        Candidate::new("Clarity", Some("Clear"), "y"),
    ]));

    let kept = &result.assignments["doc:p0001"];
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].orientation, "Clear");
    assert_eq!(kept[0].evidence, "y");

    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].topic, "Clarity");
    assert_eq!(result.warnings[0].kept, "Clear");
    assert_eq!(result.warnings[0].dropped, vec!["Unclear".to_string()]);
}

#[test]
fn test_duplicates_collapse_without_warnings() {
    let result = policy().consolidate(&one_paragraph(vec![
        Candidate::new("Clarity", Some("Clear"), "same quote"),
        Candidate::new("Clarity", Some("Clear"), "  same quote "),
    ]));

    assert_eq!(result.assignments["doc:p0001"].len(), 1);
    assert!(result.warnings.is_empty());
}

#[test]
fn test_multi_orientation_topics_keep_everything() {
    let result = policy().consolidate(&one_paragraph(vec![
        Candidate::new("Offers", Some("Positive"), "a"),
        Candidate::new("Offers", Some("Negative"), "b"),
        Candidate::new("Offers", Some("Positive"), "c"),
    ]));

    let orientations: Vec<&str> = result.assignments["doc:p0001"]
        .iter()
        .map(|a| a.orientation.as_str())
        .collect();
    assert_eq!(orientations, vec!["Positive", "Negative", "Positive"]);
    assert!(result.warnings.is_empty());
}

#[test]
fn test_single_winner_per_topic_across_paragraphs() {
    let mut candidates = BTreeMap::new();
    for i in 1..=5u32 {
        candidates.insert(
            format!("doc:p{:04}", i),
            vec![
                Candidate::new("Clarity", Some("Unclear"), format!("u{}", i)),
                Candidate::new("Clarity", Some("Clear"), format!("c{}", i)),
                Candidate::new("Offers", Some("Negative"), format!("n{}", i)),
            ],
        );
    }

    let result = policy().consolidate(&candidates);

    assert_eq!(result.assignments.len(), 5);
    assert_eq!(result.warnings.len(), 5);
    for kept in result.assignments.values() {
        let clarity = kept.iter().filter(|a| a.topic == "Clarity").count();
        assert_eq!(clarity, 1);
        assert_eq!(kept.len(), 2);
    }
}

#[test]
fn test_consolidation_is_deterministic() {
    let candidates = one_paragraph(vec![
        Candidate::new("Clarity", Some("Clear"), "a"),
        Candidate::new("Clarity", Some("Mystery"), "b"),
        Candidate::new("Clarity", None, "c"),
    ]);

    let policy = policy();
    let first = policy.consolidate(&candidates);
    let second = policy.consolidate(&candidates);
    assert_eq!(first, second);
    assert_eq!(first.assignments["doc:p0001"][0].orientation, "Clear");
}

#[test]
fn test_same_orientation_with_different_quotes_is_not_reported() {
    let result = policy().consolidate(&one_paragraph(vec![
        Candidate::new("Clarity", Some("Clear"), "first quote"),
        Candidate::new("Clarity", Some("Clear"), "second quote"),
    ]));

    let kept = &result.assignments["doc:p0001"];
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].evidence, "first quote");
    assert!(result.warnings.is_empty());
}
