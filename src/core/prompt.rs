//! Prompt construction and response parsing for the coding strategies.
//!
//! Payloads are rendered as YAML for readability; the model answers in JSON.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Value};

use crate::adapters::ChatMessage;
use crate::domain::{Codebook, Role, Topic};

const SEGMENT_TASK: &str = "For each paragraph where target=true, assign zero or more topics from the codebook. \
For each assignment, if the topic defines orientations, choose exactly one allowed orientation. \
If the topic has no orientations, set orientation to null (or an empty string). \
Do not assign the same topic more than once per paragraph unless the codebook sets allow_multiple_orientations=true for that topic. \
When allow_multiple_orientations=false, the orientations list is ordered from highest to lowest rank; if you are unsure, choose the single best (highest-ranked) match. \
Use codebook topic/orientation descriptions (if present) as selection hints, but do not infer beyond the paragraph text. \
Always provide an evidence quote that appears verbatim in the paragraph.";

const TOPIC_TASK: &str = "For each paragraph where target=true, decide whether it explicitly addresses the given topic. \
If yes and an orientations list is provided, select exactly one orientation from the allowed list. \
If no orientations are provided, omit orientation (or set it to null). \
Do not assign the same topic more than once per paragraph unless allow_multiple_orientations=true for that topic. \
When allow_multiple_orientations=false, the orientations list is ordered from highest to lowest rank; if you are unsure, choose the single best (highest-ranked) match. \
Use the topic description and orientation descriptions (if provided) as selection hints, but do not infer beyond the paragraph text. \
Always provide an evidence quote that appears verbatim in the paragraph.";

/// A paragraph as shown to the model
#[derive(Debug, Clone, Serialize)]
pub struct PromptParagraph {
    pub id: String,
    pub role: Role,
    pub target: bool,
    pub text: String,
}

/// Shared prompt inputs for one document
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    pub exclude_interviewer: bool,
    pub interviewer_labels: Vec<String>,
    pub rules: Vec<String>,
}

impl PromptContext {
    fn visible_interviewers(&self) -> &[String] {
        if self.exclude_interviewer {
            &self.interviewer_labels
        } else {
            &[]
        }
    }

    /// System prompt shared by both strategies
    pub fn system_prompt(&self, extra: &[&str]) -> String {
        let mut parts: Vec<String> = vec![
            "You are assisting with a qualitative content coding task.".to_string(),
            "Do not interpret or infer.".to_string(),
            "Only assign if there is explicit textual evidence.".to_string(),
            "Always quote the exact evidence text from the paragraph.".to_string(),
        ];

        parts.extend(extra.iter().map(|s| s.to_string()));
        parts.extend(
            self.rules
                .iter()
                .map(|r| r.trim())
                .filter(|r| !r.is_empty())
                .map(str::to_string),
        );

        if self.exclude_interviewer && !self.interviewer_labels.is_empty() {
            parts.push(format!(
                "Important: Ignore interviewer statements. A paragraph is an interviewer statement if it starts \
                 with one of these labels: {}. Do not assign any topics/orientations to interviewer statements.",
                self.interviewer_labels.join(", ")
            ));
        }

        parts.join(" ")
    }

    /// Messages for a full-codebook call on one segment
    pub fn segment_messages(
        &self,
        segment_id: &str,
        codebook: &Codebook,
        paragraphs: &[PromptParagraph],
    ) -> Result<Vec<ChatMessage>> {
        let system = self.system_prompt(&[
            "Only assign a topic/orientation if the paragraph explicitly contains textual evidence.",
            "If the codebook provides topic descriptions or orientation descriptions, use them as hints for when to choose a topic/orientation.",
        ]);

        let payload = json!({
            "segment_id": segment_id,
            "task": SEGMENT_TASK,
            "interviewer_labels": self.visible_interviewers(),
            "codebook": codebook,
            "paragraphs": paragraphs,
            "output_format": {
                "paragraphs": [{
                    "id": "<paragraph id>",
                    "assignments": [{
                        "topic": "<topic name>",
                        "orientation": "<one allowed orientation, or null if none>",
                        "evidence": "<exact quote from the paragraph>",
                    }],
                }],
            },
        });

        Ok(vec![ChatMessage::system(system), ChatMessage::user(render_payload(&payload)?)])
    }

    /// Messages for a single-topic call on one segment
    pub fn topic_messages(
        &self,
        segment_id: &str,
        topic: &Topic,
        paragraphs: &[PromptParagraph],
    ) -> Result<Vec<ChatMessage>> {
        let system = self.system_prompt(&[
            "If the topic provides a description or orientation descriptions, use them as hints for when to choose a match.",
        ]);

        let mut topic_value = json!({
            "topic": topic.topic,
            "orientations": topic.orientations,
            "allow_multiple_orientations": topic.allow_multiple_orientations,
        });
        if !topic.orientation_details.is_empty() {
            topic_value["orientation_details"] = json!(topic.orientation_details);
        }
        if let Some(description) = &topic.description {
            topic_value["description"] = json!(description);
        }

        let paragraphs: Vec<Value> = paragraphs
            .iter()
            .map(|p| json!({"id": p.id, "target": p.target, "text": p.text}))
            .collect();

        let payload = json!({
            "segment_id": segment_id,
            "task": TOPIC_TASK,
            "interviewer_labels": self.visible_interviewers(),
            "topic": topic_value,
            "paragraphs": paragraphs,
            "output_format": {
                "matches": [{
                    "paragraph_id": "<paragraph id>",
                    "orientation": "<one of the allowed orientations, or null if none>",
                    "evidence": "<exact quote from the paragraph>",
                }],
            },
        });

        Ok(vec![ChatMessage::system(system), ChatMessage::user(render_payload(&payload)?)])
    }
}

fn render_payload(payload: &Value) -> Result<String> {
    serde_yaml::to_string(payload).context("Failed to render prompt payload")
}

/// Raw candidates per paragraph id, in response order
pub type RawCandidates = BTreeMap<String, Vec<Value>>;

/// Parse `{paragraphs: [{id, assignments: [...]}]}`
pub fn parse_segment_response(response: &Value) -> Result<RawCandidates, String> {
    let obj = response
        .as_object()
        .ok_or_else(|| "LLM returned non-object JSON".to_string())?;
    let items = obj
        .get("paragraphs")
        .and_then(Value::as_array)
        .ok_or_else(|| "LLM response missing 'paragraphs' list".to_string())?;

    let mut out = RawCandidates::new();
    for item in items {
        let (Some(id), Some(assignments)) = (
            item.get("id").and_then(Value::as_str),
            item.get("assignments").and_then(Value::as_array),
        ) else {
            continue;
        };
        out.entry(id.to_string())
            .or_default()
            .extend(assignments.iter().cloned());
    }
    Ok(out)
}

/// Parse `{matches: [{paragraph_id, orientation, evidence}]}` for one topic.
///
/// Each match is rewritten into a candidate object carrying `topic`.
pub fn parse_topic_response(topic: &str, response: &Value) -> Result<RawCandidates, String> {
    let obj = response
        .as_object()
        .ok_or_else(|| format!("{}: LLM returned non-object JSON", topic))?;
    let matches = obj
        .get("matches")
        .and_then(Value::as_array)
        .ok_or_else(|| format!("{}: missing matches list", topic))?;

    let mut out = RawCandidates::new();
    for item in matches {
        let Some(pid) = item.get("paragraph_id").and_then(Value::as_str) else {
            continue;
        };
        let candidate = json!({
            "topic": topic,
            "orientation": item.get("orientation").cloned().unwrap_or(Value::Null),
            "evidence": item.get("evidence").cloned().unwrap_or(Value::Null),
        });
        out.entry(pid.to_string()).or_default().push(candidate);
    }
    Ok(out)
}
