//! Codebook: the topics a transcript is coded against.
//!
//! Topics are declared in `interviews.yaml` (see `config`) as `TopicSpec`s and
//! normalized here into the structure that is sent to the model and stored
//! in analysis work files. Orientation order encodes rank, highest first.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::fingerprint::content_digest;

/// An orientation label with an optional selection hint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orientation {
    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Orientation {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A topic as declared in the configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSpec {
    pub name: String,
    pub orientations: Vec<Orientation>,
    pub description: Option<String>,
    pub allow_multiple_orientations: bool,
}

impl TopicSpec {
    /// A topic without orientations
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            orientations: Vec::new(),
            description: None,
            allow_multiple_orientations: false,
        }
    }

    pub fn with_orientations<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.orientations = labels.into_iter().map(Orientation::new).collect();
        self
    }

    pub fn allow_multiple(mut self, allow: bool) -> Self {
        self.allow_multiple_orientations = allow;
        self
    }
}

/// A normalized codebook topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    /// Positional id (`t1`, `t2`, ...)
    pub id: String,

    /// Topic name
    pub topic: String,

    /// Orientation labels, highest rank first
    #[serde(default)]
    pub orientations: Vec<String>,

    #[serde(default)]
    pub allow_multiple_orientations: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orientation_details: Vec<Orientation>,
}

/// The full codebook
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Codebook {
    pub topics: Vec<Topic>,
}

impl Codebook {
    /// Normalize configured topics: trims labels, drops blank ones and assigns ids
    pub fn build(specs: &[TopicSpec]) -> Self {
        let topics = specs
            .iter()
            .enumerate()
            .map(|(idx, spec)| {
                let orientation_details: Vec<Orientation> = spec
                    .orientations
                    .iter()
                    .filter_map(|o| {
                        let label = o.label.trim();
                        if label.is_empty() {
                            return None;
                        }
                        Some(Orientation {
                            label: label.to_string(),
                            description: non_blank(o.description.as_deref()),
                        })
                    })
                    .collect();

                Topic {
                    id: format!("t{}", idx + 1),
                    topic: spec.name.trim().to_string(),
                    orientations: orientation_details.iter().map(|o| o.label.clone()).collect(),
                    allow_multiple_orientations: spec.allow_multiple_orientations,
                    description: non_blank(spec.description.as_deref()),
                    orientation_details,
                }
            })
            .collect();

        Self { topics }
    }

    /// Look up a topic by name
    pub fn topic(&self, name: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.topic == name)
    }

    /// Allowed orientation labels for a topic (empty for unknown topics)
    pub fn allowed_orientations(&self, name: &str) -> &[String] {
        self.topic(name).map(|t| t.orientations.as_slice()).unwrap_or(&[])
    }

    /// Stable content hash over the canonical JSON rendering.
    ///
    /// `serde_json` maps are sorted by key, so the rendering is independent of
    /// field declaration order.
    pub fn hash(&self) -> Result<String> {
        let value = serde_json::to_value(self).context("Failed to serialize codebook")?;
        let canonical = serde_json::to_string(&value).context("Failed to render codebook")?;
        Ok(content_digest(canonical.as_bytes()))
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
