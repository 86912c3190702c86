//! OpenAI-compatible chat completions adapter.
//!
//! Environment variables:
//! - `LLM_OPENAI_API_KEY`: API key (required)
//! - `LLM_OPENAI_MODEL`: Model identifier (required)
//! - `LLM_OPENAI_BASE_URL`: Base URL ending in `/v1` (preferred)
//! - `LLM_OPENAI_HOST` / `LLM_OPENAI_PATH`: Legacy host and path

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{AdapterError, ChatMessage, ChatRequest, ChatRole, LlmAdapter};

/// Endpoint settings for an OpenAI-compatible API
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub model: String,

    /// Base URL, e.g. `https://api.openai.com/v1`
    pub base_url: String,
}

impl OpenAiSettings {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self, AdapterError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through a lookup function (used by tests)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AdapterError> {
        let require = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AdapterError::NotConfigured(name.to_string()))
        };

        let base_url = match lookup("LLM_OPENAI_BASE_URL").filter(|v| !v.trim().is_empty()) {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => {
                let host = require("LLM_OPENAI_HOST")?;
                let path = lookup("LLM_OPENAI_PATH").unwrap_or_default();
                let prefix = match path.split_once("/v1") {
                    Some((head, _)) => format!("{}/v1", head),
                    None => "/v1".to_string(),
                };
                format!("https://{}{}", host.trim_end_matches('/'), prefix)
            }
        };

        Ok(Self {
            api_key: require("LLM_OPENAI_API_KEY")?,
            model: require("LLM_OPENAI_MODEL")?,
            base_url,
        })
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// Chat completions response (only the fields we read)
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Adapter for OpenAI-compatible endpoints
pub struct OpenAiAdapter {
    settings: OpenAiSettings,
    client: reqwest::Client,
}

impl OpenAiAdapter {
    pub fn new(settings: OpenAiSettings) -> Self {
        Self {
            settings,
            client: reqwest::Client::new(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self, AdapterError> {
        Ok(Self::new(OpenAiSettings::from_env()?))
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }
}

#[async_trait]
impl LlmAdapter for OpenAiAdapter {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete_json(&self, request: &ChatRequest) -> Result<Value, AdapterError> {
        let messages = ensure_json_instruction(&request.messages);
        let body = json!({
            "model": self.settings.model,
            "messages": messages,
            "response_format": {"type": "json_object"},
        });

        debug!(model = %self.settings.model, messages = messages.len(), "Sending chat completion");

        let response = self
            .client
            .post(self.settings.completions_url())
            .bearer_auth(&self.settings.api_key)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AdapterError::Timeout(request.timeout)
                } else {
                    AdapterError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::InvalidResponse(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        parse_json_content(&content)
    }
}

/// Parse model output; empty content becomes `null`
pub fn parse_json_content(content: &str) -> Result<Value, AdapterError> {
    if content.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(content).map_err(|e| AdapterError::InvalidResponse(e.to_string()))
}

/// JSON mode requires the word "json" somewhere in the prompt
pub fn ensure_json_instruction(messages: &[ChatMessage]) -> Vec<ChatMessage> {
    if messages
        .iter()
        .any(|m| m.content.to_lowercase().contains("json"))
    {
        return messages.to_vec();
    }

    let mut patched = messages.to_vec();
    match patched.first_mut() {
        Some(first) if first.role == ChatRole::System => {
            first.content.push_str(" Respond with valid JSON.");
        }
        _ => patched.insert(0, ChatMessage::system("Respond with valid JSON.")),
    }
    patched
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_settings_prefer_base_url() {
        let settings = OpenAiSettings::from_lookup(lookup(&[
            ("LLM_OPENAI_API_KEY", "k"),
            ("LLM_OPENAI_MODEL", "m"),
            ("LLM_OPENAI_BASE_URL", "http://localhost:8080/v1/"),
            ("LLM_OPENAI_HOST", "ignored.example"),
        ]))
        .unwrap();
        assert_eq!(settings.completions_url(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_settings_legacy_host_and_path() {
        let settings = OpenAiSettings::from_lookup(lookup(&[
            ("LLM_OPENAI_API_KEY", "k"),
            ("LLM_OPENAI_MODEL", "m"),
            ("LLM_OPENAI_HOST", "llm.example.org"),
            ("LLM_OPENAI_PATH", "/proxy/v1/chat/completions"),
        ]))
        .unwrap();
        assert_eq!(settings.base_url, "https://llm.example.org/proxy/v1");

        let settings = OpenAiSettings::from_lookup(lookup(&[
            ("LLM_OPENAI_API_KEY", "k"),
            ("LLM_OPENAI_MODEL", "m"),
            ("LLM_OPENAI_HOST", "llm.example.org"),
        ]))
        .unwrap();
        assert_eq!(settings.base_url, "https://llm.example.org/v1");
    }

    #[test]
    fn test_settings_missing_variables() {
        let err = OpenAiSettings::from_lookup(lookup(&[("LLM_OPENAI_BASE_URL", "http://x/v1")])).unwrap_err();
        assert!(matches!(err, AdapterError::NotConfigured(ref v) if v == "LLM_OPENAI_API_KEY"));

        let err = OpenAiSettings::from_lookup(lookup(&[("LLM_OPENAI_API_KEY", "k"), ("LLM_OPENAI_MODEL", "m")]))
            .unwrap_err();
        assert!(matches!(err, AdapterError::NotConfigured(ref v) if v == "LLM_OPENAI_HOST"));
    }

    #[test]
    fn test_ensure_json_instruction() {
        let with_system = vec![ChatMessage::system("Code this."), ChatMessage::user("payload")];
        let patched = ensure_json_instruction(&with_system);
        assert_eq!(patched.len(), 2);
        assert_eq!(patched[0].content, "Code this. Respond with valid JSON.");

        let user_only = vec![ChatMessage::user("payload")];
        let patched = ensure_json_instruction(&user_only);
        assert_eq!(patched.len(), 2);
        assert_eq!(patched[0].role, ChatRole::System);

        let already = vec![ChatMessage::user("Return JSON")];
        assert_eq!(ensure_json_instruction(&already), already);
    }

    #[test]
    fn test_parse_json_content() {
        assert_eq!(parse_json_content("  ").unwrap(), Value::Null);
        assert_eq!(parse_json_content("{\"a\":1}").unwrap()["a"], 1);
        assert!(matches!(
            parse_json_content("not json"),
            Err(AdapterError::InvalidResponse(_))
        ));
    }
}
