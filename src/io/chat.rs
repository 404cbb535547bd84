//! Chat-completions message formatter
//!
//! Rewrites the wording of an already-made alert decision through an
//! OpenAI-compatible chat completions endpoint (Groq by default). The
//! decision fields are passed in as facts; only the returned text is used.

use crate::domain::types::{AlertDecision, Direction};
use crate::infra::config::Config;
use crate::services::messages::MessageFormatter;
use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Longest message we are willing to display or speak
const MAX_MESSAGE_CHARS: usize = 160;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct ChatFormatter {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    vehicle_label: String,
}

impl ChatFormatter {
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: &str,
        vehicle_label: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        // Client created once for connection pooling
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build chat HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            vehicle_label: vehicle_label.to_string(),
        })
    }

    /// Build from config; fails when the API key variable is unset or empty
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let key_env = config.formatter_api_key_env();
        let api_key = std::env::var(key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("{key_env} is not set"))?;

        Self::new(
            config.formatter_endpoint(),
            config.formatter_model(),
            &api_key,
            config.vehicle_label(),
            Duration::from_millis(config.formatter_timeout_ms()),
        )
    }

    fn request_body(&self, decision: &AlertDecision) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "temperature": 0.3,
            "max_tokens": 50,
            "messages": [
                {
                    "role": "system",
                    "content": "You write short, calm, actionable voice alerts for drivers \
                                when an emergency vehicle approaches. Reply with the alert \
                                text only, at most 15 words.",
                },
                {
                    "role": "user",
                    "content": build_prompt(decision, &self.vehicle_label),
                },
            ],
        })
    }
}

/// Prompt stating the decision as fixed facts
fn build_prompt(decision: &AlertDecision, vehicle_label: &str) -> String {
    let instruction = match decision.direction {
        Direction::Left => "move to the LEFT",
        Direction::Right => "move to the RIGHT",
        Direction::ClearAhead => "clear the lane ahead by moving aside",
        Direction::StayPut => "carry on driving normally",
    };

    format!(
        "{vehicle_label} is {:.0} meters away. Urgency: {}. The driver must {instruction}. \
         Do not change the direction or the urgency.",
        decision.distance_meters, decision.urgency
    )
}

/// Extract and sanity-check the completion text
fn parse_completion(body: &[u8]) -> anyhow::Result<String> {
    let response: ChatResponse =
        serde_json::from_slice(body).context("Failed to parse chat completion response")?;

    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|t| t.trim().trim_matches('"').trim().to_string())
        .unwrap_or_default();

    if text.is_empty() {
        bail!("chat completion returned no text");
    }
    if text.chars().count() > MAX_MESSAGE_CHARS {
        bail!("chat completion too long ({} chars)", text.chars().count());
    }
    Ok(text)
}

#[async_trait]
impl MessageFormatter for ChatFormatter {
    async fn format(&self, decision: &AlertDecision) -> anyhow::Result<String> {
        let body = serde_json::to_vec(&self.request_body(decision))?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .context("Chat completion request failed")?;

        let status = response.status();
        let bytes = response.bytes().await.context("Failed to read chat completion body")?;
        if !status.is_success() {
            bail!("chat completion returned HTTP {}", status.as_u16());
        }

        let text = parse_completion(&bytes)?;
        debug!(chars = %text.len(), "chat_completion_received");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Urgency;

    fn decision() -> AlertDecision {
        AlertDecision {
            fired: true,
            direction: Direction::Right,
            urgency: Urgency::High,
            distance_meters: 212.4,
            message: "Move RIGHT! Ambulance approaching 212m away!".to_string(),
            vehicle_id: None,
        }
    }

    #[test]
    fn test_prompt_states_decision() {
        let prompt = build_prompt(&decision(), "Ambulance");
        assert!(prompt.contains("212 meters"));
        assert!(prompt.contains("HIGH"));
        assert!(prompt.contains("RIGHT"));
    }

    #[test]
    fn test_request_body_shape() {
        let formatter = ChatFormatter::new(
            "http://localhost:9/v1/chat/completions",
            "test-model",
            "key",
            "Ambulance",
            Duration::from_millis(100),
        )
        .unwrap();
        let body = formatter.request_body(&decision());
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
    }

    #[test]
    fn test_parse_completion() {
        let body = br#"{"choices":[{"message":{"role":"assistant","content":" \"Move right now, ambulance behind!\" "}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "Move right now, ambulance behind!");
    }

    #[test]
    fn test_parse_completion_rejects_empty_or_garbage() {
        assert!(parse_completion(br#"{"choices":[]}"#).is_err());
        assert!(parse_completion(br#"{"choices":[{"message":{"content":"   "}}]}"#).is_err());
        assert!(parse_completion(b"not json").is_err());

        let long = format!(r#"{{"choices":[{{"message":{{"content":"{}"}}}}]}}"#, "a".repeat(400));
        assert!(parse_completion(long.as_bytes()).is_err());
    }
}
