//! Question-answering provider abstraction and the Gemini implementation.
//!
//! A [`QaProvider`] opens a [`ChatSession`] primed with a history of
//! [`ChatTurn`]s; each [`send_message`](ChatSession::send_message) returns
//! the model's reply as plain text. Sessions are cheap, owned by the caller,
//! and never persisted.
//!
//! # Gemini
//!
//! [`GeminiProvider`] calls
//! `POST {base_url}/v1beta/models/{model}:generateContent` with the whole
//! conversation in `contents`. Failures (non-2xx, transport errors, empty
//! candidates) are returned as errors without retry.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::QaConfig;
use crate::models::ChatTurn;

/// Opens conversational sessions with an LLM.
pub trait QaProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-1.5-flash"`).
    fn model_name(&self) -> &str;

    /// Starts a new session whose history is exactly `priming`.
    fn start_session(&self, priming: Vec<ChatTurn>) -> Box<dyn ChatSession>;
}

/// A live conversation.
#[async_trait]
pub trait ChatSession: Send {
    /// Sends a user message and returns the model's reply text verbatim.
    ///
    /// On success the user turn and the reply are appended to the history.
    async fn send_message(&mut self, message: &str) -> Result<String>;

    /// The turns exchanged so far, priming included.
    fn history(&self) -> &[ChatTurn];
}

/// Sampling parameters forwarded as Gemini's `generationConfig`.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

impl From<&QaConfig> for GenerationConfig {
    fn from(config: &QaConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            max_output_tokens: config.max_output_tokens,
            response_mime_type: "text/plain".to_string(),
        }
    }
}

struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    generation: GenerationConfig,
}

/// [`QaProvider`] backed by the Google Gemini `generateContent` API.
pub struct GeminiProvider {
    client: Arc<GeminiClient>,
}

impl GeminiProvider {
    /// Builds a provider from config and an explicit API key.
    pub fn new(config: &QaConfig, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            bail!("Gemini API key must not be empty");
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client: Arc::new(GeminiClient {
                http,
                api_key,
                model: config.model.clone(),
                base_url: config.base_url.trim_end_matches('/').to_string(),
                generation: GenerationConfig::from(config),
            }),
        })
    }

    /// Builds a provider with the key from the environment. Fails if unset.
    pub fn from_env(config: &QaConfig) -> Result<Self> {
        let api_key = config.api_key_from_env()?;
        Self::new(config, api_key)
    }
}

impl QaProvider for GeminiProvider {
    fn model_name(&self) -> &str {
        &self.client.model
    }

    fn start_session(&self, priming: Vec<ChatTurn>) -> Box<dyn ChatSession> {
        Box::new(GeminiSession {
            client: self.client.clone(),
            history: priming,
        })
    }
}

struct GeminiSession {
    client: Arc<GeminiClient>,
    history: Vec<ChatTurn>,
}

#[async_trait]
impl ChatSession for GeminiSession {
    async fn send_message(&mut self, message: &str) -> Result<String> {
        let client = &self.client;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            client.base_url, client.model
        );

        let mut turns = self.history.clone();
        turns.push(ChatTurn::user(message));
        let body = build_request_body(&turns, &client.generation);

        let response = client
            .http
            .post(&url)
            .header("x-goog-api-key", &client.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Gemini request to model {} failed", client.model))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Gemini API error {}: {}", status, body_text);
        }

        let json: Value = response.json().await?;
        let answer = parse_response(&json)?;

        turns.push(ChatTurn::model(answer.clone()));
        self.history = turns;
        Ok(answer)
    }

    fn history(&self) -> &[ChatTurn] {
        &self.history
    }
}

/// Builds the `generateContent` request body for a full conversation.
pub fn build_request_body(turns: &[ChatTurn], generation: &GenerationConfig) -> Value {
    let contents: Vec<Value> = turns
        .iter()
        .map(|t| {
            json!({
                "role": t.role.as_str(),
                "parts": [{ "text": t.text }],
            })
        })
        .collect();

    json!({
        "contents": contents,
        "generationConfig": {
            "temperature": generation.temperature,
            "topP": generation.top_p,
            "topK": generation.top_k,
            "maxOutputTokens": generation.max_output_tokens,
            "responseMimeType": generation.response_mime_type,
        },
    })
}

/// Extracts the reply text from a `generateContent` response.
///
/// Concatenates the `text` of every part of the first candidate. A prompt
/// blocked by safety filters has no candidates and is reported as an error.
pub fn parse_response(json: &Value) -> Result<String> {
    let candidate = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| {
            let reason = json
                .pointer("/promptFeedback/blockReason")
                .and_then(|r| r.as_str())
                .unwrap_or("no candidates returned");
            anyhow!("Invalid Gemini response: {}", reason)
        })?;

    let parts = candidate
        .pointer("/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| {
            let reason = candidate
                .get("finishReason")
                .and_then(|r| r.as_str())
                .unwrap_or("missing content");
            anyhow!("Invalid Gemini response: {}", reason)
        })?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generation() -> GenerationConfig {
        GenerationConfig::from(&QaConfig::default())
    }

    #[test]
    fn request_body_carries_roles_and_sampling() {
        let turns = vec![
            ChatTurn::user("context"),
            ChatTurn::model("ready"),
            ChatTurn::user("question?"),
        ];
        let body = build_request_body(&turns, &generation());

        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "question?");

        let cfg = &body["generationConfig"];
        assert_eq!(cfg["topK"], 64);
        assert_eq!(cfg["maxOutputTokens"], 8192);
        assert_eq!(cfg["responseMimeType"], "text/plain");
    }

    #[test]
    fn parse_joins_candidate_parts() {
        let json = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{ "text": "Hello, " }, { "text": "world." }]
                },
                "finishReason": "STOP"
            }]
        });
        assert_eq!(parse_response(&json).unwrap(), "Hello, world.");
    }

    #[test]
    fn parse_reports_block_reason() {
        let json = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = parse_response(&json).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn parse_reports_missing_content() {
        let json = json!({ "candidates": [{ "finishReason": "MAX_TOKENS" }] });
        let err = parse_response(&json).unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(GeminiProvider::new(&QaConfig::default(), "  ").is_err());
    }

    #[test]
    fn session_starts_with_priming_history() {
        let provider = GeminiProvider::new(&QaConfig::default(), "test-key").unwrap();
        assert_eq!(provider.model_name(), "gemini-1.5-flash");

        let session = provider.start_session(vec![ChatTurn::user("a"), ChatTurn::model("b")]);
        assert_eq!(session.history().len(), 2);
    }
}
