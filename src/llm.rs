//! Chat-completions client
//!
//! Thin HTTP client for an OpenAI-compatible chat endpoint (Groq by
//! default). Sends one user message, returns the first choice's text. No
//! retries; the caller decides what to do with a failure.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::LlmConfig;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API key missing: set the {0} environment variable")]
    MissingApiKey(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Chat endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Chat endpoint returned no choices")]
    EmptyResponse,
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

impl Serialize for LlmError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        LlmError::Http(e.to_string())
    }
}

/// A model that turns a prompt into a completion
pub trait ChatModel {
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String, LlmError>> + Send;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Pull the first choice's text out of a chat-completions body
fn first_choice(body: &str) -> Result<String, LlmError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Deserialize(format!("{}: {}", e, body)))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or(LlmError::EmptyResponse)
}

/// Groq (or any OpenAI-compatible) chat client
#[derive(Clone)]
pub struct GroqClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl GroqClient {
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Build from config, reading the key from the configured environment variable
    pub fn from_env(config: &LlmConfig) -> Result<Self, LlmError> {
        let key = config
            .api_key()
            .ok_or_else(|| LlmError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config, key)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        }
    }
}

impl ChatModel for GroqClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, prompt_chars = prompt.len(), "Sending chat completion");

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request(prompt))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            error!(status = %status, "Chat completion failed");
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let answer = first_choice(&body)?;
        info!(model = %self.model, answer_chars = answer.len(), "Chat completion received");
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GroqClient {
        GroqClient::new(&LlmConfig::default(), "test-key").unwrap()
    }

    #[test]
    fn test_request_body() {
        let client = client();
        let body = serde_json::to_value(client.request("diagnose this")).unwrap();
        assert_eq!(body["model"], "llama3-8b-8192");
        assert_eq!(body["max_tokens"], 1500);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "diagnose this");
        assert!((body["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = LlmConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..LlmConfig::default()
        };
        let client = GroqClient::new(&config, "k").unwrap();
        assert_eq!(client.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_first_choice() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "{\"mission\": \"m\"}"}}]}"#;
        assert_eq!(first_choice(body).unwrap(), r#"{"mission": "m"}"#);
    }

    #[test]
    fn test_empty_choices() {
        assert!(matches!(first_choice(r#"{"choices": []}"#), Err(LlmError::EmptyResponse)));
        assert!(matches!(
            first_choice(r#"{"choices": [{"message": {"content": null}}]}"#),
            Err(LlmError::EmptyResponse)
        ));
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(first_choice("<html>"), Err(LlmError::Deserialize(_))));
    }

    #[test]
    fn test_missing_key() {
        let config = LlmConfig {
            api_key_env: "SKILLSCOPE_TEST_NO_SUCH_KEY_91C2".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(GroqClient::from_env(&config), Err(LlmError::MissingApiKey(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_http_error() {
        let config = LlmConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..LlmConfig::default()
        };
        let client = GroqClient::new(&config, "k").unwrap();
        assert!(matches!(client.complete("hi").await, Err(LlmError::Http(_))));
    }
}
