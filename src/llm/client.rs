//! Chat-completion HTTP client.
//!
//! Wire format: POST `{ model, messages: [{ role: "user", content }] }` with
//! bearer auth; the reply is the first choice's message content.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Chat-completion failures. All of them collapse into one generic
/// user-facing message; the interview flow advances regardless.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat API error {status}: {body}")]
    Api { status: reqwest::StatusCode, body: String },

    #[error("chat API returned no choices")]
    EmptyResponse,
}

/// The remote chat-completion collaborator, as the submission flow sees it.
#[async_trait]
pub trait ChatApi {
    /// Send one user message and return the assistant's reply.
    async fn complete(&self, content: &str) -> Result<String, ChatError>;
}

/// reqwest-backed chat client.
pub struct ChatClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &AppConfig) -> Result<Self> {
        info!("Chat endpoint: {} (model {})", config.chat_url, config.chat_model);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, url: config.chat_url.clone(), api_key: config.api_key.clone(), model: config.chat_model.clone() })
    }
}

#[async_trait]
impl ChatApi for ChatClient {
    async fn complete(&self, content: &str) -> Result<String, ChatError> {
        debug!("User message: \"{}\"", content);

        // An empty message is allowed and sent as-is
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage { role: "user", content: content.to_string() }],
        };

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Api { status, body });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        let reply = extract_reply(parsed)?;

        debug!("Assistant reply: \"{}\"", reply);
        Ok(reply)
    }
}

/// The reply is the first choice's message content; a response with no
/// choices is an error.
fn extract_reply(response: ChatCompletionResponse) -> Result<String, ChatError> {
    response.choices.into_iter().next().map(|choice| choice.message.content).ok_or(ChatError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = ChatCompletionRequest {
            model: "gpt-3.5-turbo".to_string(),
            messages: vec![ChatMessage { role: "user", content: "I love distributed systems".to_string() }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "gpt-3.5-turbo",
                "messages": [{ "role": "user", "content": "I love distributed systems" }]
            })
        );
    }

    #[test]
    fn test_response_first_choice_is_reply() {
        let body = r#"{"choices":[{"message":{"content":"Great answer!"}},{"message":{"content":"ignored"}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(extract_reply(parsed).unwrap(), "Great answer!");
    }

    #[test]
    fn test_response_without_choices_is_rejected() {
        let parsed: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(extract_reply(parsed), Err(ChatError::EmptyResponse)));
    }
}
