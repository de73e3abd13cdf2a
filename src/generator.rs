//! Chat generator capability.
//!
//! The generator model is an external collaborator reached through the
//! [`ChatGenerator`] trait. The bundled implementation talks to an
//! Ollama-compatible chat endpoint over HTTP.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::GeneratorConfig;

/// Generator-related errors.
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid generator response: {0}")]
    InvalidResponse(String),
}

/// Narrow interface to the chat model: one prompt in, one completion out.
#[async_trait]
pub trait ChatGenerator: Send + Sync {
    /// Generate a completion for the user prompt, optionally under a
    /// system instruction.
    async fn generate(
        &self,
        system: Option<&str>,
        user: &str,
    ) -> Result<String, GeneratorError>;

    /// Label identifying the model, surfaced in response metadata.
    fn model_label(&self) -> String;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

#[derive(Deserialize)]
struct OllamaMessage {
    content: String,
}

/// Chat generator backed by an Ollama-compatible `/api/chat` endpoint.
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl ChatGenerator for OllamaGenerator {
    async fn generate(
        &self,
        system: Option<&str>,
        user: &str,
    ) -> Result<String, GeneratorError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user,
        });

        let request = OllamaChatRequest {
            model: &self.model,
            messages,
            stream: false,
        };

        debug!(model = %self.model, "Calling chat generator");
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::InvalidResponse(e.to_string()))?;

        if body.message.content.is_empty() {
            return Err(GeneratorError::InvalidResponse(
                "empty completion".to_string(),
            ));
        }
        Ok(body.message.content)
    }

    fn model_label(&self) -> String {
        self.model.clone()
    }
}
