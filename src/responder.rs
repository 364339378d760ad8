//! Reply generation via an OpenAI-compatible chat completions API.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmConfig;

pub struct Responder {
    http: reqwest::Client,
    config: LlmConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl Responder {
    pub fn new(config: LlmConfig) -> Self {
        Responder {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Generate a reply to `message`.
    pub async fn generate(&self, message: &str) -> Result<String> {
        debug!("generating response for: {:.50}", message);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.config.prompt,
                },
                ChatMessage {
                    role: "user",
                    content: message,
                },
            ],
        };

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response: ChatResponse = self
            .http
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(&request)
            .send()
            .await
            .context("chat completions request failed")?
            .error_for_status()
            .context("chat completions request rejected")?
            .json()
            .await
            .context("malformed chat completions response")?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("chat completions response had no content"))?;
        Ok(content.trim().to_string())
    }
}
