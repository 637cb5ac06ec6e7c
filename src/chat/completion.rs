use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::message::ChatMessage;
use crate::config::ChatConfig;

/// Produces the assistant's answer for a conversation window.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String>;
}

/// Client for an OpenAI-compatible `chat/completions` endpoint (OpenRouter by default).
pub struct OpenRouterClient {
    client: Client,
    url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenRouterClient {
    pub fn new(config: &ChatConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("build chat http client")?;
        Ok(Self {
            client,
            url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl CompletionClient for OpenRouterClient {
    async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest {
                model: &self.model,
                messages,
            })
            .send()
            .await
            .context("send chat completion request")?
            .error_for_status()
            .context("chat completion status")?;

        let body: CompletionResponse = response
            .json()
            .await
            .context("decode chat completion response")?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .context("chat completion had no choices")?;

        let answer = clean_answer(&content);
        if answer.is_empty() {
            anyhow::bail!("chat completion answer was empty");
        }
        debug!(chars = answer.len(), "chat completion received");
        Ok(answer)
    }
}

/// Turns escaped newlines into real ones and strips markdown emphasis and headings.
pub fn clean_answer(raw: &str) -> String {
    raw.replace("\\n", "\n")
        .replace(['*', '#'], "")
        .trim()
        .to_string()
}
