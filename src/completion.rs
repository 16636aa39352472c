use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::CompletionConfig;

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("request to completion provider failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion provider returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid completion response: {0}")]
    Decode(String),

    #[error("completion response had no message content")]
    EmptyContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Output bound sent upstream; providers take one or the other.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sampling {
    MaxTokens(u32),
    Temperature(f32),
}

impl From<&CompletionConfig> for Sampling {
    fn from(cfg: &CompletionConfig) -> Self {
        match cfg.temperature {
            Some(t) => Sampling::Temperature(t),
            None => Sampling::MaxTokens(cfg.max_tokens),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub sampling: Sampling,
}

impl CompletionRequest {
    pub fn new(system_prompt: &str, user_prompt: String, sampling: Sampling) -> Self {
        let mut messages = Vec::with_capacity(2);
        if !system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: Role::System,
                content: system_prompt.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: Role::User,
            content: user_prompt,
        });
        Self { messages, sampling }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult {
    pub plan_text: String,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, req: CompletionRequest) -> Result<CompletionResult, CompletionError>;
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// OpenAI-compatible `/chat/completions` client.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(cfg: &CompletionConfig) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = cfg.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            api_key: cfg.api_key.clone(),
            endpoint: format!("{}/chat/completions", cfg.base_url),
            model: cfg.model.clone(),
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, req: CompletionRequest) -> Result<CompletionResult, CompletionError> {
        let (max_tokens, temperature) = match req.sampling {
            Sampling::MaxTokens(n) => (Some(n), None),
            Sampling::Temperature(t) => (None, Some(t)),
        };
        let body = ChatCompletionBody {
            model: &self.model,
            messages: &req.messages,
            max_tokens,
            temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let parsed: ChatCompletionResponse =
            serde_json::from_slice(&bytes).map_err(|e| CompletionError::Decode(e.to_string()))?;

        let plan_text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or(CompletionError::EmptyContent)?;

        debug!(model = %self.model, chars = plan_text.len(), "completion received");
        Ok(CompletionResult { plan_text })
    }
}
