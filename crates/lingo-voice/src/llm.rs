//! **Language model** collaborator: one trait, one OpenAI-compatible client.
//!
//! The session uses the model twice: a tiny constrained query for intent
//! classification and a normal completion for replies. Both go through
//! [`LanguageModel::complete`]; callers decide the output cap.

use crate::config::ModelConfig;
use crate::error::{VoiceError, VoiceResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// One completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub max_output_tokens: u32,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, max_output_tokens: u32) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_output_tokens,
            temperature: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Text completion backend. Implement for a hosted API or a local model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `request`. May fail with a transport, status or timeout error.
    async fn complete(&self, request: &CompletionRequest) -> VoiceResult<String>;
}

/// Mode for LLM invocation: mock (deterministic, offline) or live (calls the API).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmMode {
    #[default]
    Mock,
    Live,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible `/chat/completions` client (Groq, OpenRouter, OpenAI, local servers).
#[derive(Debug, Clone)]
pub struct ChatCompletionModel {
    mode: LlmMode,
    api_url: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl ChatCompletionModel {
    /// Build from resolved configuration. Live mode requires an API key.
    pub fn from_config(config: &ModelConfig) -> VoiceResult<Self> {
        let api_key = config.resolved_api_key();
        if config.mode == LlmMode::Live && api_key.is_none() {
            return Err(VoiceError::Config(
                "live LLM mode requires LINGO_LLM_API_KEY, GROQ_API_KEY, or OPENROUTER_API_KEY".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            mode: config.mode,
            api_url: config.api_url.clone(),
            api_key,
            model: config.model.clone(),
            client,
        })
    }

    pub fn mode(&self) -> LlmMode {
        self.mode
    }

    /// Mock LLM: deterministic echo, never a bare language code.
    fn mock_complete(&self, request: &CompletionRequest) -> String {
        let preview: String = request.prompt.chars().take(80).collect();
        format!("[mock reply] {}", preview)
    }

    async fn live_complete(&self, request: &CompletionRequest) -> VoiceResult<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| VoiceError::Config("missing LLM API key".to_string()))?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref().filter(|s| !s.is_empty()) {
            messages.push(ChatMessage { role: "system", content: system });
        }
        messages.push(ChatMessage { role: "user", content: &request.prompt });

        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_output_tokens,
        };

        debug!(model = %self.model, max_tokens = request.max_output_tokens, "dispatching chat completion");

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::ModelStatus {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response.json().await?;
        Ok(chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionModel {
    async fn complete(&self, request: &CompletionRequest) -> VoiceResult<String> {
        match self.mode {
            LlmMode::Mock => Ok(self.mock_complete(request)),
            LlmMode::Live => self.live_complete(request).await,
        }
    }
}
