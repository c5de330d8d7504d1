//! OpenAI-compatible chat-completion client for LLM-assisted planning.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

const PLAN_CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageOwned,
}

#[derive(Deserialize)]
struct ChatMessageOwned {
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

pub struct LlmClient {
    config: LlmConfig,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self { config, http: reqwest::Client::new() }
    }

    /// Sends `system_prompt` + `user_text` to the configured endpoint and
    /// returns the raw assistant content.
    pub async fn complete(&self, system_prompt: &str, user_text: &str) -> Result<String, DomainError> {
        let url = format!("{}/v1/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage { role: "system", content: system_prompt },
                ChatMessage { role: "user", content: user_text },
            ],
            temperature: 0.0,
            max_tokens: 2048,
        };

        let mut request = self.http.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = tokio::time::timeout(PLAN_CALL_TIMEOUT, request.send())
            .await
            .map_err(|_| DomainError::timeout("LLM plan call timed out"))?
            .map_err(|e| DomainError::internal(format!("LLM request failed: {e}")))?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| DomainError::internal(format!("LLM response decode failed: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| DomainError::internal("LLM response contained no choices"))
    }
}

/// System prompt constraining the model to emit Plan JSON only.
pub const PLAN_SYSTEM_PROMPT: &str = r#"You are a task planner for a LAN compute mesh. Given a user request and a \
JSON array of available devices, respond with ONLY a JSON object of the \
shape {"groups":[{"index":0,"tasks":[{"kind":"SYSINFO|ECHO|LLM_GENERATE|IMAGE_GENERATE","input":"...","target_device_id":"...","prompt_tokens":0,"max_output_tokens":0}]}]}. \
Do not include any prose before or after the JSON."#;
