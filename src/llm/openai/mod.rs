#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{AnswerGenerator, ChatMessage, LlmError, Prompt};
use crate::config::LlmConfig;
use crate::http::{self, JsonClient};

/// Client for OpenAI-compatible `/chat/completions` endpoints.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: JsonClient,
    endpoint: Url,
    model: String,
    api_key: Option<String>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatClient {
    #[inline]
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = if config.api_key_env.is_empty() {
            None
        } else {
            Some(
                env::var(&config.api_key_env)
                    .map_err(|_| LlmError::MissingApiKey(config.api_key_env.clone()))?,
            )
        };

        Ok(Self {
            http: JsonClient::new(
                Duration::from_secs(config.timeout_secs),
                config.retry_attempts,
            ),
            endpoint: http::endpoint(&config.base_url, "chat/completions")?,
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
        })
    }

    #[inline]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.http.set_retry_attempts(attempts);
        self
    }

    #[inline]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.http.set_backoff(backoff);
        self
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl AnswerGenerator for ChatClient {
    #[inline]
    fn generate(&self, prompt: &Prompt) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: prompt.messages(),
            temperature: self.temperature,
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| LlmError::Decode(format!("failed to encode request: {}", e)))?;

        debug!(
            "Requesting answer from {} with {} messages",
            self.model,
            prompt.messages().len()
        );
        let response_text = self
            .http
            .post(&self.endpoint, self.api_key.as_deref(), &request_json)?;

        let response: ChatResponse =
            serde_json::from_str(&response_text).map_err(|e| LlmError::Decode(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}
