use async_trait::async_trait;
use prepcast_core::{PrepcastError, PrepcastResult};
use serde_json::json;
use std::time::Duration;
use tracing::info;

/// Upper bound on one generation call unless overridden with `with_timeout`.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// One text-generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_prompt: Option<String>,
    pub prompt: String,
    pub temperature: f64,
    pub max_tokens: u64,
}

/// Produces narrative text from a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> PrepcastResult<String>;
}

/// OpenAI-compatible chat completions client.
///
/// Works with OpenAI and any provider exposing `/v1/chat/completions`.
pub struct OpenAiGenerator {
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl OpenAiGenerator {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com";
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: Self::DEFAULT_MODEL.to_string(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_GENERATION_TIMEOUT,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_messages(&self, request: &GenerationRequest) -> Vec<serde_json::Value> {
        let mut messages = Vec::with_capacity(2);
        if let Some(sys) = &request.system_prompt {
            messages.push(json!({ "role": "system", "content": sys }));
        }
        messages.push(json!({ "role": "user", "content": request.prompt }));
        messages
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> PrepcastResult<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "messages": self.build_messages(request),
        });

        let resp = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| PrepcastError::Http(e.to_string()))?;

        let status = resp.status();
        let resp_body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| PrepcastError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(PrepcastError::Http(format!(
                "OpenAI API error {status}: {resp_body}"
            )));
        }

        let text = parse_completion(&resp_body)?;
        info!(model = %self.model, chars = text.len(), "Generated explanation text");
        Ok(text)
    }
}

/// Pull the first choice's message content out of a chat completion body.
pub fn parse_completion(body: &serde_json::Value) -> PrepcastResult<String> {
    let content = body["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or_default()
        .trim();
    if content.is_empty() {
        return Err(PrepcastError::Http(
            "completion response contained no text".to_string(),
        ));
    }
    Ok(content.to_string())
}

/// Anthropic Messages API client.
pub struct AnthropicGenerator {
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl AnthropicGenerator {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.anthropic.com";
    pub const DEFAULT_MODEL: &'static str = "claude-3-5-sonnet-latest";
    pub const API_VERSION: &'static str = "2023-06-01";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: Self::DEFAULT_MODEL.to_string(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_GENERATION_TIMEOUT,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl TextGenerator for AnthropicGenerator {
    async fn generate(&self, request: &GenerationRequest) -> PrepcastResult<String> {
        let url = format!("{}/v1/messages", self.base_url);
        let mut body = json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": [{ "role": "user", "content": request.prompt }],
        });
        // the Messages API takes the system prompt outside the message list
        if let Some(sys) = &request.system_prompt {
            body["system"] = json!(sys);
        }

        let resp = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", Self::API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| PrepcastError::Http(e.to_string()))?;

        let status = resp.status();
        let resp_body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| PrepcastError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(PrepcastError::Http(format!(
                "Anthropic API error {status}: {resp_body}"
            )));
        }

        let text = parse_messages_response(&resp_body)?;
        info!(model = %self.model, chars = text.len(), "Generated explanation text");
        Ok(text)
    }
}

/// Join the text blocks of a Messages API response.
pub fn parse_messages_response(body: &serde_json::Value) -> PrepcastResult<String> {
    let blocks = body["content"]
        .as_array()
        .ok_or_else(|| PrepcastError::Http("missing content in messages response".into()))?;

    let text = blocks
        .iter()
        .filter(|block| block["type"] == "text")
        .filter_map(|block| block["text"].as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim();
    if text.is_empty() {
        return Err(PrepcastError::Http(
            "messages response contained no text".to_string(),
        ));
    }
    Ok(text.to_string())
}
