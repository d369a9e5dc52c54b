use async_trait::async_trait;
use log::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::Provider;

/// Chat message format shared by all chat-completion providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

/// Chat-completion request
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<ChatMessage>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl ChatRequest {
    /// Create a new request for the given model
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into(), messages: Vec::new(), temperature: None }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage { role: role.into(), content: content.into() });
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Chat-completion response
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    /// The completion choices
    pub choices: Vec<ChatChoice>,
}

/// A single completion choice
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    /// The response message
    pub message: ChatMessage,
}

/// Client for chat-completion style translation providers.
///
/// One implementation covers every paid provider; the differences are
/// data: endpoint, model, timeout, and extra headers.
#[derive(Debug)]
pub struct ChatClient {
    /// HTTP client with the provider's timeout baked in
    client: Client,
    /// Provider identifier for logs
    name: &'static str,
    /// Chat-completions endpoint URL
    endpoint: String,
    /// Model identifier sent with every request
    model: String,
    /// API key for authentication
    api_key: String,
    /// Extra static headers (name, value) the endpoint requires
    extra_headers: Vec<(&'static str, &'static str)>,
    /// Sampling temperature
    temperature: f32,
}

impl ChatClient {
    fn build(
        name: &'static str,
        endpoint: &str,
        model: &str,
        api_key: impl Into<String>,
        timeout_secs: u64,
        extra_headers: Vec<(&'static str, &'static str)>,
        temperature: f32,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            name,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: api_key.into(),
            extra_headers,
            temperature,
        }
    }

    /// DeepSeek chat API
    pub fn deepseek(api_key: impl Into<String>) -> Self {
        Self::build(
            "deepseek",
            "https://api.deepseek.com/v1/chat/completions",
            "deepseek-chat",
            api_key,
            60,
            Vec::new(),
            0.3,
        )
    }

    /// Zhipu GLM chat API
    pub fn zhipu(api_key: impl Into<String>) -> Self {
        Self::build(
            "zhipu",
            "https://open.bigmodel.cn/api/paas/v4/chat/completions",
            "GLM-4-Flash",
            api_key,
            60,
            Vec::new(),
            0.3,
        )
    }

    /// DeepSeek routed through OpenRouter
    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::build(
            "openrouter",
            "https://openrouter.ai/api/v1/chat/completions",
            "deepseek/deepseek-chat",
            api_key,
            60,
            vec![("HTTP-Referer", "https://pdflingo.local")],
            0.3,
        )
    }

    /// Moonshot Kimi through OpenRouter. Slower model, longer timeout.
    pub fn kimi(api_key: impl Into<String>) -> Self {
        Self::build(
            "kimi",
            "https://openrouter.ai/api/v1/chat/completions",
            "moonshot/moonshot-v1-auto",
            api_key,
            120,
            vec![("HTTP-Referer", "https://pdflingo.local")],
            0.1,
        )
    }

    /// GPT through OpenRouter. Slower model, longer timeout.
    pub fn gpt(api_key: impl Into<String>) -> Self {
        Self::build(
            "gpt",
            "https://openrouter.ai/api/v1/chat/completions",
            "openai/gpt-4-turbo",
            api_key,
            120,
            vec![("HTTP-Referer", "https://pdflingo.local")],
            0.1,
        )
    }

    /// Complete a chat request against the provider endpoint
    pub async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json; charset=utf-8")
            .header("Authorization", format!("Bearer {}", self.api_key));

        for (name, value) in &self.extra_headers {
            builder = builder.header(*name, *value);
        }

        let response = builder
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 401 {
            let message =
                response.text().await.unwrap_or_else(|_| "unauthorized".to_string());
            return Err(ProviderError::AuthenticationError(message));
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            error!("{} API error ({}): {}", self.name, status, message);
            return Err(ProviderError::ApiError { status_code: status.as_u16(), message });
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl Provider for ChatClient {
    fn name(&self) -> &str {
        self.name
    }

    async fn translate(
        &self,
        text: &str,
        _source_lang: &str,
        target_lang: &str,
    ) -> Result<String, ProviderError> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let target_name = language_utils::chat_lang_name(target_lang);
        let prompt = format!(
            "Translate the following text into {}. Reply with the translation only, \
             without any explanations:\n\n{}",
            target_name, text
        );

        let request = ChatRequest::new(&self.model)
            .add_message("system", "You are a professional translation assistant.")
            .add_message("user", prompt)
            .temperature(self.temperature);

        let response = self.complete(request).await?;

        match response.choices.first() {
            Some(choice) => Ok(choice.message.content.trim().to_string()),
            None => Err(ProviderError::ParseError(format!(
                "{} returned no completion choices",
                self.name
            ))),
        }
    }
}
