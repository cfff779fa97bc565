use async_trait::async_trait;
use tracing::debug;

use crate::config::LLMConfig;
use crate::types::{AppError, AppResult, LLMMessage, LLMProvider, LLMRequest, LLMResponse};

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;
}

/// Prompt in, text out. The stages only ever see this seam.
///
/// No retry or timeout is applied here; a slow provider blocks the calling
/// stage until it answers or fails.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> AppResult<String>;
}

/// Configuration for an LLM provider
pub struct LLMProviderConfig {
    pub provider: LLMProvider,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl LLMProviderConfig {
    /// Build from application config, failing when the selected provider has no key
    pub fn from_config(config: &LLMConfig) -> AppResult<Self> {
        let api_key = config.active_api_key().ok_or_else(|| {
            AppError::Config(format!("No API key configured for provider '{}'", config.provider))
        })?;

        Ok(Self {
            provider: config.provider,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

pub struct LLM {
    adapter: Box<dyn LLMAdapter>,
    provider: LLMProvider,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl LLM {
    pub fn new(config: LLMProviderConfig) -> Self {
        let adapter: Box<dyn LLMAdapter> = match config.provider {
            LLMProvider::Google => Box::new(crate::llm::google::GoogleAdapter::new(&config.api_key)),
            LLMProvider::OpenAI => Box::new(crate::llm::openai::OpenAIAdapter::new(&config.api_key)),
            LLMProvider::Groq => Box::new(crate::llm::groq::GroqAdapter::new(&config.api_key)),
        };

        Self::with_adapter(adapter, config)
    }

    /// Use a caller-supplied adapter, e.g. one pointed at a different base URL
    pub fn with_adapter(adapter: Box<dyn LLMAdapter>, config: LLMProviderConfig) -> Self {
        Self {
            adapter,
            provider: config.provider,
            model: config.model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    pub fn provider(&self) -> LLMProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.adapter.create_chat_completion(request).await
    }
}

#[async_trait]
impl TextGenerator for LLM {
    async fn generate(&self, prompt: &str) -> AppResult<String> {
        let request = LLMRequest {
            model: self.model.clone(),
            messages: vec![LLMMessage::user(prompt)],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system_instruction: None,
        };

        let response = self.create_chat_completion(&request).await?;
        debug!(
            provider = %self.provider,
            model = %self.model,
            finish_reason = %response.finish_reason,
            total_tokens = response.usage.total_tokens,
            "Text generation finished"
        );
        Ok(response.content)
    }
}
