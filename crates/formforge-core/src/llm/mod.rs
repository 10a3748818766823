//! Text-completion service interface
//!
//! The generator only needs "messages in, one content string out". Concrete
//! HTTP clients live in [`providers`]; [`mock`] scripts replies for tests and
//! offline runs.

use async_trait::async_trait;
use std::time::Duration;

pub mod mock;
pub mod providers;

pub use mock::{MockProvider, MockReply};
pub use providers::{
    AnthropicClient, ConfigError, LLMConfig, OpenAICompatibleClient, Provider, UnifiedClient,
};

// ============================================================================
// LLM Provider Interface
// ============================================================================

/// Trait for text-completion providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate completion
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LLMError>;

    /// Get model info
    fn model_info(&self) -> ModelInfo;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
    /// Ask for a bare JSON object where the provider supports it.
    pub json_mode: bool,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            max_tokens: None,
            temperature: None,
            json_mode: false,
        }
    }

    pub fn user_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub finish_reason: FinishReason,
    pub usage: Usage,
    pub model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
}

#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub name: String,
    pub provider: &'static str,
    pub supports_json_mode: bool,
}

/// Transport-level failures. All of them send generation down the fallback path.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LLMError {
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("No response within {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for LLMError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LLMError::InvalidResponse(err.to_string())
        } else {
            LLMError::Network(err.to_string())
        }
    }
}
