//! LLM API Providers
//!
//! OpenAI-compatible chat completions (OpenAI, OpenRouter, local vLLM/Ollama)
//! and Anthropic messages.

use super::*;
use reqwest::{Client, RequestBuilder, Response};

const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_TOKENS: usize = 2000;
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

// ============================================================================
// Configuration
// ============================================================================

/// LLM configuration, read once at startup and passed to the generator.
#[derive(Debug, Clone, PartialEq)]
pub struct LLMConfig {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    /// `0` disables the generator's own timeout.
    pub timeout_secs: u64,
    pub max_tokens: usize,
    pub temperature: f32,
    /// Sent as `HTTP-Referer` to OpenRouter.
    pub referer: Option<String>,
    /// Sent as `X-Title` to OpenRouter.
    pub app_title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenRouter,
    OpenAI,
    Anthropic,
    Local,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenRouter => "openrouter",
            Provider::OpenAI => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Local => "local",
        }
    }
}

impl LLMConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve configuration through `lookup`, which returns a variable's value.
    ///
    /// Provider precedence: OpenRouter, OpenAI, Anthropic, local.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut config = if let Some(key) = var("OPENROUTER_API_KEY") {
            Self::openrouter(&key, "openai/gpt-4o-mini")
        } else if let Some(key) = var("OPENAI_API_KEY") {
            let mut config = Self::openai(&key, "gpt-4o-mini");
            config.base_url = var("OPENAI_BASE_URL");
            config
        } else if let Some(key) = var("ANTHROPIC_API_KEY") {
            Self::anthropic(&key, "claude-3-5-haiku-latest")
        } else if let Some(url) = var("LOCAL_LLM_URL") {
            Self::local(&url, &var("LOCAL_LLM_MODEL").unwrap_or_else(|| "default".to_string()))
        } else {
            return Err(ConfigError::NoProviderConfigured);
        };

        if let Some(model) = var("FORMFORGE_LLM_MODEL") {
            config.model = model;
        }
        if let Some(raw) = var("FORMFORGE_LLM_TIMEOUT_SECS") {
            let raw = raw.trim();
            config.timeout_secs = raw.parse().map_err(|_| {
                ConfigError::Invalid(format!(
                    "FORMFORGE_LLM_TIMEOUT_SECS={raw:?} (expected integer seconds; 0 disables)"
                ))
            })?;
        }
        if let Some(referer) = var("FORMFORGE_REFERER") {
            config.referer = Some(referer);
        }

        Ok(config)
    }

    fn base(provider: Provider, api_key: &str, model: &str) -> Self {
        Self {
            provider,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            referer: None,
            app_title: None,
        }
    }

    /// Create OpenRouter config
    pub fn openrouter(api_key: &str, model: &str) -> Self {
        let mut config = Self::base(Provider::OpenRouter, api_key, model);
        config.referer = Some("http://localhost:5173".to_string());
        config.app_title = Some("Dynamic Form Builder".to_string());
        config
    }

    /// Create OpenAI config
    pub fn openai(api_key: &str, model: &str) -> Self {
        Self::base(Provider::OpenAI, api_key, model)
    }

    /// Create Anthropic config
    pub fn anthropic(api_key: &str, model: &str) -> Self {
        Self::base(Provider::Anthropic, api_key, model)
    }

    /// Create local config
    pub fn local(url: &str, model: &str) -> Self {
        let mut config = Self::base(Provider::Local, "", model);
        config.base_url = Some(url.to_string());
        config.timeout_secs = 120;
        config
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.to_string());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// The request timeout, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// HTTP client timeout. Stays bounded when the generator's own timeout
    /// is disabled.
    pub fn client_timeout(&self) -> Duration {
        self.timeout()
            .unwrap_or_else(|| Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    fn resolved_base_url(&self) -> String {
        let default = match self.provider {
            Provider::OpenRouter => OPENROUTER_BASE_URL,
            Provider::OpenAI => OPENAI_BASE_URL,
            Provider::Anthropic => ANTHROPIC_BASE_URL,
            Provider::Local => "http://localhost:8000",
        };
        let url = self.base_url.as_deref().unwrap_or(default).trim_end_matches('/');
        if self.provider == Provider::Local && !url.ends_with("/v1") {
            format!("{url}/v1")
        } else {
            url.to_string()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No LLM provider configured. Set OPENROUTER_API_KEY, OPENAI_API_KEY, ANTHROPIC_API_KEY, or LOCAL_LLM_URL")]
    NoProviderConfigured,
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(String),
}

fn http_client(config: &LLMConfig) -> Result<Client, ConfigError> {
    Client::builder()
        .timeout(config.client_timeout())
        .build()
        .map_err(|e| ConfigError::HttpClient(e.to_string()))
}

/// Map a non-success status to an error; pass successful responses through.
async fn check_status(response: Response) -> Result<Response, LLMError> {
    let status = response.status();
    if status.as_u16() == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(60);
        return Err(LLMError::RateLimited {
            retry_after_ms: retry_after.saturating_mul(1000),
        });
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(LLMError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response)
}

// ============================================================================
// OpenAI-compatible Provider (OpenAI, OpenRouter, vLLM, Ollama)
// ============================================================================

pub struct OpenAICompatibleClient {
    client: Client,
    config: LLMConfig,
}

impl OpenAICompatibleClient {
    pub fn new(config: LLMConfig) -> Result<Self, ConfigError> {
        let client = http_client(&config)?;
        Ok(Self { client, config })
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let mut builder = builder.header("Content-Type", "application/json");
        if !self.config.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.config.api_key));
        }
        if self.config.provider == Provider::OpenRouter {
            if let Some(referer) = &self.config.referer {
                builder = builder.header("HTTP-Referer", referer);
            }
            if let Some(title) = &self.config.app_title {
                builder = builder.header("X-Title", title);
            }
        }
        builder
    }

    pub async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LLMError> {
        let url = format!("{}/chat/completions", self.config.resolved_base_url());

        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": m.role.as_str(),
                    "content": m.content
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        if request.json_mode && self.config.provider == Provider::OpenAI {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }

        let response = self
            .authorize(self.client.post(&url))
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::InvalidResponse(e.to_string()))?;

        let content = data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LLMError::InvalidResponse("Missing choices[0].message.content".to_string()))?
            .trim()
            .to_string();

        let finish_reason = match data["choices"][0]["finish_reason"].as_str() {
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        };

        Ok(CompletionResponse {
            content,
            finish_reason,
            usage: Usage {
                prompt_tokens: data["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as usize,
                completion_tokens: data["usage"]["completion_tokens"].as_u64().unwrap_or(0) as usize,
            },
            model: data["model"]
                .as_str()
                .unwrap_or(&self.config.model)
                .to_string(),
        })
    }
}

// ============================================================================
// Anthropic Provider
// ============================================================================

pub struct AnthropicClient {
    client: Client,
    config: LLMConfig,
}

impl AnthropicClient {
    pub fn new(config: LLMConfig) -> Result<Self, ConfigError> {
        let client = http_client(&config)?;
        Ok(Self { client, config })
    }

    pub async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LLMError> {
        let url = format!("{}/messages", self.config.resolved_base_url());

        // Anthropic takes the system prompt out of band.
        let system = request
            .messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.clone());

        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| {
                serde_json::json!({
                    "role": m.role.as_str(),
                    "content": m.content
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "max_tokens": request.max_tokens.unwrap_or(self.config.max_tokens),
        });

        if let Some(sys) = system {
            body["system"] = serde_json::json!(sys);
        }
        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::InvalidResponse(e.to_string()))?;

        let content = data["content"][0]["text"]
            .as_str()
            .ok_or_else(|| LLMError::InvalidResponse("Missing content[0].text".to_string()))?
            .trim()
            .to_string();

        let finish_reason = match data["stop_reason"].as_str() {
            Some("max_tokens") => FinishReason::Length,
            _ => FinishReason::Stop,
        };

        Ok(CompletionResponse {
            content,
            finish_reason,
            usage: Usage {
                prompt_tokens: data["usage"]["input_tokens"].as_u64().unwrap_or(0) as usize,
                completion_tokens: data["usage"]["output_tokens"].as_u64().unwrap_or(0) as usize,
            },
            model: self.config.model.clone(),
        })
    }
}

// ============================================================================
// Unified Client
// ============================================================================

/// Unified LLM client that dispatches to the appropriate provider
pub enum UnifiedClient {
    OpenAICompatible(OpenAICompatibleClient),
    Anthropic(AnthropicClient),
}

impl UnifiedClient {
    /// Create from configuration
    pub fn from_config(config: LLMConfig) -> Result<Self, ConfigError> {
        Ok(match config.provider {
            Provider::Anthropic => Self::Anthropic(AnthropicClient::new(config)?),
            Provider::OpenRouter | Provider::OpenAI | Provider::Local => {
                Self::OpenAICompatible(OpenAICompatibleClient::new(config)?)
            }
        })
    }

    /// Create from environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_config(LLMConfig::from_env()?)
    }

    fn config(&self) -> &LLMConfig {
        match self {
            Self::OpenAICompatible(c) => &c.config,
            Self::Anthropic(c) => &c.config,
        }
    }
}

#[async_trait]
impl LLMProvider for UnifiedClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LLMError> {
        match self {
            Self::OpenAICompatible(c) => c.complete(request).await,
            Self::Anthropic(c) => c.complete(request).await,
        }
    }

    fn model_info(&self) -> ModelInfo {
        let config = self.config();
        ModelInfo {
            name: config.model.clone(),
            provider: config.provider.as_str(),
            supports_json_mode: config.provider == Provider::OpenAI,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_no_provider() {
        let result = LLMConfig::from_lookup(lookup(&[]));
        assert!(matches!(result, Err(ConfigError::NoProviderConfigured)));
    }

    #[test]
    fn test_openrouter_takes_precedence() {
        let config = LLMConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-openai"),
            ("OPENROUTER_API_KEY", "sk-or"),
        ]))
        .unwrap();
        assert_eq!(config.provider, Provider::OpenRouter);
        assert_eq!(config.api_key, "sk-or");
        assert_eq!(config.model, "openai/gpt-4o-mini");
        assert_eq!(config.resolved_base_url(), OPENROUTER_BASE_URL);
        assert_eq!(config.max_tokens, 2000);
        assert!((config.temperature - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_overrides() {
        let config = LLMConfig::from_lookup(lookup(&[
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("FORMFORGE_LLM_MODEL", "claude-custom"),
            ("FORMFORGE_LLM_TIMEOUT_SECS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.provider, Provider::Anthropic);
        assert_eq!(config.model, "claude-custom");
        assert_eq!(config.timeout(), None);
        assert_eq!(config.client_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_invalid_timeout() {
        let result = LLMConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk"),
            ("FORMFORGE_LLM_TIMEOUT_SECS", "soon"),
        ]));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let config = LLMConfig::from_lookup(lookup(&[
            ("OPENROUTER_API_KEY", "  "),
            ("LOCAL_LLM_URL", "http://localhost:11434/"),
        ]))
        .unwrap();
        assert_eq!(config.provider, Provider::Local);
        assert_eq!(config.resolved_base_url(), "http://localhost:11434/v1");
        assert_eq!(config.timeout(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_client_timeout_follows_config() {
        let config = LLMConfig::openai("k", "gpt-4o-mini").with_timeout_secs(15);
        assert_eq!(config.client_timeout(), Duration::from_secs(15));
        let config = config.with_timeout_secs(0);
        assert_eq!(config.timeout(), None);
        assert_eq!(config.client_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_config_creation() {
        let config = LLMConfig::openai("test-key", "gpt-4");
        assert_eq!(config.provider, Provider::OpenAI);
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.model, "gpt-4");
        assert_eq!(config.resolved_base_url(), OPENAI_BASE_URL);
    }
}
