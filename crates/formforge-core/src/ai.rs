//! AI Generator Adapter
//!
//! Sends the description to a completion provider and turns the reply into a
//! [`SchemaDocument`]. Every failure (transport, timeout, unparseable or
//! inconsistent output) degrades to the keyword fallback; callers always get a
//! document plus the [`GenerationSource`] that produced it.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::ambiguity;
use crate::fallback;
use crate::llm::providers::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS};
use crate::llm::{CompletionRequest, LLMConfig, LLMError, LLMProvider, Message};
use crate::repair::{self, AiOutputError};
use crate::schema::SchemaDocument;

// ============================================================================
// Result Types
// ============================================================================

/// Which generator produced a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationSource {
    Ai,
    Fallback,
}

/// A generated document tagged with its source. Serializes as the document's
/// own fields plus `"source"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedForm {
    #[serde(flatten)]
    pub document: SchemaDocument,
    pub source: GenerationSource,
}

impl GeneratedForm {
    pub fn ai(document: SchemaDocument) -> Self {
        Self {
            document,
            source: GenerationSource::Ai,
        }
    }

    pub fn fallback(document: SchemaDocument) -> Self {
        Self {
            document,
            source: GenerationSource::Fallback,
        }
    }

    /// Build with the keyword generator only.
    pub fn offline(description: &str) -> Self {
        Self::fallback(fallback::generate(description))
    }

    pub fn is_fallback(&self) -> bool {
        self.source == GenerationSource::Fallback
    }
}

/// Why the AI path was abandoned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationFailure {
    #[error("transport failure: {0}")]
    TransportFailure(#[from] LLMError),
    #[error("malformed AI output: {0}")]
    MalformedOutput(#[from] AiOutputError),
    #[error("description is blank")]
    BlankDescription,
}

// ============================================================================
// Settings
// ============================================================================

/// Sampling and timeout settings passed to the generator at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub max_tokens: usize,
    pub temperature: f32,
    /// Single bounded wait for the completion; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }
}

impl GenerationSettings {
    pub fn from_config(config: &LLMConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: config.timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

// ============================================================================
// Prompt
// ============================================================================

const OUTPUT_CONTRACT: &str = r#"Return ONLY a valid JSON object with this exact structure:
{
  "schema": {
    "type": "object",
    "properties": {
      "field_key": {
        "type": "string|number|integer|boolean|array",
        "title": "User Friendly Title",
        "format": "email|date|url (strings only, if applicable)",
        "enum": ["option1", "option2"] (single-select string fields),
        "items": {"type": "string", "enum": ["option1", "option2"]} (multi-select array fields),
        "minimum": 0 (numbers only),
        "maximum": 100 (numbers only)
      }
    },
    "required": ["field_key"]
  },
  "uiSchema": {
    "field_key": {
      "ui:placeholder": "Helpful placeholder text",
      "ui:widget": "select|textarea|checkbox|checkboxes|radio|range (if applicable)"
    }
  }
}"#;

/// Build the instruction prompt for `description`.
pub fn build_prompt(description: &str) -> String {
    format!(
        r#"You are an expert form builder. Generate a JSON schema for a form based on this description: "{description}"

Requirements:
1. Create appropriate form fields based on the description
2. Field keys are lower-case snake_case (letters, digits, underscores)
3. Use only the field types string, number, integer, boolean and array
4. Add appropriate validation (required fields, formats, min/max values)
5. Generate user-friendly titles and placeholders
6. For select/dropdown fields, use a string field with "enum" and the "select" widget
7. For multi-select fields, use an array field with "items.enum" and the "checkboxes" widget
8. Consider the context and purpose of the form

{OUTPUT_CONTRACT}

Examples:
- "Contact form: name, email, subject, message" → name (string), email (string, format email), subject (string), message (string, textarea)
- "Survey: age, gender, interests" → age (integer), gender (string enum, select), interests (array, checkboxes)
- "Event registration: name, email, t-shirt size, dietary restrictions" → name, email, tshirt_size (string enum, select), dietary_restrictions (string, textarea)

Generate the schema now:"#
    )
}

/// Completion request for `description` under `settings`.
pub fn build_request(description: &str, settings: &GenerationSettings) -> CompletionRequest {
    CompletionRequest {
        messages: vec![Message::user(build_prompt(description))],
        max_tokens: Some(settings.max_tokens),
        temperature: Some(settings.temperature),
        json_mode: true,
    }
}

// ============================================================================
// Generator
// ============================================================================

/// AI-first generator with automatic keyword fallback. Holds no state between
/// calls besides its provider and settings.
pub struct AiGenerator {
    provider: Arc<dyn LLMProvider>,
    settings: GenerationSettings,
}

impl AiGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>, settings: GenerationSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Generate a document; never fails.
    pub async fn generate(&self, description: &str) -> GeneratedForm {
        match self.try_generate(description).await {
            Ok(document) => {
                tracing::info!(
                    model = %self.provider.model_info().name,
                    fields = document.len(),
                    followups = document.followups.len(),
                    "generated form schema with AI"
                );
                GeneratedForm::ai(document)
            }
            Err(reason) => {
                tracing::warn!(%reason, "AI generation failed, using keyword fallback");
                GeneratedForm::fallback(fallback::generate(description))
            }
        }
    }

    /// The AI path alone, surfacing why it failed.
    pub async fn try_generate(&self, description: &str) -> Result<SchemaDocument, GenerationFailure> {
        if description.trim().is_empty() {
            return Err(GenerationFailure::BlankDescription);
        }

        let request = build_request(description, &self.settings);
        let call = self.provider.complete(&request);
        let response = match self.settings.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| LLMError::Timeout(limit))??,
            None => call.await?,
        };
        tracing::debug!(
            chars = response.content.len(),
            finish_reason = ?response.finish_reason,
            "completion received"
        );

        let mut document = repair::parse_ai_output(&response.content)?;
        document.followups = ambiguity::detect(description);
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockProvider, MockReply};
    use crate::schema::{StringFormat, Widget};

    const AI_REPLY: &str = r#"```json
{
  "schema": {
    "type": "object",
    "properties": {
      "full_name": {"type": "string", "title": "Full Name"},
      "email": {"type": "string", "format": "email", "title": "Email"},
      "phone": {"type": "string", "title": "Phone"},
      "tshirtSize": {"type": "string", "title": "T-shirt Size", "enum": ["S", "M", "L"]}
    },
    "required": ["full_name", "email"]
  },
  "uiSchema": {
    "tshirtSize": {"ui:widget": "select"}
  }
}
```"#;

    fn with_provider(provider: MockProvider) -> (Arc<MockProvider>, AiGenerator) {
        let provider = Arc::new(provider);
        let generator = AiGenerator::new(provider.clone(), GenerationSettings::default());
        (provider, generator)
    }

    #[tokio::test]
    async fn test_ai_success() {
        let (_, generator) = with_provider(MockProvider::always(AI_REPLY));
        let form = generator.generate("Event registration with t-shirt size").await;

        assert_eq!(form.source, GenerationSource::Ai);
        let doc = &form.document;
        assert_eq!(
            doc.field_keys().collect::<Vec<_>>(),
            vec!["full_name", "email", "phone", "tshirt_size"]
        );
        assert_eq!(doc.field("email").unwrap().format, Some(StringFormat::Email));
        assert_eq!(doc.hint("tshirt_size").unwrap().widget, Some(Widget::Select));
        assert!(doc.is_consistent());
    }

    #[tokio::test]
    async fn test_followups_come_from_description() {
        let (_, generator) = with_provider(MockProvider::always(AI_REPLY));
        let form = generator.generate("Anonymous signup, collect phone").await;
        assert_eq!(form.source, GenerationSource::Ai);
        assert_eq!(form.document.followups.len(), 1);
        assert_eq!(form.document.followups[0].field.as_deref(), Some("phone"));
    }

    #[tokio::test]
    async fn test_transport_failure_matches_fallback() {
        let description = "Contact form: name, email, subject, message";
        let (_, generator) = with_provider(MockProvider::failing(LLMError::Api {
            status: 500,
            message: "boom".to_string(),
        }));
        let form = generator.generate(description).await;
        assert_eq!(form.source, GenerationSource::Fallback);
        assert_eq!(form.document, fallback::generate(description));
    }

    #[tokio::test]
    async fn test_malformed_output_falls_back() {
        let (_, generator) = with_provider(MockProvider::always("Sorry, I can't do that."));
        let form = generator.generate("Feedback form with rating").await;
        assert!(form.is_fallback());
        assert!(form.document.contains_field("rating"));

        let (_, generator) = with_provider(MockProvider::always(r#"{"fields": ["name"]}"#));
        let failure = generator.try_generate("Feedback").await.unwrap_err();
        assert!(matches!(
            failure,
            GenerationFailure::MalformedOutput(AiOutputError::WrongShape(_))
        ));
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let provider = Arc::new(MockProvider::new(vec![MockReply::Delayed(
            Duration::from_secs(5),
            Box::new(MockReply::Text(AI_REPLY.to_string())),
        )]));
        let settings = GenerationSettings::default().with_timeout(Duration::from_millis(20));
        let generator = AiGenerator::new(provider, settings);

        let failure = generator.try_generate("name and email").await.unwrap_err();
        assert_eq!(
            failure,
            GenerationFailure::TransportFailure(LLMError::Timeout(Duration::from_millis(20)))
        );
        let form = generator.generate("name and email").await;
        assert!(form.is_fallback());
    }

    #[tokio::test]
    async fn test_request_parameters() {
        let (provider, generator) = with_provider(MockProvider::always(AI_REPLY));
        generator.generate("Workshop signup").await;

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_tokens, Some(2000));
        assert_eq!(requests[0].temperature, Some(0.3));
        assert!(requests[0].user_prompt().unwrap().contains("\"Workshop signup\""));
    }

    #[tokio::test]
    async fn test_blank_description_skips_provider() {
        let (provider, generator) = with_provider(MockProvider::always(AI_REPLY));
        let form = generator.generate("   ").await;
        assert!(form.is_fallback());
        assert!(form.document.is_empty());
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn test_generated_form_wire_shape() {
        let form = GeneratedForm::offline("email");
        let value = serde_json::to_value(&form).unwrap();
        assert_eq!(value["source"], "fallback");
        assert_eq!(value["schema"]["properties"]["email"]["format"], "email");
        assert!(value.get("uiSchema").is_some());

        let back: GeneratedForm = serde_json::from_value(value).unwrap();
        assert_eq!(back, form);
    }
}
