// src/suggest/mod.rs — Suggestion generation with two-tier model fallback

pub mod parser;
pub mod prompt;
pub mod templates;

use std::sync::Arc;

use crate::core::types::{Suggestion, SuggestionSource};
use crate::infra::config::ModelsConfig;
use crate::infra::errors::OptimizerError;
use crate::operators::OperatorCatalog;
use crate::provider::{ChatRequest, ChatResponse, Message, ModelProvider};

pub use parser::{ParseOutcome, ParseStrategy, ParsedSuggestions, SuggestionParser};
pub use templates::{default_suggestions, SUGGESTION_COUNT};

/// Exactly [`SUGGESTION_COUNT`] suggestions and where they came from.
#[derive(Debug, Clone)]
pub struct SuggestionSet {
    pub suggestions: Vec<Suggestion>,
    pub source: SuggestionSource,
}

/// Asks a model for improvements to a factor. Never fails: every error path
/// ends at the deterministic templates.
pub struct SuggestionService {
    provider: Arc<dyn ModelProvider>,
    models: ModelsConfig,
    parser: SuggestionParser,
}

impl SuggestionService {
    pub fn new(provider: Arc<dyn ModelProvider>, models: ModelsConfig) -> Self {
        Self {
            provider,
            models,
            parser: SuggestionParser::new(),
        }
    }

    pub async fn suggest(&self, original_factor: &str, catalog: &OperatorCatalog) -> SuggestionSet {
        let primary = match self.ask_primary(original_factor, catalog).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    provider = self.provider.id(),
                    "Suggestion request failed, using templates: {e}"
                );
                return Self::templates(original_factor);
            }
        };

        let (text, source) = if primary.is_empty() {
            tracing::warn!(
                model = %self.models.fallback,
                "Primary model returned no content, retrying with simplified prompt"
            );
            match self.ask_simplified(original_factor).await {
                Ok(response) if !response.is_empty() => {
                    (response.content, SuggestionSource::SimplifiedModel)
                }
                Ok(_) => {
                    tracing::warn!("Simplified prompt returned no content, using templates");
                    return Self::templates(original_factor);
                }
                Err(e) => {
                    tracing::warn!(
                        provider = self.provider.id(),
                        "Simplified prompt failed, using templates: {e}"
                    );
                    return Self::templates(original_factor);
                }
            }
        } else {
            (primary.content, SuggestionSource::Model)
        };

        tracing::debug!("Model answer: {}", crate::util::preview(&text, 200));
        let parsed = self.parser.parse(&text, original_factor);
        SuggestionSet {
            source: if parsed.is_fallback() {
                SuggestionSource::Templates
            } else {
                source
            },
            suggestions: parsed.suggestions,
        }
    }

    async fn ask_primary(
        &self,
        original_factor: &str,
        catalog: &OperatorCatalog,
    ) -> Result<ChatResponse, OptimizerError> {
        let request = ChatRequest {
            model: self.models.primary.clone(),
            messages: vec![Message::user(prompt::primary_prompt(original_factor, catalog)?)],
            max_tokens: Some(self.models.max_tokens),
            temperature: Some(self.models.temperature),
            system: Some(prompt::SYSTEM_PROMPT.to_string()),
        };
        let response = self.provider.chat(request).await?;
        tracing::debug!(
            provider = self.provider.id(),
            model = %self.models.primary,
            tokens = response.usage.total(),
            "Primary suggestion response"
        );
        Ok(response)
    }

    async fn ask_simplified(&self, original_factor: &str) -> Result<ChatResponse, OptimizerError> {
        let request = ChatRequest {
            model: self.models.fallback.clone(),
            messages: vec![Message::user(prompt::simplified_prompt(original_factor)?)],
            max_tokens: Some(self.models.fallback_max_tokens),
            temperature: Some(self.models.temperature),
            system: None,
        };
        self.provider.chat(request).await
    }

    fn templates(original_factor: &str) -> SuggestionSet {
        SuggestionSet {
            suggestions: default_suggestions(original_factor),
            source: SuggestionSource::Templates,
        }
    }
}
