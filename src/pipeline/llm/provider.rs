//! [`LlmClient`] over an edgequake-llm provider (OpenAI, Anthropic, Gemini,
//! Mistral, Ollama, …).
//!
//! edgequake-llm reports failures as provider-specific error values, so they
//! are classified by message text into the crate's error variants.

use super::{GenerationOptions, LlmClient, LlmFuture};
use crate::error::Pdf2QuizError;
use crate::output::ModelInfo;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// A chat provider created through `ProviderFactory`.
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    provider_name: String,
    model: String,
}

impl ProviderClient {
    /// Create `provider_name` serving `model`. API keys come from the
    /// provider's usual environment variable (`OPENAI_API_KEY`, …).
    pub fn new(provider_name: &str, model: &str) -> Result<Self, Pdf2QuizError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            Pdf2QuizError::ProviderNotConfigured {
                provider: provider_name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::from_provider(provider, provider_name, model))
    }

    /// Wrap an already constructed provider.
    pub fn from_provider(provider: Arc<dyn LLMProvider>, provider_name: &str, model: &str) -> Self {
        Self {
            provider,
            provider_name: provider_name.to_string(),
            model: model.to_string(),
        }
    }

    async fn chat(&self, prompt: &str, options: &GenerationOptions) -> Result<String, Pdf2QuizError> {
        let messages = vec![ChatMessage::user(prompt)];
        let opts = CompletionOptions {
            temperature: Some(options.temperature),
            max_tokens: Some(options.max_tokens),
            ..Default::default()
        };

        let start = Instant::now();
        let response = self
            .provider
            .chat(&messages, Some(&opts))
            .await
            .map_err(|e| classify_error(&self.provider_name, &options.model, &e.to_string()))?;

        debug!(
            "{}: {} input tokens, {} output tokens, {:?}",
            self.provider_name,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        if response.content.trim().is_empty() {
            return Err(Pdf2QuizError::MalformedResponse {
                detail: "the model returned an empty response".into(),
            });
        }
        Ok(response.content)
    }
}

static RE_STATUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([45]\d\d)\b").unwrap());

/// Map a provider error message onto the crate's error variants.
///
/// `LlmApiError.status` is 0 when the message carries no HTTP status.
fn classify_error(provider: &str, model: &str, message: &str) -> Pdf2QuizError {
    let lower = message.to_lowercase();

    if lower.contains("connection refused")
        || lower.contains("error trying to connect")
        || lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("dns error")
    {
        return Pdf2QuizError::ServiceUnavailable {
            endpoint: provider.to_string(),
            reason: message.to_string(),
        };
    }

    if lower.contains("model") && (lower.contains("not found") || lower.contains("does not exist")) {
        return Pdf2QuizError::ModelNotFound {
            model: model.to_string(),
        };
    }

    if lower.contains("api key") || lower.contains("unauthorized") || lower.contains("401") {
        return Pdf2QuizError::ProviderNotConfigured {
            provider: provider.to_string(),
            hint: message.to_string(),
        };
    }

    let status = RE_STATUS
        .captures(message)
        .and_then(|c| c[1].parse::<u16>().ok())
        .unwrap_or(0);
    Pdf2QuizError::LlmApiError {
        status,
        message: message.to_string(),
    }
}

impl LlmClient for ProviderClient {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn complete<'a>(
        &'a self,
        prompt: &'a str,
        options: &'a GenerationOptions,
    ) -> LlmFuture<'a, String> {
        Box::pin(self.chat(prompt, options))
    }

    /// Hosted providers expose no installed-model list; the configured model
    /// is reported as the only one.
    fn list_models(&self) -> LlmFuture<'_, Vec<ModelInfo>> {
        Box::pin(async move { Ok(vec![ModelInfo::named(self.model.clone())]) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_errors_are_service_unavailable() {
        let e = classify_error("ollama", "llama3", "error sending request: Connection refused (os error 111)");
        assert!(matches!(e, Pdf2QuizError::ServiceUnavailable { .. }));
        let e = classify_error("openai", "gpt-4.1", "request timed out");
        assert!(matches!(e, Pdf2QuizError::ServiceUnavailable { .. }));
    }

    #[test]
    fn missing_model_is_model_not_found() {
        let e = classify_error("openai", "gpt-9", "The model `gpt-9` does not exist");
        assert!(matches!(e, Pdf2QuizError::ModelNotFound { ref model } if model == "gpt-9"));
    }

    #[test]
    fn auth_errors_are_configuration() {
        let e = classify_error("anthropic", "claude", "HTTP 401: invalid x-api-key");
        assert!(matches!(e, Pdf2QuizError::ProviderNotConfigured { .. }));
    }

    #[test]
    fn other_errors_keep_status_when_present() {
        match classify_error("openai", "gpt-4.1", "API error 429: rate limit exceeded") {
            Pdf2QuizError::LlmApiError { status, .. } => assert_eq!(status, 429),
            other => panic!("unexpected {other:?}"),
        }
        match classify_error("openai", "gpt-4.1", "something odd") {
            Pdf2QuizError::LlmApiError { status, .. } => assert_eq!(status, 0),
            other => panic!("unexpected {other:?}"),
        }
    }
}
