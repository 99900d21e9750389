//! LLM access: one trait, three implementations.
//!
//! The rest of the crate sees only [`LlmClient`]: send a prompt, get text
//! back, or list installed models. Which service answers is decided once,
//! in [`resolve_client`]:
//!
//! 1. **Explicit client** (`config.client`): used as-is. Tests inject
//!    [`MockLlm`] here.
//! 2. **Provider name** (`config.provider_name`): an edgequake-llm provider
//!    built through `ProviderFactory`, which reads its API key from the
//!    environment.
//! 3. **Default**: the local Ollama HTTP API at `config.endpoint`.
//!
//! ## Error mapping
//!
//! Every implementation reports failures with the same [`Pdf2QuizError`]
//! variants so callers can branch on them without knowing the backend:
//! unreachable service → `ServiceUnavailable`, missing model →
//! `ModelNotFound`, unusable payload → `MalformedResponse`, anything else the
//! service rejected → `LlmApiError`. There is no retry at this layer; the
//! user retries by pressing the button again.

pub mod mock;
pub mod ollama;
pub mod provider;

pub use mock::{MockLlm, MockReply};
pub use ollama::OllamaClient;
pub use provider::ProviderClient;

use crate::config::PipelineConfig;
use crate::error::{ErrorKind, Pdf2QuizError};
use crate::output::{ModelInfo, ModelStatus};
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Boxed future returned by [`LlmClient`] methods.
pub type LlmFuture<'a, T> = BoxFuture<'a, Result<T, Pdf2QuizError>>;

/// A text-completion service.
pub trait LlmClient: Send + Sync {
    /// Human-readable backend name, e.g. `"ollama"`.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`. Returns the raw reply text.
    fn complete<'a>(&'a self, prompt: &'a str, options: &'a GenerationOptions)
        -> LlmFuture<'a, String>;

    /// Models the service can serve.
    fn list_models(&self) -> LlmFuture<'_, Vec<ModelInfo>>;
}

/// Per-request generation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl GenerationOptions {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Pick the client for `config` (see module docs for precedence).
pub fn resolve_client(config: &PipelineConfig) -> Result<Arc<dyn LlmClient>, Pdf2QuizError> {
    if let Some(ref client) = config.client {
        debug!("Using injected LLM client: {}", client.name());
        return Ok(Arc::clone(client));
    }

    if let Some(ref name) = config.provider_name {
        info!("Using edgequake-llm provider={}, model={}", name, config.model);
        return Ok(Arc::new(ProviderClient::new(name, &config.model)?));
    }

    debug!("Using Ollama at {}", config.endpoint);
    Ok(Arc::new(OllamaClient::from_config(config)?))
}

/// Ask the service whether `model` is installed.
///
/// Never fails: an unreachable service is itself a status.
pub async fn check_model(client: &dyn LlmClient, model: &str) -> ModelStatus {
    match client.list_models().await {
        Ok(models) => {
            if let Some(found) = models.iter().find(|m| same_model(&m.name, model)) {
                info!("Model {} is available", found.name);
                ModelStatus::Available(found.clone())
            } else {
                warn!("Model {} is not installed ({} models found)", model, models.len());
                ModelStatus::Missing {
                    model: model.to_string(),
                    installed: models.into_iter().map(|m| m.name).collect(),
                }
            }
        }
        Err(e) => {
            if e.kind() != ErrorKind::ServiceUnavailable {
                warn!("Model listing failed: {}", e);
            }
            ModelStatus::Unreachable {
                reason: e.to_string(),
            }
        }
    }
}

/// Ollama treats `name` and `name:latest` as the same model.
pub(crate) fn same_model(installed: &str, wanted: &str) -> bool {
    fn base(name: &str) -> &str {
        name.strip_suffix(":latest").unwrap_or(name)
    }
    installed == wanted || base(installed) == base(wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_tag_is_implicit() {
        assert!(same_model("llama3:latest", "llama3"));
        assert!(same_model("llama3", "llama3:latest"));
        assert!(same_model("mistral:7b", "mistral:7b"));
        assert!(!same_model("llama3:8b", "llama3"));
        assert!(!same_model("llama3.1:latest", "llama3"));
    }

    #[test]
    fn options_follow_config() {
        let config = PipelineConfig::builder()
            .model("mistral:latest")
            .temperature(0.7)
            .max_tokens(512)
            .build()
            .unwrap();
        let opts = GenerationOptions::from_config(&config);
        assert_eq!(opts.model, "mistral:latest");
        assert!((opts.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(opts.max_tokens, 512);
    }

    #[test]
    fn injected_client_wins() {
        let mock = Arc::new(MockLlm::new(MockReply::text("hi")));
        let config = PipelineConfig::builder()
            .provider_name("openai")
            .client(mock)
            .build()
            .unwrap();
        let client = resolve_client(&config).unwrap();
        assert_eq!(client.name(), "mock");
    }

    #[test]
    fn default_client_is_ollama() {
        let config = PipelineConfig::default();
        let client = resolve_client(&config).unwrap();
        assert_eq!(client.name(), "ollama");
    }

    #[tokio::test]
    async fn check_model_reports_each_status() {
        let mock = MockLlm::new(MockReply::text("")).with_models(&["llama3:latest", "mistral:7b"]);
        match check_model(&mock, "llama3").await {
            ModelStatus::Available(info) => assert_eq!(info.name, "llama3:latest"),
            other => panic!("expected Available, got {other:?}"),
        }
        match check_model(&mock, "phi3").await {
            ModelStatus::Missing { installed, .. } => assert_eq!(installed.len(), 2),
            other => panic!("expected Missing, got {other:?}"),
        }

        let down = MockLlm::new(MockReply::Unavailable);
        assert!(matches!(
            check_model(&down, "llama3").await,
            ModelStatus::Unreachable { .. }
        ));
    }
}
