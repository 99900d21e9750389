//! Direct client for the Ollama HTTP API.
//!
//! Two endpoints are used:
//!
//! - `POST /api/generate` with `stream: false`: one prompt in, one JSON
//!   object with the whole `response` out.
//! - `GET /api/tags`: installed models.
//!
//! Ollama answers an unknown model with HTTP 404 and
//! `{"error":"model 'x' not found"}`; that becomes `ModelNotFound` so the user
//! sees the `ollama pull` hint instead of a bare status code.

use super::{GenerationOptions, LlmClient, LlmFuture};
use crate::config::PipelineConfig;
use crate::error::Pdf2QuizError;
use crate::output::ModelInfo;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Ollama API client.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    endpoint: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateParams,
}

#[derive(Serialize)]
struct GenerateParams {
    temperature: f32,
    num_predict: usize,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
    size: Option<u64>,
    modified_at: Option<String>,
    details: Option<TagDetails>,
}

#[derive(Deserialize)]
struct TagDetails {
    family: Option<String>,
    parameter_size: Option<String>,
}

impl OllamaClient {
    /// Build a client for `endpoint` (e.g. `http://localhost:11434`).
    pub fn new(
        endpoint: impl Into<String>,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, Pdf2QuizError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| Pdf2QuizError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, Pdf2QuizError> {
        Self::new(
            config.endpoint.clone(),
            Duration::from_secs(config.request_timeout_secs),
            Duration::from_secs(config.connect_timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, Pdf2QuizError> {
        let url = format!("{}/api/generate", self.endpoint);
        let body = GenerateRequest {
            model: &options.model,
            prompt,
            stream: false,
            options: GenerateParams {
                temperature: options.temperature,
                num_predict: options.max_tokens,
            },
        };

        let start = Instant::now();
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        if !status.is_success() {
            return Err(status_error(status, &text, &options.model, &self.endpoint));
        }

        let parsed: GenerateResponse = serde_json::from_str(&text).map_err(|e| {
            Pdf2QuizError::MalformedResponse {
                detail: format!("generate reply is not the expected JSON: {e}"),
            }
        })?;
        let reply = parsed.response.unwrap_or_default();
        if reply.trim().is_empty() {
            return Err(Pdf2QuizError::MalformedResponse {
                detail: "the model returned an empty response".into(),
            });
        }

        debug!(
            "Ollama {}: {} chars in, {} tokens out, {:?}",
            options.model,
            prompt.len(),
            parsed.eval_count.unwrap_or(0),
            start.elapsed()
        );
        Ok(reply)
    }

    async fn tags(&self) -> Result<Vec<ModelInfo>, Pdf2QuizError> {
        let url = format!("{}/api/tags", self.endpoint);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        if !status.is_success() {
            return Err(Pdf2QuizError::LlmApiError {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let parsed: TagsResponse =
            serde_json::from_str(&text).map_err(|e| Pdf2QuizError::MalformedResponse {
                detail: format!("model list is not the expected JSON: {e}"),
            })?;

        Ok(parsed
            .models
            .into_iter()
            .map(|m| {
                let (family, parameter_size) = m
                    .details
                    .map(|d| (d.family, d.parameter_size))
                    .unwrap_or((None, None));
                ModelInfo {
                    name: m.name,
                    size: m.size,
                    modified_at: m.modified_at,
                    family,
                    parameter_size,
                }
            })
            .collect())
    }

    fn transport_error(&self, e: reqwest::Error) -> Pdf2QuizError {
        if e.is_decode() {
            return Pdf2QuizError::MalformedResponse {
                detail: e.to_string(),
            };
        }
        let reason = if e.is_timeout() {
            "request timed out".to_string()
        } else if e.is_connect() {
            "connection failed".to_string()
        } else {
            e.to_string()
        };
        Pdf2QuizError::ServiceUnavailable {
            endpoint: self.endpoint.clone(),
            reason,
        }
    }
}

/// Map a non-success status from `/api/generate`.
///
/// Only an Ollama JSON error naming the model means the model is missing.
/// A bare 404 comes from a wrong base URL.
fn status_error(status: StatusCode, body: &str, model: &str, endpoint: &str) -> Pdf2QuizError {
    if let Ok(ErrorBody { error }) = serde_json::from_str::<ErrorBody>(body) {
        let lower = error.to_lowercase();
        if lower.contains("model") && lower.contains("not found") {
            return Pdf2QuizError::ModelNotFound {
                model: model.to_string(),
            };
        }
    }
    let message = error_message(body);
    if status == StatusCode::NOT_FOUND {
        return Pdf2QuizError::ServiceUnavailable {
            endpoint: endpoint.to_string(),
            reason: format!("HTTP 404 ({message}); check the endpoint URL"),
        };
    }
    Pdf2QuizError::LlmApiError {
        status: status.as_u16(),
        message,
    }
}

/// The `error` field of an Ollama error body, or the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.trim().to_string())
}

impl LlmClient for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    fn complete<'a>(
        &'a self,
        prompt: &'a str,
        options: &'a GenerationOptions,
    ) -> LlmFuture<'a, String> {
        Box::pin(self.generate(prompt, options))
    }

    fn list_models(&self) -> LlmFuture<'_, Vec<ModelInfo>> {
        Box::pin(self.tags())
    }
}
