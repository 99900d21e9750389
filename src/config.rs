//! Configuration types for the summary/quiz pipeline.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. The builder lets callers set only what they
//! care about and rely on documented defaults for the rest; `build()`
//! validates the combination once so the pipeline never has to.

use crate::error::Pdf2QuizError;
use crate::pipeline::llm::LlmClient;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default local Ollama endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "llama3:latest";

/// Placeholder every prompt template must contain.
pub const DOCUMENT_PLACEHOLDER: &str = "{document}";

/// Configuration for summary and quiz generation.
///
/// # Example
/// ```rust
/// use edgequake_pdf2quiz::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .model("mistral:latest")
///     .question_count(8)
///     .build()
///     .unwrap();
/// assert_eq!(config.question_count, 8);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Base URL of the local inference service. Default: `http://localhost:11434`.
    pub endpoint: String,

    /// Model identifier as installed on the service. Default: `llama3:latest`.
    pub model: String,

    /// edgequake-llm provider name (e.g. "openai", "anthropic", "ollama").
    /// When set, requests go through `ProviderFactory` instead of the direct
    /// Ollama HTTP client.
    pub provider_name: Option<String>,

    /// Pre-constructed client. Takes precedence over everything else.
    pub client: Option<Arc<dyn LlmClient>>,

    /// Sampling temperature. Default: 0.3.
    ///
    /// Low enough that the model sticks to the quiz grammar, high enough that
    /// "new quiz" produces different questions.
    pub temperature: f32,

    /// Maximum tokens the model may generate per request. Default: 2048.
    pub max_tokens: usize,

    /// Whole-request timeout in seconds. Default: 300.
    ///
    /// Local models on CPU can take minutes for a long document.
    pub request_timeout_secs: u64,

    /// TCP connect timeout in seconds. Default: 5.
    ///
    /// A refused or silent port is reported as `ServiceUnavailable` quickly
    /// instead of waiting for the full request timeout.
    pub connect_timeout_secs: u64,

    /// Questions to request per quiz. Range: 1–50. Default: 5.
    pub question_count: usize,

    /// Fraction of `question_count` that must parse for the quiz to be
    /// returned (as partial) instead of failing. Range: (0, 1]. Default: 0.6.
    pub min_quiz_ratio: f32,

    /// Characters of document text embedded into a prompt before the tail is
    /// cut with an explicit marker. Default: 12 000.
    pub max_prompt_chars: usize,

    /// Upload cap in bytes. Default: 50 MiB.
    pub max_document_bytes: u64,

    /// Minimum length of pasted text. Default: 50.
    pub min_manual_text_chars: usize,

    /// Separator inserted between page texts. Default: newline.
    pub page_separator: PageSeparator,

    /// Which PDF text extractor to use. Default: [`ExtractorBackend::Lopdf`].
    pub extractor: ExtractorBackend,

    /// Custom summary prompt template containing `{document}`.
    pub summary_prompt: Option<String>,

    /// Custom quiz prompt template containing `{document}` (and optionally
    /// `{question_count}`).
    pub quiz_prompt: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            client: None,
            temperature: 0.3,
            max_tokens: 2048,
            request_timeout_secs: 300,
            connect_timeout_secs: 5,
            question_count: 5,
            min_quiz_ratio: 0.6,
            max_prompt_chars: 12_000,
            max_document_bytes: 50 * 1024 * 1024,
            min_manual_text_chars: 50,
            page_separator: PageSeparator::default(),
            extractor: ExtractorBackend::default(),
            summary_prompt: None,
            quiz_prompt: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("client", &self.client.as_ref().map(|c| c.name().to_string()))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("question_count", &self.question_count)
            .field("min_quiz_ratio", &self.min_quiz_ratio)
            .field("max_prompt_chars", &self.max_prompt_chars)
            .field("max_document_bytes", &self.max_document_bytes)
            .field("extractor", &self.extractor)
            .field("page_separator", &self.page_separator)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Smallest number of valid questions accepted for `requested`.
    ///
    /// `ceil(requested * min_quiz_ratio)`, never below 1.
    pub fn minimum_questions(&self, requested: usize) -> usize {
        minimum_questions(requested, self.min_quiz_ratio)
    }
}

pub(crate) fn minimum_questions(requested: usize, ratio: f32) -> usize {
    // 0.6f32 is slightly above 0.6; the slack keeps 5 × 0.6 at 3.
    let ratio = ratio.clamp(f32::EPSILON, 1.0);
    let exact = requested as f32 * ratio - 1e-4;
    (exact.ceil().max(0.0) as usize).max(1)
}

/// Builder for [`PipelineConfig`].
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl fmt::Debug for PipelineConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl PipelineConfigBuilder {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn client(mut self, client: Arc<dyn LlmClient>) -> Self {
        self.config.client = Some(client);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    pub fn question_count(mut self, n: usize) -> Self {
        self.config.question_count = n;
        self
    }

    pub fn min_quiz_ratio(mut self, ratio: f32) -> Self {
        self.config.min_quiz_ratio = ratio;
        self
    }

    pub fn max_prompt_chars(mut self, n: usize) -> Self {
        self.config.max_prompt_chars = n;
        self
    }

    pub fn max_document_bytes(mut self, n: u64) -> Self {
        self.config.max_document_bytes = n;
        self
    }

    pub fn min_manual_text_chars(mut self, n: usize) -> Self {
        self.config.min_manual_text_chars = n;
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn extractor(mut self, backend: ExtractorBackend) -> Self {
        self.config.extractor = backend;
        self
    }

    pub fn summary_prompt(mut self, template: impl Into<String>) -> Self {
        self.config.summary_prompt = Some(template.into());
        self
    }

    pub fn quiz_prompt(mut self, template: impl Into<String>) -> Self {
        self.config.quiz_prompt = Some(template.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, Pdf2QuizError> {
        let c = &self.config;
        if !(c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://")) {
            return Err(Pdf2QuizError::InvalidConfig(format!(
                "endpoint must be an http(s) URL, got '{}'",
                c.endpoint
            )));
        }
        if c.model.trim().is_empty() {
            return Err(Pdf2QuizError::InvalidConfig("model must not be empty".into()));
        }
        if c.question_count == 0 || c.question_count > 50 {
            return Err(Pdf2QuizError::InvalidConfig(format!(
                "question count must be 1–50, got {}",
                c.question_count
            )));
        }
        if !(c.min_quiz_ratio > 0.0 && c.min_quiz_ratio <= 1.0) {
            return Err(Pdf2QuizError::InvalidConfig(format!(
                "minimum quiz ratio must be in (0, 1], got {}",
                c.min_quiz_ratio
            )));
        }
        if c.max_prompt_chars < 500 {
            return Err(Pdf2QuizError::InvalidConfig(format!(
                "max prompt chars must be ≥ 500, got {}",
                c.max_prompt_chars
            )));
        }
        if c.request_timeout_secs == 0 {
            return Err(Pdf2QuizError::InvalidConfig(
                "request timeout must be ≥ 1s".into(),
            ));
        }
        for (name, template) in [
            ("summary", c.summary_prompt.as_deref()),
            ("quiz", c.quiz_prompt.as_deref()),
        ] {
            if let Some(t) = template {
                if !t.contains(DOCUMENT_PLACEHOLDER) {
                    return Err(Pdf2QuizError::InvalidConfig(format!(
                        "{name} prompt template must contain {DOCUMENT_PLACEHOLDER}"
                    )));
                }
            }
        }
        #[cfg(not(feature = "pdfium"))]
        if c.extractor == ExtractorBackend::Pdfium {
            return Err(Pdf2QuizError::InvalidConfig(
                "the pdfium extractor requires the `pdfium` feature".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Text extraction backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExtractorBackend {
    /// Pure-Rust `lopdf` content-stream decoding. (default)
    #[default]
    Lopdf,
    /// The pdfium C++ library, bound from `PDFIUM_LIB_PATH` or the system
    /// library path. Better with unusual font encodings.
    Pdfium,
}

/// How to separate page texts in the extracted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// A single newline. (default)
    #[default]
    Newline,
    /// A blank line between pages.
    BlankLine,
    /// A marker line with the page number: "--- page N ---".
    Marker,
    /// Custom string inserted between pages.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator placed before page `page_num` (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::Newline => "\n".to_string(),
            PageSeparator::BlankLine => "\n\n".to_string(),
            PageSeparator::Marker => format!("\n--- page {} ---\n", page_num),
            PageSeparator::Custom(s) => s.clone(),
        }
    }
}
