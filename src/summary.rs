//! Summary generation: one prompt, one LLM call, one cleanup pass.
//!
//! No retry happens here. A failed summary is reported once with the
//! client's own error; the user regenerates by triggering the action again.

use crate::config::PipelineConfig;
use crate::error::Pdf2QuizError;
use crate::output::{ExtractedText, Summary};
use crate::pipeline::llm::{resolve_client, GenerationOptions, LlmClient};
use crate::pipeline::postprocess::clean_summary;
use crate::progress::{track, ProgressCallback, Task};
use crate::prompts::{prepare_document, summary_prompt};
use std::sync::Arc;
use tracing::{debug, info};

/// Produces a [`Summary`] for an [`ExtractedText`].
pub struct SummaryGenerator {
    client: Arc<dyn LlmClient>,
    options: GenerationOptions,
    template: Option<String>,
    max_prompt_chars: usize,
    progress: Option<ProgressCallback>,
}

impl SummaryGenerator {
    /// Build a generator using the client selected by `config`.
    pub fn new(config: &PipelineConfig) -> Result<Self, Pdf2QuizError> {
        Ok(Self::with_client(resolve_client(config)?, config))
    }

    /// Build a generator over an explicit client.
    pub fn with_client(client: Arc<dyn LlmClient>, config: &PipelineConfig) -> Self {
        Self {
            client,
            options: GenerationOptions::from_config(config),
            template: config.summary_prompt.clone(),
            max_prompt_chars: config.max_prompt_chars,
            progress: config.progress_callback.clone(),
        }
    }

    /// Summarise `text`.
    ///
    /// Errors from the LLM client are returned unchanged. A reply that is
    /// empty after cleanup is a `MalformedResponse`.
    pub async fn summarize(&self, text: &ExtractedText) -> Result<Summary, Pdf2QuizError> {
        let prepared = prepare_document(text.as_str(), self.max_prompt_chars);
        let prompt = summary_prompt(self.template.as_deref(), &prepared.text);
        debug!("Summary prompt: {} chars", prompt.len());

        track(self.progress.as_ref(), Task::Summarize, async {
            let raw = self.client.complete(&prompt, &self.options).await?;
            let cleaned = clean_summary(&raw);
            if cleaned.is_empty() {
                return Err(Pdf2QuizError::MalformedResponse {
                    detail: "the summary was empty after cleanup".into(),
                });
            }
            info!("Summary generated: {} chars", cleaned.chars().count());
            Ok(Summary {
                text: cleaned,
                source_truncated: prepared.truncated,
            })
        })
        .await
    }
}

/// One-shot helper: resolve a client from `config` and summarise `text`.
pub async fn summarize(text: &ExtractedText, config: &PipelineConfig) -> Result<Summary, Pdf2QuizError> {
    SummaryGenerator::new(config)?.summarize(text).await
}
