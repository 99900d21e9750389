//! The per-user session: one document, its summary and its quiz.
//!
//! [`Workspace`] is what a presentation layer holds on to. Each user action
//! maps to one method (upload → [`Workspace::load_pdf`], "Generate quiz" →
//! [`Workspace::generate_quiz`], a radio-button click →
//! [`Workspace::select_answer`], …). Methods that call the LLM take
//! `&mut self`, so two requests for the same workspace can never overlap.
//!
//! ## Lifecycle rules
//!
//! - Loading a document (PDF or text) discards the previous summary and
//!   quiz. A failed load leaves the workspace unchanged.
//! - A failed summary keeps the previous summary.
//! - Generating a quiz discards the previous quiz *before* the request is
//!   sent, so a failure leaves the session `Empty` rather than showing a
//!   stale quiz for a newly requested one.

use crate::config::PipelineConfig;
use crate::error::{Pdf2QuizError, SessionError};
use crate::output::{ExtractedText, ModelStatus, Quiz, Summary};
use crate::pipeline::extract::extract_document;
use crate::pipeline::input::{check_size, load_input};
use crate::pipeline::llm::{self, resolve_client, LlmClient};
use crate::progress::{track, Task};
use crate::quiz::QuizGenerator;
use crate::session::QuizSession;
use crate::summary::SummaryGenerator;
use std::sync::Arc;
use tracing::info;

/// Owned state for one user working on one document at a time.
pub struct Workspace {
    config: PipelineConfig,
    client: Arc<dyn LlmClient>,
    summaries: SummaryGenerator,
    quizzes: QuizGenerator,
    document: Option<ExtractedText>,
    document_name: Option<String>,
    summary: Option<Summary>,
    session: QuizSession,
}

impl Workspace {
    /// Create an empty workspace. Resolves the LLM client once.
    pub fn new(config: PipelineConfig) -> Result<Self, Pdf2QuizError> {
        let client = resolve_client(&config)?;
        Ok(Self {
            summaries: SummaryGenerator::with_client(Arc::clone(&client), &config),
            quizzes: QuizGenerator::with_client(Arc::clone(&client), &config),
            client,
            config,
            document: None,
            document_name: None,
            summary: None,
            session: QuizSession::new(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    // ── Document ──────────────────────────────────────────────────────────

    /// Extract text from uploaded PDF bytes and make it the current document.
    pub async fn load_pdf(
        &mut self,
        name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<&ExtractedText, Pdf2QuizError> {
        let name = name.into();
        info!("Loading PDF '{}' ({} bytes)", name, bytes.len());

        let text = track(self.config.progress_callback.as_ref(), Task::ExtractText, async {
            check_size(bytes.len() as u64, self.config.max_document_bytes)?;
            extract_document(
                bytes,
                self.config.extractor,
                self.config.page_separator.clone(),
            )
            .await
        })
        .await?;

        Ok(self.replace_document(text, name))
    }

    /// Load a local path or URL, then extract it like [`Self::load_pdf`].
    pub async fn load_path(&mut self, input: &str) -> Result<&ExtractedText, Pdf2QuizError> {
        let loaded = load_input(
            input,
            self.config.max_document_bytes,
            self.config.download_timeout_secs,
        )
        .await?;
        self.load_pdf(loaded.name, loaded.bytes).await
    }

    /// Use pasted text as the current document.
    pub fn load_text(&mut self, text: &str) -> Result<&ExtractedText, Pdf2QuizError> {
        let text = ExtractedText::from_manual(text, self.config.min_manual_text_chars)?;
        info!("Loaded {} characters of pasted text", text.char_count());
        Ok(self.replace_document(text, "pasted text".to_string()))
    }

    fn replace_document(&mut self, text: ExtractedText, name: String) -> &ExtractedText {
        self.summary = None;
        self.session.reset();
        self.document_name = Some(name);
        self.document.insert(text)
    }

    pub fn document(&self) -> Option<&ExtractedText> {
        self.document.as_ref()
    }

    pub fn document_name(&self) -> Option<&str> {
        self.document_name.as_deref()
    }

    // ── Summary ───────────────────────────────────────────────────────────

    /// Summarise the current document, replacing any previous summary.
    pub async fn generate_summary(&mut self) -> Result<&Summary, Pdf2QuizError> {
        let document = self.document.as_ref().ok_or(Pdf2QuizError::NoDocument)?;
        let summary = self.summaries.summarize(document).await?;
        Ok(self.summary.insert(summary))
    }

    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    // ── Quiz ──────────────────────────────────────────────────────────────

    /// Generate `config.question_count` questions and start a new attempt.
    pub async fn generate_quiz(&mut self) -> Result<&Quiz, Pdf2QuizError> {
        self.generate_quiz_with(self.config.question_count).await
    }

    /// Generate `question_count` questions and start a new attempt.
    pub async fn generate_quiz_with(&mut self, question_count: usize) -> Result<&Quiz, Pdf2QuizError> {
        let document = self.document.as_ref().ok_or(Pdf2QuizError::NoDocument)?;
        self.session.reset();
        let quiz = self.quizzes.generate(document, question_count).await?;
        self.session.load_quiz(quiz);
        self.session
            .quiz()
            .ok_or_else(|| Pdf2QuizError::Internal("quiz missing after load".into()))
    }

    /// Discard the current quiz (answered or not) and generate a fresh one.
    pub async fn new_quiz(&mut self) -> Result<&Quiz, Pdf2QuizError> {
        let count = self
            .session
            .quiz()
            .map_or(self.config.question_count, Quiz::requested);
        self.generate_quiz_with(count).await
    }

    /// Record an answer for question `index` (choice text or label).
    pub fn select_answer(&mut self, index: usize, choice: &str) -> Result<(), SessionError> {
        self.session.set_answer(index, choice)
    }

    /// Grade the quiz. Idempotent.
    pub fn submit_quiz(&mut self) -> Result<usize, SessionError> {
        self.session.submit()
    }

    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    // ── Misc ──────────────────────────────────────────────────────────────

    /// Forget the document, summary and quiz.
    pub fn reset(&mut self) {
        self.document = None;
        self.document_name = None;
        self.summary = None;
        self.session.reset();
    }

    /// Check the configured model against the LLM service.
    pub async fn check_model(&self) -> ModelStatus {
        let cb = self.config.progress_callback.as_ref();
        if let Some(cb) = cb {
            cb.on_task_start(Task::CheckModel);
        }
        let status = llm::check_model(self.client.as_ref(), &self.config.model).await;
        if let Some(cb) = cb {
            match &status {
                ModelStatus::Available(_) => cb.on_task_complete(Task::CheckModel),
                ModelStatus::Missing { model, .. } => cb.on_task_error(
                    Task::CheckModel,
                    &Pdf2QuizError::ModelNotFound {
                        model: model.clone(),
                    }
                    .to_string(),
                ),
                ModelStatus::Unreachable { reason } => cb.on_task_error(Task::CheckModel, reason),
            }
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::{MockLlm, MockReply};
    use crate::session::SessionState;

    const DOC: &str = "The sun is a star at the centre of our solar system. It is very hot.";

    const ONE_QUESTION: &str = "QUESTION: What is the sun?\nA) A planet\nB) A star\nC) A moon\nD) A comet\nANSWER: B";

    fn workspace(mock: Arc<MockLlm>) -> Workspace {
        let config = PipelineConfig::builder()
            .client(mock)
            .question_count(1)
            .build()
            .unwrap();
        Workspace::new(config).unwrap()
    }

    #[tokio::test]
    async fn actions_before_loading_fail_cleanly() {
        let mut ws = workspace(Arc::new(MockLlm::new(MockReply::text("x"))));
        assert!(matches!(
            ws.generate_summary().await.unwrap_err(),
            Pdf2QuizError::NoDocument
        ));
        assert!(matches!(
            ws.generate_quiz().await.unwrap_err(),
            Pdf2QuizError::NoDocument
        ));
        assert_eq!(ws.select_answer(0, "A"), Err(SessionError::NoQuiz));
    }

    #[tokio::test]
    async fn short_text_is_rejected() {
        let mut ws = workspace(Arc::new(MockLlm::new(MockReply::text("x"))));
        assert!(matches!(
            ws.load_text("tiny").unwrap_err(),
            Pdf2QuizError::InputTooShort { .. }
        ));
        assert!(ws.document().is_none());
    }

    #[tokio::test]
    async fn full_flow() {
        let mock = Arc::new(MockLlm::with_sequence(vec![
            MockReply::text("The sun is a star."),
            MockReply::text(ONE_QUESTION),
        ]));
        let mut ws = workspace(mock);
        ws.load_text(DOC).unwrap();

        let summary = ws.generate_summary().await.unwrap();
        assert_eq!(summary.text, "The sun is a star.");

        assert_eq!(ws.generate_quiz().await.unwrap().len(), 1);
        ws.select_answer(0, "B").unwrap();
        assert_eq!(ws.submit_quiz(), Ok(1));
        assert_eq!(ws.submit_quiz(), Ok(1));
        assert_eq!(ws.session().state(), SessionState::Submitted);
    }

    #[tokio::test]
    async fn new_document_discards_summary_and_quiz() {
        let mock = Arc::new(MockLlm::with_sequence(vec![
            MockReply::text("Summary."),
            MockReply::text(ONE_QUESTION),
        ]));
        let mut ws = workspace(mock);
        ws.load_text(DOC).unwrap();
        ws.generate_summary().await.unwrap();
        ws.generate_quiz().await.unwrap();

        ws.load_text(&DOC.repeat(2)).unwrap();
        assert!(ws.summary().is_none());
        assert_eq!(ws.session().state(), SessionState::Empty);
    }

    #[tokio::test]
    async fn failed_regeneration_leaves_session_empty() {
        let mock = Arc::new(MockLlm::with_sequence(vec![
            MockReply::text(ONE_QUESTION),
            MockReply::Unavailable,
        ]));
        let mut ws = workspace(mock);
        ws.load_text(DOC).unwrap();
        ws.generate_quiz().await.unwrap();
        ws.select_answer(0, "A").unwrap();

        let err = ws.new_quiz().await.unwrap_err();
        assert!(matches!(err, Pdf2QuizError::ServiceUnavailable { .. }));
        assert_eq!(ws.session().state(), SessionState::Empty);
        assert!(ws.document().is_some());
    }

    #[tokio::test]
    async fn failed_pdf_load_keeps_previous_document() {
        let mut ws = workspace(Arc::new(MockLlm::new(MockReply::text("x"))));
        ws.load_text(DOC).unwrap();
        let err = ws.load_pdf("bad.pdf", b"not a pdf".to_vec()).await.unwrap_err();
        assert!(matches!(err, Pdf2QuizError::UnreadableDocument { .. }));
        assert_eq!(ws.document().map(|d| d.as_str()), Some(DOC));
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let config = PipelineConfig::builder()
            .client(Arc::new(MockLlm::new(MockReply::text("x"))))
            .max_document_bytes(8)
            .build()
            .unwrap();
        let mut ws = Workspace::new(config).unwrap();
        let err = ws.load_pdf("big.pdf", vec![0u8; 16]).await.unwrap_err();
        assert!(matches!(err, Pdf2QuizError::DocumentTooLarge { size: 16, limit: 8 }));
    }

    #[tokio::test]
    async fn reset_clears_everything() {
        let mut ws = workspace(Arc::new(MockLlm::new(MockReply::text("S."))));
        ws.load_text(DOC).unwrap();
        ws.generate_summary().await.unwrap();
        ws.reset();
        assert!(ws.document().is_none());
        assert!(ws.summary().is_none());
        assert!(ws.document_name().is_none());
    }

    #[tokio::test]
    async fn check_model_uses_configured_name() {
        let mock = Arc::new(MockLlm::new(MockReply::text("x")).with_models(&["llama3:latest"]));
        let ws = workspace(mock);
        assert!(matches!(ws.check_model().await, ModelStatus::Available(_)));
    }
}
