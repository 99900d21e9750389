//! # edgequake-pdf2quiz
//!
//! Turn a PDF (or pasted text) into a summary and a graded multiple-choice
//! quiz using a locally hosted LLM.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes / text
//!  │
//!  ├─ 1. Input     read a local file or download a URL (size-capped)
//!  ├─ 2. Extract   page text in order via lopdf (spawn_blocking)
//!  ├─ 3. Prompt    embed the text, truncating the tail with a marker
//!  ├─ 4. LLM       Ollama /api/generate (or any edgequake-llm provider)
//!  ├─ 5. Parse     tagged quiz grammar → validated questions
//!  └─ 6. Session   answer, submit, score
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2quiz::{PipelineConfig, Workspace};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder().model("llama3:latest").build()?;
//!     let mut ws = Workspace::new(config)?;
//!
//!     ws.load_path("lecture.pdf").await?;
//!     println!("{}", ws.generate_summary().await?.text);
//!
//!     let quiz = ws.generate_quiz().await?;
//!     for q in quiz.questions() {
//!         println!("{}", q.prompt());
//!     }
//!     ws.select_answer(0, "B")?;
//!     println!("score: {}", ws.submit_quiz()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `pdf2quiz` binary (clap + indicatif + anyhow + tracing-subscriber) |
//! | `pdfium` | off     | Adds the pdfium text extractor (needs `libpdfium` at runtime) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2quiz = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod quiz;
pub mod session;
pub mod summary;
pub mod workspace;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractorBackend, PageSeparator, PipelineConfig, PipelineConfigBuilder};
pub use error::{ErrorKind, Pdf2QuizError, QuizWarning, RejectReason, SessionError};
pub use output::{ExtractedText, ModelInfo, ModelStatus, Question, Quiz, Summary, TextSource};
pub use pipeline::extract::{extract, extract_document, TextExtractor};
pub use pipeline::llm::{check_model, GenerationOptions, LlmClient, MockLlm, MockReply, OllamaClient};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback, Task};
pub use quiz::{generate_quiz, QuizGenerator};
pub use session::{QuestionResult, QuizSession, SessionSnapshot, SessionState};
pub use summary::{summarize, SummaryGenerator};
pub use workspace::Workspace;
