//! Progress-callback trait for long-running pipeline tasks.
//!
//! Text extraction and every LLM call can take from seconds to minutes. Inject
//! an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to learn when a
//! task starts and ends, so the presentation layer can show a busy indicator
//! for exactly that span.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2quiz::{PipelineConfig, PipelineProgressCallback, Task};
//! use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
//!
//! struct Busy(AtomicBool);
//!
//! impl PipelineProgressCallback for Busy {
//!     fn on_task_start(&self, _task: Task) {
//!         self.0.store(true, Ordering::SeqCst);
//!     }
//!     fn on_task_complete(&self, _task: Task) {
//!         self.0.store(false, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(Arc::new(Busy(AtomicBool::new(false))))
//!     .build()
//!     .unwrap();
//! ```

use crate::error::QuizWarning;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A unit of work that is reported to the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Task {
    /// Reading text out of an uploaded PDF.
    ExtractText,
    /// Waiting on the LLM for a summary.
    Summarize,
    /// Waiting on the LLM for quiz questions and parsing them.
    GenerateQuiz,
    /// Listing installed models.
    CheckModel,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Task::ExtractText => "Reading document content",
            Task::Summarize => "Generating summary",
            Task::GenerateQuiz => "Creating quiz questions",
            Task::CheckModel => "Checking model availability",
        };
        f.write_str(label)
    }
}

/// Called by the pipeline around each long-running task.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Exactly one of `on_task_complete` / `on_task_error`
/// follows every `on_task_start`.
pub trait PipelineProgressCallback: Send + Sync {
    /// The task began; show an "in progress" state.
    fn on_task_start(&self, task: Task) {
        let _ = task;
    }

    /// The task finished successfully.
    fn on_task_complete(&self, task: Task) {
        let _ = task;
    }

    /// The task failed; `error` is the user-facing message.
    fn on_task_error(&self, task: Task, error: &str) {
        let _ = (task, error);
    }

    /// A quiz was produced with a non-fatal warning.
    fn on_quiz_warning(&self, warning: &QuizWarning) {
        let _ = warning;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

/// Bracket `fut` with start/complete/error notifications for `task`.
pub(crate) async fn track<T, E, F>(
    callback: Option<&ProgressCallback>,
    task: Task,
    fut: F,
) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    if let Some(cb) = callback {
        cb.on_task_start(task);
    }
    let result = fut.await;
    if let Some(cb) = callback {
        match &result {
            Ok(_) => cb.on_task_complete(task),
            Err(e) => cb.on_task_error(task, &e.to_string()),
        }
    }
    result
}
