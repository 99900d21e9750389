//! Error types for the edgequake-pdf2quiz library.
//!
//! Three distinct error types reflect three distinct failure modes:
//!
//! * [`Pdf2QuizError`] — **Fatal** for the action that raised it: the
//!   document could not be read, the LLM service is unreachable, the model
//!   is missing, or the model's reply could not be turned into a quiz.
//!   Returned as `Err(Pdf2QuizError)` from every pipeline entry point.
//!
//! * [`QuizWarning`] — **Non-fatal**: the quiz was generated but is shorter
//!   than requested, or some candidate questions were rejected. Stored on
//!   [`crate::output::Quiz`] so callers can show a notice next to a usable
//!   quiz instead of losing the whole result.
//!
//! * [`SessionError`] — a caller drove the quiz state machine out of order
//!   (answering before a quiz is loaded, answering after submission, …).
//!
//! None of these ever terminate the process; the presentation layer decides
//! how to render them. Each `Display` message names the failure and what
//! the user can do about it.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2quiz library.
#[derive(Debug, Error)]
pub enum Pdf2QuizError {
    // ── Document errors ───────────────────────────────────────────────────
    /// The bytes are not a readable PDF, or no page carries extractable text.
    #[error("Document is unreadable: {reason}\nScanned (image-only) PDFs carry no text layer; try pasting the text instead.")]
    UnreadableDocument { reason: String },

    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// The document exceeds the configured upload cap.
    #[error("Document is {size} bytes, larger than the {limit}-byte limit")]
    DocumentTooLarge { size: u64, limit: u64 },

    /// Pasted text is too short to summarise meaningfully.
    #[error("Please enter more text (at least {minimum} characters, got {length})")]
    InputTooShort { length: usize, minimum: usize },

    /// A summary or quiz was requested before any document was loaded.
    #[error("No document loaded.\nUpload a PDF or paste some text first.")]
    NoDocument,

    // ── LLM service errors ────────────────────────────────────────────────
    /// Connection refused or timed out: the service is not running, or the
    /// endpoint is wrong.
    #[error("Cannot reach the LLM service at {endpoint}: {reason}\nMake sure Ollama is running (`ollama serve`) on that address.")]
    ServiceUnavailable { endpoint: String, reason: String },

    /// The configured model is not installed on the service.
    #[error("Model '{model}' is not available on the LLM service.\nPull it using: ollama pull {model}")]
    ModelNotFound { model: String },

    /// The service answered, but with a payload we could not interpret.
    #[error("LLM service returned a malformed response: {detail}")]
    MalformedResponse { detail: String },

    /// The service answered with a non-success status that is not one of the
    /// cases above.
    #[error("LLM API error (HTTP {status}): {message}")]
    LlmApiError { status: u16, message: String },

    /// The configured edgequake-llm provider could not be constructed.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Quiz errors ───────────────────────────────────────────────────────
    /// Too few well-formed questions in the model's reply.
    #[error("Could not build a quiz: {accepted} valid question(s) of {requested} requested (minimum {minimum}).\nFirst problem: {first_problem}\nTry generating the quiz again.")]
    QuizParseFailure {
        requested: usize,
        accepted: usize,
        minimum: usize,
        first_problem: String,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of [`Pdf2QuizError`] for presentation code that
/// wants to branch (icon, retry button, …) without matching every field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ErrorKind {
    UnreadableDocument,
    InvalidInput,
    ServiceUnavailable,
    ModelNotFound,
    MalformedResponse,
    QuizParseFailure,
    Configuration,
    Internal,
}

impl Pdf2QuizError {
    /// The coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Pdf2QuizError::UnreadableDocument { .. } => ErrorKind::UnreadableDocument,
            Pdf2QuizError::FileNotFound { .. }
            | Pdf2QuizError::PermissionDenied { .. }
            | Pdf2QuizError::DownloadFailed { .. }
            | Pdf2QuizError::DocumentTooLarge { .. }
            | Pdf2QuizError::InputTooShort { .. }
            | Pdf2QuizError::NoDocument => ErrorKind::InvalidInput,
            Pdf2QuizError::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
            Pdf2QuizError::ModelNotFound { .. } => ErrorKind::ModelNotFound,
            Pdf2QuizError::MalformedResponse { .. } | Pdf2QuizError::LlmApiError { .. } => {
                ErrorKind::MalformedResponse
            }
            Pdf2QuizError::QuizParseFailure { .. } => ErrorKind::QuizParseFailure,
            Pdf2QuizError::ProviderNotConfigured { .. } | Pdf2QuizError::InvalidConfig(_) => {
                ErrorKind::Configuration
            }
            Pdf2QuizError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// A non-fatal problem attached to a successfully generated quiz.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum QuizWarning {
    /// Fewer questions than requested survived validation.
    #[error("Quiz is partial: {accepted} of {requested} requested questions ({rejected} rejected as malformed)")]
    PartialQuiz {
        requested: usize,
        accepted: usize,
        rejected: usize,
    },
}

/// Out-of-order use of [`crate::session::QuizSession`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No quiz has been loaded into the session.
    #[error("No quiz loaded; generate a quiz first")]
    NoQuiz,

    /// The quiz was already graded; load a new quiz to answer again.
    #[error("Quiz already submitted; create a new quiz to try again")]
    AlreadySubmitted,

    /// Question index past the end of the quiz.
    #[error("Question {index} does not exist (quiz has {len} questions)")]
    QuestionOutOfRange { index: usize, len: usize },

    /// The selected choice is not one of the question's choices.
    #[error("'{choice}' is not a choice of question {index}")]
    UnknownChoice { index: usize, choice: String },
}

/// Why a candidate question was rejected by the quiz parser.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize)]
pub enum RejectReason {
    #[error("question text is empty")]
    EmptyPrompt,

    #[error("expected exactly 4 choices, found {0}")]
    WrongChoiceCount(usize),

    #[error("a choice is empty")]
    EmptyChoice,

    #[error("duplicate choice text '{0}'")]
    DuplicateChoice(String),

    #[error("choice label '{0}' used twice")]
    DuplicateLabel(char),

    #[error("choice label '{0}' is not one of A–D")]
    UnexpectedLabel(char),

    #[error("no correct-answer marker")]
    MissingAnswer,

    #[error("answer '{0}' does not match any choice")]
    UnknownAnswer(String),

    #[error("answer markers disagree")]
    AmbiguousAnswer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_not_found_mentions_pull_hint() {
        let e = Pdf2QuizError::ModelNotFound {
            model: "llama3:latest".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("ollama pull llama3:latest"), "got: {msg}");
        assert_eq!(e.kind(), ErrorKind::ModelNotFound);
    }

    #[test]
    fn service_unavailable_names_endpoint() {
        let e = Pdf2QuizError::ServiceUnavailable {
            endpoint: "http://localhost:11434".into(),
            reason: "connection refused".into(),
        };
        assert!(e.to_string().contains("http://localhost:11434"));
        assert_eq!(e.kind(), ErrorKind::ServiceUnavailable);
    }

    #[test]
    fn messages_are_distinct_per_kind() {
        let unreadable = Pdf2QuizError::UnreadableDocument {
            reason: "not a PDF".into(),
        }
        .to_string();
        let unreachable = Pdf2QuizError::ServiceUnavailable {
            endpoint: "x".into(),
            reason: "y".into(),
        }
        .to_string();
        let missing = Pdf2QuizError::ModelNotFound { model: "m".into() }.to_string();
        assert_ne!(unreadable, unreachable);
        assert_ne!(unreachable, missing);
        assert!(unreadable.contains("unreadable"));
    }

    #[test]
    fn quiz_parse_failure_display() {
        let e = Pdf2QuizError::QuizParseFailure {
            requested: 5,
            accepted: 1,
            minimum: 3,
            first_problem: "no correct-answer marker".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("1 valid question(s) of 5"), "got: {msg}");
        assert!(msg.contains("minimum 3"));
    }

    #[test]
    fn partial_warning_display() {
        let w = QuizWarning::PartialQuiz {
            requested: 6,
            accepted: 5,
            rejected: 1,
        };
        assert!(w.to_string().contains("5 of 6"));
    }

    #[test]
    fn session_error_display() {
        let e = SessionError::QuestionOutOfRange { index: 7, len: 5 };
        assert!(e.to_string().contains("5 questions"));
    }
}
