//! Pipeline stages for document → summary / quiz.
//!
//! Each submodule implements exactly one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ llm ──▶ postprocess ──▶ quiz_parser
//! (path/URL) (lopdf)   (Ollama)  (cleanup)      (validate)
//! ```
//!
//! 1. [`input`]   — read a local path or download a URL into memory, with
//!    the upload cap applied
//! 2. [`extract`] — page text in document order; runs in `spawn_blocking`
//! 3. [`llm`]     — the only stage with network I/O
//! 4. [`postprocess`] — deterministic cleanup of model replies
//! 5. [`quiz_parser`] — turn a reply into validated questions plus a list of
//!    rejected candidates

pub mod extract;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod quiz_parser;
