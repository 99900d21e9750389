//! Data produced by the pipeline: extracted text, summaries, quizzes and
//! model information.
//!
//! Every type here is `Serialize` so a presentation layer can ship it to a
//! browser or dump it as JSON (`pdf2quiz quiz --json`). Types that carry an
//! invariant ([`ExtractedText`], [`Question`]) keep their fields private and
//! are only constructible through validating functions.

use crate::error::{Pdf2QuizError, QuizWarning, RejectReason};
use serde::Serialize;

/// Number of choices every question carries.
pub const CHOICES_PER_QUESTION: usize = 4;

// ── Extracted text ────────────────────────────────────────────────────────

/// Where a piece of [`ExtractedText`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextSource {
    /// Concatenated page text of an uploaded PDF.
    Pdf,
    /// Text pasted or typed by the user.
    Manual,
}

/// Plain text ready to be embedded into a prompt.
///
/// Never empty: extraction failures surface as
/// [`Pdf2QuizError::UnreadableDocument`] rather than an empty success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedText {
    text: String,
    source: TextSource,
    page_count: usize,
}

impl ExtractedText {
    /// Wrap text extracted from a PDF. Fails when `text` is blank.
    pub fn from_pdf(text: String, page_count: usize) -> Result<Self, Pdf2QuizError> {
        if text.trim().is_empty() {
            return Err(Pdf2QuizError::UnreadableDocument {
                reason: format!("no extractable text across {page_count} page(s)"),
            });
        }
        Ok(Self {
            text,
            source: TextSource::Pdf,
            page_count,
        })
    }

    /// Wrap manually entered text, requiring at least `min_chars` characters
    /// after trimming.
    pub fn from_manual(text: &str, min_chars: usize) -> Result<Self, Pdf2QuizError> {
        let trimmed = text.trim();
        let length = trimmed.chars().count();
        if length < min_chars.max(1) {
            return Err(Pdf2QuizError::InputTooShort {
                length,
                minimum: min_chars.max(1),
            });
        }
        Ok(Self {
            text: trimmed.to_string(),
            source: TextSource::Manual,
            page_count: 0,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> TextSource {
        self.source
    }

    /// Number of PDF pages the text was drawn from (0 for manual input).
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// The first `max_chars` characters, with an ellipsis when cut.
    pub fn preview(&self, max_chars: usize) -> String {
        if self.char_count() <= max_chars {
            return self.text.clone();
        }
        let head: String = self.text.chars().take(max_chars).collect();
        format!("{}…", head.trim_end())
    }
}

// ── Summary ───────────────────────────────────────────────────────────────

/// Prose summary of a document. Replaced wholesale on regeneration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// The cleaned summary text.
    pub text: String,
    /// `true` when the source text was cut to fit the prompt budget, so the
    /// summary covers only the leading part of the document.
    pub source_truncated: bool,
}

// ── Quiz ──────────────────────────────────────────────────────────────────

/// A multiple-choice question with exactly [`CHOICES_PER_QUESTION`]
/// distinct, non-empty choices and one correct choice among them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    prompt: String,
    choices: Vec<String>,
    correct: usize,
    explanation: Option<String>,
}

impl Question {
    /// Validate and build a question.
    ///
    /// Choices are compared case-insensitively after trimming; duplicates are
    /// rejected rather than silently merged.
    pub fn new(
        prompt: impl Into<String>,
        choices: Vec<String>,
        correct: usize,
        explanation: Option<String>,
    ) -> Result<Self, RejectReason> {
        let prompt = prompt.into().trim().to_string();
        if prompt.is_empty() {
            return Err(RejectReason::EmptyPrompt);
        }
        if choices.len() != CHOICES_PER_QUESTION {
            return Err(RejectReason::WrongChoiceCount(choices.len()));
        }
        let choices: Vec<String> = choices.into_iter().map(|c| c.trim().to_string()).collect();
        if choices.iter().any(|c| c.is_empty()) {
            return Err(RejectReason::EmptyChoice);
        }
        let folded: Vec<String> = choices.iter().map(|c| c.to_lowercase()).collect();
        for (i, a) in folded.iter().enumerate() {
            if folded[..i].contains(a) {
                return Err(RejectReason::DuplicateChoice(choices[i].clone()));
            }
        }
        if correct >= choices.len() {
            return Err(RejectReason::UnknownAnswer(correct.to_string()));
        }
        let explanation = explanation
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        Ok(Self {
            prompt,
            choices,
            correct,
            explanation,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    /// Index of the correct choice.
    pub fn correct_index(&self) -> usize {
        self.correct
    }

    /// Text of the correct choice.
    pub fn correct_choice(&self) -> &str {
        &self.choices[self.correct]
    }

    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    /// Position of `choice` among this question's choices (exact match
    /// first, then case-insensitive).
    pub fn choice_index(&self, choice: &str) -> Option<usize> {
        let choice = choice.trim();
        self.choices
            .iter()
            .position(|c| c == choice)
            .or_else(|| {
                let lower = choice.to_lowercase();
                self.choices.iter().position(|c| c.to_lowercase() == lower)
            })
    }
}

/// An ordered, fixed-length sequence of questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quiz {
    questions: Vec<Question>,
    requested: usize,
    warning: Option<QuizWarning>,
}

impl Quiz {
    pub(crate) fn new(questions: Vec<Question>, requested: usize, warning: Option<QuizWarning>) -> Self {
        Self {
            questions,
            requested,
            warning,
        }
    }

    /// Build a quiz directly from validated questions, e.g. for tests or a
    /// presentation layer restoring a saved quiz.
    pub fn from_questions(questions: Vec<Question>) -> Self {
        let requested = questions.len();
        Self::new(questions, requested, None)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// How many questions the prompt asked for.
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Set when the quiz is shorter than requested or candidates were dropped.
    pub fn warning(&self) -> Option<&QuizWarning> {
        self.warning.as_ref()
    }

    pub fn is_partial(&self) -> bool {
        self.warning.is_some()
    }
}

// ── Models ────────────────────────────────────────────────────────────────

/// An installed model as reported by the LLM service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ModelInfo {
    pub name: String,
    /// Size on disk in bytes, when reported.
    pub size: Option<u64>,
    pub modified_at: Option<String>,
    pub family: Option<String>,
    /// Human-readable parameter count, e.g. `"8.0B"`.
    pub parameter_size: Option<String>,
}

impl ModelInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Result of checking the configured model against the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ModelStatus {
    /// The model is installed.
    Available(ModelInfo),
    /// The service answered but the model is not among `installed`.
    Missing { model: String, installed: Vec<String> },
    /// The service could not be reached.
    Unreachable { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choices(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn question_accepts_four_distinct_choices() {
        let q = Question::new("Sky colour?", choices(&["Red", "Blue", "Green", "Black"]), 1, None)
            .expect("valid");
        assert_eq!(q.correct_choice(), "Blue");
        assert_eq!(q.choice_index("blue"), Some(1));
        assert_eq!(q.choice_index("Purple"), None);
    }

    #[test]
    fn question_rejects_duplicates_case_insensitively() {
        let err = Question::new("Q", choices(&["Red", "red", "Green", "Black"]), 0, None).unwrap_err();
        assert_eq!(err, RejectReason::DuplicateChoice("red".into()));
    }

    #[test]
    fn question_rejects_wrong_count_and_empty() {
        assert_eq!(
            Question::new("Q", choices(&["a", "b", "c"]), 0, None).unwrap_err(),
            RejectReason::WrongChoiceCount(3)
        );
        assert_eq!(
            Question::new("Q", choices(&["a", " ", "c", "d"]), 0, None).unwrap_err(),
            RejectReason::EmptyChoice
        );
        assert_eq!(
            Question::new("  ", choices(&["a", "b", "c", "d"]), 0, None).unwrap_err(),
            RejectReason::EmptyPrompt
        );
    }

    #[test]
    fn blank_explanation_is_dropped() {
        let q = Question::new("Q", choices(&["a", "b", "c", "d"]), 3, Some("   ".into())).unwrap();
        assert_eq!(q.explanation(), None);
    }

    #[test]
    fn extracted_text_rejects_blank_pdf_text() {
        let err = ExtractedText::from_pdf("  \n\n ".into(), 3).unwrap_err();
        assert!(matches!(err, Pdf2QuizError::UnreadableDocument { .. }));
    }

    #[test]
    fn manual_text_minimum_length() {
        let err = ExtractedText::from_manual("too short", 50).unwrap_err();
        assert!(matches!(
            err,
            Pdf2QuizError::InputTooShort { length: 9, minimum: 50 }
        ));
        let ok = ExtractedText::from_manual(&"x".repeat(60), 50).unwrap();
        assert_eq!(ok.source(), TextSource::Manual);
        assert_eq!(ok.page_count(), 0);
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let t = ExtractedText::from_pdf("héllo wörld".into(), 1).unwrap();
        assert_eq!(t.preview(5), "héllo…");
        assert_eq!(t.preview(100), "héllo wörld");
    }
}
