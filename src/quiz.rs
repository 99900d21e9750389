//! Quiz generation: prompt → LLM → parse → accept, accept partially, or fail.
//!
//! ## Acceptance rule
//!
//! With `requested` questions asked for and `minimum =
//! max(1, ceil(requested × min_quiz_ratio))` (ratio 0.6 by default):
//!
//! | valid questions parsed | outcome                                   |
//! |------------------------|-------------------------------------------|
//! | `< minimum`            | `Err(QuizParseFailure)`                    |
//! | `minimum ..< requested`| `Ok(quiz)` with `PartialQuiz` warning      |
//! | `≥ requested`          | `Ok(quiz)`, extras beyond `requested` cut  |
//!
//! A full-length quiz still carries the warning when some candidates were
//! rejected, so the user learns the model misbehaved. Rejected questions are
//! never repaired or padded with placeholders.

use crate::config::{minimum_questions, PipelineConfig};
use crate::error::{Pdf2QuizError, QuizWarning};
use crate::output::{ExtractedText, Quiz};
use crate::pipeline::llm::{resolve_client, GenerationOptions, LlmClient};
use crate::pipeline::quiz_parser::{parse_quiz, ParseReport};
use crate::progress::{track, ProgressCallback, Task};
use crate::prompts::{prepare_document, quiz_prompt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Upper bound on questions per quiz.
pub const MAX_QUESTIONS: usize = 50;

/// Produces a [`Quiz`] for an [`ExtractedText`].
pub struct QuizGenerator {
    client: Arc<dyn LlmClient>,
    options: GenerationOptions,
    template: Option<String>,
    max_prompt_chars: usize,
    min_ratio: f32,
    progress: Option<ProgressCallback>,
}

impl QuizGenerator {
    /// Build a generator using the client selected by `config`.
    pub fn new(config: &PipelineConfig) -> Result<Self, Pdf2QuizError> {
        Ok(Self::with_client(resolve_client(config)?, config))
    }

    /// Build a generator over an explicit client.
    pub fn with_client(client: Arc<dyn LlmClient>, config: &PipelineConfig) -> Self {
        Self {
            client,
            options: GenerationOptions::from_config(config),
            template: config.quiz_prompt.clone(),
            max_prompt_chars: config.max_prompt_chars,
            min_ratio: config.min_quiz_ratio,
            progress: config.progress_callback.clone(),
        }
    }

    /// Ask for `question_count` questions about `text`.
    pub async fn generate(
        &self,
        text: &ExtractedText,
        question_count: usize,
    ) -> Result<Quiz, Pdf2QuizError> {
        if question_count == 0 || question_count > MAX_QUESTIONS {
            return Err(Pdf2QuizError::InvalidConfig(format!(
                "question count must be 1–{MAX_QUESTIONS}, got {question_count}"
            )));
        }

        let prepared = prepare_document(text.as_str(), self.max_prompt_chars);
        let prompt = quiz_prompt(self.template.as_deref(), &prepared.text, question_count);
        debug!("Quiz prompt: {} chars, {} questions", prompt.len(), question_count);

        let quiz = track(self.progress.as_ref(), Task::GenerateQuiz, async {
            let raw = self.client.complete(&prompt, &self.options).await?;
            assemble_quiz(parse_quiz(&raw), question_count, self.min_ratio)
        })
        .await?;

        if let (Some(cb), Some(w)) = (self.progress.as_ref(), quiz.warning()) {
            cb.on_quiz_warning(w);
        }
        Ok(quiz)
    }
}

/// Apply the acceptance rule to a parse report.
pub fn assemble_quiz(
    report: ParseReport,
    requested: usize,
    min_ratio: f32,
) -> Result<Quiz, Pdf2QuizError> {
    for r in &report.rejected {
        warn!(
            "Rejected question {} ({}): {}",
            r.candidate, r.excerpt, r.reason
        );
    }

    let minimum = minimum_questions(requested, min_ratio);
    let rejected = report.rejected.len();
    let first_problem = report.first_problem();
    let mut questions = report.questions;

    if questions.len() > requested {
        debug!(
            "Model returned {} questions, keeping the first {}",
            questions.len(),
            requested
        );
        questions.truncate(requested);
    }

    let accepted = questions.len();
    if accepted < minimum {
        return Err(Pdf2QuizError::QuizParseFailure {
            requested,
            accepted,
            minimum,
            first_problem: first_problem
                .unwrap_or_else(|| "the reply contained no recognisable questions".to_string()),
        });
    }

    let warning = (accepted < requested || rejected > 0).then_some(QuizWarning::PartialQuiz {
        requested,
        accepted,
        rejected,
    });
    match &warning {
        Some(w) => warn!("{}", w),
        None => info!("Quiz generated: {} questions", accepted),
    }

    Ok(Quiz::new(questions, requested, warning))
}

/// One-shot helper: resolve a client from `config` and generate
/// `config.question_count` questions.
pub async fn generate_quiz(text: &ExtractedText, config: &PipelineConfig) -> Result<Quiz, Pdf2QuizError> {
    QuizGenerator::new(config)?
        .generate(text, config.question_count)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::{MockLlm, MockReply};

    fn block(n: usize, answer: &str) -> String {
        format!(
            "QUESTION: Question number {n}?\nA) alpha {n}\nB) beta {n}\nC) gamma {n}\nD) delta {n}\nANSWER: {answer}\n\n"
        )
    }

    fn duplicate_block() -> String {
        "QUESTION: Broken?\nA) same\nB) same\nC) other\nD) more\nANSWER: C\n\n".to_string()
    }

    fn doc() -> ExtractedText {
        ExtractedText::from_manual("Greek letters are used throughout mathematics.", 1).unwrap()
    }

    fn generator(reply: String) -> (Arc<MockLlm>, QuizGenerator) {
        let mock = Arc::new(MockLlm::new(MockReply::Text(reply)));
        let config = PipelineConfig::default();
        (mock.clone(), QuizGenerator::with_client(mock, &config))
    }

    #[tokio::test]
    async fn five_good_one_duplicate_yields_five_with_warning() {
        let mut reply: String = (1..=5).map(|n| block(n, "A")).collect();
        reply.push_str(&duplicate_block());
        let (_, gen) = generator(reply);
        let quiz = gen.generate(&doc(), 5).await.unwrap();
        assert_eq!(quiz.len(), 5);
        assert_eq!(
            quiz.warning(),
            Some(&QuizWarning::PartialQuiz {
                requested: 5,
                accepted: 5,
                rejected: 1
            })
        );
    }

    #[tokio::test]
    async fn full_clean_quiz_has_no_warning_and_keeps_order() {
        let reply: String = (1..=3).map(|n| block(n, "D")).collect();
        let (mock, gen) = generator(reply);
        let quiz = gen.generate(&doc(), 3).await.unwrap();
        assert!(!quiz.is_partial());
        let prompts: Vec<&str> = quiz.questions().iter().map(|q| q.prompt()).collect();
        assert_eq!(prompts, ["Question number 1?", "Question number 2?", "Question number 3?"]);
        assert!(mock.prompts()[0].contains("Write exactly 3 questions"));
    }

    #[tokio::test]
    async fn extras_are_truncated() {
        let reply: String = (1..=7).map(|n| block(n, "B")).collect();
        let (_, gen) = generator(reply);
        let quiz = gen.generate(&doc(), 5).await.unwrap();
        assert_eq!(quiz.len(), 5);
        assert!(!quiz.is_partial());
    }

    #[tokio::test]
    async fn partial_above_minimum_is_accepted() {
        let reply: String = (1..=3).map(|n| block(n, "C")).collect();
        let (_, gen) = generator(reply);
        let quiz = gen.generate(&doc(), 5).await.unwrap();
        assert_eq!(quiz.len(), 3);
        assert_eq!(quiz.requested(), 5);
        assert!(quiz.is_partial());
    }

    #[tokio::test]
    async fn below_minimum_fails() {
        let reply: String = (1..=2).map(|n| block(n, "C")).collect();
        let (_, gen) = generator(reply);
        let err = gen.generate(&doc(), 5).await.unwrap_err();
        assert!(matches!(
            err,
            Pdf2QuizError::QuizParseFailure { requested: 5, accepted: 2, minimum: 3, .. }
        ));
    }

    #[tokio::test]
    async fn zero_valid_questions_fails_with_first_problem() {
        let (_, gen) = generator(duplicate_block());
        match gen.generate(&doc(), 1).await.unwrap_err() {
            Pdf2QuizError::QuizParseFailure { accepted, first_problem, .. } => {
                assert_eq!(accepted, 0);
                assert!(first_problem.contains("duplicate"), "{first_problem}");
            }
            other => panic!("expected QuizParseFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn prose_reply_fails() {
        let (_, gen) = generator("I cannot help with that.".into());
        let err = gen.generate(&doc(), 5).await.unwrap_err();
        assert!(err.to_string().contains("no recognisable questions"));
    }

    #[tokio::test]
    async fn service_errors_propagate() {
        let mock = Arc::new(MockLlm::new(MockReply::Unavailable));
        let gen = QuizGenerator::with_client(mock, &PipelineConfig::default());
        let err = gen.generate(&doc(), 5).await.unwrap_err();
        assert!(matches!(err, Pdf2QuizError::ServiceUnavailable { .. }));
    }

    #[tokio::test]
    async fn zero_questions_requested_is_rejected() {
        let (mock, gen) = generator(block(1, "A"));
        assert!(gen.generate(&doc(), 0).await.is_err());
        assert_eq!(mock.call_count(), 0);
    }
}
