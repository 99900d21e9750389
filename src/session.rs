//! The quiz-taking state machine.
//!
//! ```text
//!            load_quiz                 submit
//!   Empty ─────────────▶ Active ─────────────▶ Submitted
//!     ▲                   │  ▲ set_answer          │
//!     │      reset        │  └──────┘              │ load_quiz
//!     └───────────────────┴────────────────────────┘──────▶ Active
//! ```
//!
//! Every method is safe to call twice with the same arguments: answering
//! overwrites, `submit` on a submitted quiz returns the stored score,
//! `reset` on an empty session does nothing. Misuse (answering with no quiz
//! loaded, answering after submission) is reported as a [`SessionError`],
//! never a panic.

use crate::error::{QuizWarning, SessionError};
use crate::output::{Question, Quiz};
use serde::Serialize;
use tracing::debug;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    /// No quiz loaded.
    Empty,
    /// Quiz loaded, accepting answers.
    Active,
    /// Quiz graded; answers are frozen.
    Submitted,
}

/// Grading outcome of one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionResult {
    pub index: usize,
    pub prompt: String,
    pub choices: Vec<String>,
    pub selected: Option<usize>,
    pub correct: usize,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

/// Everything a presentation layer needs to render the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub quiz: Option<Quiz>,
    /// Selected choice text per question; `None` when unanswered.
    pub answers: Vec<Option<String>>,
    pub submitted: bool,
    pub score: usize,
    pub total: usize,
    pub percentage: f32,
    pub warning: Option<QuizWarning>,
    /// Present once submitted.
    pub results: Option<Vec<QuestionResult>>,
}

/// One quiz attempt: the quiz, the user's answers and the grade.
#[derive(Debug, Clone, Default)]
pub struct QuizSession {
    quiz: Option<Quiz>,
    answers: Vec<Option<usize>>,
    score: usize,
    submitted: bool,
}

impl QuizSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        match (&self.quiz, self.submitted) {
            (None, _) => SessionState::Empty,
            (Some(_), false) => SessionState::Active,
            (Some(_), true) => SessionState::Submitted,
        }
    }

    /// Start a new attempt on `quiz`, discarding any previous answers and
    /// score. Valid from every state.
    pub fn load_quiz(&mut self, quiz: Quiz) {
        debug!("Loading quiz with {} questions", quiz.len());
        self.answers = vec![None; quiz.len()];
        self.score = 0;
        self.submitted = false;
        self.quiz = Some(quiz);
    }

    /// Back to `Empty`.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn quiz(&self) -> Option<&Quiz> {
        self.quiz.as_ref()
    }

    /// Record `choice` for question `index`.
    ///
    /// `choice` is matched against the choice texts (exact, then
    /// case-insensitive), then as a label `A`–`D`. Overwrites any earlier
    /// answer.
    pub fn set_answer(&mut self, index: usize, choice: &str) -> Result<(), SessionError> {
        let question = self.active_question(index)?;
        let choice_index = question
            .choice_index(choice)
            .or_else(|| label_index(choice).filter(|&i| i < question.choices().len()))
            .ok_or_else(|| SessionError::UnknownChoice {
                index,
                choice: choice.to_string(),
            })?;
        self.answers[index] = Some(choice_index);
        Ok(())
    }

    /// Record the choice at position `choice_index` for question `index`.
    pub fn select_choice(&mut self, index: usize, choice_index: usize) -> Result<(), SessionError> {
        let question = self.active_question(index)?;
        if choice_index >= question.choices().len() {
            return Err(SessionError::UnknownChoice {
                index,
                choice: choice_index.to_string(),
            });
        }
        self.answers[index] = Some(choice_index);
        Ok(())
    }

    /// Remove the answer for question `index`.
    pub fn clear_answer(&mut self, index: usize) -> Result<(), SessionError> {
        self.active_question(index)?;
        self.answers[index] = None;
        Ok(())
    }

    fn active_question(&self, index: usize) -> Result<&Question, SessionError> {
        let quiz = self.quiz.as_ref().ok_or(SessionError::NoQuiz)?;
        if self.submitted {
            return Err(SessionError::AlreadySubmitted);
        }
        quiz.questions()
            .get(index)
            .ok_or(SessionError::QuestionOutOfRange {
                index,
                len: quiz.len(),
            })
    }

    /// Grade the attempt and return the score.
    ///
    /// Unanswered questions count as incorrect. Calling again after
    /// submission returns the same score without re-grading.
    pub fn submit(&mut self) -> Result<usize, SessionError> {
        let quiz = self.quiz.as_ref().ok_or(SessionError::NoQuiz)?;
        if self.submitted {
            return Ok(self.score);
        }
        self.score = quiz
            .questions()
            .iter()
            .zip(&self.answers)
            .filter(|(q, a)| **a == Some(q.correct_index()))
            .count();
        self.submitted = true;
        debug!("Quiz submitted: {}/{}", self.score, quiz.len());
        Ok(self.score)
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Correct answers; 0 until submitted.
    pub fn score(&self) -> usize {
        self.score
    }

    /// Number of questions in the loaded quiz (0 when empty).
    pub fn total(&self) -> usize {
        self.quiz.as_ref().map_or(0, Quiz::len)
    }

    /// Selected choice index per question.
    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    /// Selected choice text for question `index`.
    pub fn answer_text(&self, index: usize) -> Option<&str> {
        let quiz = self.quiz.as_ref()?;
        let selected = (*self.answers.get(index)?)?;
        quiz.questions()
            .get(index)
            .and_then(|q| q.choices().get(selected))
            .map(String::as_str)
    }

    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    /// Per-question grading, available once submitted.
    pub fn results(&self) -> Option<Vec<QuestionResult>> {
        if !self.submitted {
            return None;
        }
        let quiz = self.quiz.as_ref()?;
        Some(
            quiz.questions()
                .iter()
                .zip(&self.answers)
                .enumerate()
                .map(|(index, (q, selected))| QuestionResult {
                    index,
                    prompt: q.prompt().to_string(),
                    choices: q.choices().to_vec(),
                    selected: *selected,
                    correct: q.correct_index(),
                    is_correct: *selected == Some(q.correct_index()),
                    explanation: q.explanation().map(str::to_string),
                })
                .collect(),
        )
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let total = self.total();
        let percentage = if self.submitted && total > 0 {
            self.score as f32 * 100.0 / total as f32
        } else {
            0.0
        };
        SessionSnapshot {
            state: self.state(),
            quiz: self.quiz.clone(),
            answers: (0..self.answers.len())
                .map(|i| self.answer_text(i).map(str::to_string))
                .collect(),
            submitted: self.submitted,
            score: self.score,
            total,
            percentage,
            warning: self.quiz.as_ref().and_then(|q| q.warning().cloned()),
            results: self.results(),
        }
    }
}

/// `"B"`, `"b"`, `"(B)"`, `"B)"` → 1.
fn label_index(choice: &str) -> Option<usize> {
    let label = choice
        .trim()
        .trim_start_matches('(')
        .trim_end_matches([')', '.', ':']);
    let mut chars = label.chars();
    let c = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some() || !('A'..='Z').contains(&c) {
        return None;
    }
    Some((c as u8 - b'A') as usize)
}
