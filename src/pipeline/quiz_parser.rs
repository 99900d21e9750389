//! Quiz parsing: free-form model reply → validated [`Question`]s.
//!
//! The prompt asks for a line-tagged format:
//!
//! ```text
//! QUESTION: What is the sun?
//! A) A planet
//! B) A star
//! C) A moon
//! D) A comet
//! ANSWER: B
//! EXPLANATION: The sun is the star at the centre of the solar system.
//! ```
//!
//! Local models follow it loosely, so the parser accepts the common
//! deviations: Markdown bold and headings around tags, `Question 1:` / `Q1.`
//! / `1.` headers, `(a)` / `a.` / `- A:` choice labels, `Correct answer:`,
//! an answer given as `B`, `B) A star` or just `A star`, and prompts or
//! explanations that wrap onto several lines. A reply with no tagged
//! question at all is tried as JSON (`{"questions": [...]}` or a bare
//! array).
//!
//! Every candidate block either becomes a [`Question`] or a [`Rejection`]
//! naming the first rule it broke. Deciding whether enough questions
//! survived is the caller's job ([`crate::quiz`]).

use crate::error::RejectReason;
use crate::output::{Question, CHOICES_PER_QUESTION};
use crate::pipeline::postprocess::clean_quiz_response;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

const LABELS: [char; CHOICES_PER_QUESTION] = ['A', 'B', 'C', 'D'];

/// A candidate question that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// 1-based position of the candidate in the reply.
    pub candidate: usize,
    pub reason: RejectReason,
    /// Start of the question text, for logs.
    pub excerpt: String,
}

/// Outcome of parsing one model reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseReport {
    /// Accepted questions in reply order.
    pub questions: Vec<Question>,
    pub rejected: Vec<Rejection>,
}

impl ParseReport {
    /// Number of candidate blocks found.
    pub fn candidates(&self) -> usize {
        self.questions.len() + self.rejected.len()
    }

    /// Human-readable description of the first rejection, if any.
    pub fn first_problem(&self) -> Option<String> {
        self.rejected
            .first()
            .map(|r| format!("question {}: {}", r.candidate, r.reason))
    }
}

/// Parse a raw model reply.
pub fn parse_quiz(raw: &str) -> ParseReport {
    let cleaned = clean_quiz_response(raw);
    let mut candidates = split_tagged(&cleaned);
    if candidates.is_empty() {
        candidates = parse_json(&cleaned).unwrap_or_default();
        if !candidates.is_empty() {
            debug!("No tagged questions; parsed {} from JSON", candidates.len());
        }
    }

    let mut report = ParseReport::default();
    for (idx, candidate) in candidates.into_iter().enumerate() {
        let excerpt = excerpt(&candidate.prompt);
        match candidate.into_question() {
            Ok(q) => report.questions.push(q),
            Err(reason) => report.rejected.push(Rejection {
                candidate: idx + 1,
                reason,
                excerpt,
            }),
        }
    }
    debug!(
        "Parsed {} candidate(s): {} accepted, {} rejected",
        report.candidates(),
        report.questions.len(),
        report.rejected.len()
    );
    report
}

// ── Candidate blocks ────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Field {
    #[default]
    Prompt,
    Choices,
    Answer,
    Explanation,
}

#[derive(Debug, Default)]
struct Candidate {
    prompt: String,
    choices: Vec<(char, String)>,
    answers: Vec<String>,
    explanation: Option<String>,
    field: Field,
}

impl Candidate {
    fn with_prompt(prompt: &str) -> Self {
        Self {
            prompt: prompt.trim().to_string(),
            ..Default::default()
        }
    }

    fn into_question(self) -> Result<Question, RejectReason> {
        if self.prompt.trim().is_empty() {
            return Err(RejectReason::EmptyPrompt);
        }

        let mut seen = Vec::with_capacity(self.choices.len());
        for (label, _) in &self.choices {
            if seen.contains(label) {
                return Err(RejectReason::DuplicateLabel(*label));
            }
            seen.push(*label);
        }
        if self.choices.len() != CHOICES_PER_QUESTION {
            return Err(RejectReason::WrongChoiceCount(self.choices.len()));
        }
        if let Some((label, _)) = self.choices.iter().find(|(l, _)| !LABELS.contains(l)) {
            return Err(RejectReason::UnexpectedLabel(*label));
        }

        let mut correct = None;
        for answer in &self.answers {
            let idx = resolve_answer(answer, &self.choices)?;
            match correct {
                Some(prev) if prev != idx => return Err(RejectReason::AmbiguousAnswer),
                _ => correct = Some(idx),
            }
        }
        let correct = correct.ok_or(RejectReason::MissingAnswer)?;

        let choices = self.choices.into_iter().map(|(_, text)| text).collect();
        Question::new(self.prompt, choices, correct, self.explanation)
    }
}

fn append(target: &mut String, line: &str) {
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(line);
}

fn excerpt(prompt: &str) -> String {
    let prompt = prompt.trim();
    if prompt.chars().count() <= 60 {
        return prompt.to_string();
    }
    let head: String = prompt.chars().take(60).collect();
    format!("{head}…")
}

// ── Tagged grammar ──────────────────────────────────────────────────────────

static RE_QUESTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:question|q)\s*\d*\s*(?:[:.)]\s*(.*))?$").unwrap());

static RE_NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,2}[.)]\s+(.+)$").unwrap());

static RE_CHOICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-*•]\s*)?\(?([A-Za-z])\s*[).:]\s*(\S.*)$").unwrap());

static RE_ANSWER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:correct\s+answer|correct|answer)\s*[:\-]\s*(.*)$").unwrap());

static RE_EXPLANATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:explanation|rationale|reason)\s*[:\-]\s*(.*)$").unwrap());

static RE_ANSWER_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\(?([A-Za-z])\)?(?:\s*[).:\-]\s*(.*))?$").unwrap());

/// Trim and drop Markdown emphasis / heading marks around tags.
fn normalize_line(line: &str) -> String {
    line.trim()
        .trim_start_matches('#')
        .replace("**", "")
        .trim()
        .to_string()
}

fn split_tagged(text: &str) -> Vec<Candidate> {
    let mut out = Vec::new();
    let mut current: Option<Candidate> = None;

    for raw in text.lines() {
        let line = normalize_line(raw);
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = RE_QUESTION.captures(&line) {
            out.extend(current.take());
            current = Some(Candidate::with_prompt(
                caps.get(1).map(|m| m.as_str()).unwrap_or(""),
            ));
            continue;
        }

        // "1. What is…" only opens a question outside an open prompt, or
        // once a full set of choices has been read.
        let numbered_allowed = current.as_ref().map_or(true, |c| match c.field {
            Field::Answer | Field::Explanation => true,
            Field::Choices => c.choices.len() >= CHOICES_PER_QUESTION,
            Field::Prompt => false,
        });
        if numbered_allowed {
            if let Some(caps) = RE_NUMBERED.captures(&line) {
                out.extend(current.take());
                current = Some(Candidate::with_prompt(&caps[1]));
                continue;
            }
        }

        let Some(c) = current.as_mut() else {
            continue;
        };

        if let Some(caps) = RE_ANSWER.captures(&line) {
            c.answers.push(caps[1].trim().to_string());
            c.field = Field::Answer;
            continue;
        }
        if let Some(caps) = RE_EXPLANATION.captures(&line) {
            c.explanation = Some(caps[1].trim().to_string());
            c.field = Field::Explanation;
            continue;
        }
        if matches!(c.field, Field::Prompt | Field::Choices) {
            if let Some(caps) = RE_CHOICE.captures(&line) {
                let label = caps[1].chars().next().unwrap_or('?').to_ascii_uppercase();
                // "I. Only statement one" inside a stem is prose, not a choice.
                if c.field == Field::Choices || LABELS.contains(&label) {
                    c.choices.push((label, caps[2].trim().to_string()));
                    c.field = Field::Choices;
                    continue;
                }
            }
        }

        match c.field {
            Field::Prompt => append(&mut c.prompt, &line),
            Field::Choices => {
                if let Some((_, text)) = c.choices.last_mut() {
                    append(text, &line);
                }
            }
            Field::Explanation => {
                if let Some(text) = c.explanation.as_mut() {
                    append(text, &line);
                }
            }
            Field::Answer => {}
        }
    }

    out.extend(current);
    out
}

/// Map an answer marker to a choice index.
///
/// Accepts a label (`B`, `(b)`, `B)`), a label plus text (`B) A star`, which
/// must agree with each other), or the exact text of a choice.
fn resolve_answer(answer: &str, choices: &[(char, String)]) -> Result<usize, RejectReason> {
    let answer = answer.trim().trim_end_matches('.').trim();
    if answer.is_empty() {
        return Err(RejectReason::MissingAnswer);
    }

    if let Some(caps) = RE_ANSWER_LETTER.captures(answer) {
        let label = caps[1].chars().next().unwrap_or('?').to_ascii_uppercase();
        let by_label = choices.iter().position(|(l, _)| *l == label);
        let by_text = caps
            .get(2)
            .map(|m| m.as_str().trim())
            .filter(|t| !t.is_empty())
            .and_then(|t| text_index(choices, t));
        return match (by_label, by_text) {
            (Some(i), Some(j)) if i != j => Err(RejectReason::AmbiguousAnswer),
            (Some(i), _) => Ok(i),
            (None, Some(j)) => Ok(j),
            (None, None) => text_index(choices, answer)
                .ok_or_else(|| RejectReason::UnknownAnswer(answer.to_string())),
        };
    }

    text_index(choices, answer).ok_or_else(|| RejectReason::UnknownAnswer(answer.to_string()))
}

fn text_index(choices: &[(char, String)], text: &str) -> Option<usize> {
    let wanted = text.trim().trim_end_matches('.').to_lowercase();
    choices
        .iter()
        .position(|(_, c)| c.trim().trim_end_matches('.').to_lowercase() == wanted)
}

// ── JSON fallback ───────────────────────────────────────────────────────────

static RE_JSON_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\(?[A-Da-d][).:]\s+").unwrap());

fn parse_json(text: &str) -> Option<Vec<Candidate>> {
    let value = extract_json(text)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("questions").or_else(|| map.remove("quiz")) {
            Some(Value::Array(items)) => items,
            _ => return None,
        },
        _ => return None,
    };
    Some(items.iter().map(candidate_from_json).collect())
}

fn extract_json(text: &str) -> Option<Value> {
    if let Ok(v) = serde_json::from_str(text.trim()) {
        return Some(v);
    }
    let start = text.find(|c| c == '{' || c == '[')?;
    let end = text.rfind(|c| c == '}' || c == ']')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn value_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_field<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| item.get(*k))
}

fn candidate_from_json(item: &Value) -> Candidate {
    let prompt = first_field(item, &["question", "prompt", "text"])
        .and_then(value_text)
        .unwrap_or_default();

    let choices: Vec<(char, String)> = match first_field(item, &["options", "choices", "answers"]) {
        Some(Value::Array(list)) => list
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let label = (b'A' + i.min(25) as u8) as char;
                let text = value_text(v).unwrap_or_default();
                (label, RE_JSON_LABEL.replace(text.trim(), "").to_string())
            })
            .collect(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| {
                let label = k.chars().next().unwrap_or('?').to_ascii_uppercase();
                (label, value_text(v).unwrap_or_default())
            })
            .collect(),
        _ => Vec::new(),
    };

    let answers = match first_field(item, &["answer", "correct_answer", "correct"]) {
        Some(Value::Number(n)) => match n.as_u64() {
            Some(i) if (i as usize) < choices.len() => vec![choices[i as usize].0.to_string()],
            _ => vec![n.to_string()],
        },
        Some(v) => value_text(v).into_iter().collect(),
        None => Vec::new(),
    };

    let explanation = first_field(item, &["explanation", "rationale"]).and_then(value_text);

    Candidate {
        prompt: prompt.trim().to_string(),
        choices,
        answers,
        explanation,
        field: Field::Explanation,
    }
}
