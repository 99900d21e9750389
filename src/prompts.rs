//! Prompt templates for summary and quiz generation.
//!
//! Every prompt lives here so changing the wording (or the quiz grammar the
//! parser in [`crate::pipeline::quiz_parser`] expects) touches exactly one
//! file, and tests can inspect templates without a running model.
//!
//! ## Truncation policy
//!
//! Documents longer than `max_prompt_chars` are cut **from the end** and an
//! explicit marker is appended. The lead of a document usually carries its
//! thesis and structure, so a summary of the first N characters is more
//! useful than a request the model silently drops. The cut is reported back
//! through [`PreparedText::truncated`] and logged; it is never silent.

use crate::config::DOCUMENT_PLACEHOLDER;
use tracing::warn;

/// Placeholder for the requested number of questions in quiz templates.
pub const QUESTION_COUNT_PLACEHOLDER: &str = "{question_count}";

/// Default summary prompt.
pub const DEFAULT_SUMMARY_PROMPT: &str = r#"You are an expert at reading documents and explaining them clearly.

Write a comprehensive summary of the document below.

1. Start with one sentence stating what the document is about.
2. Cover the main points, key arguments and important details in the order the document presents them.
3. Keep names, numbers, dates and technical terms exactly as written.
4. Use short paragraphs or bullet points. Do not invent information that is not in the document.
5. Output ONLY the summary. Do not add a preamble such as "Here is a summary".

DOCUMENT:
"""
{document}
""""#;

/// Default quiz prompt. Defines the tagged grammar the parser accepts.
pub const DEFAULT_QUIZ_PROMPT: &str = r#"You are a teacher writing a multiple-choice quiz to test understanding of the document below.

Write exactly {question_count} questions. Every question must:
- be answerable from the document alone,
- have exactly 4 different answer choices labelled A), B), C) and D),
- have exactly one correct choice.

Use EXACTLY this format for every question and nothing else:

QUESTION: <question text>
A) <choice>
B) <choice>
C) <choice>
D) <choice>
ANSWER: <letter of the correct choice>
EXPLANATION: <one sentence explaining why the answer is correct>

Separate questions with a blank line. Do not number the questions, do not use Markdown, and do not add any text before the first QUESTION or after the last EXPLANATION.

DOCUMENT:
"""
{document}
""""#;

/// Document text after applying the prompt budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedText {
    pub text: String,
    pub truncated: bool,
    /// Characters removed from the end (0 when not truncated).
    pub omitted_chars: usize,
}

/// Fit `text` into `max_chars` characters, cutting from the end.
///
/// The cut backs off to the last whitespace within the final 200 characters
/// so a word is not split, then appends a marker stating how much was left
/// out.
pub fn prepare_document(text: &str, max_chars: usize) -> PreparedText {
    let total = text.chars().count();
    if total <= max_chars {
        return PreparedText {
            text: text.to_string(),
            truncated: false,
            omitted_chars: 0,
        };
    }

    let byte_cut = text
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let head = &text[..byte_cut];
    let window_start = head
        .char_indices()
        .rev()
        .nth(199)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let head = match head[window_start..].rfind(char::is_whitespace) {
        Some(pos) if window_start + pos > 0 => &head[..window_start + pos],
        _ => head,
    };
    let head = head.trim_end();
    let kept = head.chars().count();
    let omitted = total - kept;

    warn!(
        "Document text truncated for prompt: kept {} of {} characters",
        kept, total
    );

    PreparedText {
        text: format!(
            "{head}\n\n[... document truncated: {omitted} of {total} characters omitted ...]"
        ),
        truncated: true,
        omitted_chars: omitted,
    }
}

/// Substitute the document into a summary template.
pub fn summary_prompt(template: Option<&str>, document: &str) -> String {
    template
        .unwrap_or(DEFAULT_SUMMARY_PROMPT)
        .replace(DOCUMENT_PLACEHOLDER, document)
}

/// Substitute the question count and document into a quiz template.
///
/// The count is substituted first so a document that happens to contain the
/// literal `{question_count}` is left untouched.
pub fn quiz_prompt(template: Option<&str>, document: &str, question_count: usize) -> String {
    template
        .unwrap_or(DEFAULT_QUIZ_PROMPT)
        .replace(QUESTION_COUNT_PLACEHOLDER, &question_count.to_string())
        .replace(DOCUMENT_PLACEHOLDER, document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_contain_placeholders() {
        assert!(DEFAULT_SUMMARY_PROMPT.contains(DOCUMENT_PLACEHOLDER));
        assert!(DEFAULT_QUIZ_PROMPT.contains(DOCUMENT_PLACEHOLDER));
        assert!(DEFAULT_QUIZ_PROMPT.contains(QUESTION_COUNT_PLACEHOLDER));
    }

    #[test]
    fn quiz_prompt_defines_the_grammar() {
        let p = quiz_prompt(None, "The sun is a star.", 3);
        assert!(p.contains("Write exactly 3 questions"));
        for marker in ["QUESTION:", "A)", "D)", "ANSWER:", "EXPLANATION:"] {
            assert!(p.contains(marker), "missing {marker}");
        }
        assert!(p.contains("The sun is a star."));
        assert!(!p.contains(DOCUMENT_PLACEHOLDER));
    }

    #[test]
    fn document_placeholder_text_is_not_reexpanded() {
        let p = quiz_prompt(None, "literal {question_count} in text", 4);
        assert!(p.contains("literal {question_count} in text"));
    }

    #[test]
    fn custom_summary_template() {
        let p = summary_prompt(Some("TL;DR: {document}"), "abc");
        assert_eq!(p, "TL;DR: abc");
    }

    #[test]
    fn short_text_is_untouched() {
        let p = prepare_document("short text", 100);
        assert!(!p.truncated);
        assert_eq!(p.text, "short text");
        assert_eq!(p.omitted_chars, 0);
    }

    #[test]
    fn long_text_is_cut_from_the_end_with_marker() {
        let text = "word ".repeat(1000);
        let p = prepare_document(&text, 600);
        assert!(p.truncated);
        assert!(p.text.starts_with("word word"));
        assert!(p.text.contains("[... document truncated:"));
        assert!(p.text.contains("of 5000 characters omitted"));
        let body = p.text.split("\n\n[...").next().unwrap();
        assert!(body.chars().count() <= 600);
        assert!(body.ends_with("word"), "cut should not split a word");
        assert_eq!(p.omitted_chars, 5000 - body.chars().count());
    }

    #[test]
    fn truncation_respects_multibyte_chars() {
        let text = "é".repeat(700);
        let p = prepare_document(&text, 600);
        assert!(p.truncated);
        assert!(p.text.starts_with(&"é".repeat(600)));
    }
}
