//! Post-processing: deterministic cleanup of raw LLM replies.
//!
//! Local models drift from their instructions in predictable ways: they wrap
//! the whole answer in a code fence, open with "Sure! Here is your summary:",
//! emit `\r\n`, or sprinkle zero-width characters copied from the source PDF.
//! These rules remove that noise before a summary is shown or a quiz is
//! parsed. Each rule is a pure `&str → String` function.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so every later rule only sees `\n`;
//! fences are stripped before the preamble check so "Here is…" inside a
//! fence is still found.

use once_cell::sync::Lazy;
use regex::Regex;

/// Clean a summary for display.
///
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Strip an outer code fence
/// 4. Drop a chatty one-line preamble ("Here is a summary of …:")
/// 5. Trim trailing whitespace per line
/// 6. Collapse 3+ blank lines down to one
/// 7. Trim the ends
pub fn clean_summary(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = strip_outer_fence(&s);
    let s = strip_preamble(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

/// Prepare a quiz reply for parsing: same as [`clean_summary`] minus the
/// preamble rule (the parser ignores text before the first question anyway).
pub fn clean_quiz_response(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = strip_outer_fence(&s);
    let s = trim_trailing_whitespace(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Strip outer code fence ──────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\n(.*)\n```\s*$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCE.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 4: Drop chatty preamble ────────────────────────────────────────────

static RE_PREAMBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:sure[!,.]?\s*)?(?:here\s+is|here's|below\s+is)\b[^\n]{0,120}:\s*\n").unwrap()
});

fn strip_preamble(input: &str) -> String {
    RE_PREAMBLE.replace(input, "").to_string()
}

// ── Rule 5: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 6: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────
