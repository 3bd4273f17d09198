//! Text normalisation for extracted contract text.
//!
//! Extraction from PDF/DOCX leaves typographic characters, non-breaking
//! spaces and ragged whitespace behind. Segmentation relies on line starts
//! and blank-line paragraphs, so paragraph breaks are kept while everything
//! else collapses.

use std::sync::LazyLock;

use regex::Regex;

static TRAILING_HSPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+\n").unwrap());
static EXCESS_NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static HSPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());

/// Normalise raw extracted text.
///
/// # Algorithm
///
/// 1. Unify line endings to `\n`
/// 2. Map NBSP to space, bullets to `-`, curly quotes to ASCII quotes
/// 3. Drop horizontal whitespace before a newline
/// 4. Collapse 3+ newlines to exactly 2 (paragraph separator)
/// 5. Collapse horizontal whitespace runs to one space
/// 6. Trim
pub fn basic_clean(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            }
            '\u{00A0}' => out.push(' '),
            '•' | '·' | '‣' | '▪' => out.push('-'),
            '“' | '”' | '„' => out.push('"'),
            '‘' | '’' => out.push('\''),
            _ => out.push(c),
        }
    }

    let out = TRAILING_HSPACE.replace_all(&out, "\n");
    let out = EXCESS_NEWLINES.replace_all(&out, "\n\n");
    let out = HSPACE_RUN.replace_all(&out, " ");
    out.trim().to_string()
}

/// Whitespace-delimited word count, as used by the clause filter and the
/// contract summary.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
