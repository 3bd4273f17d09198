//! Heuristic clause segmentation.
//!
//! Contracts are split on numbered headings ("1.", "4.2", "7.1.3."), falling
//! back to blank-line paragraphs when no heading is found. Blocks longer than
//! the maximum clause length are re-packed from whole sentences. Fragments
//! below the word minimum (page numbers, running headers, stray titles) are
//! dropped before indices are assigned, so indices are always `1..=n`.
//!
//! # Heading markers
//!
//! - At line start: `1.`, `1`, `1.1`, `1.1.` followed by whitespace
//! - Inline, after `.`, `;` or `:` and before an uppercase letter: `2.`, `3.1.`
//!   (text flattened onto one line by extraction). Inline markers must end
//!   in a period.
//!
//! The marker stays in the clause text, so "4.2 The Supplier shall..." keeps
//! its numbering.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::normalize::word_count;

pub const DEFAULT_MAX_CLAUSE_LEN: usize = 900;
pub const DEFAULT_MIN_WORDS: usize = 15;

static LINE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(\d+(?:\.\d+)*\.?)\s+").unwrap());
static INLINE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.;:][ \t]+(\d+(?:\.\d+)*\.)[ \t]+(\p{Lu})").unwrap());

/// One contractual provision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    /// 1-based position in the segmentation output.
    pub index: usize,
    pub text: String,
    /// Heading marker (e.g. "4.2") when this clause opens a numbered block.
    pub label: Option<String>,
}

/// Sentence boundary detection.
pub trait SentenceSplitter {
    /// Split `text` into sentences. Pieces may carry surrounding whitespace.
    fn sentences<'a>(&self, text: &'a str) -> Vec<&'a str>;
}

/// UAX #29 sentence boundaries via `unicode-segmentation`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeSentenceSplitter;

impl SentenceSplitter for UnicodeSentenceSplitter {
    fn sentences<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.split_sentence_bounds().collect()
    }
}

/// Clause segmenter. Configure with the builder methods; the defaults are
/// 900 characters per clause and a 15-word minimum.
#[derive(Debug, Clone)]
pub struct Segmenter<S = UnicodeSentenceSplitter> {
    splitter: S,
    max_clause_len: usize,
    min_words: usize,
}

impl Default for Segmenter<UnicodeSentenceSplitter> {
    fn default() -> Self {
        Self::new(UnicodeSentenceSplitter)
    }
}

struct Candidate {
    text: String,
    label: Option<String>,
}

struct Marker<'a> {
    start: usize,
    body_start: usize,
    label: &'a str,
}

impl<S: SentenceSplitter> Segmenter<S> {
    pub fn new(splitter: S) -> Self {
        Self {
            splitter,
            max_clause_len: DEFAULT_MAX_CLAUSE_LEN,
            min_words: DEFAULT_MIN_WORDS,
        }
    }

    pub fn with_max_clause_len(mut self, max_clause_len: usize) -> Self {
        self.max_clause_len = max_clause_len.max(1);
        self
    }

    pub fn with_min_words(mut self, min_words: usize) -> Self {
        self.min_words = min_words;
        self
    }

    pub fn max_clause_len(&self) -> usize {
        self.max_clause_len
    }

    pub fn min_words(&self) -> usize {
        self.min_words
    }

    /// Segment normalised text into clauses.
    pub fn segment(&self, text: &str) -> Vec<Clause> {
        let mut candidates = Vec::new();
        for block in split_blocks(text) {
            if block.text.chars().count() <= self.max_clause_len {
                candidates.push(block);
                continue;
            }
            let mut label = block.label;
            for piece in self.pack_sentences(&block.text) {
                candidates.push(Candidate {
                    text: piece,
                    label: label.take(),
                });
            }
        }

        candidates
            .into_iter()
            .filter(|c| word_count(&c.text) >= self.min_words)
            .enumerate()
            .map(|(i, c)| Clause {
                index: i + 1,
                text: tidy(&c.text),
                label: c.label,
            })
            .collect()
    }

    /// Greedily pack whole sentences into pieces no longer than the maximum.
    /// A sentence longer than the maximum becomes a piece of its own.
    fn pack_sentences(&self, block: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut buffer = String::new();
        let mut buffer_len = 0usize;

        for sentence in self.splitter.sentences(block) {
            let sentence = sentence.trim();
            if sentence.is_empty() {
                continue;
            }
            let len = sentence.chars().count();
            let sep = usize::from(!buffer.is_empty());
            if buffer_len + sep + len <= self.max_clause_len {
                if sep == 1 {
                    buffer.push(' ');
                }
                buffer.push_str(sentence);
                buffer_len += sep + len;
            } else {
                if !buffer.is_empty() {
                    pieces.push(std::mem::take(&mut buffer));
                }
                buffer.push_str(sentence);
                buffer_len = len;
            }
        }
        if !buffer.is_empty() {
            pieces.push(buffer);
        }
        pieces
    }
}

/// Split on heading markers, or on blank-line paragraphs when there are none.
fn split_blocks(text: &str) -> Vec<Candidate> {
    let markers = find_markers(text);
    if markers.is_empty() {
        return text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| Candidate {
                text: p.to_string(),
                label: None,
            })
            .collect();
    }

    let mut blocks = Vec::with_capacity(markers.len() + 1);
    let preamble = text[..markers[0].start].trim();
    if !preamble.is_empty() {
        blocks.push(Candidate {
            text: preamble.to_string(),
            label: None,
        });
    }
    for (i, marker) in markers.iter().enumerate() {
        let end = markers.get(i + 1).map_or(text.len(), |next| next.start);
        let body = text[marker.body_start..end].trim();
        let label = marker.label.trim();
        blocks.push(Candidate {
            text: format!("{label} {body}").trim().to_string(),
            label: Some(label.to_string()),
        });
    }
    blocks
}

fn find_markers(text: &str) -> Vec<Marker<'_>> {
    let mut markers: Vec<Marker<'_>> = Vec::new();

    for caps in LINE_MARKER.captures_iter(text) {
        let (Some(whole), Some(num)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        markers.push(Marker {
            start: num.start(),
            body_start: whole.end(),
            label: num.as_str(),
        });
    }
    for caps in INLINE_MARKER.captures_iter(text) {
        let (Some(num), Some(first)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        markers.push(Marker {
            start: num.start(),
            body_start: first.start(),
            label: num.as_str(),
        });
    }

    markers.sort_by_key(|m| m.start);
    // Drop markers that start inside the previous marker's own text.
    let mut kept: Vec<Marker<'_>> = Vec::with_capacity(markers.len());
    for m in markers {
        if kept.last().is_some_and(|prev| m.start < prev.body_start) {
            continue;
        }
        kept.push(m);
    }
    kept
}

fn tidy(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(" .", ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILLER: &str = "shall perform the services described in the statement of work \
                          with due care and in accordance with applicable law";

    fn numbered(n: usize) -> String {
        (1..=n)
            .map(|i| format!("{i}. The Supplier {FILLER} for item {i}."))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn squash(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn n_headings_yield_n_clauses() {
        let clauses = Segmenter::default().segment(&numbered(7));
        assert_eq!(clauses.len(), 7);
        for (i, c) in clauses.iter().enumerate() {
            assert_eq!(c.index, i + 1);
            assert_eq!(c.label.as_deref(), Some(format!("{}.", i + 1).as_str()));
            assert!(c.text.starts_with(&format!("{}. The Supplier", i + 1)));
        }
    }

    #[test]
    fn dotted_subheadings_split() {
        let text = format!("1.1 The Client {FILLER}.\n1.2 The Vendor {FILLER}.\n2 Either party {FILLER}.");
        let clauses = Segmenter::default().segment(&text);
        let labels: Vec<_> = clauses.iter().map(|c| c.label.clone().unwrap()).collect();
        assert_eq!(labels, vec!["1.1", "1.2", "2"]);
    }

    #[test]
    fn inline_markers_after_sentence_end() {
        let text = "1. The Vendor shall have unlimited liability for all damages. \
                    2. This agreement automatically renews each year unless cancelled.";
        let clauses = Segmenter::default().with_min_words(5).segment(text);
        assert_eq!(clauses.len(), 2);
        assert_eq!(
            clauses[0].text,
            "1. The Vendor shall have unlimited liability for all damages."
        );
        assert_eq!(
            clauses[1].text,
            "2. This agreement automatically renews each year unless cancelled."
        );
    }

    #[test]
    fn inline_numbers_without_capital_are_not_markers() {
        let text = format!("1. The fee is payable within 30 days. 5 percent {FILLER}.");
        let clauses = Segmenter::default().segment(&text);
        assert_eq!(clauses.len(), 1);
    }

    #[test]
    fn paragraph_fallback_without_headings() {
        let text = format!("The Client {FILLER}.\n\nThe Vendor {FILLER}.\n\nShort title");
        let clauses = Segmenter::default().segment(&text);
        assert_eq!(clauses.len(), 2);
        assert!(clauses.iter().all(|c| c.label.is_none()));
    }

    #[test]
    fn short_fragments_dropped_and_indices_contiguous() {
        let text = format!(
            "1. Definitions\n2. The Client {FILLER}.\n3. Page 4 of 9\n4. The Vendor {FILLER}."
        );
        let clauses = Segmenter::default().segment(&text);
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].index, 1);
        assert_eq!(clauses[1].index, 2);
        assert_eq!(clauses[0].label.as_deref(), Some("2."));
        assert_eq!(clauses[1].label.as_deref(), Some("4."));
    }

    #[test]
    fn unstructured_short_text_yields_nothing() {
        assert!(Segmenter::default().segment("confidential draft").is_empty());
        assert!(Segmenter::default().segment("").is_empty());
    }

    #[test]
    fn long_block_packed_by_sentence() {
        let sentence = "The Supplier shall deliver the goods to the agreed site on time.";
        let body = vec![sentence; 12].join(" ");
        let text = format!("1. {body}");
        let seg = Segmenter::default().with_max_clause_len(200).with_min_words(5);
        let clauses = seg.segment(&text);

        assert!(clauses.len() > 1);
        for c in &clauses {
            assert!(c.text.chars().count() <= 200, "clause too long: {}", c.text);
            // Never split mid-sentence.
            assert!(c.text.ends_with("on time."));
        }
        assert_eq!(clauses[0].label.as_deref(), Some("1."));
        assert!(clauses[1..].iter().all(|c| c.label.is_none()));
    }

    #[test]
    fn oversize_sentence_kept_whole() {
        let long = format!("The Supplier {}.", vec!["shall comply"; 60].join(" and "));
        let seg = Segmenter::default().with_max_clause_len(100);
        let clauses = seg.segment(&long);
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].text, long);
    }

    #[test]
    fn preamble_kept() {
        let text = format!("This Agreement is made between the parties and {FILLER}.\n1. The Client {FILLER}.");
        let clauses = Segmenter::default().segment(&text);
        assert_eq!(clauses.len(), 2);
        assert!(clauses[0].label.is_none());
        assert_eq!(clauses[1].label.as_deref(), Some("1."));
    }

    #[test]
    fn concatenation_reproduces_source() {
        let source = format!(
            "Preamble text agreed by the parties who {FILLER}.\n\n1. The Client {FILLER}.\n2. Annex\n3. The Vendor {FILLER}."
        );
        let clauses = Segmenter::default().segment(&source);
        let joined = clauses.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(" ");
        // "2. Annex" is the only discarded fragment.
        assert_eq!(squash(&joined), squash(&source.replace("2. Annex\n", "")));
    }

    #[test]
    fn spacing_artifacts_fixed() {
        let text = format!("1. The Client {FILLER} .");
        let clauses = Segmenter::default().segment(&text);
        assert!(clauses[0].text.ends_with("applicable law."));
    }
}
