//! Preprocessing: clean, guard against empty extraction, segment, anonymise.

use tracing::info;

use crate::anonymise::{AnonymisationMap, Anonymiser};
use crate::error::PipelineError;
use crate::normalize::basic_clean;
use crate::segment::{Clause, Segmenter, SentenceSplitter};

/// Documents with fewer non-whitespace characters than this are treated as
/// a failed extraction.
pub const MIN_DOCUMENT_CHARS: usize = 50;

/// A clause alongside its anonymised rendering.
#[derive(Debug, Clone)]
pub struct PreparedClause {
    pub clause: Clause,
    pub anonymised_text: String,
}

/// Everything the analyzer needs for one document.
#[derive(Debug, Clone)]
pub struct PreparedContract {
    pub normalized_text: String,
    pub anonymised_text: String,
    pub clauses: Vec<PreparedClause>,
    pub anonymisation_map: AnonymisationMap,
}

/// Normalise, segment and anonymise a raw document.
///
/// Clauses are segmented once from the normalised text and each is
/// anonymised with the document-wide map, so original and anonymised
/// clauses line up one-to-one. Fails with [`PipelineError::ExtractionEmpty`]
/// when there is no usable text; zero clauses is not an error.
pub fn preprocess_contract<S: SentenceSplitter>(
    raw_text: &str,
    segmenter: &Segmenter<S>,
    anonymiser: &Anonymiser,
) -> Result<PreparedContract, PipelineError> {
    let normalized_text = basic_clean(raw_text);
    let chars = normalized_text.chars().filter(|c| !c.is_whitespace()).count();
    if chars < MIN_DOCUMENT_CHARS {
        return Err(PipelineError::ExtractionEmpty { chars });
    }

    let clauses = segmenter.segment(&normalized_text);
    let anon = anonymiser.anonymise(&normalized_text);

    let clauses: Vec<PreparedClause> = clauses
        .into_iter()
        .map(|clause| PreparedClause {
            anonymised_text: anon.map.apply(&clause.text),
            clause,
        })
        .collect();

    info!(
        clauses = clauses.len(),
        entities = anon.map.len(),
        "preprocessed contract"
    );

    Ok(PreparedContract {
        normalized_text,
        anonymised_text: anon.text,
        clauses,
        anonymisation_map: anon.map,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTRACT: &str = "SERVICES AGREEMENT\n\n\
        1. Acme Widgets Ltd shall provide maintenance services to Mr. Bob Jones for the term \
        and shall use commercially reasonable efforts to meet the agreed response times.\n\n\n\n\
        2. This agreement automatically renews each year unless either party gives written \
        notice of cancellation at least thirty days before the renewal date.";

    #[test]
    fn empty_text_is_rejected() {
        let err = preprocess_contract("", &Segmenter::default(), &Anonymiser::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::ExtractionEmpty { chars: 0 }));
    }

    #[test]
    fn near_empty_text_is_rejected() {
        let err = preprocess_contract("Page 1 of 1\n\n", &Segmenter::default(), &Anonymiser::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::ExtractionEmpty { chars: 8 }));
    }

    #[test]
    fn clauses_and_anonymised_clauses_align() {
        let prepared =
            preprocess_contract(CONTRACT, &Segmenter::default(), &Anonymiser::default()).unwrap();
        assert_eq!(prepared.clauses.len(), 2);

        let first = &prepared.clauses[0];
        assert_eq!(first.clause.index, 1);
        assert!(first.clause.text.contains("Acme Widgets Ltd"));
        assert!(first.anonymised_text.starts_with("1. ORG_1 shall provide"));
        assert!(first.anonymised_text.contains("PARTY_1"));

        assert!(!prepared.anonymised_text.contains("Bob Jones"));
        assert_eq!(prepared.anonymisation_map.get("ORG_1"), Some("Acme Widgets Ltd"));
        assert!(!prepared.normalized_text.contains("\n\n\n"));
    }

    #[test]
    fn unstructured_text_yields_zero_clauses_without_error() {
        let text = "lorem ipsum dolor sit amet consectetur adipiscing elit sed do eiusmod tempor";
        let prepared =
            preprocess_contract(text, &Segmenter::default().with_min_words(40), &Anonymiser::default())
                .unwrap();
        assert!(prepared.clauses.is_empty());
    }
}
