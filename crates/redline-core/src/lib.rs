//! Core pipeline for Redline: text normalisation, clause segmentation,
//! party anonymisation, deterministic risk rules, severity combination and
//! the report types.

pub mod anonymise;
mod error;
pub mod normalize;
pub mod preprocess;
pub mod report;
pub mod risk;
pub mod rules;
pub mod segment;

pub use anonymise::{AnonymisationMap, Anonymiser, EntityRecognizer, HeuristicRecognizer, NoopRecognizer};
pub use error::PipelineError;
pub use normalize::basic_clean;
pub use preprocess::{PreparedClause, PreparedContract, preprocess_contract};
pub use report::{AnalysisMode, ClauseVerdict, ContractVerdict, Report};
pub use risk::{Severity, combine};
pub use rules::{RuleMatch, aggregate_risk_from_rules, evaluate_rules};
pub use segment::{Clause, Segmenter, SentenceSplitter, UnicodeSentenceSplitter};
