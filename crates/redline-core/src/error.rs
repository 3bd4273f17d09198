use thiserror::Error;

/// Failures that end a run before any analysis starts.
///
/// Everything past extraction (model outages, unparseable responses) is
/// recovered per clause and never surfaces here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("extracted text is empty or too short to analyse ({chars} non-whitespace characters)")]
    ExtractionEmpty { chars: usize },
}
