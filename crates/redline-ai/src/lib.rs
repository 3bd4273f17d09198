//! Model layer for Redline: the generative-model client, bounded retry,
//! tolerant response decoding, prompts and the clause/contract analyzer.

pub mod analyzer;
pub mod client;
pub mod http;
pub mod parse;
pub mod prompt;
pub mod retry;

#[cfg(test)]
mod fake;

pub use analyzer::{Analyzer, AnalyzerConfig};
pub use client::{GenerateRequest, ModelClient, ModelError};
pub use http::OpenAiClient;
pub use parse::ResponseUnparseable;
pub use retry::{ModelUnavailable, RetryPolicy};
