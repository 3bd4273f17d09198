//! The generative-model seam.
//!
//! The analyzer treats the model as "submit prompt, receive text". Anything
//! that can answer a [`GenerateRequest`] with a string implements
//! [`ModelClient`]; [`crate::http::OpenAiClient`] is the production one.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// One chat-style generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Upper bound for the whole call, connect included.
    pub timeout: Duration,
}

/// Failure categories a model call can end in.
///
/// The retry policy decides what to do from the category alone, so clients
/// must map their transport errors onto these faithfully.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("model endpoint returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("credentials rejected ({status})")]
    Unauthorized { status: u16 },

    #[error("empty response from model")]
    EmptyResponse,

    #[error("{0}")]
    Unexpected(String),
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Run one generation. Implementations make exactly one attempt; retries
    /// belong to [`crate::retry`].
    async fn generate(&self, request: &GenerateRequest) -> Result<String, ModelError>;
}

#[async_trait]
impl<T: ModelClient + ?Sized> ModelClient for std::sync::Arc<T> {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, ModelError> {
        (**self).generate(request).await
    }
}
