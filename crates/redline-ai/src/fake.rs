//! Scripted in-memory model client for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::client::{GenerateRequest, ModelClient, ModelError};

/// Replays a fixed script of responses, one per call, and records every
/// request it sees. Calls past the end of the script fail as `Unexpected`.
pub(crate) struct ScriptedClient {
    script: Mutex<VecDeque<Result<String, ModelError>>>,
    seen: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedClient {
    pub(crate) fn new(script: impl IntoIterator<Item = Result<String, ModelError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Answers every call with the same text.
    pub(crate) fn always(text: &str, calls: usize) -> Self {
        Self::new((0..calls).map(|_| Ok(text.to_string())))
    }

    pub(crate) fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub(crate) fn requests(&self) -> Vec<GenerateRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, ModelError> {
        self.seen.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::Unexpected("script exhausted".into())))
    }
}

pub(crate) fn request() -> GenerateRequest {
    GenerateRequest {
        model: "test-model".into(),
        system: "system".into(),
        user: "user".into(),
        temperature: 0.0,
        max_tokens: 256,
        timeout: Duration::from_secs(5),
    }
}

/// Paused-clock elapsed check. Timer deadlines round to the millisecond.
pub(crate) fn assert_elapsed(start: tokio::time::Instant, expected: Duration) {
    let elapsed = start.elapsed();
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(20),
        "elapsed {elapsed:?}, expected {expected:?}"
    );
}
