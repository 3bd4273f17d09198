//! HTTP client for OpenAI-compatible chat completion endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{GenerateRequest, ModelClient, ModelError};
use crate::parse::excerpt;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Chat completion client for `POST {base_url}/v1/chat/completions`.
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> ChatRequest<'a> {
    fn from_request(req: &'a GenerateRequest) -> Self {
        Self {
            model: &req.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &req.system,
                },
                ChatMessage {
                    role: "user",
                    content: &req.user,
                },
            ],
            temperature: req.temperature,
            max_tokens: req.max_tokens,
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl OpenAiClient {
    /// Create a client for the given base URL.
    ///
    /// `base_url` should be like `https://api.openai.com` (a trailing slash
    /// is trimmed).
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, ModelError> {
        let url = self.endpoint();
        debug!(url = %url, model = %request.model, "requesting chat completion");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(request.timeout)
            .json(&ChatRequest::from_request(request))
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &body));
        }

        let parsed: ChatResponse = resp.json().await.map_err(transport_error)?;
        first_content(parsed)
    }
}

/// Map a non-2xx status onto a [`ModelError`].
fn classify_status(status: u16, body: &str) -> ModelError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => excerpt(body, 200).to_string(),
    };
    match status {
        429 => ModelError::RateLimited(message),
        401 | 403 => ModelError::Unauthorized { status },
        _ => ModelError::Api { status, message },
    }
}

fn transport_error(e: reqwest::Error) -> ModelError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        ModelError::Connection(e.to_string())
    } else {
        ModelError::Unexpected(e.to_string())
    }
}

fn first_content(resp: ChatResponse) -> Result<String, ModelError> {
    let content = resp
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();
    let content = content.trim();
    if content.is_empty() {
        return Err(ModelError::EmptyResponse);
    }
    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn request() -> GenerateRequest {
        GenerateRequest {
            model: "gpt-4o-mini".into(),
            system: "Respond with JSON.".into(),
            user: "Analyze this clause.".into(),
            temperature: 0.15,
            max_tokens: 2000,
            timeout: Duration::from_secs(60),
        }
    }

    #[test]
    fn trailing_slash_trimmed() {
        let client = OpenAiClient::new("http://localhost:8080/".into(), "k".into());
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn request_body_shape() {
        let req = request();
        let json = serde_json::to_value(ChatRequest::from_request(&req)).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "Respond with JSON.");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["max_tokens"], 2000);
        assert!((json["temperature"].as_f64().unwrap() - 0.15).abs() < 1e-6);
    }

    #[test]
    fn status_classification() {
        assert!(matches!(classify_status(429, ""), ModelError::RateLimited(_)));
        assert_eq!(
            classify_status(401, "nope"),
            ModelError::Unauthorized { status: 401 }
        );
        assert_eq!(
            classify_status(403, ""),
            ModelError::Unauthorized { status: 403 }
        );
        assert_eq!(
            classify_status(500, "boom"),
            ModelError::Api {
                status: 500,
                message: "boom".into()
            }
        );
    }

    #[test]
    fn error_envelope_message_extracted() {
        let body = r#"{"error": {"message": "model overloaded", "type": "server_error"}}"#;
        assert_eq!(
            classify_status(503, body),
            ModelError::Api {
                status: 503,
                message: "model overloaded".into()
            }
        );
    }

    #[test]
    fn content_extraction() {
        let resp: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "  {\"a\": 1}\n"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_content(resp).unwrap(), r#"{"a": 1}"#);
    }

    #[test]
    fn blank_or_missing_content_is_empty_response() {
        let blank: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": "   "}}]}"#).unwrap();
        assert_eq!(first_content(blank), Err(ModelError::EmptyResponse));

        let null: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        assert_eq!(first_content(null), Err(ModelError::EmptyResponse));

        let none: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert_eq!(first_content(none), Err(ModelError::EmptyResponse));
    }
}
