//! HTTP client for OpenAI-compatible `/chat/completions` endpoints.
//!
//! Requests are sent with `response_format: json_schema` in strict mode so the
//! provider constrains its output to the request schema. Status codes are
//! mapped onto [`LlmError`] variants by [`classify_status`]; transient ones
//! are retried according to the client's [`RetryPolicy`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;

use crate::error::LlmError;
use crate::generator::{GenerationRequest, TextGenerator};
use crate::retry::{self, RetryError, RetryPolicy};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";

/// Client for an OpenAI-compatible chat completions API.
///
/// Use [`OpenAiClient::new`] for production or
/// [`OpenAiClient::with_base_url`] to point at a mock server in tests.
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    endpoint: Url,
    model: String,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

impl OpenAiClient {
    /// Creates a client pointed at the public OpenAI API.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(api_key: &str, model: &str, timeout_secs: u64) -> Result<Self, LlmError> {
        Self::with_base_url(api_key, model, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (a proxy, a local model
    /// server, or wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`LlmError::InvalidRequest`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("newsdesk/0.1")
            .build()?;

        // Exactly one trailing slash so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&normalised)
            .and_then(|base| base.join("chat/completions"))
            .map_err(|e| LlmError::InvalidRequest {
                status: 0,
                message: format!("invalid base URL '{base_url}': {e}"),
            })?;

        Ok(Self {
            http,
            api_key: api_key.to_owned(),
            endpoint,
            model: model.to_owned(),
            retry: RetryPolicy::default(),
        })
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_once(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": request.schema_name,
                    "strict": true,
                    "schema": request.schema,
                },
            },
        });

        let mut builder = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &text));
        }

        let parsed: ChatResponse = response.json().await?;
        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or(LlmError::EmptyResponse(request.kind))?;

        if let Some(refusal) = message.refusal.filter(|r| !r.trim().is_empty()) {
            return Err(LlmError::Validation {
                kind: request.kind,
                reason: format!("model refused: {refusal}"),
            });
        }

        match message.content {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => Err(LlmError::EmptyResponse(request.kind)),
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        tracing::debug!(
            kind = %request.kind,
            model = %self.model,
            schema = %request.schema_name,
            "sending generation request"
        );
        retry::execute(&self.retry, LlmError::is_retriable, || self.send_once(request))
            .await
            .map_err(|e| match e {
                RetryError::Fatal(inner) => inner,
                RetryError::Exhausted { attempts, last } => LlmError::ExhaustedRetries {
                    attempts,
                    last: Box::new(last),
                },
            })
    }
}

/// Maps a non-success HTTP status and its body onto an [`LlmError`].
///
/// A 429 whose body mentions quota is a billing problem and is never retried;
/// any other 429 is ordinary throttling.
#[must_use]
pub fn classify_status(status: StatusCode, body: &str) -> LlmError {
    let message = truncate(body, 300);
    match status.as_u16() {
        401 | 403 => LlmError::Unauthorized(message),
        429 if body.contains("insufficient_quota") || body.to_lowercase().contains("quota") => {
            LlmError::QuotaExceeded(message)
        }
        429 => LlmError::RateLimited(message),
        code if status.is_server_error() => LlmError::Server {
            status: code,
            message,
        },
        code => LlmError::InvalidRequest {
            status: code,
            message,
        },
    }
}

fn truncate(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        body.to_owned()
    } else {
        let cut: String = body.chars().take(max_chars).collect();
        format!("{cut}…")
    }
}
