use thiserror::Error;

use crate::generator::CallKind;

/// Errors returned by text-generation calls.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the credentials (401/403).
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    /// The account has no remaining quota or credit.
    #[error("quota exhausted: {0}")]
    QuotaExceeded(String),

    /// Provider-side throttling that clears on its own.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The request itself is malformed (400/404/422 and similar).
    #[error("invalid request (HTTP {status}): {message}")]
    InvalidRequest { status: u16, message: String },

    /// 5xx from the provider.
    #[error("provider error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// The provider answered but returned no content.
    #[error("empty response for {0} call")]
    EmptyResponse(CallKind),

    /// The response did not match the requested schema.
    #[error("{kind} response failed validation: {reason}")]
    Validation { kind: CallKind, reason: String },

    /// Every attempt failed with a transient error.
    #[error("gave up after {attempts} attempts: {last}")]
    ExhaustedRetries {
        attempts: u32,
        #[source]
        last: Box<LlmError>,
    },
}

impl LlmError {
    /// Returns `true` for errors that are worth retrying after a back-off delay.
    ///
    /// **Retriable:** timeouts, connection failures, 5xx, provider rate limiting.
    ///
    /// **Not retriable:** authentication failure, quota exhaustion, malformed
    /// requests, validation failures, and an already-exhausted retry budget.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            LlmError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            LlmError::RateLimited(_) | LlmError::Server { .. } => true,
            LlmError::Unauthorized(_)
            | LlmError::QuotaExceeded(_)
            | LlmError::InvalidRequest { .. }
            | LlmError::EmptyResponse(_)
            | LlmError::Validation { .. }
            | LlmError::ExhaustedRetries { .. } => false,
        }
    }

    /// Returns `true` if the provider answered but the response is unusable:
    /// empty, or not matching its schema.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, LlmError::Validation { .. } | LlmError::EmptyResponse(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_exceeded_is_not_retriable() {
        assert!(!LlmError::QuotaExceeded("insufficient_quota".to_owned()).is_retriable());
    }

    #[test]
    fn unauthorized_is_not_retriable() {
        assert!(!LlmError::Unauthorized("bad key".to_owned()).is_retriable());
    }

    #[test]
    fn invalid_request_is_not_retriable() {
        assert!(!LlmError::InvalidRequest {
            status: 400,
            message: "bad schema".to_owned()
        }
        .is_retriable());
    }

    #[test]
    fn validation_is_not_retriable() {
        let err = LlmError::Validation {
            kind: CallKind::Analysis,
            reason: "missing summary".to_owned(),
        };
        assert!(!err.is_retriable());
        assert!(err.is_validation());
    }

    #[test]
    fn server_and_rate_limit_are_retriable() {
        assert!(LlmError::Server {
            status: 503,
            message: "overloaded".to_owned()
        }
        .is_retriable());
        assert!(LlmError::RateLimited("slow down".to_owned()).is_retriable());
    }
}
