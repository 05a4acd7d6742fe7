use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::LlmError;
use crate::schema::StructuredOutput;

/// Which pipeline step issued a generation call. Used in logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    TitleScore,
    QualityScore,
    Analysis,
    Digest,
    EvidenceCheck,
    QualityRubric,
}

impl CallKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CallKind::TitleScore => "title_score",
            CallKind::QualityScore => "quality_score",
            CallKind::Analysis => "analysis",
            CallKind::Digest => "digest",
            CallKind::EvidenceCheck => "evidence_check",
            CallKind::QualityRubric => "quality_rubric",
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One schema-constrained generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub kind: CallKind,
    pub system: String,
    pub user: String,
    pub schema_name: String,
    pub schema: Value,
    /// Per-call deadline; `None` falls back to the client default.
    pub timeout: Option<Duration>,
}

impl GenerationRequest {
    /// Build a request whose schema is derived from `T`.
    #[must_use]
    pub fn for_output<T: StructuredOutput>(
        kind: CallKind,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            system: system.into(),
            user: user.into(),
            schema_name: T::output_name(),
            schema: T::strict_schema(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replace the derived schema, e.g. after [`crate::restrict_field_values`].
    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }
}

/// Text generation that honors a JSON schema.
///
/// Implementations return the raw response text; [`generate_structured`]
/// handles parsing and validation so fakes in tests stay trivial.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError>;
}

/// Generate, parse, and validate a structured response.
///
/// # Errors
///
/// Propagates transport errors from `generator`, and returns
/// [`LlmError::Validation`] if the text does not deserialize into `T` or
/// fails `T`'s validation rules.
pub async fn generate_structured<T: StructuredOutput>(
    generator: &dyn TextGenerator,
    request: &GenerationRequest,
) -> Result<T, LlmError> {
    let raw = generator.generate(request).await?;
    parse_structured(request.kind, &raw)
}

/// Parse `raw` into `T` and run its validation rules.
///
/// Tolerates a surrounding Markdown code fence.
///
/// # Errors
///
/// Returns [`LlmError::EmptyResponse`] for blank text and
/// [`LlmError::Validation`] for anything that does not parse or validate.
pub fn parse_structured<T: StructuredOutput>(kind: CallKind, raw: &str) -> Result<T, LlmError> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(LlmError::EmptyResponse(kind));
    }
    let value: T = serde_json::from_str(body).map_err(|e| LlmError::Validation {
        kind,
        reason: format!("malformed JSON: {e}"),
    })?;
    value.validate().map_err(|e| LlmError::Validation {
        kind,
        reason: e.to_string(),
    })?;
    Ok(value)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use newsdesk_core::{Validate, ValidationError};
    use schemars::JsonSchema;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Score {
        score: f32,
    }

    impl Validate for Score {
        fn validate(&self) -> Result<(), ValidationError> {
            newsdesk_core::validate::in_range("score", self.score, 0.0, 100.0)
        }
    }

    struct Canned(&'static str);

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, LlmError> {
            Ok(self.0.to_owned())
        }
    }

    #[test]
    fn strips_fences_with_and_without_language_tag() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn parse_rejects_out_of_range_values() {
        let err = parse_structured::<Score>(CallKind::TitleScore, r#"{"score": 140}"#).unwrap_err();
        assert!(err.is_validation(), "got {err:?}");
    }

    #[test]
    fn parse_rejects_malformed_json() {
        let err = parse_structured::<Score>(CallKind::TitleScore, "not json").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn blank_response_is_empty_error() {
        let err = parse_structured::<Score>(CallKind::Digest, "  \n").unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse(CallKind::Digest)));
    }

    #[tokio::test]
    async fn generate_structured_parses_fenced_reply() {
        let request = GenerationRequest::for_output::<Score>(CallKind::TitleScore, "sys", "user");
        assert_eq!(request.schema_name, "Score");
        let score: Score = generate_structured(&Canned("```json\n{\"score\": 72.5}\n```"), &request)
            .await
            .unwrap();
        assert!((score.score - 72.5).abs() < f32::EPSILON);
    }

    #[test]
    fn call_kind_displays_snake_case() {
        assert_eq!(CallKind::QualityRubric.to_string(), "quality_rubric");
    }
}
