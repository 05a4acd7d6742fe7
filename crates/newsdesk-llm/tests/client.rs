//! Integration tests for `OpenAiClient` using wiremock HTTP mocks.

use newsdesk_llm::{CallKind, GenerationRequest, LlmError, OpenAiClient, RetryPolicy, TextGenerator};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str, attempts: u32) -> OpenAiClient {
    OpenAiClient::with_base_url("test-key", "test-model", 5, base_url)
        .expect("client construction should not fail")
        .with_retry_policy(RetryPolicy::immediate(attempts))
}

fn request() -> GenerationRequest {
    GenerationRequest {
        kind: CallKind::TitleScore,
        system: "score titles".to_owned(),
        user: "1. Budget passes".to_owned(),
        schema_name: "TitleScores".to_owned(),
        schema: json!({ "type": "object", "properties": {}, "additionalProperties": false }),
        timeout: None,
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content } }
        ]
    })
}

#[tokio::test]
async fn returns_message_content_and_sends_strict_schema() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "response_format": {
                "type": "json_schema",
                "json_schema": { "name": "TitleScores", "strict": true }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(r#"{"scores":[]}"#)))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 3);
    let text = client.generate(&request()).await.expect("should succeed");
    assert_eq!(text, r#"{"scores":[]}"#);
}

#[tokio::test]
async fn unauthorized_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 3);
    let err = client.generate(&request()).await.unwrap_err();
    assert!(matches!(err, LlmError::Unauthorized(_)), "got {err:?}");
}

#[tokio::test]
async fn quota_exhaustion_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "code": "insufficient_quota", "message": "You exceeded your current quota" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 3);
    let err = client.generate(&request()).await.unwrap_err();
    assert!(matches!(err, LlmError::QuotaExceeded(_)), "got {err:?}");
}

#[tokio::test]
async fn transient_server_errors_are_retried_until_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("{}")))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 3);
    let text = client.generate(&request()).await.expect("third attempt succeeds");
    assert_eq!(text, "{}");
}

#[tokio::test]
async fn persistent_server_errors_exhaust_the_budget() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(3)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 3);
    let err = client.generate(&request()).await.unwrap_err();
    match err {
        LlmError::ExhaustedRetries { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, LlmError::Server { status: 503, .. }));
        }
        other => panic!("expected ExhaustedRetries, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_content_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 1);
    let err = client.generate(&request()).await.unwrap_err();
    assert!(matches!(err, LlmError::EmptyResponse(CallKind::TitleScore)));
}
