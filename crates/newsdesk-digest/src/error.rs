use chrono::NaiveDate;
use newsdesk_db::DbError;
use newsdesk_llm::LlmError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DigestError {
    #[error("no analyzed articles collected on {0}")]
    NoArticles(NaiveDate),

    #[error("digest synthesis failed: {0}")]
    Synthesis(#[source] LlmError),

    #[error("failed to encode digest: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Db(#[from] DbError),
}
