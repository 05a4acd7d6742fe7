//! Bookkeeping rows for CLI jobs.
//!
//! A `pipeline` run covers one staged selection pass and records how many
//! articles it saved plus per-stage metrics; a `digest` run covers one
//! daily digest and records the corpus size plus evidence and quality
//! scores. Rows move `queued` → `running` → `succeeded` | `failed`, and every
//! update only applies from the status it expects.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgQueryResult;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// Which job a run row belongs to; matches the `run_type` check constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunType {
    Pipeline,
    Digest,
}

impl RunType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunType::Pipeline => "pipeline",
            RunType::Digest => "digest",
        }
    }
}

impl std::fmt::Display for RunType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PipelineRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub run_type: String,
    pub trigger_source: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Articles saved (pipeline) or articles in the digest corpus (digest).
    pub records_processed: i32,
    pub metrics: Value,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert a `queued` run for `run_type`, started from `trigger_source`
/// (`cli` for the command-line entry points).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_pipeline_run(
    pool: &PgPool,
    run_type: RunType,
    trigger_source: &str,
) -> Result<PipelineRunRow, DbError> {
    let row = sqlx::query_as::<_, PipelineRunRow>(
        "INSERT INTO pipeline_runs (public_id, run_type, trigger_source) \
         VALUES ($1, $2, $3) \
         RETURNING id, public_id, run_type, trigger_source, status, started_at, \
                   completed_at, records_processed, metrics, error_message, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(run_type.as_str())
    .bind(trigger_source)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Move a queued run to `running`.
///
/// # Errors
///
/// [`DbError::InvalidRunTransition`] unless the run is `queued`.
pub async fn start_pipeline_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE pipeline_runs SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    ensure_applied(&result, id, "queued")
}

/// Close a running job as `succeeded`, storing its count and the metrics
/// document the job produced.
///
/// # Errors
///
/// [`DbError::InvalidRunTransition`] unless the run is `running`.
pub async fn complete_pipeline_run(
    pool: &PgPool,
    id: i64,
    records_processed: i32,
    metrics: &Value,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE pipeline_runs \
         SET status = 'succeeded', completed_at = NOW(), records_processed = $1, metrics = $2 \
         WHERE id = $3 AND status = 'running'",
    )
    .bind(records_processed)
    .bind(metrics)
    .bind(id)
    .execute(pool)
    .await?;

    ensure_applied(&result, id, "running")
}

/// Close a job as `failed`. Queued runs qualify too: a job can die before
/// it gets to start, e.g. on the wall-clock deadline.
///
/// # Errors
///
/// [`DbError::InvalidRunTransition`] once the run has already finished.
pub async fn fail_pipeline_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE pipeline_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status IN ('queued', 'running')",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    ensure_applied(&result, id, "queued or running")
}

fn ensure_applied(
    result: &PgQueryResult,
    id: i64,
    expected_status: &'static str,
) -> Result<(), DbError> {
    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status,
        });
    }
    Ok(())
}
