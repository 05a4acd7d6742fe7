//! Database operations for the `daily_digests` table.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `daily_digests` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DigestRow {
    pub id: i64,
    pub report_date: NaiveDate,
    pub headline: String,
    pub digest: Value,
    pub markdown: String,
    pub article_count: i32,
    pub evidence_report: Value,
    pub validation_rate: f32,
    /// `NULL` when the quality evaluator failed for this run.
    pub quality_verdict: Option<Value>,
    pub quality_score: Option<f32>,
    pub final_score: Option<f32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDigest {
    pub report_date: NaiveDate,
    pub headline: String,
    pub digest: Value,
    pub markdown: String,
    pub article_count: i32,
    pub evidence_report: Value,
    pub validation_rate: f32,
    pub quality_verdict: Option<Value>,
    pub quality_score: Option<f32>,
    pub final_score: Option<f32>,
}

const DIGEST_COLUMNS: &str = "id, report_date, headline, digest, markdown, article_count, \
     evidence_report, validation_rate, quality_verdict, quality_score, final_score, \
     created_at, updated_at";

/// Insert or replace the digest for `digest.report_date`.
///
/// There is at most one row per date; regenerating overwrites every column
/// and bumps `updated_at`, keeping the original `id` and `created_at`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_digest_by_date(pool: &PgPool, digest: &NewDigest) -> Result<DigestRow, DbError> {
    let sql = format!(
        "INSERT INTO daily_digests \
             (report_date, headline, digest, markdown, article_count, evidence_report, \
              validation_rate, quality_verdict, quality_score, final_score) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT (report_date) DO UPDATE SET \
             headline = EXCLUDED.headline, \
             digest = EXCLUDED.digest, \
             markdown = EXCLUDED.markdown, \
             article_count = EXCLUDED.article_count, \
             evidence_report = EXCLUDED.evidence_report, \
             validation_rate = EXCLUDED.validation_rate, \
             quality_verdict = EXCLUDED.quality_verdict, \
             quality_score = EXCLUDED.quality_score, \
             final_score = EXCLUDED.final_score, \
             updated_at = NOW() \
         RETURNING {DIGEST_COLUMNS}"
    );

    let row = sqlx::query_as::<_, DigestRow>(&sql)
        .bind(digest.report_date)
        .bind(&digest.headline)
        .bind(&digest.digest)
        .bind(&digest.markdown)
        .bind(digest.article_count)
        .bind(&digest.evidence_report)
        .bind(digest.validation_rate)
        .bind(&digest.quality_verdict)
        .bind(digest.quality_score)
        .bind(digest.final_score)
        .fetch_one(pool)
        .await?;

    Ok(row)
}

/// Fetch the digest for `date`, or `None` if none has been generated.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_digest_by_date(
    pool: &PgPool,
    date: NaiveDate,
) -> Result<Option<DigestRow>, DbError> {
    let sql = format!("SELECT {DIGEST_COLUMNS} FROM daily_digests WHERE report_date = $1");
    let row = sqlx::query_as::<_, DigestRow>(&sql)
        .bind(date)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}
