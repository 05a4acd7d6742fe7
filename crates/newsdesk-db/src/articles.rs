//! Database operations for the `articles` table.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use newsdesk_core::{AnalyzedItem, ArticleAnalysis};
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `articles` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArticleRow {
    pub id: i64,
    pub link: String,
    pub title: String,
    pub description: Option<String>,
    pub source_name: Option<String>,
    pub region: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    pub title_score: f32,
    pub quality_score: f32,
    pub category: String,
    pub sentiment: String,
    pub importance: i16,
    pub analysis: Value,
    pub user_rating: Option<i16>,
    pub is_exemplar: bool,
    pub collected_at: DateTime<Utc>,
}

impl ArticleRow {
    /// Decode the stored `analysis` JSONB column.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the stored JSON no longer matches
    /// [`ArticleAnalysis`].
    pub fn analysis(&self) -> Result<ArticleAnalysis, serde_json::Error> {
        serde_json::from_value(self.analysis.clone())
    }
}

/// Insert payload for one analyzed article.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub link: String,
    pub title: String,
    pub description: Option<String>,
    pub source_name: Option<String>,
    pub region: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    pub title_score: f32,
    pub quality_score: f32,
    pub category: String,
    pub sentiment: String,
    pub importance: i16,
    pub analysis: Value,
}

impl NewArticle {
    /// Flatten a pipeline result into column values.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Encode`] if the analysis cannot be serialized.
    pub fn from_analyzed(item: &AnalyzedItem) -> Result<Self, DbError> {
        let candidate = item.candidate();
        let analysis = &item.analysis;
        Ok(Self {
            link: candidate.link.trim().to_owned(),
            title: candidate.title.clone(),
            description: candidate.description.clone(),
            source_name: candidate.source_name.clone(),
            region: candidate.region.map(|r| r.to_string()),
            published_at: candidate.published_at,
            image_url: item.qualified.image_url().map(str::to_owned),
            title_score: item.qualified.enriched.scored.title_score,
            quality_score: item.qualified.quality_score,
            category: analysis.category.as_str().to_owned(),
            sentiment: analysis.sentiment.to_string(),
            importance: i16::from(analysis.importance),
            analysis: serde_json::to_value(analysis)?,
        })
    }
}

const ARTICLE_COLUMNS: &str = "id, link, title, description, source_name, region, published_at, \
     image_url, title_score, quality_score, category, sentiment, importance, analysis, \
     user_rating, is_exemplar, collected_at";

/// Stable identity for a link: lowercase hex SHA-256 of the trimmed URL.
#[must_use]
pub fn link_hash(link: &str) -> String {
    format!("{:x}", Sha256::digest(link.trim().as_bytes()))
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Return the subset of `links` already stored, in one round-trip.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn existing_links(pool: &PgPool, links: &[String]) -> Result<HashSet<String>, DbError> {
    if links.is_empty() {
        return Ok(HashSet::new());
    }
    let hashes: Vec<String> = links.iter().map(|l| link_hash(l)).collect();

    let stored: Vec<String> =
        sqlx::query_scalar("SELECT link FROM articles WHERE link_hash = ANY($1)")
            .bind(&hashes)
            .fetch_all(pool)
            .await?;

    Ok(stored.into_iter().collect())
}

/// Insert an article unless its link is already stored.
///
/// Returns the new id, or `None` when the link was a duplicate. Existing rows
/// are never overwritten, so human ratings survive re-collection.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails for any other reason.
pub async fn upsert_article_by_link(
    pool: &PgPool,
    article: &NewArticle,
) -> Result<Option<i64>, DbError> {
    let id: Option<i64> = sqlx::query_scalar(
        "INSERT INTO articles \
             (link, link_hash, title, description, source_name, region, published_at, \
              image_url, title_score, quality_score, category, sentiment, importance, analysis) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
         ON CONFLICT (link_hash) DO NOTHING \
         RETURNING id",
    )
    .bind(&article.link)
    .bind(link_hash(&article.link))
    .bind(&article.title)
    .bind(&article.description)
    .bind(&article.source_name)
    .bind(&article.region)
    .bind(article.published_at)
    .bind(&article.image_url)
    .bind(article.title_score)
    .bind(article.quality_score)
    .bind(&article.category)
    .bind(&article.sentiment)
    .bind(article.importance)
    .bind(&article.analysis)
    .fetch_optional(pool)
    .await?;

    Ok(id)
}

/// Articles collected in `[start, end)`, most important first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_articles_between(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<ArticleRow>, DbError> {
    let sql = format!(
        "SELECT {ARTICLE_COLUMNS} FROM articles \
         WHERE collected_at >= $1 AND collected_at < $2 \
         ORDER BY importance DESC, collected_at DESC, id"
    );
    let rows = sqlx::query_as::<_, ArticleRow>(&sql)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}
