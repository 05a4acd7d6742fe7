//! End-to-end digest generation for one report date.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, TimeDelta};
use newsdesk_core::AppConfig;
use newsdesk_db::{DbError, NewDigest};
use newsdesk_llm::TextGenerator;
use sqlx::PgPool;

use crate::error::DigestError;
use crate::evidence::{validate_evidence, EvidenceConfig, EvidenceReport};
use crate::quality::{evaluate_quality, evidence_score, final_score, QualityVerdict};
use crate::render::render_markdown;
use crate::synthesize::{select_corpus, synthesize_digest};
use crate::types::{CorpusArticle, DailyDigest};

/// Storage seam for digest generation.
#[async_trait]
pub trait DigestRepository: Send + Sync {
    /// Articles collected on `date` (UTC).
    async fn articles_for_day(&self, date: NaiveDate) -> Result<Vec<CorpusArticle>, DbError>;

    /// Insert or replace the digest for its date; returns the row id.
    async fn save_digest(&self, digest: &NewDigest) -> Result<i64, DbError>;
}

#[async_trait]
impl DigestRepository for PgPool {
    async fn articles_for_day(&self, date: NaiveDate) -> Result<Vec<CorpusArticle>, DbError> {
        let start = date.and_time(NaiveTime::MIN).and_utc();
        let end = start + TimeDelta::days(1);
        let rows = newsdesk_db::list_articles_between(self, start, end).await?;

        Ok(rows
            .iter()
            .filter_map(|row| match CorpusArticle::from_row(row) {
                Ok(article) => Some(article),
                Err(e) => {
                    tracing::warn!(
                        article_id = row.id,
                        error = %e,
                        "skipping article with unreadable analysis"
                    );
                    None
                }
            })
            .collect())
    }

    async fn save_digest(&self, digest: &NewDigest) -> Result<i64, DbError> {
        Ok(newsdesk_db::upsert_digest_by_date(self, digest).await?.id)
    }
}

#[derive(Debug, Clone)]
pub struct DigestConfig {
    /// Most important articles handed to synthesis.
    pub max_articles: usize,
    pub synthesis_timeout: Duration,
    /// Timeout for the rubric call.
    pub review_timeout: Duration,
    pub evidence: EvidenceConfig,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            max_articles: 30,
            synthesis_timeout: Duration::from_secs(180),
            review_timeout: Duration::from_secs(60),
            evidence: EvidenceConfig::default(),
        }
    }
}

impl DigestConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_articles: config.digest_max_articles.max(1),
            synthesis_timeout: Duration::from_secs(config.digest_timeout_secs),
            review_timeout: Duration::from_secs(config.llm_timeout_secs),
            evidence: EvidenceConfig {
                semantic_check: config.evidence_semantic_check,
                threshold: config.evidence_threshold,
                timeout: Duration::from_secs(config.llm_timeout_secs),
            },
        }
    }
}

#[derive(Debug)]
pub struct DigestOutcome {
    pub id: i64,
    /// Articles handed to the writer after selection.
    pub article_count: usize,
    pub digest: DailyDigest,
    pub markdown: String,
    pub evidence: EvidenceReport,
    pub evidence_score: f32,
    /// `None` when the rubric call failed.
    pub verdict: Option<QualityVerdict>,
    pub final_score: Option<f32>,
}

/// Synthesizes, checks, grades, and stores the digest for a date.
pub struct DigestGenerator {
    /// Writes the digest; usually the larger model.
    writer: Arc<dyn TextGenerator>,
    /// Runs relevance checks and the rubric.
    reviewer: Arc<dyn TextGenerator>,
    repository: Arc<dyn DigestRepository>,
    config: DigestConfig,
}

impl DigestGenerator {
    #[must_use]
    pub fn new(
        writer: Arc<dyn TextGenerator>,
        reviewer: Arc<dyn TextGenerator>,
        repository: Arc<dyn DigestRepository>,
        config: DigestConfig,
    ) -> Self {
        Self {
            writer,
            reviewer,
            repository,
            config,
        }
    }

    /// Generate and upsert the digest for `date`.
    ///
    /// A failed rubric call does not fail the run: the digest is stored with
    /// its evidence report and no verdict or final score.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::NoArticles`] for an empty day,
    /// [`DigestError::Synthesis`] when no usable digest was produced, and
    /// [`DigestError::Db`] on storage failure.
    pub async fn generate(&self, date: NaiveDate) -> Result<DigestOutcome, DigestError> {
        let articles = self.repository.articles_for_day(date).await?;
        if articles.is_empty() {
            return Err(DigestError::NoArticles(date));
        }
        let available = articles.len();
        let corpus = select_corpus(articles, self.config.max_articles);
        tracing::info!(%date, available, selected = corpus.len(), "generating digest");

        let digest = synthesize_digest(
            self.writer.as_ref(),
            date,
            &corpus,
            self.config.synthesis_timeout,
        )
        .await
        .map_err(DigestError::Synthesis)?;

        let evidence = validate_evidence(
            Some(self.reviewer.as_ref()),
            &digest,
            &corpus,
            &self.config.evidence,
        )
        .await;
        let markdown = render_markdown(&digest);

        let verdict = match evaluate_quality(
            self.reviewer.as_ref(),
            &markdown,
            self.config.review_timeout,
        )
        .await
        {
            Ok(verdict) => Some(verdict),
            Err(e) => {
                tracing::warn!(
                    %date,
                    error = %e,
                    "quality evaluation failed; storing digest without a score"
                );
                None
            }
        };

        let evidence_points = evidence_score(&evidence);
        let blended = verdict.as_ref().map(|v| final_score(v.overall, evidence_points));

        let row = NewDigest {
            report_date: date,
            headline: digest.headline.clone(),
            digest: serde_json::to_value(&digest)?,
            markdown: markdown.clone(),
            article_count: i32::try_from(corpus.len()).unwrap_or(i32::MAX),
            evidence_report: serde_json::to_value(&evidence)?,
            validation_rate: evidence.validation_rate,
            quality_verdict: verdict.as_ref().map(serde_json::to_value).transpose()?,
            quality_score: verdict.as_ref().map(|v| v.overall),
            final_score: blended,
        };
        let id = self.repository.save_digest(&row).await?;

        tracing::info!(
            %date,
            digest_id = id,
            validation_rate = evidence.validation_rate,
            final_score = ?blended,
            "digest stored"
        );

        Ok(DigestOutcome {
            id,
            article_count: corpus.len(),
            digest,
            markdown,
            evidence,
            evidence_score: evidence_points,
            verdict,
            final_score: blended,
        })
    }
}
