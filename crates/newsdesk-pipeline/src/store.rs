//! Storage seams used by the pipeline, with Postgres implementations.

use std::collections::HashSet;

use async_trait::async_trait;
use newsdesk_core::{classify, AnalyzedItem, Candidate, Category};
use newsdesk_db::{DbError, NewArticle};
use sqlx::PgPool;

/// Article persistence as seen by the pipeline.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Subset of `links` already stored.
    async fn existing_links(&self, links: &[String]) -> Result<HashSet<String>, DbError>;

    /// Insert one analyzed item. `Ok(None)` means the link was already stored.
    async fn save_article(&self, item: &AnalyzedItem) -> Result<Option<i64>, DbError>;
}

/// A previously curated analysis reused as a few-shot example.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptExample {
    pub title: String,
    /// The analysis as JSON text, exactly as the model should answer.
    pub output: String,
}

/// Read path of the human feedback loop.
#[async_trait]
pub trait ExemplarSource: Send + Sync {
    async fn examples_for_prompt(
        &self,
        candidate: &Candidate,
        limit: usize,
    ) -> Result<Vec<PromptExample>, DbError>;
}

#[async_trait]
impl ArticleStore for PgPool {
    async fn existing_links(&self, links: &[String]) -> Result<HashSet<String>, DbError> {
        newsdesk_db::existing_links(self, links).await
    }

    async fn save_article(&self, item: &AnalyzedItem) -> Result<Option<i64>, DbError> {
        let row = NewArticle::from_analyzed(item)?;
        newsdesk_db::upsert_article_by_link(self, &row).await
    }
}

#[async_trait]
impl ExemplarSource for PgPool {
    async fn examples_for_prompt(
        &self,
        candidate: &Candidate,
        limit: usize,
    ) -> Result<Vec<PromptExample>, DbError> {
        let category = infer_category(candidate);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = newsdesk_db::list_exemplars(self, Some(category.as_str()), limit).await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let output = serde_json::to_string_pretty(&row.analysis).ok()?;
                Some(PromptExample {
                    title: row.title,
                    output,
                })
            })
            .collect())
    }
}

/// Category guess from title and description, before any analysis exists.
#[must_use]
pub fn infer_category(candidate: &Candidate) -> Category {
    match &candidate.description {
        Some(description) => classify(&format!("{} {description}", candidate.title)),
        None => classify(&candidate.title),
    }
}
