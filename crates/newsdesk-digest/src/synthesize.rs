//! One generation call turning a day's analyzed articles into a digest.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::Duration;

use chrono::NaiveDate;
use newsdesk_core::validate::{min_chars, ValidationError};
use newsdesk_core::Validate;
use newsdesk_llm::{
    generate_structured, restrict_field_values, CallKind, GenerationRequest, LlmError,
    StructuredOutput, TextGenerator,
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::types::{
    ArticleRef, CorpusArticle, DailyDigest, EvidenceItem, Insight, Section, SentimentTally,
    UNAVAILABLE_TITLE,
};

pub const HEADLINE_MIN_CHARS: usize = 10;
pub const OVERVIEW_MIN_CHARS: usize = 100;
pub const SECTION_BODY_MIN_CHARS: usize = 80;

const SYSTEM_PROMPT: &str = "You are the editor of a daily news briefing. \
From the analyzed articles below, write one digest for the day.
- headline: the single most important development, in one line.
- overview: a paragraph tying the day's main threads together.
- sections: group related stories by theme. Each body explains what happened \
and why it matters, and article_ids lists the articles it draws on.
- insights: the most useful takeaways, most important first. Every insight \
carries evidence: a concrete fact, with the article_id it comes from.
Only use article ids from the list. Do not invent facts that are not in the \
article summaries.";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DigestDraft {
    pub headline: String,
    pub overview: String,
    pub sections: Vec<DraftSection>,
    pub insights: Vec<DraftInsight>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DraftSection {
    pub title: String,
    pub body: String,
    pub article_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DraftInsight {
    pub title: String,
    pub detail: String,
    pub evidence: Vec<DraftEvidence>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DraftEvidence {
    pub text: String,
    pub article_id: Option<i64>,
    /// Outlet name, when the fact is attributed to one.
    pub source: Option<String>,
}

impl Validate for DigestDraft {
    /// Structural checks only. Length minimums are enforced by
    /// [`DigestDraft::repair`], which falls back instead of failing.
    fn validate(&self) -> Result<(), ValidationError> {
        if !self.sections.iter().any(DraftSection::is_usable) {
            return Err(ValidationError::new("sections", "at least one section required"));
        }
        if !self.insights.iter().any(DraftInsight::is_usable) {
            return Err(ValidationError::new("insights", "at least one insight required"));
        }
        Ok(())
    }
}

impl DraftSection {
    fn is_usable(&self) -> bool {
        !self.title.trim().is_empty() && !self.body.trim().is_empty()
    }

    fn is_full_length(&self) -> bool {
        min_chars("body", &self.body, SECTION_BODY_MIN_CHARS).is_ok()
    }
}

impl DraftInsight {
    fn is_usable(&self) -> bool {
        !self.title.trim().is_empty() && !self.detail.trim().is_empty()
    }
}

impl DigestDraft {
    /// Bring an under-length draft up to shape.
    ///
    /// Short section bodies are dropped while a full-length section remains;
    /// a short headline is replaced by the top article's title; a short
    /// overview is kept as written. Each fallback is logged.
    pub(crate) fn repair(&mut self, date: NaiveDate, corpus: &[CorpusArticle]) {
        if let Err(e) = min_chars("headline", &self.headline, HEADLINE_MIN_CHARS) {
            if let Some(top) = corpus.first() {
                tracing::warn!(%date, error = %e, "short digest headline; using top article title");
                self.headline = top.title.clone();
            }
        }
        if let Err(e) = min_chars("overview", &self.overview, OVERVIEW_MIN_CHARS) {
            tracing::warn!(%date, error = %e, "short digest overview kept as written");
        }

        self.sections.retain(DraftSection::is_usable);
        if self.sections.iter().any(DraftSection::is_full_length) {
            let before = self.sections.len();
            self.sections.retain(DraftSection::is_full_length);
            let dropped = before - self.sections.len();
            if dropped > 0 {
                tracing::warn!(%date, dropped, "dropped under-length digest sections");
            }
        } else {
            tracing::warn!(%date, "no full-length digest section; keeping short ones");
        }

        self.insights.retain(DraftInsight::is_usable);
        for insight in &mut self.insights {
            insight.evidence.retain(|e| !e.text.trim().is_empty());
        }
    }
}

/// Keep the `max` most important articles. Equal importance keeps the
/// incoming order.
#[must_use]
pub fn select_corpus(mut articles: Vec<CorpusArticle>, max: usize) -> Vec<CorpusArticle> {
    articles.sort_by(|a, b| b.analysis.importance.cmp(&a.analysis.importance));
    articles.truncate(max);
    articles
}

/// Generate the digest for `date` from `corpus`.
///
/// Every id field in the response schema is restricted to the corpus ids.
/// Ids the model cites anyway are resolved to placeholder refs.
///
/// # Errors
///
/// Returns the generation error, including [`LlmError::Validation`] when the
/// draft has no usable section or insight. Under-length fields fall back
/// instead of failing.
pub async fn synthesize_digest(
    generator: &dyn TextGenerator,
    date: NaiveDate,
    corpus: &[CorpusArticle],
    timeout: Duration,
) -> Result<DailyDigest, LlmError> {
    let ids: Vec<Value> = corpus.iter().map(|a| Value::from(a.id)).collect();
    let mut schema = DigestDraft::strict_schema();
    if !ids.is_empty() {
        restrict_field_values(&mut schema, "article_ids", &ids);
        restrict_field_values(&mut schema, "article_id", &ids);
    }

    let request = GenerationRequest::for_output::<DigestDraft>(
        CallKind::Digest,
        SYSTEM_PROMPT,
        user_prompt(date, corpus),
    )
    .with_schema(schema)
    .with_timeout(timeout);

    let mut draft: DigestDraft = generate_structured(generator, &request).await?;
    draft.repair(date, corpus);
    tracing::info!(
        %date,
        sections = draft.sections.len(),
        insights = draft.insights.len(),
        "digest drafted"
    );
    Ok(assemble(date, draft, corpus))
}

fn user_prompt(date: NaiveDate, corpus: &[CorpusArticle]) -> String {
    let ids: Vec<String> = corpus.iter().map(|a| a.id.to_string()).collect();
    let mut out = format!("Date: {date}\nValid article ids: {}\n\n", ids.join(", "));
    for article in corpus {
        let a = &article.analysis;
        let _ = writeln!(
            out,
            "[{}] {}{}\ncategory: {} | sentiment: {} | importance: {}\nsummary: {}\nkeywords: {}\n",
            article.id,
            article.title,
            article
                .source_name
                .as_deref()
                .map(|s| format!(" ({s})"))
                .unwrap_or_default(),
            a.category,
            a.sentiment,
            a.importance,
            a.summary,
            a.keywords.join(", "),
        );
    }
    out
}

/// Turn a repaired draft into a digest, resolving cited ids.
pub(crate) fn assemble(date: NaiveDate, draft: DigestDraft, corpus: &[CorpusArticle]) -> DailyDigest {
    let by_id: HashMap<i64, &CorpusArticle> = corpus.iter().map(|a| (a.id, a)).collect();
    let resolve = |id: i64| match by_id.get(&id) {
        Some(a) => ArticleRef {
            id,
            title: a.title.clone(),
            link: Some(a.link.clone()),
        },
        None => {
            tracing::warn!(article_id = id, "digest cited an unknown article");
            ArticleRef {
                id,
                title: UNAVAILABLE_TITLE.to_string(),
                link: None,
            }
        }
    };

    let sections = draft
        .sections
        .into_iter()
        .map(|s| Section {
            title: s.title,
            body: s.body,
            articles: s.article_ids.into_iter().map(&resolve).collect(),
        })
        .collect();

    let insights = draft
        .insights
        .into_iter()
        .zip(1u32..)
        .map(|(i, rank)| Insight {
            rank,
            title: i.title,
            detail: i.detail,
            evidence: i
                .evidence
                .into_iter()
                .map(|e| EvidenceItem {
                    text: e.text,
                    article_id: e.article_id,
                    source: e.source,
                })
                .collect(),
        })
        .collect();

    DailyDigest {
        date,
        headline: draft.headline,
        overview: draft.overview,
        sections,
        insights,
        sentiment: SentimentTally::from_corpus(corpus),
    }
}
