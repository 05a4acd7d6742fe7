//! Cross-check every evidence item in a digest against the corpus it was
//! written from.

use std::collections::HashMap;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use newsdesk_core::validate::{in_range, ValidationError};
use newsdesk_core::Validate;
use newsdesk_llm::{generate_structured, CallKind, GenerationRequest, TextGenerator};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::{CorpusArticle, DailyDigest, EvidenceItem};

pub const REASON_MISSING_ID: &str = "missing id";
pub const REASON_NONEXISTENT_ID: &str = "nonexistent id";

/// Relevance checks in flight at once.
const SEMANTIC_CONCURRENCY: usize = 4;

const SYSTEM_PROMPT: &str = "You are a fact checker. Given a claim from a news \
digest and the analysis of the article it cites, score from 0 to 10 how well \
the article supports the claim. 10 means the article states it directly, 5 \
means it is a fair inference, 0 means the article does not support it at all. \
Give a one-sentence reasoning.";

#[derive(Debug, Clone)]
pub struct EvidenceConfig {
    /// Ask the model to judge relevance for items that pass the id check.
    pub semantic_check: bool,
    /// Relevance below this (0 to 10) invalidates the item.
    pub threshold: f32,
    pub timeout: Duration,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            semantic_check: true,
            threshold: 5.0,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RelevanceVerdict {
    /// 0 to 10.
    pub score: f32,
    pub reasoning: String,
}

impl Validate for RelevanceVerdict {
    fn validate(&self) -> Result<(), ValidationError> {
        in_range("score", self.score, 0.0, 10.0)
    }
}

/// Outcome for one evidence item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceCheck {
    pub insight_rank: u32,
    pub text: String,
    pub article_id: Option<i64>,
    pub is_valid: bool,
    /// Why the item was rejected, or the model's reasoning when judged.
    pub reason: Option<String>,
    /// Semantic relevance 0 to 10, when a check ran and answered.
    pub relevance: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceReport {
    pub total: usize,
    pub valid: usize,
    /// `valid / total` as a percentage; 0 when there is no evidence.
    pub validation_rate: f32,
    /// Mean of the relevance scores that exist.
    pub average_relevance: Option<f32>,
    pub checks: Vec<EvidenceCheck>,
}

impl EvidenceReport {
    fn from_checks(checks: Vec<EvidenceCheck>) -> Self {
        let total = checks.len();
        let valid = checks.iter().filter(|c| c.is_valid).count();
        let relevance: Vec<f32> = checks.iter().filter_map(|c| c.relevance).collect();

        #[allow(clippy::cast_precision_loss)]
        let validation_rate = if total == 0 {
            0.0
        } else {
            valid as f32 / total as f32 * 100.0
        };
        #[allow(clippy::cast_precision_loss)]
        let average_relevance =
            (!relevance.is_empty()).then(|| relevance.iter().sum::<f32>() / relevance.len() as f32);

        Self {
            total,
            valid,
            validation_rate,
            average_relevance,
            checks,
        }
    }
}

/// Check every evidence item of `digest`.
///
/// An item without an id, or whose id is not in `corpus`, is invalid with no
/// model call. When `generator` is given and the semantic check is enabled,
/// the rest are scored for relevance; a failed relevance call leaves the item
/// valid.
pub async fn validate_evidence(
    generator: Option<&dyn TextGenerator>,
    digest: &DailyDigest,
    corpus: &[CorpusArticle],
    config: &EvidenceConfig,
) -> EvidenceReport {
    let by_id: HashMap<i64, &CorpusArticle> = corpus.iter().map(|a| (a.id, a)).collect();
    let semantic = generator.filter(|_| config.semantic_check);

    let items: Vec<(u32, &EvidenceItem)> = digest
        .insights
        .iter()
        .flat_map(|i| i.evidence.iter().map(move |e| (i.rank, e)))
        .collect();

    let checks: Vec<EvidenceCheck> = stream::iter(items)
        .map(|(rank, item)| {
            let by_id = &by_id;
            async move {
                let mut check = local_check(rank, item, by_id);
                let target = item.article_id.and_then(|id| by_id.get(&id));
                if let (true, Some(generator), Some(article)) = (check.is_valid, semantic, target) {
                    judge(generator, item, article, config, &mut check).await;
                }
                check
            }
        })
        .buffered(SEMANTIC_CONCURRENCY)
        .collect()
        .await;

    let report = EvidenceReport::from_checks(checks);
    tracing::info!(
        total = report.total,
        valid = report.valid,
        validation_rate = report.validation_rate,
        average_relevance = ?report.average_relevance,
        "evidence validated"
    );
    report
}

fn local_check(rank: u32, item: &EvidenceItem, by_id: &HashMap<i64, &CorpusArticle>) -> EvidenceCheck {
    let rejection = match item.article_id {
        None => Some(REASON_MISSING_ID),
        Some(id) if !by_id.contains_key(&id) => Some(REASON_NONEXISTENT_ID),
        Some(_) => None,
    };
    EvidenceCheck {
        insight_rank: rank,
        text: item.text.clone(),
        article_id: item.article_id,
        is_valid: rejection.is_none(),
        reason: rejection.map(str::to_string),
        relevance: None,
    }
}

async fn judge(
    generator: &dyn TextGenerator,
    item: &EvidenceItem,
    article: &CorpusArticle,
    config: &EvidenceConfig,
    check: &mut EvidenceCheck,
) {
    let user = format!(
        "Claim: {}\n\nArticle [{}]: {}\nSummary: {}\nBackground: {}\nKeywords: {}",
        item.text,
        article.id,
        article.title,
        article.analysis.summary,
        article.analysis.background,
        article.analysis.keywords.join(", "),
    );
    let request = GenerationRequest::for_output::<RelevanceVerdict>(
        CallKind::EvidenceCheck,
        SYSTEM_PROMPT,
        user,
    )
    .with_timeout(config.timeout);

    match generate_structured::<RelevanceVerdict>(generator, &request).await {
        Ok(verdict) => {
            check.relevance = Some(verdict.score);
            check.is_valid = verdict.score >= config.threshold;
            check.reason = Some(verdict.reasoning);
        }
        Err(e) => {
            tracing::warn!(
                article_id = article.id,
                error = %e,
                "relevance check failed; keeping evidence on id check alone"
            );
        }
    }
}
