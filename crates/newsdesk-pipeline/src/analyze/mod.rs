//! Stage 3: one structured analysis per qualified item.

mod complexity;
mod exemplars;
mod prompt;

use std::time::Duration;

use futures::stream::{self, StreamExt};
use newsdesk_core::{AnalyzedItem, ArticleAnalysis, Candidate, QualifiedCandidate};
use newsdesk_llm::{generate_structured, CallKind, GenerationRequest, LlmError, TextGenerator};
use newsdesk_scraper::extract_domain;

pub use complexity::{estimate_complexity, Complexity};
pub use exemplars::builtin_examples;

use crate::error::PipelineError;
use crate::store::{ExemplarSource, PromptExample};

/// Few-shot examples per prompt.
pub const MAX_EXAMPLES: usize = 2;

/// Analyze every item, with at most `concurrency` calls in flight
/// (`None` runs all items at once).
///
/// Items whose response is missing or fails validation are dropped; the
/// others are returned in input order.
///
/// # Errors
///
/// Fails only when nothing survived and at least one item hit a
/// non-validation error, which points at the provider rather than the
/// items.
pub async fn analyze_items(
    generator: &dyn TextGenerator,
    exemplars: &dyn ExemplarSource,
    items: Vec<QualifiedCandidate>,
    concurrency: Option<usize>,
    timeout: Duration,
) -> Result<Vec<AnalyzedItem>, PipelineError> {
    if items.is_empty() {
        return Ok(Vec::new());
    }
    let workers = concurrency.unwrap_or(items.len()).max(1);

    let mut results: Vec<(usize, Result<ArticleAnalysis, LlmError>)> =
        stream::iter(items.iter().enumerate())
            .map(|(idx, item)| async move {
                (idx, analyze_one(generator, exemplars, item.candidate(), timeout).await)
            })
            .buffer_unordered(workers)
            .collect()
            .await;
    results.sort_by_key(|(idx, _)| *idx);

    let mut analyzed = Vec::with_capacity(items.len());
    let mut last_hard_error = None;
    for (qualified, (_, result)) in items.into_iter().zip(results) {
        match result {
            Ok(analysis) => analyzed.push(AnalyzedItem {
                qualified,
                analysis,
            }),
            Err(e) => {
                tracing::warn!(
                    domain = %extract_domain(&qualified.candidate().link),
                    error = %e,
                    "analysis dropped"
                );
                if !e.is_validation() {
                    last_hard_error = Some(e);
                }
            }
        }
    }

    match last_hard_error {
        Some(e) if analyzed.is_empty() => Err(PipelineError::stage("analysis")(e)),
        _ => Ok(analyzed),
    }
}

async fn analyze_one(
    generator: &dyn TextGenerator,
    exemplars: &dyn ExemplarSource,
    candidate: &Candidate,
    timeout: Duration,
) -> Result<ArticleAnalysis, LlmError> {
    let complexity = estimate_complexity(candidate);
    let examples = examples_for(exemplars, candidate).await;
    tracing::debug!(
        complexity = %complexity,
        examples = examples.len(),
        "building analysis prompt"
    );

    let request = GenerationRequest::for_output::<ArticleAnalysis>(
        CallKind::Analysis,
        prompt::system_prompt(complexity, &examples),
        prompt::user_prompt(candidate),
    )
    .with_timeout(timeout);
    generate_structured(generator, &request).await
}

/// Curated exemplars first; built-ins when the store has none or is down.
async fn examples_for(exemplars: &dyn ExemplarSource, candidate: &Candidate) -> Vec<PromptExample> {
    match exemplars.examples_for_prompt(candidate, MAX_EXAMPLES).await {
        Ok(mut found) if !found.is_empty() => {
            found.truncate(MAX_EXAMPLES);
            found
        }
        Ok(_) => builtin_examples(candidate, MAX_EXAMPLES),
        Err(e) => {
            tracing::warn!(error = %e, "exemplar lookup failed; using built-in examples");
            builtin_examples(candidate, MAX_EXAMPLES)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use async_trait::async_trait;
    use newsdesk_core::{EnrichedCandidate, ScoredCandidate};
    use newsdesk_db::DbError;

    use super::*;
    use newsdesk_llm::testing::ScriptedGenerator;

    /// Exemplar store with fixed contents, or permanently failing.
    #[derive(Default)]
    pub(crate) struct StaticExemplars {
        pub(crate) examples: Vec<PromptExample>,
        pub(crate) fail: bool,
    }

    #[async_trait]
    impl ExemplarSource for StaticExemplars {
        async fn examples_for_prompt(
            &self,
            _candidate: &Candidate,
            limit: usize,
        ) -> Result<Vec<PromptExample>, DbError> {
            if self.fail {
                return Err(DbError::Sqlx(sqlx::Error::PoolTimedOut));
            }
            Ok(self.examples.iter().take(limit).cloned().collect())
        }
    }

    pub(crate) fn valid_analysis_json(importance: u8) -> String {
        format!(
            r#"{{
                "summary": "A detailed summary of the reported event that is long enough.",
                "stakeholder_impacts": [{{"stakeholder": "Households", "impact": "Pay more.", "direction": "negative"}}],
                "background": "Prices have been rising for a year.",
                "keywords": ["prices"],
                "category": "economy",
                "sentiment": "negative",
                "sentiment_confidence": 0.7,
                "importance": {importance}
            }}"#
        )
    }

    pub(crate) fn qualified(i: usize) -> QualifiedCandidate {
        QualifiedCandidate {
            enriched: EnrichedCandidate {
                scored: ScoredCandidate {
                    candidate: Candidate {
                        title: format!("Story {i}"),
                        link: format!("https://news.example.com/{i}"),
                        description: None,
                        published_at: None,
                        source_name: None,
                        region: None,
                    },
                    title_score: 70.0,
                    reason: String::new(),
                },
                image_url: None,
            },
            quality_score: 70.0,
            has_valid_image: false,
        }
    }

    #[tokio::test]
    async fn invalid_responses_never_become_analyzed_items() {
        // importance 42 is out of range; "nope" is not JSON at all.
        let generator = ScriptedGenerator::new(vec![
            Ok(valid_analysis_json(6)),
            Ok(valid_analysis_json(42)),
            Ok("nope".to_string()),
        ]);
        let out = analyze_items(
            &generator,
            &StaticExemplars::default(),
            (0..3).map(qualified).collect(),
            Some(1),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].candidate().link, "https://news.example.com/0");
        assert_eq!(out[0].analysis.importance, 6);
    }

    #[tokio::test]
    async fn one_provider_error_does_not_sink_siblings() {
        let generator = ScriptedGenerator::new(vec![
            Err(LlmError::Server {
                status: 500,
                message: "boom".into(),
            }),
            Ok(valid_analysis_json(5)),
        ]);
        let out = analyze_items(
            &generator,
            &StaticExemplars::default(),
            (0..2).map(qualified).collect(),
            Some(1),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].candidate().link, "https://news.example.com/1");
    }

    #[tokio::test]
    async fn total_provider_failure_fails_the_stage() {
        let generator = ScriptedGenerator::new(vec![
            Err(LlmError::Unauthorized("revoked".into())),
            Err(LlmError::Unauthorized("revoked".into())),
        ]);
        let err = analyze_items(
            &generator,
            &StaticExemplars::default(),
            (0..2).map(qualified).collect(),
            None,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::Stage { stage: "analysis", .. }));
    }

    #[tokio::test]
    async fn all_invalid_is_an_empty_success() {
        let generator = ScriptedGenerator::new(vec![Ok("{}".into()), Ok("{}".into())]);
        let out = analyze_items(
            &generator,
            &StaticExemplars::default(),
            (0..2).map(qualified).collect(),
            None,
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn stored_exemplars_win_over_built_ins() {
        let generator = ScriptedGenerator::new(vec![Ok(valid_analysis_json(5))]);
        let exemplars = StaticExemplars {
            examples: vec![PromptExample {
                title: "Curated story".into(),
                output: "{\"curated\":true}".into(),
            }],
            fail: false,
        };
        let mut item = qualified(0);
        item.enriched.scored.candidate.title = "Inflation falls again".into();

        analyze_items(&generator, &exemplars, vec![item], None, Duration::from_secs(5))
            .await
            .unwrap();

        let system = generator.requests()[0].system.clone();
        assert!(system.contains("Curated story"));
        assert!(!system.contains("Central bank holds"));
    }

    #[tokio::test]
    async fn exemplar_outage_falls_back_to_built_ins() {
        let generator = ScriptedGenerator::new(vec![Ok(valid_analysis_json(5))]);
        let exemplars = StaticExemplars {
            fail: true,
            ..StaticExemplars::default()
        };
        let mut item = qualified(0);
        item.enriched.scored.candidate.title = "Inflation falls again".into();

        let out = analyze_items(&generator, &exemplars, vec![item], None, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(out.len(), 1);
        let request = generator.requests()[0].clone();
        assert!(request.system.contains("Central bank holds"));
        assert_eq!(request.kind, CallKind::Analysis);
        assert_eq!(request.timeout, Some(Duration::from_secs(5)));
    }
}
