//! Orchestration of one selection-and-enrichment run.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use newsdesk_core::{AnalyzedItem, Candidate};
use newsdesk_llm::TextGenerator;
use newsdesk_scraper::{extract_domain, PageFetcher};

use crate::analyze::analyze_items;
use crate::config::PipelineConfig;
use crate::dedup::deduplicate;
use crate::enrich::enrich_images;
use crate::error::PipelineError;
use crate::metrics::RunMetrics;
use crate::quality_filter::quality_filter;
use crate::store::{ArticleStore, ExemplarSource};
use crate::title_filter::title_filter;

/// Result of a run. `items` are the analyzed items in final order, whether
/// or not they were saved.
#[derive(Debug)]
pub struct PipelineReport {
    pub items: Vec<AnalyzedItem>,
    pub saved_ids: Vec<i64>,
    pub metrics: RunMetrics,
}

/// The staged pipeline with its collaborators injected.
pub struct Pipeline {
    generator: Arc<dyn TextGenerator>,
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn ArticleStore>,
    exemplars: Arc<dyn ExemplarSource>,
    config: PipelineConfig,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn ArticleStore>,
        exemplars: Arc<dyn ExemplarSource>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            generator,
            fetcher,
            store,
            exemplars,
            config,
        }
    }

    /// Run every stage over `candidates`. With `dry_run` nothing is saved.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Stage`] when a whole stage fails. Item-level
    /// failures (a page that will not load, an invalid analysis, a row that
    /// will not insert) are logged and counted instead.
    pub async fn run(
        &self,
        candidates: Vec<Candidate>,
        dry_run: bool,
    ) -> Result<PipelineReport, PipelineError> {
        self.run_at(candidates, dry_run, Utc::now()).await
    }

    /// [`Pipeline::run`] with a fixed clock for recency ranking.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::run`].
    pub async fn run_at(
        &self,
        candidates: Vec<Candidate>,
        dry_run: bool,
        now: DateTime<Utc>,
    ) -> Result<PipelineReport, PipelineError> {
        let mut metrics = RunMetrics::default();
        let generator = self.generator.as_ref();

        let started = Instant::now();
        let input = candidates.len();
        let fresh = deduplicate(self.store.as_ref(), candidates).await;
        metrics.record("dedup", input, fresh.len(), started);

        let started = Instant::now();
        let input = fresh.len();
        let shortlisted = title_filter(generator, fresh, &self.config, now)
            .await
            .map_err(PipelineError::stage("title_filter"))?;
        metrics.record("title_filter", input, shortlisted.len(), started);

        let started = Instant::now();
        let input = shortlisted.len();
        let enriched = enrich_images(
            self.fetcher.as_ref(),
            shortlisted,
            self.config.image_concurrency,
        )
        .await;
        let with_image = enriched.iter().filter(|e| e.image_url.is_some()).count();
        metrics.record("image_enrichment", input, with_image, started);

        let started = Instant::now();
        let input = enriched.len();
        let qualified = quality_filter(generator, enriched, &self.config, now)
            .await
            .map_err(PipelineError::stage("quality_filter"))?;
        metrics.record("quality_filter", input, qualified.len(), started);

        let started = Instant::now();
        let input = qualified.len();
        let items = analyze_items(
            generator,
            self.exemplars.as_ref(),
            qualified,
            self.config.analysis_concurrency,
            self.config.llm_timeout,
        )
        .await?;
        metrics.record("analysis", input, items.len(), started);

        let saved_ids = if dry_run {
            tracing::info!(items = items.len(), "dry run: skipping save");
            Vec::new()
        } else {
            let started = Instant::now();
            let ids = self.save_all(&items, &mut metrics).await;
            metrics.record("save", items.len(), ids.len(), started);
            ids
        };

        Ok(PipelineReport {
            items,
            saved_ids,
            metrics,
        })
    }

    /// One insert per item; a failed insert is logged and the rest continue.
    async fn save_all(&self, items: &[AnalyzedItem], metrics: &mut RunMetrics) -> Vec<i64> {
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            match self.store.save_article(item).await {
                Ok(Some(id)) => {
                    metrics.saved += 1;
                    ids.push(id);
                }
                Ok(None) => {
                    metrics.duplicates += 1;
                    tracing::debug!(
                        domain = %extract_domain(&item.candidate().link),
                        "article already stored"
                    );
                }
                Err(e) => {
                    metrics.save_failures += 1;
                    tracing::warn!(
                        domain = %extract_domain(&item.candidate().link),
                        error = %e,
                        "failed to save article"
                    );
                }
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::{Duration as ChronoDuration, TimeZone};
    use newsdesk_llm::LlmError;

    use super::*;
    use crate::analyze::tests::{valid_analysis_json, StaticExemplars};
    use newsdesk_llm::testing::ScriptedGenerator;
    use crate::dedup::tests::MemoryStore;
    use crate::enrich::tests::FakeFetcher;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn candidate(i: usize) -> Candidate {
        Candidate {
            title: format!("Story {i}"),
            link: format!("https://news.example.com/{i}"),
            description: Some(format!("Details of story {i}")),
            published_at: Some(now() - ChronoDuration::hours(30)),
            source_name: Some("Wire".to_string()),
            region: None,
        }
    }

    fn batch_reply(n: usize, score_of: impl Fn(usize) -> usize) -> String {
        let articles: Vec<String> = (0..n)
            .map(|i| format!(r#"{{"index":{i},"score":{},"reason":"r"}}"#, score_of(i)))
            .collect();
        format!(r#"{{"articles":[{}]}}"#, articles.join(","))
    }

    /// Pages for the first `n` links carry an og:image.
    fn fetcher_with_images(links: impl Iterator<Item = usize>) -> FakeFetcher {
        let pages: HashMap<String, String> = links
            .map(|i| {
                (
                    format!("https://news.example.com/{i}"),
                    format!(r#"<meta property="og:image" content="/img/{i}.jpg">"#),
                )
            })
            .collect();
        FakeFetcher::with_pages(pages)
    }

    fn pipeline(
        replies: Vec<Result<String, LlmError>>,
        fetcher: FakeFetcher,
        store: Arc<MemoryStore>,
    ) -> (Pipeline, Arc<ScriptedGenerator>) {
        let generator = Arc::new(ScriptedGenerator::new(replies));
        let pipeline = Pipeline::new(
            generator.clone(),
            Arc::new(fetcher),
            store,
            Arc::new(StaticExemplars::default()),
            PipelineConfig {
                analysis_concurrency: Some(1),
                ..PipelineConfig::default()
            },
        );
        (pipeline, generator)
    }

    #[tokio::test]
    async fn fifty_candidates_become_twenty_analyzed_items() {
        // Title scores favor even-numbered stories; all 30 survivors have
        // images, so Stage 2 only scores the image group.
        let mut replies = vec![
            Ok(batch_reply(50, |i| if i % 2 == 0 { 80 } else { 20 + i % 7 })),
            Ok(batch_reply(30, |i| 90 - i)),
        ];
        replies.extend((0..20).map(|_| Ok(valid_analysis_json(6))));
        let store = Arc::new(MemoryStore::default());
        let (pipeline, generator) =
            pipeline(replies, fetcher_with_images(0..50), Arc::clone(&store));

        let report = pipeline
            .run_at((0..50).map(candidate).collect(), false, now())
            .await
            .unwrap();

        assert_eq!(report.metrics.stage("title_filter").unwrap().output, 30);
        assert_eq!(report.metrics.stage("quality_filter").unwrap().output, 20);
        assert_eq!(report.items.len(), 20);
        assert_eq!(report.saved_ids.len(), 20);
        assert_eq!(store.links.lock().unwrap().len(), 20);
        assert_eq!(generator.calls(), 22);
        assert!(report.items.iter().all(|i| i.qualified.has_valid_image));
    }

    #[tokio::test]
    async fn small_input_bypasses_title_scoring_but_still_caps() {
        let mut replies = vec![Ok(batch_reply(5, |i| 50 + i))];
        replies.extend((0..3).map(|_| Ok(valid_analysis_json(5))));
        let store = Arc::new(MemoryStore::default());
        let (pipeline, generator) = pipeline(replies, fetcher_with_images(0..5), store);
        let mut pipeline = pipeline;
        pipeline.config.quality_shortlist_size = 3;

        let report = pipeline
            .run_at((0..5).map(candidate).collect(), true, now())
            .await
            .unwrap();

        assert!(report
            .metrics
            .stage("title_filter")
            .is_some_and(|m| m.input == 5 && m.output == 5));
        assert_eq!(report.items.len(), 3);
        assert!(report
            .items
            .iter()
            .all(|i| i.qualified.enriched.scored.reason == "bypass"));
        // One quality batch plus three analyses; no title batch.
        assert_eq!(generator.calls(), 4);
        let kinds: Vec<_> = generator
            .requests()
            .iter()
            .map(|r| r.kind)
            .collect();
        assert!(!kinds.contains(&newsdesk_llm::CallKind::TitleScore));
        // Dry run saves nothing.
        assert!(report.saved_ids.is_empty());
        assert!(report.metrics.stage("save").is_none());
    }

    #[tokio::test]
    async fn known_links_and_failed_saves_do_not_abort() {
        let store = Arc::new(MemoryStore {
            links: Mutex::new(vec!["https://news.example.com/0".to_string()]),
            fail_saves_for: vec!["https://news.example.com/2".to_string()],
            ..MemoryStore::default()
        });
        let mut replies = vec![Ok(batch_reply(2, |_| 60))];
        replies.extend((0..2).map(|_| Ok(valid_analysis_json(5))));
        let (pipeline, _) = pipeline(replies, fetcher_with_images(0..3), Arc::clone(&store));

        let report = pipeline
            .run_at((0..3).map(candidate).collect(), false, now())
            .await
            .unwrap();

        assert_eq!(report.metrics.stage("dedup").unwrap().output, 2);
        assert_eq!(report.items.len(), 2);
        assert_eq!(report.metrics.saved, 1);
        assert_eq!(report.metrics.save_failures, 1);
        assert_eq!(report.saved_ids.len(), 1);
    }

    #[tokio::test]
    async fn fatal_title_error_fails_the_run() {
        let (pipeline, _) = pipeline(
            vec![Err(LlmError::QuotaExceeded("no credit".into()))],
            FakeFetcher::default(),
            Arc::new(MemoryStore::default()),
        );

        let err = pipeline
            .run_at((0..40).map(candidate).collect(), true, now())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Stage {
                stage: "title_filter",
                ..
            }
        ));
    }
}
