//! `pipeline run`: collect candidates and push them through every stage.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use newsdesk_core::{AppConfig, Candidate};
use newsdesk_db::RunType;
use newsdesk_pipeline::{Pipeline, PipelineConfig, PipelineReport};
use newsdesk_scraper::{build_http_client, fetch_feed_candidates, HttpPageFetcher};
use tokio::time::Instant;

use crate::build_generator;
use crate::tracking::run_tracked;

const RUN_TYPE: RunType = RunType::Pipeline;

pub(crate) async fn run_pipeline(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    input: Option<&Path>,
    dry_run: bool,
    deadline: Instant,
) -> anyhow::Result<()> {
    let candidates = match input {
        Some(path) => load_candidates(path)?,
        None => collect_from_feeds(config).await?,
    };
    tracing::info!(candidates = candidates.len(), dry_run, "pipeline starting");

    let generator = build_generator(config, &config.llm_model, config.llm_timeout_secs)?;
    let fetcher = HttpPageFetcher::with_timeout(config.image_timeout_secs, &config.user_agent)
        .context("failed to build page fetcher")?;
    let pipeline = Pipeline::new(
        Arc::new(generator),
        Arc::new(fetcher),
        Arc::new(pool.clone()),
        Arc::new(pool.clone()),
        PipelineConfig::from_app_config(config),
    );

    if dry_run {
        let report = tokio::time::timeout_at(deadline, pipeline.run(candidates, true))
            .await
            .context("pipeline dry run timed out")??;
        print_report(&report, true);
        return Ok(());
    }

    let report = run_tracked(
        pool,
        RUN_TYPE,
        deadline,
        pipeline.run(candidates, false),
        |report: &PipelineReport| {
            let saved = i32::try_from(report.saved_ids.len()).unwrap_or(i32::MAX);
            (saved, report.metrics.to_json())
        },
    )
    .await?;

    print_report(&report, false);
    Ok(())
}

fn load_candidates(path: &Path) -> anyhow::Result<Vec<Candidate>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON candidate list", path.display()))
}

async fn collect_from_feeds(config: &AppConfig) -> anyhow::Result<Vec<Candidate>> {
    let feeds = newsdesk_core::load_feeds(&config.feeds_path)?;
    let enabled: Vec<_> = feeds.enabled().cloned().collect();
    if enabled.is_empty() {
        anyhow::bail!("no enabled feeds in {}", config.feeds_path.display());
    }
    let client = build_http_client(config.image_timeout_secs, &config.user_agent)
        .context("failed to build feed client")?;
    Ok(fetch_feed_candidates(&client, &enabled).await)
}

fn print_report(report: &PipelineReport, dry_run: bool) {
    for stage in &report.metrics.stages {
        println!(
            "{:<18} {:>4} -> {:<4} ({:>5.1}%) {:>7} ms",
            stage.stage, stage.input, stage.output, stage.pass_rate, stage.elapsed_ms
        );
    }
    if dry_run {
        println!("dry-run: {} items analyzed, nothing saved", report.items.len());
        for item in &report.items {
            println!(
                "  [{}] {} ({})",
                item.analysis.importance,
                item.candidate().title,
                item.analysis.category
            );
        }
    } else {
        println!(
            "saved {} (duplicates {}, failures {})",
            report.metrics.saved, report.metrics.duplicates, report.metrics.save_failures
        );
    }
}
