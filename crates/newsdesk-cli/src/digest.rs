//! `digest generate` and `digest show`.

use std::sync::Arc;

use chrono::NaiveDate;
use newsdesk_core::AppConfig;
use newsdesk_db::RunType;
use newsdesk_digest::{DigestConfig, DigestError, DigestGenerator, DigestOutcome};
use tokio::time::Instant;

use crate::build_generator;
use crate::tracking::run_tracked;

const RUN_TYPE: RunType = RunType::Digest;

pub(crate) async fn generate_digest(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    date: NaiveDate,
    skip_semantic: bool,
    deadline: Instant,
) -> anyhow::Result<()> {
    let writer = build_generator(config, &config.llm_digest_model, config.digest_timeout_secs)?;
    let reviewer = build_generator(config, &config.llm_model, config.llm_timeout_secs)?;
    let mut digest_config = DigestConfig::from_app_config(config);
    if skip_semantic {
        digest_config.evidence.semantic_check = false;
    }
    let generator = DigestGenerator::new(
        Arc::new(writer),
        Arc::new(reviewer),
        Arc::new(pool.clone()),
        digest_config,
    );

    let outcome = run_tracked(
        pool,
        RUN_TYPE,
        deadline,
        generator.generate(date),
        |outcome: &DigestOutcome| {
            let metrics = serde_json::json!({
                "date": outcome.digest.date,
                "evidence_total": outcome.evidence.total,
                "evidence_valid": outcome.evidence.valid,
                "validation_rate": outcome.evidence.validation_rate,
                "evidence_score": outcome.evidence_score,
                "quality_score": outcome.verdict.as_ref().map(|v| v.overall),
                "final_score": outcome.final_score,
            });
            let articles = i32::try_from(outcome.article_count).unwrap_or(i32::MAX);
            (articles, metrics)
        },
    )
    .await
    .map_err(|e| {
        if matches!(e.downcast_ref::<DigestError>(), Some(DigestError::NoArticles(_))) {
            e.context("run the pipeline first")
        } else {
            e
        }
    })?;

    println!("{}", outcome.markdown);
    print_scores(
        outcome.evidence.validation_rate,
        outcome.verdict.as_ref().map(|v| v.overall),
        outcome.final_score,
    );
    Ok(())
}

pub(crate) async fn show_digest(pool: &sqlx::PgPool, date: NaiveDate) -> anyhow::Result<()> {
    let Some(row) = newsdesk_db::get_digest_by_date(pool, date).await? else {
        anyhow::bail!("no digest stored for {date}");
    };
    println!("{}", row.markdown);
    print_scores(row.validation_rate, row.quality_score, row.final_score);
    Ok(())
}

fn print_scores(validation_rate: f32, quality: Option<f32>, final_score: Option<f32>) {
    let fmt = |v: Option<f32>| v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.1}"));
    println!(
        "evidence validation: {validation_rate:.1}% | quality: {} | final: {}",
        fmt(quality),
        fmt(final_score)
    );
}
