//! Stage 2: substance scoring with an image-first two-tier selection.

use chrono::{DateTime, Utc};
use newsdesk_core::{EnrichedCandidate, QualifiedCandidate};
use newsdesk_llm::{CallKind, LlmError, TextGenerator};

use crate::batch::score_in_batches;
use crate::config::PipelineConfig;
use crate::recency::rank_by_composite;

const SYSTEM_PROMPT: &str = "You are the copy chief choosing the final lineup. \
Score each article from 0 to 100 on: depth of reporting (facts, figures, \
named sources), trustworthiness of the outlet, whether it comes with a lead \
image, and relevance to a general audience. Opinion pieces and thin \
rewrites of press releases score low. \
Return a score and a one-sentence reason for every numbered article, using \
its number as `index`.";

/// Select up to `quality_shortlist_size` items, image-bearing ones first.
///
/// Items with and without an image are scored and ranked separately by
/// `quality_score + recency_bonus`. The output is filled from the image group
/// first and topped up from the no-image group only when the image group is
/// smaller than the target.
///
/// # Errors
///
/// Propagates fatal and retry-exhausted generation errors.
pub async fn quality_filter(
    generator: &dyn TextGenerator,
    items: Vec<EnrichedCandidate>,
    config: &PipelineConfig,
    now: DateTime<Utc>,
) -> Result<Vec<QualifiedCandidate>, LlmError> {
    let target = config.quality_shortlist_size;
    let (with_image, without_image): (Vec<_>, Vec<_>) =
        items.into_iter().partition(|e| e.image_url.is_some());

    tracing::debug!(
        with_image = with_image.len(),
        without_image = without_image.len(),
        target,
        "quality filter groups"
    );

    let mut selected = score_group(generator, with_image, true, config, now).await?;
    selected.truncate(target);

    let remaining = target - selected.len();
    if remaining > 0 {
        let mut fill = score_group(generator, without_image, false, config, now).await?;
        fill.truncate(remaining);
        selected.extend(fill);
    }

    Ok(selected)
}

async fn score_group(
    generator: &dyn TextGenerator,
    group: Vec<EnrichedCandidate>,
    has_image: bool,
    config: &PipelineConfig,
    now: DateTime<Utc>,
) -> Result<Vec<QualifiedCandidate>, LlmError> {
    if group.is_empty() {
        return Ok(Vec::new());
    }

    let lines: Vec<String> = group.iter().map(|e| quality_line(e, has_image)).collect();
    let scores = score_in_batches(
        generator,
        CallKind::QualityScore,
        SYSTEM_PROMPT,
        &lines,
        config.title_batch_size,
        config.llm_timeout,
    )
    .await?;

    let qualified: Vec<QualifiedCandidate> = group
        .into_iter()
        .zip(scores)
        .map(|(enriched, s)| QualifiedCandidate {
            enriched,
            quality_score: s.score,
            has_valid_image: has_image,
        })
        .collect();

    Ok(rank_by_composite(
        qualified,
        now,
        |q| q.quality_score,
        |q| q.candidate().published_at,
    ))
}

fn quality_line(item: &EnrichedCandidate, has_image: bool) -> String {
    let candidate = &item.scored.candidate;
    let mut line = candidate.title.clone();
    if let Some(source) = &candidate.source_name {
        line.push_str(&format!(" | source: {source}"));
    }
    line.push_str(if has_image { " | image: yes" } else { " | image: no" });
    if let Some(description) = &candidate.description {
        let snippet: String = description.chars().take(280).collect();
        line.push_str(&format!(" | {snippet}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use newsdesk_core::{Candidate, ScoredCandidate};

    use super::*;
    use newsdesk_llm::testing::ScriptedGenerator;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn enriched(i: usize, image: bool) -> EnrichedCandidate {
        EnrichedCandidate {
            scored: ScoredCandidate {
                candidate: Candidate {
                    title: format!("Story {i}"),
                    link: format!("https://news.example.com/{i}"),
                    description: Some("Details".to_string()),
                    published_at: None,
                    source_name: Some("Wire".to_string()),
                    region: None,
                },
                title_score: 60.0,
                reason: String::new(),
            },
            image_url: image.then(|| format!("https://img.example.com/{i}.jpg")),
        }
    }

    fn uniform(n: usize, score: u32) -> String {
        let articles: Vec<String> = (0..n)
            .map(|i| format!(r#"{{"index":{i},"score":{score},"reason":"r"}}"#))
            .collect();
        format!(r#"{{"articles":[{}]}}"#, articles.join(","))
    }

    fn config(target: usize) -> PipelineConfig {
        PipelineConfig {
            quality_shortlist_size: target,
            ..PipelineConfig::default()
        }
    }

    #[tokio::test]
    async fn enough_images_means_no_imageless_items() {
        // 25 with images, 5 without; the no-image group would outscore them.
        let items: Vec<EnrichedCandidate> = (0..30).map(|i| enriched(i, i < 25)).collect();
        let generator = ScriptedGenerator::new(vec![Ok(uniform(25, 40)), Ok(uniform(5, 99))]);

        let out = quality_filter(&generator, items, &config(20), now()).await.unwrap();

        assert_eq!(out.len(), 20);
        assert!(out.iter().all(|q| q.has_valid_image));
        assert_eq!(generator.calls(), 1, "no-image group is never needed");
    }

    #[tokio::test]
    async fn shortfall_is_topped_up_in_ranked_order() {
        let items: Vec<EnrichedCandidate> = (0..6).map(|i| enriched(i, i < 2)).collect();
        let generator = ScriptedGenerator::new(vec![
            Ok(uniform(2, 30)),
            Ok(r#"{"articles":[
                {"index":0,"score":10,"reason":"r"},
                {"index":1,"score":90,"reason":"r"},
                {"index":2,"score":50,"reason":"r"},
                {"index":3,"score":70,"reason":"r"}
            ]}"#
            .to_string()),
        ]);

        let out = quality_filter(&generator, items, &config(4), now()).await.unwrap();

        let links: Vec<&str> = out.iter().map(|q| q.candidate().link.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "https://news.example.com/0",
                "https://news.example.com/1",
                "https://news.example.com/3",
                "https://news.example.com/5",
            ]
        );
        assert!(out[0].has_valid_image && out[1].has_valid_image);
        assert!(!out[2].has_valid_image && !out[3].has_valid_image);
    }

    #[tokio::test]
    async fn all_imageless_still_ranked_and_capped() {
        let items: Vec<EnrichedCandidate> = (0..3).map(|i| enriched(i, false)).collect();
        let generator = ScriptedGenerator::new(vec![Ok(r#"{"articles":[
            {"index":0,"score":20,"reason":"r"},
            {"index":1,"score":80,"reason":"r"},
            {"index":2,"score":60,"reason":"r"}
        ]}"#
        .to_string())]);

        let out = quality_filter(&generator, items, &config(2), now()).await.unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].candidate().link, "https://news.example.com/1");
        assert_eq!(out[1].candidate().link, "https://news.example.com/2");
    }
}
