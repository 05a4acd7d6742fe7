//! Stage 1: coarse newsworthiness scoring on titles only.

use chrono::{DateTime, Utc};
use newsdesk_core::{Candidate, ScoredCandidate};
use newsdesk_llm::{CallKind, LlmError, TextGenerator};

use crate::batch::score_in_batches;
use crate::config::PipelineConfig;
use crate::recency::rank_by_composite;

pub const BYPASS_SCORE: f32 = 100.0;
pub const BYPASS_REASON: &str = "bypass";

const SYSTEM_PROMPT: &str = "You are the intake editor of a general news desk. \
Judge each headline only on newsworthiness for a broad national audience: \
public impact, novelty, and consequence. Penalize clickbait, listicles, \
celebrity gossip, and promotional copy. \
Return a score from 0 to 100 and a one-sentence reason for every numbered \
article, using its number as `index`.";

/// Reduce `candidates` to at most `title_shortlist_size` items.
///
/// When there are no more candidates than the shortlist size, nothing is
/// scored: every candidate passes in input order with [`BYPASS_SCORE`].
/// Otherwise titles are scored in sequential batches and the top items by
/// `title_score + recency_bonus` are kept.
///
/// # Errors
///
/// Propagates fatal and retry-exhausted generation errors. Invalid batch
/// responses degrade to neutral scores instead.
pub async fn title_filter(
    generator: &dyn TextGenerator,
    candidates: Vec<Candidate>,
    config: &PipelineConfig,
    now: DateTime<Utc>,
) -> Result<Vec<ScoredCandidate>, LlmError> {
    let shortlist = config.title_shortlist_size;
    if candidates.len() <= shortlist {
        tracing::info!(
            input = candidates.len(),
            shortlist,
            "title filter bypassed: input already within shortlist"
        );
        return Ok(candidates
            .into_iter()
            .map(|candidate| ScoredCandidate {
                candidate,
                title_score: BYPASS_SCORE,
                reason: BYPASS_REASON.to_string(),
            })
            .collect());
    }

    let lines: Vec<String> = candidates.iter().map(title_line).collect();
    let scores = score_in_batches(
        generator,
        CallKind::TitleScore,
        SYSTEM_PROMPT,
        &lines,
        config.title_batch_size,
        config.llm_timeout,
    )
    .await?;

    let scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .zip(scores)
        .map(|(candidate, s)| ScoredCandidate {
            candidate,
            title_score: s.score,
            reason: s.reason,
        })
        .collect();

    let mut ranked = rank_by_composite(
        scored,
        now,
        |s| s.title_score,
        |s| s.candidate.published_at,
    );
    ranked.truncate(shortlist);
    Ok(ranked)
}

fn title_line(candidate: &Candidate) -> String {
    match &candidate.source_name {
        Some(source) => format!("{} ({source})", candidate.title),
        None => candidate.title.clone(),
    }
}
