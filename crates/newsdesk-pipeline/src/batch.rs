//! Batched scoring calls shared by the title and quality filters.
//!
//! Each batch is one generation call answering
//! `{articles: [{index, score, reason}]}` for the items listed in the prompt.
//! A batch whose response is unusable gives every item the neutral score so
//! it still competes in ranking; items the response skips get it too.

use std::time::Duration;

use newsdesk_core::validate::{in_range, ValidationError};
use newsdesk_core::Validate;
use newsdesk_llm::{generate_structured, CallKind, GenerationRequest, LlmError, TextGenerator};
use schemars::JsonSchema;
use serde::Deserialize;

pub const NEUTRAL_SCORE: f32 = 50.0;
pub const NEUTRAL_REASON: &str = "default";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BatchScores {
    pub articles: Vec<BatchScore>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BatchScore {
    /// Zero-based position of the item in the prompt list.
    pub index: u32,
    /// 0 to 100.
    pub score: f32,
    pub reason: String,
}

impl Validate for BatchScores {
    fn validate(&self) -> Result<(), ValidationError> {
        for (i, entry) in self.articles.iter().enumerate() {
            in_range(&format!("articles[{i}].score"), entry.score, 0.0, 100.0)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemScore {
    pub score: f32,
    pub reason: String,
}

impl ItemScore {
    fn neutral() -> Self {
        Self {
            score: NEUTRAL_SCORE,
            reason: NEUTRAL_REASON.to_string(),
        }
    }
}

/// Score `lines` in sequential batches of `batch_size`.
///
/// Returns exactly one score per input line, in input order.
///
/// # Errors
///
/// Returns the [`LlmError`] of the first batch that fails with a
/// non-validation error (fatal, or retries exhausted).
pub async fn score_in_batches(
    generator: &dyn TextGenerator,
    kind: CallKind,
    system: &str,
    lines: &[String],
    batch_size: usize,
    timeout: Duration,
) -> Result<Vec<ItemScore>, LlmError> {
    let mut scores = Vec::with_capacity(lines.len());

    for (batch_no, batch) in lines.chunks(batch_size.max(1)).enumerate() {
        let user = render_batch(batch);
        let request = GenerationRequest::for_output::<BatchScores>(kind, system, user)
            .with_timeout(timeout);

        match generate_structured::<BatchScores>(generator, &request).await {
            Ok(response) => scores.extend(align(batch.len(), response, kind, batch_no)),
            Err(e) if e.is_validation() => {
                tracing::warn!(
                    kind = %kind,
                    batch = batch_no,
                    items = batch.len(),
                    error = %e,
                    "batch response invalid; assigning neutral scores"
                );
                scores.extend(std::iter::repeat_with(ItemScore::neutral).take(batch.len()));
            }
            Err(e) => return Err(e),
        }
    }

    Ok(scores)
}

fn render_batch(batch: &[String]) -> String {
    let mut out = String::from("Score each numbered article.\n\n");
    for (i, line) in batch.iter().enumerate() {
        out.push_str(&format!("[{i}] {line}\n"));
    }
    out
}

/// Map a response onto batch positions. Out-of-range and repeated indices
/// are ignored; missing ones get the neutral score.
fn align(len: usize, response: BatchScores, kind: CallKind, batch_no: usize) -> Vec<ItemScore> {
    let mut slots: Vec<Option<ItemScore>> = vec![None; len];
    for entry in response.articles {
        let Ok(idx) = usize::try_from(entry.index) else {
            continue;
        };
        if let Some(slot) = slots.get_mut(idx) {
            if slot.is_none() {
                *slot = Some(ItemScore {
                    score: entry.score,
                    reason: entry.reason,
                });
            }
        }
    }

    let missing = slots.iter().filter(|s| s.is_none()).count();
    if missing > 0 {
        tracing::warn!(
            kind = %kind,
            batch = batch_no,
            missing,
            "batch response skipped items; assigning neutral scores"
        );
    }
    slots
        .into_iter()
        .map(|s| s.unwrap_or_else(ItemScore::neutral))
        .collect()
}

#[cfg(test)]
mod tests {
    use newsdesk_llm::testing::ScriptedGenerator;

    use super::*;

    fn lines(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("headline {i}")).collect()
    }

    #[tokio::test]
    async fn splits_into_sequential_batches() {
        let generator = ScriptedGenerator::new(vec![
            Ok(r#"{"articles":[{"index":0,"score":10,"reason":"a"},{"index":1,"score":20,"reason":"b"}]}"#.into()),
            Ok(r#"{"articles":[{"index":0,"score":30,"reason":"c"}]}"#.into()),
        ]);
        let scores = score_in_batches(
            &generator,
            CallKind::TitleScore,
            "sys",
            &lines(3),
            2,
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert_eq!(generator.calls(), 2);
        let values: Vec<f32> = scores.iter().map(|s| s.score).collect();
        assert_eq!(values, vec![10.0, 20.0, 30.0]);
        let second_prompt = generator.requests()[1].user.clone();
        assert!(second_prompt.contains("[0] headline 2"));
    }

    #[tokio::test]
    async fn invalid_batch_gets_neutral_scores() {
        let generator = ScriptedGenerator::new(vec![
            Ok(r#"{"articles":[{"index":0,"score":250,"reason":"too high"}]}"#.into()),
            Ok(r#"{"articles":[{"index":0,"score":90,"reason":"ok"}]}"#.into()),
        ]);
        let scores = score_in_batches(
            &generator,
            CallKind::TitleScore,
            "sys",
            &lines(3),
            2,
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert_eq!(scores[0], ItemScore::neutral());
        assert_eq!(scores[1], ItemScore::neutral());
        assert!((scores[2].score - 90.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn missing_and_duplicate_indices() {
        let generator = ScriptedGenerator::new(vec![Ok(r#"{"articles":[
                {"index":2,"score":70,"reason":"first"},
                {"index":2,"score":5,"reason":"dup"},
                {"index":9,"score":99,"reason":"out of range"}
            ]}"#
        .into())]);
        let scores = score_in_batches(
            &generator,
            CallKind::QualityScore,
            "sys",
            &lines(3),
            10,
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert_eq!(scores.len(), 3);
        assert_eq!(scores[0].reason, NEUTRAL_REASON);
        assert_eq!(scores[1].reason, NEUTRAL_REASON);
        assert_eq!(scores[2].reason, "first");
    }

    #[tokio::test]
    async fn fatal_error_fails_the_call() {
        let generator = ScriptedGenerator::new(vec![Err(LlmError::Unauthorized("bad".into()))]);
        let err = score_in_batches(
            &generator,
            CallKind::TitleScore,
            "sys",
            &lines(3),
            10,
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LlmError::Unauthorized(_)));
    }
}
