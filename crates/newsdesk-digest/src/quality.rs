//! Rubric grading of a rendered digest and the blended final score.

use std::time::Duration;

use newsdesk_core::validate::{in_range, ValidationError};
use newsdesk_core::Validate;
use newsdesk_llm::{generate_structured, CallKind, GenerationRequest, LlmError, TextGenerator};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::evidence::EvidenceReport;

/// Weight of the rubric score in the final blend; evidence gets the rest.
pub const QUALITY_WEIGHT: f32 = 0.6;
/// Weight of the validation rate inside the evidence score when relevance
/// scores exist.
pub const VALIDATION_RATE_WEIGHT: f32 = 0.6;

const SYSTEM_PROMPT: &str = "You review daily news digests before publication. \
Score the digest from 0 to 10 on each dimension:
- specificity: concrete names, numbers, and dates rather than generalities.
- evidence_basis: claims are backed by the cited articles.
- logical_consistency: no contradictions; conclusions follow from the facts.
- tone: neutral, measured, free of sensationalism.
- practicality: a reader knows what changed and what it means for them.
- completeness: the day's important stories are covered.
List the main strengths and the most useful improvements.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RubricScores {
    pub specificity: f32,
    pub evidence_basis: f32,
    pub logical_consistency: f32,
    pub tone: f32,
    pub practicality: f32,
    pub completeness: f32,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
}

impl RubricScores {
    fn dimensions(&self) -> [(&'static str, f32); 6] {
        [
            ("specificity", self.specificity),
            ("evidence_basis", self.evidence_basis),
            ("logical_consistency", self.logical_consistency),
            ("tone", self.tone),
            ("practicality", self.practicality),
            ("completeness", self.completeness),
        ]
    }
}

impl Validate for RubricScores {
    fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in self.dimensions() {
            in_range(field, value, 0.0, 10.0)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityVerdict {
    #[serde(flatten)]
    pub scores: RubricScores,
    /// Sum of the six dimensions scaled to 0 to 100.
    pub overall: f32,
}

impl QualityVerdict {
    #[must_use]
    pub fn from_scores(scores: RubricScores) -> Self {
        let sum: f32 = scores.dimensions().iter().map(|(_, v)| v).sum();
        Self {
            overall: sum / 60.0 * 100.0,
            scores,
        }
    }
}

/// Grade the rendered digest.
///
/// # Errors
///
/// Returns the generation error; callers treat any failure as "no verdict".
pub async fn evaluate_quality(
    generator: &dyn TextGenerator,
    markdown: &str,
    timeout: Duration,
) -> Result<QualityVerdict, LlmError> {
    let request = GenerationRequest::for_output::<RubricScores>(
        CallKind::QualityRubric,
        SYSTEM_PROMPT,
        markdown,
    )
    .with_timeout(timeout);
    let scores: RubricScores = generate_structured(generator, &request).await?;
    let verdict = QualityVerdict::from_scores(scores);
    tracing::info!(overall = verdict.overall, "digest graded");
    Ok(verdict)
}

/// Evidence score on a 0 to 100 scale: the validation rate alone, or blended
/// with average relevance when any relevance score exists.
#[must_use]
pub fn evidence_score(report: &EvidenceReport) -> f32 {
    match report.average_relevance {
        None => report.validation_rate,
        Some(relevance) => {
            VALIDATION_RATE_WEIGHT * report.validation_rate
                + (1.0 - VALIDATION_RATE_WEIGHT) * relevance * 10.0
        }
    }
}

#[must_use]
pub fn final_score(overall: f32, evidence: f32) -> f32 {
    QUALITY_WEIGHT * overall + (1.0 - QUALITY_WEIGHT) * evidence
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsdesk_llm::testing::ScriptedGenerator;

    fn report(validation_rate: f32, average_relevance: Option<f32>) -> EvidenceReport {
        EvidenceReport {
            total: 4,
            valid: 3,
            validation_rate,
            average_relevance,
            checks: Vec::new(),
        }
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn overall_scales_sum_to_hundred() {
        let verdict = QualityVerdict::from_scores(RubricScores {
            specificity: 8.0,
            evidence_basis: 7.0,
            logical_consistency: 9.0,
            tone: 10.0,
            practicality: 6.0,
            completeness: 5.0,
            strengths: vec![],
            improvements: vec![],
        });
        assert!(close(verdict.overall, 75.0));
    }

    #[test]
    fn evidence_score_without_relevance_is_the_rate() {
        assert!(close(evidence_score(&report(75.0, None)), 75.0));
    }

    #[test]
    fn evidence_score_blends_relevance() {
        // 0.6 * 75 + 0.4 * (6.5 * 10) = 45 + 26
        assert!(close(evidence_score(&report(75.0, Some(6.5))), 71.0));
    }

    #[test]
    fn final_blend() {
        assert!(close(final_score(80.0, 50.0), 68.0));
    }

    #[tokio::test]
    async fn evaluate_rejects_out_of_range_dimension() {
        let generator = ScriptedGenerator::new(vec![Ok(r#"{
            "specificity": 11, "evidence_basis": 5, "logical_consistency": 5,
            "tone": 5, "practicality": 5, "completeness": 5,
            "strengths": [], "improvements": []
        }"#
        .into())]);
        let err = evaluate_quality(&generator, "# Digest", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn evaluate_parses_verdict() {
        let generator = ScriptedGenerator::new(vec![Ok(r#"{
            "specificity": 6, "evidence_basis": 6, "logical_consistency": 6,
            "tone": 6, "practicality": 6, "completeness": 6,
            "strengths": ["clear"], "improvements": ["more numbers"]
        }"#
        .into())]);
        let verdict = evaluate_quality(&generator, "# Digest", Duration::from_secs(5))
            .await
            .unwrap();
        assert!(close(verdict.overall, 60.0));
        assert_eq!(verdict.scores.strengths, vec!["clear".to_string()]);
        let request = generator.requests()[0].clone();
        assert_eq!(request.kind, CallKind::QualityRubric);
        assert_eq!(request.user, "# Digest");
    }
}
