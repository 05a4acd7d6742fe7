use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::validate::{in_range, len_between, min_chars, Validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Domestic,
    International,
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Region::Domestic => write!(f, "domestic"),
            Region::International => write!(f, "international"),
        }
    }
}

/// A raw item as fetched from a feed. Identity is `link`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub region: Option<Region>,
}

/// Stage 1 output.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    /// Title relevance in `[0, 100]`.
    pub title_score: f32,
    pub reason: String,
}

/// Output of image enrichment. `image_url = None` is a valid terminal state.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedCandidate {
    pub scored: ScoredCandidate,
    pub image_url: Option<String>,
}

/// Stage 2 output.
#[derive(Debug, Clone, PartialEq)]
pub struct QualifiedCandidate {
    pub enriched: EnrichedCandidate,
    /// Content quality in `[0, 100]`.
    pub quality_score: f32,
    pub has_valid_image: bool,
}

/// Stage 3 output. Only built from an analysis that passed [`Validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedItem {
    pub qualified: QualifiedCandidate,
    pub analysis: ArticleAnalysis,
}

impl ScoredCandidate {
    #[must_use]
    pub fn candidate(&self) -> &Candidate {
        &self.candidate
    }
}

impl EnrichedCandidate {
    #[must_use]
    pub fn candidate(&self) -> &Candidate {
        &self.scored.candidate
    }
}

impl QualifiedCandidate {
    #[must_use]
    pub fn candidate(&self) -> &Candidate {
        self.enriched.candidate()
    }

    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        self.enriched.image_url.as_deref()
    }
}

impl AnalyzedItem {
    #[must_use]
    pub fn candidate(&self) -> &Candidate {
        self.qualified.candidate()
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Politics,
    Economy,
    Business,
    Technology,
    Science,
    Health,
    Environment,
    International,
    Society,
    Sports,
    Culture,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Politics,
        Category::Economy,
        Category::Business,
        Category::Technology,
        Category::Science,
        Category::Health,
        Category::Environment,
        Category::International,
        Category::Society,
        Category::Sports,
        Category::Culture,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Politics => "politics",
            Category::Economy => "economy",
            Category::Business => "business",
            Category::Technology => "technology",
            Category::Science => "science",
            Category::Health => "health",
            Category::Environment => "environment",
            Category::International => "international",
            Category::Society => "society",
            Category::Sports => "sports",
            Category::Culture => "culture",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "positive"),
            Sentiment::Neutral => write!(f, "neutral"),
            Sentiment::Negative => write!(f, "negative"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImpactDirection {
    Positive,
    Negative,
    Mixed,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StakeholderImpact {
    /// Who is affected (e.g. "households", "exporters").
    pub stakeholder: String,
    /// How they are affected, in one or two sentences.
    pub impact: String,
    pub direction: ImpactDirection,
}

/// Structured analysis of one article, as returned by the generation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ArticleAnalysis {
    pub summary: String,
    pub stakeholder_impacts: Vec<StakeholderImpact>,
    /// Context a reader needs to understand why this matters now.
    pub background: String,
    pub keywords: Vec<String>,
    pub category: Category,
    pub sentiment: Sentiment,
    /// Confidence in `sentiment`, in `[0, 1]`.
    pub sentiment_confidence: f32,
    /// Editorial importance, 1 (trivial) to 10 (front page).
    pub importance: u8,
}

pub const SUMMARY_MIN_CHARS: usize = 40;
pub const BACKGROUND_MIN_CHARS: usize = 20;
pub const MAX_STAKEHOLDERS: usize = 6;
pub const MAX_KEYWORDS: usize = 10;

impl Validate for ArticleAnalysis {
    fn validate(&self) -> Result<(), ValidationError> {
        min_chars("summary", &self.summary, SUMMARY_MIN_CHARS)?;
        min_chars("background", &self.background, BACKGROUND_MIN_CHARS)?;
        len_between(
            "stakeholder_impacts",
            self.stakeholder_impacts.len(),
            1,
            MAX_STAKEHOLDERS,
        )?;
        for (i, s) in self.stakeholder_impacts.iter().enumerate() {
            min_chars(&format!("stakeholder_impacts[{i}].stakeholder"), &s.stakeholder, 1)?;
            min_chars(&format!("stakeholder_impacts[{i}].impact"), &s.impact, 1)?;
        }
        len_between("keywords", self.keywords.len(), 1, MAX_KEYWORDS)?;
        if self.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ValidationError::new("keywords", "empty keyword"));
        }
        in_range("sentiment_confidence", self.sentiment_confidence, 0.0, 1.0)?;
        if !(1..=10).contains(&self.importance) {
            return Err(ValidationError::new(
                "importance",
                format!("expected 1..=10, got {}", self.importance),
            ));
        }
        Ok(())
    }
}
