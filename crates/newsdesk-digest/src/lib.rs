//! Daily digest: synthesis from the day's analyzed articles, evidence
//! checking against that corpus, and rubric grading.

pub mod error;
pub mod evidence;
pub mod quality;
pub mod render;
pub mod runner;
pub mod synthesize;
pub mod types;

pub use error::DigestError;
pub use evidence::{validate_evidence, EvidenceCheck, EvidenceConfig, EvidenceReport};
pub use quality::{evaluate_quality, evidence_score, final_score, QualityVerdict, RubricScores};
pub use render::render_markdown;
pub use runner::{DigestConfig, DigestGenerator, DigestOutcome, DigestRepository};
pub use synthesize::{select_corpus, synthesize_digest};
pub use types::{
    ArticleRef, CorpusArticle, DailyDigest, EvidenceItem, Insight, Section, SentimentTally,
};
