//! Staged selection and enrichment of news candidates.
//!
//! `Candidate`s flow through deduplication, a title filter, lead-image
//! enrichment, a quality filter, and per-item analysis. [`Pipeline`] wires
//! the stages together; each stage is also usable on its own.

pub mod analyze;
pub mod batch;
pub mod config;
pub mod dedup;
pub mod enrich;
pub mod error;
pub mod metrics;
pub mod quality_filter;
pub mod recency;
pub mod runner;
pub mod store;
pub mod title_filter;

pub use analyze::{analyze_items, estimate_complexity, Complexity};
pub use config::PipelineConfig;
pub use dedup::deduplicate;
pub use enrich::enrich_images;
pub use error::PipelineError;
pub use metrics::{RunMetrics, StageMetrics};
pub use quality_filter::quality_filter;
pub use recency::recency_bonus;
pub use runner::{Pipeline, PipelineReport};
pub use store::{infer_category, ArticleStore, ExemplarSource, PromptExample};
pub use title_filter::title_filter;
