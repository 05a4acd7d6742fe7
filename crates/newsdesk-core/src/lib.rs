//! Shared domain types and configuration for the newsdesk workspace.
//!
//! Every pipeline stage wraps the previous stage's value in a new type
//! (`Candidate` → `ScoredCandidate` → `EnrichedCandidate` →
//! `QualifiedCandidate` → `AnalyzedItem`), so a value can only move forward.

pub mod app_config;
pub mod article;
pub mod category;
pub mod config;
pub mod feeds;
pub mod validate;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use article::{
    AnalyzedItem, ArticleAnalysis, Candidate, Category, EnrichedCandidate, ImpactDirection,
    QualifiedCandidate, Region, ScoredCandidate, Sentiment, StakeholderImpact,
};
pub use category::classify;
pub use config::{load_app_config, load_app_config_from_env};
pub use feeds::{load_feeds, FeedConfig, FeedsFile};
pub use validate::{Validate, ValidationError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read feeds file {path}: {source}")]
    FeedsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse feeds file: {0}")]
    FeedsFileParse(#[from] serde_yaml::Error),

    #[error("invalid feeds config: {0}")]
    Validation(String),
}
