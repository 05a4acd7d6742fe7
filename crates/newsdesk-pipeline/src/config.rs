use std::time::Duration;

use newsdesk_core::AppConfig;

/// Tunables for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Stage 1 target size; inputs at or below this bypass title scoring.
    pub title_shortlist_size: usize,
    pub title_batch_size: usize,
    /// Stage 2 target size.
    pub quality_shortlist_size: usize,
    pub image_concurrency: usize,
    /// Stage 3 worker count. `None` runs every item at once.
    pub analysis_concurrency: Option<usize>,
    pub llm_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            title_shortlist_size: 30,
            title_batch_size: 50,
            quality_shortlist_size: 20,
            image_concurrency: 5,
            analysis_concurrency: None,
            llm_timeout: Duration::from_secs(60),
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            title_shortlist_size: config.title_shortlist_size,
            title_batch_size: config.title_batch_size.max(1),
            quality_shortlist_size: config.quality_shortlist_size,
            image_concurrency: config.image_concurrency.max(1),
            analysis_concurrency: config.analysis_concurrency,
            llm_timeout: Duration::from_secs(config.llm_timeout_secs),
        }
    }
}
