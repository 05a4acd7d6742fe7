use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub feeds_path: PathBuf,
    pub user_agent: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub llm_api_key: String,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_digest_model: String,
    pub llm_timeout_secs: u64,
    pub digest_timeout_secs: u64,
    pub llm_max_attempts: u32,
    pub llm_backoff_base_ms: u64,
    pub llm_backoff_max_ms: u64,
    pub title_shortlist_size: usize,
    pub title_batch_size: usize,
    pub quality_shortlist_size: usize,
    pub image_concurrency: usize,
    pub image_timeout_secs: u64,
    /// `None` means Stage 3 fans out over the whole shortlist at once.
    pub analysis_concurrency: Option<usize>,
    pub job_timeout_secs: u64,
    pub digest_max_articles: usize,
    pub evidence_semantic_check: bool,
    pub evidence_threshold: f32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("feeds_path", &self.feeds_path)
            .field("user_agent", &self.user_agent)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("llm_api_key", &"[redacted]")
            .field("llm_base_url", &self.llm_base_url)
            .field("llm_model", &self.llm_model)
            .field("llm_digest_model", &self.llm_digest_model)
            .field("llm_timeout_secs", &self.llm_timeout_secs)
            .field("digest_timeout_secs", &self.digest_timeout_secs)
            .field("llm_max_attempts", &self.llm_max_attempts)
            .field("llm_backoff_base_ms", &self.llm_backoff_base_ms)
            .field("llm_backoff_max_ms", &self.llm_backoff_max_ms)
            .field("title_shortlist_size", &self.title_shortlist_size)
            .field("title_batch_size", &self.title_batch_size)
            .field("quality_shortlist_size", &self.quality_shortlist_size)
            .field("image_concurrency", &self.image_concurrency)
            .field("image_timeout_secs", &self.image_timeout_secs)
            .field("analysis_concurrency", &self.analysis_concurrency)
            .field("job_timeout_secs", &self.job_timeout_secs)
            .field("digest_max_articles", &self.digest_max_articles)
            .field("evidence_semantic_check", &self.evidence_semantic_check)
            .field("evidence_threshold", &self.evidence_threshold)
            .finish()
    }
}
