use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Parse `var` with `T::from_str`, falling back to `default` when unset.
fn parse_or<T, F>(lookup: &F, var: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let raw = lookup(var).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a `HashMap`.
#[allow(clippy::too_many_lines)]
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let database_url = require("DATABASE_URL")?;
    let llm_api_key = require("NEWSDESK_LLM_API_KEY")?;

    let env = parse_environment(&or_default("NEWSDESK_ENV", "development"));
    let log_level = or_default("NEWSDESK_LOG_LEVEL", "info");
    let feeds_path = PathBuf::from(or_default("NEWSDESK_FEEDS_PATH", "./config/feeds.yaml"));
    let user_agent = or_default("NEWSDESK_USER_AGENT", "newsdesk/0.1 (news-curation)");

    let db_max_connections = parse_or(&lookup, "NEWSDESK_DB_MAX_CONNECTIONS", "5")?;
    let db_min_connections = parse_or(&lookup, "NEWSDESK_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_or(&lookup, "NEWSDESK_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let llm_base_url = or_default("NEWSDESK_LLM_BASE_URL", "https://api.openai.com/v1");
    let llm_model = or_default("NEWSDESK_LLM_MODEL", "gpt-4o-mini");
    let llm_digest_model = or_default("NEWSDESK_LLM_DIGEST_MODEL", "gpt-4o");
    let llm_timeout_secs = parse_or(&lookup, "NEWSDESK_LLM_TIMEOUT_SECS", "60")?;
    let digest_timeout_secs = parse_or(&lookup, "NEWSDESK_DIGEST_TIMEOUT_SECS", "180")?;
    let llm_max_attempts: u32 = parse_or(&lookup, "NEWSDESK_LLM_MAX_ATTEMPTS", "3")?;
    if llm_max_attempts == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "NEWSDESK_LLM_MAX_ATTEMPTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let llm_backoff_base_ms = parse_or(&lookup, "NEWSDESK_LLM_BACKOFF_BASE_MS", "1000")?;
    let llm_backoff_max_ms = parse_or(&lookup, "NEWSDESK_LLM_BACKOFF_MAX_MS", "30000")?;

    let title_shortlist_size = parse_or(&lookup, "NEWSDESK_TITLE_SHORTLIST_SIZE", "30")?;
    let title_batch_size: usize = parse_or(&lookup, "NEWSDESK_TITLE_BATCH_SIZE", "50")?;
    if title_batch_size == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "NEWSDESK_TITLE_BATCH_SIZE".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let quality_shortlist_size = parse_or(&lookup, "NEWSDESK_QUALITY_SHORTLIST_SIZE", "20")?;
    let image_concurrency = parse_or(&lookup, "NEWSDESK_IMAGE_CONCURRENCY", "5")?;
    let image_timeout_secs = parse_or(&lookup, "NEWSDESK_IMAGE_TIMEOUT_SECS", "10")?;

    let analysis_concurrency = match lookup("NEWSDESK_ANALYSIS_CONCURRENCY") {
        Ok(raw) if !raw.trim().is_empty() => {
            Some(parse_or(&lookup, "NEWSDESK_ANALYSIS_CONCURRENCY", "")?)
        }
        _ => None,
    };

    let job_timeout_secs = parse_or(&lookup, "NEWSDESK_JOB_TIMEOUT_SECS", "900")?;
    let digest_max_articles = parse_or(&lookup, "NEWSDESK_DIGEST_MAX_ARTICLES", "30")?;
    let evidence_semantic_check = parse_or(&lookup, "NEWSDESK_EVIDENCE_SEMANTIC_CHECK", "true")?;
    let evidence_threshold = parse_or(&lookup, "NEWSDESK_EVIDENCE_THRESHOLD", "5")?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        feeds_path,
        user_agent,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        llm_api_key,
        llm_base_url,
        llm_model,
        llm_digest_model,
        llm_timeout_secs,
        digest_timeout_secs,
        llm_max_attempts,
        llm_backoff_base_ms,
        llm_backoff_max_ms,
        title_shortlist_size,
        title_batch_size,
        quality_shortlist_size,
        image_concurrency,
        image_timeout_secs,
        analysis_concurrency,
        job_timeout_secs,
        digest_max_articles,
        evidence_semantic_check,
        evidence_threshold,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
