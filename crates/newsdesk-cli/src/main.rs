mod digest;
mod pipeline;
mod tracking;

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use newsdesk_core::AppConfig;
use newsdesk_llm::{OpenAiClient, RetryPolicy};
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

/// Extra time after the job deadline for marking a tracked run as failed.
const BOOKKEEPING_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Parser)]
#[command(name = "newsdesk")]
#[command(about = "News selection, enrichment, and daily digest")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance.
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Staged selection and analysis of feed items.
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },
    /// Daily digest generation and display.
    Digest {
        #[command(subcommand)]
        command: DigestCommands,
    },
    /// Editor ratings that feed exemplar selection.
    Feedback {
        #[command(subcommand)]
        command: FeedbackCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
}

#[derive(Debug, Subcommand)]
enum PipelineCommands {
    /// Fetch, filter, enrich, analyze, and store.
    Run {
        /// Read candidates from a JSON array instead of the configured feeds.
        #[arg(long)]
        input: Option<PathBuf>,
        /// Run every stage but store nothing.
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Subcommand)]
enum DigestCommands {
    /// Synthesize, check, grade, and store the digest for a day.
    Generate {
        /// Report date (YYYY-MM-DD); defaults to today in UTC.
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Only check that cited ids exist.
        #[arg(long)]
        skip_semantic: bool,
    },
    /// Print a stored digest.
    Show {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Debug, Subcommand)]
enum FeedbackCommands {
    /// Record an editor rating (1-5).
    Rate {
        #[arg(long)]
        id: i64,
        #[arg(long, value_parser = clap::value_parser!(i16).range(1..=5))]
        rating: i16,
    },
    /// Rate an article and make it a few-shot exemplar.
    Exemplar {
        #[arg(long)]
        id: i64,
        #[arg(long, value_parser = clap::value_parser!(i16).range(1..=5))]
        rating: i16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("newsdesk: no command given, see --help");
        return Ok(());
    };

    let config = newsdesk_core::load_app_config()?;
    init_tracing(&config.log_level);

    let pool = newsdesk_db::connect_pool(
        &config.database_url,
        newsdesk_db::PoolConfig::from_app_config(&config),
    )
    .await?;

    let deadline = Instant::now() + Duration::from_secs(config.job_timeout_secs);
    let result = match tokio::time::timeout_at(
        deadline + BOOKKEEPING_GRACE,
        run_command(command, &pool, &config, deadline),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "job exceeded the {}s wall-clock limit",
            config.job_timeout_secs
        )),
    };

    pool.close().await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "command failed");
    }
    result
}

async fn run_command(
    command: Commands,
    pool: &sqlx::PgPool,
    config: &AppConfig,
    deadline: Instant,
) -> anyhow::Result<()> {
    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => {
                newsdesk_db::ping(pool).await?;
                println!("database ok");
            }
            DbCommands::Migrate => {
                let applied = newsdesk_db::run_migrations(pool).await?;
                println!("migrations applied ({applied} total)");
            }
        },
        Commands::Pipeline {
            command: PipelineCommands::Run { input, dry_run },
        } => pipeline::run_pipeline(pool, config, input.as_deref(), dry_run, deadline).await?,
        Commands::Digest { command } => match command {
            DigestCommands::Generate {
                date,
                skip_semantic,
            } => {
                let date = date.unwrap_or_else(today);
                digest::generate_digest(pool, config, date, skip_semantic, deadline).await?;
            }
            DigestCommands::Show { date } => {
                digest::show_digest(pool, date.unwrap_or_else(today)).await?;
            }
        },
        Commands::Feedback { command } => match command {
            FeedbackCommands::Rate { id, rating } => {
                newsdesk_db::rate_article(pool, id, rating).await?;
                println!("article {id} rated {rating}");
            }
            FeedbackCommands::Exemplar { id, rating } => {
                newsdesk_db::mark_as_exemplar(pool, id, rating).await?;
                println!("article {id} rated {rating} and marked as exemplar");
            }
        },
    }
    Ok(())
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Build a generation client for `model` with the configured retry policy.
pub(crate) fn build_generator(
    config: &AppConfig,
    model: &str,
    timeout_secs: u64,
) -> anyhow::Result<OpenAiClient> {
    let client = OpenAiClient::with_base_url(
        &config.llm_api_key,
        model,
        timeout_secs,
        &config.llm_base_url,
    )?
    .with_retry_policy(RetryPolicy {
        max_attempts: config.llm_max_attempts,
        base_delay: Duration::from_millis(config.llm_backoff_base_ms),
        max_delay: Duration::from_millis(config.llm_backoff_max_ms),
    });
    Ok(client)
}

#[cfg(test)]
mod tests;
