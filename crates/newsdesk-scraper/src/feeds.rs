//! RSS/Atom ingestion into [`Candidate`] values.

use std::sync::LazyLock;

use futures::stream::{self, StreamExt};
use newsdesk_core::{Candidate, FeedConfig};
use regex::Regex;
use reqwest::Client;

use crate::url::absolutize_url;
use crate::ScraperError;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Feeds downloaded concurrently.
const FEED_CONCURRENCY: usize = 4;

/// Download and parse every feed, concatenating their candidates.
///
/// A feed that fails to download or parse is logged and skipped; the
/// remaining feeds still contribute. Output preserves feed order.
pub async fn fetch_feed_candidates(client: &Client, feeds: &[FeedConfig]) -> Vec<Candidate> {
    let results: Vec<(usize, Result<Vec<Candidate>, ScraperError>)> =
        stream::iter(feeds.iter().enumerate())
            .map(|(idx, feed)| async move { (idx, fetch_feed(client, feed).await) })
            .buffer_unordered(FEED_CONCURRENCY)
            .collect()
            .await;

    let mut ordered: Vec<Option<Vec<Candidate>>> = vec![None; feeds.len()];
    for (idx, result) in results {
        match result {
            Ok(candidates) => {
                tracing::info!(
                    feed = %feeds[idx].name,
                    entries = candidates.len(),
                    "feed fetched"
                );
                ordered[idx] = Some(candidates);
            }
            Err(e) => {
                tracing::warn!(feed = %feeds[idx].name, error = %e, "feed skipped");
            }
        }
    }
    ordered.into_iter().flatten().flatten().collect()
}

/// Download and parse a single feed.
///
/// # Errors
///
/// Returns [`ScraperError`] on network failure, non-2xx status, or a body
/// that is not a parseable RSS/Atom document.
pub async fn fetch_feed(client: &Client, feed: &FeedConfig) -> Result<Vec<Candidate>, ScraperError> {
    let response = client.get(&feed.url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ScraperError::UnexpectedStatus {
            status: status.as_u16(),
            url: feed.url.clone(),
        });
    }
    let body = response.bytes().await?;
    parse_feed(feed, &body)
}

/// Map a raw RSS/Atom document to candidates.
///
/// Entries without a title or a link are dropped. Relative links are
/// resolved against the feed URL.
///
/// # Errors
///
/// Returns [`ScraperError::FeedParse`] if `feed-rs` rejects the document.
pub fn parse_feed(feed: &FeedConfig, body: &[u8]) -> Result<Vec<Candidate>, ScraperError> {
    let parsed = feed_rs::parser::parse(body).map_err(|e| ScraperError::FeedParse {
        feed: feed.name.clone(),
        reason: e.to_string(),
    })?;

    let candidates = parsed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let title = entry
                .title
                .map(|t| clean_text(&t.content))
                .filter(|t| !t.is_empty())?;
            let link = entry
                .links
                .iter()
                .find_map(|l| absolutize_url(&feed.url, &l.href))?;
            let description = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .map(|raw| clean_text(&raw))
                .filter(|d| !d.is_empty());

            Some(Candidate {
                title,
                link,
                description,
                published_at: entry.published.or(entry.updated),
                source_name: Some(feed.name.clone()),
                region: feed.region,
            })
        })
        .collect();

    Ok(candidates)
}

/// Strip markup, decode the common entities, and collapse whitespace.
fn clean_text(raw: &str) -> String {
    let without_tags = TAG_RE.replace_all(raw, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    WS_RE.replace_all(decoded.trim(), " ").into_owned()
}
