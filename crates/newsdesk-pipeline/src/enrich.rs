//! Best-effort lead-image discovery for shortlisted candidates.

use futures::stream::{self, StreamExt};
use newsdesk_core::{EnrichedCandidate, ScoredCandidate};
use newsdesk_scraper::{extract_article_image, extract_domain, PageFetcher};

/// Look up a lead image for every item with at most `concurrency` page
/// fetches in flight.
///
/// Any failure (timeout, non-2xx, no image) leaves `image_url` empty for that
/// item only. Output order matches input order.
pub async fn enrich_images(
    fetcher: &dyn PageFetcher,
    items: Vec<ScoredCandidate>,
    concurrency: usize,
) -> Vec<EnrichedCandidate> {
    let mut results: Vec<(usize, Option<String>)> = stream::iter(items.iter().enumerate())
        .map(|(idx, item)| async move { (idx, find_image(fetcher, &item.candidate.link).await) })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;
    results.sort_by_key(|(idx, _)| *idx);

    items
        .into_iter()
        .zip(results)
        .map(|(scored, (_, image_url))| EnrichedCandidate { scored, image_url })
        .collect()
}

async fn find_image(fetcher: &dyn PageFetcher, link: &str) -> Option<String> {
    let html = match fetcher.fetch_page(link).await {
        Ok(html) => html,
        Err(e) => {
            tracing::debug!(domain = %extract_domain(link), error = %e, "page fetch failed");
            return None;
        }
    };
    let image = extract_article_image(link, &html);
    if image.is_none() {
        tracing::debug!(domain = %extract_domain(link), "no image found on page");
    }
    image
}
