//! Web collaborators: feed ingestion, page fetching, and lead-image
//! discovery for article pages.

pub mod error;
pub mod feeds;
pub mod fetcher;
pub mod image;
pub mod url;

pub use error::ScraperError;
pub use feeds::{fetch_feed, fetch_feed_candidates, parse_feed};
pub use fetcher::{build_http_client, HttpPageFetcher, PageFetcher};
pub use image::extract_article_image;
pub use url::{absolutize_url, extract_domain};
