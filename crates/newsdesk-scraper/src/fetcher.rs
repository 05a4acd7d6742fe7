use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::ScraperError;

/// Downloads article pages. No retry: callers treat any error as "no page".
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return the response body as text.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] on network failure, timeout, or non-2xx status.
    async fn fetch_page(&self, url: &str) -> Result<String, ScraperError>;
}

/// Build the shared `reqwest` client used for page and feed downloads.
///
/// # Errors
///
/// Returns [`ScraperError::Http`] if the client cannot be constructed.
pub fn build_http_client(timeout_secs: u64, user_agent: &str) -> Result<Client, ScraperError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(timeout_secs.min(5)))
        .user_agent(user_agent)
        .build()?;
    Ok(client)
}

/// [`PageFetcher`] backed by a plain `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the client cannot be constructed.
    pub fn with_timeout(timeout_secs: u64, user_agent: &str) -> Result<Self, ScraperError> {
        Ok(Self::new(build_http_client(timeout_secs, user_agent)?))
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, ScraperError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }
        Ok(response.text().await?)
    }
}
