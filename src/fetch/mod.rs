pub mod http;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Retrieves raw page bodies. One call is one network round trip; no retries.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET a product page.
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError>;

    /// POST a url-encoded search form and return the listing page body.
    async fn post_form(&self, url: &str, form: &[(&str, String)]) -> Result<String, FetchError>;
}
