use super::{FetchError, PageFetcher};
use crate::config::HttpConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(config.max_workers.max(1))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }

    async fn read_body(url: &str, resp: Response) -> Result<String, FetchError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_string(), status: status.as_u16() });
        }
        resp.text().await.map_err(|source| FetchError::Request { url: url.to_string(), source })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request { url: url.to_string(), source })?;
        let body = Self::read_body(url, resp).await?;
        tracing::debug!(url, bytes = body.len(), "fetched product page");
        Ok(body)
    }

    async fn post_form(&self, url: &str, form: &[(&str, String)]) -> Result<String, FetchError> {
        let resp = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|source| FetchError::Request { url: url.to_string(), source })?;
        let body = Self::read_body(url, resp).await?;
        tracing::debug!(url, bytes = body.len(), "fetched listing page");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_from_default_config() {
        assert!(HttpFetcher::new(&HttpConfig::default()).is_ok());
    }

    /// Integration test: hits the live site.
    /// Run with: cargo test anbl_live --ignored -- --nocapture
    #[tokio::test]
    #[ignore]
    async fn anbl_live_fetch() {
        let fetcher = HttpFetcher::new(&HttpConfig::default()).unwrap();
        match fetcher.fetch_page("https://www.anbl.com").await {
            Ok(body) => println!("Got {} bytes from ANBL", body.len()),
            Err(e) => println!("ANBL fetch error: {:#}", e),
        }
    }
}
