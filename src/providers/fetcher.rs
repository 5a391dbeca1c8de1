use crate::errors::{OutreachError, Result};
use crate::models::FetchedPage;
use crate::providers::PageFetcher;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Plain HTTP page fetcher. Network failures surface as transient errors;
/// non-success HTTP responses come back as a normal `FetchedPage` so the
/// crawl controller can count them against its failure budget.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (compatible; ContactFinder/1.0)")
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        debug!("Fetching: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| OutreachError::transient("fetch", e.to_string()))?;

        let status = response.status().as_u16();

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("text/html") || ct.contains("application/xhtml"))
            .unwrap_or(true);
        if !is_html {
            debug!("Skipping non-HTML content at {}", url);
            return Ok(FetchedPage {
                status,
                body: String::new(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| OutreachError::transient("fetch", e.to_string()))?;
        debug!("Fetched {} bytes from {}", body.len(), url);

        Ok(FetchedPage { status, body })
    }
}
