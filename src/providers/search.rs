use crate::errors::{OutreachError, Result};
use crate::models::SearchHit;
use crate::providers::SearchProvider;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;
use url::Url;

const DEFAULT_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Web search against an HTML results endpoint. No API key needed, which
/// keeps the default setup runnable out of the box.
pub struct HtmlSearchProvider {
    client: Client,
    endpoint: String,
}

impl HtmlSearchProvider {
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: &str) -> Self {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (compatible; ContactFinder/1.0)")
            .timeout(Duration::from_secs(20))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }
}

impl Default for HtmlSearchProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchProvider for HtmlSearchProvider {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let url = Url::parse_with_params(&self.endpoint, &[("q", query)])
            .map_err(|e| OutreachError::invalid_input(format!("bad search endpoint: {e}")))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| OutreachError::transient("search", e.to_string()))?;

        if !response.status().is_success() {
            return Err(OutreachError::transient(
                "search",
                format!("status {}", response.status()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| OutreachError::transient("search", e.to_string()))?;

        let hits = parse_results(&body);
        debug!("Search for {:?} returned {} hits", query, hits.len());
        Ok(hits)
    }
}

fn parse_results(html: &str) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    let result_selector = Selector::parse(".result").unwrap();
    let link_selector = Selector::parse("a.result__a").unwrap();
    let snippet_selector = Selector::parse(".result__snippet").unwrap();

    let mut hits = Vec::new();
    for result in document.select(&result_selector) {
        let Some(link) = result.select(&link_selector).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Some(url) = unwrap_redirect(href) else {
            continue;
        };
        let title = link.text().collect::<String>().trim().to_string();
        let snippet = result
            .select(&snippet_selector)
            .next()
            .map(|s| s.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        hits.push(SearchHit {
            title,
            snippet,
            url,
        });
    }
    hits
}

// Result links come wrapped in a redirect with the target in a `uddg` query
// parameter.
fn unwrap_redirect(href: &str) -> Option<String> {
    if href.starts_with("http://") || href.starts_with("https://") {
        if let Ok(parsed) = Url::parse(href) {
            if let Some((_, target)) = parsed.query_pairs().find(|(k, _)| k == "uddg") {
                return Some(target.into_owned());
            }
        }
        return Some(href.to_string());
    }
    // Protocol-relative redirect links.
    if href.starts_with("//") {
        return unwrap_redirect(&format!("https:{href}"));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_results_and_unwraps_redirects() {
        let html = r#"
            <div class="result">
              <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.linkedin.com%2Fin%2Famy">Amy Salazar - Technical Recruiter</a>
              <div class="result__snippet">Amy Salazar, Technical Recruiter at Stripe</div>
            </div>
            <div class="result">
              <a class="result__a" href="https://stripe.com/jobs">Jobs at Stripe</a>
            </div>
        "#;
        let hits = parse_results(html);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://www.linkedin.com/in/amy");
        assert_eq!(hits[0].title, "Amy Salazar - Technical Recruiter");
        assert!(hits[0].snippet.contains("Technical Recruiter at Stripe"));
        assert_eq!(hits[1].url, "https://stripe.com/jobs");
        assert!(hits[1].snippet.is_empty());
    }

    #[test]
    fn skips_relative_hrefs() {
        let html = r#"<div class="result"><a class="result__a" href="/settings">x</a></div>"#;
        assert!(parse_results(html).is_empty());
    }
}
