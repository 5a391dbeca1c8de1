use crate::models::{registrable_domain, same_registrable_domain};
use crate::providers::PageFetcher;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlConfig {
    /// Distinct URLs fetched per organization. Zero disables the crawl.
    pub max_pages: usize,
    /// Failed page fetches tolerated before the crawl aborts.
    pub max_failures: usize,
    /// Stop once this many on-domain addresses have been seen. Zero disables
    /// the early exit.
    pub early_stop_email_count: usize,
    pub page_delay_ms: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 25,
            max_failures: 5,
            early_stop_email_count: 3,
            page_delay_ms: 1000,
        }
    }
}

/// Why a crawl ended. All variants are normal terminal states, not errors;
/// only `FailureBudget` counts as aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Completed,
    PageBudget,
    EnoughEmails,
    FailureBudget,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Completed => "completed",
            StopReason::PageBudget => "page_budget",
            StopReason::EnoughEmails => "enough_emails",
            StopReason::FailureBudget => "aborted_failure_budget",
        }
    }

    pub fn aborted(&self) -> bool {
        matches!(self, StopReason::FailureBudget)
    }
}

#[derive(Debug, Clone)]
pub struct CrawledPage {
    pub url: String,
    pub body: String,
}

#[derive(Debug)]
pub struct CrawlOutcome {
    pub pages: Vec<CrawledPage>,
    pub stop: StopReason,
    pub pages_fetched: usize,
    pub failures: usize,
}

const PRIORITY_KEYWORDS: &[&str] = &[
    "careers", "career", "jobs", "job", "join", "about", "contact", "team", "people", "talent",
    "hiring", "students", "university", "campus",
];

const SKIP_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico", ".css", ".js", ".pdf", ".zip", ".mp4",
    ".webp", ".woff", ".woff2",
];

/// BFS crawler bounded per organization: page budget, failure budget,
/// visited-set dedup and an early exit once enough addresses were seen.
pub struct CrawlController<'a> {
    fetcher: &'a dyn PageFetcher,
    config: &'a CrawlConfig,
    email_probe: Regex,
}

impl<'a> CrawlController<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, config: &'a CrawlConfig) -> Self {
        Self {
            fetcher,
            config,
            email_probe: Regex::new(r"[A-Za-z0-9._%+-]+@([A-Za-z0-9.-]+\.[A-Za-z]{2,})").unwrap(),
        }
    }

    pub async fn crawl(&self, domain: &str, seeds: &[String]) -> CrawlOutcome {
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        for seed in seeds {
            if let Some(url) = normalize_url(seed, None) {
                if on_domain(&url, domain) && visited.insert(url.clone()) {
                    queue.push_back(url);
                }
            }
        }

        info!(
            "🕷️  Starting crawl of {} with {} seed URLs",
            domain,
            queue.len()
        );

        let mut pages = Vec::new();
        let mut pages_fetched = 0;
        let mut failures = 0;
        let mut observed_emails = 0;

        let stop = loop {
            if queue.is_empty() {
                break StopReason::Completed;
            }
            if pages_fetched >= self.config.max_pages {
                break StopReason::PageBudget;
            }
            let url = match queue.pop_front() {
                Some(url) => url,
                None => break StopReason::Completed,
            };

            pages_fetched += 1;
            let fetched = self.fetcher.fetch(&url).await;
            match fetched {
                Ok(page) if (200..300).contains(&(page.status as u32)) && !page.body.is_empty() => {
                    observed_emails += self.count_on_domain_emails(&page.body, domain);

                    for link in extract_links(&page.body, &url, domain) {
                        if visited.insert(link.clone()) {
                            queue.push_back(link);
                        }
                    }
                    pages.push(CrawledPage {
                        url,
                        body: page.body,
                    });

                    if self.config.early_stop_email_count > 0
                        && observed_emails >= self.config.early_stop_email_count
                    {
                        break StopReason::EnoughEmails;
                    }
                }
                Ok(page) => {
                    debug!("No usable content from {} (status {})", url, page.status);
                    failures += 1;
                }
                Err(e) => {
                    warn!("Failed to fetch {}: {}", url, e);
                    failures += 1;
                }
            }

            if failures >= self.config.max_failures {
                break StopReason::FailureBudget;
            }
            if !queue.is_empty() && self.config.page_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.page_delay_ms)).await;
            }
        };

        info!(
            "Crawl of {} ended: {} ({} pages, {} failures)",
            domain,
            stop.as_str(),
            pages.len(),
            failures
        );

        CrawlOutcome {
            pages,
            stop,
            pages_fetched,
            failures,
        }
    }

    fn count_on_domain_emails(&self, body: &str, domain: &str) -> usize {
        let target = registrable_domain(domain);
        self.email_probe
            .captures_iter(body)
            .filter(|caps| registrable_domain(&caps[1]) == target)
            .count()
    }
}

/// Visible text of an HTML page, whitespace-collapsed, for the extractor.
pub fn clean_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let body_selector = Selector::parse("body").unwrap();
    document
        .select(&body_selector)
        .next()
        .map(|body| {
            body.text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

fn extract_links(html: &str, base_url: &str, domain: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let link_selector = Selector::parse("a[href]").unwrap();
    let base = Url::parse(base_url).ok();

    let mut seen = HashSet::new();
    let mut priority = Vec::new();
    let mut normal = Vec::new();
    for element in document.select(&link_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(link) = normalize_url(href, base.as_ref()) else {
            continue;
        };
        if !on_domain(&link, domain) || !looks_like_page(&link) {
            continue;
        }
        if !seen.insert(link.clone()) {
            continue;
        }
        if has_priority_keyword(&link) {
            priority.push(link);
        } else {
            normal.push(link);
        }
    }
    priority.extend(normal);
    priority
}

fn normalize_url(href: &str, base: Option<&Url>) -> Option<String> {
    let mut url = match Url::parse(href) {
        Ok(url) => url,
        Err(_) => base?.join(href).ok()?,
    };
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string().trim_end_matches('/').to_string())
}

fn on_domain(url: &str, domain: &str) -> bool {
    Url::parse(url)
        .map(|u| same_registrable_domain(&u, domain))
        .unwrap_or(false)
}

fn looks_like_page(url: &str) -> bool {
    let lower = url.to_lowercase();
    !SKIP_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn has_priority_keyword(url: &str) -> bool {
    let lower = url.to_lowercase();
    PRIORITY_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{OutreachError, Result};
    use crate::models::FetchedPage;
    use crate::providers::PageFetcher;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct ScriptedFetcher {
        pages: HashMap<String, String>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(u, b)| (u.to_string(), b.to_string()))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self, url: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.as_str() == url)
                .count()
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some(body) => Ok(FetchedPage {
                    status: 200,
                    body: body.clone(),
                }),
                None => Err(OutreachError::transient("fetch", "connection refused")),
            }
        }
    }

    fn config(max_pages: usize, max_failures: usize, early_stop: usize) -> CrawlConfig {
        CrawlConfig {
            max_pages,
            max_failures,
            early_stop_email_count: early_stop,
            page_delay_ms: 0,
        }
    }

    #[tokio::test]
    async fn stays_within_page_budget() {
        let fetcher = ScriptedFetcher::new(&[
            (
                "https://acme.io",
                r#"<a href="/a">a</a><a href="/b">b</a><a href="/c">c</a>"#,
            ),
            ("https://acme.io/a", "<p>a</p>"),
            ("https://acme.io/b", "<p>b</p>"),
            ("https://acme.io/c", "<p>c</p>"),
        ]);
        let cfg = config(3, 10, 0);
        let outcome = CrawlController::new(&fetcher, &cfg)
            .crawl("acme.io", &["https://acme.io".to_string()])
            .await;
        assert_eq!(outcome.pages_fetched, 3);
        assert_eq!(outcome.stop, StopReason::PageBudget);
        assert!(!outcome.stop.aborted());
    }

    #[tokio::test]
    async fn never_revisits_a_url() {
        let fetcher = ScriptedFetcher::new(&[
            ("https://acme.io", r#"<a href="/a">a</a>"#),
            ("https://acme.io/a", r#"<a href="https://acme.io">home</a><a href="/a">self</a>"#),
        ]);
        let cfg = config(10, 10, 0);
        let outcome = CrawlController::new(&fetcher, &cfg)
            .crawl("acme.io", &["https://acme.io".to_string()])
            .await;
        assert_eq!(outcome.stop, StopReason::Completed);
        assert_eq!(fetcher.call_count("https://acme.io"), 1);
        assert_eq!(fetcher.call_count("https://acme.io/a"), 1);
    }

    #[tokio::test]
    async fn single_fetch_failure_is_not_fatal() {
        let fetcher = ScriptedFetcher::new(&[("https://acme.io/careers", "<p>join us</p>")]);
        let cfg = config(10, 5, 0);
        let outcome = CrawlController::new(&fetcher, &cfg)
            .crawl(
                "acme.io",
                &[
                    "https://acme.io/missing".to_string(),
                    "https://acme.io/careers".to_string(),
                ],
            )
            .await;
        assert_eq!(outcome.stop, StopReason::Completed);
        assert_eq!(outcome.pages.len(), 1);
        assert_eq!(outcome.failures, 1);
    }

    #[tokio::test]
    async fn aborts_when_failure_budget_is_exceeded() {
        let fetcher = ScriptedFetcher::new(&[]);
        let cfg = config(10, 2, 0);
        let seeds: Vec<String> = (0..5).map(|i| format!("https://acme.io/p{i}")).collect();
        let outcome = CrawlController::new(&fetcher, &cfg).crawl("acme.io", &seeds).await;
        assert_eq!(outcome.stop, StopReason::FailureBudget);
        assert!(outcome.stop.aborted());
        assert_eq!(outcome.failures, 2);
        assert_eq!(outcome.pages_fetched, 2);
    }

    #[tokio::test]
    async fn stops_early_once_enough_addresses_were_seen() {
        let fetcher = ScriptedFetcher::new(&[
            (
                "https://acme.io/contact",
                r#"<p>jobs@acme.io and talent@acme.io</p><a href="/more">more</a>"#,
            ),
            ("https://acme.io/more", "<p>never visited</p>"),
        ]);
        let cfg = config(10, 5, 2);
        let outcome = CrawlController::new(&fetcher, &cfg)
            .crawl("acme.io", &["https://acme.io/contact".to_string()])
            .await;
        assert_eq!(outcome.stop, StopReason::EnoughEmails);
        assert_eq!(outcome.pages.len(), 1);
        assert_eq!(fetcher.call_count("https://acme.io/more"), 0);
    }

    #[tokio::test]
    async fn off_domain_and_asset_links_are_not_followed() {
        let fetcher = ScriptedFetcher::new(&[(
            "https://acme.io",
            r#"<a href="https://other.com/x">x</a>
               <a href="/logo.png">logo</a>
               <a href="/about">about</a>"#,
        ), ("https://acme.io/about", "<p>about</p>")]);
        let cfg = config(10, 5, 0);
        let outcome = CrawlController::new(&fetcher, &cfg)
            .crawl("acme.io", &["https://acme.io".to_string()])
            .await;
        assert_eq!(outcome.pages_fetched, 2);
        assert_eq!(fetcher.call_count("https://other.com/x"), 0);
        assert_eq!(fetcher.call_count("https://acme.io/logo.png"), 0);
    }

    #[test]
    fn career_links_are_prioritized() {
        let html = r#"<a href="/blog">blog</a><a href="/careers">careers</a>"#;
        let links = extract_links(html, "https://acme.io", "acme.io");
        assert_eq!(
            links,
            vec![
                "https://acme.io/careers".to_string(),
                "https://acme.io/blog".to_string()
            ]
        );
    }

    #[test]
    fn clean_text_collapses_markup() {
        let text = clean_text("<html><body><h1>Team</h1>\n<p>Amy   Salazar</p></body></html>");
        assert_eq!(text, "Team Amy Salazar");
    }
}
