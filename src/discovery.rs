use crate::config::DiscoveryConfig;
use crate::extract::{ObservedEmail, SignalExtractor};
use crate::models::{registrable_domain, same_registrable_domain, Contact, ContactSource, Organization, SearchHit};
use crate::providers::SearchProvider;
use crate::retry::RetryPolicy;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};
use url::Url;

// Hosts that show up in search results but are never an organization's own
// domain.
const EXCLUDED_DOMAINS: &[&str] = &[
    "linkedin.com",
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "youtube.com",
    "wikipedia.org",
    "crunchbase.com",
    "glassdoor.com",
    "indeed.com",
    "github.com",
    "medium.com",
    "reddit.com",
    "bloomberg.com",
    "duckduckgo.com",
    "google.com",
];

const SEED_PATHS: &[&str] = &[
    "",
    "/careers",
    "/jobs",
    "/about",
    "/contact",
    "/team",
    "/join-us",
    "/company",
];

pub struct ContactDiscovery {
    pub contacts: Vec<Contact>,
    pub observed: Vec<ObservedEmail>,
    /// Search hits on the organization's own domain; extra crawl seeds.
    pub on_domain_urls: Vec<String>,
}

fn fill_query(template: &str, org_name: &str) -> String {
    template.replace("{org}", org_name)
}

/// Search that degrades to empty results after the retry budget is spent.
/// A missing provider response never fails an organization.
async fn run_search(
    search: &dyn SearchProvider,
    retry: &RetryPolicy,
    query: &str,
) -> Vec<SearchHit> {
    match retry.run("search", || search.search(query)).await {
        Ok(hits) => hits,
        Err(e) => {
            warn!("Search degraded to no results for {:?}: {}", query, e);
            Vec::new()
        }
    }
}

/// Vote across search results for the organization's registrable domain.
/// Top-ranked hits weigh more, name-matching domains get a bonus.
pub async fn discover_domain(
    search: &dyn SearchProvider,
    retry: &RetryPolicy,
    config: &DiscoveryConfig,
    org_name: &str,
) -> Option<String> {
    let mut votes: HashMap<String, i64> = HashMap::new();
    let name_words: Vec<String> = org_name
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.len() > 2)
        .map(String::from)
        .collect();

    for template in &config.domain_queries {
        let query = fill_query(template, org_name);
        let hits = run_search(search, retry, &query).await;
        for (rank, hit) in hits.iter().take(config.max_search_results).enumerate() {
            let Ok(url) = Url::parse(&hit.url) else {
                continue;
            };
            let Some(host) = url.host_str() else {
                continue;
            };
            let domain = registrable_domain(host);
            if domain.is_empty() || EXCLUDED_DOMAINS.contains(&domain.as_str()) {
                continue;
            }
            let mut weight = (config.max_search_results - rank) as i64;
            let base = domain.split('.').next().unwrap_or_default();
            if name_words.iter().any(|w| base.contains(w.as_str())) {
                weight += 5;
            }
            *votes.entry(domain).or_insert(0) += weight;
        }
    }

    let best = votes
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))?;
    info!(
        "Discovered domain for {}: {} (votes: {})",
        org_name, best.0, best.1
    );
    Some(best.0)
}

/// Standard career/contact paths plus the bare roots, used to seed the crawl.
pub fn seed_urls(domain: &str) -> Vec<String> {
    let mut seeds: Vec<String> = SEED_PATHS
        .iter()
        .map(|path| format!("https://{domain}{path}"))
        .collect();
    seeds.push(format!("https://www.{domain}"));
    seeds
}

/// Find people through the search provider and run every hit through the
/// signal extractor.
pub async fn search_contacts(
    search: &dyn SearchProvider,
    retry: &RetryPolicy,
    extractor: &SignalExtractor,
    config: &DiscoveryConfig,
    organization: &Organization,
) -> ContactDiscovery {
    let mut contacts = Vec::new();
    let mut observed = Vec::new();
    let mut on_domain_urls = Vec::new();
    let mut seen_names = HashSet::new();
    let mut seen_addresses = HashSet::new();
    let org_domain = organization.registrable_domain();

    for template in &config.contact_queries {
        let query = fill_query(template, &organization.name);
        let hits = run_search(search, retry, &query).await;
        debug!("Query {:?} produced {} hits", query, hits.len());

        for hit in hits.iter().take(config.max_search_results) {
            let text = format!("{}. {}", hit.title, hit.snippet);
            let outcome = extractor.extract(&text, organization, ContactSource::SearchResult);

            for contact in outcome.contacts {
                if contacts.len() >= config.max_contacts {
                    break;
                }
                if seen_names.insert(contact.full_name.to_lowercase()) {
                    info!(
                        "Found contact for {}: {} ({})",
                        organization.name,
                        contact.full_name,
                        contact.title.as_deref().unwrap_or("-")
                    );
                    contacts.push(contact);
                }
            }
            for email in outcome.observed {
                if seen_addresses.insert(email.address.clone()) {
                    observed.push(email);
                }
            }
            if let Some(domain) = &org_domain {
                if let Ok(url) = Url::parse(&hit.url) {
                    if same_registrable_domain(&url, domain) {
                        on_domain_urls.push(hit.url.clone());
                    }
                }
            }
        }
    }

    ContactDiscovery {
        contacts,
        observed,
        on_domain_urls,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Result;
    use async_trait::async_trait;

    struct FixedSearch {
        hits: Vec<SearchHit>,
    }

    #[async_trait]
    impl SearchProvider for FixedSearch {
        async fn search(&self, _query: &str) -> Result<Vec<SearchHit>> {
            Ok(self.hits.clone())
        }
    }

    fn hit(url: &str) -> SearchHit {
        SearchHit {
            title: String::new(),
            snippet: String::new(),
            url: url.to_string(),
        }
    }

    #[tokio::test]
    async fn domain_discovery_prefers_name_matching_domains() {
        let search = FixedSearch {
            hits: vec![
                hit("https://www.linkedin.com/company/acme"),
                hit("https://news.example.org/acme-raises"),
                hit("https://www.acme.com/about"),
            ],
        };
        let domain = discover_domain(
            &search,
            &RetryPolicy::default(),
            &DiscoveryConfig::default(),
            "Acme",
        )
        .await;
        assert_eq!(domain.as_deref(), Some("acme.com"));
    }

    #[tokio::test]
    async fn domain_discovery_skips_social_networks() {
        let search = FixedSearch {
            hits: vec![hit("https://www.linkedin.com/company/acme")],
        };
        let domain = discover_domain(
            &search,
            &RetryPolicy::default(),
            &DiscoveryConfig::default(),
            "Acme",
        )
        .await;
        assert_eq!(domain, None);
    }

    #[test]
    fn seed_urls_cover_career_paths() {
        let seeds = seed_urls("acme.com");
        assert!(seeds.contains(&"https://acme.com/careers".to_string()));
        assert!(seeds.contains(&"https://acme.com".to_string()));
        assert!(seeds.contains(&"https://www.acme.com".to_string()));
    }

    #[test]
    fn query_templates_substitute_the_organization() {
        assert_eq!(fill_query("{org} recruiter", "Acme"), "Acme recruiter");
    }
}
