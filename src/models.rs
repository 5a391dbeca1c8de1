use serde::{Deserialize, Serialize};
use url::Url;

/// One input row: an organization to find a contact for. Immutable once the
/// domain has been resolved for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
    pub domain: Option<String>,
}

impl Organization {
    pub fn new(name: impl Into<String>, domain: Option<String>) -> Self {
        Self {
            name: name.into(),
            domain: domain.filter(|d| !d.trim().is_empty()),
        }
    }

    /// Dedup identity: normalized domain when known, normalized name otherwise.
    pub fn key(&self) -> String {
        match self.domain.as_deref().map(normalize_domain) {
            Some(domain) if !domain.is_empty() => domain,
            _ => normalize_name(&self.name),
        }
    }

    pub fn registrable_domain(&self) -> Option<String> {
        self.domain
            .as_deref()
            .map(normalize_domain)
            .filter(|d| !d.is_empty())
            .map(|d| registrable_domain(&d))
    }
}

pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Lowercase a host string and strip scheme, path and a leading `www.`.
pub fn normalize_domain(raw: &str) -> String {
    let mut host = raw.trim().to_lowercase();
    if let Some((_, rest)) = host.split_once("://") {
        host = rest.to_string();
    }
    host = host
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .to_string();
    host.strip_prefix("www.").unwrap_or(&host).to_string()
}

// Two-part public suffixes we see often enough to care about.
const COMPOUND_TLDS: &[&str] = &["co", "com", "org", "net", "ac", "gov", "edu"];

/// Reduce a host to its registrable domain, e.g. `jobs.acme.co.uk` -> `acme.co.uk`.
pub fn registrable_domain(host: &str) -> String {
    let host = normalize_domain(host);
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    match labels.len() {
        0..=2 => host,
        n => {
            if COMPOUND_TLDS.contains(&labels[n - 2]) {
                labels[n - 3..].join(".")
            } else {
                labels[n - 2..].join(".")
            }
        }
    }
}

pub fn same_registrable_domain(url: &Url, domain: &str) -> bool {
    url.host_str()
        .map(|h| registrable_domain(h) == registrable_domain(domain))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactSource {
    SearchResult,
    CrawledPage,
}

/// A person discovered for an organization. Derived, only the selected
/// contact survives into persisted output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub full_name: String,
    pub first_name: String,
    pub last_name: String,
    pub title: Option<String>,
    pub source: ContactSource,
}

// Title markers that make a contact outrank generic staff when scoring.
const RECRUITING_MARKERS: &[&str] = &["recruit", "talent", "hiring", "people"];

impl Contact {
    pub fn is_recruiting_role(&self) -> bool {
        self.title
            .as_deref()
            .map(|t| {
                let t = t.to_lowercase();
                RECRUITING_MARKERS.iter().any(|m| t.contains(m))
            })
            .unwrap_or(false)
    }
}

/// Where a candidate address came from. Directly observed addresses carry
/// more weight than pattern-generated ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CandidateOrigin {
    Observed { context: String },
    Generated { pattern_index: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailCandidate {
    pub address: String,
    pub contact: Option<Contact>,
    pub origin: CandidateOrigin,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutreachStatus {
    Found,
    NoContactFound,
    NoDomainResolved,
    SkippedDuplicate,
    Error,
}

impl OutreachStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutreachStatus::Found => "found",
            OutreachStatus::NoContactFound => "no_contact_found",
            OutreachStatus::NoDomainResolved => "no_domain_resolved",
            OutreachStatus::SkippedDuplicate => "skipped_duplicate",
            OutreachStatus::Error => "error",
        }
    }
}

/// Per-organization outcome handed back by the orchestrator.
#[derive(Debug, Clone)]
pub struct OutreachResult {
    pub organization: Organization,
    pub org_key: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub score: f64,
    pub status: OutreachStatus,
    pub notes: String,
}

impl OutreachResult {
    pub fn new(
        organization: Organization,
        status: OutreachStatus,
        notes: impl Into<String>,
    ) -> Self {
        let org_key = organization.key();
        Self {
            organization,
            org_key,
            contact_name: None,
            email: None,
            score: 0.0,
            status,
            notes: notes.into(),
        }
    }
}

/// A ranked hit from the search provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct SendReceipt {
    pub id: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn org_key_prefers_domain() {
        let org = Organization::new("Acme Corp", Some("https://www.Acme.com/careers".into()));
        assert_eq!(org.key(), "acme.com");
    }

    #[test]
    fn org_key_falls_back_to_name() {
        let org = Organization::new("  Acme   Corp ", None);
        assert_eq!(org.key(), "acme corp");
    }

    #[test]
    fn registrable_domain_strips_subdomains() {
        assert_eq!(registrable_domain("jobs.acme.com"), "acme.com");
        assert_eq!(registrable_domain("careers.acme.co.uk"), "acme.co.uk");
        assert_eq!(registrable_domain("acme.io"), "acme.io");
    }

    #[test]
    fn same_registrable_domain_matches_subdomains() {
        let url = Url::parse("https://jobs.acme.com/openings").unwrap();
        assert!(same_registrable_domain(&url, "acme.com"));
        assert!(!same_registrable_domain(&url, "other.com"));
    }
}
