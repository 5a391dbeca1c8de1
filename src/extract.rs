use crate::config::DiscoveryConfig;
use crate::models::{registrable_domain, Contact, ContactSource, Organization};
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

/// An address seen verbatim in source text. Higher confidence than anything
/// the pattern generator can produce.
#[derive(Debug, Clone)]
pub struct ObservedEmail {
    pub address: String,
    pub context: String,
}

#[derive(Debug, Default)]
pub struct ExtractionOutcome {
    pub contacts: Vec<Contact>,
    pub observed: Vec<ObservedEmail>,
}

// Capitalized word pairs that are not people.
const INVALID_NAME_WORDS: &[&str] = &[
    "the", "and", "for", "our", "your", "their", "this", "that", "with", "from", "about", "all",
    "new", "best", "more", "most", "view", "see", "get", "top", "open", "apply", "contact", "join",
    "work", "find", "meet", "sign", "log", "create", "search", "team", "group", "company",
    "people", "career", "careers", "jobs", "profile", "profiles", "page", "site", "linkedin",
    "senior", "junior", "lead", "head", "chief", "director", "manager", "officer", "president",
    "vice", "global", "staff", "user", "internal", "external", "services", "solutions", "systems",
    "support", "operations", "engineering", "marketing", "sales", "legal", "finance", "talent",
];

// Local parts that are either machine mailboxes or parsing garbage.
const INVALID_LOCAL_PARTS: &[&str] = &[
    "noreply",
    "no-reply",
    "donotreply",
    "do-not-reply",
    "postmaster",
    "webmaster",
    "hostmaster",
    "mailer-daemon",
    "abuse",
    "spam",
    "example",
    "test",
    "email",
    "mail",
    "address",
    "domain",
    "www",
];

pub struct SignalExtractor {
    email_re: Regex,
    name_re: Regex,
    obfuscations: Vec<(Regex, &'static str)>,
    role_keywords: Vec<String>,
    context_window: usize,
}

impl SignalExtractor {
    pub fn new(config: &DiscoveryConfig) -> Self {
        // Keywords sorted longest-first so the most specific one wins as a title.
        let mut role_keywords: Vec<String> = config
            .role_keywords
            .iter()
            .map(|k| k.to_lowercase())
            .collect();
        role_keywords.sort_by_key(|k| std::cmp::Reverse(k.len()));

        let obfuscations = vec![
            (Regex::new(r"(?i)\s*[\[({]\s*at\s*[\])}]\s*").unwrap(), "@"),
            (Regex::new(r"(?i)\s*[\[({]\s*dot\s*[\])}]\s*").unwrap(), "."),
            (Regex::new(r"&#0?64;|&#x40;").unwrap(), "@"),
            (Regex::new(r"&#0?46;").unwrap(), "."),
        ];

        Self {
            email_re: Regex::new(
                r"\b[A-Za-z][A-Za-z0-9._%+-]{1,63}@[A-Za-z0-9][A-Za-z0-9.-]*\.[A-Za-z]{2,}\b",
            )
            .unwrap(),
            name_re: Regex::new(r"\b([A-Z][a-z]{1,15})\s+([A-Z][a-z]{1,15})\b").unwrap(),
            obfuscations,
            role_keywords,
            context_window: config.context_window,
        }
    }

    /// Pull structured contacts and directly-observed addresses out of
    /// free-form text. Tolerates anything; garbage in, empty vectors out.
    pub fn extract(
        &self,
        raw_text: &str,
        organization: &Organization,
        source: ContactSource,
    ) -> ExtractionOutcome {
        let text = self.deobfuscate(raw_text);
        let mut outcome = ExtractionOutcome::default();

        let org_tokens: HashSet<String> = organization
            .name
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();

        let mut seen_names = HashSet::new();
        for caps in self.name_re.captures_iter(&text) {
            let (full, [first, last]) = caps.extract();
            if !self.valid_name_token(first, &org_tokens) || !self.valid_name_token(last, &org_tokens)
            {
                continue;
            }
            let m = caps.get(0).unwrap();
            let window = context_around(&text, m.start(), m.end(), self.context_window);
            let Some(title) = self.role_near(&window) else {
                continue;
            };
            if !seen_names.insert(full.to_lowercase()) {
                continue;
            }
            outcome.contacts.push(Contact {
                full_name: full.to_string(),
                first_name: first.to_string(),
                last_name: last.to_string(),
                title: Some(title),
                source,
            });
        }

        let org_domain = organization.registrable_domain();
        let mut seen_addresses = HashSet::new();
        for m in self.email_re.find_iter(&text) {
            let address = m.as_str().to_lowercase();
            let Some((local, domain)) = address.split_once('@') else {
                continue;
            };
            if !valid_local_part(local) {
                continue;
            }
            if let Some(org_domain) = &org_domain {
                if &registrable_domain(domain) != org_domain {
                    continue;
                }
            }
            if !seen_addresses.insert(address.clone()) {
                continue;
            }
            let context = context_around(&text, m.start(), m.end(), self.context_window);
            outcome.observed.push(ObservedEmail { address, context });
        }

        if !outcome.contacts.is_empty() || !outcome.observed.is_empty() {
            debug!(
                "Extracted {} contacts and {} observed addresses for {}",
                outcome.contacts.len(),
                outcome.observed.len(),
                organization.name
            );
        }
        outcome
    }

    fn valid_name_token(&self, token: &str, org_tokens: &HashSet<String>) -> bool {
        let lower = token.to_lowercase();
        if lower.len() < 2 || org_tokens.contains(&lower) {
            return false;
        }
        if INVALID_NAME_WORDS.contains(&lower.as_str()) {
            return false;
        }
        // Role words themselves ("Technical Recruiter") are titles, not names.
        !self
            .role_keywords
            .iter()
            .any(|kw| kw.split_whitespace().any(|w| w == lower))
    }

    /// The most specific role keyword appearing near the name, if any.
    fn role_near(&self, window: &str) -> Option<String> {
        let window = window.to_lowercase();
        self.role_keywords
            .iter()
            .find(|kw| window.contains(kw.as_str()))
            .cloned()
    }

    fn deobfuscate(&self, text: &str) -> String {
        let mut text = text.to_string();
        for (pattern, replacement) in &self.obfuscations {
            text = pattern.replace_all(&text, *replacement).into_owned();
        }
        text
    }
}

fn valid_local_part(local: &str) -> bool {
    if local.len() < 2 || local.len() > 64 {
        return false;
    }
    if local.starts_with(['.', '_', '-']) || local.ends_with(['.', '_', '-']) {
        return false;
    }
    if local.contains("..") || local.contains("__") || local.contains("--") {
        return false;
    }
    !local
        .split(['.', '_', '-'])
        .any(|part| INVALID_LOCAL_PARTS.contains(&part))
}

// Byte offsets come from regex matches; walk back to char boundaries before
// slicing so multi-byte text cannot panic.
fn context_around(text: &str, start: usize, end: usize, window: usize) -> String {
    let mut s = start.saturating_sub(window);
    while s > 0 && !text.is_char_boundary(s) {
        s -= 1;
    }
    let mut e = (end + window).min(text.len());
    while e < text.len() && !text.is_char_boundary(e) {
        e += 1;
    }
    text[s..e].split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiscoveryConfig;

    fn extractor() -> SignalExtractor {
        SignalExtractor::new(&DiscoveryConfig::default())
    }

    fn stripe() -> Organization {
        Organization::new("Stripe", Some("stripe.com".to_string()))
    }

    #[test]
    fn finds_named_contact_next_to_role_keyword() {
        let outcome = extractor().extract(
            "Amy Salazar, Technical Recruiter at Stripe",
            &stripe(),
            ContactSource::SearchResult,
        );
        assert_eq!(outcome.contacts.len(), 1);
        let contact = &outcome.contacts[0];
        assert_eq!(contact.full_name, "Amy Salazar");
        assert_eq!(contact.first_name, "Amy");
        assert_eq!(contact.last_name, "Salazar");
        assert_eq!(contact.title.as_deref(), Some("technical recruiter"));
    }

    #[test]
    fn ignores_capitalized_pairs_without_role_context() {
        let outcome = extractor().extract(
            "Jane Miller wrote a blog post about cooking",
            &stripe(),
            ContactSource::CrawledPage,
        );
        assert!(outcome.contacts.is_empty());
    }

    #[test]
    fn rejects_title_words_and_org_name_as_names() {
        let outcome = extractor().extract(
            "Technical Recruiter roles. Senior Manager openings. Join Stripe Careers",
            &stripe(),
            ContactSource::SearchResult,
        );
        assert!(outcome.contacts.is_empty());
    }

    #[test]
    fn deduplicates_contacts_case_insensitively() {
        let outcome = extractor().extract(
            "Amy Salazar is a recruiter. AMY Salazar... Amy Salazar, recruiter at Stripe",
            &stripe(),
            ContactSource::SearchResult,
        );
        assert_eq!(outcome.contacts.len(), 1);
    }

    #[test]
    fn observes_on_domain_addresses_and_drops_foreign_ones() {
        let outcome = extractor().extract(
            "Reach us at careers@stripe.com or our agency at jobs@otherfirm.com",
            &stripe(),
            ContactSource::CrawledPage,
        );
        let addresses: Vec<_> = outcome.observed.iter().map(|o| o.address.as_str()).collect();
        assert_eq!(addresses, vec!["careers@stripe.com"]);
    }

    #[test]
    fn keeps_any_domain_when_organization_domain_is_unknown() {
        let org = Organization::new("Stripe", None);
        let outcome = extractor().extract(
            "Reach us at careers@stripe.com",
            &org,
            ContactSource::SearchResult,
        );
        assert_eq!(outcome.observed.len(), 1);
    }

    #[test]
    fn recovers_obfuscated_addresses() {
        let outcome = extractor().extract(
            "Write to amy.salazar [at] stripe [dot] com for roles",
            &stripe(),
            ContactSource::CrawledPage,
        );
        assert_eq!(outcome.observed.len(), 1);
        assert_eq!(outcome.observed[0].address, "amy.salazar@stripe.com");
    }

    #[test]
    fn filters_machine_mailboxes() {
        let outcome = extractor().extract(
            "noreply@stripe.com sends updates, contact recruiting@stripe.com instead",
            &stripe(),
            ContactSource::CrawledPage,
        );
        let addresses: Vec<_> = outcome.observed.iter().map(|o| o.address.as_str()).collect();
        assert_eq!(addresses, vec!["recruiting@stripe.com"]);
    }

    #[test]
    fn observed_addresses_dedup_case_insensitively() {
        let outcome = extractor().extract(
            "careers@stripe.com CAREERS@stripe.com Careers@Stripe.com",
            &stripe(),
            ContactSource::CrawledPage,
        );
        assert_eq!(outcome.observed.len(), 1);
    }

    #[test]
    fn arbitrary_garbage_never_fails() {
        let outcome = extractor().extract(
            "%%%@@@ \u{1F980} <<<>>> 12345 ..... @@",
            &stripe(),
            ContactSource::CrawledPage,
        );
        assert!(outcome.contacts.is_empty());
        assert!(outcome.observed.is_empty());

        let empty = extractor().extract("", &stripe(), ContactSource::CrawledPage);
        assert!(empty.contacts.is_empty() && empty.observed.is_empty());
    }
}
