use crate::errors::{OutreachError, Result};
use crate::models::Verdict;
use crate::providers::EmailVerifier;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const DEFAULT_ENDPOINT: &str = "https://api.apollo.io/v1/mixed_people/search";

/// Verifies an address against a people-search API. Optional: when no API
/// key is configured the pipeline simply scores everything as `Unknown`.
pub struct PeopleApiVerifier {
    client: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct PeopleResponse {
    #[serde(default)]
    people: Vec<PersonRecord>,
}

#[derive(Debug, Deserialize)]
struct PersonRecord {
    #[serde(default)]
    email: Option<String>,
}

impl PeopleApiVerifier {
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("VERIFIER_API_KEY").ok()?;
        let endpoint =
            std::env::var("VERIFIER_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        Some(Self::new(api_key, endpoint))
    }

    pub fn new(api_key: String, endpoint: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            endpoint,
            api_key,
        }
    }
}

#[async_trait]
impl EmailVerifier for PeopleApiVerifier {
    async fn verify(&self, address: &str) -> Result<Verdict> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .json(&json!({ "email": address }))
            .send()
            .await
            .map_err(|e| OutreachError::transient("verify", e.to_string()))?;

        if !response.status().is_success() {
            return Err(OutreachError::transient(
                "verify",
                format!("status {}", response.status()),
            ));
        }

        let parsed: PeopleResponse = response
            .json()
            .await
            .map_err(|e| OutreachError::transient("verify", e.to_string()))?;

        if parsed.people.is_empty() {
            debug!("No verification record for {}", address);
            return Ok(Verdict::Unknown);
        }

        let wanted = address.to_lowercase();
        let matched = parsed.people.iter().any(|p| {
            p.email
                .as_deref()
                .map(|e| e.trim().to_lowercase() == wanted)
                .unwrap_or(false)
        });
        if matched {
            debug!("Verified {} against people search", address);
            Ok(Verdict::Valid)
        } else if parsed.people.iter().any(|p| p.email.is_some()) {
            // A person came back, but with a different address.
            Ok(Verdict::Invalid)
        } else {
            Ok(Verdict::Unknown)
        }
    }
}
