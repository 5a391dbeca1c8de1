use crate::errors::{OutreachError, Result};
use crate::models::SendReceipt;
use crate::providers::SendTransport;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, error};

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub api_key: String,
    pub domain: String,
    pub from_email: String,
    pub from_name: String,
    pub base_url: String,
}

impl TransportConfig {
    /// The API key is the one mandatory credential; its absence is fatal at
    /// startup when the outreach phase is enabled.
    pub fn from_env() -> Result<Self> {
        Ok(TransportConfig {
            api_key: std::env::var("MAILGUN_API_KEY")
                .map_err(|_| OutreachError::Config("MAILGUN_API_KEY not set".to_string()))?,
            domain: std::env::var("MAILGUN_DOMAIN")
                .map_err(|_| OutreachError::Config("MAILGUN_DOMAIN not set".to_string()))?,
            from_email: std::env::var("FROM_EMAIL")
                .map_err(|_| OutreachError::Config("FROM_EMAIL not set".to_string()))?,
            from_name: std::env::var("FROM_NAME").unwrap_or_else(|_| "Outreach".to_string()),
            base_url: "https://api.mailgun.net/v3".to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    id: String,
    message: String,
}

/// REST mail transport. One message per call; throttling and dedup live in
/// the outreach phase, not here.
pub struct RestTransport {
    config: TransportConfig,
    client: Client,
}

impl RestTransport {
    pub fn new(config: TransportConfig) -> Self {
        debug!("Created mail transport for domain: {}", config.domain);
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl SendTransport for RestTransport {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<SendReceipt> {
        let url = format!("{}/{}/messages", self.config.base_url, self.config.domain);

        let mut form_data = HashMap::new();
        form_data.insert(
            "from",
            format!("{} <{}>", self.config.from_name, self.config.from_email),
        );
        form_data.insert("to", to.to_string());
        form_data.insert("subject", subject.to_string());
        form_data.insert("text", body.to_string());

        debug!("Sending message to {} via {}", to, url);

        let response = self
            .client
            .post(&url)
            .basic_auth("api", Some(&self.config.api_key))
            .form(&form_data)
            .send()
            .await
            .map_err(|e| OutreachError::transient("send", e.to_string()))?;

        if response.status().is_success() {
            let parsed: ApiResponse = response
                .json()
                .await
                .map_err(|e| OutreachError::transient("send", e.to_string()))?;
            Ok(SendReceipt {
                id: parsed.id,
                message: parsed.message,
            })
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Mail API error ({}): {}", status, error_text);
            Err(OutreachError::transient(
                "send",
                format!("status {status}: {error_text}"),
            ))
        }
    }
}
