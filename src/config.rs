use crate::crawl::CrawlConfig;
use crate::outreach::OutreachConfig;
use crate::retry::RetryPolicy;
use crate::score::ScoringWeights;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub scoring: ScoringWeights,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub outreach: OutreachConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    pub path: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: "data/organizations.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchConfig {
    /// Worker pool bound; organizations are processed independently.
    pub concurrency: usize,
    /// Skip organizations already recorded as processed in the store.
    pub skip_processed: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            skip_processed: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveryConfig {
    /// Query templates for finding people; `{org}` is replaced per row.
    pub contact_queries: Vec<String>,
    /// Query templates for resolving a missing domain.
    pub domain_queries: Vec<String>,
    pub max_search_results: usize,
    /// Role keywords a name must sit next to before we emit a contact.
    pub role_keywords: Vec<String>,
    /// Characters of surrounding text inspected for role keywords.
    pub context_window: usize,
    pub max_contacts: usize,
    pub max_patterns_per_contact: usize,
    /// How many leading candidates get sent to the verifier, when one is set.
    pub verify_top: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            contact_queries: vec![
                "{org} recruiter".to_string(),
                "{org} talent acquisition".to_string(),
            ],
            domain_queries: vec![
                "\"{org}\" official website".to_string(),
                "{org} careers".to_string(),
            ],
            max_search_results: 10,
            role_keywords: vec![
                "recruiter".to_string(),
                "technical recruiter".to_string(),
                "talent acquisition".to_string(),
                "talent partner".to_string(),
                "sourcer".to_string(),
                "hiring manager".to_string(),
                "hiring".to_string(),
                "head of people".to_string(),
                "people ops".to_string(),
                "founder".to_string(),
                "ceo".to_string(),
                "engineer".to_string(),
            ],
            context_window: 80,
            max_contacts: 10,
            max_patterns_per_contact: 4,
            verify_top: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub progress_interval: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            progress_interval: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub directory: String,
    pub results_filename: String,
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "out".to_string(),
            results_filename: "contacts_found.csv".to_string(),
            database_path: "data/contacts.db".to_string(),
        }
    }
}

pub async fn load_config(
    path: &str,
) -> std::result::Result<Config, Box<dyn std::error::Error + Send + Sync>> {
    let content = tokio::fs::read_to_string(path).await?;
    let config: Config = serde_yaml::from_str(&content)?;
    Ok(config)
}
