// External collaborators. The pipeline only depends on these traits; the
// concrete clients live in the submodules and can be swapped out in tests.
use crate::errors::Result;
use crate::models::{FetchedPage, Message, SearchHit, SendReceipt, Verdict};
use async_trait::async_trait;

pub mod fetcher;
pub mod generator;
pub mod search;
pub mod transport;
pub mod verifier;

pub use fetcher::HttpFetcher;
pub use generator::TemplateGenerator;
pub use search::HtmlSearchProvider;
pub use transport::{RestTransport, TransportConfig};
pub use verifier::PeopleApiVerifier;

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

#[async_trait]
pub trait EmailVerifier: Send + Sync {
    async fn verify(&self, address: &str) -> Result<Verdict>;
}

/// Produces the outreach message body. The pipeline only hands ranked
/// contact data to it; an LLM-backed implementation plugs in here.
#[async_trait]
pub trait MessageGenerator: Send + Sync {
    async fn generate(&self, contact_name: &str, organization: &str) -> Result<Message>;
}

#[async_trait]
pub trait SendTransport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<SendReceipt>;
}
