use thiserror::Error;

pub type Result<T> = std::result::Result<T, OutreachError>;

/// Error taxonomy for the discovery/outreach pipeline.
///
/// A single organization failing never aborts the batch; only `Config`
/// errors are fatal at startup.
#[derive(Error, Debug)]
pub enum OutreachError {
    /// Malformed organization record or component input. The offending row
    /// is logged and skipped.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A search/fetch/verify/send collaborator failed in a way that is worth
    /// retrying with backoff before degrading.
    #[error("{provider} provider failed: {message}")]
    TransientProvider {
        provider: &'static str,
        message: String,
    },

    /// Repeat send rejected by the dedup gate. Callers treat this as a
    /// success no-op, not a failure.
    #[error("already sent to {address} for {org_key}")]
    DuplicateSend { org_key: String, address: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("database pool error: {0}")]
    Pool(#[from] mobc::Error<rusqlite::Error>),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl OutreachError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn transient(provider: &'static str, message: impl Into<String>) -> Self {
        Self::TransientProvider {
            provider,
            message: message.into(),
        }
    }

    /// Whether the retry policy should re-attempt the failed call.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OutreachError::TransientProvider { .. } | OutreachError::Http(_)
        )
    }
}
