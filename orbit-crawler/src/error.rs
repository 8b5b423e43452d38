use thiserror::Error;

/// Failures reported by a [`GraphDataSource`](crate::source::GraphDataSource).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Account not found: {0}")]
    NotFound(String),

    #[error("Not authorized: {0}")]
    Forbidden(String),

    #[error("Rate limit reached")]
    RateLimited,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Provider error: {0}")]
    Provider(String),
}

impl ProviderError {
    /// Transient errors are waited out and retried; everything else is final.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::RateLimited | ProviderError::Provider(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Provider(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("Failed to resolve account '{handle}': {source}")]
    Resolve {
        handle: String,
        #[source]
        source: ProviderError,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("{operation} still failing after {attempts} attempts: {last}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last: ProviderError,
    },

    #[error("Invalid crawl configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, CrawlError>;
