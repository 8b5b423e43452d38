use crate::error::ProviderError;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

/// Provider-assigned account identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AccountId {
    fn from(id: u64) -> Self {
        AccountId(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularityRecord {
    pub id: AccountId,
    pub followers_count: u64,
}

impl PopularityRecord {
    pub fn new(id: AccountId, followers_count: u64) -> Self {
        Self {
            id,
            followers_count,
        }
    }
}

/// A finite, non-restartable listing of account ids.
///
/// An `Err` item does not end the stream: polling again resumes from the
/// position the error was reported at. `None` marks the end of the listing.
pub type ConnectionStream<'a> = BoxStream<'a, Result<AccountId, ProviderError>>;

/// Remote follow-graph provider.
pub trait GraphDataSource: Send + Sync {
    /// Resolve a handle (screen name) to its account id.
    fn resolve_account(
        &self,
        handle: &str,
    ) -> impl Future<Output = Result<AccountId, ProviderError>> + Send;

    /// Accounts followed by `id` ("friends").
    fn outbound_connections(&self, id: AccountId) -> ConnectionStream<'_>;

    /// Accounts following `id` ("followers").
    fn inbound_connections(&self, id: AccountId) -> ConnectionStream<'_>;

    /// Follower counts for one batch of accounts. Record order is not tied to
    /// the order of `ids`, and unknown accounts may be omitted.
    fn lookup_popularity(
        &self,
        ids: &[AccountId],
    ) -> impl Future<Output = Result<Vec<PopularityRecord>, ProviderError>> + Send;
}
