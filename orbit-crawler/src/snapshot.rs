// In-memory provider backed by a JSON snapshot of a follow graph

use crate::error::ProviderError;
use crate::source::{AccountId, ConnectionStream, GraphDataSource, PopularityRecord};
use anyhow::Context;
use futures::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

pub const DEFAULT_MAX_BATCH: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotAccount {
    pub id: AccountId,
    pub handle: String,
    #[serde(default)]
    pub followers_count: u64,
    /// Accounts this account follows.
    #[serde(default)]
    pub friends: Vec<AccountId>,
    /// Accounts following this account.
    #[serde(default)]
    pub followers: Vec<AccountId>,
    #[serde(default)]
    pub private: bool,
    /// Rate-limit errors injected halfway through each listing of this account.
    #[serde(default)]
    pub rate_limit_hits: u32,
    /// Listings of this account are cut off with `Forbidden` after this many ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forbidden_after: Option<usize>,
}

impl SnapshotAccount {
    pub fn new(id: u64, handle: &str) -> Self {
        Self {
            id: AccountId(id),
            handle: handle.to_string(),
            ..Default::default()
        }
    }

    pub fn with_followers_count(mut self, count: u64) -> Self {
        self.followers_count = count;
        self
    }

    pub fn with_friends(mut self, ids: &[u64]) -> Self {
        self.friends = ids.iter().copied().map(AccountId).collect();
        self
    }

    pub fn with_followers(mut self, ids: &[u64]) -> Self {
        self.followers = ids.iter().copied().map(AccountId).collect();
        self
    }

    /// Follow and be followed by the same accounts.
    pub fn with_mutuals(self, ids: &[u64]) -> Self {
        self.with_friends(ids).with_followers(ids)
    }

    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    pub fn with_rate_limit_hits(mut self, hits: u32) -> Self {
        self.rate_limit_hits = hits;
        self
    }

    pub fn forbidden_after(mut self, count: usize) -> Self {
        self.forbidden_after = Some(count);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub accounts: Vec<SnapshotAccount>,
}

/// A provider request, recorded in the order it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    Resolve(String),
    Outbound(AccountId),
    Inbound(AccountId),
    Lookup(Vec<AccountId>),
}

pub struct SnapshotGraphSource {
    accounts: HashMap<AccountId, SnapshotAccount>,
    handles: HashMap<String, AccountId>,
    max_batch: usize,
    calls: Mutex<Vec<SourceCall>>,
}

impl SnapshotGraphSource {
    pub fn new(snapshot: Snapshot) -> Self {
        let handles = snapshot
            .accounts
            .iter()
            .map(|account| (account.handle.to_lowercase(), account.id))
            .collect();
        let accounts = snapshot
            .accounts
            .into_iter()
            .map(|account| (account.id, account))
            .collect();

        Self {
            accounts,
            handles,
            max_batch: DEFAULT_MAX_BATCH,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn from_accounts(accounts: Vec<SnapshotAccount>) -> Self {
        Self::new(Snapshot { accounts })
    }

    /// Load a snapshot written as JSON.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&content)
            .with_context(|| format!("Invalid snapshot {}", path.display()))?;
        debug!(
            "Loaded snapshot {} with {} accounts",
            path.display(),
            snapshot.accounts.len()
        );
        Ok(Self::new(snapshot))
    }

    /// Largest popularity batch accepted; bigger batches are rejected.
    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch;
        self
    }

    pub fn calls(&self) -> Vec<SourceCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, call: SourceCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn listing(&self, id: AccountId, outbound: bool) -> ConnectionStream<'_> {
        let Some(account) = self.accounts.get(&id) else {
            let missing = vec![Err(ProviderError::NotFound(id.to_string()))];
            return stream::iter(missing).boxed();
        };
        if account.private {
            let denied = vec![Err(ProviderError::Forbidden(account.handle.clone()))];
            return stream::iter(denied).boxed();
        }

        let ids = if outbound {
            &account.friends
        } else {
            &account.followers
        };
        let ids = match account.forbidden_after {
            Some(count) => &ids[..count.min(ids.len())],
            None => &ids[..],
        };
        let revoked = account
            .forbidden_after
            .map(|_| Err(ProviderError::Forbidden(account.handle.clone())));
        let midpoint = ids.len() / 2;
        let items: Vec<Result<AccountId, ProviderError>> = ids[..midpoint]
            .iter()
            .copied()
            .map(Ok)
            .chain((0..account.rate_limit_hits).map(|_| Err(ProviderError::RateLimited)))
            .chain(ids[midpoint..].iter().copied().map(Ok))
            .chain(revoked)
            .collect();
        stream::iter(items).boxed()
    }
}

impl GraphDataSource for SnapshotGraphSource {
    async fn resolve_account(&self, handle: &str) -> Result<AccountId, ProviderError> {
        self.record(SourceCall::Resolve(handle.to_string()));
        self.handles
            .get(&handle.to_lowercase())
            .copied()
            .ok_or_else(|| ProviderError::NotFound(handle.to_string()))
    }

    fn outbound_connections(&self, id: AccountId) -> ConnectionStream<'_> {
        self.record(SourceCall::Outbound(id));
        self.listing(id, true)
    }

    fn inbound_connections(&self, id: AccountId) -> ConnectionStream<'_> {
        self.record(SourceCall::Inbound(id));
        self.listing(id, false)
    }

    async fn lookup_popularity(
        &self,
        ids: &[AccountId],
    ) -> Result<Vec<PopularityRecord>, ProviderError> {
        self.record(SourceCall::Lookup(ids.to_vec()));
        if ids.len() > self.max_batch {
            return Err(ProviderError::InvalidRequest(format!(
                "batch of {} exceeds limit of {}",
                ids.len(),
                self.max_batch
            )));
        }

        // Unknown accounts are omitted and records come back in reverse request order
        Ok(ids
            .iter()
            .rev()
            .filter_map(|id| self.accounts.get(id))
            .map(|account| PopularityRecord::new(account.id, account.followers_count))
            .collect())
    }
}
