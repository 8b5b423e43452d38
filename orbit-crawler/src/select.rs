use crate::error::{CrawlError, Result};
use crate::retry::{RetryPolicy, WaitFn};
use crate::source::{AccountId, GraphDataSource, PopularityRecord};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, warn};

/// Accounts present in both listings, ascending and without duplicates.
pub fn mutual_connections(outbound: &[AccountId], inbound: &[AccountId]) -> Vec<AccountId> {
    let inbound: HashSet<AccountId> = inbound.iter().copied().collect();
    outbound
        .iter()
        .copied()
        .filter(|id| inbound.contains(id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Pick the `k` most followed candidates.
///
/// Records for accounts outside `candidates` are ignored and only the first
/// record per account counts. Equal follower counts are ordered by ascending
/// account id so the result does not depend on the order records arrive in.
pub fn rank_by_popularity(
    records: &[PopularityRecord],
    candidates: &[AccountId],
    k: usize,
) -> Vec<AccountId> {
    let candidates: HashSet<AccountId> = candidates.iter().copied().collect();
    let mut seen = HashSet::new();
    let mut ranked: Vec<PopularityRecord> = records
        .iter()
        .filter(|r| candidates.contains(&r.id) && seen.insert(r.id))
        .copied()
        .collect();

    ranked.sort_by(|a, b| {
        b.followers_count
            .cmp(&a.followers_count)
            .then_with(|| a.id.cmp(&b.id))
    });
    ranked.into_iter().take(k).map(|r| r.id).collect()
}

/// Intersect the two listings and return up to `k` of the most followed
/// mutual connections. Popularity is fetched in chunks of `batch_size`; no
/// lookup is made when there are no mutual connections.
pub async fn select_top_mutual<S: GraphDataSource>(
    source: &S,
    retry: &RetryPolicy,
    outbound: &[AccountId],
    inbound: &[AccountId],
    k: usize,
    batch_size: usize,
    on_wait: &WaitFn<'_>,
) -> Result<Vec<AccountId>> {
    let mutual = mutual_connections(outbound, inbound);
    if mutual.is_empty() || k == 0 {
        return Ok(Vec::new());
    }

    debug!(
        "Looking up popularity of {} mutual connections",
        mutual.len()
    );

    let mut records = Vec::with_capacity(mutual.len());
    for chunk in mutual.chunks(batch_size.max(1)) {
        match retry
            .run("popularity lookup", || source.lookup_popularity(chunk), on_wait)
            .await
        {
            Ok(batch) => records.extend(batch),
            Err(CrawlError::Provider(e)) => {
                warn!("Skipping {} accounts after failed lookup: {}", chunk.len(), e);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(rank_by_popularity(&records, &mutual, k))
}
