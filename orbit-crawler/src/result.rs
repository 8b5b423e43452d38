use crate::source::AccountId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// `target` was discovered through `source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: AccountId,
    pub target: AccountId,
}

impl Edge {
    pub fn new(source: AccountId, target: AccountId) -> Self {
        Self { source, target }
    }

    /// The seed edge `(root, root)` is the only self-loop a crawl produces.
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlOutcome {
    pub root: AccountId,
    pub discovered: HashSet<AccountId>,
    /// Edges whose target was expanded (or revisited), in crawl order.
    pub processed: Vec<Edge>,
    /// Edges still queued when the crawl stopped.
    pub pending: Vec<Edge>,
    /// Number of provider-backed expansions performed.
    pub expansions: usize,
}

impl CrawlOutcome {
    /// Every recorded edge: processed first, then the unexpanded remainder.
    pub fn edges(&self) -> Vec<Edge> {
        self.processed
            .iter()
            .chain(self.pending.iter())
            .copied()
            .collect()
    }

    /// Recorded edges without the seed self-loop.
    pub fn graph_edges(&self) -> Vec<Edge> {
        self.edges()
            .into_iter()
            .filter(|edge| !edge.is_self_loop())
            .collect()
    }
}
