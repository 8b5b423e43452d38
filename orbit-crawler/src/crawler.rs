use crate::error::{CrawlError, ProviderError, Result};
use crate::result::{CrawlOutcome, Edge};
use crate::retry::RetryPolicy;
use crate::select::select_top_mutual;
use crate::source::{AccountId, GraphDataSource};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_NODE_BUDGET: usize = 100;
pub const DEFAULT_FANOUT: usize = 5;
pub const DEFAULT_CONNECTION_CAP: usize = 5000;
pub const DEFAULT_BATCH_SIZE: usize = 100;

pub type ProgressCallback = Arc<dyn Fn(CrawlEvent) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub enum CrawlEvent {
    Resolved {
        handle: String,
        root: AccountId,
    },
    Expanding {
        edge: Edge,
        discovered: usize,
        pending: usize,
    },
    CoolingDown {
        operation: String,
        reason: String,
        wait: Duration,
    },
    /// The account's listings were not readable; it promotes nobody.
    DeadEnd {
        account: AccountId,
    },
    Expanded {
        account: AccountId,
        promoted: Vec<AccountId>,
        discovered: usize,
    },
    /// A queued edge pointed at an account that was already expanded.
    Revisited {
        edge: Edge,
    },
    Finished {
        discovered: usize,
        expansions: usize,
        pending: usize,
    },
}

/// How promoted accounts that are already discovered are queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrontierPolicy {
    /// Queue every promotion, even accounts already discovered. Repeat edges
    /// are recorded, but an account is only expanded once.
    #[default]
    Duplicates,
    /// Only queue accounts that were not discovered before.
    Deduplicate,
}

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Stop expanding once this many distinct accounts are discovered.
    pub node_budget: usize,
    /// Promotions accepted per expanded account.
    pub fanout: usize,
    /// Ids consumed from each friends/followers listing.
    pub connection_cap: usize,
    /// Accounts per popularity lookup.
    pub batch_size: usize,
    pub retry: RetryPolicy,
    pub frontier_policy: FrontierPolicy,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            node_budget: DEFAULT_NODE_BUDGET,
            fanout: DEFAULT_FANOUT,
            connection_cap: DEFAULT_CONNECTION_CAP,
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryPolicy::default(),
            frontier_policy: FrontierPolicy::default(),
        }
    }
}

impl CrawlConfig {
    pub fn validate(&self) -> Result<()> {
        if self.node_budget == 0 {
            return Err(CrawlError::InvalidConfig(
                "node budget must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(CrawlError::InvalidConfig(
                "popularity batch size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Breadth-first expansion of a follow graph under a node budget.
///
/// Each expanded account promotes up to `fanout` of its most followed mutual
/// connections. Promotions join `discovered` and are queued as frontier edges;
/// the loop stops when the frontier runs dry or `discovered` reaches the
/// budget. The budget is checked between expansions, so the expansion that
/// crosses it still records all of its promotions.
pub struct FrontierCrawler<S> {
    source: S,
    config: CrawlConfig,
    progress_callback: Option<ProgressCallback>,
    root: Option<AccountId>,
    discovered: HashSet<AccountId>,
    frontier: VecDeque<Edge>,
    processed: Vec<Edge>,
    expanded: HashSet<AccountId>,
    expansions: usize,
}

impl<S: GraphDataSource> FrontierCrawler<S> {
    pub fn new(source: S, config: CrawlConfig) -> Self {
        Self {
            source,
            config,
            progress_callback: None,
            root: None,
            discovered: HashSet::new(),
            frontier: VecDeque::new(),
            processed: Vec::new(),
            expanded: HashSet::new(),
            expansions: 0,
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Resolve `handle` and crawl outward from it.
    ///
    /// Only resolution failures and exhausted retries are fatal; unreadable
    /// accounts become dead ends.
    pub async fn crawl(&mut self, handle: &str) -> Result<CrawlOutcome> {
        self.config.validate()?;
        info!(
            "Starting crawl of '{}' (budget {}, fanout {})",
            handle, self.config.node_budget, self.config.fanout
        );

        let notify = cooldown_notifier(self.progress_callback.clone());
        let root = self
            .config
            .retry
            .run(
                "account resolution",
                || self.source.resolve_account(handle),
                &notify,
            )
            .await
            .map_err(|e| match e {
                CrawlError::Provider(source) => CrawlError::Resolve {
                    handle: handle.to_string(),
                    source,
                },
                other => other,
            })?;

        info!("Resolved '{}' to account {}", handle, root);
        self.emit(CrawlEvent::Resolved {
            handle: handle.to_string(),
            root,
        });

        self.seed(root);
        while self.should_continue() {
            self.step().await?;
        }

        let outcome = self.take_outcome(root);
        info!(
            "Crawl complete. Discovered {} accounts in {} expansions",
            outcome.discovered.len(),
            outcome.expansions
        );
        self.emit(CrawlEvent::Finished {
            discovered: outcome.discovered.len(),
            expansions: outcome.expansions,
            pending: outcome.pending.len(),
        });
        Ok(outcome)
    }

    /// Reset crawl state around `root`, queued as the self-loop `(root, root)`.
    pub fn seed(&mut self, root: AccountId) {
        self.root = Some(root);
        self.discovered = HashSet::from([root]);
        self.frontier = VecDeque::from([Edge::new(root, root)]);
        self.processed = Vec::new();
        self.expanded = HashSet::new();
        self.expansions = 0;
    }

    pub fn should_continue(&self) -> bool {
        !self.frontier.is_empty() && self.discovered.len() < self.config.node_budget
    }

    /// Pop the head of the frontier and expand its target.
    ///
    /// Returns the consumed edge, or `None` when the frontier is empty.
    pub async fn step(&mut self) -> Result<Option<Edge>> {
        let Some(edge) = self.frontier.pop_front() else {
            return Ok(None);
        };

        if self.expanded.contains(&edge.target) {
            debug!("Account {} already expanded, recording edge only", edge.target);
            self.processed.push(edge);
            self.emit(CrawlEvent::Revisited { edge });
            return Ok(Some(edge));
        }

        self.emit(CrawlEvent::Expanding {
            edge,
            discovered: self.discovered.len(),
            pending: self.frontier.len(),
        });

        let promoted = self.expand(edge.target).await?;
        self.expanded.insert(edge.target);
        self.expansions += 1;

        for &account in &promoted {
            let is_new = self.discovered.insert(account);
            if !is_new && self.config.frontier_policy == FrontierPolicy::Deduplicate {
                continue;
            }
            self.frontier.push_back(Edge::new(edge.target, account));
        }
        self.processed.push(edge);

        debug!(
            "Expanded {}: promoted {:?}, {} accounts discovered",
            edge.target,
            promoted,
            self.discovered.len()
        );
        self.emit(CrawlEvent::Expanded {
            account: edge.target,
            promoted,
            discovered: self.discovered.len(),
        });

        Ok(Some(edge))
    }

    async fn expand(&self, account: AccountId) -> Result<Vec<AccountId>> {
        let notify = cooldown_notifier(self.progress_callback.clone());
        let retry = &self.config.retry;
        let cap = self.config.connection_cap;

        let friends = retry
            .drain(
                "friends listing",
                self.source.outbound_connections(account),
                cap,
                &notify,
            )
            .await?;
        if friends.forbidden {
            return Ok(self.dead_end(account));
        }

        let followers = retry
            .drain(
                "followers listing",
                self.source.inbound_connections(account),
                cap,
                &notify,
            )
            .await?;
        if followers.forbidden {
            return Ok(self.dead_end(account));
        }

        select_top_mutual(
            &self.source,
            retry,
            &friends.ids,
            &followers.ids,
            self.config.fanout,
            self.config.batch_size,
            &notify,
        )
        .await
    }

    fn dead_end(&self, account: AccountId) -> Vec<AccountId> {
        warn!("Account {} is private or unavailable, skipping", account);
        self.emit(CrawlEvent::DeadEnd { account });
        Vec::new()
    }

    fn take_outcome(&mut self, root: AccountId) -> CrawlOutcome {
        CrawlOutcome {
            root,
            discovered: std::mem::take(&mut self.discovered),
            processed: std::mem::take(&mut self.processed),
            pending: self.frontier.drain(..).collect(),
            expansions: self.expansions,
        }
    }

    fn emit(&self, event: CrawlEvent) {
        if let Some(ref callback) = self.progress_callback {
            callback(event);
        }
    }

    pub fn root(&self) -> Option<AccountId> {
        self.root
    }

    pub fn discovered(&self) -> &HashSet<AccountId> {
        &self.discovered
    }

    pub fn frontier(&self) -> impl Iterator<Item = &Edge> {
        self.frontier.iter()
    }

    pub fn processed(&self) -> &[Edge] {
        &self.processed
    }
}

fn cooldown_notifier(
    callback: Option<ProgressCallback>,
) -> impl Fn(&str, &ProviderError, Duration) + Send + Sync {
    move |operation: &str, error: &ProviderError, wait: Duration| {
        if let Some(ref callback) = callback {
            callback(CrawlEvent::CoolingDown {
                operation: operation.to_string(),
                reason: error.to_string(),
                wait,
            });
        }
    }
}
