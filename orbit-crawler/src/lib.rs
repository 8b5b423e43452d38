pub mod crawler;
pub mod error;
pub mod http;
pub mod result;
pub mod retry;
pub mod select;
pub mod snapshot;
pub mod source;

pub use crawler::{CrawlConfig, CrawlEvent, FrontierCrawler, FrontierPolicy, ProgressCallback};
pub use error::{CrawlError, ProviderError};
pub use http::HttpGraphSource;
pub use result::{CrawlOutcome, Edge};
pub use retry::RetryPolicy;
pub use snapshot::{Snapshot, SnapshotAccount, SnapshotGraphSource};
pub use source::{AccountId, ConnectionStream, GraphDataSource, PopularityRecord};
