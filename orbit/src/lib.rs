pub mod commands;
pub mod handlers;

pub use handlers::{build_crawl_config, parse_handle, resolve_token, run_crawl};
