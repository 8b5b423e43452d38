use crate::report::{Artifacts, ReportData, ReportFormat, write_artifacts};
use crate::summary::{GraphSummary, SummaryError, summarize};
use indicatif::{ProgressBar, ProgressStyle};
use orbit_crawler::{
    CrawlConfig, CrawlError, CrawlEvent, CrawlOutcome, FrontierCrawler, GraphDataSource,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub handle: String,
    pub config: CrawlConfig,
    pub show_progress_bars: bool,
}

/// Callback for reporting crawl progress as plain messages
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Failure of a run, tagged with the phase it happened in.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Resolution(CrawlError),

    #[error(transparent)]
    Crawl(CrawlError),

    #[error(transparent)]
    Summary(#[from] SummaryError),

    #[error("failed to write artifacts: {0}")]
    Output(#[from] std::io::Error),
}

impl RunError {
    pub fn phase(&self) -> &'static str {
        match self {
            RunError::Resolution(_) => "Resolution",
            RunError::Crawl(_) => "Crawl",
            RunError::Summary(_) => "Summary",
            RunError::Output(_) => "Output",
        }
    }
}

impl From<CrawlError> for RunError {
    fn from(error: CrawlError) -> Self {
        if matches!(error, CrawlError::Resolve { .. }) {
            RunError::Resolution(error)
        } else {
            RunError::Crawl(error)
        }
    }
}

/// A finished crawl and the metrics computed over it.
#[derive(Debug, Clone)]
pub struct CrawlRun {
    pub handle: String,
    pub outcome: CrawlOutcome,
    pub summary: GraphSummary,
}

impl CrawlRun {
    pub fn report_data(&self) -> ReportData {
        ReportData::new(&self.handle, &self.outcome, self.summary.clone())
    }

    pub fn write(&self, dir: &Path, format: ReportFormat) -> Result<Artifacts, RunError> {
        Ok(write_artifacts(dir, &self.report_data(), format)?)
    }
}

/// Human readable line for a crawler event, if it is worth showing.
pub fn describe_event(event: &CrawlEvent) -> Option<String> {
    match event {
        CrawlEvent::Resolved { handle, root } => {
            Some(format!("Resolved @{} to account {}", handle, root))
        }
        CrawlEvent::Expanding {
            edge,
            discovered,
            pending,
        } => Some(format!(
            "Expanding {} ({} discovered, {} queued)",
            edge.target, discovered, pending
        )),
        CrawlEvent::CoolingDown {
            operation,
            reason,
            wait,
        } => Some(format!(
            "[!] {} paused ({}), waiting {}s",
            operation,
            reason,
            wait.as_secs()
        )),
        CrawlEvent::DeadEnd { account } => {
            Some(format!("[!] Listings of {} are not readable, skipping", account))
        }
        CrawlEvent::Expanded { .. } | CrawlEvent::Revisited { .. } => None,
        CrawlEvent::Finished {
            discovered,
            expansions,
            ..
        } => Some(format!(
            "Crawl complete! {} accounts discovered in {} expansions",
            discovered, expansions
        )),
    }
}

/// Execute a crawl and summarize the resulting graph
pub async fn execute_crawl<S: GraphDataSource>(
    source: S,
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<CrawlRun, RunError> {
    let CrawlOptions {
        handle,
        config,
        show_progress_bars,
    } = options;

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Resolving @{}...", handle));
        Some(Arc::new(pb))
    } else {
        None
    };

    let pb_clone = progress_bar.clone();
    let callback_clone = progress_callback.clone();
    let crawler_callback: orbit_crawler::ProgressCallback = Arc::new(move |event: CrawlEvent| {
        let Some(message) = describe_event(&event) else {
            return;
        };

        if let Some(ref pb) = pb_clone {
            match event {
                // Waits can last minutes, so keep them on screen
                CrawlEvent::CoolingDown { .. } | CrawlEvent::DeadEnd { .. } => {
                    pb.println(&message)
                }
                _ => pb.set_message(message.clone()),
            }
        }
        if let Some(ref callback) = callback_clone {
            callback(message);
        }
    });

    let mut crawler = FrontierCrawler::new(source, config).with_progress_callback(crawler_callback);
    let result = crawler.crawl(&handle).await;

    if let Some(ref pb) = progress_bar {
        match result {
            Ok(ref outcome) => pb.finish_with_message(format!(
                "Crawl complete! {} accounts discovered",
                outcome.discovered.len()
            )),
            Err(_) => pb.finish_and_clear(),
        }
    }

    let outcome = result?;
    let summary = summarize(&outcome.edges())?;

    Ok(CrawlRun {
        handle,
        outcome,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbit_crawler::{AccountId, Edge};

    #[test]
    fn test_resolve_errors_belong_to_resolution_phase() {
        let error = RunError::from(CrawlError::Resolve {
            handle: "ghost".to_string(),
            source: orbit_crawler::ProviderError::NotFound("ghost".to_string()),
        });
        assert_eq!(error.phase(), "Resolution");

        let error = RunError::from(CrawlError::InvalidConfig("budget".to_string()));
        assert_eq!(error.phase(), "Crawl");
    }

    #[test]
    fn test_cooldowns_are_described_with_wait() {
        let message = describe_event(&CrawlEvent::CoolingDown {
            operation: "friends listing".to_string(),
            reason: "rate limited".to_string(),
            wait: Duration::from_secs(60),
        });
        assert!(message.unwrap().contains("waiting 60s"));
    }

    #[test]
    fn test_revisits_are_silent() {
        let event = CrawlEvent::Revisited {
            edge: Edge::new(AccountId(1), AccountId(2)),
        };
        assert!(describe_event(&event).is_none());
    }
}
