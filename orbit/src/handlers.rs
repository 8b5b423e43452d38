use clap::ArgMatches;
use colored::Colorize;
use orbit_core::crawl::{CrawlOptions, CrawlRun, execute_crawl};
use orbit_core::report::{Artifacts, ReportFormat, expand_dir, generate_text_report};
use orbit_crawler::crawler::{
    DEFAULT_BATCH_SIZE, DEFAULT_CONNECTION_CAP, DEFAULT_FANOUT, DEFAULT_NODE_BUDGET,
};
use orbit_crawler::{
    CrawlConfig, FrontierPolicy, GraphDataSource, HttpGraphSource, RetryPolicy,
    SnapshotGraphSource,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;
use url::Url;

pub const TOKEN_ENV_VAR: &str = "ORBIT_BEARER_TOKEN";

/// Normalize a handle given on the command line, dropping a leading '@'
pub fn parse_handle(raw: &str) -> Result<String, String> {
    let handle = raw.trim().trim_start_matches('@');
    if handle.is_empty() {
        return Err(format!("Invalid handle '{}'", raw));
    }
    if handle.chars().any(char::is_whitespace) {
        return Err(format!("Handle '{}' must not contain whitespace", raw));
    }
    Ok(handle.to_string())
}

/// Explicit token first, then the environment
pub fn resolve_token(flag: Option<&String>) -> Option<String> {
    flag.cloned()
        .or_else(|| std::env::var(TOKEN_ENV_VAR).ok())
        .filter(|token| !token.trim().is_empty())
}

pub fn build_crawl_config(args: &ArgMatches) -> Result<CrawlConfig, String> {
    let cooldown = args.get_one::<u64>("cooldown").copied().unwrap_or(60);
    let mut retry = RetryPolicy::new(Duration::from_secs(cooldown));
    if let Some(max_retries) = args.get_one::<u32>("max-retries").copied() {
        retry = retry.with_max_attempts(max_retries);
    }

    let frontier_policy = if args.get_flag("dedupe-frontier") {
        FrontierPolicy::Deduplicate
    } else {
        FrontierPolicy::Duplicates
    };

    let config = CrawlConfig {
        node_budget: args
            .get_one::<usize>("node-budget")
            .copied()
            .unwrap_or(DEFAULT_NODE_BUDGET),
        fanout: args
            .get_one::<usize>("fanout")
            .copied()
            .unwrap_or(DEFAULT_FANOUT),
        connection_cap: args
            .get_one::<usize>("connection-cap")
            .copied()
            .unwrap_or(DEFAULT_CONNECTION_CAP),
        batch_size: args
            .get_one::<usize>("batch-size")
            .copied()
            .unwrap_or(DEFAULT_BATCH_SIZE),
        retry,
        frontier_policy,
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

pub fn report_format(args: &ArgMatches) -> ReportFormat {
    args.get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text)
}

pub fn output_dir(args: &ArgMatches) -> PathBuf {
    args.get_one::<String>("output")
        .map(|dir| expand_dir(dir))
        .unwrap_or_else(|| PathBuf::from("."))
}

async fn crawl_and_write<S: GraphDataSource>(
    source: S,
    options: CrawlOptions,
    dir: &Path,
    format: ReportFormat,
) -> Result<(CrawlRun, Artifacts), String> {
    let phase_error = |e: orbit_core::crawl::RunError| format!("{} failed: {}", e.phase(), e);

    let run = execute_crawl(source, options, None)
        .await
        .map_err(phase_error)?;
    let artifacts = run.write(dir, format).map_err(phase_error)?;
    Ok((run, artifacts))
}

/// Run the crawl described by the `crawl` subcommand and write its artifacts
pub async fn run_crawl(
    sub_matches: &ArgMatches,
    show_progress_bars: bool,
) -> Result<(CrawlRun, Artifacts), String> {
    let raw_handle = sub_matches
        .get_one::<String>("user")
        .ok_or_else(|| "A handle is required".to_string())?;
    let handle = parse_handle(raw_handle)?;
    let config = build_crawl_config(sub_matches)?;
    let format = report_format(sub_matches);
    let dir = output_dir(sub_matches);

    let options = CrawlOptions {
        handle,
        config,
        show_progress_bars,
    };

    if let Some(snapshot) = sub_matches.get_one::<PathBuf>("snapshot") {
        let source = SnapshotGraphSource::from_path(snapshot).map_err(|e| format!("{:#}", e))?;
        crawl_and_write(source, options, &dir, format).await
    } else {
        let api_base = sub_matches
            .get_one::<Url>("api-base")
            .map(|url| url.as_str().to_string())
            .unwrap_or_else(|| orbit_crawler::http::DEFAULT_API_BASE.to_string());
        let mut source = HttpGraphSource::new(&api_base)
            .map_err(|e| e.to_string())?
            .with_page_size(options.config.connection_cap);
        match resolve_token(sub_matches.get_one::<String>("token")) {
            Some(token) => source = source.with_token(token),
            None => tracing::warn!("No bearer token given; requests are unauthenticated"),
        }
        crawl_and_write(source, options, &dir, format).await
    }
}

pub async fn handle_crawl(sub_matches: &ArgMatches) {
    let level = if sub_matches.get_flag("verbose") {
        Level::DEBUG
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let handle = sub_matches
        .get_one::<String>("user")
        .map(String::as_str)
        .unwrap_or_default();
    let source = match sub_matches.get_one::<PathBuf>("snapshot") {
        Some(path) => format!("snapshot {}", path.display()),
        None => sub_matches
            .get_one::<Url>("api-base")
            .map(|url| url.to_string())
            .unwrap_or_default(),
    };

    println!("\n🛰  Crawling @{}", handle.trim_start_matches('@'));
    println!(
        "Node budget: {}",
        sub_matches.get_one::<usize>("node-budget").unwrap_or(&DEFAULT_NODE_BUDGET)
    );
    println!(
        "Fanout: {}",
        sub_matches.get_one::<usize>("fanout").unwrap_or(&DEFAULT_FANOUT)
    );
    println!("Source: {}\n", source);

    let (run, artifacts) = match run_crawl(sub_matches, true).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    println!("\n{}\n", "✓ Crawl complete!".green().bold());
    print!("{}", generate_text_report(&run.report_data()));
    println!();
    println!("Report: {}", artifacts.report.display());
    println!("Graph:  {}", artifacts.dot.display());
    println!("Image:  {}", artifacts.svg.display());
}
