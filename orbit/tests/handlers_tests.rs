use orbit::commands::command_argument_builder;
use orbit::handlers::*;
use orbit_core::report::ReportFormat;
use orbit_crawler::FrontierPolicy;
use std::io::Write;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn crawl_matches(args: &[&str]) -> clap::ArgMatches {
    let mut argv = vec!["orbit", "crawl"];
    argv.extend_from_slice(args);
    command_argument_builder()
        .try_get_matches_from(argv)
        .unwrap()
        .subcommand_matches("crawl")
        .unwrap()
        .clone()
}

const SNAPSHOT: &str = r#"{
  "accounts": [
    {"id": 1, "handle": "root", "followers_count": 1, "friends": [2, 3], "followers": [2, 3]},
    {"id": 2, "handle": "two", "followers_count": 20, "friends": [1], "followers": [1]},
    {"id": 3, "handle": "three", "followers_count": 30, "friends": [1], "followers": [1]}
  ]
}"#;

#[test]
fn test_parse_handle_strips_at_sign() {
    assert_eq!(parse_handle("@POTUS"), Ok("POTUS".to_string()));
    assert_eq!(parse_handle("  potus "), Ok("potus".to_string()));
}

#[test]
fn test_parse_handle_rejects_empty_and_spaced() {
    assert!(parse_handle("@").is_err());
    assert!(parse_handle("   ").is_err());
    assert!(parse_handle("two words").is_err());
}

#[test]
fn test_resolve_token_prefers_flag() {
    let flag = "from-flag".to_string();
    assert_eq!(resolve_token(Some(&flag)), Some("from-flag".to_string()));
}

#[test]
fn test_build_crawl_config_defaults() {
    let matches = crawl_matches(&["-u", "root"]);
    let config = build_crawl_config(&matches).unwrap();

    assert_eq!(config.node_budget, 100);
    assert_eq!(config.fanout, 5);
    assert_eq!(config.connection_cap, 5000);
    assert_eq!(config.batch_size, 100);
    assert_eq!(config.retry.cooldown, Duration::from_secs(60));
    assert_eq!(config.retry.max_attempts, None);
    assert_eq!(config.frontier_policy, FrontierPolicy::Duplicates);
}

#[test]
fn test_build_crawl_config_custom_values() {
    let matches = crawl_matches(&[
        "-u",
        "root",
        "--node-budget",
        "25",
        "--fanout",
        "3",
        "--connection-cap",
        "200",
        "--batch-size",
        "50",
        "--cooldown",
        "5",
        "--max-retries",
        "4",
        "--dedupe-frontier",
    ]);
    let config = build_crawl_config(&matches).unwrap();

    assert_eq!(config.node_budget, 25);
    assert_eq!(config.fanout, 3);
    assert_eq!(config.connection_cap, 200);
    assert_eq!(config.batch_size, 50);
    assert_eq!(config.retry.cooldown, Duration::from_secs(5));
    assert_eq!(config.retry.max_attempts, Some(4));
    assert_eq!(config.frontier_policy, FrontierPolicy::Deduplicate);
}

#[test]
fn test_build_crawl_config_rejects_zero_budget() {
    let matches = crawl_matches(&["-u", "root", "--node-budget", "0"]);
    assert!(build_crawl_config(&matches).is_err());
}

#[test]
fn test_snapshot_conflicts_with_api_base() {
    let result = command_argument_builder().try_get_matches_from([
        "orbit",
        "crawl",
        "-u",
        "root",
        "--snapshot",
        "graph.json",
        "--api-base",
        "http://localhost:8080",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_crawl_requires_user() {
    let result = command_argument_builder().try_get_matches_from(["orbit", "crawl"]);
    assert!(result.is_err());
}

#[test]
fn test_report_format_flag() {
    let matches = crawl_matches(&["-u", "root", "-f", "json"]);
    assert_eq!(report_format(&matches), ReportFormat::Json);

    let matches = crawl_matches(&["-u", "root"]);
    assert_eq!(report_format(&matches), ReportFormat::Text);
}

#[tokio::test]
async fn test_run_crawl_from_snapshot() -> Result<(), Box<dyn std::error::Error>> {
    let mut snapshot = NamedTempFile::new()?;
    write!(snapshot, "{}", SNAPSHOT)?;
    let out_dir = TempDir::new()?;

    let snapshot_path = snapshot.path().to_string_lossy().to_string();
    let out_path = out_dir.path().to_string_lossy().to_string();
    let matches = crawl_matches(&[
        "-u",
        "@root",
        "--snapshot",
        &snapshot_path,
        "-o",
        &out_path,
        "--cooldown",
        "0",
    ]);

    let (run, artifacts) = run_crawl(&matches, false).await?;
    assert_eq!(run.summary.node_count, 3);
    assert_eq!(run.summary.edge_count, 2);
    assert_eq!(artifacts.report, out_dir.path().join("root.txt"));

    let report = std::fs::read_to_string(&artifacts.report)?;
    assert!(report.starts_with("Total Nodes = 3\n"));
    Ok(())
}

#[tokio::test]
async fn test_run_crawl_unknown_handle_names_phase() {
    let mut snapshot = NamedTempFile::new().unwrap();
    write!(snapshot, "{}", SNAPSHOT).unwrap();
    let snapshot_path = snapshot.path().to_string_lossy().to_string();
    let out_dir = TempDir::new().unwrap();
    let out_path = out_dir.path().to_string_lossy().to_string();

    let matches = crawl_matches(&["-u", "ghost", "--snapshot", &snapshot_path, "-o", &out_path]);
    let error = run_crawl(&matches, false).await.unwrap_err();
    assert!(error.starts_with("Resolution failed"));
}

#[tokio::test]
async fn test_run_crawl_missing_snapshot() {
    let matches = crawl_matches(&["-u", "root", "--snapshot", "/nonexistent/graph.json"]);
    let error = run_crawl(&matches, false).await.unwrap_err();
    assert!(error.contains("Failed to read snapshot"));
}

#[tokio::test]
async fn test_http_pages_by_connection_cap() -> Result<(), Box<dyn std::error::Error>> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/show.json"))
        .and(query_param("screen_name", "root"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"id": 1, "screen_name": "root"})),
        )
        .mount(&mock_server)
        .await;
    for listing in ["/friends/ids.json", "/followers/ids.json"] {
        Mock::given(method("GET"))
            .and(path(listing))
            .and(query_param("user_id", "1"))
            .and(query_param("count", "200"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"ids": [2], "next_cursor": 0})),
            )
            .with_priority(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path(listing))
            .and(query_param("count", "200"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"ids": [], "next_cursor": 0})),
            )
            .mount(&mock_server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/users/lookup.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([{"id": 2, "followers_count": 20}])),
        )
        .mount(&mock_server)
        .await;

    let out_dir = TempDir::new()?;
    let out_path = out_dir.path().to_string_lossy().to_string();
    let api_base = mock_server.uri();
    let matches = crawl_matches(&[
        "-u",
        "root",
        "--api-base",
        &api_base,
        "--token",
        "test-token",
        "--connection-cap",
        "200",
        "--cooldown",
        "0",
        "-o",
        &out_path,
    ]);

    let (run, _) = run_crawl(&matches, false).await?;
    assert_eq!(run.summary.node_count, 2);
    assert_eq!(run.summary.edge_count, 1);
    Ok(())
}
