// Report generation and artifact output

use crate::render::{render_dot, render_svg};
use crate::summary::{GraphSummary, build_graph};
use orbit_crawler::{AccountId, CrawlOutcome, Edge};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    pub handle: String,
    pub root: AccountId,
    pub summary: GraphSummary,
    pub expansions: usize,
    pub discovered: usize,
    /// Recorded edges without the seed self-loop.
    pub edges: Vec<Edge>,
    pub generated_at: String,
}

impl ReportData {
    pub fn new(handle: &str, outcome: &CrawlOutcome, summary: GraphSummary) -> Self {
        Self {
            handle: handle.to_string(),
            root: outcome.root,
            summary,
            expansions: outcome.expansions,
            discovered: outcome.discovered.len(),
            edges: outcome.graph_edges(),
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// The four summary lines, one metric per line.
pub fn generate_text_report(data: &ReportData) -> String {
    let mut report = String::new();
    report.push_str(&format!("Total Nodes = {}\n", data.summary.node_count));
    report.push_str(&format!("Total Edges = {}\n", data.summary.edge_count));
    report.push_str(&format!(
        "Average Distance = {:?}\n",
        data.summary.average_distance
    ));
    report.push_str(&format!("Diameter = {}\n", data.summary.diameter));
    report
}

pub fn generate_json_report(data: &ReportData) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "Orbit",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": data.generated_at,
                "format": "json"
            },
            "crawl": {
                "handle": data.handle,
                "root": data.root,
                "expansions": data.expansions,
                "discovered": data.discovered
            },
            "summary": data.summary,
            "edges": data.edges
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Paths written by [`write_artifacts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub report: PathBuf,
    pub dot: PathBuf,
    pub svg: PathBuf,
}

/// Expand `~` in a user supplied directory.
pub fn expand_dir(dir: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(dir).as_ref())
}

/// Keep handles usable as file names.
fn file_stem(handle: &str) -> String {
    let stem: String = handle
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "graph".to_string()
    } else {
        stem
    }
}

/// Write the report plus DOT and SVG renderings into `dir`, creating it if needed.
pub fn write_artifacts(
    dir: &Path,
    data: &ReportData,
    format: ReportFormat,
) -> std::io::Result<Artifacts> {
    std::fs::create_dir_all(dir)?;

    let stem = file_stem(&data.handle);
    let mut graph = build_graph(&data.edges);
    graph.add_node(data.root);
    let artifacts = Artifacts {
        report: dir.join(format!("{}.{}", stem, format.extension())),
        dot: dir.join(format!("{}.dot", stem)),
        svg: dir.join(format!("{}.svg", stem)),
    };

    let content = match format {
        ReportFormat::Text => generate_text_report(data),
        ReportFormat::Json => generate_json_report(data).map_err(std::io::Error::other)?,
    };
    save_report(&content, &artifacts.report)?;
    save_report(&render_dot(&graph, data.root), &artifacts.dot)?;
    save_report(&render_svg(&graph, data.root), &artifacts.svg)?;

    info!("Wrote artifacts to {}", dir.display());
    Ok(artifacts)
}
