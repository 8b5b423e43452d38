// Structural metrics over the discovered follow graph

use orbit_crawler::{AccountId, Edge};
use petgraph::algo::{connected_components, dijkstra};
use petgraph::graphmap::UnGraphMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Undirected view of the crawl: direction and multiplicity are dropped.
pub type SocialGraph = UnGraphMap<AccountId, ()>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SummaryError {
    #[error("no edges were recorded")]
    EmptyGraph,

    #[error("graph is not connected ({components} components)")]
    DisconnectedGraph { components: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub node_count: usize,
    pub edge_count: usize,
    /// Mean shortest-path length over ordered pairs of distinct nodes.
    pub average_distance: f64,
    pub diameter: usize,
}

/// Build the undirected graph. A self-loop contributes its node only;
/// repeated and reversed pairs collapse into one edge.
pub fn build_graph(edges: &[Edge]) -> SocialGraph {
    let mut graph = SocialGraph::new();
    for edge in edges {
        if edge.is_self_loop() {
            graph.add_node(edge.source);
        } else {
            graph.add_edge(edge.source, edge.target, ());
        }
    }
    graph
}

pub fn summarize(edges: &[Edge]) -> Result<GraphSummary, SummaryError> {
    if edges.is_empty() {
        return Err(SummaryError::EmptyGraph);
    }
    summarize_graph(&build_graph(edges))
}

pub fn summarize_graph(graph: &SocialGraph) -> Result<GraphSummary, SummaryError> {
    let node_count = graph.node_count();
    if node_count == 0 {
        return Err(SummaryError::EmptyGraph);
    }

    let components = connected_components(graph);
    if components > 1 {
        return Err(SummaryError::DisconnectedGraph { components });
    }

    let mut total: usize = 0;
    let mut diameter: usize = 0;
    for node in graph.nodes() {
        let distances = dijkstra(graph, node, None, |_| 1usize);
        for &distance in distances.values() {
            total += distance;
            diameter = diameter.max(distance);
        }
    }

    let pairs = node_count * (node_count - 1);
    let average_distance = if pairs == 0 {
        0.0
    } else {
        total as f64 / pairs as f64
    };

    debug!(
        "Summarized {} nodes and {} edges",
        node_count,
        graph.edge_count()
    );

    Ok(GraphSummary {
        node_count,
        edge_count: graph.edge_count(),
        average_distance,
        diameter,
    })
}
