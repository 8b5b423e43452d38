// Graph rendering: Graphviz DOT and a standalone SVG

use crate::summary::SocialGraph;
use orbit_crawler::AccountId;
use petgraph::dot::{Config, Dot};
use petgraph::visit::NodeRef;
use std::f64::consts::PI;

const NODE_RADIUS: f64 = 10.0;
const MARGIN: f64 = 40.0;

pub fn render_dot(graph: &SocialGraph, root: AccountId) -> String {
    let node_attributes = |_, node: (AccountId, &AccountId)| {
        let id = node.id();
        if id == root {
            format!("label = \"{}\", style = filled, fillcolor = gold", id)
        } else {
            format!("label = \"{}\"", id)
        }
    };
    let dot = Dot::with_attr_getters(
        graph,
        &[Config::EdgeNoLabel, Config::NodeNoLabel],
        &|_, _| String::new(),
        &node_attributes,
    );
    format!("{:?}", dot)
}

/// Nodes sorted by id, placed clockwise on a circle starting at twelve o'clock.
fn circular_layout(graph: &SocialGraph, radius: f64) -> Vec<(AccountId, f64, f64)> {
    let mut nodes: Vec<AccountId> = graph.nodes().collect();
    nodes.sort();

    let center = radius + MARGIN;
    let count = nodes.len().max(1) as f64;
    nodes
        .into_iter()
        .enumerate()
        .map(|(i, id)| {
            let angle = 2.0 * PI * i as f64 / count - PI / 2.0;
            (id, center + radius * angle.cos(), center + radius * angle.sin())
        })
        .collect()
}

pub fn render_svg(graph: &SocialGraph, root: AccountId) -> String {
    let radius = (graph.node_count() as f64 * 12.0).max(120.0);
    let size = 2.0 * (radius + MARGIN);
    let layout = circular_layout(graph, radius);
    let position = |id: AccountId| {
        layout
            .iter()
            .find(|(node, _, _)| *node == id)
            .map(|&(_, x, y)| (x, y))
    };

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{size:.0}\" height=\"{size:.0}\" viewBox=\"0 0 {size:.0} {size:.0}\">\n"
    ));
    svg.push_str("  <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");

    let mut edges: Vec<(AccountId, AccountId)> = graph
        .all_edges()
        .map(|(a, b, _)| if a <= b { (a, b) } else { (b, a) })
        .collect();
    edges.sort();
    for (a, b) in edges {
        if let (Some((x1, y1)), Some((x2, y2))) = (position(a), position(b)) {
            svg.push_str(&format!(
                "  <line x1=\"{x1:.1}\" y1=\"{y1:.1}\" x2=\"{x2:.1}\" y2=\"{y2:.1}\" stroke=\"#999\" stroke-width=\"1\"/>\n"
            ));
        }
    }

    for &(id, x, y) in &layout {
        let fill = if id == root { "gold" } else { "steelblue" };
        svg.push_str(&format!(
            "  <circle cx=\"{x:.1}\" cy=\"{y:.1}\" r=\"{NODE_RADIUS}\" fill=\"{fill}\"><title>{id}</title></circle>\n"
        ));
        svg.push_str(&format!(
            "  <text x=\"{:.1}\" y=\"{:.1}\" font-size=\"9\" font-family=\"monospace\">{}</text>\n",
            x + NODE_RADIUS + 2.0,
            y + 3.0,
            id
        ));
    }

    svg.push_str("</svg>\n");
    svg
}
