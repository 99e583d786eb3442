//! Declarative subzone-graph description parser.
//!
//! Accepts TOML of the form:
//!
//! ```toml
//! [nodes.pharmacy]
//! zone = "commercial"
//! anchor = [12, 8]
//! threat_level = 0.1
//! visibility = 0.8
//! shelter = true
//! resource_nodes = ["medical_supplies"]
//!
//! [nodes.pharmacy.connections]
//! commercial_strip = 3.0
//! ```
//!
//! Missing back-edges are auto-inserted with the same weight, so authors
//! only have to declare each edge once.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::error::{GraphError, GraphResult};
use crate::graph::SubzoneGraph;
use crate::node::SubzoneNode;

// ── Raw description structs ───────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawGraph {
    #[serde(default)]
    nodes: BTreeMap<String, RawNode>,
}

#[derive(Deserialize)]
struct RawNode {
    #[serde(default)]
    zone: String,
    #[serde(default)]
    anchor: [i32; 2],
    #[serde(default)]
    threat_level: f64,
    #[serde(default = "default_visibility")]
    visibility: f64,
    #[serde(default)]
    shelter: bool,
    #[serde(default)]
    resource_nodes: Vec<String>,
    #[serde(default)]
    connections: BTreeMap<String, f64>,
}

fn default_visibility() -> f64 {
    1.0
}

// ── Loader ────────────────────────────────────────────────────────────────────

impl SubzoneGraph {
    /// Parse a declarative graph description.
    ///
    /// Node insertion order (and therefore routing tie-break order) is the
    /// lexicographic order of node ids in the description — stable across
    /// loads of the same text.
    pub fn from_text(text: &str) -> GraphResult<SubzoneGraph> {
        let raw: RawGraph =
            toml::from_str(text).map_err(|e| GraphError::Parse(e.to_string()))?;

        let mut graph = SubzoneGraph::new();
        for (id, rn) in raw.nodes {
            let mut node = SubzoneNode::new(&id, &rn.zone, (rn.anchor[0], rn.anchor[1]))
                .threat(rn.threat_level)
                .visibility(rn.visibility)
                .shelter(rn.shelter);
            node.resource_tags = rn.resource_nodes.into_iter().collect::<BTreeSet<_>>();
            node.connections = rn.connections;
            graph.add_node(node);
        }

        // Second pass: ensure every declared edge has a back-edge.
        let mut back_edges: Vec<(String, String, f64)> = Vec::new();
        for node in graph.iter() {
            for (neighbor, &tt) in &node.connections {
                match graph.node(neighbor) {
                    Some(nb) if !nb.connections.contains_key(&node.id) => {
                        back_edges.push((neighbor.clone(), node.id.clone(), tt));
                    }
                    _ => {}
                }
            }
        }
        for (from, to, tt) in back_edges {
            if let Some(node) = graph.node_mut(&from) {
                node.connections.insert(to, tt);
            }
        }

        Ok(graph)
    }
}
