//! On-disk dataset formats and their conversion into graphs.
//!
//! Three file shapes are accepted, in JSON or YAML:
//!
//! - a **network file** with one network's nodes and links,
//! - an **architecture file** listing architectures (layers and routes),
//! - a **bundle** carrying both at once.
//!
//! Node and link `type`/`class` strings are parsed leniently: unknown or
//! missing values fall back to STANDARD and INTERMEDIATE.

pub mod loader;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::graph::model::{Architecture, Graph, Network};
use crate::types::{make_node_id, Edge, EdgeKind, Node, NodeClass, NodeType};

pub use loader::{load_path, Dataset};

// ---------------------------------------------------------------------------
// Raw records
// ---------------------------------------------------------------------------

/// A node as written in a network file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RawNode {
    /// Explicit id. Defaults to `<node>-<network>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Network-local label.
    pub node: String,
    #[serde(default, rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub desc: String,
}

/// A link as written in a network file. Endpoints are node ids or
/// network-local labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RawLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    #[serde(default, rename = "type")]
    pub link_type: String,
}

/// One network's nodes and links.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NetworkFile {
    /// Network name. Defaults to the file stem or bundle entry id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default)]
    pub network_desc: String,
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub links: Vec<RawLink>,
}

/// The architecture descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ArchFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_arch: Option<u32>,
    pub architectures: Vec<Architecture>,
}

/// A network inside a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NetworkEntry {
    pub id: String,
    pub data: NetworkFile,
}

/// Architectures and networks in a single file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Bundle {
    #[serde(alias = "architecture")]
    pub architectures: Vec<Architecture>,
    pub networks: Vec<NetworkEntry>,
}

/// Any dataset file, told apart by its top-level keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum DataFile {
    Bundle(Bundle),
    Arch(ArchFile),
    Network(NetworkFile),
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

impl NetworkFile {
    /// Resolved network name: the file's own `network` field, else
    /// `fallback`.
    pub fn name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.network
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(fallback)
    }

    /// Build the network's graph. Depths are not assigned here.
    pub fn to_network(&self, name: &str) -> Network {
        let nodes: Vec<Node> = self.nodes.iter().map(|raw| raw_node(raw, name)).collect();
        let mut graph = Graph::new();
        for node in nodes {
            graph.add_node(node);
        }
        for raw in &self.links {
            let source = resolve_endpoint(&graph, &raw.source, name);
            let target = resolve_endpoint(&graph, &raw.target, name);
            let kind = EdgeKind::from_str_loose(&raw.link_type);
            let mut edge = Edge::new(&source, &target, kind);
            if let Some(id) = raw.id.as_deref().filter(|id| !id.is_empty()) {
                edge.id = id.to_string();
            }
            graph.add_edge(edge);
        }
        tracing::debug!(
            network = name,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            dropped = graph.diagnostics().len(),
            "network graph built"
        );
        Network {
            name: name.to_string(),
            description: self.network_desc.clone(),
            graph,
        }
    }
}

fn raw_node(raw: &RawNode, network: &str) -> Node {
    let mut node = Node::new(
        &raw.node,
        network,
        NodeType::from_str_loose(&raw.node_type),
        NodeClass::from_str_loose(&raw.class),
    );
    if let Some(id) = raw.id.as_deref().filter(|id| !id.is_empty()) {
        node.id = id.to_string();
    }
    node.description = raw.desc.clone();
    node
}

/// An endpoint that names an existing node id is kept; otherwise it is read
/// as a network-local label. Unresolvable endpoints come back qualified and
/// are dropped by the graph as dangling.
fn resolve_endpoint(graph: &Graph, endpoint: &str, network: &str) -> String {
    if graph.contains(endpoint) {
        endpoint.to_string()
    } else {
        make_node_id(endpoint, network)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
