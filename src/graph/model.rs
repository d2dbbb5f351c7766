//! In-memory graph model: per-network graphs and combined architecture graphs.
//!
//! A [`Graph`] owns its nodes and edges in insertion order and keeps
//! id → index maps plus incoming/outgoing adjacency for O(1) neighbour
//! lookups. Construction never fails: duplicate nodes, dangling or duplicate
//! edges and unresolvable routes are dropped and recorded as [`Diagnostic`]s.

use std::collections::{BTreeMap, HashMap};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::{make_node_id, Edge, EdgeKind, Node};

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// A recoverable problem found while building a graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    DuplicateNode { id: String },
    DanglingEdge { edge: String, missing: String },
    DuplicateEdge { edge: String },
    MissingNetwork { network: String },
    UnknownRouteNetwork { route: String, network: String },
    MissingRouteEndpoint { route: String, node: String },
    RouteAlreadyConnected { route: String },
}

impl Diagnostic {
    /// Routes that duplicate an existing connection are expected in real
    /// datasets and not worth a warning.
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::RouteAlreadyConnected { .. })
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateNode { id } => write!(f, "duplicate node '{id}' dropped"),
            Self::DanglingEdge { edge, missing } => {
                write!(f, "edge '{edge}' dropped: node '{missing}' does not exist")
            }
            Self::DuplicateEdge { edge } => write!(f, "duplicate edge '{edge}' dropped"),
            Self::MissingNetwork { network } => {
                write!(f, "network '{network}' is not loaded, left out of the combined graph")
            }
            Self::UnknownRouteNetwork { route, network } => write!(
                f,
                "route {route} dropped: network '{network}' is not part of the architecture"
            ),
            Self::MissingRouteEndpoint { route, node } => {
                write!(f, "route {route} dropped: node '{node}' does not exist")
            }
            Self::RouteAlreadyConnected { route } => {
                write!(f, "route {route} skipped: endpoints already connected")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// A directed graph of [`Node`]s and [`Edge`]s.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    node_index: HashMap<String, usize>,
    edge_index: HashMap<String, usize>,
    outgoing: HashMap<String, Vec<usize>>,
    incoming: HashMap<String, Vec<usize>>,
    diagnostics: Vec<Diagnostic>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from node and edge lists. Nodes are added first so edge
    /// order in the input does not matter.
    pub fn build(
        nodes: impl IntoIterator<Item = Node>,
        edges: impl IntoIterator<Item = Edge>,
    ) -> Self {
        let mut graph = Self::new();
        for node in nodes {
            graph.add_node(node);
        }
        for edge in edges {
            graph.add_edge(edge);
        }
        graph
    }

    /// Add a node. Returns `false` (and records a diagnostic) if the id is
    /// already taken.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.node_index.contains_key(&node.id) {
            self.push_diagnostic(Diagnostic::DuplicateNode { id: node.id });
            return false;
        }
        self.node_index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    /// Add an edge. Returns `false` (and records a diagnostic) if an endpoint
    /// is missing or the same (source, target, kind) edge already exists.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        for endpoint in [&edge.source, &edge.target] {
            if !self.node_index.contains_key(endpoint) {
                let missing = endpoint.clone();
                self.push_diagnostic(Diagnostic::DanglingEdge {
                    edge: edge.id,
                    missing,
                });
                return false;
            }
        }

        let duplicate = self.edge_index.contains_key(&edge.id)
            || self
                .outgoing(&edge.source)
                .any(|e| e.target == edge.target && e.kind == edge.kind);
        if duplicate {
            self.push_diagnostic(Diagnostic::DuplicateEdge { edge: edge.id });
            return false;
        }

        let idx = self.edges.len();
        self.edge_index.insert(edge.id.clone(), idx);
        self.outgoing.entry(edge.source.clone()).or_default().push(idx);
        self.incoming.entry(edge.target.clone()).or_default().push(idx);
        self.edges.push(edge);
        true
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edge_index.get(id).map(|&i| &self.edges[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All edges leaving `id`, in insertion order.
    pub fn outgoing<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.outgoing
            .get(id)
            .into_iter()
            .flatten()
            .map(move |&i| &self.edges[i])
    }

    /// All edges entering `id`, in insertion order.
    pub fn incoming<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.incoming
            .get(id)
            .into_iter()
            .flatten()
            .map(move |&i| &self.edges[i])
    }

    /// STANDARD and SUPPRESS edges leaving `id`.
    pub fn semantic_outgoing<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.outgoing(id).filter(|e| e.kind.is_semantic())
    }

    /// STANDARD and SUPPRESS edges entering `id`.
    pub fn semantic_incoming<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.incoming(id).filter(|e| e.kind.is_semantic())
    }

    /// Whether an edge accepted by `accept` joins `a` and `b` in either
    /// direction.
    pub fn connected(&self, a: &str, b: &str, accept: impl Fn(EdgeKind) -> bool) -> bool {
        self.outgoing(a)
            .chain(self.incoming(a))
            .any(|e| accept(e.kind) && e.connects(a, b))
    }

    /// Overwrite node depths. Nodes missing from `depths` keep their value.
    pub fn set_depths(&mut self, depths: &HashMap<String, u32>) {
        for node in &mut self.nodes {
            if let Some(&depth) = depths.get(&node.id) {
                node.depth = depth;
            }
        }
    }

    /// Largest node depth, or 0 for an empty graph.
    pub fn max_depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub(crate) fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_benign() {
            tracing::debug!("{diagnostic}");
        } else {
            tracing::warn!("{diagnostic}");
        }
        self.diagnostics.push(diagnostic);
    }
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// One named sub-graph of an architecture.
#[derive(Debug, Clone)]
pub struct Network {
    pub name: String,
    pub description: String,
    pub graph: Graph,
}

// ---------------------------------------------------------------------------
// Architecture
// ---------------------------------------------------------------------------

/// Placement of a network in an architecture layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LayerAssignment {
    pub layer: u32,
    pub network: String,
}

/// A declared cross-network connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Route {
    pub source_net: String,
    pub source_node: String,
    pub dest_net: String,
    pub dest_node: String,
}

impl Route {
    pub fn source_id(&self) -> String {
        make_node_id(&self.source_node, &self.source_net)
    }

    pub fn dest_id(&self) -> String {
        make_node_id(&self.dest_node, &self.dest_net)
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.source_net, self.source_node, self.dest_net, self.dest_node
        )
    }
}

/// A composition of networks into ordered layers plus routes between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Architecture {
    #[serde(rename = "arch_id", default)]
    pub id: u32,
    #[serde(rename = "arch_name")]
    pub name: String,
    #[serde(rename = "arch_num_layers", default)]
    pub num_layers: u32,
    pub layers: Vec<LayerAssignment>,
    #[serde(default)]
    pub routes: Vec<Route>,
}

impl Architecture {
    /// Member networks in layer order, without duplicates.
    pub fn networks(&self) -> Vec<&str> {
        let mut layers: Vec<&LayerAssignment> = self.layers.iter().collect();
        layers.sort_by_key(|l| l.layer);
        let mut seen = Vec::new();
        for assignment in layers {
            if !seen.contains(&assignment.network.as_str()) {
                seen.push(assignment.network.as_str());
            }
        }
        seen
    }

    /// Layer of the first assignment of `network`.
    pub fn layer_of(&self, network: &str) -> Option<u32> {
        self.layers
            .iter()
            .find(|l| l.network == network)
            .map(|l| l.layer)
    }
}

// ---------------------------------------------------------------------------
// Combined graph
// ---------------------------------------------------------------------------

/// Merge the member networks of `architecture` into one graph and join them
/// with ARCHITECTURE edges, one per resolvable route.
///
/// Node depths are carried over from the per-network graphs unchanged.
pub fn combine(architecture: &Architecture, networks: &BTreeMap<String, Network>) -> Graph {
    let members = architecture.networks();
    let mut graph = Graph::new();

    let present: Vec<&Network> = members
        .iter()
        .filter_map(|name| match networks.get(*name) {
            Some(network) => Some(network),
            None => {
                graph.push_diagnostic(Diagnostic::MissingNetwork {
                    network: (*name).to_string(),
                });
                None
            }
        })
        .collect();

    for network in &present {
        for node in network.graph.nodes() {
            graph.add_node(node.clone());
        }
    }
    for network in &present {
        for edge in network.graph.edges() {
            graph.add_edge(edge.clone());
        }
    }

    for route in &architecture.routes {
        let label = route.to_string();
        if let Some(network) = [&route.source_net, &route.dest_net]
            .into_iter()
            .find(|n| !members.contains(&n.as_str()))
        {
            graph.push_diagnostic(Diagnostic::UnknownRouteNetwork {
                route: label,
                network: network.clone(),
            });
            continue;
        }

        let source = route.source_id();
        let dest = route.dest_id();
        if let Some(missing) = [&source, &dest].into_iter().find(|id| !graph.contains(id)) {
            graph.push_diagnostic(Diagnostic::MissingRouteEndpoint {
                route: label,
                node: missing.clone(),
            });
            continue;
        }

        if source == dest || graph.connected(&source, &dest, |_| true) {
            graph.push_diagnostic(Diagnostic::RouteAlreadyConnected { route: label });
            continue;
        }

        graph.add_edge(Edge::new(&source, &dest, EdgeKind::Architecture));
    }

    graph
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeClass, NodeType};
    use pretty_assertions::assert_eq;

    fn node(label: &str, network: &str) -> Node {
        Node::new(label, network, NodeType::Standard, NodeClass::Intermediate)
    }

    fn network(name: &str, labels: &[&str], links: &[(&str, &str, EdgeKind)]) -> Network {
        let nodes = labels.iter().map(|l| node(l, name));
        let edges = links.iter().map(|(s, t, k)| {
            Edge::new(&make_node_id(s, name), &make_node_id(t, name), *k)
        });
        Network {
            name: name.to_string(),
            description: String::new(),
            graph: Graph::build(nodes, edges),
        }
    }

    fn route(sn: &str, snode: &str, dn: &str, dnode: &str) -> Route {
        Route {
            source_net: sn.into(),
            source_node: snode.into(),
            dest_net: dn.into(),
            dest_node: dnode.into(),
        }
    }

    fn arch(layers: &[(u32, &str)], routes: Vec<Route>) -> Architecture {
        Architecture {
            id: 1,
            name: "test".into(),
            num_layers: layers.len() as u32,
            layers: layers
                .iter()
                .map(|(layer, network)| LayerAssignment {
                    layer: *layer,
                    network: network.to_string(),
                })
                .collect(),
            routes,
        }
    }

    #[test]
    fn build_indexes_adjacency() {
        let net = network("N", &["a", "b", "c"], &[
            ("a", "b", EdgeKind::Standard),
            ("a", "c", EdgeKind::Suppress),
        ]);
        let g = &net.graph;
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.outgoing("a-N").count(), 2);
        assert_eq!(g.incoming("c-N").count(), 1);
        assert!(g.edge("a-N->b-N").is_some());
        assert!(g.diagnostics().is_empty());
    }

    #[test]
    fn dangling_edge_is_dropped_with_diagnostic() {
        let g = Graph::build(
            vec![node("a", "N")],
            vec![Edge::new("a-N", "ghost-N", EdgeKind::Standard)],
        );
        assert_eq!(g.edge_count(), 0);
        assert_eq!(
            g.diagnostics(),
            &[Diagnostic::DanglingEdge {
                edge: "a-N->ghost-N".into(),
                missing: "ghost-N".into()
            }]
        );
    }

    #[test]
    fn duplicate_edge_and_node_are_dropped() {
        let mut g = Graph::build(
            vec![node("a", "N"), node("b", "N"), node("a", "N")],
            vec![Edge::new("a-N", "b-N", EdgeKind::Standard)],
        );
        let mut dup = Edge::new("a-N", "b-N", EdgeKind::Standard);
        dup.id = "other-id".into();
        assert!(!g.add_edge(dup));
        // Same endpoints, different kind is allowed.
        assert!(g.add_edge(Edge::new("a-N", "b-N", EdgeKind::Suppress)));
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.diagnostics().len(), 2);
    }

    #[test]
    fn architecture_networks_follow_layer_order() {
        let a = arch(&[(2, "OUT"), (1, "IN"), (1, "MID"), (2, "IN")], vec![]);
        assert_eq!(a.networks(), vec!["IN", "MID", "OUT"]);
        assert_eq!(a.layer_of("OUT"), Some(2));
        assert_eq!(a.layer_of("NOPE"), None);
    }

    #[test]
    fn combine_adds_architecture_edges_for_routes() {
        let mut networks = BTreeMap::new();
        networks.insert("A".into(), network("A", &["x", "y"], &[("x", "y", EdgeKind::Standard)]));
        networks.insert("B".into(), network("B", &["p"], &[]));
        let a = arch(&[(1, "A"), (2, "B")], vec![route("A", "y", "B", "p")]);

        let g = combine(&a, &networks);
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 2);
        let arch_edge = g.edges().iter().find(|e| e.kind == EdgeKind::Architecture).unwrap();
        assert_eq!(arch_edge.source, "y-A");
        assert_eq!(arch_edge.target, "p-B");
    }

    #[test]
    fn combine_skips_routes_already_connected_either_direction() {
        let mut networks = BTreeMap::new();
        networks.insert("A".into(), network("A", &["x", "y"], &[("x", "y", EdgeKind::Standard)]));
        let a = arch(
            &[(1, "A")],
            vec![route("A", "y", "A", "x"), route("A", "x", "A", "y")],
        );
        let g = combine(&a, &networks);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.diagnostics().len(), 2);
        assert!(g.diagnostics().iter().all(Diagnostic::is_benign));
    }

    #[test]
    fn combine_does_not_duplicate_repeated_routes() {
        let mut networks = BTreeMap::new();
        networks.insert("A".into(), network("A", &["x"], &[]));
        networks.insert("B".into(), network("B", &["p"], &[]));
        let a = arch(
            &[(1, "A"), (2, "B")],
            vec![route("A", "x", "B", "p"), route("B", "p", "A", "x")],
        );
        let g = combine(&a, &networks);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn combine_drops_routes_with_missing_endpoints_or_networks() {
        let mut networks = BTreeMap::new();
        networks.insert("A".into(), network("A", &["x"], &[]));
        let a = arch(
            &[(1, "A"), (2, "GONE")],
            vec![route("A", "x", "A", "missing"), route("A", "x", "ELSEWHERE", "p")],
        );
        let g = combine(&a, &networks);
        assert_eq!(g.edge_count(), 0);
        assert!(g
            .diagnostics()
            .contains(&Diagnostic::MissingNetwork { network: "GONE".into() }));
        assert!(g.diagnostics().iter().any(|d| matches!(
            d,
            Diagnostic::MissingRouteEndpoint { node, .. } if node == "missing-A"
        )));
        assert!(g.diagnostics().iter().any(|d| matches!(
            d,
            Diagnostic::UnknownRouteNetwork { network, .. } if network == "ELSEWHERE"
        )));
    }

    #[test]
    fn set_depths_and_max_depth() {
        let mut net = network("N", &["a", "b"], &[("a", "b", EdgeKind::Standard)]);
        let depths = HashMap::from([("a-N".to_string(), 1), ("b-N".to_string(), 2)]);
        net.graph.set_depths(&depths);
        assert_eq!(net.graph.node("b-N").unwrap().depth, 2);
        assert_eq!(net.graph.max_depth(), 2);
    }
}
