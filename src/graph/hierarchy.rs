//! Coarse view of an architecture: layer → network → depth → node groups
//! joined by connector links at every level.
//!
//! Group ids: `layer<n>`, `<network>`, `<network>-depth-<d>`, and plain node
//! ids for leaves. Connector links are deduplicated regardless of direction,
//! first insertion wins.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use crate::graph::model::{Architecture, Network};
use crate::graph::reachability::{chain_in, Adjacency};
use crate::types::{make_node_id, EdgeKind};

/// Nodes of one network sharing one depth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepthGroup {
    pub id: String,
    pub label: String,
    pub depth: u32,
    pub nodes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkGroup {
    pub id: String,
    pub label: String,
    pub depths: Vec<DepthGroup>,
}

impl NetworkGroup {
    pub fn size(&self) -> usize {
        self.depths.iter().map(|d| d.nodes.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerGroup {
    pub id: String,
    pub label: String,
    pub layer: u32,
    pub networks: Vec<NetworkGroup>,
}

impl LayerGroup {
    pub fn size(&self) -> usize {
        self.networks.iter().map(NetworkGroup::size).sum()
    }
}

/// A connector between two groups (or nodes) of the coarse view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoarseLink {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoarseView {
    pub layers: Vec<LayerGroup>,
    pub links: Vec<CoarseLink>,
}

impl CoarseView {
    /// Adjacency over the connector links, for highlight chains on groups.
    pub fn adjacency(&self) -> Adjacency {
        Adjacency::from_pairs(
            self.links
                .iter()
                .map(|l| (l.source.as_str(), l.target.as_str())),
        )
    }

    /// Highlight chain of a group or node id over the connector links.
    pub fn chain_of(&self, id: &str) -> BTreeSet<String> {
        chain_in(&self.adjacency(), id)
    }

    /// Number of leaf nodes.
    pub fn size(&self) -> usize {
        self.layers.iter().map(LayerGroup::size).sum()
    }

    /// Every group and node id in the view.
    pub fn ids(&self) -> BTreeSet<&str> {
        let mut ids = BTreeSet::new();
        for layer in &self.layers {
            ids.insert(layer.id.as_str());
            for network in &layer.networks {
                ids.insert(network.id.as_str());
                for depth in &network.depths {
                    ids.insert(depth.id.as_str());
                    ids.extend(depth.nodes.iter().map(String::as_str));
                }
            }
        }
        ids
    }
}

#[derive(Default)]
struct LinkSet {
    links: Vec<CoarseLink>,
    seen: HashSet<(String, String)>,
}

impl LinkSet {
    fn add(&mut self, source: &str, target: &str, kind: EdgeKind) {
        let key = if source <= target {
            (source.to_string(), target.to_string())
        } else {
            (target.to_string(), source.to_string())
        };
        if self.seen.insert(key) {
            self.links.push(CoarseLink {
                source: source.to_string(),
                target: target.to_string(),
                kind,
            });
        }
    }
}

pub fn layer_id(layer: u32) -> String {
    format!("layer{layer}")
}

pub fn depth_group_id(network: &str, depth: u32) -> String {
    format!("{network}-depth-{depth}")
}

/// Build the coarse view of `architecture` from depth-assigned networks.
/// Networks that are not loaded are left out.
pub fn coarse_view(architecture: &Architecture, networks: &BTreeMap<String, Network>) -> CoarseView {
    let mut links = LinkSet::default();

    let mut by_layer: BTreeMap<u32, Vec<&str>> = BTreeMap::new();
    for assignment in &architecture.layers {
        by_layer
            .entry(assignment.layer)
            .or_default()
            .push(assignment.network.as_str());
    }

    let mut layers = Vec::with_capacity(by_layer.len());
    for (layer, members) in by_layer {
        let mut groups = Vec::new();
        for name in members {
            let Some(network) = networks.get(name) else {
                continue;
            };
            network_links(network, &mut links);
            groups.push(network_group(layer, network));
        }
        layers.push(LayerGroup {
            id: layer_id(layer),
            label: format!("Layer {layer}"),
            layer,
            networks: groups,
        });
    }

    for route in &architecture.routes {
        let (Some(source_layer), Some(dest_layer)) = (
            architecture.layer_of(&route.source_net),
            architecture.layer_of(&route.dest_net),
        ) else {
            continue;
        };
        let source_node = make_node_id(&route.source_node, &route.source_net);
        let dest_node = make_node_id(&route.dest_node, &route.dest_net);
        let (Some(source_depth), Some(dest_depth)) = (
            node_depth(networks, &route.source_net, &source_node),
            node_depth(networks, &route.dest_net, &dest_node),
        ) else {
            tracing::debug!(%route, "route left out of coarse view: endpoint not loaded");
            continue;
        };

        let source = [
            layer_id(source_layer),
            route.source_net.clone(),
            depth_group_id(&route.source_net, source_depth),
            source_node,
        ];
        let dest = [
            layer_id(dest_layer),
            route.dest_net.clone(),
            depth_group_id(&route.dest_net, dest_depth),
            dest_node,
        ];
        for (i, from) in source.iter().enumerate() {
            for (j, to) in dest.iter().enumerate() {
                if i == 0 && j == 0 && source_layer == dest_layer {
                    continue;
                }
                links.add(from, to, EdgeKind::Architecture);
            }
        }
    }

    CoarseView {
        layers,
        links: links.links,
    }
}

fn network_group(layer: u32, network: &Network) -> NetworkGroup {
    let mut by_depth: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for node in network.graph.nodes() {
        by_depth.entry(node.depth).or_default().push(node.id.clone());
    }
    NetworkGroup {
        id: network.name.clone(),
        label: format!("{layer}-{}", network.name),
        depths: by_depth
            .into_iter()
            .map(|(depth, nodes)| DepthGroup {
                id: depth_group_id(&network.name, depth),
                label: format!("{}-{depth}", network.name),
                depth,
                nodes,
            })
            .collect(),
    }
}

/// Four links per semantic edge that crosses depths: group→group,
/// node→node, group→node and node→group.
fn network_links(network: &Network, links: &mut LinkSet) {
    let graph = &network.graph;
    for edge in graph.edges().iter().filter(|e| e.kind.is_semantic()) {
        let (Some(source), Some(target)) = (graph.node(&edge.source), graph.node(&edge.target))
        else {
            continue;
        };
        if source.depth == target.depth {
            continue;
        }
        let depth_source = depth_group_id(&network.name, source.depth);
        let depth_target = depth_group_id(&network.name, target.depth);
        links.add(&depth_source, &depth_target, edge.kind);
        links.add(&source.id, &target.id, edge.kind);
        links.add(&depth_source, &target.id, edge.kind);
        links.add(&source.id, &depth_target, edge.kind);
    }
}

fn node_depth(networks: &BTreeMap<String, Network>, network: &str, node_id: &str) -> Option<u32> {
    networks
        .get(network)
        .and_then(|n| n.graph.node(node_id))
        .map(|n| n.depth)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::depth::assign_depths;
    use crate::graph::model::{Graph, LayerAssignment, Route};
    use crate::types::{Edge, Node, NodeClass, NodeType};
    use pretty_assertions::assert_eq;

    fn network(name: &str, labels: &[&str], links: &[(&str, &str)]) -> Network {
        let mut graph = Graph::build(
            labels
                .iter()
                .map(|l| Node::new(l, name, NodeType::Standard, NodeClass::Intermediate)),
            links.iter().map(|(s, t)| {
                Edge::new(&make_node_id(s, name), &make_node_id(t, name), EdgeKind::Standard)
            }),
        );
        assign_depths(&mut graph).unwrap();
        Network {
            name: name.to_string(),
            description: String::new(),
            graph,
        }
    }

    fn networks() -> BTreeMap<String, Network> {
        BTreeMap::from([
            ("A".to_string(), network("A", &["a1", "a2"], &[("a1", "a2")])),
            ("B".to_string(), network("B", &["b1", "b2"], &[("b1", "b2")])),
        ])
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

    fn route() -> Route {
        Route {
            source_net: "A".into(),
            source_node: "a2".into(),
            dest_net: "B".into(),
            dest_node: "b1".into(),
        }
    }

    #[test]
    fn groups_nest_layer_network_depth() {
        let view = coarse_view(&arch(&[(2, "B"), (1, "A")], vec![]), &networks());
        let layer_ids: Vec<&str> = view.layers.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(layer_ids, vec!["layer1", "layer2"]);
        let a = &view.layers[0].networks[0];
        assert_eq!(a.id, "A");
        assert_eq!(a.depths[0].id, "A-depth-1");
        assert_eq!(a.depths[1].nodes, vec!["a2-A".to_string()]);
        assert_eq!(view.size(), 4);
    }

    #[test]
    fn each_depth_crossing_edge_yields_four_links() {
        let view = coarse_view(&arch(&[(1, "A")], vec![]), &networks());
        assert_eq!(view.links.len(), 4);
        assert!(view.links.iter().all(|l| l.kind == EdgeKind::Standard));
    }

    #[test]
    fn route_yields_sixteen_links_across_layers() {
        let view = coarse_view(&arch(&[(1, "A"), (2, "B")], vec![route()]), &networks());
        let arch_links = view
            .links
            .iter()
            .filter(|l| l.kind == EdgeKind::Architecture)
            .count();
        assert_eq!(arch_links, 16);
    }

    #[test]
    fn layer_to_layer_link_skipped_within_one_layer() {
        let view = coarse_view(&arch(&[(1, "A"), (1, "B")], vec![route()]), &networks());
        let arch_links = view
            .links
            .iter()
            .filter(|l| l.kind == EdgeKind::Architecture)
            .count();
        assert_eq!(arch_links, 15);
        assert_eq!(view.layers.len(), 1);
        assert_eq!(view.layers[0].networks.len(), 2);
    }

    #[test]
    fn links_are_deduplicated_regardless_of_direction() {
        let reverse = Route {
            source_net: "B".into(),
            source_node: "b1".into(),
            dest_net: "A".into(),
            dest_node: "a2".into(),
        };
        let view = coarse_view(
            &arch(&[(1, "A"), (2, "B")], vec![route(), reverse]),
            &networks(),
        );
        let arch_links = view
            .links
            .iter()
            .filter(|l| l.kind == EdgeKind::Architecture)
            .count();
        assert_eq!(arch_links, 16);
    }

    #[test]
    fn route_to_unloaded_network_is_left_out() {
        let mut nets = networks();
        nets.remove("B");
        let view = coarse_view(&arch(&[(1, "A"), (2, "B")], vec![route()]), &nets);
        assert!(view.links.iter().all(|l| l.kind != EdgeKind::Architecture));
        assert!(view.layers[1].networks.is_empty());
    }

    #[test]
    fn chain_runs_over_connector_links() {
        let view = coarse_view(&arch(&[(1, "A"), (2, "B")], vec![route()]), &networks());
        let chain = view.chain_of("layer1");
        assert!(chain.contains("b1-B"));
        assert!(chain.contains("B-depth-1"));
        assert!(view.ids().is_superset(&chain.iter().map(String::as_str).collect()));
    }
}
