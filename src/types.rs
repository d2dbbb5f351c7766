//! Core domain types for archflow.
//!
//! Nodes and edges here are the canonical, resolved form. The loose string
//! fields of the on-disk datasets live in [`crate::dataset`] and are mapped
//! onto these enums with the `from_str_loose` helpers.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// NodeType
// ---------------------------------------------------------------------------

/// Gate semantics of a node. `Standard` nodes pass through trivially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Standard,
    All,
    Any,
    Suppression,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::All => "all",
            Self::Any => "any",
            Self::Suppression => "suppression",
        }
    }

    /// Parse a dataset `type` string. Anything that is not a known gate
    /// (including the empty string) is a standard node.
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "all" | "and" => Self::All,
            "any" | "or" => Self::Any,
            "suppression" | "suppress" | "not" => Self::Suppression,
            _ => Self::Standard,
        }
    }

    /// Whether this node's activation depends on its inputs.
    pub fn is_gate(&self) -> bool {
        !matches!(self, Self::Standard)
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// NodeClass
// ---------------------------------------------------------------------------

/// Role of a node within its network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeClass {
    Input,
    Intermediate,
    Output,
}

impl NodeClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Intermediate => "intermediate",
            Self::Output => "output",
        }
    }

    /// Parse a dataset `class` string, defaulting to `Intermediate`.
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "input" => Self::Input,
            "output" => Self::Output,
            _ => Self::Intermediate,
        }
    }
}

impl std::fmt::Display for NodeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EdgeKind
// ---------------------------------------------------------------------------

/// Kinds of edges between nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Standard,
    Suppress,
    /// Synthesized cross-network connector. Never a gate input.
    Architecture,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Suppress => "suppress",
            Self::Architecture => "architecture",
        }
    }

    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "suppress" | "suppression" => Self::Suppress,
            "architecture" | "arch" => Self::Architecture,
            _ => Self::Standard,
        }
    }

    /// STANDARD and SUPPRESS edges carry signal; ARCHITECTURE edges do not.
    pub fn is_semantic(&self) -> bool {
        !matches!(self, Self::Architecture)
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A node of a network graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Network-qualified id, see [`make_node_id`].
    pub id: String,
    /// Network-local display name.
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub class: NodeClass,
    /// Topological layer. Zero until depth assignment runs, and for nodes
    /// without any semantic edge.
    pub depth: u32,
    pub network: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Node {
    /// Create a node with a derived id and depth 0.
    pub fn new(label: &str, network: &str, node_type: NodeType, class: NodeClass) -> Self {
        Self {
            id: make_node_id(label, network),
            label: label.to_string(),
            node_type,
            class,
            depth: 0,
            network: network.to_string(),
            description: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// A directed edge between two node ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
}

impl Edge {
    /// Create an edge with an id derived from its endpoints and kind.
    pub fn new(source: &str, target: &str, kind: EdgeKind) -> Self {
        Self {
            id: make_edge_id(source, target, kind),
            source: source.to_string(),
            target: target.to_string(),
            kind,
        }
    }

    /// True if this edge joins `a` and `b` in either direction.
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }
}

// ---------------------------------------------------------------------------
// Chain entries
// ---------------------------------------------------------------------------

/// Whether a chain entry refers to a node or an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Node,
    Edge,
}

/// One element of an evaluated flow chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainEntry {
    pub kind: EntryKind,
    pub id: String,
    /// Propagation round in which the entry became active.
    pub index: u32,
    /// Origin whose trace produced this entry.
    pub origin: String,
}

impl ChainEntry {
    pub fn node(id: &str, index: u32, origin: &str) -> Self {
        Self {
            kind: EntryKind::Node,
            id: id.to_string(),
            index,
            origin: origin.to_string(),
        }
    }

    pub fn edge(id: &str, index: u32, origin: &str) -> Self {
        Self {
            kind: EntryKind::Edge,
            id: id.to_string(),
            index,
            origin: origin.to_string(),
        }
    }

    /// Sort key: round first, nodes before edges within a round, then id.
    pub fn sort_key(&self) -> (u32, EntryKind, &str) {
        (self.index, self.kind, self.id.as_str())
    }
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

/// Build a network-qualified node id: `{label}-{network}`.
pub fn make_node_id(label: &str, network: &str) -> String {
    format!("{label}-{network}")
}

/// Build a deterministic edge id: `{source}->{target}` for standard edges,
/// `{source}->{target}:{kind}` otherwise.
pub fn make_edge_id(source: &str, target: &str, kind: EdgeKind) -> String {
    match kind {
        EdgeKind::Standard => format!("{source}->{target}"),
        other => format!("{source}->{target}:{}", other.as_str()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
