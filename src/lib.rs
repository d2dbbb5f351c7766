//! ArchFlow: layered multi-network architecture graphs.
//!
//! Loads networks and architectures from JSON/YAML datasets, layers every
//! network by depth, answers reachability queries, and evaluates gated
//! signal flow (ALL / ANY / SUPPRESSION) with a timed round-by-round replay.

pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod graph;
pub mod observability;
pub mod session;
pub mod types;
pub mod viz;
pub mod workspace;
