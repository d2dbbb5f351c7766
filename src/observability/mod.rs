//! Structured logging and lightweight run metrics.
//!
//! - [`init_logging`]: one-time `tracing` setup with `RUST_LOG` support
//! - [`Metrics`]: counters collected while loading and evaluating

use tracing_subscriber::EnvFilter;

use crate::graph::flow::FlowTrace;
use crate::workspace::Workspace;

/// Filter used when neither `RUST_LOG` nor the config names one.
pub const DEFAULT_LOG_FILTER: &str = "archflow=info";

/// Initialize structured logging.
///
/// `RUST_LOG` wins when set; otherwise `filter` is used, falling back to
/// [`DEFAULT_LOG_FILTER`]. Logs go to stderr so JSON output on stdout stays
/// clean. Later calls are ignored.
pub fn init_logging(filter: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(filter.unwrap_or(DEFAULT_LOG_FILTER))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    });

    // try_init so double-init in tests doesn't panic
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Counters for one run.
///
/// Serializable to JSON via [`Metrics::to_json`].
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    pub networks_loaded: usize,
    pub networks_rejected: usize,
    pub nodes: usize,
    pub edges: usize,
    pub diagnostics: usize,
    pub routes_merged: usize,
    pub routes_dropped: usize,
    pub flow_evaluations: u64,
    pub failed_nodes: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the load-time figures of `workspace`.
    pub fn from_workspace(workspace: &Workspace) -> Self {
        let mut m = Self::new();
        for network in workspace.networks().values() {
            m.networks_loaded += 1;
            m.nodes += network.graph.node_count();
            m.edges += network.graph.edge_count();
            m.diagnostics += network.graph.diagnostics().len();
        }
        m.networks_rejected = workspace.rejected().len();
        for arch in workspace.architectures() {
            let combined = workspace.combined(arch);
            let merged = combined
                .edges()
                .iter()
                .filter(|e| !e.kind.is_semantic())
                .count();
            m.routes_merged += merged;
            m.routes_dropped += arch.routes.len().saturating_sub(merged);
        }
        m
    }

    /// Count one flow evaluation.
    pub fn record_flow(&mut self, trace: &FlowTrace) {
        self.flow_evaluations += 1;
        self.failed_nodes += trace.failed().len() as u64;
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "networks_loaded": self.networks_loaded,
            "networks_rejected": self.networks_rejected,
            "nodes": self.nodes,
            "edges": self.edges,
            "diagnostics": self.diagnostics,
            "routes_merged": self.routes_merged,
            "routes_dropped": self.routes_dropped,
            "flow_evaluations": self.flow_evaluations,
            "failed_nodes": self.failed_nodes,
        })
    }

    /// Share of declared routes that made it into combined graphs.
    pub fn route_merge_rate(&self) -> f64 {
        let total = self.routes_merged + self.routes_dropped;
        if total == 0 {
            return 0.0;
        }
        self.routes_merged as f64 / total as f64
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
