//! End-to-end tests for archflow.
//!
//! Each test writes a small dataset directory, loads it through the public
//! API, and checks the workspace, flow, playback and CLI results.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::time::Duration;

use clap::Parser;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use archflow::cli::{run, Cli};
use archflow::config::{self, ArchFlowConfig, DisplayMode};
use archflow::error::ArchFlowError;
use archflow::graph::{chain_of, FailReason, RevealEvent};
use archflow::observability::Metrics;
use archflow::session::Session;
use archflow::types::EdgeKind;
use archflow::workspace::{Scope, Workspace};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const ARCH: &str = r#"{
  "num_arch": 1,
  "architectures": [{
    "arch_id": 7,
    "arch_name": "main",
    "arch_num_layers": 2,
    "layers": [
      {"layer": 1, "network": "SENSE"},
      {"layer": 2, "network": "ACT"},
      {"layer": 2, "network": "CYC"}
    ],
    "routes": [
      {"source_net": "SENSE", "source_node": "b", "dest_net": "ACT", "dest_node": "x"},
      {"source_net": "SENSE", "source_node": "c", "dest_net": "CYC", "dest_node": "p"}
    ]
  }]
}"#;

const SENSE: &str = r#"{
  "network": "SENSE",
  "nodes": [
    {"node": "a", "class": "input"},
    {"node": "b"},
    {"node": "c", "desc": "side branch"}
  ],
  "links": [
    {"source": "a", "target": "b"},
    {"source": "a", "target": "c"}
  ]
}"#;

// x and w both feed the ALL gate y; z passes w unless x suppresses it.
const ACT: &str = "\
network: ACT
nodes:
  - node: x
  - node: w
  - node: y
    type: all
    class: output
  - node: z
    type: suppression
    class: output
links:
  - {source: x, target: y}
  - {source: w, target: y}
  - {source: w, target: z}
  - {source: x, target: z, type: suppress}
";

const CYC: &str = "\
network: CYC
nodes:
  - node: p
  - node: q
links:
  - {source: p, target: q}
  - {source: q, target: p}
";

fn dataset() -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, body) in [
        ("ARCH.json", ARCH),
        ("SENSE.json", SENSE),
        ("ACT.yaml", ACT),
        ("CYC.yml", CYC),
    ] {
        std::fs::write(dir.path().join(name), body).unwrap();
    }
    dir
}

fn fast_config(mode: DisplayMode) -> ArchFlowConfig {
    let mut config = ArchFlowConfig::default();
    config.display.default_mode = mode;
    config.playback.round_duration_ms = 20;
    config
}

fn ids(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ===========================================================================
// 1. Loading
// ===========================================================================

#[test]
fn cyclic_network_is_rejected_and_others_load() {
    let dir = dataset();
    let ws = Workspace::load(dir.path()).unwrap();

    let loaded: Vec<&str> = ws.networks().keys().map(String::as_str).collect();
    assert_eq!(loaded, vec!["ACT", "SENSE"]);
    assert_eq!(ws.rejected().len(), 1);
    assert_eq!(ws.rejected()[0].name, "CYC");

    assert!(matches!(
        ws.network("CYC"),
        Err(ArchFlowError::NetworkUnavailable(_))
    ));
    assert!(matches!(
        ws.network("NOPE"),
        Err(ArchFlowError::UnknownNetwork(_))
    ));
    assert!(matches!(
        ws.ensure_acyclic(),
        Err(ArchFlowError::CyclicGraph { .. })
    ));
}

#[test]
fn depths_follow_semantic_edges() {
    let dir = dataset();
    let ws = Workspace::load(dir.path()).unwrap();
    let act = &ws.network("ACT").unwrap().graph;

    let depth = |id: &str| act.node(id).unwrap().depth;
    assert_eq!(depth("x-ACT"), 1);
    assert_eq!(depth("w-ACT"), 1);
    assert_eq!(depth("y-ACT"), 2);
    assert_eq!(depth("z-ACT"), 2);
    assert_eq!(act.max_depth(), 2);
}

#[test]
fn architecture_lookup_by_name_or_id() {
    let dir = dataset();
    let ws = Workspace::load(dir.path()).unwrap();
    assert_eq!(ws.architecture("main").unwrap().id, 7);
    assert_eq!(ws.architecture("7").unwrap().name, "main");
    assert!(matches!(
        ws.architecture("other"),
        Err(ArchFlowError::UnknownArchitecture(_))
    ));
}

// ===========================================================================
// 2. Combined and coarse views
// ===========================================================================

#[test]
fn combined_graph_merges_resolvable_routes_only() {
    let dir = dataset();
    let ws = Workspace::load(dir.path()).unwrap();
    let graph = ws
        .graph(&Scope::Architecture("main".to_string()))
        .unwrap();

    assert_eq!(graph.node_count(), 7);
    let routes: Vec<(&str, &str)> = graph
        .edges()
        .iter()
        .filter(|e| e.kind == EdgeKind::Architecture)
        .map(|e| (e.source.as_str(), e.target.as_str()))
        .collect();
    assert_eq!(routes, vec![("b-SENSE", "x-ACT")]);
    assert!(!graph.diagnostics().is_empty());

    // Node chains stay on semantic edges.
    let chain = chain_of(&graph, "a-SENSE");
    assert_eq!(chain, ids(&["a-SENSE", "b-SENSE", "c-SENSE"]));
}

#[test]
fn coarse_view_groups_by_layer_network_and_depth() {
    let dir = dataset();
    let ws = Workspace::load(dir.path()).unwrap();
    let view = ws.coarse(ws.architecture("main").unwrap());

    let layers: Vec<&str> = view.layers.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(layers, vec!["layer1", "layer2"]);
    assert_eq!(view.layers[0].size(), 3);
    assert_eq!(view.layers[1].size(), 4);
    assert!(view.ids().contains("SENSE-depth-2"));

    // Group chains do follow the route.
    let chain = view.chain_of("SENSE");
    assert!(chain.contains("ACT"));
    assert!(chain.contains("x-ACT"));
}

// ===========================================================================
// 3. Flow through a session
// ===========================================================================

#[test]
fn flow_session_tracks_gate_failures_per_origin() {
    let dir = dataset();
    let ws = Workspace::load(dir.path()).unwrap();
    let graph = ws.graph(&Scope::Network("ACT".to_string())).unwrap();
    let config = fast_config(DisplayMode::Flow);
    let mut session = Session::new(Cow::Borrowed(&*graph), &config);

    session.select("w-ACT").unwrap();
    let trace = session.registry().get("w-ACT").unwrap();
    assert_eq!(trace.node_ids(), ["w-ACT", "y-ACT", "z-ACT"].into_iter().collect());
    assert!(trace.is_failed("y-ACT"));
    assert!(!trace.is_failed("z-ACT"));
    assert_eq!(
        trace.failed().get("y-ACT"),
        Some(&FailReason::MissingStandardInput {
            active: 1,
            declared: 2
        })
    );

    session.select("x-ACT").unwrap();
    let failed: BTreeSet<String> = session
        .registry()
        .failed_nodes()
        .into_iter()
        .map(str::to_string)
        .collect();
    // y fails in both traces; z fails only in x's.
    assert_eq!(failed, ids(&["y-ACT"]));

    let mut metrics = Metrics::new();
    for trace in session.registry().traces() {
        metrics.record_flow(trace);
    }
    assert_eq!(metrics.flow_evaluations, 2);
}

#[test]
fn flow_does_not_cross_architecture_routes() {
    let dir = dataset();
    let ws = Workspace::load(dir.path()).unwrap();
    let graph = ws
        .graph(&Scope::Architecture("main".to_string()))
        .unwrap();
    let config = fast_config(DisplayMode::Flow);
    let mut session = Session::new(Cow::Borrowed(&*graph), &config);

    session.select("a-SENSE").unwrap();
    let nodes: BTreeSet<String> = session
        .registry()
        .active_nodes()
        .into_iter()
        .map(str::to_string)
        .collect();
    assert_eq!(nodes, ids(&["a-SENSE", "b-SENSE", "c-SENSE"]));
}

#[test]
fn playback_reveals_rounds_in_order() {
    let dir = dataset();
    let ws = Workspace::load(dir.path()).unwrap();
    let graph = ws.graph(&Scope::Network("SENSE".to_string())).unwrap();
    let config = fast_config(DisplayMode::Flow);
    let mut session = Session::new(Cow::Borrowed(&*graph), &config);

    session.select("a-SENSE").unwrap();
    let generation = session.start_playback().unwrap();
    assert_eq!(session.schedule().unwrap().rounds().len(), 2);

    let first = session.tick(generation, Duration::ZERO);
    assert_eq!(
        first,
        vec![RevealEvent::ShowNodes {
            round: 0,
            nodes: vec!["a-SENSE".to_string()]
        }]
    );

    let rest = session.tick(generation, Duration::from_secs(1));
    assert_eq!(rest.last(), Some(&RevealEvent::Finished));
    assert!(!session.is_playing());

    let payload = session.payload();
    assert_eq!(payload.chain.len(), 5);
    assert!(payload.fingerprint.is_some());
}

// ===========================================================================
// 4. Config and CLI
// ===========================================================================

#[test]
fn config_file_drives_session_defaults() {
    let dir = dataset();
    let path = dir.path().join("archflow.yaml");
    std::fs::write(
        &path,
        "display:\n  default_mode: flow\nplayback:\n  round_duration_ms: 40\n",
    )
    .unwrap();
    let config = config::load_with(Some(&path), |_| None, None).unwrap();
    assert_eq!(config.display.default_mode, DisplayMode::Flow);

    let ws = Workspace::load(&dir.path().join("SENSE.json")).unwrap();
    let graph = ws.graph(&Scope::Network("SENSE".to_string())).unwrap();
    let session = Session::new(Cow::Borrowed(&*graph), &config);
    assert_eq!(session.mode(), DisplayMode::Flow);
}

#[test]
fn cli_check_reports_cyclic_dataset() {
    let dir = dataset();
    let data = dir.path().to_str().unwrap();
    let cli = Cli::try_parse_from(["archflow", "check", "--json", "--data", data]).unwrap();
    assert!(matches!(run(cli), Err(ArchFlowError::CyclicGraph { .. })));
}

#[test]
fn cli_flow_runs_on_a_named_network() {
    let dir = dataset();
    let data = dir.path().to_str().unwrap();
    let cli = Cli::try_parse_from([
        "archflow", "flow", "--json", "--data", data, "-n", "ACT", "w", "x",
    ])
    .unwrap();
    run(cli).unwrap();
}

#[test]
fn cli_rejects_unknown_origin() {
    let dir = dataset();
    let data = dir.path().to_str().unwrap();
    let cli =
        Cli::try_parse_from(["archflow", "chain", "--data", data, "-n", "SENSE", "ghost"]).unwrap();
    assert!(matches!(run(cli), Err(ArchFlowError::UnknownNode(_))));
}
