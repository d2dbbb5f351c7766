//! Command-line interface.
//!
//! A thin driver over the library: every subcommand loads a workspace, runs
//! one engine operation, and prints the result as styled text or, with
//! `--json`, as JSON on stdout. Logs go to stderr.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, MultiSelect, Select};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::config::{self, ArchFlowConfig, DisplayMode};
use crate::dataset::DataFile;
use crate::error::{ArchFlowError, Result};
use crate::graph::depth::violations;
use crate::graph::model::Graph;
use crate::graph::reachability::{chain_of, neighborhood};
use crate::graph::search::SearchMode;
use crate::graph::sequencer::RevealEvent;
use crate::observability::{init_logging, Metrics};
use crate::session::Session;
use crate::workspace::{Scope, Workspace};

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(
    name = "archflow",
    version,
    about = "Explore layered multi-network architecture graphs and simulate gated signal flow"
)]
pub struct Cli {
    /// Config file (defaults to $ARCHFLOW_CONFIG, then the user config dir).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Where the dataset lives.
#[derive(Debug, Clone, Args)]
pub struct DataArgs {
    /// Dataset directory or bundle file.
    #[arg(short, long, default_value = ".", value_name = "PATH")]
    pub data: PathBuf,
}

/// Dataset plus the graph to operate on.
#[derive(Debug, Clone, Args)]
pub struct TargetArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Operate on a single network.
    #[arg(short, long, conflicts_with = "arch")]
    pub network: Option<String>,

    /// Operate on an architecture's combined graph (name or id).
    #[arg(short, long)]
    pub arch: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load a dataset and report diagnostics and rejected networks.
    Check(DataArgs),

    /// Print the depth of every node.
    Depths(TargetArgs),

    /// Print the highlight chain (ancestors and descendants) of a node.
    Chain {
        #[command(flatten)]
        target: TargetArgs,
        /// Node id or label.
        node: String,
    },

    /// Print a node's direct neighbours.
    Neighbors {
        #[command(flatten)]
        target: TargetArgs,
        node: String,
    },

    /// Evaluate gated flow from one or more origins.
    Flow {
        #[command(flatten)]
        target: TargetArgs,
        /// Origin node ids or labels.
        #[arg(required = true)]
        origins: Vec<String>,
        /// Replay the chain round by round.
        #[arg(long)]
        play: bool,
    },

    /// Show an architecture's combined graph or coarse view.
    Arch {
        #[command(flatten)]
        data: DataArgs,
        /// Architecture name or id.
        name: String,
        /// Print the layer/network/depth grouping instead.
        #[arg(long)]
        coarse: bool,
    },

    /// Find nodes by label.
    Search {
        #[command(flatten)]
        target: TargetArgs,
        query: String,
        /// Treat the query as a regular expression.
        #[arg(long)]
        regex: bool,
    },

    /// Interactive selection, search and playback.
    Explore(TargetArgs),

    /// Print the JSON Schema of the dataset formats.
    Schema,

    /// Print load statistics.
    Stats(DataArgs),
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Parse-free entry point used by `main`.
pub fn run(cli: Cli) -> Result<()> {
    let config = config::load(cli.config.as_deref())?;
    init_logging(config.logging.filter.as_deref());
    let json = cli.json;

    match cli.command {
        Command::Check(data) => cmd_check(&data.data, json),
        Command::Depths(target) => cmd_depths(&target, json),
        Command::Chain { target, node } => cmd_chain(&target, &node, json),
        Command::Neighbors { target, node } => cmd_neighbors(&target, &node, json),
        Command::Flow {
            target,
            origins,
            play,
        } => cmd_flow(&target, &origins, play, &config, json),
        Command::Arch { data, name, coarse } => cmd_arch(&data.data, &name, coarse, json),
        Command::Search {
            target,
            query,
            regex,
        } => {
            let mode = if regex {
                SearchMode::Regex
            } else {
                config.search.mode
            };
            cmd_search(&target, &query, mode, json)
        }
        Command::Explore(target) => cmd_explore(&target, &config),
        Command::Schema => print_json(&schemars::schema_for!(DataFile)),
        Command::Stats(data) => cmd_stats(&data.data, json),
    }
}

/// Process exit code for an error: 2 for structural (cyclic) data, 1
/// otherwise.
pub fn exit_code(err: &ArchFlowError) -> i32 {
    match err {
        ArchFlowError::CyclicGraph { .. } => 2,
        _ => 1,
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CheckReport<'a> {
    networks: Vec<NetworkReport<'a>>,
    rejected: Vec<RejectedReport<'a>>,
    architectures: Vec<ArchReport<'a>>,
}

#[derive(Serialize)]
struct NetworkReport<'a> {
    name: &'a str,
    nodes: usize,
    edges: usize,
    max_depth: u32,
    diagnostics: Vec<String>,
}

#[derive(Serialize)]
struct RejectedReport<'a> {
    name: &'a str,
    unassigned: &'a [String],
}

#[derive(Serialize)]
struct ArchReport<'a> {
    name: &'a str,
    diagnostics: Vec<String>,
}

fn cmd_check(data: &Path, json: bool) -> Result<()> {
    let ws = Workspace::load(data)?;
    let combined: Vec<(&str, Graph)> = ws
        .architectures()
        .iter()
        .map(|a| (a.name.as_str(), ws.combined(a)))
        .collect();

    let report = CheckReport {
        networks: ws
            .networks()
            .values()
            .map(|n| NetworkReport {
                name: &n.name,
                nodes: n.graph.node_count(),
                edges: n.graph.edge_count(),
                max_depth: n.graph.max_depth(),
                diagnostics: n.graph.diagnostics().iter().map(|d| d.to_string()).collect(),
            })
            .collect(),
        rejected: ws
            .rejected()
            .iter()
            .map(|r| RejectedReport {
                name: &r.name,
                unassigned: &r.error.unassigned,
            })
            .collect(),
        architectures: combined
            .iter()
            .map(|(name, graph)| ArchReport {
                name,
                diagnostics: graph.diagnostics().iter().map(|d| d.to_string()).collect(),
            })
            .collect(),
    };

    if json {
        print_json(&report)?;
    } else {
        for n in &report.networks {
            println!(
                "{} {} ({} nodes, {} edges, max depth {})",
                style("ok").green().bold(),
                n.name,
                n.nodes,
                n.edges,
                n.max_depth
            );
            for d in &n.diagnostics {
                println!("   {} {d}", style("!").yellow());
            }
        }
        for r in &report.rejected {
            println!(
                "{} {} (cycle through {} node(s))",
                style("rejected").red().bold(),
                r.name,
                r.unassigned.len()
            );
        }
        for a in &report.architectures {
            println!("{} {}", style("arch").cyan().bold(), a.name);
            for d in &a.diagnostics {
                println!("   {} {d}", style("!").yellow());
            }
        }
    }

    ws.ensure_acyclic()
}

fn cmd_depths(target: &TargetArgs, json: bool) -> Result<()> {
    let ws = Workspace::load(&target.data.data)?;
    let graph = ws.graph(&scope(&ws, target)?)?;
    let mut nodes: Vec<_> = graph.nodes().iter().collect();
    nodes.sort_by(|a, b| (a.depth, &a.id).cmp(&(b.depth, &b.id)));

    if json {
        return print_json(&nodes);
    }
    for node in nodes {
        println!(
            "{:>3}  {}  {}",
            style(node.depth).bold(),
            node.id,
            style(node.node_type).dim()
        );
    }
    let bad = violations(&graph);
    if !bad.is_empty() {
        println!("{} {} edge(s) break depth order", style("!").yellow(), bad.len());
    }
    Ok(())
}

fn cmd_chain(target: &TargetArgs, node: &str, json: bool) -> Result<()> {
    let ws = Workspace::load(&target.data.data)?;
    let graph = ws.graph(&scope(&ws, target)?)?;
    let id = resolve_node(&graph, node)?;
    let chain = chain_of(&graph, &id);
    if json {
        return print_json(&chain);
    }
    for member in &chain {
        let marker = if *member == id { style("*").green() } else { style(" ") };
        println!("{marker} {member}");
    }
    Ok(())
}

fn cmd_neighbors(target: &TargetArgs, node: &str, json: bool) -> Result<()> {
    let ws = Workspace::load(&target.data.data)?;
    let graph = ws.graph(&scope(&ws, target)?)?;
    let id = resolve_node(&graph, node)?;
    let hood = neighborhood(&graph, &id);
    if json {
        return print_json(&serde_json::json!({
            "node": id,
            "nodes": hood.nodes,
            "edges": hood.edges,
        }));
    }
    for edge_id in &hood.edges {
        if let Some(edge) = graph.edge(edge_id) {
            let other = if edge.source == id { &edge.target } else { &edge.source };
            let arrow = if edge.source == id { "->" } else { "<-" };
            println!("{arrow} {other}  {}", style(edge.kind).dim());
        }
    }
    Ok(())
}

fn cmd_flow(
    target: &TargetArgs,
    origins: &[String],
    play: bool,
    config: &ArchFlowConfig,
    json: bool,
) -> Result<()> {
    let ws = Workspace::load(&target.data.data)?;
    let graph = ws.graph(&scope(&ws, target)?)?;

    let mut config = config.clone();
    config.display.default_mode = DisplayMode::Flow;
    config.playback.autoplay = false;
    let mut session = Session::new(Cow::Borrowed(&*graph), &config);

    let mut metrics = Metrics::new();
    for origin in origins {
        let id = resolve_node(&graph, origin)?;
        if !session.selected().contains(&id) {
            session.select(&id)?;
        }
        if let Some(trace) = session.registry().get(&id) {
            metrics.record_flow(trace);
        }
    }
    tracing::info!(
        origins = origins.len(),
        failed = metrics.failed_nodes,
        "flow evaluated"
    );

    if play {
        play_session(&mut session, json)?;
    }

    if json {
        return print_json(&serde_json::json!({
            "traces": session.registry().traces(),
            "failed": session.registry().failed_nodes(),
            "payload": session.payload(),
        }));
    }

    if !play {
        let failed = session.registry().failed_nodes();
        for entry in session.registry().merged() {
            let mark = if failed.contains(entry.id.as_str()) {
                style("x").red().bold()
            } else {
                style("·").green()
            };
            println!("{:>3} {mark} {:<4} {}", entry.index, format!("{:?}", entry.kind).to_lowercase(), entry.id);
        }
    }
    for trace in session.registry().traces() {
        for (id, reason) in trace.failed() {
            println!(
                "{} {id} failed for origin {}: {reason}",
                style("!").red(),
                trace.origin()
            );
        }
    }
    Ok(())
}

fn cmd_arch(data: &Path, name: &str, coarse: bool, json: bool) -> Result<()> {
    let ws = Workspace::load(data)?;
    let arch = ws.architecture(name)?;

    if coarse {
        let view = ws.coarse(arch);
        if json {
            return print_json(&view);
        }
        for layer in &view.layers {
            println!("{} ({} nodes)", style(&layer.label).bold(), layer.size());
            for network in &layer.networks {
                println!("  {} ({} nodes)", network.id, network.size());
                for depth in &network.depths {
                    println!("    depth {}: {}", depth.depth, depth.nodes.join(", "));
                }
            }
        }
        println!("{} connector links", view.links.len());
        return Ok(());
    }

    let graph = ws.combined(arch);
    if json {
        return print_json(&serde_json::json!({
            "architecture": arch,
            "nodes": graph.nodes(),
            "edges": graph.edges(),
            "diagnostics": graph.diagnostics(),
        }));
    }
    let routes = graph.edges().iter().filter(|e| !e.kind.is_semantic()).count();
    println!(
        "{}: {} networks, {} nodes, {} edges ({} from routes)",
        style(&arch.name).bold(),
        arch.networks().len(),
        graph.node_count(),
        graph.edge_count(),
        routes
    );
    for d in graph.diagnostics() {
        println!("   {} {d}", style("!").yellow());
    }
    Ok(())
}

fn cmd_search(target: &TargetArgs, query: &str, mode: SearchMode, json: bool) -> Result<()> {
    let ws = Workspace::load(&target.data.data)?;
    let graph = ws.graph(&scope(&ws, target)?)?;
    let hits = crate::graph::search::search(&graph, query, mode)?;
    if json {
        return print_json(&hits);
    }
    if hits.is_empty() {
        println!("{}", style("no matches").dim());
    }
    for id in hits {
        println!("{id}");
    }
    Ok(())
}

fn cmd_stats(data: &Path, json: bool) -> Result<()> {
    let ws = Workspace::load(data)?;
    let metrics = Metrics::from_workspace(&ws);
    if json {
        return print_json(&metrics.to_json());
    }
    println!("networks loaded   {}", metrics.networks_loaded);
    println!("networks rejected {}", metrics.networks_rejected);
    println!("nodes             {}", metrics.nodes);
    println!("edges             {}", metrics.edges);
    println!("diagnostics       {}", metrics.diagnostics);
    println!(
        "routes merged     {} ({:.0}%)",
        metrics.routes_merged,
        metrics.route_merge_rate() * 100.0
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Interactive explorer
// ---------------------------------------------------------------------------

const EXPLORE_ACTIONS: &[&str] = &[
    "Select nodes",
    "Search labels",
    "Switch mode",
    "Play flow",
    "Show state",
    "Clear all",
    "Quit",
];

fn cmd_explore(target: &TargetArgs, config: &ArchFlowConfig) -> Result<()> {
    let ws = Workspace::load(&target.data.data)?;
    let graph = ws.graph(&scope(&ws, target)?)?;
    let mut session = Session::new(Cow::Borrowed(&*graph), config);
    let theme = ColorfulTheme::default();

    loop {
        let prompt = format!("[{}] {} selected", session.mode(), session.selected().len());
        let action = Select::with_theme(&theme)
            .with_prompt(prompt)
            .items(EXPLORE_ACTIONS)
            .default(0)
            .interact()?;

        match action {
            0 => explore_select(&mut session, &theme)?,
            1 => {
                let query: String = Input::with_theme(&theme)
                    .with_prompt("Label contains")
                    .allow_empty(true)
                    .interact_text()?;
                let hits = session.search(&query)?;
                println!("{} match(es)", hits.len());
                for id in hits {
                    println!("  {id}");
                }
            }
            2 => {
                let next = match session.mode() {
                    DisplayMode::Highlight => DisplayMode::Flow,
                    DisplayMode::Flow => DisplayMode::Highlight,
                };
                session.set_mode(next);
            }
            3 => play_session(&mut session, false)?,
            4 => print_state(&session),
            5 => session.clear_all(),
            _ => return Ok(()),
        }
    }
}

/// Let the user tick the selection; apply the difference as toggles.
fn explore_select(session: &mut Session<'_>, theme: &ColorfulTheme) -> Result<()> {
    let ids: Vec<String> = session.graph().nodes().iter().map(|n| n.id.clone()).collect();
    let defaults: Vec<bool> = ids
        .iter()
        .map(|id| session.selected().contains(id))
        .collect();
    let picked = MultiSelect::with_theme(theme)
        .with_prompt("Select nodes (space to toggle)")
        .items(&ids)
        .defaults(&defaults)
        .interact()?;

    for (i, id) in ids.iter().enumerate() {
        if picked.contains(&i) != defaults[i] {
            session.select(id)?;
        }
    }
    Ok(())
}

fn print_state(session: &Session<'_>) {
    let payload = session.payload();
    println!("{} {}", style("mode").bold(), payload.mode);
    println!("{} {}", style("selected").bold(), payload.selected.join(", "));
    println!("{} {}", style("active").bold(), payload.active_node_ids().join(", "));
    let failed: Vec<&str> = payload
        .nodes
        .iter()
        .filter(|n| n.fail)
        .map(|n| n.id.as_str())
        .collect();
    if !failed.is_empty() {
        println!("{} {}", style("failed").red().bold(), failed.join(", "));
    }
}

// ---------------------------------------------------------------------------
// Playback
// ---------------------------------------------------------------------------

/// Replay the session's flow chain in real time.
fn play_session(session: &mut Session<'_>, json: bool) -> Result<()> {
    let Some(generation) = session.start_playback() else {
        println!("{}", style("nothing to play").dim());
        return Ok(());
    };
    let rounds = session.schedule().map(|s| s.rounds().len()).unwrap_or(0) as u64;

    let bar = if json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(rounds)
    };
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} round {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut last = Instant::now();
    while session.is_playing() {
        if let Some(wait) = session.next_due() {
            std::thread::sleep(wait.min(Duration::from_millis(50)));
        }
        let now = Instant::now();
        let events = session.tick(generation, now - last);
        last = now;

        for event in events {
            if json {
                println!("{}", serde_json::to_string(&event)?);
            }
            match event {
                RevealEvent::ShowNodes { nodes, .. } => {
                    bar.inc(1);
                    bar.set_message(nodes.join(", "));
                }
                RevealEvent::AnimateEdges { edges, .. } => {
                    bar.set_message(format!("{} edge(s)", edges.len()));
                }
                RevealEvent::Finished => bar.finish_with_message("done"),
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Pick the graph a command runs on. Without flags, a workspace holding a
/// single architecture or a single network is used as-is.
fn scope(ws: &Workspace, target: &TargetArgs) -> Result<Scope> {
    if let Some(name) = &target.network {
        return Ok(Scope::Network(name.clone()));
    }
    if let Some(name) = &target.arch {
        return Ok(Scope::Architecture(name.clone()));
    }
    if let [only] = ws.architectures() {
        return Ok(Scope::Architecture(only.name.clone()));
    }
    if ws.architectures().is_empty() && ws.networks().len() == 1 {
        if let Some(name) = ws.networks().keys().next() {
            return Ok(Scope::Network(name.clone()));
        }
    }
    Err(ArchFlowError::Other(
        "several graphs loaded: pass --network or --arch".to_string(),
    ))
}

/// Accept a node id, or a label that names exactly one node.
pub fn resolve_node(graph: &Graph, key: &str) -> Result<String> {
    if graph.contains(key) {
        return Ok(key.to_string());
    }
    let matches: Vec<&str> = graph
        .nodes()
        .iter()
        .filter(|n| n.label == key)
        .map(|n| n.id.as_str())
        .collect();
    match matches.as_slice() {
        [id] => Ok((*id).to_string()),
        [] => Err(ArchFlowError::UnknownNode(key.to_string())),
        many => Err(ArchFlowError::Other(format!(
            "label '{key}' is ambiguous: {}",
            many.join(", ")
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
