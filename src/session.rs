//! Interaction state: maps user actions onto engine calls.
//!
//! A session wraps one graph (a single network or an architecture's combined
//! graph) and tracks what is selected. In highlight mode a selection shows
//! the node's full ancestor/descendant chain; in flow mode each selected node
//! is an independent flow origin. Every selection change cancels playback.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::time::Duration;

use crate::config::{ArchFlowConfig, DisplayMode};
use crate::error::{ArchFlowError, Result};
use crate::graph::model::Graph;
use crate::graph::reachability::chain_of;
use crate::graph::registry::FlowRegistry;
use crate::graph::search::{search, SearchMode};
use crate::graph::sequencer::{RevealEvent, Schedule, Sequencer};
use crate::viz::RenderPayload;

pub struct Session<'g> {
    graph: Cow<'g, Graph>,
    mode: DisplayMode,
    selected: Vec<String>,
    highlighted: BTreeSet<String>,
    search_hits: BTreeSet<String>,
    registry: FlowRegistry,
    sequencer: Sequencer,
    schedule: Option<Schedule>,
    round_duration: Duration,
    search_mode: SearchMode,
    autoplay: bool,
}

impl<'g> Session<'g> {
    pub fn new(graph: Cow<'g, Graph>, config: &ArchFlowConfig) -> Self {
        Self {
            graph,
            mode: config.display.default_mode,
            selected: Vec::new(),
            highlighted: BTreeSet::new(),
            search_hits: BTreeSet::new(),
            registry: FlowRegistry::new(),
            sequencer: Sequencer::new(),
            schedule: None,
            round_duration: config.round_duration(),
            search_mode: config.search.mode,
            autoplay: config.playback.autoplay,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Switch modes. Selections do not carry over.
    pub fn set_mode(&mut self, mode: DisplayMode) {
        if mode != self.mode {
            self.clear_all();
            self.mode = mode;
        }
    }

    /// Selected node ids in selection order.
    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    /// Nodes lit in highlight mode: the union of every selected node's
    /// chain plus the latest search hits.
    pub fn highlighted(&self) -> BTreeSet<String> {
        self.highlighted.union(&self.search_hits).cloned().collect()
    }

    pub fn registry(&self) -> &FlowRegistry {
        &self.registry
    }

    /// Toggle `node_id`. Returns whether it is selected afterwards.
    pub fn select(&mut self, node_id: &str) -> Result<bool> {
        if !self.graph.contains(node_id) {
            return Err(ArchFlowError::UnknownNode(node_id.to_string()));
        }
        self.cancel_playback();

        let now_selected = match self.selected.iter().position(|s| s == node_id) {
            Some(i) => {
                self.selected.remove(i);
                false
            }
            None => {
                self.selected.push(node_id.to_string());
                true
            }
        };

        match self.mode {
            DisplayMode::Highlight => self.rebuild_highlight(),
            DisplayMode::Flow => {
                if now_selected {
                    self.registry.select(&self.graph, node_id);
                } else {
                    self.registry.remove(node_id);
                }
                if self.autoplay && !self.registry.is_empty() {
                    self.start_playback();
                }
            }
        }

        tracing::debug!(node = node_id, selected = now_selected, mode = %self.mode, "selection changed");
        Ok(now_selected)
    }

    /// Run a label search and light the matches. Returns the matching ids.
    pub fn search(&mut self, query: &str) -> Result<Vec<String>> {
        let hits = search(&self.graph, query, self.search_mode)?;
        self.search_hits = hits.iter().cloned().collect();
        Ok(hits)
    }

    /// Drop every selection, search hit and flow trace, and stop playback.
    pub fn clear_all(&mut self) {
        self.cancel_playback();
        self.selected.clear();
        self.highlighted.clear();
        self.search_hits.clear();
        self.registry.clear();
    }

    /// Start replaying the merged flow chain. Returns the playback
    /// generation, or `None` when there is nothing to play.
    pub fn start_playback(&mut self) -> Option<u64> {
        if self.registry.is_empty() {
            return None;
        }
        let schedule = Schedule::new(&self.registry.merged(), self.round_duration);
        let generation = self.sequencer.start(&schedule);
        self.schedule = Some(schedule);
        Some(generation)
    }

    /// Advance playback by `delta`.
    pub fn tick(&mut self, generation: u64, delta: Duration) -> Vec<RevealEvent> {
        self.sequencer.tick(generation, delta)
    }

    pub fn is_playing(&self) -> bool {
        self.sequencer.is_playing()
    }

    /// Time until the next reveal of the current playback.
    pub fn next_due(&self) -> Option<Duration> {
        self.sequencer.next_due()
    }

    pub fn schedule(&self) -> Option<&Schedule> {
        self.schedule.as_ref()
    }

    /// Current state as renderer input.
    pub fn payload(&self) -> RenderPayload {
        let base = RenderPayload::new(&self.graph, self.mode).with_selection(&self.selected);
        match self.mode {
            DisplayMode::Highlight => base.with_highlight(&self.highlighted()),
            DisplayMode::Flow => base.with_flow(&self.registry, self.schedule.as_ref()),
        }
    }

    fn rebuild_highlight(&mut self) {
        self.highlighted = self
            .selected
            .iter()
            .flat_map(|id| chain_of(&self.graph, id))
            .collect();
    }

    fn cancel_playback(&mut self) {
        self.sequencer.cancel();
        self.schedule = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
