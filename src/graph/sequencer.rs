//! Timed playback of a flow chain.
//!
//! A [`Schedule`] groups chain entries into rounds by index. The round with
//! index `i` starts at `i * d`, so indices with no entries still take up
//! their slot: its nodes are revealed immediately and its edges animate from
//! `i * d + d / 2` for `d / 2`. The [`Sequencer`] has no clock of its own; the
//! caller advances it with [`Sequencer::tick`]. Every `start` or `cancel`
//! bumps a generation counter so ticks from a superseded playback do nothing.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::types::{ChainEntry, EntryKind};

/// Default per-round duration.
pub const DEFAULT_ROUND_DURATION: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// Entries sharing one propagation index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Round {
    pub index: u32,
    pub nodes: Vec<String>,
    pub edges: Vec<String>,
}

/// Ordered reveal plan for a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schedule {
    rounds: Vec<Round>,
    #[serde(with = "duration_ms")]
    round_duration: Duration,
    fingerprint: String,
}

impl Schedule {
    pub fn new(entries: &[ChainEntry], round_duration: Duration) -> Self {
        let mut sorted: Vec<&ChainEntry> = entries.iter().collect();
        sorted.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let mut grouped: BTreeMap<u32, Round> = BTreeMap::new();
        for entry in &sorted {
            let round = grouped.entry(entry.index).or_insert_with(|| Round {
                index: entry.index,
                nodes: Vec::new(),
                edges: Vec::new(),
            });
            match entry.kind {
                EntryKind::Node => round.nodes.push(entry.id.clone()),
                EntryKind::Edge => round.edges.push(entry.id.clone()),
            }
        }

        Self {
            rounds: grouped.into_values().collect(),
            round_duration,
            fingerprint: fingerprint(&sorted),
        }
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn round_duration(&self) -> Duration {
        self.round_duration
    }

    /// Offset of the last round's end: `(last index + 1) * d`.
    pub fn total_duration(&self) -> Duration {
        self.rounds
            .last()
            .map(|r| self.start_of(r.index.saturating_add(1)))
            .unwrap_or(Duration::ZERO)
    }

    fn start_of(&self, index: u32) -> Duration {
        self.round_duration.saturating_mul(index)
    }

    /// Hex SHA-256 of the chain. Equal chains give equal fingerprints
    /// regardless of entry order.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Every reveal step with its offset from playback start.
    pub fn timeline(&self) -> Vec<(Duration, RevealEvent)> {
        let d = self.round_duration;
        let mut events = Vec::with_capacity(self.rounds.len() * 2 + 1);
        for round in &self.rounds {
            let start = self.start_of(round.index);
            if !round.nodes.is_empty() {
                events.push((
                    start,
                    RevealEvent::ShowNodes {
                        round: round.index,
                        nodes: round.nodes.clone(),
                    },
                ));
            }
            if !round.edges.is_empty() {
                events.push((
                    start + d / 2,
                    RevealEvent::AnimateEdges {
                        round: round.index,
                        edges: round.edges.clone(),
                        duration: d / 2,
                    },
                ));
            }
        }
        events.push((self.total_duration(), RevealEvent::Finished));
        events
    }
}

fn fingerprint(sorted: &[&ChainEntry]) -> String {
    let mut hasher = Sha256::new();
    for entry in sorted {
        let kind = match entry.kind {
            EntryKind::Node => "n",
            EntryKind::Edge => "e",
        };
        hasher.update(format!("{kind}\t{}\t{}\t{}\n", entry.index, entry.id, entry.origin));
    }
    hex::encode(hasher.finalize())
}

mod duration_ms {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

// ---------------------------------------------------------------------------
// Sequencer
// ---------------------------------------------------------------------------

/// One step of a playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RevealEvent {
    ShowNodes {
        round: u32,
        nodes: Vec<String>,
    },
    AnimateEdges {
        round: u32,
        edges: Vec<String>,
        #[serde(with = "duration_ms")]
        duration: Duration,
    },
    Finished,
}

/// Drives a [`Schedule`] from an external clock.
#[derive(Debug, Default)]
pub struct Sequencer {
    generation: u64,
    timeline: Vec<(Duration, RevealEvent)>,
    cursor: usize,
    elapsed: Duration,
    fingerprint: Option<String>,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin playing `schedule` from the start, superseding any current
    /// playback. Returns the generation that must accompany ticks.
    pub fn start(&mut self, schedule: &Schedule) -> u64 {
        self.generation += 1;
        self.timeline = schedule.timeline();
        self.cursor = 0;
        self.elapsed = Duration::ZERO;
        self.fingerprint = Some(schedule.fingerprint().to_string());
        tracing::debug!(
            generation = self.generation,
            rounds = schedule.rounds().len(),
            fingerprint = schedule.fingerprint(),
            "playback started"
        );
        self.generation
    }

    /// Stop the current playback. Pending reveals are dropped.
    pub fn cancel(&mut self) {
        if self.is_playing() {
            tracing::debug!(generation = self.generation, "playback cancelled");
        }
        self.generation += 1;
        self.timeline.clear();
        self.cursor = 0;
        self.elapsed = Duration::ZERO;
        self.fingerprint = None;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_playing(&self) -> bool {
        self.cursor < self.timeline.len()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Fingerprint of the schedule being played, if any.
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// Advance the clock by `delta` and return the events that became due.
    /// Ticks carrying a stale generation return nothing.
    pub fn tick(&mut self, generation: u64, delta: Duration) -> Vec<RevealEvent> {
        if generation != self.generation || !self.is_playing() {
            return Vec::new();
        }
        self.elapsed += delta;
        let mut due = Vec::new();
        while let Some((at, event)) = self.timeline.get(self.cursor) {
            if *at > self.elapsed {
                break;
            }
            due.push(event.clone());
            self.cursor += 1;
        }
        due
    }

    /// Time until the next pending event, if any.
    pub fn next_due(&self) -> Option<Duration> {
        self.timeline
            .get(self.cursor)
            .map(|(at, _)| at.saturating_sub(self.elapsed))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
