//! Graph layer: model, depth layering, reachability, gated flow evaluation,
//! playback scheduling, coarse views, and label search.

pub mod depth;
pub mod flow;
pub mod gate;
pub mod hierarchy;
pub mod model;
pub mod reachability;
pub mod registry;
pub mod search;
pub mod sequencer;

pub use depth::{assign_depths, compute_depths, CyclicGraphError};
pub use flow::{evaluate_flow, FlowTrace};
pub use gate::{FailReason, GateInputs, GateOutcome};
pub use hierarchy::{coarse_view, CoarseView};
pub use model::{combine, Architecture, Diagnostic, Graph, Network, Route};
pub use reachability::{chain_of, neighborhood, Neighborhood};
pub use registry::FlowRegistry;
pub use search::{search, SearchMode};
pub use sequencer::{RevealEvent, Schedule, Sequencer};
