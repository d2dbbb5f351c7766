//! Gate rules for flow evaluation.
//!
//! Each rule compares the inputs currently active in the chain against the
//! inputs declared in the full graph. Rules are plain functions dispatched on
//! [`NodeType`] so each can be exercised on its own.

use serde::Serialize;

use crate::types::NodeType;

/// Inbound edge counts for one node during one evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateInputs {
    /// STANDARD edges into the node that are part of the chain.
    pub standard_active: usize,
    /// STANDARD edges into the node in the full graph.
    pub standard_declared: usize,
    /// SUPPRESS edges into the node that are part of the chain.
    pub suppress_active: usize,
    /// SUPPRESS edges into the node in the full graph.
    pub suppress_declared: usize,
}

/// Why a gate did not let the signal through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailReason {
    /// ANY gate with no active standard input.
    NoActiveInput,
    /// Some declared standard input is not active.
    MissingStandardInput { active: usize, declared: usize },
    /// Every declared suppress input is active.
    FullySuppressed { declared: usize },
    /// The gate declares no standard input at all.
    NoDeclaredInputs,
}

impl std::fmt::Display for FailReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoActiveInput => f.write_str("no active input"),
            Self::MissingStandardInput { active, declared } => {
                write!(f, "{active}/{declared} standard inputs active")
            }
            Self::FullySuppressed { declared } => {
                write!(f, "fully suppressed ({declared}/{declared})")
            }
            Self::NoDeclaredInputs => f.write_str("no declared inputs"),
        }
    }
}

/// Result of evaluating one gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Pass,
    Fail(FailReason),
}

impl GateOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// Evaluate the gate of a node of type `node_type`.
pub fn evaluate(node_type: NodeType, inputs: &GateInputs) -> GateOutcome {
    match node_type {
        NodeType::Standard => GateOutcome::Pass,
        NodeType::Any => any_gate(inputs),
        NodeType::All => all_gate(inputs),
        NodeType::Suppression => suppression_gate(inputs),
    }
}

/// Passes when at least one standard input is active.
pub fn any_gate(inputs: &GateInputs) -> GateOutcome {
    if inputs.standard_active == 0 {
        GateOutcome::Fail(FailReason::NoActiveInput)
    } else {
        GateOutcome::Pass
    }
}

/// Passes when every declared standard input is active.
pub fn all_gate(inputs: &GateInputs) -> GateOutcome {
    if inputs.standard_declared == 0 {
        return GateOutcome::Fail(FailReason::NoDeclaredInputs);
    }
    standard_inputs_complete(inputs)
}

/// Passes when every declared standard input is active and at least one
/// declared suppress input is not.
pub fn suppression_gate(inputs: &GateInputs) -> GateOutcome {
    if inputs.standard_declared == 0 {
        return GateOutcome::Fail(FailReason::NoDeclaredInputs);
    }
    if let GateOutcome::Fail(reason) = standard_inputs_complete(inputs) {
        return GateOutcome::Fail(reason);
    }
    if inputs.suppress_active == inputs.suppress_declared {
        return GateOutcome::Fail(FailReason::FullySuppressed {
            declared: inputs.suppress_declared,
        });
    }
    GateOutcome::Pass
}

fn standard_inputs_complete(inputs: &GateInputs) -> GateOutcome {
    if inputs.standard_active != inputs.standard_declared {
        GateOutcome::Fail(FailReason::MissingStandardInput {
            active: inputs.standard_active,
            declared: inputs.standard_declared,
        })
    } else {
        GateOutcome::Pass
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
