//! Observability: planner decision events and the sink boundary.
//!
//! Planner logic never writes to a global state. Every decision flows through
//! [`PlannerEvent`] and [`sink::record`], which logs via `tracing` and forwards
//! to a scoped sink if one is installed.

pub(crate) mod sink;

use crate::plan::rules::JoinRejection;

pub use sink::{PlannerTraceSink, RecordingSink, with_trace_sink};

///
/// BranchRemoval
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BranchRemoval {
    /// The AND of two members on one attribute is empty.
    Impossible,
    /// An IN-list became empty after intersection or filtering.
    EmptyInList,
    /// Structurally identical to an earlier branch.
    Duplicate,
}

///
/// PlannerEvent
///

#[derive(Clone, Debug, PartialEq)]
pub enum PlannerEvent {
    ConditionNormalized {
        branches: usize,
        members: usize,
    },
    BranchRemoved {
        reason: BranchRemoval,
    },
    IndexSelected {
        index: String,
        estimated_items: usize,
        estimated_costs: f64,
    },
    JoinComposed {
        members: usize,
    },
    JoinRejected {
        candidates: usize,
        reason: JoinRejection,
    },
}
