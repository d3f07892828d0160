//! ## Crate layout
//! - `core`: expression arena, conditions, index oracle, plan model and
//!   optimizer rules.
//! - `utils`: stable hashing shared by the core.
//!
//! The `prelude` module mirrors the surface a query compiler needs to build
//! a plan and run the optimizer over it.

pub use condopt_core as core;
pub use condopt_utils as utils;

pub use condopt_core::{error::InternalError as Error, plan::rules::optimize};

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use crate::core::{
        ast::{CompareOp, ExprArena, NodeId, Quantifier, VariableId},
        condition::{Condition, ConditionOptimization},
        config::PlannerConfig,
        index::{FieldIndex, Index as _, IndexHint},
        path::AttributePath,
        plan::{
            Collection, CollectionRegistry, ExecutionPlan, IndexStrategy, JoinNode, PlanNode,
            rules::optimize,
        },
        value::Value,
    };
}
