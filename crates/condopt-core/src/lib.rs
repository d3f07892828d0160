//! Condition optimizer core: expression arena, condition normalization and
//! simplification, index selection, and index-join composition over a
//! linear execution plan.

// public exports are one module level down
pub mod ast;
pub mod condition;
pub mod config;
pub mod error;
pub mod index;
pub mod obs;
pub mod path;
pub mod plan;
pub mod resource;
pub mod serialize;
pub mod value;

///
/// Prelude
///
/// Domain vocabulary for building conditions and plans.
/// Errors, codecs, and trace sinks stay in their modules.
///

pub mod prelude {
    pub use crate::{
        ast::{CompareOp, ExprArena, NodeId, Quantifier, VariableId},
        condition::{Condition, ConditionOptimization, ConditionPart},
        config::PlannerConfig,
        index::{FieldIndex, Index, IndexHint, SortCondition},
        path::AttributePath,
        plan::{Collection, CollectionRegistry, ExecutionPlan, PlanNode},
        value::Value,
    };
}
