//! Module: plan::rules
//! Responsibility: plan rewrites that move filtering into index lookups and
//! compose chains of lookups into multi-way joins.
//! Does not own: cost estimation, which stays with the index oracle.

mod join;
mod use_indexes;


use crate::{config::PlannerConfig, error::InternalError, plan::ExecutionPlan};

pub use join::join_indexes;
pub use use_indexes::use_indexes;

/// Longest chain of index lookups folded into a single join.
pub const MAX_JOIN_CHAIN_LEN: usize = 4;

///
/// JoinRejection
///
/// Why a candidate chain could not be turned into a join.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JoinRejection {
    IndexNotEligible,
    ConditionNotConjunctive,
    UnsupportedConditionMember,
    FilterDependsOnChain,
    StreamInterfaceUnsupported,
}

/// Run every enabled rule in order. Returns whether the plan changed.
///
/// One resource monitor, sized by `config.memory_limit`, spans the whole
/// pass; exceeding it aborts with `ResourceExhausted`.
pub fn optimize(plan: &mut ExecutionPlan, config: &PlannerConfig) -> Result<bool, InternalError> {
    let monitor = config.resource_monitor();
    let mut changed = false;
    if config.rules.use_indexes {
        changed |= use_indexes(plan, config, &monitor)?;
    }
    if config.rules.join_indexes {
        changed |= join_indexes(plan, config);
    }

    Ok(changed)
}
