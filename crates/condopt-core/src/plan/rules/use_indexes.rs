//! Rule: serve `FILTER` conditions over a collection scan with index lookups.

use crate::{
    ast::{ExprArena, NodeId, VariableId},
    condition::Condition,
    config::PlannerConfig,
    error::InternalError,
    index::IndexSelection,
    plan::{ExecutionPlan, IndexNode, PlanNode, Projections},
    resource::ResourceMonitor,
};
use std::sync::Arc;

///
/// Candidate
///
/// A collection scan, the calculation producing a filter value over it, and
/// the filter consuming that value.
///

struct Candidate {
    scan: usize,
    calculation: usize,
    filter: usize,
    variable: VariableId,
    expression: NodeId,
}

/// Replace collection scans whose filter an index can serve.
///
/// Projection paths kept on the new lookups are charged to `monitor`.
#[tracing::instrument(skip_all, level = "debug")]
pub fn use_indexes(
    plan: &mut ExecutionPlan,
    config: &PlannerConfig,
    monitor: &ResourceMonitor,
) -> Result<bool, InternalError> {
    let mut changed = false;
    let mut position = 0;

    while position < plan.len() {
        if let Some(candidate) = find_candidate(plan, position) {
            changed |= apply(plan, config, monitor, &candidate)?;
        }
        position += 1;
    }

    Ok(changed)
}

fn find_candidate(plan: &ExecutionPlan, scan: usize) -> Option<Candidate> {
    let PlanNode::EnumerateCollection(node) = plan.node(scan)? else {
        return None;
    };
    let variable = node.out_variable;
    let mut visible = plan.variables_bound_before(scan);
    visible.insert(variable);

    for (filter, candidate) in plan.nodes().iter().enumerate().skip(scan + 1) {
        let PlanNode::Filter(filter_node) = candidate else {
            continue;
        };

        let found = plan.nodes()[scan + 1..filter]
            .iter()
            .enumerate()
            .find_map(|(offset, node)| match node {
                PlanNode::Calculation(calc) if calc.out_variable == filter_node.in_variable => {
                    Some((scan + 1 + offset, calc.expression))
                }
                _ => None,
            });
        let Some((calculation, expression)) = found else {
            continue;
        };

        let used = plan.arena.variables_of(expression);
        if used.contains(&variable) && used.is_subset(&visible) {
            return Some(Candidate {
                scan,
                calculation,
                filter,
                variable,
                expression,
            });
        }
    }

    None
}

fn apply(
    plan: &mut ExecutionPlan,
    config: &PlannerConfig,
    monitor: &ResourceMonitor,
    candidate: &Candidate,
) -> Result<bool, InternalError> {
    let Some(PlanNode::EnumerateCollection(scan)) = plan.node(candidate.scan).cloned() else {
        return Ok(false);
    };
    let variable = candidate.variable;

    let mut condition = Condition::from_root(plan.arena.deep_clone(candidate.expression));
    condition.normalize(&mut plan.arena, config.normalize.optimization)?;

    let mut node = if condition.is_always_false(&plan.arena) {
        IndexNode::new(Arc::clone(&scan.collection), variable, condition, Vec::new())
    } else {
        let selection = condition.find_indexes(
            &plan.arena,
            variable,
            scan.collection.indexes(),
            &scan.hint,
            None,
            scan.collection.estimated_count(),
        )?;
        if !selection.used_for_filter {
            return Ok(false);
        }

        let (lookup, filter) = split_condition(&mut plan.arena, variable, condition, &selection)?;
        let mut node = IndexNode::new(
            Arc::clone(&scan.collection),
            variable,
            lookup,
            selection.indexes,
        );
        node.filter = filter;
        node
    };
    if let Some(filter) = node.filter {
        let usage = plan.arena.attribute_usage(filter, variable);
        node.filter_projections = Projections::from_usage(&usage, monitor)?.unwrap_or_default();
    }

    let calc_variable = plan
        .node(candidate.calculation)
        .and_then(|n| n.variables_set().first().copied());
    plan.remove(candidate.filter);
    if calc_variable.is_some_and(|var| !plan.is_used_after(candidate.calculation, var)) {
        plan.remove(candidate.calculation);
    }

    let usage = plan.attribute_usage_after(candidate.scan, variable);
    if let Some(mut projections) = Projections::from_usage(&usage, monitor)? {
        if let Some(index) = node.single_index() {
            projections.set_covering_index(index.as_ref());
        }
        node.projections = projections;
    }
    plan.replace(candidate.scan, PlanNode::Index(node));

    Ok(true)
}

// Split into the part the chosen indexes evaluate and a residual post-filter.
fn split_condition(
    arena: &mut ExprArena,
    variable: VariableId,
    mut condition: Condition,
    selection: &IndexSelection,
) -> Result<(Condition, Option<NodeId>), InternalError> {
    let single_branch = match condition.branches(arena) {
        [branch] => Some(*branch),
        _ => None,
    };
    if let ([index], Some(branch)) = (selection.indexes.as_slice(), single_branch) {
        let specialized = index.specialize_condition(arena, branch, variable);
        let and = arena.nary_and(specialized);
        let or = arena.nary_or(vec![and]);
        let lookup = Condition::normalized(Some(or));

        condition.remove_index_condition(arena, variable, &lookup, index.as_ref())?;
        let filter = if condition.is_empty(arena) {
            None
        } else {
            condition.root()
        };

        return Ok((lookup, filter));
    }

    condition.sort_ors(arena, variable, &selection.indexes);
    let fully_served = condition
        .branches(arena)
        .iter()
        .zip(&selection.indexes)
        .all(|(branch, index)| {
            index.specialize_condition(arena, *branch, variable).len() == arena.num_members(*branch)
        });
    let filter = if fully_served { None } else { condition.root() };

    Ok((condition, filter))
}
