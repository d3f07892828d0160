//! Rule: compose straight-line runs of index lookups into one join.
//!
//! A run is a sequence of eligible `IndexNode`s, possibly separated by
//! calculations or materializations that do not read anything the run
//! produced or computed. Subsets of the run always keep its first lookup and are tried
//! longest first; the first subset whose members can all be looked up through
//! a streaming index iterator wins.

use crate::{
    ast::{AttributeUsage, CompareOp, ExprArena, NodeId, NodeKind, VariableId},
    config::PlannerConfig,
    index::{Index, StreamOptions},
    obs::{PlannerEvent, sink},
    plan::{ExecutionPlan, IndexNode, JoinMember, JoinNode, PlanNode, rules::JoinRejection},
};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

///
/// Run
///
/// Plan positions of consecutive eligible lookups. `stopped_at_ineligible`
/// is set when the run ended on a lookup that failed eligibility.
/// Skipped steps stay where they are, so nothing a later lookup reads may
/// be computed by them.
///

#[derive(Debug, Default)]
struct Run {
    positions: Vec<usize>,
    stopped_at_ineligible: bool,
}

///
/// MemberKeys
///
/// Index field positions one member is looked up on.
///

#[derive(Debug, Default)]
struct MemberKeys {
    key_fields: BTreeSet<usize>,
    constants: BTreeMap<usize, NodeId>,
}

/// Fold eligible lookup runs into joins. Returns whether the plan changed.
#[tracing::instrument(skip_all, level = "debug")]
pub fn join_indexes(plan: &mut ExecutionPlan, config: &PlannerConfig) -> bool {
    let max_len = config.join.max_chain_len();
    let mut changed = false;
    let mut position = 0;

    while position < plan.len() {
        let run = discover_run(plan, position);
        if run.positions.len() == 1 && run.stopped_at_ineligible {
            sink::record(PlannerEvent::JoinRejected {
                candidates: 2,
                reason: JoinRejection::IndexNotEligible,
            });
        }
        if run.positions.len() >= 2 && compose(plan, &run.positions, max_len) {
            prune_projections(plan, position);
            changed = true;
        }
        position += 1;
    }

    changed
}

/// Whether a lookup may take part in a join.
fn is_eligible(node: &IndexNode) -> bool {
    let Some(index) = node.single_index() else {
        return false;
    };

    node.condition.root().is_some()
        && node.options.ascending
        && index.is_sorted()
        && !index.sparse()
        && !index.fields().is_empty()
        && !index.has_expansion()
}

fn discover_run(plan: &ExecutionPlan, start: usize) -> Run {
    let mut run = Run::default();
    match plan.node(start) {
        Some(PlanNode::Index(node)) if is_eligible(node) => run.positions.push(start),
        _ => return run,
    }

    let arena = &plan.arena;
    let mut produced = plan.nodes()[start].variables_set().into_iter().collect::<BTreeSet<_>>();
    let mut computed = BTreeSet::new();

    for (position, node) in plan.nodes().iter().enumerate().skip(start + 1) {
        match node {
            PlanNode::Index(index_node) => {
                if !is_eligible(index_node) {
                    run.stopped_at_ineligible = true;
                    break;
                }
                if !index_node.variables_used(arena).is_disjoint(&computed) {
                    break;
                }
                produced.extend(index_node.variables_set());
                run.positions.push(position);
            }
            PlanNode::Calculation(_) | PlanNode::Materialize(_) => {
                let used = node.variables_used(arena);
                if !used.is_disjoint(&produced) || !used.is_disjoint(&computed) {
                    break;
                }
                computed.extend(node.variables_set());
            }
            _ => break,
        }
    }

    run
}

// Try subsets of the run, longest first, each containing the run's head.
fn compose(plan: &mut ExecutionPlan, run: &[usize], max_len: usize) -> bool {
    let mut first_rejection = None;

    for size in (2..=run.len().min(max_len)).rev() {
        for tail in combinations(&run[1..], size - 1) {
            let positions = std::iter::once(run[0]).chain(tail).collect::<Vec<_>>();
            match build_join(plan, &positions) {
                Ok(join) => {
                    sink::record(PlannerEvent::JoinComposed {
                        members: join.members.len(),
                    });
                    for position in positions[1..].iter().rev() {
                        plan.remove(*position);
                    }
                    plan.replace(positions[0], PlanNode::Join(join));
                    return true;
                }
                Err(reason) => {
                    first_rejection.get_or_insert(reason);
                }
            }
        }
    }

    if let Some(reason) = first_rejection {
        sink::record(PlannerEvent::JoinRejected {
            candidates: run.len(),
            reason,
        });
    }

    false
}

/// `k`-element subsets of `items` in lexicographic position order.
fn combinations(items: &[usize], k: usize) -> Vec<Vec<usize>> {
    if k == 0 {
        return vec![Vec::new()];
    }
    if items.len() < k {
        return Vec::new();
    }

    let mut out = Vec::new();
    for (i, head) in items.iter().enumerate() {
        for mut rest in combinations(&items[i + 1..], k - 1) {
            rest.insert(0, *head);
            out.push(rest);
        }
    }

    out
}

fn build_join(plan: &mut ExecutionPlan, positions: &[usize]) -> Result<JoinNode, JoinRejection> {
    let nodes = positions
        .iter()
        .filter_map(|position| plan.node(*position).and_then(PlanNode::as_index))
        .cloned()
        .collect::<Vec<_>>();
    if nodes.len() != positions.len() {
        return Err(JoinRejection::IndexNotEligible);
    }

    let arena = &plan.arena;
    let bound = plan.variables_bound_before(positions[0]);
    let mut keys = nodes.iter().map(|_| MemberKeys::default()).collect::<Vec<_>>();
    for (i, node) in nodes.iter().enumerate().skip(1) {
        collect_keys(arena, &nodes, i, &mut keys)?;

        // Post-filters run per member, before later plan nodes bind anything.
        if let Some(filter) = node.filter {
            let mut read = arena.variables_of(filter);
            read.remove(&node.out_variable);
            if !read.is_subset(&bound) {
                return Err(JoinRejection::FilterDependsOnChain);
            }
        }
    }

    for (node, member_keys) in nodes.iter().zip(&mut keys) {
        if member_keys.key_fields.is_empty() {
            member_keys.key_fields.insert(0);
        }
        let options = StreamOptions {
            used_key_fields: member_keys.key_fields.iter().copied().collect(),
            constant_fields: member_keys.constants.keys().copied().collect(),
            projected_fields: node.projections.covered_positions(),
        };
        if !node.single_index().is_some_and(|index| index.supports_stream_interface(&options)) {
            return Err(JoinRejection::StreamInterfaceUnsupported);
        }
    }

    let members = nodes
        .into_iter()
        .zip(keys)
        .filter_map(|(node, member_keys)| into_member(&mut plan.arena, node, member_keys))
        .collect::<Vec<_>>();
    if members.len() != positions.len() {
        return Err(JoinRejection::IndexNotEligible);
    }

    Ok(JoinNode { members })
}

// Record how member `i` is keyed: every condition member must pin one of its
// index fields to a constant or to an index field of an earlier member.
fn collect_keys(
    arena: &ExprArena,
    nodes: &[IndexNode],
    i: usize,
    keys: &mut [MemberKeys],
) -> Result<(), JoinRejection> {
    let node = &nodes[i];
    let index = node.single_index().ok_or(JoinRejection::IndexNotEligible)?;
    let members = node
        .condition
        .single_branch(arena)
        .ok_or(JoinRejection::ConditionNotConjunctive)?;

    for member in members {
        let NodeKind::Compare {
            op: CompareOp::Eq,
            quantifier: None,
        } = arena.kind(*member)
        else {
            return Err(JoinRejection::UnsupportedConditionMember);
        };
        let [lhs, rhs] = arena.members(*member) else {
            return Err(JoinRejection::UnsupportedConditionMember);
        };

        let (field, other) = index_field_of(arena, node.out_variable, index.as_ref(), *lhs)
            .map(|field| (field, *rhs))
            .or_else(|| {
                index_field_of(arena, node.out_variable, index.as_ref(), *rhs).map(|field| (field, *lhs))
            })
            .ok_or(JoinRejection::UnsupportedConditionMember)?;

        if arena.is_constant(other) {
            keys[i].constants.entry(field).or_insert(other);
            continue;
        }

        let (j, other_field) = nodes[..i]
            .iter()
            .enumerate()
            .find_map(|(j, earlier)| {
                let earlier_index = earlier.single_index()?;
                index_field_of(arena, earlier.out_variable, earlier_index.as_ref(), other)
                    .map(|field| (j, field))
            })
            .ok_or(JoinRejection::UnsupportedConditionMember)?;
        keys[i].key_fields.insert(field);
        keys[j].key_fields.insert(other_field);
    }

    Ok(())
}

/// Position in `index` of the field `node` reads from `variable`.
fn index_field_of(arena: &ExprArena, variable: VariableId, index: &dyn Index, node: NodeId) -> Option<usize> {
    let (var, path) = arena.attribute_access_for_variable(node)?;
    if var != variable {
        return None;
    }

    index.fields().iter().position(|field| *field == path)
}

fn into_member(arena: &mut ExprArena, node: IndexNode, keys: MemberKeys) -> Option<JoinMember> {
    let index = Arc::clone(node.single_index()?);
    let expressions = keys
        .constants
        .values()
        .map(|expr| arena.deep_clone(*expr))
        .collect();

    Some(JoinMember {
        used_as_satellite: node.collection.is_satellite(),
        collection: node.collection,
        out_variable: node.out_variable,
        condition: node.condition,
        filter: node.filter,
        filter_projections: node.filter_projections,
        index,
        projections: node.projections,
        produces_output: node.produces_output,
        is_late_materialized: node.late_materialized.is_some(),
        expressions,
        used_key_fields: keys.key_fields.into_iter().collect(),
        constant_fields: keys.constants.into_keys().collect(),
    })
}

// Drop projections of non-final members that neither later members nor
// anything after the join reads. A member left without projections only
// filters.
fn prune_projections(plan: &mut ExecutionPlan, position: usize) {
    let Some(PlanNode::Join(join)) = plan.node(position) else {
        return;
    };
    let mut join = join.clone();
    let last = join.members.len().saturating_sub(1);

    for i in 0..last {
        if join.members[i].projections.is_empty() {
            continue;
        }
        let variable = join.members[i].out_variable;

        let mut usage = plan.attribute_usage_after(position, variable);
        for later in &join.members[i + 1..] {
            for expr in later.condition.root().into_iter().chain(later.filter) {
                usage.merge(plan.arena.attribute_usage(expr, variable));
            }
        }

        let member = &mut join.members[i];
        match usage {
            AttributeUsage::Whole => continue,
            AttributeUsage::Unused => member.projections.retain(|_| false),
            AttributeUsage::Paths(paths) => member.projections.retain(|projection| {
                paths
                    .iter()
                    .any(|path| projection.path.is_prefix_of(path) || path.is_prefix_of(&projection.path))
            }),
        }
        if member.projections.is_empty() {
            member.produces_output = false;
        }
    }

    plan.replace(position, PlanNode::Join(join));
}
