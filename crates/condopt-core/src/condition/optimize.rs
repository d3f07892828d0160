//! Branch-local simplification of a DNF condition, plus the cheaper
//! shape-preserving pass for trees that must not be distributed.
//!
//! Each AND branch is driven to a fixed point: every step either proves the
//! branch unsatisfiable, removes a member, merges two members into one, or
//! shrinks a constant IN-list. Each of those strictly shrinks the branch, so
//! the loop terminates.

use crate::{
    ast::{CompareOp, ExprArena, NodeId, NodeKind},
    condition::{
        AttributeSide, Condition, ConditionPart,
        table::{CompareResult, operation_weight},
    },
    obs::{BranchRemoval, PlannerEvent, sink},
    value::{Value, values_equal},
};

impl Condition {
    /// Sort and deduplicate IN-lists and drop duplicate junction children,
    /// without changing the shape of the tree.
    pub fn optimize_non_dnf(&mut self, arena: &mut ExprArena) {
        if let Some(root) = self.root {
            self.root = Some(simplify_tree(arena, root));
        }
    }
}

// One unit of progress on a branch.
enum Step {
    Unsatisfiable(BranchRemoval),
    Remove(usize),
    Merge {
        first: usize,
        second: usize,
        with: NodeId,
    },
    Rewrite {
        at: usize,
        with: NodeId,
    },
}

/// Simplify every branch of `root` (an OR of ANDs) and drop duplicates.
pub(super) fn optimize_dnf(arena: &mut ExprArena, root: NodeId) -> NodeId {
    let branches = arena.members(root).to_vec();
    let mut kept: Vec<NodeId> = Vec::with_capacity(branches.len());

    for branch in branches {
        let original = arena.members(branch).to_vec();
        let mut members = original
            .iter()
            .map(|m| canonical_in_list(arena, *m))
            .collect::<Vec<_>>();
        order_members(arena, &mut members);

        if let Err(reason) = optimize_branch(arena, &mut members) {
            sink::record(PlannerEvent::BranchRemoved { reason });
            continue;
        }

        let branch = if members == original {
            branch
        } else {
            arena.nary_and(members)
        };
        if kept.iter().any(|k| arena.structurally_equal(*k, branch)) {
            sink::record(PlannerEvent::BranchRemoved {
                reason: BranchRemoval::Duplicate,
            });
            continue;
        }

        kept.push(branch);
    }

    arena.nary_or(kept)
}

// Weight order, node type as tie-break, then IN comparisons moved to the
// front keeping their relative order.
fn order_members(arena: &ExprArena, members: &mut Vec<NodeId>) {
    members.sort_by_key(|m| {
        let kind = arena.kind(*m);
        (operation_weight(kind.compare_op()), kind.type_tag())
    });

    let (mut ins, rest): (Vec<NodeId>, Vec<NodeId>) = members
        .iter()
        .copied()
        .partition(|m| arena.kind(*m).compare_op() == Some(CompareOp::In));
    ins.extend(rest);
    *members = ins;
}

fn optimize_branch(arena: &mut ExprArena, members: &mut Vec<NodeId>) -> Result<(), BranchRemoval> {
    while let Some(step) = next_step(arena, members) {
        match step {
            Step::Unsatisfiable(reason) => return Err(reason),
            Step::Remove(at) => {
                members.remove(at);
            }
            Step::Merge {
                first,
                second,
                with,
            } => {
                members[first] = with;
                members.remove(second);
            }
            Step::Rewrite { at, with } => members[at] = with,
        }
    }

    Ok(())
}

fn next_step(arena: &mut ExprArena, members: &[NodeId]) -> Option<Step> {
    let parts = members
        .iter()
        .enumerate()
        .filter_map(|(i, m)| ConditionPart::from_member(arena, *m).map(|p| (i, p)))
        .collect::<Vec<_>>();

    for (_, part) in &parts {
        if plain_in_list(arena, part).is_some_and(|list| list.is_empty()) {
            return Some(Step::Unsatisfiable(BranchRemoval::EmptyInList));
        }
    }

    for (a, (i, first)) in parts.iter().enumerate() {
        for (j, second) in &parts[a + 1..] {
            if !first.same_attribute(second) {
                continue;
            }
            if let Some(step) = merge_pair(arena, (*i, first), (*j, second)) {
                return Some(step);
            }
        }
    }

    None
}

fn merge_pair(
    arena: &mut ExprArena,
    (i, first): (usize, &ConditionPart),
    (j, second): (usize, &ConditionPart),
) -> Option<Step> {
    if first.quantifier.is_some() || second.quantifier.is_some() {
        return None;
    }

    match (plain_in_list(arena, first), plain_in_list(arena, second)) {
        (Some(left), Some(right)) => Some(intersect(arena, (i, first, left), (j, right))),
        (Some(list), None) if !second.is_expanded => filter_in_list(arena, (i, first, list), (j, second)),
        (None, Some(list)) if !first.is_expanded => filter_in_list(arena, (j, second, list), (i, first)),
        (None, None) => match first.compare_with(arena, second)? {
            CompareResult::Impossible => Some(Step::Unsatisfiable(BranchRemoval::Impossible)),
            CompareResult::OtherContainedInSelf => Some(Step::Remove(i)),
            CompareResult::SelfContainedInOther => Some(Step::Remove(j)),
            CompareResult::ConvertEqual => {
                let with = arena.compare(CompareOp::Eq, first.attribute_node, first.value_node);
                Some(Step::Merge {
                    first: i,
                    second: j,
                    with,
                })
            }
            CompareResult::Disjoint => None,
        },
        _ => None,
    }
}

// IN ∩ IN on one attribute. A side whose list survives whole implies the
// other and makes it redundant.
fn intersect(
    arena: &mut ExprArena,
    (i, first, left): (usize, &ConditionPart, Vec<Value>),
    (j, right): (usize, Vec<Value>),
) -> Step {
    let common = left
        .iter()
        .filter(|v| right.iter().any(|w| values_equal(v, w)))
        .cloned()
        .collect::<Vec<_>>();

    if common.is_empty() {
        Step::Unsatisfiable(BranchRemoval::EmptyInList)
    } else if common.len() == left.len() {
        Step::Remove(j)
    } else if common.len() == right.len() {
        Step::Remove(i)
    } else {
        let with = in_comparison(arena, first, common);
        Step::Merge {
            first: i,
            second: j,
            with,
        }
    }
}

// Keep only IN elements that satisfy the other comparison on the attribute.
fn filter_in_list(
    arena: &mut ExprArena,
    (at, part, list): (usize, &ConditionPart, Vec<Value>),
    (other_at, other): (usize, &ConditionPart),
) -> Option<Step> {
    let mut kept = Vec::with_capacity(list.len());
    for value in &list {
        if other.accepts(arena, value)? {
            kept.push(value.clone());
        }
    }

    Some(if kept.is_empty() {
        Step::Unsatisfiable(BranchRemoval::EmptyInList)
    } else if kept.len() == list.len() {
        Step::Remove(other_at)
    } else {
        Step::Rewrite {
            at,
            with: in_comparison(arena, part, kept),
        }
    })
}

// Constant IN-list of a non-expanded `attr IN [..]` member.
fn plain_in_list(arena: &ExprArena, part: &ConditionPart) -> Option<Vec<Value>> {
    if part.is_expanded || part.side != AttributeSide::Left || part.quantifier.is_some() {
        return None;
    }

    part.in_list(arena)
}

fn in_comparison(arena: &mut ExprArena, part: &ConditionPart, values: Vec<Value>) -> NodeId {
    let list = arena.constant_array(values);
    arena.compare(CompareOp::In, part.attribute_node, list)
}

/// Replace a constant IN / NOT IN list by its sorted, deduplicated form.
pub(super) fn canonical_in_list(arena: &mut ExprArena, member: NodeId) -> NodeId {
    if !matches!(
        arena.kind(member).compare_op(),
        Some(CompareOp::In | CompareOp::NotIn)
    ) {
        return member;
    }

    let lhs = arena.member_unchecked(member, 0);
    let rhs = arena.member_unchecked(member, 1);
    if !arena.is_array(rhs) {
        return member;
    }
    let Some(Value::List(mut values)) = arena.constant_value(rhs) else {
        return member;
    };
    if Value::is_sorted_unique(&values) {
        return member;
    }

    Value::sort_dedup(&mut values);
    let list = arena.constant_array(values);
    arena.shallow_copy_with_members(member, vec![lhs, list])
}

fn simplify_tree(arena: &mut ExprArena, id: NodeId) -> NodeId {
    let kind = arena.kind(id).clone();
    match kind {
        NodeKind::Compare { .. } => canonical_in_list(arena, id),
        NodeKind::Not => {
            let operand = arena.member_unchecked(id, 0);
            let simplified = simplify_tree(arena, operand);
            if simplified == operand {
                id
            } else {
                arena.not(simplified)
            }
        }
        NodeKind::And | NodeKind::Or | NodeKind::NaryAnd | NodeKind::NaryOr => {
            let original = arena.members(id).to_vec();
            let mut members: Vec<NodeId> = Vec::with_capacity(original.len());
            for member in &original {
                let simplified = simplify_tree(arena, *member);
                if !members.iter().any(|m| arena.structurally_equal(*m, simplified)) {
                    members.push(simplified);
                }
            }

            if members == original {
                id
            } else if matches!(kind, NodeKind::And | NodeKind::Or) && members.len() == 1 {
                members[0]
            } else {
                arena.shallow_copy_with_members(id, members)
            }
        }
        _ => id,
    }
}
