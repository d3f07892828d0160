//! DNF conversion: preorder negation push-down and operand canonicalization,
//! postorder flattening and distribution, then root fix-up.

use crate::{
    ast::{ExprArena, NodeId, NodeKind},
    condition::{Condition, ConditionOptimization, optimize},
    error::InternalError,
    obs::{PlannerEvent, sink},
    value::Value,
};

impl Condition {
    /// Rewrite into an OR of ANDs of leaves. A second call is a no-op.
    pub fn normalize(
        &mut self,
        arena: &mut ExprArena,
        optimization: ConditionOptimization,
    ) -> Result<(), InternalError> {
        if self.is_normalized {
            return Ok(());
        }

        let Some(root) = self.root else {
            self.is_normalized = true;
            return Ok(());
        };

        let root = preorder(arena, root, optimization.pushes_negation());
        let root = postorder(arena, root);
        let mut root = fix_root(arena, root);

        if optimization.simplifies() {
            root = optimize::optimize_dnf(arena, root);
        }

        self.root = Some(root);
        self.is_normalized = true;
        debug_assert!(self.is_dnf(arena), "normalize must produce an OR of ANDs");

        let branches = arena.members(root);
        sink::record(PlannerEvent::ConditionNormalized {
            branches: branches.len(),
            members: branches.iter().map(|b| arena.num_members(*b)).sum(),
        });

        Ok(())
    }
}

///
/// PREORDER
///

fn preorder(arena: &mut ExprArena, id: NodeId, push_negation: bool) -> NodeId {
    match arena.kind(id).clone() {
        NodeKind::And | NodeKind::NaryAnd => {
            let members = preorder_members(arena, id, push_negation);
            arena.nary_and(members)
        }
        NodeKind::Or | NodeKind::NaryOr => {
            let members = preorder_members(arena, id, push_negation);
            arena.nary_or(members)
        }
        NodeKind::Not if push_negation => {
            let operand = arena.member_unchecked(id, 0);
            negate(arena, operand)
        }
        NodeKind::Compare {
            op,
            quantifier: None,
        } if op.is_swappable() => {
            let lhs = arena.member_unchecked(id, 0);
            let rhs = arena.member_unchecked(id, 1);
            if should_swap(arena, lhs, rhs) {
                arena.compare(op.reverse(), rhs, lhs)
            } else {
                id
            }
        }
        _ => id,
    }
}

fn preorder_members(arena: &mut ExprArena, id: NodeId, push_negation: bool) -> Vec<NodeId> {
    let members = arena.members(id).to_vec();
    members
        .into_iter()
        .map(|m| preorder(arena, m, push_negation))
        .collect()
}

// Node equivalent to `NOT id`, with the negation pushed to the leaves.
fn negate(arena: &mut ExprArena, id: NodeId) -> NodeId {
    match arena.kind(id).clone() {
        NodeKind::Not => {
            let operand = arena.member_unchecked(id, 0);
            preorder(arena, operand, true)
        }
        NodeKind::And | NodeKind::NaryAnd => {
            let members = negate_members(arena, id);
            arena.nary_or(members)
        }
        NodeKind::Or | NodeKind::NaryOr => {
            let members = negate_members(arena, id);
            arena.nary_and(members)
        }
        NodeKind::Compare {
            op,
            quantifier: None,
        } => {
            let lhs = arena.member_unchecked(id, 0);
            let rhs = arena.member_unchecked(id, 1);
            let negated = arena.compare(op.negate(), lhs, rhs);
            preorder(arena, negated, true)
        }
        NodeKind::Constant(Value::Bool(flag)) => arena.constant(!flag),
        _ => {
            let operand = preorder(arena, id, true);
            arena.not(operand)
        }
    }
}

fn negate_members(arena: &mut ExprArena, id: NodeId) -> Vec<NodeId> {
    let members = arena.members(id).to_vec();
    members.into_iter().map(|m| negate(arena, m)).collect()
}

// Attribute accesses go left. Two attribute accesses are ordered by their
// printed form; an unprintable operand leaves the comparison as written.
fn should_swap(arena: &ExprArena, lhs: NodeId, rhs: NodeId) -> bool {
    match (arena.is_attribute_access(lhs), arena.is_attribute_access(rhs)) {
        (false, true) => true,
        (true, true) => match (arena.print(lhs), arena.print(rhs)) {
            (Ok(left), Ok(right)) => left > right,
            _ => false,
        },
        _ => false,
    }
}

///
/// POSTORDER
///

fn postorder(arena: &mut ExprArena, id: NodeId) -> NodeId {
    let kind = arena.kind(id).clone();
    if !matches!(kind, NodeKind::NaryAnd | NodeKind::NaryOr) {
        return id;
    }

    let children = arena.members(id).to_vec();
    let children = children
        .into_iter()
        .map(|m| postorder(arena, m))
        .collect::<Vec<_>>();
    let members = flatten(arena, &kind, children);

    let distribute = matches!(kind, NodeKind::NaryAnd)
        && members
            .iter()
            .any(|m| matches!(arena.kind(*m), NodeKind::NaryOr));
    if !distribute {
        return match kind {
            NodeKind::NaryAnd => arena.nary_and(members),
            _ => arena.nary_or(members),
        };
    }

    // One choice list per child: an OR offers its members, anything else
    // offers itself. Every combination becomes one AND branch.
    let choices = members
        .iter()
        .map(|m| match arena.kind(*m) {
            NodeKind::NaryOr => arena.members(*m).to_vec(),
            _ => vec![*m],
        })
        .collect::<Vec<_>>();

    let mut combinations: Vec<Vec<NodeId>> = vec![Vec::new()];
    for choice in choices {
        combinations = combinations
            .into_iter()
            .flat_map(|prefix| {
                choice.iter().map(move |pick| {
                    let mut next = prefix.clone();
                    next.push(*pick);
                    next
                })
            })
            .collect();
    }

    let branches = combinations
        .into_iter()
        .map(|combination| {
            let members = flatten(arena, &NodeKind::NaryAnd, combination);
            arena.nary_and(members)
        })
        .collect();

    arena.nary_or(branches)
}

// Splice children of the same junction kind into their parent.
fn flatten(arena: &ExprArena, kind: &NodeKind, children: Vec<NodeId>) -> Vec<NodeId> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        if arena.kind(child) == kind {
            out.extend_from_slice(arena.members(child));
        } else {
            out.push(child);
        }
    }

    out
}

///
/// FIX ROOT
///

// Force exactly OR → AND → leaves, dropping no-op placeholders.
fn fix_root(arena: &mut ExprArena, root: NodeId) -> NodeId {
    let branches = match arena.kind(root) {
        NodeKind::NaryOr => arena.members(root).to_vec(),
        _ => vec![root],
    };

    let branches = branches
        .into_iter()
        .map(|branch| {
            let members = match arena.kind(branch) {
                NodeKind::NaryAnd => arena.members(branch).to_vec(),
                _ => vec![branch],
            };
            let members = members
                .into_iter()
                .filter(|m| !matches!(arena.kind(*m), NodeKind::Nop))
                .collect();
            arena.nary_and(members)
        })
        .collect();

    arena.nary_or(branches)
}
