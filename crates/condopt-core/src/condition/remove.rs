//! Redundancy removal against a condition that is already enforced
//! elsewhere (by an index lookup or a traversal step), and pruning of
//! members whose variables went out of scope.

use crate::{
    ast::{CompareOp, ExprArena, NodeId, VariableId},
    condition::{AttributeSide, Condition, ConditionPart},
    error::InternalError,
    index::Index,
    path::AttributePath,
};
use std::collections::BTreeSet;

impl Condition {
    /// Drop members of this single-branch condition that `index_condition`,
    /// served by `index`, already guarantees.
    ///
    /// A sparse index on exactly one field also guarantees that field is
    /// not null, so `field != null` and `field > null` go unconditionally.
    pub fn remove_index_condition(
        &mut self,
        arena: &mut ExprArena,
        variable: VariableId,
        index_condition: &Condition,
        index: &dyn Index,
    ) -> Result<(), InternalError> {
        let sparse_field = match index.fields() {
            [field] if index.sparse() => Some(field.clone()),
            _ => None,
        };

        self.remove_covered(arena, variable, index_condition, sparse_field.as_ref())
    }

    /// Drop members of this single-branch condition that a traversal step
    /// enforcing `other` already guarantees.
    pub fn remove_traversal_condition(
        &mut self,
        arena: &mut ExprArena,
        variable: VariableId,
        other: &Condition,
    ) -> Result<(), InternalError> {
        self.remove_covered(arena, variable, other, None)
    }

    fn remove_covered(
        &mut self,
        arena: &mut ExprArena,
        variable: VariableId,
        other: &Condition,
        sparse_field: Option<&AttributePath>,
    ) -> Result<(), InternalError> {
        if !self.is_normalized {
            return Err(InternalError::condition_invariant(
                "redundancy removal requires a normalized condition",
            ));
        }
        let (Some(members), Some(other_members)) =
            (self.single_branch(arena), other.single_branch(arena))
        else {
            return Ok(());
        };
        let members = members.to_vec();

        let covering = other_members
            .iter()
            .filter_map(|m| ConditionPart::for_variable(arena, *m, variable))
            .collect::<Vec<_>>();

        let kept = members
            .iter()
            .copied()
            .filter(|member| {
                let Some(part) = ConditionPart::for_variable(arena, *member, variable) else {
                    return true;
                };
                if sparse_field.is_some_and(|field| excludes_null_on(arena, &part, field)) {
                    return false;
                }
                let is_reversed = part.side == AttributeSide::Right;

                !covering
                    .iter()
                    .any(|other| part.is_covered_by(arena, other, is_reversed))
            })
            .collect::<Vec<NodeId>>();

        if kept.len() == members.len() {
            return Ok(());
        }

        self.root = if kept.is_empty() {
            None
        } else {
            let branch = arena.nary_and(kept);
            Some(arena.nary_or(vec![branch]))
        };
        self.is_sorted = false;

        Ok(())
    }

    /// Drop members that read a variable outside `valid`.
    ///
    /// An AND branch left without members is vacuously true, which makes
    /// the whole condition unconstrained: the root is cleared and `true` is
    /// returned.
    pub fn remove_invalid_variables(
        &mut self,
        arena: &mut ExprArena,
        valid: &BTreeSet<VariableId>,
    ) -> Result<bool, InternalError> {
        if !self.is_normalized {
            return Err(InternalError::condition_invariant(
                "variable pruning requires a normalized condition",
            ));
        }
        let Some(root) = self.root else {
            return Ok(false);
        };

        let branches = arena.members(root).to_vec();
        let mut rebuilt = Vec::with_capacity(branches.len());
        let mut changed = false;

        for branch in branches {
            let members = arena.members(branch).to_vec();
            let kept = members
                .iter()
                .copied()
                .filter(|m| arena.variables_of(*m).is_subset(valid))
                .collect::<Vec<_>>();

            if kept.is_empty() {
                self.root = None;
                self.is_sorted = false;
                return Ok(true);
            }
            if kept.len() == members.len() {
                rebuilt.push(branch);
            } else {
                changed = true;
                rebuilt.push(arena.nary_and(kept));
            }
        }

        if changed {
            self.root = Some(arena.nary_or(rebuilt));
        }

        Ok(false)
    }
}

fn excludes_null_on(arena: &ExprArena, part: &ConditionPart, field: &AttributePath) -> bool {
    part.side == AttributeSide::Left
        && matches!(part.op, Some(CompareOp::Ne | CompareOp::Gt))
        && part.quantifier.is_none()
        && arena.is_null_value(part.value_node)
        && part.attribute_name == field.to_string()
}
