use crate::{
    ast::{ExprArena, NodeId, VariableId},
    condition::{Condition, ConditionPart},
    index::Index,
    value::{Value, canonical_cmp},
};
use std::{cmp::Ordering, sync::Arc};

impl Condition {
    /// Order OR branches by the lower bound each puts on the first field of
    /// the single index serving them, so per-branch lookups stream in index
    /// order.
    ///
    /// Returns whether the condition is now sorted. A condition with a
    /// branch that does not bound that field stays unsorted.
    pub fn sort_ors(
        &mut self,
        arena: &mut ExprArena,
        variable: VariableId,
        indexes: &[Arc<dyn Index>],
    ) -> bool {
        if self.is_sorted {
            return true;
        }
        let Some(root) = self.root.filter(|_| self.is_normalized) else {
            return false;
        };

        let branches = arena.members(root).to_vec();
        if branches.len() <= 1 {
            self.is_sorted = true;
            return true;
        }

        let Some(first) = indexes.first() else {
            return false;
        };
        if indexes.iter().any(|index| index.id() != first.id()) {
            return false;
        }
        let Some(field) = first.fields().first().map(ToString::to_string) else {
            return false;
        };

        let mut keyed: Vec<(Value, bool, NodeId)> = Vec::with_capacity(branches.len());
        for branch in branches {
            let bound = arena.members(branch).iter().find_map(|member| {
                let part = ConditionPart::for_variable(arena, *member, variable)?;
                if part.attribute_name != field || part.quantifier.is_some() {
                    return None;
                }
                let lower = part.lower_bound(arena)?;
                Some((lower, part.is_lower_inclusive()))
            });
            let Some((lower, inclusive)) = bound else {
                return false;
            };
            keyed.push((lower, inclusive, branch));
        }

        keyed.sort_by(|(a, a_inclusive, _), (b, b_inclusive, _)| {
            canonical_cmp(a, b).then_with(|| match (a_inclusive, b_inclusive) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => Ordering::Equal,
            })
        });

        let sorted = keyed.into_iter().map(|(_, _, branch)| branch).collect();
        self.root = Some(arena.nary_or(sorted));
        self.is_sorted = true;

        true
    }
}
