use crate::{
    ast::{CompareOp, ExprArena, NodeId, NodeKind, VariableId},
    condition::Condition,
    path::AttributePath,
};
use std::collections::BTreeSet;

impl Condition {
    /// Attributes of `variable` pinned by `==` to a constant or to another
    /// variable, in a single-branch condition. Multi-branch conditions pin
    /// nothing.
    #[must_use]
    pub fn get_const_attributes(
        &self,
        arena: &ExprArena,
        variable: VariableId,
        include_null: bool,
    ) -> BTreeSet<AttributePath> {
        let mut out = BTreeSet::new();
        let Some(members) = self.single_branch(arena) else {
            return out;
        };

        for member in members {
            let NodeKind::Compare {
                op: CompareOp::Eq,
                quantifier: None,
            } = arena.kind(*member)
            else {
                continue;
            };
            let lhs = arena.member_unchecked(*member, 0);
            let rhs = arena.member_unchecked(*member, 1);

            for (attribute, pinned) in [(lhs, rhs), (rhs, lhs)] {
                let Some((var, path)) = arena.attribute_access_for_variable(attribute) else {
                    continue;
                };
                if var != variable || path.has_expansion() {
                    continue;
                }
                if pins_value(arena, pinned, variable, include_null) {
                    out.insert(path);
                }
            }
        }

        out
    }

    /// Attributes of `variable` proven non-null by `!= null` or `> null`
    /// (or the mirrored `null != x`, `null < x`), in a single-branch
    /// condition.
    #[must_use]
    pub fn get_non_null_attributes(
        &self,
        arena: &ExprArena,
        variable: VariableId,
    ) -> BTreeSet<AttributePath> {
        let mut out = BTreeSet::new();
        let Some(members) = self.single_branch(arena) else {
            return out;
        };

        for member in members {
            let NodeKind::Compare {
                op,
                quantifier: None,
            } = arena.kind(*member)
            else {
                continue;
            };
            let lhs = arena.member_unchecked(*member, 0);
            let rhs = arena.member_unchecked(*member, 1);

            let attribute = match op {
                CompareOp::Ne | CompareOp::Gt if arena.is_null_value(rhs) => lhs,
                CompareOp::Ne | CompareOp::Lt if arena.is_null_value(lhs) => rhs,
                _ => continue,
            };
            if let Some((var, path)) = arena.attribute_access_for_variable(attribute)
                && var == variable
                && !path.has_expansion()
            {
                out.insert(path);
            }
        }

        out
    }
}

fn pins_value(arena: &ExprArena, node: NodeId, variable: VariableId, include_null: bool) -> bool {
    if arena.is_constant(node) {
        return include_null || !arena.is_null_value(node);
    }

    match arena.kind(node) {
        NodeKind::Reference(var) => *var != variable,
        _ => arena
            .attribute_variable(node)
            .is_some_and(|var| var != variable),
    }
}
