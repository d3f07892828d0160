use crate::{
    ast::{CompareOp, ExprArena, NodeId, NodeKind, Quantifier, VariableId},
    condition::table::{self, CompareResult},
    value::{Value, canonical_cmp, values_equal},
};
use std::{cmp::Ordering, collections::HashSet};

/// Above this product of list lengths, IN containment switches to hashing.
const QUADRATIC_CONTAINMENT_LIMIT: usize = 2048;

///
/// AttributeSide
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AttributeSide {
    Left,
    Right,
}

///
/// ConditionPart
///
/// One comparison seen as `attribute OP value`. Reversible operators are
/// mirrored when the attribute was the right operand, so the attribute is
/// always the logical left side. Parts borrow nothing; they are rebuilt per
/// pass and refer to arena nodes by handle.
///

#[derive(Clone, Debug)]
pub struct ConditionPart {
    pub variable: VariableId,
    pub attribute_name: String,
    pub op: Option<CompareOp>,
    pub quantifier: Option<Quantifier>,
    pub operator_node: NodeId,
    pub attribute_node: NodeId,
    pub value_node: NodeId,
    pub side: AttributeSide,
    pub is_expanded: bool,
}

impl ConditionPart {
    #[must_use]
    pub fn new(
        arena: &ExprArena,
        variable: VariableId,
        attribute_name: impl Into<String>,
        operator_node: NodeId,
        side: AttributeSide,
    ) -> Self {
        let attribute_name = attribute_name.into();
        let is_expanded = attribute_name.contains("[*]");

        let (op, quantifier, attribute_node, value_node) = match arena.kind(operator_node) {
            NodeKind::Compare { op, quantifier } => {
                let lhs = arena.member_unchecked(operator_node, 0);
                let rhs = arena.member_unchecked(operator_node, 1);
                match side {
                    AttributeSide::Left => (Some(*op), *quantifier, lhs, rhs),
                    AttributeSide::Right if op.is_reversible() => {
                        (Some(op.reverse()), *quantifier, rhs, lhs)
                    }
                    AttributeSide::Right => (Some(*op), *quantifier, rhs, lhs),
                }
            }
            _ => (None, None, operator_node, operator_node),
        };

        Self {
            variable,
            attribute_name,
            op,
            quantifier,
            operator_node,
            attribute_node,
            value_node,
            side,
            is_expanded,
        }
    }

    /// Part for the first operand that is an attribute chain, left first.
    #[must_use]
    pub fn from_member(arena: &ExprArena, member: NodeId) -> Option<Self> {
        Self::locate(arena, member, None)
    }

    /// Part for an operand that is an attribute chain off `variable`.
    #[must_use]
    pub fn for_variable(arena: &ExprArena, member: NodeId, variable: VariableId) -> Option<Self> {
        Self::locate(arena, member, Some(variable))
    }

    fn locate(arena: &ExprArena, member: NodeId, variable: Option<VariableId>) -> Option<Self> {
        if !matches!(arena.kind(member), NodeKind::Compare { .. }) {
            return None;
        }

        [AttributeSide::Left, AttributeSide::Right]
            .into_iter()
            .find_map(|side| {
                let operand = arena.member_unchecked(member, usize::from(side == AttributeSide::Right));
                let (var, path) = arena.attribute_access_for_variable(operand)?;
                if variable.is_some_and(|wanted| wanted != var) {
                    return None;
                }

                Some(Self::new(arena, var, path.to_string(), member, side))
            })
    }

    /// Same variable and attribute.
    #[must_use]
    pub fn same_attribute(&self, other: &Self) -> bool {
        self.variable == other.variable && self.attribute_name == other.attribute_name
    }

    #[must_use]
    pub fn has_constant_value(&self, arena: &ExprArena) -> bool {
        arena.is_constant(self.value_node)
    }

    #[must_use]
    pub fn constant_value(&self, arena: &ExprArena) -> Option<Value> {
        arena.constant_value(self.value_node)
    }

    /// Constant IN-list, if this is `attr IN [constants]`.
    #[must_use]
    pub fn in_list(&self, arena: &ExprArena) -> Option<Vec<Value>> {
        if self.op != Some(CompareOp::In) || !arena.is_array(self.value_node) {
            return None;
        }

        match arena.constant_value(self.value_node)? {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Whether this comparison becomes redundant given `other`.
    ///
    /// `is_reversed` tells whether the two operands face each other from
    /// opposite sides of their comparisons.
    #[must_use]
    pub fn is_covered_by(&self, arena: &ExprArena, other: &Self, is_reversed: bool) -> bool {
        if !self.same_attribute(other) {
            return false;
        }

        if !self.is_expanded
            && !other.is_expanded
            && is_reversed
            && self.op == Some(CompareOp::Eq)
            && let (Some(list), Some(value)) = (other.in_list(arena), self.constant_value(arena))
        {
            return list.iter().any(|item| values_equal(item, &value));
        }

        if !self.is_expanded
            && !other.is_expanded
            && let (Some(mine), Some(theirs)) = (self.in_list(arena), other.in_list(arena))
        {
            return list_contained_in(&mine, &theirs);
        }

        match (self.quantifier, other.quantifier) {
            (None, None) => {}
            (Some(mine), Some(theirs)) => {
                if mine != theirs || mine == Quantifier::Any || self.op != other.op {
                    return false;
                }
                return match (self.constant_value(arena), other.constant_value(arena)) {
                    (Some(a), Some(b)) => values_equal(&a, &b),
                    _ => false,
                };
            }
            _ => return false,
        }

        matches!(
            self.compare_with(arena, other),
            Some(
                CompareResult::OtherContainedInSelf
                    | CompareResult::ConvertEqual
                    | CompareResult::Impossible
            )
        )
    }

    /// Truth-table verdict for `self` against `other`.
    ///
    /// Non-constant values only compare when both are deterministic and print
    /// identically; anything else, including a print failure, yields `None`.
    #[must_use]
    pub fn compare_with(&self, arena: &ExprArena, other: &Self) -> Option<CompareResult> {
        let ordering = match (other.constant_value(arena), self.constant_value(arena)) {
            (Some(theirs), Some(mine)) => canonical_cmp(&theirs, &mine),
            _ => {
                if !arena.is_deterministic(other.value_node)
                    || !arena.is_deterministic(self.value_node)
                {
                    return None;
                }
                let theirs = arena.print(other.value_node).ok()?;
                let mine = arena.print(self.value_node).ok()?;
                if theirs != mine {
                    return None;
                }
                Ordering::Equal
            }
        };

        Some(table::lookup(
            self.is_expanded || other.is_expanded,
            ordering,
            other.op,
            self.op,
        ))
    }

    /// Lower bound of the accepted range, if one-sided from below.
    ///
    /// For IN the list must already be sorted; normalization guarantees it.
    #[must_use]
    pub fn lower_bound(&self, arena: &ExprArena) -> Option<Value> {
        match self.op? {
            CompareOp::Eq | CompareOp::Ge | CompareOp::Gt => self.constant_value(arena),
            CompareOp::In => {
                let list = self.in_list(arena)?;
                debug_assert!(Value::is_sorted_unique(&list), "IN list must be sorted");
                list.into_iter().next()
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn is_lower_inclusive(&self) -> bool {
        matches!(
            self.op,
            Some(CompareOp::Eq | CompareOp::Ge | CompareOp::In)
        )
    }

    /// Upper bound of the accepted range, if one-sided from above.
    ///
    /// For IN the list must already be sorted; normalization guarantees it.
    #[must_use]
    pub fn upper_bound(&self, arena: &ExprArena) -> Option<Value> {
        match self.op? {
            CompareOp::Eq | CompareOp::Le | CompareOp::Lt => self.constant_value(arena),
            CompareOp::In => {
                let list = self.in_list(arena)?;
                debug_assert!(Value::is_sorted_unique(&list), "IN list must be sorted");
                list.into_iter().next_back()
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn is_upper_inclusive(&self) -> bool {
        matches!(
            self.op,
            Some(CompareOp::Eq | CompareOp::Le | CompareOp::In)
        )
    }

    /// Membership test against a constant IN-list.
    #[must_use]
    pub fn value_in_list(&self, arena: &ExprArena, value: &Value) -> bool {
        self.in_list(arena)
            .is_some_and(|list| list.iter().any(|item| values_equal(item, value)))
    }

    /// Whether `value` satisfies `attr OP self.value` for a plain comparison.
    #[must_use]
    pub fn accepts(&self, arena: &ExprArena, value: &Value) -> Option<bool> {
        let bound = self.constant_value(arena)?;
        let ordering = canonical_cmp(value, &bound);

        match self.op? {
            CompareOp::Eq => Some(ordering.is_eq()),
            CompareOp::Ne => Some(ordering.is_ne()),
            CompareOp::Lt => Some(ordering.is_lt()),
            CompareOp::Le => Some(ordering.is_le()),
            CompareOp::Ge => Some(ordering.is_ge()),
            CompareOp::Gt => Some(ordering.is_gt()),
            CompareOp::In | CompareOp::NotIn => None,
        }
    }
}

// Every element of `mine` appears in `theirs`.
pub(super) fn list_contained_in(mine: &[Value], theirs: &[Value]) -> bool {
    if mine.len().saturating_mul(theirs.len()) < QUADRATIC_CONTAINMENT_LIMIT {
        return mine
            .iter()
            .all(|v| theirs.iter().any(|w| values_equal(v, w)));
    }

    let keys = theirs
        .iter()
        .map(Value::canonical_key)
        .collect::<HashSet<_>>();
    mine.iter().all(|v| keys.contains(&v.canonical_key()))
}
