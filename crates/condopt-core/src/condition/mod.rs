//! Module: condition
//! Responsibility: boolean filter conditions in two-level canonical form.
//! Does not own: leaf comparison nodes, which live in the shared `ExprArena`.
//!
//! A `Condition` moves through `unnormalized → normalized → sorted` and
//! never goes back. Normalization rewrites only the junction structure; the
//! comparison leaves it points at are shared with the rest of the plan.

mod attributes;
mod fingerprint;
mod normalize;
mod optimize;
mod part;
mod persist;
mod remove;
mod sort;
mod table;

#[cfg(test)]
mod tests;

use crate::{
    ast::{ExprArena, NodeId, NodeKind, VariableId},
    error::InternalError,
};
use serde::Deserialize;
use std::collections::BTreeSet;

pub use part::{AttributeSide, ConditionPart};
pub use persist::PersistedCondition;
pub use table::CompareResult;

///
/// ConditionOptimization
///
/// How much rewriting `normalize` performs beyond DNF conversion.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOptimization {
    /// Push negations and run branch-local simplification.
    #[default]
    Auto,
    /// Leave `NOT` in place and skip simplification.
    NoNegation,
    /// Push negations but skip simplification.
    NoSimplify,
}

impl ConditionOptimization {
    #[must_use]
    pub const fn pushes_negation(self) -> bool {
        !matches!(self, Self::NoNegation)
    }

    #[must_use]
    pub const fn simplifies(self) -> bool {
        matches!(self, Self::Auto)
    }
}

///
/// Condition
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Condition {
    root: Option<NodeId>,
    is_normalized: bool,
    is_sorted: bool,
}

impl Condition {
    /// Empty, unnormalized condition.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            root: None,
            is_normalized: false,
            is_sorted: false,
        }
    }

    #[must_use]
    pub const fn from_root(root: NodeId) -> Self {
        Self {
            root: Some(root),
            is_normalized: false,
            is_sorted: false,
        }
    }

    /// Normalized condition matching everything: an OR of one empty AND.
    pub fn always_true(arena: &mut ExprArena) -> Self {
        let branch = arena.nary_and(Vec::new());
        let root = arena.nary_or(vec![branch]);

        Self {
            root: Some(root),
            is_normalized: true,
            is_sorted: false,
        }
    }

    pub(crate) const fn normalized(root: Option<NodeId>) -> Self {
        Self {
            root,
            is_normalized: true,
            is_sorted: false,
        }
    }

    #[must_use]
    pub const fn root(&self) -> Option<NodeId> {
        self.root
    }

    #[must_use]
    pub const fn is_normalized(&self) -> bool {
        self.is_normalized
    }

    #[must_use]
    pub const fn is_sorted(&self) -> bool {
        self.is_sorted
    }

    /// No root, or a root with no members.
    #[must_use]
    pub fn is_empty(&self, arena: &ExprArena) -> bool {
        self.root.is_none_or(|root| arena.num_members(root) == 0)
    }

    /// Normalized to an OR without branches: nothing can match.
    #[must_use]
    pub fn is_always_false(&self, arena: &ExprArena) -> bool {
        self.is_normalized
            && self
                .root
                .is_some_and(|root| arena.kind(root).is_or() && arena.num_members(root) == 0)
    }

    /// No constraint at all: no root, or some branch without members.
    #[must_use]
    pub fn is_always_true(&self, arena: &ExprArena) -> bool {
        match self.root {
            None => true,
            Some(root) => {
                self.is_normalized
                    && arena
                        .members(root)
                        .iter()
                        .any(|branch| arena.num_members(*branch) == 0)
            }
        }
    }

    /// Top-level OR branches of a normalized condition.
    #[must_use]
    pub fn branches<'a>(&self, arena: &'a ExprArena) -> &'a [NodeId] {
        match self.root {
            Some(root) if self.is_normalized => arena.members(root),
            _ => &[],
        }
    }

    /// Members of the only branch, if there is exactly one.
    #[must_use]
    pub fn single_branch<'a>(&self, arena: &'a ExprArena) -> Option<&'a [NodeId]> {
        match self.branches(arena) {
            [branch] => Some(arena.members(*branch)),
            _ => None,
        }
    }

    /// Conjoin `node` onto this condition. Only legal before normalization.
    pub fn and_combine(&mut self, arena: &mut ExprArena, node: NodeId) -> Result<(), InternalError> {
        if self.is_normalized {
            return Err(InternalError::condition_invariant(
                "cannot and-combine a normalized condition",
            ));
        }

        self.root = Some(match self.root {
            Some(root) => arena.and(root, node),
            None => node,
        });

        Ok(())
    }

    /// Every variable the condition reads.
    #[must_use]
    pub fn variables(&self, arena: &ExprArena) -> BTreeSet<VariableId> {
        self.root
            .map(|root| arena.variables_of(root))
            .unwrap_or_default()
    }

    /// Deep copy into `target`, keeping the normalization state.
    #[must_use]
    pub fn clone_into(&self, arena: &ExprArena, target: &mut ExprArena) -> Self {
        Self {
            root: self.root.map(|root| arena.clone_into(root, target)),
            is_normalized: self.is_normalized,
            is_sorted: self.is_sorted,
        }
    }

    /// Query-syntax rendering, for explain output and diagnostics.
    pub fn print(&self, arena: &ExprArena) -> Result<String, InternalError> {
        match self.root {
            Some(root) => arena.print(root),
            None => Ok("true".to_string()),
        }
    }

    // Two-level shape check used by debug assertions and tests.
    pub(crate) fn is_dnf(&self, arena: &ExprArena) -> bool {
        let Some(root) = self.root else {
            return true;
        };

        matches!(arena.kind(root), NodeKind::NaryOr)
            && arena.members(root).iter().all(|branch| {
                matches!(arena.kind(*branch), NodeKind::NaryAnd)
                    && arena
                        .members(*branch)
                        .iter()
                        .all(|leaf| !arena.kind(*leaf).is_junction())
            })
    }
}
