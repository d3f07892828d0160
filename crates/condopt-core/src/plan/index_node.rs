use crate::{
    ast::{ExprArena, NodeId, VariableId},
    condition::Condition,
    index::Index,
    plan::{Collection, Projections},
};
use std::{collections::BTreeSet, sync::Arc};

///
/// IndexStrategy
///
/// How an index scan produces its rows.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IndexStrategy {
    /// The lookup condition is unsatisfiable; nothing is read.
    NoResult,
    /// Every needed attribute comes from index entries.
    Covering,
    /// Each index hit fetches its document.
    DocumentFetch,
    /// Emits document ids; a later materialize step fetches documents.
    LateMaterialized,
    /// Only the number of hits is needed.
    Count,
}

///
/// IndexIteratorOptions
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IndexIteratorOptions {
    pub ascending: bool,
    pub sorted: bool,
}

impl Default for IndexIteratorOptions {
    fn default() -> Self {
        Self {
            ascending: true,
            sorted: false,
        }
    }
}

///
/// IndexNode
///
/// A per-row index lookup over one collection. `indexes` holds one index
/// per OR branch of `condition`.
///

#[derive(Clone, Debug)]
pub struct IndexNode {
    pub collection: Arc<Collection>,
    pub out_variable: VariableId,
    pub condition: Condition,
    pub indexes: Vec<Arc<dyn Index>>,
    pub options: IndexIteratorOptions,
    pub projections: Projections,
    pub filter: Option<NodeId>,
    pub filter_projections: Projections,
    pub count_only: bool,
    pub late_materialized: Option<VariableId>,
    pub produces_output: bool,
}

impl IndexNode {
    #[must_use]
    pub fn new(
        collection: Arc<Collection>,
        out_variable: VariableId,
        condition: Condition,
        indexes: Vec<Arc<dyn Index>>,
    ) -> Self {
        Self {
            collection,
            out_variable,
            condition,
            indexes,
            options: IndexIteratorOptions::default(),
            projections: Projections::default(),
            filter: None,
            filter_projections: Projections::default(),
            count_only: false,
            late_materialized: None,
            produces_output: true,
        }
    }

    /// The single index serving every branch, if there is exactly one.
    #[must_use]
    pub fn single_index(&self) -> Option<&Arc<dyn Index>> {
        match self.indexes.as_slice() {
            [index] => Some(index),
            _ => None,
        }
    }

    #[must_use]
    pub fn strategy(&self, arena: &ExprArena) -> IndexStrategy {
        if self.condition.is_always_false(arena) {
            return IndexStrategy::NoResult;
        }
        if self.count_only {
            return IndexStrategy::Count;
        }
        if self.late_materialized.is_some() {
            return IndexStrategy::LateMaterialized;
        }

        let covered = |projections: &Projections| {
            projections.is_empty()
                || self
                    .single_index()
                    .is_some_and(|index| index.covers(projections))
        };
        if !self.projections.is_empty()
            && covered(&self.projections)
            && covered(&self.filter_projections)
        {
            IndexStrategy::Covering
        } else {
            IndexStrategy::DocumentFetch
        }
    }

    #[must_use]
    pub fn variables_set(&self) -> Vec<VariableId> {
        std::iter::once(self.out_variable)
            .chain(self.late_materialized)
            .collect()
    }

    /// Outer variables read by the lookup condition or the post-filter.
    #[must_use]
    pub fn variables_used(&self, arena: &ExprArena) -> BTreeSet<VariableId> {
        let mut used = self.condition.variables(arena);
        if let Some(filter) = self.filter {
            arena.variables_used(filter, &mut used);
        }
        used.remove(&self.out_variable);

        used
    }
}
