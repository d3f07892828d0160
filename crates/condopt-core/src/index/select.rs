use crate::{
    ast::{ExprArena, NodeId, VariableId},
    condition::Condition,
    error::{ErrorOrigin, InternalError, QueryError},
    index::{FilterCosts, Index, SortCondition},
    obs::{PlannerEvent, sink},
};
use std::{cmp::Ordering, sync::Arc};

///
/// IndexHint
///
/// Index names the query author prefers, in order. A forced hint fails the
/// plan instead of falling back to other indexes.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IndexHint {
    pub names: Vec<String>,
    pub forced: bool,
}

impl IndexHint {
    #[must_use]
    pub fn prefer<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            forced: false,
        }
    }

    #[must_use]
    pub fn force<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            forced: true,
            ..Self::prefer(names)
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn position(&self, index: &dyn Index) -> Option<usize> {
        self.names.iter().position(|name| name == index.name())
    }

    fn unusable(&self) -> InternalError {
        InternalError::query(
            ErrorOrigin::Index,
            QueryError::ForcedIndexHintUnusable {
                hint: self.names.join(", "),
            },
        )
    }
}

///
/// IndexSelection
///
/// Outcome of [`Condition::find_indexes`]: one index per OR branch when the
/// filter is served, or a single sort-providing index.
///

#[derive(Clone, Debug, Default)]
pub struct IndexSelection {
    pub indexes: Vec<Arc<dyn Index>>,
    pub used_for_filter: bool,
    pub used_for_sort: bool,
    pub estimated_items: usize,
    pub estimated_costs: f64,
}

impl IndexSelection {
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        self.used_for_filter || self.used_for_sort
    }
}

impl Condition {
    /// Pick indexes for this normalized condition over `variable`.
    ///
    /// Each OR branch gets its own index; if any branch has none, the filter
    /// cannot be served by indexes at all. Hinted indexes win over cheaper
    /// ones. Ties on cost go to the lexicographically smaller name.
    pub fn find_indexes(
        &self,
        arena: &ExprArena,
        variable: VariableId,
        candidates: &[Arc<dyn Index>],
        hint: &IndexHint,
        sort: Option<&SortCondition>,
        items_in_collection: usize,
    ) -> Result<IndexSelection, InternalError> {
        if !self.is_normalized() {
            return Err(InternalError::condition_invariant(
                "index selection requires a normalized condition",
            ));
        }

        let mut selection = IndexSelection::default();
        if !self.is_always_true(arena) && !self.is_always_false(arena) {
            selection = self.select_for_filter(arena, variable, candidates, hint, items_in_collection)?;
        }

        if let Some(sort) = sort.filter(|sort| sort.variable == variable) {
            match selection.indexes.len() {
                0 => {
                    if let Some(index) =
                        cheapest_sort_index(candidates, hint, sort, items_in_collection)
                    {
                        selection.indexes.push(index);
                        selection.used_for_sort = true;
                        selection.estimated_items = items_in_collection;
                    }
                }
                1 => {
                    selection.used_for_sort = selection.indexes[0]
                        .supports_sort_condition(sort, items_in_collection)
                        .supported;
                }
                _ => {}
            }
        }

        if hint.forced && !hint.is_empty() && !selection.is_usable() {
            return Err(hint.unusable());
        }

        Ok(selection)
    }

    fn select_for_filter(
        &self,
        arena: &ExprArena,
        variable: VariableId,
        candidates: &[Arc<dyn Index>],
        hint: &IndexHint,
        items_in_collection: usize,
    ) -> Result<IndexSelection, InternalError> {
        let mut selection = IndexSelection::default();

        for branch in self.branches(arena) {
            let Some((index, costs)) =
                best_for_branch(arena, *branch, variable, candidates, hint, items_in_collection)?
            else {
                return Ok(IndexSelection::default());
            };

            sink::record(PlannerEvent::IndexSelected {
                index: index.name().to_string(),
                estimated_items: costs.estimated_items,
                estimated_costs: costs.estimated_costs,
            });
            selection.estimated_items = selection
                .estimated_items
                .saturating_add(costs.estimated_items);
            selection.estimated_costs += costs.estimated_costs;
            selection.indexes.push(index);
        }

        selection.used_for_filter = !selection.indexes.is_empty();

        Ok(selection)
    }
}

fn best_for_branch(
    arena: &ExprArena,
    branch: NodeId,
    variable: VariableId,
    candidates: &[Arc<dyn Index>],
    hint: &IndexHint,
    items_in_collection: usize,
) -> Result<Option<(Arc<dyn Index>, FilterCosts)>, InternalError> {
    let supported = candidates
        .iter()
        .map(|index| {
            let costs =
                index.supports_filter_condition(arena, branch, variable, items_in_collection);
            (index, costs)
        })
        .filter(|(_, costs)| costs.supported)
        .collect::<Vec<_>>();

    let hinted = supported
        .iter()
        .filter_map(|(index, costs)| hint.position(index.as_ref()).map(|pos| (pos, index, costs)))
        .min_by_key(|(pos, _, _)| *pos);
    if let Some((_, index, costs)) = hinted {
        return Ok(Some((Arc::clone(index), *costs)));
    }
    if hint.forced && !hint.is_empty() {
        return Err(hint.unusable());
    }

    let best = supported.into_iter().reduce(|best, candidate| {
        if better_index(&candidate, &best) {
            candidate
        } else {
            best
        }
    });

    Ok(best.map(|(index, costs)| (Arc::clone(index), costs)))
}

fn better_index(
    (candidate, candidate_costs): &(&Arc<dyn Index>, FilterCosts),
    (current, current_costs): &(&Arc<dyn Index>, FilterCosts),
) -> bool {
    match candidate_costs
        .estimated_costs
        .total_cmp(&current_costs.estimated_costs)
    {
        Ordering::Less => true,
        Ordering::Equal => candidate.name() < current.name(),
        Ordering::Greater => false,
    }
}

fn cheapest_sort_index(
    candidates: &[Arc<dyn Index>],
    hint: &IndexHint,
    sort: &SortCondition,
    items_in_collection: usize,
) -> Option<Arc<dyn Index>> {
    let supported = candidates
        .iter()
        .filter(|index| {
            index
                .supports_sort_condition(sort, items_in_collection)
                .supported
        })
        .filter(|index| !index.sparse());

    supported
        .min_by(|a, b| {
            let rank = |index: &Arc<dyn Index>| hint.position(index.as_ref()).unwrap_or(usize::MAX);
            rank(a).cmp(&rank(b)).then_with(|| a.name().cmp(b.name()))
        })
        .map(Arc::clone)
}
