//! Module: index
//! Responsibility: the index capability oracle and index selection.
//! Does not own: index storage or scans; an index here is only a set of
//! capability queries plus a cost estimate.

mod field;
mod select;

#[cfg(test)]
mod tests;

use crate::{
    ast::{ExprArena, NodeId, VariableId},
    path::AttributePath,
    plan::Projections,
};
use std::fmt;

pub use field::FieldIndex;
pub use select::{IndexHint, IndexSelection};

///
/// FilterCosts
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterCosts {
    pub supported: bool,
    pub estimated_items: usize,
    pub estimated_costs: f64,
}

impl FilterCosts {
    #[must_use]
    pub const fn unsupported(items_in_collection: usize) -> Self {
        Self {
            supported: false,
            estimated_items: items_in_collection,
            estimated_costs: f64::INFINITY,
        }
    }
}

///
/// SortCosts
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SortCosts {
    pub supported: bool,
    pub estimated_costs: f64,
}

///
/// SortCondition
///
/// Requested output order: attribute paths of one variable with a
/// direction each.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SortCondition {
    pub variable: VariableId,
    pub fields: Vec<(AttributePath, bool)>,
}

impl SortCondition {
    #[must_use]
    pub fn ascending(variable: VariableId, fields: Vec<AttributePath>) -> Self {
        Self {
            variable,
            fields: fields.into_iter().map(|f| (f, true)).collect(),
        }
    }

    /// All fields sort the same way.
    #[must_use]
    pub fn is_unidirectional(&self) -> bool {
        self.fields
            .windows(2)
            .all(|pair| pair[0].1 == pair[1].1)
    }
}

///
/// StreamOptions
///
/// Positions (into an index's field list) a join stream is asked to use.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StreamOptions {
    pub used_key_fields: Vec<usize>,
    pub constant_fields: Vec<usize>,
    pub projected_fields: Vec<usize>,
}

///
/// Index
///
/// Capability oracle for one physical index.
///

pub trait Index: Send + Sync + fmt::Debug {
    fn id(&self) -> u64;

    fn name(&self) -> &str;

    fn is_sorted(&self) -> bool;

    fn sparse(&self) -> bool;

    fn unique(&self) -> bool;

    fn fields(&self) -> &[AttributePath];

    fn has_expansion(&self) -> bool {
        self.fields().iter().any(AttributePath::has_expansion)
    }

    /// Cost of answering the AND `branch` over `variable` with this index.
    fn supports_filter_condition(
        &self,
        arena: &ExprArena,
        branch: NodeId,
        variable: VariableId,
        items_in_collection: usize,
    ) -> FilterCosts;

    /// Members of `branch` this index evaluates itself.
    fn specialize_condition(
        &self,
        arena: &ExprArena,
        branch: NodeId,
        variable: VariableId,
    ) -> Vec<NodeId>;

    fn supports_sort_condition(&self, sort: &SortCondition, items_in_collection: usize) -> SortCosts;

    fn supports_stream_interface(&self, options: &StreamOptions) -> bool;

    /// Whether every projection can be read from index entries alone.
    fn covers(&self, projections: &Projections) -> bool {
        !projections.is_empty()
            && projections.iter().all(|projection| {
                self.fields()
                    .iter()
                    .any(|field| !field.has_expansion() && field.is_prefix_of(&projection.path))
            })
    }
}
