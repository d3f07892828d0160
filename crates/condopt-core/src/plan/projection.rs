use crate::{
    ast::AttributeUsage, error::InternalError, index::Index, path::AttributePath,
    resource::ResourceMonitor,
};
use serde::{Deserialize, Serialize};

///
/// Projection
///
/// One attribute path read from a document, with the index field position
/// that can supply it when the scan is covering.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Projection {
    pub path: AttributePath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covering_index_position: Option<usize>,
}

///
/// Projections
///
/// A prefix-free set of projections: when both `a` and `a.b` are read,
/// only `a` is kept.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Projections {
    items: Vec<Projection>,
}

impl Projections {
    #[must_use]
    pub fn from_paths(paths: impl IntoIterator<Item = AttributePath>) -> Self {
        let mut paths = paths.into_iter().collect::<Vec<_>>();
        paths.sort();

        let mut items: Vec<Projection> = Vec::with_capacity(paths.len());
        for path in paths {
            if items.last().is_some_and(|kept| kept.path.is_prefix_of(&path)) {
                continue;
            }
            items.push(Projection {
                path,
                covering_index_position: None,
            });
        }

        Self { items }
    }

    /// Projections for a usage; `None` when the whole document is needed.
    ///
    /// Every kept path is charged to `monitor`.
    pub fn from_usage(
        usage: &AttributeUsage,
        monitor: &ResourceMonitor,
    ) -> Result<Option<Self>, InternalError> {
        let projections = match usage {
            AttributeUsage::Unused => Self::default(),
            AttributeUsage::Paths(paths) => Self::from_paths(paths.iter().cloned()),
            AttributeUsage::Whole => return Ok(None),
        };
        for item in &projections.items {
            item.path.charge(monitor)?;
        }

        Ok(Some(projections))
    }

    /// Projections for the given index field positions, cut before any
    /// array expansion.
    #[must_use]
    pub fn for_index_fields(index: &dyn Index, positions: &[usize]) -> Self {
        let items = positions
            .iter()
            .filter_map(|position| {
                let mut path = index.fields().get(*position)?.clone();
                if let Some(expanded) = path.components().iter().position(|c| c.expand) {
                    path.shorten_to(expanded + 1);
                }

                Some(Projection {
                    path: path.without_expansion(),
                    covering_index_position: Some(*position),
                })
            })
            .collect();

        Self { items }
    }

    pub(crate) const fn from_items(items: Vec<Projection>) -> Self {
        Self { items }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Projection> {
        self.items.iter()
    }

    #[must_use]
    pub fn items(&self) -> &[Projection] {
        &self.items
    }

    #[must_use]
    pub fn contains(&self, path: &AttributePath) -> bool {
        self.items.iter().any(|p| &p.path == path)
    }

    pub fn retain(&mut self, keep: impl FnMut(&Projection) -> bool) {
        self.items.retain(keep);
    }

    /// Record which field of `index` supplies each projection. Returns
    /// whether every projection is covered.
    pub fn set_covering_index(&mut self, index: &dyn Index) -> bool {
        let fields = index.fields();
        for item in &mut self.items {
            item.covering_index_position = fields
                .iter()
                .position(|field| !field.has_expansion() && field.is_prefix_of(&item.path));
        }

        !self.items.is_empty()
            && self
                .items
                .iter()
                .all(|item| item.covering_index_position.is_some())
    }

    /// Index positions backing covered projections, ascending and unique.
    #[must_use]
    pub fn covered_positions(&self) -> Vec<usize> {
        let mut positions = self
            .items
            .iter()
            .filter_map(|item| item.covering_index_position)
            .collect::<Vec<_>>();
        positions.sort_unstable();
        positions.dedup();

        positions
    }
}

impl<'a> IntoIterator for &'a Projections {
    type Item = &'a Projection;
    type IntoIter = std::slice::Iter<'a, Projection>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
