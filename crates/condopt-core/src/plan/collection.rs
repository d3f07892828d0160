use crate::{
    error::{ErrorOrigin, InternalError},
    index::Index,
};
use std::{collections::BTreeMap, sync::Arc};

///
/// Collection
///
/// Collection metadata the planner needs: its indexes and a size estimate.
///

#[derive(Debug)]
pub struct Collection {
    name: String,
    indexes: Vec<Arc<dyn Index>>,
    estimated_count: usize,
    satellite: bool,
}

impl Collection {
    #[must_use]
    pub fn new(name: impl Into<String>, estimated_count: usize) -> Self {
        Self {
            name: name.into(),
            indexes: Vec::new(),
            estimated_count,
            satellite: false,
        }
    }

    #[must_use]
    pub fn with_index(mut self, index: impl Index + 'static) -> Self {
        self.indexes.push(Arc::new(index));
        self
    }

    /// Mark as replicated to every server, so joins against it stay local.
    #[must_use]
    pub const fn with_satellite(mut self, satellite: bool) -> Self {
        self.satellite = satellite;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn indexes(&self) -> &[Arc<dyn Index>] {
        &self.indexes
    }

    #[must_use]
    pub const fn estimated_count(&self) -> usize {
        self.estimated_count
    }

    #[must_use]
    pub const fn is_satellite(&self) -> bool {
        self.satellite
    }

    pub fn index_by_id(&self, id: u64) -> Result<Arc<dyn Index>, InternalError> {
        self.indexes
            .iter()
            .find(|index| index.id() == id)
            .cloned()
            .ok_or_else(|| {
                InternalError::not_found(ErrorOrigin::Index, "index", format_args!("{}/{id}", self.name))
            })
    }
}

///
/// CollectionRegistry
///

#[derive(Debug, Default)]
pub struct CollectionRegistry {
    collections: BTreeMap<String, Arc<Collection>>,
}

impl CollectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `collection`, replacing any previous one with the same name.
    pub fn register(&mut self, collection: Collection) -> Arc<Collection> {
        let collection = Arc::new(collection);
        self.collections
            .insert(collection.name().to_string(), Arc::clone(&collection));

        collection
    }

    pub fn get(&self, name: &str) -> Result<Arc<Collection>, InternalError> {
        self.collections
            .get(name)
            .cloned()
            .ok_or_else(|| InternalError::not_found(ErrorOrigin::Plan, "collection", name))
    }
}
