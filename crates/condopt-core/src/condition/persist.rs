//! Persisted condition form.
//!
//! An empty condition is `{}`; otherwise the root node is stored with the
//! generic expression encoding. Loading trusts the stored tree to be
//! normalized and does not rewrite it.

use crate::{
    ast::{ExprArena, PersistedNode},
    condition::Condition,
    error::{ErrorOrigin, InternalError},
    serialize::{SerializeError, deserialize, from_json, serialize, to_json},
};
use serde::{Deserialize, Serialize};

///
/// PersistedCondition
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PersistedCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PersistedNode>,
}

impl Condition {
    #[must_use]
    pub fn to_persisted(&self, arena: &ExprArena) -> PersistedCondition {
        PersistedCondition {
            root: self.root.map(|root| arena.to_persisted(root)),
        }
    }

    /// Rebuild a condition already in normalized form.
    pub fn from_persisted(
        arena: &mut ExprArena,
        persisted: &PersistedCondition,
    ) -> Result<Self, InternalError> {
        let root = persisted
            .root
            .as_ref()
            .map(|node| arena.load_persisted(node))
            .transpose()?;

        Ok(Self::normalized(root))
    }

    pub fn to_json(&self, arena: &ExprArena) -> Result<String, InternalError> {
        Ok(to_json(&self.to_persisted(arena))?)
    }

    pub fn from_json(arena: &mut ExprArena, text: &str) -> Result<Self, InternalError> {
        let persisted: PersistedCondition = from_json(text).map_err(malformed)?;
        Self::from_persisted(arena, &persisted)
    }

    pub fn to_cbor(&self, arena: &ExprArena) -> Result<Vec<u8>, InternalError> {
        Ok(serialize(&self.to_persisted(arena))?)
    }

    pub fn from_cbor(arena: &mut ExprArena, bytes: &[u8]) -> Result<Self, InternalError> {
        let persisted: PersistedCondition = deserialize(bytes).map_err(malformed)?;
        Self::from_persisted(arena, &persisted)
    }
}

fn malformed(err: SerializeError) -> InternalError {
    InternalError::malformed_plan(ErrorOrigin::Condition, "condition", err)
}
