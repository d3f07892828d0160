//! Multi-way index join descriptor and its persisted form.
//!
//! The first member drives the join; every later member is looked up through
//! a streaming index iterator keyed on `used_key_fields` and
//! `constant_fields`.

use crate::{
    ast::{ExprArena, NodeId, PersistedNode, PersistedVariable, VariableId},
    condition::{Condition, PersistedCondition},
    error::{ErrorOrigin, InternalError},
    index::Index,
    plan::{Collection, CollectionRegistry, Projection, Projections},
    serialize::{SerializeError, deserialize, from_json, serialize, to_json},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, sync::Arc};

///
/// JoinMember
///

#[derive(Clone, Debug)]
pub struct JoinMember {
    pub collection: Arc<Collection>,
    pub out_variable: VariableId,
    pub condition: Condition,
    pub filter: Option<NodeId>,
    pub filter_projections: Projections,
    pub index: Arc<dyn Index>,
    pub projections: Projections,
    pub used_as_satellite: bool,
    pub produces_output: bool,
    pub is_late_materialized: bool,

    /// Constant expressions compared against `constant_fields`, in order.
    pub expressions: Vec<NodeId>,
    pub used_key_fields: Vec<usize>,
    pub constant_fields: Vec<usize>,
}

impl JoinMember {
    fn variables_used(&self, arena: &ExprArena, out: &mut BTreeSet<VariableId>) {
        if let Some(root) = self.condition.root() {
            arena.variables_used(root, out);
        }
        if let Some(filter) = self.filter {
            arena.variables_used(filter, out);
        }
        for expr in &self.expressions {
            arena.variables_used(*expr, out);
        }
    }
}

///
/// JoinNode
///

#[derive(Clone, Debug)]
pub struct JoinNode {
    pub members: Vec<JoinMember>,
}

impl JoinNode {
    /// Variables read from outside the join.
    #[must_use]
    pub fn variables_used(&self, arena: &ExprArena) -> BTreeSet<VariableId> {
        let mut used = BTreeSet::new();
        for member in &self.members {
            member.variables_used(arena, &mut used);
        }
        for member in &self.members {
            used.remove(&member.out_variable);
        }

        used
    }

    #[must_use]
    pub fn to_persisted(&self, arena: &ExprArena) -> PersistedJoinNode {
        PersistedJoinNode {
            members: self
                .members
                .iter()
                .map(|member| PersistedJoinMember::from_member(arena, member))
                .collect(),
        }
    }

    /// Resolve a persisted join against live collections and the query arena.
    pub fn from_persisted(
        arena: &mut ExprArena,
        registry: &CollectionRegistry,
        persisted: &PersistedJoinNode,
    ) -> Result<Self, InternalError> {
        if persisted.members.len() < 2 {
            return Err(InternalError::malformed_plan(
                ErrorOrigin::Join,
                "members",
                format_args!("must have at least 2 entries, found {}", persisted.members.len()),
            ));
        }

        let members = persisted
            .members
            .iter()
            .map(|member| member.load(arena, registry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { members })
    }

    pub fn to_json(&self, arena: &ExprArena) -> Result<String, InternalError> {
        Ok(to_json(&self.to_persisted(arena))?)
    }

    pub fn from_json(
        arena: &mut ExprArena,
        registry: &CollectionRegistry,
        text: &str,
    ) -> Result<Self, InternalError> {
        let persisted: PersistedJoinNode = from_json(text).map_err(malformed)?;
        Self::from_persisted(arena, registry, &persisted)
    }

    pub fn to_cbor(&self, arena: &ExprArena) -> Result<Vec<u8>, InternalError> {
        Ok(serialize(&self.to_persisted(arena))?)
    }

    pub fn from_cbor(
        arena: &mut ExprArena,
        registry: &CollectionRegistry,
        bytes: &[u8],
    ) -> Result<Self, InternalError> {
        let persisted: PersistedJoinNode = deserialize(bytes).map_err(malformed)?;
        Self::from_persisted(arena, registry, &persisted)
    }
}

fn malformed(err: SerializeError) -> InternalError {
    InternalError::malformed_plan(ErrorOrigin::Join, "join", err)
}

///
/// PersistedIndexRef
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PersistedIndexRef {
    pub id: u64,
    pub name: String,
}

///
/// PersistedJoinMember
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PersistedJoinMember {
    pub collection: String,
    pub out_variable: PersistedVariable,
    pub condition: PersistedCondition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<PersistedNode>,
    #[serde(default)]
    pub filter_projections: Vec<Projection>,
    pub index: PersistedIndexRef,
    #[serde(default)]
    pub projections: Vec<Projection>,
    #[serde(default)]
    pub used_as_satellite: bool,
    pub produces_output: bool,
    #[serde(default)]
    pub is_late_materialized: bool,
    #[serde(default)]
    pub expressions: Vec<PersistedNode>,
    pub used_key_fields: Vec<usize>,
    #[serde(default)]
    pub constant_fields: Vec<usize>,
}

impl PersistedJoinMember {
    fn from_member(arena: &ExprArena, member: &JoinMember) -> Self {
        let variable_name = arena
            .variable(member.out_variable)
            .map(|v| v.name.clone())
            .unwrap_or_default();

        Self {
            collection: member.collection.name().to_string(),
            out_variable: PersistedVariable {
                id: member.out_variable.raw(),
                name: variable_name,
            },
            condition: member.condition.to_persisted(arena),
            filter: member.filter.map(|filter| arena.to_persisted(filter)),
            filter_projections: member.filter_projections.items().to_vec(),
            index: PersistedIndexRef {
                id: member.index.id(),
                name: member.index.name().to_string(),
            },
            projections: member.projections.items().to_vec(),
            used_as_satellite: member.used_as_satellite,
            produces_output: member.produces_output,
            is_late_materialized: member.is_late_materialized,
            expressions: member
                .expressions
                .iter()
                .map(|expr| arena.to_persisted(*expr))
                .collect(),
            used_key_fields: member.used_key_fields.clone(),
            constant_fields: member.constant_fields.clone(),
        }
    }

    fn load(
        &self,
        arena: &mut ExprArena,
        registry: &CollectionRegistry,
    ) -> Result<JoinMember, InternalError> {
        let collection = registry.get(&self.collection)?;
        let index = collection.index_by_id(self.index.id)?;
        if index.name() != self.index.name {
            return Err(InternalError::malformed_plan(
                ErrorOrigin::Join,
                "index",
                format_args!("names '{}' but id {} is '{}'", self.index.name, self.index.id, index.name()),
            ));
        }
        self.validate_positions(index.as_ref())?;

        let out_variable = arena.resolve_variable(&self.out_variable)?;
        let condition = Condition::from_persisted(arena, &self.condition)?;
        let filter = self
            .filter
            .as_ref()
            .map(|filter| arena.load_persisted(filter))
            .transpose()?;
        let expressions = self
            .expressions
            .iter()
            .map(|expr| arena.load_persisted(expr))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(JoinMember {
            collection,
            out_variable,
            condition,
            filter,
            filter_projections: Projections::from_items(self.filter_projections.clone()),
            index,
            projections: Projections::from_items(self.projections.clone()),
            used_as_satellite: self.used_as_satellite,
            produces_output: self.produces_output,
            is_late_materialized: self.is_late_materialized,
            expressions,
            used_key_fields: self.used_key_fields.clone(),
            constant_fields: self.constant_fields.clone(),
        })
    }

    fn validate_positions(&self, index: &dyn Index) -> Result<(), InternalError> {
        if self.used_key_fields.is_empty() {
            return Err(InternalError::malformed_plan(
                ErrorOrigin::Join,
                "used_key_fields",
                "must not be empty",
            ));
        }
        if self.expressions.len() != self.constant_fields.len() {
            return Err(InternalError::malformed_plan(
                ErrorOrigin::Join,
                "expressions",
                format_args!(
                    "has {} entries but constant_fields has {}",
                    self.expressions.len(),
                    self.constant_fields.len()
                ),
            ));
        }

        let fields = index.fields().len();
        for (field, positions) in [
            ("used_key_fields", &self.used_key_fields),
            ("constant_fields", &self.constant_fields),
        ] {
            if let Some(position) = positions.iter().find(|p| **p >= fields) {
                return Err(InternalError::malformed_plan(
                    ErrorOrigin::Join,
                    field,
                    format_args!("position {position} is out of range for {fields} index fields"),
                ));
            }
        }

        Ok(())
    }
}

///
/// PersistedJoinNode
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PersistedJoinNode {
    pub members: Vec<PersistedJoinMember>,
}
