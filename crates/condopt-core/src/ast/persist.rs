//! Persisted expression form.
//!
//! Nodes serialize as a nested, internally tagged tree. Variables are stored
//! with both id and name and must resolve against the loading arena.

use crate::{
    ast::{CompareOp, ExprArena, NodeId, NodeKind, Quantifier, VariableId},
    error::{ErrorOrigin, InternalError},
    value::Value,
};
use serde::{Deserialize, Serialize};

///
/// PersistedVariable
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PersistedVariable {
    pub id: u32,
    pub name: String,
}

///
/// PersistedNode
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PersistedNode {
    Value {
        value: Value,
    },
    Array {
        members: Vec<Self>,
    },
    Reference {
        variable: PersistedVariable,
    },
    Attribute {
        name: String,
        object: Box<Self>,
    },
    Expansion {
        input: Box<Self>,
    },
    Compare {
        op: CompareOp,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quantifier: Option<Quantifier>,
        lhs: Box<Self>,
        rhs: Box<Self>,
    },
    Not {
        operand: Box<Self>,
    },
    And {
        members: Vec<Self>,
    },
    Or {
        members: Vec<Self>,
    },
    NaryAnd {
        members: Vec<Self>,
    },
    NaryOr {
        members: Vec<Self>,
    },
    Function {
        name: String,
        args: Vec<Self>,
    },
    Nop,
}

impl ExprArena {
    /// Persisted form of the subtree at `id`.
    #[must_use]
    pub fn to_persisted(&self, id: NodeId) -> PersistedNode {
        let members = self.members(id);
        let boxed = |i: usize| Box::new(self.to_persisted(members[i]));
        let all = || -> Vec<PersistedNode> { members.iter().map(|m| self.to_persisted(*m)).collect() };

        match self.kind(id) {
            NodeKind::Constant(value) => PersistedNode::Value {
                value: value.clone(),
            },
            NodeKind::Array => PersistedNode::Array { members: all() },
            NodeKind::Reference(var) => PersistedNode::Reference {
                variable: PersistedVariable {
                    id: var.raw(),
                    name: self
                        .variable(*var)
                        .map(|v| v.name.clone())
                        .unwrap_or_default(),
                },
            },
            NodeKind::AttributeAccess(name) => PersistedNode::Attribute {
                name: name.clone(),
                object: boxed(0),
            },
            NodeKind::Expansion => PersistedNode::Expansion { input: boxed(0) },
            NodeKind::Compare { op, quantifier } => PersistedNode::Compare {
                op: *op,
                quantifier: *quantifier,
                lhs: boxed(0),
                rhs: boxed(1),
            },
            NodeKind::Not => PersistedNode::Not { operand: boxed(0) },
            NodeKind::And => PersistedNode::And { members: all() },
            NodeKind::Or => PersistedNode::Or { members: all() },
            NodeKind::NaryAnd => PersistedNode::NaryAnd { members: all() },
            NodeKind::NaryOr => PersistedNode::NaryOr { members: all() },
            NodeKind::Function(name) => PersistedNode::Function {
                name: name.clone(),
                args: all(),
            },
            NodeKind::Nop => PersistedNode::Nop,
        }
    }

    /// Rebuild a persisted subtree inside this arena.
    pub fn load_persisted(&mut self, node: &PersistedNode) -> Result<NodeId, InternalError> {
        let id = match node {
            PersistedNode::Value { value } => self.constant(value.clone()),
            PersistedNode::Array { members } => {
                let members = self.load_all(members)?;
                self.array(members)
            }
            PersistedNode::Reference { variable } => {
                let var = self.resolve_variable(variable)?;
                self.reference(var)
            }
            PersistedNode::Attribute { name, object } => {
                let object = self.load_persisted(object)?;
                self.attribute(object, name.clone())
            }
            PersistedNode::Expansion { input } => {
                let input = self.load_persisted(input)?;
                self.expansion(input)
            }
            PersistedNode::Compare {
                op,
                quantifier,
                lhs,
                rhs,
            } => {
                let lhs = self.load_persisted(lhs)?;
                let rhs = self.load_persisted(rhs)?;
                match quantifier {
                    Some(q) => self.quantified_compare(*op, *q, lhs, rhs),
                    None => self.compare(*op, lhs, rhs),
                }
            }
            PersistedNode::Not { operand } => {
                let operand = self.load_persisted(operand)?;
                self.not(operand)
            }
            PersistedNode::And { members } => {
                let [lhs, rhs] = self.load_binary(members, "and")?;
                self.and(lhs, rhs)
            }
            PersistedNode::Or { members } => {
                let [lhs, rhs] = self.load_binary(members, "or")?;
                self.or(lhs, rhs)
            }
            PersistedNode::NaryAnd { members } => {
                let members = self.load_all(members)?;
                self.nary_and(members)
            }
            PersistedNode::NaryOr { members } => {
                let members = self.load_all(members)?;
                self.nary_or(members)
            }
            PersistedNode::Function { name, args } => {
                let args = self.load_all(args)?;
                self.function(name.clone(), args)
            }
            PersistedNode::Nop => self.nop(),
        };

        Ok(id)
    }

    fn load_all(&mut self, nodes: &[PersistedNode]) -> Result<Vec<NodeId>, InternalError> {
        nodes.iter().map(|n| self.load_persisted(n)).collect()
    }

    fn load_binary(
        &mut self,
        nodes: &[PersistedNode],
        kind: &str,
    ) -> Result<[NodeId; 2], InternalError> {
        match nodes {
            [lhs, rhs] => Ok([self.load_persisted(lhs)?, self.load_persisted(rhs)?]),
            _ => Err(InternalError::malformed_plan(
                ErrorOrigin::Condition,
                "members",
                format_args!("of binary '{kind}' must have 2 entries, found {}", nodes.len()),
            )),
        }
    }

    pub(crate) fn resolve_variable(&self, persisted: &PersistedVariable) -> Result<VariableId, InternalError> {
        match self.variable(VariableId::new(persisted.id)) {
            Some(variable) if variable.name == persisted.name => Ok(variable.id),
            _ => Err(InternalError::not_found(
                ErrorOrigin::Condition,
                "variable",
                &persisted.name,
            )),
        }
    }
}
