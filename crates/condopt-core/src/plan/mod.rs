//! Module: plan
//! Responsibility: the linear execution-plan model the optimizer rules
//! rewrite, and the scan and join descriptors they produce.
//! Does not own: execution. Nodes here only describe what runs.

mod collection;
mod index_node;
mod join_node;
mod projection;
pub mod rules;


use crate::{
    ast::{AttributeUsage, ExprArena, NodeId, VariableId},
    index::IndexHint,
};
use std::{collections::BTreeSet, sync::Arc};

pub use collection::{Collection, CollectionRegistry};
pub use index_node::{IndexIteratorOptions, IndexNode, IndexStrategy};
pub use join_node::{
    JoinMember, JoinNode, PersistedIndexRef, PersistedJoinMember, PersistedJoinNode,
};
pub use projection::{Projection, Projections};

///
/// EnumerateCollectionNode
///

#[derive(Clone, Debug)]
pub struct EnumerateCollectionNode {
    pub collection: Arc<Collection>,
    pub out_variable: VariableId,
    pub hint: IndexHint,
}

///
/// CalculationNode
///

#[derive(Clone, Debug)]
pub struct CalculationNode {
    pub out_variable: VariableId,
    pub expression: NodeId,
}

///
/// MaterializeNode
///
/// Fetches full documents for document ids produced by a late-materialized
/// index scan.
///

#[derive(Clone, Debug)]
pub struct MaterializeNode {
    pub collection: Arc<Collection>,
    pub in_document: VariableId,
    pub out_variable: VariableId,
}

///
/// FilterNode
///

#[derive(Clone, Debug)]
pub struct FilterNode {
    pub in_variable: VariableId,
}

///
/// ReturnNode
///

#[derive(Clone, Debug)]
pub struct ReturnNode {
    pub in_variable: VariableId,
}

///
/// PlanNode
///

#[derive(Clone, Debug)]
pub enum PlanNode {
    Singleton,
    EnumerateCollection(EnumerateCollectionNode),
    Index(IndexNode),
    Calculation(CalculationNode),
    Materialize(MaterializeNode),
    Filter(FilterNode),
    Return(ReturnNode),
    Join(JoinNode),
}

impl PlanNode {
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Singleton => "SingletonNode",
            Self::EnumerateCollection(_) => "EnumerateCollectionNode",
            Self::Index(_) => "IndexNode",
            Self::Calculation(_) => "CalculationNode",
            Self::Materialize(_) => "MaterializeNode",
            Self::Filter(_) => "FilterNode",
            Self::Return(_) => "ReturnNode",
            Self::Join(_) => "JoinNode",
        }
    }

    #[must_use]
    pub const fn as_index(&self) -> Option<&IndexNode> {
        match self {
            Self::Index(node) => Some(node),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_join(&self) -> Option<&JoinNode> {
        match self {
            Self::Join(node) => Some(node),
            _ => None,
        }
    }

    /// Variables this node introduces.
    #[must_use]
    pub fn variables_set(&self) -> Vec<VariableId> {
        match self {
            Self::Singleton | Self::Filter(_) | Self::Return(_) => Vec::new(),
            Self::EnumerateCollection(node) => vec![node.out_variable],
            Self::Index(node) => node.variables_set(),
            Self::Calculation(node) => vec![node.out_variable],
            Self::Materialize(node) => vec![node.out_variable],
            Self::Join(node) => node.members.iter().map(|m| m.out_variable).collect(),
        }
    }

    /// Variables this node reads from earlier nodes.
    #[must_use]
    pub fn variables_used(&self, arena: &ExprArena) -> BTreeSet<VariableId> {
        match self {
            Self::Singleton | Self::EnumerateCollection(_) => BTreeSet::new(),
            Self::Index(node) => node.variables_used(arena),
            Self::Calculation(node) => arena.variables_of(node.expression),
            Self::Materialize(node) => BTreeSet::from([node.in_document]),
            Self::Filter(node) => BTreeSet::from([node.in_variable]),
            Self::Return(node) => BTreeSet::from([node.in_variable]),
            Self::Join(node) => node.variables_used(arena),
        }
    }

    /// Which attributes of `variable` this node reads.
    #[must_use]
    pub fn attribute_usage(&self, arena: &ExprArena, variable: VariableId) -> AttributeUsage {
        let mut usage = AttributeUsage::Unused;
        match self {
            Self::Singleton | Self::EnumerateCollection(_) => {}
            Self::Index(node) => {
                for expr in node.condition.root().into_iter().chain(node.filter) {
                    usage.merge(arena.attribute_usage(expr, variable));
                }
            }
            Self::Calculation(node) => usage = arena.attribute_usage(node.expression, variable),
            Self::Materialize(MaterializeNode { in_document: var, .. })
            | Self::Filter(FilterNode { in_variable: var })
            | Self::Return(ReturnNode { in_variable: var }) => {
                if *var == variable {
                    usage = AttributeUsage::Whole;
                }
            }
            Self::Join(node) => {
                for member in &node.members {
                    for expr in member.condition.root().into_iter().chain(member.filter) {
                        usage.merge(arena.attribute_usage(expr, variable));
                    }
                }
            }
        }

        usage
    }
}

///
/// ExecutionPlan
///
/// A linear pipeline of nodes over one query-local expression arena.
///

#[derive(Clone, Debug, Default)]
pub struct ExecutionPlan {
    pub arena: ExprArena,
    nodes: Vec<PlanNode>,
}

impl ExecutionPlan {
    #[must_use]
    pub const fn new(arena: ExprArena) -> Self {
        Self {
            arena,
            nodes: Vec::new(),
        }
    }

    pub fn push(&mut self, node: PlanNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    #[must_use]
    pub fn nodes(&self) -> &[PlanNode] {
        &self.nodes
    }

    #[must_use]
    pub fn node(&self, position: usize) -> Option<&PlanNode> {
        self.nodes.get(position)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Replace the node at `position`, returning the old one.
    pub fn replace(&mut self, position: usize, node: PlanNode) -> PlanNode {
        std::mem::replace(&mut self.nodes[position], node)
    }

    pub fn remove(&mut self, position: usize) -> PlanNode {
        self.nodes.remove(position)
    }

    /// Node kinds in pipeline order.
    #[must_use]
    pub fn kinds(&self) -> Vec<&'static str> {
        self.nodes.iter().map(PlanNode::kind_name).collect()
    }

    /// Variables introduced by nodes before `position`.
    #[must_use]
    pub fn variables_bound_before(&self, position: usize) -> BTreeSet<VariableId> {
        self.nodes[..position.min(self.nodes.len())]
            .iter()
            .flat_map(PlanNode::variables_set)
            .collect()
    }

    /// Whether any node after `position` reads `variable`.
    #[must_use]
    pub fn is_used_after(&self, position: usize, variable: VariableId) -> bool {
        self.nodes
            .iter()
            .skip(position + 1)
            .any(|node| node.variables_used(&self.arena).contains(&variable))
    }

    /// Attribute usage of `variable` by every node after `position`.
    #[must_use]
    pub fn attribute_usage_after(&self, position: usize, variable: VariableId) -> AttributeUsage {
        let mut usage = AttributeUsage::Unused;
        for node in self.nodes.iter().skip(position + 1) {
            usage.merge(node.attribute_usage(&self.arena, variable));
            if usage == AttributeUsage::Whole {
                break;
            }
        }

        usage
    }
}
