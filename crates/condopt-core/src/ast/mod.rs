//! Module: ast
//! Responsibility: query-local expression arena and its structural queries.
//! Does not own: condition semantics (see `condition`).
//!
//! Nodes are immutable once created. Rewrites build new junction nodes that
//! point at the existing leaves, so a leaf is shared by every tree that
//! mentions it and is never copied unless explicitly cloned.

mod persist;
mod print;


use crate::{
    path::{AttributePath, PathComponent},
    value::Value,
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub use persist::{PersistedNode, PersistedVariable};
pub use print::MAX_PRINT_DEPTH;

///
/// NodeId
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("#{_0}")]
pub struct NodeId(u32);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

///
/// VariableId
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[display("${_0}")]
pub struct VariableId(u32);

impl VariableId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

///
/// Variable
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Variable {
    pub id: VariableId,
    pub name: String,
}

///
/// CompareOp
///
/// Comparison operators. Tags are stable and feed fingerprints.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    #[display("==")]
    Eq = 0x01,
    #[display("!=")]
    Ne = 0x02,
    #[display("<")]
    Lt = 0x03,
    #[display("<=")]
    Le = 0x04,
    #[display(">=")]
    Ge = 0x05,
    #[display(">")]
    Gt = 0x06,
    #[display("IN")]
    In = 0x07,
    #[display("NOT IN")]
    NotIn = 0x08,
}

impl CompareOp {
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Relational operators that change meaning when operands are swapped.
    #[must_use]
    pub const fn is_reversible(self) -> bool {
        matches!(self, Self::Lt | Self::Le | Self::Ge | Self::Gt)
    }

    /// Operators whose operands may be exchanged at all.
    #[must_use]
    pub const fn is_swappable(self) -> bool {
        !matches!(self, Self::In | Self::NotIn)
    }

    /// Operator to use after swapping operands (`a < b` is `b > a`).
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            Self::Ge => Self::Le,
            Self::Gt => Self::Lt,
            other => other,
        }
    }

    /// Complementary operator (`NOT (a < b)` is `a >= b`).
    #[must_use]
    pub const fn negate(self) -> Self {
        match self {
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Lt => Self::Ge,
            Self::Le => Self::Gt,
            Self::Ge => Self::Lt,
            Self::Gt => Self::Le,
            Self::In => Self::NotIn,
            Self::NotIn => Self::In,
        }
    }
}

///
/// Quantifier
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantifier {
    #[display("ALL")]
    All,
    #[display("ANY")]
    Any,
    #[display("NONE")]
    None,
}

// Functions whose result depends only on their arguments.
const PURE_FUNCTIONS: &[&str] = &[
    "ABS", "CONCAT", "CONTAINS", "FLOOR", "CEIL", "LENGTH", "LOWER", "ROUND", "SUBSTRING",
    "TO_BOOL", "TO_NUMBER", "TO_STRING", "UPPER",
];

fn is_pure_function(name: &str) -> bool {
    PURE_FUNCTIONS
        .iter()
        .any(|pure| pure.eq_ignore_ascii_case(name))
}

///
/// NodeKind
///
/// Closed set of expression node kinds. Member layout per kind:
/// `AttributeAccess` and `Expansion` have one member (the object / input),
/// `Compare` has two (lhs, rhs), `Not` has one, binary `And`/`Or` have two,
/// everything else has any number.
///

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Constant(Value),
    Array,
    Reference(VariableId),
    AttributeAccess(String),
    Expansion,
    Compare {
        op: CompareOp,
        quantifier: Option<Quantifier>,
    },
    Not,
    And,
    Or,
    NaryAnd,
    NaryOr,
    Function(String),
    Nop,
}

impl NodeKind {
    /// Raw type tag, used to break ordering ties between node kinds.
    #[must_use]
    pub const fn type_tag(&self) -> u8 {
        match self {
            Self::Constant(_) => 0,
            Self::Array => 1,
            Self::Reference(_) => 2,
            Self::AttributeAccess(_) => 3,
            Self::Expansion => 4,
            Self::Compare { .. } => 5,
            Self::Not => 6,
            Self::And => 7,
            Self::Or => 8,
            Self::NaryAnd => 9,
            Self::NaryOr => 10,
            Self::Function(_) => 11,
            Self::Nop => 12,
        }
    }

    #[must_use]
    pub const fn is_and(&self) -> bool {
        matches!(self, Self::And | Self::NaryAnd)
    }

    #[must_use]
    pub const fn is_or(&self) -> bool {
        matches!(self, Self::Or | Self::NaryOr)
    }

    #[must_use]
    pub const fn is_junction(&self) -> bool {
        self.is_and() || self.is_or()
    }

    #[must_use]
    pub const fn compare_op(&self) -> Option<CompareOp> {
        match self {
            Self::Compare { op, .. } => Some(*op),
            _ => None,
        }
    }
}

///
/// Node
///

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub members: Vec<NodeId>,
}

///
/// AttributeUsage
///
/// Which parts of a variable an expression reads.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AttributeUsage {
    Unused,
    Paths(BTreeSet<AttributePath>),
    Whole,
}

impl AttributeUsage {
    pub fn merge(&mut self, other: Self) {
        match (&mut *self, other) {
            (Self::Whole, _) | (_, Self::Unused) => {}
            (_, Self::Whole) => *self = Self::Whole,
            (Self::Unused, paths @ Self::Paths(_)) => *self = paths,
            (Self::Paths(mine), Self::Paths(theirs)) => mine.extend(theirs),
        }
    }
}

///
/// ExprArena
///
/// Owns every node and variable of one query plan.
///

#[derive(Clone, Debug, Default)]
pub struct ExprArena {
    nodes: Vec<Node>,
    variables: Vec<Variable>,
}

impl ExprArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ------------------------------------------------------------------
    // Variables
    // ------------------------------------------------------------------

    pub fn create_variable(&mut self, name: impl Into<String>) -> VariableId {
        let id = VariableId(u32::try_from(self.variables.len()).unwrap_or(u32::MAX));
        self.variables.push(Variable {
            id,
            name: name.into(),
        });

        id
    }

    #[must_use]
    pub fn variable(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(id.0 as usize)
    }

    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    #[must_use]
    pub fn find_variable(&self, name: &str) -> Option<VariableId> {
        self.variables.iter().find(|v| v.name == name).map(|v| v.id)
    }

    // ------------------------------------------------------------------
    // Structural access
    // ------------------------------------------------------------------

    /// Node behind `id`. Handles are arena-local; a foreign handle panics.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    #[must_use]
    pub fn num_members(&self, id: NodeId) -> usize {
        self.node(id).members.len()
    }

    #[must_use]
    pub fn members(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).members
    }

    #[must_use]
    pub fn member(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.node(id).members.get(index).copied()
    }

    /// Member access without a bounds-checked `Option`; `index` must be valid.
    #[must_use]
    pub fn member_unchecked(&self, id: NodeId, index: usize) -> NodeId {
        self.node(id).members[index]
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    fn push(&mut self, kind: NodeKind, members: Vec<NodeId>) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(Node { kind, members });

        id
    }

    pub fn constant(&mut self, value: impl Into<Value>) -> NodeId {
        self.push(NodeKind::Constant(value.into()), Vec::new())
    }

    pub fn null(&mut self) -> NodeId {
        self.constant(Value::Null)
    }

    pub fn array(&mut self, items: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Array, items)
    }

    /// Array node of constant members built from literal values.
    pub fn constant_array(&mut self, values: Vec<Value>) -> NodeId {
        let items = values.into_iter().map(|v| self.constant(v)).collect();
        self.array(items)
    }

    pub fn reference(&mut self, variable: VariableId) -> NodeId {
        self.push(NodeKind::Reference(variable), Vec::new())
    }

    pub fn attribute(&mut self, object: NodeId, name: impl Into<String>) -> NodeId {
        self.push(NodeKind::AttributeAccess(name.into()), vec![object])
    }

    pub fn expansion(&mut self, input: NodeId) -> NodeId {
        self.push(NodeKind::Expansion, vec![input])
    }

    /// Attribute access chain `variable.path`, with `[*]` where the path expands.
    pub fn attribute_path(&mut self, variable: VariableId, path: &AttributePath) -> NodeId {
        let mut current = self.reference(variable);
        for component in path.components() {
            current = self.attribute(current, component.name.clone());
            if component.expand {
                current = self.expansion(current);
            }
        }

        current
    }

    pub fn compare(&mut self, op: CompareOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.push(
            NodeKind::Compare {
                op,
                quantifier: None,
            },
            vec![lhs, rhs],
        )
    }

    pub fn quantified_compare(
        &mut self,
        op: CompareOp,
        quantifier: Quantifier,
        lhs: NodeId,
        rhs: NodeId,
    ) -> NodeId {
        self.push(
            NodeKind::Compare {
                op,
                quantifier: Some(quantifier),
            },
            vec![lhs, rhs],
        )
    }

    pub fn not(&mut self, operand: NodeId) -> NodeId {
        self.push(NodeKind::Not, vec![operand])
    }

    pub fn and(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.push(NodeKind::And, vec![lhs, rhs])
    }

    pub fn or(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.push(NodeKind::Or, vec![lhs, rhs])
    }

    pub fn nary_and(&mut self, members: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::NaryAnd, members)
    }

    pub fn nary_or(&mut self, members: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::NaryOr, members)
    }

    pub fn function(&mut self, name: impl Into<String>, args: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Function(name.into()), args)
    }

    pub fn nop(&mut self) -> NodeId {
        self.push(NodeKind::Nop, Vec::new())
    }

    /// New node of the same kind as `id` with a replaced member list.
    pub fn shallow_copy_with_members(&mut self, id: NodeId, members: Vec<NodeId>) -> NodeId {
        let kind = self.kind(id).clone();
        self.push(kind, members)
    }

    /// Copy of `id` and everything below it, inside this arena.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let node = self.node(id).clone();
        let members = node.members.iter().map(|m| self.deep_clone(*m)).collect();
        self.push(node.kind, members)
    }

    /// Copy of `id` and everything below it into `target`.
    ///
    /// Variables are matched by name in `target` and created there on demand.
    pub fn clone_into(&self, id: NodeId, target: &mut Self) -> NodeId {
        let mut mapping = BTreeMap::new();
        self.clone_into_with(id, target, &mut mapping)
    }

    fn clone_into_with(
        &self,
        id: NodeId,
        target: &mut Self,
        mapping: &mut BTreeMap<VariableId, VariableId>,
    ) -> NodeId {
        let node = self.node(id);
        let kind = match &node.kind {
            NodeKind::Reference(var) => {
                let mapped = match mapping.get(var) {
                    Some(mapped) => *mapped,
                    None => {
                        let name = self.variable(*var).map_or_else(
                            || var.to_string(),
                            |variable| variable.name.clone(),
                        );
                        let mapped = target
                            .find_variable(&name)
                            .unwrap_or_else(|| target.create_variable(name));
                        mapping.insert(*var, mapped);
                        mapped
                    }
                };
                NodeKind::Reference(mapped)
            }
            other => other.clone(),
        };
        let members = node
            .members
            .iter()
            .map(|m| self.clone_into_with(*m, target, mapping))
            .collect();

        target.push(kind, members)
    }

    // ------------------------------------------------------------------
    // Structural queries
    // ------------------------------------------------------------------

    /// True for literal constants and arrays made only of constants.
    #[must_use]
    pub fn is_constant(&self, id: NodeId) -> bool {
        match self.kind(id) {
            NodeKind::Constant(_) => true,
            NodeKind::Array => self.members(id).iter().all(|m| self.is_constant(*m)),
            _ => false,
        }
    }

    /// True when evaluating `id` twice always yields the same value.
    ///
    /// Function calls count only when their name is a known pure function.
    #[must_use]
    pub fn is_deterministic(&self, id: NodeId) -> bool {
        if let NodeKind::Function(name) = self.kind(id)
            && !is_pure_function(name)
        {
            return false;
        }

        self.members(id).iter().all(|m| self.is_deterministic(*m))
    }

    #[must_use]
    pub fn is_array(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Array)
    }

    #[must_use]
    pub fn is_null_value(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Constant(Value::Null))
    }

    #[must_use]
    pub fn is_attribute_access(&self, id: NodeId) -> bool {
        matches!(
            self.kind(id),
            NodeKind::AttributeAccess(_) | NodeKind::Expansion
        )
    }

    /// Literal value of a constant expression, arrays included.
    #[must_use]
    pub fn constant_value(&self, id: NodeId) -> Option<Value> {
        match self.kind(id) {
            NodeKind::Constant(value) => Some(value.clone()),
            NodeKind::Array => self
                .members(id)
                .iter()
                .map(|m| self.constant_value(*m))
                .collect::<Option<Vec<_>>>()
                .map(Value::List),
            _ => None,
        }
    }

    /// `(variable, path)` when `id` is a pure attribute chain off a variable.
    ///
    /// An expansion marks the component it wraps. Plain references, double
    /// expansions and chains rooted anywhere but a reference yield `None`.
    #[must_use]
    pub fn attribute_access_for_variable(&self, id: NodeId) -> Option<(VariableId, AttributePath)> {
        let mut components = Vec::new();
        let mut expand_next = false;
        let mut current = id;

        loop {
            match self.kind(current) {
                NodeKind::AttributeAccess(name) => {
                    components.push(PathComponent::new(name.clone(), expand_next));
                    expand_next = false;
                }
                NodeKind::Expansion => {
                    if expand_next {
                        return None;
                    }
                    expand_next = true;
                }
                NodeKind::Reference(var) => {
                    if expand_next || components.is_empty() {
                        return None;
                    }
                    let mut path = AttributePath::from_components(components);
                    path.reverse();

                    return Some((*var, path));
                }
                _ => return None,
            }
            current = self.member(current, 0)?;
        }
    }

    /// Variable of a pure attribute chain, if any.
    #[must_use]
    pub fn attribute_variable(&self, id: NodeId) -> Option<VariableId> {
        self.attribute_access_for_variable(id).map(|(var, _)| var)
    }

    /// Collect every variable referenced below `id`.
    pub fn variables_used(&self, id: NodeId, out: &mut BTreeSet<VariableId>) {
        if let NodeKind::Reference(var) = self.kind(id) {
            out.insert(*var);
        }
        for member in self.members(id) {
            self.variables_used(*member, out);
        }
    }

    #[must_use]
    pub fn variables_of(&self, id: NodeId) -> BTreeSet<VariableId> {
        let mut out = BTreeSet::new();
        self.variables_used(id, &mut out);
        out
    }

    #[must_use]
    pub fn references_variable(&self, id: NodeId, var: VariableId) -> bool {
        matches!(self.kind(id), NodeKind::Reference(v) if *v == var)
            || self
                .members(id)
                .iter()
                .any(|m| self.references_variable(*m, var))
    }

    /// Attribute paths of `var` read below `id`.
    ///
    /// Paths are cut after their first expanded component. Any use of the
    /// variable other than through an attribute chain is `Whole`.
    #[must_use]
    pub fn attribute_usage(&self, id: NodeId, var: VariableId) -> AttributeUsage {
        if let Some((found, path)) = self.attribute_access_for_variable(id)
            && found == var
        {
            let mut path = path;
            if let Some(pos) = path.components().iter().position(|c| c.expand) {
                path.shorten_to(pos + 1);
            }

            return AttributeUsage::Paths(BTreeSet::from([path.without_expansion()]));
        }

        match self.kind(id) {
            NodeKind::Reference(found) if *found == var => AttributeUsage::Whole,
            _ => {
                let mut usage = AttributeUsage::Unused;
                for member in self.members(id) {
                    usage.merge(self.attribute_usage(*member, var));
                    if usage == AttributeUsage::Whole {
                        break;
                    }
                }
                usage
            }
        }
    }

    /// Structural equality of two subtrees (variables compared by id).
    ///
    /// Two distinct calls to an impure function are never equal.
    #[must_use]
    pub fn structurally_equal(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return true;
        }
        let (left, right) = (self.node(a), self.node(b));
        if let NodeKind::Function(name) = &left.kind
            && !is_pure_function(name)
        {
            return false;
        }

        left.kind == right.kind
            && left.members.len() == right.members.len()
            && left
                .members
                .iter()
                .zip(&right.members)
                .all(|(l, r)| self.structurally_equal(*l, *r))
    }
}
