mod part;
mod simplify;

use crate::{
    ast::{CompareOp, ExprArena, NodeId, VariableId},
    condition::{Condition, ConditionOptimization},
    index::FieldIndex,
    path::AttributePath,
    value::Value,
};

///
/// Fixture
///
/// Arena with a `doc` variable and shorthands for building comparisons on it.
///

pub(super) struct Fixture {
    pub arena: ExprArena,
    pub doc: VariableId,
}

impl Fixture {
    pub fn new() -> Self {
        let mut arena = ExprArena::new();
        let doc = arena.create_variable("doc");

        Self { arena, doc }
    }

    pub fn attr(&mut self, name: &str) -> NodeId {
        self.attr_of(self.doc, name)
    }

    pub fn attr_of(&mut self, variable: VariableId, name: &str) -> NodeId {
        let path = AttributePath::parse(name).expect("path");
        self.arena.attribute_path(variable, &path)
    }

    pub fn cmp(&mut self, name: &str, op: CompareOp, value: impl Into<Value>) -> NodeId {
        let attribute = self.attr(name);
        let value = self.arena.constant(value);
        self.arena.compare(op, attribute, value)
    }

    pub fn in_list(&mut self, name: &str, values: &[i64]) -> NodeId {
        let attribute = self.attr(name);
        let list = self
            .arena
            .constant_array(values.iter().copied().map(Value::Int).collect());
        self.arena.compare(CompareOp::In, attribute, list)
    }

    pub fn and(&mut self, members: Vec<NodeId>) -> NodeId {
        self.arena.nary_and(members)
    }

    pub fn or(&mut self, members: Vec<NodeId>) -> NodeId {
        self.arena.nary_or(members)
    }

    pub fn normalized(&mut self, root: NodeId) -> Condition {
        self.normalized_with(root, ConditionOptimization::Auto)
    }

    pub fn normalized_with(&mut self, root: NodeId, optimization: ConditionOptimization) -> Condition {
        let mut condition = Condition::from_root(root);
        condition
            .normalize(&mut self.arena, optimization)
            .expect("normalize");

        condition
    }

    pub fn print(&self, condition: &Condition) -> String {
        condition.print(&self.arena).expect("print")
    }
}

pub(super) fn index_on(id: u64, fields: &[&str]) -> FieldIndex {
    let fields = fields
        .iter()
        .map(|f| AttributePath::parse(f).expect("path"))
        .collect();

    FieldIndex::new(id, format!("idx_{id}"), fields)
}
