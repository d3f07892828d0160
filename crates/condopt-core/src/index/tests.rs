use crate::{
    ast::{CompareOp, ExprArena, NodeId, VariableId},
    condition::{Condition, ConditionOptimization},
    error::{ErrorClass, InternalError},
    index::{FieldIndex, Index, IndexHint, IndexSelection, SortCondition, StreamOptions},
    obs::{PlannerEvent, RecordingSink, with_trace_sink},
    path::AttributePath,
    plan::Projections,
    value::Value,
};
use std::{rc::Rc, sync::Arc};

const ITEMS: usize = 1000;

fn path(s: &str) -> AttributePath {
    AttributePath::parse(s).expect("valid path")
}

fn index(id: u64, name: &str, fields: &[&str]) -> FieldIndex {
    FieldIndex::new(id, name, fields.iter().map(|f| path(f)).collect())
}

fn arced(indexes: Vec<FieldIndex>) -> Vec<Arc<dyn Index>> {
    indexes
        .into_iter()
        .map(|index| Arc::new(index) as Arc<dyn Index>)
        .collect()
}

///
/// Query
///

struct Query {
    arena: ExprArena,
    doc: VariableId,
}

impl Query {
    fn new() -> Self {
        let mut arena = ExprArena::new();
        let doc = arena.create_variable("doc");

        Self { arena, doc }
    }

    fn cmp(&mut self, name: &str, op: CompareOp, value: impl Into<Value>) -> NodeId {
        let attribute = self.arena.attribute_path(self.doc, &path(name));
        let value = self.arena.constant(value);
        self.arena.compare(op, attribute, value)
    }

    fn in_list(&mut self, name: &str, values: &[i64]) -> NodeId {
        let attribute = self.arena.attribute_path(self.doc, &path(name));
        let list = self
            .arena
            .constant_array(values.iter().copied().map(Value::Int).collect());
        self.arena.compare(CompareOp::In, attribute, list)
    }

    fn branch(&mut self, members: Vec<NodeId>) -> NodeId {
        self.arena.nary_and(members)
    }

    fn normalized(&mut self, root: NodeId) -> Condition {
        let mut condition = Condition::from_root(root);
        condition
            .normalize(&mut self.arena, ConditionOptimization::Auto)
            .expect("normalize");

        condition
    }

    fn select(
        &self,
        condition: &Condition,
        candidates: &[Arc<dyn Index>],
        hint: &IndexHint,
        sort: Option<&SortCondition>,
    ) -> Result<IndexSelection, InternalError> {
        condition.find_indexes(&self.arena, self.doc, candidates, hint, sort, ITEMS)
    }
}

fn names(selection: &IndexSelection) -> Vec<&str> {
    selection.indexes.iter().map(|index| index.name()).collect()
}

//
// Filter costs
//

#[test]
fn equality_prefix_then_one_range_field() {
    let mut q = Query::new();
    let a = q.cmp("a", CompareOp::Eq, 1);
    let b = q.cmp("b", CompareOp::Gt, 2);
    let c = q.cmp("c", CompareOp::Eq, 3);
    let branch = q.branch(vec![c, b, a]);
    let idx = index(1, "abc", &["a", "b", "c"]);

    let costs = idx.supports_filter_condition(&q.arena, branch, q.doc, ITEMS);
    assert!(costs.supported);
    assert_eq!(costs.estimated_items, 50);
    assert!(costs.estimated_costs > 50.0 && costs.estimated_costs < 61.0);

    // c sits behind the range field, so the index cannot use it
    assert_eq!(idx.specialize_condition(&q.arena, branch, q.doc), vec![b, a]);
}

#[test]
fn in_list_fans_out_the_estimate() {
    let mut q = Query::new();
    let member = q.in_list("a", &[1, 2, 3]);
    let branch = q.branch(vec![member]);
    let idx = index(1, "a", &["a"]);

    let costs = idx.supports_filter_condition(&q.arena, branch, q.doc, ITEMS);
    assert!(costs.supported);
    assert_eq!(costs.estimated_items, 300);
}

#[test]
fn unique_full_equality_returns_at_most_fan_out() {
    let mut q = Query::new();
    let member = q.cmp("a", CompareOp::Eq, 7);
    let branch = q.branch(vec![member]);
    let idx = index(1, "a", &["a"]).with_unique(true);

    let costs = idx.supports_filter_condition(&q.arena, branch, q.doc, ITEMS);
    assert!(costs.supported);
    assert_eq!(costs.estimated_items, 1);
}

#[test]
fn leading_field_must_be_constrained() {
    let mut q = Query::new();
    let member = q.cmp("a", CompareOp::Eq, 1);
    let branch = q.branch(vec![member]);
    let idx = index(1, "b", &["b", "a"]);

    let costs = idx.supports_filter_condition(&q.arena, branch, q.doc, ITEMS);
    assert!(!costs.supported);
    assert_eq!(costs.estimated_items, ITEMS);
    assert!(costs.estimated_costs.is_infinite());
    assert!(idx.specialize_condition(&q.arena, branch, q.doc).is_empty());
}

#[test]
fn sparse_index_needs_null_excluding_condition() {
    let mut q = Query::new();
    let sparse = index(1, "a", &["a"]).with_sparse(true);

    let gt = q.cmp("a", CompareOp::Gt, 1);
    let gt = q.branch(vec![gt]);
    assert!(sparse.supports_filter_condition(&q.arena, gt, q.doc, ITEMS).supported);

    let lt = q.cmp("a", CompareOp::Lt, 5);
    let lt = q.branch(vec![lt]);
    assert!(!sparse.supports_filter_condition(&q.arena, lt, q.doc, ITEMS).supported);

    let eq_null = q.cmp("a", CompareOp::Eq, Value::Null);
    let eq_null = q.branch(vec![eq_null]);
    assert!(!sparse.supports_filter_condition(&q.arena, eq_null, q.doc, ITEMS).supported);

    // `!= null` is not served by the index but still rules out missing values
    let ne_null = q.cmp("a", CompareOp::Ne, Value::Null);
    let bounded = q.cmp("a", CompareOp::Lt, 5);
    let guarded = q.branch(vec![ne_null, bounded]);
    assert!(sparse.supports_filter_condition(&q.arena, guarded, q.doc, ITEMS).supported);
    assert_eq!(
        sparse.specialize_condition(&q.arena, guarded, q.doc),
        vec![bounded]
    );
}

#[test]
fn unsorted_index_answers_full_equality_only() {
    let mut q = Query::new();
    let hash = index(1, "ab", &["a", "b"]).with_sorted(false);

    let a = q.cmp("a", CompareOp::Eq, 1);
    let partial = q.branch(vec![a]);
    assert!(!hash.supports_filter_condition(&q.arena, partial, q.doc, ITEMS).supported);

    let b = q.cmp("b", CompareOp::Eq, 2);
    let full = q.branch(vec![a, b]);
    assert!(hash.supports_filter_condition(&q.arena, full, q.doc, ITEMS).supported);
}

#[test]
fn self_referencing_comparisons_are_ignored() {
    let mut q = Query::new();
    let lhs = q.arena.attribute_path(q.doc, &path("a"));
    let rhs = q.arena.attribute_path(q.doc, &path("b"));
    let member = q.arena.compare(CompareOp::Eq, lhs, rhs);
    let branch = q.branch(vec![member]);

    assert!(
        !index(1, "a", &["a"])
            .supports_filter_condition(&q.arena, branch, q.doc, ITEMS)
            .supported
    );
}

//
// Sort, stream, covering
//

#[test]
fn sort_needs_matching_prefix_and_one_direction() {
    let q = Query::new();
    let idx = index(1, "ab", &["a", "b"]);

    let prefix = SortCondition::ascending(q.doc, vec![path("a")]);
    assert!(idx.supports_sort_condition(&prefix, ITEMS).supported);

    let wrong_field = SortCondition::ascending(q.doc, vec![path("b")]);
    assert!(!idx.supports_sort_condition(&wrong_field, ITEMS).supported);

    let mixed = SortCondition {
        variable: q.doc,
        fields: vec![(path("a"), true), (path("b"), false)],
    };
    assert!(!idx.supports_sort_condition(&mixed, ITEMS).supported);

    let hash = index(2, "ab", &["a", "b"]).with_sorted(false);
    assert!(!hash.supports_sort_condition(&prefix, ITEMS).supported);
}

#[test]
fn stream_interface_takes_one_key_behind_constants() {
    let idx = index(1, "abc", &["a", "b", "c"]);
    let options = |used: &[usize], constants: &[usize], projected: &[usize]| StreamOptions {
        used_key_fields: used.to_vec(),
        constant_fields: constants.to_vec(),
        projected_fields: projected.to_vec(),
    };

    assert!(idx.supports_stream_interface(&options(&[0], &[], &[1, 2])));
    assert!(idx.supports_stream_interface(&options(&[2], &[0, 1], &[])));
    assert!(!idx.supports_stream_interface(&options(&[1], &[], &[])));
    assert!(!idx.supports_stream_interface(&options(&[0, 1], &[], &[])));
    assert!(!idx.supports_stream_interface(&options(&[], &[], &[])));
    assert!(!idx.supports_stream_interface(&options(&[0], &[], &[3])));
    assert!(!idx.supports_stream_interface(&options(&[3], &[0, 1, 2], &[])));

    let expanded = index(2, "tags", &["tags[*]"]);
    assert!(expanded.has_expansion());
    assert!(!expanded.supports_stream_interface(&options(&[0], &[], &[])));
}

#[test]
fn covering_requires_every_projection_under_a_plain_field() {
    let idx = index(1, "ab", &["a", "b", "tags[*]"]);

    assert!(idx.covers(&Projections::from_paths([path("a"), path("b.x")])));
    assert!(!idx.covers(&Projections::from_paths([path("a"), path("c")])));
    assert!(!idx.covers(&Projections::from_paths([path("tags")])));
    assert!(!idx.covers(&Projections::default()));
}

//
// Selection
//

#[test]
fn cheapest_index_wins_per_branch() {
    let mut q = Query::new();
    let a = q.cmp("a", CompareOp::Eq, 1);
    let b = q.cmp("b", CompareOp::Eq, 2);
    let root = q.branch(vec![a, b]);
    let condition = q.normalized(root);
    let candidates = arced(vec![index(1, "by_a", &["a"]), index(2, "by_ab", &["a", "b"])]);

    let selection = q
        .select(&condition, &candidates, &IndexHint::default(), None)
        .expect("select");

    assert_eq!(names(&selection), vec!["by_ab"]);
    assert!(selection.used_for_filter);
    assert!(!selection.used_for_sort);
    assert_eq!(selection.estimated_items, 10);
}

#[test]
fn equal_costs_break_ties_by_name() {
    let mut q = Query::new();
    let a = q.cmp("a", CompareOp::Eq, 1);
    let condition = q.normalized(a);
    let candidates = arced(vec![index(1, "zeta", &["a"]), index(2, "alpha", &["a"])]);

    let selection = q
        .select(&condition, &candidates, &IndexHint::default(), None)
        .expect("select");

    assert_eq!(names(&selection), vec!["alpha"]);
}

#[test]
fn hinted_index_beats_cheaper_one() {
    let mut q = Query::new();
    let a = q.cmp("a", CompareOp::Eq, 1);
    let b = q.cmp("b", CompareOp::Eq, 2);
    let root = q.branch(vec![a, b]);
    let condition = q.normalized(root);
    let candidates = arced(vec![index(1, "by_a", &["a"]), index(2, "by_ab", &["a", "b"])]);

    let selection = q
        .select(&condition, &candidates, &IndexHint::prefer(["by_a"]), None)
        .expect("select");
    assert_eq!(names(&selection), vec!["by_a"]);

    // an unusable soft hint falls back to the cost model
    let selection = q
        .select(&condition, &candidates, &IndexHint::prefer(["by_c"]), None)
        .expect("select");
    assert_eq!(names(&selection), vec!["by_ab"]);
}

#[test]
fn unusable_forced_hint_fails_the_plan() {
    let mut q = Query::new();
    let a = q.cmp("a", CompareOp::Eq, 1);
    let condition = q.normalized(a);
    let candidates = arced(vec![index(1, "by_a", &["a"]), index(2, "by_c", &["c"])]);

    let err = q
        .select(&condition, &candidates, &IndexHint::force(["by_c"]), None)
        .expect_err("forced hint cannot serve the filter");

    assert_eq!(err.class, ErrorClass::Query);
    assert_eq!(err.query_code(), Some("FORCED_INDEX_HINT_UNUSABLE"));
    assert!(err.message.contains("by_c"));

    let selection = q
        .select(&condition, &candidates, &IndexHint::force(["by_a"]), None)
        .expect("forced hint serves the filter");
    assert_eq!(names(&selection), vec!["by_a"]);
}

#[test]
fn every_or_branch_needs_an_index() {
    let mut q = Query::new();
    let a = q.cmp("a", CompareOp::Eq, 1);
    let b = q.cmp("b", CompareOp::Eq, 2);
    let root = q.arena.or(a, b);
    let condition = q.normalized(root);

    let both = arced(vec![index(1, "by_a", &["a"]), index(2, "by_b", &["b"])]);
    let selection = q
        .select(&condition, &both, &IndexHint::default(), None)
        .expect("select");
    let mut served = names(&selection);
    served.sort_unstable();
    assert_eq!(served, vec!["by_a", "by_b"]);
    assert_eq!(selection.estimated_items, 200);

    let only_a = arced(vec![index(1, "by_a", &["a"])]);
    let selection = q
        .select(&condition, &only_a, &IndexHint::default(), None)
        .expect("select");
    assert!(selection.indexes.is_empty());
    assert!(!selection.is_usable());
}

#[test]
fn sort_only_selection_skips_sparse_indexes() {
    let mut q = Query::new();
    let condition = Condition::always_true(&mut q.arena);
    let sort = SortCondition::ascending(q.doc, vec![path("a")]);
    let candidates = arced(vec![
        index(1, "a_sparse", &["a"]).with_sparse(true),
        index(2, "b_plain", &["a", "b"]),
    ]);

    let selection = q
        .select(&condition, &candidates, &IndexHint::default(), Some(&sort))
        .expect("select");

    assert_eq!(names(&selection), vec!["b_plain"]);
    assert!(selection.used_for_sort);
    assert!(!selection.used_for_filter);
    assert_eq!(selection.estimated_items, ITEMS);
}

#[test]
fn filter_index_also_reports_sort_support() {
    let mut q = Query::new();
    let a = q.cmp("a", CompareOp::Gt, 1);
    let condition = q.normalized(a);
    let sort = SortCondition::ascending(q.doc, vec![path("a")]);
    let candidates = arced(vec![index(1, "by_a", &["a"])]);

    let selection = q
        .select(&condition, &candidates, &IndexHint::default(), Some(&sort))
        .expect("select");

    assert!(selection.used_for_filter);
    assert!(selection.used_for_sort);
}

#[test]
fn selection_requires_normalized_condition() {
    let mut q = Query::new();
    let a = q.cmp("a", CompareOp::Eq, 1);
    let condition = Condition::from_root(a);

    let err = q
        .select(&condition, &[], &IndexHint::default(), None)
        .expect_err("unnormalized");
    assert_eq!(err.class, ErrorClass::InvariantViolation);
}

#[test]
fn selected_indexes_are_recorded() {
    let mut q = Query::new();
    let a = q.cmp("a", CompareOp::Eq, 1);
    let condition = q.normalized(a);
    let candidates = arced(vec![index(1, "by_a", &["a"])]);
    let sink = Rc::new(RecordingSink::new());

    with_trace_sink(sink.clone(), || {
        q.select(&condition, &candidates, &IndexHint::default(), None)
            .expect("select");
    });

    let selected = sink
        .events()
        .into_iter()
        .filter_map(|event| match event {
            PlannerEvent::IndexSelected {
                index,
                estimated_items,
                ..
            } => Some((index, estimated_items)),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(selected, vec![("by_a".to_string(), 100)]);
}
