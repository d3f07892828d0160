use super::Fixture;
use crate::{
    ast::CompareOp,
    condition::Condition,
    obs::{BranchRemoval, PlannerEvent, RecordingSink, with_trace_sink},
};
use std::rc::Rc;

#[test]
fn contradicting_equalities_empty_the_condition() {
    let mut f = Fixture::new();
    let five = f.cmp("a", CompareOp::Eq, 5);
    let six = f.cmp("a", CompareOp::Eq, 6);
    let root = f.and(vec![five, six]);
    let sink = Rc::new(RecordingSink::new());

    let condition = with_trace_sink(sink.clone(), || f.normalized(root));

    assert!(condition.is_empty(&f.arena));
    assert!(condition.is_always_false(&f.arena));
    assert_eq!(f.print(&condition), "false");
    assert_eq!(
        sink.events().first(),
        Some(&PlannerEvent::BranchRemoved {
            reason: BranchRemoval::Impossible
        })
    );
}

#[test]
fn touching_ranges_collapse_into_equality() {
    let mut f = Fixture::new();
    let ge = f.cmp("a", CompareOp::Ge, 5);
    let le = f.cmp("a", CompareOp::Le, 5);
    let root = f.and(vec![le, ge]);

    let condition = f.normalized(root);

    assert_eq!(f.print(&condition), "((doc.a == 5))");
}

#[test]
fn tighter_bound_wins() {
    let mut f = Fixture::new();
    let loose = f.cmp("a", CompareOp::Gt, 3);
    let tight = f.cmp("a", CompareOp::Gt, 5);
    let root = f.and(vec![loose, tight]);

    let condition = f.normalized(root);

    assert_eq!(f.print(&condition), "((doc.a > 5))");
}

#[test]
fn implied_inequality_is_dropped() {
    let mut f = Fixture::new();
    let lt = f.cmp("a", CompareOp::Lt, 10);
    let ne = f.cmp("a", CompareOp::Ne, 20);
    let root = f.and(vec![lt, ne]);

    let condition = f.normalized(root);

    assert_eq!(f.print(&condition), "((doc.a < 10))");
}

#[test]
fn disjoint_ranges_stay() {
    let mut f = Fixture::new();
    let lower = f.cmp("a", CompareOp::Gt, 1);
    let upper = f.cmp("a", CompareOp::Lt, 9);
    let root = f.and(vec![lower, upper]);

    let condition = f.normalized(root);

    assert_eq!(f.print(&condition), "((doc.a > 1 && doc.a < 9))");
}

#[test]
fn in_lists_are_sorted_and_deduplicated() {
    let mut f = Fixture::new();
    let root = f.in_list("a", &[3, 1, 3, 2]);

    let condition = f.normalized(root);

    assert_eq!(f.print(&condition), "((doc.a IN [1, 2, 3]))");
}

#[test]
fn in_lists_on_one_attribute_intersect() {
    let mut f = Fixture::new();
    let left = f.in_list("a", &[1, 2, 3]);
    let right = f.in_list("a", &[2, 3, 4]);
    let root = f.and(vec![left, right]);

    let condition = f.normalized(root);

    assert_eq!(f.print(&condition), "((doc.a IN [2, 3]))");
}

#[test]
fn contained_in_list_makes_the_wider_one_redundant() {
    let mut f = Fixture::new();
    let narrow = f.in_list("a", &[2]);
    let wide = f.in_list("a", &[1, 2, 3]);
    let root = f.and(vec![wide, narrow]);

    let condition = f.normalized(root);

    assert_eq!(f.print(&condition), "((doc.a IN [2]))");
}

#[test]
fn disjoint_in_lists_remove_the_branch() {
    let mut f = Fixture::new();
    let left = f.in_list("a", &[1, 2]);
    let right = f.in_list("a", &[3]);
    let kept = f.cmp("b", CompareOp::Eq, 1);
    let impossible = f.and(vec![left, right]);
    let root = f.or(vec![impossible, kept]);
    let sink = Rc::new(RecordingSink::new());

    let condition = with_trace_sink(sink.clone(), || f.normalized(root));

    assert_eq!(f.print(&condition), "((doc.b == 1))");
    assert!(sink.events().contains(&PlannerEvent::BranchRemoved {
        reason: BranchRemoval::EmptyInList
    }));
}

#[test]
fn range_filters_in_list() {
    let mut f = Fixture::new();
    let list = f.in_list("a", &[1, 5, 9]);
    let gt = f.cmp("a", CompareOp::Gt, 3);
    let root = f.and(vec![gt, list]);

    let condition = f.normalized(root);

    assert_eq!(f.print(&condition), "((doc.a IN [5, 9]))");
}

#[test]
fn range_excluding_every_in_element_is_impossible() {
    let mut f = Fixture::new();
    let list = f.in_list("a", &[1, 2]);
    let gt = f.cmp("a", CompareOp::Gt, 3);
    let root = f.and(vec![list, gt]);

    let condition = f.normalized(root);

    assert!(condition.is_always_false(&f.arena));
}

#[test]
fn duplicate_branches_are_dropped() {
    let mut f = Fixture::new();
    let first = f.cmp("a", CompareOp::Eq, 1);
    let second = f.cmp("a", CompareOp::Eq, 1);
    let root = f.or(vec![first, second]);
    let sink = Rc::new(RecordingSink::new());

    let condition = with_trace_sink(sink.clone(), || f.normalized(root));

    assert_eq!(f.print(&condition), "((doc.a == 1))");
    assert!(sink.events().contains(&PlannerEvent::BranchRemoved {
        reason: BranchRemoval::Duplicate
    }));
}

#[test]
fn members_are_ordered_by_operator_weight() {
    let mut f = Fixture::new();
    let le = f.cmp("a", CompareOp::Le, 1);
    let eq = f.cmp("b", CompareOp::Eq, 2);
    let ne = f.cmp("c", CompareOp::Ne, 3);
    let list = f.in_list("d", &[4]);
    let root = f.and(vec![le, eq, ne, list]);

    let condition = f.normalized(root);

    assert_eq!(
        f.print(&condition),
        "((doc.d IN [4] && doc.c != 3 && doc.b == 2 && doc.a <= 1))"
    );
}

#[test]
fn expanded_attributes_use_multi_valued_rules() {
    let mut f = Fixture::new();
    let one = f.cmp("tags[*]", CompareOp::Eq, 1);
    let two = f.cmp("tags[*]", CompareOp::Eq, 2);
    let root = f.and(vec![one, two]);

    let condition = f.normalized(root);

    assert!(!condition.is_empty(&f.arena));
    assert_eq!(
        f.print(&condition),
        "((doc.tags[*] == 1 && doc.tags[*] == 2))"
    );
}

#[test]
fn non_dnf_pass_keeps_shape() {
    let mut f = Fixture::new();
    let list = f.in_list("a", &[2, 1, 2]);
    let b = f.cmp("b", CompareOp::Eq, 1);
    let b_again = f.cmp("b", CompareOp::Eq, 1);
    let inner = f.arena.or(b, b_again);
    let root = f.arena.and(list, inner);

    let mut condition = Condition::from_root(root);
    condition.optimize_non_dnf(&mut f.arena);

    assert!(!condition.is_normalized());
    assert_eq!(f.print(&condition), "(doc.a IN [1, 2] && doc.b == 1)");
}

#[test]
fn independent_random_bounds_are_kept() {
    let mut f = Fixture::new();
    let a = f.attr("a");
    let low = f.arena.function("RAND", Vec::new());
    let gt = f.arena.compare(CompareOp::Gt, a, low);
    let a = f.attr("a");
    let high = f.arena.function("RAND", Vec::new());
    let lt = f.arena.compare(CompareOp::Lt, a, high);
    let root = f.and(vec![gt, lt]);

    let condition = f.normalized(root);

    assert!(!condition.is_empty(&f.arena));
    assert_eq!(condition.branches(&f.arena).len(), 1);
    let branch = condition.branches(&f.arena)[0];
    assert_eq!(f.arena.num_members(branch), 2);
}

#[test]
fn repeated_random_equalities_are_not_merged() {
    let mut f = Fixture::new();
    let draw = |f: &mut Fixture| {
        let a = f.attr("a");
        let rand = f.arena.function("RAND", Vec::new());
        f.arena.compare(CompareOp::Eq, a, rand)
    };
    let first = draw(&mut f);
    let second = draw(&mut f);
    let root = f.and(vec![first, second]);

    let condition = f.normalized(root);

    let branch = condition.branches(&f.arena)[0];
    assert_eq!(f.arena.num_members(branch), 2);
    assert_eq!(
        f.print(&condition),
        "((doc.a == RAND() && doc.a == RAND()))"
    );
}
