use super::Fixture;
use crate::{
    ast::{CompareOp, NodeId, Quantifier},
    condition::{AttributeSide, CompareResult, ConditionPart, part::list_contained_in},
    value::{Value, values_equal},
};

fn part(f: &Fixture, member: NodeId) -> ConditionPart {
    ConditionPart::from_member(&f.arena, member).expect("condition part")
}

#[test]
fn attribute_on_the_right_is_mirrored() {
    let mut f = Fixture::new();
    let five = f.arena.constant(5);
    let a = f.attr("a");
    let member = f.arena.compare(CompareOp::Lt, five, a);

    let part = part(&f, member);

    assert_eq!(part.side, AttributeSide::Right);
    assert_eq!(part.op, Some(CompareOp::Gt));
    assert_eq!(part.attribute_name, "a");
    assert_eq!(part.constant_value(&f.arena), Some(Value::Int(5)));
}

#[test]
fn for_variable_skips_other_variables() {
    let mut f = Fixture::new();
    let other = f.arena.create_variable("other");
    let mine = f.attr("a");
    let theirs = f.attr_of(other, "b");
    let member = f.arena.compare(CompareOp::Eq, theirs, mine);

    let found = ConditionPart::for_variable(&f.arena, member, f.doc).expect("part");
    assert_eq!(found.side, AttributeSide::Right);
    assert_eq!(found.attribute_name, "a");

    let first = ConditionPart::from_member(&f.arena, member).expect("part");
    assert_eq!(first.variable, other);
}

#[test]
fn equal_constants_on_both_parts_cover_each_other() {
    let mut f = Fixture::new();
    let a = f.cmp("a", CompareOp::Eq, 1);
    let b = f.cmp("a", CompareOp::Eq, 1);
    let (a, b) = (part(&f, a), part(&f, b));

    assert!(a.is_covered_by(&f.arena, &b, false));
    assert_eq!(
        a.compare_with(&f.arena, &b),
        Some(CompareResult::OtherContainedInSelf)
    );
}

#[test]
fn narrower_range_covers_wider_one() {
    let mut f = Fixture::new();
    let wide = f.cmp("a", CompareOp::Lt, 10);
    let narrow = f.cmp("a", CompareOp::Lt, 3);
    let (wide, narrow) = (part(&f, wide), part(&f, narrow));

    assert!(wide.is_covered_by(&f.arena, &narrow, false));
    assert!(!narrow.is_covered_by(&f.arena, &wide, false));
}

#[test]
fn in_list_containment_decides_coverage() {
    let mut f = Fixture::new();
    let small = f.in_list("a", &[1, 2]);
    let large = f.in_list("a", &[1, 2, 3]);
    let (small, large) = (part(&f, small), part(&f, large));

    assert!(small.is_covered_by(&f.arena, &large, false));
    assert!(!large.is_covered_by(&f.arena, &small, false));
}

#[test]
fn reversed_equality_is_covered_by_matching_in_element() {
    let mut f = Fixture::new();
    let two = f.arena.constant(2);
    let a = f.attr("a");
    let eq = f.arena.compare(CompareOp::Eq, two, a);
    let list = f.in_list("a", &[1, 2, 3]);
    let (eq, list) = (part(&f, eq), part(&f, list));

    assert!(eq.is_covered_by(&f.arena, &list, true));
}

#[test]
fn different_attributes_never_cover() {
    let mut f = Fixture::new();
    let a = f.cmp("a", CompareOp::Eq, 1);
    let b = f.cmp("b", CompareOp::Eq, 1);
    let (a, b) = (part(&f, a), part(&f, b));

    assert!(!a.is_covered_by(&f.arena, &b, false));
}

#[test]
fn quantified_parts_need_the_same_quantifier_and_value() {
    let mut f = Fixture::new();
    let quantified = |f: &mut Fixture, quantifier: Quantifier, value: i64| {
        let tags = f.attr("tags[*]");
        let value = f.arena.constant(value);
        let member = f
            .arena
            .quantified_compare(CompareOp::Eq, quantifier, tags, value);
        part(f, member)
    };

    let all = quantified(&mut f, Quantifier::All, 1);
    let all_again = quantified(&mut f, Quantifier::All, 1);
    let all_other = quantified(&mut f, Quantifier::All, 2);
    let any = quantified(&mut f, Quantifier::Any, 1);
    let any_again = quantified(&mut f, Quantifier::Any, 1);
    let plain = f.cmp("tags[*]", CompareOp::Eq, 1);
    let plain = part(&f, plain);

    assert!(all.is_covered_by(&f.arena, &all_again, false));
    assert!(!all.is_covered_by(&f.arena, &all_other, false));
    assert!(!all.is_covered_by(&f.arena, &any, false));
    assert!(!any.is_covered_by(&f.arena, &any_again, false));
    assert!(!all.is_covered_by(&f.arena, &plain, false));
}

#[test]
fn non_constant_values_compare_by_printed_form() {
    let mut f = Fixture::new();
    let other = f.arena.create_variable("other");
    let joined = |f: &mut Fixture, name: &str| {
        let mine = f.attr("a");
        let theirs = f.attr_of(other, name);
        let member = f.arena.compare(CompareOp::Eq, mine, theirs);
        part(f, member)
    };

    let first = joined(&mut f, "b");
    let same = joined(&mut f, "b");
    let different = joined(&mut f, "c");

    assert_eq!(
        first.compare_with(&f.arena, &same),
        Some(CompareResult::OtherContainedInSelf)
    );
    assert_eq!(first.compare_with(&f.arena, &different), None);
    assert!(!first.is_covered_by(&f.arena, &different, false));
}

#[test]
fn impure_values_never_compare() {
    let mut f = Fixture::new();
    let draw = |f: &mut Fixture, op: CompareOp| {
        let a = f.attr("a");
        let rand = f.arena.function("RAND", Vec::new());
        let member = f.arena.compare(op, a, rand);
        part(f, member)
    };

    let gt = draw(&mut f, CompareOp::Gt);
    let lt = draw(&mut f, CompareOp::Lt);
    let eq = draw(&mut f, CompareOp::Eq);
    let eq_again = draw(&mut f, CompareOp::Eq);

    assert_eq!(lt.compare_with(&f.arena, &gt), None);
    assert_eq!(eq.compare_with(&f.arena, &eq_again), None);
    assert!(!eq.is_covered_by(&f.arena, &eq_again, false));
}

#[test]
fn pure_function_values_compare_by_printed_form() {
    let mut f = Fixture::new();
    let other = f.arena.create_variable("other");
    let length = |f: &mut Fixture| {
        let a = f.attr("a");
        let b = f.attr_of(other, "b");
        let call = f.arena.function("LENGTH", vec![b]);
        let member = f.arena.compare(CompareOp::Eq, a, call);
        part(f, member)
    };

    let first = length(&mut f);
    let second = length(&mut f);

    assert_eq!(
        first.compare_with(&f.arena, &second),
        Some(CompareResult::OtherContainedInSelf)
    );
}

// Sixty values, alternating Int and integral Float; `swap` flips which
// positions carry the Float.
fn mixed_values(swap: bool) -> Vec<Value> {
    (0..60_i32)
        .map(|i| {
            if (i % 2 == 0) == swap {
                Value::Float(f64::from(i))
            } else {
                Value::Int(i64::from(i))
            }
        })
        .collect()
}

fn contained_pairwise(mine: &[Value], theirs: &[Value]) -> bool {
    mine.iter()
        .all(|v| theirs.iter().any(|w| values_equal(v, w)))
}

#[test]
fn large_in_lists_use_keyed_containment() {
    let mine = mixed_values(false);
    let theirs = mixed_values(true);
    assert!(mine.len() * theirs.len() >= 2048);

    assert!(contained_pairwise(&mine, &theirs));
    assert!(list_contained_in(&mine, &theirs));

    let mut outside = mine.clone();
    outside[17] = Value::Float(17.5);
    assert!(!contained_pairwise(&outside, &theirs));
    assert!(!list_contained_in(&outside, &theirs));
}

#[test]
fn large_in_list_parts_cover_by_membership() {
    let mut f = Fixture::new();
    let list_part = |f: &mut Fixture, values: Vec<Value>| {
        let a = f.attr("a");
        let list = f.arena.constant_array(values);
        let member = f.arena.compare(CompareOp::In, a, list);
        part(f, member)
    };

    let mine = list_part(&mut f, mixed_values(false));
    let theirs = list_part(&mut f, mixed_values(true));
    let mut short = mixed_values(true);
    short.pop();
    let short = list_part(&mut f, short);

    assert!(mine.is_covered_by(&f.arena, &theirs, false));
    assert!(!mine.is_covered_by(&f.arena, &short, false));
}

#[test]
fn in_list_bounds_come_from_sorted_ends() {
    let mut f = Fixture::new();
    let list = f.in_list("a", &[1, 3, 5]);
    let gt = f.cmp("a", CompareOp::Gt, 2);
    let le = f.cmp("a", CompareOp::Le, 7);
    let (list, gt, le) = (part(&f, list), part(&f, gt), part(&f, le));

    assert_eq!(list.lower_bound(&f.arena), Some(Value::Int(1)));
    assert_eq!(list.upper_bound(&f.arena), Some(Value::Int(5)));
    assert!(list.is_lower_inclusive() && list.is_upper_inclusive());

    assert_eq!(gt.lower_bound(&f.arena), Some(Value::Int(2)));
    assert_eq!(gt.upper_bound(&f.arena), None);
    assert!(!gt.is_lower_inclusive());

    assert_eq!(le.lower_bound(&f.arena), None);
    assert_eq!(le.upper_bound(&f.arena), Some(Value::Int(7)));
    assert!(le.is_upper_inclusive());
}

#[test]
fn membership_and_acceptance() {
    let mut f = Fixture::new();
    let list = f.in_list("a", &[1, 3]);
    let ge = f.cmp("a", CompareOp::Ge, 3);
    let (list, ge) = (part(&f, list), part(&f, ge));

    assert!(list.value_in_list(&f.arena, &Value::Int(3)));
    assert!(list.value_in_list(&f.arena, &Value::Float(1.0)));
    assert!(!list.value_in_list(&f.arena, &Value::Int(2)));

    assert_eq!(ge.accepts(&f.arena, &Value::Int(3)), Some(true));
    assert_eq!(ge.accepts(&f.arena, &Value::Int(2)), Some(false));
    assert_eq!(list.accepts(&f.arena, &Value::Int(1)), None);
}
