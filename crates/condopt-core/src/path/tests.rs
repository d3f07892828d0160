use crate::{
    error::{ErrorClass, ErrorOrigin},
    path::{AttributeKind, AttributePath, PathComponent},
    resource::ResourceMonitor,
};
use proptest::prelude::*;
use std::collections::HashSet;

fn path(s: &str) -> AttributePath {
    AttributePath::parse(s).expect("valid path")
}

#[test]
fn expansion_markers_can_be_stripped() {
    let parsed = path("foo[*].bar.baz[*]");

    assert_eq!(parsed.to_string_with(true), "foo.bar.baz");
    assert_eq!(parsed.to_string(), "foo[*].bar.baz[*]");
    assert!(parsed.has_expansion());
    assert!(!parsed.without_expansion().has_expansion());
}

#[test]
fn single_name_round_trips() {
    assert_eq!(path("i").to_string(), "i");
    assert_eq!(path("i").components(), &[PathComponent::plain("i")]);
}

#[test]
fn malformed_expansions_are_rejected_with_stable_code() {
    for input in ["foo[*]bar", "foo[*bar", "foo[ * ].baz", "foo[0]", "foo[0].value"] {
        let err = AttributePath::parse(input).expect_err(input);

        assert_eq!(err.class, ErrorClass::Query, "{input}");
        assert_eq!(err.query_code(), Some("ATTRIBUTE_PARSER_FAILED"), "{input}");
        assert!(err.message.starts_with("attribute parser failed"), "{input}");
    }
}

#[test]
fn empty_components_are_rejected() {
    for input in ["", ".", "a..b", "a.", ".a", "[*]"] {
        assert!(AttributePath::parse(input).is_err(), "{input}");
    }
}

#[test]
fn classification_uses_reserved_system_attributes() {
    assert_eq!(path("_id").kind(), AttributeKind::Id);
    assert_eq!(path("_key").kind(), AttributeKind::Key);
    assert_eq!(path("_from").kind(), AttributeKind::From);
    assert_eq!(path("_to").kind(), AttributeKind::To);
    assert_eq!(path("value").kind(), AttributeKind::SingleAttribute);
    assert_eq!(path("_key.sub").kind(), AttributeKind::MultiAttribute);
}

#[test]
#[should_panic(expected = "empty attribute path")]
fn classification_of_empty_path_is_a_precondition_violation() {
    let _ = AttributePath::default().kind();
}

#[test]
fn prefix_queries_compare_components() {
    let a = path("a.b");
    let abc = path("a.b.c");
    let ab_expanded = path("a.b[*].c");

    assert!(a.is_prefix_of(&abc));
    assert!(a.is_prefix_of(&a));
    assert!(!abc.is_prefix_of(&a));
    assert!(!a.is_prefix_of(&ab_expanded));
    assert_eq!(AttributePath::common_prefix_length(&abc, &ab_expanded), 1);
    assert_eq!(AttributePath::common_prefix_length(&abc, &abc), 3);
}

#[test]
fn shorten_and_reverse_edit_in_place() {
    let mut p = path("a.b.c");
    p.reverse();
    assert_eq!(p.to_string(), "c.b.a");

    p.shorten_to(1);
    assert_eq!(p.to_string(), "c");

    p.shorten_to(5);
    assert_eq!(p.len(), 1);
}

#[test]
fn ordering_is_lexicographic_by_component() {
    let mut paths = vec![path("b"), path("a.c"), path("a"), path("a.b")];
    paths.sort();

    let rendered = paths.iter().map(ToString::to_string).collect::<Vec<_>>();
    assert_eq!(rendered, ["a", "a.b", "a.c", "b"]);
}

#[test]
fn hash_is_structural_and_order_sensitive() {
    assert_eq!(path("a.b").hash_value(), path("a.b").hash_value());
    assert_eq!(
        path("a.b").hash_value(),
        AttributePath::from_names(["a", "b"]).hash_value()
    );
    assert_ne!(path("a.b").hash_value(), path("b.a").hash_value());
    assert_ne!(path("a.b").hash_value(), path("a[*].b").hash_value());
    assert_ne!(path("ab").hash_value(), path("a.b").hash_value());

    let set = [path("a"), path("a"), path("b")]
        .into_iter()
        .collect::<HashSet<_>>();
    assert_eq!(set.len(), 2);
}

#[test]
fn hash_values_are_pinned() {
    assert_eq!(path("a").hash_value(), 0x9b8b_1931_394f_fde5);
    assert_eq!(path("_key").hash_value(), 0x09d7_a935_7130_99e8);
    assert_eq!(path("a.b[*].c").hash_value(), 0x4888_6728_d698_27b6);
}

#[test]
fn tracked_construction_respects_the_monitor() {
    let monitor = ResourceMonitor::with_limit(8);
    let err = AttributePath::try_new(vec![PathComponent::plain("attribute")], &monitor)
        .expect_err("over limit");

    assert_eq!(err.class, ErrorClass::ResourceExhausted);
    assert_eq!(err.origin, ErrorOrigin::Path);

    let unlimited = ResourceMonitor::unlimited();
    let tracked =
        AttributePath::try_new(vec![PathComponent::plain("a")], &unlimited).expect("tracked");
    assert_eq!(unlimited.current(), tracked.memory_usage());
}

fn arb_path_text() -> impl Strategy<Value = String> {
    prop::collection::vec(("[a-z_][a-z0-9_]{0,5}", any::<bool>()), 1..5).prop_map(|parts| {
        parts
            .into_iter()
            .map(|(name, expand)| if expand { format!("{name}[*]") } else { name })
            .collect::<Vec<_>>()
            .join(".")
    })
}

proptest! {
    #[test]
    fn well_formed_paths_round_trip(text in arb_path_text()) {
        let parsed = AttributePath::parse(&text).expect("generated path is valid");

        prop_assert_eq!(parsed.to_string(), text.clone());
        prop_assert_eq!(parsed.to_string_with(true), text.replace("[*]", ""));
    }
}
