//! Pairwise algebra for two comparisons on the same attribute.
//!
//! Lookups are `TABLE[cmp(other.value, self.value)][other.op][self.op]`,
//! with the value axis mapped `< → 0`, `== → 1`, `> → 2` and the operator
//! axes `== != < <= >= > other`. The cells are data, not derived: the
//! multi-valued table differs wherever one array can satisfy both sides with
//! two different elements.

use crate::ast::CompareOp;
use std::cmp::Ordering;

///
/// CompareResult
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CompareResult {
    /// The AND of both sides is empty.
    Impossible,
    /// `self` implies `other`; `other` is redundant.
    SelfContainedInOther,
    /// `other` implies `self`; `self` is redundant.
    OtherContainedInSelf,
    /// Both sides collapse into one `==` test.
    ConvertEqual,
    /// Neither side implies the other.
    Disjoint,
}

use CompareResult::{
    ConvertEqual as CONV, Disjoint as DIS, Impossible as IMP, OtherContainedInSelf as OTH,
    SelfContainedInOther as SELF,
};

type Table = [[[CompareResult; 7]; 7]; 3];

const OTHER_ROW: [CompareResult; 7] = [DIS; 7];

#[rustfmt::skip]
pub(crate) const RESULTS_TABLE: Table = [
    // other.value < self.value
    [
        //   ==    !=    <     <=    >=    >     other
        [IMP,  OTH,  OTH,  OTH,  IMP,  IMP,  DIS], // other ==
        [SELF, DIS,  DIS,  DIS,  SELF, SELF, DIS], // other !=
        [IMP,  OTH,  OTH,  OTH,  IMP,  IMP,  DIS], // other <
        [IMP,  OTH,  OTH,  OTH,  IMP,  IMP,  DIS], // other <=
        [SELF, DIS,  DIS,  DIS,  SELF, SELF, DIS], // other >=
        [SELF, DIS,  DIS,  DIS,  SELF, SELF, DIS], // other >
        OTHER_ROW,
    ],
    // other.value == self.value
    [
        [OTH,  IMP,  IMP,  OTH,  OTH,  IMP,  DIS],
        [IMP,  OTH,  SELF, DIS,  DIS,  SELF, DIS],
        [IMP,  OTH,  OTH,  OTH,  IMP,  IMP,  DIS],
        [SELF, DIS,  SELF, OTH,  CONV, IMP,  DIS],
        [SELF, DIS,  IMP,  CONV, OTH,  SELF, DIS],
        [IMP,  OTH,  IMP,  IMP,  OTH,  OTH,  DIS],
        OTHER_ROW,
    ],
    // other.value > self.value
    [
        [IMP,  OTH,  IMP,  IMP,  OTH,  OTH,  DIS],
        [SELF, DIS,  SELF, SELF, DIS,  DIS,  DIS],
        [SELF, DIS,  SELF, SELF, DIS,  DIS,  DIS],
        [SELF, DIS,  SELF, SELF, DIS,  DIS,  DIS],
        [IMP,  OTH,  IMP,  IMP,  OTH,  OTH,  DIS],
        [IMP,  OTH,  IMP,  IMP,  OTH,  OTH,  DIS],
        OTHER_ROW,
    ],
];

#[rustfmt::skip]
pub(crate) const RESULTS_TABLE_MULTI_VALUED: Table = [
    [
        [DIS,  OTH,  OTH,  OTH,  DIS,  DIS,  DIS],
        [SELF, DIS,  DIS,  DIS,  SELF, SELF, DIS],
        [DIS,  OTH,  OTH,  OTH,  DIS,  DIS,  DIS],
        [DIS,  OTH,  OTH,  OTH,  DIS,  DIS,  DIS],
        [SELF, DIS,  DIS,  DIS,  SELF, SELF, DIS],
        [SELF, DIS,  DIS,  DIS,  SELF, SELF, DIS],
        OTHER_ROW,
    ],
    [
        [OTH,  DIS,  DIS,  OTH,  OTH,  DIS,  DIS],
        [DIS,  OTH,  SELF, DIS,  DIS,  SELF, DIS],
        [DIS,  OTH,  OTH,  OTH,  DIS,  DIS,  DIS],
        [SELF, DIS,  SELF, OTH,  DIS,  DIS,  DIS],
        [SELF, DIS,  DIS,  DIS,  OTH,  SELF, DIS],
        [DIS,  OTH,  DIS,  DIS,  OTH,  OTH,  DIS],
        OTHER_ROW,
    ],
    [
        [DIS,  OTH,  DIS,  DIS,  OTH,  OTH,  DIS],
        [SELF, DIS,  SELF, SELF, DIS,  DIS,  DIS],
        [SELF, DIS,  SELF, SELF, DIS,  DIS,  DIS],
        [SELF, DIS,  SELF, SELF, DIS,  DIS,  DIS],
        [DIS,  OTH,  DIS,  DIS,  OTH,  OTH,  DIS],
        [DIS,  OTH,  DIS,  DIS,  OTH,  OTH,  DIS],
        OTHER_ROW,
    ],
];

/// Operator axis position; IN, NOT IN and non-comparisons share "other".
#[must_use]
pub(crate) const fn operator_index(op: Option<CompareOp>) -> usize {
    match op {
        Some(CompareOp::Eq) => 0,
        Some(CompareOp::Ne) => 1,
        Some(CompareOp::Lt) => 2,
        Some(CompareOp::Le) => 3,
        Some(CompareOp::Ge) => 4,
        Some(CompareOp::Gt) => 5,
        Some(CompareOp::In | CompareOp::NotIn) | None => 6,
    }
}

#[must_use]
pub(crate) const fn ordering_index(ordering: Ordering) -> usize {
    match ordering {
        Ordering::Less => 0,
        Ordering::Equal => 1,
        Ordering::Greater => 2,
    }
}

/// Table cell for `self` against `other`, where `ordering` is
/// `cmp(other.value, self.value)`.
#[must_use]
pub(crate) const fn lookup(
    multi_valued: bool,
    ordering: Ordering,
    other_op: Option<CompareOp>,
    self_op: Option<CompareOp>,
) -> CompareResult {
    let table = if multi_valued {
        &RESULTS_TABLE_MULTI_VALUED
    } else {
        &RESULTS_TABLE
    };

    table[ordering_index(ordering)][operator_index(other_op)][operator_index(self_op)]
}

/// Sort weight of an AND member. Range exclusions sort before the
/// operators that lose inclusive lower bounds.
#[must_use]
pub(crate) const fn operation_weight(op: Option<CompareOp>) -> u8 {
    match op {
        Some(CompareOp::Ne) => 1,
        Some(CompareOp::Gt) => 2,
        Some(CompareOp::Ge) => 3,
        Some(CompareOp::Eq) => 4,
        Some(CompareOp::In) => 5,
        Some(CompareOp::NotIn) => 6,
        Some(CompareOp::Lt) => 7,
        Some(CompareOp::Le) => 8,
        None => 9,
    }
}
