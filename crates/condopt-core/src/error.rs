use crate::serialize::SerializeError;
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured planner error with a stable classification.
/// Anything not explicitly downgraded to best-effort propagates as-is and
/// aborts the plan-build step that raised it.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Construct a condition-origin precondition violation.
    pub(crate) fn condition_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Condition,
            message,
        )
    }

    /// Construct a malformed persisted-fragment error naming the offending field.
    pub(crate) fn malformed_plan(origin: ErrorOrigin, field: &str, message: impl fmt::Display) -> Self {
        Self::new(
            ErrorClass::MalformedPlan,
            origin,
            format!("malformed plan: attribute '{field}' {message}"),
        )
    }

    /// Construct a data-source-not-found error.
    pub(crate) fn not_found(origin: ErrorOrigin, kind: &str, name: impl fmt::Display) -> Self {
        Self::new(
            ErrorClass::NotFound,
            origin,
            format!("data source not found: {kind} '{name}'"),
        )
    }

    /// Construct a resource-accounting rejection.
    pub(crate) fn resource_exhausted(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::ResourceExhausted, origin, message)
    }

    /// Construct an author-facing query error with its stable code.
    pub(crate) fn query(origin: ErrorOrigin, err: QueryError) -> Self {
        Self {
            class: ErrorClass::Query,
            origin,
            message: err.to_string(),
            detail: Some(ErrorDetail::Query(err)),
        }
    }

    /// Stable machine-readable code for author-facing query errors.
    #[must_use]
    pub const fn query_code(&self) -> Option<&'static str> {
        match &self.detail {
            Some(ErrorDetail::Query(err)) => Some(err.code()),
            None => None,
        }
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

impl From<SerializeError> for InternalError {
    fn from(err: SerializeError) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Serialize, err.to_string())
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Query(QueryError),
}

///
/// QueryError
///
/// Errors surfaced to the query author. Each variant carries a stable code
/// that clients may match on.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum QueryError {
    #[error("attribute parser failed: '{input}'")]
    AttributeParserFailed { input: String },

    #[error("could not use index hint to serve query: {hint}")]
    ForcedIndexHintUnusable { hint: String },
}

impl QueryError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::AttributeParserFailed { .. } => "ATTRIBUTE_PARSER_FAILED",
            Self::ForcedIndexHintUnusable { .. } => "FORCED_INDEX_HINT_UNUSABLE",
        }
    }
}

///
/// ErrorClass
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[remain::sorted]
pub enum ErrorClass {
    Internal,
    InvariantViolation,
    MalformedPlan,
    NotFound,
    Query,
    ResourceExhausted,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Internal => "internal",
            Self::InvariantViolation => "invariant_violation",
            Self::MalformedPlan => "malformed_plan",
            Self::NotFound => "not_found",
            Self::Query => "query",
            Self::ResourceExhausted => "resource_exhausted",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[remain::sorted]
pub enum ErrorOrigin {
    Condition,
    Config,
    Index,
    Join,
    Path,
    Plan,
    Serialize,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Condition => "condition",
            Self::Config => "config",
            Self::Index => "index",
            Self::Join => "join",
            Self::Path => "path",
            Self::Plan => "plan",
            Self::Serialize => "serialize",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///
