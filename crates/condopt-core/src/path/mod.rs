//! Module: path
//! Responsibility: attribute paths (`a.b[*].c`) as ordered component lists.
//! Does not own: expression nodes; `ast` converts access chains into paths.

mod parse;

#[cfg(test)]
mod tests;

use crate::{
    error::{ErrorOrigin, InternalError},
    resource::ResourceMonitor,
};
use condopt_utils::hash::StableHasher;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    hash::{Hash, Hasher},
    mem::size_of,
};

///
/// PathComponent
///
/// One attribute name. `expand` marks a component followed by `[*]`.
///

#[derive(Clone, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PathComponent {
    pub name: String,
    pub expand: bool,
}

impl PathComponent {
    #[must_use]
    pub fn new(name: impl Into<String>, expand: bool) -> Self {
        Self {
            name: name.into(),
            expand,
        }
    }

    #[must_use]
    pub fn plain(name: impl Into<String>) -> Self {
        Self::new(name, false)
    }
}

///
/// AttributeKind
///
/// Fast-path accessor classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AttributeKind {
    Id,
    Key,
    From,
    To,
    SingleAttribute,
    MultiAttribute,
}

///
/// AttributePath
///

#[derive(Clone, Debug, Default, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct AttributePath {
    components: Vec<PathComponent>,
}

impl AttributePath {
    /// Build an untracked path. Used for transient paths derived from nodes.
    #[must_use]
    pub const fn from_components(components: Vec<PathComponent>) -> Self {
        Self { components }
    }

    /// Build a path whose allocation is charged to `monitor`.
    pub fn try_new(
        components: Vec<PathComponent>,
        monitor: &ResourceMonitor,
    ) -> Result<Self, InternalError> {
        let path = Self { components };
        path.charge(monitor)?;

        Ok(path)
    }

    /// Charge this path's footprint to `monitor`.
    pub fn charge(&self, monitor: &ResourceMonitor) -> Result<(), InternalError> {
        monitor.increase(ErrorOrigin::Path, self.memory_usage())
    }

    /// Single-component path.
    #[must_use]
    pub fn from_name(name: impl Into<String>) -> Self {
        Self::from_components(vec![PathComponent::plain(name)])
    }

    /// Path of plain (non-expanded) components.
    #[must_use]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_components(names.into_iter().map(PathComponent::plain).collect())
    }

    /// Parse the textual `a.b[*].c` syntax.
    pub fn parse(input: &str) -> Result<Self, InternalError> {
        parse::parse(input)
    }

    #[must_use]
    pub fn components(&self) -> &[PathComponent] {
        &self.components
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    #[must_use]
    pub fn has_expansion(&self) -> bool {
        self.components.iter().any(|c| c.expand)
    }

    /// Classify the path. The path must not be empty.
    #[must_use]
    pub fn kind(&self) -> AttributeKind {
        assert!(!self.is_empty(), "cannot classify an empty attribute path");

        if self.components.len() > 1 {
            return AttributeKind::MultiAttribute;
        }

        match self.components[0].name.as_str() {
            "_id" => AttributeKind::Id,
            "_key" => AttributeKind::Key,
            "_from" => AttributeKind::From,
            "_to" => AttributeKind::To,
            _ => AttributeKind::SingleAttribute,
        }
    }

    /// Deterministic 64-bit hash over all components in order.
    #[must_use]
    pub fn hash_value(&self) -> u64 {
        let mut hasher = StableHasher::new();
        for component in &self.components {
            hasher.write_str(&component.name);
            hasher.write_bool(component.expand);
        }

        hasher.finish()
    }

    /// True iff `self` is a component-wise prefix of `other` (or equal to it).
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.components.starts_with(&self.components)
    }

    /// Number of leading components `a` and `b` share.
    #[must_use]
    pub fn common_prefix_length(a: &Self, b: &Self) -> usize {
        a.components
            .iter()
            .zip(&b.components)
            .take_while(|(left, right)| left == right)
            .count()
    }

    /// Truncate to at most `len` components.
    pub fn shorten_to(&mut self, len: usize) {
        self.components.truncate(len);
    }

    pub fn reverse(&mut self) {
        self.components.reverse();
    }

    pub fn push(&mut self, component: PathComponent) {
        self.components.push(component);
    }

    /// Copy of this path with every expansion marker cleared.
    #[must_use]
    pub fn without_expansion(&self) -> Self {
        Self::from_components(
            self.components
                .iter()
                .map(|c| PathComponent::plain(c.name.clone()))
                .collect(),
        )
    }

    /// Render the textual form, optionally dropping `[*]` markers.
    #[must_use]
    pub fn to_string_with(&self, exclude_expansion: bool) -> String {
        let mut out = String::new();
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push_str(&component.name);
            if component.expand && !exclude_expansion {
                out.push_str("[*]");
            }
        }

        out
    }

    /// Approximate heap footprint charged to a resource monitor.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        self.components
            .iter()
            .map(|c| size_of::<PathComponent>() + c.name.len())
            .sum()
    }
}

impl Hash for AttributePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_value());
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_with(false))
    }
}
