//! Small, dependency-light helpers shared across the condopt workspace.

pub mod hash;
