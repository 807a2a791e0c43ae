//! Common definitions that are shared between different parts of the compiler.

// Use sorted sets and maps for consistent output
pub use std::collections::{BTreeMap as Map, BTreeSet as Set};

pub mod error;

/// Identifiers.
pub type Id = internment::Intern<String>;

/// Source line number, as reported by the external frontend on every AST node.
pub type Line = u32;
