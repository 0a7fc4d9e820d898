//! Build graph intermediate representation.
//!
//! This module defines the value types making up the build graph — rules,
//! targets, variable bindings, and dependency edges — together with the
//! collector that flattens a target forest into the conflict-checked table
//! consumed by [`crate::ninja_gen`]. The types mirror the conceptual model of
//! Ninja without embedding any Ninja syntax.

mod collect;
mod graph;

pub use collect::{BuildEdge, BuildGraph, CollectError};
pub use graph::{Dep, Rule, Target, VarList};
