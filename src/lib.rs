//! Kumiko core library.
//!
//! Kumiko turns a typed description of compilation units (sources,
//! components, executables) into a Ninja build file. The crate provides the
//! build-graph value types, the deduplicating graph collector, the
//! type-keyed toolchain dispatch, and the textual Ninja emitter; running the
//! build is left to Ninja itself.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use kumiko::ir::{BuildGraph, Dep, Rule, Target};
//! use kumiko::ninja_gen;
//!
//! # fn main() -> Result<(), kumiko::ir::CollectError> {
//! let cc = Arc::new(Rule::new("cc", "gcc -c $in -o $out"));
//! let obj = Arc::new(
//!     Target::new("obj/main.c.o", Arc::clone(&cc)).with_deps([Dep::from("main.c")]),
//! );
//! let graph = BuildGraph::collect([&obj])?;
//! let text = ninja_gen::generate(&graph);
//! assert!(text.starts_with("rule cc\n"));
//! # Ok(()) }
//! ```

pub mod codebase;
pub mod ir;
pub mod ninja_gen;
pub mod toolchain;
