//! Ninja build-file emission.
//!
//! This module converts a collected [`BuildGraph`] into the textual form
//! consumed by Ninja: rule blocks first, then one build statement per
//! target. Iteration order comes straight from the collector, so output is
//! deterministic for a given root order.
//!
//! Values are written verbatim — no escaping or quoting is applied to
//! commands, variable values, or dependency names. Callers are responsible
//! for producing strings that are well formed for Ninja's syntax; paths
//! containing spaces in particular are the caller's problem.

use std::fmt::{self, Display, Formatter, Write as _};
use std::fs::File;
use std::io::{self, Write};

use camino::Utf8Path;

use crate::ir::{BuildEdge, BuildGraph, Rule};

macro_rules! write_kv {
    ($f:expr, $key:expr, $opt:expr) => {
        if let Some(val) = $opt {
            writeln!($f, "    {} = {}", $key, val)?;
        }
    };
}

/// Render a build graph as Ninja build-file text.
///
/// Rule blocks precede all build statements; the phony rule never gets a
/// block, but build statements referencing it are still emitted.
///
/// # Panics
///
/// Panics if writing to the output string fails, which cannot happen for
/// in-memory formatting.
#[must_use]
#[expect(
    clippy::expect_used,
    reason = "formatting into a String is infallible"
)]
pub fn generate(graph: &BuildGraph) -> String {
    let mut out = String::new();
    for rule in graph.rules().filter(|rule| !rule.is_phony()) {
        write!(out, "{}", RuleBlock { rule }).expect("write rule block");
    }
    for edge in graph.edges() {
        write!(out, "{}", BuildStatement { edge }).expect("write build statement");
    }
    out
}

/// Write the rendered build file to `writer`.
///
/// # Errors
///
/// Returns any I/O error raised by `writer`.
pub fn emit<W: Write>(writer: &mut W, graph: &BuildGraph) -> io::Result<()> {
    writer.write_all(generate(graph).as_bytes())
}

/// Write the rendered build file to `path`, creating or truncating it.
///
/// The file handle lives for the duration of this one call and is closed on
/// every path, success or failure.
///
/// # Errors
///
/// Returns any I/O error raised while creating or writing the file.
pub fn write_build_file(path: &Utf8Path, graph: &BuildGraph) -> io::Result<()> {
    let mut file = File::create(path)?;
    emit(&mut file, graph)?;
    file.flush()
}

/// Wrapper struct to display one rule block.
struct RuleBlock<'a> {
    rule: &'a Rule,
}

impl Display for RuleBlock<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "rule {}", self.rule.name)?;
        writeln!(f, "    command = {}", self.rule.command)?;
        write_kv!(f, "description", &self.rule.description);
        write_kv!(f, "depfile", &self.rule.depfile);
        writeln!(f)
    }
}

/// Wrapper struct to display one build statement.
struct BuildStatement<'a> {
    edge: &'a BuildEdge,
}

impl Display for BuildStatement<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let target = &self.edge.target;
        write!(f, "build {} : {}", target.name(), target.rule().name)?;
        if self.edge.dep_names.is_empty() {
            writeln!(f)?;
        } else {
            writeln!(f, " {}", self.edge.dep_names)?;
        }
        for (key, value) in target.vars().iter() {
            writeln!(f, "    {key} = {value}")?;
        }
        writeln!(f)
    }
}
