//! Deduplicating build-graph collection.
//!
//! [`BuildGraph::collect`] flattens a forest of [`Target`]s — possibly with
//! diamond-shaped sharing — into the table consumed by the emitter: the
//! ordered set of distinct rules and a `name -> (target, dep names)` map.
//! The walk is depth-first, postorder, and memoized by target name, so a
//! subgraph reachable through several parents is visited exactly once.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use thiserror::Error;

use super::graph::{Dep, Rule, Target};

/// Errors raised while flattening a target graph.
///
/// All collection errors are fatal: a build description either collects
/// fully or not at all, and no error is downgraded to a warning.
#[derive(Debug, Error)]
pub enum CollectError {
    /// Two distinct target objects claim the same output name.
    #[error(
        "duplicate target name with differing definition: {name} \
         (rules {} and {})",
        first.rule().name,
        second.rule().name
    )]
    DuplicateName {
        /// The contested output name.
        name: String,
        /// The definition recorded first.
        first: Arc<Target>,
        /// The conflicting definition encountered later.
        second: Arc<Target>,
    },

    /// Two rules with different fields share a name.
    #[error("conflicting definitions for rule: {name}")]
    DuplicateRule {
        /// The contested rule name.
        name: String,
        /// The definition recorded first.
        first: Arc<Rule>,
        /// The conflicting definition encountered later.
        second: Arc<Rule>,
    },

    /// A target depends on itself, directly or transitively.
    #[error("dependency cycle detected: {}", cycle.iter().join(" -> "))]
    CircularDependency {
        /// Target names along the cycle, first repeated last.
        cycle: Vec<String>,
    },
}

/// A build statement recorded for one target.
#[derive(Debug)]
pub struct BuildEdge {
    /// The target the statement describes.
    pub target: Arc<Target>,
    /// Space-joined immediate dependency names, order preserving and
    /// deduplicated within this target.
    pub dep_names: String,
}

/// Flattened, conflict-checked emission table for a target forest.
///
/// Iteration order of both [`BuildGraph::rules`] and [`BuildGraph::edges`] is
/// a pure function of the root order and each target's dependency order, so
/// repeated collections over the same roots emit byte-identical output.
#[derive(Debug, Default)]
pub struct BuildGraph {
    rules: IndexSet<Arc<Rule>>,
    targets: IndexMap<String, BuildEdge>,
}

impl BuildGraph {
    /// Collect the transitive graph reachable from `roots`.
    ///
    /// Roots are visited in the given order; each target's dependencies are
    /// visited depth first and the target itself is recorded after them.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::DuplicateName`] when two distinct targets
    /// collide on a name, [`CollectError::DuplicateRule`] when two rules with
    /// different fields share a name, and
    /// [`CollectError::CircularDependency`] when a target is reachable from
    /// itself.
    pub fn collect<'a, I>(roots: I) -> Result<Self, CollectError>
    where
        I: IntoIterator<Item = &'a Arc<Target>>,
    {
        let mut collector = Collector::default();
        for root in roots {
            collector.visit(root)?;
        }
        Ok(collector.graph)
    }

    /// Distinct rules in first-visit order, the phony rule included.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().map(AsRef::as_ref)
    }

    /// Recorded build statements in collection (postorder) order.
    pub fn edges(&self) -> impl Iterator<Item = &BuildEdge> {
        self.targets.values()
    }

    /// Build statement recorded for `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BuildEdge> {
        self.targets.get(name)
    }

    /// Number of recorded build statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// True when no targets were collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Walk state for one collection run.
#[derive(Default)]
struct Collector {
    graph: BuildGraph,
    rules_by_name: HashMap<String, Arc<Rule>>,
    in_progress: Vec<(String, Arc<Target>)>,
}

impl Collector {
    fn visit(&mut self, target: &Arc<Target>) -> Result<(), CollectError> {
        // Whole-graph memoization: a recorded name is revisited only when it
        // refers to the very same object.
        if let Some(edge) = self.graph.targets.get(target.name()) {
            if Arc::ptr_eq(&edge.target, target) {
                return Ok(());
            }
            return Err(CollectError::DuplicateName {
                name: target.name().to_owned(),
                first: Arc::clone(&edge.target),
                second: Arc::clone(target),
            });
        }

        if let Some(pos) = self
            .in_progress
            .iter()
            .position(|(name, _)| name == target.name())
        {
            if let Some((_, open)) = self.in_progress.get(pos) {
                if !Arc::ptr_eq(open, target) {
                    return Err(CollectError::DuplicateName {
                        name: target.name().to_owned(),
                        first: Arc::clone(open),
                        second: Arc::clone(target),
                    });
                }
            }
            let mut cycle: Vec<String> = self
                .in_progress
                .iter()
                .skip(pos)
                .map(|(name, _)| name.clone())
                .collect();
            cycle.push(target.name().to_owned());
            return Err(CollectError::CircularDependency { cycle });
        }

        tracing::debug!(name = %target.name(), rule = %target.rule().name, "collect target");
        self.add_rule(target.rule())?;
        self.in_progress
            .push((target.name().to_owned(), Arc::clone(target)));

        // Local per-target dedup: the same dependency may appear both
        // directly and through another slot of this list.
        let mut dep_names: IndexSet<String> = IndexSet::new();
        for dep in target.deps() {
            if let Dep::Target(sub) = dep {
                self.visit(sub)?;
            }
            dep_names.insert(dep.name().to_owned());
        }

        self.in_progress.pop();
        self.graph.targets.insert(
            target.name().to_owned(),
            BuildEdge {
                target: Arc::clone(target),
                dep_names: dep_names.iter().join(" "),
            },
        );
        Ok(())
    }

    fn add_rule(&mut self, rule: &Arc<Rule>) -> Result<(), CollectError> {
        if let Some(existing) = self.rules_by_name.get(&rule.name) {
            if existing.as_ref() != rule.as_ref() {
                return Err(CollectError::DuplicateRule {
                    name: rule.name.clone(),
                    first: Arc::clone(existing),
                    second: Arc::clone(rule),
                });
            }
        } else {
            self.rules_by_name
                .insert(rule.name.clone(), Arc::clone(rule));
        }
        self.graph.rules.insert(Arc::clone(rule));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "tests use expect for ease of debugging")]

    use super::*;
    use crate::ir::VarList;
    use rstest::rstest;

    fn rule(name: &str) -> Arc<Rule> {
        Arc::new(Rule::new(name, format!("{name} $in $out")))
    }

    fn leaf_target(name: &str, rule: &Arc<Rule>) -> Arc<Target> {
        Arc::new(Target::new(name, Arc::clone(rule)))
    }

    #[rstest]
    fn diamond_graph_visits_shared_node_once() {
        let cc = rule("cc");
        let d = leaf_target("d", &cc);
        let b = Arc::new(Target::new("b", Arc::clone(&cc)).with_deps([Dep::from(&d)]));
        let c = Arc::new(Target::new("c", Arc::clone(&cc)).with_deps([Dep::from(&d)]));
        let a = Arc::new(
            Target::new("a", Arc::clone(&cc)).with_deps([Dep::from(&b), Dep::from(&c)]),
        );

        let graph = BuildGraph::collect([&a]).expect("collect diamond");

        assert_eq!(graph.len(), 4);
        assert_eq!(graph.get("a").expect("a").dep_names, "b c");
        assert_eq!(graph.get("b").expect("b").dep_names, "d");
        assert_eq!(graph.get("c").expect("c").dep_names, "d");
        assert_eq!(graph.rules().count(), 1);
    }

    #[rstest]
    fn local_duplicate_dependency_emits_one_name() {
        let cc = rule("cc");
        let d = leaf_target("d", &cc);
        let a = Arc::new(
            Target::new("a", Arc::clone(&cc)).with_deps([Dep::from(&d), Dep::from(&d)]),
        );

        let graph = BuildGraph::collect([&a]).expect("collect");
        assert_eq!(graph.get("a").expect("a").dep_names, "d");
    }

    #[rstest]
    fn leaf_paths_are_listed_without_recursion() {
        let cc = rule("cc");
        let obj = Arc::new(
            Target::new("obj/main.c.o", Arc::clone(&cc))
                .with_deps([Dep::from("src/main.c"), Dep::from("src/main.h")]),
        );

        let graph = BuildGraph::collect([&obj]).expect("collect");
        assert_eq!(graph.len(), 1);
        assert_eq!(
            graph.get("obj/main.c.o").expect("obj").dep_names,
            "src/main.c src/main.h"
        );
    }

    #[rstest]
    fn distinct_targets_with_same_name_conflict() {
        let cc = rule("cc");
        let first = leaf_target("out/x.o", &cc);
        let second = leaf_target("out/x.o", &cc);

        let err = BuildGraph::collect([&first, &second]).expect_err("conflict");
        assert!(matches!(
            err,
            CollectError::DuplicateName { ref name, .. } if name == "out/x.o"
        ));
    }

    #[rstest]
    fn same_object_referenced_twice_is_accepted() {
        let cc = rule("cc");
        let shared = leaf_target("out/x.o", &cc);

        let graph = BuildGraph::collect([&shared, &shared]).expect("no conflict");
        assert_eq!(graph.len(), 1);
    }

    #[rstest]
    fn ancestor_name_clash_is_reported_as_duplicate() {
        let cc = rule("cc");
        let inner = leaf_target("x", &cc);
        let outer = Arc::new(Target::new("x", Arc::clone(&cc)).with_deps([Dep::from(&inner)]));

        let err = BuildGraph::collect([&outer]).expect_err("ancestor clash");
        assert!(matches!(
            err,
            CollectError::DuplicateName { ref name, .. } if name == "x"
        ));
    }

    #[rstest]
    fn conflicting_rule_definitions_are_rejected() {
        let gcc = Arc::new(Rule::new("cc", "gcc -c $in -o $out"));
        let clang = Arc::new(Rule::new("cc", "clang -c $in -o $out"));
        let a = leaf_target("a.o", &gcc);
        let b = leaf_target("b.o", &clang);

        let err = BuildGraph::collect([&a, &b]).expect_err("rule clash");
        assert!(matches!(
            err,
            CollectError::DuplicateRule { ref name, .. } if name == "cc"
        ));
    }

    #[rstest]
    fn equal_rule_values_deduplicate() {
        let first = Arc::new(Rule::new("cc", "gcc -c $in -o $out"));
        let second = Arc::new(Rule::new("cc", "gcc -c $in -o $out"));
        let a = leaf_target("a.o", &first);
        let b = leaf_target("b.o", &second);

        let graph = BuildGraph::collect([&a, &b]).expect("collect");
        assert_eq!(graph.rules().count(), 1);
    }

    #[rstest]
    fn statements_are_recorded_in_postorder() {
        let cc = rule("cc");
        let ld = rule("ld");
        let obj = leaf_target("obj/main.c.o", &cc);
        let app = Arc::new(Target::new("app", Arc::clone(&ld)).with_deps([Dep::from(&obj)]));

        let graph = BuildGraph::collect([&app]).expect("collect");
        let names: Vec<_> = graph.edges().map(|e| e.target.name()).collect();
        assert_eq!(names, ["obj/main.c.o", "app"]);

        // Rules are recorded in first-visit order: the root's rule first.
        let rules: Vec<_> = graph.rules().map(|r| r.name.as_str()).collect();
        assert_eq!(rules, ["ld", "cc"]);
    }

    #[rstest]
    fn variables_survive_collection() {
        let cc = rule("cc");
        let obj = Arc::new(
            Target::new("obj/a.o", Arc::clone(&cc))
                .with_vars(VarList::new().with("incdirs", "-I include")),
        );

        let graph = BuildGraph::collect([&obj]).expect("collect");
        let edge = graph.get("obj/a.o").expect("edge");
        assert_eq!(edge.target.vars().get("incdirs"), Some("-I include"));
    }
}
