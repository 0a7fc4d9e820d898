//! Build graph value types.
//!
//! A [`Rule`] describes how a class of outputs is produced, a [`Target`] is
//! one concrete build step referencing a rule, and [`Dep`] is a single slot
//! in a target's ordered dependency list. All types are immutable once
//! constructed; targets are shared between graph nodes via `Arc`, and the
//! collector treats `Arc` pointer identity as target identity.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use camino::Utf8PathBuf;

/// Name of the distinguished no-op rule.
pub(crate) const PHONY_RULE_NAME: &str = "phony";

/// A named, reusable command template shared by build targets.
///
/// Rules compare by value: two rules are the same rule iff every field is
/// equal. The collector rejects two differently-configured rules sharing a
/// name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rule {
    /// Identifier referenced by build statements.
    pub name: String,
    /// Command template with `$in`, `$out`, and variable placeholders.
    pub command: String,
    /// Optional progress line shown by Ninja while the rule runs.
    pub description: Option<String>,
    /// Optional dependency-file path template (e.g. `$out.d`).
    pub depfile: Option<String>,
}

impl Rule {
    /// Create a rule with the given name and command template.
    #[must_use]
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            description: None,
            depfile: None,
        }
    }

    /// Attach a progress description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach a dependency-file declaration.
    #[must_use]
    pub fn with_depfile(mut self, depfile: impl Into<String>) -> Self {
        self.depfile = Some(depfile.into());
        self
    }

    /// The no-op rule used to aggregate dependencies under a named target.
    ///
    /// Build statements referencing it are emitted, but the rule itself never
    /// gets a rule block.
    #[must_use]
    pub fn phony() -> Self {
        Self::new(PHONY_RULE_NAME, "")
    }

    /// True when the rule performs no work and is omitted from rule blocks.
    #[must_use]
    pub fn is_phony(&self) -> bool {
        self.command.is_empty()
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Ordered `key = value` bindings attached to one target.
///
/// Insertion order is preserved so emitted output is deterministic. Keys are
/// not deduplicated by the type itself; [`VarList::get`] returns the first
/// match and callers are expected to keep keys unique per target.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct VarList(Vec<(String, String)>);

impl VarList {
    /// Create an empty variable list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a binding, builder style.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    /// Append a binding.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Value of the first binding for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no bindings are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VarList {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One slot in a target's ordered dependency list.
#[derive(Clone, Debug)]
pub enum Dep {
    /// Another node of the build graph.
    Target(Arc<Target>),
    /// An opaque leaf path outside the graph, typically a source file.
    Leaf(Utf8PathBuf),
}

impl Dep {
    /// The name this dependency contributes to a build statement.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Target(target) => target.name(),
            Self::Leaf(path) => path.as_str(),
        }
    }
}

impl From<Arc<Target>> for Dep {
    fn from(target: Arc<Target>) -> Self {
        Self::Target(target)
    }
}

impl From<&Arc<Target>> for Dep {
    fn from(target: &Arc<Target>) -> Self {
        Self::Target(Arc::clone(target))
    }
}

impl From<Utf8PathBuf> for Dep {
    fn from(path: Utf8PathBuf) -> Self {
        Self::Leaf(path)
    }
}

impl From<&str> for Dep {
    fn from(path: &str) -> Self {
        Self::Leaf(Utf8PathBuf::from(path))
    }
}

impl From<String> for Dep {
    fn from(path: String) -> Self {
        Self::Leaf(Utf8PathBuf::from(path))
    }
}

/// One concrete build step: a named output, the rule producing it, ordered
/// dependencies, and variable bindings.
///
/// The name doubles as the output path and must be unique within one
/// collected graph. Dependency order is preserved through emission because it
/// can carry meaning for the consuming tool (link order, for instance).
#[derive(Debug)]
pub struct Target {
    name: String,
    rule: Arc<Rule>,
    deps: Vec<Dep>,
    vars: VarList,
}

impl Target {
    /// Create a target with no dependencies and no variables.
    #[must_use]
    pub fn new(name: impl Into<String>, rule: Arc<Rule>) -> Self {
        Self {
            name: name.into(),
            rule,
            deps: Vec::new(),
            vars: VarList::new(),
        }
    }

    /// Replace the dependency list, builder style.
    #[must_use]
    pub fn with_deps(mut self, deps: impl IntoIterator<Item = Dep>) -> Self {
        self.deps = deps.into_iter().collect();
        self
    }

    /// Replace the variable bindings, builder style.
    #[must_use]
    pub fn with_vars(mut self, vars: VarList) -> Self {
        self.vars = vars;
        self
    }

    /// Output name of this target.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The rule producing this target.
    #[must_use]
    pub fn rule(&self) -> &Arc<Rule> {
        &self.rule
    }

    /// Ordered dependency slots.
    #[must_use]
    pub fn deps(&self) -> &[Dep] {
        &self.deps
    }

    /// Variable bindings emitted with this target's build statement.
    #[must_use]
    pub fn vars(&self) -> &VarList {
        &self.vars
    }

    /// True when this target uses the no-op rule.
    #[must_use]
    pub fn is_phony(&self) -> bool {
        self.rule.is_phony()
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn rules_compare_by_value() {
        let a = Rule::new("cc", "gcc -c $in -o $out").with_depfile("$out.d");
        let b = Rule::new("cc", "gcc -c $in -o $out").with_depfile("$out.d");
        let c = Rule::new("cc", "clang -c $in -o $out");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[rstest]
    fn phony_rule_has_empty_command() {
        let phony = Rule::phony();
        assert_eq!(phony.name, "phony");
        assert!(phony.is_phony());
        assert!(!Rule::new("cc", "gcc").is_phony());
    }

    #[rstest]
    fn var_list_preserves_insertion_order() {
        let vars: VarList = [("b", "2"), ("a", "1"), ("c", "3")]
            .into_iter()
            .collect();
        let keys: Vec<_> = vars.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[rstest]
    fn var_list_get_returns_first_match() {
        let vars = VarList::new().with("k", "first").with("k", "second");
        assert_eq!(vars.get("k"), Some("first"));
        assert_eq!(vars.get("missing"), None);
    }

    #[rstest]
    fn target_displays_as_its_name() {
        let rule = Arc::new(Rule::new("ld", "gcc -o $out $in"));
        let target = Target::new("bin/app", rule);
        assert_eq!(target.to_string(), "bin/app");
    }

    #[rstest]
    fn dep_name_covers_both_variants() {
        let rule = Arc::new(Rule::phony());
        let target = Arc::new(Target::new("check", rule));
        assert_eq!(Dep::from(&target).name(), "check");
        assert_eq!(Dep::from("src/main.c").name(), "src/main.c");
    }

    #[rstest]
    fn phony_target_predicate_follows_rule() {
        let check = Target::new("check", Arc::new(Rule::phony()));
        assert!(check.is_phony());
        let obj = Target::new("a.o", Arc::new(Rule::new("cc", "gcc")));
        assert!(!obj.is_phony());
    }
}
