//! clang-tidy check toolchain.
//!
//! Produces a check graph over the same codebase description the build
//! toolchain consumes: each [`Source`] gets a `ctidy/<path>.log` target
//! running clang-tidy, and components, executables, and static libraries get
//! `.lock` aggregation targets that are touched once every contained check
//! has run.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::codebase::c::{Component, Executable, Source, StaticLib};
use crate::ir::{Dep, Rule, Target, VarList};

use super::gcc::{define_flags, exported_incdirs, incdir_flags, scope_to_component, source_paths};
use super::{ProcessorOutput, Toolchain, ToolchainError};

/// clang-tidy based check toolchain.
pub struct ClangTidyToolchain {
    rule_ctidy: Arc<Rule>,
    rule_touch: Arc<Rule>,
    logs: RefCell<HashMap<Source, Arc<Target>>>,
    locks: RefCell<HashMap<Component, Arc<Target>>>,
}

impl ClangTidyToolchain {
    /// Create a toolchain with the default check set (`*,-llvm*`, everything
    /// treated as an error).
    #[must_use]
    pub fn new() -> Self {
        Self::with_checks(&["*", "-llvm*"], &["*"])
    }

    /// Create a toolchain with explicit enabled-check and error-check lists.
    /// Order is preserved, as clang-tidy applies the entries in sequence.
    #[must_use]
    pub fn with_checks(checks: &[&str], errors: &[&str]) -> Self {
        let checks = checks.join(",");
        let errors = errors.join(",");
        let rule_ctidy = Arc::new(
            Rule::new(
                "ctidy",
                format!(
                    "clang-tidy --quiet --header-filter=. --checks={checks} \
                     --warnings-as-errors={errors} $in -- $incdirs $defines > $out || true"
                ),
            )
            .with_description("Checking $in..."),
        );
        let rule_touch = Arc::new(
            Rule::new("touch_after", "touch $out").with_description("Touching $out..."),
        );
        Self {
            rule_ctidy,
            rule_touch,
            logs: RefCell::new(HashMap::new()),
            locks: RefCell::new(HashMap::new()),
        }
    }

    /// Register this toolchain's processors on `tools`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::DuplicateRegistration`] when another
    /// toolchain already claimed one of the node types.
    pub fn install(self, tools: &mut Toolchain) -> Result<(), ToolchainError> {
        let this = Rc::new(self);
        let sources = Rc::clone(&this);
        tools.register::<Source, _>(move |tc, src| sources.process_source(tc, src))?;
        let components = Rc::clone(&this);
        tools.register::<Component, _>(move |tc, comp| components.process_component(tc, comp))?;
        let executables = Rc::clone(&this);
        tools.register::<Executable, _>(move |tc, exe| {
            executables.process_bin_like(tc, "ctidy-binlib", &exe.name, &exe.srcs, &exe.components)
        })?;
        tools.register::<StaticLib, _>(move |tc, lib| {
            this.process_bin_like(tc, "ctidy-binlib", &lib.name, &lib.srcs, &lib.components)
        })?;
        Ok(())
    }

    fn process_source(&self, tools: &Toolchain, src: &Source) -> ProcessorOutput {
        let cached = self.logs.borrow().get(src).cloned();
        if let Some(target) = cached {
            return Ok(vec![target]);
        }
        tracing::info!(path = %src.path, "add check for C source");

        let (abs, slot) = source_paths(tools.root_dir(), &src.path);
        let vars = VarList::new()
            .with("incdirs", incdir_flags(tools.root_dir(), &abs, src))
            .with("defines", define_flags(&src.defines));
        let target = Arc::new(
            Target::new(format!("ctidy/{slot}.log"), Arc::clone(&self.rule_ctidy))
                .with_deps([Dep::from(abs)])
                .with_vars(vars),
        );
        self.logs
            .borrow_mut()
            .insert(src.clone(), Arc::clone(&target));
        Ok(vec![target])
    }

    fn process_component(&self, tools: &Toolchain, comp: &Component) -> ProcessorOutput {
        let cached = self.locks.borrow().get(comp).cloned();
        if let Some(lock) = cached {
            return Ok(vec![lock]);
        }
        tracing::info!(component = %comp.name, path = %comp.path, "add check for C component");

        let mut produced = Vec::new();
        let dep_incdirs = exported_incdirs(&comp.deps);
        for sub in &comp.deps {
            produced.extend(tools.process::<Component>(sub)?);
        }

        let mut checks = Vec::new();
        for src in &comp.srcs {
            let scoped = scope_to_component(comp, &dep_incdirs, src);
            let targets = tools.process::<Source>(&scoped)?;
            checks.extend(targets.iter().map(Dep::from));
        }

        let lock = Arc::new(
            Target::new(
                format!("ctidy-component/{}/{}.lock", comp.path, comp.name),
                Arc::clone(&self.rule_touch),
            )
            .with_deps(checks),
        );
        self.locks
            .borrow_mut()
            .insert(comp.clone(), Arc::clone(&lock));

        produced.push(lock);
        Ok(produced)
    }

    fn process_bin_like(
        &self,
        tools: &Toolchain,
        kind: &str,
        name: &str,
        srcs: &[Source],
        components: &[Arc<Component>],
    ) -> ProcessorOutput {
        tracing::info!(output = name, "add check for C executable/static lib");

        let mut produced = Vec::new();
        for src in srcs {
            produced.extend(tools.process::<Source>(src)?);
        }
        for comp in components {
            produced.extend(tools.process::<Component>(comp.as_ref())?);
        }

        let deps: Vec<Dep> = produced.iter().map(Dep::from).collect();
        let lock = Arc::new(
            Target::new(format!("{kind}/{name}.lock"), Arc::clone(&self.rule_touch))
                .with_deps(deps),
        );
        Ok(vec![lock])
    }
}

impl Default for ClangTidyToolchain {
    fn default() -> Self {
        Self::new()
    }
}
