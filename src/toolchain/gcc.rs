//! GCC toolchain.
//!
//! Translates the C codebase description into compile, archive, and link
//! targets: a [`Source`] becomes an object file under `obj/`, a
//! [`Component`] becomes a static library under `component/` built from its
//! compiled sources, and an [`Executable`] or [`StaticLib`] becomes the
//! final linked or archived output.
//!
//! Processing memoizes by node value, so a component shared between several
//! parents maps to one target identity and collects cleanly.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use itertools::Itertools;

use crate::codebase::c::{Component, Define, Executable, Source, StaticLib};
use crate::ir::{Dep, Rule, Target, VarList};

use super::{ProcessorOutput, Toolchain, ToolchainError};

/// Configuration for [`GccToolchain`].
#[derive(Clone, Debug, Default)]
pub struct GccConfig {
    /// Cross-compilation variant, e.g. `arm-none-eabi`; prefixes the tool
    /// names and the rule names.
    pub variant: Option<String>,
    /// Directory holding the compiler binaries, prepended when the tools are
    /// not on `PATH`.
    pub path: Option<Utf8PathBuf>,
    /// Extra compiler flags inserted into every compile command.
    pub cflags: Vec<String>,
}

/// GCC-based build toolchain.
pub struct GccToolchain {
    rule_cc: Arc<Rule>,
    rule_lib: Arc<Rule>,
    rule_ld: Arc<Rule>,
    objects: RefCell<HashMap<Source, Arc<Target>>>,
    libs: RefCell<HashMap<Component, Arc<Target>>>,
}

impl GccToolchain {
    /// Create a toolchain from `config`.
    #[must_use]
    pub fn new(config: GccConfig) -> Self {
        let mut prefix = String::new();
        if let Some(path) = &config.path {
            prefix.push_str(path.as_str());
            prefix.push('/');
        }
        if let Some(variant) = &config.variant {
            prefix.push_str(variant);
            prefix.push('-');
        }
        let tool = config.variant.as_deref().unwrap_or("gcc");

        let mut compile = vec![
            format!("{prefix}gcc"),
            "-fdiagnostics-color=always -MMD -MF $out.d".to_owned(),
        ];
        if !config.cflags.is_empty() {
            compile.push(config.cflags.join(" "));
        }
        compile.push("$incdirs $defines -c $in -o $out".to_owned());

        let rule_cc = Arc::new(
            Rule::new(format!("cc-{tool}"), compile.join(" "))
                .with_description("Building $in...")
                .with_depfile("$out.d"),
        );
        let rule_lib = Arc::new(
            Rule::new(format!("lib-{tool}"), "ar rcs $out $in")
                .with_description("Creating static lib $out"),
        );
        let rule_ld = Arc::new(
            Rule::new(format!("ld-{tool}"), format!("{prefix}gcc -o $out $in"))
                .with_description("Linking $out"),
        );

        Self {
            rule_cc,
            rule_lib,
            rule_ld,
            objects: RefCell::new(HashMap::new()),
            libs: RefCell::new(HashMap::new()),
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
            executables.process_link(tc, &exe.name, &exe.srcs, &exe.components, false)
        })?;
        tools.register::<StaticLib, _>(move |tc, lib| {
            this.process_link(tc, &lib.name, &lib.srcs, &lib.components, true)
        })?;
        Ok(())
    }

    fn process_source(&self, tools: &Toolchain, src: &Source) -> ProcessorOutput {
        let cached = self.objects.borrow().get(src).cloned();
        if let Some(target) = cached {
            return Ok(vec![target]);
        }
        tracing::info!(path = %src.path, lang = ?src.lang, "add C source");

        let (abs, slot) = source_paths(tools.root_dir(), &src.path);
        let vars = VarList::new()
            .with("incdirs", incdir_flags(tools.root_dir(), &abs, src))
            .with("defines", define_flags(&src.defines));
        let target = Arc::new(
            Target::new(format!("obj/{slot}.o"), Arc::clone(&self.rule_cc))
                .with_deps([Dep::from(abs)])
                .with_vars(vars),
        );
        self.objects
            .borrow_mut()
            .insert(src.clone(), Arc::clone(&target));
        Ok(vec![target])
    }

    fn process_component(&self, tools: &Toolchain, comp: &Component) -> ProcessorOutput {
        let cached = self.libs.borrow().get(comp).cloned();
        if let Some(lib) = cached {
            return Ok(vec![lib]);
        }
        tracing::info!(component = %comp.name, path = %comp.path, "add component");

        let mut produced = Vec::new();
        let dep_incdirs = exported_incdirs(&comp.deps);
        for sub in &comp.deps {
            produced.extend(tools.process::<Component>(sub)?);
        }

        let mut objects = Vec::new();
        for src in &comp.srcs {
            let scoped = scope_to_component(comp, &dep_incdirs, src);
            let targets = tools.process::<Source>(&scoped)?;
            objects.extend(targets.iter().map(Dep::from));
        }

        let lib = Arc::new(
            Target::new(
                format!("component/{}.a", comp.name),
                Arc::clone(&self.rule_lib),
            )
            .with_deps(objects),
        );
        self.libs
            .borrow_mut()
            .insert(comp.clone(), Arc::clone(&lib));

        let mut out = vec![Arc::clone(&lib)];
        out.extend(produced);
        Ok(out)
    }

    fn process_link(
        &self,
        tools: &Toolchain,
        name: &str,
        srcs: &[Source],
        components: &[Arc<Component>],
        archive: bool,
    ) -> ProcessorOutput {
        tracing::info!(output = name, archive, "add linked output");

        let mut produced = Vec::new();
        let dep_incdirs = exported_incdirs(components);
        for comp in components {
            produced.extend(tools.process::<Component>(comp.as_ref())?);
        }
        for src in srcs {
            let mut scoped = src.clone();
            scoped.incdirs_system.extend(dep_incdirs.iter().cloned());
            produced.extend(tools.process::<Source>(&scoped)?);
        }

        let rule = if archive { &self.rule_lib } else { &self.rule_ld };
        let deps: Vec<Dep> = produced.iter().map(Dep::from).collect();
        let target = Arc::new(Target::new(name, Arc::clone(rule)).with_deps(deps));
        Ok(vec![target])
    }
}

/// Include directories a list of components exports to a dependent: each
/// component's own directory plus its declared interface directories.
pub(crate) fn exported_incdirs(components: &[Arc<Component>]) -> Vec<Utf8PathBuf> {
    let mut dirs = Vec::new();
    for comp in components {
        dirs.push(comp.path.clone());
        dirs.extend(comp.interface_dirs.iter().map(|d| comp.path.join(d)));
    }
    dirs
}

/// Rebase a component-relative source for processing: prepend the component
/// path, make the component root quoted-includable, and expose the
/// dependencies' exported directories as system includes.
pub(crate) fn scope_to_component(
    comp: &Component,
    dep_incdirs: &[Utf8PathBuf],
    src: &Source,
) -> Source {
    let mut scoped = src.clone();
    scoped.path = comp.path.join(&src.path);
    scoped.incdirs_local.push(comp.path.clone());
    scoped.incdirs_system.extend(dep_incdirs.iter().cloned());
    scoped
}

/// Absolute path of a source plus the root-relative slot used to name its
/// derived targets.
pub(crate) fn source_paths(root: &Utf8Path, path: &Utf8Path) -> (Utf8PathBuf, Utf8PathBuf) {
    if path.is_absolute() {
        let slot = path
            .strip_prefix(root)
            .map(Utf8Path::to_owned)
            .unwrap_or_else(|_| rootless(path));
        (path.to_owned(), slot)
    } else {
        (root.join(path), path.to_owned())
    }
}

fn rootless(path: &Utf8Path) -> Utf8PathBuf {
    path.components()
        .filter(|c| matches!(c, Utf8Component::Normal(_)))
        .collect()
}

/// Assemble the `$incdirs` value: the source's own directory first, then
/// quoted-include directories, then system directories, all resolved against
/// the project root. No quoting is applied.
pub(crate) fn incdir_flags(root: &Utf8Path, abs: &Utf8Path, src: &Source) -> String {
    let parent = abs.parent().unwrap_or(abs);
    let mut flags = vec![format!("-iquote {parent}")];
    flags.extend(
        src.incdirs_local
            .iter()
            .map(|dir| format!("-iquote {}", resolve(root, dir))),
    );
    flags.extend(
        src.incdirs_system
            .iter()
            .map(|dir| format!("-I {}", resolve(root, dir))),
    );
    flags.join(" ")
}

/// Assemble the `$defines` value. No quoting is applied; values containing
/// shell-significant characters must be pre-quoted by the caller.
pub(crate) fn define_flags(defines: &[Define]) -> String {
    defines
        .iter()
        .map(|define| match &define.value {
            Some(value) => format!("-D{}={value}", define.name),
            None => format!("-D{}", define.name),
        })
        .join(" ")
}

fn resolve(root: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        path.to_owned()
    } else {
        root.join(path)
    }
}
