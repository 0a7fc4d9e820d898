//! C codebase description nodes.
//!
//! Sources, components, executables, and static libraries form a directed
//! graph with possible shared substructure — a component may be depended on
//! by several components or executables — but no cycles. Sharing is
//! expressed through `Arc<Component>`, which also makes the acyclicity
//! structural: a component cannot contain itself.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Implementation language of a source file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceLang {
    /// C source, compiled with the C compiler driver.
    C,
    /// Assembly source.
    Asm,
}

/// Error raised when a source language cannot be deduced from a path.
#[derive(Debug, Error)]
#[error("cannot deduce source language from extension: {path}")]
pub struct UnknownLangError {
    /// The path whose extension was not recognized.
    pub path: Utf8PathBuf,
}

impl SourceLang {
    /// Deduce the language from a file extension (`.c`, `.s`, `.asm`).
    ///
    /// # Errors
    ///
    /// Returns [`UnknownLangError`] for any other extension, including none.
    pub fn from_path(path: &Utf8Path) -> Result<Self, UnknownLangError> {
        match path.extension() {
            Some("c") => Ok(Self::C),
            Some("s" | "asm") => Ok(Self::Asm),
            _ => Err(UnknownLangError {
                path: path.to_owned(),
            }),
        }
    }
}

/// A preprocessor define, with an optional value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Define {
    /// Macro name.
    pub name: String,
    /// Macro value; `None` defines the macro without one.
    pub value: Option<String>,
}

impl Define {
    /// Define a macro without a value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// Define a macro with a value.
    #[must_use]
    pub fn valued(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// A single source file with its include and define context.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Source {
    /// Path to the file, relative to its owning component or the project
    /// root.
    pub path: Utf8PathBuf,
    /// Implementation language.
    pub lang: SourceLang,
    /// Quoted-include (`-iquote`) search directories.
    pub incdirs_local: Vec<Utf8PathBuf>,
    /// System-include (`-I`) search directories.
    pub incdirs_system: Vec<Utf8PathBuf>,
    /// Preprocessor defines for this file.
    pub defines: Vec<Define>,
}

impl Source {
    /// Create a source, deducing the language from the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownLangError`] when the extension is not recognized.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Result<Self, UnknownLangError> {
        let path = path.into();
        let lang = SourceLang::from_path(&path)?;
        Ok(Self::with_lang(path, lang))
    }

    /// Create a source with an explicit language.
    #[must_use]
    pub fn with_lang(path: impl Into<Utf8PathBuf>, lang: SourceLang) -> Self {
        Self {
            path: path.into(),
            lang,
            incdirs_local: Vec::new(),
            incdirs_system: Vec::new(),
            defines: Vec::new(),
        }
    }

    /// Replace the define list, builder style.
    #[must_use]
    pub fn with_defines(mut self, defines: impl IntoIterator<Item = Define>) -> Self {
        self.defines = defines.into_iter().collect();
        self
    }
}

/// A reusable group of sources built into a static library.
///
/// Source paths are relative to [`Component::path`]; interface directories
/// are exported to dependents as system include directories.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Component {
    /// Component name, also used for its library target.
    pub name: String,
    /// Directory the component lives in, relative to the project root.
    pub path: Utf8PathBuf,
    /// Input source files, paths relative to `path`.
    pub srcs: Vec<Source>,
    /// Additional include directories exported to dependents, relative to
    /// `path`.
    pub interface_dirs: Vec<Utf8PathBuf>,
    /// Components this one depends on.
    pub deps: Vec<Arc<Component>>,
}

impl Component {
    /// Create a component with no sources and no dependencies.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            srcs: Vec::new(),
            interface_dirs: Vec::new(),
            deps: Vec::new(),
        }
    }

    /// Replace the source list, builder style.
    #[must_use]
    pub fn with_srcs(mut self, srcs: impl IntoIterator<Item = Source>) -> Self {
        self.srcs = srcs.into_iter().collect();
        self
    }

    /// Replace the exported include directories, builder style.
    #[must_use]
    pub fn with_interface_dirs(
        mut self,
        dirs: impl IntoIterator<Item = Utf8PathBuf>,
    ) -> Self {
        self.interface_dirs = dirs.into_iter().collect();
        self
    }

    /// Replace the component dependencies, builder style.
    #[must_use]
    pub fn with_deps(mut self, deps: impl IntoIterator<Item = Arc<Self>>) -> Self {
        self.deps = deps.into_iter().collect();
        self
    }
}

/// A linked binary assembled from sources and components.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Executable {
    /// Output name of the binary.
    pub name: String,
    /// Last-level sources linked directly into the binary, relative to the
    /// project root.
    pub srcs: Vec<Source>,
    /// Components linked into the binary.
    pub components: Vec<Arc<Component>>,
}

impl Executable {
    /// Create an executable with no sources and no components.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            srcs: Vec::new(),
            components: Vec::new(),
        }
    }

    /// Replace the source list, builder style.
    #[must_use]
    pub fn with_srcs(mut self, srcs: impl IntoIterator<Item = Source>) -> Self {
        self.srcs = srcs.into_iter().collect();
        self
    }

    /// Replace the component list, builder style.
    #[must_use]
    pub fn with_components(
        mut self,
        components: impl IntoIterator<Item = Arc<Component>>,
    ) -> Self {
        self.components = components.into_iter().collect();
        self
    }
}

/// A standalone static library assembled from sources and components.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StaticLib {
    /// Output name of the archive.
    pub name: String,
    /// Last-level sources archived directly, relative to the project root.
    pub srcs: Vec<Source>,
    /// Components folded into the archive.
    pub components: Vec<Arc<Component>>,
}

impl StaticLib {
    /// Create a static library with no sources and no components.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            srcs: Vec::new(),
            components: Vec::new(),
        }
    }

    /// Replace the source list, builder style.
    #[must_use]
    pub fn with_srcs(mut self, srcs: impl IntoIterator<Item = Source>) -> Self {
        self.srcs = srcs.into_iter().collect();
        self
    }

    /// Replace the component list, builder style.
    #[must_use]
    pub fn with_components(
        mut self,
        components: impl IntoIterator<Item = Arc<Component>>,
    ) -> Self {
        self.components = components.into_iter().collect();
        self
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "tests use expect for ease of debugging")]

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("src/main.c", SourceLang::C)]
    #[case("boot/start.s", SourceLang::Asm)]
    #[case("boot/start.asm", SourceLang::Asm)]
    fn language_is_deduced_from_extension(#[case] path: &str, #[case] lang: SourceLang) {
        let src = Source::new(path).expect("deduce");
        assert_eq!(src.lang, lang);
    }

    #[rstest]
    #[case("README.md")]
    #[case("Makefile")]
    fn unknown_extensions_are_rejected(#[case] path: &str) {
        let err = Source::new(path).expect_err("unknown extension");
        assert!(err.to_string().contains(path));
    }

    #[rstest]
    fn nodes_compare_structurally() {
        let a = Component::new("foo", "src/foo")
            .with_srcs([Source::with_lang("foo.c", SourceLang::C)]);
        let b = Component::new("foo", "src/foo")
            .with_srcs([Source::with_lang("foo.c", SourceLang::C)]);
        assert_eq!(a, b);

        let shared = Arc::new(a);
        let exe = Executable::new("bin/app").with_components([Arc::clone(&shared)]);
        let again = Executable::new("bin/app").with_components([shared]);
        assert_eq!(exe, again);
    }

    #[rstest]
    fn defines_carry_optional_values() {
        assert_eq!(Define::new("NDEBUG").value, None);
        assert_eq!(
            Define::valued("VERSION", "\"1.2\"").value.as_deref(),
            Some("\"1.2\"")
        );
    }
}
