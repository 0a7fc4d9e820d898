//! Toolchain registry and dispatch.
//!
//! A [`Toolchain`] maps domain node types to processor functions and carries
//! the shared context those processors need: the project root, the build
//! directory, and a free-form settings table that the core threads through
//! without interpreting. Dispatch is by exact runtime type — there is no
//! subtype matching — which keeps domain nodes inert data and all behavior
//! externally pluggable.
//!
//! Concrete toolchains live in the submodules: [`gcc`] builds objects,
//! static libraries, and executables; [`clang_tidy`] produces check targets
//! over the same codebase description.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::error::Error;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use thiserror::Error;

use crate::ir::Target;

pub mod clang_tidy;
pub mod gcc;

/// Errors raised during processor registration and dispatch.
#[derive(Debug, Error)]
pub enum ToolchainError {
    /// `process` was called for a node type with no registered processor.
    #[error("no processor registered for node type: {type_name}")]
    UnregisteredType {
        /// Fully qualified name of the node type.
        type_name: &'static str,
    },

    /// A second processor was registered for an already-registered type.
    #[error("a processor is already registered for node type: {type_name}")]
    DuplicateRegistration {
        /// Fully qualified name of the node type.
        type_name: &'static str,
    },

    /// A processor failed while translating a node. The underlying error is
    /// passed through unmodified.
    #[error("{0}")]
    Processor(Box<dyn Error + Send + Sync>),
}

impl ToolchainError {
    /// Wrap a domain-layer failure for propagation through `process`.
    #[must_use]
    pub fn processor(err: impl Error + Send + Sync + 'static) -> Self {
        Self::Processor(Box::new(err))
    }
}

/// The ordered sequence of targets a processor introduces for one node.
pub type ProcessorOutput = Result<Vec<Arc<Target>>, ToolchainError>;

type BoxedProcessor = Box<dyn Fn(&Toolchain, &dyn Any) -> ProcessorOutput>;

/// Registry of node processors plus shared build context.
///
/// A toolchain is created once per build configuration, populated through
/// [`Toolchain::register`] calls, and then used read-only for dispatch.
pub struct Toolchain {
    root_dir: Utf8PathBuf,
    build_dir: Utf8PathBuf,
    settings: IndexMap<String, String>,
    processors: HashMap<TypeId, BoxedProcessor>,
}

impl Toolchain {
    /// Create a toolchain rooted at `root_dir`, writing under `build_dir`.
    #[must_use]
    pub fn new(root_dir: impl Into<Utf8PathBuf>, build_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            build_dir: build_dir.into(),
            settings: IndexMap::new(),
            processors: HashMap::new(),
        }
    }

    /// Project root directory; processors resolve source paths against it.
    #[must_use]
    pub fn root_dir(&self) -> &Utf8Path {
        &self.root_dir
    }

    /// Directory the emitted build file and its outputs live under.
    #[must_use]
    pub fn build_dir(&self) -> &Utf8Path {
        &self.build_dir
    }

    /// Store a free-form setting for processors to read.
    pub fn set_setting(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.settings.insert(key.into(), value.into());
    }

    /// Read back a free-form setting.
    #[must_use]
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    /// Register the processor translating nodes of type `N`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::DuplicateRegistration`] when a processor for
    /// `N` is already present; double configuration would make dispatch
    /// non-deterministic.
    pub fn register<N, F>(&mut self, processor: F) -> Result<(), ToolchainError>
    where
        N: Any,
        F: Fn(&Self, &N) -> ProcessorOutput + 'static,
    {
        match self.processors.entry(TypeId::of::<N>()) {
            Entry::Occupied(_) => Err(ToolchainError::DuplicateRegistration {
                type_name: type_name::<N>(),
            }),
            Entry::Vacant(slot) => {
                tracing::debug!(node_type = type_name::<N>(), "register processor");
                slot.insert(Box::new(move |tools, node| {
                    let node =
                        node.downcast_ref::<N>()
                            .ok_or_else(|| ToolchainError::UnregisteredType {
                                type_name: type_name::<N>(),
                            })?;
                    processor(tools, node)
                }));
                Ok(())
            }
        }
    }

    /// Translate one domain node into the targets needed to build it.
    ///
    /// Lookup is by the exact runtime type of `N`. The returned sequence is
    /// whatever the registered processor produced — everything newly
    /// introduced for this node, recursively processed sub-nodes included —
    /// and callers treat it as opaque.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::UnregisteredType`] when no processor is
    /// registered for `N`; processor failures propagate unmodified.
    pub fn process<N: Any>(&self, node: &N) -> ProcessorOutput {
        let processor = self
            .processors
            .get(&TypeId::of::<N>())
            .ok_or_else(|| ToolchainError::UnregisteredType {
                type_name: type_name::<N>(),
            })?;
        processor(self, node)
    }
}
