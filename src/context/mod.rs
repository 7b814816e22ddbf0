//! The compilation context shared by all workers of a compilation.
//!
//! [`CompilationContext`] ties together the module catalog, reference resolution, derived type
//! information, symbol attachment and algorithm selection. It is `Send + Sync` and meant to be
//! shared through an `Arc`; all its operations take `&self`.
//!
//! # Example
//! ```rust,no_run
//! use dotbind::{AssemblyNameRequest, CompilationContextBuilder};
//!
//! let context = CompilationContextBuilder::new()
//!     .input_file("MyApp", "build/MyApp.dll")
//!     .reference_file("System.Runtime", "ref/System.Runtime.dll")
//!     .build()?;
//!
//! let request = AssemblyNameRequest::parse("System.Runtime, Version=8.0.0.0")?;
//! if let Some(module) = context.resolve_assembly(&request, true)? {
//!     println!("resolved to {}", module.path().display());
//! }
//! # Ok::<(), dotbind::Error>(())
//! ```

/// Builder for compilation contexts
pub mod builder;
/// Context settings and presets
pub mod config;
/// Per-type derived information
pub mod derived;
/// Layout and virtual-method algorithm selection
pub mod strategy;

use std::{path::Path, sync::Arc};

use crate::{
    catalog::ModuleCatalog,
    context::{
        config::ContextConfig,
        derived::{DelegateInfo, DerivedInfoCache},
        strategy::{
            FieldLayoutAlgorithm, StrategySet, TypeCategory, VirtualMethodAlgorithm,
            VirtualMethodEnumerationAlgorithm,
        },
    },
    module::{MethodHandle, Module, ModuleId, TypeHandle},
    resolver::{AssemblyNameRequest, AssemblyResolver},
    symbols::{MethodMetadata, ParameterNames, SequencePoint, SymbolAttacher, SymbolReader},
    Error, Result,
};

pub use builder::CompilationContextBuilder;

/// State shared by the workers of one compilation.
#[derive(Debug)]
pub struct CompilationContext {
    config: ContextConfig,
    catalog: Arc<ModuleCatalog>,
    resolver: AssemblyResolver,
    symbols: SymbolAttacher,
    delegates: DerivedInfoCache<DelegateInfo>,
    strategies: StrategySet,
}

impl CompilationContext {
    /// Starts building a context.
    #[must_use]
    pub fn builder() -> CompilationContextBuilder {
        CompilationContextBuilder::new()
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// The module catalog.
    #[must_use]
    pub fn catalog(&self) -> &ModuleCatalog {
        &self.catalog
    }

    /// The resolver.
    #[must_use]
    pub fn resolver(&self) -> &AssemblyResolver {
        &self.resolver
    }

    /// Resolves an assembly reference, see [`AssemblyResolver::resolve`].
    ///
    /// # Errors
    /// Only for `strict` requests, see [`AssemblyResolver::resolve`].
    pub fn resolve_assembly(
        &self,
        request: &AssemblyNameRequest,
        strict: bool,
    ) -> Result<Option<Arc<Module>>> {
        self.resolver.resolve(request, strict)
    }

    /// Resolves a simple name without version or token constraints.
    ///
    /// # Errors
    /// Only for `strict` requests, see [`AssemblyResolver::resolve`].
    pub fn module_for_simple_name(&self, name: &str, strict: bool) -> Result<Option<Arc<Module>>> {
        self.resolver.resolve_simple_name(name, strict)
    }

    /// Returns the module at `path`, loading it once per canonical path. No name check is made.
    ///
    /// # Errors
    /// Returns [`Error::LoadError`] if the module cannot be loaded.
    pub fn module_from_path(&self, path: &Path) -> Result<Arc<Module>> {
        self.catalog.module_from_path(path)
    }

    /// Returns a loaded module by id.
    #[must_use]
    pub fn module_by_id(&self, id: ModuleId) -> Option<Arc<Module>> {
        self.catalog.module_by_id(id)
    }

    /// Loads all modules being compiled in parallel and returns the failures.
    pub fn preload(&self) -> Vec<Error> {
        self.catalog.preload()
    }

    /// Delegate information of `ty`, created on first request.
    pub fn delegate_info(&self, ty: TypeHandle) -> Arc<DelegateInfo> {
        self.delegates.get(ty)
    }

    /// Attaches the symbol reader of `module`, at most once.
    pub fn attach_symbols(&self, module: &Module) -> Option<Arc<dyn SymbolReader>> {
        self.symbols.attach(module)
    }

    fn symbol_reader_for(&self, method: MethodHandle) -> Option<Arc<dyn SymbolReader>> {
        let module = self.module_by_id(method.module)?;
        self.symbols.attach(&module)
    }

    /// Sequence points of `method`, `None` without symbols.
    #[must_use]
    pub fn sequence_points_for(&self, method: MethodHandle) -> Option<Vec<SequencePoint>> {
        self.symbol_reader_for(method)
            .map(|reader| reader.sequence_points(method.token))
    }

    /// Local variable names of `method`, `None` without symbols.
    #[must_use]
    pub fn local_variable_names_for(&self, method: MethodHandle) -> Option<Vec<String>> {
        self.symbol_reader_for(method)
            .map(|reader| reader.local_variable_names(method.token))
    }

    /// Parameter names of `method`, `_this` first for instance methods.
    #[must_use]
    pub fn parameter_names_for<'a>(&self, method: &'a dyn MethodMetadata) -> ParameterNames<'a> {
        ParameterNames::new(method)
    }

    /// Field layout algorithm for a type of `category`.
    #[must_use]
    pub fn field_layout_algorithm(&self, category: TypeCategory) -> Arc<dyn FieldLayoutAlgorithm> {
        self.strategies.field_layout(category)
    }

    /// Virtual slot algorithm for a type of `category`.
    #[must_use]
    pub fn virtual_method_algorithm(
        &self,
        category: TypeCategory,
    ) -> Arc<dyn VirtualMethodAlgorithm> {
        self.strategies.virtual_methods(category)
    }

    /// Virtual method enumeration algorithm for a type of `category`.
    #[must_use]
    pub fn virtual_method_enumeration_algorithm(
        &self,
        category: TypeCategory,
    ) -> Arc<dyn VirtualMethodEnumerationAlgorithm> {
        self.strategies.method_enumeration(category)
    }
}
