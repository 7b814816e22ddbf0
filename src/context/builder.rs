use std::{path::PathBuf, sync::Arc};

use crate::{
    catalog::{ModuleCatalog, PathTable, SimpleName},
    context::{
        config::ContextConfig, derived::DerivedInfoCache, strategy::StrategySet,
        CompilationContext,
    },
    resolver::AssemblyResolver,
    symbols::{NoSymbols, SymbolAttacher, SymbolReaderFactory},
    Error, Result,
};

/// Builder for a [`CompilationContext`].
///
/// Names given to the builder are matched case-insensitively; lists registered under names
/// differing only in case are concatenated in registration order.
///
/// ```rust,no_run
/// use dotbind::{CompilationContextBuilder, ContextConfig};
///
/// let context = CompilationContextBuilder::new()
///     .input_file("MyApp", "build/MyApp.dll")
///     .reference_file("System.Runtime", "ref/System.Runtime.dll")
///     .config(ContextConfig::strict())
///     .build()?;
/// # Ok::<(), dotbind::Error>(())
/// ```
pub struct CompilationContextBuilder {
    inputs: Vec<(String, PathBuf)>,
    references: Vec<(String, PathBuf)>,
    config: ContextConfig,
    symbol_reader_factory: Option<Arc<dyn SymbolReaderFactory>>,
    strategies: Option<StrategySet>,
}

impl CompilationContextBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inputs: Vec::new(),
            references: Vec::new(),
            config: ContextConfig::default(),
            symbol_reader_factory: None,
            strategies: None,
        }
    }

    /// Registers a module being compiled.
    #[must_use]
    pub fn input_file(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.inputs.push((name.to_string(), path.into()));
        self
    }

    /// Registers a reference module.
    #[must_use]
    pub fn reference_file(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.references.push((name.to_string(), path.into()));
        self
    }

    /// Registers modules being compiled, a list of paths per name.
    #[must_use]
    pub fn input_table<I, N, P>(mut self, table: I) -> Self
    where
        I: IntoIterator<Item = (N, Vec<P>)>,
        N: AsRef<str>,
        P: Into<PathBuf>,
    {
        for (name, paths) in table {
            for path in paths {
                self.inputs.push((name.as_ref().to_string(), path.into()));
            }
        }
        self
    }

    /// Registers reference modules, a list of paths per name.
    #[must_use]
    pub fn reference_table<I, N, P>(mut self, table: I) -> Self
    where
        I: IntoIterator<Item = (N, Vec<P>)>,
        N: AsRef<str>,
        P: Into<PathBuf>,
    {
        for (name, paths) in table {
            for path in paths {
                self.references.push((name.as_ref().to_string(), path.into()));
            }
        }
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: ContextConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the factory used to open symbol files. Without one no symbols are found.
    #[must_use]
    pub fn symbol_reader_factory(mut self, factory: Arc<dyn SymbolReaderFactory>) -> Self {
        self.symbol_reader_factory = Some(factory);
        self
    }

    /// Sets the layout and virtual-method algorithms.
    #[must_use]
    pub fn strategies(mut self, strategies: StrategySet) -> Self {
        self.strategies = Some(strategies);
        self
    }

    /// Builds the context. Nothing is loaded yet.
    ///
    /// # Errors
    /// Returns [`Error::Error`] for an empty module name or an empty symbol extension.
    pub fn build(self) -> Result<CompilationContext> {
        if self.config.symbol_extension.is_empty() {
            return Err(Error::Error("Symbol extension cannot be empty".to_string()));
        }

        let inputs = Self::table(self.inputs)?;
        let references = Self::table(self.references)?;
        tracing::debug!(
            "compilation context with {} input and {} reference names",
            inputs.len(),
            references.len()
        );

        let catalog = Arc::new(ModuleCatalog::new(inputs, references));
        let resolver = AssemblyResolver::new(Arc::clone(&catalog), self.config.fail_on_ambiguity);
        let symbols = SymbolAttacher::new(
            self.symbol_reader_factory
                .unwrap_or_else(|| Arc::new(NoSymbols)),
            &self.config.symbol_extension,
            self.config.attach_symbols,
        );

        Ok(CompilationContext {
            config: self.config,
            catalog,
            resolver,
            symbols,
            delegates: DerivedInfoCache::new(),
            strategies: self.strategies.unwrap_or_default(),
        })
    }

    fn table(entries: Vec<(String, PathBuf)>) -> Result<PathTable> {
        let mut table = PathTable::new();
        for (name, path) in entries {
            if name.trim().is_empty() {
                return Err(Error::Error(format!(
                    "Empty module name for {}",
                    path.display()
                )));
            }
            table.entry(SimpleName::new(&name)).or_default().push(path);
        }
        Ok(table)
    }
}

impl Default for CompilationContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
