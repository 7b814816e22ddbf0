//! The session-wide catalog of modules.
//!
//! The catalog knows two tables mapping simple names to candidate paths: modules being
//! compiled and reference modules. Candidates of a name are loaded on first request, in
//! discovery order (compiled modules first), and the resulting list stays fixed for the rest of
//! the session. Every module is loaded at most once per canonical path and is reachable by
//! path, by [`ModuleId`] and by name.

use std::{
    collections::HashMap,
    fmt,
    fs,
    hash::{Hash, Hasher},
    path::{Path, PathBuf},
    sync::Arc,
};

use rayon::prelude::*;

use crate::{
    module::{Module, ModuleId, ModuleLoader},
    utils::cache::{CacheStats, ConcurrentCache},
    Error, Result,
};

/// A simple name, compared and hashed case-insensitively, displayed as given.
///
/// Case is folded to upper case per character, so two names are equal exactly when
/// [`SimpleName::matches`] says so.
#[derive(Clone)]
pub struct SimpleName {
    display: String,
    folded: String,
}

impl SimpleName {
    /// Wraps a simple name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        SimpleName {
            display: name.to_string(),
            folded: name.chars().flat_map(char::to_uppercase).collect(),
        }
    }

    /// Compares two names ignoring case, without allocating.
    #[must_use]
    pub fn matches(left: &str, right: &str) -> bool {
        left.chars()
            .flat_map(char::to_uppercase)
            .eq(right.chars().flat_map(char::to_uppercase))
    }

    /// The name as given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.display
    }
}

impl PartialEq for SimpleName {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl Eq for SimpleName {}

impl Hash for SimpleName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}

impl fmt::Debug for SimpleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.display)
    }
}

impl fmt::Display for SimpleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl From<&str> for SimpleName {
    fn from(name: &str) -> Self {
        SimpleName::new(name)
    }
}

/// Simple name to candidate paths.
pub type PathTable = HashMap<SimpleName, Vec<PathBuf>>;

/// Cache counters of a [`ModuleCatalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CatalogStats {
    /// Modules by canonical path
    pub paths: CacheStats,
    /// Candidate lists by name
    pub names: CacheStats,
}

/// Loads and remembers the modules of a compilation session.
pub struct ModuleCatalog {
    inputs: PathTable,
    references: PathTable,
    by_path: ConcurrentCache<PathBuf, Module>,
    by_id: ConcurrentCache<ModuleId, Module>,
    by_name: ConcurrentCache<SimpleName, Vec<Arc<Module>>>,
}

impl ModuleCatalog {
    /// Creates a catalog over the modules being compiled and their references.
    #[must_use]
    pub fn new(inputs: PathTable, references: PathTable) -> Self {
        ModuleCatalog {
            inputs,
            references,
            by_path: ConcurrentCache::new(),
            by_id: ConcurrentCache::new(),
            by_name: ConcurrentCache::new(),
        }
    }

    /// True if either table lists `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        let key = SimpleName::new(name);
        self.inputs.contains_key(&key) || self.references.contains_key(&key)
    }

    /// Names of the modules being compiled.
    pub fn input_names(&self) -> impl Iterator<Item = &SimpleName> {
        self.inputs.keys()
    }

    /// Candidate paths of `name`, modules being compiled first.
    #[must_use]
    pub fn candidate_paths(&self, name: &str) -> Vec<&Path> {
        let key = SimpleName::new(name);
        self.inputs
            .get(&key)
            .into_iter()
            .chain(self.references.get(&key))
            .flatten()
            .map(PathBuf::as_path)
            .collect()
    }

    /// Loads the modules listed under `name`, in discovery order, without duplicates.
    ///
    /// `Ok(None)` if neither table lists the name. The list is computed once and shared by all
    /// later callers; a failed load is not remembered and the next call retries.
    ///
    /// # Errors
    /// Returns the first load or name verification error among the candidates.
    pub fn candidates(&self, name: &str) -> Result<Option<Arc<Vec<Arc<Module>>>>> {
        let key = SimpleName::new(name);
        if let Some(found) = self.by_name.try_get(&key) {
            return Ok(Some(found));
        }

        let paths = self.candidate_paths(name);
        if paths.is_empty() {
            return Ok(None);
        }

        let list = self.by_name.get_or_try_create(key, |_| {
            let mut modules: Vec<Arc<Module>> = Vec::with_capacity(paths.len());
            for path in &paths {
                let module = self.module_from_path(path)?;
                ModuleLoader::verify_name(&module, name)?;

                if !modules.iter().any(|known| known.id() == module.id()) {
                    modules.push(module);
                }
            }
            Ok(modules)
        })?;

        Ok(Some(list))
    }

    /// Returns the module at `path`, loading it if needed. No name check is made.
    ///
    /// # Errors
    /// Returns [`Error::LoadError`] if the path cannot be canonicalized or loaded.
    pub fn module_from_path(&self, path: &Path) -> Result<Arc<Module>> {
        let canonical = fs::canonicalize(path).map_err(|error| Error::from(error).at_path(path))?;

        let module = self
            .by_path
            .get_or_try_create(canonical, |canonical| ModuleLoader::open(canonical, None))?;

        Ok(self.by_id.get_or_insert(module.id(), module))
    }

    /// Returns a loaded module by id.
    #[must_use]
    pub fn module_by_id(&self, id: ModuleId) -> Option<Arc<Module>> {
        self.by_id.try_get(&id)
    }

    /// All modules loaded so far.
    #[must_use]
    pub fn loaded_modules(&self) -> Vec<Arc<Module>> {
        self.by_id.values()
    }

    /// Loads the candidates of every module being compiled, in parallel.
    ///
    /// Returns the errors of the names that failed; other names stay loaded.
    pub fn preload(&self) -> Vec<Error> {
        let names: Vec<&SimpleName> = self.inputs.keys().collect();

        names
            .par_iter()
            .filter_map(|name| match self.candidates(name.as_str()) {
                Ok(_) => None,
                Err(error) => {
                    tracing::warn!("failed to preload {}: {}", name, error);
                    Some(error)
                }
            })
            .collect()
    }

    /// Cache counters.
    #[must_use]
    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            paths: self.by_path.stats(),
            names: self.by_name.stats(),
        }
    }
}

impl fmt::Debug for ModuleCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleCatalog")
            .field("inputs", &self.inputs)
            .field("references", &self.references)
            .field("loaded", &self.by_id.len())
            .finish()
    }
}
