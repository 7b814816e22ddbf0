//! Loaded modules and the handles that identify their contents.
//!
//! A [`Module`] owns the mapped bytes of one managed binary together with the identity read
//! from its metadata. Every module receives a process-unique [`ModuleId`] when it is loaded;
//! caches key on that id (or on [`TypeHandle`] / [`MethodHandle`]) instead of on addresses.
//!
//! # Example
//! ```rust,no_run
//! use dotbind::ModuleLoader;
//! use std::path::Path;
//!
//! let module = ModuleLoader::open(Path::new("lib/System.Runtime.dll"), Some("System.Runtime"))?;
//! println!("{} {:?}", module.simple_name(), module.version());
//! # Ok::<(), dotbind::Error>(())
//! ```

mod loader;

pub use loader::ModuleLoader;

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, OnceLock,
    },
};

use crate::{
    file::File,
    metadata::{
        identity::{AssemblyVersion, ModuleIdentity, StrongNameToken},
        tables::{TableId, TableInfo},
        token::Token,
    },
    symbols::SymbolReader,
    Result,
};

static NEXT_MODULE_ID: AtomicU32 = AtomicU32::new(1);

/// Process-unique identity of a loaded module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(u32);

impl ModuleId {
    fn next() -> Self {
        ModuleId(NEXT_MODULE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps a raw id. Ids of loaded modules only come from the loader.
    #[must_use]
    pub const fn from_raw(value: u32) -> Self {
        ModuleId(value)
    }

    /// The raw id.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module#{}", self.0)
    }
}

/// A type defined in a loaded module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeHandle {
    /// Defining module
    pub module: ModuleId,
    /// `TypeDef` token
    pub token: Token,
}

impl TypeHandle {
    /// Creates a handle.
    #[must_use]
    pub const fn new(module: ModuleId, token: Token) -> Self {
        TypeHandle { module, token }
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.token)
    }
}

/// A method defined in a loaded module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodHandle {
    /// Defining module
    pub module: ModuleId,
    /// `MethodDef` token
    pub token: Token,
}

impl MethodHandle {
    /// Creates a handle.
    #[must_use]
    pub const fn new(module: ModuleId, token: Token) -> Self {
        MethodHandle { module, token }
    }
}

impl fmt::Display for MethodHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.token)
    }
}

/// One loaded managed binary.
///
/// The mapping is released when the last reference to the module is dropped.
pub struct Module {
    id: ModuleId,
    path: PathBuf,
    identity: ModuleIdentity,
    runtime_version: String,
    file: File,
    metadata_offset: usize,
    metadata_size: usize,
    tables: TableInfo,
    symbols: OnceLock<Option<Arc<dyn SymbolReader>>>,
}

impl Module {
    /// Process-unique id.
    #[must_use]
    pub fn id(&self) -> ModuleId {
        self.id
    }

    /// Declared simple name.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        &self.identity.name
    }

    /// Canonical path the module was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Assembly version, `None` for modules without a manifest.
    #[must_use]
    pub fn version(&self) -> Option<AssemblyVersion> {
        self.identity.version
    }

    /// Strong-name token, `None` when unsigned.
    #[must_use]
    pub fn strong_name_token(&self) -> Option<&StrongNameToken> {
        self.identity.token.as_ref()
    }

    /// Culture, `None` when neutral.
    #[must_use]
    pub fn culture(&self) -> Option<&str> {
        self.identity.culture.as_deref()
    }

    /// The complete identity.
    #[must_use]
    pub fn identity(&self) -> &ModuleIdentity {
        &self.identity
    }

    /// True if the module carries an assembly manifest.
    #[must_use]
    pub fn is_assembly(&self) -> bool {
        self.identity.version.is_some()
    }

    /// Runtime version string of the metadata root.
    #[must_use]
    pub fn runtime_version(&self) -> &str {
        &self.runtime_version
    }

    /// The mapped image.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.file.data()
    }

    /// A bounds-checked slice of the image.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the image.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.file.data_slice(offset, len)
    }

    /// Converts an RVA to a file offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no section contains the RVA.
    pub fn rva_to_offset(&self, rva: usize) -> Result<usize> {
        self.file.rva_to_offset(rva)
    }

    /// The metadata, starting at its root.
    #[must_use]
    pub fn metadata(&self) -> &[u8] {
        &self.file.data()[self.metadata_offset..self.metadata_offset + self.metadata_size]
    }

    /// Number of rows in `table`.
    #[must_use]
    pub fn row_count(&self, table: TableId) -> u32 {
        self.tables.rows(table)
    }

    /// Handle of the type in `TypeDef` row `rid`, `None` if the row does not exist.
    #[must_use]
    pub fn type_handle(&self, rid: u32) -> Option<TypeHandle> {
        (rid != 0 && rid <= self.row_count(TableId::TypeDef))
            .then(|| TypeHandle::new(self.id, Token::from_parts(TableId::TypeDef, rid)))
    }

    /// The attached symbol reader, if attachment ran and found one.
    #[must_use]
    pub fn symbol_reader(&self) -> Option<Arc<dyn SymbolReader>> {
        self.symbols.get().cloned().flatten()
    }

    pub(crate) fn symbol_slot(&self) -> &OnceLock<Option<Arc<dyn SymbolReader>>> {
        &self.symbols
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("identity", &self.identity)
            .field("len", &self.file.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.identity, self.path.display())
    }
}
