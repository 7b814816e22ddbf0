//! Opening modules and reading their identity.
//!
//! [`ModuleLoader`] maps a file (or takes an in-memory image) and walks the header chain from
//! the CLI header through the metadata root and streams to the Assembly or Module row. It
//! keeps no state: every call produces a fresh [`Module`] with a new [`ModuleId`].

use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use crate::{
    catalog::SimpleName,
    file::File,
    metadata::{
        cor20header::Cor20Header,
        identity::ModuleIdentity,
        root::Root,
        streams::{Blob, Strings, TablesHeader},
        tables::TableInfo,
    },
    module::{Module, ModuleId},
    Error, Result,
};

/// Loads modules from disk or memory and reads their identity.
pub struct ModuleLoader;

struct ParsedMetadata {
    identity: ModuleIdentity,
    runtime_version: String,
    metadata_offset: usize,
    metadata_size: usize,
    tables: TableInfo,
}

impl ModuleLoader {
    /// Maps the file at `path` and reads its identity.
    ///
    /// With `expected_name`, the declared simple name must match it case-insensitively.
    ///
    /// Each call loads the file again. Loading once per canonical path is done by
    /// [`crate::ModuleCatalog::module_from_path`].
    ///
    /// # Errors
    /// Returns [`Error::LoadError`] if the file cannot be read or is not a valid managed
    /// image, and [`Error::NameMismatch`] if the declared name differs from `expected_name`.
    pub fn open(path: &Path, expected_name: Option<&str>) -> Result<Module> {
        let canonical = fs::canonicalize(path).map_err(|error| Error::from(error).at_path(path))?;

        let file = File::from_file(&canonical).map_err(|error| error.at_path(&canonical))?;
        let module = Self::load(file, canonical)?;
        tracing::debug!("loaded {}", module);

        if let Some(expected) = expected_name {
            Self::verify_name(&module, expected)?;
        }

        Ok(module)
    }

    /// Reads the identity of an in-memory image. `path` is recorded as the module's path
    /// without touching the file system.
    ///
    /// # Errors
    /// Returns [`Error::LoadError`] if `data` is not a valid managed image.
    pub fn from_bytes(data: Vec<u8>, path: impl Into<PathBuf>) -> Result<Module> {
        let path = path.into();
        let file = File::from_mem(data).map_err(|error| error.at_path(&path))?;
        Self::load(file, path)
    }

    /// Checks the declared name of `module` against `expected`, ignoring case.
    ///
    /// # Errors
    /// Returns [`Error::NameMismatch`] if the names differ.
    pub fn verify_name(module: &Module, expected: &str) -> Result<()> {
        if SimpleName::matches(module.simple_name(), expected) {
            return Ok(());
        }

        Err(Error::NameMismatch {
            path: module.path().to_path_buf(),
            expected: expected.to_string(),
            actual: module.simple_name().to_string(),
        })
    }

    fn load(file: File, path: PathBuf) -> Result<Module> {
        let parsed = Self::parse(&file).map_err(|error| error.at_path(&path))?;

        Ok(Module {
            id: ModuleId::next(),
            path,
            identity: parsed.identity,
            runtime_version: parsed.runtime_version,
            file,
            metadata_offset: parsed.metadata_offset,
            metadata_size: parsed.metadata_size,
            tables: parsed.tables,
            symbols: OnceLock::new(),
        })
    }

    fn parse(file: &File) -> Result<ParsedMetadata> {
        let (clr_rva, clr_size) = file.clr()?;
        if clr_size < Cor20Header::SIZE {
            return Err(malformed_error!("CLR header directory too small - {}", clr_size));
        }

        let clr_offset = file.rva_to_offset(clr_rva)?;
        let header = Cor20Header::read(file.data_slice(clr_offset, Cor20Header::SIZE)?)?;

        let metadata_offset = file.rva_to_offset(header.meta_data_rva as usize)?;
        let metadata_size = header.meta_data_size as usize;
        let metadata = file.data_slice(metadata_offset, metadata_size)?;

        let root = Root::read(metadata)?;

        let Some(tables_data) = root.tables_stream(metadata) else {
            return Err(malformed_error!("No table stream found"));
        };
        let tables = TablesHeader::from(tables_data)?;

        let Some(strings_data) = root.stream(metadata, "#Strings") else {
            return Err(malformed_error!("No #Strings heap found"));
        };
        let strings = Strings::from(strings_data)?;

        let blobs = root.stream(metadata, "#Blob").map(Blob::from).transpose()?;

        let identity = ModuleIdentity::read(&tables, &strings, blobs.as_ref())?;

        Ok(ParsedMetadata {
            identity,
            runtime_version: root.version,
            metadata_offset,
            metadata_size,
            tables: tables.info().clone(),
        })
    }
}
