//! Debug symbol attachment.
//!
//! Symbol files are read by an external [`SymbolReaderFactory`]. This module decides where a
//! module's symbol file lives, asks the factory for a reader at most once per module and
//! exposes parameter names of methods for debug-info emission.
//!
//! Two formats exist: portable symbol files (an ECMA-335 metadata root, `BSJB`) and legacy
//! MSF program databases. A factory is tried with the portable format first, then with the
//! legacy reader keyed by the module's own path.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    metadata::{root::CIL_HEADER_MAGIC, token::Token},
    module::{MethodHandle, Module},
    Result,
};

/// Signature of legacy MSF 7.00 program databases.
pub const MSF_SIGNATURE: &[u8] = b"Microsoft C/C++ MSF 7.00\r\n\x1ADS\0\0\0";

/// A mapping from an IL offset to a source range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencePoint {
    /// IL offset within the method body
    pub offset: u32,
    /// Source document
    pub document: String,
    /// First line, 1-based
    pub start_line: u32,
    /// First column, 1-based
    pub start_column: u16,
    /// Last line
    pub end_line: u32,
    /// Column past the end
    pub end_column: u16,
}

/// Reads symbols of one module.
pub trait SymbolReader: Send + Sync {
    /// Sequence points of the method `method`, in IL offset order.
    fn sequence_points(&self, method: Token) -> Vec<SequencePoint>;

    /// Names of the local variables of `method`, indexed by slot.
    fn local_variable_names(&self, method: Token) -> Vec<String>;
}

/// Opens symbol readers. Implemented outside of this crate.
pub trait SymbolReaderFactory: Send + Sync {
    /// Opens a portable symbol file. `Ok(None)` means the file is not in the portable format.
    ///
    /// # Errors
    /// Returns an error if the file is portable but unreadable.
    fn open_portable(&self, pdb_path: &Path) -> Result<Option<Arc<dyn SymbolReader>>>;

    /// Opens legacy symbols for the module at `module_path`.
    ///
    /// # Errors
    /// Returns an error if the symbols exist but are unreadable.
    fn open_legacy(&self, module_path: &Path) -> Result<Option<Arc<dyn SymbolReader>>>;
}

/// A factory that never finds symbols.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSymbols;

impl SymbolReaderFactory for NoSymbols {
    fn open_portable(&self, _pdb_path: &Path) -> Result<Option<Arc<dyn SymbolReader>>> {
        Ok(None)
    }

    fn open_legacy(&self, _module_path: &Path) -> Result<Option<Arc<dyn SymbolReader>>> {
        Ok(None)
    }
}

/// Symbol file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolFormat {
    /// Portable symbols, an ECMA-335 metadata root
    Portable,
    /// MSF 7.00 program database
    Legacy,
}

/// Classifies the leading bytes of a symbol file.
#[must_use]
pub fn detect_symbol_format(data: &[u8]) -> Option<SymbolFormat> {
    if data.len() >= 4 && data[..4] == CIL_HEADER_MAGIC.to_le_bytes() {
        Some(SymbolFormat::Portable)
    } else if data.starts_with(MSF_SIGNATURE) {
        Some(SymbolFormat::Legacy)
    } else {
        None
    }
}

/// Attaches symbol readers to modules.
pub struct SymbolAttacher {
    factory: Arc<dyn SymbolReaderFactory>,
    extension: String,
    enabled: bool,
}

impl SymbolAttacher {
    /// Creates an attacher looking for `module.<extension>` files.
    #[must_use]
    pub fn new(factory: Arc<dyn SymbolReaderFactory>, extension: &str, enabled: bool) -> Self {
        SymbolAttacher {
            factory,
            extension: extension.to_string(),
            enabled,
        }
    }

    /// Path of the symbol file belonging to `module_path`.
    #[must_use]
    pub fn symbol_path(&self, module_path: &Path) -> PathBuf {
        module_path.with_extension(&self.extension)
    }

    /// Returns the module's symbol reader, opening it on the first call.
    ///
    /// The outcome, including "no symbols", is stored on the module; concurrent callers wait
    /// for the first attempt and share its result.
    pub fn attach(&self, module: &Module) -> Option<Arc<dyn SymbolReader>> {
        if !self.enabled {
            return None;
        }

        module
            .symbol_slot()
            .get_or_init(|| self.open(module.path()))
            .clone()
    }

    fn open(&self, module_path: &Path) -> Option<Arc<dyn SymbolReader>> {
        let pdb_path = self.symbol_path(module_path);
        if !pdb_path.is_file() {
            tracing::debug!("no symbol file for {}", module_path.display());
            return None;
        }

        let opened = match self.factory.open_portable(&pdb_path) {
            Ok(Some(reader)) => Ok(Some(reader)),
            Ok(None) => self.factory.open_legacy(module_path),
            Err(error) => Err(error),
        };

        match opened {
            Ok(Some(reader)) => {
                tracing::debug!("attached symbols {}", pdb_path.display());
                Some(reader)
            }
            Ok(None) => None,
            Err(error) => {
                tracing::warn!("failed to read symbols {}: {}", pdb_path.display(), error);
                None
            }
        }
    }
}

impl fmt::Debug for SymbolAttacher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolAttacher")
            .field("extension", &self.extension)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// Facts about a method, provided by the metadata reader.
pub trait MethodMetadata {
    /// The method.
    fn handle(&self) -> MethodHandle;

    /// True for static methods, which have no `this` parameter.
    fn is_static(&self) -> bool;

    /// Declared parameter names, in order, excluding `this`.
    fn parameter_names(&self) -> &[String];
}

/// Name of the implicit `this` parameter.
pub const THIS_PARAMETER_NAME: &str = "_this";

/// Parameter names of a method, `_this` first for instance methods.
///
/// A clone continues independently from the position it was cloned at.
#[derive(Debug, Clone)]
pub struct ParameterNames<'a> {
    this: bool,
    declared: std::slice::Iter<'a, String>,
}

impl<'a> ParameterNames<'a> {
    /// Parameter names of `method`.
    pub fn new(method: &'a dyn MethodMetadata) -> Self {
        ParameterNames {
            this: !method.is_static(),
            declared: method.parameter_names().iter(),
        }
    }
}

impl<'a> Iterator for ParameterNames<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.this {
            self.this = false;
            return Some(THIS_PARAMETER_NAME);
        }

        self.declared.next().map(String::as_str)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.declared.len() + usize::from(self.this);
        (len, Some(len))
    }
}

impl ExactSizeIterator for ParameterNames<'_> {}
