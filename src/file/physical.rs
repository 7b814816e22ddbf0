//! Memory-mapped file backend.
//!
//! [`Physical`] maps a module read-only into the address space. The mapping is owned by the
//! backend and released when it is dropped, so a module that loses a cache publication race
//! gives its mapping back as soon as the losing caller lets go of it.

use super::Backend;
use crate::{Error::FileError, Result};

use memmap2::Mmap;
use std::{fs, path::Path};

/// A file backend that uses memory-mapped I/O for access to files on disk.
///
/// # Examples
///
/// ```rust,ignore
/// use dotbind::file::{Physical, Backend};
/// use std::path::Path;
///
/// let physical = Physical::new(Path::new("MyAssembly.dll"))?;
/// let dos_header = physical.data_slice(0, 2)?;
/// assert_eq!(dos_header, b"MZ");
/// # Ok::<(), dotbind::Error>(())
/// ```
#[derive(Debug)]
pub struct Physical {
    /// Memory-mapped file data
    data: Mmap,
}

impl Physical {
    /// Create a new physical file backend by memory-mapping the specified file.
    ///
    /// The file is opened read-only; other readers of the same file are not excluded.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = fs::File::open(path).map_err(FileError)?;

        // Read-only mapping of a file this process never writes to
        let mmap = unsafe { Mmap::map(&file) }.map_err(FileError)?;

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(out_of_bounds_error!());
        };

        if offset_end > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        Ok(&self.data[offset..offset_end])
    }

    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}
