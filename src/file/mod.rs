//! PE container access for managed modules.
//!
//! This module abstracts over where the bytes of a module come from (a memory-mapped file on
//! disk, or an owned buffer) and pairs them with the parsed PE structure from `goblin`. The
//! pairing is self-referential: the [`File`] owns its backend, and the parsed headers borrow
//! from it for as long as the [`File`] lives.
//!
//! # Key Components
//!
//! - [`File`] - parsed PE image plus its backing bytes
//! - [`Backend`] - trait implemented by the data sources
//! - [`parser::Parser`] - cursor-based reader for headers and encoded streams
//! - [`io`] - little-endian primitives and 7-bit group integer writing
//!
//! # Usage
//!
//! ```rust,no_run
//! use dotbind::File;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("MyAssembly.dll"))?;
//! let (clr_rva, clr_size) = file.clr()?;
//! let clr_offset = file.rva_to_offset(clr_rva)?;
//! let cor20 = file.data_slice(clr_offset, clr_size)?;
//! println!("CLI header is {} bytes", cor20.len());
//! # Ok::<(), dotbind::Error>(())
//! ```

pub mod io;
pub mod parser;

mod memory;
mod physical;

use std::path::Path;

use crate::{
    Error::{Empty, GoblinErr},
    Result,
};
use goblin::pe::{section_table::SectionTable, PE};
use memory::Memory;
use ouroboros::self_referencing;
use physical::Physical;

/// Backend trait for file data sources.
///
/// All implementations must be thread-safe, modules are shared between compilation workers.
pub trait Backend: Send + Sync {
    /// Returns a bounds-checked slice of the data.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the data.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the complete data.
    fn data(&self) -> &[u8];

    /// Returns the length of the data.
    fn len(&self) -> usize;
}

#[self_referencing]
/// A parsed PE image together with the bytes it was parsed from.
///
/// Construction fails unless the image is a PE with an optional header carrying a CLI
/// (COM descriptor) data directory.
pub struct File {
    /// The underlying data source.
    data: Box<dyn Backend>,
    /// The parsed PE structure, referencing the data.
    #[borrows(data)]
    #[not_covariant]
    pe: PE<'this>,
}

impl File {
    /// Maps the file at `file` and parses it as a managed PE image.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or mapped, is empty, is not a valid PE
    /// image or has no CLI header directory.
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Parses an in-memory buffer as a managed PE image.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is empty, is not a valid PE image or has no CLI
    /// header directory.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);

        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let data: Box<dyn Backend> = Box::new(data);

        File::try_new(data, |data| {
            let pe = PE::parse(data.data()).map_err(GoblinErr)?;

            let has_clr_header = match &pe.header.optional_header {
                Some(optional_header) => optional_header
                    .data_directories
                    .get_clr_runtime_header()
                    .is_some(),
                None => return Err(malformed_error!("File does not have an OptionalHeader")),
            };

            if !has_clr_header {
                return Err(malformed_error!(
                    "File does not have a CLR runtime header directory"
                ));
            }

            Ok(pe)
        })
    }

    /// Returns the total size of the image in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.with_data(|data| data.len())
    }

    /// Returns `true` if the image has a length of zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the preferred load address of the image.
    #[must_use]
    pub fn imagebase(&self) -> u64 {
        self.with_pe(|pe| pe.image_base as u64)
    }

    /// Returns `(rva, size)` of the CLI header directory.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the directory is missing.
    pub fn clr(&self) -> Result<(usize, usize)> {
        self.with_pe(|pe| {
            let Some(optional_header) = &pe.header.optional_header else {
                return Err(malformed_error!("File does not have an OptionalHeader"));
            };

            match optional_header.data_directories.get_clr_runtime_header() {
                Some(clr_dir) => Ok((clr_dir.virtual_address as usize, clr_dir.size as usize)),
                None => Err(malformed_error!(
                    "File does not have a CLR runtime header directory"
                )),
            }
        })
    }

    /// Returns an iterator over the section headers.
    pub fn sections(&self) -> impl Iterator<Item = &SectionTable> {
        self.with_pe(|pe| pe.sections.iter())
    }

    /// Returns the complete image data.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.with_data(|data| data.data())
    }

    /// Returns a bounds-checked slice of the image.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the image.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.with_data(|data| data.data_slice(offset, len))
    }

    /// Converts a relative virtual address into a file offset.
    ///
    /// The RVA must fall inside the virtual extent of a section; the first byte of a section
    /// maps to its raw data pointer.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no section contains the RVA.
    pub fn rva_to_offset(&self, rva: usize) -> Result<usize> {
        let rva_u32 =
            u32::try_from(rva).map_err(|_| malformed_error!("RVA too large to fit in u32: {}", rva))?;

        self.with_pe(|pe| {
            for section in &pe.sections {
                let Some(section_max) = section.virtual_address.checked_add(section.virtual_size)
                else {
                    return Err(malformed_error!(
                        "Section malformed, causing integer overflow - {} + {}",
                        section.virtual_address,
                        section.virtual_size
                    ));
                };

                if section.virtual_address <= rva_u32 && rva_u32 < section_max {
                    return Ok((rva - section.virtual_address as usize)
                        + section.pointer_to_raw_data as usize);
                }
            }

            Err(malformed_error!(
                "RVA could not be converted to offset - {}",
                rva
            ))
        })
    }
}
