//! The CLI header (`IMAGE_COR20_HEADER`), ECMA-335 II.25.3.3.
//!
//! The header is the entry point into the managed part of a PE image: it locates the
//! metadata root and carries the runtime flags and the strong name signature directory.

use crate::{file::parser::Parser, Result};

/// The parsed CLI header.
///
/// Only the fields needed to locate and identify a module are kept; reserved directories are
/// validated but not stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cor20Header {
    /// Size of the header in bytes, always 72
    pub cb: u32,
    /// Minimum major runtime version required
    pub major_runtime_version: u16,
    /// Minimum minor runtime version required
    pub minor_runtime_version: u16,
    /// RVA of the metadata root
    pub meta_data_rva: u32,
    /// Size of the metadata in bytes
    pub meta_data_size: u32,
    /// Runtime image flags (`COMIMAGE_FLAGS_*`)
    pub flags: u32,
    /// Entry point token or RVA
    pub entry_point_token: u32,
    /// RVA of the managed resources
    pub resource_rva: u32,
    /// Size of the managed resources
    pub resource_size: u32,
    /// RVA of the strong name signature
    pub strong_name_signature_rva: u32,
    /// Size of the strong name signature
    pub strong_name_signature_size: u32,
}

impl Cor20Header {
    /// Size of the header on disk.
    pub const SIZE: usize = 72;

    /// `COMIMAGE_FLAGS_STRONGNAMESIGNED`
    pub const FLAG_STRONG_NAME_SIGNED: u32 = 0x0000_0008;

    /// Parses and validates the header at the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for short input and [`crate::Error::Malformed`]
    /// when a field violates ECMA-335 constraints.
    pub fn read(data: &[u8]) -> Result<Cor20Header> {
        const VALID_FLAGS: u32 = 0x0001_001F;

        if data.len() < Self::SIZE {
            return Err(out_of_bounds_error!());
        }

        let mut parser = Parser::new(data);

        let cb = parser.read_le::<u32>()?;
        if cb as usize != Self::SIZE {
            return Err(malformed_error!(
                "Invalid CLR header size: expected 72, got {}",
                cb
            ));
        }

        let major_runtime_version = parser.read_le::<u16>()?;
        let minor_runtime_version = parser.read_le::<u16>()?;
        if major_runtime_version == 0 || major_runtime_version > 10 {
            return Err(malformed_error!(
                "Invalid major runtime version: {}",
                major_runtime_version
            ));
        }

        let meta_data_rva = parser.read_le::<u32>()?;
        if meta_data_rva == 0 {
            return Err(malformed_error!("Metadata RVA cannot be zero"));
        }

        let meta_data_size = parser.read_le::<u32>()?;
        if meta_data_size == 0 {
            return Err(malformed_error!("Metadata size cannot be zero"));
        }

        let flags = parser.read_le::<u32>()?;
        if flags & !VALID_FLAGS != 0 {
            return Err(malformed_error!(
                "Invalid CLR flags: 0x{:08X} contains undefined bits",
                flags
            ));
        }

        let entry_point_token = parser.read_le::<u32>()?;

        let resource_rva = parser.read_le::<u32>()?;
        let resource_size = parser.read_le::<u32>()?;
        if (resource_rva == 0) != (resource_size == 0) {
            return Err(malformed_error!("Resource values are invalid"));
        }

        let strong_name_signature_rva = parser.read_le::<u32>()?;
        let strong_name_signature_size = parser.read_le::<u32>()?;
        if (strong_name_signature_rva == 0) != (strong_name_signature_size == 0) {
            return Err(malformed_error!("Strong name values are invalid"));
        }

        // Code manager table, reserved
        if parser.read_le::<u64>()? != 0 {
            return Err(malformed_error!(
                "Code Manager Table fields must be zero (reserved)"
            ));
        }

        let vtable_fixups_rva = parser.read_le::<u32>()?;
        let vtable_fixups_size = parser.read_le::<u32>()?;
        if (vtable_fixups_rva == 0) != (vtable_fixups_size == 0) {
            return Err(malformed_error!("VTable fixups are invalid"));
        }

        Ok(Cor20Header {
            cb,
            major_runtime_version,
            minor_runtime_version,
            meta_data_rva,
            meta_data_size,
            flags,
            entry_point_token,
            resource_rva,
            resource_size,
            strong_name_signature_rva,
            strong_name_signature_size,
        })
    }

    /// `true` if the image claims a strong name signature.
    #[must_use]
    pub fn is_strong_name_signed(&self) -> bool {
        self.flags & Self::FLAG_STRONG_NAME_SIGNED != 0
    }
}
