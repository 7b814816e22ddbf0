use crate::{file::io::read_le, Result};

/// Stream names a metadata root may carry.
///
/// `#-` is the uncompressed (edit-and-continue) table stream, `#Pdb` and `#JTD` appear in
/// portable symbol files and in images produced by some obfuscators.
pub const VALID_STREAM_NAMES: [&str; 8] = [
    "#Strings", "#US", "#Blob", "#GUID", "#~", "#-", "#Pdb", "#JTD",
];

/// A stream header of the metadata root, ECMA-335 II.24.2.2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Offset of the stream, relative to the metadata root
    pub offset: u32,
    /// Size of the stream in bytes
    pub size: u32,
    /// Name of the stream
    pub name: String,
}

impl StreamHeader {
    /// Reads a stream header from the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated input and
    /// [`crate::Error::Malformed`] for unterminated or unknown names.
    pub fn from(data: &[u8]) -> Result<StreamHeader> {
        if data.len() < 9 {
            return Err(out_of_bounds_error!());
        }

        let name_area = &data[8..data.len().min(8 + 32)];
        let Some(name_len) = name_area.iter().position(|byte| *byte == 0) else {
            return Err(malformed_error!("Stream header name is not terminated"));
        };

        let name = String::from_utf8_lossy(&name_area[..name_len]).into_owned();
        if !VALID_STREAM_NAMES.contains(&name.as_str()) {
            return Err(malformed_error!("Invalid stream header name - {}", name));
        }

        Ok(StreamHeader {
            offset: read_le::<u32>(data)?,
            size: read_le::<u32>(&data[4..])?,
            name,
        })
    }

    /// Size of this header on disk, name padded to a 4-byte boundary.
    #[must_use]
    pub fn header_len(&self) -> usize {
        8 + ((self.name.len() + 1 + 3) & !3)
    }
}
