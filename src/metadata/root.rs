//! The metadata root, ECMA-335 II.24.2.1.
//!
//! The root starts with the `BSJB` signature, carries the runtime version string and the
//! directory of metadata streams. Stream offsets are relative to the start of the root.

use crate::{
    file::parser::Parser,
    metadata::streams::StreamHeader,
    Result,
};

/// Signature of the metadata root, `BSJB` in little-endian.
pub const CIL_HEADER_MAGIC: u32 = 0x424A_5342;

/// The parsed metadata root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    /// Major version, 1
    pub major_version: u16,
    /// Minor version, 1
    pub minor_version: u16,
    /// Runtime version string, e.g. `v4.0.30319`
    pub version: String,
    /// Reserved flags
    pub flags: u16,
    /// Stream directory in declaration order
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Parses the root at the start of `data`, which must span the whole metadata.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a wrong signature, duplicate streams or
    /// streams exceeding the metadata, and [`crate::Error::OutOfBounds`] for truncated input.
    pub fn read(data: &[u8]) -> Result<Root> {
        let mut parser = Parser::new(data);

        let signature = parser.read_le::<u32>()?;
        if signature != CIL_HEADER_MAGIC {
            return Err(malformed_error!(
                "CIL_HEADER_MAGIC does not match - {}",
                signature
            ));
        }

        let major_version = parser.read_le::<u16>()?;
        let minor_version = parser.read_le::<u16>()?;
        let _reserved = parser.read_le::<u32>()?;

        let version_length = parser.read_le::<u32>()? as usize;
        if version_length > 255 {
            return Err(malformed_error!(
                "Version string length exceeds 255 - {}",
                version_length
            ));
        }

        let version_bytes = parser.read_bytes(version_length)?;
        let version_end = version_bytes
            .iter()
            .position(|byte| *byte == 0)
            .unwrap_or(version_bytes.len());
        let version = String::from_utf8_lossy(&version_bytes[..version_end]).into_owned();

        let flags = parser.read_le::<u16>()?;
        let stream_count = parser.read_le::<u16>()?;
        if stream_count == 0 {
            return Err(malformed_error!("No valid streams have been found"));
        }

        let mut stream_headers: Vec<StreamHeader> = Vec::with_capacity(stream_count as usize);
        for _ in 0..stream_count {
            let header = StreamHeader::from(&data[parser.pos()..])?;

            let in_bounds = header
                .offset
                .checked_add(header.size)
                .is_some_and(|end| end as usize <= data.len());
            if !in_bounds {
                return Err(malformed_error!(
                    "Stream {} exceeds the metadata - {} + {}",
                    header.name,
                    header.offset,
                    header.size
                ));
            }

            if stream_headers.iter().any(|known| known.name == header.name) {
                return Err(malformed_error!("Duplicate stream - {}", header.name));
            }

            parser.advance_by(header.header_len())?;
            stream_headers.push(header);
        }

        Ok(Root {
            major_version,
            minor_version,
            version,
            flags,
            stream_headers,
        })
    }

    /// The slice of `metadata` covered by the stream named `name`.
    #[must_use]
    pub fn stream<'a>(&self, metadata: &'a [u8], name: &str) -> Option<&'a [u8]> {
        let header = self.stream_headers.iter().find(|header| header.name == name)?;
        let start = header.offset as usize;
        metadata.get(start..start + header.size as usize)
    }

    /// The table stream, compressed (`#~`) or uncompressed (`#-`).
    #[must_use]
    pub fn tables_stream<'a>(&self, metadata: &'a [u8]) -> Option<&'a [u8]> {
        self.stream(metadata, "#~")
            .or_else(|| self.stream(metadata, "#-"))
    }
}
