use crate::{file::parser::Parser, Result};

/// The `#Blob` heap: length-prefixed byte sequences addressed by byte offset.
///
/// Lengths use the ECMA-335 compressed unsigned integer encoding.
pub struct Blob<'a> {
    data: &'a [u8],
}

impl<'a> Blob<'a> {
    /// Wraps heap data. The first byte of a valid heap is always zero.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an empty or invalid heap.
    pub fn from(data: &'a [u8]) -> Result<Blob<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Invalid memory for #Blob heap"));
        }

        Ok(Blob { data })
    }

    /// Returns the blob starting at byte offset `index`, without its length prefix.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob exceeds the heap.
    pub fn get(&self, index: usize) -> Result<&'a [u8]> {
        if index >= self.data.len() {
            return Err(out_of_bounds_error!());
        }

        let mut parser = Parser::new(&self.data[index..]);
        let len = parser.read_compressed_uint()? as usize;
        parser.read_bytes(len)
    }
}
