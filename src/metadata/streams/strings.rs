use std::{ffi::CStr, str};

use crate::Result;

/// The `#Strings` heap: null-terminated UTF-8 identifiers addressed by byte offset.
pub struct Strings<'a> {
    data: &'a [u8],
}

impl<'a> Strings<'a> {
    /// Wraps heap data. The first byte of a valid heap is always zero.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an empty or invalid heap.
    pub fn from(data: &'a [u8]) -> Result<Strings<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Provided #String heap is empty"));
        }

        Ok(Strings { data })
    }

    /// Returns the string starting at byte offset `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `index` is outside the heap and
    /// [`crate::Error::Malformed`] for unterminated or non-UTF-8 strings.
    pub fn get(&self, index: usize) -> Result<&'a str> {
        if index >= self.data.len() {
            return Err(out_of_bounds_error!());
        }

        CStr::from_bytes_until_nul(&self.data[index..])
            .ok()
            .and_then(|result| result.to_str().ok())
            .ok_or_else(|| malformed_error!("Invalid string at index - {}", index))
    }
}
