//! Cursor-based binary parser for container headers, heaps and encoded byte streams.
//!
//! [`Parser`] walks a borrowed byte slice, bounds-checking every read. Besides fixed-size
//! little-endian values it understands the two variable-length integer encodings this crate
//! deals with: the ECMA-335 compressed unsigned integer used for blob lengths, and the 7-bit
//! group encoding used by the runtime type optional-field stream.

use crate::{
    file::io::{read_le_at, CilIO},
    Result,
};

/// A generic binary data parser.
///
/// The parser maintains an internal position cursor and validates data availability on
/// every read, so malformed or truncated input surfaces as an error instead of a panic.
///
/// # Examples
///
/// ```rust,no_run
/// use dotbind::Parser;
///
/// let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
/// let mut parser = Parser::new(&data);
///
/// let first = parser.read_le::<u32>()?;
/// assert_eq!(first, 0x04030201);
///
/// parser.seek(6)?;
/// assert_eq!(parser.read_le::<u16>()?, 0x0807);
/// # Ok::<(), dotbind::Error>(())
/// ```
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`Parser`] from a byte slice.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if the cursor is before the end of the data buffer.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Number of bytes between the cursor and the end of the buffer.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Current cursor position.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Move the cursor to `pos`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Move the cursor forward by `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the new position would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        let end = self.calc_end_position(step)?;
        self.position = end;
        Ok(())
    }

    /// Read a type `T` in little-endian format and advance the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length.
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read a compressed unsigned integer as defined in ECMA-335 II.23.2.
    ///
    /// - Values 0-127: 1 byte (0xxxxxxx)
    /// - Values 128-16383: 2 bytes (10xxxxxx xxxxxxxx)
    /// - Values 16384-536870911: 4 bytes (110xxxxx xxxxxxxx xxxxxxxx xxxxxxxx)
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length or
    /// [`crate::Error::Malformed`] for an invalid lead byte.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use dotbind::Parser;
    ///
    /// let mut parser = Parser::new(&[0x80, 0x80]);
    /// assert_eq!(parser.read_compressed_uint()?, 128);
    /// # Ok::<(), dotbind::Error>(())
    /// ```
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let first_byte = self.read_le::<u8>()?;

        if (first_byte & 0x80) == 0 {
            return Ok(u32::from(first_byte));
        }

        if (first_byte & 0xC0) == 0x80 {
            let second_byte = self.read_le::<u8>()?;
            return Ok(((u32::from(first_byte) & 0x3F) << 8) | u32::from(second_byte));
        }

        if (first_byte & 0xE0) == 0xC0 {
            let b1 = u32::from(self.read_le::<u8>()?);
            let b2 = u32::from(self.read_le::<u8>()?);
            let b3 = u32::from(self.read_le::<u8>()?);
            return Ok(((u32::from(first_byte) & 0x1F) << 24) | (b1 << 16) | (b2 << 8) | b3);
        }

        Err(malformed_error!("Invalid compressed uint - {}", first_byte))
    }

    /// Read a 7-bit group encoded unsigned integer.
    ///
    /// Each byte carries 7 value bits, least significant group first; bit `0x80` marks that
    /// another byte follows. At most five bytes are accepted and the fifth may only carry the
    /// top four bits of a `u32`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated input or
    /// [`crate::Error::Malformed`] when the value does not fit into a `u32` or ends in a
    /// redundant zero group.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use dotbind::Parser;
    ///
    /// let mut parser = Parser::new(&[0xAC, 0x02]);
    /// assert_eq!(parser.read_7bit_encoded_int()?, 300);
    /// # Ok::<(), dotbind::Error>(())
    /// ```
    pub fn read_7bit_encoded_int(&mut self) -> Result<u32> {
        let mut value = 0u32;
        let mut shift = 0u32;

        loop {
            let byte = self.read_le::<u8>()?;

            if shift == 28 && (byte & 0x70) != 0 {
                return Err(malformed_error!(
                    "7-bit encoded integer overflow: value exceeds u32 capacity"
                ));
            }

            value |= u32::from(byte & 0x7F) << shift;

            if (byte & 0x80) == 0 {
                if byte == 0 && shift > 0 {
                    return Err(malformed_error!(
                        "7-bit encoded integer is not minimally encoded"
                    ));
                }
                return Ok(value);
            }

            shift += 7;
            if shift > 28 {
                return Err(malformed_error!(
                    "7-bit encoded integer overflow: more than 5 bytes"
                ));
            }
        }
    }

    /// Read `length` bytes and advance past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = self.calc_end_position(length)?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    fn calc_end_position(&self, length: usize) -> Result<usize> {
        match self.position.checked_add(length) {
            Some(end) if end <= self.data.len() => Ok(end),
            _ => Err(out_of_bounds_error!()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn read_le_and_seek() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_le::<u16>().unwrap(), 0x0201);
        assert_eq!(parser.pos(), 2);
        assert_eq!(parser.remaining(), 2);

        parser.seek(4).unwrap();
        assert!(!parser.has_more_data());
        assert!(parser.seek(5).is_err());
        assert!(parser.read_le::<u8>().is_err());
    }

    #[test]
    fn compressed_uint() {
        let test_cases: [(&[u8], u32); 5] = [
            (&[0x03], 3),
            (&[0x7F], 0x7F),
            (&[0x80, 0x80], 0x80),
            (&[0xBF, 0xFF], 0x3FFF),
            (&[0xC0, 0x00, 0x40, 0x00], 0x4000),
        ];

        for (input, expected) in test_cases {
            let mut parser = Parser::new(input);
            assert_eq!(parser.read_compressed_uint().unwrap(), expected);
            assert!(!parser.has_more_data());
        }

        let mut parser = Parser::new(&[0xFF]);
        assert!(matches!(
            parser.read_compressed_uint(),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn seven_bit_encoded() {
        let test_cases: [(&[u8], u32); 5] = [
            (&[0x00], 0),
            (&[0x7F], 127),
            (&[0x80, 0x01], 128),
            (&[0xAC, 0x02], 300),
            (&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F], u32::MAX),
        ];

        for (input, expected) in test_cases {
            let mut parser = Parser::new(input);
            assert_eq!(parser.read_7bit_encoded_int().unwrap(), expected);
            assert_eq!(parser.pos(), input.len());
        }
    }

    #[test]
    fn seven_bit_encoded_errors() {
        let mut parser = Parser::new(&[0x80]);
        assert!(matches!(
            parser.read_7bit_encoded_int(),
            Err(Error::OutOfBounds)
        ));

        let mut parser = Parser::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x1F]);
        assert!(matches!(
            parser.read_7bit_encoded_int(),
            Err(Error::Malformed { .. })
        ));

        let mut parser = Parser::new(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x00]);
        assert!(matches!(
            parser.read_7bit_encoded_int(),
            Err(Error::Malformed { .. })
        ));

        let mut parser = Parser::new(&[0x80, 0x00]);
        assert!(matches!(
            parser.read_7bit_encoded_int(),
            Err(Error::Malformed { .. })
        ));

        let mut parser = Parser::new(&[0xAC, 0x82, 0x00]);
        assert!(matches!(
            parser.read_7bit_encoded_int(),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn read_bytes() {
        let mut parser = Parser::new(b"\x05Hello\x01\x02");

        let len = parser.read_le::<u8>().unwrap() as usize;
        assert_eq!(parser.read_bytes(len).unwrap(), b"Hello");
        assert_eq!(parser.read_bytes(2).unwrap(), &[0x01, 0x02]);
        assert!(parser.read_bytes(1).is_err());
        assert!(!parser.has_more_data());
    }
}
