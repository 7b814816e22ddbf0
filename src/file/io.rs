//! Little-endian reading and variable-length integer writing utilities.
//!
//! Everything in a PE/CLI container is little-endian, so only the little-endian direction is
//! provided for fixed-size values. Variable-length integers are written in the 7-bit group
//! encoding (least significant group first, `0x80` continuation bit) that the runtime's
//! optional-field decoder expects; [`crate::file::parser::Parser::read_7bit_encoded_int`] is
//! the matching reader.

use crate::{Error::OutOfBounds, Result};

/// Trait for implementing type-specific safe binary data reading operations.
///
/// Implemented for the unsigned integer widths that appear in container headers and
/// metadata tables.
pub trait CilIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_cil_io {
    ($($ty:ty => $len:expr),* $(,)?) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_cil_io!(u8 => 1, u16 => 2, u32 => 4, u64 => 8);

/// Safely reads a value of type `T` in little-endian byte order from the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le<T: CilIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a value of type `T` in little-endian byte order at `offset`, advancing the
/// offset by the size of `T`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };

    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}

/// Reads a 2-byte or 4-byte little-endian value, promoting the short form to `u32`.
///
/// Metadata table columns are 2 or 4 bytes wide depending on heap and table sizes.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at_dyn(data: &[u8], offset: &mut usize, is_large: bool) -> Result<u32> {
    let res = if is_large {
        read_le_at::<u32>(data, offset)?
    } else {
        u32::from(read_le_at::<u16>(data, offset)?)
    };

    Ok(res)
}

/// Appends `value` in the 7-bit group encoding: low 7 bits first, `0x80` set on every byte
/// that is followed by another.
///
/// # Examples
///
/// ```rust,ignore
/// use dotbind::file::io::write_7bit_encoded_int;
///
/// let mut out = Vec::new();
/// write_7bit_encoded_int(&mut out, 300);
/// assert_eq!(out, [0xAC, 0x02]);
/// ```
pub fn write_7bit_encoded_int(out: &mut Vec<u8>, value: u32) {
    let mut remaining = value;
    while remaining >= 0x80 {
        #[allow(clippy::cast_possible_truncation)]
        out.push((remaining as u8 & 0x7F) | 0x80);
        remaining >>= 7;
    }

    #[allow(clippy::cast_possible_truncation)]
    out.push(remaining as u8);
}

/// Number of bytes [`write_7bit_encoded_int`] emits for `value`.
#[must_use]
pub fn encoded_7bit_len(value: u32) -> usize {
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0x0FFF_FFFF => 4,
        _ => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_BUFFER: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

    #[test]
    fn read_le_widths() {
        assert_eq!(read_le::<u8>(&TEST_BUFFER).unwrap(), 0x01);
        assert_eq!(read_le::<u16>(&TEST_BUFFER).unwrap(), 0x0201);
        assert_eq!(read_le::<u32>(&TEST_BUFFER).unwrap(), 0x0403_0201);
        assert_eq!(read_le::<u64>(&TEST_BUFFER).unwrap(), 0x0807_0605_0403_0201);
    }

    #[test]
    fn read_le_at_advances() {
        let mut offset = 2;
        let value = read_le_at::<u16>(&TEST_BUFFER, &mut offset).unwrap();
        assert_eq!(value, 0x0403);
        assert_eq!(offset, 4);
    }

    #[test]
    fn read_le_at_out_of_bounds() {
        let mut offset = 6;
        assert!(matches!(
            read_le_at::<u32>(&TEST_BUFFER, &mut offset),
            Err(OutOfBounds)
        ));
        assert_eq!(offset, 6);

        let mut offset = usize::MAX;
        assert!(read_le_at::<u8>(&TEST_BUFFER, &mut offset).is_err());
    }

    #[test]
    fn read_dyn() {
        let mut offset = 0;
        assert_eq!(read_le_at_dyn(&TEST_BUFFER, &mut offset, false).unwrap(), 0x0201);
        assert_eq!(read_le_at_dyn(&TEST_BUFFER, &mut offset, true).unwrap(), 0x0605_0403);
        assert_eq!(offset, 6);
    }

    #[test]
    fn write_7bit_groups() {
        let cases: [(u32, &[u8]); 6] = [
            (0, &[0x00]),
            (0x7F, &[0x7F]),
            (0x80, &[0x80, 0x01]),
            (300, &[0xAC, 0x02]),
            (0x3FFF, &[0xFF, 0x7F]),
            (u32::MAX, &[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]),
        ];

        for (value, expected) in cases {
            let mut out = Vec::new();
            write_7bit_encoded_int(&mut out, value);
            assert_eq!(out, expected, "value {value:#x}");
            assert_eq!(encoded_7bit_len(value), expected.len());
        }
    }
}
