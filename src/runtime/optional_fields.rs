//! Optional fields of runtime type descriptors.
//!
//! Rarely used descriptor fields are stored out of line as a compact tagged list. Every
//! present field is written in tag order as one tag byte followed by the value as an unsigned
//! LEB128 integer. The tag byte of the last field carries the `0x80` end marker. A set without
//! fields encodes to nothing.
//!
//! ```text
//! { DispatchMap: 300, NullableValueOffset: 0 }  =>  02 AC 02 85 00
//! ```

use std::fmt;

use strum::{EnumCount, EnumIter, IntoEnumIterator};

use crate::{
    file::{
        io::{encoded_7bit_len, write_7bit_encoded_int},
        parser::Parser,
    },
    Result,
};

/// End-of-list marker in a tag byte.
pub const LAST_FIELD_FLAG: u8 = 0x80;

/// Identifies an optional field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumCount, EnumIter)]
#[repr(u8)]
pub enum OptionalFieldTag {
    /// Rarely set type flags
    RareFlags = 0,
    /// Slot of `ICastable.IsInstanceOfInterface`
    ICastableIsInstSlot = 1,
    /// Offset of the dispatch map
    DispatchMap = 2,
    /// Padding of value type fields when boxed
    ValueTypeFieldPadding = 3,
    /// Slot of `ICastable.GetImplType`
    ICastableGetImplTypeSlot = 4,
    /// Offset of the value in `Nullable<T>`
    NullableValueOffset = 5,
}

impl OptionalFieldTag {
    /// The tag with index `index`.
    #[must_use]
    pub fn from_index(index: u8) -> Option<Self> {
        Self::iter().find(|tag| *tag as u8 == index)
    }
}

/// The optional fields of one type, at most one value per tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct OptionalFieldSet {
    fields: [Option<u32>; OptionalFieldTag::COUNT],
}

impl OptionalFieldSet {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `tag` to `value`, replacing an earlier value.
    pub fn set_field(&mut self, tag: OptionalFieldTag, value: u32) {
        self.fields[tag as usize] = Some(value);
    }

    /// Removes `tag`.
    pub fn clear_field(&mut self, tag: OptionalFieldTag) {
        self.fields[tag as usize] = None;
    }

    /// The value of `tag`, `default` if absent.
    #[must_use]
    pub fn field_value(&self, tag: OptionalFieldTag, default: u32) -> u32 {
        self.fields[tag as usize].unwrap_or(default)
    }

    /// True if any tag is present.
    #[must_use]
    pub fn is_any_field_used(&self) -> bool {
        self.fields.iter().any(Option::is_some)
    }

    /// Present tags and their values, in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (OptionalFieldTag, u32)> + '_ {
        OptionalFieldTag::iter()
            .filter_map(|tag| self.fields[tag as usize].map(|value| (tag, value)))
    }

    /// Size of the encoding in bytes.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.iter()
            .map(|(_, value)| 1 + encoded_7bit_len(value))
            .sum()
    }

    /// Encodes the set.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let Some(last) = self.iter().last().map(|(tag, _)| tag) else {
            return Vec::new();
        };

        let mut out = Vec::with_capacity(self.encoded_len());
        for (tag, value) in self.iter() {
            let mut tag_byte = tag as u8;
            if tag == last {
                tag_byte |= LAST_FIELD_FLAG;
            }
            out.push(tag_byte);
            write_7bit_encoded_int(&mut out, value);
        }
        out
    }

    /// Encodes the set, consuming it.
    #[must_use]
    pub fn freeze(self) -> FrozenOptionalFields {
        FrozenOptionalFields(self.encode())
    }

    /// Decodes a complete encoding.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for unknown, repeated or unordered tags, a missing
    /// end marker, trailing bytes or invalid integers, and [`crate::Error::OutOfBounds`] for
    /// truncated input.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut set = OptionalFieldSet::new();
        let mut parser = Parser::new(data);
        let mut previous: Option<OptionalFieldTag> = None;

        while parser.has_more_data() {
            let tag_byte = parser.read_le::<u8>()?;
            let index = tag_byte & !LAST_FIELD_FLAG;

            let Some(tag) = OptionalFieldTag::from_index(index) else {
                return Err(malformed_error!("Unknown optional field tag - {}", index));
            };
            if previous.is_some_and(|previous| previous >= tag) {
                return Err(malformed_error!(
                    "Optional field tags out of order - {:?}",
                    tag
                ));
            }

            set.set_field(tag, parser.read_7bit_encoded_int()?);
            previous = Some(tag);

            if tag_byte & LAST_FIELD_FLAG != 0 {
                if parser.has_more_data() {
                    return Err(malformed_error!(
                        "Trailing data after last optional field - {} bytes",
                        parser.remaining()
                    ));
                }
                return Ok(set);
            }
        }

        if previous.is_some() {
            return Err(malformed_error!("Optional fields are not terminated"));
        }
        Ok(set)
    }
}

impl fmt::Display for OptionalFieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, value) in self.fields.iter().enumerate() {
            if index > 0 {
                f.write_str("_")?;
            }
            match value {
                Some(value) => write!(f, "{value}")?,
                None => f.write_str("x")?,
            }
        }
        Ok(())
    }
}

/// The encoding of an [`OptionalFieldSet`], no longer modifiable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrozenOptionalFields(Vec<u8>);

impl FrozenOptionalFields {
    /// Encoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encoded length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no field was present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The encoded bytes.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OptionalFieldTag::*;

    #[test]
    fn empty_set() {
        let set = OptionalFieldSet::new();
        assert!(!set.is_any_field_used());
        assert!(set.encode().is_empty());
        assert!(set.freeze().is_empty());
        assert_eq!(OptionalFieldSet::decode(&[]).unwrap(), OptionalFieldSet::new());
    }

    #[test]
    fn encode_two_fields() {
        let mut set = OptionalFieldSet::new();
        set.set_field(NullableValueOffset, 0);
        set.set_field(DispatchMap, 300);

        assert!(set.is_any_field_used());
        assert_eq!(set.encode(), [0x02, 0xAC, 0x02, 0x85, 0x00]);
        assert_eq!(
            OptionalFieldSet::decode(&[0x02, 0xAC, 0x02, 0x85, 0x00]).unwrap(),
            set
        );
    }

    #[test]
    fn single_field_is_last() {
        let mut set = OptionalFieldSet::new();
        set.set_field(RareFlags, 1);
        assert_eq!(set.encode(), [0x80, 0x01]);

        set.set_field(RareFlags, 0x7F);
        assert_eq!(set.encode(), [0x80, 0x7F]);

        set.clear_field(RareFlags);
        set.set_field(ICastableGetImplTypeSlot, u32::MAX);
        assert_eq!(set.encode(), [0x84, 0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
    }

    #[test]
    fn field_values() {
        let mut set = OptionalFieldSet::new();
        assert_eq!(set.field_value(ValueTypeFieldPadding, 7), 7);

        set.set_field(ValueTypeFieldPadding, 3);
        assert_eq!(set.field_value(ValueTypeFieldPadding, 7), 3);

        set.clear_field(ValueTypeFieldPadding);
        assert!(!set.is_any_field_used());
    }

    #[test]
    fn display() {
        let mut set = OptionalFieldSet::new();
        set.set_field(DispatchMap, 300);
        set.set_field(NullableValueOffset, 0);
        assert_eq!(set.to_string(), "x_x_300_x_x_0");
    }

    #[test]
    fn decode_rejects() {
        // unknown tag
        assert!(OptionalFieldSet::decode(&[0x86, 0x00]).is_err());
        // out of order
        assert!(OptionalFieldSet::decode(&[0x02, 0x00, 0x81, 0x00]).is_err());
        // repeated
        assert!(OptionalFieldSet::decode(&[0x02, 0x00, 0x82, 0x00]).is_err());
        // no end marker
        assert!(OptionalFieldSet::decode(&[0x02, 0x00]).is_err());
        // trailing bytes
        assert!(OptionalFieldSet::decode(&[0x82, 0x00, 0x00]).is_err());
        // truncated integer
        assert!(OptionalFieldSet::decode(&[0x82, 0xAC]).is_err());
    }

    #[test]
    fn tags_by_index() {
        assert_eq!(OptionalFieldTag::from_index(3), Some(ValueTypeFieldPadding));
        assert_eq!(OptionalFieldTag::from_index(6), None);
        assert_eq!(OptionalFieldTag::COUNT, 6);
    }
}
