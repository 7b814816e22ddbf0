use strum::{EnumCount, EnumIter, IntoEnumIterator};

/// Identifiers of the ECMA-335 metadata tables that can appear in a module's `#~` stream.
///
/// The discriminant is the table number, which is also the bit position in the tables
/// header `valid` mask and the high byte of a [`crate::metadata::token::Token`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord, EnumIter, EnumCount)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum TableId {
    Module = 0x00,
    TypeRef = 0x01,
    TypeDef = 0x02,
    FieldPtr = 0x03,
    Field = 0x04,
    MethodPtr = 0x05,
    MethodDef = 0x06,
    ParamPtr = 0x07,
    Param = 0x08,
    InterfaceImpl = 0x09,
    MemberRef = 0x0A,
    Constant = 0x0B,
    CustomAttribute = 0x0C,
    FieldMarshal = 0x0D,
    DeclSecurity = 0x0E,
    ClassLayout = 0x0F,
    FieldLayout = 0x10,
    StandAloneSig = 0x11,
    EventMap = 0x12,
    EventPtr = 0x13,
    Event = 0x14,
    PropertyMap = 0x15,
    PropertyPtr = 0x16,
    Property = 0x17,
    MethodSemantics = 0x18,
    MethodImpl = 0x19,
    ModuleRef = 0x1A,
    TypeSpec = 0x1B,
    ImplMap = 0x1C,
    FieldRVA = 0x1D,
    EncLog = 0x1E,
    EncMap = 0x1F,
    Assembly = 0x20,
    AssemblyProcessor = 0x21,
    AssemblyOS = 0x22,
    AssemblyRef = 0x23,
    AssemblyRefProcessor = 0x24,
    AssemblyRefOS = 0x25,
    File = 0x26,
    ExportedType = 0x27,
    ManifestResource = 0x28,
    NestedClass = 0x29,
    GenericParam = 0x2A,
    MethodSpec = 0x2B,
    GenericParamConstraint = 0x2C,
}

impl TableId {
    /// Looks up the table with number `value`.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<TableId> {
        TableId::iter().find(|table| *table as u8 == value)
    }

    /// Bit mask of every table number this enum knows about.
    #[must_use]
    pub fn known_mask() -> u64 {
        TableId::iter().fold(0, |mask, table| mask | (1u64 << table as u8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbering() {
        assert_eq!(TableId::COUNT, 0x2D);
        assert_eq!(TableId::from_u8(0x20), Some(TableId::Assembly));
        assert_eq!(TableId::from_u8(0x02), Some(TableId::TypeDef));
        assert_eq!(TableId::from_u8(0x2D), None);
        assert_eq!(TableId::known_mask(), (1u64 << 0x2D) - 1);
    }
}
