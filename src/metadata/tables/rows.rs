use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        tables::{TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// A raw row of the `Module` table (0x00), heap indexes unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Reserved, zero
    pub generation: u32,
    /// `#Strings` index of the module name
    pub name: u32,
    /// `#GUID` index of the module version id
    pub mvid: u32,
    /// `#GUID` index, reserved
    pub encid: u32,
    /// `#GUID` index, reserved
    pub encbaseid: u32,
}

impl ModuleRaw {
    /// Reads the row at `offset`, advancing it past the row.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated table data.
    pub fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(ModuleRaw {
            rid,
            token: Token::from_parts(TableId::Module, rid),
            generation: u32::from(read_le_at::<u16>(data, offset)?),
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            mvid: read_le_at_dyn(data, offset, sizes.is_large_guid())?,
            encid: read_le_at_dyn(data, offset, sizes.is_large_guid())?,
            encbaseid: read_le_at_dyn(data, offset, sizes.is_large_guid())?,
        })
    }
}

/// A raw row of the `Assembly` table (0x20), heap indexes unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// `AssemblyHashAlgorithm` of the manifest
    pub hash_alg_id: u32,
    #[allow(missing_docs)]
    pub major_version: u16,
    #[allow(missing_docs)]
    pub minor_version: u16,
    #[allow(missing_docs)]
    pub build_number: u16,
    #[allow(missing_docs)]
    pub revision_number: u16,
    /// `AssemblyFlags` bits
    pub flags: u32,
    /// `#Blob` index of the public key
    pub public_key: u32,
    /// `#Strings` index of the simple name
    pub name: u32,
    /// `#Strings` index of the culture
    pub culture: u32,
}

impl AssemblyRaw {
    /// Reads the row at `offset`, advancing it past the row.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated table data.
    pub fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(AssemblyRaw {
            rid,
            token: Token::from_parts(TableId::Assembly, rid),
            hash_alg_id: read_le_at::<u32>(data, offset)?,
            major_version: read_le_at::<u16>(data, offset)?,
            minor_version: read_le_at::<u16>(data, offset)?,
            build_number: read_le_at::<u16>(data, offset)?,
            revision_number: read_le_at::<u16>(data, offset)?,
            flags: read_le_at::<u32>(data, offset)?,
            public_key: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            culture: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted_assembly() {
        #[rustfmt::skip]
        let data = [
            0x04, 0x80, 0x00, 0x00, // hash_alg_id
            0x01, 0x00,             // major_version
            0x02, 0x00,             // minor_version
            0x03, 0x00,             // build_number
            0x04, 0x00,             // revision_number
            0x01, 0x00, 0x00, 0x00, // flags
            0x01, 0x00,             // public_key
            0x0A, 0x00,             // name
            0x00, 0x00,             // culture
        ];

        let sizes = TableInfo::from_rows(&[(TableId::Assembly, 1)], false, false, false);
        let mut offset = 0;
        let row = AssemblyRaw::row_read(&data, &mut offset, 1, &sizes).unwrap();

        assert_eq!(offset, 22);
        assert_eq!(row.token.value(), 0x2000_0001);
        assert_eq!(row.hash_alg_id, 0x8004);
        assert_eq!(
            (row.major_version, row.minor_version, row.build_number, row.revision_number),
            (1, 2, 3, 4)
        );
        assert_eq!(row.flags, 1);
        assert_eq!(row.public_key, 1);
        assert_eq!(row.name, 0x0A);
        assert_eq!(row.culture, 0);
    }

    #[test]
    fn crafted_module_large_str() {
        #[rustfmt::skip]
        let data = [
            0x00, 0x00,             // generation
            0x10, 0x00, 0x01, 0x00, // name
            0x01, 0x00,             // mvid
            0x00, 0x00,             // encid
            0x00, 0x00,             // encbaseid
        ];

        let sizes = TableInfo::from_rows(&[(TableId::Module, 1)], true, false, false);
        let mut offset = 0;
        let row = ModuleRaw::row_read(&data, &mut offset, 1, &sizes).unwrap();

        assert_eq!(offset, 12);
        assert_eq!(row.name, 0x0001_0010);
        assert_eq!(row.mvid, 1);
        assert_eq!(row.token.value(), 0x0000_0001);

        let mut offset = 4;
        assert!(ModuleRaw::row_read(&data, &mut offset, 1, &sizes).is_err());
    }
}
