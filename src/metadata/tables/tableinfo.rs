use strum::{EnumCount, IntoEnumIterator};

use crate::{
    file::io::{read_le, read_le_at},
    metadata::tables::{CodedIndexType, TableId},
    Result,
};

/// Row count of a single table, plus the number of bits needed to index it.
#[derive(Clone, Copy, Default, PartialEq, Debug)]
pub struct TableRowInfo {
    /// Number of rows
    pub rows: u32,
    /// Bits needed to store any row index of this table
    pub bits: u8,
}

impl TableRowInfo {
    /// Creates the row information for a table with `rows` rows.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(rows: u32) -> Self {
        let bits = if rows == 0 {
            1
        } else {
            (32 - rows.leading_zeros()) as u8
        };

        Self { rows, bits }
    }
}

/// Row counts and column widths of a module's metadata tables.
///
/// Column widths in ECMA-335 tables are not fixed: heap indexes are 2 or 4 bytes depending on
/// the `HeapSizes` flags, simple table indexes grow to 4 bytes once the target table has 2^16
/// rows or more, and coded indexes grow once the largest referenced table no longer fits into
/// the bits left over by the tag.
#[derive(Clone, Default, Debug)]
pub struct TableInfo {
    rows: Vec<TableRowInfo>,
    coded_indexes: Vec<u8>,
    is_large_index_str: bool,
    is_large_index_guid: bool,
    is_large_index_blob: bool,
}

impl TableInfo {
    /// Reads the row counts that follow the 24-byte tables header in `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated input and
    /// [`crate::Error::NotSupported`] if `valid_bitvec` names tables this crate does not know.
    pub fn new(data: &[u8], valid_bitvec: u64) -> Result<Self> {
        if valid_bitvec & !TableId::known_mask() != 0 {
            return Err(crate::Error::NotSupported);
        }

        let mut table_info = vec![TableRowInfo::default(); TableId::COUNT];
        let mut next_row_offset = 24;

        for table_id in TableId::iter() {
            if (valid_bitvec & (1 << table_id as u8)) == 0 {
                continue;
            }

            let row_count = read_le_at::<u32>(data, &mut next_row_offset)?;
            table_info[table_id as usize] = TableRowInfo::new(row_count);
        }

        let heap_size_flags = read_le::<u8>(data.get(6..).ok_or(out_of_bounds_error!())?)?;
        let mut table_info = TableInfo {
            rows: table_info,
            coded_indexes: vec![0; CodedIndexType::COUNT],
            is_large_index_str: heap_size_flags & 1 == 1,
            is_large_index_guid: heap_size_flags & 2 == 2,
            is_large_index_blob: heap_size_flags & 4 == 4,
        };

        table_info.calculate_coded_index_bits();

        Ok(table_info)
    }

    /// Builds table information from explicit row counts.
    #[must_use]
    pub fn from_rows(
        valid_tables: &[(TableId, u32)],
        large_str: bool,
        large_guid: bool,
        large_blob: bool,
    ) -> Self {
        let mut table_info = TableInfo {
            rows: vec![TableRowInfo::default(); TableId::COUNT],
            coded_indexes: vec![0; CodedIndexType::COUNT],
            is_large_index_str: large_str,
            is_large_index_guid: large_guid,
            is_large_index_blob: large_blob,
        };

        for (table, rows) in valid_tables {
            table_info.rows[*table as usize] = TableRowInfo::new(*rows);
        }

        table_info.calculate_coded_index_bits();
        table_info
    }

    /// Row information of `table`.
    #[must_use]
    pub fn get(&self, table: TableId) -> &TableRowInfo {
        &self.rows[table as usize]
    }

    /// Number of rows in `table`.
    #[must_use]
    pub fn rows(&self, table: TableId) -> u32 {
        self.rows[table as usize].rows
    }

    /// Width of a `#Strings` heap index.
    #[must_use]
    pub fn str_bytes(&self) -> u32 {
        if self.is_large_index_str {
            4
        } else {
            2
        }
    }

    /// Width of a `#GUID` heap index.
    #[must_use]
    pub fn guid_bytes(&self) -> u32 {
        if self.is_large_index_guid {
            4
        } else {
            2
        }
    }

    /// Width of a `#Blob` heap index.
    #[must_use]
    pub fn blob_bytes(&self) -> u32 {
        if self.is_large_index_blob {
            4
        } else {
            2
        }
    }

    /// `true` if `#Strings` indexes are 4 bytes wide.
    #[must_use]
    pub fn is_large_str(&self) -> bool {
        self.is_large_index_str
    }

    /// `true` if `#GUID` indexes are 4 bytes wide.
    #[must_use]
    pub fn is_large_guid(&self) -> bool {
        self.is_large_index_guid
    }

    /// `true` if `#Blob` indexes are 4 bytes wide.
    #[must_use]
    pub fn is_large_blob(&self) -> bool {
        self.is_large_index_blob
    }

    /// Width of a simple index into `table_id`.
    #[must_use]
    pub fn table_index_bytes(&self, table_id: TableId) -> u32 {
        if self.rows[table_id as usize].bits > 16 {
            4
        } else {
            2
        }
    }

    /// Width of a coded index of kind `coded_index_type`.
    #[must_use]
    pub fn coded_index_bytes(&self, coded_index_type: CodedIndexType) -> u32 {
        if self.coded_indexes[coded_index_type as usize] > 16 {
            4
        } else {
            2
        }
    }

    /// Size in bytes of one row of `table`, ECMA-335 II.22.
    #[must_use]
    pub fn row_size(&self, table: TableId) -> u32 {
        let s = self.str_bytes();
        let g = self.guid_bytes();
        let b = self.blob_bytes();
        let idx = |table: TableId| self.table_index_bytes(table);
        let coded = |kind: CodedIndexType| self.coded_index_bytes(kind);

        match table {
            TableId::Module => 2 + s + 3 * g,
            TableId::TypeRef => coded(CodedIndexType::ResolutionScope) + 2 * s,
            TableId::TypeDef => {
                4 + 2 * s
                    + coded(CodedIndexType::TypeDefOrRef)
                    + idx(TableId::Field)
                    + idx(TableId::MethodDef)
            }
            TableId::FieldPtr => idx(TableId::Field),
            TableId::Field => 2 + s + b,
            TableId::MethodPtr => idx(TableId::MethodDef),
            TableId::MethodDef => 4 + 2 + 2 + s + b + idx(TableId::Param),
            TableId::ParamPtr => idx(TableId::Param),
            TableId::Param => 2 + 2 + s,
            TableId::InterfaceImpl => idx(TableId::TypeDef) + coded(CodedIndexType::TypeDefOrRef),
            TableId::MemberRef => coded(CodedIndexType::MemberRefParent) + s + b,
            TableId::Constant => 2 + coded(CodedIndexType::HasConstant) + b,
            TableId::CustomAttribute => {
                coded(CodedIndexType::HasCustomAttribute)
                    + coded(CodedIndexType::CustomAttributeType)
                    + b
            }
            TableId::FieldMarshal => coded(CodedIndexType::HasFieldMarshal) + b,
            TableId::DeclSecurity => 2 + coded(CodedIndexType::HasDeclSecurity) + b,
            TableId::ClassLayout => 2 + 4 + idx(TableId::TypeDef),
            TableId::FieldLayout => 4 + idx(TableId::Field),
            TableId::StandAloneSig => b,
            TableId::EventMap => idx(TableId::TypeDef) + idx(TableId::Event),
            TableId::EventPtr => idx(TableId::Event),
            TableId::Event => 2 + s + coded(CodedIndexType::TypeDefOrRef),
            TableId::PropertyMap => idx(TableId::TypeDef) + idx(TableId::Property),
            TableId::PropertyPtr => idx(TableId::Property),
            TableId::Property => 2 + s + b,
            TableId::MethodSemantics => {
                2 + idx(TableId::MethodDef) + coded(CodedIndexType::HasSemantics)
            }
            TableId::MethodImpl => {
                idx(TableId::TypeDef) + 2 * coded(CodedIndexType::MethodDefOrRef)
            }
            TableId::ModuleRef => s,
            TableId::TypeSpec => b,
            TableId::ImplMap => {
                2 + coded(CodedIndexType::MemberForwarded) + s + idx(TableId::ModuleRef)
            }
            TableId::FieldRVA => 4 + idx(TableId::Field),
            TableId::EncLog => 4 + 4,
            TableId::EncMap => 4,
            TableId::Assembly => 4 + 4 * 2 + 4 + b + 2 * s,
            TableId::AssemblyProcessor => 4,
            TableId::AssemblyOS => 3 * 4,
            TableId::AssemblyRef => 4 * 2 + 4 + b + 2 * s + b,
            TableId::AssemblyRefProcessor => 4 + idx(TableId::AssemblyRef),
            TableId::AssemblyRefOS => 3 * 4 + idx(TableId::AssemblyRef),
            TableId::File => 4 + s + b,
            TableId::ExportedType => 4 + 4 + 2 * s + coded(CodedIndexType::Implementation),
            TableId::ManifestResource => 4 + 4 + s + coded(CodedIndexType::Implementation),
            TableId::NestedClass => 2 * idx(TableId::TypeDef),
            TableId::GenericParam => 2 + 2 + coded(CodedIndexType::TypeOrMethodDef) + s,
            TableId::MethodSpec => coded(CodedIndexType::MethodDefOrRef) + b,
            TableId::GenericParamConstraint => {
                idx(TableId::GenericParam) + coded(CodedIndexType::TypeDefOrRef)
            }
        }
    }

    fn calculate_coded_index_bits(&mut self) {
        for coded_index in CodedIndexType::iter() {
            let max_bits = coded_index
                .tables()
                .iter()
                .map(|table| self.rows[*table as usize].bits)
                .max()
                .unwrap_or(1);

            self.coded_indexes[coded_index as usize] = max_bits + coded_index.tag_bits();
        }
    }
}
