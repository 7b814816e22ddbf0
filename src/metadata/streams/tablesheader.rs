use strum::IntoEnumIterator;

use crate::{
    file::io::read_le,
    metadata::tables::{AssemblyRaw, ModuleRaw, TableId, TableInfo},
    Result,
};

/// `HeapSizes` bit signalling four extra bytes after the row counts.
const EXTRA_DATA_FLAG: u8 = 0x40;

/// The header of the `#~` / `#-` stream and the location of every table in it.
///
/// ECMA-335 II.24.2.6: a fixed 24-byte header, one `u32` row count per table present in the
/// `valid` mask, then the tables back to back in table-number order.
pub struct TablesHeader<'a> {
    /// Major version of the table schema
    pub major_version: u8,
    /// Minor version of the table schema
    pub minor_version: u8,
    /// `HeapSizes` flags
    pub heap_sizes: u8,
    /// Bit mask of present tables
    pub valid: u64,
    /// Bit mask of sorted tables
    pub sorted: u64,
    info: TableInfo,
    data: &'a [u8],
    table_offsets: Vec<Option<usize>>,
}

impl<'a> TablesHeader<'a> {
    /// Parses the stream header and computes every table's offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the declared tables exceed the stream,
    /// [`crate::Error::Malformed`] for an empty table set and [`crate::Error::NotSupported`]
    /// for unknown tables.
    pub fn from(data: &'a [u8]) -> Result<TablesHeader<'a>> {
        if data.len() < 24 {
            return Err(out_of_bounds_error!());
        }

        let valid = read_le::<u64>(&data[8..])?;
        if valid == 0 {
            return Err(malformed_error!("No valid rows in any of the tables"));
        }

        let heap_sizes = read_le::<u8>(&data[6..])?;
        let info = TableInfo::new(data, valid)?;

        let mut next_offset = 24 + valid.count_ones() as usize * 4;
        if heap_sizes & EXTRA_DATA_FLAG != 0 {
            next_offset += 4;
        }

        let mut table_offsets = vec![None; TableId::iter().count()];
        for table in TableId::iter() {
            let rows = info.rows(table);
            if rows == 0 {
                continue;
            }

            let size = u64::from(rows) * u64::from(info.row_size(table));
            let end = (next_offset as u64)
                .checked_add(size)
                .filter(|end| *end <= data.len() as u64)
                .ok_or(out_of_bounds_error!())?;

            table_offsets[table as usize] = Some(next_offset);
            next_offset = usize::try_from(end).map_err(|_| out_of_bounds_error!())?;
        }

        Ok(TablesHeader {
            major_version: read_le::<u8>(&data[4..])?,
            minor_version: read_le::<u8>(&data[5..])?,
            heap_sizes,
            valid,
            sorted: read_le::<u64>(&data[16..])?,
            info,
            data,
            table_offsets,
        })
    }

    /// Column widths and row counts.
    #[must_use]
    pub fn info(&self) -> &TableInfo {
        &self.info
    }

    /// Number of rows in `table`, zero if absent.
    #[must_use]
    pub fn rows(&self, table: TableId) -> u32 {
        self.info.rows(table)
    }

    /// Number of tables with at least one row.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.table_offsets.iter().filter(|offset| offset.is_some()).count()
    }

    /// Offset of row `rid` (1-based) of `table` within the stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the table is absent or `rid` is out of range.
    pub fn row_offset(&self, table: TableId, rid: u32) -> Result<usize> {
        let Some(start) = self.table_offsets[table as usize] else {
            return Err(out_of_bounds_error!());
        };

        if rid == 0 || rid > self.info.rows(table) {
            return Err(out_of_bounds_error!());
        }

        Ok(start + (rid as usize - 1) * self.info.row_size(table) as usize)
    }

    /// Reads the first row of the `Module` table.
    ///
    /// # Errors
    /// Returns an error if the table is missing or truncated.
    pub fn module(&self) -> Result<ModuleRaw> {
        let mut offset = self.row_offset(TableId::Module, 1)?;
        ModuleRaw::row_read(self.data, &mut offset, 1, &self.info)
    }

    /// Reads the `Assembly` row, `None` for modules without an assembly manifest.
    ///
    /// # Errors
    /// Returns an error if the table is present but truncated.
    pub fn assembly(&self) -> Result<Option<AssemblyRaw>> {
        if self.info.rows(TableId::Assembly) == 0 {
            return Ok(None);
        }

        let mut offset = self.row_offset(TableId::Assembly, 1)?;
        AssemblyRaw::row_read(self.data, &mut offset, 1, &self.info).map(Some)
    }
}
