//! ECMA-335 metadata table layout.
//!
//! Only as much of the table machinery is implemented as is needed to locate and read the
//! identity rows of a module: the table numbering, coded index kinds, per-table row sizes and
//! raw readers for the `Module` and `Assembly` rows. Full table decoding is left to the
//! metadata reader that consumes [`crate::Module::metadata`].

mod codedindex;
mod rows;
mod tableid;
mod tableinfo;

pub use codedindex::CodedIndexType;
pub use rows::{AssemblyRaw, ModuleRaw};
pub use tableid::TableId;
pub use tableinfo::{TableInfo, TableRowInfo};
