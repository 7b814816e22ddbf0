//! Metadata streams: the stream directory entries, the `#Strings` and `#Blob` heaps and the
//! `#~` table stream header.

mod blob;
mod streamheader;
mod strings;
mod tablesheader;

pub use blob::Blob;
pub use streamheader::{StreamHeader, VALID_STREAM_NAMES};
pub use strings::Strings;
pub use tablesheader::TablesHeader;
