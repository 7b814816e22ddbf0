//! Runtime data structures emitted by the compiler.

pub mod optional_fields;
