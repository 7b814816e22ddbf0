//! ECMA-335 metadata, read far enough to establish a module's identity.
//!
//! The chain runs from the CLR runtime header ([`cor20header`]) to the metadata [`root`], its
//! [`streams`] and the table stream ([`tables`]), ending in the [`identity`] of the module.
//! [`token`] holds the metadata token used by type and method handles.

/// The CLR runtime header
pub mod cor20header;
/// Module identity: name, version, culture and strong-name token
pub mod identity;
/// The metadata root and its stream directory
pub mod root;
/// Metadata streams and heaps
pub mod streams;
/// Table ids, coded indexes, row sizes and the rows needed for identity
pub mod tables;
/// Metadata tokens
pub mod token;
