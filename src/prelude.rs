//! # dotbind Prelude
//!
//! The types a compiler worker needs to resolve references, inspect modules and emit
//! optional fields.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotbind operations
pub use crate::Error;

/// The result type used throughout dotbind
pub use crate::Result;

// ================================================================================================
// Compilation Context
// ================================================================================================

/// Shared state of a compilation and its builder
pub use crate::context::{CompilationContext, CompilationContextBuilder};

/// Context configuration
pub use crate::context::config::ContextConfig;

/// Algorithm selection
pub use crate::context::strategy::{StrategySet, TypeCategory};

// ================================================================================================
// Modules and Resolution
// ================================================================================================

/// Loaded modules and handles into them
pub use crate::module::{MethodHandle, Module, ModuleId, ModuleLoader, TypeHandle};

/// Assembly references and their resolution
pub use crate::resolver::{AssemblyNameRequest, AssemblyResolver};

/// Module identity
pub use crate::metadata::identity::{AssemblyVersion, ModuleIdentity, StrongNameToken};

/// Metadata tokens
pub use crate::metadata::token::Token;

// ================================================================================================
// Symbols and Runtime Data
// ================================================================================================

/// Symbol reader seams
pub use crate::symbols::{
    MethodMetadata, SequencePoint, SymbolReader, SymbolReaderFactory,
};

/// Optional field encoding
pub use crate::runtime::optional_fields::{OptionalFieldSet, OptionalFieldTag};
