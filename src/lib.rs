// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # dotbind
//!
//! Module resolution and identity reconciliation for an ahead-of-time compiler of .NET
//! binaries.
//!
//! `dotbind` answers the questions every worker of such a compiler asks over and over: which
//! binary does this assembly reference bind to, what are the identities of the loaded
//! modules, where are their debug symbols, and which runtime data needs to be emitted for a
//! type. All answers are computed once per session and shared between threads.
//!
//! ## Features
//!
//! - **Memory-mapped modules** - binaries are mapped read-only and parsed just far enough to
//!   read their identity from the ECMA-335 metadata
//! - **Reference resolution** - version lower bounds, strong-name tokens, strict and
//!   non-strict lookups over the modules being compiled and their references
//! - **Concurrent caches** - create-if-absent caches that never block readers
//! - **Symbol attachment** - portable and legacy symbol files, opened at most once per module
//! - **Optional fields** - the compact tagged encoding of rarely used type descriptor fields
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dotbind::prelude::*;
//!
//! let context = CompilationContextBuilder::new()
//!     .input_file("MyApp", "build/MyApp.dll")
//!     .reference_file("System.Runtime", "ref/System.Runtime.dll")
//!     .build()?;
//!
//! for failure in context.preload() {
//!     eprintln!("{failure}");
//! }
//!
//! let request = AssemblyNameRequest::parse("System.Runtime, Version=8.0.0.0")?;
//! match context.resolve_assembly(&request, true) {
//!     Ok(Some(module)) => println!("{} -> {}", request, module.path().display()),
//!     Ok(None) => unreachable!("strict resolution reports absence as an error"),
//!     Err(error) => eprintln!("{error}"),
//! }
//! # Ok::<(), dotbind::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`metadata`] - PE/CLI header chain, metadata root, streams, tables and identity
//! - [`module`] - loaded modules and the handles identifying their types and methods
//! - [`catalog`] - the session's modules by path, id and name
//! - [`resolver`] - assembly reference resolution
//! - [`symbols`] - symbol reader attachment and parameter names
//! - [`context`] - the compilation context handed to workers
//! - [`runtime`] - runtime data encodings
//! - [`utils`] - the concurrent cache
//!
//! ## Logging
//!
//! `dotbind` logs through `tracing`; it never installs a subscriber.

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use dotbind::prelude::*;
///
/// let context = CompilationContextBuilder::new().build()?;
/// let module = context.module_for_simple_name("System.Runtime", false)?;
/// # Ok::<(), dotbind::Error>(())
/// ```
pub mod prelude;

pub mod catalog;
pub mod context;
pub mod metadata;
pub mod module;
pub mod resolver;
pub mod runtime;
pub mod symbols;
pub mod utils;

/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `dotbind` Error type
///
/// # Examples
///
/// ```rust,no_run
/// use dotbind::{Error, ModuleLoader};
///
/// match ModuleLoader::open(std::path::Path::new("lib/A.dll"), Some("A")) {
///     Ok(module) => println!("Loaded {}", module),
///     Err(Error::NameMismatch { actual, .. }) => println!("Declares itself as {}", actual),
///     Err(Error::LoadError { path, source }) => println!("{}: {}", path.display(), source),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;

pub use catalog::{ModuleCatalog, SimpleName};
pub use context::{
    config::ContextConfig, strategy::TypeCategory, CompilationContext, CompilationContextBuilder,
};
pub use file::{parser::Parser, File};
pub use metadata::{
    identity::{AssemblyVersion, ModuleIdentity, StrongNameToken},
    token::Token,
};
pub use module::{MethodHandle, Module, ModuleId, ModuleLoader, TypeHandle};
pub use resolver::{AssemblyNameRequest, AssemblyResolver};
pub use runtime::optional_fields::{FrozenOptionalFields, OptionalFieldSet, OptionalFieldTag};
pub use symbols::{MethodMetadata, SequencePoint, SymbolReader, SymbolReaderFactory};
