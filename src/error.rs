use std::path::PathBuf;

use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Container Parsing Errors
/// - [`Error::Malformed`] - Corrupted or invalid file structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of a buffer
/// - [`Error::NotSupported`] - Unsupported container layout
/// - [`Error::Empty`] - Empty input provided
/// - [`Error::FileError`] / [`Error::GoblinErr`] - I/O and PE layer failures
///
/// ## Module Loading Errors
/// - [`Error::LoadError`] - A module at a given path could not be opened or parsed
/// - [`Error::NameMismatch`] - The module declares a different simple name than expected
///
/// ## Resolution Errors
/// - [`Error::NotFound`] - No (compatible) candidate for a requested assembly
/// - [`Error::IncompatibleVersion`] - The only candidate does not satisfy the request
/// - [`Error::AmbiguousMatch`] - Several candidates satisfy the request and ambiguity is fatal
///
/// # Examples
///
/// ```rust,no_run
/// use dotbind::{CompilationContext, Error};
///
/// let context = CompilationContext::builder()
///     .reference_file("System.Runtime", "refs/System.Runtime.dll")
///     .build()?;
///
/// match context.module_for_simple_name("System.Runtime", true) {
///     Ok(Some(module)) => println!("resolved {}", module.path().display()),
///     Ok(None) => unreachable!("strict resolution reports missing modules as errors"),
///     Err(Error::NotFound(name)) => eprintln!("missing assembly {name}"),
///     Err(Error::LoadError { path, source }) => eprintln!("{}: {source}", path.display()),
///     Err(e) => eprintln!("other error: {e}"),
/// }
/// # Ok::<(), dotbind::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The file is damaged and could not be parsed.
    ///
    /// The error carries the source location where the malformation was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// This file type is not supported.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),

    /// Error from the goblin crate during PE parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    /// A module could not be opened, mapped or parsed.
    ///
    /// Fatal for the module at `path` only; other modules in the session are unaffected.
    #[error("Failed to load module '{}' - {source}", path.display())]
    LoadError {
        /// Path of the module that failed to load
        path: PathBuf,
        /// Underlying I/O or parsing failure
        source: Box<Error>,
    },

    /// The module at `path` declares a different simple name than the one it was requested as.
    #[error("Assembly name '{actual}' does not match expected name '{expected}' ({})", path.display())]
    NameMismatch {
        /// Path of the offending module
        path: PathBuf,
        /// The simple name the module was looked up by
        expected: String,
        /// The simple name the module declares
        actual: String,
    },

    /// Strict resolution found no candidate, or no compatible candidate, for the request.
    #[error("Assembly not found - {0}")]
    NotFound(String),

    /// Strict resolution found a single candidate which does not satisfy the request.
    #[error("Non-matching assembly found - requested '{requested}', found '{found}'")]
    IncompatibleVersion {
        /// Display name of the request
        requested: String,
        /// Display name of the rejected candidate
        found: String,
    },

    /// Several candidates satisfy the request and the context treats ambiguity as fatal.
    #[error("Ambiguous assembly reference '{requested}' - {} compatible candidates", candidates.len())]
    AmbiguousMatch {
        /// Display name of the request
        requested: String,
        /// Paths of every compatible candidate, in discovery order
        candidates: Vec<PathBuf>,
    },
}

impl Error {
    /// Wraps `self` into [`Error::LoadError`] for `path`, leaving errors that already
    /// identify a module untouched.
    pub(crate) fn at_path(self, path: impl Into<PathBuf>) -> Error {
        match self {
            Error::LoadError { .. } | Error::NameMismatch { .. } => self,
            other => Error::LoadError {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_carries_location() {
        let error = malformed_error!("bad header - {}", 42);
        match error {
            Error::Malformed {
                message,
                file,
                line,
            } => {
                assert_eq!(message, "bad header - 42");
                assert!(file.ends_with("error.rs"));
                assert!(line > 0);
            }
            _ => panic!("expected Malformed"),
        }
    }

    #[test]
    fn at_path_wraps_once() {
        let wrapped = Error::OutOfBounds.at_path("/tmp/A.dll");
        assert!(matches!(
            &wrapped,
            Error::LoadError { path, source } if path == &PathBuf::from("/tmp/A.dll")
                && matches!(**source, Error::OutOfBounds)
        ));

        let twice = wrapped.at_path("/tmp/B.dll");
        assert!(matches!(twice, Error::LoadError { path, .. } if path == PathBuf::from("/tmp/A.dll")));
    }

    #[test]
    fn display_messages() {
        let error = Error::IncompatibleVersion {
            requested: "A, Version=2.0.0.0".to_string(),
            found: "A, Version=1.0.0.0".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Non-matching assembly found - requested 'A, Version=2.0.0.0', found 'A, Version=1.0.0.0'"
        );

        let error = Error::AmbiguousMatch {
            requested: "A".to_string(),
            candidates: vec![PathBuf::from("/x/A.dll"), PathBuf::from("/y/A.dll")],
        };
        assert_eq!(
            error.to_string(),
            "Ambiguous assembly reference 'A' - 2 compatible candidates"
        );
    }
}
