//! Configuration of a compilation context.

/// Default extension of symbol files.
pub const DEFAULT_SYMBOL_EXTENSION: &str = "pdb";

/// Settings of a [`crate::CompilationContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    /// Reject strict requests matched by more than one compatible candidate.
    /// By default the last candidate in discovery order is used and a warning is logged.
    pub fail_on_ambiguity: bool,

    /// Look for symbol files next to loaded modules
    pub attach_symbols: bool,

    /// Extension replacing the module's own to locate its symbol file
    pub symbol_extension: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        ContextConfig {
            fail_on_ambiguity: false,
            attach_symbols: true,
            symbol_extension: DEFAULT_SYMBOL_EXTENSION.to_string(),
        }
    }
}

impl ContextConfig {
    /// Ambiguous references are errors.
    #[must_use]
    pub fn strict() -> Self {
        ContextConfig {
            fail_on_ambiguity: true,
            ..Self::default()
        }
    }

    /// No symbol lookup.
    #[must_use]
    pub fn without_symbols() -> Self {
        ContextConfig {
            attach_symbols: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        let default = ContextConfig::default();
        assert!(!default.fail_on_ambiguity);
        assert!(default.attach_symbols);
        assert_eq!(default.symbol_extension, "pdb");

        assert!(ContextConfig::strict().fail_on_ambiguity);
        assert!(!ContextConfig::without_symbols().attach_symbols);
    }
}
