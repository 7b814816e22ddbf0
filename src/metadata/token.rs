//! Metadata tokens.
//!
//! A token is the 32-bit reference ECMA-335 uses for rows of metadata tables: the table id
//! lives in the high byte, the 1-based row index in the low 24 bits. Paired with a
//! [`crate::ModuleId`] it identifies a type or method across the whole session, see
//! [`crate::TypeHandle`] and [`crate::MethodHandle`].

use std::fmt;

use crate::metadata::tables::TableId;

/// A metadata token (`table << 24 | row`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u32);

impl Token {
    /// Creates a token from its raw value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Token(value)
    }

    /// Creates the token of `row` in `table`.
    #[must_use]
    pub const fn from_parts(table: TableId, row: u32) -> Self {
        Token(((table as u32) << 24) | (row & 0x00FF_FFFF))
    }

    /// The raw token value.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The table id byte.
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The 1-based row index.
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// `true` for the nil token.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}
