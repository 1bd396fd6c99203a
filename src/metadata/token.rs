//! Metadata tokens for cross-references between types, members and instructions.

use std::fmt;
use std::hash::{Hash, Hasher};

use strum::{EnumIter, IntoEnumIterator};

/// Identifiers of the metadata tables a token can point into.
///
/// Only the tables that instruction operands and the cleanup logic refer to are listed. The
/// numeric values correspond to the table IDs as defined in ECMA-335 II.22, plus the pseudo-table
/// `0x70` used by `ldstr` for `#US` heap offsets.
///
/// Definition tables (`TypeDef`, `Field`, `MethodDef`) name things the module owns; cleanup refuses
/// any other table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
#[repr(u8)]
pub enum TableId {
    /// Module definition
    Module = 0x00,
    /// External type reference
    TypeRef = 0x01,
    /// Type definition
    TypeDef = 0x02,
    /// Field definition
    Field = 0x04,
    /// Method definition
    MethodDef = 0x06,
    /// Member reference (external or vararg field/method)
    MemberRef = 0x0A,
    /// Generic method instantiation
    MethodSpec = 0x2B,
    /// `#US` heap offset referenced by `ldstr`
    UserString = 0x70,
}

impl TableId {
    /// Resolves a raw table byte, returning `None` for tables this crate does not model.
    #[must_use]
    pub fn from_byte(value: u8) -> Option<TableId> {
        TableId::iter().find(|table| *table as u8 == value)
    }
}

/// A metadata token representing a reference to a metadata table entry.
///
/// Tokens in .NET metadata consist of a 32-bit value where:
/// - The high byte (bits 24-31) indicates the table type
/// - The low 24 bits (bits 0-23) indicate the row index within that table
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Token(pub u32);

impl Token {
    /// Creates a new token from a raw 32-bit value
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Returns the raw token value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Extracts the table type from the token (high byte)
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Returns the table this token points into, if it is one this crate models
    #[must_use]
    pub fn table_id(&self) -> Option<TableId> {
        TableId::from_byte(self.table())
    }

    /// Extracts the row index from the token (low 24 bits)
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
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

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}
