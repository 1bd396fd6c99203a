//! Resolved member references carried by instruction operands.
//!
//! Field and method operands point either at a definition in the current module (`FieldDef`,
//! `MethodDef`) or at a `MemberRef` row. The same field can therefore be reached through two
//! different tokens, which is why field identity is decided structurally by
//! [`FieldRef::same_field`] instead of by token.

use std::fmt;

use crate::metadata::{
    module::{FieldDef, MethodDef, TypeDef},
    token::Token,
};

/// A field referenced by an instruction (`ldsfld`, `stsfld`, `ldfld`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    /// Token the instruction encodes (FieldDef or MemberRef)
    pub token: Token,
    /// Full name of the declaring type, e.g. `<Module>` or `System.String`
    pub declaring_type: String,
    /// Field name
    pub name: String,
    /// Field type as rendered from its signature, e.g. `System.Collections.Hashtable`
    pub signature: String,
}

impl FieldRef {
    /// Creates a new field reference.
    pub fn new(
        token: Token,
        declaring_type: impl Into<String>,
        name: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        FieldRef {
            token,
            declaring_type: declaring_type.into(),
            name: name.into(),
            signature: signature.into(),
        }
    }

    /// Builds the reference a `FieldDef` token resolves to.
    #[must_use]
    pub fn from_def(owner: &TypeDef, field: &FieldDef) -> Self {
        FieldRef {
            token: field.token,
            declaring_type: owner.full_name(),
            name: field.name.clone(),
            signature: field.signature.clone(),
        }
    }

    /// Returns the full name, `"<signature> <declaring type>::<name>"`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}::{}", self.signature, self.declaring_type, self.name)
    }

    /// Returns true if both references denote the same field.
    ///
    /// Declaring type, name and signature are compared; the token is ignored so a `MemberRef`
    /// matches the `FieldDef` it resolves to.
    #[must_use]
    pub fn same_field(&self, other: &FieldRef) -> bool {
        self.name == other.name
            && self.declaring_type == other.declaring_type
            && self.signature == other.signature
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

/// A method referenced by a `call`, `callvirt` or `newobj` instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// Token the instruction encodes (MethodDef, MemberRef or MethodSpec)
    pub token: Token,
    /// Full name of the declaring type
    pub declaring_type: String,
    /// Method name
    pub name: String,
}

impl MethodRef {
    /// Creates a new method reference.
    pub fn new(token: Token, declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        MethodRef {
            token,
            declaring_type: declaring_type.into(),
            name: name.into(),
        }
    }

    /// Builds the reference a `MethodDef` token resolves to.
    #[must_use]
    pub fn from_def(owner: &TypeDef, method: &MethodDef) -> Self {
        MethodRef {
            token: method.token,
            declaring_type: owner.full_name(),
            name: method.name.clone(),
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.name)
    }
}
