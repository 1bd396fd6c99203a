//! Removal of the helper field and the obfuscator's support types.
//!
//! Once every literal has been rewritten the helper field is dead and the types owning helper
//! users are removed. The removal is unconditional: a support type is dropped with all of its
//! members even if some of them are still used by code that was not part of the artifact pattern.
//! This includes `<Module>` itself when its static constructor initialises the helper field.
//!
//! A [`CleanupRequest`] is validated against the module before anything is removed, so it is
//! either applied completely or not at all.

use std::collections::BTreeSet;

use log::{info, warn};

use crate::{
    deobfuscation::{config::CleanupConfig, locator::LocatorFindings, result::CleanupSummary},
    metadata::{
        module::Module,
        token::{TableId, Token},
    },
    Error, Result,
};

/// What to remove from a module.
///
/// Types are yielded and removed in descending token order.
///
/// # Example
///
/// ```rust
/// use dotzion::deobfuscation::CleanupRequest;
/// use dotzion::metadata::token::Token;
///
/// let mut request = CleanupRequest::new();
/// request
///     .remove_field(Token::new(0x02000001), Token::new(0x04000001))
///     .add_type(Token::new(0x02000002))
///     .add_type(Token::new(0x02000005));
///
/// let order: Vec<Token> = request.types().collect();
/// assert_eq!(order, vec![Token::new(0x02000005), Token::new(0x02000002)]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupRequest {
    /// (declaring type, field) to remove
    field: Option<(Token, Token)>,
    /// TypeDef tokens to remove, with all of their members
    types: BTreeSet<Token>,
}

impl CleanupRequest {
    /// Creates an empty cleanup request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the request for what the locator found, honouring `config`.
    #[must_use]
    pub fn from_findings(findings: &LocatorFindings, config: &CleanupConfig) -> Self {
        let mut request = CleanupRequest::new();
        if config.remove_helper_field {
            request.remove_field(findings.helper_owner, findings.helper.token);
        }
        if config.remove_support_types {
            for token in &findings.types {
                request.add_type(*token);
            }
        }
        request
    }

    /// Schedules a field for removal from its declaring type.
    pub fn remove_field(&mut self, owner: Token, field: Token) -> &mut Self {
        self.field = Some((owner, field));
        self
    }

    /// Schedules a type, and every member it owns, for removal.
    pub fn add_type(&mut self, token: Token) -> &mut Self {
        self.types.insert(token);
        self
    }

    /// Returns the types to remove, in descending token order.
    pub fn types(&self) -> impl Iterator<Item = Token> + '_ {
        self.types.iter().rev().copied()
    }

    /// Returns true if nothing is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.field.is_none() && self.types.is_empty()
    }

    /// Applies the request to `module`.
    ///
    /// The helper field is removed first, then the types.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeNotFound`] or [`Error::FieldNotFound`] if a scheduled item is not in
    /// the module, and [`Error::Malformed`] if a token is not a TypeDef (types, field owner) or
    /// Field (helper field) token. Nothing is removed in either case.
    pub fn execute(&self, module: &mut Module) -> Result<CleanupSummary> {
        self.validate(module)?;

        let mut summary = CleanupSummary::default();

        if let Some((owner, field)) = self.field {
            let owner_type = module
                .type_by_token_mut(owner)
                .ok_or(Error::TypeNotFound(owner))?;
            let removed = owner_type
                .remove_field(field)
                .ok_or(Error::FieldNotFound(field))?;
            info!(
                "removed helper field {}::{}",
                owner_type.full_name(),
                removed.name
            );
            summary.helper_field_removed = true;
        }

        for token in self.types() {
            let removed = module
                .remove_type(token)
                .ok_or(Error::TypeNotFound(token))?;
            warn!(
                "removed support type {} ({} methods, {} fields) without checking for other uses",
                removed.full_name(),
                removed.methods.len(),
                removed.fields.len()
            );
            summary.types_removed.push(token);
        }

        Ok(summary)
    }

    fn validate(&self, module: &Module) -> Result<()> {
        if let Some((owner, field)) = self.field {
            expect_table(owner, TableId::TypeDef)?;
            expect_table(field, TableId::Field)?;
            let owner_type = module
                .type_by_token(owner)
                .ok_or(Error::TypeNotFound(owner))?;
            if !owner_type.fields.iter().any(|f| f.token == field) {
                return Err(Error::FieldNotFound(field));
            }
        }

        for token in self.types() {
            expect_table(token, TableId::TypeDef)?;
            if module.type_by_token(token).is_none() {
                return Err(Error::TypeNotFound(token));
            }
        }

        Ok(())
    }
}

/// Cleanup only ever removes definitions; a reference token cannot name something we own.
fn expect_table(token: Token, table: TableId) -> Result<()> {
    if token.table_id() == Some(table) {
        Ok(())
    } else {
        Err(malformed_error!(
            "cleanup token {} is not a {:?} token",
            token,
            table
        ))
    }
}
