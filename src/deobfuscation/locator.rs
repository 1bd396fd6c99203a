//! Locating the string helper and its users.
//!
//! The protection stores decrypted literals in a static field (by default `<Module>::hTable`). Its
//! presence is what identifies a protected module, and every method that reads or writes it is
//! part of the obfuscator's runtime support: calls to those methods are the artifacts the rewriter
//! strips, and the types owning them are what cleanup removes.
//!
//! A module without the helper field is not an error; [`ArtifactLocator::locate`] simply returns
//! `None` and the engine leaves the module alone.

use std::collections::HashSet;

use log::{debug, info};

use crate::{
    assembly::Operand,
    deobfuscation::config::EngineConfig,
    metadata::{
        member::FieldRef,
        module::Module,
        token::{TableId, Token},
    },
};

/// What the locator found in a protected module.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatorFindings {
    /// The helper field, as instructions reference it
    pub helper: FieldRef,
    /// Type declaring the helper field
    pub helper_owner: Token,
    /// MethodDef tokens of every method whose body references the helper field
    pub methods: HashSet<Token>,
    /// Types owning at least one of `methods`, unique, in module order
    pub types: Vec<Token>,
}

impl LocatorFindings {
    /// Returns true if at least one method body references the helper field.
    #[must_use]
    pub fn is_referenced(&self) -> bool {
        !self.methods.is_empty()
    }

    /// Returns true if the method with this token uses the helper field.
    #[must_use]
    pub fn uses_helper(&self, method: Token) -> bool {
        self.methods.contains(&method)
    }
}

/// Finds the helper field and the methods that use it.
///
/// # Examples
///
/// ```rust
/// use dotzion::deobfuscation::ArtifactLocator;
/// use dotzion::metadata::module::Module;
///
/// let locator = ArtifactLocator::new("<Module>", "hTable");
/// assert!(locator.locate(&Module::new("clean.dll")).is_none());
/// ```
#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    helper_type: String,
    helper_field: String,
}

impl ArtifactLocator {
    /// Creates a locator for `helper_type::helper_field`.
    pub fn new(helper_type: impl Into<String>, helper_field: impl Into<String>) -> Self {
        ArtifactLocator {
            helper_type: helper_type.into(),
            helper_field: helper_field.into(),
        }
    }

    /// Creates a locator using the helper names from `config`.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        ArtifactLocator::new(config.helper_type.as_str(), config.helper_field.as_str())
    }

    /// Scans `module` for the helper field and its users.
    ///
    /// Returns `None` if the helper type or field does not exist. Otherwise every method with a
    /// body is inspected; a method uses the helper if any of its instructions has a field operand
    /// denoting the same field ([`FieldRef::same_field`]), whichever token it is reached through.
    #[must_use]
    pub fn locate(&self, module: &Module) -> Option<LocatorFindings> {
        let Some(owner) = module.find_type(&self.helper_type) else {
            debug!("type {} not present, module is not protected", self.helper_type);
            return None;
        };
        let Some(field) = owner.find_field(&self.helper_field) else {
            debug!(
                "field {}::{} not present, module is not protected",
                self.helper_type, self.helper_field
            );
            return None;
        };

        let helper = FieldRef::from_def(owner, field);
        let mut methods = HashSet::new();
        let mut types = Vec::new();

        for (ty, method) in module.methods() {
            let Some(body) = &method.body else {
                continue;
            };

            let reference = body.instructions.iter().find_map(|instr| match &instr.operand {
                Operand::Field(operand) if operand.same_field(&helper) => Some(operand.token),
                _ => None,
            });
            let Some(reference) = reference else {
                continue;
            };

            let route = match reference.table_id() {
                Some(TableId::Field) => "directly",
                Some(TableId::MemberRef) => "through a MemberRef",
                _ => "through an unexpected token",
            };
            debug!(
                "{}::{} references {} {} ({})",
                ty.full_name(),
                method.name,
                helper,
                route,
                reference
            );
            methods.insert(method.token);
            if !types.contains(&ty.token) {
                types.push(ty.token);
            }
        }

        info!(
            "found helper {} used by {} method(s) in {} type(s)",
            helper,
            methods.len(),
            types.len()
        );

        Some(LocatorFindings {
            helper,
            helper_owner: owner.token,
            methods,
            types,
        })
    }
}
