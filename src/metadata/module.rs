//! In-memory bytecode container: a module with its types, fields and methods.
//!
//! This is the representation the deobfuscation passes operate on. A container backend (see
//! [`crate::file::AssemblyIo`]) produces a [`Module`] from an assembly and serializes it back;
//! everything in between is plain data that can be inspected, mutated and compared.
//!
//! # Examples
//!
//! ```rust
//! use dotzion::metadata::{
//!     module::{FieldDef, MethodDef, Module, TypeDef},
//!     token::Token,
//! };
//!
//! let mut module = Module::new("app.exe");
//! module.types.push(
//!     TypeDef::new(Token::new(0x02000001), "", "<Module>")
//!         .with_field(FieldDef::new(Token::new(0x04000001), "hTable", "System.Collections.Hashtable")),
//! );
//! module.types.push(
//!     TypeDef::new(Token::new(0x02000002), "App", "Program")
//!         .with_method(MethodDef::new(Token::new(0x06000001), "Main", None)),
//! );
//!
//! assert!(module.find_type("App.Program").is_some());
//! assert_eq!(module.method_count(), 1);
//! ```

use crate::{
    file::WriterOptions,
    metadata::{method::MethodBody, token::Token},
};

/// A field definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// FieldDef token
    pub token: Token,
    /// Field name
    pub name: String,
    /// Field type as rendered from its signature
    pub signature: String,
}

impl FieldDef {
    /// Creates a new field definition.
    pub fn new(token: Token, name: impl Into<String>, signature: impl Into<String>) -> Self {
        FieldDef {
            token,
            name: name.into(),
            signature: signature.into(),
        }
    }
}

/// A method definition, with its body if it has one.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    /// MethodDef token
    pub token: Token,
    /// Method name
    pub name: String,
    /// CIL body; `None` for abstract, extern and runtime-implemented methods
    pub body: Option<MethodBody>,
}

impl MethodDef {
    /// Creates a new method definition.
    pub fn new(token: Token, name: impl Into<String>, body: Option<MethodBody>) -> Self {
        MethodDef {
            token,
            name: name.into(),
            body,
        }
    }

    /// Returns true if the method carries a CIL body.
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }
}

/// A type definition and the members it owns.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    /// TypeDef token
    pub token: Token,
    /// Namespace, empty for the global type and for types in the root namespace
    pub namespace: String,
    /// Type name
    pub name: String,
    /// Fields owned by this type
    pub fields: Vec<FieldDef>,
    /// Methods owned by this type
    pub methods: Vec<MethodDef>,
}

impl TypeDef {
    /// Creates a type without members.
    pub fn new(token: Token, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        TypeDef {
            token,
            namespace: namespace.into(),
            name: name.into(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Adds a field, builder style.
    #[must_use]
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds a method, builder style.
    #[must_use]
    pub fn with_method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    /// Returns `Namespace.Name`, or just `Name` when the namespace is empty.
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// Finds a field by name.
    #[must_use]
    pub fn find_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Removes a field by token, returning it if it was present.
    pub fn remove_field(&mut self, token: Token) -> Option<FieldDef> {
        let index = self.fields.iter().position(|field| field.token == token)?;
        Some(self.fields.remove(index))
    }
}

/// A module: the unit that is loaded, deobfuscated and written back.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// Module name, usually the file name
    pub name: String,
    /// All type definitions, the global `<Module>` type included
    pub types: Vec<TypeDef>,
    /// Serialization options the module was loaded with
    pub writer_options: WriterOptions,
}

impl Module {
    /// Creates an empty module with default writer options.
    pub fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            types: Vec::new(),
            writer_options: WriterOptions::default(),
        }
    }

    /// Finds a type by its full name.
    #[must_use]
    pub fn find_type(&self, full_name: &str) -> Option<&TypeDef> {
        self.types.iter().find(|ty| ty.full_name() == full_name)
    }

    /// Finds a type by token.
    #[must_use]
    pub fn type_by_token(&self, token: Token) -> Option<&TypeDef> {
        self.types.iter().find(|ty| ty.token == token)
    }

    /// Finds a type by token, mutably.
    pub fn type_by_token_mut(&mut self, token: Token) -> Option<&mut TypeDef> {
        self.types.iter_mut().find(|ty| ty.token == token)
    }

    /// Removes a type (and every member it owns) by token, returning it if it was present.
    pub fn remove_type(&mut self, token: Token) -> Option<TypeDef> {
        let index = self.types.iter().position(|ty| ty.token == token)?;
        Some(self.types.remove(index))
    }

    /// Iterates over every method together with its owning type.
    pub fn methods(&self) -> impl Iterator<Item = (&TypeDef, &MethodDef)> {
        self.types
            .iter()
            .flat_map(|ty| ty.methods.iter().map(move |method| (ty, method)))
    }

    /// Returns the number of methods across all types.
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.types.iter().map(|ty| ty.methods.len()).sum()
    }
}
