//! Metadata representation of a loaded module.
//!
//! # Key Components
//!
//! - [`token`] - Metadata table row references used throughout .NET
//! - [`module`] - The module with its types, fields and methods
//! - [`member`] - Field and method references as carried by instruction operands
//! - [`method`] - Method bodies

/// Field and method references
pub mod member;
/// Method bodies
pub mod method;
/// Module, types and their members
pub mod module;
/// Metadata tokens and table identifiers
pub mod token;
