//! # dotzion Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the dotzion library.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotzion operations
pub use crate::Error;

/// The result type used throughout dotzion
pub use crate::Result;

// ================================================================================================
// Container Model
// ================================================================================================

pub use crate::metadata::{
    member::{FieldRef, MethodRef},
    method::MethodBody,
    module::{FieldDef, MethodDef, Module, TypeDef},
    token::Token,
};

/// Container backends
pub use crate::file::{memory::MemoryIo, AssemblyIo, MetadataFlags, WriterOptions};

// ================================================================================================
// Instructions
// ================================================================================================

pub use crate::assembly::{FlowType, Immediate, Instruction, InstructionAssembler, Operand};

// ================================================================================================
// Deobfuscation
// ================================================================================================

pub use crate::deobfuscation::{
    ArtifactLocator, CleanupConfig, CleanupRequest, DecryptionCache, DeobfuscationEngine,
    DeobfuscationResult, EngineConfig, InstructionRewriter, StringDecryptor, XorScheme,
};

// ================================================================================================
// Driver
// ================================================================================================

pub use crate::driver::{
    conclude, output_path, run, Invocation, RunReport, RunStatus, StatusMessage,
};
