// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # dotzion
//!
//! A string deobfuscator for .NET modules protected with a cached XOR string scheme.
//!
//! Protected modules replace every string literal with ciphertext that a runtime helper decrypts
//! and memoizes in a static `Hashtable` field (`<Module>::hTable`), and pad the helper's call
//! sites with `ldc.i8` / `call` artifact pairs. `dotzion` reverses that on an in-memory module:
//! literals are decrypted in place, artifact pairs are stripped, and the helper field and its
//! support types are removed.
//!
//! ## Architecture
//!
//! - **Instruction Model** ([`assembly`]): CIL instructions with resolved operands, plus an
//!   assembler for building laid-out instruction sequences
//! - **Container Model** ([`metadata`]): module, types, fields, methods and their bodies
//! - **I/O Boundary** ([`file`]): the [`file::AssemblyIo`] trait container backends implement,
//!   and an in-memory backend
//! - **Deobfuscation** ([`deobfuscation`]): locator, decryptor and cache, rewriter, cleanup and
//!   the engine tying them together
//! - **Driver** ([`driver`]): argument handling, output naming, the write decision, status
//!   messages and exit codes
//!
//! ## Quick Start
//!
//! ```rust
//! use dotzion::prelude::*;
//!
//! let io = MemoryIo::new().with_module("app.exe", Module::new("app.exe"));
//! let report = run(["app.exe"], &io, &EngineConfig::default());
//!
//! for message in &report.messages {
//!     println!("[{}] {}", message.level, message.text);
//! }
//! assert_eq!(report.exit_code(), 1);
//! ```
//!
//! Working directly with the engine:
//!
//! ```rust
//! use dotzion::prelude::*;
//!
//! let mut module = Module::new("app.exe");
//! let cache = DecryptionCache::new();
//! let result = DeobfuscationEngine::new(EngineConfig::default()).process(&mut module, &cache);
//!
//! println!("{}", result.summary());
//! ```
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade and never installs a logger. Per-literal and
//! per-artifact detail is at `debug`, stage outcomes at `info`, skipped methods and
//! unconditional type removal at `warn`.
//!
//! ## Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! ```
#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use dotzion::prelude::*;
///
/// let config = EngineConfig::default().with_cleanup(CleanupConfig::disabled());
/// assert!(!config.cleanup.any_enabled());
/// ```
pub mod prelude;

/// CIL instructions and their construction.
///
/// # Key Types
///
/// - [`assembly::Instruction`] - One instruction with resolved operand
/// - [`assembly::Operand`] - Instruction operands (immediates, strings, fields, methods)
/// - [`assembly::FlowType`] - How instructions affect control flow
/// - [`assembly::InstructionAssembler`] - Builds laid-out instruction sequences
pub mod assembly;

/// In-memory representation of a module.
pub mod metadata;

/// Loading and writing modules through a container backend.
pub mod file;

/// The string deobfuscation pipeline.
pub mod deobfuscation;

/// Run-level decision logic for front ends.
pub mod driver;

/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
///
/// # Examples
///
/// ```rust
/// use std::path::Path;
/// use dotzion::{file::{memory::MemoryIo, AssemblyIo}, metadata::module::Module, Result};
///
/// fn load(io: &MemoryIo, path: &str) -> Result<Module> {
///     io.load(Path::new(path))
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `dotzion` Error type
///
/// The main error type for all operations in this crate.
///
/// # Examples
///
/// ```rust
/// use std::path::Path;
/// use dotzion::{file::{memory::MemoryIo, AssemblyIo}, Error};
///
/// match MemoryIo::new().load(Path::new("missing.exe")) {
///     Ok(_) => println!("Loaded successfully"),
///     Err(Error::FileError(e)) => println!("I/O: {e}"),
///     Err(e) => println!("Error: {e}"),
/// }
/// ```
pub use error::Error;
