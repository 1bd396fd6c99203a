//! String deobfuscation for modules protected with a cached XOR string scheme.
//!
//! The protection replaces every string literal with ciphertext and routes it through a runtime
//! decryption helper backed by a static cache field (`<Module>::hTable`). Around the real call
//! sites it injects artifact pairs: an `ldc.i8` constant followed by a call into the helper.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Deobfuscation Pipeline                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │  Input: Module                                                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    ArtifactLocator                               │   │
//! │  │  helper field → methods using it → their owning types            │   │
//! │  └────────────────────────────┬────────────────────────────────────┘   │
//! │                               │ (absent or unused: stop)                │
//! │                               ▼                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    InstructionRewriter (per method)              │   │
//! │  │  ldstr → StringDecryptor (XorScheme + DecryptionCache)           │   │
//! │  │  ldc.i8 + call helper → removed in one batch                     │   │
//! │  └────────────────────────────┬────────────────────────────────────┘   │
//! │                               │                                         │
//! │                               ▼                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    CleanupRequest                                │   │
//! │  │  helper field, then support types (descending token order)       │   │
//! │  └────────────────────────────┬────────────────────────────────────┘   │
//! │                               │                                         │
//! │                               ▼                                         │
//! │  Output: rewritten Module + DeobfuscationResult                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use dotzion::deobfuscation::{DecryptionCache, DeobfuscationEngine, EngineConfig};
//! use dotzion::metadata::module::Module;
//!
//! let mut module = Module::new("app.exe");
//! let cache = DecryptionCache::new();
//!
//! let result = DeobfuscationEngine::new(EngineConfig::default()).process(&mut module, &cache);
//! if result.has_decrypted() {
//!     println!("{}", result.summary());
//! }
//! ```

mod cache;
mod cleanup;
mod config;
mod decryptor;
mod engine;
mod locator;
mod result;
mod rewriter;

pub use cache::DecryptionCache;
pub use cleanup::CleanupRequest;
pub use config::{CleanupConfig, EngineConfig};
pub use decryptor::{StringDecryptor, XorScheme};
pub use engine::DeobfuscationEngine;
pub use locator::{ArtifactLocator, LocatorFindings};
pub use result::{CleanupSummary, DeobfuscationResult, MethodFailure};
pub use rewriter::{InstructionRewriter, MethodRewrite};
