//! Loading and writing assemblies.
//!
//! Turning a PE image into a [`Module`] and back is the job of a container backend. The
//! deobfuscation passes never touch bytes; they only see the in-memory module. This module defines
//! the seam between the two: the [`AssemblyIo`] trait a backend implements, and the
//! [`WriterOptions`] that travel from load to write so a rewritten module is serialized the way the
//! original was.
//!
//! [`memory::MemoryIo`] is a backend that keeps modules in memory, keyed by path. Hosts use it to
//! drive the pipeline on modules they built themselves, and the test-suite uses it throughout.
//!
//! # Examples
//!
//! ```rust
//! use std::path::Path;
//! use dotzion::file::{memory::MemoryIo, AssemblyIo, MetadataFlags, WriterOptions};
//! use dotzion::metadata::module::Module;
//!
//! let io = MemoryIo::new().with_module("in.exe", Module::new("in.exe"));
//! let module = io.load(Path::new("in.exe"))?;
//!
//! let options = module.writer_options.with_flags(MetadataFlags::KEEP_OLD_MAX_STACK);
//! io.write(&module, Path::new("out.exe"), &options)?;
//! assert!(io.contains(Path::new("out.exe"))?);
//! # Ok::<(), dotzion::Error>(())
//! ```

use std::path::Path;

use bitflags::bitflags;

use crate::{metadata::module::Module, Result};

/// In-memory container backend
pub mod memory;

bitflags! {
    /// Metadata serialization flags a module was loaded with.
    ///
    /// A writer that honours these keeps the corresponding parts of the original metadata stable
    /// instead of rebuilding them from scratch.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MetadataFlags: u32 {
        /// Keep every metadata token at its original value
        const PRESERVE_TOKENS = 0x0001;
        /// Keep the `#Strings` heap offsets
        const PRESERVE_STRING_HEAP = 0x0002;
        /// Keep the `#US` heap offsets
        const PRESERVE_USER_STRING_HEAP = 0x0004;
        /// Keep the `#Blob` heap offsets
        const PRESERVE_BLOB_HEAP = 0x0008;
        /// Emit each method's original `max_stack` instead of recomputing it
        const KEEP_OLD_MAX_STACK = 0x0010;
    }
}

/// Options handed to [`AssemblyIo::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    /// Metadata serialization flags
    pub metadata_flags: MetadataFlags,
}

impl WriterOptions {
    /// Creates options with the given flags.
    #[must_use]
    pub fn new(metadata_flags: MetadataFlags) -> Self {
        WriterOptions { metadata_flags }
    }

    /// Returns a copy with `flags` added to the existing ones.
    #[must_use]
    pub fn with_flags(&self, flags: MetadataFlags) -> Self {
        WriterOptions {
            metadata_flags: self.metadata_flags | flags,
        }
    }
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            metadata_flags: MetadataFlags::empty(),
        }
    }
}

/// A container backend that can load a module from a path and serialize it back.
///
/// Implementations must leave the destination untouched when `write` fails.
pub trait AssemblyIo: Send + Sync {
    /// Loads the module stored at `path`.
    ///
    /// ## Arguments
    /// * 'path' - Location of the assembly
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a valid assembly.
    fn load(&self, path: &Path) -> Result<Module>;

    /// Serializes `module` to `path` with the given options.
    ///
    /// ## Arguments
    /// * 'module'  - The module to write
    /// * 'path'    - Destination
    /// * 'options' - Serialization options, usually derived from the module's own
    ///
    /// # Errors
    /// Returns an error if serialization or the write itself fails.
    fn write(&self, module: &Module, path: &Path, options: &WriterOptions) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_empty() {
        assert!(WriterOptions::default().metadata_flags.is_empty());
    }

    #[test]
    fn with_flags_keeps_existing() {
        let loaded = WriterOptions::new(MetadataFlags::PRESERVE_TOKENS);
        let forced = loaded.with_flags(MetadataFlags::KEEP_OLD_MAX_STACK);

        assert!(forced.metadata_flags.contains(MetadataFlags::PRESERVE_TOKENS));
        assert!(forced
            .metadata_flags
            .contains(MetadataFlags::KEEP_OLD_MAX_STACK));
        // source untouched
        assert_eq!(loaded.metadata_flags, MetadataFlags::PRESERVE_TOKENS);
    }
}
