//! Configuration for the deobfuscation engine.
//!
//! This module provides configuration types for controlling the string deobfuscation pipeline:
//! where the helper field lives, the transform used to decrypt literals, the output naming and
//! which artifacts are removed afterwards.

use crate::deobfuscation::decryptor::XorScheme;

/// Configuration for the deobfuscation engine.
///
/// # Examples
///
/// ```rust
/// use dotzion::deobfuscation::{CleanupConfig, EngineConfig};
///
/// let config = EngineConfig::new()
///     .with_helper_field("sTable")
///     .with_cleanup(CleanupConfig::disabled());
///
/// assert_eq!(config.helper_type, "<Module>");
/// assert_eq!(config.helper_field, "sTable");
/// assert!(!config.cleanup.any_enabled());
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Full name of the type declaring the helper field (default: `<Module>`).
    ///
    /// Matched against the namespace-qualified name (`Namespace.Name`), so a helper living in a
    /// namespace must be configured with it. `<Module>` has no namespace, so the default is
    /// unaffected.
    pub helper_type: String,

    /// Name of the static field whose users identify the helper methods (default: `hTable`).
    pub helper_field: String,

    /// Transform applied to every string literal.
    pub scheme: XorScheme,

    /// Appended to the input file stem to name the output (default: `-decrypted`).
    pub output_suffix: String,

    /// Post-deobfuscation cleanup configuration.
    pub cleanup: CleanupConfig,
}

/// Configuration for post-deobfuscation cleanup.
///
/// Controls what artifacts are removed after the rewrite. Both options default to `true`. Removing
/// support types is unconditional once enabled: the types are dropped even if code outside the
/// removed artifact calls still references them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupConfig {
    /// Remove the helper field from its declaring type.
    pub remove_helper_field: bool,

    /// Remove every type owning a method that reads or writes the helper field.
    pub remove_support_types: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            remove_helper_field: true,
            remove_support_types: true,
        }
    }
}

impl CleanupConfig {
    /// Creates a new cleanup configuration with all options enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration with all cleanup disabled.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            remove_helper_field: false,
            remove_support_types: false,
        }
    }

    /// Returns true if any cleanup is enabled.
    #[must_use]
    pub fn any_enabled(&self) -> bool {
        self.remove_helper_field || self.remove_support_types
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            helper_type: "<Module>".to_string(),
            helper_field: "hTable".to_string(),
            scheme: XorScheme::default(),
            output_suffix: "-decrypted".to_string(),
            cleanup: CleanupConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the full name of the type declaring the helper field.
    ///
    /// # Arguments
    ///
    /// * `name` - Full type name, e.g. `<Module>` or `Protector.Strings`.
    ///
    /// # Returns
    ///
    /// The modified configuration (builder pattern).
    #[must_use]
    pub fn with_helper_type(mut self, name: impl Into<String>) -> Self {
        self.helper_type = name.into();
        self
    }

    /// Sets the helper field name.
    #[must_use]
    pub fn with_helper_field(mut self, name: impl Into<String>) -> Self {
        self.helper_field = name.into();
        self
    }

    /// Sets the decryption transform.
    #[must_use]
    pub fn with_scheme(mut self, scheme: XorScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Sets the suffix used to name the output file.
    #[must_use]
    pub fn with_output_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.output_suffix = suffix.into();
        self
    }

    /// Sets the cleanup configuration.
    #[must_use]
    pub fn with_cleanup(mut self, cleanup: CleanupConfig) -> Self {
        self.cleanup = cleanup;
        self
    }
}
