//! Deobfuscation result types.
//!
//! This module contains the [`DeobfuscationResult`] struct which encapsulates
//! the outcome of running the deobfuscation engine on a module.

use std::time::Duration;

use crate::{deobfuscation::rewriter::MethodRewrite, metadata::token::Token, Error};

/// A method whose body could not be rewritten.
///
/// The method keeps its original instructions and contributes nothing to the counts.
#[derive(Debug)]
pub struct MethodFailure {
    /// MethodDef token of the failed method
    pub token: Token,
    /// `Type::Method` name, for reporting
    pub name: String,
    /// Why the rewrite failed
    pub error: Error,
}

/// What cleanup removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupSummary {
    /// The helper field was removed from its declaring type
    pub helper_field_removed: bool,
    /// Support types removed, in removal order
    pub types_removed: Vec<Token>,
}

impl CleanupSummary {
    /// Returns true if cleanup removed anything.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.helper_field_removed || !self.types_removed.is_empty()
    }
}

/// Result of running deobfuscation on a module.
///
/// # Example
///
/// ```rust
/// use dotzion::deobfuscation::{DecryptionCache, DeobfuscationEngine, EngineConfig};
/// use dotzion::metadata::module::Module;
///
/// let mut module = Module::new("clean.dll");
/// let cache = DecryptionCache::new();
/// let result = DeobfuscationEngine::new(EngineConfig::default()).process(&mut module, &cache);
///
/// assert!(!result.helper_found);
/// assert_eq!(result.strings_decrypted, 0);
/// println!("{}", result.summary());
/// ```
#[derive(Debug, Default)]
pub struct DeobfuscationResult {
    /// The helper field exists in the module.
    pub helper_found: bool,
    /// Method bodies rewritten successfully.
    pub methods_processed: usize,
    /// `ldstr` operands replaced.
    pub literals_rewritten: usize,
    /// Literals whose plaintext differs from the ciphertext.
    pub strings_decrypted: usize,
    /// Artifact pairs removed.
    pub artifacts_removed: usize,
    /// Methods skipped because their body could not be rewritten.
    pub method_failures: Vec<MethodFailure>,
    /// What cleanup removed.
    pub cleanup: CleanupSummary,
    /// Failure that stopped the run after the rewrite, if any.
    pub failure: Option<Error>,
    /// Total processing time.
    pub total_time: Duration,
}

impl DeobfuscationResult {
    /// Creates an empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets timing info.
    #[must_use]
    pub fn with_timing(mut self, time: Duration) -> Self {
        self.total_time = time;
        self
    }

    /// Adds the outcome of one successfully rewritten method.
    pub fn record(&mut self, rewrite: &MethodRewrite) {
        self.methods_processed += 1;
        self.literals_rewritten += rewrite.literals;
        self.strings_decrypted += rewrite.decrypted;
        self.artifacts_removed += rewrite.artifacts;
    }

    /// Returns true if any literal was decrypted, i.e. the module is worth writing.
    #[must_use]
    pub fn has_decrypted(&self) -> bool {
        self.strings_decrypted > 0
    }

    /// Returns true if nothing went wrong, per method or overall.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failure.is_none() && self.method_failures.is_empty()
    }

    /// Generates a human-readable summary of the deobfuscation results.
    #[must_use]
    pub fn summary(&self) -> String {
        if !self.helper_found {
            return format!(
                "helper not found, nothing to do ({:.2?})",
                self.total_time
            );
        }

        let mut summary = format!(
            "{} strings decrypted, {} literals rewritten, {} artifact pairs removed in {} methods",
            self.strings_decrypted,
            self.literals_rewritten,
            self.artifacts_removed,
            self.methods_processed
        );
        if !self.method_failures.is_empty() {
            summary.push_str(&format!(", {} methods failed", self.method_failures.len()));
        }
        if self.cleanup.helper_field_removed {
            summary.push_str(", helper field removed");
        }
        if !self.cleanup.types_removed.is_empty() {
            summary.push_str(&format!(
                ", {} types removed",
                self.cleanup.types_removed.len()
            ));
        }
        if let Some(failure) = &self.failure {
            summary.push_str(&format!(", failed: {failure}"));
        }
        summary.push_str(&format!(" ({:.2?})", self.total_time));
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_accumulates() {
        let mut result = DeobfuscationResult::new();
        result.record(&MethodRewrite {
            literals: 3,
            decrypted: 2,
            artifacts: 1,
        });
        result.record(&MethodRewrite::default());

        assert_eq!(result.methods_processed, 2);
        assert_eq!(result.literals_rewritten, 3);
        assert_eq!(result.strings_decrypted, 2);
        assert_eq!(result.artifacts_removed, 1);
        assert!(result.has_decrypted());
        assert!(result.is_success());
    }

    #[test]
    fn summary_mentions_everything_relevant() {
        let mut result = DeobfuscationResult {
            helper_found: true,
            ..DeobfuscationResult::default()
        };
        result.record(&MethodRewrite {
            literals: 4,
            decrypted: 4,
            artifacts: 2,
        });
        result.cleanup.helper_field_removed = true;
        result.cleanup.types_removed.push(Token::new(0x02000002));
        result.method_failures.push(MethodFailure {
            token: Token::new(0x06000009),
            name: "A::B".to_string(),
            error: malformed_error!("bad"),
        });

        let summary = result.summary();
        assert!(summary.starts_with("4 strings decrypted, 4 literals rewritten"));
        assert!(summary.contains("2 artifact pairs removed in 1 methods"));
        assert!(summary.contains("1 methods failed"));
        assert!(summary.contains("helper field removed"));
        assert!(summary.contains("1 types removed"));
        assert!(!result.is_success());
    }

    #[test]
    fn summary_without_helper() {
        let result = DeobfuscationResult::new();
        assert!(result.summary().starts_with("helper not found"));
        assert!(!result.cleanup.has_changes());
    }
}
