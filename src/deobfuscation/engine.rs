//! Main deobfuscation engine.
//!
//! The [`DeobfuscationEngine`] is the entry point for deobfuscating a loaded module. It runs the
//! three stages in order and aggregates their outcome into a [`DeobfuscationResult`].

use std::time::Instant;

use log::{error, info, warn};

use crate::{
    deobfuscation::{
        cache::DecryptionCache,
        cleanup::CleanupRequest,
        config::EngineConfig,
        decryptor::StringDecryptor,
        locator::ArtifactLocator,
        result::{DeobfuscationResult, MethodFailure},
        rewriter::InstructionRewriter,
    },
    metadata::module::Module,
};

/// Main deobfuscation engine.
///
/// The engine orchestrates the complete pipeline:
///
/// 1. **Locate**: find the helper field and the methods using it. A module without the field, or
///    whose field no method body references, is left untouched.
/// 2. **Rewrite**: decrypt every `ldstr` and strip artifact calls, method by method. A method
///    that fails is recorded and skipped; the others proceed.
/// 3. **Cleanup**: remove the helper field and the support types, as configured.
///
/// The [`DecryptionCache`] is owned by the caller and passed in, so one cache can serve a whole
/// run.
///
/// # Example
///
/// ```rust
/// use dotzion::deobfuscation::{DecryptionCache, DeobfuscationEngine, EngineConfig};
/// use dotzion::metadata::module::Module;
///
/// let engine = DeobfuscationEngine::new(EngineConfig::default());
/// let cache = DecryptionCache::new();
/// let mut module = Module::new("app.exe");
///
/// let result = engine.process(&mut module, &cache);
/// println!("{}", result.summary());
/// ```
#[derive(Debug, Clone, Default)]
pub struct DeobfuscationEngine {
    config: EngineConfig,
}

impl DeobfuscationEngine {
    /// Creates a new engine with the given configuration.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Returns the engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Deobfuscates `module` in place.
    ///
    /// Never fails as a whole: per-method problems end up in
    /// [`DeobfuscationResult::method_failures`], a cleanup problem in
    /// [`DeobfuscationResult::failure`]. Whatever was rewritten before stays rewritten.
    pub fn process(&self, module: &mut Module, cache: &DecryptionCache) -> DeobfuscationResult {
        let start = Instant::now();
        let mut result = DeobfuscationResult::new();

        let Some(findings) = ArtifactLocator::from_config(&self.config).locate(module) else {
            info!(
                "{}: no {}::{} field, nothing to do",
                module.name, self.config.helper_type, self.config.helper_field
            );
            return result.with_timing(start.elapsed());
        };
        result.helper_found = true;

        if !findings.is_referenced() {
            info!(
                "{}: {} is not referenced by any method body, leaving module untouched",
                module.name, findings.helper
            );
            return result.with_timing(start.elapsed());
        }

        let decryptor = StringDecryptor::new(self.config.scheme, cache);
        let rewriter = InstructionRewriter::new(decryptor, &findings.methods);

        for ty in &mut module.types {
            let type_name = ty.full_name();
            for method in &mut ty.methods {
                let name = format!("{type_name}::{}", method.name);
                let Some(body) = method.body.as_mut() else {
                    continue;
                };

                match rewriter.rewrite(body, &name) {
                    Ok(rewrite) => result.record(&rewrite),
                    Err(error) => {
                        warn!("skipping {name}: {error}");
                        result.method_failures.push(MethodFailure {
                            token: method.token,
                            name,
                            error,
                        });
                    }
                }
            }
        }

        info!(
            "{}: decrypted {} strings, removed {} artifact pairs",
            module.name, result.strings_decrypted, result.artifacts_removed
        );

        if self.config.cleanup.any_enabled() {
            let request = CleanupRequest::from_findings(&findings, &self.config.cleanup);
            match request.execute(module) {
                Ok(summary) => result.cleanup = summary,
                Err(failure) => {
                    error!("{}: cleanup failed: {failure}", module.name);
                    result.failure = Some(failure);
                }
            }
        }

        result.with_timing(start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::{opcodes, FlowType, Instruction, InstructionAssembler, Operand},
        deobfuscation::config::CleanupConfig,
        metadata::{method::MethodBody, module::MethodDef, token::Token},
        test::{encrypt, protected_module, string_operands, ModuleBuilder},
        Error,
    };

    #[test]
    fn test_clean_module_untouched() {
        let mut module = ModuleBuilder::new("clean.exe").with_program(&["AB"]).build();
        let before = module.clone();

        let cache = DecryptionCache::new();
        let result = DeobfuscationEngine::default().process(&mut module, &cache);

        assert!(!result.helper_found);
        assert_eq!(result.strings_decrypted, 0);
        assert_eq!(module, before);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unreferenced_helper_untouched() {
        let mut module = ModuleBuilder::new("idle.exe")
            .with_helper()
            .with_program(&["AB"])
            .build();
        let before = module.clone();

        let cache = DecryptionCache::new();
        let result = DeobfuscationEngine::default().process(&mut module, &cache);

        assert!(result.helper_found);
        assert_eq!(result.strings_decrypted, 0);
        assert_eq!(result.methods_processed, 0);
        assert!(!result.cleanup.has_changes());
        assert_eq!(module, before);
    }

    #[test]
    fn test_protected_module() {
        let mut module = protected_module();
        let cache = DecryptionCache::new();
        let result = DeobfuscationEngine::default().process(&mut module, &cache);

        assert!(result.is_success());
        assert_eq!(result.strings_decrypted, 3);
        assert_eq!(result.artifacts_removed, 2);
        assert_eq!(result.methods_processed, 4);
        assert!(result.cleanup.helper_field_removed);
        assert_eq!(
            result.cleanup.types_removed,
            vec![Token::new(0x02000002), Token::new(0x02000001)]
        );

        // only the program type survives
        assert_eq!(module.types.len(), 1);
        let program = module.find_type("App.Program").unwrap();
        let main = program.methods[0].body.as_ref().unwrap();
        assert_eq!(string_operands(main), vec!["Hello world", "done"]);
        assert!(main.keep_old_max_stack);
        assert!(main.instructions.iter().all(|i| !i.is_int64_push()));

        // "done" appears twice; the second one is served from the cache
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn test_cleanup_disabled() {
        let mut module = protected_module();
        let cache = DecryptionCache::new();
        let engine =
            DeobfuscationEngine::new(EngineConfig::new().with_cleanup(CleanupConfig::disabled()));

        let result = engine.process(&mut module, &cache);

        assert_eq!(result.strings_decrypted, 3);
        assert!(!result.cleanup.has_changes());
        assert_eq!(module.types.len(), 3);
        assert!(module
            .find_type("<Module>")
            .unwrap()
            .find_field("hTable")
            .is_some());
    }

    #[test]
    fn test_malformed_method_isolated() {
        let mut module = protected_module();
        let mut asm = InstructionAssembler::new();
        asm.ldstr(&encrypt("kept"));
        let mut instructions = asm.finish();
        instructions.push(Instruction {
            offset: 5,
            size: 5,
            opcode: opcodes::LDSTR,
            prefix: 0,
            mnemonic: "ldstr",
            flow_type: FlowType::Sequential,
            operand: Operand::Token(Token::new(0x70000001)),
        });
        let broken = MethodBody::new(1, instructions);
        module.types[2].methods.push(MethodDef::new(
            Token::new(0x06000009),
            "Broken",
            Some(broken.clone()),
        ));

        let cache = DecryptionCache::new();
        let result = DeobfuscationEngine::default().process(&mut module, &cache);

        assert_eq!(result.strings_decrypted, 3);
        assert_eq!(result.method_failures.len(), 1);
        let failure = &result.method_failures[0];
        assert_eq!(failure.token, Token::new(0x06000009));
        assert_eq!(failure.name, "App.Program::Broken");
        assert!(matches!(failure.error, Error::Malformed { .. }));

        let program = module.find_type("App.Program").unwrap();
        assert_eq!(program.methods.last().unwrap().body.as_ref(), Some(&broken));
    }

    #[test]
    fn test_custom_helper_names() {
        let mut module = protected_module();
        let before = module.clone();
        let cache = DecryptionCache::new();
        let engine = DeobfuscationEngine::new(EngineConfig::new().with_helper_field("other"));

        let result = engine.process(&mut module, &cache);

        assert!(!result.helper_found);
        assert_eq!(module, before);
    }
}
