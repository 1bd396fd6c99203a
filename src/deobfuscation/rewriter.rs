//! Per-method rewriting of protected literals and artifact calls.
//!
//! A single forward pass over a method body does two things:
//!
//! 1. Every `ldstr` operand is replaced, in place, by its decrypted value. The instruction keeps
//!    its position; only the operand changes. A literal counts as decrypted when the plaintext
//!    differs from the ciphertext. Plain strings go through the same transform, so this count is an
//!    estimate rather than an exact classification.
//! 2. Every `call`/`callvirt` to a method that uses the helper field is an artifact candidate. It
//!    is recorded for removal, together with the instruction before it, when that instruction is an
//!    `ldc.i8` and at least one `ldstr` appears anywhere earlier in the body.
//!
//! The earlier-`ldstr` test is lexical. It does not track which value actually reaches the call,
//! so a string pushed for an unrelated purpose also qualifies.
//!
//! Recorded pairs are removed in one batch after the scan. The instructions to drop are first
//! collected into a removal set: a mask over the unmodified sequence, where each instruction is
//! identified by its position in that original sequence. The set is then applied with a single
//! filter, so removing one pair can never shift the position of another.
//!
//! Rewriting is transactional per method: the pass works on a copy of the instructions and only
//! commits when the whole body was processed. A body that fails leaves the method untouched.
//!
//! # Examples
//!
//! ```rust
//! use std::collections::HashSet;
//! use dotzion::assembly::InstructionAssembler;
//! use dotzion::deobfuscation::{DecryptionCache, InstructionRewriter, StringDecryptor, XorScheme};
//! use dotzion::metadata::{member::MethodRef, method::MethodBody, token::Token};
//!
//! let decrypt = MethodRef::new(Token::new(0x06000002), "Zion.Strings", "Decrypt");
//! let helpers = HashSet::from([decrypt.token]);
//!
//! let mut asm = InstructionAssembler::new();
//! asm.ldstr("AB").ldc_i8(42).call(decrypt).ret();
//! let mut body = MethodBody::new(8, asm.finish());
//!
//! let cache = DecryptionCache::new();
//! let rewriter = InstructionRewriter::new(StringDecryptor::new(XorScheme::default(), &cache), &helpers);
//! let rewrite = rewriter.rewrite(&mut body, "Program::Main")?;
//!
//! assert_eq!(rewrite.decrypted, 1);
//! assert_eq!(rewrite.artifacts, 1);
//! assert_eq!(body.instructions.len(), 2);
//! assert!(body.keep_old_max_stack);
//! # Ok::<(), dotzion::Error>(())
//! ```

use std::collections::HashSet;

use log::{debug, warn};

use crate::{
    assembly::{Instruction, Operand},
    deobfuscation::decryptor::StringDecryptor,
    metadata::{method::MethodBody, token::Token},
    Result,
};

/// Outcome of rewriting one method body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MethodRewrite {
    /// `ldstr` operands that went through the decryptor
    pub literals: usize,
    /// Literals whose plaintext differs from the ciphertext
    pub decrypted: usize,
    /// `ldc.i8` / call pairs removed
    pub artifacts: usize,
}

/// An artifact candidate: the `ldc.i8` and the helper call right after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ArtifactPair {
    push: usize,
    call: usize,
}

/// Rewrites method bodies against a set of helper methods.
#[derive(Debug)]
pub struct InstructionRewriter<'a> {
    decryptor: StringDecryptor<'a>,
    helpers: &'a HashSet<Token>,
}

impl<'a> InstructionRewriter<'a> {
    /// Creates a rewriter.
    ///
    /// # Arguments
    ///
    /// * `decryptor` - Decrypts `ldstr` operands.
    /// * `helpers` - MethodDef tokens of the methods that use the helper field.
    #[must_use]
    pub fn new(decryptor: StringDecryptor<'a>, helpers: &'a HashSet<Token>) -> Self {
        InstructionRewriter { decryptor, helpers }
    }

    /// Rewrites `body` in place and marks it to keep its original `max_stack`.
    ///
    /// `method` is only used for log messages.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if an `ldstr` does not carry a string operand. In that
    /// case `body` is left exactly as it was.
    pub fn rewrite(&self, body: &mut MethodBody, method: &str) -> Result<MethodRewrite> {
        let mut instructions = body.instructions.clone();
        let (mut rewrite, pairs) = self.scan(&mut instructions, method)?;

        if !pairs.is_empty() {
            let removal = removal_mask(&instructions, &pairs);
            warn_on_branch_targets(&instructions, &removal, method);

            rewrite.artifacts = removal.iter().filter(|remove| **remove).count() / 2;
            instructions = instructions
                .into_iter()
                .zip(removal)
                .filter_map(|(instr, remove)| (!remove).then_some(instr))
                .collect();
        }

        body.instructions = instructions;
        body.keep_old_max_stack = true;

        Ok(rewrite)
    }

    fn scan(
        &self,
        instructions: &mut [Instruction],
        method: &str,
    ) -> Result<(MethodRewrite, Vec<ArtifactPair>)> {
        let mut rewrite = MethodRewrite::default();
        let mut pairs = Vec::new();
        let mut seen_string = false;

        for index in 0..instructions.len() {
            if instructions[index].is_string_push() {
                let offset = instructions[index].offset;
                let Operand::String(ciphertext) = &mut instructions[index].operand else {
                    return Err(malformed_error!(
                        "ldstr at IL_{:04X} in {} has no string operand",
                        offset,
                        method
                    ));
                };

                let plaintext = self.decryptor.decrypt(ciphertext);
                debug!(
                    "{:?} -> {:?} in {}",
                    ciphertext.to_string_lossy(),
                    plaintext.to_string_lossy(),
                    method
                );

                if plaintext != *ciphertext {
                    rewrite.decrypted += 1;
                }
                rewrite.literals += 1;
                *ciphertext = plaintext;
                seen_string = true;
                continue;
            }

            if !self.is_helper_call(&instructions[index]) || !seen_string || index == 0 {
                continue;
            }

            if instructions[index - 1].is_int64_push() {
                debug!(
                    "artifact pair at IL_{:04X} / IL_{:04X} in {}",
                    instructions[index - 1].offset,
                    instructions[index].offset,
                    method
                );
                pairs.push(ArtifactPair {
                    push: index - 1,
                    call: index,
                });
            }
        }

        Ok((rewrite, pairs))
    }

    fn is_helper_call(&self, instr: &Instruction) -> bool {
        instr.is_call()
            && instr
                .get_method_operand()
                .is_some_and(|target| self.helpers.contains(&target.token))
    }
}

/// Marks the instructions of every still-adjacent pair.
fn removal_mask(instructions: &[Instruction], pairs: &[ArtifactPair]) -> Vec<bool> {
    let mut removal = vec![false; instructions.len()];

    for pair in pairs {
        let adjacent = pair.call == pair.push + 1
            && instructions
                .get(pair.push)
                .is_some_and(Instruction::is_int64_push)
            && instructions
                .get(pair.call)
                .is_some_and(Instruction::is_call);
        if !adjacent || removal[pair.push] || removal[pair.call] {
            continue;
        }

        removal[pair.push] = true;
        removal[pair.call] = true;
    }

    removal
}

fn warn_on_branch_targets(instructions: &[Instruction], removal: &[bool], method: &str) {
    let targets: HashSet<u64> = instructions
        .iter()
        .filter(|instr| instr.is_branch())
        .flat_map(Instruction::get_targets)
        .collect();
    if targets.is_empty() {
        return;
    }

    for (instr, _) in instructions
        .iter()
        .zip(removal)
        .filter(|(_, remove)| **remove)
    {
        if targets.contains(&instr.offset) {
            warn!(
                "removed {} at IL_{:04X} in {} is a branch target",
                instr.mnemonic, instr.offset, method
            );
        }
    }
}
