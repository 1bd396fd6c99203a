//! CIL opcode byte constants (ECMA-335).
//!
//! Only the opcodes the rewriter inspects and the [`crate::assembly::InstructionAssembler`]
//! emits are listed. Single-byte opcodes are named after their mnemonic (e.g. [`CALL`] =
//! `0x28`). Two-byte opcodes that use the `0xFE` prefix have their second byte stored with an
//! `FE_` prefix (e.g. [`FE_CEQ`] = `0x01` for the `ceq` instruction `0xFE 0x01`).
#![allow(missing_docs)]

// Misc
pub const NOP: u8 = 0x00;

// Load argument / local shorthand
pub const LDARG_0: u8 = 0x02;
pub const LDARG_1: u8 = 0x03;
pub const LDLOC_0: u8 = 0x06;
pub const STLOC_0: u8 = 0x0A;

// Null / constant loaders
pub const LDNULL: u8 = 0x14;
pub const LDC_I4_S: u8 = 0x1F;
pub const LDC_I4: u8 = 0x20;
pub const LDC_I8: u8 = 0x21;

// Stack manipulation
pub const DUP: u8 = 0x25;
pub const POP: u8 = 0x26;

// Call / return
pub const CALL: u8 = 0x28;
pub const RET: u8 = 0x2A;

// Branch
pub const BR_S: u8 = 0x2B;
pub const BRFALSE_S: u8 = 0x2C;
pub const BR: u8 = 0x38;

// Virtual call / object model
pub const CALLVIRT: u8 = 0x6F;
pub const LDSTR: u8 = 0x72;
pub const NEWOBJ: u8 = 0x73;

// Field access
pub const LDSFLD: u8 = 0x7E;
pub const STSFLD: u8 = 0x80;

// Two-byte opcodes (0xFE prefix); the constants below are the second byte.
pub const FE_PREFIX: u8 = 0xFE;
pub const FE_CEQ: u8 = 0x01;
