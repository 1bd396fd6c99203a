//! CIL instruction model shared by the container backends and the deobfuscation passes.
//!
//! # Key Types
//!
//! - [`Instruction`] - One instruction of a method body, operands in resolved form
//! - [`Operand`] / [`Immediate`] - Operand payloads
//! - [`FlowType`] - How an instruction affects control flow
//! - [`InstructionAssembler`] - Builds laid-out instruction sequences
//!
//! Raw opcode bytes live in [`opcodes`].

mod assembler;
mod instruction;
pub mod opcodes;

pub use assembler::InstructionAssembler;
pub use instruction::{FlowType, Immediate, Instruction, Operand};
