//! CIL instruction representation and operand types.
//!
//! An [`Instruction`] is one element of a method body's instruction stream. Unlike a raw
//! disassembly, operands referring to metadata are carried in resolved form: `ldstr` holds the
//! UTF-16 literal itself ([`Operand::String`]), field and method instructions hold a
//! [`FieldRef`] / [`MethodRef`]. This is what the deobfuscation passes need to inspect and rewrite
//! a body without going back to the heaps.
//!
//! # Key Components
//!
//! - [`Instruction`] - One instruction with its location, opcode and operand
//! - [`Operand`] - Type-safe operand representation
//! - [`Immediate`] - Integer constants embedded in the stream
//! - [`FlowType`] - Control flow behavior classification
//!
//! # Usage Examples
//!
//! ```rust
//! use dotzion::assembly::InstructionAssembler;
//!
//! let mut asm = InstructionAssembler::new();
//! asm.ldstr("AB").ldc_i8(7).pop().pop().ret();
//! let instructions = asm.finish();
//!
//! assert!(instructions[0].is_string_push());
//! assert_eq!(instructions[1].get_i64_operand(), Some(7));
//! assert_eq!(instructions[1].offset, 5);
//! ```

use std::fmt::{self, UpperHex};

use widestring::{U16Str, U16String};

use crate::{
    assembly::opcodes,
    metadata::{
        member::{FieldRef, MethodRef},
        token::Token,
    },
};

/// A constant encoded directly in the instruction stream.
///
/// Only the widths the `ldc.i4` / `ldc.i8` family produce are modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Immediate {
    /// `ldc.i4.s` operand
    Int8(i8),
    /// `ldc.i4` operand
    Int32(i32),
    /// `ldc.i8` operand
    Int64(i64),
}

impl UpperHex for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Immediate::Int8(value) => write!(f, "{value:02X}"),
            Immediate::Int32(value) => write!(f, "{value:08X}"),
            Immediate::Int64(value) => write!(f, "{value:016X}"),
        }
    }
}

/// Represents an instruction operand in resolved form.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand present
    None,
    /// Immediate value (constant embedded in instruction)
    Immediate(Immediate),
    /// Branch target address
    Target(u64),
    /// Unresolved metadata token reference
    Token(Token),
    /// User string literal (`ldstr`), UTF-16 as stored in the `#US` heap
    String(U16String),
    /// Field reference (`ldsfld`, `stsfld`, ...)
    Field(FieldRef),
    /// Method reference (`call`, `callvirt`, `newobj`)
    Method(MethodRef),
    /// Switch table with multiple signed branch offsets
    Switch(Vec<i32>),
}

/// How an instruction affects control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowType {
    /// Normal execution continues to next instruction
    Sequential,
    /// Conditional branch to another location
    ConditionalBranch,
    /// Always branches to another location (unconditional jump)
    UnconditionalBranch,
    /// Call to another method
    Call,
    /// Returns from current method
    Return,
    /// Multi-way branch (switch statement)
    Switch,
}

/// A CIL instruction inside a method body.
///
/// `offset` and `size` describe where the instruction sat in the body it was read from. They are
/// not recomputed when the stream is edited; laying out the final code is the serializer's job.
#[derive(Clone, PartialEq)]
pub struct Instruction {
    /// Offset of this instruction from the start of the method's code
    pub offset: u64,
    /// Size of this instruction in bytes
    pub size: u64,
    /// Primary opcode byte
    pub opcode: u8,
    /// Prefix byte (0 if no prefix)
    pub prefix: u8,
    /// Human-readable instruction mnemonic (e.g., "ldstr", "call", "ret")
    pub mnemonic: &'static str,
    /// How this instruction affects control flow
    pub flow_type: FlowType,
    /// The operand data for this instruction
    pub operand: Operand,
}

impl Instruction {
    /// Returns true for `ldstr`.
    #[must_use]
    pub fn is_string_push(&self) -> bool {
        self.prefix == 0 && self.opcode == opcodes::LDSTR
    }

    /// Returns true for `ldc.i8`.
    #[must_use]
    pub fn is_int64_push(&self) -> bool {
        self.prefix == 0 && self.opcode == opcodes::LDC_I8
    }

    /// Returns true for `call` and `callvirt`.
    #[must_use]
    pub fn is_call(&self) -> bool {
        self.prefix == 0 && matches!(self.opcode, opcodes::CALL | opcodes::CALLVIRT)
    }

    /// Check if this instruction is a branch instruction.
    #[must_use]
    pub fn is_branch(&self) -> bool {
        matches!(
            self.flow_type,
            FlowType::ConditionalBranch | FlowType::UnconditionalBranch | FlowType::Switch
        )
    }

    /// Returns the string literal of an `ldstr` operand.
    #[must_use]
    pub fn get_string_operand(&self) -> Option<&U16Str> {
        match &self.operand {
            Operand::String(value) => Some(value.as_ustr()),
            _ => None,
        }
    }

    /// Returns the field this instruction references.
    #[must_use]
    pub fn get_field_operand(&self) -> Option<&FieldRef> {
        match &self.operand {
            Operand::Field(field) => Some(field),
            _ => None,
        }
    }

    /// Returns the method this instruction references.
    #[must_use]
    pub fn get_method_operand(&self) -> Option<&MethodRef> {
        match &self.operand {
            Operand::Method(method) => Some(method),
            _ => None,
        }
    }

    /// Returns an integer constant operand widened to i64.
    #[must_use]
    pub fn get_i64_operand(&self) -> Option<i64> {
        match &self.operand {
            Operand::Immediate(Immediate::Int64(v)) => Some(*v),
            Operand::Immediate(Immediate::Int32(v)) => Some(i64::from(*v)),
            Operand::Immediate(Immediate::Int8(v)) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// Returns the absolute branch targets of this instruction.
    ///
    /// Switch offsets are relative to the end of the instruction, as encoded in IL.
    #[must_use]
    pub fn get_targets(&self) -> Vec<u64> {
        match &self.operand {
            Operand::Target(target) => vec![*target],
            Operand::Switch(offsets) => {
                let next = self.offset + self.size;
                offsets
                    .iter()
                    .map(|rel| next.wrapping_add_signed(i64::from(*rel)))
                    .collect()
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04X} - ", self.offset)?;

        if self.prefix != 0 {
            write!(f, "{:02X}:", self.prefix)?;
        }

        write!(f, "{:02X} - {:<12}", self.opcode, self.mnemonic)?;

        match &self.operand {
            Operand::None => {}
            Operand::Immediate(imm) => {
                write!(f, " 0x{imm:X}")?;
            }
            Operand::Target(target) => {
                write!(f, " -> IL_{target:04X}")?;
            }
            Operand::Token(token) => {
                write!(f, " token:0x{:08X}", token.value())?;
            }
            Operand::String(value) => {
                write!(f, " {:?}", value.to_string_lossy())?;
            }
            Operand::Field(field) => {
                write!(f, " {field}")?;
            }
            Operand::Method(method) => {
                write!(f, " {method}")?;
            }
            Operand::Switch(items) => {
                write!(f, " switch[{}]", items.len())?;
            }
        }

        if self.flow_type != FlowType::Sequential {
            write!(f, " | {:?}", self.flow_type)?;
        }

        write!(f, " | size:{}", self.size)
    }
}
