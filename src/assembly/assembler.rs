//! Fluent construction of laid-out instruction sequences.
//!
//! [`InstructionAssembler`] appends instructions one by one and assigns each its offset and
//! encoded size according to ECMA-335 III, so the resulting sequence looks exactly like one read
//! from a real method body. Container backends use it to materialise bodies, and it is the
//! natural way to build fixtures for the deobfuscation passes.
//!
//! # Examples
//!
//! ```rust
//! use dotzion::assembly::InstructionAssembler;
//! use dotzion::metadata::{member::MethodRef, token::Token};
//!
//! let decrypt = MethodRef::new(Token::new(0x06000002), "<Module>", "Decrypt");
//!
//! let mut asm = InstructionAssembler::new();
//! asm.ldstr("@C").ldc_i8(0x5EED).call(decrypt).ret();
//! let body = asm.finish();
//!
//! assert_eq!(body.len(), 4);
//! assert_eq!(body[2].offset, 14);
//! ```

use widestring::U16String;

use crate::{
    assembly::{
        instruction::{FlowType, Immediate, Instruction, Operand},
        opcodes,
    },
    metadata::member::{FieldRef, MethodRef},
};

/// Builds an instruction sequence with computed offsets and sizes.
///
/// Every emitter returns `&mut Self` so calls can be chained.
#[derive(Debug, Default)]
pub struct InstructionAssembler {
    instructions: Vec<Instruction>,
    offset: u64,
}

impl InstructionAssembler {
    /// Creates an empty assembler positioned at offset 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the offset the next emitted instruction will get.
    #[must_use]
    pub fn current_offset(&self) -> u64 {
        self.offset
    }

    /// Consumes the assembler and returns the instructions emitted so far.
    #[must_use]
    pub fn finish(self) -> Vec<Instruction> {
        self.instructions
    }

    fn emit(
        &mut self,
        prefix: u8,
        opcode: u8,
        mnemonic: &'static str,
        flow_type: FlowType,
        operand: Operand,
        operand_size: u64,
    ) -> &mut Self {
        let size = if prefix == 0 { 1 } else { 2 } + operand_size;
        self.instructions.push(Instruction {
            offset: self.offset,
            size,
            opcode,
            prefix,
            mnemonic,
            flow_type,
            operand,
        });
        self.offset += size;
        self
    }

    fn simple(&mut self, opcode: u8, mnemonic: &'static str) -> &mut Self {
        self.emit(0, opcode, mnemonic, FlowType::Sequential, Operand::None, 0)
    }

    /// `nop`
    pub fn nop(&mut self) -> &mut Self {
        self.simple(opcodes::NOP, "nop")
    }

    /// `ret`
    pub fn ret(&mut self) -> &mut Self {
        self.emit(0, opcodes::RET, "ret", FlowType::Return, Operand::None, 0)
    }

    /// `pop`
    pub fn pop(&mut self) -> &mut Self {
        self.simple(opcodes::POP, "pop")
    }

    /// `dup`
    pub fn dup(&mut self) -> &mut Self {
        self.simple(opcodes::DUP, "dup")
    }

    /// `ldnull`
    pub fn ldnull(&mut self) -> &mut Self {
        self.simple(opcodes::LDNULL, "ldnull")
    }

    /// `ldarg.0`
    pub fn ldarg_0(&mut self) -> &mut Self {
        self.simple(opcodes::LDARG_0, "ldarg.0")
    }

    /// `ldarg.1`
    pub fn ldarg_1(&mut self) -> &mut Self {
        self.simple(opcodes::LDARG_1, "ldarg.1")
    }

    /// `ldloc.0`
    pub fn ldloc_0(&mut self) -> &mut Self {
        self.simple(opcodes::LDLOC_0, "ldloc.0")
    }

    /// `stloc.0`
    pub fn stloc_0(&mut self) -> &mut Self {
        self.simple(opcodes::STLOC_0, "stloc.0")
    }

    /// `ceq`
    pub fn ceq(&mut self) -> &mut Self {
        self.emit(
            opcodes::FE_PREFIX,
            opcodes::FE_CEQ,
            "ceq",
            FlowType::Sequential,
            Operand::None,
            0,
        )
    }

    /// Pushes a 32-bit constant, picking `ldc.i4.s` when the value fits in a byte.
    pub fn ldc_i4(&mut self, value: i32) -> &mut Self {
        match i8::try_from(value) {
            Ok(short) => self.emit(
                0,
                opcodes::LDC_I4_S,
                "ldc.i4.s",
                FlowType::Sequential,
                Operand::Immediate(Immediate::Int8(short)),
                1,
            ),
            Err(_) => self.emit(
                0,
                opcodes::LDC_I4,
                "ldc.i4",
                FlowType::Sequential,
                Operand::Immediate(Immediate::Int32(value)),
                4,
            ),
        }
    }

    /// `ldc.i8 <value>`
    pub fn ldc_i8(&mut self, value: i64) -> &mut Self {
        self.emit(
            0,
            opcodes::LDC_I8,
            "ldc.i8",
            FlowType::Sequential,
            Operand::Immediate(Immediate::Int64(value)),
            8,
        )
    }

    /// `ldstr <value>`
    pub fn ldstr(&mut self, value: &str) -> &mut Self {
        self.ldstr_utf16(U16String::from_str(value))
    }

    /// `ldstr` with a literal that is already UTF-16, possibly containing unpaired surrogates.
    pub fn ldstr_utf16(&mut self, value: U16String) -> &mut Self {
        self.emit(
            0,
            opcodes::LDSTR,
            "ldstr",
            FlowType::Sequential,
            Operand::String(value),
            4,
        )
    }

    /// `call <method>`
    pub fn call(&mut self, method: MethodRef) -> &mut Self {
        self.emit(
            0,
            opcodes::CALL,
            "call",
            FlowType::Call,
            Operand::Method(method),
            4,
        )
    }

    /// `callvirt <method>`
    pub fn callvirt(&mut self, method: MethodRef) -> &mut Self {
        self.emit(
            0,
            opcodes::CALLVIRT,
            "callvirt",
            FlowType::Call,
            Operand::Method(method),
            4,
        )
    }

    /// `newobj <ctor>`
    pub fn newobj(&mut self, ctor: MethodRef) -> &mut Self {
        self.emit(
            0,
            opcodes::NEWOBJ,
            "newobj",
            FlowType::Call,
            Operand::Method(ctor),
            4,
        )
    }

    /// `ldsfld <field>`
    pub fn ldsfld(&mut self, field: FieldRef) -> &mut Self {
        self.emit(
            0,
            opcodes::LDSFLD,
            "ldsfld",
            FlowType::Sequential,
            Operand::Field(field),
            4,
        )
    }

    /// `stsfld <field>`
    pub fn stsfld(&mut self, field: FieldRef) -> &mut Self {
        self.emit(
            0,
            opcodes::STSFLD,
            "stsfld",
            FlowType::Sequential,
            Operand::Field(field),
            4,
        )
    }

    /// `br <target>` with an absolute target offset
    pub fn br(&mut self, target: u64) -> &mut Self {
        self.emit(
            0,
            opcodes::BR,
            "br",
            FlowType::UnconditionalBranch,
            Operand::Target(target),
            4,
        )
    }

    /// `br.s <target>` with an absolute target offset
    pub fn br_s(&mut self, target: u64) -> &mut Self {
        self.emit(
            0,
            opcodes::BR_S,
            "br.s",
            FlowType::UnconditionalBranch,
            Operand::Target(target),
            1,
        )
    }

    /// `brfalse.s <target>` with an absolute target offset
    pub fn brfalse_s(&mut self, target: u64) -> &mut Self {
        self.emit(
            0,
            opcodes::BRFALSE_S,
            "brfalse.s",
            FlowType::ConditionalBranch,
            Operand::Target(target),
            1,
        )
    }
}
