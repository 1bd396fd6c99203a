//! Fixtures shared by the unit tests.
//!
//! Token layout of [`protected_module`]:
//!
//! | Token | Item |
//! |-------|------|
//! | `0x02000001` | `<Module>`, owns `hTable` (`0x04000001`) and `.cctor` (`0x06000001`) |
//! | `0x02000002` | `Zion.Strings`, owns `Decrypt` (`0x06000002`) |
//! | `0x02000003` | `App.Program`, owns `Main` (`0x06000003`) and `Tail` (`0x06000004`) |

use widestring::U16String;

use crate::{
    assembly::InstructionAssembler,
    metadata::{
        member::{FieldRef, MethodRef},
        method::MethodBody,
        module::{FieldDef, MethodDef, Module, TypeDef},
        token::Token,
    },
};

const HASHTABLE: &str = "System.Collections.Hashtable";

// Helper function to encrypt a literal the way the protection does (each code unit ^ 1)
pub fn encrypt(plain: &str) -> String {
    let units: Vec<u16> = plain.encode_utf16().map(|unit| unit ^ 1).collect();
    U16String::from_vec(units).to_string_lossy()
}

// Helper function to create a reference to the helper field through any token
pub fn helper_field_ref(token: Token) -> FieldRef {
    FieldRef::new(token, "<Module>", "hTable", HASHTABLE)
}

// Helper function to create a reference to the obfuscator's decryption method
pub fn decrypt_ref() -> MethodRef {
    MethodRef::new(Token::new(0x06000002), "Zion.Strings", "Decrypt")
}

// Helper function to create a reference to Console.WriteLine
pub fn write_line_ref() -> MethodRef {
    MethodRef::new(Token::new(0x0A000003), "System.Console", "WriteLine")
}

// Collects the ldstr operands of a body, in order
pub fn string_operands(body: &MethodBody) -> Vec<String> {
    body.instructions
        .iter()
        .filter_map(|instr| instr.get_string_operand())
        .map(|value| value.to_string_lossy())
        .collect()
}

fn body(asm: InstructionAssembler) -> Option<MethodBody> {
    Some(MethodBody::new(8, asm.finish()))
}

/// Builds small modules piece by piece.
pub struct ModuleBuilder {
    module: Module,
}

impl ModuleBuilder {
    pub fn new(name: &str) -> Self {
        ModuleBuilder {
            module: Module::new(name),
        }
    }

    /// Adds `<Module>` with the helper field and no methods.
    pub fn with_helper(mut self) -> Self {
        self.module.types.push(
            TypeDef::new(Token::new(0x02000001), "", "<Module>").with_field(FieldDef::new(
                Token::new(0x04000001),
                "hTable",
                HASHTABLE,
            )),
        );
        self
    }

    /// Adds `App.Program::Main`, printing each literal as given.
    pub fn with_program(mut self, literals: &[&str]) -> Self {
        let mut asm = InstructionAssembler::new();
        for literal in literals {
            asm.ldstr(literal).call(write_line_ref());
        }
        asm.ret();

        self.module.types.push(
            TypeDef::new(Token::new(0x02000003), "App", "Program").with_method(MethodDef::new(
                Token::new(0x06000003),
                "Main",
                body(asm),
            )),
        );
        self
    }

    pub fn with_type(mut self, ty: TypeDef) -> Self {
        self.module.types.push(ty);
        self
    }

    pub fn build(self) -> Module {
        self.module
    }
}

/// A module protected with the hTable scheme.
///
/// `Main` carries two artifact pairs; `Tail` has one helper call with no earlier literal, which
/// must survive.
pub fn protected_module() -> Module {
    let field = helper_field_ref(Token::new(0x04000001));

    let mut cctor = InstructionAssembler::new();
    cctor
        .newobj(MethodRef::new(Token::new(0x0A000001), HASHTABLE, ".ctor"))
        .stsfld(field.clone())
        .ret();
    let module_type = TypeDef::new(Token::new(0x02000001), "", "<Module>")
        .with_field(FieldDef::new(Token::new(0x04000001), "hTable", HASHTABLE))
        .with_method(MethodDef::new(Token::new(0x06000001), ".cctor", body(cctor)));

    let mut decrypt = InstructionAssembler::new();
    decrypt
        .ldsfld(field)
        .ldarg_0()
        .callvirt(MethodRef::new(Token::new(0x0A000002), HASHTABLE, "get_Item"))
        .pop()
        .ldarg_0()
        .ret();
    let support_type = TypeDef::new(Token::new(0x02000002), "Zion", "Strings").with_method(
        MethodDef::new(Token::new(0x06000002), "Decrypt", body(decrypt)),
    );

    let mut main = InstructionAssembler::new();
    main.ldstr(&encrypt("Hello world"))
        .ldc_i8(0x5EED)
        .call(decrypt_ref())
        .call(write_line_ref())
        .ldstr(&encrypt("done"))
        .ldc_i8(7)
        .call(decrypt_ref())
        .call(write_line_ref())
        .ret();

    let mut tail = InstructionAssembler::new();
    tail.ldc_i8(1)
        .call(decrypt_ref())
        .pop()
        .ldstr(&encrypt("done"))
        .call(write_line_ref())
        .ret();

    let program_type = TypeDef::new(Token::new(0x02000003), "App", "Program")
        .with_method(MethodDef::new(Token::new(0x06000003), "Main", body(main)))
        .with_method(MethodDef::new(Token::new(0x06000004), "Tail", body(tail)));

    ModuleBuilder::new("protected.exe")
        .with_type(module_type)
        .with_type(support_type)
        .with_type(program_type)
        .build()
}
