//! Method bodies as mutable instruction streams.

use crate::assembly::Instruction;

/// The body of a method compiled to CIL.
///
/// Holds the header values the writer needs to re-emit the method together with the ordered
/// instruction sequence. Passes mutate `instructions` in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MethodBody {
    /// Maximum number of items on the operand stack, as declared in the original header
    pub max_stack: u16,
    /// `MetaData` token for a signature describing the layout of the local variables. 0 == no local variables
    pub local_var_sig_token: u32,
    /// Flag, indicating to call default constructor on all local variables
    pub is_init_local: bool,
    /// When set, the writer must emit `max_stack` unchanged instead of recomputing it
    pub keep_old_max_stack: bool,
    /// The instruction stream
    pub instructions: Vec<Instruction>,
}

impl MethodBody {
    /// Creates a body from an instruction sequence.
    #[must_use]
    pub fn new(max_stack: u16, instructions: Vec<Instruction>) -> Self {
        MethodBody {
            max_stack,
            instructions,
            ..MethodBody::default()
        }
    }

    /// Returns the total encoded size of the instructions, as recorded when they were read.
    #[must_use]
    pub fn code_size(&self) -> u64 {
        self.instructions.iter().map(|instr| instr.size).sum()
    }
}
