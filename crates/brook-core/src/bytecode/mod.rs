pub mod builder;
pub mod instruction;
pub mod opcode;

pub use builder::{Label, ProgramBuilder};
pub use instruction::{Instruction, Instructions};
pub use opcode::OpCode;
