//! Brook - Core Library
//!
//! Public API surface for the Brook bytecode virtual machine.

pub mod bytecode;
pub mod config;
pub mod error;
pub mod loader;
pub mod native;
pub mod program;
pub mod vm;

use std::sync::Arc;

// Re-export commonly used types
pub use bytecode::{Instruction, Label, OpCode, ProgramBuilder};
pub use config::VmConfig;
pub use error::{Trap, VmError, VmResult};
pub use loader::ProgramLoader;
pub use native::BuiltinRegistry;
pub use program::Program;
pub use vm::{Builtin, Function, Step, Value, ValueType, VirtualMachine};

/// Run a program to completion with the default configuration
pub fn run(program: impl Into<Arc<Program>>) -> Result<Value, Trap> {
    VirtualMachine::new(VmConfig::default(), program).run()
}
