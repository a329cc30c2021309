//! Brook Error Types
//!
//! Defines all error conditions produced by the Brook virtual machine and
//! its program loader. Runtime errors reach the host wrapped in a [`Trap`].

use thiserror::Error;

use crate::bytecode::opcode::OpCode;
use crate::vm::value::ValueType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    // Program container errors
    #[error("invalid program magic number")]
    InvalidMagicNumber,
    #[error("incompatible program version {0}")]
    InvalidProgramVersion(u8),
    #[error("malformed program: {0}")]
    MalformedProgram(String),
    #[error("program is too short")]
    ProgramTooShort,
    #[error("unknown builtin `{0}`")]
    UnknownBuiltin(String),

    // Decoding errors
    #[error("unknown opcode 0x{0:02X}")]
    UnknownOpcode(u8),
    #[error("instruction at {0} is truncated")]
    TruncatedInstruction(usize),
    #[error("instruction pointer {0} is past the end of the code")]
    CodeOutOfRange(usize),

    // Execution errors
    #[error("value of type {0} is not callable")]
    NotCallable(ValueType),
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: ValueType,
    },
    #[error("stack underflow")]
    StackUnderflow,
    #[error("stack address {address} is outside the live stack (sp = {sp})")]
    OutOfRange { address: isize, sp: usize },
    #[error("stack overflow: limit of {0} slots reached")]
    StackOverflow(usize),
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    IntegerOverflow,
    #[error("string index {0} is not in the string table")]
    UnknownString(usize),
    #[error("bound variable {index} does not exist (closure has {len})")]
    UnboundVariable { index: usize, len: usize },
    #[error("instruction budget of {0} exhausted")]
    InstructionLimit(u64),
    #[error("builtin `{name}` failed: {message}")]
    Native { name: String, message: String },
}

impl VmError {
    pub fn type_mismatch(expected: &'static str, found: ValueType) -> Self {
        VmError::TypeMismatch { expected, found }
    }
}

/// A runtime error together with the location it was raised at.
///
/// `ip` is the address of the faulting instruction's opcode byte. `opcode`
/// is absent when the byte there does not decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error} (ip {ip}, {})", .opcode.map_or("<undecoded>", OpCode::name))]
pub struct Trap {
    pub ip: usize,
    pub opcode: Option<OpCode>,
    #[source]
    pub error: VmError,
}

pub type VmResult<T> = Result<T, VmError>;
