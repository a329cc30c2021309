//! Bytecode Opcode Definitions
//!
//! Defines the opcode set for Brook bytecode.
//! This file contains no execution semantics.
//! Opcodes are numbered from zero in declaration order; the numbering is the
//! contract shared with every compiler targeting the machine.

/// Bytecode opcodes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    Halt,
    Pop,

    // Constants
    Const,
    Const0,
    Const1,
    ConstTrue,
    ConstFalse,

    // Locals and arguments
    Load,
    Load0,
    Load1,
    LoadArg,
    LoadArg0,
    LoadArg1,
    LoadNull,
    Set,
    Set0,
    Set1,
    SetArg,
    SetArg0,
    SetArg1,

    // Arithmetic
    Add,
    Add1,
    Sub,
    Sub1,
    Mul,
    Div,
    Mod,
    Neg,

    // Logic and comparison
    And,
    Or,
    Not,
    BoolNot,
    Eq,
    Ne,
    Lt,
    Gt,

    // Control flow
    Jmp,
    TJmp,
    FJmp,
    NewScope,
    EndScope,

    // Values, calls and closures
    NewString,
    NewFunction,
    Call,
    EncFunction,
    BindVar,
    LoadBound,
    Ret,
}

impl OpCode {
    /// Every opcode, indexed by its byte value.
    pub const ALL: [OpCode; 48] = [
        OpCode::Halt,
        OpCode::Pop,
        OpCode::Const,
        OpCode::Const0,
        OpCode::Const1,
        OpCode::ConstTrue,
        OpCode::ConstFalse,
        OpCode::Load,
        OpCode::Load0,
        OpCode::Load1,
        OpCode::LoadArg,
        OpCode::LoadArg0,
        OpCode::LoadArg1,
        OpCode::LoadNull,
        OpCode::Set,
        OpCode::Set0,
        OpCode::Set1,
        OpCode::SetArg,
        OpCode::SetArg0,
        OpCode::SetArg1,
        OpCode::Add,
        OpCode::Add1,
        OpCode::Sub,
        OpCode::Sub1,
        OpCode::Mul,
        OpCode::Div,
        OpCode::Mod,
        OpCode::Neg,
        OpCode::And,
        OpCode::Or,
        OpCode::Not,
        OpCode::BoolNot,
        OpCode::Eq,
        OpCode::Ne,
        OpCode::Lt,
        OpCode::Gt,
        OpCode::Jmp,
        OpCode::TJmp,
        OpCode::FJmp,
        OpCode::NewScope,
        OpCode::EndScope,
        OpCode::NewString,
        OpCode::NewFunction,
        OpCode::Call,
        OpCode::EncFunction,
        OpCode::BindVar,
        OpCode::LoadBound,
        OpCode::Ret,
    ];

    /// Convert raw byte to opcode
    pub fn from_u8(byte: u8) -> Option<Self> {
        Self::ALL.get(byte as usize).copied()
    }

    /// Number of 16-bit operands following the opcode byte
    pub fn operand_count(self) -> usize {
        match self {
            OpCode::Load | OpCode::LoadArg | OpCode::Set | OpCode::SetArg => 2,

            OpCode::Const
            | OpCode::Load0
            | OpCode::Load1
            | OpCode::LoadArg0
            | OpCode::LoadArg1
            | OpCode::Set0
            | OpCode::Set1
            | OpCode::SetArg0
            | OpCode::SetArg1
            | OpCode::Jmp
            | OpCode::TJmp
            | OpCode::FJmp
            | OpCode::NewString
            | OpCode::NewFunction
            | OpCode::EncFunction
            | OpCode::LoadBound
            | OpCode::Ret => 1,

            OpCode::Halt
            | OpCode::Pop
            | OpCode::Const0
            | OpCode::Const1
            | OpCode::ConstTrue
            | OpCode::ConstFalse
            | OpCode::LoadNull
            | OpCode::Add
            | OpCode::Add1
            | OpCode::Sub
            | OpCode::Sub1
            | OpCode::Mul
            | OpCode::Div
            | OpCode::Mod
            | OpCode::Neg
            | OpCode::And
            | OpCode::Or
            | OpCode::Not
            | OpCode::BoolNot
            | OpCode::Eq
            | OpCode::Ne
            | OpCode::Lt
            | OpCode::Gt
            | OpCode::NewScope
            | OpCode::EndScope
            | OpCode::Call
            | OpCode::BindVar => 0,
        }
    }

    /// Encoded size in bytes, opcode included
    pub fn width(self) -> usize {
        1 + 2 * self.operand_count()
    }

    /// Whether the first operand is a code address
    pub fn is_branch(self) -> bool {
        matches!(
            self,
            OpCode::Jmp | OpCode::TJmp | OpCode::FJmp | OpCode::NewFunction
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            OpCode::Halt => "HALT",
            OpCode::Pop => "POP",
            OpCode::Const => "CONST",
            OpCode::Const0 => "CONST0",
            OpCode::Const1 => "CONST1",
            OpCode::ConstTrue => "CONSTTRUE",
            OpCode::ConstFalse => "CONSTFALSE",
            OpCode::Load => "LOAD",
            OpCode::Load0 => "LOAD0",
            OpCode::Load1 => "LOAD1",
            OpCode::LoadArg => "LOADARG",
            OpCode::LoadArg0 => "LOADARG0",
            OpCode::LoadArg1 => "LOADARG1",
            OpCode::LoadNull => "LOADNULL",
            OpCode::Set => "SET",
            OpCode::Set0 => "SET0",
            OpCode::Set1 => "SET1",
            OpCode::SetArg => "SETARG",
            OpCode::SetArg0 => "SETARG0",
            OpCode::SetArg1 => "SETARG1",
            OpCode::Add => "ADD",
            OpCode::Add1 => "ADD1",
            OpCode::Sub => "SUB",
            OpCode::Sub1 => "SUB1",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::Mod => "MOD",
            OpCode::Neg => "NEG",
            OpCode::And => "AND",
            OpCode::Or => "OR",
            OpCode::Not => "NOT",
            OpCode::BoolNot => "BOOLNOT",
            OpCode::Eq => "EQ",
            OpCode::Ne => "NE",
            OpCode::Lt => "LT",
            OpCode::Gt => "GT",
            OpCode::Jmp => "JMP",
            OpCode::TJmp => "TJMP",
            OpCode::FJmp => "FJMP",
            OpCode::NewScope => "NEWSCOPE",
            OpCode::EndScope => "ENDSCOPE",
            OpCode::NewString => "NEWSTRING",
            OpCode::NewFunction => "NEWFUNCTION",
            OpCode::Call => "CALL",
            OpCode::EncFunction => "ENCFUNCTION",
            OpCode::BindVar => "BINDVAR",
            OpCode::LoadBound => "LOADBOUND",
            OpCode::Ret => "RET",
        }
    }
}

// One byte of opcode space.
const _: () = assert!(OpCode::ALL.len() <= 256);

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
