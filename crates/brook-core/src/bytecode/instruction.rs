//! Bytecode Instruction Representation
//!
//! Decoded form of a single instruction: one opcode byte followed by
//! `operand_count` big-endian 16-bit operands.
//! This layer contains no execution semantics.

use std::fmt;

use crate::error::{VmError, VmResult};

use super::opcode::OpCode;

/// Decoded bytecode instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: OpCode,
    operands: [u16; 2],
}

impl Instruction {
    /// Create an instruction with no operand
    pub fn new(opcode: OpCode) -> Self {
        Instruction {
            opcode,
            operands: [0, 0],
        }
    }

    /// Create an instruction with a single operand
    pub fn with_operand(opcode: OpCode, operand: u16) -> Self {
        Instruction {
            opcode,
            operands: [operand, 0],
        }
    }

    /// Create an instruction with two operands
    pub fn with_operands(opcode: OpCode, first: u16, second: u16) -> Self {
        Instruction {
            opcode,
            operands: [first, second],
        }
    }

    /// Operand `index`, zero when the opcode takes fewer operands
    pub fn operand(&self, index: usize) -> u16 {
        self.operands.get(index).copied().unwrap_or(0)
    }

    pub fn operands(&self) -> &[u16] {
        &self.operands[..self.opcode.operand_count()]
    }

    pub fn width(&self) -> usize {
        self.opcode.width()
    }

    /// Append the encoded instruction to `buf`
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.push(self.opcode as u8);
        for operand in self.operands() {
            buf.extend_from_slice(&operand.to_be_bytes());
        }
    }

    /// Decode the instruction starting at `at`
    pub fn decode(code: &[u8], at: usize) -> VmResult<Instruction> {
        let byte = *code.get(at).ok_or(VmError::CodeOutOfRange(at))?;
        let opcode = OpCode::from_u8(byte).ok_or(VmError::UnknownOpcode(byte))?;
        if at + opcode.width() > code.len() {
            return Err(VmError::TruncatedInstruction(at));
        }

        let mut instruction = Instruction::new(opcode);
        for (i, slot) in instruction
            .operands
            .iter_mut()
            .take(opcode.operand_count())
            .enumerate()
        {
            let pos = at + 1 + 2 * i;
            *slot = u16::from_be_bytes([code[pos], code[pos + 1]]);
        }
        Ok(instruction)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.opcode.name())?;
        for operand in self.operands() {
            write!(f, " {operand}")?;
        }
        Ok(())
    }
}

/// Iterator over the instructions of a code array, yielding each
/// instruction with its address. Stops after the first decoding error.
pub struct Instructions<'a> {
    code: &'a [u8],
    at: usize,
    failed: bool,
}

impl<'a> Instructions<'a> {
    pub fn new(code: &'a [u8]) -> Self {
        Instructions {
            code,
            at: 0,
            failed: false,
        }
    }
}

impl Iterator for Instructions<'_> {
    type Item = VmResult<(usize, Instruction)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.at >= self.code.len() {
            return None;
        }
        let at = self.at;
        match Instruction::decode(self.code, at) {
            Ok(instruction) => {
                self.at += instruction.width();
                Some(Ok((at, instruction)))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
