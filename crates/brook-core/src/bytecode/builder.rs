//! Program Builder
//!
//! Assembles an instruction stream together with its string table and
//! initial environment. Jumps and function addresses may refer to labels
//! that are bound later; they are patched when the program is built.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{VmError, VmResult};
use crate::program::Program;
use crate::vm::value::Value;

use super::instruction::Instruction;
use super::opcode::OpCode;

/// A code position that may not be known yet.
///
/// Created by [`ProgramBuilder::label`], placed with [`ProgramBuilder::bind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(usize);

/// Operand slot waiting for a label's address.
#[derive(Debug)]
struct Patch {
    label: Label,
    /// Position of the u16 address bytes in the buffer.
    operand_pos: usize,
}

#[derive(Debug, Default)]
pub struct ProgramBuilder {
    buf: Vec<u8>,
    strings: Vec<Arc<str>>,
    interned: HashMap<Arc<str>, u16>,
    environment: Vec<Value>,
    labels: Vec<Option<usize>>,
    patches: Vec<Patch>,
    /// First table index that did not fit a u16 operand
    overflow: Option<String>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current byte offset in the instruction stream.
    pub fn current_offset(&self) -> usize {
        self.buf.len()
    }

    /// Append a value to the initial environment, returning its slot.
    pub fn global(&mut self, value: Value) -> u16 {
        self.environment.push(value);
        let slot = self.environment.len() - 1;
        self.operand_index(slot, "environment slot")
    }

    /// Intern `text` in the string table.
    pub fn intern(&mut self, text: &str) -> u16 {
        if let Some(&index) = self.interned.get(text) {
            return index;
        }
        let text: Arc<str> = Arc::from(text);
        let index = self.operand_index(self.strings.len(), "string");
        self.strings.push(text.clone());
        self.interned.insert(text, index);
        index
    }

    pub fn label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Bind `label` to the current offset.
    pub fn bind(&mut self, label: Label) -> &mut Self {
        self.labels[label.0] = Some(self.buf.len());
        self
    }

    /// Create a label bound to the current offset.
    pub fn here(&mut self) -> Label {
        let label = self.label();
        self.bind(label);
        label
    }

    // ── emit helpers ───────────────────────────────────────────────

    pub fn emit(&mut self, instruction: Instruction) -> &mut Self {
        instruction.encode_into(&mut self.buf);
        self
    }

    /// Emit an instruction without operands.
    pub fn op(&mut self, opcode: OpCode) -> &mut Self {
        self.emit(Instruction::new(opcode))
    }

    pub fn op1(&mut self, opcode: OpCode, operand: u16) -> &mut Self {
        self.emit(Instruction::with_operand(opcode, operand))
    }

    pub fn op2(&mut self, opcode: OpCode, first: u16, second: u16) -> &mut Self {
        self.emit(Instruction::with_operands(opcode, first, second))
    }

    /// Push a small integer, using the short forms for 0 and 1.
    pub fn int(&mut self, value: u16) -> &mut Self {
        match value {
            0 => self.op(OpCode::Const0),
            1 => self.op(OpCode::Const1),
            _ => self.op1(OpCode::Const, value),
        }
    }

    /// `NEWSTRING <index>` for an interned copy of `text`.
    pub fn string(&mut self, text: &str) -> &mut Self {
        let index = self.intern(text);
        self.op1(OpCode::NewString, index)
    }

    /// `JMP`, `TJMP` or `FJMP` to `target`.
    pub fn jump(&mut self, opcode: OpCode, target: Label) -> &mut Self {
        debug_assert!(matches!(opcode, OpCode::Jmp | OpCode::TJmp | OpCode::FJmp));
        self.emit_with_label(opcode, target)
    }

    /// `NEWFUNCTION` whose body starts at `body`.
    pub fn function(&mut self, body: Label) -> &mut Self {
        self.emit_with_label(OpCode::NewFunction, body)
    }

    pub fn call(&mut self) -> &mut Self {
        self.op(OpCode::Call)
    }

    pub fn ret(&mut self, arg_count: u16) -> &mut Self {
        self.op1(OpCode::Ret, arg_count)
    }

    /// Table index as an operand. Overflow is reported by `build`.
    fn operand_index(&mut self, index: usize, what: &str) -> u16 {
        u16::try_from(index).unwrap_or_else(|_| {
            self.overflow
                .get_or_insert_with(|| format!("{what} {index} does not fit an operand"));
            u16::MAX
        })
    }

    fn emit_with_label(&mut self, opcode: OpCode, target: Label) -> &mut Self {
        self.buf.push(opcode as u8);
        self.patches.push(Patch {
            label: target,
            operand_pos: self.buf.len(),
        });
        self.buf.extend_from_slice(&[0, 0]);
        self
    }

    /// Resolve labels and produce the program.
    pub fn build(mut self) -> VmResult<Program> {
        if let Some(message) = self.overflow.take() {
            return Err(VmError::MalformedProgram(message));
        }
        for patch in &self.patches {
            let address = self.labels[patch.label.0].ok_or_else(|| {
                VmError::MalformedProgram(format!("label {} was never bound", patch.label.0))
            })?;
            let address = u16::try_from(address).map_err(|_| {
                VmError::MalformedProgram(format!("address {address} does not fit an operand"))
            })?;
            self.buf[patch.operand_pos..patch.operand_pos + 2]
                .copy_from_slice(&address.to_be_bytes());
        }
        Ok(Program::new(self.buf, self.strings, self.environment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_labels_are_patched() {
        let mut b = ProgramBuilder::new();
        let end = b.label();
        b.jump(OpCode::Jmp, end).op(OpCode::Pop);
        assert_eq!(b.current_offset(), 4);
        b.bind(end).op(OpCode::Halt);

        let program = b.build().expect("build failed");
        assert_eq!(
            program.code,
            vec![OpCode::Jmp as u8, 0, 4, OpCode::Pop as u8, OpCode::Halt as u8]
        );
    }

    #[test]
    fn unbound_label_is_rejected() {
        let mut b = ProgramBuilder::new();
        let nowhere = b.label();
        b.function(nowhere);
        assert!(matches!(b.build(), Err(VmError::MalformedProgram(_))));
    }

    #[test]
    fn strings_are_interned_once() {
        let mut b = ProgramBuilder::new();
        b.string("hi").string("there").string("hi");
        let program = b.build().expect("build failed");
        assert_eq!(program.strings.len(), 2);
        assert_eq!(&program.code[..3], &[OpCode::NewString as u8, 0, 0]);
        assert_eq!(&program.code[6..], &[OpCode::NewString as u8, 0, 0]);
    }

    #[test]
    fn too_many_strings_are_rejected() {
        let mut b = ProgramBuilder::new();
        for i in 0..=u16::MAX as usize + 1 {
            b.intern(&i.to_string());
        }
        assert_eq!(b.intern("0"), 0);
        assert!(matches!(b.build(), Err(VmError::MalformedProgram(_))));
    }

    #[test]
    fn too_many_globals_are_rejected() {
        let mut b = ProgramBuilder::new();
        for _ in 0..u16::MAX {
            b.global(Value::Null);
        }
        // slot 65535 is the last one an operand can address
        assert_eq!(b.global(Value::Null), u16::MAX);
        b.global(Value::Null);
        assert!(matches!(b.build(), Err(VmError::MalformedProgram(_))));
    }
}
