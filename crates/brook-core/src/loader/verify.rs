//! Structural validation of a loaded program.
//!
//! Checks that every byte of code decodes, that jump targets and function
//! addresses land on an instruction boundary and that string indices exist.
//! It does not simulate the stack; frame-protocol violations are still
//! trapped at run time.

use std::collections::HashSet;

use crate::bytecode::instruction::Instructions;
use crate::bytecode::opcode::OpCode;
use crate::error::{VmError, VmResult};
use crate::program::Program;
use crate::vm::value::Value;

pub fn verify(program: &Program) -> VmResult<()> {
    let mut starts = HashSet::new();
    let mut decoded = Vec::new();
    for item in Instructions::new(&program.code) {
        let (at, instruction) = item?;
        starts.insert(at);
        decoded.push((at, instruction));
    }

    for (at, instruction) in &decoded {
        let operand = usize::from(instruction.operand(0));
        if instruction.opcode.is_branch() && !starts.contains(&operand) {
            return Err(VmError::MalformedProgram(format!(
                "{} at {at} targets {operand}, which is not an instruction",
                instruction.opcode
            )));
        }
        if instruction.opcode == OpCode::NewString && operand >= program.strings.len() {
            return Err(VmError::MalformedProgram(format!(
                "NEWSTRING at {at} refers to missing string {operand}"
            )));
        }
    }

    for value in &program.environment {
        if let Value::Function(function) = value {
            if !starts.contains(&function.address) {
                return Err(VmError::MalformedProgram(format!(
                    "environment function address {} is not an instruction",
                    function.address
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::value::Function;

    #[test]
    fn accepts_well_formed_code() {
        let code = vec![
            OpCode::Const1 as u8,
            OpCode::FJmp as u8, 0, 5,
            OpCode::Const0 as u8,
            OpCode::Halt as u8,
        ];
        assert_eq!(verify(&Program::from_code(code)), Ok(()));
    }

    #[test]
    fn rejects_jump_into_an_operand() {
        let code = vec![OpCode::Jmp as u8, 0, 1, OpCode::Halt as u8];
        assert!(matches!(
            verify(&Program::from_code(code)),
            Err(VmError::MalformedProgram(_))
        ));
    }

    #[test]
    fn rejects_unknown_opcode() {
        let code = vec![OpCode::Const1 as u8, 0xFE];
        assert_eq!(
            verify(&Program::from_code(code)),
            Err(VmError::UnknownOpcode(0xFE))
        );
    }

    #[test]
    fn rejects_missing_string_and_bad_function_address() {
        let code = vec![OpCode::NewString as u8, 0, 0, OpCode::Halt as u8];
        assert!(verify(&Program::from_code(code)).is_err());

        let program = Program::from_code(vec![OpCode::Halt as u8])
            .with_environment(vec![Value::Function(Function::new(7))]);
        assert!(verify(&program).is_err());
    }
}
