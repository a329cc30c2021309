//! Virtual Machine Core
//!
//! Defines the Brook virtual machine structure and its fetch-decode-execute
//! loop. The machine owns its stack and registers; the program it runs is
//! shared read-only and may be executed by other machines at the same time.

use std::sync::Arc;

use log::{debug, trace};

use crate::bytecode::instruction::Instruction;
use crate::bytecode::opcode::OpCode;
use crate::config::VmConfig;
use crate::error::{Trap, VmError, VmResult};
use crate::program::Program;

use super::stack::Stack;
use super::value::{self, Function, Value};

/// Outcome of executing one instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Continue,
    Halt(Value),
}

/// Brook Virtual Machine
#[derive(Debug)]
pub struct VirtualMachine {
    config: VmConfig,
    program: Arc<Program>,
    stack: Stack,
    ip: usize,
    executed: u64,
    started: bool,
}

impl VirtualMachine {
    /// Create a new VM instance
    pub fn new(config: VmConfig, program: impl Into<Arc<Program>>) -> Self {
        VirtualMachine {
            stack: Stack::with_capacity(config.max_stack_size, config.initial_stack_capacity),
            program: program.into(),
            ip: 0,
            executed: 0,
            started: false,
            config,
        }
    }

    /// Run until `HALT` and return the value it pops
    pub fn run(&mut self) -> Result<Value, Trap> {
        loop {
            if let Step::Halt(result) = self.step()? {
                return Ok(result);
            }
        }
    }

    /// Execute a single instruction. The first step seeds the environment.
    pub fn step(&mut self) -> Result<Step, Trap> {
        let at = self.ip;
        self.step_inner().map_err(|error| {
            let opcode = self.program.code.get(at).copied().and_then(OpCode::from_u8);
            debug!("trap at ip {at}: {error}");
            Trap {
                ip: at,
                opcode,
                error,
            }
        })
    }

    /// Discard all state so the next step starts the program again
    pub fn reset(&mut self) {
        self.stack.clear();
        self.ip = 0;
        self.executed = 0;
        self.started = false;
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn sp(&self) -> usize {
        self.stack.sp()
    }

    pub fn bp(&self) -> usize {
        self.stack.bp()
    }

    /// Read-only view of the live stack, bottom first
    pub fn stack(&self) -> &[Value] {
        self.stack.as_slice()
    }

    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    /// Instructions executed since the last start
    pub fn executed(&self) -> u64 {
        self.executed
    }

    fn start(&mut self) -> VmResult<()> {
        self.reset();
        for value in &self.program.environment {
            self.stack.push(value.clone())?;
        }
        self.started = true;
        debug!(
            "seeded {} environment values, {} bytes of code",
            self.program.environment.len(),
            self.program.code.len()
        );
        Ok(())
    }

    fn step_inner(&mut self) -> VmResult<Step> {
        if !self.started {
            self.start()?;
        }
        if let Some(budget) = self.config.max_instructions {
            if self.executed >= budget {
                return Err(VmError::InstructionLimit(budget));
            }
        }

        let instruction = Instruction::decode(&self.program.code, self.ip)?;
        trace!(
            "ip:{} sp:{} bp:{} {}",
            self.ip,
            self.stack.sp(),
            self.stack.bp(),
            instruction
        );
        self.ip += instruction.width();
        self.executed += 1;
        self.execute(instruction)
    }

    fn execute(&mut self, instruction: Instruction) -> VmResult<Step> {
        let a = instruction.operand(0);
        let b = instruction.operand(1);

        match instruction.opcode {
            OpCode::Halt => return Ok(Step::Halt(self.stack.pop()?)),
            OpCode::Pop => {
                self.stack.pop()?;
            }

            // Constants
            OpCode::Const => self.stack.push(Value::Integer(a.into()))?,
            OpCode::Const0 => self.stack.push(Value::Integer(0))?,
            OpCode::Const1 => self.stack.push(Value::Integer(1))?,
            OpCode::ConstTrue => self.stack.push(Value::Boolean(true))?,
            OpCode::ConstFalse => self.stack.push(Value::Boolean(false))?,
            OpCode::LoadNull => self.stack.push(Value::Null)?,

            // Locals and arguments
            OpCode::Load => self.load(self.stack.local_offset(a, b)?)?,
            OpCode::Load0 => self.load(self.stack.local_offset(0, a)?)?,
            OpCode::Load1 => self.load(self.stack.local_offset(1, a)?)?,
            OpCode::LoadArg => self.load(self.stack.arg_offset(a, b)?)?,
            OpCode::LoadArg0 => self.load(self.stack.arg_offset(0, a)?)?,
            OpCode::LoadArg1 => self.load(self.stack.arg_offset(1, a)?)?,
            OpCode::Set => self.store(self.stack.local_offset(a, b)?)?,
            OpCode::Set0 => self.store(self.stack.local_offset(0, a)?)?,
            OpCode::Set1 => self.store(self.stack.local_offset(1, a)?)?,
            OpCode::SetArg => self.store(self.stack.arg_offset(a, b)?)?,
            OpCode::SetArg0 => self.store(self.stack.arg_offset(0, a)?)?,
            OpCode::SetArg1 => self.store(self.stack.arg_offset(1, a)?)?,

            // Arithmetic
            OpCode::Add => self.binary(value::add)?,
            OpCode::Sub => self.binary(value::sub)?,
            OpCode::Mul => self.binary(value::mul)?,
            OpCode::Div => self.binary(value::div)?,
            OpCode::Mod => self.binary(value::rem)?,
            OpCode::Add1 => self.stack.update_top(value::add1)?,
            OpCode::Sub1 => self.stack.update_top(value::sub1)?,
            OpCode::Neg => self.stack.update_top(value::neg)?,

            // Logic and comparison
            OpCode::And => self.binary(value::and)?,
            OpCode::Or => self.binary(value::or)?,
            OpCode::Not => {
                let operand = self.stack.pop()?;
                self.stack.push(value::not(&operand))?;
            }
            OpCode::BoolNot => {
                let operand = self.stack.pop()?;
                self.stack.push(value::bool_not(&operand)?)?;
            }
            OpCode::Eq => self.binary(|lhs, rhs| Ok(value::eq(lhs, rhs)))?,
            OpCode::Ne => self.binary(|lhs, rhs| Ok(value::ne(lhs, rhs)))?,
            OpCode::Lt => self.binary(value::lt)?,
            OpCode::Gt => self.binary(value::gt)?,

            // Control flow
            OpCode::Jmp => self.ip = a.into(),
            OpCode::TJmp => {
                if self.stack.pop()?.is_truthy() {
                    self.ip = a.into();
                }
            }
            OpCode::FJmp => {
                if !self.stack.pop()?.is_truthy() {
                    self.ip = a.into();
                }
            }
            OpCode::NewScope => self.stack.new_scope()?,
            OpCode::EndScope => self.stack.end_scope()?,

            // Values, calls and closures
            OpCode::NewString => {
                let text = self.program.string(a.into())?.clone();
                self.stack.push(Value::String(text))?;
            }
            OpCode::NewFunction => self.stack.push(Value::Function(Function::new(a.into())))?,
            OpCode::Call => self.call()?,
            OpCode::EncFunction => self.load(self.stack.function_offset(a)?)?,
            OpCode::BindVar => {
                let captured = self.stack.pop()?;
                self.stack.peek_mut()?.as_function_mut()?.bind(captured);
            }
            OpCode::LoadBound => match self.stack.pop()? {
                Value::Function(function) => {
                    let bound = function.binding(a.into())?.clone();
                    self.stack.push(bound)?;
                }
                other => return Err(VmError::type_mismatch("function", other.type_of())),
            },
            OpCode::Ret => self.ret(a)?,
        }

        Ok(Step::Continue)
    }

    fn load(&mut self, address: isize) -> VmResult<()> {
        let value = self.stack.get(address)?.clone();
        self.stack.push(value)
    }

    /// Assignment leaves the assigned value on the stack
    fn store(&mut self, address: isize) -> VmResult<()> {
        let value = self.stack.peek()?.clone();
        self.stack.set(address, value)
    }

    fn binary(&mut self, op: impl FnOnce(&Value, &Value) -> VmResult<Value>) -> VmResult<()> {
        let rhs = self.stack.pop()?;
        let lhs = self.stack.pop()?;
        self.stack.push(op(&lhs, &rhs)?)
    }

    fn call(&mut self) -> VmResult<()> {
        match self.stack.pop()? {
            Value::Builtin(builtin) => {
                let mut args = Vec::with_capacity(builtin.arity);
                for _ in 0..builtin.arity {
                    args.push(self.stack.pop()?);
                }
                debug!("call builtin {}/{}", builtin.name, builtin.arity);
                let result = builtin.invoke(&args)?;
                self.stack.push(result)
            }
            Value::Function(function) => {
                let target = function.address;
                debug!("call @{target} from ip {} at depth {}", self.ip, self.stack.sp());
                self.stack.push_address(self.ip)?;
                self.stack.push(Value::Function(function))?;
                self.ip = target;
                self.stack.new_scope()
            }
            other => Err(VmError::NotCallable(other.type_of())),
        }
    }

    fn ret(&mut self, arg_count: u16) -> VmResult<()> {
        let result = self.stack.pop()?;
        self.stack.end_scope()?;
        // function value of the finished call
        self.stack.pop()?;
        self.ip = self.stack.pop_address()?;
        for _ in 0..arg_count {
            self.stack.pop()?;
        }
        debug!("return to ip {} at depth {}", self.ip, self.stack.sp());
        self.stack.push(result)
    }
}
