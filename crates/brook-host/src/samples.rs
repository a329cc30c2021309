//! Sample programs
//!
//! Small programs that exercise the calling convention. Each takes a single
//! integer parameter `n`.

use std::fmt;

use brook_core::{OpCode, Program, ProgramBuilder, Value, VmResult};

use crate::stdlib;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    /// `n!` with an accumulator local and a loop
    FactorialIterative,
    /// `n!` through a recursive call that passes an accumulator
    FactorialRecursive,
    /// A closure capturing `n`, called with 35
    Closure,
    /// Prints `n` down to 1 and returns 0
    Countdown,
    /// Prints a greeting built with `concat`, ignoring `n`
    Greeting,
}

impl Sample {
    pub const ALL: [Sample; 5] = [
        Sample::FactorialIterative,
        Sample::FactorialRecursive,
        Sample::Closure,
        Sample::Countdown,
        Sample::Greeting,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Sample::FactorialIterative => "factorial-iterative",
            Sample::FactorialRecursive => "factorial-recursive",
            Sample::Closure => "closure",
            Sample::Countdown => "countdown",
            Sample::Greeting => "greeting",
        }
    }

    pub fn from_name(name: &str) -> Option<Sample> {
        Self::ALL.into_iter().find(|sample| sample.name() == name)
    }

    pub fn build(self, n: u16) -> VmResult<Program> {
        match self {
            Sample::FactorialIterative => factorial_iterative(n),
            Sample::FactorialRecursive => factorial_recursive(n),
            Sample::Closure => closure(n),
            Sample::Countdown => countdown(n),
            Sample::Greeting => greeting(),
        }
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn factorial_iterative(n: u16) -> VmResult<Program> {
    let mut b = ProgramBuilder::new();
    let body = b.label();
    let done = b.label();

    b.int(n).function(body).call().op(OpCode::Halt);

    b.bind(body);
    // local 0 holds the accumulator
    b.int(1);
    let head = b.here();
    b.op1(OpCode::LoadArg0, 0).int(0).op(OpCode::Gt).jump(OpCode::FJmp, done);
    b.op1(OpCode::LoadArg0, 0)
        .op1(OpCode::Load0, 0)
        .op(OpCode::Mul)
        .op1(OpCode::Set0, 0)
        .op(OpCode::Pop);
    b.op1(OpCode::LoadArg0, 0)
        .op(OpCode::Sub1)
        .op1(OpCode::SetArg0, 0)
        .op(OpCode::Pop)
        .jump(OpCode::Jmp, head);
    b.bind(done).op1(OpCode::Load0, 0).ret(1);

    b.build()
}

/// `fact(n, acc)` with argument 0 = n and argument 1 = acc.
pub fn factorial_recursive(n: u16) -> VmResult<Program> {
    let mut b = ProgramBuilder::new();
    let body = b.label();
    let recurse = b.label();

    // arguments go in reverse: acc first
    b.int(1).int(n).function(body).call().op(OpCode::Halt);

    b.bind(body);
    b.op1(OpCode::LoadArg0, 0).int(0).op(OpCode::Eq).jump(OpCode::FJmp, recurse);
    b.op1(OpCode::LoadArg1, 0).ret(2);

    b.bind(recurse);
    b.op1(OpCode::LoadArg1, 0).op1(OpCode::LoadArg0, 0).op(OpCode::Mul);
    b.op1(OpCode::LoadArg0, 0).op(OpCode::Sub1);
    b.op1(OpCode::EncFunction, 0).call().ret(2);

    b.build()
}

/// `make(n)` returns an adder that captured `n`; the adder is then called
/// with 35.
pub fn closure(n: u16) -> VmResult<Program> {
    let mut b = ProgramBuilder::new();
    let make = b.label();
    let adder = b.label();

    // slot 0 keeps the adder
    b.int(n).function(make).call();
    b.int(35).op1(OpCode::Load0, 0).call().op(OpCode::Halt);

    b.bind(make);
    b.function(adder).op1(OpCode::LoadArg0, 0).op(OpCode::BindVar).ret(1);

    b.bind(adder);
    b.op1(OpCode::LoadArg0, 0)
        .op1(OpCode::EncFunction, 0)
        .op1(OpCode::LoadBound, 0)
        .op(OpCode::Add)
        .ret(1);

    b.build()
}

/// Loops on the counter itself, so reaching 0 ends it.
pub fn countdown(n: u16) -> VmResult<Program> {
    let mut b = ProgramBuilder::new();
    let print = b.global(Value::Builtin(stdlib::PRINT));
    let done = b.label();

    // slot 1, right above `print`
    b.int(n);
    let head = b.here();
    b.op1(OpCode::Load1, 0).jump(OpCode::FJmp, done);
    b.op1(OpCode::Load1, 0).op2(OpCode::Load, print, 0).call().op(OpCode::Pop);
    b.op1(OpCode::Load1, 0)
        .op(OpCode::Sub1)
        .op1(OpCode::Set1, 0)
        .op(OpCode::Pop)
        .jump(OpCode::Jmp, head);
    b.bind(done).op1(OpCode::Load1, 0).op(OpCode::Halt);

    b.build()
}

pub fn greeting() -> VmResult<Program> {
    let mut b = ProgramBuilder::new();
    b.global(Value::Builtin(stdlib::PRINT));
    b.global(Value::Builtin(stdlib::CONCAT));

    b.string("world").string("hello, ");
    b.op1(OpCode::Load1, 0).call();
    b.op1(OpCode::Load0, 0).call().op(OpCode::Halt);

    b.build()
}
