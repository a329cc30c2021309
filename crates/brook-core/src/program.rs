//! Compiled Program
//!
//! The immutable input of an execution: instruction bytes, the string table
//! used by `NEWSTRING`, and the environment seeded onto the stack before the
//! first instruction runs. A program may be shared between machines.

use std::sync::Arc;

use crate::error::{VmError, VmResult};
use crate::vm::value::Value;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub code: Vec<u8>,
    pub strings: Vec<Arc<str>>,
    pub environment: Vec<Value>,
}

impl Program {
    pub fn new(code: Vec<u8>, strings: Vec<Arc<str>>, environment: Vec<Value>) -> Self {
        Program {
            code,
            strings,
            environment,
        }
    }

    /// Program with no strings and an empty environment
    pub fn from_code(code: Vec<u8>) -> Self {
        Program {
            code,
            ..Default::default()
        }
    }

    pub fn with_environment(mut self, environment: Vec<Value>) -> Self {
        self.environment = environment;
        self
    }

    pub fn string(&self, index: usize) -> VmResult<&Arc<str>> {
        self.strings.get(index).ok_or(VmError::UnknownString(index))
    }
}
