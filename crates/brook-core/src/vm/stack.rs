//! VM Stack Implementation
//!
//! The single value stack shared by operands, arguments, saved control data
//! and locals, together with the base pointer that threads the scope chain
//! through it. Every scope stores the previous base pointer in the slot just
//! below its own base, so `stack[base - 1]` leads to the enclosing scope.
//!
//! A call frame seen from its base pointer:
//!
//! ```text
//!   base - 4 - n   argument n
//!   ...
//!   base - 4       argument 0 (pushed last by the caller)
//!   base - 3       return address
//!   base - 2       function value
//!   base - 1       saved base pointer
//!   base + n       local n
//! ```
//!
//! Saved base pointers and return addresses are stored as integer values.

use crate::error::{VmError, VmResult};
use super::value::Value;

/// Slots between a call's base and its first argument
const ARGUMENT_GAP: isize = 4;

/// Slots between a call's base and its function value
const FUNCTION_GAP: isize = 2;

/// VM execution stack
#[derive(Debug, Clone)]
pub struct Stack {
    values: Vec<Value>,
    bp: usize,
    max_size: usize,
}

impl Stack {
    /// Create new stack with maximum size
    pub fn new(max_size: usize) -> Self {
        Self::with_capacity(max_size, 0)
    }

    pub fn with_capacity(max_size: usize, capacity: usize) -> Self {
        Stack {
            values: Vec::with_capacity(capacity.min(max_size)),
            bp: 0,
            max_size,
        }
    }

    /// Stack pointer: number of live slots
    pub fn sp(&self) -> usize {
        self.values.len()
    }

    /// Base of the current scope
    pub fn bp(&self) -> usize {
        self.bp
    }

    /// Live slots, bottom first
    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }

    /// Push value onto stack
    pub fn push(&mut self, value: Value) -> VmResult<()> {
        if self.values.len() >= self.max_size {
            return Err(VmError::StackOverflow(self.max_size));
        }
        self.values.push(value);
        Ok(())
    }

    /// Pop value from stack. Slots below the current base are not reachable
    /// this way.
    pub fn pop(&mut self) -> VmResult<Value> {
        if self.values.len() <= self.bp {
            return Err(VmError::StackUnderflow);
        }
        self.values.pop().ok_or(VmError::StackUnderflow)
    }

    /// Peek at top of stack without removing
    pub fn peek(&self) -> VmResult<&Value> {
        if self.values.len() <= self.bp {
            return Err(VmError::StackUnderflow);
        }
        self.values.last().ok_or(VmError::StackUnderflow)
    }

    /// Mutable access to the top slot
    pub fn peek_mut(&mut self) -> VmResult<&mut Value> {
        if self.values.len() <= self.bp {
            return Err(VmError::StackUnderflow);
        }
        self.values.last_mut().ok_or(VmError::StackUnderflow)
    }

    /// Replace the top slot with `f` applied to it
    pub fn update_top(&mut self, f: impl FnOnce(&Value) -> VmResult<Value>) -> VmResult<()> {
        let top = self.peek_mut()?;
        *top = f(top)?;
        Ok(())
    }

    /// Read the slot at an absolute address
    pub fn get(&self, address: isize) -> VmResult<&Value> {
        let index = self.check(address)?;
        Ok(&self.values[index])
    }

    /// Overwrite the slot at an absolute address
    pub fn set(&mut self, address: isize, value: Value) -> VmResult<()> {
        let index = self.check(address)?;
        self.values[index] = value;
        Ok(())
    }

    fn check(&self, address: isize) -> VmResult<usize> {
        match usize::try_from(address) {
            Ok(index) if index < self.values.len() => Ok(index),
            _ => Err(VmError::OutOfRange {
                address,
                sp: self.values.len(),
            }),
        }
    }

    /// Read a saved base pointer or return address
    pub fn address_at(&self, address: isize) -> VmResult<usize> {
        let raw = self.get(address)?.as_integer()?;
        usize::try_from(raw).map_err(|_| VmError::OutOfRange {
            address: raw as isize,
            sp: self.values.len(),
        })
    }

    /// Pop a saved base pointer or return address
    pub fn pop_address(&mut self) -> VmResult<usize> {
        let raw = self.pop()?.as_integer()?;
        usize::try_from(raw).map_err(|_| VmError::OutOfRange {
            address: raw as isize,
            sp: self.values.len(),
        })
    }

    pub fn push_address(&mut self, address: usize) -> VmResult<()> {
        self.push(Value::Integer(address as i64))
    }

    /// Save the current base and start an empty scope above it
    pub fn new_scope(&mut self) -> VmResult<()> {
        self.push_address(self.bp)?;
        self.bp = self.values.len();
        Ok(())
    }

    /// Drop every slot of the current scope and restore the enclosing base
    pub fn end_scope(&mut self) -> VmResult<()> {
        if self.bp == 0 {
            return Err(VmError::StackUnderflow);
        }
        self.values.truncate(self.bp);
        let saved = self.address_at(self.bp as isize - 1)?;
        if saved >= self.bp {
            return Err(VmError::OutOfRange {
                address: saved as isize,
                sp: self.values.len(),
            });
        }
        self.values.pop();
        self.bp = saved;
        Ok(())
    }

    /// Base of the scope `distance` levels up the chain
    pub fn find_base(&self, distance: u16) -> VmResult<usize> {
        let mut base = self.bp;
        for _ in 0..distance {
            base = self.address_at(base as isize - 1)?;
        }
        Ok(base)
    }

    /// Address of local `n` in the scope `distance` levels up
    pub fn local_offset(&self, n: u16, distance: u16) -> VmResult<isize> {
        Ok(self.find_base(distance)? as isize + n as isize)
    }

    /// Address of argument `n` of the call owning the scope `distance`
    /// levels up
    pub fn arg_offset(&self, n: u16, distance: u16) -> VmResult<isize> {
        Ok(self.find_base(distance)? as isize - ARGUMENT_GAP - n as isize)
    }

    /// Address of the function value of the call owning the scope
    /// `distance` levels up
    pub fn function_offset(&self, distance: u16) -> VmResult<isize> {
        Ok(self.find_base(distance)? as isize - FUNCTION_GAP)
    }

    /// Clear stack
    pub fn clear(&mut self) {
        self.values.clear();
        self.bp = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> Value {
        Value::Integer(n)
    }

    #[test]
    fn scopes_nest_and_unwind() {
        let mut stack = Stack::new(64);
        stack.push(int(10)).unwrap();
        stack.new_scope().unwrap();
        assert_eq!((stack.sp(), stack.bp()), (2, 2));
        stack.push(int(20)).unwrap();
        stack.new_scope().unwrap();
        stack.push(int(30)).unwrap();
        assert_eq!((stack.sp(), stack.bp()), (5, 4));

        assert_eq!(stack.find_base(0).unwrap(), 4);
        assert_eq!(stack.find_base(1).unwrap(), 2);
        assert_eq!(stack.find_base(2).unwrap(), 0);
        assert_eq!(stack.get(stack.local_offset(0, 1).unwrap()).unwrap(), &int(20));
        assert_eq!(stack.get(stack.local_offset(0, 2).unwrap()).unwrap(), &int(10));

        stack.end_scope().unwrap();
        assert_eq!((stack.sp(), stack.bp()), (3, 2));
        stack.end_scope().unwrap();
        assert_eq!((stack.sp(), stack.bp()), (1, 0));
    }

    #[test]
    fn call_frame_offsets() {
        let mut stack = Stack::new(64);
        // arguments pushed last-parameter first
        stack.push(int(2)).unwrap();
        stack.push(int(1)).unwrap();
        stack.push_address(99).unwrap();
        stack.push(Value::Null).unwrap();
        stack.new_scope().unwrap();

        assert_eq!(stack.arg_offset(0, 0).unwrap(), 1);
        assert_eq!(stack.arg_offset(1, 0).unwrap(), 0);
        assert_eq!(stack.function_offset(0).unwrap(), 3);
        assert_eq!(stack.get(stack.arg_offset(0, 0).unwrap()).unwrap(), &int(1));
    }

    #[test]
    fn addresses_outside_the_stack_are_rejected() {
        let mut stack = Stack::new(8);
        stack.push(int(1)).unwrap();
        assert_eq!(
            stack.arg_offset(0, 0).and_then(|address| stack.get(address).cloned()),
            Err(VmError::OutOfRange { address: -4, sp: 1 })
        );
        assert_eq!(
            stack.get(1),
            Err(VmError::OutOfRange { address: 1, sp: 1 })
        );
        assert!(stack.find_base(1).is_err());
    }

    #[test]
    fn pop_stops_at_the_scope_base() {
        let mut stack = Stack::new(8);
        stack.push(int(1)).unwrap();
        stack.new_scope().unwrap();
        assert_eq!(stack.pop(), Err(VmError::StackUnderflow));
        assert_eq!(stack.end_scope(), Ok(()));
        assert_eq!(stack.end_scope(), Err(VmError::StackUnderflow));
    }

    #[test]
    fn overflow_is_trapped() {
        let mut stack = Stack::new(1);
        stack.push(int(1)).unwrap();
        assert_eq!(stack.push(int(2)), Err(VmError::StackOverflow(1)));
    }
}
