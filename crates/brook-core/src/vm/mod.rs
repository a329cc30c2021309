pub mod stack;
pub mod value;
pub mod vm;

pub use vm::{Step, VirtualMachine};
pub use value::{Builtin, Function, NativeFn, Value, ValueType};
