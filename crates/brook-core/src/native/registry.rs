//! Builtin Registry
//!
//! Named builtins a host makes available to programs. Programs refer to
//! builtins by name in their environment; the loader resolves those names
//! here. Lookups fail closed: a name that was never registered is an error.

use std::collections::BTreeMap;

use crate::error::{VmError, VmResult};
use crate::vm::value::{Builtin, Value};

#[derive(Debug, Clone, Default)]
pub struct BuiltinRegistry {
    builtins: BTreeMap<&'static str, Builtin>,
}

impl BuiltinRegistry {
    /// New registry knows no builtins
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a builtin, returning the one it replaces
    pub fn register(&mut self, builtin: Builtin) -> Option<Builtin> {
        self.builtins.insert(builtin.name, builtin)
    }

    pub fn with(mut self, builtin: Builtin) -> Self {
        self.register(builtin);
        self
    }

    pub fn unregister(&mut self, name: &str) -> Option<Builtin> {
        self.builtins.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builtins.contains_key(name)
    }

    /// Look up a builtin and fail closed if it is unknown
    pub fn get(&self, name: &str) -> VmResult<Builtin> {
        self.builtins
            .get(name)
            .copied()
            .ok_or_else(|| VmError::UnknownBuiltin(name.to_string()))
    }

    /// Builtin value ready to be placed in an environment
    pub fn value(&self, name: &str) -> VmResult<Value> {
        self.get(name).map(Value::Builtin)
    }

    /// Registered builtins ordered by name
    pub fn iter(&self) -> impl Iterator<Item = &Builtin> {
        self.builtins.values()
    }

    pub fn len(&self) -> usize {
        self.builtins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builtins.is_empty()
    }
}
