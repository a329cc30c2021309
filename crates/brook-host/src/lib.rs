//! Brook host library
//!
//! The builtins a host hands to programs and a handful of sample programs
//! assembled with the core builder.

pub mod samples;
pub mod stdlib;

use log::debug;

use brook_core::{BuiltinRegistry, Value, VmResult};

pub use samples::Sample;
pub use stdlib::capture_output;

/// Registry holding every standard builtin
pub fn registry() -> BuiltinRegistry {
    let registry = stdlib::ALL
        .iter()
        .fold(BuiltinRegistry::new(), |registry, builtin| registry.with(*builtin));
    debug!("standard registry holds {} builtins", registry.len());
    registry
}

/// Environment holding the named standard builtins in the given order, so
/// the first name ends up in global slot 0.
pub fn environment(names: &[&str]) -> VmResult<Vec<Value>> {
    let registry = registry();
    names.iter().map(|name| registry.value(name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use brook_core::VmError;

    #[test]
    fn registry_contains_the_standard_library() {
        let registry = registry();
        assert_eq!(registry.len(), stdlib::ALL.len());
        for name in ["print", "concat", "len", "str", "abs", "min", "max", "assert"] {
            assert!(registry.contains(name), "{name} missing");
        }
    }

    #[test]
    fn environment_keeps_order_and_rejects_unknown_names() {
        let env = environment(&["max", "print"]).expect("known names");
        assert_eq!(
            env,
            vec![Value::Builtin(stdlib::MAX), Value::Builtin(stdlib::PRINT)]
        );
        assert_eq!(
            environment(&["print", "exec"]),
            Err(VmError::UnknownBuiltin("exec".to_string()))
        );
    }
}
