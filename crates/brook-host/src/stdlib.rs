//! Standard builtins
//!
//! Native functions every host registers by default. Each receives its
//! arguments with argument 0 first.

use std::cell::RefCell;

use brook_core::{Builtin, Value, VmError, VmResult};

thread_local! {
    /// Lines printed while a capture is active on this thread.
    static CAPTURED: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// Run `f`, collecting everything `print` writes on this thread instead of
/// sending it to stdout.
pub fn capture_output<R>(f: impl FnOnce() -> R) -> (R, Vec<String>) {
    let previous = CAPTURED.with(|c| c.replace(Some(Vec::new())));
    let result = f();
    let lines = CAPTURED.with(|c| c.replace(previous)).unwrap_or_default();
    (result, lines)
}

fn emit(line: String) {
    let leftover = CAPTURED.with(|c| match c.borrow_mut().as_mut() {
        Some(lines) => {
            lines.push(line);
            None
        }
        None => Some(line),
    });
    if let Some(line) = leftover {
        println!("{line}");
    }
}

fn failure(name: &str, message: impl Into<String>) -> VmError {
    VmError::Native {
        name: name.to_string(),
        message: message.into(),
    }
}

pub const PRINT: Builtin = Builtin::new("print", 1, print);
pub const CONCAT: Builtin = Builtin::new("concat", 2, concat);
pub const LEN: Builtin = Builtin::new("len", 1, len);
pub const STR: Builtin = Builtin::new("str", 1, stringify);
pub const ABS: Builtin = Builtin::new("abs", 1, abs);
pub const MIN: Builtin = Builtin::new("min", 2, min);
pub const MAX: Builtin = Builtin::new("max", 2, max);
pub const ASSERT: Builtin = Builtin::new("assert", 1, assert);

pub const ALL: [Builtin; 8] = [PRINT, CONCAT, LEN, STR, ABS, MIN, MAX, ASSERT];

fn print(args: &[Value]) -> VmResult<Value> {
    emit(args[0].to_string());
    Ok(Value::Null)
}

fn concat(args: &[Value]) -> VmResult<Value> {
    Ok(Value::string(&format!("{}{}", args[0], args[1])))
}

fn len(args: &[Value]) -> VmResult<Value> {
    match &args[0] {
        Value::String(text) => Ok(Value::Integer(text.chars().count() as i64)),
        Value::Function(function) => Ok(Value::Integer(function.bindings().len() as i64)),
        other => Err(VmError::type_mismatch("string", other.type_of())),
    }
}

fn stringify(args: &[Value]) -> VmResult<Value> {
    match &args[0] {
        text @ Value::String(_) => Ok(text.clone()),
        other => Ok(Value::string(&other.to_string())),
    }
}

fn abs(args: &[Value]) -> VmResult<Value> {
    args[0]
        .as_integer()?
        .checked_abs()
        .map(Value::Integer)
        .ok_or(VmError::IntegerOverflow)
}

fn min(args: &[Value]) -> VmResult<Value> {
    Ok(Value::Integer(args[0].as_integer()?.min(args[1].as_integer()?)))
}

fn max(args: &[Value]) -> VmResult<Value> {
    Ok(Value::Integer(args[0].as_integer()?.max(args[1].as_integer()?)))
}

fn assert(args: &[Value]) -> VmResult<Value> {
    if args[0].is_truthy() {
        Ok(Value::Null)
    } else {
        Err(failure("assert", format!("assertion failed: {}", args[0])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_is_captured() {
        let (result, lines) = capture_output(|| PRINT.invoke(&[Value::Integer(3)]));
        assert_eq!(result, Ok(Value::Null));
        assert_eq!(lines, vec!["3".to_string()]);
    }

    #[test]
    fn nested_captures_are_separate() {
        let (inner, outer) = capture_output(|| {
            PRINT.invoke(&[Value::string("outer")]).unwrap();
            capture_output(|| PRINT.invoke(&[Value::string("inner")]).unwrap()).1
        });
        assert_eq!(inner, vec!["inner".to_string()]);
        assert_eq!(outer, vec!["outer".to_string()]);
    }

    #[test]
    fn string_builtins() {
        assert_eq!(
            CONCAT.invoke(&[Value::string("n="), Value::Integer(4)]),
            Ok(Value::string("n=4"))
        );
        assert_eq!(LEN.invoke(&[Value::string("héllo")]), Ok(Value::Integer(5)));
        assert!(LEN.invoke(&[Value::Integer(5)]).is_err());
        assert_eq!(STR.invoke(&[Value::Boolean(false)]), Ok(Value::string("false")));
    }

    #[test]
    fn integer_builtins() {
        assert_eq!(ABS.invoke(&[Value::Integer(-4)]), Ok(Value::Integer(4)));
        assert_eq!(ABS.invoke(&[Value::Integer(i64::MIN)]), Err(VmError::IntegerOverflow));
        assert_eq!(MIN.invoke(&[Value::Integer(2), Value::Integer(-1)]), Ok(Value::Integer(-1)));
        assert_eq!(MAX.invoke(&[Value::Integer(2), Value::Integer(-1)]), Ok(Value::Integer(2)));
        assert!(MAX.invoke(&[Value::Null, Value::Integer(1)]).is_err());
    }

    #[test]
    fn assert_reports_the_value() {
        assert_eq!(ASSERT.invoke(&[Value::Integer(1)]), Ok(Value::Null));
        assert_eq!(
            ASSERT.invoke(&[Value::Integer(0)]),
            Err(VmError::Native {
                name: "assert".to_string(),
                message: "assertion failed: 0".to_string(),
            })
        );
    }
}
