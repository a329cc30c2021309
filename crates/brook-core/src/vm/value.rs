//! Runtime Value Representation
//!
//! Defines the tagged values manipulated by the Brook virtual machine and the
//! operators over them. The tag of a value decides which operators accept it;
//! everything else is a type mismatch.

use std::fmt;
use std::sync::Arc;

use crate::error::{VmError, VmResult};

/// Native implementation of a builtin. Receives exactly `arity` arguments,
/// argument 0 first.
pub type NativeFn = fn(&[Value]) -> VmResult<Value>;

/// Runtime value
#[derive(Debug, Clone)]
pub enum Value {
    /// Absence of a value
    Null,

    Boolean(bool),

    Integer(i64),

    String(Arc<str>),

    /// User function with its captured bindings
    Function(Function),

    /// Native function with a fixed arity
    Builtin(Builtin),
}

/// Value tag, used in error reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Null,
    Boolean,
    Integer,
    String,
    Function,
    Builtin,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueType::Null => "null",
            ValueType::Boolean => "boolean",
            ValueType::Integer => "integer",
            ValueType::String => "string",
            ValueType::Function => "function",
            ValueType::Builtin => "builtin",
        })
    }
}

/// User-defined function value.
///
/// Bindings are shared copy-on-write: `bind` only changes this value, never
/// a copy of it that was already stored or passed elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub address: usize,
    bindings: Arc<Vec<Value>>,
}

impl Function {
    pub fn new(address: usize) -> Self {
        Function {
            address,
            bindings: Arc::new(Vec::new()),
        }
    }

    pub fn bindings(&self) -> &[Value] {
        &self.bindings
    }

    pub fn binding(&self, index: usize) -> VmResult<&Value> {
        self.bindings.get(index).ok_or(VmError::UnboundVariable {
            index,
            len: self.bindings.len(),
        })
    }

    /// Append a captured value
    pub fn bind(&mut self, value: Value) {
        Arc::make_mut(&mut self.bindings).push(value);
    }
}

/// Native callable exposed to programs through the environment.
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeFn,
}

impl Builtin {
    pub const fn new(name: &'static str, arity: usize, func: NativeFn) -> Self {
        Builtin { name, arity, func }
    }

    pub fn invoke(&self, args: &[Value]) -> VmResult<Value> {
        (self.func)(args)
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.arity == other.arity
    }
}

impl Value {
    pub fn string(text: &str) -> Self {
        Value::String(Arc::from(text))
    }

    pub fn type_of(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Integer(_) => ValueType::Integer,
            Value::String(_) => ValueType::String,
            Value::Function(_) => ValueType::Function,
            Value::Builtin(_) => ValueType::Builtin,
        }
    }

    /// Conditional-jump truth: `false`, `null` and `0` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(
            self,
            Value::Boolean(false) | Value::Null | Value::Integer(0)
        )
    }

    pub fn as_integer(&self) -> VmResult<i64> {
        match self {
            Value::Integer(n) => Ok(*n),
            other => Err(VmError::type_mismatch("integer", other.type_of())),
        }
    }

    pub fn as_boolean(&self) -> VmResult<bool> {
        match self {
            Value::Boolean(b) => Ok(*b),
            other => Err(VmError::type_mismatch("boolean", other.type_of())),
        }
    }

    pub fn as_function_mut(&mut self) -> VmResult<&mut Function> {
        match self {
            Value::Function(function) => Ok(function),
            other => Err(VmError::type_mismatch("function", other.type_of())),
        }
    }
}

/// Structural equality. Values of different tags are never equal.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::string(text)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::String(s) => f.write_str(s),
            Value::Function(function) => write!(f, "<function @{}>", function.address),
            Value::Builtin(builtin) => write!(f, "<builtin {}/{}>", builtin.name, builtin.arity),
        }
    }
}

// Operators

fn integers(lhs: &Value, rhs: &Value) -> VmResult<(i64, i64)> {
    Ok((lhs.as_integer()?, rhs.as_integer()?))
}

fn checked(result: Option<i64>) -> VmResult<Value> {
    result.map(Value::Integer).ok_or(VmError::IntegerOverflow)
}

pub fn add(lhs: &Value, rhs: &Value) -> VmResult<Value> {
    let (a, b) = integers(lhs, rhs)?;
    checked(a.checked_add(b))
}

pub fn sub(lhs: &Value, rhs: &Value) -> VmResult<Value> {
    let (a, b) = integers(lhs, rhs)?;
    checked(a.checked_sub(b))
}

pub fn mul(lhs: &Value, rhs: &Value) -> VmResult<Value> {
    let (a, b) = integers(lhs, rhs)?;
    checked(a.checked_mul(b))
}

/// Truncating division.
pub fn div(lhs: &Value, rhs: &Value) -> VmResult<Value> {
    let (a, b) = integers(lhs, rhs)?;
    if b == 0 {
        return Err(VmError::DivisionByZero);
    }
    checked(a.checked_div(b))
}

/// Remainder with the sign of the dividend.
pub fn rem(lhs: &Value, rhs: &Value) -> VmResult<Value> {
    let (a, b) = integers(lhs, rhs)?;
    if b == 0 {
        return Err(VmError::DivisionByZero);
    }
    checked(a.checked_rem(b))
}

pub fn add1(value: &Value) -> VmResult<Value> {
    checked(value.as_integer()?.checked_add(1))
}

pub fn sub1(value: &Value) -> VmResult<Value> {
    checked(value.as_integer()?.checked_sub(1))
}

pub fn neg(value: &Value) -> VmResult<Value> {
    checked(value.as_integer()?.checked_neg())
}

/// Both operands are checked; there is no short circuit.
pub fn and(lhs: &Value, rhs: &Value) -> VmResult<Value> {
    let (a, b) = (lhs.as_boolean()?, rhs.as_boolean()?);
    Ok(Value::Boolean(a && b))
}

pub fn or(lhs: &Value, rhs: &Value) -> VmResult<Value> {
    let (a, b) = (lhs.as_boolean()?, rhs.as_boolean()?);
    Ok(Value::Boolean(a || b))
}

/// Logical negation of any value's truthiness.
pub fn not(value: &Value) -> Value {
    Value::Boolean(!value.is_truthy())
}

/// Negation restricted to booleans.
pub fn bool_not(value: &Value) -> VmResult<Value> {
    Ok(Value::Boolean(!value.as_boolean()?))
}

pub fn eq(lhs: &Value, rhs: &Value) -> Value {
    Value::Boolean(lhs == rhs)
}

pub fn ne(lhs: &Value, rhs: &Value) -> Value {
    Value::Boolean(lhs != rhs)
}

pub fn lt(lhs: &Value, rhs: &Value) -> VmResult<Value> {
    let (a, b) = integers(lhs, rhs)?;
    Ok(Value::Boolean(a < b))
}

pub fn gt(lhs: &Value, rhs: &Value) -> VmResult<Value> {
    let (a, b) = integers(lhs, rhs)?;
    Ok(Value::Boolean(a > b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> Value {
        Value::Integer(n)
    }

    fn sample_values() -> Vec<Value> {
        vec![
            Value::Null,
            Value::Boolean(true),
            Value::Boolean(false),
            int(0),
            int(7),
            Value::string(""),
            Value::string("seven"),
            Value::Function(Function::new(3)),
            Value::Builtin(Builtin::new("id", 1, |args| Ok(args[0].clone()))),
        ]
    }

    #[test]
    fn truthiness_table() {
        let truthy: Vec<bool> = sample_values().iter().map(Value::is_truthy).collect();
        assert_eq!(
            truthy,
            vec![false, true, false, false, true, true, true, true, true]
        );
    }

    #[test]
    fn arithmetic_requires_integers() {
        assert_eq!(add(&int(2), &int(3)), Ok(int(5)));
        assert_eq!(sub(&int(2), &int(3)), Ok(int(-1)));
        assert_eq!(mul(&int(-4), &int(3)), Ok(int(-12)));
        assert_eq!(
            add(&int(1), &Value::Boolean(true)),
            Err(VmError::type_mismatch("integer", ValueType::Boolean))
        );
        assert_eq!(
            add1(&Value::string("1")),
            Err(VmError::type_mismatch("integer", ValueType::String))
        );
        assert!(neg(&Value::Null).is_err());
    }

    #[test]
    fn division_truncates_toward_zero() {
        assert_eq!(div(&int(7), &int(2)), Ok(int(3)));
        assert_eq!(div(&int(-7), &int(2)), Ok(int(-3)));
        assert_eq!(rem(&int(-7), &int(2)), Ok(int(-1)));
        assert_eq!(rem(&int(7), &int(-2)), Ok(int(1)));
        assert_eq!(div(&int(1), &int(0)), Err(VmError::DivisionByZero));
        assert_eq!(rem(&int(1), &int(0)), Err(VmError::DivisionByZero));
    }

    #[test]
    fn overflow_is_an_error() {
        assert_eq!(add1(&int(i64::MAX)), Err(VmError::IntegerOverflow));
        assert_eq!(sub1(&int(i64::MIN)), Err(VmError::IntegerOverflow));
        assert_eq!(neg(&int(i64::MIN)), Err(VmError::IntegerOverflow));
        assert_eq!(div(&int(i64::MIN), &int(-1)), Err(VmError::IntegerOverflow));
    }

    #[test]
    fn not_uses_truthiness_but_boolnot_is_strict() {
        for value in sample_values() {
            assert_eq!(not(&value), Value::Boolean(!value.is_truthy()));
        }
        assert_eq!(bool_not(&Value::Boolean(false)), Ok(Value::Boolean(true)));
        assert_eq!(
            bool_not(&int(0)),
            Err(VmError::type_mismatch("boolean", ValueType::Integer))
        );
        assert_eq!(
            bool_not(&Value::Null),
            Err(VmError::type_mismatch("boolean", ValueType::Null))
        );
    }

    #[test]
    fn and_or_are_strict() {
        let t = Value::Boolean(true);
        let f = Value::Boolean(false);
        assert_eq!(and(&t, &f), Ok(f.clone()));
        assert_eq!(or(&t, &f), Ok(t.clone()));
        assert!(and(&t, &int(1)).is_err());
        assert!(or(&Value::Null, &f).is_err());
    }

    #[test]
    fn equality_never_fails_across_tags() {
        let values = sample_values();
        for (i, a) in values.iter().enumerate() {
            for (j, b) in values.iter().enumerate() {
                assert_eq!(eq(a, b), Value::Boolean(i == j), "{a:?} == {b:?}");
                assert_eq!(ne(a, b), Value::Boolean(i != j), "{a:?} != {b:?}");
            }
        }
        assert_eq!(eq(&int(0), &Value::Boolean(false)), Value::Boolean(false));
        assert_eq!(eq(&Value::Null, &int(0)), Value::Boolean(false));
        assert_eq!(eq(&Value::string("a"), &Value::string("a")), Value::Boolean(true));
    }

    #[test]
    fn functions_compare_address_and_bindings() {
        let mut a = Function::new(4);
        let mut b = Function::new(4);
        assert_eq!(a, b);
        a.bind(int(1));
        assert_ne!(a, b);
        b.bind(int(1));
        assert_eq!(a, b);
        assert_ne!(Function::new(5), Function::new(4));
    }

    #[test]
    fn binding_a_copy_leaves_the_original_alone() {
        let mut original = Function::new(0);
        original.bind(int(1));
        let mut copy = original.clone();
        copy.bind(int(2));
        assert_eq!(original.bindings(), &[int(1)]);
        assert_eq!(copy.bindings(), &[int(1), int(2)]);
        assert_eq!(
            original.binding(1),
            Err(VmError::UnboundVariable { index: 1, len: 1 })
        );
    }

    #[test]
    fn conversions_from_rust_values() {
        assert_eq!(Value::from(-3i64), int(-3));
        assert_eq!(Value::from(true), Value::Boolean(true));
        assert_eq!(Value::from("brook"), Value::string("brook"));
    }

    #[test]
    fn comparisons() {
        assert_eq!(lt(&int(1), &int(2)), Ok(Value::Boolean(true)));
        assert_eq!(gt(&int(1), &int(2)), Ok(Value::Boolean(false)));
        assert!(lt(&Value::string("a"), &Value::string("b")).is_err());
    }
}
