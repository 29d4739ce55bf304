//! List and reference operations: length, copy, swap
//!
//! - `length`: element count of a list, or character count of a string
//! - `copy`: deep copy of a list, giving it fresh storage
//! - `swap`: exchanges two variables, passed by `the location of x`

use super::{expect_arity, BuiltinFn};
use crate::env::Environment;
use crate::error::RuntimeError;
use crate::value::Value;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

/// Element count of a list, or character count of a string.
pub fn builtin_length(
    _env: &Rc<Environment>,
    _out: &mut dyn Write,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    expect_arity("length", 1, args)?;
    match &args[0] {
        Value::List(items) => Ok(Value::Number(items.borrow().len() as f64)),
        Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
        other => Err(RuntimeError::type_error(
            "length",
            "a list or a string",
            other,
        )),
    }
}

/// Deep copy of a list. Nested lists get fresh storage too, so the result
/// shares nothing with the original.
pub fn builtin_copy(
    _env: &Rc<Environment>,
    _out: &mut dyn Write,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    expect_arity("copy", 1, args)?;
    match &args[0] {
        Value::List(_) => Ok(deep_copy(&args[0])),
        other => Err(RuntimeError::type_error("copy", "a list", other)),
    }
}

fn deep_copy(value: &Value) -> Value {
    match value {
        Value::List(items) => Value::list(items.borrow().iter().map(deep_copy).collect()),
        other => other.clone(),
    }
}

/// Exchanges the values of two variables given by location. Both variables
/// must exist; constants refuse the write.
pub fn builtin_swap(
    env: &Rc<Environment>,
    _out: &mut dyn Write,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    expect_arity("swap", 2, args)?;
    let (first, second) = match (&args[0], &args[1]) {
        (Value::Location(a), Value::Location(b)) => (a.clone(), b.clone()),
        (Value::Location(_), other) | (other, _) => {
            return Err(RuntimeError::type_error("swap", "two locations", other))
        }
    };
    let a = env
        .lookup(&first)
        .ok_or_else(|| RuntimeError::UndefinedVariable(first.clone()))?;
    let b = env
        .lookup(&second)
        .ok_or_else(|| RuntimeError::UndefinedVariable(second.clone()))?;
    env.assign(&first, b)?;
    env.assign(&second, a)?;
    Ok(Value::Nil)
}

pub fn register(table: &mut HashMap<String, BuiltinFn>) {
    table.insert("length".to_string(), builtin_length as BuiltinFn);
    table.insert("copy".to_string(), builtin_copy as BuiltinFn);
    table.insert("swap".to_string(), builtin_swap as BuiltinFn);
}
