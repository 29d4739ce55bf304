//! Numeric helpers: absolute, floor, ceiling, round, even, odd
//!
//! All take exactly one number. The predicates `even` and `odd` additionally
//! require a whole number and return a boolean.

use super::{expect_arity, number_arg, BuiltinFn};
use crate::env::Environment;
use crate::error::RuntimeError;
use crate::value::{format_number, Value};
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

/// Absolute value of a number.
pub fn builtin_absolute(
    _env: &Rc<Environment>,
    _out: &mut dyn Write,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    expect_arity("absolute", 1, args)?;
    Ok(Value::Number(number_arg("absolute", args, 0)?.abs()))
}

/// Largest whole number not above the argument.
pub fn builtin_floor(
    _env: &Rc<Environment>,
    _out: &mut dyn Write,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    expect_arity("floor", 1, args)?;
    Ok(Value::Number(number_arg("floor", args, 0)?.floor()))
}

/// Smallest whole number not below the argument.
pub fn builtin_ceiling(
    _env: &Rc<Environment>,
    _out: &mut dyn Write,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    expect_arity("ceiling", 1, args)?;
    Ok(Value::Number(number_arg("ceiling", args, 0)?.ceil()))
}

/// Nearest whole number, halves away from zero.
pub fn builtin_round(
    _env: &Rc<Environment>,
    _out: &mut dyn Write,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    expect_arity("round", 1, args)?;
    Ok(Value::Number(number_arg("round", args, 0)?.round()))
}

/// True when the argument is a whole even number.
pub fn builtin_even(
    _env: &Rc<Environment>,
    _out: &mut dyn Write,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    expect_arity("even", 1, args)?;
    Ok(Value::Bool(whole_arg("even", args)? % 2 == 0))
}

/// True when the argument is a whole odd number.
pub fn builtin_odd(
    _env: &Rc<Environment>,
    _out: &mut dyn Write,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    expect_arity("odd", 1, args)?;
    Ok(Value::Bool(whole_arg("odd", args)? % 2 != 0))
}

fn whole_arg(function: &str, args: &[Value]) -> Result<i64, RuntimeError> {
    let n = number_arg(function, args, 0)?;
    if n.fract() != 0.0 {
        return Err(RuntimeError::TypeMismatch(format!(
            "{} expects a whole number, got {}",
            function,
            format_number(n)
        )));
    }
    Ok(n as i64)
}

pub fn register(table: &mut HashMap<String, BuiltinFn>) {
    table.insert("absolute".to_string(), builtin_absolute as BuiltinFn);
    table.insert("floor".to_string(), builtin_floor as BuiltinFn);
    table.insert("ceiling".to_string(), builtin_ceiling as BuiltinFn);
    table.insert("round".to_string(), builtin_round as BuiltinFn);
    table.insert("even".to_string(), builtin_even as BuiltinFn);
    table.insert("odd".to_string(), builtin_odd as BuiltinFn);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(f: BuiltinFn, args: &[Value]) -> Result<Value, RuntimeError> {
        let env = Environment::new();
        let mut out: Vec<u8> = Vec::new();
        f(&env, &mut out, args)
    }

    #[test]
    fn test_absolute() {
        assert_eq!(
            call(builtin_absolute, &[Value::Number(-3.5)]),
            Ok(Value::Number(3.5))
        );
    }

    #[test]
    fn test_floor_ceiling_round() {
        assert_eq!(call(builtin_floor, &[Value::Number(2.7)]), Ok(Value::Number(2.0)));
        assert_eq!(call(builtin_ceiling, &[Value::Number(2.1)]), Ok(Value::Number(3.0)));
        assert_eq!(call(builtin_round, &[Value::Number(2.5)]), Ok(Value::Number(3.0)));
    }

    #[test]
    fn test_even_and_odd() {
        assert_eq!(call(builtin_even, &[Value::Number(4.0)]), Ok(Value::Bool(true)));
        assert_eq!(call(builtin_odd, &[Value::Number(4.0)]), Ok(Value::Bool(false)));
        assert_eq!(call(builtin_odd, &[Value::Number(-3.0)]), Ok(Value::Bool(true)));
        assert!(call(builtin_even, &[Value::Number(1.5)]).is_err());
    }

    #[test]
    fn test_type_errors() {
        assert!(call(builtin_absolute, &[Value::String("x".into())]).is_err());
    }
}
