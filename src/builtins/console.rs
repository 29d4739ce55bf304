//! Console output: print
//!
//! `print` formats one value the same way the `Print` statement does and
//! writes it to the interpreter's output sink with a trailing newline.

use super::{expect_arity, BuiltinFn};
use crate::env::Environment;
use crate::error::RuntimeError;
use crate::value::Value;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

/// Formats and prints one argument, newline-terminated. Returns nil.
pub fn builtin_print(
    _env: &Rc<Environment>,
    out: &mut dyn Write,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    expect_arity("print", 1, args)?;
    let _ = writeln!(out, "{}", args[0]);
    Ok(Value::Nil)
}

pub fn register(table: &mut HashMap<String, BuiltinFn>) {
    table.insert("print".to_string(), builtin_print as BuiltinFn);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_writes_formatted_value() {
        let env = Environment::new();
        let mut out: Vec<u8> = Vec::new();
        let result = builtin_print(&env, &mut out, &[Value::Number(5.0)]).unwrap();
        assert_eq!(result, Value::Nil);
        assert_eq!(String::from_utf8(out).unwrap(), "5\n");
    }

    #[test]
    fn test_print_requires_one_argument() {
        let env = Environment::new();
        let mut out: Vec<u8> = Vec::new();
        assert_eq!(
            builtin_print(&env, &mut out, &[]),
            Err(RuntimeError::arity_error("print", 1, 0))
        );
    }
}
