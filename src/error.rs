// ABOUTME: Error types for every stage of the language pipeline

use crate::value::Value;
use thiserror::Error;

/// A syntax error reported by the parser. The lexer never fails on its own;
/// it embeds diagnostics in the token stream and the parser surfaces them.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("parse error: {message} at line {line}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        ParseError {
            message: message.into(),
            line,
        }
    }
}

/// A failure raised while evaluating a program. The evaluator never recovers
/// internally; callers surface these, and a session stays usable afterwards.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("runtime error: undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("runtime error: undefined function: {0}")]
    UndefinedFunction(String),

    #[error("runtime error: {function} expects {expected} argument{}, got {actual}", if *.expected == 1 { "" } else { "s" })]
    Arity {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("runtime error: {0}")]
    TypeMismatch(String),

    #[error("runtime error: cannot change constant: {0}")]
    ConstantReassignment(String),

    #[error("runtime error: position {position} is out of range for a list of length {length}")]
    IndexOutOfRange { position: i64, length: usize },

    #[error("runtime error: division by zero")]
    DivisionByZero,

    #[error("runtime error: 'return' outside of a function")]
    ReturnOutsideFunction,

    #[error("runtime error: 'break' outside of a loop")]
    BreakOutsideLoop,
}

impl RuntimeError {
    /// Type mismatch with the offending value's kind spelled out.
    pub fn type_error(context: &str, expected: &str, actual: &Value) -> Self {
        RuntimeError::TypeMismatch(format!(
            "{} expects {}, got {}",
            context,
            expected,
            actual.type_name()
        ))
    }

    pub fn arity_error(function: &str, expected: usize, actual: usize) -> Self {
        RuntimeError::Arity {
            function: function.to_string(),
            expected,
            actual,
        }
    }
}

/// A failure while decoding a bytecode image. Each shape of corruption gets
/// its own kind so loaders can tell them apart.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BytecodeError {
    #[error("bad magic bytes; not a bytecode file")]
    BadMagic,

    #[error("unsupported bytecode version {0}")]
    UnsupportedVersion(u8),

    #[error("unexpected end of bytecode")]
    UnexpectedEof,

    #[error("unknown node tag {0}")]
    UnknownTag(u8),

    #[error("bytecode string is not valid UTF-8")]
    InvalidUtf8,

    #[error("{0} trailing bytes after program")]
    TrailingBytes(usize),
}

/// Either kind of failure an executed buffer can produce. Sessions return
/// this alongside whatever output was captured before the failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LangError {
    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Runtime(#[from] RuntimeError),
}
