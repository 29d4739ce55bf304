// ABOUTME: Tree-walking evaluator executing programs against an environment

use crate::ast::{BinaryOp, Expression, Program, Statement, UnaryOp};
use crate::builtins::{self, BuiltinFn};
use crate::env::{Environment, FunctionDef};
use crate::error::RuntimeError;
use crate::value::{format_number, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

/// How a statement finished. `Return` unwinds to the nearest enclosing
/// function call, `Break` to the nearest enclosing loop; both are plain
/// values, never host exceptions.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
    Break,
}

/// The interpreter: owns the builtin table and the output sink that `print`
/// and printing builtins write to. The environment is passed in, so one
/// interpreter can serve a session's shared scope or a one-shot run.
pub struct Interpreter {
    builtins: HashMap<String, BuiltinFn>,
    out: Rc<RefCell<dyn Write>>,
}

impl Interpreter {
    pub fn new(out: Rc<RefCell<dyn Write>>) -> Self {
        let mut builtins = HashMap::new();
        builtins::register_builtins(&mut builtins);
        Interpreter { builtins, out }
    }

    /// Interpreter writing straight to process standard output.
    pub fn to_stdout() -> Self {
        Interpreter::new(Rc::new(RefCell::new(std::io::stdout())))
    }

    /// Executes a whole program. `return` and `break` escaping to the top
    /// level are runtime errors.
    pub fn run(&mut self, program: &Program, env: &Rc<Environment>) -> Result<(), RuntimeError> {
        for statement in &program.statements {
            match self.exec(statement, env)? {
                Flow::Normal => {}
                Flow::Return(_) => return Err(RuntimeError::ReturnOutsideFunction),
                Flow::Break => return Err(RuntimeError::BreakOutsideLoop),
            }
        }
        Ok(())
    }

    fn exec_block(
        &mut self,
        statements: &[Statement],
        env: &Rc<Environment>,
    ) -> Result<Flow, RuntimeError> {
        for statement in statements {
            let flow = self.exec(statement, env)?;
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, statement: &Statement, env: &Rc<Environment>) -> Result<Flow, RuntimeError> {
        match statement {
            Statement::VariableDecl {
                name,
                constant,
                value,
            } => {
                let value = self.eval(value, env)?;
                env.define(name, value, *constant)?;
                Ok(Flow::Normal)
            }

            Statement::Assignment { name, value } => {
                let value = self.eval(value, env)?;
                // `Set` rebinds the innermost existing binding; a name never
                // declared binds fresh in the current scope.
                match env.assign(name, value.clone()) {
                    Err(RuntimeError::UndefinedVariable(_)) => {
                        env.define(name, value, false)?;
                        Ok(Flow::Normal)
                    }
                    result => result.map(|_| Flow::Normal),
                }
            }

            Statement::IndexAssignment { name, index, value } => {
                let target = env
                    .lookup(name)
                    .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone()))?;
                let items = match target {
                    Value::List(items) => items,
                    other => {
                        return Err(RuntimeError::type_error(
                            "'set at position'",
                            "a list",
                            &other,
                        ))
                    }
                };
                let index = self.eval(index, env)?;
                let value = self.eval(value, env)?;
                let position = as_position(&index)?;
                let mut items = items.borrow_mut();
                if position < 1 || position as usize > items.len() {
                    return Err(RuntimeError::IndexOutOfRange {
                        position,
                        length: items.len(),
                    });
                }
                items[position as usize - 1] = value;
                Ok(Flow::Normal)
            }

            Statement::FunctionDecl { name, params, body } => {
                env.define_function(Rc::new(FunctionDef {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                    closure: env.clone(),
                }));
                Ok(Flow::Normal)
            }

            Statement::Call(call) => {
                self.eval(call, env)?;
                Ok(Flow::Normal)
            }

            Statement::If {
                condition,
                then_body,
                else_ifs,
                else_body,
            } => {
                if self.eval_condition(condition, env)? {
                    return self.exec_block(then_body, env);
                }
                for arm in else_ifs {
                    if self.eval_condition(&arm.condition, env)? {
                        return self.exec_block(&arm.body, env);
                    }
                }
                self.exec_block(else_body, env)
            }

            Statement::While { condition, body } => {
                while self.eval_condition(condition, env)? {
                    match self.exec_block(body, env)? {
                        Flow::Normal => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }

            Statement::For { count, body } => {
                let count = self.eval(count, env)?;
                let count = match count {
                    Value::Number(n) => n.floor() as i64,
                    other => {
                        return Err(RuntimeError::type_error(
                            "'repeat ... times'",
                            "a number",
                            &other,
                        ))
                    }
                };
                for _ in 0..count.max(0) {
                    match self.exec_block(body, env)? {
                        Flow::Normal => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }

            Statement::ForEach { name, list, body } => {
                let list = self.eval(list, env)?;
                let items = match list {
                    Value::List(items) => items,
                    other => {
                        return Err(RuntimeError::type_error("'for each'", "a list", &other))
                    }
                };
                // Snapshot so the body may mutate the list without upsetting
                // the iteration.
                let snapshot: Vec<Value> = items.borrow().clone();
                for element in snapshot {
                    // Fresh scope per iteration keeps the variable from
                    // leaking and from surviving between iterations.
                    let scope = Environment::with_parent(env.clone());
                    scope.define(name, element, false)?;
                    match self.exec_block(body, &scope)? {
                        Flow::Normal => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }

            Statement::Return(value) => {
                let value = self.eval(value, env)?;
                Ok(Flow::Return(value))
            }

            Statement::Output(value) => {
                let value = self.eval(value, env)?;
                let _ = writeln!(self.out.borrow_mut(), "{}", value);
                Ok(Flow::Normal)
            }

            Statement::Toggle(name) => {
                let current = env
                    .lookup(name)
                    .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone()))?;
                match current {
                    Value::Bool(b) => {
                        env.assign(name, Value::Bool(!b))?;
                        Ok(Flow::Normal)
                    }
                    other => Err(RuntimeError::type_error("'toggle'", "a boolean", &other)),
                }
            }

            Statement::Break => Ok(Flow::Break),
        }
    }

    /// Conditions must be actual booleans; nothing is truthy by accident.
    fn eval_condition(
        &mut self,
        condition: &Expression,
        env: &Rc<Environment>,
    ) -> Result<bool, RuntimeError> {
        match self.eval(condition, env)? {
            Value::Bool(b) => Ok(b),
            other => Err(RuntimeError::type_error(
                "a condition",
                "a boolean",
                &other,
            )),
        }
    }

    pub fn eval(
        &mut self,
        expression: &Expression,
        env: &Rc<Environment>,
    ) -> Result<Value, RuntimeError> {
        match expression {
            Expression::NumberLiteral(n) => Ok(Value::Number(*n)),
            Expression::StringLiteral(s) => Ok(Value::String(s.clone())),
            Expression::BoolLiteral(b) => Ok(Value::Bool(*b)),

            Expression::ListLiteral(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.eval(element, env)?);
                }
                Ok(Value::list(items))
            }

            Expression::Identifier(name) => env
                .lookup(name)
                .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone())),

            Expression::Binary { op, left, right } => {
                if *op == BinaryOp::And {
                    // Short-circuit: the right side only runs when needed.
                    let left = self.eval(left, env)?;
                    let left = as_bool("'and'", &left)?;
                    if !left {
                        return Ok(Value::Bool(false));
                    }
                    let right = self.eval(right, env)?;
                    return Ok(Value::Bool(as_bool("'and'", &right)?));
                }
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                apply_binary(*op, left, right)
            }

            Expression::Unary { op, operand } => {
                let operand = self.eval(operand, env)?;
                match (op, operand) {
                    (UnaryOp::Negate, Value::Number(n)) => Ok(Value::Number(-n)),
                    (UnaryOp::Negate, other) => {
                        Err(RuntimeError::type_error("'-'", "a number", &other))
                    }
                }
            }

            Expression::FunctionCall { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, env)?);
                }
                self.call(name, &values, env)
            }

            Expression::Index { list, index } => {
                let list = self.eval(list, env)?;
                let index = self.eval(index, env)?;
                let items = match list {
                    Value::List(items) => items,
                    other => {
                        return Err(RuntimeError::type_error(
                            "'the item at position'",
                            "a list",
                            &other,
                        ))
                    }
                };
                let position = as_position(&index)?;
                let items = items.borrow();
                if position < 1 || position as usize > items.len() {
                    return Err(RuntimeError::IndexOutOfRange {
                        position,
                        length: items.len(),
                    });
                }
                Ok(items[position as usize - 1].clone())
            }

            Expression::Length(inner) => {
                let value = self.eval(inner, env)?;
                match value {
                    Value::List(items) => Ok(Value::Number(items.borrow().len() as f64)),
                    Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
                    other => Err(RuntimeError::type_error(
                        "'the length of'",
                        "a list or a string",
                        &other,
                    )),
                }
            }

            Expression::Location(name) => Ok(Value::Location(name.clone())),
        }
    }

    /// Resolves a call: user functions shadow builtins of the same name.
    fn call(
        &mut self,
        name: &str,
        args: &[Value],
        env: &Rc<Environment>,
    ) -> Result<Value, RuntimeError> {
        if let Some(def) = env.lookup_function(name) {
            if def.params.len() != args.len() {
                return Err(RuntimeError::arity_error(
                    name,
                    def.params.len(),
                    args.len(),
                ));
            }
            let scope = Environment::with_parent(def.closure.clone());
            for (param, value) in def.params.iter().zip(args) {
                scope.define(param, value.clone(), false)?;
            }
            return match self.exec_block(&def.body, &scope)? {
                Flow::Return(value) => Ok(value),
                Flow::Normal => Ok(Value::Nil),
                Flow::Break => Err(RuntimeError::BreakOutsideLoop),
            };
        }

        if let Some(builtin) = self.builtins.get(name).copied() {
            let out = self.out.clone();
            let mut out = out.borrow_mut();
            return builtin(env, &mut *out, args);
        }

        Err(RuntimeError::UndefinedFunction(name.to_string()))
    }
}

fn as_bool(context: &str, value: &Value) -> Result<bool, RuntimeError> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(RuntimeError::type_error(context, "booleans", other)),
    }
}

/// 1-based surface position; must be a whole number.
fn as_position(value: &Value) -> Result<i64, RuntimeError> {
    match value {
        Value::Number(n) if n.fract() == 0.0 => Ok(*n as i64),
        other => Err(RuntimeError::type_error(
            "a list position",
            "a whole number",
            other,
        )),
    }
}

fn apply_binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Add => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            (Value::String(a), Value::Number(b)) => {
                Ok(Value::String(format!("{}{}", a, format_number(*b))))
            }
            (Value::Number(a), Value::String(b)) => {
                Ok(Value::String(format!("{}{}", format_number(*a), b)))
            }
            _ => Err(mismatch("'+'", "two numbers or strings", &left, &right)),
        },

        BinaryOp::Subtract => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
            _ => Err(mismatch("'-'", "two numbers", &left, &right)),
        },

        BinaryOp::Multiply => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
            (Value::String(s), Value::Number(n)) | (Value::Number(n), Value::String(s)) => {
                repeat_string(s, *n)
            }
            _ => Err(mismatch("'*'", "two numbers", &left, &right)),
        },

        BinaryOp::Divide => match (&left, &right) {
            (Value::Number(_), Value::Number(b)) if *b == 0.0 => Err(RuntimeError::DivisionByZero),
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
            _ => Err(mismatch("'/'", "two numbers", &left, &right)),
        },

        BinaryOp::Remainder => match (&left, &right) {
            (Value::Number(_), Value::Number(b)) if *b == 0.0 => Err(RuntimeError::DivisionByZero),
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a % b)),
            _ => Err(mismatch("'remainder'", "two numbers", &left, &right)),
        },

        BinaryOp::Equal => Ok(Value::Bool(left == right)),
        BinaryOp::NotEqual => Ok(Value::Bool(left != right)),

        BinaryOp::Less => compare(op, left, right),
        BinaryOp::Greater => compare(op, left, right),
        BinaryOp::LessEqual => compare(op, left, right),
        BinaryOp::GreaterEqual => compare(op, left, right),

        // Short-circuited before reaching here.
        BinaryOp::And => {
            let l = as_bool("'and'", &left)?;
            let r = as_bool("'and'", &right)?;
            Ok(Value::Bool(l && r))
        }
    }
}

/// Ordered comparisons need two numbers or two strings (lexicographic).
fn compare(op: BinaryOp, left: Value, right: Value) -> Result<Value, RuntimeError> {
    let ordering = match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => {
            return Err(mismatch(
                "an ordered comparison",
                "two numbers or two strings",
                &left,
                &right,
            ))
        }
    };
    let Some(ordering) = ordering else {
        // NaN compares false against everything.
        return Ok(Value::Bool(false));
    };
    let result = match op {
        BinaryOp::Less => ordering.is_lt(),
        BinaryOp::Greater => ordering.is_gt(),
        BinaryOp::LessEqual => ordering.is_le(),
        BinaryOp::GreaterEqual => ordering.is_ge(),
        _ => unreachable!("compare only handles ordered operators"),
    };
    Ok(Value::Bool(result))
}

fn repeat_string(s: &str, count: f64) -> Result<Value, RuntimeError> {
    if count.fract() != 0.0 || count < 0.0 {
        return Err(RuntimeError::TypeMismatch(format!(
            "string repetition expects a whole non-negative count, got {}",
            format_number(count)
        )));
    }
    Ok(Value::String(s.repeat(count as usize)))
}

fn mismatch(context: &str, expected: &str, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::TypeMismatch(format!(
        "{} expects {}, got {} and {}",
        context,
        expected,
        left.type_name(),
        right.type_name()
    ))
}
