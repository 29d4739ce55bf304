// ABOUTME: Environment managing variable bindings, constants and function scopes

use crate::ast::Statement;
use crate::error::RuntimeError;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// A user-declared function together with the scope it closes over. Calls
/// push a fresh child of `closure`, so lexical scoping falls out of the
/// parent chain.
#[derive(Debug)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Statement>,
    pub closure: Rc<Environment>,
}

/// One scope in the lexical chain. Each scope keeps its own value bindings,
/// the set of names declared constant, and a separate function table.
#[derive(Debug, Default)]
pub struct Environment {
    values: RefCell<HashMap<String, Value>>,
    constants: RefCell<HashSet<String>>,
    functions: RefCell<HashMap<String, Rc<FunctionDef>>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    /// Creates the global scope.
    pub fn new() -> Rc<Self> {
        Rc::new(Environment::default())
    }

    /// Creates a child scope; lookups fall through to `parent`.
    pub fn with_parent(parent: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            parent: Some(parent),
            ..Environment::default()
        })
    }

    /// Binds a name in THIS scope. Re-declaring an existing binding replaces
    /// it, unless that binding is constant.
    pub fn define(&self, name: &str, value: Value, constant: bool) -> Result<(), RuntimeError> {
        if self.constants.borrow().contains(name) {
            return Err(RuntimeError::ConstantReassignment(name.to_string()));
        }
        self.values.borrow_mut().insert(name.to_string(), value);
        if constant {
            self.constants.borrow_mut().insert(name.to_string());
        }
        Ok(())
    }

    /// Overwrites the innermost existing binding of `name`, walking the
    /// parent chain. Assigning to a missing or constant name is an error.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        if self.values.borrow().contains_key(name) {
            if self.constants.borrow().contains(name) {
                return Err(RuntimeError::ConstantReassignment(name.to_string()));
            }
            self.values.borrow_mut().insert(name.to_string(), value);
            return Ok(());
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => Err(RuntimeError::UndefinedVariable(name.to_string())),
        }
    }

    /// Looks a name up through the scope chain.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.lookup(name))
    }

    /// Registers a function in THIS scope's function table, replacing any
    /// earlier definition of the same name in the same scope.
    pub fn define_function(&self, def: Rc<FunctionDef>) {
        self.functions.borrow_mut().insert(def.name.clone(), def);
    }

    /// Finds a user function through the scope chain.
    pub fn lookup_function(&self, name: &str) -> Option<Rc<FunctionDef>> {
        if let Some(def) = self.functions.borrow().get(name) {
            return Some(def.clone());
        }
        self.parent
            .as_ref()
            .and_then(|parent| parent.lookup_function(name))
    }

    /// Variables bound directly in this scope, sorted by name, with their
    /// constness flag. Used by the session's `:vars` command.
    pub fn variables(&self) -> Vec<(String, Value, bool)> {
        let constants = self.constants.borrow();
        let mut entries: Vec<_> = self
            .values
            .borrow()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone(), constants.contains(name)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Functions defined directly in this scope, sorted by name, with their
    /// parameter lists. Used by the session's `:funcs` command.
    pub fn function_signatures(&self) -> Vec<(String, Vec<String>)> {
        let mut entries: Vec<_> = self
            .functions
            .borrow()
            .values()
            .map(|def| (def.name.clone(), def.params.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_lookup() {
        let env = Environment::new();
        env.define("x", Value::Number(42.0), false).unwrap();
        assert_eq!(env.lookup("x"), Some(Value::Number(42.0)));
        assert_eq!(env.lookup("missing"), None);
    }

    #[test]
    fn test_child_sees_parent_and_shadows() {
        let parent = Environment::new();
        parent.define("x", Value::Number(1.0), false).unwrap();
        parent.define("y", Value::Number(2.0), false).unwrap();

        let child = Environment::with_parent(parent.clone());
        child.define("x", Value::Number(10.0), false).unwrap();

        assert_eq!(child.lookup("x"), Some(Value::Number(10.0)));
        assert_eq!(child.lookup("y"), Some(Value::Number(2.0)));
        assert_eq!(parent.lookup("x"), Some(Value::Number(1.0)));
    }

    #[test]
    fn test_assign_writes_innermost_existing_binding() {
        let parent = Environment::new();
        parent.define("x", Value::Number(1.0), false).unwrap();
        let child = Environment::with_parent(parent.clone());

        child.assign("x", Value::Number(5.0)).unwrap();
        assert_eq!(parent.lookup("x"), Some(Value::Number(5.0)));
    }

    #[test]
    fn test_assign_to_undefined_is_an_error() {
        let env = Environment::new();
        assert_eq!(
            env.assign("ghost", Value::Nil),
            Err(RuntimeError::UndefinedVariable("ghost".into()))
        );
    }

    #[test]
    fn test_constants_cannot_be_reassigned_or_redeclared() {
        let env = Environment::new();
        env.define("PI", Value::Number(3.14), true).unwrap();

        assert_eq!(
            env.assign("PI", Value::Number(3.0)),
            Err(RuntimeError::ConstantReassignment("PI".into()))
        );
        assert_eq!(
            env.define("PI", Value::Number(3.0), true),
            Err(RuntimeError::ConstantReassignment("PI".into()))
        );
        assert_eq!(
            env.define("PI", Value::Number(3.0), false),
            Err(RuntimeError::ConstantReassignment("PI".into()))
        );
    }

    #[test]
    fn test_constant_in_child_scope_does_not_block_parent() {
        let parent = Environment::new();
        parent.define("x", Value::Number(1.0), false).unwrap();
        let child = Environment::with_parent(parent.clone());
        child.define("x", Value::Number(2.0), true).unwrap();

        // The parent binding is still a plain variable.
        parent.assign("x", Value::Number(3.0)).unwrap();
        assert_eq!(child.lookup("x"), Some(Value::Number(2.0)));
    }

    #[test]
    fn test_function_table_is_separate_from_values() {
        let env = Environment::new();
        let def = Rc::new(FunctionDef {
            name: "greet".into(),
            params: vec!["who".into()],
            body: vec![],
            closure: env.clone(),
        });
        env.define_function(def);

        assert!(env.lookup_function("greet").is_some());
        assert_eq!(env.lookup("greet"), None);
    }

    #[test]
    fn test_redefining_function_replaces() {
        let env = Environment::new();
        for params in [vec![], vec!["a".to_string()]] {
            env.define_function(Rc::new(FunctionDef {
                name: "f".into(),
                params,
                body: vec![],
                closure: env.clone(),
            }));
        }
        assert_eq!(env.lookup_function("f").unwrap().params.len(), 1);
    }

    #[test]
    fn test_introspection_is_sorted() {
        let env = Environment::new();
        env.define("zeta", Value::Number(1.0), false).unwrap();
        env.define("alpha", Value::Number(2.0), true).unwrap();

        let vars = env.variables();
        assert_eq!(vars[0].0, "alpha");
        assert!(vars[0].2);
        assert_eq!(vars[1].0, "zeta");
        assert!(!vars[1].2);
    }
}
