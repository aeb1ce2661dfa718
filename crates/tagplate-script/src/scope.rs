//! Lexical scopes.
//!
//! A scope is a shared node in a parent chain. Block scopes hold `let` and
//! `const` bindings; function scopes additionally receive `var`
//! declarations. The root of the chain is the global scope, which also
//! takes assignments to undeclared names.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::value::Value;

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    mutable: bool,
}

struct ScopeInner {
    vars: RefCell<HashMap<String, Binding>>,
    parent: Option<Scope>,
    is_function: bool,
}

#[derive(Clone)]
pub struct Scope(Rc<ScopeInner>);

impl Scope {
    /// A new root scope.
    pub fn global() -> Self {
        Self::with_parent(None, true)
    }

    /// A block scope nested in this one.
    pub fn child(&self) -> Self {
        Self::with_parent(Some(self.clone()), false)
    }

    /// A function scope nested in this one.
    pub fn function_child(&self) -> Self {
        Self::with_parent(Some(self.clone()), true)
    }

    fn with_parent(parent: Option<Scope>, is_function: bool) -> Self {
        Scope(Rc::new(ScopeInner {
            vars: RefCell::new(HashMap::new()),
            parent,
            is_function,
        }))
    }

    /// Declare a `let` (mutable) or `const` binding in this scope.
    pub fn declare(&self, name: &str, value: Value, mutable: bool) -> Result<(), RuntimeError> {
        let mut vars = self.0.vars.borrow_mut();
        if vars.contains_key(name) {
            return Err(RuntimeError::Syntax(format!(
                "Identifier '{name}' has already been declared"
            )));
        }
        vars.insert(name.to_string(), Binding { value, mutable });
        Ok(())
    }

    /// Bind a name unconditionally, replacing any binding in this scope.
    pub fn define(&self, name: &str, value: Value) {
        self.0.vars.borrow_mut().insert(
            name.to_string(),
            Binding {
                value,
                mutable: true,
            },
        );
    }

    /// Declare a `var` in the nearest function scope. A repeated
    /// declaration without an initializer keeps the current value.
    pub fn declare_var(&self, name: &str, value: Option<Value>) {
        let scope = self.function_scope();
        let mut vars = scope.0.vars.borrow_mut();
        match (vars.get_mut(name), value) {
            (Some(binding), Some(value)) => binding.value = value,
            (Some(_), None) => {}
            (None, value) => {
                vars.insert(
                    name.to_string(),
                    Binding {
                        value: value.unwrap_or(Value::Undefined),
                        mutable: true,
                    },
                );
            }
        }
    }

    /// Look a name up through the parent chain.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut scope = self;
        loop {
            if let Some(binding) = scope.0.vars.borrow().get(name) {
                return Some(binding.value.clone());
            }
            scope = scope.0.parent.as_ref()?;
        }
    }

    /// Read a name, failing with a `ReferenceError` when it is not bound.
    pub fn get(&self, name: &str) -> Result<Value, RuntimeError> {
        self.lookup(name)
            .ok_or_else(|| RuntimeError::reference(format!("{name} is not defined")))
    }

    /// Assign to an existing binding, or create a global one.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        let mut scope = self;
        loop {
            if let Some(binding) = scope.0.vars.borrow_mut().get_mut(name) {
                if !binding.mutable {
                    return Err(RuntimeError::type_error("Assignment to constant variable."));
                }
                binding.value = value;
                return Ok(());
            }
            match scope.0.parent.as_ref() {
                Some(parent) => scope = parent,
                None => break,
            }
        }
        scope.define(name, value);
        Ok(())
    }

    fn function_scope(&self) -> &Scope {
        let mut scope = self;
        while !scope.0.is_function {
            match scope.0.parent.as_ref() {
                Some(parent) => scope = parent,
                None => break,
            }
        }
        scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_through_parents() {
        let global = Scope::global();
        global.define("tp", Value::from("x"));
        let inner = global.function_child().child();
        assert_eq!(inner.get("tp").unwrap(), Value::from("x"));
    }

    #[test]
    fn test_undefined_name() {
        let err = Scope::global().get("lol").unwrap_err();
        assert_eq!(err.to_string(), "ReferenceError: lol is not defined");
    }

    #[test]
    fn test_shadowing() {
        let global = Scope::global();
        global.declare("a", Value::from(1.0), true).unwrap();
        let block = global.child();
        block.declare("a", Value::from(2.0), true).unwrap();
        assert_eq!(block.get("a").unwrap(), Value::from(2.0));
        assert_eq!(global.get("a").unwrap(), Value::from(1.0));
    }

    #[test]
    fn test_redeclaration_fails() {
        let scope = Scope::global();
        scope.declare("a", Value::Undefined, true).unwrap();
        assert!(scope.declare("a", Value::Undefined, true).is_err());
    }

    #[test]
    fn test_const_assignment_fails() {
        let scope = Scope::global();
        scope.declare("a", Value::from(1.0), false).unwrap();
        let err = scope.assign("a", Value::from(2.0)).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: Assignment to constant variable.");
    }

    #[test]
    fn test_undeclared_assignment_creates_global() {
        let global = Scope::global();
        let inner = global.function_child().child();
        inner.assign("fresh", Value::from(true)).unwrap();
        assert_eq!(global.get("fresh").unwrap(), Value::from(true));
    }

    #[test]
    fn test_var_hoists_to_function_scope() {
        let function = Scope::global().function_child();
        let block = function.child().child();
        block.declare_var("v", Some(Value::from(3.0)));
        assert_eq!(function.get("v").unwrap(), Value::from(3.0));
        block.declare_var("v", None);
        assert_eq!(function.get("v").unwrap(), Value::from(3.0));
    }
}
