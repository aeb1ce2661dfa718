//! Runtime values.
//!
//! Arrays and objects are shared and mutable: cloning a `Value` clones the
//! handle, not the contents, so a context object mutated by a script is
//! visible to the host afterwards.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures_util::future::{LocalBoxFuture, Shared};
use futures_util::FutureExt;
use indexmap::IndexMap;

use crate::ast::ArrowBody;
use crate::error::RuntimeError;
use crate::scope::Scope;
use crate::tasks;

pub type Array = Rc<RefCell<Vec<Value>>>;
pub type Object = Rc<RefCell<IndexMap<String, Value>>>;

/// Result of evaluating anything.
pub type EvalResult = Result<Value, RuntimeError>;

/// A started future that can be awaited any number of times.
pub type Promise = Shared<LocalBoxFuture<'static, EvalResult>>;

pub type NativeFn = Rc<dyn Fn(Vec<Value>) -> EvalResult>;
pub type AsyncNativeFn = Rc<dyn Fn(Vec<Value>) -> LocalBoxFuture<'static, EvalResult>>;

/// A callable value.
pub enum Function {
    /// Host function returning immediately.
    Native(NativeFn),
    /// Host function returning a future; calling it yields a promise.
    Async(AsyncNativeFn),
    /// Arrow function or function declaration.
    Closure(Closure),
    /// A builtin method read off a string, number or array, e.g. `s.trim`.
    Method { receiver: Value, name: String },
}

pub struct Closure {
    pub params: Vec<String>,
    pub body: Rc<ArrowBody>,
    pub scope: Scope,
    pub is_async: bool,
}

#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Array),
    Object(Object),
    Function(Rc<Function>),
    Promise(Promise),
    /// A caught runtime error.
    Error(Rc<RuntimeError>),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(entries: IndexMap<String, Value>) -> Value {
        Value::Object(Rc::new(RefCell::new(entries)))
    }

    /// Wrap a synchronous host function.
    pub fn native<F>(f: F) -> Value
    where
        F: Fn(Vec<Value>) -> EvalResult + 'static,
    {
        Value::Function(Rc::new(Function::Native(Rc::new(f))))
    }

    /// Wrap an asynchronous host function.
    pub fn native_async<F, Fut>(f: F) -> Value
    where
        F: Fn(Vec<Value>) -> Fut + 'static,
        Fut: Future<Output = EvalResult> + 'static,
    {
        Value::Function(Rc::new(Function::Async(Rc::new(move |args| {
            f(args).boxed_local()
        }))))
    }

    /// Wrap a future as a promise and start it. The future runs up to its
    /// first suspension before this returns.
    pub fn promise<Fut>(future: Fut) -> Value
    where
        Fut: Future<Output = EvalResult> + 'static,
    {
        let promise = future.boxed_local().shared();
        tasks::start(&promise);
        Value::Promise(promise)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// JavaScript truthiness.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Result of the `typeof` operator.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            Value::Null
            | Value::Array(_)
            | Value::Object(_)
            | Value::Promise(_)
            | Value::Error(_) => "object",
        }
    }

    /// JavaScript `Number(value)`.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => parse_number(s),
            Value::Array(_) => parse_number(&self.to_string()),
            _ => f64::NAN,
        }
    }

    /// `===`
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Promise(a), Value::Promise(b)) => a.ptr_eq(b),
            (Value::Error(a), Value::Error(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `==`
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Number(_), Value::String(_))
            | (Value::String(_), Value::Number(_))
            | (Value::Bool(_), _)
            | (_, Value::Bool(_)) => self.to_number() == other.to_number(),
            (Value::Array(_) | Value::Object(_), Value::String(_) | Value::Number(_))
            | (Value::String(_) | Value::Number(_), Value::Array(_) | Value::Object(_)) => {
                Value::String(self.to_string()).loose_equals(&Value::String(other.to_string()))
            }
            _ => self.strict_equals(other),
        }
    }

    /// Convert to JSON; functions and `undefined` become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.borrow().iter().map(Value::to_json).collect())
            }
            Value::Object(entries) => serde_json::Value::Object(
                entries
                    .borrow()
                    .iter()
                    .filter(|(_, v)| !matches!(v, Value::Undefined | Value::Function(_)))
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Error(err) => serde_json::Value::String(err.to_string()),
            _ => serde_json::Value::Null,
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
    }
}

/// Parse a string the way `Number(string)` does.
pub fn parse_number(text: &str) -> f64 {
    let text = text.trim();
    match text {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if text
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')) =>
        {
            text.parse().unwrap_or(f64::NAN)
        }
        _ => f64::NAN,
    }
}

/// Format a number the way `String(number)` does.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".into()
    } else if n.is_infinite() {
        (if n > 0.0 { "Infinity" } else { "-Infinity" }).into()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i128)
    } else {
        format!("{n}")
    }
}

/// `String(value)`
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                let items = items.borrow();
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    if !item.is_nullish() {
                        write!(f, "{item}")?;
                    }
                }
                Ok(())
            }
            Value::Object(_) => f.write_str("[object Object]"),
            Value::Function(_) => f.write_str("function () { [native code] }"),
            Value::Promise(_) => f.write_str("[object Promise]"),
            Value::Error(err) => write!(f, "{err}"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("Undefined"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Array(items) => f.debug_list().entries(items.borrow().iter()).finish(),
            Value::Object(entries) => f.debug_map().entries(entries.borrow().iter()).finish(),
            Value::Function(_) => f.write_str("Function"),
            Value::Promise(_) => f.write_str("Promise"),
            Value::Error(err) => write!(f, "Error({err})"),
        }
    }
}

/// Structural equality, used by tests and host code; scripts use
/// [`Value::strict_equals`].
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => *a.borrow() == *b.borrow(),
            (Value::Object(a), Value::Object(b)) => *a.borrow() == *b.borrow(),
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => self.strict_equals(other),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Value::object(entries)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}
