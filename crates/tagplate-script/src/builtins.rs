//! Global objects and the methods of primitive values.
//!
//! Methods that take a callback (`map`, `filter`, a function passed to
//! `replaceAll`, ...) need the evaluator and live in `interpreter.rs`;
//! everything here is synchronous.

use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::rc::Rc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use futures_util::future::try_join_all;
use indexmap::IndexMap;

use crate::error::RuntimeError;
use crate::scope::Scope;
use crate::value::{format_number, Array, EvalResult, Function, Value};

/// Longest array a script may create, as in JavaScript.
pub const MAX_ARRAY_LENGTH: usize = u32::MAX as usize;

/// Longest string, in characters, that `repeat`, `padStart` and `padEnd`
/// may build.
pub const MAX_STRING_LENGTH: usize = (1 << 29) - 24;

pub const STRING_METHODS: &[&str] = &[
    "toUpperCase",
    "toLowerCase",
    "trim",
    "trimStart",
    "trimEnd",
    "includes",
    "startsWith",
    "endsWith",
    "indexOf",
    "slice",
    "substring",
    "split",
    "replace",
    "replaceAll",
    "repeat",
    "padStart",
    "padEnd",
    "charAt",
    "toString",
];

pub const ARRAY_METHODS: &[&str] = &[
    "push", "pop", "shift", "unshift", "join", "includes", "indexOf", "slice", "concat",
    "reverse", "map", "filter", "forEach", "find", "some", "every", "toString",
];

/// Array methods that call back into the script.
pub const ARRAY_CALLBACK_METHODS: &[&str] = &["map", "filter", "forEach", "find", "some", "every"];

pub const NUMBER_METHODS: &[&str] = &["toFixed", "toString"];

/// Bind every global into `scope`.
pub fn install(scope: &Scope) {
    for (name, value) in globals() {
        scope.define(&name, value);
    }
}

fn globals() -> IndexMap<String, Value> {
    let mut globals = IndexMap::new();

    globals.insert(
        "Promise".into(),
        object([
            ("all", Value::native_async(promise_all)),
            (
                "resolve",
                Value::native(|args| {
                    Ok(match arg(&args, 0) {
                        promise @ Value::Promise(_) => promise,
                        value => Value::promise(async move { Ok(value) }),
                    })
                }),
            ),
        ]),
    );
    globals.insert("atob".into(), Value::native(atob));
    globals.insert("btoa".into(), Value::native(btoa));
    globals.insert(
        "String".into(),
        Value::native(|args| {
            Ok(Value::String(
                args.first().map(Value::to_string).unwrap_or_default(),
            ))
        }),
    );
    globals.insert(
        "Number".into(),
        Value::native(|args| Ok(Value::Number(args.first().map_or(0.0, Value::to_number)))),
    );
    globals.insert(
        "Boolean".into(),
        Value::native(|args| Ok(Value::Bool(arg(&args, 0).is_truthy()))),
    );
    globals.insert("parseInt".into(), Value::native(parse_int));
    globals.insert(
        "parseFloat".into(),
        Value::native(|args| Ok(Value::Number(parse_float(&arg(&args, 0).to_string())))),
    );
    globals.insert(
        "isNaN".into(),
        Value::native(|args| Ok(Value::Bool(arg(&args, 0).to_number().is_nan()))),
    );
    globals.insert(
        "Error".into(),
        Value::native(|args| {
            let message = match arg(&args, 0) {
                Value::Undefined => String::new(),
                value => value.to_string(),
            };
            Ok(Value::Error(Rc::new(RuntimeError::Error(message))))
        }),
    );
    globals.insert(
        "JSON".into(),
        object([
            ("stringify", Value::native(json_stringify)),
            ("parse", Value::native(json_parse)),
        ]),
    );
    globals.insert("Math".into(), math());
    globals.insert(
        "Object".into(),
        object([
            (
                "keys",
                Value::native(|args| Ok(Value::array(keys(&arg(&args, 0))))),
            ),
            (
                "values",
                Value::native(|args| {
                    let target = arg(&args, 0);
                    let values = keys(&target)
                        .iter()
                        .map(|key| get_property(&target, &key.to_string()))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Value::array(values))
                }),
            ),
            (
                "entries",
                Value::native(|args| {
                    let target = arg(&args, 0);
                    let entries = keys(&target)
                        .into_iter()
                        .map(|key| {
                            let value = get_property(&target, &key.to_string())?;
                            Ok(Value::array(vec![key, value]))
                        })
                        .collect::<Result<Vec<_>, RuntimeError>>()?;
                    Ok(Value::array(entries))
                }),
            ),
        ]),
    );
    globals.insert(
        "Array".into(),
        object([(
            "isArray",
            Value::native(|args| Ok(Value::Bool(matches!(arg(&args, 0), Value::Array(_))))),
        )]),
    );
    globals.insert(
        "console".into(),
        object([
            (
                "log",
                Value::native(|args| {
                    log::info!("{}", join_args(&args));
                    Ok(Value::Undefined)
                }),
            ),
            (
                "warn",
                Value::native(|args| {
                    log::warn!("{}", join_args(&args));
                    Ok(Value::Undefined)
                }),
            ),
            (
                "error",
                Value::native(|args| {
                    log::error!("{}", join_args(&args));
                    Ok(Value::Undefined)
                }),
            ),
        ]),
    );

    globals
}

fn math() -> Value {
    fn unary(f: fn(f64) -> f64) -> Value {
        Value::native(move |args| Ok(Value::Number(f(arg(&args, 0).to_number()))))
    }

    object([
        ("floor", unary(f64::floor)),
        ("ceil", unary(f64::ceil)),
        ("round", unary(|n| (n + 0.5).floor())),
        ("abs", unary(f64::abs)),
        (
            "min",
            Value::native(|args| {
                Ok(Value::Number(args.iter().map(Value::to_number).fold(
                    f64::INFINITY,
                    |acc, n| if n.is_nan() || acc.is_nan() { f64::NAN } else { acc.min(n) },
                )))
            }),
        ),
        (
            "max",
            Value::native(|args| {
                Ok(Value::Number(args.iter().map(Value::to_number).fold(
                    f64::NEG_INFINITY,
                    |acc, n| if n.is_nan() || acc.is_nan() { f64::NAN } else { acc.max(n) },
                )))
            }),
        ),
        (
            "random",
            Value::native(|_| {
                let bits = RandomState::new().hash_one(0u8) >> 11;
                Ok(Value::Number(bits as f64 / (1u64 << 53) as f64))
            }),
        ),
        ("PI", Value::Number(std::f64::consts::PI)),
    ])
}

// =============================================================================
// Promises
// =============================================================================

/// Await a value if it is a promise.
pub async fn resolve(value: Value) -> EvalResult {
    match value {
        Value::Promise(promise) => promise.await,
        other => Ok(other),
    }
}

async fn promise_all(args: Vec<Value>) -> EvalResult {
    let items = match arg(&args, 0) {
        Value::Array(items) => items.borrow().clone(),
        other => {
            return Err(RuntimeError::type_error(format!(
                "{} is not iterable",
                other.type_of()
            )))
        }
    };
    log::trace!("awaiting {} values", items.len());
    let results = try_join_all(items.into_iter().map(resolve)).await?;
    Ok(Value::array(results))
}

// =============================================================================
// Encoding
// =============================================================================

fn atob(args: Vec<Value>) -> EvalResult {
    let encoded = arg(&args, 0).to_string();
    let bytes = STANDARD.decode(encoded.as_bytes()).map_err(|_| {
        RuntimeError::Error("The string to be decoded is not correctly encoded.".into())
    })?;
    Ok(Value::String(String::from_utf8_lossy(&bytes).into_owned()))
}

fn btoa(args: Vec<Value>) -> EvalResult {
    Ok(Value::String(STANDARD.encode(arg(&args, 0).to_string())))
}

fn json_stringify(args: Vec<Value>) -> EvalResult {
    let value = arg(&args, 0);
    if matches!(value, Value::Undefined | Value::Function(_)) {
        return Ok(Value::Undefined);
    }
    let json = value.to_json();
    let pretty = arg(&args, 2).to_number() > 0.0;
    let text = if pretty {
        serde_json::to_string_pretty(&json)
    } else {
        serde_json::to_string(&json)
    }
    .map_err(|e| RuntimeError::type_error(e.to_string()))?;
    Ok(Value::String(text))
}

fn json_parse(args: Vec<Value>) -> EvalResult {
    let text = arg(&args, 0).to_string();
    let json: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| RuntimeError::Syntax(format!("JSON.parse: {e}")))?;
    Ok(Value::from(json))
}

// =============================================================================
// Numbers
// =============================================================================

fn parse_int(args: Vec<Value>) -> EvalResult {
    let text = arg(&args, 0).to_string();
    let mut text = text.trim();
    let negative = text.starts_with('-');
    if negative || text.starts_with('+') {
        text = &text[1..];
    }

    let mut radix = match arg(&args, 1) {
        Value::Undefined => 10,
        value => value.to_number() as u32,
    };
    if (radix == 16 || radix == 0) && (text.starts_with("0x") || text.starts_with("0X")) {
        text = &text[2..];
        radix = 16;
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return Ok(Value::Number(f64::NAN));
    }

    let digits: String = text.chars().take_while(|c| c.is_digit(radix)).collect();
    if digits.is_empty() {
        return Ok(Value::Number(f64::NAN));
    }
    let value = digits
        .chars()
        .filter_map(|c| c.to_digit(radix))
        .fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d));
    Ok(Value::Number(if negative { -value } else { value }))
}

/// Longest numeric prefix, as `parseFloat` reads it.
fn parse_float(text: &str) -> f64 {
    let text = text.trim_start();
    if let Some(rest) = text.strip_prefix('-') {
        return -parse_float_unsigned(rest.strip_prefix('+').unwrap_or(rest));
    }
    parse_float_unsigned(text.strip_prefix('+').unwrap_or(text))
}

fn parse_float_unsigned(text: &str) -> f64 {
    if text.starts_with("Infinity") {
        return f64::INFINITY;
    }
    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_exp = false;
    let bytes = text.as_bytes();
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => {}
            b'.' if !seen_dot && !seen_exp => seen_dot = true,
            b'e' | b'E' if !seen_exp && end > 0 => {
                let sign = matches!(bytes.get(end + 1), Some(b'+' | b'-'));
                let digit_at = if sign { end + 2 } else { end + 1 };
                if !bytes.get(digit_at).is_some_and(u8::is_ascii_digit) {
                    break;
                }
                seen_exp = true;
                end = digit_at;
            }
            _ => break,
        }
        end += 1;
    }
    text[..end].parse().unwrap_or(f64::NAN)
}

pub fn number_method(n: f64, name: &str, args: &[Value]) -> EvalResult {
    match name {
        "toFixed" => {
            let digits = arg(args, 0).to_number();
            let digits = if digits.is_nan() { 0.0 } else { digits.trunc() };
            if !(0.0..=100.0).contains(&digits) {
                return Err(RuntimeError::range(
                    "toFixed() digits argument must be between 0 and 100",
                ));
            }
            let digits = digits as usize;
            Ok(Value::String(format!("{n:.digits$}")))
        }
        "toString" => Ok(Value::String(format_number(n))),
        _ => Err(not_a_function("number", name)),
    }
}

// =============================================================================
// Strings
// =============================================================================

pub fn string_method(s: &str, name: &str, args: &[Value]) -> EvalResult {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();
    let text_arg = |i: usize| arg(args, i).to_string();

    let value = match name {
        "toUpperCase" => Value::String(s.to_uppercase()),
        "toLowerCase" => Value::String(s.to_lowercase()),
        "trim" => Value::String(s.trim_matches(is_trimmable).to_string()),
        "trimStart" => Value::String(s.trim_start_matches(is_trimmable).to_string()),
        "trimEnd" => Value::String(s.trim_end_matches(is_trimmable).to_string()),
        "toString" => Value::String(s.to_string()),
        "includes" => {
            let start = relative_index(arg(args, 1), len, 0);
            Value::Bool(chars[start..].iter().collect::<String>().contains(&text_arg(0)))
        }
        "startsWith" => {
            let start = relative_index(arg(args, 1), len, 0);
            Value::Bool(chars[start..].iter().collect::<String>().starts_with(&text_arg(0)))
        }
        "endsWith" => Value::Bool(s.ends_with(&text_arg(0))),
        "indexOf" => Value::Number(
            s.find(&text_arg(0))
                .map_or(-1.0, |byte| s[..byte].chars().count() as f64),
        ),
        "slice" => {
            let start = relative_index(arg(args, 0), len, 0);
            let end = relative_index(arg(args, 1), len, len);
            Value::String(chars[start..end.max(start)].iter().collect())
        }
        "substring" => {
            let clamp = |v: Value, default: usize| match v {
                Value::Undefined => default,
                v => {
                    let n = v.to_number();
                    if n.is_nan() || n < 0.0 {
                        0
                    } else {
                        (n as usize).min(len)
                    }
                }
            };
            let a = clamp(arg(args, 0), 0);
            let b = clamp(arg(args, 1), len);
            Value::String(chars[a.min(b)..a.max(b)].iter().collect())
        }
        "split" => {
            let parts: Vec<Value> = match arg(args, 0) {
                Value::Undefined => vec![Value::from(s)],
                separator => {
                    let separator = separator.to_string();
                    if separator.is_empty() {
                        chars.iter().map(|c| Value::String(c.to_string())).collect()
                    } else {
                        s.split(separator.as_str()).map(Value::from).collect()
                    }
                }
            };
            let parts = match arg(args, 1) {
                Value::Undefined => parts,
                limit => parts.into_iter().take(limit.to_number() as usize).collect(),
            };
            Value::array(parts)
        }
        "replace" => Value::String(s.replacen(&text_arg(0), &text_arg(1), 1)),
        "replaceAll" => {
            let pattern = text_arg(0);
            if pattern.is_empty() {
                let replacement = text_arg(1);
                let mut out = replacement.clone();
                for c in &chars {
                    out.push(*c);
                    out.push_str(&replacement);
                }
                Value::String(out)
            } else {
                Value::String(s.replace(&pattern, &text_arg(1)))
            }
        }
        "repeat" => {
            let count = arg(args, 0).to_number();
            if count < 0.0 || count.is_infinite() {
                return Err(RuntimeError::range(format!(
                    "Invalid count value: {}",
                    format_number(count)
                )));
            }
            let count = if count.is_nan() { 0 } else { count as usize };
            if len.saturating_mul(count) > MAX_STRING_LENGTH {
                return Err(invalid_string_length());
            }
            Value::String(s.repeat(count))
        }
        "padStart" | "padEnd" => {
            let target = arg(args, 0).to_number();
            if target > MAX_STRING_LENGTH as f64 {
                return Err(invalid_string_length());
            }
            let target = if target.is_nan() { 0 } else { target as usize };
            let filler = match arg(args, 1) {
                Value::Undefined => " ".to_string(),
                v => v.to_string(),
            };
            if target <= len || filler.is_empty() {
                Value::String(s.to_string())
            } else {
                let pad: String = filler.chars().cycle().take(target - len).collect();
                Value::String(if name == "padStart" {
                    format!("{pad}{s}")
                } else {
                    format!("{s}{pad}")
                })
            }
        }
        "charAt" => {
            let index = arg(args, 0).to_number();
            let index = if index.is_nan() { 0.0 } else { index };
            Value::String(
                (index >= 0.0)
                    .then(|| chars.get(index as usize))
                    .flatten()
                    .map(|c| c.to_string())
                    .unwrap_or_default(),
            )
        }
        _ => return Err(not_a_function("string", name)),
    };
    Ok(value)
}

// =============================================================================
// Arrays
// =============================================================================

pub fn array_method(items: &Array, name: &str, args: &[Value]) -> EvalResult {
    let value = match name {
        "push" => {
            let mut items = items.borrow_mut();
            items.extend(args.iter().cloned());
            Value::Number(items.len() as f64)
        }
        "pop" => items.borrow_mut().pop().unwrap_or(Value::Undefined),
        "shift" => {
            let mut items = items.borrow_mut();
            if items.is_empty() {
                Value::Undefined
            } else {
                items.remove(0)
            }
        }
        "unshift" => {
            let mut items = items.borrow_mut();
            for (i, value) in args.iter().enumerate() {
                items.insert(i, value.clone());
            }
            Value::Number(items.len() as f64)
        }
        "join" | "toString" => {
            let separator = match arg(args, 0) {
                Value::Undefined => ",".to_string(),
                _ if name == "toString" => ",".to_string(),
                v => v.to_string(),
            };
            let joined = items
                .borrow()
                .iter()
                .map(|v| if v.is_nullish() { String::new() } else { v.to_string() })
                .collect::<Vec<_>>()
                .join(&separator);
            Value::String(joined)
        }
        "includes" => {
            let needle = arg(args, 0);
            Value::Bool(items.borrow().iter().any(|v| {
                v.strict_equals(&needle)
                    || matches!((v, &needle), (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan())
            }))
        }
        "indexOf" => {
            let needle = arg(args, 0);
            Value::Number(
                items
                    .borrow()
                    .iter()
                    .position(|v| v.strict_equals(&needle))
                    .map_or(-1.0, |i| i as f64),
            )
        }
        "slice" => {
            let items = items.borrow();
            let len = items.len();
            let start = relative_index(arg(args, 0), len, 0);
            let end = relative_index(arg(args, 1), len, len);
            Value::array(items[start..end.max(start)].to_vec())
        }
        "concat" => {
            let mut out = items.borrow().clone();
            for value in args {
                match value {
                    Value::Array(other) => out.extend(other.borrow().iter().cloned()),
                    other => out.push(other.clone()),
                }
            }
            Value::array(out)
        }
        "reverse" => {
            items.borrow_mut().reverse();
            Value::Array(items.clone())
        }
        _ => return Err(not_a_function("array", name)),
    };
    Ok(value)
}

// =============================================================================
// Properties
// =============================================================================

/// Read `target[key]`.
pub fn get_property(target: &Value, key: &str) -> EvalResult {
    let value = match target {
        Value::Undefined | Value::Null => {
            return Err(RuntimeError::type_error(format!(
                "Cannot read properties of {target} (reading '{key}')"
            )))
        }
        Value::String(s) => match key {
            "length" => Value::Number(s.chars().count() as f64),
            _ if STRING_METHODS.contains(&key) => method(target, key),
            _ => key
                .parse::<usize>()
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map_or(Value::Undefined, |c| Value::String(c.to_string())),
        },
        Value::Array(items) => match key {
            "length" => Value::Number(items.borrow().len() as f64),
            _ if ARRAY_METHODS.contains(&key) => method(target, key),
            _ => key
                .parse::<usize>()
                .ok()
                .and_then(|i| items.borrow().get(i).cloned())
                .unwrap_or(Value::Undefined),
        },
        Value::Object(entries) => entries.borrow().get(key).cloned().unwrap_or(Value::Undefined),
        Value::Number(_) if NUMBER_METHODS.contains(&key) => method(target, key),
        Value::Error(err) => match key {
            "message" => Value::String(err.message()),
            "name" => Value::String(err.name().to_string()),
            "code" => match err.as_ref() {
                RuntimeError::Status(status) => Value::String(status.code.to_string()),
                _ => Value::Undefined,
            },
            _ => Value::Undefined,
        },
        _ => Value::Undefined,
    };
    Ok(value)
}

/// Write `target[key] = value`.
pub fn set_property(target: &Value, key: &str, value: Value) -> Result<(), RuntimeError> {
    match target {
        Value::Undefined | Value::Null => Err(RuntimeError::type_error(format!(
            "Cannot set properties of {target} (setting '{key}')"
        ))),
        Value::Object(entries) => {
            entries.borrow_mut().insert(key.to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            let mut items = items.borrow_mut();
            if key == "length" {
                let len = value.to_number();
                if !(0.0..=MAX_ARRAY_LENGTH as f64).contains(&len) || len.fract() != 0.0 {
                    return Err(invalid_array_length());
                }
                resize_array(&mut items, len as usize)?;
            } else if let Ok(index) = key.parse::<usize>() {
                if index >= items.len() {
                    resize_array(&mut items, index.saturating_add(1))?;
                }
                items[index] = value;
            }
            Ok(())
        }
        // Primitives silently drop property writes.
        _ => Ok(()),
    }
}

/// Own enumerable keys, as `Object.keys` and `for ... in` see them.
pub fn keys(target: &Value) -> Vec<Value> {
    match target {
        Value::Object(entries) => entries.borrow().keys().map(|k| Value::from(k.as_str())).collect(),
        Value::Array(items) => (0..items.borrow().len())
            .map(|i| Value::String(i.to_string()))
            .collect(),
        Value::String(s) => (0..s.chars().count())
            .map(|i| Value::String(i.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

// --- Helpers ---

/// Whitespace as `trim` sees it: Unicode whitespace and the byte order mark.
fn is_trimmable(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

/// Grow or shrink an array, failing instead of aborting when the new
/// length is out of range or cannot be allocated.
fn resize_array(items: &mut Vec<Value>, len: usize) -> Result<(), RuntimeError> {
    if len > MAX_ARRAY_LENGTH {
        return Err(invalid_array_length());
    }
    if len > items.len() {
        items
            .try_reserve_exact(len - items.len())
            .map_err(|_| invalid_array_length())?;
    }
    items.resize(len, Value::Undefined);
    Ok(())
}

fn invalid_array_length() -> RuntimeError {
    RuntimeError::range("Invalid array length")
}

fn invalid_string_length() -> RuntimeError {
    RuntimeError::range("Invalid string length")
}

fn method(receiver: &Value, name: &str) -> Value {
    Value::Function(Rc::new(Function::Method {
        receiver: receiver.clone(),
        name: name.to_string(),
    }))
}

fn object<const N: usize>(entries: [(&str, Value); N]) -> Value {
    Value::object(
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    )
}

/// Argument `i`, or `undefined` when missing.
pub fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Undefined)
}

/// Resolve a possibly negative index against `len`.
fn relative_index(value: Value, len: usize, default: usize) -> usize {
    match value {
        Value::Undefined => default,
        value => {
            let n = value.to_number();
            if n.is_nan() {
                0
            } else if n < 0.0 {
                len.saturating_sub((-n) as usize)
            } else {
                (n as usize).min(len)
            }
        }
    }
}

fn join_args(args: &[Value]) -> String {
    args.iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn not_a_function(kind: &str, name: &str) -> RuntimeError {
    RuntimeError::type_error(format!("{kind}.{name} is not a function"))
}
