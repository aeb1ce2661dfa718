//! Async tree-walking interpreter.
//!
//! Every evaluation step returns a future so that `await` can suspend a
//! script anywhere inside an expression. Recursive steps (`eval`, `exec`,
//! `call_function`) are boxed; the rest are plain `async fn`s.

use std::rc::Rc;

use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;
use indexmap::IndexMap;

use crate::ast::{
    ArrowBody, BinaryOp, DeclKind, ExprKind, Expression, Iteration, LogicalOp, Program, Stmt,
    StmtKind, UnaryOp, UpdateOp,
};
use crate::builtins::{self, arg};
use crate::error::RuntimeError;
use crate::scope::Scope;
use crate::tasks;
use crate::value::{Array, Closure, EvalResult, Function, Value};

/// How a statement finished.
#[derive(Debug)]
pub enum Completion {
    Normal,
    Return(Value),
    Break,
    Continue,
}

type ExecResult = Result<Completion, RuntimeError>;

/// A new root scope holding every builtin global.
pub fn global_scope() -> Scope {
    let scope = Scope::global();
    builtins::install(&scope);
    scope
}

/// Run `program` as the body of an async function executing in `scope`,
/// returning the value of its `return` statement. Promises the program
/// starts have all settled by the time this resolves.
pub async fn run(program: &Program, scope: &Scope) -> EvalResult {
    let completion = tasks::drive(exec_block(&program.body, scope)).await?;
    match completion {
        Completion::Return(value) => Ok(value),
        _ => Ok(Value::Undefined),
    }
}

// =============================================================================
// Statements
// =============================================================================

fn exec<'a>(stmt: &'a Stmt, scope: &'a Scope) -> LocalBoxFuture<'a, ExecResult> {
    async move {
        match &stmt.kind {
            // Function declarations are bound when their block starts.
            StmtKind::Empty | StmtKind::Function { .. } => Ok(Completion::Normal),

            StmtKind::Expression(expr) => {
                eval(expr, scope).await?;
                Ok(Completion::Normal)
            }

            StmtKind::Declaration { kind, declarators } => {
                for (name, init) in declarators {
                    let value = match init {
                        Some(init) => Some(eval(init, scope).await?),
                        None => None,
                    };
                    match kind {
                        DeclKind::Var => scope.declare_var(name, value),
                        DeclKind::Let => {
                            scope.declare(name, value.unwrap_or(Value::Undefined), true)?
                        }
                        DeclKind::Const => {
                            scope.declare(name, value.unwrap_or(Value::Undefined), false)?
                        }
                    }
                }
                Ok(Completion::Normal)
            }

            StmtKind::Block(body) => exec_block(body, &scope.child()).await,

            StmtKind::If {
                condition,
                consequent,
                alternate,
            } => {
                if eval(condition, scope).await?.is_truthy() {
                    exec(consequent, scope).await
                } else if let Some(alternate) = alternate {
                    exec(alternate, scope).await
                } else {
                    Ok(Completion::Normal)
                }
            }

            StmtKind::While { condition, body } => {
                while eval(condition, scope).await?.is_truthy() {
                    match exec(body, scope).await? {
                        Completion::Break => break,
                        Completion::Return(value) => return Ok(Completion::Return(value)),
                        Completion::Normal | Completion::Continue => {}
                    }
                }
                Ok(Completion::Normal)
            }

            StmtKind::For {
                init,
                condition,
                update,
                body,
            } => {
                let loop_scope = scope.child();
                if let Some(init) = init {
                    exec(init, &loop_scope).await?;
                }
                loop {
                    if let Some(condition) = condition {
                        if !eval(condition, &loop_scope).await?.is_truthy() {
                            break;
                        }
                    }
                    match exec(body, &loop_scope).await? {
                        Completion::Break => break,
                        Completion::Return(value) => return Ok(Completion::Return(value)),
                        Completion::Normal | Completion::Continue => {}
                    }
                    if let Some(update) = update {
                        eval(update, &loop_scope).await?;
                    }
                }
                Ok(Completion::Normal)
            }

            StmtKind::ForEach {
                kind,
                name,
                iteration,
                iterable,
                body,
            } => {
                let iterable = eval(iterable, scope).await?;
                let items = match iteration {
                    Iteration::Of => iterate_values(&iterable)?,
                    Iteration::In => builtins::keys(&iterable),
                };
                for item in items {
                    let iteration_scope = scope.child();
                    match kind {
                        DeclKind::Var => iteration_scope.declare_var(name, Some(item)),
                        DeclKind::Let => iteration_scope.declare(name, item, true)?,
                        DeclKind::Const => iteration_scope.declare(name, item, false)?,
                    }
                    match exec(body, &iteration_scope).await? {
                        Completion::Break => break,
                        Completion::Return(value) => return Ok(Completion::Return(value)),
                        Completion::Normal | Completion::Continue => {}
                    }
                }
                Ok(Completion::Normal)
            }

            StmtKind::Return(value) => {
                let value = match value {
                    Some(value) => eval(value, scope).await?,
                    None => Value::Undefined,
                };
                Ok(Completion::Return(value))
            }

            StmtKind::Throw(value) => {
                let value = eval(value, scope).await?;
                Err(match value {
                    // Re-throwing a caught error keeps its original kind.
                    Value::Error(err) => err.as_ref().clone(),
                    value => RuntimeError::Thrown(value),
                })
            }

            StmtKind::Break => Ok(Completion::Break),
            StmtKind::Continue => Ok(Completion::Continue),

            StmtKind::Try {
                block,
                param,
                handler,
                finalizer,
            } => {
                let outcome = match (exec_block(block, &scope.child()).await, handler) {
                    (Err(err), Some(handler)) => {
                        log::debug!("caught {err}");
                        let catch_scope = scope.child();
                        if let Some(param) = param {
                            catch_scope.define(param, caught_value(err));
                        }
                        exec_block(handler, &catch_scope).await
                    }
                    (outcome, _) => outcome,
                };
                if let Some(finalizer) = finalizer {
                    match exec_block(finalizer, &scope.child()).await? {
                        Completion::Normal => {}
                        abrupt => return Ok(abrupt),
                    }
                }
                outcome
            }
        }
    }
    .boxed_local()
}

async fn exec_block(body: &[Stmt], scope: &Scope) -> ExecResult {
    for stmt in body {
        if let StmtKind::Function { name, params, body } = &stmt.kind {
            scope.define(name, closure(params, body, scope, false));
        }
    }

    for stmt in body {
        match exec(stmt, scope).await? {
            Completion::Normal => {}
            abrupt => return Ok(abrupt),
        }
    }
    Ok(Completion::Normal)
}

fn iterate_values(value: &Value) -> Result<Vec<Value>, RuntimeError> {
    match value {
        Value::Array(items) => Ok(items.borrow().clone()),
        Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
        other => Err(RuntimeError::type_error(format!(
            "{} is not iterable",
            other.type_of()
        ))),
    }
}

/// The value a `catch (e)` clause binds.
fn caught_value(err: RuntimeError) -> Value {
    match err {
        RuntimeError::Thrown(value) => value,
        other => Value::Error(Rc::new(other)),
    }
}

// =============================================================================
// Expressions
// =============================================================================

/// Evaluate an expression.
pub fn eval<'a>(expr: &'a Expression, scope: &'a Scope) -> LocalBoxFuture<'a, EvalResult> {
    async move {
        match &expr.kind {
            ExprKind::Number(n) => Ok(Value::Number(*n)),
            ExprKind::String(s) => Ok(Value::String(s.clone())),
            ExprKind::Boolean(b) => Ok(Value::Bool(*b)),
            ExprKind::Null => Ok(Value::Null),
            ExprKind::Undefined => Ok(Value::Undefined),
            ExprKind::Identifier(name) => scope.get(name),

            ExprKind::Binary { left, op, right } => {
                let left = eval(left, scope).await?;
                let right = eval(right, scope).await?;
                Ok(binary(*op, &left, &right))
            }

            ExprKind::Logical { left, op, right } => {
                let left = eval(left, scope).await?;
                let short_circuit = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::NullishCoalescing => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    eval(right, scope).await
                }
            }

            ExprKind::Unary { op, operand } => {
                if let (UnaryOp::Typeof, ExprKind::Identifier(name)) = (op, &operand.kind) {
                    if scope.lookup(name).is_none() {
                        return Ok(Value::from("undefined"));
                    }
                }
                let value = eval(operand, scope).await?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::Typeof => Value::from(value.type_of()),
                })
            }

            ExprKind::Update {
                operand,
                op,
                prefix,
            } => {
                let target = resolve_target(operand, scope).await?;
                let old = target.read(scope)?.to_number();
                let new = match op {
                    UpdateOp::Increment => old + 1.0,
                    UpdateOp::Decrement => old - 1.0,
                };
                target.write(scope, Value::Number(new))?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }

            ExprKind::Await(operand) => builtins::resolve(eval(operand, scope).await?).await,

            ExprKind::Member {
                object,
                property,
                computed,
                optional,
            } => {
                let object = eval(object, scope).await?;
                if *optional && object.is_nullish() {
                    return Ok(Value::Undefined);
                }
                let key = property_key(property, *computed, scope).await?;
                builtins::get_property(&object, &key)
            }

            ExprKind::Call {
                callee,
                arguments,
                optional,
            } => {
                let function = eval(callee, scope).await?;
                if *optional && function.is_nullish() {
                    return Ok(Value::Undefined);
                }
                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(eval(argument, scope).await?);
                }
                match function {
                    Value::Function(function) => call_function(&function, args).await,
                    _ => Err(RuntimeError::type_error(format!(
                        "{} is not a function",
                        callee_name(callee)
                    ))),
                }
            }

            ExprKind::Ternary {
                condition,
                consequent,
                alternate,
            } => {
                if eval(condition, scope).await?.is_truthy() {
                    eval(consequent, scope).await
                } else {
                    eval(alternate, scope).await
                }
            }

            ExprKind::Object(props) => {
                let mut entries = IndexMap::with_capacity(props.len());
                for prop in props {
                    entries.insert(prop.key.clone(), eval(&prop.value, scope).await?);
                }
                Ok(Value::object(entries))
            }

            ExprKind::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(eval(item, scope).await?);
                }
                Ok(Value::array(values))
            }

            ExprKind::Arrow {
                params,
                body,
                is_async,
            } => Ok(closure(params, body, scope, *is_async)),

            ExprKind::Assignment { target, op, value } => {
                let target = resolve_target(target, scope).await?;
                let value = match op.binary() {
                    None => eval(value, scope).await?,
                    Some(op) => {
                        let current = target.read(scope)?;
                        let rhs = eval(value, scope).await?;
                        binary(op, &current, &rhs)
                    }
                };
                target.write(scope, value.clone())?;
                Ok(value)
            }
        }
    }
    .boxed_local()
}

/// Apply a binary operator.
pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            let numeric = |v: &Value| {
                matches!(
                    v,
                    Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_)
                )
            };
            if numeric(left) && numeric(right) {
                Value::Number(left.to_number() + right.to_number())
            } else {
                Value::String(format!("{left}{right}"))
            }
        }
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Mod => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Eq => Value::Bool(left.loose_equals(right)),
        BinaryOp::Neq => Value::Bool(!left.loose_equals(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNeq => Value::Bool(!left.strict_equals(right)),
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Lte | BinaryOp::Gte => {
            let ordering = match (left, right) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => left.to_number().partial_cmp(&right.to_number()),
            };
            let Some(ordering) = ordering else {
                return Value::Bool(false);
            };
            Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Gt => ordering.is_gt(),
                BinaryOp::Lte => ordering.is_le(),
                _ => ordering.is_ge(),
            })
        }
    }
}

/// A place an assignment or update writes to.
enum Target {
    Name(String),
    Property(Value, String),
}

impl Target {
    fn read(&self, scope: &Scope) -> EvalResult {
        match self {
            Target::Name(name) => scope.get(name),
            Target::Property(object, key) => builtins::get_property(object, key),
        }
    }

    fn write(&self, scope: &Scope, value: Value) -> Result<(), RuntimeError> {
        match self {
            Target::Name(name) => scope.assign(name, value),
            Target::Property(object, key) => builtins::set_property(object, key, value),
        }
    }
}

async fn resolve_target(expr: &Expression, scope: &Scope) -> Result<Target, RuntimeError> {
    match &expr.kind {
        ExprKind::Identifier(name) => Ok(Target::Name(name.clone())),
        ExprKind::Member {
            object,
            property,
            computed,
            ..
        } => {
            let object = eval(object, scope).await?;
            let key = property_key(property, *computed, scope).await?;
            Ok(Target::Property(object, key))
        }
        _ => Err(RuntimeError::Syntax(
            "Invalid left-hand side in assignment".into(),
        )),
    }
}

async fn property_key(
    property: &Expression,
    computed: bool,
    scope: &Scope,
) -> Result<String, RuntimeError> {
    match &property.kind {
        ExprKind::String(name) if !computed => Ok(name.clone()),
        _ => Ok(eval(property, scope).await?.to_string()),
    }
}

/// Source-like name of a callee for error messages.
fn callee_name(expr: &Expression) -> String {
    match &expr.kind {
        ExprKind::Identifier(name) => name.clone(),
        ExprKind::Member {
            object,
            property,
            computed: false,
            ..
        } => match &property.kind {
            ExprKind::String(name) => format!("{}.{name}", callee_name(object)),
            _ => "expression".into(),
        },
        _ => "expression".into(),
    }
}

// =============================================================================
// Calls
// =============================================================================

fn closure(params: &[String], body: &Rc<ArrowBody>, scope: &Scope, is_async: bool) -> Value {
    Value::Function(Rc::new(Function::Closure(Closure {
        params: params.to_vec(),
        body: Rc::clone(body),
        scope: scope.clone(),
        is_async,
    })))
}

/// Call a function value. Async functions return a promise that has
/// already run up to its first suspension.
pub fn call_function(function: &Function, args: Vec<Value>) -> LocalBoxFuture<'_, EvalResult> {
    async move {
        match function {
            Function::Native(f) => f(args),
            Function::Async(f) => Ok(Value::promise(f(args))),
            Function::Method { receiver, name } => call_method(receiver, name, args).await,
            Function::Closure(closure) => {
                let scope = closure.scope.function_child();
                for (i, param) in closure.params.iter().enumerate() {
                    scope.define(param, arg(&args, i));
                }
                let body = Rc::clone(&closure.body);
                if closure.is_async {
                    Ok(Value::promise(run_body(body, scope)))
                } else {
                    run_body(body, scope).await
                }
            }
        }
    }
    .boxed_local()
}

async fn run_body(body: Rc<ArrowBody>, scope: Scope) -> EvalResult {
    match body.as_ref() {
        ArrowBody::Expression(expr) => eval(expr, &scope).await,
        ArrowBody::Block(stmts) => match exec_block(stmts, &scope).await? {
            Completion::Return(value) => Ok(value),
            _ => Ok(Value::Undefined),
        },
    }
}

async fn call_method(receiver: &Value, name: &str, args: Vec<Value>) -> EvalResult {
    match receiver {
        Value::String(s) => {
            if let ("replace" | "replaceAll", Value::Function(replacer)) = (name, arg(&args, 1)) {
                let pattern = arg(&args, 0).to_string();
                return replace_with(s, &pattern, &replacer, name == "replaceAll").await;
            }
            builtins::string_method(s, name, &args)
        }
        Value::Array(items) if builtins::ARRAY_CALLBACK_METHODS.contains(&name) => {
            array_callback(items, name, args).await
        }
        Value::Array(items) => builtins::array_method(items, name, &args),
        Value::Number(n) => builtins::number_method(*n, name, &args),
        other => Err(RuntimeError::type_error(format!(
            "{}.{name} is not a function",
            other.type_of()
        ))),
    }
}

/// Replace occurrences of `pattern` with the results of `replacer`, in a
/// single left-to-right pass over the original text.
async fn replace_with(s: &str, pattern: &str, replacer: &Function, all: bool) -> EvalResult {
    let mut positions: Vec<usize> = if pattern.is_empty() {
        s.char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(s.len()))
            .collect()
    } else {
        s.match_indices(pattern).map(|(i, _)| i).collect()
    };
    if !all {
        positions.truncate(1);
    }

    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for start in positions {
        out.push_str(&s[last..start]);
        let offset = s[..start].chars().count();
        let args = vec![
            Value::from(pattern),
            Value::Number(offset as f64),
            Value::from(s),
        ];
        let replacement = call_function(replacer, args).await?;
        out.push_str(&replacement.to_string());
        last = start + pattern.len();
    }
    out.push_str(&s[last..]);
    Ok(Value::String(out))
}

async fn array_callback(items: &Array, name: &str, args: Vec<Value>) -> EvalResult {
    let callback = match arg(&args, 0) {
        Value::Function(callback) => callback,
        other => {
            return Err(RuntimeError::type_error(format!(
                "{other} is not a function"
            )))
        }
    };

    let snapshot = items.borrow().clone();
    let mut kept = Vec::new();
    for (i, item) in snapshot.into_iter().enumerate() {
        let args = vec![item.clone(), Value::Number(i as f64), Value::Array(items.clone())];
        let result = call_function(&callback, args).await?;
        match name {
            "map" => kept.push(result),
            "filter" if result.is_truthy() => kept.push(item),
            "find" if result.is_truthy() => return Ok(item),
            "some" if result.is_truthy() => return Ok(Value::Bool(true)),
            "every" if !result.is_truthy() => return Ok(Value::Bool(false)),
            _ => {}
        }
    }

    Ok(match name {
        "map" | "filter" => Value::array(kept),
        "some" => Value::Bool(false),
        "every" => Value::Bool(true),
        _ => Value::Undefined,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatusError;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::time::Duration;

    async fn run_in(source: &str, scope: &Scope) -> EvalResult {
        let program = Parser::parse(source).unwrap();
        run(&program, &scope.function_child()).await
    }

    async fn run_source(source: &str) -> EvalResult {
        run_in(source, &global_scope()).await
    }

    async fn value(source: &str) -> Value {
        run_source(source).await.unwrap()
    }

    async fn error(source: &str) -> String {
        run_source(source).await.unwrap_err().to_string()
    }

    // =========================================================================
    // Operators
    // =========================================================================

    #[tokio::test]
    async fn test_arithmetic_and_concat() {
        assert_eq!(value("return 1 + 2 * 3").await, Value::from(7.0));
        assert_eq!(value("return 'a' + 1").await, Value::from("a1"));
        assert_eq!(value("return 7 % 3").await, Value::from(1.0));
        assert_eq!(value("return '3' * '4'").await, Value::from(12.0));
    }

    #[tokio::test]
    async fn test_comparisons() {
        assert_eq!(value("return 'b' > 'a'").await, Value::Bool(true));
        assert_eq!(value("return 2 < '10'").await, Value::Bool(true));
        assert_eq!(value("return 1 == '1' && 1 !== '1'").await, Value::Bool(true));
    }

    #[tokio::test]
    async fn test_logical_and_nullish() {
        assert_eq!(value("return 0 || 'x'").await, Value::from("x"));
        assert_eq!(value("return 0 ?? 'x'").await, Value::from(0.0));
        assert_eq!(value("const o = null; return o?.a ?? 'd'").await, Value::from("d"));
    }

    #[tokio::test]
    async fn test_typeof() {
        assert_eq!(value("return typeof missing").await, Value::from("undefined"));
        assert_eq!(value("return typeof (() => 1)").await, Value::from("function"));
    }

    #[tokio::test]
    async fn test_update_and_compound_assignment() {
        assert_eq!(value("let i = 0; i++; ++i; return i").await, Value::from(2.0));
        assert_eq!(value("let i = 5; return i--").await, Value::from(5.0));
        assert_eq!(
            value("const o = { n: 1 }; o.n += 4; o['n'] *= 2; return o.n").await,
            Value::from(10.0)
        );
    }

    // =========================================================================
    // Bindings
    // =========================================================================

    #[tokio::test]
    async fn test_undefined_name() {
        assert_eq!(error("return lol").await, "ReferenceError: lol is not defined");
    }

    #[tokio::test]
    async fn test_const_reassignment() {
        assert_eq!(
            error("const a = 1; a = 2").await,
            "TypeError: Assignment to constant variable."
        );
    }

    #[tokio::test]
    async fn test_sloppy_global_assignment() {
        let global = global_scope();
        run_in("fresh = 5", &global).await.unwrap();
        assert_eq!(global.get("fresh").unwrap(), Value::from(5.0));
    }

    #[tokio::test]
    async fn test_block_scoping() {
        assert_eq!(
            value("let a = 1; { let a = 2; } return a").await,
            Value::from(1.0)
        );
        assert_eq!(value("{ var v = 3; } return v").await, Value::from(3.0));
    }

    // =========================================================================
    // Control flow
    // =========================================================================

    #[tokio::test]
    async fn test_if_else_spliced() {
        let source = "let tR = '';\n if (1 > 2) { ;\ntR += 'a';\n } else { ;\ntR += 'b';\n } ;\nreturn tR;";
        assert_eq!(value(source).await, Value::from("b"));
    }

    #[tokio::test]
    async fn test_loops() {
        assert_eq!(
            value("let s = 0; for (let i = 0; i < 5; i++) { if (i == 3) continue; s += i; } return s")
                .await,
            Value::from(7.0)
        );
        assert_eq!(
            value("let n = 0; while (true) { n++; if (n > 3) break; } return n").await,
            Value::from(4.0)
        );
        assert_eq!(
            value("let out = ''; for (const c of 'abc') out += c.toUpperCase(); return out").await,
            Value::from("ABC")
        );
        assert_eq!(
            value("let keys = []; for (const k in { a: 1, b: 2 }) keys.push(k); return keys.join('')")
                .await,
            Value::from("ab")
        );
    }

    #[tokio::test]
    async fn test_return_from_nested_loop() {
        let source = "function first(xs) { for (const x of xs) { if (x > 1) return x; } return -1 }\nreturn first([1, 5, 9])";
        assert_eq!(value(source).await, Value::from(5.0));
    }

    #[tokio::test]
    async fn test_try_catch_finally() {
        assert_eq!(
            value("try { lol } catch (e) { return e.name + ': ' + e.message }").await,
            Value::from("ReferenceError: lol is not defined")
        );
        assert_eq!(
            value("let log = ''; try { throw 'x' } catch (e) { log += e } finally { log += '!' } return log")
                .await,
            Value::from("x!")
        );
    }

    #[tokio::test]
    async fn test_uncaught_throw() {
        assert_eq!(error("throw 'boom'").await, "boom");
        assert_eq!(error("throw Error('bad input')").await, "Error: bad input");
        assert_eq!(
            error("try { missing() } catch (e) { throw e }").await,
            "ReferenceError: missing is not defined"
        );
    }

    // =========================================================================
    // Functions
    // =========================================================================

    #[tokio::test]
    async fn test_closures_and_hoisting() {
        assert_eq!(
            value("const add = (a, b) => a + b; return add(2, 3)").await,
            Value::from(5.0)
        );
        assert_eq!(
            value("return twice(4);\nfunction twice(x) { return x * 2 }").await,
            Value::from(8.0)
        );
        assert_eq!(
            value("let n = 0; const inc = () => { n++ }; inc(); inc(); return n").await,
            Value::from(2.0)
        );
    }

    #[tokio::test]
    async fn test_call_non_function() {
        assert_eq!(
            error("const tp = {}; tp.type()").await,
            "TypeError: tp.type is not a function"
        );
    }

    #[tokio::test]
    async fn test_array_callbacks() {
        assert_eq!(
            value("return [1, 2, 3].map(x => x * 2).filter(x => x > 2).join(',')").await,
            Value::from("4,6")
        );
        assert_eq!(value("return [1, 2].some(x => x > 1)").await, Value::Bool(true));
        assert_eq!(value("return [1, 2].find(x => x > 5)").await, Value::Undefined);
    }

    #[tokio::test]
    async fn test_replace_all_with_function_single_pass() {
        assert_eq!(
            value("const n = [1, 2, 3]; return 'x-x-x'.replaceAll('x', () => n.shift())").await,
            Value::from("1-2-3")
        );
        assert_eq!(
            value("return 'xx'.replaceAll('x', () => 'x!')").await,
            Value::from("x!x!")
        );
    }

    // =========================================================================
    // Async
    // =========================================================================

    #[tokio::test]
    async fn test_async_arrow_returns_promise() {
        assert_eq!(
            value("const f = async (x) => x * 2; const p = f(4); return typeof p + ' ' + await p")
                .await,
            Value::from("object 8")
        );
    }

    #[tokio::test]
    async fn test_async_arrow_starts_when_called() {
        let source = "const seen = []; const f = async () => { seen.push('a') }; \
                      f(); seen.push('b'); return seen.join('')";
        assert_eq!(value(source).await, Value::from("ab"));
    }

    #[tokio::test]
    async fn test_await_plain_value() {
        assert_eq!(value("return await 3").await, Value::from(3.0));
    }

    #[tokio::test]
    async fn test_promise_all_runs_concurrently_and_keeps_order() {
        let finished = Rc::new(RefCell::new(Vec::new()));
        let scope = global_scope();
        let log = Rc::clone(&finished);
        scope.define(
            "delay",
            Value::native_async(move |args| {
                let log = Rc::clone(&log);
                async move {
                    let ms = arg(&args, 0).to_number() as u64;
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    let value = arg(&args, 1);
                    log.borrow_mut().push(value.to_string());
                    Ok(value)
                }
            }),
        );

        let result = run_in(
            "const r = await Promise.all([delay(40, 'a'), delay(1, 'b')]); return r.join('')",
            &scope,
        )
        .await
        .unwrap();

        assert_eq!(result, Value::from("ab"));
        assert_eq!(*finished.borrow(), vec!["b".to_string(), "a".to_string()]);
    }

    #[tokio::test]
    async fn test_status_error_passes_through() {
        let scope = global_scope();
        scope.define(
            "fail",
            Value::native(|_| Err(StatusError::not_found("File x doesn't exist").into())),
        );
        let err = run_in("fail()", &scope).await.unwrap_err();
        match err {
            RuntimeError::Status(status) => {
                assert_eq!(status.to_string(), "NOT_FOUND: File x doesn't exist")
            }
            other => panic!("Expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_host_object_mutation_is_visible() {
        let scope = global_scope();
        let ctx = Value::object(IndexMap::new());
        scope.define("ctx", ctx.clone());
        run_in("ctx.count = 3; ctx.items = [1]", &scope).await.unwrap();
        assert_eq!(
            builtins::get_property(&ctx, "count").unwrap(),
            Value::from(3.0)
        );
    }
}
