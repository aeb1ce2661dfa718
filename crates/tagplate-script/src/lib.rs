//! tagplate Script
//!
//! The language command tags are written in. Generated template scripts
//! and the user code spliced into them are lexed and parsed into an
//! Abstract Syntax Tree, then run by an async tree-walking interpreter
//! against an explicit chain of scopes.
//!
//! The language is a JavaScript subset: expressions, `let`/`const`/`var`,
//! `if`, loops, `try`/`catch`, arrow functions, `async`/`await` and the
//! builtins a template typically needs (`Promise.all`, `atob`, string and
//! array methods).
//!
//! # Example
//!
//! ```
//! use tagplate_script::{interpreter, parse, Value};
//!
//! let program = parse("let a = [1, 2]; return a.map(x => x * 10).join('+');").unwrap();
//! let scope = interpreter::global_scope().function_child();
//! let result = futures_util::FutureExt::now_or_never(interpreter::run(&program, &scope));
//! assert_eq!(result.unwrap().unwrap(), Value::from("10+20"));
//! ```

pub mod ast;
pub mod builtins;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod tasks;
pub mod value;

pub use ast::{Expression, Program, Stmt};
pub use error::{Code, RuntimeError, StatusError};
pub use parser::Parser;
pub use scope::Scope;
pub use value::{EvalResult, Function, Value};

/// Parser error with position information.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Parse error at line {line}, column {column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

/// Parse a complete script.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let program = Parser::parse(source)?;
    log::trace!("parsed {} statements", program.body.len());
    Ok(program)
}
