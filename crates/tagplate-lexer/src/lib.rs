//! tagplate Lexer
//!
//! Splits template text into literal text and command tags.
//! Handles the opening/closing tag pair, the whitespace-trim markers on
//! either edge of a tag, and the interpolate/execution command markers.
//!
//! # Example
//!
//! ```
//! use tagplate_lexer::{ParserConfig, Scanner, Token};
//!
//! let tokens = Scanner::tokenize(&ParserConfig::default(), "a<% 1 + 1 %>b").unwrap();
//! assert_eq!(tokens.len(), 3);
//! assert_eq!(tokens[0], Token::Text("a".into()));
//! ```

pub mod command;
pub mod config;
pub mod scanner;
pub mod token;
pub mod whitespace;

pub use config::{ConfigError, ParserConfig};
pub use scanner::{ParsingData, Scanner};
pub use token::{Command, CommandKind, Token, Whitespace};

/// What went wrong while splitting a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexerErrorKind {
    /// A tag has no interpolate/execution marker and the config has no default mode.
    MissingCommandType,
    /// An opening tag is never closed.
    MissingClosingTag,
}

/// Lexer error with position information.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (line {line}, offset {offset})")]
pub struct LexerError {
    pub kind: LexerErrorKind,
    pub message: String,
    pub line: usize,
    pub offset: usize,
}
