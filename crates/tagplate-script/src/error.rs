//! Runtime and status errors.

use std::fmt;

use crate::value::Value;

/// Kind tag of a structured error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    InvalidArgument,
    NotFound,
    Internal,
    Unknown,
}

impl Code {
    pub fn as_str(self) -> &'static str {
        match self {
            Code::InvalidArgument => "INVALID_ARGUMENT",
            Code::NotFound => "NOT_FOUND",
            Code::Internal => "INTERNAL",
            Code::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured error with a kind tag and a human-readable message.
///
/// Host functions return it through [`RuntimeError::Status`] so that it
/// reaches the caller of a render unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct StatusError {
    pub code: Code,
    pub message: String,
}

impl StatusError {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Code::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::Internal, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(Code::Unknown, message)
    }
}

/// An error raised while evaluating a script.
///
/// The display strings match what a user sees for the same failure in a
/// browser console, e.g. `ReferenceError: lol is not defined`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    #[error("ReferenceError: {0}")]
    Reference(String),

    #[error("TypeError: {0}")]
    Type(String),

    #[error("SyntaxError: {0}")]
    Syntax(String),

    #[error("RangeError: {0}")]
    Range(String),

    /// Raised by `throw Error('...')`.
    #[error("Error: {0}")]
    Error(String),

    /// Any other thrown value.
    #[error("{0}")]
    Thrown(Value),

    #[error(transparent)]
    Status(#[from] StatusError),
}

impl RuntimeError {
    pub fn reference(message: impl Into<String>) -> Self {
        RuntimeError::Reference(message.into())
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        RuntimeError::Type(message.into())
    }

    pub fn range(message: impl Into<String>) -> Self {
        RuntimeError::Range(message.into())
    }

    /// The `name` property seen by scripts that catch this error.
    pub fn name(&self) -> &'static str {
        match self {
            RuntimeError::Reference(_) => "ReferenceError",
            RuntimeError::Type(_) => "TypeError",
            RuntimeError::Syntax(_) => "SyntaxError",
            RuntimeError::Range(_) => "RangeError",
            RuntimeError::Error(_) | RuntimeError::Thrown(_) => "Error",
            RuntimeError::Status(_) => "StatusError",
        }
    }

    /// The `message` property seen by scripts that catch this error.
    pub fn message(&self) -> String {
        match self {
            RuntimeError::Reference(m)
            | RuntimeError::Type(m)
            | RuntimeError::Syntax(m)
            | RuntimeError::Range(m)
            | RuntimeError::Error(m) => m.clone(),
            RuntimeError::Thrown(value) => value.to_string(),
            RuntimeError::Status(status) => status.message.clone(),
        }
    }
}
