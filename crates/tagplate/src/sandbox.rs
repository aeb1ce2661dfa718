//! Isolated execution of generated scripts.

use tagplate_script::{interpreter, RuntimeError, Scope, StatusError};

use crate::Context;

/// Runs a generated script with only the builtins and one context in scope.
///
/// A sandbox must be bound before it can execute anything. Each `execute`
/// gets a fresh function scope, so names a script declares never outlive
/// its run; objects reached through the context are shared handles and
/// keep their mutations.
#[derive(Clone, Default)]
pub struct Sandbox {
    scope: Option<Scope>,
}

impl Sandbox {
    /// An unbound sandbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the builtins and every name in `context`.
    pub fn bind(mut self, context: &Context) -> Self {
        let scope = interpreter::global_scope().child();
        for (name, value) in context.iter() {
            scope.define(name, value.clone());
        }
        self.scope = Some(scope);
        self
    }

    pub fn is_bound(&self) -> bool {
        self.scope.is_some()
    }

    /// Run `script` as an async function body and return its result as text.
    pub async fn execute(&self, script: &str) -> Result<String, StatusError> {
        let Some(scope) = &self.scope else {
            return Err(StatusError::internal("Sandbox executed outside a bound context."));
        };

        let program = tagplate_script::parse(script)
            .map_err(|e| StatusError::unknown(format!("SyntaxError: {}", e.message)))?;

        let value = interpreter::run(&program, &scope.function_child())
            .await
            .map_err(into_status)?;
        Ok(value.to_string())
    }
}

/// Structured errors pass through; anything else is reported as unknown
/// with the message a script would have seen.
pub(crate) fn into_status(err: RuntimeError) -> StatusError {
    match err {
        RuntimeError::Status(status) => status,
        other => StatusError::unknown(other.to_string()),
    }
}
