//! Names a render exposes to template code.

use std::future::Future;

use indexmap::IndexMap;
use tagplate_script::{EvalResult, StatusError, Value};

/// An insertion-ordered map from name to value, bound as top-level names
/// when a template runs.
///
/// Values are shared handles: an object mutated by one render is seen by
/// the next render using the same context.
#[derive(Clone, Debug, Default)]
pub struct Context {
    entries: IndexMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to a value, replacing any earlier binding.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.entries.insert(name.into(), value.into());
        self
    }

    /// Bind `name` to a synchronous host function.
    pub fn insert_fn<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(Vec<Value>) -> EvalResult + 'static,
    {
        self.insert(name, Value::native(f))
    }

    /// Bind `name` to an asynchronous host function. Calls from a template
    /// return a promise.
    pub fn insert_async_fn<F, Fut>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(Vec<Value>) -> Fut + 'static,
        Fut: Future<Output = EvalResult> + 'static,
    {
        self.insert(name, Value::native_async(f))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Build a context from a JSON object; each key becomes a name.
    pub fn from_json(json: serde_json::Value) -> Result<Self, StatusError> {
        match json {
            serde_json::Value::Object(entries) => Ok(entries
                .into_iter()
                .map(|(k, v)| (k, Value::from(v)))
                .collect()),
            other => Err(StatusError::invalid_argument(format!(
                "Context must be a JSON object, got {}",
                json_type(&other)
            ))),
        }
    }
}

impl FromIterator<(String, Value)> for Context {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<(String, Value)> for Context {
    fn extend<I: IntoIterator<Item = (String, Value)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

fn json_type(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
