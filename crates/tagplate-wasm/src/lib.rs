//! WASM bindings for tagplate.
//!
//! Exposes `render()`, `script()` and `tokens()` to JavaScript via
//! wasm-bindgen. Contexts and configs are plain JS objects converted with
//! serde-wasm-bindgen; errors are thrown as JS errors carrying the status
//! text (`NOT_FOUND: ...`).

use futures_util::FutureExt;
use tagplate::{Context, Parser, ParserConfig, StatusError};
use tagplate::lexer::{CommandKind, Token};
use wasm_bindgen::prelude::*;

/// Render a template with the names of a plain JS object in scope.
///
/// `config` may be `undefined` for the default tags. Only synchronous
/// templates can be rendered here; a render still waiting on a pending
/// value throws.
#[wasm_bindgen]
pub fn render(source: &str, context: JsValue, config: JsValue) -> Result<String, JsError> {
    let parser = parser_from(config)?;
    let json: serde_json::Value = if context.is_undefined() || context.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        serde_wasm_bindgen::from_value(context).map_err(|e| JsError::new(&e.to_string()))?
    };
    render_json(&parser, source, json).map_err(|e| JsError::new(&e.to_string()))
}

/// The script generated for a template.
#[wasm_bindgen]
pub fn script(source: &str, config: JsValue) -> Result<String, JsError> {
    let parser = parser_from(config)?;
    parser
        .generate_script(source)
        .map_err(|e| JsError::new(&e.to_string()))
}

/// Split a template into `{ type, content }` objects, where `type` is
/// `text`, `interpolate` or `execution`.
#[wasm_bindgen]
pub fn tokens(source: &str, config: JsValue) -> Result<js_sys::Array, JsError> {
    let parser = parser_from(config)?;
    let tokens = parser
        .tokenize(source)
        .map_err(|e| JsError::new(&e.to_string()))?;

    let out = js_sys::Array::new();
    for token in &tokens {
        let (kind, content) = describe(token);
        let obj = js_sys::Object::new();
        js_sys::Reflect::set(&obj, &"type".into(), &kind.into())
            .map_err(|_| JsError::new("Failed to set type property"))?;
        js_sys::Reflect::set(&obj, &"content".into(), &content.into())
            .map_err(|_| JsError::new("Failed to set content property"))?;
        out.push(&obj);
    }
    Ok(out)
}

/// Get the engine version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn parser_from(config: JsValue) -> Result<Parser, JsError> {
    if config.is_undefined() || config.is_null() {
        return Ok(Parser::new());
    }
    let config: ParserConfig =
        serde_wasm_bindgen::from_value(config).map_err(|e| JsError::new(&e.to_string()))?;
    Parser::with_config(config).map_err(|e| JsError::new(&e.to_string()))
}

fn render_json(parser: &Parser, source: &str, json: serde_json::Value) -> Result<String, StatusError> {
    let context = Context::from_json(json)?;
    parser
        .parse_commands(source, &context)
        .now_or_never()
        .unwrap_or_else(|| {
            Err(StatusError::invalid_argument(
                "Template is waiting on an asynchronous value.",
            ))
        })
}

fn describe(token: &Token) -> (&'static str, &str) {
    match token {
        Token::Text(text) => ("text", text.as_str()),
        Token::Command(command) => match command.kind {
            CommandKind::Interpolate => ("interpolate", command.content.as_str()),
            CommandKind::Execution => ("execution", command.content.as_str()),
        },
    }
}
