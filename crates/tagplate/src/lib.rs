//! tagplate
//!
//! Renders templates made of literal text and command tags. Interpolate
//! tags (`<% expr %>` by default) are replaced by the value of their
//! expression; execution tags (`<%* code %>`) run statements that may
//! write to the output accumulator `tR` directly.
//!
//! ```text
//! template → Scanner → [Token] → generate() → script → Sandbox → String
//! ```
//!
//! Interpolated expressions are started in order but awaited together, so
//! slow asynchronous host functions overlap while their results still land
//! in template order.
//!
//! # Example
//!
//! ```
//! use futures_util::FutureExt;
//! use tagplate::{Context, Parser};
//!
//! let mut context = Context::new();
//! context.insert("name", "world");
//!
//! let parser = Parser::new();
//! let output = parser
//!     .parse_commands("Hello <% name %>!", &context)
//!     .now_or_never()
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(output, "Hello world!");
//! ```

pub mod context;
pub mod sandbox;

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tagplate_lexer::{LexerError, LexerErrorKind, Scanner, Token};

pub use context::Context;
pub use sandbox::Sandbox;
pub use tagplate_lexer::{self as lexer, ParserConfig};
pub use tagplate_script::{Code, EvalResult, RuntimeError, StatusError, Value};

/// Template renderer.
///
/// Holds one tag configuration and nothing else, so a parser can serve any
/// number of renders, concurrent ones included.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// A parser with the default tag configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// A parser with a custom tag configuration.
    pub fn with_config(config: ParserConfig) -> Result<Self, StatusError> {
        let mut parser = Self::new();
        parser.init(Some(config))?;
        Ok(parser)
    }

    /// Replace the tag configuration; `None` restores the defaults.
    pub fn init(&mut self, config: Option<ParserConfig>) -> Result<(), StatusError> {
        let config = config.unwrap_or_default();
        config
            .validate()
            .map_err(|e| StatusError::invalid_argument(e.to_string()))?;
        log::debug!(
            "parser configured with tags {} {}",
            config.opening_tag,
            config.closing_tag
        );
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Split a template into text and command tokens.
    pub fn tokenize(&self, content: &str) -> Result<Vec<Token>, StatusError> {
        Scanner::tokenize(&self.config, content).map_err(lexer_status)
    }

    /// Compile a template to the script a sandbox runs.
    pub fn generate_script(&self, content: &str) -> Result<String, StatusError> {
        let tokens = self.tokenize(content)?;
        Ok(tagplate_codegen::generate(&self.config, &tokens))
    }

    /// Check that a template tokenizes and that the code in its tags parses,
    /// without running anything.
    pub fn check(&self, content: &str) -> Result<(), StatusError> {
        let script = self.generate_script(content)?;
        tagplate_script::parse(&script)
            .map(|_| ())
            .map_err(|e| StatusError::unknown(format!("SyntaxError: {}", e.message)))
    }

    /// Render `content` with the names in `context` in scope.
    pub async fn parse_commands(&self, content: &str, context: &Context) -> Result<String, StatusError> {
        let render = async {
            let script = self.generate_script(content)?;
            log::trace!("generated script:\n{script}");
            Sandbox::new().bind(context).execute(&script).await
        };

        let result = match AssertUnwindSafe(render).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(StatusError::unknown(panic_message(panic.as_ref()))),
        };
        if let Err(e) = &result {
            log::warn!("render failed: {e}");
        }
        result
    }
}

/// Lexer failures: an untyped tag is a caller mistake, an unclosed tag
/// means the expected closing tag was not found.
fn lexer_status(err: LexerError) -> StatusError {
    let message = err.to_string();
    match err.kind {
        LexerErrorKind::MissingCommandType => StatusError::invalid_argument(message),
        LexerErrorKind::MissingClosingTag => StatusError::not_found(message),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Render panicked.".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::time::Duration;

    const TEMPLATE: &str = "
test<%_ test %>test
<%- test _%>
test
<%_* test -%> test <% test %>
test.

<%* if (tp.type() === \"seedling\") { %>
This is a seedling file !
<%* } else { %>
This is a normal file !
<%* } %>";

    fn render(parser: &Parser, content: &str, context: &Context) -> Result<String, StatusError> {
        parser.parse_commands(content, context).now_or_never().unwrap()
    }

    fn seedling_context(variable: &str) -> Context {
        let mut tp = IndexMap::new();
        tp.insert("type".to_string(), Value::native(|_| Ok("seedling".into())));
        let mut context = Context::new();
        context.insert(variable, 5.0).insert("tp", tp);
        context
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    #[test]
    fn test_full_template() {
        let output = render(&Parser::new(), TEMPLATE, &seedling_context("test")).unwrap();
        assert_eq!(output, "\ntest5test5test test 5\ntest.\n\n\nThis is a seedling file !\n");
    }

    #[test]
    fn test_undefined_name() {
        let content = TEMPLATE.replace("<% test %>", "<% lol %>");
        let err = render(&Parser::new(), &content, &seedling_context("test")).unwrap_err();
        assert_eq!(err.code, Code::Unknown);
        assert_eq!(err.message, "ReferenceError: lol is not defined");

        let err = render(&Parser::new(), "a<%* lol() %>b", &Context::new()).unwrap_err();
        assert_eq!(err.to_string(), "UNKNOWN: ReferenceError: lol is not defined");
    }

    #[test]
    fn test_interpolate_and_execution() {
        let parser = Parser::new();
        let context = Context::new();
        assert_eq!(render(&parser, "a<% 1+1 %>b", &context).unwrap(), "a2b");
        assert_eq!(render(&parser, "<%* tR += 'x' %>y", &context).unwrap(), "xy");
        assert_eq!(render(&parser, "plain text", &context).unwrap(), "plain text");
        assert_eq!(render(&parser, "", &context).unwrap(), "");
    }

    #[test]
    fn test_interpolate_marker() {
        let parser = Parser::with_config(ParserConfig {
            interpolate: Some('='),
            ..ParserConfig::default()
        })
        .unwrap();
        assert_eq!(render(&parser, "a<%= 1+1 %>b", &Context::new()).unwrap(), "a2b");
    }

    #[test]
    fn test_loop_in_execution_tags() {
        let content = "<%* for (const x of items) { %>- <% x %>\n<%* } %>";
        let mut context = Context::new();
        context.insert("items", vec![Value::from("a"), Value::from("b")]);
        assert_eq!(render(&Parser::new(), content, &context).unwrap(), "- a\n- b\n");
    }

    #[tokio::test]
    async fn test_results_land_in_template_order() {
        let parser = Parser::new();
        let mut context = Context::new();
        context.insert_async_fn("delay", |args| async move {
            let ms = args.first().map(Value::to_number).unwrap_or(0.0);
            tokio::time::sleep(Duration::from_millis(ms as u64)).await;
            Ok(args.get(1).cloned().unwrap_or(Value::Undefined))
        });

        let output = parser
            .parse_commands("<% delay(30, 'a') %>-<% delay(1, 'b') %>", &context)
            .await;
        assert_eq!(output.unwrap(), "a-b");
    }

    #[test]
    fn test_concurrent_renders() {
        let parser = Parser::new();
        let mut context = Context::new();
        context.insert("n", 1.0);
        let (a, b) = futures_util::future::join(
            parser.parse_commands("a<% n %>", &context),
            parser.parse_commands("b<% n + 1 %>", &context),
        )
        .now_or_never()
        .unwrap();
        assert_eq!(a.unwrap(), "a1");
        assert_eq!(b.unwrap(), "b2");
    }

    #[test]
    fn test_context_mutations_persist() {
        let state = Value::object(IndexMap::new());
        let mut context = Context::new();
        context.insert("state", state.clone());

        let parser = Parser::new();
        let content = "<%* state.n = (state.n ?? 0) + 1 %><% state.n %>";
        assert_eq!(render(&parser, content, &context).unwrap(), "1");
        assert_eq!(render(&parser, content, &context).unwrap(), "2");

        let Value::Object(object) = state else {
            panic!("expected object");
        };
        assert_eq!(object.borrow().get("n"), Some(&Value::from(2.0)));
    }

    #[test]
    fn test_host_function_sees_arguments() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut context = Context::new();
        context.insert_fn("record", move |args| {
            sink.borrow_mut().extend(args);
            Ok(Value::Undefined)
        });

        render(&Parser::new(), "<%* record('x', 2) %>", &context).unwrap();
        assert_eq!(*seen.borrow(), vec![Value::from("x"), Value::from(2.0)]);
    }

    // =========================================================================
    // Asynchronous host functions
    // =========================================================================

    #[tokio::test]
    async fn test_unawaited_call_finishes_before_render() {
        let saved = Rc::new(Cell::new(0));
        let counter = saved.clone();
        let mut context = Context::new();
        context.insert_async_fn("save", move |_| {
            let counter = counter.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                counter.set(counter.get() + 1);
                Ok(Value::Undefined)
            }
        });

        let output = Parser::new().parse_commands("<%* save() %>done", &context).await;
        assert_eq!(output.unwrap(), "done");
        assert_eq!(saved.get(), 1);
    }

    #[test]
    fn test_async_arrow_runs_before_next_tag() {
        let mut context = Context::new();
        context.insert("state", Value::object(IndexMap::new()));
        let content = "<% (async () => { state.n = 1; return 'a' })() %><%* tR += state.n %>";
        assert_eq!(render(&Parser::new(), content, &context).unwrap(), "a1");
    }

    #[tokio::test]
    async fn test_interpolations_run_concurrently() {
        let signal = Rc::new(Cell::new(false));
        let mut context = Context::new();
        let seen = signal.clone();
        context.insert_async_fn("wait", move |_| {
            let seen = seen.clone();
            async move {
                while !seen.get() {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
                Ok(Value::from("waited"))
            }
        });
        let sent = signal.clone();
        context.insert_async_fn("signal", move |_| {
            let sent = sent.clone();
            async move {
                tokio::task::yield_now().await;
                sent.set(true);
                Ok(Value::from("sent"))
            }
        });

        let parser = Parser::new();
        let rendering = parser.parse_commands("<% wait() %> <% signal() %>", &context);
        let output = tokio::time::timeout(Duration::from_secs(5), rendering)
            .await
            .expect("interpolations should not wait on each other");
        assert_eq!(output.unwrap(), "waited sent");
        assert!(signal.get());
    }

    // =========================================================================
    // Errors
    // =========================================================================

    #[test]
    fn test_missing_command_type() {
        let parser = Parser::with_config(ParserConfig {
            interpolate: Some('&'),
            ..ParserConfig::default()
        })
        .unwrap();
        let err = render(&parser, TEMPLATE, &seedling_context("test")).unwrap_err();
        assert_eq!(err.code, Code::InvalidArgument);
        assert!(
            err.to_string().contains("INVALID_ARGUMENT: Missing command type."),
            "{err}"
        );
    }

    #[test]
    fn test_missing_closing_tag() {
        let err = render(&Parser::new(), "a<% 1 + 1", &Context::new()).unwrap_err();
        assert_eq!(err.code, Code::NotFound);
        assert!(err.message.starts_with("No closing tag found."), "{err}");
    }

    #[test]
    fn test_syntax_error_in_tag() {
        let err = render(&Parser::new(), "<% 1 + %>", &Context::new()).unwrap_err();
        assert_eq!(err.code, Code::Unknown);
        assert!(err.message.starts_with("SyntaxError: "), "{err}");
    }

    #[test]
    fn test_status_error_from_host() {
        let mut context = Context::new();
        context.insert_async_fn("load", |_| async {
            Err(RuntimeError::from(StatusError::not_found("File x.md doesn't exist")))
        });
        let err = render(&Parser::new(), "<% load() %>", &context).unwrap_err();
        assert_eq!(err, StatusError::not_found("File x.md doesn't exist"));
    }

    #[test]
    fn test_host_panic_is_unknown() {
        let mut context = Context::new();
        context.insert_fn("explode", |_| panic!("host blew up"));
        let err = render(&Parser::new(), "<% explode() %>", &context).unwrap_err();
        assert_eq!(err, StatusError::unknown("host blew up"));
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    #[test]
    fn test_init_rejects_invalid_config() {
        let mut parser = Parser::new();
        let err = parser
            .init(Some(ParserConfig {
                interpolate: Some('*'),
                ..ParserConfig::default()
            }))
            .unwrap_err();
        assert_eq!(err.code, Code::InvalidArgument);
        assert_eq!(parser.config(), &ParserConfig::default());
    }

    #[test]
    fn test_init_none_restores_defaults() {
        let mut parser = Parser::with_config(ParserConfig {
            opening_tag: "{{".into(),
            closing_tag: "}}".into(),
            ..ParserConfig::default()
        })
        .unwrap();
        assert_eq!(render(&parser, "a{{ 1 }}", &Context::new()).unwrap(), "a1");

        parser.init(None).unwrap();
        assert_eq!(parser.config(), &ParserConfig::default());
    }

    #[test]
    fn test_check() {
        let parser = Parser::new();
        assert!(parser.check("a<% b %>").is_ok());
        assert_eq!(parser.check("<% ) %>").unwrap_err().code, Code::Unknown);
        assert_eq!(parser.check("<% a").unwrap_err().code, Code::NotFound);
    }
}
