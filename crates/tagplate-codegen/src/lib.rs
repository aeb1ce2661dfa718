//! tagplate Code Generator
//!
//! Compiles a template token sequence into a script for `tagplate-script`.
//! Literal text is appended to the accumulator as base64 so that document
//! content never needs escaping. Interpolated expressions are pushed onto
//! a pending list and stand in the output as a placeholder; at the end all
//! pending values are awaited together and substituted left to right.
//!
//! ```text
//! [Token] → generate() → script text
//! ```

pub mod trim;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tagplate_lexer::{CommandKind, ParserConfig, Token, Whitespace};

pub use trim::trim_whitespace;

/// Marks where an interpolated value goes in the accumulator.
pub const PLACEHOLDER: &str = "rJ2KqXzxQg";

/// Name of the list of values awaiting substitution.
pub const PENDING: &str = "__pending";

/// Name of the resolved pending values.
pub const RESULTS: &str = "__results";

/// Generate the script for a token sequence.
///
/// Text between two commands is trimmed on its leading edge by the closing
/// directive of the command before it and on its trailing edge by the
/// opening directive of the command after it.
pub fn generate(config: &ParserConfig, tokens: &[Token]) -> String {
    let mut script = ScriptBuilder::new(&config.accumulator);
    let mut closing_trim: Option<Whitespace> = None;
    let mut pending_text: Option<&str> = None;

    for token in tokens {
        match token {
            Token::Text(text) => pending_text = Some(text.as_str()),
            Token::Command(command) => {
                if let Some(text) = pending_text.take() {
                    let text = trim_whitespace(text, closing_trim, false);
                    let text = trim_whitespace(text, command.opening_whitespace, true);
                    script.text(text);
                }
                closing_trim = command.closing_whitespace;

                match command.kind {
                    CommandKind::Interpolate => script.interpolate(&command.content),
                    CommandKind::Execution => script.execution(&command.content),
                }
            }
        }
    }

    if let Some(text) = pending_text {
        script.text(trim_whitespace(text, closing_trim, false));
    }

    let script = script.finish();
    log::debug!("generated {} bytes of script from {} tokens", script.len(), tokens.len());
    script
}

/// Accumulates the lines of a generated script.
struct ScriptBuilder<'a> {
    accumulator: &'a str,
    out: String,
}

impl<'a> ScriptBuilder<'a> {
    fn new(accumulator: &'a str) -> Self {
        let mut out = String::new();
        out.push_str(&format!("let {PENDING} = [];\n"));
        out.push_str(&format!("let {accumulator} = '';\n"));
        Self { accumulator, out }
    }

    fn text(&mut self, text: &str) {
        let encoded = STANDARD.encode(text);
        self.out
            .push_str(&format!("{} += atob('{encoded}');\n", self.accumulator));
    }

    fn interpolate(&mut self, content: &str) {
        self.out.push_str(&format!("{PENDING}.push({content});\n"));
        self.out
            .push_str(&format!("{} += '{PLACEHOLDER}';\n", self.accumulator));
    }

    fn execution(&mut self, content: &str) {
        self.out.push_str(content);
        self.out.push_str(";\n");
    }

    fn finish(mut self) -> String {
        let acc = self.accumulator;
        self.out.push_str(&format!(
            "const {RESULTS} = await Promise.all({PENDING});\n"
        ));
        self.out.push_str(&format!(
            "{acc} = {acc}.replaceAll('{PLACEHOLDER}', () => {RESULTS}.shift());\n"
        ));
        self.out.push_str(&format!("return {acc};\n"));
        self.out
    }
}
