use crate::config::ParserConfig;
use crate::token::{Command, Token};
use crate::{command, whitespace, LexerError, LexerErrorKind};

/// Cursor state of a scan, kept for diagnostics only.
///
/// `line` is 1-based; `offset` counts characters consumed so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsingData {
    pub line: usize,
    pub offset: usize,
}

impl Default for ParsingData {
    fn default() -> Self {
        Self { line: 1, offset: 0 }
    }
}

impl ParsingData {
    fn advance(&mut self, text: &str) {
        self.offset += text.chars().count();
        self.line += text.matches('\n').count();
    }
}

/// Template tag scanner.
///
/// Splits template text into `Text` and `Command` tokens using a
/// first-match scan for the configured tags. Tags do not nest: the first
/// closing tag after an opening tag ends the command, even inside a
/// string literal of the command content.
pub struct Scanner<'a> {
    config: &'a ParserConfig,
    rest: &'a str,
    data: ParsingData,
    tokens: Vec<Token>,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner for the given source.
    pub fn new(config: &'a ParserConfig, source: &'a str) -> Self {
        Self {
            config,
            rest: source,
            data: ParsingData::default(),
            tokens: Vec::new(),
        }
    }

    /// Tokenize the entire source into a vector of tokens.
    pub fn tokenize(config: &ParserConfig, source: &str) -> Result<Vec<Token>, LexerError> {
        let mut scanner = Scanner::new(config, source);
        scanner.scan_tokens()?;
        log::debug!(
            "scanned {} tokens over {} lines",
            scanner.tokens.len(),
            scanner.data.line
        );
        Ok(scanner.tokens)
    }

    /// Current cursor position.
    pub fn position(&self) -> ParsingData {
        self.data
    }

    /// Scan all tokens from the source.
    fn scan_tokens(&mut self) -> Result<(), LexerError> {
        while let Some(index) = self.rest.find(self.config.opening_tag.as_str()) {
            let rest = self.rest;
            self.push_text(&rest[..index]);
            self.data.advance(&self.config.opening_tag);
            self.rest = &rest[index + self.config.opening_tag.len()..];
            self.scan_command()?;
        }

        let rest = self.rest;
        self.push_text(rest);
        self.rest = "";
        Ok(())
    }

    /// Scan one command, starting right after its opening tag.
    fn scan_command(&mut self) -> Result<(), LexerError> {
        let start = self.rest;
        if start.is_empty() {
            return Err(self.error(LexerErrorKind::MissingClosingTag, "No closing tag found."));
        }

        let (opening_whitespace, rest) = whitespace::split_leading(self.config, start);
        let Some((kind, rest)) = command::classify(self.config, rest) else {
            return Err(self.error(LexerErrorKind::MissingCommandType, "Missing command type."));
        };
        self.data.advance(&start[..start.len() - rest.len()]);

        let closing_tag = self.config.closing_tag.as_str();
        let Some(end) = rest.find(closing_tag) else {
            return Err(self.error(LexerErrorKind::MissingClosingTag, "No closing tag found."));
        };
        let raw = &rest[..end];
        let (closing_whitespace, content) = whitespace::split_trailing(self.config, raw);
        self.data.advance(raw);
        self.data.advance(closing_tag);
        self.rest = &rest[end + closing_tag.len()..];

        let command = Command {
            kind,
            opening_whitespace,
            closing_whitespace,
            content: content.to_string(),
        };
        log::trace!("command {command:?}");
        self.tokens.push(Token::Command(command));
        Ok(())
    }

    // --- Helpers ---

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.data.advance(text);
        self.tokens.push(Token::Text(text.to_string()));
    }

    fn error(&self, kind: LexerErrorKind, message: &str) -> LexerError {
        LexerError {
            kind,
            message: message.into(),
            line: self.data.line,
            offset: self.data.offset,
        }
    }
}
