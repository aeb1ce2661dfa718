//! Lexer for template scripts.
//!
//! Tokenizes the generated script and the user code spliced into it.
//! No `eval()`, no host engine: the token stream feeds the parser in
//! `parser.rs` and the tree-walking interpreter.
//!
//! # Examples
//!
//! ```
//! use tagplate_script::lexer::{Lexer, TokenKind};
//!
//! let tokens = Lexer::tokenize("count + 1").unwrap();
//! assert_eq!(tokens[0].kind, TokenKind::Identifier);
//! assert_eq!(tokens[1].kind, TokenKind::Plus);
//! assert_eq!(tokens[2].kind, TokenKind::Number);
//! ```

use crate::ast::Span;
use crate::ParseError;

/// A token produced by the script lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub value: TokenValue,
    /// A line break separates this token from the previous one.
    pub newline_before: bool,
}

/// Token classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Literals
    Number,
    String,
    Boolean,
    Null,
    Undefined,

    // Identifiers & keywords
    Identifier,
    Typeof,
    Let,
    Const,
    Var,
    If,
    Else,
    For,
    While,
    In,
    Return,
    Throw,
    Break,
    Continue,
    Try,
    Catch,
    Finally,
    Function,
    Async,
    Await,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    // Comparison
    EqEq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
    Lte,
    Gte,

    // Logical
    And,
    Or,
    Not,
    QuestionQuestion,

    // Assignment
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,

    // Update
    PlusPlus,
    MinusMinus,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    // Punctuation
    Dot,
    Comma,
    Colon,
    Semicolon,
    Question,
    Arrow,
    OptionalChain,

    // End of input
    Eof,
}

/// The value carried by a token.
///
/// Keywords carry their text as an `Identifier` so they can still be used
/// as property names (`tp.file.include`, `promise.catch`).
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    None,
    Number(f64),
    String(String),
    Boolean(bool),
    Identifier(String),
}

/// Script lexer.
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    newline_before: bool,
}

impl Lexer {
    /// Create a new lexer for the given source.
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            newline_before: false,
        }
    }

    /// Tokenize the entire source into a vector of tokens.
    pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();

        loop {
            let token = lexer.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        Ok(tokens)
    }

    /// Read the next token from the source.
    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        self.newline_before = false;
        self.skip_trivia()?;

        let start = self.pos;
        let line = self.line;
        let column = self.column;

        if self.is_at_end() {
            return Ok(self.token(TokenKind::Eof, start, line, column, TokenValue::None));
        }

        let ch = self.current();
        let (kind, value) = match ch {
            '0'..='9' => self.read_number()?,
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.read_number()?,
            '\'' | '"' | '`' => self.read_string()?,
            c if c.is_alphabetic() || c == '_' || c == '$' => self.read_identifier(),
            _ => (self.read_punctuation()?, TokenValue::None),
        };

        Ok(self.token(kind, start, line, column, value))
    }

    // --- Private helpers ---

    fn read_punctuation(&mut self) -> Result<TokenKind, ParseError> {
        let ch = self.current();
        let next = self.peek();
        let third = self.peek_at(2);

        let (kind, len) = match (ch, next) {
            ('=', Some('=')) if third == Some('=') => (TokenKind::StrictEq, 3),
            ('!', Some('=')) if third == Some('=') => (TokenKind::StrictNotEq, 3),
            ('=', Some('=')) => (TokenKind::EqEq, 2),
            ('!', Some('=')) => (TokenKind::NotEq, 2),
            ('=', Some('>')) => (TokenKind::Arrow, 2),
            ('&', Some('&')) => (TokenKind::And, 2),
            ('|', Some('|')) => (TokenKind::Or, 2),
            ('?', Some('?')) => (TokenKind::QuestionQuestion, 2),
            ('?', Some('.')) if !third.is_some_and(|c| c.is_ascii_digit()) => {
                (TokenKind::OptionalChain, 2)
            }
            ('+', Some('+')) => (TokenKind::PlusPlus, 2),
            ('-', Some('-')) => (TokenKind::MinusMinus, 2),
            ('+', Some('=')) => (TokenKind::PlusEq, 2),
            ('-', Some('=')) => (TokenKind::MinusEq, 2),
            ('*', Some('=')) => (TokenKind::StarEq, 2),
            ('/', Some('=')) => (TokenKind::SlashEq, 2),
            ('%', Some('=')) => (TokenKind::PercentEq, 2),
            ('<', Some('=')) => (TokenKind::Lte, 2),
            ('>', Some('=')) => (TokenKind::Gte, 2),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('%', _) => (TokenKind::Percent, 1),
            ('!', _) => (TokenKind::Not, 1),
            ('<', _) => (TokenKind::Lt, 1),
            ('>', _) => (TokenKind::Gt, 1),
            ('=', _) => (TokenKind::Eq, 1),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            ('[', _) => (TokenKind::LBracket, 1),
            (']', _) => (TokenKind::RBracket, 1),
            ('{', _) => (TokenKind::LBrace, 1),
            ('}', _) => (TokenKind::RBrace, 1),
            ('.', _) => (TokenKind::Dot, 1),
            (',', _) => (TokenKind::Comma, 1),
            (':', _) => (TokenKind::Colon, 1),
            (';', _) => (TokenKind::Semicolon, 1),
            ('?', _) => (TokenKind::Question, 1),
            _ => return Err(self.error(format!("Unexpected character: '{ch}'"))),
        };

        for _ in 0..len {
            self.advance();
        }
        Ok(kind)
    }

    fn read_number(&mut self) -> Result<(TokenKind, TokenValue), ParseError> {
        let mut text = String::new();
        while !self.is_at_end() && (self.current().is_ascii_digit() || self.current() == '.') {
            text.push(self.current());
            self.advance();
        }

        let value: f64 = text
            .parse()
            .map_err(|_| self.error(format!("Invalid number: '{text}'")))?;

        Ok((TokenKind::Number, TokenValue::Number(value)))
    }

    fn read_string(&mut self) -> Result<(TokenKind, TokenValue), ParseError> {
        let quote = self.current();
        let (line, column) = (self.line, self.column);
        self.advance(); // skip opening quote

        let mut value = String::new();

        while !self.is_at_end() && self.current() != quote {
            if self.current() == '\\' {
                self.advance();
                if self.is_at_end() {
                    return Err(self.error("Unterminated escape sequence".into()));
                }
                match self.current() {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '0' => value.push('\0'),
                    '\\' => value.push('\\'),
                    '\n' => {}
                    c if c == quote => value.push(c),
                    c => value.push(c),
                }
            } else if self.current() == '\n' && quote != '`' {
                return Err(ParseError {
                    message: "Unterminated string".into(),
                    line,
                    column,
                });
            } else {
                value.push(self.current());
            }
            self.advance();
        }

        if self.is_at_end() {
            return Err(ParseError {
                message: "Unterminated string".into(),
                line,
                column,
            });
        }

        self.advance(); // skip closing quote

        Ok((TokenKind::String, TokenValue::String(value)))
    }

    fn read_identifier(&mut self) -> (TokenKind, TokenValue) {
        let mut text = String::new();
        while !self.is_at_end()
            && (self.current().is_alphanumeric() || self.current() == '_' || self.current() == '$')
        {
            text.push(self.current());
            self.advance();
        }

        let kind = match text.as_str() {
            "true" => return (TokenKind::Boolean, TokenValue::Boolean(true)),
            "false" => return (TokenKind::Boolean, TokenValue::Boolean(false)),
            "null" => TokenKind::Null,
            "undefined" => TokenKind::Undefined,
            "typeof" => TokenKind::Typeof,
            "let" => TokenKind::Let,
            "const" => TokenKind::Const,
            "var" => TokenKind::Var,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "while" => TokenKind::While,
            "in" => TokenKind::In,
            "return" => TokenKind::Return,
            "throw" => TokenKind::Throw,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "try" => TokenKind::Try,
            "catch" => TokenKind::Catch,
            "finally" => TokenKind::Finally,
            "function" => TokenKind::Function,
            "async" => TokenKind::Async,
            "await" => TokenKind::Await,
            _ => TokenKind::Identifier,
        };
        (kind, TokenValue::Identifier(text))
    }

    /// Skip whitespace and comments, noting line breaks.
    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            if self.is_at_end() {
                return Ok(());
            }
            match (self.current(), self.peek()) {
                ('/', Some('/')) => {
                    while !self.is_at_end() && self.current() != '\n' {
                        self.advance();
                    }
                }
                ('/', Some('*')) => {
                    let (line, column) = (self.line, self.column);
                    self.advance();
                    self.advance();
                    loop {
                        if self.is_at_end() {
                            return Err(ParseError {
                                message: "Unterminated comment".into(),
                                line,
                                column,
                            });
                        }
                        if self.current() == '*' && self.peek() == Some('/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                (c, _) if c.is_whitespace() => self.advance(),
                _ => return Ok(()),
            }
        }
    }

    fn token(
        &self,
        kind: TokenKind,
        start: usize,
        line: usize,
        column: usize,
        value: TokenValue,
    ) -> Token {
        Token {
            kind,
            span: Span::new(start, self.pos, line, column),
            value,
            newline_before: self.newline_before,
        }
    }

    fn current(&self) -> char {
        self.chars[self.pos]
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        if self.is_at_end() {
            return;
        }
        if self.chars[self.pos] == '\n' {
            self.line += 1;
            self.column = 1;
            self.newline_before = true;
        } else {
            self.column += 1;
        }
        self.pos += 1;
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn error(&self, message: String) -> ParseError {
        ParseError {
            message,
            line: self.line,
            column: self.column,
        }
    }
}
