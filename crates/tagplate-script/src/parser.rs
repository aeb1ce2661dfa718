//! Script parser.
//!
//! Parses the token stream from `lexer` into a `Program` using recursive
//! descent for statements and precedence climbing for binary operators.
//! Statements end at `;`, `}`, end of input or a line break.

use std::rc::Rc;

use crate::ast::{
    ArrowBody, AssignOp, BinaryOp, DeclKind, ExprKind, Expression, Iteration, LogicalOp,
    ObjectProperty, Program, Span, Stmt, StmtKind, UnaryOp, UpdateOp,
};
use crate::lexer::{Lexer, Token, TokenKind, TokenValue};
use crate::ParseError;

/// Script parser.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Create a new parser for the given tokens.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse a complete script.
    pub fn parse(source: &str) -> Result<Program, ParseError> {
        let tokens = Lexer::tokenize(source)?;
        let mut parser = Parser::new(tokens);
        parser.parse_program()
    }

    /// Parse a single expression; trailing tokens are an error.
    pub fn parse_expression_source(source: &str) -> Result<Expression, ParseError> {
        let tokens = Lexer::tokenize(source)?;
        let mut parser = Parser::new(tokens);
        let expr = parser.parse_expression()?;
        if !parser.is_at_end() {
            return Err(parser.unexpected());
        }
        Ok(expr)
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut body = Vec::new();
        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        Ok(Program { body })
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let span = self.peek().span;
        let kind = match self.peek().kind {
            TokenKind::Semicolon => {
                self.advance();
                StmtKind::Empty
            }
            TokenKind::LBrace => StmtKind::Block(self.parse_block()?),
            TokenKind::Let | TokenKind::Const | TokenKind::Var => {
                let decl = self.parse_declaration(true)?;
                self.consume_semicolon()?;
                decl
            }
            TokenKind::If => self.parse_if()?,
            TokenKind::While => {
                self.advance();
                self.expect(TokenKind::LParen, "'(' after 'while'")?;
                let condition = self.parse_expression()?;
                self.expect(TokenKind::RParen, "')' after while condition")?;
                let body = Box::new(self.parse_statement()?);
                StmtKind::While { condition, body }
            }
            TokenKind::For => self.parse_for()?,
            TokenKind::Return => {
                self.advance();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.consume_semicolon()?;
                StmtKind::Return(value)
            }
            TokenKind::Throw => {
                self.advance();
                let value = self.parse_expression()?;
                self.consume_semicolon()?;
                StmtKind::Throw(value)
            }
            TokenKind::Break => {
                self.advance();
                self.consume_semicolon()?;
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance();
                self.consume_semicolon()?;
                StmtKind::Continue
            }
            TokenKind::Try => self.parse_try()?,
            TokenKind::Function => self.parse_function_declaration()?,
            _ => {
                let expr = self.parse_expression()?;
                self.consume_semicolon()?;
                StmtKind::Expression(expr)
            }
        };
        Ok(Stmt { kind, span })
    }

    /// Parse `{ stmt* }`.
    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut body = Vec::new();
        while self.peek().kind != TokenKind::RBrace {
            if self.is_at_end() {
                return Err(self.error("Expected '}' before end of script".into()));
            }
            body.push(self.parse_statement()?);
        }
        self.advance(); // consume }
        Ok(body)
    }

    /// Parse `let a = 1, b` without the terminating semicolon.
    fn parse_declaration(&mut self, require_const_init: bool) -> Result<StmtKind, ParseError> {
        let kind = match self.advance().kind {
            TokenKind::Let => DeclKind::Let,
            TokenKind::Const => DeclKind::Const,
            _ => DeclKind::Var,
        };

        let mut declarators = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let init = if self.peek().kind == TokenKind::Eq {
                self.advance();
                Some(self.parse_assignment()?)
            } else {
                if kind == DeclKind::Const && require_const_init {
                    return Err(self.error("Missing initializer in const declaration".into()));
                }
                None
            };
            declarators.push((name, init));

            if self.peek().kind != TokenKind::Comma {
                break;
            }
            self.advance();
        }

        Ok(StmtKind::Declaration { kind, declarators })
    }

    fn parse_if(&mut self) -> Result<StmtKind, ParseError> {
        self.advance(); // consume `if`
        self.expect(TokenKind::LParen, "'(' after 'if'")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen, "')' after if condition")?;
        let consequent = Box::new(self.parse_statement()?);

        let alternate = if self.peek().kind == TokenKind::Else {
            self.advance();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(StmtKind::If {
            condition,
            consequent,
            alternate,
        })
    }

    fn parse_for(&mut self) -> Result<StmtKind, ParseError> {
        self.advance(); // consume `for`
        self.expect(TokenKind::LParen, "'(' after 'for'")?;

        if let Some(iteration) = self.for_each_ahead() {
            let kind = match self.advance().kind {
                TokenKind::Let => DeclKind::Let,
                TokenKind::Const => DeclKind::Const,
                _ => DeclKind::Var,
            };
            let name = self.expect_identifier()?;
            self.advance(); // consume `of` / `in`
            let iterable = self.parse_expression()?;
            self.expect(TokenKind::RParen, "')' after for clause")?;
            let body = Box::new(self.parse_statement()?);
            return Ok(StmtKind::ForEach {
                kind,
                name,
                iteration,
                iterable,
                body,
            });
        }

        let init = match self.peek().kind {
            TokenKind::Semicolon => None,
            TokenKind::Let | TokenKind::Const | TokenKind::Var => {
                let span = self.peek().span;
                let kind = self.parse_declaration(true)?;
                Some(Box::new(Stmt { kind, span }))
            }
            _ => {
                let span = self.peek().span;
                let expr = self.parse_expression()?;
                Some(Box::new(Stmt {
                    kind: StmtKind::Expression(expr),
                    span,
                }))
            }
        };
        self.expect(TokenKind::Semicolon, "';' after for initializer")?;

        let condition = if self.peek().kind == TokenKind::Semicolon {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Semicolon, "';' after for condition")?;

        let update = if self.peek().kind == TokenKind::RParen {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::RParen, "')' after for clause")?;

        let body = Box::new(self.parse_statement()?);
        Ok(StmtKind::For {
            init,
            condition,
            update,
            body,
        })
    }

    /// Detect `let x of` / `const x in` right after `for (`.
    fn for_each_ahead(&self) -> Option<Iteration> {
        let decl = self.tokens.get(self.pos)?;
        if !matches!(decl.kind, TokenKind::Let | TokenKind::Const | TokenKind::Var) {
            return None;
        }
        if self.tokens.get(self.pos + 1)?.kind != TokenKind::Identifier {
            return None;
        }
        let keyword = self.tokens.get(self.pos + 2)?;
        match (&keyword.kind, &keyword.value) {
            (TokenKind::In, _) => Some(Iteration::In),
            (TokenKind::Identifier, TokenValue::Identifier(name)) if name == "of" => {
                Some(Iteration::Of)
            }
            _ => None,
        }
    }

    fn parse_try(&mut self) -> Result<StmtKind, ParseError> {
        self.advance(); // consume `try`
        let block = self.parse_block()?;

        let mut param = None;
        let mut handler = None;
        if self.peek().kind == TokenKind::Catch {
            self.advance();
            if self.peek().kind == TokenKind::LParen {
                self.advance();
                param = Some(self.expect_identifier()?);
                self.expect(TokenKind::RParen, "')' after catch parameter")?;
            }
            handler = Some(self.parse_block()?);
        }

        let finalizer = if self.peek().kind == TokenKind::Finally {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.error("Missing catch or finally after try".into()));
        }

        Ok(StmtKind::Try {
            block,
            param,
            handler,
            finalizer,
        })
    }

    fn parse_function_declaration(&mut self) -> Result<StmtKind, ParseError> {
        self.advance(); // consume `function`
        let name = self.expect_identifier()?;
        let params = self.parse_params()?;
        let body = Rc::new(ArrowBody::Block(self.parse_block()?));
        Ok(StmtKind::Function { name, params, body })
    }

    /// Parse `(a, b, c)`.
    fn parse_params(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect(TokenKind::LParen, "'(' before parameters")?;
        let mut params = Vec::new();
        while self.peek().kind != TokenKind::RParen {
            params.push(self.expect_identifier()?);
            if self.peek().kind == TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')' after parameters")?;
        Ok(params)
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Parse a full expression.
    pub fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expression, ParseError> {
        if self.arrow_ahead(self.pos) {
            return self.parse_arrow(false);
        }
        if self.peek().kind == TokenKind::Async && self.arrow_ahead(self.pos + 1) {
            self.advance(); // consume `async`
            return self.parse_arrow(true);
        }

        let start = self.peek().span;
        let left = self.parse_ternary()?;

        let op = match self.peek().kind {
            TokenKind::Eq => AssignOp::Assign,
            TokenKind::PlusEq => AssignOp::AddAssign,
            TokenKind::MinusEq => AssignOp::SubAssign,
            TokenKind::StarEq => AssignOp::MulAssign,
            TokenKind::SlashEq => AssignOp::DivAssign,
            TokenKind::PercentEq => AssignOp::ModAssign,
            _ => return Ok(left),
        };

        if !matches!(
            left.kind,
            ExprKind::Identifier(_) | ExprKind::Member { .. }
        ) {
            return Err(self.error("Invalid left-hand side in assignment".into()));
        }
        self.advance(); // consume operator
        let value = self.parse_assignment()?;
        let span = self.span_from(start);
        Ok(Expression {
            kind: ExprKind::Assignment {
                target: Box::new(left),
                op,
                value: Box::new(value),
            },
            span,
        })
    }

    /// Whether an arrow function starts at token `pos`.
    fn arrow_ahead(&self, pos: usize) -> bool {
        let Some(token) = self.tokens.get(pos) else {
            return false;
        };
        match token.kind {
            TokenKind::Identifier => self
                .tokens
                .get(pos + 1)
                .is_some_and(|t| t.kind == TokenKind::Arrow),
            TokenKind::LParen => {
                let mut depth = 0usize;
                for (i, t) in self.tokens.iter().enumerate().skip(pos) {
                    match t.kind {
                        TokenKind::LParen => depth += 1,
                        TokenKind::RParen => {
                            depth -= 1;
                            if depth == 0 {
                                return self
                                    .tokens
                                    .get(i + 1)
                                    .is_some_and(|t| t.kind == TokenKind::Arrow);
                            }
                        }
                        TokenKind::Eof => return false,
                        _ => {}
                    }
                }
                false
            }
            _ => false,
        }
    }

    fn parse_arrow(&mut self, is_async: bool) -> Result<Expression, ParseError> {
        let start = self.peek().span;
        let params = if self.peek().kind == TokenKind::Identifier {
            vec![self.expect_identifier()?]
        } else {
            self.parse_params()?
        };
        self.expect(TokenKind::Arrow, "'=>'")?;

        let body = if self.peek().kind == TokenKind::LBrace {
            ArrowBody::Block(self.parse_block()?)
        } else {
            ArrowBody::Expression(self.parse_assignment()?)
        };

        Ok(Expression {
            kind: ExprKind::Arrow {
                params,
                body: Rc::new(body),
                is_async,
            },
            span: self.span_from(start),
        })
    }

    fn parse_ternary(&mut self) -> Result<Expression, ParseError> {
        let start = self.peek().span;
        let condition = self.parse_binary(0)?;
        if self.peek().kind != TokenKind::Question {
            return Ok(condition);
        }
        self.advance(); // consume ?
        let consequent = self.parse_assignment()?;
        self.expect(TokenKind::Colon, "':' in conditional expression")?;
        let alternate = self.parse_assignment()?;
        Ok(Expression {
            kind: ExprKind::Ternary {
                condition: Box::new(condition),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            span: self.span_from(start),
        })
    }

    /// Precedence climbing over binary and logical operators.
    fn parse_binary(&mut self, min_prec: u8) -> Result<Expression, ParseError> {
        let start = self.peek().span;
        let mut left = self.parse_unary()?;

        loop {
            let Some((prec, op)) = binary_operator(self.peek().kind) else {
                break;
            };
            if prec <= min_prec {
                break;
            }
            self.advance(); // consume operator
            let right = self.parse_binary(prec)?;
            let span = self.span_from(start);
            let kind = match op {
                Operator::Binary(op) => ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                Operator::Logical(op) => ExprKind::Logical {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
            };
            left = Expression { kind, span };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let start = self.peek().span;
        let op = match self.peek().kind {
            TokenKind::Not => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Typeof => Some(UnaryOp::Typeof),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expression {
                kind: ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span: self.span_from(start),
            });
        }

        match self.peek().kind {
            TokenKind::Await => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expression {
                    kind: ExprKind::Await(Box::new(operand)),
                    span: self.span_from(start),
                })
            }
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = if self.advance().kind == TokenKind::PlusPlus {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                let operand = self.parse_unary()?;
                self.check_update_target(&operand)?;
                Ok(Expression {
                    kind: ExprKind::Update {
                        operand: Box::new(operand),
                        op,
                        prefix: true,
                    },
                    span: self.span_from(start),
                })
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let start = self.peek().span;
        let expr = self.parse_call_member()?;

        let op = match self.peek() {
            t if t.newline_before => return Ok(expr),
            t if t.kind == TokenKind::PlusPlus => UpdateOp::Increment,
            t if t.kind == TokenKind::MinusMinus => UpdateOp::Decrement,
            _ => return Ok(expr),
        };
        self.check_update_target(&expr)?;
        self.advance();
        Ok(Expression {
            kind: ExprKind::Update {
                operand: Box::new(expr),
                op,
                prefix: false,
            },
            span: self.span_from(start),
        })
    }

    fn check_update_target(&self, expr: &Expression) -> Result<(), ParseError> {
        match expr.kind {
            ExprKind::Identifier(_) | ExprKind::Member { .. } => Ok(()),
            _ => Err(self.error("Invalid operand for update operator".into())),
        }
    }

    fn parse_call_member(&mut self) -> Result<Expression, ParseError> {
        let start = self.peek().span;
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek().kind {
                TokenKind::Dot => {
                    self.advance();
                    let property = self.parse_property_name()?;
                    expr = self.member(expr, property, false, false, start);
                }
                TokenKind::OptionalChain => {
                    self.advance();
                    match self.peek().kind {
                        TokenKind::LParen => {
                            let arguments = self.parse_arguments()?;
                            expr = Expression {
                                kind: ExprKind::Call {
                                    callee: Box::new(expr),
                                    arguments,
                                    optional: true,
                                },
                                span: self.span_from(start),
                            };
                        }
                        TokenKind::LBracket => {
                            self.advance();
                            let property = self.parse_expression()?;
                            self.expect(TokenKind::RBracket, "']'")?;
                            expr = self.member(expr, property, true, true, start);
                        }
                        _ => {
                            let property = self.parse_property_name()?;
                            expr = self.member(expr, property, false, true, start);
                        }
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let property = self.parse_expression()?;
                    self.expect(TokenKind::RBracket, "']'")?;
                    expr = self.member(expr, property, true, false, start);
                }
                TokenKind::LParen => {
                    let arguments = self.parse_arguments()?;
                    expr = Expression {
                        kind: ExprKind::Call {
                            callee: Box::new(expr),
                            arguments,
                            optional: false,
                        },
                        span: self.span_from(start),
                    };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn member(
        &self,
        object: Expression,
        property: Expression,
        computed: bool,
        optional: bool,
        start: Span,
    ) -> Expression {
        Expression {
            kind: ExprKind::Member {
                object: Box::new(object),
                property: Box::new(property),
                computed,
                optional,
            },
            span: self.span_from(start),
        }
    }

    /// A property name after `.`; keywords are allowed.
    fn parse_property_name(&mut self) -> Result<Expression, ParseError> {
        let token = self.peek().clone();
        match token.value {
            TokenValue::Identifier(name) => {
                self.advance();
                Ok(Expression {
                    kind: ExprKind::String(name),
                    span: token.span,
                })
            }
            _ => Err(self.error("Expected property name after '.'".into())),
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut arguments = Vec::new();
        while self.peek().kind != TokenKind::RParen {
            arguments.push(self.parse_assignment()?);
            if self.peek().kind == TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')' after arguments")?;
        Ok(arguments)
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let token = self.peek().clone();
        let kind = match (token.kind, token.value) {
            (TokenKind::Number, TokenValue::Number(n)) => {
                self.advance();
                ExprKind::Number(n)
            }
            (TokenKind::String, TokenValue::String(s)) => {
                self.advance();
                ExprKind::String(s)
            }
            (TokenKind::Boolean, TokenValue::Boolean(b)) => {
                self.advance();
                ExprKind::Boolean(b)
            }
            (TokenKind::Null, _) => {
                self.advance();
                ExprKind::Null
            }
            (TokenKind::Undefined, _) => {
                self.advance();
                ExprKind::Undefined
            }
            (TokenKind::Identifier, TokenValue::Identifier(name)) => {
                self.advance();
                ExprKind::Identifier(name)
            }
            (TokenKind::LParen, _) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                return Ok(expr);
            }
            (TokenKind::LBracket, _) => self.parse_array()?,
            (TokenKind::LBrace, _) => self.parse_object()?,
            (TokenKind::Function, _) => {
                self.advance();
                if self.peek().kind == TokenKind::Identifier {
                    self.advance(); // name of a function expression is not bound
                }
                let params = self.parse_params()?;
                let body = Rc::new(ArrowBody::Block(self.parse_block()?));
                ExprKind::Arrow {
                    params,
                    body,
                    is_async: false,
                }
            }
            _ => return Err(self.unexpected()),
        };

        Ok(Expression {
            kind,
            span: self.span_from(token.span),
        })
    }

    fn parse_array(&mut self) -> Result<ExprKind, ParseError> {
        self.advance(); // consume [
        let mut items = Vec::new();
        while self.peek().kind != TokenKind::RBracket {
            items.push(self.parse_assignment()?);
            if self.peek().kind == TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBracket, "']' after array elements")?;
        Ok(ExprKind::Array(items))
    }

    fn parse_object(&mut self) -> Result<ExprKind, ParseError> {
        self.advance(); // consume {
        let mut props = Vec::new();
        while self.peek().kind != TokenKind::RBrace {
            let token = self.advance().clone();
            let key = match token.value {
                TokenValue::Identifier(name) => name,
                TokenValue::String(s) => s,
                TokenValue::Number(n) => crate::value::format_number(n),
                _ => return Err(self.error("Expected property key in object literal".into())),
            };

            if self.peek().kind == TokenKind::Colon {
                self.advance();
                let value = self.parse_assignment()?;
                props.push(ObjectProperty {
                    key,
                    value,
                    shorthand: false,
                });
            } else if token.kind == TokenKind::Identifier {
                props.push(ObjectProperty {
                    value: Expression {
                        kind: ExprKind::Identifier(key.clone()),
                        span: token.span,
                    },
                    key,
                    shorthand: true,
                });
            } else {
                return Err(self.error(format!("Expected ':' after property '{key}'")));
            }

            if self.peek().kind == TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "'}' after object properties")?;
        Ok(ExprKind::Object(props))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn peek(&self) -> &Token {
        // The token stream always ends with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> &Token {
        let index = self.pos.min(self.tokens.len() - 1);
        if !self.is_at_end() {
            self.pos += 1;
        }
        &self.tokens[index]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn at_statement_end(&self) -> bool {
        let token = self.peek();
        token.newline_before
            || matches!(
                token.kind,
                TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
            )
    }

    /// Accept an explicit `;` or an implied one before `}`, end of input or a line break.
    fn consume_semicolon(&mut self) -> Result<(), ParseError> {
        if self.peek().kind == TokenKind::Semicolon {
            self.advance();
            return Ok(());
        }
        if self.at_statement_end() {
            return Ok(());
        }
        Err(self.unexpected())
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), ParseError> {
        if self.peek().kind != kind {
            return Err(self.error(format!("Expected {what}, found {}", describe(self.peek()))));
        }
        self.advance();
        Ok(())
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        let token = self.peek().clone();
        match (token.kind, &token.value) {
            (TokenKind::Identifier, TokenValue::Identifier(name)) => {
                self.advance();
                Ok(name.clone())
            }
            _ => Err(self.error(format!("Expected identifier, found {}", describe(&token)))),
        }
    }

    fn span_from(&self, start: Span) -> Span {
        let end = self
            .pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(start.end, |t| t.span.end);
        Span::new(start.start, end.max(start.start), start.line, start.column)
    }

    fn unexpected(&self) -> ParseError {
        self.error(format!("Unexpected {}", describe(self.peek())))
    }

    fn error(&self, message: String) -> ParseError {
        let token = self.peek();
        ParseError {
            message,
            line: token.span.line,
            column: token.span.column,
        }
    }
}

enum Operator {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

/// Binding power and operator for a binary token.
fn binary_operator(kind: TokenKind) -> Option<(u8, Operator)> {
    let entry = match kind {
        TokenKind::QuestionQuestion => (1, Operator::Logical(LogicalOp::NullishCoalescing)),
        TokenKind::Or => (2, Operator::Logical(LogicalOp::Or)),
        TokenKind::And => (3, Operator::Logical(LogicalOp::And)),
        TokenKind::EqEq => (4, Operator::Binary(BinaryOp::Eq)),
        TokenKind::NotEq => (4, Operator::Binary(BinaryOp::Neq)),
        TokenKind::StrictEq => (4, Operator::Binary(BinaryOp::StrictEq)),
        TokenKind::StrictNotEq => (4, Operator::Binary(BinaryOp::StrictNeq)),
        TokenKind::Lt => (5, Operator::Binary(BinaryOp::Lt)),
        TokenKind::Gt => (5, Operator::Binary(BinaryOp::Gt)),
        TokenKind::Lte => (5, Operator::Binary(BinaryOp::Lte)),
        TokenKind::Gte => (5, Operator::Binary(BinaryOp::Gte)),
        TokenKind::Plus => (6, Operator::Binary(BinaryOp::Add)),
        TokenKind::Minus => (6, Operator::Binary(BinaryOp::Sub)),
        TokenKind::Star => (7, Operator::Binary(BinaryOp::Mul)),
        TokenKind::Slash => (7, Operator::Binary(BinaryOp::Div)),
        TokenKind::Percent => (7, Operator::Binary(BinaryOp::Mod)),
        _ => return None,
    };
    Some(entry)
}

fn describe(token: &Token) -> String {
    match &token.value {
        _ if token.kind == TokenKind::Eof => "end of script".into(),
        TokenValue::Identifier(name) => format!("'{name}'"),
        TokenValue::String(s) => format!("string '{s}'"),
        TokenValue::Number(n) => format!("number {n}"),
        TokenValue::Boolean(b) => format!("'{b}'"),
        TokenValue::None => format!("token {:?}", token.kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Program {
        Parser::parse(source).unwrap()
    }

    fn expr(source: &str) -> ExprKind {
        Parser::parse_expression_source(source).unwrap().kind
    }

    fn stmt_kinds(source: &str) -> Vec<StmtKind> {
        parse(source).body.into_iter().map(|s| s.kind).collect()
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    #[test]
    fn test_identifier() {
        assert_eq!(expr("count"), ExprKind::Identifier("count".into()));
    }

    #[test]
    fn test_precedence() {
        match expr("1 + 2 * 3") {
            ExprKind::Binary { op, right, .. } => {
                assert_eq!(op, BinaryOp::Add);
                assert!(matches!(
                    right.kind,
                    ExprKind::Binary {
                        op: BinaryOp::Mul,
                        ..
                    }
                ));
            }
            other => panic!("Expected Binary, got {other:?}"),
        }
    }

    #[test]
    fn test_left_associative_subtraction() {
        match expr("10 - 4 - 3") {
            ExprKind::Binary { left, op, .. } => {
                assert_eq!(op, BinaryOp::Sub);
                assert!(matches!(
                    left.kind,
                    ExprKind::Binary {
                        op: BinaryOp::Sub,
                        ..
                    }
                ));
            }
            other => panic!("Expected Binary, got {other:?}"),
        }
    }

    #[test]
    fn test_logical_operators() {
        assert!(matches!(
            expr("a || b && c"),
            ExprKind::Logical {
                op: LogicalOp::Or,
                ..
            }
        ));
        assert!(matches!(
            expr("a ?? 'x'"),
            ExprKind::Logical {
                op: LogicalOp::NullishCoalescing,
                ..
            }
        ));
    }

    #[test]
    fn test_member_call_chain() {
        match expr("tp.file.include('a')") {
            ExprKind::Call {
                callee, arguments, ..
            } => {
                assert_eq!(arguments.len(), 1);
                assert!(matches!(callee.kind, ExprKind::Member { computed: false, .. }));
            }
            other => panic!("Expected Call, got {other:?}"),
        }
    }

    #[test]
    fn test_keyword_property_name() {
        assert!(matches!(expr("p.catch"), ExprKind::Member { .. }));
    }

    #[test]
    fn test_optional_chaining() {
        assert!(matches!(
            expr("user?.name"),
            ExprKind::Member { optional: true, .. }
        ));
    }

    #[test]
    fn test_ternary() {
        assert!(matches!(expr("a ? 1 : 2"), ExprKind::Ternary { .. }));
    }

    #[test]
    fn test_arrow_single_param() {
        match expr("x => x + 1") {
            ExprKind::Arrow {
                params, is_async, ..
            } => {
                assert_eq!(params, vec!["x"]);
                assert!(!is_async);
            }
            other => panic!("Expected Arrow, got {other:?}"),
        }
    }

    #[test]
    fn test_async_arrow_with_block() {
        match expr("async (a, b) => { return a; }") {
            ExprKind::Arrow {
                params,
                body,
                is_async,
            } => {
                assert_eq!(params, vec!["a", "b"]);
                assert!(is_async);
                assert!(matches!(*body, ArrowBody::Block(_)));
            }
            other => panic!("Expected Arrow, got {other:?}"),
        }
    }

    #[test]
    fn test_parenthesized_is_not_arrow() {
        assert!(matches!(expr("(a + b) * 2"), ExprKind::Binary { .. }));
    }

    #[test]
    fn test_object_literal() {
        match expr("{ a: 1, 'b c': 2, d }") {
            ExprKind::Object(props) => {
                assert_eq!(props.len(), 3);
                assert_eq!(props[1].key, "b c");
                assert!(props[2].shorthand);
            }
            other => panic!("Expected Object, got {other:?}"),
        }
    }

    #[test]
    fn test_array_trailing_comma() {
        match expr("[1, 2,]") {
            ExprKind::Array(items) => assert_eq!(items.len(), 2),
            other => panic!("Expected Array, got {other:?}"),
        }
    }

    #[test]
    fn test_await() {
        assert!(matches!(expr("await Promise.all(x)"), ExprKind::Await(_)));
    }

    #[test]
    fn test_update_operators() {
        assert!(matches!(
            expr("i++"),
            ExprKind::Update {
                prefix: false,
                op: UpdateOp::Increment,
                ..
            }
        ));
        assert!(matches!(
            expr("--i"),
            ExprKind::Update {
                prefix: true,
                op: UpdateOp::Decrement,
                ..
            }
        ));
    }

    #[test]
    fn test_compound_assignment() {
        assert!(matches!(
            expr("tR += 'x'"),
            ExprKind::Assignment {
                op: AssignOp::AddAssign,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = Parser::parse_expression_source("1 = 2").unwrap_err();
        assert!(err.message.contains("Invalid left-hand side"));
    }

    // =========================================================================
    // Statements
    // =========================================================================

    #[test]
    fn test_empty_program() {
        assert!(parse("").body.is_empty());
    }

    #[test]
    fn test_declarations() {
        match &stmt_kinds("let a = 1, b;")[0] {
            StmtKind::Declaration { kind, declarators } => {
                assert_eq!(*kind, DeclKind::Let);
                assert_eq!(declarators.len(), 2);
                assert!(declarators[1].1.is_none());
            }
            other => panic!("Expected Declaration, got {other:?}"),
        }
    }

    #[test]
    fn test_const_requires_initializer() {
        let err = Parser::parse("const a;").unwrap_err();
        assert!(err.message.contains("Missing initializer"));
    }

    #[test]
    fn test_if_else_across_tags() {
        // Shape produced when an if/else spans several execution tags.
        let kinds = stmt_kinds(" if (x) { ;\ntR += 'a';\n } else { ;\ntR += 'b';\n } ;\n");
        assert_eq!(kinds.len(), 2);
        match &kinds[0] {
            StmtKind::If {
                consequent,
                alternate,
                ..
            } => {
                assert!(matches!(consequent.kind, StmtKind::Block(ref b) if b.len() == 2));
                assert!(alternate.is_some());
            }
            other => panic!("Expected If, got {other:?}"),
        }
        assert_eq!(kinds[1], StmtKind::Empty);
    }

    #[test]
    fn test_automatic_semicolon_on_newline() {
        assert_eq!(stmt_kinds("let a = 1\nlet b = 2").len(), 2);
    }

    #[test]
    fn test_missing_semicolon_on_same_line() {
        assert!(Parser::parse("let a = 1 let b = 2").is_err());
    }

    #[test]
    fn test_return_newline_returns_nothing() {
        let kinds = stmt_kinds("return\n1");
        assert_eq!(kinds[0], StmtKind::Return(None));
    }

    #[test]
    fn test_for_loop() {
        assert!(matches!(
            stmt_kinds("for (let i = 0; i < 3; i++) { tR += i; }")[0],
            StmtKind::For { .. }
        ));
    }

    #[test]
    fn test_for_of_and_in() {
        assert!(matches!(
            stmt_kinds("for (const x of items) {}")[0],
            StmtKind::ForEach {
                iteration: Iteration::Of,
                ..
            }
        ));
        assert!(matches!(
            stmt_kinds("for (const k in obj) {}")[0],
            StmtKind::ForEach {
                iteration: Iteration::In,
                ..
            }
        ));
    }

    #[test]
    fn test_try_catch_finally() {
        match &stmt_kinds("try { a(); } catch (e) { b(); } finally { c(); }")[0] {
            StmtKind::Try {
                param,
                handler,
                finalizer,
                ..
            } => {
                assert_eq!(param.as_deref(), Some("e"));
                assert!(handler.is_some());
                assert!(finalizer.is_some());
            }
            other => panic!("Expected Try, got {other:?}"),
        }
    }

    #[test]
    fn test_try_without_handler() {
        assert!(Parser::parse("try { a(); }").is_err());
    }

    #[test]
    fn test_function_declaration() {
        match &stmt_kinds("function add(a, b) { return a + b }")[0] {
            StmtKind::Function { name, params, .. } => {
                assert_eq!(name, "add");
                assert_eq!(params.len(), 2);
            }
            other => panic!("Expected Function, got {other:?}"),
        }
    }

    #[test]
    fn test_unclosed_block() {
        let err = Parser::parse("if (a) {").unwrap_err();
        assert!(err.message.contains("Expected '}'"));
    }

    #[test]
    fn test_binding_name_must_be_identifier() {
        let err = Parser::parse("let 5 = 1;").unwrap_err();
        assert_eq!(err.message, "Expected identifier, found number 5");

        let err = Parser::parse("try {} catch ('e') {}").unwrap_err();
        assert_eq!(err.message, "Expected identifier, found string 'e'");
    }

    #[test]
    fn test_error_position() {
        let err = Parser::parse("let a = 1;\nlet = 2;").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 5);
    }
}
