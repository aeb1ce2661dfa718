//! Abstract Syntax Tree for template scripts.
//!
//! Statement nodes cover the control flow users write in execution tags;
//! expression nodes cover everything that can appear in interpolate tags.

use std::rc::Rc;

/// A position in script text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

/// A complete script.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Stmt>,
}

/// A statement node.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Let,
    Const,
    Var,
}

/// Statement variants.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `;`
    Empty,

    /// `count++;`, `tR += 'x';`
    Expression(Expression),

    /// `let a = 1, b;`
    Declaration {
        kind: DeclKind,
        declarators: Vec<(String, Option<Expression>)>,
    },

    /// `function name(a, b) { ... }`
    Function {
        name: String,
        params: Vec<String>,
        body: Rc<ArrowBody>,
    },

    /// `{ ... }`
    Block(Vec<Stmt>),

    /// `if (cond) stmt else stmt`
    If {
        condition: Expression,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },

    /// `while (cond) stmt`
    While { condition: Expression, body: Box<Stmt> },

    /// `for (init; cond; update) stmt`
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expression>,
        update: Option<Expression>,
        body: Box<Stmt>,
    },

    /// `for (const x of items) stmt` and `for (const k in object) stmt`
    ForEach {
        kind: DeclKind,
        name: String,
        iteration: Iteration,
        iterable: Expression,
        body: Box<Stmt>,
    },

    Return(Option<Expression>),
    Throw(Expression),
    Break,
    Continue,

    /// `try { } catch (e) { } finally { }`
    Try {
        block: Vec<Stmt>,
        param: Option<String>,
        handler: Option<Vec<Stmt>>,
        finalizer: Option<Vec<Stmt>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iteration {
    /// `for ... of`: values of an array or characters of a string.
    Of,
    /// `for ... in`: keys of an object or indices of an array.
    In,
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// A complete expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExprKind,
    pub span: Span,
}

/// Expression variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Numeric literal: `42`, `3.14`
    Number(f64),

    /// String literal: `"hello"`, `'world'`
    String(String),

    /// Boolean literal: `true`, `false`
    Boolean(bool),

    /// Null literal
    Null,

    /// Undefined literal
    Undefined,

    /// Identifier: `tp`, `tR`
    Identifier(String),

    /// Binary operation: `a + b`, `count > 0`
    Binary {
        left: Box<Expression>,
        op: BinaryOp,
        right: Box<Expression>,
    },

    /// Short-circuit operation: `a && b`, `a || b`, `a ?? b`
    Logical {
        left: Box<Expression>,
        op: LogicalOp,
        right: Box<Expression>,
    },

    /// Unary operation: `!active`, `-count`, `typeof x`
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },

    /// Update operation: `count++`, `--count`
    Update {
        operand: Box<Expression>,
        op: UpdateOp,
        prefix: bool,
    },

    /// `await promise`
    Await(Box<Expression>),

    /// Member access: `tp.file`, `items[0]`, `user?.name`
    Member {
        object: Box<Expression>,
        property: Box<Expression>,
        computed: bool,
        optional: bool,
    },

    /// Function call: `save()`, `items.push(item)`, `fn?.()`
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
        optional: bool,
    },

    /// Ternary: `count > 0 ? 'yes' : 'no'`
    Ternary {
        condition: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
    },

    /// Object literal: `{ count: 0, name: 'test' }`
    Object(Vec<ObjectProperty>),

    /// Array literal: `[1, 2, 3]`
    Array(Vec<Expression>),

    /// Arrow function: `(x) => x + 1`, `async () => { ... }`
    Arrow {
        params: Vec<String>,
        body: Rc<ArrowBody>,
        is_async: bool,
    },

    /// Assignment: `count = 5`, `tR += 'x'`
    Assignment {
        target: Box<Expression>,
        op: AssignOp,
        value: Box<Expression>,
    },
}

/// Body of an arrow function or function declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Expression(Expression),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectProperty {
    pub key: String,
    pub value: Expression,
    pub shorthand: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    StrictEq,
    StrictNeq,
    Lt,
    Gt,
    Lte,
    Gte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    NullishCoalescing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    Typeof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
}

impl AssignOp {
    /// The binary operator a compound assignment applies.
    pub fn binary(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinaryOp::Add),
            AssignOp::SubAssign => Some(BinaryOp::Sub),
            AssignOp::MulAssign => Some(BinaryOp::Mul),
            AssignOp::DivAssign => Some(BinaryOp::Div),
            AssignOp::ModAssign => Some(BinaryOp::Mod),
        }
    }
}
