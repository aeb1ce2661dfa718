/// How a command's result reaches the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// The content is an expression whose value is spliced into the output.
    Interpolate,
    /// The content is a statement run for its side effects.
    Execution,
}

/// Whitespace trim directive on one edge of a tag.
///
/// An edge without a marker carries `None` (`Option<Whitespace>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whitespace {
    /// Remove one line break (`\r\n`, `\n` or `\r`) next to the tag.
    Single,
    /// Remove all whitespace next to the tag.
    Multiple,
}

/// A command tag with its markers stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandKind,
    pub opening_whitespace: Option<Whitespace>,
    pub closing_whitespace: Option<Whitespace>,
    pub content: String,
}

/// A token produced by the tag scanner, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Literal text, emitted verbatim after trimming.
    Text(String),
    /// A command tag.
    Command(Command),
}

