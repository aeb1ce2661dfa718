use crate::config::ParserConfig;
use crate::token::Whitespace;

/// Classify a single character adjacent to a tag as a trim directive.
pub fn classify(config: &ParserConfig, ch: char) -> Option<Whitespace> {
    if ch == config.multiple_whitespace {
        Some(Whitespace::Multiple)
    } else if ch == config.single_whitespace {
        Some(Whitespace::Single)
    } else {
        None
    }
}

/// Classify the first character of `content`.
///
/// Returns the directive and the rest of the content; the marker is only
/// consumed when one is recognised.
pub fn split_leading<'a>(config: &ParserConfig, content: &'a str) -> (Option<Whitespace>, &'a str) {
    match content.chars().next() {
        Some(ch) => match classify(config, ch) {
            Some(ws) => (Some(ws), &content[ch.len_utf8()..]),
            None => (None, content),
        },
        None => (None, content),
    }
}

/// Classify the last character of `content`.
///
/// Returns the directive and the content with the marker removed.
pub fn split_trailing<'a>(config: &ParserConfig, content: &'a str) -> (Option<Whitespace>, &'a str) {
    match content.chars().next_back() {
        Some(ch) => match classify(config, ch) {
            Some(ws) => (Some(ws), &content[..content.len() - ch.len_utf8()]),
            None => (None, content),
        },
        None => (None, content),
    }
}
