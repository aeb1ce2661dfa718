use crate::config::ParserConfig;
use crate::token::CommandKind;

/// Decide the mode of a tag from the characters following its opening tag.
///
/// An explicit marker is consumed. Without one, the mode whose marker is
/// unset in the config is the default and nothing is consumed. Returns
/// `None` when neither applies.
pub fn classify<'a>(config: &ParserConfig, content: &'a str) -> Option<(CommandKind, &'a str)> {
    let first = content.chars().next();

    if let Some(ch) = first {
        if Some(ch) == config.execution {
            return Some((CommandKind::Execution, &content[ch.len_utf8()..]));
        }
        if Some(ch) == config.interpolate {
            return Some((CommandKind::Interpolate, &content[ch.len_utf8()..]));
        }
    }

    if config.interpolate.is_none() {
        Some((CommandKind::Interpolate, content))
    } else if config.execution.is_none() {
        Some((CommandKind::Execution, content))
    } else {
        None
    }
}
