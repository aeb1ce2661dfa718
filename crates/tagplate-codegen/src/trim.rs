use tagplate_lexer::Whitespace;

/// Line breaks a single-line trim removes, longest first.
const LINE_BREAKS: [&str; 3] = ["\r\n", "\n", "\r"];

/// Apply a trim directive to one edge of literal text.
///
/// `trim_end` selects the trailing edge (text before a tag) instead of the
/// leading edge (text after a tag). A multiple-whitespace directive strips
/// every whitespace character at that edge; a single directive strips one
/// line break. When a trailing single trim finds no line break it falls
/// back to stripping a leading one.
pub fn trim_whitespace(text: &str, whitespace: Option<Whitespace>, trim_end: bool) -> &str {
    let Some(whitespace) = whitespace else {
        return text;
    };

    match (whitespace, trim_end) {
        (Whitespace::Multiple, true) => return text.trim_end_matches(is_trimmable),
        (Whitespace::Multiple, false) => return text.trim_start_matches(is_trimmable),
        (Whitespace::Single, true) => {
            if let Some(trimmed) = LINE_BREAKS.iter().find_map(|lb| text.strip_suffix(lb)) {
                return trimmed;
            }
        }
        (Whitespace::Single, false) => {}
    }

    LINE_BREAKS
        .iter()
        .find_map(|lb| text.strip_prefix(lb))
        .unwrap_or(text)
}

/// Unicode whitespace plus the byte order mark, which script engines also
/// strip when trimming.
fn is_trimmable(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_directive() {
        assert_eq!(trim_whitespace("\n a \n", None, true), "\n a \n");
    }

    #[test]
    fn test_multiple() {
        assert_eq!(trim_whitespace(" \n a \n\t", Some(Whitespace::Multiple), true), " \n a");
        assert_eq!(trim_whitespace(" \n a \n\t", Some(Whitespace::Multiple), false), "a \n\t");
    }

    #[test]
    fn test_multiple_strips_byte_order_mark() {
        assert_eq!(trim_whitespace("\u{feff} x", Some(Whitespace::Multiple), false), "x");
        assert_eq!(trim_whitespace("x\n\u{feff}", Some(Whitespace::Multiple), true), "x");
    }

    #[test]
    fn test_single_trailing() {
        assert_eq!(trim_whitespace("a\r\n", Some(Whitespace::Single), true), "a");
        assert_eq!(trim_whitespace("a\n\n", Some(Whitespace::Single), true), "a\n");
        assert_eq!(trim_whitespace("a\n\r", Some(Whitespace::Single), true), "a\n");
    }

    #[test]
    fn test_single_leading() {
        assert_eq!(trim_whitespace("\r\n\na", Some(Whitespace::Single), false), "\na");
        assert_eq!(trim_whitespace(" a", Some(Whitespace::Single), false), " a");
    }

    #[test]
    fn test_single_trailing_falls_back_to_leading() {
        assert_eq!(trim_whitespace("\na", Some(Whitespace::Single), true), "a");
    }
}
