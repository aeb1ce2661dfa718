//! Tag configuration.
//!
//! A `ParserConfig` is built once per parser and replaced wholesale.
//! Serde support lets hosts load it from TOML or JSON; fields left out of
//! a file take their defaults.

use serde::{Deserialize, Serialize};

/// Invalid tag configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("The {0} tag must not be empty.")]
    EmptyTag(&'static str),
    #[error("The {0} tag must differ from the whitespace markers.")]
    TagIsWhitespaceMarker(&'static str),
    #[error("Interpolate and execution markers must differ.")]
    SameCommandMarkers,
    #[error("At most one of the interpolate and execution markers may be unset.")]
    NoCommandMarker,
    #[error("The command marker '{0}' collides with a whitespace marker.")]
    MarkerIsWhitespaceMarker(char),
    #[error("Single and multiple whitespace markers must differ.")]
    SameWhitespaceMarkers,
    #[error("'{0}' is not a valid accumulator name.")]
    InvalidAccumulator(String),
}

/// Delimiters and markers recognised by the scanner and code generator.
///
/// A command marker set to `None` makes that mode the default for tags
/// carrying no marker at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// The opening tag of a command.
    pub opening_tag: String,
    /// The closing tag of a command.
    pub closing_tag: String,
    /// Marker for interpolate mode.
    pub interpolate: Option<char>,
    /// Marker for execution mode.
    pub execution: Option<char>,
    /// Marker trimming a single line break.
    pub single_whitespace: char,
    /// Marker trimming all whitespace.
    pub multiple_whitespace: char,
    /// Name of the output accumulator variable in the generated script.
    pub accumulator: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            opening_tag: "<%".into(),
            closing_tag: "%>".into(),
            interpolate: None,
            execution: Some('*'),
            single_whitespace: '-',
            multiple_whitespace: '_',
            accumulator: "tR".into(),
        }
    }
}

impl ParserConfig {
    /// Check the invariants the scanner and code generator rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let markers = [self.single_whitespace, self.multiple_whitespace];
        if self.single_whitespace == self.multiple_whitespace {
            return Err(ConfigError::SameWhitespaceMarkers);
        }

        for (name, tag) in [("opening", &self.opening_tag), ("closing", &self.closing_tag)] {
            if tag.is_empty() {
                return Err(ConfigError::EmptyTag(name));
            }
            let mut chars = tag.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                if markers.contains(&c) {
                    return Err(ConfigError::TagIsWhitespaceMarker(name));
                }
            }
        }

        match (self.interpolate, self.execution) {
            (None, None) => return Err(ConfigError::NoCommandMarker),
            (Some(a), Some(b)) if a == b => return Err(ConfigError::SameCommandMarkers),
            _ => {}
        }
        for marker in [self.interpolate, self.execution].into_iter().flatten() {
            if markers.contains(&marker) {
                return Err(ConfigError::MarkerIsWhitespaceMarker(marker));
            }
        }

        if !is_identifier(&self.accumulator) {
            return Err(ConfigError::InvalidAccumulator(self.accumulator.clone()));
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ParserConfig::default();
        assert_eq!(config.opening_tag, "<%");
        assert_eq!(config.closing_tag, "%>");
        assert_eq!(config.interpolate, None);
        assert_eq!(config.execution, Some('*'));
        assert_eq!(config.accumulator, "tR");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_colliding_markers_rejected() {
        let config = ParserConfig {
            interpolate: Some('*'),
            ..ParserConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::SameCommandMarkers));
    }

    #[test]
    fn test_two_sentinels_rejected() {
        let config = ParserConfig {
            execution: None,
            ..ParserConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoCommandMarker));
    }

    #[test]
    fn test_both_markers_set_is_valid() {
        let config = ParserConfig {
            interpolate: Some('='),
            ..ParserConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_tag_rejected() {
        let config = ParserConfig {
            closing_tag: String::new(),
            ..ParserConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyTag("closing")));
    }

    #[test]
    fn test_tag_equal_to_marker_rejected() {
        let config = ParserConfig {
            opening_tag: "_".into(),
            ..ParserConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::TagIsWhitespaceMarker("opening"))
        );
    }

    #[test]
    fn test_marker_equal_to_whitespace_rejected() {
        let config = ParserConfig {
            execution: Some('-'),
            ..ParserConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::MarkerIsWhitespaceMarker('-'))
        );
    }

    #[test]
    fn test_invalid_accumulator_rejected() {
        let config = ParserConfig {
            accumulator: "1out".into(),
            ..ParserConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidAccumulator(_))
        ));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: ParserConfig =
            serde_json::from_str(r#"{ "opening_tag": "{{", "closing_tag": "}}" }"#).unwrap();
        assert_eq!(config.opening_tag, "{{");
        assert_eq!(config.closing_tag, "}}");
        assert_eq!(config.execution, Some('*'));
        assert_eq!(config.accumulator, "tR");
    }
}
