//! Positional interpolation templates.
//!
//! A template is literal text with `{i}` placeholders, where `i`
//! indexes the rule's source-field list. Anything that is not exactly
//! `{digits}` stays literal. Placeholder indexes are validated against
//! the source-field count at compile time.

use remap_model::Value;

use crate::error::ConfigError;

/// A compiled interpolation template.
#[derive(Debug, Clone)]
pub struct Template {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Placeholder(usize),
}

impl Template {
    /// Compile a template. `available` is the number of source fields
    /// the placeholders may index.
    pub fn parse(text: &str, available: usize) -> Result<Self, ConfigError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let chars: Vec<char> = text.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            if chars[i] == '{' {
                if let Some((index, end)) = read_placeholder(&chars, i) {
                    if index >= available {
                        return Err(ConfigError::PlaceholderOutOfRange { index, available });
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(index));
                    i = end;
                    continue;
                }
            }
            literal.push(chars[i]);
            i += 1;
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// Render with the values read for the rule's source fields, in
    /// order. Null renders as the empty string.
    pub fn render(&self, values: &[Value]) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(index) => {
                    if let Some(value) = values.get(*index) {
                        out.push_str(&value.coerce_string());
                    }
                }
            }
        }
        out
    }
}

/// Parse `{digits}` starting at `start` (which holds `{`). Returns the
/// index and the position after the closing brace.
fn read_placeholder(chars: &[char], start: usize) -> Option<(usize, usize)> {
    let mut i = start + 1;
    let digits_start = i;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits_start || chars.get(i) != Some(&'}') {
        return None;
    }
    let index: usize = chars[digits_start..i].iter().collect::<String>().parse().ok()?;
    Some((index, i + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_positional_values() {
        let template = Template::parse("Hello, {0}! You are {1} years old.", 2).unwrap();
        let rendered = template.render(&[Value::from("Dave"), Value::from(42i64)]);
        assert_eq!(rendered, "Hello, Dave! You are 42 years old.");
    }

    #[test]
    fn null_renders_empty() {
        let template = Template::parse("crimes: {0}.", 1).unwrap();
        assert_eq!(template.render(&[Value::Null]), "crimes: .");
    }

    #[test]
    fn non_placeholder_braces_stay_literal() {
        let template = Template::parse("{} {x} {0", 1).unwrap();
        assert_eq!(template.render(&[Value::from("v")]), "{} {x} {0");
    }

    #[test]
    fn out_of_range_index_is_config_error() {
        let err = Template::parse("{0} and {2}", 2).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::PlaceholderOutOfRange { index: 2, available: 2 }
        ));
    }

    #[test]
    fn repeated_placeholder_is_fine() {
        let template = Template::parse("{0}{0}", 1).unwrap();
        assert_eq!(template.render(&[Value::from("ab")]), "abab");
    }
}
