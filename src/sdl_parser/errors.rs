use nom::error::{ContextError, ErrorKind, ParseError};
use thiserror::Error;

use super::common::position_of;

/// What a parser wanted when it stopped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expected {
    /// A bare nom combinator failure.
    Syntax(ErrorKind),
    /// A `context(...)` message such as "Expected a field type".
    Context(&'static str),
    /// A semantic check raised by one of our own parsers.
    Invalid(&'static str),
}

/// Parser error stack. Frames are pushed innermost first, each pointing at
/// the remaining input where that parser gave up.
#[derive(Debug, PartialEq)]
pub struct SdlParsingError<'a> {
    pub frames: Vec<(&'a str, Expected)>,
}

impl<'a> SdlParsingError<'a> {
    pub fn invalid(input: &'a str, message: &'static str) -> Self {
        SdlParsingError {
            frames: vec![(input, Expected::Invalid(message))],
        }
    }

    /// Position the most specific frame inside `source`.
    ///
    /// Labelled frames win over raw combinator failures, and the innermost
    /// label wins over the ones that wrap it.
    pub fn locate(&self, source: &str) -> SyntaxError {
        let labelled = self
            .frames
            .iter()
            .find(|(_, expected)| !matches!(expected, Expected::Syntax(_)));
        match labelled.or(self.frames.first()) {
            Some((rest, expected)) => {
                let message = match expected {
                    Expected::Syntax(kind) => format!("unexpected input ({:?})", kind),
                    Expected::Context(message) | Expected::Invalid(message) => (*message).to_string(),
                };
                SyntaxError::at(source, rest, message)
            }
            None => SyntaxError::at(source, source, "unable to parse type definitions"),
        }
    }
}

impl<'a> ParseError<&'a str> for SdlParsingError<'a> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        SdlParsingError {
            frames: vec![(input, Expected::Syntax(kind))],
        }
    }

    fn append(input: &'a str, kind: ErrorKind, mut other: Self) -> Self {
        other.frames.push((input, Expected::Syntax(kind)));
        other
    }
}

impl<'a> ContextError<&'a str> for SdlParsingError<'a> {
    fn add_context(input: &'a str, ctx: &'static str, mut other: Self) -> Self {
        other.frames.push((input, Expected::Context(ctx)));
        other
    }
}

impl<'a> From<nom::error::Error<&'a str>> for SdlParsingError<'a> {
    fn from(err: nom::error::Error<&'a str>) -> Self {
        SdlParsingError::from_error_kind(err.input, err.code)
    }
}

/// A parse failure positioned in the type definitions (1-based).
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message} at line {line}, column {column}")]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn at(source: &str, rest: &str, message: impl Into<String>) -> Self {
        let (line, column) = position_of(source, rest);
        SyntaxError {
            line,
            column,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_innermost_label_is_reported() {
        let source = "type User {\n  name: }";
        let rest = &source[20..];
        let error = SdlParsingError::from_error_kind(rest, ErrorKind::Tag);
        let error = SdlParsingError::add_context(rest, "Expected a field type", error);
        let error = SdlParsingError::add_context(&source[14..], "Expected a field definition", error);

        let located = error.locate(source);
        assert_eq!(located.line, 2);
        assert_eq!(located.column, 9);
        assert_eq!(located.to_string(), "Expected a field type at line 2, column 9");
    }

    #[test]
    fn test_raw_failure_without_labels() {
        let source = "type";
        let error = SdlParsingError::from_error_kind(&source[4..], ErrorKind::Char);
        let located = error.locate(source);
        assert_eq!((located.line, located.column), (1, 5));
        assert!(located.message.starts_with("unexpected input"));
    }
}
