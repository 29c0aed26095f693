use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, multispace1, none_of, one_of, satisfy},
    combinator::{map, not, opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated},
    IResult, Parser,
};

use super::errors::SdlParsingError;

pub type PResult<'a, O> = IResult<&'a str, O, SdlParsingError<'a>>;

fn comment(input: &str) -> PResult<'_, &str> {
    recognize(pair(char('#'), take_while(|c| c != '\n'))).parse(input)
}

/// Whitespace, comments and commas are all insignificant in type definitions.
pub fn ignored(input: &str) -> PResult<'_, ()> {
    value((), many0(alt((multispace1, comment, tag(","))))).parse(input)
}

pub fn ws<'a, O, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = SdlParsingError<'a>>
where
    F: Parser<&'a str, Output = O, Error = SdlParsingError<'a>>,
{
    delimited(ignored, inner, ignored)
}

pub fn name(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

/// Keyword that must not run into a longer name (`type` but not `types`).
pub fn keyword<'a>(
    kw: &'static str,
) -> impl Parser<&'a str, Output = &'a str, Error = SdlParsingError<'a>> {
    terminated(
        tag(kw),
        not(satisfy(|c: char| c.is_ascii_alphanumeric() || c == '_')),
    )
}

fn escaped_char(input: &str) -> PResult<'_, &str> {
    recognize(preceded(char('\\'), one_of("\"\\/bfnrtu"))).parse(input)
}

/// `"..."` string, returned without the quotes and with escapes left in place.
pub fn string_literal(input: &str) -> PResult<'_, &str> {
    map(
        delimited(
            char('"'),
            opt(recognize(many0(alt((
                recognize(none_of("\"\\\n")),
                escaped_char,
            ))))),
            char('"'),
        ),
        |s: Option<&str>| s.unwrap_or(""),
    )
    .parse(input)
}

pub fn block_string(input: &str) -> PResult<'_, &str> {
    delimited(tag("\"\"\""), take_until("\"\"\""), tag("\"\"\"")).parse(input)
}

/// Descriptions are accepted and discarded.
pub fn description(input: &str) -> PResult<'_, &str> {
    alt((block_string, string_literal)).parse(input)
}

/// 1-based line and column of `rest` inside `source`.
pub fn position_of(source: &str, rest: &str) -> (usize, usize) {
    let offset = source.len().saturating_sub(rest.len());
    let consumed = &source[..offset];
    let line = consumed.matches('\n').count() + 1;
    let column = consumed
        .rfind('\n')
        .map(|idx| offset - idx)
        .unwrap_or(offset + 1);
    (line, column)
}
