use nom::{
    branch::alt,
    character::complete::{char, digit1, one_of},
    combinator::{map, opt, recognize},
    error::context,
    multi::many0,
    sequence::{delimited, pair, preceded},
    Parser,
};

use super::{
    ast::{Directive, TypeAnnotation, Value},
    common::{block_string, name, string_literal, ws, PResult},
    errors::SdlParsingError,
};

fn number(input: &str) -> PResult<'_, Value<'_>> {
    let (rest, text) = recognize((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
        opt((one_of("eE"), opt(one_of("+-")), digit1)),
    ))
    .parse(input)?;

    let is_float = text.contains(|c: char| c == '.' || c == 'e' || c == 'E');
    let parsed = if is_float {
        text.parse::<f64>().ok().map(Value::Float)
    } else {
        text.parse::<i64>().ok().map(Value::Int)
    };

    match parsed {
        Some(value) => Ok((rest, value)),
        None => Err(nom::Err::Failure(SdlParsingError::invalid(
            input,
            "Numeric literal out of range",
        ))),
    }
}

fn name_value(input: &str) -> PResult<'_, Value<'_>> {
    map(name, |n| match n {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        "null" => Value::Null,
        other => Value::Enum(other),
    })
    .parse(input)
}

fn list_value(input: &str) -> PResult<'_, Value<'_>> {
    map(
        delimited(ws(char('[')), many0(ws(parse_value)), char(']')),
        Value::List,
    )
    .parse(input)
}

fn object_field(input: &str) -> PResult<'_, (&str, Value<'_>)> {
    let (input, key) = ws(name).parse(input)?;
    let (input, _) = ws(char(':')).parse(input)?;
    let (input, value) = ws(parse_value).parse(input)?;
    Ok((input, (key, value)))
}

fn object_value(input: &str) -> PResult<'_, Value<'_>> {
    map(
        delimited(ws(char('{')), many0(object_field), char('}')),
        Value::Object,
    )
    .parse(input)
}

/// Constant value: string, number, boolean, null, enum, list or object.
pub fn parse_value(input: &str) -> PResult<'_, Value<'_>> {
    context(
        "Expected a constant value",
        alt((
            map(block_string, Value::String),
            map(string_literal, Value::String),
            number,
            name_value,
            list_value,
            object_value,
        )),
    )
    .parse(input)
}

fn argument(input: &str) -> PResult<'_, (&str, Value<'_>)> {
    let (input, arg_name) = ws(name).parse(input)?;
    let (input, _) = ws(char(':')).parse(input)?;
    let (input, value) = ws(parse_value).parse(input)?;
    Ok((input, (arg_name, value)))
}

/// `@name` or `@name(arg: value, ...)`
pub fn parse_directive(input: &str) -> PResult<'_, Directive<'_>> {
    let (input, directive_name) = preceded(char('@'), name).parse(input)?;
    let (input, arguments) = opt(delimited(
        ws(char('(')),
        many0(argument),
        context("Unterminated directive arguments", char(')')),
    ))
    .parse(input)?;

    Ok((
        input,
        Directive {
            name: directive_name,
            arguments: arguments.unwrap_or_default(),
        },
    ))
}

pub fn parse_directives(input: &str) -> PResult<'_, Vec<Directive<'_>>> {
    many0(ws(parse_directive)).parse(input)
}

fn non_null_marker(input: &str) -> PResult<'_, bool> {
    map(opt(ws(char('!'))), |bang| bang.is_some()).parse(input)
}

fn list_type(input: &str) -> PResult<'_, TypeAnnotation<'_>> {
    let (input, item) =
        delimited(ws(char('[')), parse_type_annotation, ws(char(']'))).parse(input)?;
    let (input, non_null) = non_null_marker(input)?;
    Ok((
        input,
        TypeAnnotation::List {
            item: Box::new(item),
            non_null,
        },
    ))
}

fn named_type(input: &str) -> PResult<'_, TypeAnnotation<'_>> {
    let (input, type_name) = ws(name).parse(input)?;
    let (input, non_null) = non_null_marker(input)?;
    Ok((
        input,
        TypeAnnotation::Named {
            name: type_name,
            non_null,
        },
    ))
}

/// `Name`, `Name!`, `[Name]`, `[Name!]!` and deeper nestings.
pub fn parse_type_annotation(input: &str) -> PResult<'_, TypeAnnotation<'_>> {
    alt((list_type, named_type)).parse(input)
}
