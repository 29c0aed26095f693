use nom::{
    branch::alt,
    character::complete::char,
    combinator::{cut, opt},
    error::context,
    multi::{many0, separated_list1},
    sequence::{delimited, preceded},
    Parser,
};

use super::{
    ast::{
        Definition, EnumDefinition, FieldDefinition, InterfaceDefinition, ObjectDefinition,
        UnionDefinition,
    },
    common::{description, keyword, name, ws, PResult},
    values::{parse_directives, parse_type_annotation},
};

fn field_definition(input: &str) -> PResult<'_, FieldDefinition<'_>> {
    let (input, _) = opt(ws(description)).parse(input)?;
    let (input, field_name) = ws(name).parse(input)?;
    let (input, _) = context("Expected ':' after field name", ws(char(':'))).parse(input)?;
    let (input, ty) = context("Expected a field type", parse_type_annotation).parse(input)?;
    let (input, directives) = parse_directives(input)?;

    Ok((
        input,
        FieldDefinition {
            name: field_name,
            ty,
            directives,
        },
    ))
}

fn fields_block(input: &str) -> PResult<'_, Vec<FieldDefinition<'_>>> {
    delimited(
        ws(char('{')),
        many0(field_definition),
        context("Expected '}' closing the field list", ws(char('}'))),
    )
    .parse(input)
}

fn implements_clause(input: &str) -> PResult<'_, Vec<&str>> {
    preceded(
        ws(keyword("implements")),
        preceded(
            opt(ws(char('&'))),
            separated_list1(ws(char('&')), ws(name)),
        ),
    )
    .parse(input)
}

fn object_definition(input: &str) -> PResult<'_, Definition<'_>> {
    let (input, _) = ws(keyword("type")).parse(input)?;
    let (input, type_name) = cut(ws(name)).parse(input)?;
    let (input, implements) = opt(implements_clause).parse(input)?;
    let (input, directives) = parse_directives(input)?;
    let (input, fields) = cut(fields_block).parse(input)?;

    Ok((
        input,
        Definition::Object(ObjectDefinition {
            name: type_name,
            implements: implements.unwrap_or_default(),
            directives,
            fields,
        }),
    ))
}

fn interface_definition(input: &str) -> PResult<'_, Definition<'_>> {
    let (input, _) = ws(keyword("interface")).parse(input)?;
    let (input, interface_name) = cut(ws(name)).parse(input)?;
    let (input, directives) = parse_directives(input)?;
    let (input, fields) = cut(fields_block).parse(input)?;

    Ok((
        input,
        Definition::Interface(InterfaceDefinition {
            name: interface_name,
            directives,
            fields,
        }),
    ))
}

fn union_definition(input: &str) -> PResult<'_, Definition<'_>> {
    let (input, _) = ws(keyword("union")).parse(input)?;
    let (input, union_name) = cut(ws(name)).parse(input)?;
    let (input, directives) = parse_directives(input)?;
    let (input, _) = cut(context("Expected '=' in union definition", ws(char('=')))).parse(input)?;
    let (input, _) = opt(ws(char('|'))).parse(input)?;
    let (input, members) = cut(separated_list1(ws(char('|')), ws(name))).parse(input)?;

    Ok((
        input,
        Definition::Union(UnionDefinition {
            name: union_name,
            directives,
            members,
        }),
    ))
}

fn enum_value(input: &str) -> PResult<'_, &str> {
    let (input, _) = opt(ws(description)).parse(input)?;
    let (input, value) = ws(name).parse(input)?;
    let (input, _) = parse_directives(input)?;
    Ok((input, value))
}

fn enum_definition(input: &str) -> PResult<'_, Definition<'_>> {
    let (input, _) = ws(keyword("enum")).parse(input)?;
    let (input, enum_name) = cut(ws(name)).parse(input)?;
    let (input, _) = parse_directives(input)?;
    let (input, values) = cut(delimited(
        ws(char('{')),
        many0(enum_value),
        ws(char('}')),
    ))
    .parse(input)?;

    Ok((
        input,
        Definition::Enum(EnumDefinition {
            name: enum_name,
            values,
        }),
    ))
}

pub fn parse_definition(input: &str) -> PResult<'_, Definition<'_>> {
    let (input, _) = opt(ws(description)).parse(input)?;
    alt((
        object_definition,
        interface_definition,
        union_definition,
        enum_definition,
    ))
    .parse(input)
}
