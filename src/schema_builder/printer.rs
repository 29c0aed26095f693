//! SDL rendering of the generated catalogue.

use serde_json::Value;

use super::types::{ApiCatalogue, FieldDef, InputValueDef, TypeDefinition};

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(render_value).collect::<Vec<_>>().join(", ")
        ),
        Value::Object(entries) => format!(
            "{{ {} }}",
            entries
                .iter()
                .map(|(k, v)| format!("{}: {}", k, render_value(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        other => other.to_string(),
    }
}

fn render_deprecation(reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!(
            " @deprecated(reason: {})",
            render_value(&Value::String(reason.clone()))
        ),
        None => String::new(),
    }
}

fn render_input_value(input: &InputValueDef) -> String {
    let mut out = format!("{}: {}", input.name, input.ty);
    if let Some(default) = &input.default {
        out.push_str(&format!(" = {}", render_value(default)));
    }
    out.push_str(&render_deprecation(&input.deprecation));
    out
}

fn render_field(field: &FieldDef) -> String {
    let args = if field.args.is_empty() {
        String::new()
    } else {
        format!(
            "({})",
            field
                .args
                .iter()
                .map(render_input_value)
                .collect::<Vec<_>>()
                .join(", ")
        )
    };
    format!(
        "{}{}: {}{}",
        field.name,
        args,
        field.ty,
        render_deprecation(&field.deprecation)
    )
}

fn render_block(header: String, lines: Vec<String>) -> String {
    let mut out = header;
    out.push_str(" {\n");
    for line in lines {
        out.push_str("  ");
        out.push_str(&line);
        out.push('\n');
    }
    out.push('}');
    out
}

pub fn print_definition(definition: &TypeDefinition) -> String {
    match definition {
        TypeDefinition::Object(object) | TypeDefinition::Interface(object) => {
            let keyword = if matches!(definition, TypeDefinition::Interface(_)) {
                "interface"
            } else {
                "type"
            };
            let mut header = format!("{} {}", keyword, object.name);
            if !object.implements.is_empty() {
                header.push_str(&format!(" implements {}", object.implements.join(" & ")));
            }
            render_block(header, object.fields.iter().map(render_field).collect())
        }
        TypeDefinition::Union { name, members } => {
            format!("union {} = {}", name, members.join(" | "))
        }
        TypeDefinition::Input { name, fields } => render_block(
            format!("input {}", name),
            fields.iter().map(render_input_value).collect(),
        ),
        TypeDefinition::Enum { name, values } => {
            render_block(format!("enum {}", name), values.clone())
        }
        TypeDefinition::Scalar { name } => format!("scalar {}", name),
    }
}

/// Root operation types first, then every generated type by name.
pub fn print_catalogue(catalogue: &ApiCatalogue) -> String {
    let mut blocks = Vec::new();
    if !catalogue.query.is_empty() {
        blocks.push(render_block(
            "type Query".to_string(),
            catalogue.query.iter().map(render_field).collect(),
        ));
    }
    if !catalogue.mutation.is_empty() {
        blocks.push(render_block(
            "type Mutation".to_string(),
            catalogue.mutation.iter().map(render_field).collect(),
        ));
    }
    blocks.extend(catalogue.types.values().map(print_definition));
    let mut out = blocks.join("\n\n");
    out.push('\n');
    out
}
