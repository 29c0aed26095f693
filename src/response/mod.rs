//! Response mapper: turns result rows and database counters into the value
//! of the root field, shaped by the original selection.
//!
//! Projections already key node maps by response key. The mapper drops the
//! extra keys added for sorting polymorphic results, adds connection cursors
//! and `pageInfo`, and builds mutation `info` objects from the counters.

pub mod cursor;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::schema_builder::RootKind;
use crate::translator::{ResponseShape, SelectedField};
use cursor::{cursor_to_offset, offset_to_cursor};

/// One result row keyed by column.
pub type Row = Map<String, Value>;

#[derive(Debug, Error, PartialEq)]
pub enum ResponseError {
    #[error("Result column `{column}` is missing")]
    MissingColumn { column: String },

    #[error("Result column `{column}` holds {found}, expected {expected}")]
    UnexpectedValue {
        column: String,
        expected: &'static str,
        found: String,
    },
}

/// Write counters reported by the database for one or more statements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStatistics {
    #[serde(default)]
    pub nodes_created: u64,
    #[serde(default)]
    pub nodes_deleted: u64,
    #[serde(default)]
    pub relationships_created: u64,
    #[serde(default)]
    pub relationships_deleted: u64,
    #[serde(default)]
    pub properties_set: u64,
}

impl QueryStatistics {
    pub fn merge(&mut self, other: &QueryStatistics) {
        self.nodes_created += other.nodes_created;
        self.nodes_deleted += other.nodes_deleted;
        self.relationships_created += other.relationships_created;
        self.relationships_deleted += other.relationships_deleted;
        self.properties_set += other.properties_set;
    }

    /// `CreateInfo`/`UpdateInfo`/`DeleteInfo` field values.
    fn info_value(&self, field: &str) -> Option<Value> {
        let value = match field {
            "nodesCreated" => self.nodes_created,
            "nodesDeleted" => self.nodes_deleted,
            "relationshipsCreated" => self.relationships_created,
            "relationshipsDeleted" => self.relationships_deleted,
            _ => return None,
        };
        Some(json!(value))
    }

    fn info(&self, selection: &[SelectedField]) -> Value {
        let mut info = Map::new();
        for field in selection {
            if let Some(value) = self.info_value(&field.name) {
                info.insert(field.response_key().to_string(), value);
            }
        }
        Value::Object(info)
    }
}

/// Value of the root field for `rows` returned by the translated statement.
pub fn map_response(
    shape: &ResponseShape,
    rows: &[Row],
    stats: &QueryStatistics,
) -> Result<Value, ResponseError> {
    let column = |row: &Row| -> Result<Value, ResponseError> {
        row.get(&shape.column)
            .cloned()
            .ok_or_else(|| ResponseError::MissingColumn {
                column: shape.column.clone(),
            })
    };

    match shape.kind {
        RootKind::Read => {
            let mut items = Vec::with_capacity(rows.len());
            for row in rows {
                let value = column(row)?;
                expect_object(&shape.column, &value)?;
                items.push(shape_value(&value, &shape.selection));
            }
            Ok(Value::Array(items))
        }
        RootKind::Aggregate => match rows.first() {
            Some(row) => Ok(shape_value(&column(row)?, &shape.selection)),
            None => Ok(Value::Null),
        },
        RootKind::Connection => match rows.first() {
            Some(row) => {
                let value = column(row)?;
                let object = expect_object(&shape.column, &value)?;
                Ok(shape_connection(object, &shape.args, &shape.selection))
            }
            None => Ok(Value::Null),
        },
        RootKind::Create | RootKind::Update => {
            // an update matching nothing still yields one row with an empty list
            let data = match rows.first() {
                Some(row) => column(row)?,
                None => Value::Array(vec![]),
            };
            if !data.is_array() {
                return Err(unexpected(&shape.column, "a list", &data));
            }
            let mut response = Map::new();
            for field in &shape.selection {
                let value = if Some(&field.name) == shape.data_field.as_ref() {
                    shape_value(&data, &field.selection)
                } else if field.name == "info" {
                    stats.info(&field.selection)
                } else {
                    continue;
                };
                response.insert(field.response_key().to_string(), value);
            }
            Ok(Value::Object(response))
        }
        RootKind::Delete => Ok(stats.info(&shape.selection)),
    }
}

fn expect_object<'v>(column: &str, value: &'v Value) -> Result<&'v Map<String, Value>, ResponseError> {
    value.as_object().ok_or_else(|| unexpected(column, "a map", value))
}

fn unexpected(column: &str, expected: &'static str, found: &Value) -> ResponseError {
    let found = match found {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    };
    ResponseError::UnexpectedValue {
        column: column.to_string(),
        expected,
        found: found.to_string(),
    }
}

/// Keep the selected keys of `value`, recursing into lists and maps.
fn shape_value(value: &Value, selection: &[SelectedField]) -> Value {
    if selection.is_empty() {
        return value.clone();
    }
    match value {
        Value::Array(items) => Value::Array(items.iter().map(|v| shape_value(v, selection)).collect()),
        Value::Object(object) => {
            let typename = object.get("__typename").and_then(Value::as_str);
            let mut shaped = Map::new();
            for field in selection {
                let key = field.response_key();
                if shaped.contains_key(key) {
                    continue;
                }
                let found = object.get(key).or_else(|| object.get(&field.name));
                let Some(found) = found else {
                    // fragment fields of other concrete types are absent
                    if field.on.is_none() || typename.is_none() {
                        shaped.insert(key.to_string(), Value::Null);
                    }
                    continue;
                };
                let value = match found {
                    Value::Object(connection) if is_connection(field, connection) => {
                        shape_connection(connection, &field.args, &field.selection)
                    }
                    other => shape_value(other, &field.selection),
                };
                shaped.insert(key.to_string(), value);
            }
            Value::Object(shaped)
        }
        other => other.clone(),
    }
}

fn is_connection(field: &SelectedField, object: &Map<String, Value>) -> bool {
    field.name.ends_with("Connection") && object.contains_key("edges") && object.contains_key("totalCount")
}

/// `{ edges, totalCount }` from the database plus cursors and `pageInfo`.
fn shape_connection(object: &Map<String, Value>, args: &Map<String, Value>, selection: &[SelectedField]) -> Value {
    let start = args
        .get("after")
        .and_then(Value::as_str)
        .and_then(cursor_to_offset)
        .map_or(0, |offset| offset.saturating_add(1));
    let edges: &[Value] = object
        .get("edges")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    let total = object.get("totalCount").and_then(Value::as_u64).unwrap_or(0);

    let mut shaped = Map::new();
    for field in selection {
        let value = match field.name.as_str() {
            "totalCount" => json!(total),
            "edges" => Value::Array(
                edges
                    .iter()
                    .enumerate()
                    .map(|(i, edge)| shape_edge(edge, start.saturating_add(i), &field.selection))
                    .collect(),
            ),
            "pageInfo" => {
                let end = start.saturating_add(edges.len());
                let cursor_at = |offset: usize| {
                    if edges.is_empty() {
                        Value::Null
                    } else {
                        Value::String(offset_to_cursor(offset))
                    }
                };
                let mut page_info = Map::new();
                for part in &field.selection {
                    let value = match part.name.as_str() {
                        "hasNextPage" => Value::Bool((end as u64) < total),
                        "hasPreviousPage" => Value::Bool(start > 0),
                        "startCursor" => cursor_at(start),
                        "endCursor" => cursor_at(end.saturating_sub(1)),
                        _ => continue,
                    };
                    page_info.insert(part.response_key().to_string(), value);
                }
                Value::Object(page_info)
            }
            _ => continue,
        };
        shaped.insert(field.response_key().to_string(), value);
    }
    Value::Object(shaped)
}

fn shape_edge(edge: &Value, offset: usize, selection: &[SelectedField]) -> Value {
    let mut shaped = Map::new();
    for field in selection {
        let value = match field.name.as_str() {
            "cursor" => Value::String(offset_to_cursor(offset)),
            "node" | "properties" => edge
                .get(&field.name)
                .map_or(Value::Null, |v| shape_value(v, &field.selection)),
            _ => continue,
        };
        shaped.insert(field.response_key().to_string(), value);
    }
    Value::Object(shaped)
}
