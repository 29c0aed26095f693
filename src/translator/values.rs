//! Scalar argument checking and binding.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

use super::{TranslationError, Translator};
use crate::cypher::Expr;
use crate::type_model::{ScalarKind, TypeModel};

fn invalid(path: &str, kind: &ScalarKind) -> TranslationError {
    TranslationError::validation_with_context(path, format!("expected a {} value", kind.type_name()))
}

fn parses_local_datetime(s: &str) -> bool {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").is_ok()
}

fn parses_local_time(s: &str) -> bool {
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f").is_ok()
        || NaiveTime::parse_from_str(s, "%H:%M").is_ok()
}

/// Check one (non-list) input value against a scalar kind.
pub(crate) fn validate_scalar(
    model: &TypeModel,
    kind: &ScalarKind,
    value: &Value,
    path: &str,
) -> Result<(), TranslationError> {
    let valid = match (kind, value) {
        (_, Value::Null) => true,
        (ScalarKind::Id, Value::String(_) | Value::Number(_)) => true,
        (ScalarKind::String, Value::String(_)) => true,
        (ScalarKind::Int, Value::Number(n)) => n.as_i64().is_some_and(|i| i32::try_from(i).is_ok()),
        (ScalarKind::BigInt, Value::Number(n)) => n.as_i64().is_some(),
        (ScalarKind::BigInt, Value::String(s)) => s.parse::<i64>().is_ok(),
        (ScalarKind::Float, Value::Number(_)) => true,
        (ScalarKind::Boolean, Value::Bool(_)) => true,
        (ScalarKind::DateTime, Value::String(s)) => {
            DateTime::parse_from_rfc3339(s).is_ok() || parses_local_datetime(s)
        }
        (ScalarKind::LocalDateTime, Value::String(s)) => parses_local_datetime(s),
        (ScalarKind::Date, Value::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
        // offsets are left to the database; only the clock part is checked here
        (ScalarKind::Time, Value::String(s)) => s.get(..8).is_some_and(parses_local_time),
        (ScalarKind::LocalTime, Value::String(s)) => parses_local_time(s),
        (ScalarKind::Duration, Value::String(s)) => s.starts_with('P') && s.len() > 1,
        (ScalarKind::Enum(name), Value::String(s)) => model
            .enum_type(name)
            .is_some_and(|e| e.values.iter().any(|v| v == s)),
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(invalid(path, kind))
    }
}

/// Turn a bound temporal parameter into a temporal value.
pub(crate) fn wrap_temporal(kind: &ScalarKind, expr: Expr, is_list: bool) -> Expr {
    let Some(constructor) = kind.temporal_function() else {
        return expr;
    };
    if is_list {
        Expr::ListComprehension {
            variable: "x".to_string(),
            list: Box::new(expr),
            filter: None,
            map: Some(Box::new(Expr::function(constructor, vec![Expr::var("x")]))),
        }
    } else {
        Expr::function(constructor, vec![expr])
    }
}

impl Translator<'_> {
    /// Check and bind a scalar input, returning the expression that reads it.
    ///
    /// `as_list` is set for list fields and for `_IN` operands.
    pub(crate) fn bind_scalar(
        &mut self,
        kind: &ScalarKind,
        value: &Value,
        as_list: bool,
        path: &str,
    ) -> Result<Expr, TranslationError> {
        if as_list && !value.is_null() {
            let items = value
                .as_array()
                .ok_or_else(|| TranslationError::validation_with_context(path, "expected a list"))?;
            for (i, item) in items.iter().enumerate() {
                validate_scalar(self.model, kind, item, &format!("{}[{}]", path, i))?;
            }
        } else {
            validate_scalar(self.model, kind, value, path)?;
        }
        let param = self.ctx.param(value.clone());
        if value.is_null() {
            return Ok(param);
        }
        Ok(wrap_temporal(kind, param, as_list))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cypher::ToCypher;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(ScalarKind::DateTime, json!("2024-03-01T10:00:00Z"), true ; "datetime with zone")]
    #[test_case(ScalarKind::DateTime, json!("yesterday"), false ; "datetime garbage")]
    #[test_case(ScalarKind::Date, json!("2024-02-30"), false ; "impossible date")]
    #[test_case(ScalarKind::LocalTime, json!("12:30:00.5"), true ; "local time fraction")]
    #[test_case(ScalarKind::Time, json!("12:30:00+01:00"), true ; "time with offset")]
    #[test_case(ScalarKind::Duration, json!("P1DT2H"), true ; "duration")]
    #[test_case(ScalarKind::Int, json!(3_000_000_000i64), false ; "int overflow")]
    #[test_case(ScalarKind::BigInt, json!("3000000000"), true ; "bigint string")]
    #[test_case(ScalarKind::Boolean, json!("true"), false ; "boolean as string")]
    fn test_validate_scalar(kind: ScalarKind, value: Value, ok: bool) {
        let model = TypeModel::default();
        assert_eq!(validate_scalar(&model, &kind, &value, "input").is_ok(), ok);
    }

    #[test]
    fn test_enum_values_are_checked() {
        let model = TypeModel::from_sdl("enum Genre { DRAMA COMEDY } type Movie { genre: Genre }")
            .unwrap();
        let kind = ScalarKind::Enum("Genre".to_string());
        assert!(validate_scalar(&model, &kind, &json!("DRAMA"), "g").is_ok());
        assert!(validate_scalar(&model, &kind, &json!("HORROR"), "g").is_err());
    }

    #[test]
    fn test_wrap_temporal_list() {
        let expr = wrap_temporal(&ScalarKind::Date, Expr::param("param0"), true);
        assert_eq!(expr.to_cypher(), "[x IN $param0 | date(x)]");
        let plain = wrap_temporal(&ScalarKind::String, Expr::param("param0"), false);
        assert_eq!(plain.to_cypher(), "$param0");
    }
}
