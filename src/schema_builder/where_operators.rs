//! Scalar comparators accepted in `Where` inputs.
//!
//! The shape builder generates one input field per applicable operator and the
//! translator parses keys back with [`parse_where_key`]; both read the same table.

use crate::type_model::ScalarField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WhereOperator {
    Equal,
    Not,
    In,
    NotIn,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    NotContains,
    StartsWith,
    NotStartsWith,
    EndsWith,
    NotEndsWith,
    Includes,
    NotIncludes,
}

/// Generation order for input fields.
pub const ALL_OPERATORS: [WhereOperator; 16] = [
    WhereOperator::Equal,
    WhereOperator::Not,
    WhereOperator::In,
    WhereOperator::NotIn,
    WhereOperator::Lt,
    WhereOperator::Lte,
    WhereOperator::Gt,
    WhereOperator::Gte,
    WhereOperator::Contains,
    WhereOperator::NotContains,
    WhereOperator::StartsWith,
    WhereOperator::NotStartsWith,
    WhereOperator::EndsWith,
    WhereOperator::NotEndsWith,
    WhereOperator::Includes,
    WhereOperator::NotIncludes,
];

impl WhereOperator {
    pub fn suffix(&self) -> &'static str {
        match self {
            WhereOperator::Equal => "",
            WhereOperator::Not => "_NOT",
            WhereOperator::In => "_IN",
            WhereOperator::NotIn => "_NOT_IN",
            WhereOperator::Lt => "_LT",
            WhereOperator::Lte => "_LTE",
            WhereOperator::Gt => "_GT",
            WhereOperator::Gte => "_GTE",
            WhereOperator::Contains => "_CONTAINS",
            WhereOperator::NotContains => "_NOT_CONTAINS",
            WhereOperator::StartsWith => "_STARTS_WITH",
            WhereOperator::NotStartsWith => "_NOT_STARTS_WITH",
            WhereOperator::EndsWith => "_ENDS_WITH",
            WhereOperator::NotEndsWith => "_NOT_ENDS_WITH",
            WhereOperator::Includes => "_INCLUDES",
            WhereOperator::NotIncludes => "_NOT_INCLUDES",
        }
    }

    /// Negated forms are kept for compatibility; `NOT` composition replaces them.
    pub fn deprecation(&self) -> Option<&'static str> {
        match self {
            WhereOperator::Not => Some("Use NOT instead."),
            WhereOperator::NotIn
            | WhereOperator::NotContains
            | WhereOperator::NotStartsWith
            | WhereOperator::NotEndsWith
            | WhereOperator::NotIncludes => Some("Negation filters will be deprecated, use the NOT operator instead."),
            _ => None,
        }
    }

    /// The positive operator and whether this one negates it.
    pub fn positive(&self) -> (WhereOperator, bool) {
        match self {
            WhereOperator::Not => (WhereOperator::Equal, true),
            WhereOperator::NotIn => (WhereOperator::In, true),
            WhereOperator::NotContains => (WhereOperator::Contains, true),
            WhereOperator::NotStartsWith => (WhereOperator::StartsWith, true),
            WhereOperator::NotEndsWith => (WhereOperator::EndsWith, true),
            WhereOperator::NotIncludes => (WhereOperator::Includes, true),
            other => (*other, false),
        }
    }

    pub fn applies_to(&self, field: &ScalarField) -> bool {
        let (positive, _) = self.positive();
        if field.is_list {
            return matches!(positive, WhereOperator::Equal | WhereOperator::Includes);
        }
        match positive {
            WhereOperator::Equal | WhereOperator::In => true,
            WhereOperator::Lt | WhereOperator::Lte | WhereOperator::Gt | WhereOperator::Gte => {
                field.kind.is_ordered()
            }
            WhereOperator::Contains | WhereOperator::StartsWith | WhereOperator::EndsWith => {
                field.kind.is_textual()
            }
            _ => false,
        }
    }

    /// Input value shape: `(type name, is list)`.
    pub fn value_type(&self, field: &ScalarField) -> (String, bool) {
        let name = field.kind.type_name().to_string();
        match self.positive().0 {
            WhereOperator::Equal => (name, field.is_list),
            WhereOperator::In => (name, true),
            _ => (name, false),
        }
    }
}

/// Operators usable on a field, in generation order.
pub fn operators_for(field: &ScalarField) -> impl Iterator<Item = WhereOperator> + '_ {
    ALL_OPERATORS.into_iter().filter(move |op| op.applies_to(field))
}

/// Resolve a `Where` key such as `title_NOT_CONTAINS` to its field and operator.
pub fn parse_where_key<'f>(
    key: &str,
    fields: &'f [ScalarField],
) -> Option<(&'f ScalarField, WhereOperator)> {
    if let Some(field) = fields.iter().find(|f| f.name == key) {
        return Some((field, WhereOperator::Equal));
    }

    let mut by_suffix: Vec<WhereOperator> = ALL_OPERATORS
        .into_iter()
        .filter(|op| !op.suffix().is_empty())
        .collect();
    by_suffix.sort_by_key(|op| std::cmp::Reverse(op.suffix().len()));

    for op in by_suffix {
        if let Some(name) = key.strip_suffix(op.suffix()) {
            if let Some(field) = fields.iter().find(|f| f.name == name) {
                if op.applies_to(field) {
                    return Some((field, op));
                }
            }
        }
    }
    None
}
