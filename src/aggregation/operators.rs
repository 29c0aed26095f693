//! The aggregation comparator table.
//!
//! Each entry maps an input-field suffix to one reduction and one comparison.
//! Deprecated names are ordinary entries pointing at the same reduction as
//! their canonical counterpart, so a legacy key and its replacement compile to
//! identical Cypher.

use crate::type_model::{ScalarField, ScalarKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Average,
    Min,
    Max,
    Sum,
    AverageLength,
    LongestLength,
    ShortestLength,
}

impl AggregateFunction {
    fn token(&self) -> &'static str {
        match self {
            AggregateFunction::Average => "AVERAGE",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::AverageLength => "AVERAGE_LENGTH",
            AggregateFunction::LongestLength => "LONGEST_LENGTH",
            AggregateFunction::ShortestLength => "SHORTEST_LENGTH",
        }
    }

    /// Cypher aggregate applied to the property, and whether it reduces `size(...)`.
    pub fn cypher(&self) -> (&'static str, bool) {
        match self {
            AggregateFunction::Average => ("avg", false),
            AggregateFunction::Min => ("min", false),
            AggregateFunction::Max => ("max", false),
            AggregateFunction::Sum => ("sum", false),
            AggregateFunction::AverageLength => ("avg", true),
            AggregateFunction::LongestLength => ("max", true),
            AggregateFunction::ShortestLength => ("min", true),
        }
    }

    pub fn measures_length(&self) -> bool {
        self.cypher().1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateComparison {
    Equal,
    Gt,
    Gte,
    Lt,
    Lte,
}

pub const COMPARISONS: [AggregateComparison; 5] = [
    AggregateComparison::Equal,
    AggregateComparison::Gt,
    AggregateComparison::Gte,
    AggregateComparison::Lt,
    AggregateComparison::Lte,
];

impl AggregateComparison {
    pub fn token(&self) -> &'static str {
        match self {
            AggregateComparison::Equal => "EQUAL",
            AggregateComparison::Gt => "GT",
            AggregateComparison::Gte => "GTE",
            AggregateComparison::Lt => "LT",
            AggregateComparison::Lte => "LTE",
        }
    }

    pub fn compare_op(&self) -> crate::cypher::CompareOp {
        use crate::cypher::CompareOp;
        match self {
            AggregateComparison::Equal => CompareOp::Eq,
            AggregateComparison::Gt => CompareOp::Gt,
            AggregateComparison::Gte => CompareOp::Gte,
            AggregateComparison::Lt => CompareOp::Lt,
            AggregateComparison::Lte => CompareOp::Lte,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregateComparator {
    /// Appended to the field name, e.g. `_SHORTEST_LENGTH_LT`
    pub suffix: String,
    pub function: AggregateFunction,
    pub comparison: AggregateComparison,
    pub deprecated: bool,
}

impl AggregateComparator {
    fn canonical(function: AggregateFunction, comparison: AggregateComparison) -> Self {
        AggregateComparator {
            suffix: format!("_{}_{}", function.token(), comparison.token()),
            function,
            comparison,
            deprecated: false,
        }
    }

    fn alias(suffix: String, function: AggregateFunction, comparison: AggregateComparison) -> Self {
        AggregateComparator {
            suffix,
            function,
            comparison,
            deprecated: true,
        }
    }

    /// Scalar type of the comparison value for a field of `kind`.
    pub fn value_type(&self, kind: &ScalarKind) -> String {
        match self.function {
            AggregateFunction::Average | AggregateFunction::AverageLength => "Float".to_string(),
            AggregateFunction::LongestLength | AggregateFunction::ShortestLength => {
                "Int".to_string()
            }
            AggregateFunction::Min | AggregateFunction::Max | AggregateFunction::Sum => {
                kind.type_name().to_string()
            }
        }
    }

    pub fn deprecation(&self) -> Option<String> {
        if !self.deprecated {
            return None;
        }
        let canonical = AggregateComparator::canonical(self.function, self.comparison);
        Some(format!("Please use the explicit {} version", canonical.suffix))
    }
}

/// Legacy unqualified comparators: `_GT/_GTE` read the largest value, `_LT/_LTE` the smallest.
fn unqualified_aliases(
    largest: AggregateFunction,
    smallest: AggregateFunction,
) -> Vec<AggregateComparator> {
    vec![
        AggregateComparator::alias("_GT".to_string(), largest, AggregateComparison::Gt),
        AggregateComparator::alias("_GTE".to_string(), largest, AggregateComparison::Gte),
        AggregateComparator::alias("_LT".to_string(), smallest, AggregateComparison::Lt),
        AggregateComparator::alias("_LTE".to_string(), smallest, AggregateComparison::Lte),
    ]
}

/// Every comparator generated for a field of `kind`, canonical entries first.
pub fn comparators_for(kind: &ScalarKind) -> Vec<AggregateComparator> {
    let mut comparators = Vec::new();

    if kind.is_numeric() {
        for function in [
            AggregateFunction::Average,
            AggregateFunction::Min,
            AggregateFunction::Max,
            AggregateFunction::Sum,
        ] {
            for comparison in COMPARISONS {
                comparators.push(AggregateComparator::canonical(function, comparison));
            }
        }
        comparators.extend(unqualified_aliases(AggregateFunction::Max, AggregateFunction::Min));
    } else if kind.is_textual() {
        let functions = [
            (AggregateFunction::AverageLength, "AVERAGE"),
            (AggregateFunction::LongestLength, "LONGEST"),
            (AggregateFunction::ShortestLength, "SHORTEST"),
        ];
        for (function, _) in functions {
            for comparison in COMPARISONS {
                comparators.push(AggregateComparator::canonical(function, comparison));
            }
        }
        for (function, legacy) in functions {
            for comparison in COMPARISONS {
                comparators.push(AggregateComparator::alias(
                    format!("_{}_{}", legacy, comparison.token()),
                    function,
                    comparison,
                ));
            }
        }
        comparators.extend(unqualified_aliases(
            AggregateFunction::LongestLength,
            AggregateFunction::ShortestLength,
        ));
    } else if kind.is_temporal() {
        for function in [AggregateFunction::Min, AggregateFunction::Max] {
            for comparison in COMPARISONS {
                comparators.push(AggregateComparator::canonical(function, comparison));
            }
        }
        comparators.extend(unqualified_aliases(AggregateFunction::Max, AggregateFunction::Min));
    }

    comparators
}

/// Resolve an aggregation-where key such as `name_SHORTEST_LENGTH_LT`.
pub fn parse_comparator<'f>(
    key: &str,
    fields: &'f [ScalarField],
) -> Option<(&'f ScalarField, AggregateComparator)> {
    let mut best: Option<(&'f ScalarField, AggregateComparator)> = None;
    for field in fields.iter().filter(|f| !f.is_list) {
        let Some(suffix) = key.strip_prefix(field.name.as_str()) else {
            continue;
        };
        if let Some(comparator) = comparators_for(&field.kind)
            .into_iter()
            .find(|c| c.suffix == suffix)
        {
            // a longer field name is a more specific match (`name` vs `name_AVERAGE`)
            let better = best
                .as_ref()
                .is_none_or(|(f, _)| field.name.len() > f.name.len());
            if better {
                best = Some((field, comparator));
            }
        }
    }
    best
}
