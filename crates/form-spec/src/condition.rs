use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::result::{ResultTree, ResultValue};

pub const DEFAULT_DELIMITER: char = '.';

/// Comparison applied between a resolved answer and the expected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum Operator {
    #[default]
    #[serde(rename = "=", alias = "equals")]
    Equals,
    #[serde(rename = "!=", alias = "not_equals")]
    NotEquals,
}

/// Gate on a previously collected answer, addressed by dotted path.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub path: String,
    pub expected: ResultValue,
    pub operator: Operator,
}

impl Condition {
    pub fn new(
        path: impl Into<String>,
        expected: impl Into<ResultValue>,
        operator: Operator,
    ) -> Self {
        Self {
            path: path.into(),
            expected: expected.into(),
            operator,
        }
    }

    pub fn equals(path: impl Into<String>, expected: impl Into<ResultValue>) -> Self {
        Self::new(path, expected, Operator::Equals)
    }

    pub fn not_equals(path: impl Into<String>, expected: impl Into<ResultValue>) -> Self {
        Self::new(path, expected, Operator::NotEquals)
    }

    pub fn is_met(&self, results: &ResultTree) -> bool {
        let matches = match resolve(&self.path, results) {
            Some(value) => self.comparable(value).loose_eq(&self.expected),
            None => absent().loose_eq(&self.expected),
        };
        match self.operator {
            Operator::Equals => matches,
            Operator::NotEquals => !matches,
        }
    }

    // A sub-form result that carries an entry keyed by the full condition
    // path compares that entry instead of the whole tree.
    fn comparable<'a>(&self, value: &'a ResultValue) -> &'a ResultValue {
        match value {
            ResultValue::Tree(tree) => tree.get(&self.path).unwrap_or(value),
            _ => value,
        }
    }
}

fn absent() -> ResultValue {
    ResultValue::Text(String::new())
}

/// Resolve a dotted path against collected results.
pub fn resolve<'a>(path: &str, results: &'a ResultTree) -> Option<&'a ResultValue> {
    resolve_with(path, results, DEFAULT_DELIMITER)
}

/// Resolve a path split on `delimiter`; any missing segment yields `None`.
pub fn resolve_with<'a>(
    path: &str,
    results: &'a ResultTree,
    delimiter: char,
) -> Option<&'a ResultValue> {
    let mut segments = path.split(delimiter);
    let mut current = results.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            ResultValue::Tree(tree) => tree.get(segment)?,
            _ => return None,
        };
    }
    Some(current)
}

/// All conditions must hold; an empty set always passes.
pub fn evaluate(conditions: &[Condition], results: &ResultTree) -> bool {
    conditions.iter().all(|condition| {
        let met = condition.is_met(results);
        tracing::trace!(path = %condition.path, met, "condition evaluated");
        met
    })
}
