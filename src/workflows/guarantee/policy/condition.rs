use serde::{Deserialize, Serialize};

use super::attributes::{resolve, Attribute, AttributeValue, EvaluationContext};

/// A single attribute comparison.
///
/// Every operator fails closed: an unknown or unset path never matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    /// Attribute equals a literal.
    Equal { path: String, value: AttributeValue },
    /// Single-valued attribute is a member of `values`.
    In { path: String, values: Vec<String> },
    /// Any member of a (possibly multi-valued) attribute is in `values`.
    AnyIn { path: String, values: Vec<String> },
    /// Two attribute paths resolve to the same value.
    ContextEq { path: String, other: String },
}

impl Condition {
    pub fn equal(path: impl Into<String>, value: AttributeValue) -> Self {
        Condition::Equal {
            path: path.into(),
            value,
        }
    }

    pub fn is_in<I, S>(path: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Condition::In {
            path: path.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn any_in<I, S>(path: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Condition::AnyIn {
            path: path.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn context_eq(path: impl Into<String>, other: impl Into<String>) -> Self {
        Condition::ContextEq {
            path: path.into(),
            other: other.into(),
        }
    }

    pub fn holds(&self, ctx: &EvaluationContext<'_>) -> bool {
        match self {
            Condition::Equal { path, value } => resolve(path, ctx).as_ref() == Some(value),
            Condition::In { path, values } => match resolve(path, ctx) {
                Some(AttributeValue::Text(actual)) => values.contains(&actual),
                _ => false,
            },
            Condition::AnyIn { path, values } => resolve(path, ctx).is_some_and(|actual| {
                actual
                    .members()
                    .into_iter()
                    .any(|member| values.iter().any(|value| value == member))
            }),
            Condition::ContextEq { path, other } => {
                match (resolve(path, ctx), resolve(other, ctx)) {
                    (Some(left), Some(right)) => left == right,
                    _ => false,
                }
            }
        }
    }

    /// Paths referenced by this condition that are outside the known attribute set.
    pub fn unknown_paths(&self) -> Vec<&str> {
        let paths: Vec<&str> = match self {
            Condition::Equal { path, .. }
            | Condition::In { path, .. }
            | Condition::AnyIn { path, .. } => vec![path.as_str()],
            Condition::ContextEq { path, other } => vec![path.as_str(), other.as_str()],
        };
        paths
            .into_iter()
            .filter(|path| Attribute::parse(path).is_none())
            .collect()
    }
}
