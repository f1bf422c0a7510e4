use crate::{
    ast::{Comparator, Connective, Node, Operand},
    value::{Record, Value, ValueKind},
};
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("field '{0}' is missing from the record")]
    MissingField(String),
    #[error("{field:?}: mismatching types => expected: {expected}, found: {actual}")]
    TypeMismatch {
        field: String,
        expected: ValueKind,
        actual: ValueKind,
    },
    #[error("{field:?}: comparator '{comparator}' is not defined for {kind} values")]
    UnsupportedComparison {
        field: String,
        comparator: Comparator,
        kind: ValueKind,
    },
}

/// Evaluate the tree against a record.
///
/// The left child of an operator is always evaluated first. An `AND` whose left side is false (or
/// an `OR` whose left side is true) returns without looking at its right side, so errors in the
/// right side only surface when it is needed.
///
/// ```rust
/// use rule_tree::{evaluate, parse, Record, Value};
///
/// let tree = parse("age > 30 AND department == 'Sales'").unwrap();
/// let mut record = Record::new();
/// record.insert("age".to_string(), Value::from(35));
/// record.insert("department".to_string(), Value::from("Sales"));
/// assert_eq!(Ok(true), evaluate(&tree, &record));
/// ```
pub fn evaluate(node: &Node, record: &Record) -> Result<bool, EvalError> {
    match node {
        Node::Operator {
            connective,
            left,
            right,
        } => match (connective, evaluate(left, record)?) {
            (Connective::And, false) => Ok(false),
            (Connective::Or, true) => Ok(true),
            _ => evaluate(right, record),
        },
        Node::Operand { operand } => operand.evaluate(record),
    }
}

impl Node {
    #[inline]
    pub fn evaluate(&self, record: &Record) -> Result<bool, EvalError> {
        evaluate(self, record)
    }
}

impl Operand {
    /// Compare the record's value for this field (on the left) with the literal (on the right).
    pub fn evaluate(&self, record: &Record) -> Result<bool, EvalError> {
        let value = record
            .get(&self.field)
            .ok_or_else(|| EvalError::MissingField(self.field.clone()))?;
        let ordering = match (value, &self.literal) {
            (Value::Number(actual), Value::Number(expected)) => actual.cmp(expected),
            (Value::String(actual), Value::String(expected)) => actual.cmp(expected),
            (Value::Boolean(_), Value::Boolean(_)) if self.comparator.is_ordering() => {
                return Err(EvalError::UnsupportedComparison {
                    field: self.field.clone(),
                    comparator: self.comparator,
                    kind: ValueKind::Boolean,
                });
            }
            (Value::Boolean(actual), Value::Boolean(expected)) => actual.cmp(expected),
            (actual, expected) => {
                return Err(EvalError::TypeMismatch {
                    field: self.field.clone(),
                    expected: expected.kind(),
                    actual: actual.kind(),
                });
            }
        };
        Ok(self.comparator.accepts(ordering))
    }
}

impl Comparator {
    #[inline]
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::GreaterThan => ordering == Ordering::Greater,
            Self::LessThan => ordering == Ordering::Less,
            Self::GreaterThanEqual => ordering != Ordering::Less,
            Self::LessThanEqual => ordering != Ordering::Greater,
            Self::Equal => ordering == Ordering::Equal,
            Self::NotEqual => ordering != Ordering::Equal,
        }
    }
}
