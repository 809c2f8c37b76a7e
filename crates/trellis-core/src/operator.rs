//! Binary operators for sacks, traverser merging and memory reduction.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Binary operator over values.
///
/// The engine never assumes associativity or commutativity: callers apply an
/// operator strictly left to right along a single traverser's path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Sum,
    Minus,
    Mult,
    Div,
    Min,
    Max,
    /// Replace the left operand with the right one.
    Assign,
    And,
    Or,
    /// List concatenation.
    AddAll,
}

/// Failure while applying an [`Operator`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OperatorError {
    #[error("operator `{operator}` cannot combine {left} and {right}")]
    TypeMismatch {
        operator: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("integer overflow in `{0}`")]
    Overflow(&'static str),

    #[error("division by zero")]
    DivisionByZero,
}

impl Operator {
    pub const ALL: [Operator; 10] = [
        Operator::Sum,
        Operator::Minus,
        Operator::Mult,
        Operator::Div,
        Operator::Min,
        Operator::Max,
        Operator::Assign,
        Operator::And,
        Operator::Or,
        Operator::AddAll,
    ];

    /// Bytecode name of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Minus => "minus",
            Self::Mult => "mult",
            Self::Div => "div",
            Self::Min => "min",
            Self::Max => "max",
            Self::Assign => "assign",
            Self::And => "and",
            Self::Or => "or",
            Self::AddAll => "addAll",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }

    /// Compute `left <op> right`.
    pub fn apply(self, left: &Value, right: &Value) -> Result<Value, OperatorError> {
        match self {
            Self::Assign => Ok(right.clone()),
            Self::Sum => self.arithmetic(left, right, i64::checked_add, |a, b| a + b),
            Self::Minus => self.arithmetic(left, right, i64::checked_sub, |a, b| a - b),
            Self::Mult => self.arithmetic(left, right, i64::checked_mul, |a, b| a * b),
            Self::Div => {
                if let (Value::Int(_), Value::Int(0)) = (left, right) {
                    return Err(OperatorError::DivisionByZero);
                }
                self.arithmetic(left, right, i64::checked_div, |a, b| a / b)
            }
            Self::Min | Self::Max => {
                let ordering = left
                    .compare(right)
                    .ok_or_else(|| self.mismatch(left, right))?;
                let keep_left = match self {
                    Self::Min => ordering != Ordering::Greater,
                    _ => ordering != Ordering::Less,
                };
                Ok(if keep_left { left.clone() } else { right.clone() })
            }
            Self::And | Self::Or => match (left, right) {
                (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(if self == Self::And {
                    *a && *b
                } else {
                    *a || *b
                })),
                _ => Err(self.mismatch(left, right)),
            },
            Self::AddAll => match (left, right) {
                (Value::List(a), Value::List(b)) => {
                    let mut items = a.clone();
                    items.extend(b.iter().cloned());
                    Ok(Value::List(items))
                }
                _ => Err(self.mismatch(left, right)),
            },
        }
    }

    fn arithmetic(
        self,
        left: &Value,
        right: &Value,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Result<Value, OperatorError> {
        match (left, right) {
            (Value::Int(a), Value::Int(b)) => int_op(*a, *b)
                .map(Value::Int)
                .ok_or(OperatorError::Overflow(self.as_str())),
            _ => match (left.as_f64(), right.as_f64()) {
                (Some(a), Some(b)) => Ok(Value::Float(float_op(a, b))),
                _ => Err(self.mismatch(left, right)),
            },
        }
    }

    fn mismatch(self, left: &Value, right: &Value) -> OperatorError {
        OperatorError::TypeMismatch {
            operator: self.as_str(),
            left: left.type_name(),
            right: right.type_name(),
        }
    }
}
