//! Predicates used by `has`, `is` and `where`.
//!
//! An operand is either a literal value or a label. Label operands are
//! resolved at run time against the traverser being tested, which is how
//! a value computed earlier in the pipeline feeds a later comparison.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use trellis_core::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredicateOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    /// Operand is a list; the value must equal one of its items.
    Within,
    Without,
    /// `lo <= value < hi`
    Between,
    /// `lo < value < hi`
    Inside,
    /// `value < lo || value > hi`
    Outside,
    StartingWith,
    EndingWith,
    Containing,
}

impl PredicateOp {
    pub const ALL: [PredicateOp; 14] = [
        Self::Eq,
        Self::Neq,
        Self::Lt,
        Self::Lte,
        Self::Gt,
        Self::Gte,
        Self::Within,
        Self::Without,
        Self::Between,
        Self::Inside,
        Self::Outside,
        Self::StartingWith,
        Self::EndingWith,
        Self::Containing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Within => "within",
            Self::Without => "without",
            Self::Between => "between",
            Self::Inside => "inside",
            Self::Outside => "outside",
            Self::StartingWith => "startingWith",
            Self::EndingWith => "endingWith",
            Self::Containing => "containing",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }

    /// Apply to a fully resolved operand.
    pub fn test(self, value: &Value, operand: &Value) -> bool {
        let ordering = || value.compare(operand);
        match self {
            Self::Eq => value.loose_eq(operand),
            Self::Neq => !value.loose_eq(operand),
            Self::Lt => ordering() == Some(Ordering::Less),
            Self::Lte => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
            Self::Gt => ordering() == Some(Ordering::Greater),
            Self::Gte => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
            Self::Within => as_items(operand).iter().any(|item| value.loose_eq(item)),
            Self::Without => !as_items(operand).iter().any(|item| value.loose_eq(item)),
            Self::Between | Self::Inside | Self::Outside => {
                let [lo, hi] = match as_items(operand) {
                    [lo, hi] => [lo, hi],
                    _ => return false,
                };
                let (Some(lo), Some(hi)) = (value.compare(lo), value.compare(hi)) else {
                    return false;
                };
                match self {
                    Self::Between => lo != Ordering::Less && hi == Ordering::Less,
                    Self::Inside => lo == Ordering::Greater && hi == Ordering::Less,
                    _ => lo == Ordering::Less || hi == Ordering::Greater,
                }
            }
            Self::StartingWith | Self::EndingWith | Self::Containing => {
                let (Some(s), Some(needle)) = (value.as_str(), operand.as_str()) else {
                    return false;
                };
                match self {
                    Self::StartingWith => s.starts_with(needle),
                    Self::EndingWith => s.ends_with(needle),
                    _ => s.contains(needle),
                }
            }
        }
    }
}

fn single_label(mut items: Vec<Value>) -> Operand {
    if let [Value::String(_)] = items.as_slice()
        && let Some(Value::String(label)) = items.pop()
    {
        return Operand::Label(label);
    }
    Operand::Value(Value::List(items))
}

fn as_items(operand: &Value) -> &[Value] {
    match operand {
        Value::List(items) => items,
        other => std::slice::from_ref(other),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Value(Value),
    /// Resolved from the traverser's path or the traversal's side-effects.
    Label(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum P {
    Test { op: PredicateOp, operand: Operand },
    And(Box<P>, Box<P>),
    Or(Box<P>, Box<P>),
    Not(Box<P>),
}

impl P {
    pub fn test(op: PredicateOp, operand: impl Into<Value>) -> Self {
        P::Test {
            op,
            operand: Operand::Value(operand.into()),
        }
    }

    pub fn eq(v: impl Into<Value>) -> Self {
        Self::test(PredicateOp::Eq, v)
    }

    pub fn neq(v: impl Into<Value>) -> Self {
        Self::test(PredicateOp::Neq, v)
    }

    pub fn lt(v: impl Into<Value>) -> Self {
        Self::test(PredicateOp::Lt, v)
    }

    pub fn lte(v: impl Into<Value>) -> Self {
        Self::test(PredicateOp::Lte, v)
    }

    pub fn gt(v: impl Into<Value>) -> Self {
        Self::test(PredicateOp::Gt, v)
    }

    pub fn gte(v: impl Into<Value>) -> Self {
        Self::test(PredicateOp::Gte, v)
    }

    /// `within(friends)` with a string argument is stored as a literal; the
    /// assembler turns it into a label reference inside `where`.
    pub fn within<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::test(
            PredicateOp::Within,
            Value::List(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn without<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::test(
            PredicateOp::Without,
            Value::List(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn between(lo: impl Into<Value>, hi: impl Into<Value>) -> Self {
        Self::test(PredicateOp::Between, Value::List(vec![lo.into(), hi.into()]))
    }

    pub fn inside(lo: impl Into<Value>, hi: impl Into<Value>) -> Self {
        Self::test(PredicateOp::Inside, Value::List(vec![lo.into(), hi.into()]))
    }

    pub fn outside(lo: impl Into<Value>, hi: impl Into<Value>) -> Self {
        Self::test(PredicateOp::Outside, Value::List(vec![lo.into(), hi.into()]))
    }

    pub fn starting_with(prefix: &str) -> Self {
        Self::test(PredicateOp::StartingWith, prefix)
    }

    pub fn and(self, other: P) -> Self {
        P::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: P) -> Self {
        P::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        P::Not(Box::new(self))
    }

    /// Rewrite string operands into label references.
    ///
    /// A single-string `within`/`without` operand names one label holding a
    /// collection.
    pub fn into_label_operands(self) -> Self {
        match self {
            P::Test { op, operand } => {
                let operand = match operand {
                    Operand::Value(Value::String(label)) => Operand::Label(label),
                    Operand::Value(Value::List(items))
                        if matches!(op, PredicateOp::Within | PredicateOp::Without) =>
                    {
                        single_label(items)
                    }
                    other => other,
                };
                P::Test { op, operand }
            }
            P::And(a, b) => P::And(
                Box::new(a.into_label_operands()),
                Box::new(b.into_label_operands()),
            ),
            P::Or(a, b) => P::Or(
                Box::new(a.into_label_operands()),
                Box::new(b.into_label_operands()),
            ),
            P::Not(p) => P::Not(Box::new(p.into_label_operands())),
        }
    }

    /// Labels this predicate reads.
    pub fn labels(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_labels(&mut out);
        out
    }

    fn collect_labels<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            P::Test {
                operand: Operand::Label(label),
                ..
            } => out.push(label),
            P::Test { .. } => {}
            P::And(a, b) | P::Or(a, b) => {
                a.collect_labels(out);
                b.collect_labels(out);
            }
            P::Not(p) => p.collect_labels(out),
        }
    }

    /// Evaluate against `value`, resolving label operands through `resolve`.
    pub fn evaluate<E>(
        &self,
        value: &Value,
        resolve: &mut dyn FnMut(&str) -> Result<Value, E>,
    ) -> Result<bool, E> {
        match self {
            P::Test { op, operand } => match operand {
                Operand::Value(operand) => Ok(op.test(value, operand)),
                Operand::Label(label) => {
                    let operand = resolve(label)?;
                    Ok(op.test(value, &operand))
                }
            },
            P::And(a, b) => Ok(a.evaluate(value, resolve)? && b.evaluate(value, resolve)?),
            P::Or(a, b) => Ok(a.evaluate(value, resolve)? || b.evaluate(value, resolve)?),
            P::Not(p) => Ok(!p.evaluate(value, resolve)?),
        }
    }

    /// Equality test against a literal, if this predicate is exactly that.
    pub fn as_literal_eq(&self) -> Option<&Value> {
        match self {
            P::Test {
                op: PredicateOp::Eq,
                operand: Operand::Value(value),
            } => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(v) => write!(f, "{v}"),
            Operand::Label(l) => write!(f, "@{l}"),
        }
    }
}

impl fmt::Display for P {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            P::Test { op, operand } => write!(f, "{}({operand})", op.as_str()),
            P::And(a, b) => write!(f, "and({a}, {b})"),
            P::Or(a, b) => write!(f, "or({a}, {b})"),
            P::Not(p) => write!(f, "not({p})"),
        }
    }
}
