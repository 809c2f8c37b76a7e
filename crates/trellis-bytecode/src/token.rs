//! Enumerated tokens passed as instruction arguments.

use std::fmt;

use serde::{Deserialize, Serialize};
use trellis_core::{Direction, Operator};

/// Sort direction for `order().by(..)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

/// Whether a step works across traversers or inside one traverser's object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Global,
    Local,
}

/// Element accessors usable wherever a property key is accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum T {
    Id,
    Label,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Token {
    Operator(Operator),
    Order(Order),
    Scope(Scope),
    Direction(Direction),
    T(T),
}

impl Order {
    pub fn as_str(self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }
}

impl T {
    pub fn as_str(self) -> &'static str {
        match self {
            T::Id => "id",
            T::Label => "label",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Operator(op) => f.write_str(op.as_str()),
            Token::Order(order) => f.write_str(order.as_str()),
            Token::Scope(Scope::Global) => f.write_str("global"),
            Token::Scope(Scope::Local) => f.write_str("local"),
            Token::Direction(direction) => f.write_str(direction.as_str()),
            Token::T(t) => write!(f, "T.{}", t.as_str()),
        }
    }
}

impl From<Operator> for Token {
    fn from(op: Operator) -> Self {
        Token::Operator(op)
    }
}

impl From<Order> for Token {
    fn from(order: Order) -> Self {
        Token::Order(order)
    }
}

impl From<Scope> for Token {
    fn from(scope: Scope) -> Self {
        Token::Scope(scope)
    }
}

impl From<T> for Token {
    fn from(t: T) -> Self {
        Token::T(t)
    }
}
