//! The serialisable, host-language independent form of a traversal.

use std::fmt;

use serde::{Deserialize, Serialize};
use trellis_core::Value;

use crate::predicate::P;
use crate::token::Token;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Argument {
    Value(Value),
    /// Anonymous child traversal.
    Bytecode(Bytecode),
    /// Reference to a label bound earlier with `as`.
    Label(String),
    Predicate(P),
    Token(Token),
}

/// One `(operator, arguments)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    operator: String,
    arguments: Vec<Argument>,
}

impl Instruction {
    pub fn new(operator: impl Into<String>, arguments: Vec<Argument>) -> Self {
        Self {
            operator: operator.into(),
            arguments,
        }
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }
}

/// Source instructions configure the traversal source (`withSack`, ...);
/// step instructions describe the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bytecode {
    source: Vec<Instruction>,
    steps: Vec<Instruction>,
}

impl Bytecode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source(&mut self, operator: impl Into<String>, arguments: Vec<Argument>) {
        self.source.push(Instruction::new(operator, arguments));
    }

    pub fn add_step(&mut self, operator: impl Into<String>, arguments: Vec<Argument>) {
        self.steps.push(Instruction::new(operator, arguments));
    }

    pub fn source_instructions(&self) -> &[Instruction] {
        &self.source
    }

    pub fn step_instructions(&self) -> &[Instruction] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty() && self.steps.is_empty()
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Value(v) => write!(f, "{v}"),
            Argument::Bytecode(b) => write!(f, "{b}"),
            Argument::Label(l) => write!(f, "@{l}"),
            Argument::Predicate(p) => write!(f, "{p}"),
            Argument::Token(t) => write!(f, "{t}"),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.operator)?;
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, instructions: &[Instruction]) -> fmt::Result {
    f.write_str("[")?;
    for (i, instruction) in instructions.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{instruction}")?;
    }
    f.write_str("]")
}

impl fmt::Display for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        write_list(f, &self.source)?;
        f.write_str(", ")?;
        write_list(f, &self.steps)?;
        f.write_str("]")
    }
}

impl From<Value> for Argument {
    fn from(v: Value) -> Self {
        Argument::Value(v)
    }
}

impl From<Bytecode> for Argument {
    fn from(b: Bytecode) -> Self {
        Argument::Bytecode(b)
    }
}

impl From<P> for Argument {
    fn from(p: P) -> Self {
        Argument::Predicate(p)
    }
}

impl From<Token> for Argument {
    fn from(t: Token) -> Self {
        Argument::Token(t)
    }
}
