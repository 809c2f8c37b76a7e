//! Child traversals built without a source.

use trellis_bytecode::{Argument, Bytecode, P};
use trellis_core::Value;

use crate::steps::Steps;

/// A traversal that only exists as an argument of another step.
///
/// It starts from whatever traverser the enclosing step hands it, so it
/// carries no source instructions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnonymousTraversal {
    bytecode: Bytecode,
}

impl AnonymousTraversal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytecode(self) -> Bytecode {
        self.bytecode
    }
}

impl Steps for AnonymousTraversal {
    fn bytecode(&self) -> &Bytecode {
        &self.bytecode
    }

    fn bytecode_mut(&mut self) -> &mut Bytecode {
        &mut self.bytecode
    }
}

impl From<AnonymousTraversal> for Argument {
    fn from(traversal: AnonymousTraversal) -> Self {
        Argument::Bytecode(traversal.bytecode)
    }
}

/// An empty traversal; it passes its input through unchanged.
pub fn start() -> AnonymousTraversal {
    AnonymousTraversal::new()
}

pub fn identity() -> AnonymousTraversal {
    start().identity()
}

pub fn out(labels: &[&str]) -> AnonymousTraversal {
    start().out(labels)
}

pub fn in_(labels: &[&str]) -> AnonymousTraversal {
    start().in_(labels)
}

pub fn both(labels: &[&str]) -> AnonymousTraversal {
    start().both(labels)
}

pub fn out_e(labels: &[&str]) -> AnonymousTraversal {
    start().out_e(labels)
}

pub fn in_e(labels: &[&str]) -> AnonymousTraversal {
    start().in_e(labels)
}

pub fn both_e(labels: &[&str]) -> AnonymousTraversal {
    start().both_e(labels)
}

pub fn out_v() -> AnonymousTraversal {
    start().out_v()
}

pub fn in_v() -> AnonymousTraversal {
    start().in_v()
}

pub fn other_v() -> AnonymousTraversal {
    start().other_v()
}

pub fn values(keys: &[&str]) -> AnonymousTraversal {
    start().values(keys)
}

pub fn id() -> AnonymousTraversal {
    start().id()
}

pub fn label() -> AnonymousTraversal {
    start().label()
}

pub fn constant(v: impl Into<Value>) -> AnonymousTraversal {
    start().constant(v)
}

pub fn select(labels: &[&str]) -> AnonymousTraversal {
    start().select(labels)
}

pub fn sack() -> AnonymousTraversal {
    start().sack()
}

pub fn path() -> AnonymousTraversal {
    start().path()
}

pub fn loops() -> AnonymousTraversal {
    start().loops()
}

pub fn unfold() -> AnonymousTraversal {
    start().unfold()
}

pub fn fold() -> AnonymousTraversal {
    start().fold()
}

pub fn count() -> AnonymousTraversal {
    start().count()
}

pub fn has_key(key: &str) -> AnonymousTraversal {
    start().has_key(key)
}

pub fn has(key: &str, predicate: P) -> AnonymousTraversal {
    start().has(key, predicate)
}

pub fn has_value(key: &str, v: impl Into<Value>) -> AnonymousTraversal {
    start().has_value(key, v)
}

pub fn has_label(labels: &[&str]) -> AnonymousTraversal {
    start().has_label(labels)
}

pub fn has_not(key: &str) -> AnonymousTraversal {
    start().has_not(key)
}

pub fn is(predicate: P) -> AnonymousTraversal {
    start().is(predicate)
}

pub fn where_p(predicate: P) -> AnonymousTraversal {
    start().where_p(predicate)
}

pub fn not(traversal: AnonymousTraversal) -> AnonymousTraversal {
    start().not(traversal)
}

/// Label the incoming traverser; `as` needs a step to attach to.
pub fn as_(label: &str) -> AnonymousTraversal {
    start().identity().as_(label)
}

pub fn union(traversals: impl IntoIterator<Item = AnonymousTraversal>) -> AnonymousTraversal {
    start().union(traversals)
}
