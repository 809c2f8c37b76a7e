#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Traversal bytecode and the executable step IR.
//!
//! This crate contains:
//! - The serialisable instruction form (`Instruction`, `Argument`, `Bytecode`)
//! - Predicates (`P`) and tokens passed as instruction arguments
//! - The executable IR (`Step`, `StepKind`, `Traversal`) that strategies rewrite
//! - `Requirements` derived from a step tree, and `StateError`

mod dump;
mod error;
mod instruction;
mod predicate;
mod requirements;
mod step;
mod token;
mod traversal;

#[cfg(test)]
mod predicate_tests;

pub use error::StateError;
pub use instruction::{Argument, Bytecode, Instruction};
pub use predicate::{Operand, P, PredicateOp};
pub use requirements::Requirements;
pub use step::{
    BarrierStep, BranchStep, By, Emit, FilterStep, FlatMapStep, PropertyValue, SideEffectStep,
    Step, StepKind,
};
pub use token::{Order, Scope, T, Token};
pub use traversal::{SackConfig, Traversal};

/// Labels starting with this prefix are reserved for engine-inserted steps.
pub const RESERVED_LABEL_PREFIX: &str = "~";
