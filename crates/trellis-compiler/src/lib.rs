//! Trellis compiler: bytecode assembly and traversal strategies.
//!
//! - `assemble` turns `Bytecode` into an executable `Traversal`
//! - `strategy` rewrites the traversal before it is locked, in a fixed
//!   category order with named before/after constraints

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod assemble;
mod error;
pub mod strategy;

#[cfg(test)]
pub mod test_utils;

pub use assemble::{Assembled, assemble, assemble_child};
pub use error::{CompileError, CompileResult};
pub use strategy::{
    ExecutionTarget, StrategyCategory, StrategyContext, StrategyRegistry, TraversalStrategy,
};
