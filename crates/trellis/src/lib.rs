//! Trellis: graph traversals with rewrite strategies and two execution engines.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use trellis::{GraphTraversalSource, MemoryGraph, Steps, Value};
//!
//! let graph = Arc::new(MemoryGraph::new());
//! let alice = graph.add_vertex("person", &[("name", "alice".into())]);
//! let bob = graph.add_vertex("person", &[("name", "bob".into())]);
//! graph.add_edge(alice, "knows", bob, &[]).unwrap();
//!
//! let g = GraphTraversalSource::new(graph);
//! let names = g.v_ids([alice]).out(&["knows"]).values(&["name"]).to_list().unwrap();
//! assert_eq!(names, [Value::from("bob")]);
//! ```
//!
//! A traversal is recorded as [`Bytecode`], assembled into steps, rewritten by
//! the strategies registered on its source and run either by the pull-chain
//! executor or, for `withComputer()` sources, as a vertex program.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod anonymous;
mod driver;
mod source;
mod steps;
mod traversal;

#[cfg(test)]
mod driver_tests;
#[cfg(test)]
mod test_utils;

/// Anonymous child traversals: `__::out(&["knows"])`.
pub mod __ {
    pub use crate::anonymous::*;
}

pub use anonymous::AnonymousTraversal;
pub use driver::{Iter, Prepared};
pub use source::{ExecutionPreference, GraphTraversalSource};
pub use steps::Steps;
pub use traversal::GraphTraversal;

pub use trellis_bytecode as bytecode;
pub use trellis_compiler as compiler;
pub use trellis_computer as computer;
pub use trellis_core as core;
pub use trellis_vm as vm;

pub use trellis_bytecode::{Bytecode, Order, P, Scope, T};
pub use trellis_compiler::{ExecutionTarget, StrategyRegistry, TraversalStrategy};
pub use trellis_computer::ComputerConfig;
pub use trellis_core::{
    Capabilities, Direction, EdgeId, Element, GraphRead, GraphStore, GraphWrite, MemoryGraph,
    Operator, SharedGraph, Value, VertexId,
};

use trellis_bytecode::StateError;
use trellis_compiler::CompileError;
use trellis_computer::ComputerError;
use trellis_core::StoreError;
use trellis_vm::ExecutionError;

/// Everything that can stop a traversal, from assembly to the last result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Assembly, strategy application or plan verification failed.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// The traversal was used out of order.
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// A vertex program run aborted; nothing was written back.
    #[error(transparent)]
    Computer(#[from] ComputerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for traversal operations.
pub type Result<T> = std::result::Result<T, Error>;
