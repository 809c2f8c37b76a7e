//! Bulk-synchronous vertex program engine for Trellis.
//!
//! A [`VertexProgram`] runs in supersteps over a partitioned graph. Within a
//! superstep every active vertex executes once, reading the messages sent to
//! it in the previous superstep; at the barrier, memory contributions are
//! merged and the program's master step decides whether to continue.
//!
//! - [`GraphComputer`] owns the worker pool and the superstep loop
//! - [`TraversalVertexProgram`] runs a compiled traversal with traversers as messages
//! - [`ConnectedComponentProgram`] labels each vertex with the least id in its component

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod compute_key;
mod computer;
mod connected_component;
mod error;
mod memory;
mod program;
mod traversal_program;

#[cfg(test)]
mod memory_tests;
#[cfg(test)]
mod test_utils;

pub use compute_key::{ComputeKeys, VertexComputeKey};
pub use computer::{ComputerConfig, ComputerResult, GraphComputer};
pub use connected_component::{COMPONENT_KEY, ConnectedComponentProgram};
pub use error::ComputerError;
pub use memory::{Memory, MemoryKey, MemoryPartial, MemorySnapshot, Reducer, Slot};
pub use program::{MasterContext, Termination, VertexContext, VertexProgram};
pub use traversal_program::{HALTED_KEY, TraversalVertexProgram, TraverserMessage};
