#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core data structures for Trellis traversals.
//!
//! Three layers:
//! - **Values**: the dynamic `Value` model, element identifiers and binary `Operator`s
//! - **Traversers**: the unit of flowing data (`Traverser`, `Path`, `TraverserSet`)
//! - **Storage contract**: `GraphRead` / `GraphWrite` plus advertised `Capabilities`
//!
//! `MemoryGraph` is a reference in-process implementation of the storage contract.

mod element;
mod memory_graph;
mod operator;
mod store;
mod traverser;
mod value;

#[cfg(test)]
mod memory_graph_tests;

pub use element::{Direction, EdgeId, Element, VertexId};
pub use memory_graph::MemoryGraph;
pub use operator::{Operator, OperatorError};
pub use store::{
    Capabilities, GraphRead, GraphStore, GraphWrite, PhysicalStep, SharedGraph, StoreError,
    StoreResult,
};
pub use traverser::{Path, PathEntry, SackSplit, Traverser, TraverserSet};
pub use value::Value;
