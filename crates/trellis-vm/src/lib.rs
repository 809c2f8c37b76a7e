//! Pull-chain executor for Trellis traversals.
//!
//! A locked `Traversal` runs as a chain of stages, each pulling from the one
//! before it. `Executor` exposes single-step processing so the BSP engine can
//! reuse the same step semantics.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod engine;

pub use engine::{
    ExecResult, ExecutionError, Executor, LogTracer, NoopTracer, Pipeline, Results, SideEffects,
    Tracer, Traversers,
};
