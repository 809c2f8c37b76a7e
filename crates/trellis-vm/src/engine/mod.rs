//! Runtime engine for executing locked traversals.
//!
//! Traversers are pulled through one stage per step. Filters drop,
//! flat-maps fan out, barriers drain their upstream before emitting, and
//! branch steps run child pipelines per input traverser.

mod error;
mod executor;
mod pipeline;
mod reduce;
mod results;
mod side_effects;
mod trace;

#[cfg(test)]
mod reduce_tests;
#[cfg(test)]
mod test_utils;

pub use error::{ExecResult, ExecutionError};
pub use executor::Executor;
pub use pipeline::Pipeline;
pub use results::{Results, Traversers};
pub use side_effects::SideEffects;
pub use trace::{LogTracer, NoopTracer, Tracer};
