use trellis_compiler::CompileError;
use trellis_core::{StoreError, VertexId};
use trellis_vm::ExecutionError;

/// Why a vertex program run aborted.
///
/// An aborted run writes nothing back to the graph.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComputerError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// A step failed while a vertex (or the master, when `vertex` is `None`)
    /// processed traversers.
    #[error("superstep {superstep}: {source}")]
    Execution {
        superstep: u32,
        vertex: Option<VertexId>,
        source: ExecutionError,
    },

    #[error("compute key `{0}` was not declared by the program")]
    UndeclaredComputeKey(String),

    #[error("memory key `{0}` was not declared by the program")]
    UndeclaredMemoryKey(String),

    #[error("memory key `{key}`: {reason}")]
    MemoryType { key: String, reason: String },

    #[error("no termination after {0} supersteps")]
    SuperstepLimit(u32),

    #[error("worker pool: {0}")]
    ThreadPool(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
