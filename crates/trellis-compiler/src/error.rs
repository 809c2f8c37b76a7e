use trellis_bytecode::StateError;

pub type CompileResult<T> = Result<T, CompileError>;

/// Fatal errors raised before any traverser flows.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("unknown step `{0}`")]
    UnknownOperator(String),

    #[error("`{operator}` expects {expected} arguments, got {found}")]
    Arity {
        operator: String,
        expected: &'static str,
        found: usize,
    },

    #[error("invalid argument to `{operator}`: {reason}")]
    InvalidArgument { operator: String, reason: String },

    #[error("`{0}` has no step to modulate")]
    DanglingModulator(String),

    #[error("strategy ordering has a cycle through {}", .0.join(", "))]
    StrategyCycle(Vec<String>),

    #[error("strategy `{0}` is registered twice")]
    DuplicateStrategy(String),

    #[error("step `{0}` has no vertex program equivalent")]
    NoVertexProgramEquivalent(String),

    #[error("the graph does not support computer execution")]
    ComputerUnavailable,

    #[error("compute key `{0}` is declared both transient and persistent")]
    ConflictingComputeKey(String),

    #[error("traversal verification failed: {0}")]
    Verification(String),

    #[error(transparent)]
    State(#[from] StateError),
}
