//! Errors that end a result sequence.

use trellis_bytecode::StateError;
use trellis_core::{OperatorError, StoreError};

pub type ExecResult<T> = Result<T, ExecutionError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Operator(#[from] OperatorError),

    #[error("`{step}` expected {expected}, found {found}")]
    TypeMismatch {
        step: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("label `{0}` is not bound on the path or as a side-effect")]
    UnboundLabel(String),

    #[error("`{step}` needs a graph element, found {found}")]
    NotAnElement {
        step: &'static str,
        found: &'static str,
    },

    /// The step cannot be processed through this entry point.
    #[error("`{0}` is not supported here")]
    Unsupported(&'static str),

    #[error(transparent)]
    State(#[from] StateError),
}
