/// Violations of the traversal lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("traversal is locked; steps cannot change after iteration started")]
    Locked,

    #[error("traversal has already been iterated")]
    AlreadyStarted,

    #[error("result sequence is exhausted")]
    Exhausted,
}
