use indexmap::IndexMap;
use trellis_bytecode::StateError;
use trellis_core::{Traverser, Value};

use super::error::{ExecResult, ExecutionError};
use super::pipeline::Pipeline;
use super::trace::{NoopTracer, Tracer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Running,
    /// An error was reported; the next read ends the sequence.
    Failed,
    Exhausted,
}

/// Result sequence of a root pipeline.
///
/// Yields one value per unit of bulk. The sequence ends at the first error;
/// reading again after it ended yields [`StateError::Exhausted`].
pub struct Results<'p, T: Tracer = NoopTracer> {
    pipeline: Pipeline<'p, T>,
    pending: Option<(Traverser, u64)>,
    state: State,
}

impl<'p, T: Tracer> Results<'p, T> {
    pub fn new(pipeline: Pipeline<'p, T>) -> Self {
        Self {
            pipeline,
            pending: None,
            state: State::Running,
        }
    }

    /// Switch to traverser-level iteration, keeping bulk intact.
    pub fn traversers(self) -> Traversers<'p, T> {
        Traversers { results: self }
    }

    /// Side-effect collections as they stand now.
    pub fn side_effects(&self) -> IndexMap<String, Value> {
        self.pipeline.executor().side_effects().snapshot()
    }

    fn pull(&mut self) -> Option<ExecResult<Traverser>> {
        match self.state {
            State::Exhausted => Some(Err(StateError::Exhausted.into())),
            State::Failed => {
                self.state = State::Exhausted;
                None
            }
            State::Running => match self.pipeline.next() {
                None => {
                    self.state = State::Exhausted;
                    None
                }
                Some(Err(e)) => {
                    self.state = State::Failed;
                    Some(Err(e))
                }
                Some(ok) => Some(ok),
            },
        }
    }
}

impl<T: Tracer> Iterator for Results<'_, T> {
    type Item = ExecResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((t, remaining)) = self.pending.take() {
            if remaining > 1 {
                self.pending = Some((t.clone(), remaining - 1));
            }
            return Some(Ok(t.object));
        }
        match self.pull()? {
            Ok(t) => {
                let bulk = t.bulk();
                if bulk > 1 {
                    self.pending = Some((t.clone(), bulk - 1));
                }
                Some(Ok(t.object))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Traversers of a result sequence, bulk not expanded.
pub struct Traversers<'p, T: Tracer = NoopTracer> {
    results: Results<'p, T>,
}

impl<T: Tracer> Traversers<'_, T> {
    pub fn side_effects(&self) -> IndexMap<String, Value> {
        self.results.side_effects()
    }
}

impl<T: Tracer> Iterator for Traversers<'_, T> {
    type Item = Result<Traverser, ExecutionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((t, remaining)) = self.results.pending.take() {
            return Some(Ok(t.with_bulk(remaining)));
        }
        self.results.pull()
    }
}
