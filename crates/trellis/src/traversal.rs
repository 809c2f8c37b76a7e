//! Rooted traversals and their terminal operations.

use indexmap::IndexMap;
use trellis_bytecode::Bytecode;
use trellis_core::Value;

use crate::Result;
use crate::driver::{self, Prepared};
use crate::source::Session;
use crate::steps::Steps;

/// A traversal spawned from a [`GraphTraversalSource`](crate::GraphTraversalSource).
///
/// Step methods come from [`Steps`]. Terminal methods compile the recorded
/// bytecode afresh on every call, so the same traversal can be run again.
#[derive(Clone)]
pub struct GraphTraversal {
    session: Session,
    bytecode: Bytecode,
}

impl std::fmt::Debug for GraphTraversal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphTraversal")
            .field("bytecode", &self.bytecode)
            .field("preference", &self.session.preference)
            .finish_non_exhaustive()
    }
}

impl Steps for GraphTraversal {
    fn bytecode(&self) -> &Bytecode {
        &self.bytecode
    }

    fn bytecode_mut(&mut self) -> &mut Bytecode {
        &mut self.bytecode
    }
}

impl GraphTraversal {
    pub(crate) fn new(session: Session, bytecode: Bytecode) -> Self {
        Self { session, bytecode }
    }

    /// Assemble, apply strategies and lock, without running anything.
    pub fn prepare(&self) -> Result<Prepared> {
        driver::prepare(&self.session, &self.bytecode)
    }

    /// The step tree after strategies, one step per line.
    pub fn explain(&self) -> Result<String> {
        Ok(self.prepare()?.explain())
    }

    pub fn to_list(&self) -> Result<Vec<Value>> {
        let mut prepared = self.prepare()?;
        prepared.iter()?.collect()
    }

    /// The first result, if any.
    pub fn next(&self) -> Result<Option<Value>> {
        let mut prepared = self.prepare()?;
        prepared.iter()?.next().transpose()
    }

    /// Run to completion for side effects, discarding results.
    pub fn iterate(&self) -> Result<()> {
        self.side_effects().map(|_| ())
    }

    /// Run to completion and return the side-effect collections.
    pub fn side_effects(&self) -> Result<IndexMap<String, Value>> {
        let mut prepared = self.prepare()?;
        for result in prepared.iter()? {
            result?;
        }
        Ok(prepared.side_effects())
    }
}
