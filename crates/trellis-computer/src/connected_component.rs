//! Weakly connected components by least-id propagation.

use trellis_core::{Direction, Value, VertexId};

use crate::compute_key::VertexComputeKey;
use crate::error::ComputerError;
use crate::memory::{MemoryKey, Reducer};
use crate::program::{MasterContext, Termination, VertexContext, VertexProgram};

/// Vertex property holding the component id once the run completes.
pub const COMPONENT_KEY: &str = "component";

const CANDIDATE_KEY: &str = "~candidate";
const CHANGED_KEY: &str = "changed";

/// Labels every vertex with the least vertex id reachable from it, ignoring
/// edge direction.
#[derive(Debug, Clone, Default)]
pub struct ConnectedComponentProgram {
    /// Edge labels to follow; every label when empty.
    labels: Vec<String>,
}

impl ConnectedComponentProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_labels(labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }
}

impl VertexProgram for ConnectedComponentProgram {
    type Message = VertexId;

    fn compute_keys(&self) -> Vec<VertexComputeKey> {
        vec![
            VertexComputeKey::of(COMPONENT_KEY, false),
            VertexComputeKey::of(CANDIDATE_KEY, true),
        ]
    }

    fn memory_keys(&self) -> Vec<MemoryKey> {
        vec![MemoryKey::new(CHANGED_KEY, Reducer::Or, false)]
    }

    fn execute(&self, ctx: &mut VertexContext<'_, VertexId>) -> Result<(), ComputerError> {
        let own = ctx.vertex();
        if ctx.superstep() == 0 {
            ctx.set(COMPONENT_KEY, Value::Vertex(own))?;
            ctx.send_adjacent(Direction::Both, &self.labels, own)?;
            ctx.halt();
            return Ok(());
        }

        let Some(candidate) = ctx.take_messages().into_iter().min() else {
            ctx.halt();
            return Ok(());
        };
        ctx.set(CANDIDATE_KEY, Value::Vertex(candidate))?;
        let current = ctx.get(COMPONENT_KEY)?.and_then(Value::as_vertex).unwrap_or(own);
        if candidate < current {
            ctx.set(COMPONENT_KEY, Value::Vertex(candidate))?;
            ctx.add_memory(CHANGED_KEY, Value::Bool(true))?;
            ctx.send_adjacent(Direction::Both, &self.labels, candidate)?;
        }
        ctx.halt();
        Ok(())
    }

    fn terminate(&self, master: &mut MasterContext<'_, VertexId>) -> Result<Termination, ComputerError> {
        let changed = master.memory().get(CHANGED_KEY)?.as_bool().unwrap_or(false);
        master.memory_mut().set(CHANGED_KEY, Value::Bool(false))?;
        if master.superstep() == 0 || changed {
            Ok(Termination::Continue)
        } else {
            Ok(Termination::Halt)
        }
    }
}

