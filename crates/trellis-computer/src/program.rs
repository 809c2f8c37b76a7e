//! The vertex program contract and the contexts it runs in.

use indexmap::IndexMap;
use trellis_core::{Direction, Element, GraphRead, Traverser, Value, VertexId};

use crate::compute_key::{ComputeKeys, VertexComputeKey};
use crate::error::ComputerError;
use crate::memory::{Memory, MemoryKey, MemoryPartial, Slot};

/// What the master step decided at a barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Continue,
    Halt,
}

/// A computation expressed from the point of view of one vertex.
///
/// `execute` runs once per superstep for every vertex that is active or has
/// messages; a vertex stays active until it calls [`VertexContext::halt`],
/// and any incoming message wakes it again.
pub trait VertexProgram: Send + Sync {
    type Message: Send;

    fn compute_keys(&self) -> Vec<VertexComputeKey>;

    fn memory_keys(&self) -> Vec<MemoryKey>;

    /// Runs once on the master before superstep 0.
    fn setup(&self, _memory: &mut Memory) -> Result<(), ComputerError> {
        Ok(())
    }

    fn execute(&self, ctx: &mut VertexContext<'_, Self::Message>) -> Result<(), ComputerError>;

    /// Runs on the master after each superstep barrier.
    fn terminate(
        &self,
        master: &mut MasterContext<'_, Self::Message>,
    ) -> Result<Termination, ComputerError>;
}

/// One vertex's view of a superstep.
pub struct VertexContext<'c, M> {
    pub(crate) vertex: VertexId,
    pub(crate) superstep: u32,
    pub(crate) graph: &'c (dyn GraphRead + Sync),
    pub(crate) keys: &'c ComputeKeys,
    pub(crate) state: &'c mut IndexMap<String, Value>,
    pub(crate) messages: Vec<M>,
    pub(crate) outbox: &'c mut Vec<(VertexId, M)>,
    pub(crate) memory: &'c Memory,
    pub(crate) partial: &'c mut MemoryPartial,
    pub(crate) halted: bool,
}

impl<'c, M> VertexContext<'c, M> {
    pub fn vertex(&self) -> VertexId {
        self.vertex
    }

    pub fn superstep(&self) -> u32 {
        self.superstep
    }

    /// Read-only access to the graph as it was when the run started.
    pub fn graph(&self) -> &'c (dyn GraphRead + Sync) {
        self.graph
    }

    pub fn messages(&self) -> &[M] {
        &self.messages
    }

    pub fn take_messages(&mut self) -> Vec<M> {
        std::mem::take(&mut self.messages)
    }

    fn check_key(&self, key: &str) -> Result<(), ComputerError> {
        if self.keys.contains(key) {
            Ok(())
        } else {
            Err(ComputerError::UndeclaredComputeKey(key.to_owned()))
        }
    }

    pub fn get(&self, key: &str) -> Result<Option<&Value>, ComputerError> {
        self.check_key(key)?;
        Ok(self.state.get(key))
    }

    pub fn set(&mut self, key: &str, value: Value) -> Result<(), ComputerError> {
        self.check_key(key)?;
        self.state.insert(key.to_owned(), value);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Result<Option<Value>, ComputerError> {
        self.check_key(key)?;
        Ok(self.state.shift_remove(key))
    }

    /// Deliver `message` to `to` in the next superstep.
    pub fn send(&mut self, to: VertexId, message: M) {
        self.outbox.push((to, message));
    }

    /// Send a copy of `message` to every neighbor reached through `direction`
    /// edges with one of `labels` (any label when empty).
    pub fn send_adjacent(
        &mut self,
        direction: Direction,
        labels: &[String],
        message: M,
    ) -> Result<(), ComputerError>
    where
        M: Clone,
    {
        for edge in self.graph.incident_edges(self.vertex, direction, labels)? {
            let (out, into) = self.graph.endpoints(edge)?;
            let neighbor = if out == self.vertex { into } else { out };
            self.outbox.push((neighbor, message.clone()));
        }
        Ok(())
    }

    pub fn memory(&self) -> &Memory {
        self.memory
    }

    /// Contribute `value` to a memory key; visible after the barrier.
    pub fn add_memory(&mut self, key: &str, value: Value) -> Result<(), ComputerError> {
        self.partial.add(self.memory, key, Slot::Value(value))
    }

    /// Park traversers under a memory key; visible after the barrier.
    pub fn park(&mut self, key: &str, traversers: Vec<Traverser>) -> Result<(), ComputerError> {
        self.partial.add(self.memory, key, Slot::Traversers(traversers))
    }

    /// Vote to halt. The vertex sleeps until a message arrives.
    pub fn halt(&mut self) {
        self.halted = true;
    }

    /// The property `key` of this vertex in the underlying graph.
    pub fn property(&self, key: &str) -> Result<Option<Value>, ComputerError> {
        Ok(self.graph.property(Element::Vertex(self.vertex), key)?)
    }
}

/// The master's view of a superstep barrier.
pub struct MasterContext<'c, M> {
    pub(crate) superstep: u32,
    pub(crate) memory: &'c mut Memory,
    pub(crate) graph: &'c (dyn GraphRead + Sync),
    pub(crate) pending: usize,
    pub(crate) active: usize,
    pub(crate) outbox: Vec<(VertexId, M)>,
}

impl<'c, M> MasterContext<'c, M> {
    /// The superstep that just finished.
    pub fn superstep(&self) -> u32 {
        self.superstep
    }

    pub fn memory(&self) -> &Memory {
        self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        self.memory
    }

    pub fn graph(&self) -> &'c (dyn GraphRead + Sync) {
        self.graph
    }

    /// Messages vertices sent during the superstep that just finished.
    pub fn pending_messages(&self) -> usize {
        self.pending
    }

    /// Vertices that did not vote to halt.
    pub fn active_vertices(&self) -> usize {
        self.active
    }

    /// Deliver `message` to `to` in the next superstep.
    pub fn send(&mut self, to: VertexId, message: M) {
        self.outbox.push((to, message));
    }
}
