//! The contract between the engine and a graph storage backend.
//!
//! The engine never touches storage internals. It reads elements and
//! properties through [`GraphRead`], writes properties through [`GraphWrite`],
//! and consults [`Capabilities`] to decide which physical steps and execution
//! modes the backend supports.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::element::{Direction, EdgeId, Element, VertexId};
use crate::value::Value;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("vertex {0} not found")]
    VertexNotFound(VertexId),

    #[error("edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("cannot write {element}: {reason}")]
    ReadOnly { element: Element, reason: String },

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Physical steps a backend can execute natively.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PhysicalStep {
    /// Vertex lookup by an exact property value.
    PropertyIndexLookup,
}

/// What a backend advertises to the compiler and the execution driver.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub physical_steps: BTreeSet<PhysicalStep>,
    pub graph_computer: bool,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_physical_step(mut self, step: PhysicalStep) -> Self {
        self.physical_steps.insert(step);
        self
    }

    pub fn with_graph_computer(mut self, enabled: bool) -> Self {
        self.graph_computer = enabled;
        self
    }

    pub fn supports(&self, step: PhysicalStep) -> bool {
        self.physical_steps.contains(&step)
    }
}

/// Read side of the storage contract.
///
/// Sequential scan (`vertices(&[])`) and id lookup (`vertices(ids)`) are
/// mandatory; property lookup has a scanning default.
pub trait GraphRead {
    fn capabilities(&self) -> Capabilities;

    /// Vertices with the given ids, in argument order, or every vertex when
    /// `ids` is empty. Unknown ids are skipped.
    fn vertices(&self, ids: &[VertexId]) -> StoreResult<Vec<VertexId>>;

    /// Edges with the given ids, or every edge when `ids` is empty.
    fn edges(&self, ids: &[EdgeId]) -> StoreResult<Vec<EdgeId>>;

    fn vertices_by_property(&self, key: &str, value: &Value) -> StoreResult<Vec<VertexId>> {
        let mut found = Vec::new();
        for id in self.vertices(&[])? {
            if let Some(actual) = self.property(Element::Vertex(id), key)?
                && actual.loose_eq(value)
            {
                found.push(id);
            }
        }
        Ok(found)
    }

    fn label(&self, element: Element) -> StoreResult<String>;

    fn property(&self, element: Element, key: &str) -> StoreResult<Option<Value>>;

    /// Property keys of an element in insertion order.
    fn property_keys(&self, element: Element) -> StoreResult<Vec<String>>;

    /// Edges incident to `vertex` in `direction`, restricted to `labels`
    /// unless empty.
    fn incident_edges(
        &self,
        vertex: VertexId,
        direction: Direction,
        labels: &[String],
    ) -> StoreResult<Vec<EdgeId>>;

    /// `(out_vertex, in_vertex)` of an edge.
    fn endpoints(&self, edge: EdgeId) -> StoreResult<(VertexId, VertexId)>;
}

/// Write side of the storage contract.
pub trait GraphWrite {
    fn write_property(&self, element: Element, key: &str, value: Value) -> StoreResult<()>;

    fn remove_property(&self, element: Element, key: &str) -> StoreResult<Option<Value>>;
}

pub trait GraphStore: GraphRead + GraphWrite {}

impl<T: GraphRead + GraphWrite + ?Sized> GraphStore for T {}

/// A backend shared between the driver and worker threads.
pub type SharedGraph = Arc<dyn GraphStore + Send + Sync>;
