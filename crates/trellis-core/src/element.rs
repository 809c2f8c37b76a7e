//! Element identifiers and edge directions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Vertex identifier assigned by the storage collaborator.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct VertexId(pub u64);

/// Edge identifier assigned by the storage collaborator.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct EdgeId(pub u64);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v[{}]", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e[{}]", self.0)
    }
}

/// Reference to a graph element that carries properties.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Element {
    Vertex(VertexId),
    Edge(EdgeId),
}

impl Element {
    /// Raw numeric identifier, regardless of element kind.
    pub fn raw_id(self) -> u64 {
        match self {
            Element::Vertex(id) => id.0,
            Element::Edge(id) => id.0,
        }
    }

    pub fn as_vertex(self) -> Option<VertexId> {
        match self {
            Element::Vertex(id) => Some(id),
            Element::Edge(_) => None,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Vertex(id) => id.fmt(f),
            Element::Edge(id) => id.fmt(f),
        }
    }
}

impl From<VertexId> for Element {
    fn from(id: VertexId) -> Self {
        Element::Vertex(id)
    }
}

impl From<EdgeId> for Element {
    fn from(id: EdgeId) -> Self {
        Element::Edge(id)
    }
}

/// Edge direction relative to a vertex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Direction {
    Out,
    In,
    Both,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Out => Direction::In,
            Direction::In => Direction::Out,
            Direction::Both => Direction::Both,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Out => "OUT",
            Direction::In => "IN",
            Direction::Both => "BOTH",
        }
    }
}
