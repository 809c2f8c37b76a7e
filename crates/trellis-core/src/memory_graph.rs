//! In-process graph backend.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;

use crate::element::{Direction, EdgeId, Element, VertexId};
use crate::store::{
    Capabilities, GraphRead, GraphWrite, PhysicalStep, StoreError, StoreResult,
};
use crate::value::Value;

#[derive(Debug, Default)]
struct VertexData {
    label: String,
    properties: IndexMap<String, Value>,
    out_edges: Vec<EdgeId>,
    in_edges: Vec<EdgeId>,
}

#[derive(Debug)]
struct EdgeData {
    label: String,
    out_vertex: VertexId,
    in_vertex: VertexId,
    properties: IndexMap<String, Value>,
}

#[derive(Debug, Default)]
struct GraphData {
    next_id: u64,
    vertices: IndexMap<VertexId, VertexData>,
    edges: IndexMap<EdgeId, EdgeData>,
    /// key -> value -> vertices, for indexed keys only.
    indexes: HashMap<String, HashMap<Value, Vec<VertexId>>>,
}

impl GraphData {
    fn properties(&self, element: Element) -> StoreResult<&IndexMap<String, Value>> {
        match element {
            Element::Vertex(id) => self
                .vertices
                .get(&id)
                .map(|v| &v.properties)
                .ok_or(StoreError::VertexNotFound(id)),
            Element::Edge(id) => self
                .edges
                .get(&id)
                .map(|e| &e.properties)
                .ok_or(StoreError::EdgeNotFound(id)),
        }
    }

    fn properties_mut(&mut self, element: Element) -> StoreResult<&mut IndexMap<String, Value>> {
        match element {
            Element::Vertex(id) => self
                .vertices
                .get_mut(&id)
                .map(|v| &mut v.properties)
                .ok_or(StoreError::VertexNotFound(id)),
            Element::Edge(id) => self
                .edges
                .get_mut(&id)
                .map(|e| &mut e.properties)
                .ok_or(StoreError::EdgeNotFound(id)),
        }
    }

    fn unindex(&mut self, id: VertexId, key: &str, value: &Value) {
        if let Some(buckets) = self.indexes.get_mut(key)
            && let Some(ids) = buckets.get_mut(value)
        {
            ids.retain(|v| *v != id);
            if ids.is_empty() {
                buckets.remove(value);
            }
        }
    }

    fn index(&mut self, id: VertexId, key: &str, value: &Value) {
        if let Some(buckets) = self.indexes.get_mut(key) {
            buckets.entry(value.clone()).or_default().push(id);
        }
    }
}

/// Thread-safe in-memory property graph.
///
/// Vertices and edges share one id sequence. Keys registered with
/// [`MemoryGraph::with_index`] get an exact-match property index, which the
/// graph advertises as [`PhysicalStep::PropertyIndexLookup`].
#[derive(Debug)]
pub struct MemoryGraph {
    data: RwLock<GraphData>,
    graph_computer: bool,
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(GraphData {
                next_id: 1,
                ..GraphData::default()
            }),
            graph_computer: true,
        }
    }

    /// Maintain an exact-match index on vertex property `key`.
    pub fn with_index(self, key: &str) -> Self {
        {
            let mut data = self.write();
            let mut buckets: HashMap<Value, Vec<VertexId>> = HashMap::new();
            for (id, vertex) in &data.vertices {
                if let Some(value) = vertex.properties.get(key) {
                    buckets.entry(value.clone()).or_default().push(*id);
                }
            }
            data.indexes.insert(key.to_owned(), buckets);
        }
        self
    }

    /// Disable BSP execution for this graph.
    pub fn without_graph_computer(mut self) -> Self {
        self.graph_computer = false;
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, GraphData> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, GraphData> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_vertex(&self, label: &str, properties: &[(&str, Value)]) -> VertexId {
        let mut data = self.write();
        let id = VertexId(data.next_id);
        data.next_id += 1;
        let mut vertex = VertexData {
            label: label.to_owned(),
            ..VertexData::default()
        };
        for (key, value) in properties {
            vertex.properties.insert((*key).to_owned(), value.clone());
        }
        for (key, value) in properties {
            data.index(id, key, value);
        }
        data.vertices.insert(id, vertex);
        id
    }

    pub fn add_edge(
        &self,
        out_vertex: VertexId,
        label: &str,
        in_vertex: VertexId,
        properties: &[(&str, Value)],
    ) -> StoreResult<EdgeId> {
        let mut data = self.write();
        for id in [out_vertex, in_vertex] {
            if !data.vertices.contains_key(&id) {
                return Err(StoreError::VertexNotFound(id));
            }
        }
        let id = EdgeId(data.next_id);
        data.next_id += 1;
        let edge = EdgeData {
            label: label.to_owned(),
            out_vertex,
            in_vertex,
            properties: properties
                .iter()
                .map(|(k, v)| ((*k).to_owned(), v.clone()))
                .collect(),
        };
        data.edges.insert(id, edge);
        if let Some(v) = data.vertices.get_mut(&out_vertex) {
            v.out_edges.push(id);
        }
        if let Some(v) = data.vertices.get_mut(&in_vertex) {
            v.in_edges.push(id);
        }
        Ok(id)
    }

    pub fn vertex_count(&self) -> usize {
        self.read().vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.read().edges.len()
    }
}

impl GraphRead for MemoryGraph {
    fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::new().with_graph_computer(self.graph_computer);
        if !self.read().indexes.is_empty() {
            caps = caps.with_physical_step(PhysicalStep::PropertyIndexLookup);
        }
        caps
    }

    fn vertices(&self, ids: &[VertexId]) -> StoreResult<Vec<VertexId>> {
        let data = self.read();
        if ids.is_empty() {
            return Ok(data.vertices.keys().copied().collect());
        }
        Ok(ids
            .iter()
            .copied()
            .filter(|id| data.vertices.contains_key(id))
            .collect())
    }

    fn edges(&self, ids: &[EdgeId]) -> StoreResult<Vec<EdgeId>> {
        let data = self.read();
        if ids.is_empty() {
            return Ok(data.edges.keys().copied().collect());
        }
        Ok(ids
            .iter()
            .copied()
            .filter(|id| data.edges.contains_key(id))
            .collect())
    }

    fn vertices_by_property(&self, key: &str, value: &Value) -> StoreResult<Vec<VertexId>> {
        let data = self.read();
        if let Some(buckets) = data.indexes.get(key) {
            let mut found = buckets.get(value).cloned().unwrap_or_default();
            // Int(2) and Float(2.0) hash apart but compare equal.
            if let Some(alternate) = numeric_twin(value)
                && let Some(more) = buckets.get(&alternate)
            {
                found.extend(more.iter().copied());
            }
            found.sort_by_key(|id| data.vertices.get_index_of(id));
            return Ok(found);
        }
        Ok(data
            .vertices
            .iter()
            .filter(|(_, v)| v.properties.get(key).is_some_and(|p| p.loose_eq(value)))
            .map(|(id, _)| *id)
            .collect())
    }

    fn label(&self, element: Element) -> StoreResult<String> {
        let data = self.read();
        match element {
            Element::Vertex(id) => data
                .vertices
                .get(&id)
                .map(|v| v.label.clone())
                .ok_or(StoreError::VertexNotFound(id)),
            Element::Edge(id) => data
                .edges
                .get(&id)
                .map(|e| e.label.clone())
                .ok_or(StoreError::EdgeNotFound(id)),
        }
    }

    fn property(&self, element: Element, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.read().properties(element)?.get(key).cloned())
    }

    fn property_keys(&self, element: Element) -> StoreResult<Vec<String>> {
        Ok(self.read().properties(element)?.keys().cloned().collect())
    }

    fn incident_edges(
        &self,
        vertex: VertexId,
        direction: Direction,
        labels: &[String],
    ) -> StoreResult<Vec<EdgeId>> {
        let data = self.read();
        let v = data
            .vertices
            .get(&vertex)
            .ok_or(StoreError::VertexNotFound(vertex))?;
        let candidates: Vec<EdgeId> = match direction {
            Direction::Out => v.out_edges.clone(),
            Direction::In => v.in_edges.clone(),
            Direction::Both => v.out_edges.iter().chain(&v.in_edges).copied().collect(),
        };
        Ok(candidates
            .into_iter()
            .filter(|id| {
                labels.is_empty()
                    || data
                        .edges
                        .get(id)
                        .is_some_and(|e| labels.iter().any(|l| *l == e.label))
            })
            .collect())
    }

    fn endpoints(&self, edge: EdgeId) -> StoreResult<(VertexId, VertexId)> {
        self.read()
            .edges
            .get(&edge)
            .map(|e| (e.out_vertex, e.in_vertex))
            .ok_or(StoreError::EdgeNotFound(edge))
    }
}

impl GraphWrite for MemoryGraph {
    fn write_property(&self, element: Element, key: &str, value: Value) -> StoreResult<()> {
        let mut data = self.write();
        let previous = data
            .properties_mut(element)?
            .insert(key.to_owned(), value.clone());
        if let Element::Vertex(id) = element {
            if let Some(previous) = previous {
                data.unindex(id, key, &previous);
            }
            data.index(id, key, &value);
        }
        Ok(())
    }

    fn remove_property(&self, element: Element, key: &str) -> StoreResult<Option<Value>> {
        let mut data = self.write();
        let removed = data.properties_mut(element)?.shift_remove(key);
        if let (Element::Vertex(id), Some(previous)) = (element, removed.as_ref()) {
            data.unindex(id, key, previous);
        }
        Ok(removed)
    }
}

fn numeric_twin(value: &Value) -> Option<Value> {
    match value {
        Value::Int(n) => Some(Value::Float(*n as f64)),
        Value::Float(x) if x.fract() == 0.0 && x.is_finite() => Some(Value::Int(*x as i64)),
        _ => None,
    }
}
