//! Fixture graph for facade tests.

use std::sync::Arc;

use trellis_core::{MemoryGraph, Value, VertexId};

use crate::GraphTraversalSource;

pub struct People {
    pub graph: Arc<MemoryGraph>,
    pub g: GraphTraversalSource,
    pub alice: VertexId,
    pub bob: VertexId,
    pub carol: VertexId,
    pub lop: VertexId,
}

/// alice knows bob and carol, who both created lop.
pub fn people() -> People {
    people_on(MemoryGraph::new())
}

pub fn people_on(graph: MemoryGraph) -> People {
    let graph = Arc::new(graph);
    let alice = graph.add_vertex("person", &[("name", "alice".into()), ("age", 30.into())]);
    let bob = graph.add_vertex("person", &[("name", "bob".into()), ("age", 25.into())]);
    let carol = graph.add_vertex("person", &[("name", "carol".into()), ("age", 35.into())]);
    let lop = graph.add_vertex("software", &[("name", "lop".into())]);
    for (from, label, to) in [
        (alice, "knows", bob),
        (alice, "knows", carol),
        (bob, "created", lop),
        (carol, "created", lop),
    ] {
        graph.add_edge(from, label, to, &[]).expect("fixture vertices exist");
    }
    let g = GraphTraversalSource::new(graph.clone());
    People {
        graph,
        g,
        alice,
        bob,
        carol,
        lop,
    }
}

pub fn sorted(mut values: Vec<Value>) -> Vec<Value> {
    values.sort_by(Value::total_cmp);
    values
}

pub fn names(items: &[&str]) -> Vec<Value> {
    items.iter().map(|s| Value::from(*s)).collect()
}
