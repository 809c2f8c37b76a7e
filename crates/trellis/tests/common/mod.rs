//! Fixture graphs shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use trellis::{Element, GraphRead, GraphTraversalSource, MemoryGraph, Value, VertexId};

pub struct Fixture {
    pub graph: Arc<MemoryGraph>,
    pub g: GraphTraversalSource,
    pub ids: Vec<VertexId>,
}

impl Fixture {
    fn new(graph: MemoryGraph, ids: impl FnOnce(&MemoryGraph) -> Vec<VertexId>) -> Self {
        let ids = ids(&graph);
        let graph = Arc::new(graph);
        let g = GraphTraversalSource::new(graph.clone());
        Self { graph, g, ids }
    }

    pub fn property(&self, vertex: VertexId, key: &str) -> Option<Value> {
        self.graph
            .property(Element::Vertex(vertex), key)
            .expect("fixture vertex exists")
    }

    pub fn property_keys(&self) -> Vec<Vec<String>> {
        let vertices = self.graph.vertices(&[]).expect("scan succeeds");
        vertices
            .into_iter()
            .map(|v| {
                self.graph
                    .property_keys(Element::Vertex(v))
                    .expect("fixture vertex exists")
            })
            .collect()
    }
}

fn link(graph: &MemoryGraph, edges: &[(VertexId, &str, VertexId)]) {
    for &(from, label, to) in edges {
        graph.add_edge(from, label, to, &[]).expect("fixture vertices exist");
    }
}

/// alice, bob and carol (aged 30, 25, 35); alice knows bob and carol, who
/// both created lop. Ids in that order.
pub fn people() -> Fixture {
    people_on(MemoryGraph::new())
}

pub fn people_on(graph: MemoryGraph) -> Fixture {
    Fixture::new(graph, |graph| {
        let alice = graph.add_vertex("person", &[("name", "alice".into()), ("age", 30.into())]);
        let bob = graph.add_vertex("person", &[("name", "bob".into()), ("age", 25.into())]);
        let carol = graph.add_vertex("person", &[("name", "carol".into()), ("age", 35.into())]);
        let lop = graph.add_vertex("software", &[("name", "lop".into())]);
        link(
            graph,
            &[
                (alice, "knows", bob),
                (alice, "knows", carol),
                (bob, "created", lop),
                (carol, "created", lop),
            ],
        );
        vec![alice, bob, carol, lop]
    })
}

/// alice's friends jen and dave and the movies they like. Ids: alice, jen,
/// dave, then the movies.
pub fn movies() -> Fixture {
    Fixture::new(MemoryGraph::new(), |graph| {
        let person = |name: &str| graph.add_vertex("person", &[("name", name.into())]);
        let movie = |name: &str| graph.add_vertex("movie", &[("name", name.into())]);
        let alice = person("alice");
        let jen = person("jen");
        let dave = person("dave");
        let wild_bunch = movie("the wild bunch");
        let young_guns = movie("young guns");
        let unforgiven = movie("unforgiven");
        link(
            graph,
            &[
                (alice, "friend", jen),
                (alice, "friend", dave),
                (alice, "like", unforgiven),
                (jen, "like", wild_bunch),
                (jen, "like", young_guns),
                (dave, "like", young_guns),
                (dave, "like", unforgiven),
            ],
        );
        vec![alice, jen, dave, wild_bunch, young_guns, unforgiven]
    })
}

/// Three tanks in a row; water flows a -> b -> c, each pipe passing on a
/// fraction of what it receives. Ids: a, b, c.
pub fn tanks() -> Fixture {
    Fixture::new(MemoryGraph::new(), |graph| {
        let a = graph.add_vertex("tank", &[("name", "a".into()), ("amount", 100.0.into())]);
        let b = graph.add_vertex(
            "tank",
            &[
                ("name", "b".into()),
                ("amount", 0.0.into()),
                ("factor", 0.5.into()),
            ],
        );
        let c = graph.add_vertex(
            "tank",
            &[
                ("name", "c".into()),
                ("amount", 0.0.into()),
                ("factor", 0.1.into()),
            ],
        );
        link(graph, &[(a, "pipe", b), (b, "pipe", c)]);
        vec![a, b, c]
    })
}

pub fn sorted(mut values: Vec<Value>) -> Vec<Value> {
    values.sort_by(Value::total_cmp);
    values
}

pub fn strings(items: &[&str]) -> Vec<Value> {
    items.iter().map(|s| Value::from(*s)).collect()
}
