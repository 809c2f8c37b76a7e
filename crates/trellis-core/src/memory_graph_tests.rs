use assert_matches::assert_matches;

use crate::{
    Direction, EdgeId, Element, GraphRead, GraphWrite, MemoryGraph, PhysicalStep, StoreError,
    Value, VertexId,
};

fn triangle() -> (MemoryGraph, [VertexId; 3]) {
    let g = MemoryGraph::new();
    let a = g.add_vertex("node", &[("name", Value::from("a")), ("age", Value::Int(30))]);
    let b = g.add_vertex("node", &[("name", Value::from("b"))]);
    let c = g.add_vertex("leaf", &[("name", Value::from("c")), ("age", Value::Int(30))]);
    g.add_edge(a, "knows", b, &[]).unwrap();
    g.add_edge(b, "knows", c, &[("weight", Value::Float(0.5))]).unwrap();
    g.add_edge(a, "likes", c, &[]).unwrap();
    (g, [a, b, c])
}

#[test]
fn scan_and_lookup() {
    let (g, [a, b, c]) = triangle();
    assert_eq!(g.vertices(&[]).unwrap(), vec![a, b, c]);
    assert_eq!(g.vertices(&[c, VertexId(99), a]).unwrap(), vec![c, a]);
    assert_eq!(g.vertex_count(), 3);
    assert_eq!(g.edge_count(), 3);
}

#[test]
fn incident_edges_respect_direction_and_labels() {
    let (g, [a, b, c]) = triangle();
    let out = g.incident_edges(a, Direction::Out, &[]).unwrap();
    assert_eq!(out.len(), 2);
    let knows = g
        .incident_edges(a, Direction::Out, &["knows".to_string()])
        .unwrap();
    assert_eq!(knows.len(), 1);
    assert_eq!(g.endpoints(knows[0]).unwrap(), (a, b));
    assert_eq!(g.incident_edges(c, Direction::In, &[]).unwrap().len(), 2);
    assert_eq!(g.incident_edges(b, Direction::Both, &[]).unwrap().len(), 2);
}

#[test]
fn labels_and_properties() {
    let (g, [a, _, c]) = triangle();
    assert_eq!(g.label(Element::Vertex(c)).unwrap(), "leaf");
    assert_eq!(
        g.property(Element::Vertex(a), "age").unwrap(),
        Some(Value::Int(30))
    );
    assert_eq!(g.property(Element::Vertex(a), "missing").unwrap(), None);
    assert_eq!(
        g.property_keys(Element::Vertex(a)).unwrap(),
        vec!["name".to_string(), "age".to_string()]
    );
}

#[test]
fn missing_elements_are_errors() {
    let g = MemoryGraph::new();
    assert_matches!(
        g.label(Element::Vertex(VertexId(5))),
        Err(StoreError::VertexNotFound(VertexId(5)))
    );
    assert_matches!(g.endpoints(EdgeId(2)), Err(StoreError::EdgeNotFound(EdgeId(2))));
    assert_matches!(
        g.add_edge(VertexId(1), "x", VertexId(2), &[]),
        Err(StoreError::VertexNotFound(_))
    );
}

#[test]
fn writes_replace_and_remove() {
    let (g, [a, ..]) = triangle();
    g.write_property(Element::Vertex(a), "age", Value::Int(40)).unwrap();
    assert_eq!(
        g.property(Element::Vertex(a), "age").unwrap(),
        Some(Value::Int(40))
    );
    let removed = g.remove_property(Element::Vertex(a), "age").unwrap();
    assert_eq!(removed, Some(Value::Int(40)));
    assert_eq!(g.property(Element::Vertex(a), "age").unwrap(), None);
}

#[test]
fn index_is_advertised_and_maintained() {
    let (g, [a, b, c]) = triangle();
    assert!(!g.capabilities().supports(PhysicalStep::PropertyIndexLookup));
    let g = g.with_index("age");
    assert!(g.capabilities().supports(PhysicalStep::PropertyIndexLookup));
    assert_eq!(g.vertices_by_property("age", &Value::Int(30)).unwrap(), vec![a, c]);

    g.write_property(Element::Vertex(a), "age", Value::Int(31)).unwrap();
    g.write_property(Element::Vertex(b), "age", Value::Float(30.0)).unwrap();
    assert_eq!(g.vertices_by_property("age", &Value::Int(30)).unwrap(), vec![b, c]);
    assert_eq!(g.vertices_by_property("age", &Value::Int(31)).unwrap(), vec![a]);
}

#[test]
fn unindexed_lookup_scans() {
    let (g, [_, b, _]) = triangle();
    assert_eq!(
        g.vertices_by_property("name", &Value::from("b")).unwrap(),
        vec![b]
    );
}

#[test]
fn graph_computer_can_be_disabled() {
    assert!(MemoryGraph::new().capabilities().graph_computer);
    assert!(!MemoryGraph::new().without_graph_computer().capabilities().graph_computer);
}
