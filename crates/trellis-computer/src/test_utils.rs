//! Fixture graphs and helpers for computer tests.

use trellis_bytecode::{FlatMapStep, Step, Traversal};
use trellis_core::{Direction, MemoryGraph, Value, VertexId};

use crate::{ComputerError, ComputerResult, GraphComputer, TraversalVertexProgram};

pub struct People {
    pub graph: MemoryGraph,
    pub alice: VertexId,
    pub bob: VertexId,
    pub carol: VertexId,
    pub lop: VertexId,
}

/// Three people, two of whom alice knows, and a project the other two
/// created.
pub fn people() -> People {
    let graph = MemoryGraph::new();
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
    People {
        graph,
        alice,
        bob,
        carol,
        lop,
    }
}

pub fn v() -> Step {
    Step::flat_map(FlatMapStep::Vertices { ids: Vec::new() })
}

pub fn v_ids(ids: &[VertexId]) -> Step {
    Step::flat_map(FlatMapStep::Vertices {
        ids: ids.iter().copied().map(Value::Vertex).collect(),
    })
}

pub fn out(labels: &[&str]) -> Step {
    Step::flat_map(FlatMapStep::Adjacent {
        direction: Direction::Out,
        labels: labels.iter().map(|l| l.to_string()).collect(),
    })
}

pub fn values(key: &str) -> Step {
    Step::flat_map(FlatMapStep::Values {
        keys: vec![key.to_owned()],
    })
}

/// Run `steps` as a traversal vertex program.
pub fn try_submit(
    graph: &MemoryGraph,
    steps: Vec<Step>,
    workers: usize,
) -> Result<ComputerResult, ComputerError> {
    let program = TraversalVertexProgram::new(Traversal::from_steps(steps))?;
    GraphComputer::new(graph).workers(workers).submit(&program)
}

/// Halted objects with bulk expanded, in a stable order.
pub fn halted(result: &ComputerResult) -> Vec<Value> {
    let mut found: Vec<Value> = TraversalVertexProgram::halted(&result.memory)
        .iter()
        .flat_map(|t| std::iter::repeat_n(t.object.clone(), usize::try_from(t.bulk()).unwrap_or(usize::MAX)))
        .collect();
    found.sort_by(Value::total_cmp);
    found
}

pub fn run(graph: &MemoryGraph, steps: Vec<Step>) -> Vec<Value> {
    let result = try_submit(graph, steps, 2).expect("program should run");
    halted(&result)
}

/// One value per line, for snapshots.
pub fn show(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
