//! Fixture graph and step builders for engine tests.

use trellis_bytecode::{BarrierStep, FilterStep, FlatMapStep, P, Step, Traversal};
use trellis_core::{Direction, GraphStore, MemoryGraph, Value, VertexId};

use super::{ExecResult, Executor, NoopTracer, Pipeline, Results, SideEffects};

/// Three people who know each other and a project two of them created.
pub struct People {
    pub graph: MemoryGraph,
    pub alice: VertexId,
    pub bob: VertexId,
    pub carol: VertexId,
    pub lop: VertexId,
}

pub fn people() -> People {
    let graph = MemoryGraph::new();
    let alice = graph.add_vertex("person", &[("name", "alice".into()), ("age", 30.into())]);
    let bob = graph.add_vertex("person", &[("name", "bob".into()), ("age", 25.into())]);
    let carol = graph.add_vertex("person", &[("name", "carol".into()), ("age", 35.into())]);
    let lop = graph.add_vertex("software", &[("name", "lop".into()), ("lang", "java".into())]);
    let edges = [
        (alice, "knows", bob, 0.5),
        (alice, "knows", carol, 1.0),
        (bob, "created", lop, 0.4),
        (carol, "created", lop, 0.2),
    ];
    for (from, label, to, weight) in edges {
        graph
            .add_edge(from, label, to, &[("weight", Value::Float(weight))])
            .expect("fixture vertices exist");
    }
    People {
        graph,
        alice,
        bob,
        carol,
        lop,
    }
}

pub fn child(steps: Vec<Step>) -> Traversal {
    Traversal::from_steps(steps)
}

/// Run a root traversal to completion.
pub fn try_run(graph: &dyn GraphStore, traversal: &Traversal) -> ExecResult<Vec<Value>> {
    let side_effects = SideEffects::new(traversal.side_effects().clone());
    let exec = Executor::new(graph, &side_effects, &NoopTracer)
        .with_sack(traversal.sack())
        .with_path_tracking(traversal.requirements().path);
    Results::new(Pipeline::root(exec, traversal)).collect()
}

pub fn run(graph: &dyn GraphStore, steps: Vec<Step>) -> Vec<Value> {
    try_run(graph, &Traversal::from_steps(steps)).expect("traversal should run")
}

/// One value per line, for snapshots.
pub fn show(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

pub fn v() -> Step {
    Step::flat_map(FlatMapStep::Vertices { ids: Vec::new() })
}

pub fn v_ids(ids: &[VertexId]) -> Step {
    Step::flat_map(FlatMapStep::Vertices {
        ids: ids.iter().copied().map(Value::Vertex).collect(),
    })
}

pub fn inject(values: Vec<Value>) -> Step {
    Step::flat_map(FlatMapStep::Inject { values })
}

pub fn adjacent(direction: Direction, labels: &[&str]) -> Step {
    Step::flat_map(FlatMapStep::Adjacent {
        direction,
        labels: strings(labels),
    })
}

pub fn out(labels: &[&str]) -> Step {
    adjacent(Direction::Out, labels)
}

pub fn incident(direction: Direction, labels: &[&str]) -> Step {
    Step::flat_map(FlatMapStep::Incident {
        direction,
        labels: strings(labels),
    })
}

pub fn values(key: &str) -> Step {
    Step::flat_map(FlatMapStep::Values {
        keys: vec![key.to_owned()],
    })
}

pub fn has(key: &str, predicate: P) -> Step {
    Step::filter(FilterStep::Has {
        label: None,
        key: key.to_owned(),
        predicate: Some(predicate),
    })
}

pub fn range(low: u64, high: Option<u64>) -> Step {
    Step::filter(FilterStep::Range { low, high })
}

pub fn barrier(kind: BarrierStep) -> Step {
    Step::barrier(kind)
}
