use assert_matches::assert_matches;
use indoc::indoc;
use trellis_bytecode::StateError;
use trellis_compiler::{CompileError, ExecutionTarget};
use trellis_core::{MemoryGraph, Value};

use crate::test_utils::{People, names, people, people_on, sorted};
use crate::{Error, ExecutionPreference, Steps, __};

#[test]
fn iteration_is_allowed_once() {
    let People { g, .. } = people();
    let mut prepared = g.v().values(&["name"]).prepare().unwrap();

    assert_eq!(prepared.iter().unwrap().count(), 4);
    assert_matches!(
        prepared.iter().err(),
        Some(Error::State(StateError::AlreadyStarted))
    );
}

#[test]
fn reading_past_the_end_is_an_error() {
    let People { g, .. } = people();
    for source in [g.clone(), g.with_computer()] {
        let mut prepared = source.v().has_label(&["software"]).prepare().unwrap();
        let mut iter = prepared.iter().unwrap();
        assert!(matches!(iter.next(), Some(Ok(Value::Vertex(_)))));
        assert!(iter.next().is_none());
        assert_matches!(iter.next(), Some(Err(Error::State(StateError::Exhausted))));
    }
}

#[test]
fn errors_end_the_sequence() {
    let People { g, .. } = people();
    let mut prepared = g.v().values(&["name"]).sum().prepare().unwrap();
    let mut iter = prepared.iter().unwrap();

    assert_matches!(iter.next(), Some(Err(Error::Execution(_))));
    assert!(iter.next().is_none());
}

#[test]
fn explain_shows_the_rewritten_plan() {
    let People { g, .. } = people();
    let t = |g: &crate::GraphTraversalSource| {
        g.v().out(&["knows"]).out(&["created"]).values(&["name"])
    };

    assert_eq!(
        t(&g).explain().unwrap(),
        indoc! {"
            V()
            out(knows)
            barrier(2500)
            out(created)
            values(name)
        "}
    );
    assert_eq!(
        t(&g.clone().with_computer()).explain().unwrap(),
        indoc! {"
            V()
            out(knows)
            out(created)
            values(name)
        "}
    );
    assert_eq!(
        t(&g.without_strategies(&["LazyBarrierStrategy"])).explain().unwrap(),
        indoc! {"
            V()
            out(knows)
            out(created)
            values(name)
        "}
    );
}

#[test]
fn with_computer_selects_the_graph_computer() {
    let People { g, .. } = people();

    let oltp = g.v().prepare().unwrap();
    let olap = g.clone().with_computer().v().prepare().unwrap();
    let preferred = g.with_preference(ExecutionPreference::Olap).v().prepare().unwrap();

    assert_eq!(oltp.target(), ExecutionTarget::Oltp);
    assert_eq!(olap.target(), ExecutionTarget::Olap);
    assert_eq!(preferred.target(), ExecutionTarget::Olap);
    assert!(olap.traversal().is_locked());
}

#[test]
fn computer_needs_graph_support() {
    let People { g, .. } = people_on(MemoryGraph::new().without_graph_computer());

    assert_matches!(
        g.with_computer().v().to_list(),
        Err(Error::Compile(CompileError::ComputerUnavailable))
    );
}

#[test]
fn explicit_olap_rejects_unsupported_plans() {
    let People { g, .. } = people();

    assert_matches!(
        g.with_computer().v().limit(1).count().to_list(),
        Err(Error::Compile(CompileError::NoVertexProgramEquivalent(step))) if step == "range"
    );
}

#[test]
fn auto_falls_back_to_the_pull_chain() {
    let People { g, .. } = people();
    let auto = g.with_preference(ExecutionPreference::Auto);

    let supported = auto.v().values(&["name"]).prepare().unwrap();
    let unsupported = auto.v().limit(2).count().prepare().unwrap();

    assert_eq!(supported.target(), ExecutionTarget::Olap);
    assert_eq!(unsupported.target(), ExecutionTarget::Oltp);
    assert_eq!(auto.v().limit(2).count().to_list().unwrap(), [Value::Int(2)]);

    let People { g, .. } = people_on(MemoryGraph::new().without_graph_computer());
    let plain = g.with_preference(ExecutionPreference::Auto).v().prepare().unwrap();
    assert_eq!(plain.target(), ExecutionTarget::Oltp);
}

#[test]
fn without_strategies_ignores_unknown_names() {
    let People { g, .. } = people();
    let found = g
        .without_strategies(&["NoSuchStrategy"])
        .v()
        .has_label(&["person"])
        .values(&["name"])
        .to_list()
        .unwrap();

    assert_eq!(sorted(found), names(&["alice", "bob", "carol"]));
}

#[test]
fn terminal_steps_compile_afresh() {
    let People { g, .. } = people();
    let t = g.v().has_value("name", "alice").out(&["knows"]).values(&["name"]);

    assert_eq!(t.next().unwrap(), Some(Value::from("bob")));
    assert_eq!(t.to_list().unwrap(), names(&["bob", "carol"]));
    assert_eq!(t.clone().count().to_list().unwrap(), [Value::Int(2)]);
}

#[test]
fn side_effects_are_collected() {
    let People { g, .. } = people();
    let effects = g
        .v()
        .has_label(&["person"])
        .values(&["age"])
        .store("ages")
        .side_effects()
        .unwrap();

    assert_eq!(
        effects.get("ages"),
        Some(&Value::List(vec![30.into(), 25.into(), 35.into()]))
    );
}

#[test]
fn assembly_errors_surface_before_iteration() {
    let People { g, .. } = people();

    assert_matches!(
        g.v().step("frobnicate", Vec::new()).to_list(),
        Err(Error::Compile(CompileError::UnknownOperator(op))) if op == "frobnicate"
    );
    assert_matches!(
        g.v().where_(__::start().times(2)).to_list(),
        Err(Error::Compile(CompileError::DanglingModulator(op))) if op == "times"
    );
    assert_matches!(
        g.v().by_key("name").to_list(),
        Err(Error::Compile(CompileError::DanglingModulator(_)))
    );
}

#[test]
fn edge_writes_stay_on_the_pull_chain() {
    let People { g, .. } = people();
    let t = |g: &crate::GraphTraversalSource| g.v().out_e(&[]).property("weight", 1).count();

    assert_matches!(
        t(&g.clone().with_computer()).to_list(),
        Err(Error::Compile(CompileError::NoVertexProgramEquivalent(step))) if step == "property"
    );
    let auto = g.with_preference(ExecutionPreference::Auto);
    assert_eq!(t(&auto).prepare().unwrap().target(), ExecutionTarget::Oltp);
    assert_eq!(t(&auto).to_list().unwrap(), [Value::Int(4)]);
}
