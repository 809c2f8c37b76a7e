use assert_matches::assert_matches;
use trellis_bytecode::{Bytecode, Traversal};
use trellis_core::Value;

use super::{ComputerVerificationStrategy, ExecutionTarget, StandardVerificationStrategy};
use crate::CompileError;
use crate::assemble;
use crate::test_utils::{apply_with, child, n, s, steps, traversal};

fn standard(mut t: Traversal) -> Result<(), CompileError> {
    apply_with(&StandardVerificationStrategy, &mut t, ExecutionTarget::Oltp)
}

fn computer(mut t: Traversal) -> Result<(), CompileError> {
    apply_with(&ComputerVerificationStrategy, &mut t, ExecutionTarget::Olap)
}

#[test]
fn unbounded_repeat_is_rejected() {
    let t = traversal([("V", vec![]), ("repeat", vec![child([("out", vec![])])])]);

    assert_matches!(standard(t), Err(CompileError::Verification(msg)) if msg.contains("repeat"));
}

#[test]
fn bounded_repeat_passes() {
    let t = traversal([
        ("V", vec![]),
        ("repeat", vec![child([("out", vec![])])]),
        ("until", vec![child([("hasLabel", vec![s("movie")])])]),
    ]);

    assert_matches!(standard(t), Ok(()));
}

#[test]
fn reserved_labels_are_rejected() {
    let t = traversal([
        ("V", vec![]),
        ("local", vec![child([("out", vec![]), ("as", vec![s("~mine")])])]),
    ]);

    assert_matches!(standard(t), Err(CompileError::Verification(msg)) if msg.contains("~mine"));
}

#[test]
fn sack_needs_with_sack() {
    let bytecode = steps([("V", vec![]), ("sack", vec![])]);
    let unbound = assemble(&bytecode).unwrap().traversal;
    assert_matches!(standard(unbound), Err(CompileError::Verification(_)));

    let mut bytecode = Bytecode::new();
    bytecode.add_source("withSack", vec![Value::Int(0).into()]);
    bytecode.add_step("V", vec![]);
    bytecode.add_step("sack", vec![]);
    let bound = assemble(&bytecode).unwrap().traversal;
    assert_matches!(standard(bound), Ok(()));
}

#[test]
fn computer_requires_vertex_source() {
    let t = traversal([("inject", vec![n(1)]), ("is", vec![n(1)])]);

    assert_matches!(
        computer(t),
        Err(CompileError::NoVertexProgramEquivalent(step)) if step == "inject"
    );
}

#[test]
fn computer_allows_only_trailing_range() {
    let trailing = traversal([("V", vec![]), ("out", vec![]), ("limit", vec![n(2)])]);
    assert_matches!(computer(trailing), Ok(()));

    let middle = traversal([("V", vec![]), ("limit", vec![n(2)]), ("out", vec![])]);
    assert_matches!(
        computer(middle),
        Err(CompileError::NoVertexProgramEquivalent(step)) if step == "range"
    );
}

#[test]
fn computer_rejects_shared_collections() {
    let t = traversal([("V", vec![]), ("store", vec![s("x")])]);
    assert_matches!(
        computer(t),
        Err(CompileError::NoVertexProgramEquivalent(step)) if step == "store"
    );

    let nested = traversal([
        ("V", vec![]),
        ("sideEffect", vec![child([("aggregate", vec![s("x")])])]),
    ]);
    assert_matches!(
        computer(nested),
        Err(CompileError::NoVertexProgramEquivalent(step)) if step == "aggregate"
    );
}

#[test]
fn computer_rejects_mutating_children() {
    let t = traversal([
        ("V", vec![]),
        ("local", vec![child([("property", vec![s("seen"), n(1)])])]),
    ]);

    assert_matches!(
        computer(t),
        Err(CompileError::NoVertexProgramEquivalent(step)) if step == "property"
    );
}

#[test]
fn computer_allows_root_mutation_and_barriers() {
    let t = traversal([
        ("V", vec![]),
        ("has", vec![s("age")]),
        ("property", vec![s("seen"), n(1)]),
        ("out", vec![]),
        ("dedup", vec![]),
        ("groupCount", vec![]),
    ]);

    assert_matches!(computer(t), Ok(()));
}

#[test]
fn computer_rejects_writes_off_vertices() {
    let on_edges = traversal([
        ("V", vec![]),
        ("outE", vec![]),
        ("property", vec![s("weight"), n(1)]),
        ("count", vec![]),
    ]);
    assert_matches!(
        computer(on_edges),
        Err(CompileError::NoVertexProgramEquivalent(step)) if step == "property"
    );

    let on_values = traversal([
        ("V", vec![]),
        ("values", vec![s("name")]),
        ("property", vec![s("seen"), n(1)]),
    ]);
    assert_matches!(computer(on_values), Err(CompileError::NoVertexProgramEquivalent(_)));

    let back_on_vertices = traversal([
        ("V", vec![]),
        ("outE", vec![]),
        ("inV", vec![]),
        ("dedup", vec![]),
        ("property", vec![s("seen"), n(1)]),
    ]);
    assert_matches!(computer(back_on_vertices), Ok(()));
}

#[test]
fn computer_checks_are_skipped_for_oltp() {
    let mut t = traversal([("inject", vec![n(1)]), ("store", vec![s("x")])]);

    assert_matches!(
        apply_with(&ComputerVerificationStrategy, &mut t, ExecutionTarget::Oltp),
        Ok(())
    );
}
