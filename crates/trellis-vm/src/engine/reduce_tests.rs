use assert_matches::assert_matches;
use trellis_bytecode::{
    BarrierStep, By, FilterStep, FlatMapStep, Order, SackConfig, Step, T, Traversal,
};
use trellis_core::{Operator, OperatorError, Traverser, Value};

use super::reduce::RangeWindow;
use super::test_utils::{
    People, barrier, inject, out, people, range, run, show, try_run, v, v_ids, values,
};
use super::{ExecutionError, Executor, NoopTracer, SideEffects};

fn ints(ns: &[i64]) -> Vec<Value> {
    ns.iter().copied().map(Value::Int).collect()
}

#[test]
fn range_window_trims_bulk() {
    let mut window = RangeWindow::new(2, Some(5));
    assert_eq!(window.admit(Traverser::new(1).with_bulk(3)).map(|t| t.bulk()), Some(1));
    assert!(!window.is_full());
    assert_eq!(window.admit(Traverser::new(2).with_bulk(4)).map(|t| t.bulk()), Some(2));
    assert!(window.is_full());
    assert_eq!(window.admit(Traverser::new(3)), None);
}

#[test]
fn range_window_without_upper_bound_skips() {
    let mut window = RangeWindow::new(1, None);
    assert_eq!(window.admit(Traverser::new(1)), None);
    assert_eq!(window.admit(Traverser::new(2)).map(|t| t.object), Some(Value::Int(2)));
    assert!(!window.is_full());
}

#[test]
fn count_of_nothing_is_zero() {
    let People { graph, .. } = people();
    let found = run(
        &graph,
        vec![
            v(),
            Step::filter(FilterStep::HasLabel(vec!["robot".to_owned()])),
            barrier(BarrierStep::Count),
        ],
    );
    assert_eq!(found, ints(&[0]));
}

#[test]
fn count_sums_bulk() {
    let People { graph, lop, .. } = people();
    let found = run(&graph, vec![v(), out(&["created"]), barrier(BarrierStep::Count)]);
    assert_eq!(found, ints(&[2]));
    let vertices = run(&graph, vec![v(), out(&["created"])]);
    assert_eq!(vertices, [Value::Vertex(lop), Value::Vertex(lop)]);
}

#[test]
fn numeric_reducers() {
    let People { graph, .. } = people();
    let ages = || vec![v(), values("age")];
    let with = |kind: BarrierStep| {
        let mut steps = ages();
        steps.push(barrier(kind));
        run(&graph, steps)
    };
    assert_eq!(with(BarrierStep::Sum), ints(&[90]));
    assert_eq!(with(BarrierStep::Min), ints(&[25]));
    assert_eq!(with(BarrierStep::Max), ints(&[35]));
    assert_eq!(with(BarrierStep::Mean), [Value::Float(30.0)]);
}

#[test]
fn empty_numeric_reducers_emit_nothing() {
    let People { graph, .. } = people();
    for kind in [BarrierStep::Sum, BarrierStep::Min, BarrierStep::Max, BarrierStep::Mean] {
        let found = run(&graph, vec![inject(Vec::new()), barrier(kind)]);
        assert!(found.is_empty());
    }
    let folded = run(&graph, vec![inject(Vec::new()), barrier(BarrierStep::Fold)]);
    assert_eq!(folded, [Value::List(Vec::new())]);
}

#[test]
fn sum_of_strings_fails() {
    let People { graph, .. } = people();
    let err = try_run(
        &graph,
        &Traversal::from_steps(vec![v(), values("name"), barrier(BarrierStep::Sum)]),
    )
    .unwrap_err();
    assert_matches!(err, ExecutionError::Operator(OperatorError::TypeMismatch { .. }));
}

#[test]
fn fold_expands_bulk() {
    let People { graph, .. } = people();
    let found = run(
        &graph,
        vec![v(), out(&["created"]), values("name"), barrier(BarrierStep::Fold)],
    );
    insta::assert_snapshot!(show(&found), @"[lop, lop]");
}

#[test]
fn group_count_by_label() {
    let People { graph, .. } = people();
    let found = run(
        &graph,
        vec![v(), barrier(BarrierStep::GroupCount { by: By::T(T::Label) })],
    );
    insta::assert_snapshot!(show(&found), @"{person=3, software=1}");
}

#[test]
fn order_by_key_descending() {
    let People { graph, .. } = people();
    let found = run(
        &graph,
        vec![
            v(),
            barrier(BarrierStep::Order {
                by: vec![(By::Key("age".to_owned()), Order::Desc)],
            }),
            values("name"),
        ],
    );
    insta::assert_snapshot!(show(&found), @r"
    carol
    alice
    bob
    ");
}

#[test]
fn order_without_modulator_sorts_objects() {
    let People { graph, .. } = people();
    let found = run(
        &graph,
        vec![
            inject(ints(&[3, 1, 2])),
            barrier(BarrierStep::Order { by: Vec::new() }),
        ],
    );
    assert_eq!(found, ints(&[1, 2, 3]));
}

#[test]
fn dedup_keeps_first_of_each_object() {
    let People { graph, lop, .. } = people();
    let found = run(&graph, vec![v(), out(&[]), Step::filter(FilterStep::Dedup)]);
    assert_eq!(found.len(), 3);
    assert_eq!(found.last(), Some(&Value::Vertex(lop)));
}

#[test]
fn range_limits_results() {
    let People { graph, .. } = people();
    let found = run(&graph, vec![v(), range(1, Some(3)), values("name")]);
    insta::assert_snapshot!(show(&found), @r"
    bob
    carol
    ");
}

#[test]
fn aggregate_fills_side_effect_before_emitting() {
    let People { graph, .. } = people();
    let side_effects = SideEffects::default();
    let exec = Executor::new(&graph, &side_effects, &NoopTracer);
    let step = barrier(BarrierStep::Aggregate { key: "seen".to_owned() });
    let mut set = exec.traverser_set();
    set.add(Traverser::new(1).with_bulk(2)).unwrap();
    set.add(Traverser::new(2)).unwrap();
    let out = exec.reduce(&step, set).unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(side_effects.get("seen"), Some(Value::List(ints(&[1, 1, 2]))));
}

#[test]
fn counts_saturate_instead_of_wrapping() {
    let People { graph, .. } = people();
    let side_effects = SideEffects::default();
    let exec = Executor::new(&graph, &side_effects, &NoopTracer);
    let reduce = |kind: BarrierStep| {
        let mut set = exec.traverser_set();
        set.add(Traverser::new(1).with_bulk(u64::MAX)).unwrap();
        set.add(Traverser::new(1).with_bulk(3)).unwrap();
        exec.reduce(&barrier(kind), set).unwrap().remove(0).object
    };

    assert_eq!(reduce(BarrierStep::Count), Value::Int(i64::MAX));
    assert_eq!(
        reduce(BarrierStep::GroupCount { by: By::Identity }),
        Value::Map(vec![(Value::Int(1), Value::Int(i64::MAX))])
    );
}

#[test]
fn reducers_start_fresh_traversers() {
    let People { graph, alice, .. } = people();
    let mut traversal = Traversal::from_steps(vec![
        v_ids(&[alice]).with_labels(["a"]),
        barrier(BarrierStep::Count),
        Step::flat_map(FlatMapStep::Path),
    ]);
    traversal.set_sack(Some(SackConfig::new(7))).unwrap();
    let found = try_run(&graph, &traversal).unwrap();
    assert_eq!(found, [Value::List(ints(&[1]))]);
}

#[test]
fn merged_sacks_combine_on_coalesce() {
    let People { graph, .. } = people();
    let side_effects = SideEffects::default();
    let sack = SackConfig::new(0).with_merge(Operator::Sum);
    let exec = Executor::new(&graph, &side_effects, &NoopTracer).with_sack(Some(&sack));
    let mut set = exec.traverser_set();
    set.add(Traverser::new(1).with_sack(Some(Value::Int(2)))).unwrap();
    set.add(Traverser::new(1).with_sack(Some(Value::Int(3)))).unwrap();
    let step = barrier(BarrierStep::NoOp { max_size: None });
    let out = exec.reduce(&step, set).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].bulk(), 2);
    assert_eq!(out[0].sack, Some(Value::Int(5)));
}
