mod common;

use assert_matches::assert_matches;
use trellis::compiler::{ExecutionTarget, StrategyRegistry, assemble};
use trellis::computer::{COMPONENT_KEY, ComputerError, ConnectedComponentProgram, GraphComputer};
use trellis::{
    ComputerConfig, Error, GraphRead, GraphTraversal, GraphTraversalSource, Operator, Order, Steps,
    Value, __,
};

use common::{people, sorted};

type Build = fn(&GraphTraversalSource) -> GraphTraversal;

fn case(name: &'static str, build: Build) -> (&'static str, Build) {
    (name, build)
}

fn read_only_cases() -> Vec<(&'static str, Build)> {
    vec![
        case("names", |g| g.v().values(&["name"])),
        case("knows", |g| g.v().out(&["knows"]).values(&["name"])),
        case("two hops", |g| g.v().out(&[]).out(&[]).values(&["name"])),
        case("edges", |g| g.v().out_e(&[]).in_v().values(&["name"])),
        case("degree", |g| g.v().both(&[]).dedup().count()),
        case("ages", |g| g.v().has_label(&["person"]).values(&["age"]).sum()),
        case("oldest", |g| g.v().values(&["age"]).max()),
        case("ordered", |g| {
            g.v()
                .has_label(&["person"])
                .order()
                .by_key_order("age", Order::Desc)
                .values(&["name"])
        }),
        case("repeat", |g| g.v().repeat(__::out(&[])).times(2).values(&["name"])),
        case("nested repeat", |g| {
            g.v()
                .repeat(__::out(&[]).repeat(__::out(&[])).times(1))
                .times(2)
                .count()
        }),
        case("labels", |g| {
            g.v()
                .as_("x")
                .out(&["created"])
                .select(&["x"])
                .values(&["name"])
        }),
        case("where", |g| {
            g.v()
                .has_value("name", "alice")
                .out(&["knows"])
                .where_(__::out(&["created"]))
                .count()
        }),
        case("fold", |g| g.v().has_label(&["person"]).fold().unfold().values(&["name"])),
        case("paths", |g| g.v().out(&["created"]).path()),
        case("coalesce", |g| {
            g.v()
                .coalesce([__::out(&["knows"]), __::out(&["created"])])
                .values(&["name"])
        }),
        case("sack", |g| {
            g.clone()
                .with_sack(0)
                .v()
                .has_label(&["person"])
                .sack_with(Operator::Sum)
                .by_key("age")
                .sack()
                .sum()
        }),
        case("vertex labels", |g| g.v().label()),
    ]
}

#[test]
fn both_engines_agree() {
    let fixture = people();
    for (name, build) in read_only_cases() {
        let oltp = sorted(build(&fixture.g).to_list().unwrap());
        for workers in [1, 3] {
            let g = fixture
                .g
                .clone()
                .with_computer()
                .with_computer_config(ComputerConfig {
                    workers,
                    ..ComputerConfig::default()
                });
            let olap = sorted(build(&g).to_list().unwrap());
            assert_eq!(oltp, olap, "`{name}` with {workers} workers");
        }
    }
}

#[test]
fn repeated_start_ids_start_repeated_traversers() {
    let fixture = people();
    let alice = fixture.ids[0];
    let names = |g: &GraphTraversalSource| g.v_ids([alice, alice]).values(&["name"]).to_list();

    let oltp = names(&fixture.g).unwrap();
    let olap = names(&fixture.g.clone().with_computer()).unwrap();

    assert_eq!(oltp, [Value::from("alice"), Value::from("alice")]);
    assert_eq!(olap, oltp);
}

#[test]
fn bulking_preserves_counts() {
    let fixture = people();
    let g = &fixture.g;

    assert!(
        g.v()
            .both(&[])
            .both(&[])
            .explain()
            .unwrap()
            .contains("barrier(2500)")
    );
    assert_eq!(g.v().both(&[]).count().to_list().unwrap(), [Value::Int(8)]);
    assert_eq!(
        g.v().both(&[]).both(&[]).count().to_list().unwrap(),
        [Value::Int(16)]
    );
    assert_eq!(
        g.clone()
            .with_computer()
            .v()
            .both(&[])
            .both(&[])
            .count()
            .to_list()
            .unwrap(),
        [Value::Int(16)]
    );
}

#[test]
fn strategies_are_idempotent() {
    let fixture = people();
    let registry = StrategyRegistry::standard();
    let capabilities = fixture.graph.capabilities();
    for (name, build) in read_only_cases() {
        for target in [ExecutionTarget::Oltp, ExecutionTarget::Olap] {
            let mut traversal = assemble(build(&fixture.g).bytecode()).unwrap().traversal;
            registry.apply(&mut traversal, &capabilities, target).unwrap();
            let once = traversal.dump();
            registry.apply(&mut traversal, &capabilities, target).unwrap();
            assert_eq!(once, traversal.dump(), "`{name}` on {target:?}");
        }
    }
}

#[test]
fn transient_keys_never_reach_the_graph() {
    let fixture = people();
    let before = fixture.property_keys();

    let counted = fixture
        .g
        .clone()
        .with_computer()
        .v()
        .out(&[])
        .dedup()
        .count()
        .to_list()
        .unwrap();
    assert_eq!(counted, [Value::Int(3)]);
    assert_eq!(fixture.property_keys(), before);

    let result = GraphComputer::new(&*fixture.graph)
        .submit(&ConnectedComponentProgram::new())
        .unwrap();
    assert!(result.supersteps > 1);
    for keys in fixture.property_keys() {
        assert_eq!(keys.last().map(String::as_str), Some(COMPONENT_KEY));
        assert!(keys.iter().all(|k| !k.starts_with('~')), "{keys:?}");
    }
}

#[test]
fn aborted_runs_write_nothing() {
    let fixture = people();
    let before = fixture.property_keys();

    let outcome = fixture
        .g
        .clone()
        .with_computer()
        .v()
        .property("seen", true)
        .values(&["name"])
        .sum()
        .to_list();

    assert_matches!(outcome, Err(Error::Computer(ComputerError::Execution { .. })));
    assert_eq!(fixture.property_keys(), before);
    assert_eq!(fixture.g.v().has_key("seen").count().to_list().unwrap(), [Value::Int(0)]);
}

#[test]
fn completed_runs_write_back() {
    let fixture = people();

    fixture
        .g
        .clone()
        .with_computer()
        .v()
        .has_label(&["software"])
        .property("seen", true)
        .iterate()
        .unwrap();

    let seen = fixture
        .g
        .v()
        .has_value("seen", true)
        .map(__::label())
        .to_list()
        .unwrap();
    assert_eq!(seen, [Value::from("software")]);
}
