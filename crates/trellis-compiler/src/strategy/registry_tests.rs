use std::sync::Arc;

use assert_matches::assert_matches;
use trellis_bytecode::Traversal;
use trellis_core::{Capabilities, PhysicalStep};

use super::{
    ExecutionTarget, InlineFilterStrategy, SUBGRAPH_LABEL, StrategyCategory, StrategyContext, StrategyRegistry,
    SubgraphStrategy, TraversalStrategy,
};
use crate::CompileError;
use crate::error::CompileResult;
use crate::test_utils::{child, compile, compile_with, n, s, steps, traversal};

// `assert_matches!` formats the scrutinee on failure.
impl std::fmt::Debug for dyn TraversalStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

struct Named {
    name: &'static str,
    category: StrategyCategory,
    priors: &'static [&'static str],
    posteriors: &'static [&'static str],
}

impl Named {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            category: StrategyCategory::Optimization,
            priors: &[],
            posteriors: &[],
        }
    }
}

impl TraversalStrategy for Named {
    fn name(&self) -> &'static str {
        self.name
    }

    fn category(&self) -> StrategyCategory {
        self.category
    }

    fn priors(&self) -> &[&'static str] {
        self.priors
    }

    fn posteriors(&self) -> &[&'static str] {
        self.posteriors
    }

    fn apply(&self, _traversal: &mut Traversal, _ctx: &StrategyContext<'_>) -> CompileResult<()> {
        Ok(())
    }
}

fn ordered_names(registry: &StrategyRegistry) -> Vec<&'static str> {
    registry
        .ordered()
        .unwrap()
        .iter()
        .map(|s| s.name())
        .collect()
}

#[test]
fn standard_order() {
    insta::assert_snapshot!(ordered_names(&StrategyRegistry::standard()).join("\n"), @r"
    IdentityRemovalStrategy
    RepeatUnrollStrategy
    InlineFilterStrategy
    IncidentToAdjacentStrategy
    FilterRankingStrategy
    LazyBarrierStrategy
    IndexedSourceStrategy
    RequirementsStrategy
    StandardVerificationStrategy
    ComputerVerificationStrategy
    ");
}

#[test]
fn categories_override_registration_order() {
    let mut registry = StrategyRegistry::new();
    registry
        .add(Arc::new(Named {
            category: StrategyCategory::Finalization,
            ..Named::new("late")
        }))
        .unwrap();
    registry
        .add(Arc::new(Named {
            category: StrategyCategory::Decoration,
            ..Named::new("early")
        }))
        .unwrap();

    assert_eq!(ordered_names(&registry), ["early", "late"]);
}

#[test]
fn priors_and_posteriors_reorder_within_category() {
    let mut registry = StrategyRegistry::new();
    registry
        .add(Arc::new(Named {
            priors: &["b"],
            ..Named::new("a")
        }))
        .unwrap();
    registry.add(Arc::new(Named::new("b"))).unwrap();
    registry
        .add(Arc::new(Named {
            posteriors: &["b", "unregistered"],
            ..Named::new("c")
        }))
        .unwrap();

    assert_eq!(ordered_names(&registry), ["c", "b", "a"]);
}

#[test]
fn cycle_is_a_configuration_error() {
    let mut registry = StrategyRegistry::new();
    registry
        .add(Arc::new(Named {
            posteriors: &["b"],
            ..Named::new("a")
        }))
        .unwrap();
    registry
        .add(Arc::new(Named {
            posteriors: &["a"],
            ..Named::new("b")
        }))
        .unwrap();
    registry.add(Arc::new(Named::new("free"))).unwrap();

    assert_matches!(
        registry.ordered(),
        Err(CompileError::StrategyCycle(names)) if names == ["a", "b"]
    );
}

#[test]
fn duplicate_names_are_rejected() {
    let mut registry = StrategyRegistry::standard();

    assert_matches!(
        registry.add(Arc::new(InlineFilterStrategy)),
        Err(CompileError::DuplicateStrategy(name)) if name == "InlineFilterStrategy"
    );
}

#[test]
fn remove_by_name() {
    let mut registry = StrategyRegistry::standard();

    assert!(registry.remove("LazyBarrierStrategy"));
    assert!(!registry.remove("LazyBarrierStrategy"));
    assert!(!registry.contains("LazyBarrierStrategy"));
    assert_eq!(registry.names().len(), 9);
}

#[test]
fn strategies_reach_child_traversals() {
    let bytecode = steps([
        ("V", vec![]),
        (
            "local",
            vec![child([
                ("filter", vec![child([("has", vec![s("age")])])]),
                ("identity", vec![]),
            ])],
        ),
    ]);

    insta::assert_snapshot!(compile(&bytecode).dump(), @r"
    V()
    local()
      branch:
        has(age)
    ");
}

#[test]
fn standard_pipeline_composes_rewrites() {
    let bytecode = steps([
        ("V", vec![]),
        ("repeat", vec![child([("outE", vec![]), ("inV", vec![])])]),
        ("times", vec![n(2)]),
        ("filter", vec![child([("has", vec![s("age")])])]),
        ("hasLabel", vec![s("person")]),
    ]);

    insta::assert_snapshot!(compile(&bytecode).dump(), @r"
    V()
    out()
    barrier(2500)
    out()
    hasLabel(person)
    has(age)
    ");
}

#[test]
fn requirements_are_stored_on_the_root() {
    let bytecode = steps([("V", vec![]), ("as", vec![s("a")]), ("path", vec![])]);
    let compiled = compile(&bytecode);

    assert_eq!(compiled.requirements().to_string(), "[path, labels]");
}

#[test]
fn indexed_source_needs_the_capability() {
    let bytecode = steps([
        ("V", vec![]),
        ("has", vec![s("name"), s("alice")]),
        ("out", vec![]),
    ]);

    insta::assert_snapshot!(compile(&bytecode).dump(), @r"
    V()
    has(name, eq(alice))
    out()
    ");

    let capabilities =
        Capabilities::new().with_physical_step(PhysicalStep::PropertyIndexLookup);
    insta::assert_snapshot!(
        compile_with(&bytecode, &capabilities, ExecutionTarget::Oltp).dump(),
        @r"
    V().index(name, alice)
    out()
    "
    );
}

#[test]
fn applying_twice_is_a_no_op() {
    let bytecode = steps([
        ("V", vec![]),
        ("identity", vec![]),
        ("outE", vec![s("knows")]),
        ("inV", vec![]),
        ("out", vec![]),
        ("has", vec![s("age")]),
        ("hasId", vec![n(3)]),
        ("repeat", vec![child([("in", vec![])])]),
        ("times", vec![n(2)]),
        ("union", vec![child([("filter", vec![child([("hasLabel", vec![s("x")])])])])]),
    ]);
    let mut traversal = compile(&bytecode);
    let once = traversal.dump();

    StrategyRegistry::standard()
        .apply(&mut traversal, &Capabilities::new(), ExecutionTarget::Oltp)
        .unwrap();

    assert_eq!(traversal.dump(), once);
}

#[test]
fn subgraph_decorates_vertex_producing_steps() {
    let criterion = traversal([("has", vec![s("active"), n(1)])]);
    let mut registry = StrategyRegistry::standard();
    registry
        .add(Arc::new(SubgraphStrategy::new(criterion)))
        .unwrap();
    let mut t = traversal([
        ("V", vec![]),
        ("out", vec![]),
        ("values", vec![s("name")]),
        ("where", vec![child([("in", vec![])])]),
    ]);

    for _ in 0..2 {
        registry
            .apply(&mut t, &Capabilities::new(), ExecutionTarget::Oltp)
            .unwrap();
    }

    insta::assert_snapshot!(t.dump(), @r"
    V()
    filter() @~subgraph
      traversal:
        has(active, eq(1))
    out()
    filter() @~subgraph
      traversal:
        has(active, eq(1))
    values(name)
    filter()
      traversal:
        in()
        filter() @~subgraph
          traversal:
            has(active, eq(1))
    ");
    assert_eq!(t.steps()[1].labels, [SUBGRAPH_LABEL]);
}
