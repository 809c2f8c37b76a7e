//! Traversal sources.
//!
//! A source pins down everything a traversal inherits besides its steps:
//! the graph, the strategy registry, the execution preference and the
//! computer settings. `with_*` methods return a new source and leave the
//! original untouched, so one base source can spawn differently configured
//! ones.

use std::sync::Arc;

use trellis_bytecode::{Argument, Bytecode, Token};
use trellis_compiler::{StrategyRegistry, TraversalStrategy};
use trellis_computer::ComputerConfig;
use trellis_core::{Operator, SackSplit, SharedGraph, Value};

use crate::Result;
use crate::steps::{Steps, text};
use crate::traversal::GraphTraversal;

/// Which engine runs a traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionPreference {
    /// The single-threaded pull chain.
    #[default]
    Oltp,
    /// A vertex program on the graph computer. Fails to compile when the
    /// graph or the traversal cannot run that way.
    Olap,
    /// The graph computer when the graph advertises one and the traversal
    /// passes its verification, the pull chain otherwise.
    Auto,
}

/// What a traversal carries over from its source.
#[derive(Clone)]
pub(crate) struct Session {
    pub graph: SharedGraph,
    pub strategies: StrategyRegistry,
    pub preference: ExecutionPreference,
    pub computer: ComputerConfig,
}

/// Entry point for traversals over one graph.
#[derive(Clone)]
pub struct GraphTraversalSource {
    session: Session,
    /// Source instructions only.
    bytecode: Bytecode,
}

impl GraphTraversalSource {
    /// A source over `graph` with the standard strategies.
    pub fn new(graph: SharedGraph) -> Self {
        Self {
            session: Session {
                graph,
                strategies: StrategyRegistry::standard(),
                preference: ExecutionPreference::default(),
                computer: ComputerConfig::default(),
            },
            bytecode: Bytecode::new(),
        }
    }

    pub fn graph(&self) -> &SharedGraph {
        &self.session.graph
    }

    pub fn strategies(&self) -> &StrategyRegistry {
        &self.session.strategies
    }

    pub fn preference(&self) -> ExecutionPreference {
        self.session.preference
    }

    pub fn bytecode(&self) -> &Bytecode {
        &self.bytecode
    }

    /// Register additional strategies.
    pub fn with_strategies(
        mut self,
        strategies: impl IntoIterator<Item = Arc<dyn TraversalStrategy>>,
    ) -> Result<Self> {
        for strategy in strategies {
            self.session.strategies.add(strategy)?;
        }
        Ok(self)
    }

    /// Replace the strategy registry.
    pub fn with_registry(mut self, strategies: StrategyRegistry) -> Self {
        self.session.strategies = strategies;
        self
    }

    /// Skip the named strategies for traversals of this source.
    pub fn without_strategies(mut self, names: &[&str]) -> Self {
        if !names.is_empty() {
            self.bytecode.add_source("withoutStrategies", text(names));
        }
        self
    }

    /// Give every traverser a sack starting at `initial`.
    pub fn with_sack(mut self, initial: impl Into<Value>) -> Self {
        self.bytecode
            .add_source("withSack", vec![Argument::Value(initial.into())]);
        self
    }

    /// Like [`with_sack`](Self::with_sack), merging sacks with `merge` when
    /// traversers bulk together.
    pub fn with_sack_merge(mut self, initial: impl Into<Value>, merge: Operator) -> Self {
        self.bytecode.add_source(
            "withSack",
            vec![
                Argument::Value(initial.into()),
                Argument::Token(Token::Operator(merge)),
            ],
        );
        self
    }

    /// Full sack configuration: initial value, optional merge operator and
    /// how branches inherit the sack.
    pub fn with_sack_options(
        mut self,
        initial: impl Into<Value>,
        merge: Option<Operator>,
        split: SackSplit,
    ) -> Self {
        let mut arguments = vec![Argument::Value(initial.into())];
        if let Some(merge) = merge {
            arguments.push(Argument::Token(Token::Operator(merge)));
        }
        let split = match split {
            SackSplit::Copy => "copy",
            SackSplit::Reset => "reset",
        };
        arguments.push(Argument::Value(Value::from(split)));
        self.bytecode.add_source("withSack", arguments);
        self
    }

    /// Seed a side-effect collection readable with `select(key)`.
    pub fn with_side_effect(mut self, key: &str, initial: impl Into<Value>) -> Self {
        self.bytecode.add_source(
            "withSideEffect",
            vec![Argument::Value(Value::from(key)), Argument::Value(initial.into())],
        );
        self
    }

    /// Run traversals as vertex programs.
    pub fn with_computer(mut self) -> Self {
        self.bytecode.add_source("withComputer", Vec::new());
        self
    }

    pub fn with_computer_config(mut self, config: ComputerConfig) -> Self {
        self.session.computer = config;
        self
    }

    pub fn with_preference(mut self, preference: ExecutionPreference) -> Self {
        self.session.preference = preference;
        self
    }

    /// Every vertex.
    pub fn v(&self) -> GraphTraversal {
        self.start("V", Vec::new())
    }

    /// Vertices by id, as [`VertexId`](trellis_core::VertexId)s or integers.
    pub fn v_ids<I>(&self, ids: I) -> GraphTraversal
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.start("V", values(ids))
    }

    /// Every edge.
    pub fn e(&self) -> GraphTraversal {
        self.start("E", Vec::new())
    }

    pub fn e_ids<I>(&self, ids: I) -> GraphTraversal
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.start("E", values(ids))
    }

    /// Start from arbitrary values rather than graph elements.
    pub fn inject<I>(&self, items: I) -> GraphTraversal
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.start("inject", values(items))
    }

    fn start(&self, operator: &str, arguments: Vec<Argument>) -> GraphTraversal {
        GraphTraversal::new(self.session.clone(), self.bytecode.clone()).step(operator, arguments)
    }
}

fn values<I>(items: I) -> Vec<Argument>
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    items
        .into_iter()
        .map(|item| Argument::Value(item.into()))
        .collect()
}
