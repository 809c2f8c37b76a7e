//! From bytecode to results.
//!
//! Preparing a traversal assembles its bytecode, drops the strategies named
//! by `withoutStrategies`, picks the engine and applies the remaining
//! strategies for it. The locked result is a [`Prepared`], which can be
//! iterated exactly once.

use indexmap::IndexMap;
use log::debug;
use trellis_bytecode::{Bytecode, StateError, Traversal};
use trellis_compiler::{
    Assembled, CompileError, CompileResult, ExecutionTarget, StrategyRegistry, assemble,
};
use trellis_computer::{ComputerConfig, GraphComputer, TraversalVertexProgram};
use trellis_core::{Capabilities, SharedGraph, Value};
use trellis_vm::{ExecutionError, Executor, NoopTracer, Pipeline, Results, SideEffects};

use crate::source::{ExecutionPreference, Session};
use crate::{Error, Result};

pub(crate) fn prepare(session: &Session, bytecode: &Bytecode) -> Result<Prepared> {
    let Assembled {
        traversal,
        with_computer,
        without_strategies,
    } = assemble(bytecode)?;

    let mut strategies = session.strategies.clone();
    for name in &without_strategies {
        if !strategies.remove(name) {
            debug!("withoutStrategies: `{name}` is not registered");
        }
    }

    let capabilities = session.graph.capabilities();
    let preference = if with_computer {
        ExecutionPreference::Olap
    } else {
        session.preference
    };
    let (mut traversal, target) = match preference {
        ExecutionPreference::Oltp => (
            compile(&strategies, traversal, &capabilities, ExecutionTarget::Oltp)?,
            ExecutionTarget::Oltp,
        ),
        ExecutionPreference::Olap => {
            if !capabilities.graph_computer {
                return Err(CompileError::ComputerUnavailable.into());
            }
            (
                compile(&strategies, traversal, &capabilities, ExecutionTarget::Olap)?,
                ExecutionTarget::Olap,
            )
        }
        ExecutionPreference::Auto if capabilities.graph_computer => {
            match compile(&strategies, traversal.clone(), &capabilities, ExecutionTarget::Olap) {
                Ok(compiled) => (compiled, ExecutionTarget::Olap),
                Err(e) => {
                    debug!("falling back to the pull chain: {e}");
                    (
                        compile(&strategies, traversal, &capabilities, ExecutionTarget::Oltp)?,
                        ExecutionTarget::Oltp,
                    )
                }
            }
        }
        ExecutionPreference::Auto => (
            compile(&strategies, traversal, &capabilities, ExecutionTarget::Oltp)?,
            ExecutionTarget::Oltp,
        ),
    };
    traversal.lock();
    debug!("prepared {} steps for {target:?}", traversal.len());

    let side_effects = SideEffects::new(traversal.side_effects().clone());
    Ok(Prepared {
        graph: session.graph.clone(),
        traversal,
        target,
        computer: session.computer,
        side_effects,
        started: false,
    })
}

fn compile(
    strategies: &StrategyRegistry,
    mut traversal: Traversal,
    capabilities: &Capabilities,
    target: ExecutionTarget,
) -> CompileResult<Traversal> {
    strategies.apply(&mut traversal, capabilities, target)?;
    Ok(traversal)
}

/// A compiled, locked traversal bound to its graph and engine.
pub struct Prepared {
    graph: SharedGraph,
    traversal: Traversal,
    target: ExecutionTarget,
    computer: ComputerConfig,
    side_effects: SideEffects,
    started: bool,
}

impl Prepared {
    pub fn traversal(&self) -> &Traversal {
        &self.traversal
    }

    pub fn target(&self) -> ExecutionTarget {
        self.target
    }

    pub fn explain(&self) -> String {
        self.traversal.dump()
    }

    /// Side-effect collections as they stand now.
    ///
    /// Vertex programs only read side-effects, so for them this is the
    /// seeded state.
    pub fn side_effects(&self) -> IndexMap<String, Value> {
        self.side_effects.snapshot()
    }

    /// Start the one iteration this traversal allows.
    pub fn iter(&mut self) -> Result<Iter<'_>> {
        if self.started {
            return Err(StateError::AlreadyStarted.into());
        }
        self.started = true;
        let this: &Self = self;
        let inner = match this.target {
            ExecutionTarget::Oltp => {
                let exec = Executor::new(&*this.graph, &this.side_effects, &NoopTracer)
                    .with_sack(this.traversal.sack())
                    .with_path_tracking(this.traversal.requirements().path);
                Inner::Oltp(Results::new(Pipeline::root(exec, &this.traversal)))
            }
            ExecutionTarget::Olap => Inner::Olap {
                prepared: this,
                state: OlapState::Pending,
            },
        };
        Ok(Iter { inner })
    }

    fn submit(&self) -> Result<Vec<Value>> {
        let program = TraversalVertexProgram::new(self.traversal.clone())?;
        let computer = GraphComputer::with_config(&*self.graph, self.computer);
        let result = computer.submit(&program)?;
        Ok(TraversalVertexProgram::halted(&result.memory)
            .iter()
            .flat_map(|t| std::iter::repeat_n(t.object.clone(), bulk(t.bulk())))
            .collect())
    }
}

fn bulk(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

enum OlapState {
    /// The vertex program has not run yet.
    Pending,
    Running(std::vec::IntoIter<Value>),
    Failed,
    Exhausted,
}

enum Inner<'p> {
    Oltp(Results<'p>),
    Olap {
        prepared: &'p Prepared,
        state: OlapState,
    },
}

/// Results of a [`Prepared`] traversal, one value per unit of bulk.
///
/// The sequence ends after the first error. Reading past the end yields
/// [`StateError::Exhausted`].
pub struct Iter<'p> {
    inner: Inner<'p>,
}

impl Iterator for Iter<'_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            Inner::Oltp(results) => results.next().map(|r| r.map_err(lift)),
            Inner::Olap { prepared, state } => match state {
                OlapState::Pending => match prepared.submit() {
                    Ok(values) => {
                        let mut values = values.into_iter();
                        let first = values.next();
                        *state = if first.is_some() {
                            OlapState::Running(values)
                        } else {
                            OlapState::Exhausted
                        };
                        first.map(Ok)
                    }
                    Err(e) => {
                        *state = OlapState::Failed;
                        Some(Err(e))
                    }
                },
                OlapState::Running(values) => match values.next() {
                    Some(value) => Some(Ok(value)),
                    None => {
                        *state = OlapState::Exhausted;
                        None
                    }
                },
                OlapState::Failed => {
                    *state = OlapState::Exhausted;
                    None
                }
                OlapState::Exhausted => Some(Err(StateError::Exhausted.into())),
            },
        }
    }
}

/// Lifecycle errors keep their own variant whichever engine raised them.
fn lift(e: ExecutionError) -> Error {
    match e {
        ExecutionError::State(state) => Error::State(state),
        other => Error::Execution(other),
    }
}
