//! A compiled traversal run as a vertex program.
//!
//! Traversers travel as messages tagged with the index of the next step
//! they must take. A traverser lives at the host of its object: a vertex
//! hosts itself, an edge is hosted by its out-vertex, and any other value
//! stays wherever it was produced. Each host runs the per-traverser steps it
//! can, forwards traversers whose object moved elsewhere, and parks
//! traversers that reach a global step in memory. The master reduces the
//! lowest parked global step once no messages are in flight and hands the
//! results back out.

use std::cell::RefCell;
use std::collections::VecDeque;

use indexmap::IndexMap;
use trellis_bytecode::{FilterStep, FlatMapStep, SideEffectStep, Step, StepKind, Traversal};
use trellis_compiler::strategy::ComputerVerificationStrategy;
use trellis_core::{
    Capabilities, Direction, EdgeId, Element, GraphRead, GraphStore, GraphWrite, StoreError,
    StoreResult, Traverser, Value, VertexId,
};
use trellis_vm::{ExecResult, ExecutionError, Executor, NoopTracer, SideEffects};

use crate::compute_key::VertexComputeKey;
use crate::error::ComputerError;
use crate::memory::{Memory, MemoryKey, MemorySnapshot, Reducer};
use crate::program::{MasterContext, Termination, VertexContext, VertexProgram};

/// Memory key collecting traversers that passed the last step.
pub const HALTED_KEY: &str = "~halted";

fn barrier_key(index: usize) -> String {
    format!("~barrier.{index}")
}

/// A traverser in flight, with the index of the step it takes next.
#[derive(Debug, Clone, PartialEq)]
pub struct TraverserMessage {
    pub step: usize,
    pub traverser: Traverser,
}

/// Graph view of one host during a superstep.
///
/// Reads see the host's compute-key values over its stored properties.
/// Writes land in those compute keys; nothing else is writable.
struct HostView<'g> {
    graph: &'g (dyn GraphRead + Sync),
    host: Option<VertexId>,
    keys: &'g [String],
    values: RefCell<IndexMap<String, Value>>,
}

impl<'g> HostView<'g> {
    /// The master's view: reads only.
    fn detached(graph: &'g (dyn GraphRead + Sync), keys: &'g [String]) -> Self {
        Self {
            graph,
            host: None,
            keys,
            values: RefCell::new(IndexMap::new()),
        }
    }

    fn is_host(&self, element: Element) -> bool {
        self.host.is_some_and(|host| element == Element::Vertex(host))
    }
}

fn read_only(element: Element, reason: impl Into<String>) -> StoreError {
    StoreError::ReadOnly {
        element,
        reason: reason.into(),
    }
}

impl GraphRead for HostView<'_> {
    fn capabilities(&self) -> Capabilities {
        self.graph.capabilities()
    }

    fn vertices(&self, ids: &[VertexId]) -> StoreResult<Vec<VertexId>> {
        self.graph.vertices(ids)
    }

    fn edges(&self, ids: &[EdgeId]) -> StoreResult<Vec<EdgeId>> {
        self.graph.edges(ids)
    }

    fn vertices_by_property(&self, key: &str, value: &Value) -> StoreResult<Vec<VertexId>> {
        self.graph.vertices_by_property(key, value)
    }

    fn label(&self, element: Element) -> StoreResult<String> {
        self.graph.label(element)
    }

    fn property(&self, element: Element, key: &str) -> StoreResult<Option<Value>> {
        if self.is_host(element)
            && let Some(value) = self.values.borrow().get(key)
        {
            return Ok(Some(value.clone()));
        }
        self.graph.property(element, key)
    }

    fn property_keys(&self, element: Element) -> StoreResult<Vec<String>> {
        let mut keys = self.graph.property_keys(element)?;
        if self.is_host(element) {
            for key in self.values.borrow().keys() {
                if !keys.contains(key) {
                    keys.push(key.clone());
                }
            }
        }
        Ok(keys)
    }

    fn incident_edges(
        &self,
        vertex: VertexId,
        direction: Direction,
        labels: &[String],
    ) -> StoreResult<Vec<EdgeId>> {
        self.graph.incident_edges(vertex, direction, labels)
    }

    fn endpoints(&self, edge: EdgeId) -> StoreResult<(VertexId, VertexId)> {
        self.graph.endpoints(edge)
    }
}

impl GraphWrite for HostView<'_> {
    fn write_property(&self, element: Element, key: &str, value: Value) -> StoreResult<()> {
        if !self.is_host(element) {
            return Err(read_only(element, "only the host vertex is writable in a superstep"));
        }
        if !self.keys.iter().any(|k| k == key) {
            return Err(read_only(element, format!("`{key}` is not a compute key")));
        }
        self.values.borrow_mut().insert(key.to_owned(), value);
        Ok(())
    }

    fn remove_property(&self, element: Element, _key: &str) -> StoreResult<Option<Value>> {
        Err(read_only(element, "properties cannot be removed in a superstep"))
    }
}

/// Where traversers went after a host processed them.
#[derive(Default)]
struct Routed {
    messages: Vec<(VertexId, TraverserMessage)>,
    /// global step index -> traversers waiting for it
    parked: IndexMap<usize, Vec<Traverser>>,
    halted: Vec<Traverser>,
}

fn host_of(graph: &dyn GraphStore, object: &Value) -> ExecResult<Option<VertexId>> {
    Ok(match object {
        Value::Vertex(v) => Some(*v),
        Value::Edge(e) => Some(graph.endpoints(*e)?.0),
        _ => None,
    })
}

fn names_vertex(id: &Value, vertex: VertexId) -> bool {
    match id {
        Value::Vertex(v) => *v == vertex,
        Value::Int(n) => u64::try_from(*n).is_ok_and(|n| n == vertex.0),
        _ => false,
    }
}

fn collect_written(traversal: &Traversal, keys: &mut Vec<String>) {
    for step in traversal.steps() {
        if let StepKind::SideEffect(SideEffectStep::Property { key, .. }) = &step.kind
            && !keys.contains(key)
        {
            keys.push(key.clone());
        }
        for child in step.children() {
            collect_written(child, keys);
        }
    }
}

/// Runs a locked OLAP traversal on a [`GraphComputer`](crate::GraphComputer).
pub struct TraversalVertexProgram {
    traversal: Traversal,
    /// Property keys the traversal writes; each is a persistent compute key.
    written: Vec<String>,
    global: Vec<usize>,
    track_path: bool,
    /// A closing `range` with an upper bound: `(index, high)`.
    trailing_range: Option<(usize, u64)>,
}

impl TraversalVertexProgram {
    pub fn new(traversal: Traversal) -> Result<Self, ComputerError> {
        ComputerVerificationStrategy::verify(&traversal)?;
        let mut written = Vec::new();
        collect_written(&traversal, &mut written);
        let steps = traversal.steps();
        let global = (0..steps.len()).filter(|&i| steps[i].is_global()).collect();
        let trailing_range = match steps.last().map(|s| &s.kind) {
            Some(StepKind::Filter(FilterStep::Range {
                high: Some(high), ..
            })) => Some((steps.len() - 1, *high)),
            _ => None,
        };
        let track_path = traversal.requirements().path;
        Ok(Self {
            traversal,
            written,
            global,
            track_path,
            trailing_range,
        })
    }

    pub fn traversal(&self) -> &Traversal {
        &self.traversal
    }

    /// Traversers that completed the traversal in a finished run.
    pub fn halted(memory: &MemorySnapshot) -> &[Traverser] {
        memory.traversers(HALTED_KEY).unwrap_or(&[])
    }

    fn executor<'a>(&'a self, graph: &'a dyn GraphStore, side_effects: &'a SideEffects) -> Executor<'a> {
        Executor::new(graph, side_effects, &NoopTracer)
            .with_sack(self.traversal.sack())
            .with_path_tracking(self.track_path)
    }

    /// Seed side-effects, as currently held in memory.
    fn side_effects(&self, memory: &Memory) -> Result<SideEffects, ComputerError> {
        let mut seeded = IndexMap::new();
        for key in self.traversal.side_effects().keys() {
            seeded.insert(key.clone(), memory.get(key)?.clone());
        }
        Ok(SideEffects::new(seeded))
    }

    /// How many traversers the source step starts at `vertex`; `V(a, a)`
    /// starts two.
    fn seeds(&self, graph: &dyn GraphRead, vertex: VertexId) -> ExecResult<u64> {
        let Some(first) = self.traversal.steps().first() else {
            return Ok(0);
        };
        Ok(match &first.kind {
            StepKind::FlatMap(FlatMapStep::Vertices { ids }) if ids.is_empty() => 1,
            StepKind::FlatMap(FlatMapStep::Vertices { ids }) => {
                let named = ids.iter().filter(|id| names_vertex(id, vertex)).count();
                u64::try_from(named).unwrap_or(u64::MAX)
            }
            StepKind::FlatMap(FlatMapStep::IndexedVertices { key, value }) => u64::from(
                graph
                    .property(Element::Vertex(vertex), key)?
                    .is_some_and(|found| found.loose_eq(value)),
            ),
            _ => 0,
        })
    }

    /// Run traversers forward from their next step until each one halts,
    /// parks at a global step, or must move to another host.
    fn advance(
        &self,
        exec: Executor<'_>,
        host: Option<VertexId>,
        work: impl IntoIterator<Item = (usize, Traverser)>,
        out: &mut Routed,
    ) -> ExecResult<()> {
        let steps: &[Step] = self.traversal.steps();
        let mut queue: VecDeque<_> = work.into_iter().collect();
        while let Some((index, t)) = queue.pop_front() {
            let Some(step) = steps.get(index) else {
                out.halted.push(t);
                continue;
            };
            if step.is_global() {
                out.parked.entry(index).or_default().push(t);
                continue;
            }
            if let Some(target) = host_of(exec.graph(), &t.object)?
                && Some(target) != host
            {
                out.messages.push((
                    target,
                    TraverserMessage {
                        step: index,
                        traverser: t,
                    },
                ));
                continue;
            }
            for next in exec.apply(step, t)? {
                queue.push_back((index + 1, next));
            }
        }
        Ok(())
    }

    fn lowest_parked(&self, memory: &Memory) -> Result<Option<usize>, ComputerError> {
        for &index in &self.global {
            if !memory.traversers(&barrier_key(index))?.is_empty() {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Reduce the traversers parked at global step `index` on the master.
    /// Returns whether any traverser was sent back out to a vertex.
    fn fire(
        &self,
        master: &mut MasterContext<'_, TraverserMessage>,
        index: usize,
    ) -> Result<bool, ComputerError> {
        let superstep = master.superstep();
        let failed = |source: ExecutionError| ComputerError::Execution {
            superstep,
            vertex: None,
            source,
        };
        let parked = master.memory_mut().take_traversers(&barrier_key(index))?;
        let side_effects = self.side_effects(master.memory())?;
        let view = HostView::detached(master.graph(), &self.written);
        let exec = self.executor(&view, &side_effects);

        let mut set = exec.traverser_set();
        for t in parked {
            set.add(t).map_err(|e| failed(e.into()))?;
        }
        let step = &self.traversal.steps()[index];
        let outputs = exec.reduce(step, set).map_err(failed)?;
        let mut routed = Routed::default();
        self.advance(
            exec,
            None,
            outputs.into_iter().map(|t| (index + 1, t)),
            &mut routed,
        )
        .map_err(failed)?;

        let sent = !routed.messages.is_empty();
        for (to, message) in routed.messages {
            master.send(to, message);
        }
        for (next, traversers) in routed.parked {
            master.memory_mut().park(&barrier_key(next), traversers)?;
        }
        if !routed.halted.is_empty() {
            master.memory_mut().park(HALTED_KEY, routed.halted)?;
        }
        Ok(sent)
    }
}

impl VertexProgram for TraversalVertexProgram {
    type Message = TraverserMessage;

    fn compute_keys(&self) -> Vec<VertexComputeKey> {
        self.written
            .iter()
            .map(|key| VertexComputeKey::of(key.clone(), false))
            .collect()
    }

    fn memory_keys(&self) -> Vec<MemoryKey> {
        let mut keys = vec![MemoryKey::traversers(HALTED_KEY)];
        keys.extend(
            self.global
                .iter()
                .map(|&index| MemoryKey::traversers(barrier_key(index))),
        );
        keys.extend(
            self.traversal
                .side_effects()
                .iter()
                .map(|(key, initial)| MemoryKey::new(key.clone(), Reducer::Append, initial.clone())),
        );
        keys
    }

    fn execute(&self, ctx: &mut VertexContext<'_, TraverserMessage>) -> Result<(), ComputerError> {
        let host = ctx.vertex();
        let superstep = ctx.superstep();
        let failed = |source: ExecutionError| ComputerError::Execution {
            superstep,
            vertex: Some(host),
            source,
        };

        let mut values = IndexMap::new();
        for key in &self.written {
            if let Some(value) = ctx.get(key)? {
                values.insert(key.clone(), value.clone());
            }
        }
        let view = HostView {
            graph: ctx.graph(),
            host: Some(host),
            keys: &self.written,
            values: RefCell::new(values),
        };
        let side_effects = self.side_effects(ctx.memory())?;
        let exec = self.executor(&view, &side_effects);

        let mut work: Vec<(usize, Traverser)> = ctx
            .take_messages()
            .into_iter()
            .map(|m| (m.step, m.traverser))
            .collect();
        if superstep == 0 {
            let seeds = self.seeds(&view, host).map_err(failed)?;
            if seeds > 0
                && let Some(source) = self.traversal.steps().first()
            {
                work.push((1, exec.start(source, Value::Vertex(host)).with_bulk(seeds)));
            }
        }
        let mut routed = Routed::default();
        self.advance(exec, Some(host), work, &mut routed)
            .map_err(failed)?;

        for (key, value) in view.values.into_inner() {
            ctx.set(&key, value)?;
        }
        for (to, message) in routed.messages {
            ctx.send(to, message);
        }
        for (index, traversers) in routed.parked {
            ctx.park(&barrier_key(index), traversers)?;
        }
        if !routed.halted.is_empty() {
            ctx.park(HALTED_KEY, routed.halted)?;
        }
        ctx.halt();
        Ok(())
    }

    fn terminate(
        &self,
        master: &mut MasterContext<'_, TraverserMessage>,
    ) -> Result<Termination, ComputerError> {
        if let Some((index, high)) = self.trailing_range {
            let parked: u64 = master
                .memory()
                .traversers(&barrier_key(index))?
                .iter()
                .map(Traverser::bulk)
                .sum();
            if parked >= high {
                self.fire(master, index)?;
                return Ok(Termination::Halt);
            }
        }
        if master.pending_messages() > 0 {
            return Ok(Termination::Continue);
        }
        while let Some(index) = self.lowest_parked(master.memory())? {
            if self.fire(master, index)? {
                return Ok(Termination::Continue);
            }
        }
        Ok(Termination::Halt)
    }
}
