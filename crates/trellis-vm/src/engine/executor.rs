//! Per-traverser step semantics.
//!
//! `Executor` is a cheap, copyable view over everything one iteration needs:
//! the graph, the side-effect registry, the sack configuration and the
//! tracer. Child traversals run as nested pipelines built from a copy of it.

use std::borrow::Cow;

use trellis_bytecode::{
    BranchStep, By, Emit, FilterStep, FlatMapStep, P, PropertyValue, RESERVED_LABEL_PREFIX,
    SackConfig, SideEffectStep, Step, StepKind, T as ElementKey, Traversal,
};
use trellis_core::{
    Direction, EdgeId, Element, GraphStore, SackSplit, Traverser, TraverserSet, Value, VertexId,
};

use super::error::{ExecResult, ExecutionError};
use super::pipeline::Pipeline;
use super::side_effects::SideEffects;
use super::trace::{NoopTracer, Tracer};

/// Labels a step records on paths. Reserved labels never reach a path.
pub(crate) fn path_labels(step: &Step) -> Cow<'_, [String]> {
    if step
        .labels
        .iter()
        .any(|l| l.starts_with(RESERVED_LABEL_PREFIX))
    {
        return Cow::Owned(
            step.labels
                .iter()
                .filter(|l| !l.starts_with(RESERVED_LABEL_PREFIX))
                .cloned()
                .collect(),
        );
    }
    Cow::Borrowed(&step.labels)
}

/// `bulk` copies of the traverser's object.
pub(crate) fn expand_bulk(t: &Traverser) -> impl Iterator<Item = Value> + '_ {
    let n = usize::try_from(t.bulk()).unwrap_or(usize::MAX);
    std::iter::repeat_n(t.object.clone(), n)
}

pub struct Executor<'a, T: Tracer = NoopTracer> {
    graph: &'a dyn GraphStore,
    side_effects: &'a SideEffects,
    tracer: &'a T,
    sack: Option<&'a SackConfig>,
    track_path: bool,
}

impl<T: Tracer> Clone for Executor<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Tracer> Copy for Executor<'_, T> {}

impl<'a, T: Tracer> Executor<'a, T> {
    pub fn new(graph: &'a dyn GraphStore, side_effects: &'a SideEffects, tracer: &'a T) -> Self {
        Self {
            graph,
            side_effects,
            tracer,
            sack: None,
            track_path: false,
        }
    }

    pub fn with_sack(mut self, sack: Option<&'a SackConfig>) -> Self {
        self.sack = sack;
        self
    }

    /// Record every visited object, not only labeled ones.
    pub fn with_path_tracking(mut self, track_path: bool) -> Self {
        self.track_path = track_path;
        self
    }

    pub fn graph(&self) -> &'a dyn GraphStore {
        self.graph
    }

    pub fn side_effects(&self) -> &'a SideEffects {
        self.side_effects
    }

    pub(crate) fn tracer(&self) -> &'a T {
        self.tracer
    }

    /// The traverser a root pipeline starts from.
    pub fn seed(&self) -> Traverser {
        Traverser::seed(self.initial_sack())
    }

    /// Empty set that coalesces with this traversal's sack merge operator.
    pub fn traverser_set(&self) -> TraverserSet {
        TraverserSet::with_merge(self.sack.and_then(|s| s.merge))
    }

    fn initial_sack(&self) -> Option<Value> {
        self.sack.map(|s| s.initial.clone())
    }

    /// New traverser carrying a reducer's result: fresh path, initial sack.
    pub(crate) fn fresh(&self, step: &Step, object: Value) -> Traverser {
        let mut t = Traverser::new(object).with_sack(self.initial_sack());
        t.extend_path(&path_labels(step), self.track_path);
        t
    }

    /// Traverser a source step emits for `object`, as if started from the seed.
    pub fn start(&self, step: &Step, object: Value) -> Traverser {
        self.moved(step, &self.seed(), object)
    }

    /// `from` moved to `object` by `step`.
    pub(crate) fn moved(&self, step: &Step, from: &Traverser, object: Value) -> Traverser {
        let mut t = from.split(object);
        t.extend_path(&path_labels(step), self.track_path);
        t
    }

    /// `t` passed through `step` without moving.
    pub(crate) fn stay(&self, step: &Step, mut t: Traverser) -> Traverser {
        t.add_labels(&path_labels(step), self.track_path);
        t
    }

    /// Run one non-global step on one traverser.
    ///
    /// Barriers, `dedup` and `range` see their whole input at once and go
    /// through [`Executor::reduce`] instead.
    pub fn apply(&self, step: &Step, traverser: Traverser) -> ExecResult<Vec<Traverser>> {
        self.tracer.trace_step(step, &traverser);
        let out = match &step.kind {
            StepKind::FlatMap(kind) => self.flat_map(step, kind, traverser)?,
            StepKind::Filter(kind) => {
                if self.filter(step, kind, &traverser)? {
                    vec![self.stay(step, traverser)]
                } else {
                    Vec::new()
                }
            }
            StepKind::SideEffect(kind) => self
                .side_effect(step, kind, traverser)?
                .into_iter()
                .collect(),
            StepKind::Branch(kind) => self.branch(step, kind, traverser)?,
            StepKind::Barrier(_) => return Err(ExecutionError::Unsupported(step.name())),
        };
        self.tracer.trace_output(step, out.len());
        Ok(out)
    }

    /// Every traverser `child` produces from `input`.
    pub fn run(&self, child: &Traversal, input: Traverser) -> ExecResult<Vec<Traverser>> {
        Pipeline::new(*self, child.steps(), [input]).collect()
    }

    /// First traverser `child` produces from `input`; the rest is never computed.
    pub fn first(&self, child: &Traversal, input: Traverser) -> ExecResult<Option<Traverser>> {
        Pipeline::new(*self, child.steps(), [input]).next().transpose()
    }

    /// Resolve a label against the path, then against side-effects.
    pub fn resolve(&self, t: &Traverser, label: &str) -> ExecResult<Value> {
        if let Some(value) = t.path.get(label) {
            return Ok(value.clone());
        }
        self.side_effects
            .get(label)
            .ok_or_else(|| ExecutionError::UnboundLabel(label.to_owned()))
    }

    fn test(&self, predicate: &P, value: &Value, t: &Traverser) -> ExecResult<bool> {
        predicate.evaluate(value, &mut |label: &str| self.resolve(t, label))
    }

    /// Apply a `by` modulator to the traverser's object.
    ///
    /// `None` means the projection produced nothing: a missing property or an
    /// empty child traversal. Callers drop the traverser in that case.
    pub fn project(&self, by: &By, t: &Traverser) -> ExecResult<Option<Value>> {
        Ok(match by {
            By::Identity => Some(t.object.clone()),
            By::Key(key) => match &t.object {
                Value::Map(_) => t.object.map_get(&Value::String(key.clone())).cloned(),
                _ => self.graph.property(element("by", t)?, key)?,
            },
            By::Traversal(child) => self.first(child, t.clone())?.map(|r| r.object),
            By::T(ElementKey::Id) => Some(Value::from(element("by", t)?.raw_id())),
            By::T(ElementKey::Label) => Some(Value::String(self.graph.label(element("by", t)?)?)),
        })
    }

    fn project_value(&self, by: &By, t: &Traverser, value: Value) -> ExecResult<Option<Value>> {
        match by {
            By::Identity => Ok(Some(value)),
            _ => self.project(by, &t.split(value)),
        }
    }

    fn flat_map(&self, step: &Step, kind: &FlatMapStep, t: Traverser) -> ExecResult<Vec<Traverser>> {
        let objects: Vec<Value> = match kind {
            FlatMapStep::Vertices { ids } => {
                let ids = ids
                    .iter()
                    .map(|id| vertex_id(step, id))
                    .collect::<ExecResult<Vec<_>>>()?;
                self.graph.vertices(&ids)?.into_iter().map(Value::Vertex).collect()
            }
            FlatMapStep::IndexedVertices { key, value } => self
                .graph
                .vertices_by_property(key, value)?
                .into_iter()
                .map(Value::Vertex)
                .collect(),
            FlatMapStep::Edges { ids } => {
                let ids = ids
                    .iter()
                    .map(|id| edge_id(step, id))
                    .collect::<ExecResult<Vec<_>>>()?;
                self.graph.edges(&ids)?.into_iter().map(Value::Edge).collect()
            }
            FlatMapStep::Inject { values } => values.clone(),
            FlatMapStep::Adjacent { direction, labels } => {
                let vertex = vertex(step, &t)?;
                let mut out = Vec::new();
                for edge in self.graph.incident_edges(vertex, *direction, labels)? {
                    let (from, to) = self.graph.endpoints(edge)?;
                    let next = match direction {
                        Direction::Out => to,
                        Direction::In => from,
                        Direction::Both if from == vertex => to,
                        Direction::Both => from,
                    };
                    out.push(Value::Vertex(next));
                }
                out
            }
            FlatMapStep::Incident { direction, labels } => self
                .graph
                .incident_edges(vertex(step, &t)?, *direction, labels)?
                .into_iter()
                .map(Value::Edge)
                .collect(),
            FlatMapStep::EdgeVertex { direction } => {
                let (out_v, in_v) = self.graph.endpoints(edge(step, &t)?)?;
                match direction {
                    Direction::Out => vec![Value::Vertex(out_v)],
                    Direction::In => vec![Value::Vertex(in_v)],
                    Direction::Both => vec![Value::Vertex(out_v), Value::Vertex(in_v)],
                }
            }
            FlatMapStep::OtherVertex => {
                let (out_v, in_v) = self.graph.endpoints(edge(step, &t)?)?;
                let origin = t
                    .path
                    .entries()
                    .iter()
                    .rev()
                    .filter_map(|entry| entry.object.as_vertex())
                    .find(|v| *v == out_v || *v == in_v)
                    .ok_or(ExecutionError::Unsupported("otherV without a recorded origin"))?;
                vec![Value::Vertex(if origin == out_v { in_v } else { out_v })]
            }
            FlatMapStep::Values { keys } => self.values(step, keys, &t)?,
            FlatMapStep::ValueMap { keys } => {
                let element = element(step.name(), &t)?;
                let keys = if keys.is_empty() {
                    self.graph.property_keys(element)?
                } else {
                    keys.clone()
                };
                let mut entries = Vec::with_capacity(keys.len());
                for key in keys {
                    if let Some(value) = self.graph.property(element, &key)? {
                        entries.push((Value::String(key), value));
                    }
                }
                vec![Value::Map(entries)]
            }
            FlatMapStep::Id => vec![Value::from(element(step.name(), &t)?.raw_id())],
            FlatMapStep::Label => vec![Value::String(self.graph.label(element(step.name(), &t)?)?)],
            FlatMapStep::Constant(value) => vec![value.clone()],
            FlatMapStep::Identity => return Ok(vec![self.stay(step, t)]),
            FlatMapStep::Unfold => match &t.object {
                Value::List(items) => items.clone(),
                Value::Map(entries) => entries
                    .iter()
                    .map(|entry| Value::Map(vec![entry.clone()]))
                    .collect(),
                other => vec![other.clone()],
            },
            FlatMapStep::Path => vec![t.path.to_value()],
            FlatMapStep::Select { labels, by } => self.select(labels, by, &t)?.into_iter().collect(),
            FlatMapStep::Sack => vec![t.sack_or_null()],
            FlatMapStep::Loops => vec![Value::Int(i64::from(t.loops))],
            FlatMapStep::Map(child) => self
                .first(child, t.clone())?
                .map(|r| r.object)
                .into_iter()
                .collect(),
            FlatMapStep::FlatMap(child) => {
                return Ok(self
                    .run(child, t.clone())?
                    .into_iter()
                    .map(|r| {
                        let bulk = r.bulk();
                        self.moved(step, &t, r.object).with_bulk(bulk)
                    })
                    .collect());
            }
            FlatMapStep::CountLocal => {
                let n = match &t.object {
                    Value::List(items) => items.len(),
                    Value::Map(entries) => entries.len(),
                    _ => 1,
                };
                vec![Value::from(n)]
            }
            FlatMapStep::Project { keys, by } => {
                let mut entries = Vec::with_capacity(keys.len());
                for (i, key) in keys.iter().enumerate() {
                    let by = by.get(i).unwrap_or(&By::Identity);
                    let Some(value) = self.project(by, &t)? else {
                        return Ok(Vec::new());
                    };
                    entries.push((Value::String(key.clone()), value));
                }
                vec![Value::Map(entries)]
            }
        };
        Ok(objects
            .into_iter()
            .map(|object| self.moved(step, &t, object))
            .collect())
    }

    fn values(&self, step: &Step, keys: &[String], t: &Traverser) -> ExecResult<Vec<Value>> {
        if let Value::Map(entries) = &t.object {
            if keys.is_empty() {
                return Ok(entries.iter().map(|(_, v)| v.clone()).collect());
            }
            return Ok(keys
                .iter()
                .filter_map(|k| t.object.map_get(&Value::String(k.clone())).cloned())
                .collect());
        }
        let element = element(step.name(), t)?;
        let keys = if keys.is_empty() {
            Cow::Owned(self.graph.property_keys(element)?)
        } else {
            Cow::Borrowed(keys)
        };
        let mut out = Vec::with_capacity(keys.len());
        for key in keys.iter() {
            if let Some(value) = self.graph.property(element, key)? {
                out.push(value);
            }
        }
        Ok(out)
    }

    /// One label yields its value; several yield a map, cycling the `by`s.
    fn select(&self, labels: &[String], by: &[By], t: &Traverser) -> ExecResult<Option<Value>> {
        let by_at = |i: usize| {
            if by.is_empty() {
                &By::Identity
            } else {
                &by[i % by.len()]
            }
        };
        if let [label] = labels {
            let value = self.resolve(t, label)?;
            return self.project_value(by_at(0), t, value);
        }
        let mut entries = Vec::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            let value = self.resolve(t, label)?;
            let Some(value) = self.project_value(by_at(i), t, value)? else {
                return Ok(None);
            };
            entries.push((Value::String(label.clone()), value));
        }
        Ok(Some(Value::Map(entries)))
    }

    fn filter(&self, step: &Step, kind: &FilterStep, t: &Traverser) -> ExecResult<bool> {
        Ok(match kind {
            FilterStep::Has {
                label,
                key,
                predicate,
            } => {
                let Some(element) = t.object.as_element() else {
                    return Ok(false);
                };
                if let Some(label) = label
                    && self.graph.label(element)? != *label
                {
                    return Ok(false);
                }
                match (self.graph.property(element, key)?, predicate) {
                    (None, _) => false,
                    (Some(_), None) => true,
                    (Some(value), Some(p)) => self.test(p, &value, t)?,
                }
            }
            FilterStep::HasLabel(labels) => match t.object.as_element() {
                Some(element) => {
                    let actual = self.graph.label(element)?;
                    labels.iter().any(|l| *l == actual)
                }
                None => false,
            },
            FilterStep::HasId(ids) => match t.object.as_element() {
                Some(element) => ids.iter().any(|id| same_id(element, id)),
                None => false,
            },
            FilterStep::HasNot(key) => match t.object.as_element() {
                Some(element) => self.graph.property(element, key)?.is_none(),
                None => true,
            },
            FilterStep::Is(p) => self.test(p, &t.object, t)?,
            FilterStep::Where { start, predicate } => {
                let value = match start {
                    Some(label) => self.resolve(t, label)?,
                    None => t.object.clone(),
                };
                self.test(predicate, &value, t)?
            }
            FilterStep::Traversal(child) => self.first(child, t.clone())?.is_some(),
            FilterStep::Not(child) => self.first(child, t.clone())?.is_none(),
            FilterStep::And(children) => {
                for child in children {
                    if self.first(child, t.clone())?.is_none() {
                        return Ok(false);
                    }
                }
                true
            }
            FilterStep::Or(children) => {
                for child in children {
                    if self.first(child, t.clone())?.is_some() {
                        return Ok(true);
                    }
                }
                false
            }
            FilterStep::SimplePath => t.path.is_simple(),
            FilterStep::Dedup | FilterStep::Range { .. } => {
                return Err(ExecutionError::Unsupported(step.name()));
            }
        })
    }

    fn side_effect(
        &self,
        step: &Step,
        kind: &SideEffectStep,
        mut t: Traverser,
    ) -> ExecResult<Option<Traverser>> {
        match kind {
            SideEffectStep::Sack { operator, by } => {
                let Some(operand) = self.project(by, &t)? else {
                    return Ok(None);
                };
                t.sack = Some(operator.apply(&t.sack_or_null(), &operand)?);
            }
            SideEffectStep::Property { key, value } => {
                let element = element(step.name(), &t)?;
                let value = match value {
                    PropertyValue::Constant(v) => Some(v.clone()),
                    PropertyValue::Traversal(child) => self.first(child, t.clone())?.map(|r| r.object),
                };
                if let Some(value) = value {
                    self.graph.write_property(element, key, value)?;
                }
            }
            SideEffectStep::Store { key } => self.side_effects.append(key, expand_bulk(&t)),
            SideEffectStep::Traversal(child) => {
                self.run(child, t.clone())?;
            }
        }
        Ok(Some(self.stay(step, t)))
    }

    fn split_branch(&self, t: &Traverser) -> Traverser {
        let split = self.sack.map_or(SackSplit::Copy, |s| s.split);
        t.branch(split, self.sack.map(|s| &s.initial))
    }

    fn branch(&self, step: &Step, kind: &BranchStep, t: Traverser) -> ExecResult<Vec<Traverser>> {
        let out = match kind {
            BranchStep::Union(children) => {
                let mut out = Vec::new();
                for child in children {
                    out.extend(self.run(child, self.split_branch(&t))?);
                }
                out
            }
            BranchStep::Repeat {
                body,
                times,
                until,
                emit,
            } => self.repeat(body, *times, until.as_ref(), emit.as_ref(), t)?,
            BranchStep::Choose {
                condition,
                on_true,
                on_false,
            } => {
                let branch = if self.first(condition, t.clone())?.is_some() {
                    on_true
                } else {
                    on_false
                };
                self.run(branch, self.split_branch(&t))?
            }
            BranchStep::Coalesce(children) => {
                let mut found = Vec::new();
                for child in children {
                    found = self.run(child, self.split_branch(&t))?;
                    if !found.is_empty() {
                        break;
                    }
                }
                found
            }
            BranchStep::Optional(child) => {
                let out = self.run(child, self.split_branch(&t))?;
                if out.is_empty() { vec![t] } else { out }
            }
            BranchStep::Local(child) => self.run(child, self.split_branch(&t))?,
        };
        Ok(out.into_iter().map(|r| self.stay(step, r)).collect())
    }

    /// Breadth-first loop: the body runs before the exit checks.
    ///
    /// The loop counter is scoped to this repeat; an enclosing repeat's
    /// counter is restored on exit.
    fn repeat(
        &self,
        body: &Traversal,
        times: Option<u32>,
        until: Option<&Traversal>,
        emit: Option<&Emit>,
        mut t: Traverser,
    ) -> ExecResult<Vec<Traverser>> {
        if times == Some(0) {
            return Ok(vec![t]);
        }
        let outer = t.loops;
        t.loops = 0;
        let mut out = Vec::new();
        let mut frontier = vec![t];
        while !frontier.is_empty() {
            let mut produced = Vec::new();
            for traverser in frontier {
                produced.extend(self.run(body, traverser)?);
            }
            frontier = Vec::new();
            for mut traverser in produced {
                traverser.loops += 1;
                let done = times.is_some_and(|n| traverser.loops >= n)
                    || match until {
                        Some(until) => self.first(until, traverser.clone())?.is_some(),
                        None => false,
                    };
                if done {
                    traverser.loops = outer;
                    out.push(traverser);
                    continue;
                }
                let emitted = match emit {
                    None => false,
                    Some(Emit::Always) => true,
                    Some(Emit::When(condition)) => self.first(condition, traverser.clone())?.is_some(),
                };
                if emitted {
                    let mut copy = traverser.clone();
                    copy.loops = outer;
                    out.push(copy);
                }
                frontier.push(traverser);
            }
        }
        Ok(out)
    }
}

fn element(step: &'static str, t: &Traverser) -> ExecResult<Element> {
    t.object.as_element().ok_or(ExecutionError::NotAnElement {
        step,
        found: t.object.type_name(),
    })
}

fn vertex(step: &Step, t: &Traverser) -> ExecResult<VertexId> {
    t.object.as_vertex().ok_or(ExecutionError::TypeMismatch {
        step: step.name(),
        expected: "a vertex",
        found: t.object.type_name(),
    })
}

fn edge(step: &Step, t: &Traverser) -> ExecResult<EdgeId> {
    match t.object {
        Value::Edge(id) => Ok(id),
        ref other => Err(ExecutionError::TypeMismatch {
            step: step.name(),
            expected: "an edge",
            found: other.type_name(),
        }),
    }
}

fn vertex_id(step: &Step, id: &Value) -> ExecResult<VertexId> {
    match id {
        Value::Vertex(v) => Ok(*v),
        Value::Int(n) if *n >= 0 => Ok(VertexId(*n as u64)),
        other => Err(ExecutionError::TypeMismatch {
            step: step.name(),
            expected: "a vertex id",
            found: other.type_name(),
        }),
    }
}

fn edge_id(step: &Step, id: &Value) -> ExecResult<EdgeId> {
    match id {
        Value::Edge(e) => Ok(*e),
        Value::Int(n) if *n >= 0 => Ok(EdgeId(*n as u64)),
        other => Err(ExecutionError::TypeMismatch {
            step: step.name(),
            expected: "an edge id",
            found: other.type_name(),
        }),
    }
}

fn same_id(element: Element, id: &Value) -> bool {
    match (element, id) {
        (Element::Vertex(v), Value::Vertex(w)) => v == *w,
        (Element::Edge(e), Value::Edge(f)) => e == *f,
        (_, Value::Int(n)) => *n >= 0 && element.raw_id() == *n as u64,
        _ => false,
    }
}
