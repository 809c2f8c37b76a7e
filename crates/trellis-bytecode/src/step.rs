//! Executable step IR.
//!
//! A closed set of step kinds, each carrying its operator payload and any
//! child traversals it owns. Steps form a tree: a child traversal belongs to
//! exactly one step.

use std::fmt;

use trellis_core::{Direction, Operator, Value};

use crate::predicate::P;
use crate::token::{Order, T};
use crate::traversal::Traversal;

/// Steps that map one traverser to zero or more traversers.
#[derive(Debug, Clone, PartialEq)]
pub enum FlatMapStep {
    /// `V(ids...)`; no ids means every vertex.
    Vertices { ids: Vec<Value> },
    /// Physical vertex lookup by exact property value.
    IndexedVertices { key: String, value: Value },
    Edges { ids: Vec<Value> },
    Inject { values: Vec<Value> },
    /// `out/in/both(labels...)`
    Adjacent {
        direction: Direction,
        labels: Vec<String>,
    },
    /// `outE/inE/bothE(labels...)`
    Incident {
        direction: Direction,
        labels: Vec<String>,
    },
    /// `outV/inV/bothV()`
    EdgeVertex { direction: Direction },
    OtherVertex,
    Values { keys: Vec<String> },
    ValueMap { keys: Vec<String> },
    Id,
    Label,
    Constant(Value),
    Identity,
    Unfold,
    Path,
    Select { labels: Vec<String>, by: Vec<By> },
    Sack,
    Loops,
    /// First result of the child, or nothing.
    Map(Traversal),
    FlatMap(Traversal),
    /// `count(local)`: size of a list or map object.
    CountLocal,
    Project { keys: Vec<String>, by: Vec<By> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterStep {
    /// `has(key)`, `has(key, P)` or `has(label, key, P)`.
    Has {
        label: Option<String>,
        key: String,
        predicate: Option<P>,
    },
    HasLabel(Vec<String>),
    HasId(Vec<Value>),
    HasNot(String),
    Is(P),
    /// `where(P)` tests the current object, `where(label, P)` the labeled one.
    Where { start: Option<String>, predicate: P },
    /// `filter(t)` / `where(t)`: keep when the child produces anything.
    Traversal(Traversal),
    Not(Traversal),
    And(Vec<Traversal>),
    Or(Vec<Traversal>),
    SimplePath,
    Dedup,
    /// `limit`, `range` and `skip`; `high` is exclusive.
    Range { low: u64, high: Option<u64> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SideEffectStep {
    Sack { operator: Operator, by: By },
    Property { key: String, value: PropertyValue },
    /// Lazy `store(key)`: appends as traversers pass.
    Store { key: String },
    Traversal(Traversal),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BarrierStep {
    Count,
    Sum,
    Min,
    Max,
    Mean,
    Fold,
    GroupCount { by: By },
    Order { by: Vec<(By, Order)> },
    Aggregate { key: String },
    /// `barrier([max_size])`: collects and coalesces its input.
    NoOp { max_size: Option<usize> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum BranchStep {
    Union(Vec<Traversal>),
    Repeat {
        body: Traversal,
        times: Option<u32>,
        until: Option<Traversal>,
        emit: Option<Emit>,
    },
    Choose {
        condition: Traversal,
        on_true: Traversal,
        on_false: Traversal,
    },
    Coalesce(Vec<Traversal>),
    Optional(Traversal),
    Local(Traversal),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Emit {
    Always,
    When(Traversal),
}

/// Projection applied by `by(..)` modulators.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum By {
    #[default]
    Identity,
    /// Element property, or map entry for map objects.
    Key(String),
    Traversal(Traversal),
    T(T),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Constant(Value),
    Traversal(Traversal),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    FlatMap(FlatMapStep),
    Filter(FilterStep),
    SideEffect(SideEffectStep),
    Barrier(BarrierStep),
    Branch(BranchStep),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub kind: StepKind,
    pub labels: Vec<String>,
}

impl Step {
    pub fn new(kind: StepKind) -> Self {
        Self {
            kind,
            labels: Vec::new(),
        }
    }

    pub fn flat_map(step: FlatMapStep) -> Self {
        Self::new(StepKind::FlatMap(step))
    }

    pub fn filter(step: FilterStep) -> Self {
        Self::new(StepKind::Filter(step))
    }

    pub fn side_effect(step: SideEffectStep) -> Self {
        Self::new(StepKind::SideEffect(step))
    }

    pub fn barrier(step: BarrierStep) -> Self {
        Self::new(StepKind::Barrier(step))
    }

    pub fn branch(step: BranchStep) -> Self {
        Self::new(StepKind::Branch(step))
    }

    pub fn with_labels(mut self, labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.labels.extend(labels.into_iter().map(Into::into));
        self
    }

    pub fn is_filter(&self) -> bool {
        matches!(self.kind, StepKind::Filter(_))
    }

    pub fn is_barrier(&self) -> bool {
        matches!(self.kind, StepKind::Barrier(_))
    }

    /// Steps whose effect depends on every traverser, not one at a time.
    pub fn is_global(&self) -> bool {
        matches!(
            self.kind,
            StepKind::Barrier(_) | StepKind::Filter(FilterStep::Dedup | FilterStep::Range { .. })
        )
    }

    /// Whether the step's outputs sit on a different object than its input.
    pub fn moves(&self) -> bool {
        match &self.kind {
            StepKind::FlatMap(FlatMapStep::Identity) => false,
            StepKind::FlatMap(_) | StepKind::Branch(_) => true,
            _ => false,
        }
    }

    /// Whether every output of this step is a vertex.
    pub fn produces_vertices(&self) -> bool {
        matches!(
            self.kind,
            StepKind::FlatMap(
                FlatMapStep::Vertices { .. }
                    | FlatMapStep::IndexedVertices { .. }
                    | FlatMapStep::Adjacent { .. }
                    | FlatMapStep::EdgeVertex { .. }
                    | FlatMapStep::OtherVertex
            )
        )
    }

    /// Whether this step or any descendant writes to the graph.
    pub fn mutates(&self) -> bool {
        matches!(
            self.kind,
            StepKind::SideEffect(SideEffectStep::Property { .. })
        ) || self.children().iter().any(|child| child.mutates())
    }

    /// Operator name as it appears in bytecode.
    pub fn name(&self) -> &'static str {
        match &self.kind {
            StepKind::FlatMap(step) => match step {
                FlatMapStep::Vertices { .. } => "V",
                FlatMapStep::IndexedVertices { .. } => "V",
                FlatMapStep::Edges { .. } => "E",
                FlatMapStep::Inject { .. } => "inject",
                FlatMapStep::Adjacent { direction, .. } => match direction {
                    Direction::Out => "out",
                    Direction::In => "in",
                    Direction::Both => "both",
                },
                FlatMapStep::Incident { direction, .. } => match direction {
                    Direction::Out => "outE",
                    Direction::In => "inE",
                    Direction::Both => "bothE",
                },
                FlatMapStep::EdgeVertex { direction } => match direction {
                    Direction::Out => "outV",
                    Direction::In => "inV",
                    Direction::Both => "bothV",
                },
                FlatMapStep::OtherVertex => "otherV",
                FlatMapStep::Values { .. } => "values",
                FlatMapStep::ValueMap { .. } => "valueMap",
                FlatMapStep::Id => "id",
                FlatMapStep::Label => "label",
                FlatMapStep::Constant(_) => "constant",
                FlatMapStep::Identity => "identity",
                FlatMapStep::Unfold => "unfold",
                FlatMapStep::Path => "path",
                FlatMapStep::Select { .. } => "select",
                FlatMapStep::Sack => "sack",
                FlatMapStep::Loops => "loops",
                FlatMapStep::Map(_) => "map",
                FlatMapStep::FlatMap(_) => "flatMap",
                FlatMapStep::CountLocal => "count",
                FlatMapStep::Project { .. } => "project",
            },
            StepKind::Filter(step) => match step {
                FilterStep::Has { .. } => "has",
                FilterStep::HasLabel(_) => "hasLabel",
                FilterStep::HasId(_) => "hasId",
                FilterStep::HasNot(_) => "hasNot",
                FilterStep::Is(_) => "is",
                FilterStep::Where { .. } => "where",
                FilterStep::Traversal(_) => "filter",
                FilterStep::Not(_) => "not",
                FilterStep::And(_) => "and",
                FilterStep::Or(_) => "or",
                FilterStep::SimplePath => "simplePath",
                FilterStep::Dedup => "dedup",
                FilterStep::Range { .. } => "range",
            },
            StepKind::SideEffect(step) => match step {
                SideEffectStep::Sack { .. } => "sack",
                SideEffectStep::Property { .. } => "property",
                SideEffectStep::Store { .. } => "store",
                SideEffectStep::Traversal(_) => "sideEffect",
            },
            StepKind::Barrier(step) => match step {
                BarrierStep::Count => "count",
                BarrierStep::Sum => "sum",
                BarrierStep::Min => "min",
                BarrierStep::Max => "max",
                BarrierStep::Mean => "mean",
                BarrierStep::Fold => "fold",
                BarrierStep::GroupCount { .. } => "groupCount",
                BarrierStep::Order { .. } => "order",
                BarrierStep::Aggregate { .. } => "aggregate",
                BarrierStep::NoOp { .. } => "barrier",
            },
            StepKind::Branch(step) => match step {
                BranchStep::Union(_) => "union",
                BranchStep::Repeat { .. } => "repeat",
                BranchStep::Choose { .. } => "choose",
                BranchStep::Coalesce(_) => "coalesce",
                BranchStep::Optional(_) => "optional",
                BranchStep::Local(_) => "local",
            },
        }
    }

    pub fn children(&self) -> Vec<&Traversal> {
        self.children_with_roles()
            .into_iter()
            .map(|(_, child)| child)
            .collect()
    }

    /// Child traversals paired with the role they play in the step.
    pub fn children_with_roles(&self) -> Vec<(&'static str, &Traversal)> {
        let mut out = Vec::new();
        match &self.kind {
            StepKind::FlatMap(step) => match step {
                FlatMapStep::Map(t) | FlatMapStep::FlatMap(t) => out.push(("traversal", t)),
                FlatMapStep::Select { by, .. } | FlatMapStep::Project { by, .. } => {
                    push_by(&mut out, by.iter())
                }
                _ => {}
            },
            StepKind::Filter(step) => match step {
                FilterStep::Traversal(t) | FilterStep::Not(t) => out.push(("traversal", t)),
                FilterStep::And(ts) | FilterStep::Or(ts) => {
                    out.extend(ts.iter().map(|t| ("traversal", t)))
                }
                _ => {}
            },
            StepKind::SideEffect(step) => match step {
                SideEffectStep::Sack { by, .. } => push_by(&mut out, [by]),
                SideEffectStep::Property {
                    value: PropertyValue::Traversal(t),
                    ..
                } => out.push(("value", t)),
                SideEffectStep::Traversal(t) => out.push(("traversal", t)),
                _ => {}
            },
            StepKind::Barrier(step) => match step {
                BarrierStep::GroupCount { by } => push_by(&mut out, [by]),
                BarrierStep::Order { by } => push_by(&mut out, by.iter().map(|(b, _)| b)),
                _ => {}
            },
            StepKind::Branch(step) => match step {
                BranchStep::Union(ts) | BranchStep::Coalesce(ts) => {
                    out.extend(ts.iter().map(|t| ("branch", t)))
                }
                BranchStep::Repeat {
                    body, until, emit, ..
                } => {
                    out.push(("body", body));
                    if let Some(until) = until {
                        out.push(("until", until));
                    }
                    if let Some(Emit::When(t)) = emit {
                        out.push(("emit", t));
                    }
                }
                BranchStep::Choose {
                    condition,
                    on_true,
                    on_false,
                } => {
                    out.push(("condition", condition));
                    out.push(("true", on_true));
                    out.push(("false", on_false));
                }
                BranchStep::Optional(t) | BranchStep::Local(t) => out.push(("branch", t)),
            },
        }
        out
    }

    pub fn children_mut(&mut self) -> Vec<&mut Traversal> {
        let mut out: Vec<&mut Traversal> = Vec::new();
        match &mut self.kind {
            StepKind::FlatMap(step) => match step {
                FlatMapStep::Map(t) | FlatMapStep::FlatMap(t) => out.push(t),
                FlatMapStep::Select { by, .. } | FlatMapStep::Project { by, .. } => {
                    out.extend(by.iter_mut().filter_map(By::traversal_mut))
                }
                _ => {}
            },
            StepKind::Filter(step) => match step {
                FilterStep::Traversal(t) | FilterStep::Not(t) => out.push(t),
                FilterStep::And(ts) | FilterStep::Or(ts) => out.extend(ts.iter_mut()),
                _ => {}
            },
            StepKind::SideEffect(step) => match step {
                SideEffectStep::Sack { by, .. } => out.extend(by.traversal_mut()),
                SideEffectStep::Property {
                    value: PropertyValue::Traversal(t),
                    ..
                } => out.push(t),
                SideEffectStep::Traversal(t) => out.push(t),
                _ => {}
            },
            StepKind::Barrier(step) => match step {
                BarrierStep::GroupCount { by } => out.extend(by.traversal_mut()),
                BarrierStep::Order { by } => {
                    out.extend(by.iter_mut().filter_map(|(b, _)| b.traversal_mut()))
                }
                _ => {}
            },
            StepKind::Branch(step) => match step {
                BranchStep::Union(ts) | BranchStep::Coalesce(ts) => out.extend(ts.iter_mut()),
                BranchStep::Repeat {
                    body, until, emit, ..
                } => {
                    out.push(body);
                    out.extend(until.as_mut());
                    if let Some(Emit::When(t)) = emit {
                        out.push(t);
                    }
                }
                BranchStep::Choose {
                    condition,
                    on_true,
                    on_false,
                } => {
                    out.push(condition);
                    out.push(on_true);
                    out.push(on_false);
                }
                BranchStep::Optional(t) | BranchStep::Local(t) => out.push(t),
            },
        }
        out
    }
}

fn push_by<'a>(
    out: &mut Vec<(&'static str, &'a Traversal)>,
    by: impl IntoIterator<Item = &'a By>,
) {
    out.extend(by.into_iter().filter_map(|b| match b {
        By::Traversal(t) => Some(("by", t)),
        _ => None,
    }));
}

impl By {
    pub fn traversal_mut(&mut self) -> Option<&mut Traversal> {
        match self {
            By::Traversal(t) => Some(t),
            _ => None,
        }
    }

    /// Inline rendering; traversal projections are rendered as children.
    fn inline(&self) -> String {
        match self {
            By::Identity => String::new(),
            By::Key(key) => key.clone(),
            By::Traversal(_) => "_".to_owned(),
            By::T(t) => format!("T.{}", t.as_str()),
        }
    }
}

fn join<I, D>(items: I) -> String
where
    I: IntoIterator<Item = D>,
    D: fmt::Display,
{
    items
        .into_iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name();
        match &self.kind {
            StepKind::FlatMap(step) => match step {
                FlatMapStep::Vertices { ids } | FlatMapStep::Edges { ids } => {
                    write!(f, "{name}({})", join(ids))
                }
                FlatMapStep::IndexedVertices { key, value } => {
                    write!(f, "V().index({key}, {value})")
                }
                FlatMapStep::Inject { values } => write!(f, "{name}({})", join(values)),
                FlatMapStep::Adjacent { labels, .. } | FlatMapStep::Incident { labels, .. } => {
                    write!(f, "{name}({})", join(labels))
                }
                FlatMapStep::Values { keys } | FlatMapStep::ValueMap { keys } => {
                    write!(f, "{name}({})", join(keys))
                }
                FlatMapStep::Constant(v) => write!(f, "{name}({v})"),
                FlatMapStep::Select { labels, by } => {
                    write!(f, "{name}({})", join(labels))?;
                    write_bys(f, by.iter())
                }
                FlatMapStep::Project { keys, by } => {
                    write!(f, "{name}({})", join(keys))?;
                    write_bys(f, by.iter())
                }
                FlatMapStep::CountLocal => write!(f, "{name}(local)"),
                _ => write!(f, "{name}()"),
            },
            StepKind::Filter(step) => match step {
                FilterStep::Has {
                    label,
                    key,
                    predicate,
                } => {
                    write!(f, "{name}(")?;
                    if let Some(label) = label {
                        write!(f, "{label}, ")?;
                    }
                    f.write_str(key)?;
                    if let Some(predicate) = predicate {
                        write!(f, ", {predicate}")?;
                    }
                    f.write_str(")")
                }
                FilterStep::HasLabel(labels) => write!(f, "{name}({})", join(labels)),
                FilterStep::HasId(ids) => write!(f, "{name}({})", join(ids)),
                FilterStep::HasNot(key) => write!(f, "{name}({key})"),
                FilterStep::Is(p) => write!(f, "{name}({p})"),
                FilterStep::Where { start, predicate } => match start {
                    Some(start) => write!(f, "{name}({start}, {predicate})"),
                    None => write!(f, "{name}({predicate})"),
                },
                FilterStep::Range { low, high } => match high {
                    Some(high) => write!(f, "{name}({low}, {high})"),
                    None => write!(f, "{name}({low}, -1)"),
                },
                _ => write!(f, "{name}()"),
            },
            StepKind::SideEffect(step) => match step {
                SideEffectStep::Sack { operator, by } => {
                    write!(f, "{name}({})", operator.as_str())?;
                    write_bys(f, [by])
                }
                SideEffectStep::Property { key, value } => match value {
                    PropertyValue::Constant(v) => write!(f, "{name}({key}, {v})"),
                    PropertyValue::Traversal(_) => write!(f, "{name}({key}, _)"),
                },
                SideEffectStep::Store { key } => write!(f, "{name}({key})"),
                SideEffectStep::Traversal(_) => write!(f, "{name}()"),
            },
            StepKind::Barrier(step) => match step {
                BarrierStep::GroupCount { by } => {
                    write!(f, "{name}()")?;
                    write_bys(f, [by])
                }
                BarrierStep::Order { by } => {
                    write!(f, "{name}()")?;
                    for (b, order) in by {
                        match b {
                            By::Identity => write!(f, ".by({})", order.as_str())?,
                            other => write!(f, ".by({}, {})", other.inline(), order.as_str())?,
                        }
                    }
                    Ok(())
                }
                BarrierStep::Aggregate { key } => write!(f, "{name}({key})"),
                BarrierStep::NoOp {
                    max_size: Some(max),
                } => write!(f, "{name}({max})"),
                _ => write!(f, "{name}()"),
            },
            StepKind::Branch(step) => match step {
                BranchStep::Repeat { times, emit, .. } => {
                    write!(f, "{name}()")?;
                    if let Some(times) = times {
                        write!(f, ".times({times})")?;
                    }
                    if let Some(Emit::Always) = emit {
                        f.write_str(".emit()")?;
                    }
                    Ok(())
                }
                _ => write!(f, "{name}()"),
            },
        }
    }
}

fn write_bys<'a>(
    f: &mut fmt::Formatter<'_>,
    by: impl IntoIterator<Item = &'a By>,
) -> fmt::Result {
    for b in by {
        if *b != By::Identity {
            write!(f, ".by({})", b.inline())?;
        }
    }
    Ok(())
}
