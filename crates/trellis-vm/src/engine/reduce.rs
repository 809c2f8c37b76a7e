//! Steps that see their whole input at once.

use std::cmp::Ordering;
use std::collections::HashSet;

use indexmap::IndexMap;
use trellis_bytecode::{BarrierStep, By, FilterStep, Order, Step, StepKind};
use trellis_core::{Operator, Traverser, TraverserSet, Value};

use super::error::{ExecResult, ExecutionError};
use super::executor::{Executor, expand_bulk};
use super::trace::Tracer;

/// Bulk-aware `[low, high)` window over a stream of traversers.
#[derive(Debug, Clone)]
pub(crate) struct RangeWindow {
    low: u64,
    high: Option<u64>,
    seen: u64,
}

impl RangeWindow {
    pub(crate) fn new(low: u64, high: Option<u64>) -> Self {
        Self { low, high, seen: 0 }
    }

    /// The part of `t` inside the window, with its bulk trimmed.
    pub(crate) fn admit(&mut self, t: Traverser) -> Option<Traverser> {
        let start = self.seen;
        let end = start.saturating_add(t.bulk());
        self.seen = end;
        let lo = start.max(self.low);
        let hi = self.high.map_or(end, |high| end.min(high));
        (hi > lo).then(|| t.with_bulk(hi - lo))
    }

    /// No later traverser can fall inside the window.
    pub(crate) fn is_full(&self) -> bool {
        self.high.is_some_and(|high| self.seen >= high)
    }
}

impl<T: Tracer> Executor<'_, T> {
    /// Process a collected set through a barrier or global filter.
    ///
    /// Per-traverser steps are accepted too and applied to each member, which
    /// lets callers that batch traversers treat every step uniformly.
    pub fn reduce(&self, step: &Step, set: TraverserSet) -> ExecResult<Vec<Traverser>> {
        self.tracer().trace_reduce(step, set.len());
        match &step.kind {
            StepKind::Barrier(kind) => self.barrier(step, kind, set),
            StepKind::Filter(FilterStep::Dedup) => {
                let mut seen = HashSet::new();
                Ok(set
                    .into_iter()
                    .filter(|t| seen.insert(t.object.clone()))
                    .map(|t| self.stay(step, t.with_bulk(1)))
                    .collect())
            }
            StepKind::Filter(FilterStep::Range { low, high }) => {
                let mut window = RangeWindow::new(*low, *high);
                Ok(set
                    .into_iter()
                    .filter_map(|t| window.admit(t))
                    .map(|t| self.stay(step, t))
                    .collect())
            }
            _ => {
                let mut out = Vec::new();
                for t in set {
                    out.extend(self.apply(step, t)?);
                }
                Ok(out)
            }
        }
    }

    fn barrier(&self, step: &Step, kind: &BarrierStep, set: TraverserSet) -> ExecResult<Vec<Traverser>> {
        let result = match kind {
            BarrierStep::Count => Some(Value::from(set.total_bulk())),
            BarrierStep::Sum => {
                let mut total: Option<Value> = None;
                for t in set.iter() {
                    let weighted = Operator::Mult.apply(&t.object, &Value::from(t.bulk()))?;
                    total = Some(match total {
                        Some(acc) => Operator::Sum.apply(&acc, &weighted)?,
                        None => weighted,
                    });
                }
                total
            }
            BarrierStep::Min | BarrierStep::Max => {
                let op = if matches!(kind, BarrierStep::Min) {
                    Operator::Min
                } else {
                    Operator::Max
                };
                let mut best: Option<Value> = None;
                for t in set.iter() {
                    best = Some(match best {
                        Some(acc) => op.apply(&acc, &t.object)?,
                        None => t.object.clone(),
                    });
                }
                best
            }
            BarrierStep::Mean => {
                let mut sum = 0.0;
                let mut n = 0u64;
                for t in set.iter() {
                    let x = t.object.as_f64().ok_or(ExecutionError::TypeMismatch {
                        step: "mean",
                        expected: "a number",
                        found: t.object.type_name(),
                    })?;
                    sum += x * t.bulk() as f64;
                    n += t.bulk();
                }
                (n > 0).then(|| Value::Float(sum / n as f64))
            }
            BarrierStep::Fold => Some(Value::List(set.iter().flat_map(expand_bulk).collect())),
            BarrierStep::GroupCount { by } => {
                let mut counts: IndexMap<Value, i64> = IndexMap::new();
                for t in set.iter() {
                    if let Some(key) = self.project(by, t)? {
                        let n = counts.entry(key).or_default();
                        *n = n.saturating_add(i64::try_from(t.bulk()).unwrap_or(i64::MAX));
                    }
                }
                Some(Value::Map(
                    counts.into_iter().map(|(k, n)| (k, Value::Int(n))).collect(),
                ))
            }
            BarrierStep::Order { by } => return self.order(step, by, set),
            BarrierStep::Aggregate { key } => {
                self.side_effects()
                    .append(key, set.iter().flat_map(expand_bulk));
                return Ok(set.into_iter().map(|t| self.stay(step, t)).collect());
            }
            BarrierStep::NoOp { .. } => {
                return Ok(set.into_iter().map(|t| self.stay(step, t)).collect());
            }
        };
        Ok(result
            .map(|object| self.fresh(step, object))
            .into_iter()
            .collect())
    }

    /// Stable sort by the `by` keys; traversers whose key is missing drop out.
    fn order(&self, step: &Step, by: &[(By, Order)], set: TraverserSet) -> ExecResult<Vec<Traverser>> {
        let mut keyed = Vec::with_capacity(set.len());
        'traversers: for t in set {
            let mut keys = Vec::with_capacity(by.len().max(1));
            if by.is_empty() {
                keys.push(t.object.clone());
            }
            for (modulator, _) in by {
                match self.project(modulator, &t)? {
                    Some(key) => keys.push(key),
                    None => continue 'traversers,
                }
            }
            keyed.push((keys, t));
        }
        keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, by));
        Ok(keyed.into_iter().map(|(_, t)| self.stay(step, t)).collect())
    }
}

fn compare_keys(a: &[Value], b: &[Value], by: &[(By, Order)]) -> Ordering {
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        let order = by.get(i).map_or(Order::Asc, |(_, order)| *order);
        let ordering = match order {
            Order::Asc => x.total_cmp(y),
            Order::Desc => y.total_cmp(x),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
