//! Optimizations that preserve results while changing step composition.

use trellis_bytecode::{
    BarrierStep, BranchStep, FilterStep, FlatMapStep, RESERVED_LABEL_PREFIX, SideEffectStep, Step,
    StepKind, Traversal,
};
use trellis_core::Direction;

use super::{ExecutionTarget, StrategyCategory, StrategyContext, TraversalStrategy};
use crate::error::CompileResult;

fn has_reserved_label(step: &Step) -> bool {
    step.labels
        .iter()
        .any(|l| l.starts_with(RESERVED_LABEL_PREFIX))
}

/// Whether any step in the tree writes somewhere other than the traverser.
fn has_side_effects(traversal: &Traversal) -> bool {
    traversal.steps().iter().any(|step| {
        matches!(
            step.kind,
            StepKind::SideEffect(
                SideEffectStep::Store { .. }
                    | SideEffectStep::Property { .. }
                    | SideEffectStep::Traversal(_)
            ) | StepKind::Barrier(BarrierStep::Aggregate { .. })
        ) || step.children().into_iter().any(has_side_effects)
    })
}

fn uses_loops(traversal: &Traversal) -> bool {
    traversal.steps().iter().any(|step| {
        matches!(step.kind, StepKind::FlatMap(FlatMapStep::Loops))
            || step.children().into_iter().any(uses_loops)
    })
}

fn is_adjacency(step: &Step) -> bool {
    matches!(
        step.kind,
        StepKind::FlatMap(FlatMapStep::Adjacent { .. } | FlatMapStep::Incident { .. })
    )
}

fn merge_labels(into: &mut Step, labels: Vec<String>) {
    for label in labels {
        if !into.labels.contains(&label) {
            into.labels.push(label);
        }
    }
}

/// Drops `identity()` steps. A labeled identity hands its labels to the
/// step before it.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRemovalStrategy;

impl TraversalStrategy for IdentityRemovalStrategy {
    fn name(&self) -> &'static str {
        "IdentityRemovalStrategy"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Optimization
    }

    fn posteriors(&self) -> &[&'static str] {
        &["FilterRankingStrategy"]
    }

    fn apply(&self, traversal: &mut Traversal, _ctx: &StrategyContext<'_>) -> CompileResult<()> {
        traversal.steps_mut(|steps| {
            let mut i = 0;
            while i < steps.len() {
                let is_identity = matches!(steps[i].kind, StepKind::FlatMap(FlatMapStep::Identity));
                if is_identity && (steps[i].labels.is_empty() || i > 0) {
                    let removed = steps.remove(i);
                    if i > 0 {
                        merge_labels(&mut steps[i - 1], removed.labels);
                    }
                    continue;
                }
                i += 1;
            }
        })?;
        Ok(())
    }
}

/// Inlines `filter(..)`/`where(..)` and `and(..)` whose children consist of
/// plain property, label, id and value filters.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineFilterStrategy;

impl InlineFilterStrategy {
    fn is_plain_filter(step: &Step) -> bool {
        step.labels.is_empty()
            && matches!(
                step.kind,
                StepKind::Filter(
                    FilterStep::Has { .. }
                        | FilterStep::HasLabel(_)
                        | FilterStep::HasId(_)
                        | FilterStep::HasNot(_)
                        | FilterStep::Is(_)
                )
            )
    }

    fn inlinable(traversal: &Traversal) -> bool {
        !traversal.is_empty() && traversal.steps().iter().all(Self::is_plain_filter)
    }

    fn replacement(step: &Step) -> Option<Vec<Step>> {
        if has_reserved_label(step) {
            return None;
        }
        match &step.kind {
            StepKind::Filter(FilterStep::Traversal(child)) if Self::inlinable(child) => {
                Some(child.steps().to_vec())
            }
            StepKind::Filter(FilterStep::And(children))
                if children.iter().all(Self::inlinable) =>
            {
                Some(
                    children
                        .iter()
                        .flat_map(|child| child.steps().iter().cloned())
                        .collect(),
                )
            }
            _ => None,
        }
    }
}

impl TraversalStrategy for InlineFilterStrategy {
    fn name(&self) -> &'static str {
        "InlineFilterStrategy"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Optimization
    }

    fn posteriors(&self) -> &[&'static str] {
        &["FilterRankingStrategy"]
    }

    fn apply(&self, traversal: &mut Traversal, _ctx: &StrategyContext<'_>) -> CompileResult<()> {
        traversal.steps_mut(|steps| {
            let mut i = 0;
            while i < steps.len() {
                let Some(mut inlined) = Self::replacement(&steps[i]) else {
                    i += 1;
                    continue;
                };
                let labels = std::mem::take(&mut steps[i].labels);
                if let Some(last) = inlined.last_mut() {
                    merge_labels(last, labels);
                }
                let width = inlined.len();
                steps.splice(i..=i, inlined);
                i += width;
            }
        })?;
        Ok(())
    }
}

/// Whether `next` lands on the far vertex of an edge walked in `direction`.
fn closes_edge(direction: Direction, next: &Step) -> bool {
    match (direction, &next.kind) {
        (Direction::Out, StepKind::FlatMap(FlatMapStep::EdgeVertex { direction })) => {
            *direction == Direction::In
        }
        (Direction::In, StepKind::FlatMap(FlatMapStep::EdgeVertex { direction })) => {
            *direction == Direction::Out
        }
        _ => false,
    }
}

/// `outE().inV()` becomes `out()` and `inE().outV()` becomes `in()` when the
/// edge is never observed. `bothE().otherV()` needs the path and is left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncidentToAdjacentStrategy;

impl TraversalStrategy for IncidentToAdjacentStrategy {
    fn name(&self) -> &'static str {
        "IncidentToAdjacentStrategy"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Optimization
    }

    fn posteriors(&self) -> &[&'static str] {
        &["LazyBarrierStrategy"]
    }

    fn apply(&self, traversal: &mut Traversal, ctx: &StrategyContext<'_>) -> CompileResult<()> {
        if ctx.requirements.path {
            return Ok(());
        }
        traversal.steps_mut(|steps| {
            let mut i = 0;
            while i + 1 < steps.len() {
                let fused = match &steps[i] {
                    Step {
                        kind: StepKind::FlatMap(FlatMapStep::Incident { direction, labels }),
                        labels: own_labels,
                    } if own_labels.is_empty() && closes_edge(*direction, &steps[i + 1]) => {
                        Some(Step::flat_map(FlatMapStep::Adjacent {
                            direction: *direction,
                            labels: labels.clone(),
                        }))
                    }
                    _ => None,
                };
                if let Some(mut fused) = fused {
                    let vertex_step = steps.remove(i + 1);
                    fused.labels = vertex_step.labels;
                    steps[i] = fused;
                }
                i += 1;
            }
        })?;
        Ok(())
    }
}

/// Stable reorder of adjacent unlabeled filters, cheapest first.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterRankingStrategy;

impl FilterRankingStrategy {
    fn rank(step: &Step) -> Option<u8> {
        if !step.labels.is_empty() || step.children().into_iter().any(has_side_effects) {
            return None;
        }
        let StepKind::Filter(filter) = &step.kind else {
            return None;
        };
        Some(match filter {
            FilterStep::HasId(_) => 0,
            FilterStep::HasLabel(_) => 1,
            FilterStep::Has { .. } | FilterStep::HasNot(_) => 2,
            FilterStep::Is(_) => 3,
            FilterStep::Where { .. } => 4,
            FilterStep::SimplePath => 5,
            FilterStep::Traversal(_)
            | FilterStep::Not(_)
            | FilterStep::And(_)
            | FilterStep::Or(_) => 6,
            FilterStep::Dedup | FilterStep::Range { .. } => return None,
        })
    }
}

impl TraversalStrategy for FilterRankingStrategy {
    fn name(&self) -> &'static str {
        "FilterRankingStrategy"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Optimization
    }

    fn apply(&self, traversal: &mut Traversal, _ctx: &StrategyContext<'_>) -> CompileResult<()> {
        traversal.steps_mut(|steps| {
            let mut start = 0;
            while start < steps.len() {
                if Self::rank(&steps[start]).is_none() {
                    start += 1;
                    continue;
                }
                let mut end = start;
                while end < steps.len() && Self::rank(&steps[end]).is_some() {
                    end += 1;
                }
                steps[start..end].sort_by_key(Self::rank);
                start = end;
            }
        })?;
        Ok(())
    }
}

/// Inlines `repeat(body).times(n)` when the body has no global step and never
/// reads the loop counter.
#[derive(Debug, Clone, Copy)]
pub struct RepeatUnrollStrategy {
    max_times: u32,
}

impl Default for RepeatUnrollStrategy {
    fn default() -> Self {
        Self { max_times: 16 }
    }
}

impl RepeatUnrollStrategy {
    pub fn new(max_times: u32) -> Self {
        Self { max_times }
    }

    fn unrolled(&self, step: &Step) -> Option<Vec<Step>> {
        let StepKind::Branch(BranchStep::Repeat {
            body,
            times: Some(times),
            until: None,
            emit: None,
        }) = &step.kind
        else {
            return None;
        };
        if *times == 0
            || *times > self.max_times
            || body.steps().iter().any(Step::is_global)
            || uses_loops(body)
            || (body.is_empty() && !step.labels.is_empty())
        {
            return None;
        }
        let mut steps: Vec<Step> = (0..*times)
            .flat_map(|_| body.steps().iter().cloned())
            .collect();
        if let Some(last) = steps.last_mut() {
            merge_labels(last, step.labels.clone());
        }
        Some(steps)
    }
}

impl TraversalStrategy for RepeatUnrollStrategy {
    fn name(&self) -> &'static str {
        "RepeatUnrollStrategy"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Optimization
    }

    fn posteriors(&self) -> &[&'static str] {
        &[
            "InlineFilterStrategy",
            "IncidentToAdjacentStrategy",
            "FilterRankingStrategy",
            "LazyBarrierStrategy",
        ]
    }

    fn apply(&self, traversal: &mut Traversal, _ctx: &StrategyContext<'_>) -> CompileResult<()> {
        traversal.steps_mut(|steps| {
            let mut i = 0;
            while i < steps.len() {
                // Inlined bodies are scanned again so nested repeats unroll too.
                match self.unrolled(&steps[i]) {
                    Some(inlined) => {
                        steps.splice(i..=i, inlined);
                    }
                    None => i += 1,
                }
            }
        })?;
        Ok(())
    }
}

/// Inserts a bulking `barrier()` between consecutive adjacency steps of a
/// graph-sourced root traversal, so identical traversers coalesce early.
#[derive(Debug, Clone, Copy)]
pub struct LazyBarrierStrategy {
    max_size: usize,
}

impl Default for LazyBarrierStrategy {
    fn default() -> Self {
        Self { max_size: 2500 }
    }
}

impl LazyBarrierStrategy {
    pub fn new(max_size: usize) -> Self {
        Self { max_size }
    }
}

impl TraversalStrategy for LazyBarrierStrategy {
    fn name(&self) -> &'static str {
        "LazyBarrierStrategy"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Optimization
    }

    fn apply(&self, traversal: &mut Traversal, ctx: &StrategyContext<'_>) -> CompileResult<()> {
        if !ctx.is_root || ctx.requirements.path || ctx.target == ExecutionTarget::Olap {
            return Ok(());
        }
        let graph_sourced = traversal.steps().first().is_some_and(|s| {
            matches!(
                s.kind,
                StepKind::FlatMap(
                    FlatMapStep::Vertices { .. }
                        | FlatMapStep::IndexedVertices { .. }
                        | FlatMapStep::Edges { .. }
                )
            )
        });
        if !graph_sourced {
            return Ok(());
        }
        traversal.steps_mut(|steps| {
            let mut i = 0;
            while i + 1 < steps.len() {
                let next_walks = matches!(
                    steps[i + 1].kind,
                    StepKind::FlatMap(
                        FlatMapStep::Adjacent { .. }
                            | FlatMapStep::Incident { .. }
                            | FlatMapStep::EdgeVertex { .. }
                            | FlatMapStep::OtherVertex
                    )
                );
                if is_adjacency(&steps[i]) && next_walks {
                    let barrier = Step::barrier(BarrierStep::NoOp {
                        max_size: Some(self.max_size),
                    });
                    steps.insert(i + 1, barrier);
                    i += 1;
                }
                i += 1;
            }
        })?;
        Ok(())
    }
}
