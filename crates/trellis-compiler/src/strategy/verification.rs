//! Last-chance checks. Verification strategies never rewrite.

use trellis_bytecode::{
    BarrierStep, BranchStep, FilterStep, FlatMapStep, RESERVED_LABEL_PREFIX, SideEffectStep, Step,
    StepKind, Traversal,
};

use super::decoration::SUBGRAPH_LABEL;
use super::{ExecutionTarget, StrategyCategory, StrategyContext, TraversalStrategy};
use crate::error::{CompileError, CompileResult};

/// Rejects traversals that cannot run correctly on any target.
///
/// - `repeat()` must be bounded by `times()` or `until()`
/// - labels starting with `~` are reserved for inserted steps
/// - `sack()` steps need a sack bound with `withSack`
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardVerificationStrategy;

impl StandardVerificationStrategy {
    fn check(traversal: &Traversal, has_sack: bool) -> CompileResult<()> {
        for step in traversal.steps() {
            if let Some(label) = step
                .labels
                .iter()
                .find(|l| l.starts_with(RESERVED_LABEL_PREFIX) && *l != SUBGRAPH_LABEL)
            {
                return Err(CompileError::Verification(format!(
                    "label `{label}` uses the reserved prefix `{RESERVED_LABEL_PREFIX}`"
                )));
            }
            match &step.kind {
                StepKind::Branch(BranchStep::Repeat {
                    times: None,
                    until: None,
                    ..
                }) => {
                    return Err(CompileError::Verification(
                        "repeat() needs times() or until()".to_owned(),
                    ));
                }
                StepKind::FlatMap(FlatMapStep::Sack)
                | StepKind::SideEffect(SideEffectStep::Sack { .. })
                    if !has_sack =>
                {
                    return Err(CompileError::Verification(format!(
                        "{} reads a sack but none was bound with withSack()",
                        step.name()
                    )));
                }
                _ => {}
            }
            for child in step.children() {
                Self::check(child, has_sack)?;
            }
        }
        Ok(())
    }
}

impl TraversalStrategy for StandardVerificationStrategy {
    fn name(&self) -> &'static str {
        "StandardVerificationStrategy"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Verification
    }

    fn apply(&self, traversal: &mut Traversal, ctx: &StrategyContext<'_>) -> CompileResult<()> {
        // Children carry no sack configuration; the root pass covers them.
        if !ctx.is_root {
            return Ok(());
        }
        Self::check(traversal, traversal.sack().is_some())
    }
}

/// Rejects OLAP plans containing steps the traversal vertex program cannot
/// express.
///
/// The root must start at `V()`; `range`/`limit` may only close the root;
/// side-effect collections and mutations inside child traversals are not
/// shared across workers. Root mutations must act on vertices.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputerVerificationStrategy;

impl ComputerVerificationStrategy {
    fn check_child(traversal: &Traversal) -> CompileResult<()> {
        for step in traversal.steps() {
            if Self::collects(step) || step.mutates() {
                return Err(CompileError::NoVertexProgramEquivalent(
                    step.name().to_owned(),
                ));
            }
            for child in step.children() {
                Self::check_child(child)?;
            }
        }
        Ok(())
    }

    fn collects(step: &Step) -> bool {
        matches!(
            step.kind,
            StepKind::SideEffect(SideEffectStep::Store { .. })
                | StepKind::Barrier(BarrierStep::Aggregate { .. })
        )
    }

    /// Whether `step` hands on vertices, given whether it receives them.
    /// Unknown shapes count as non-vertices.
    fn emits_vertices(step: &Step, input: bool) -> bool {
        match &step.kind {
            StepKind::FlatMap(
                FlatMapStep::Vertices { .. }
                | FlatMapStep::IndexedVertices { .. }
                | FlatMapStep::Adjacent { .. }
                | FlatMapStep::EdgeVertex { .. }
                | FlatMapStep::OtherVertex,
            ) => true,
            StepKind::FlatMap(FlatMapStep::Identity)
            | StepKind::Filter(_)
            | StepKind::SideEffect(_)
            | StepKind::Barrier(
                BarrierStep::NoOp { .. } | BarrierStep::Order { .. } | BarrierStep::Aggregate { .. },
            ) => input,
            StepKind::FlatMap(FlatMapStep::Map(t) | FlatMapStep::FlatMap(t))
            | StepKind::Branch(BranchStep::Local(t)) => Self::yields_vertices(t, input),
            StepKind::Branch(BranchStep::Optional(t)) => input && Self::yields_vertices(t, input),
            StepKind::Branch(BranchStep::Repeat { body, .. }) => {
                input && Self::yields_vertices(body, input)
            }
            StepKind::Branch(BranchStep::Union(branches) | BranchStep::Coalesce(branches)) => {
                branches.iter().all(|t| Self::yields_vertices(t, input))
            }
            StepKind::Branch(BranchStep::Choose {
                on_true, on_false, ..
            }) => Self::yields_vertices(on_true, input) && Self::yields_vertices(on_false, input),
            _ => false,
        }
    }

    fn yields_vertices(traversal: &Traversal, input: bool) -> bool {
        traversal
            .steps()
            .iter()
            .fold(input, |vertices, step| Self::emits_vertices(step, vertices))
    }

    /// Verify `traversal` as a root plan.
    pub fn verify(traversal: &Traversal) -> CompileResult<()> {
        let steps = traversal.steps();
        match steps.first().map(|s| &s.kind) {
            Some(StepKind::FlatMap(
                FlatMapStep::Vertices { .. } | FlatMapStep::IndexedVertices { .. },
            )) => {}
            Some(_) => {
                return Err(CompileError::NoVertexProgramEquivalent(
                    steps[0].name().to_owned(),
                ));
            }
            None => return Err(CompileError::NoVertexProgramEquivalent("identity".to_owned())),
        }
        let last = steps.len() - 1;
        let mut vertices = false;
        for (i, step) in steps.iter().enumerate() {
            let misplaced_range =
                matches!(step.kind, StepKind::Filter(FilterStep::Range { .. })) && i != last;
            // Only the host vertex is writable inside a superstep.
            let off_host_write = !vertices
                && matches!(step.kind, StepKind::SideEffect(SideEffectStep::Property { .. }));
            if misplaced_range || off_host_write || Self::collects(step) {
                return Err(CompileError::NoVertexProgramEquivalent(
                    step.name().to_owned(),
                ));
            }
            for child in step.children() {
                Self::check_child(child)?;
            }
            vertices = Self::emits_vertices(step, vertices);
        }
        Ok(())
    }
}

impl TraversalStrategy for ComputerVerificationStrategy {
    fn name(&self) -> &'static str {
        "ComputerVerificationStrategy"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Verification
    }

    fn priors(&self) -> &[&'static str] {
        &["StandardVerificationStrategy"]
    }

    fn apply(&self, traversal: &mut Traversal, ctx: &StrategyContext<'_>) -> CompileResult<()> {
        if ctx.target != ExecutionTarget::Olap || !ctx.is_root {
            return Ok(());
        }
        Self::verify(traversal)
    }
}
