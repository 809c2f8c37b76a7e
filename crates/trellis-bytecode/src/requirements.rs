use std::fmt;

use crate::step::{BarrierStep, FilterStep, FlatMapStep, SideEffectStep, StepKind};
use crate::traversal::Traversal;

/// Traverser features a traversal needs at run time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Requirements {
    /// Record every object a traverser visits, not only labeled ones.
    pub path: bool,
    pub labels: bool,
    pub sack: bool,
    pub side_effects: bool,
}

impl Requirements {
    /// Derive requirements from the whole step tree.
    pub fn of(traversal: &Traversal) -> Self {
        let mut req = Requirements {
            sack: traversal.sack().is_some(),
            side_effects: !traversal.side_effects().is_empty(),
            ..Requirements::default()
        };
        req.visit(traversal);
        req
    }

    fn visit(&mut self, traversal: &Traversal) {
        for step in traversal.steps() {
            if !step.labels.is_empty() {
                self.labels = true;
            }
            match &step.kind {
                StepKind::FlatMap(FlatMapStep::Path | FlatMapStep::OtherVertex)
                | StepKind::Filter(FilterStep::SimplePath) => self.path = true,
                StepKind::FlatMap(FlatMapStep::Select { .. })
                | StepKind::Filter(FilterStep::Where { .. }) => self.labels = true,
                StepKind::FlatMap(FlatMapStep::Sack)
                | StepKind::SideEffect(SideEffectStep::Sack { .. }) => self.sack = true,
                StepKind::SideEffect(SideEffectStep::Store { .. })
                | StepKind::Barrier(BarrierStep::Aggregate { .. }) => self.side_effects = true,
                _ => {}
            }
            for child in step.children() {
                self.visit(child);
            }
        }
    }

    pub fn union(self, other: Requirements) -> Requirements {
        Requirements {
            path: self.path || other.path,
            labels: self.labels || other.labels,
            sack: self.sack || other.sack,
            side_effects: self.side_effects || other.side_effects,
        }
    }
}

impl fmt::Display for Requirements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (self.path, "path"),
            (self.labels, "labels"),
            (self.sack, "sack"),
            (self.side_effects, "side-effects"),
        ];
        let active: Vec<&str> = names.iter().filter(|(on, _)| *on).map(|(_, n)| *n).collect();
        write!(f, "[{}]", active.join(", "))
    }
}
