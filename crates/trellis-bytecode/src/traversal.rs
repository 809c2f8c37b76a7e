//! Pipeline container: an ordered list of steps plus source configuration.

use indexmap::IndexMap;
use trellis_core::{Operator, SackSplit, Value};

use crate::error::StateError;
use crate::requirements::Requirements;
use crate::step::Step;

/// Sack configuration bound by `withSack`.
#[derive(Debug, Clone, PartialEq)]
pub struct SackConfig {
    pub initial: Value,
    /// Combines sacks when equal traversers coalesce.
    pub merge: Option<Operator>,
    pub split: SackSplit,
}

impl SackConfig {
    pub fn new(initial: impl Into<Value>) -> Self {
        Self {
            initial: initial.into(),
            merge: None,
            split: SackSplit::Copy,
        }
    }

    pub fn with_merge(mut self, merge: Operator) -> Self {
        self.merge = Some(merge);
        self
    }

    pub fn with_split(mut self, split: SackSplit) -> Self {
        self.split = split;
        self
    }
}

/// An ordered, mutable-until-locked list of steps.
///
/// Strategies rewrite the step list; locking freezes it before the first
/// traverser flows. The label table maps every `as` label to the index of
/// the step carrying it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Traversal {
    steps: Vec<Step>,
    labels: IndexMap<String, usize>,
    sack: Option<SackConfig>,
    side_effects: IndexMap<String, Value>,
    requirements: Option<Requirements>,
    locked: bool,
}

impl Traversal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: Vec<Step>) -> Self {
        let mut traversal = Self {
            steps,
            ..Self::default()
        };
        traversal.reindex_labels();
        traversal
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    fn check_unlocked(&self) -> Result<(), StateError> {
        if self.locked {
            return Err(StateError::Locked);
        }
        Ok(())
    }

    pub fn add_step(&mut self, step: Step) -> Result<(), StateError> {
        self.check_unlocked()?;
        self.steps.push(step);
        self.reindex_labels();
        Ok(())
    }

    pub fn insert_step(&mut self, index: usize, step: Step) -> Result<(), StateError> {
        self.check_unlocked()?;
        self.steps.insert(index, step);
        self.reindex_labels();
        Ok(())
    }

    pub fn remove_step(&mut self, index: usize) -> Result<Step, StateError> {
        self.check_unlocked()?;
        let step = self.steps.remove(index);
        self.reindex_labels();
        Ok(step)
    }

    pub fn replace_step(&mut self, index: usize, step: Step) -> Result<Step, StateError> {
        self.check_unlocked()?;
        let old = std::mem::replace(&mut self.steps[index], step);
        self.reindex_labels();
        Ok(old)
    }

    /// Edit the step list in place; the label table is rebuilt afterwards.
    pub fn steps_mut<R>(&mut self, edit: impl FnOnce(&mut Vec<Step>) -> R) -> Result<R, StateError> {
        self.check_unlocked()?;
        let result = edit(&mut self.steps);
        self.reindex_labels();
        Ok(result)
    }

    /// Bind `labels` to the last step. Returns `false` if there is none.
    pub fn add_labels(&mut self, labels: &[String]) -> Result<bool, StateError> {
        self.check_unlocked()?;
        let Some(last) = self.steps.last_mut() else {
            return Ok(false);
        };
        for label in labels {
            if !last.labels.contains(label) {
                last.labels.push(label.clone());
            }
        }
        self.reindex_labels();
        Ok(true)
    }

    /// Index of the step bound to `label`.
    pub fn step_for_label(&self, label: &str) -> Option<usize> {
        self.labels.get(label).copied()
    }

    pub fn sack(&self) -> Option<&SackConfig> {
        self.sack.as_ref()
    }

    pub fn set_sack(&mut self, sack: Option<SackConfig>) -> Result<(), StateError> {
        self.check_unlocked()?;
        self.sack = sack;
        Ok(())
    }

    pub fn side_effects(&self) -> &IndexMap<String, Value> {
        &self.side_effects
    }

    pub fn add_side_effect(&mut self, key: impl Into<String>, initial: Value) -> Result<(), StateError> {
        self.check_unlocked()?;
        self.side_effects.insert(key.into(), initial);
        Ok(())
    }

    /// Requirements recorded by finalization, or computed on demand.
    pub fn requirements(&self) -> Requirements {
        self.requirements.unwrap_or_else(|| Requirements::of(self))
    }

    pub fn set_requirements(&mut self, requirements: Requirements) -> Result<(), StateError> {
        self.check_unlocked()?;
        self.requirements = Some(requirements);
        Ok(())
    }

    /// Freeze this traversal and every child traversal.
    pub fn lock(&mut self) {
        self.locked = true;
        for step in &mut self.steps {
            for child in step.children_mut() {
                child.lock();
            }
        }
    }

    /// Whether any step in the tree writes to the graph.
    pub fn mutates(&self) -> bool {
        self.steps.iter().any(Step::mutates)
    }

    /// Human-readable rendering, one step per line, children indented.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        crate::dump::write_traversal(self, &mut out, 0);
        out
    }

    fn reindex_labels(&mut self) {
        self.labels.clear();
        for (index, step) in self.steps.iter().enumerate() {
            for label in &step.labels {
                self.labels.insert(label.clone(), index);
            }
        }
    }
}
