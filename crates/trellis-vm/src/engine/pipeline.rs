//! Lazy pull chain over a step list.

use std::collections::{HashSet, VecDeque};

use trellis_bytecode::{BarrierStep, FilterStep, Step, StepKind, Traversal};
use trellis_core::{Traverser, Value};

use super::error::ExecResult;
use super::executor::Executor;
use super::reduce::RangeWindow;
use super::trace::{NoopTracer, Tracer};

enum Mode {
    Stream,
    /// Drains upstream, or up to `batch` distinct traversers, then reduces.
    Barrier { batch: Option<usize> },
    Dedup(HashSet<Value>),
    Range(RangeWindow),
}

struct Stage<'p> {
    step: &'p Step,
    mode: Mode,
    output: VecDeque<Traverser>,
    exhausted: bool,
}

impl<'p> Stage<'p> {
    fn new(step: &'p Step) -> Self {
        let mode = match &step.kind {
            StepKind::Barrier(BarrierStep::NoOp { max_size }) => Mode::Barrier { batch: *max_size },
            StepKind::Barrier(_) => Mode::Barrier { batch: None },
            StepKind::Filter(FilterStep::Dedup) => Mode::Dedup(HashSet::new()),
            StepKind::Filter(FilterStep::Range { low, high }) => {
                Mode::Range(RangeWindow::new(*low, *high))
            }
            _ => Mode::Stream,
        };
        Self {
            step,
            mode,
            output: VecDeque::new(),
            exhausted: false,
        }
    }
}

/// One stage per step, each pulling from the stage before it.
///
/// Nothing runs until the consumer asks for a traverser, and a stage only
/// asks its upstream for as much as it needs: a satisfied `range` stops
/// pulling, and `first()` on a child pipeline computes a single result.
pub struct Pipeline<'p, T: Tracer = NoopTracer> {
    exec: Executor<'p, T>,
    source: VecDeque<Traverser>,
    stages: Vec<Stage<'p>>,
}

impl<'p, T: Tracer> Pipeline<'p, T> {
    pub fn new(
        exec: Executor<'p, T>,
        steps: &'p [Step],
        source: impl IntoIterator<Item = Traverser>,
    ) -> Self {
        Self {
            exec,
            source: source.into_iter().collect(),
            stages: steps.iter().map(Stage::new).collect(),
        }
    }

    /// Root pipeline of `traversal`, fed by the executor's seed traverser.
    pub fn root(exec: Executor<'p, T>, traversal: &'p Traversal) -> Self {
        Self::new(exec, traversal.steps(), [exec.seed()])
    }

    pub fn executor(&self) -> Executor<'p, T> {
        self.exec
    }

    fn upstream(&mut self, index: usize) -> Option<ExecResult<Traverser>> {
        if index == 0 {
            return self.source.pop_front().map(Ok);
        }
        self.pull(index - 1)
    }

    fn pull(&mut self, index: usize) -> Option<ExecResult<Traverser>> {
        loop {
            let stage = &mut self.stages[index];
            if let Some(t) = stage.output.pop_front() {
                return Some(Ok(t));
            }
            if stage.exhausted {
                return None;
            }
            let batch = match &stage.mode {
                Mode::Barrier { batch } => Some(*batch),
                _ => None,
            };
            let result = match batch {
                Some(batch) => self.fill_barrier(index, batch),
                None => match self.upstream(index) {
                    None => {
                        self.stages[index].exhausted = true;
                        continue;
                    }
                    Some(Ok(t)) => self.process(index, t),
                    Some(Err(e)) => Err(e),
                },
            };
            if let Err(e) = result {
                self.stages[index].exhausted = true;
                return Some(Err(e));
            }
        }
    }

    fn process(&mut self, index: usize, input: Traverser) -> ExecResult<()> {
        let exec = self.exec;
        let stage = &mut self.stages[index];
        match &mut stage.mode {
            Mode::Stream => {
                let out = exec.apply(stage.step, input)?;
                stage.output.extend(out);
            }
            Mode::Dedup(seen) => {
                if seen.insert(input.object.clone()) {
                    stage.output.push_back(exec.stay(stage.step, input.with_bulk(1)));
                }
            }
            Mode::Range(window) => {
                if let Some(t) = window.admit(input) {
                    stage.output.push_back(exec.stay(stage.step, t));
                }
                if window.is_full() {
                    stage.exhausted = true;
                }
            }
            Mode::Barrier { .. } => {
                let mut set = exec.traverser_set();
                set.add(input)?;
                stage.output.extend(exec.reduce(stage.step, set)?);
            }
        }
        Ok(())
    }

    fn fill_barrier(&mut self, index: usize, batch: Option<usize>) -> ExecResult<()> {
        let mut set = self.exec.traverser_set();
        while batch.is_none_or(|max| set.len() < max) {
            match self.upstream(index) {
                Some(t) => set.add(t?)?,
                None => {
                    self.stages[index].exhausted = true;
                    break;
                }
            }
        }
        let step = self.stages[index].step;
        let out = self.exec.reduce(step, set)?;
        self.stages[index].output.extend(out);
        Ok(())
    }
}

impl<T: Tracer> Iterator for Pipeline<'_, T> {
    type Item = ExecResult<Traverser>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.stages.len() {
            0 => self.source.pop_front().map(Ok),
            n => self.pull(n - 1),
        }
    }
}
