use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use log::debug;
use trellis_bytecode::{Requirements, Traversal};
use trellis_core::Capabilities;

use super::{
    ComputerVerificationStrategy, ExecutionTarget, FilterRankingStrategy,
    IdentityRemovalStrategy, IncidentToAdjacentStrategy, IndexedSourceStrategy,
    InlineFilterStrategy, LazyBarrierStrategy, RepeatUnrollStrategy, RequirementsStrategy,
    StandardVerificationStrategy, StrategyCategory, StrategyContext, TraversalStrategy,
};
use crate::error::{CompileError, CompileResult};

/// An ordered set of named strategies.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn TraversalStrategy>>,
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in strategy that needs no configuration.
    pub fn standard() -> Self {
        let strategies: Vec<Arc<dyn TraversalStrategy>> = vec![
            Arc::new(IdentityRemovalStrategy),
            Arc::new(InlineFilterStrategy),
            Arc::new(IncidentToAdjacentStrategy),
            Arc::new(FilterRankingStrategy),
            Arc::new(RepeatUnrollStrategy::default()),
            Arc::new(LazyBarrierStrategy::default()),
            Arc::new(IndexedSourceStrategy),
            Arc::new(RequirementsStrategy),
            Arc::new(StandardVerificationStrategy),
            Arc::new(ComputerVerificationStrategy),
        ];
        Self { strategies }
    }

    pub fn add(&mut self, strategy: Arc<dyn TraversalStrategy>) -> CompileResult<()> {
        if self.contains(strategy.name()) {
            return Err(CompileError::DuplicateStrategy(strategy.name().to_owned()));
        }
        self.strategies.push(strategy);
        Ok(())
    }

    /// Remove a strategy by name. Returns whether it was registered.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.strategies.len();
        self.strategies.retain(|s| s.name() != name);
        self.strategies.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.strategies.iter().any(|s| s.name() == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Strategies in application order.
    ///
    /// Categories run in fixed order. Inside a category, Kahn's algorithm
    /// honours `priors`/`posteriors`; ties go to registration order.
    /// Relations naming unregistered strategies are ignored.
    pub fn ordered(&self) -> CompileResult<Vec<Arc<dyn TraversalStrategy>>> {
        let mut out = Vec::with_capacity(self.strategies.len());
        for category in StrategyCategory::ALL {
            let members: Vec<&Arc<dyn TraversalStrategy>> = self
                .strategies
                .iter()
                .filter(|s| s.category() == category)
                .collect();
            let index: HashMap<&str, usize> = members
                .iter()
                .enumerate()
                .map(|(i, s)| (s.name(), i))
                .collect();

            let mut successors = vec![Vec::new(); members.len()];
            let mut indegree = vec![0usize; members.len()];
            for (i, strategy) in members.iter().enumerate() {
                for prior in strategy.priors() {
                    if let Some(&j) = index.get(prior) {
                        successors[j].push(i);
                        indegree[i] += 1;
                    }
                }
                for posterior in strategy.posteriors() {
                    if let Some(&j) = index.get(posterior) {
                        successors[i].push(j);
                        indegree[j] += 1;
                    }
                }
            }

            let mut ready: BTreeSet<usize> = (0..members.len())
                .filter(|&i| indegree[i] == 0)
                .collect();
            let mut emitted = vec![false; members.len()];
            while let Some(i) = ready.pop_first() {
                emitted[i] = true;
                out.push(Arc::clone(members[i]));
                for &j in &successors[i] {
                    indegree[j] -= 1;
                    if indegree[j] == 0 {
                        ready.insert(j);
                    }
                }
            }

            if emitted.iter().any(|done| !done) {
                let stuck = members
                    .iter()
                    .zip(&emitted)
                    .filter(|(_, done)| !**done)
                    .map(|(s, _)| s.name().to_owned())
                    .collect();
                return Err(CompileError::StrategyCycle(stuck));
            }
        }
        Ok(out)
    }

    /// Apply every strategy once to the root, then to each child traversal.
    pub fn apply(
        &self,
        traversal: &mut Traversal,
        capabilities: &Capabilities,
        target: ExecutionTarget,
    ) -> CompileResult<()> {
        let ordered = self.ordered()?;
        let root = StrategyContext {
            capabilities,
            target,
            is_root: true,
            requirements: Requirements::of(traversal),
        };
        for strategy in &ordered {
            debug!("applying strategy {}", strategy.name());
            strategy.apply(traversal, &root)?;
        }
        let child = StrategyContext {
            is_root: false,
            requirements: Requirements::of(traversal),
            ..root
        };
        apply_to_children(&ordered, traversal, &child)
    }
}

fn apply_to_children(
    ordered: &[Arc<dyn TraversalStrategy>],
    traversal: &mut Traversal,
    ctx: &StrategyContext<'_>,
) -> CompileResult<()> {
    traversal.steps_mut(|steps| {
        for step in steps.iter_mut() {
            for child in step.children_mut() {
                for strategy in ordered {
                    strategy.apply(child, ctx)?;
                }
                apply_to_children(ordered, child, ctx)?;
            }
        }
        Ok(())
    })?
}
