//! Traversal strategies.
//!
//! A strategy rewrites a traversal in place before it is locked. Strategies
//! are grouped into categories that always run in the order of
//! [`StrategyCategory::ALL`]; inside a category, `priors` and `posteriors`
//! name strategies that must run before or after. The registry applies every
//! strategy once to the root and then, recursively, to each child traversal.

mod decoration;
mod finalization;
mod optimization;
mod provider;
mod registry;
mod verification;

#[cfg(test)]
mod registry_tests;
#[cfg(test)]
mod verification_tests;

use trellis_bytecode::{Requirements, Traversal};
use trellis_core::Capabilities;

use crate::error::CompileResult;

pub use decoration::{SUBGRAPH_LABEL, SubgraphStrategy};
pub use finalization::RequirementsStrategy;
pub use optimization::{
    FilterRankingStrategy, IdentityRemovalStrategy, IncidentToAdjacentStrategy,
    InlineFilterStrategy, LazyBarrierStrategy, RepeatUnrollStrategy,
};
pub use provider::IndexedSourceStrategy;
pub use registry::StrategyRegistry;
pub use verification::{ComputerVerificationStrategy, StandardVerificationStrategy};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StrategyCategory {
    Decoration,
    Optimization,
    ProviderOptimization,
    Finalization,
    Verification,
}

impl StrategyCategory {
    pub const ALL: [StrategyCategory; 5] = [
        Self::Decoration,
        Self::Optimization,
        Self::ProviderOptimization,
        Self::Finalization,
        Self::Verification,
    ];
}

/// Where the traversal is going to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExecutionTarget {
    /// Single-threaded pull chain.
    #[default]
    Oltp,
    /// Bulk-synchronous vertex program.
    Olap,
}

/// What a strategy may consult while rewriting.
#[derive(Clone, Copy, Debug)]
pub struct StrategyContext<'a> {
    pub capabilities: &'a Capabilities,
    pub target: ExecutionTarget,
    /// Whether the traversal being rewritten is the root.
    pub is_root: bool,
    /// Requirements of the whole root traversal.
    pub requirements: Requirements,
}

pub trait TraversalStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn category(&self) -> StrategyCategory;

    /// Strategies of the same category that must run before this one.
    fn priors(&self) -> &[&'static str] {
        &[]
    }

    /// Strategies of the same category that must run after this one.
    fn posteriors(&self) -> &[&'static str] {
        &[]
    }

    /// Rewrite `traversal` in place. Must be idempotent.
    fn apply(&self, traversal: &mut Traversal, ctx: &StrategyContext<'_>) -> CompileResult<()>;
}
