use trellis_bytecode::{Requirements, Traversal};

use super::{StrategyCategory, StrategyContext, TraversalStrategy};
use crate::error::CompileResult;

/// Records the root's [`Requirements`] so execution can read them cheaply.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequirementsStrategy;

impl TraversalStrategy for RequirementsStrategy {
    fn name(&self) -> &'static str {
        "RequirementsStrategy"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Finalization
    }

    fn apply(&self, traversal: &mut Traversal, ctx: &StrategyContext<'_>) -> CompileResult<()> {
        if ctx.is_root {
            let requirements = Requirements::of(traversal);
            traversal.set_requirements(requirements)?;
        }
        Ok(())
    }
}
