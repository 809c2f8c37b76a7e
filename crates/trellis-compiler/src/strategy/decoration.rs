use trellis_bytecode::{FilterStep, Step, Traversal};

use super::{StrategyCategory, StrategyContext, TraversalStrategy};
use crate::error::CompileResult;

/// Label carried by the filters this strategy inserts.
pub const SUBGRAPH_LABEL: &str = "~subgraph";

/// Restricts a traversal to the vertices accepted by a criterion.
///
/// After every step that produces vertices, a `filter(criterion)` tagged
/// with [`SUBGRAPH_LABEL`] is inserted. A step already followed by such a
/// filter is left alone, and inserted filters are never decorated.
#[derive(Debug, Clone)]
pub struct SubgraphStrategy {
    vertices: Traversal,
}

impl SubgraphStrategy {
    pub fn new(vertices: Traversal) -> Self {
        Self { vertices }
    }
}

impl TraversalStrategy for SubgraphStrategy {
    fn name(&self) -> &'static str {
        "SubgraphStrategy"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Decoration
    }

    fn apply(&self, traversal: &mut Traversal, ctx: &StrategyContext<'_>) -> CompileResult<()> {
        // The root pass walks the whole tree so that inserted filters can be skipped.
        if !ctx.is_root {
            return Ok(());
        }
        decorate(traversal, &self.vertices)
    }
}

fn is_subgraph_filter(step: &Step) -> bool {
    step.labels.iter().any(|l| l == SUBGRAPH_LABEL)
}

fn decorate(traversal: &mut Traversal, criterion: &Traversal) -> CompileResult<()> {
    traversal.steps_mut(|steps| {
        let mut i = 0;
        while i < steps.len() {
            if is_subgraph_filter(&steps[i]) {
                i += 1;
                continue;
            }
            for child in steps[i].children_mut() {
                decorate(child, criterion)?;
            }
            if steps[i].produces_vertices() && !steps.get(i + 1).is_some_and(is_subgraph_filter) {
                let filter = Step::filter(FilterStep::Traversal(criterion.clone()))
                    .with_labels([SUBGRAPH_LABEL]);
                steps.insert(i + 1, filter);
                i += 1;
            }
            i += 1;
        }
        Ok(())
    })?
}
