use trellis_bytecode::{FilterStep, FlatMapStep, Step, StepKind, Traversal};
use trellis_core::PhysicalStep;

use super::{StrategyCategory, StrategyContext, TraversalStrategy};
use crate::error::CompileResult;

/// `V().has(key, eq(value))` becomes a native index lookup when the store
/// advertises [`PhysicalStep::PropertyIndexLookup`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexedSourceStrategy;

impl TraversalStrategy for IndexedSourceStrategy {
    fn name(&self) -> &'static str {
        "IndexedSourceStrategy"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::ProviderOptimization
    }

    fn apply(&self, traversal: &mut Traversal, ctx: &StrategyContext<'_>) -> CompileResult<()> {
        if !ctx.is_root || !ctx.capabilities.supports(PhysicalStep::PropertyIndexLookup) {
            return Ok(());
        }
        let lookup = match traversal.steps() {
            [
                Step {
                    kind: StepKind::FlatMap(FlatMapStep::Vertices { ids }),
                    labels: source_labels,
                },
                Step {
                    kind:
                        StepKind::Filter(FilterStep::Has {
                            label: None,
                            key,
                            predicate: Some(predicate),
                        }),
                    labels: has_labels,
                },
                ..,
            ] if ids.is_empty() => predicate.as_literal_eq().map(|value| {
                Step::flat_map(FlatMapStep::IndexedVertices {
                    key: key.clone(),
                    value: value.clone(),
                })
                .with_labels(source_labels.iter().chain(has_labels).cloned())
            }),
            _ => None,
        };
        if let Some(lookup) = lookup {
            traversal.steps_mut(|steps| {
                steps.drain(0..2);
                steps.insert(0, lookup);
            })?;
        }
        Ok(())
    }
}
