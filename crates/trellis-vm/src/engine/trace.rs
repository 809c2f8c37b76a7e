//! Stage instrumentation.
//!
//! The executor is generic over its tracer, so `NoopTracer` calls compile
//! away entirely. `LogTracer` forwards every event to `log::trace!`.

use trellis_bytecode::Step;
use trellis_core::Traverser;

pub trait Tracer {
    /// Called before a per-traverser step processes `input`.
    fn trace_step(&self, step: &Step, input: &Traverser);

    /// Called after a step produced `produced` traversers from one input.
    fn trace_output(&self, step: &Step, produced: usize);

    /// Called when a barrier or global step reduces `collected` traversers.
    fn trace_reduce(&self, step: &Step, collected: usize);
}

/// Tracer that does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    #[inline(always)]
    fn trace_step(&self, _step: &Step, _input: &Traverser) {}

    #[inline(always)]
    fn trace_output(&self, _step: &Step, _produced: usize) {}

    #[inline(always)]
    fn trace_reduce(&self, _step: &Step, _collected: usize) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn trace_step(&self, step: &Step, input: &Traverser) {
        log::trace!("{step} <- {} x{}", input.object, input.bulk());
    }

    fn trace_output(&self, step: &Step, produced: usize) {
        log::trace!("{step} -> {produced}");
    }

    fn trace_reduce(&self, step: &Step, collected: usize) {
        log::trace!("{step} reduces {collected}");
    }
}
