//! Test helpers for building bytecode and running strategies.

use trellis_bytecode::{Argument, Bytecode, Traversal};
use trellis_core::{Capabilities, Value};

use crate::{
    ExecutionTarget, StrategyContext, StrategyRegistry, TraversalStrategy, assemble, assemble_child,
};

/// Bytecode with step instructions only.
pub fn steps<const N: usize>(instructions: [(&str, Vec<Argument>); N]) -> Bytecode {
    let mut bytecode = Bytecode::new();
    for (operator, arguments) in instructions {
        bytecode.add_step(operator, arguments);
    }
    bytecode
}

/// An anonymous child traversal argument.
pub fn child<const N: usize>(instructions: [(&str, Vec<Argument>); N]) -> Argument {
    Argument::Bytecode(steps(instructions))
}

pub fn s(value: &str) -> Argument {
    Argument::Value(Value::from(value))
}

pub fn n(value: i64) -> Argument {
    Argument::Value(Value::Int(value))
}

/// Assemble a child-only traversal; panics on assembly errors.
pub fn traversal<const N: usize>(instructions: [(&str, Vec<Argument>); N]) -> Traversal {
    assemble_child(&steps(instructions)).expect("bytecode should assemble")
}

/// Assemble and run the standard strategies for OLTP on a plain store.
pub fn compile(bytecode: &Bytecode) -> Traversal {
    compile_with(bytecode, &Capabilities::new(), ExecutionTarget::Oltp)
}

pub fn compile_with(
    bytecode: &Bytecode,
    capabilities: &Capabilities,
    target: ExecutionTarget,
) -> Traversal {
    let mut traversal = assemble(bytecode)
        .expect("bytecode should assemble")
        .traversal;
    StrategyRegistry::standard()
        .apply(&mut traversal, capabilities, target)
        .expect("strategies should apply");
    traversal
}

/// Apply a single strategy to a root traversal.
pub fn apply(strategy: &dyn TraversalStrategy, traversal: &mut Traversal) {
    apply_with(strategy, traversal, ExecutionTarget::Oltp)
        .expect("strategy should apply");
}

pub fn apply_with(
    strategy: &dyn TraversalStrategy,
    traversal: &mut Traversal,
    target: ExecutionTarget,
) -> crate::CompileResult<()> {
    let capabilities = Capabilities::new();
    let ctx = StrategyContext {
        capabilities: &capabilities,
        target,
        is_root: true,
        requirements: traversal.requirements(),
    };
    strategy.apply(traversal, &ctx)
}
