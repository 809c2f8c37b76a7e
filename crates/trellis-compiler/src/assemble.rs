//! Bytecode assembly.
//!
//! Each step instruction becomes one `Step`. Modulators (`as`, `by`,
//! `times`, `until`, `emit`) configure the step before them instead.

use trellis_bytecode::{
    Argument, BarrierStep, BranchStep, By, Bytecode, Emit, FilterStep, FlatMapStep, Instruction,
    Order, P, PropertyValue, SackConfig, Scope, SideEffectStep, Step, StepKind, Token, Traversal,
};
use trellis_core::{Direction, SackSplit, Value};

use crate::error::{CompileError, CompileResult};

/// A root traversal together with the source options that do not live on it.
#[derive(Debug, Clone, Default)]
pub struct Assembled {
    pub traversal: Traversal,
    /// `withComputer()` was requested.
    pub with_computer: bool,
    /// Strategy names removed with `withoutStrategies`.
    pub without_strategies: Vec<String>,
}

/// Assemble a root traversal, including its source instructions.
pub fn assemble(bytecode: &Bytecode) -> CompileResult<Assembled> {
    let mut assembled = Assembled::default();
    for instruction in bytecode.source_instructions() {
        apply_source(&mut assembled, instruction)?;
    }
    for instruction in bytecode.step_instructions() {
        apply_step(&mut assembled.traversal, instruction)?;
    }
    Ok(assembled)
}

/// Assemble an anonymous child traversal. Source instructions are rejected.
pub fn assemble_child(bytecode: &Bytecode) -> CompileResult<Traversal> {
    if let Some(source) = bytecode.source_instructions().first() {
        return Err(CompileError::InvalidArgument {
            operator: source.operator().to_owned(),
            reason: "source instructions are not allowed in a child traversal".into(),
        });
    }
    let mut traversal = Traversal::new();
    for instruction in bytecode.step_instructions() {
        apply_step(&mut traversal, instruction)?;
    }
    Ok(traversal)
}

fn apply_source(assembled: &mut Assembled, instruction: &Instruction) -> CompileResult<()> {
    let args = Args::new(instruction);
    match instruction.operator() {
        "withSack" => {
            args.between(1, 3, "1 to 3")?;
            let mut sack = SackConfig::new(args.value(0)?.clone());
            for (i, arg) in args.args.iter().enumerate().skip(1) {
                match arg {
                    Argument::Token(Token::Operator(op)) => sack.merge = Some(*op),
                    Argument::Value(Value::String(s)) if s == "copy" => {
                        sack.split = SackSplit::Copy
                    }
                    Argument::Value(Value::String(s)) if s == "reset" => {
                        sack.split = SackSplit::Reset
                    }
                    _ => {
                        return Err(args.invalid(format!(
                            "argument {i} must be a merge operator or a split mode"
                        )));
                    }
                }
            }
            assembled.traversal.set_sack(Some(sack))?;
        }
        "withSideEffect" => {
            args.exactly(2)?;
            let key = args.string(0)?;
            assembled
                .traversal
                .add_side_effect(key, args.value(1)?.clone())?;
        }
        "withComputer" => {
            args.exactly(0)?;
            assembled.with_computer = true;
        }
        "withoutStrategies" => {
            args.at_least(1)?;
            assembled.without_strategies.extend(args.strings()?);
        }
        other => return Err(CompileError::UnknownOperator(other.to_owned())),
    }
    Ok(())
}

fn apply_step(traversal: &mut Traversal, instruction: &Instruction) -> CompileResult<()> {
    let args = Args::new(instruction);
    let step = match instruction.operator() {
        "as" | "by" | "times" | "until" | "emit" => return modulate(traversal, &args),

        "V" => Step::flat_map(FlatMapStep::Vertices { ids: args.values()? }),
        "E" => Step::flat_map(FlatMapStep::Edges { ids: args.values()? }),
        "inject" => Step::flat_map(FlatMapStep::Inject {
            values: args.values()?,
        }),
        op @ ("out" | "in" | "both") => Step::flat_map(FlatMapStep::Adjacent {
            direction: direction_of(op),
            labels: args.strings()?,
        }),
        op @ ("outE" | "inE" | "bothE") => Step::flat_map(FlatMapStep::Incident {
            direction: direction_of(op),
            labels: args.strings()?,
        }),
        op @ ("outV" | "inV" | "bothV") => {
            args.exactly(0)?;
            Step::flat_map(FlatMapStep::EdgeVertex {
                direction: direction_of(op),
            })
        }
        "otherV" => args.nullary(FlatMapStep::OtherVertex)?,
        "values" => Step::flat_map(FlatMapStep::Values {
            keys: args.strings()?,
        }),
        "valueMap" => Step::flat_map(FlatMapStep::ValueMap {
            keys: args.strings()?,
        }),
        "id" => args.nullary(FlatMapStep::Id)?,
        "label" => args.nullary(FlatMapStep::Label)?,
        "identity" => args.nullary(FlatMapStep::Identity)?,
        "unfold" => args.nullary(FlatMapStep::Unfold)?,
        "path" => args.nullary(FlatMapStep::Path)?,
        "loops" => args.nullary(FlatMapStep::Loops)?,
        "constant" => {
            args.exactly(1)?;
            Step::flat_map(FlatMapStep::Constant(args.value(0)?.clone()))
        }
        "select" => {
            args.at_least(1)?;
            Step::flat_map(FlatMapStep::Select {
                labels: args.strings()?,
                by: Vec::new(),
            })
        }
        "sack" => match args.args {
            [] => Step::flat_map(FlatMapStep::Sack),
            [Argument::Token(Token::Operator(op))] => Step::side_effect(SideEffectStep::Sack {
                operator: *op,
                by: By::Identity,
            }),
            [_] => return Err(args.invalid("expected an operator token")),
            _ => return Err(args.arity("0 or 1")),
        },
        "map" => Step::flat_map(FlatMapStep::Map(args.single_traversal()?)),
        "flatMap" => Step::flat_map(FlatMapStep::FlatMap(args.single_traversal()?)),
        "count" => match args.args {
            [] | [Argument::Token(Token::Scope(Scope::Global))] => {
                Step::barrier(BarrierStep::Count)
            }
            [Argument::Token(Token::Scope(Scope::Local))] => {
                Step::flat_map(FlatMapStep::CountLocal)
            }
            [_] => return Err(args.invalid("expected a scope token")),
            _ => return Err(args.arity("0 or 1")),
        },
        "project" => {
            args.at_least(1)?;
            Step::flat_map(FlatMapStep::Project {
                keys: args.strings()?,
                by: Vec::new(),
            })
        }

        "has" => {
            let (label, key, predicate) = match args.args.len() {
                1 => (None, args.string(0)?, None),
                2 => (None, args.string(0)?, Some(args.predicate(1)?)),
                3 => (
                    Some(args.string(0)?),
                    args.string(1)?,
                    Some(args.predicate(2)?),
                ),
                _ => return Err(args.arity("1 to 3")),
            };
            Step::filter(FilterStep::Has {
                label,
                key,
                predicate,
            })
        }
        "hasLabel" => {
            args.at_least(1)?;
            Step::filter(FilterStep::HasLabel(args.strings()?))
        }
        "hasId" => {
            args.at_least(1)?;
            Step::filter(FilterStep::HasId(args.values()?))
        }
        "hasNot" => {
            args.exactly(1)?;
            Step::filter(FilterStep::HasNot(args.string(0)?))
        }
        "is" => {
            args.exactly(1)?;
            Step::filter(FilterStep::Is(args.predicate(0)?))
        }
        "where" => match args.args {
            [Argument::Bytecode(b)] => Step::filter(FilterStep::Traversal(assemble_child(b)?)),
            [Argument::Predicate(p)] => Step::filter(FilterStep::Where {
                start: None,
                predicate: p.clone().into_label_operands(),
            }),
            [_, Argument::Predicate(p)] => Step::filter(FilterStep::Where {
                start: Some(args.string(0)?),
                predicate: p.clone().into_label_operands(),
            }),
            [_] | [_, _] => return Err(args.invalid("expected a predicate or a traversal")),
            _ => return Err(args.arity("1 or 2")),
        },
        "filter" => Step::filter(FilterStep::Traversal(args.single_traversal()?)),
        "not" => Step::filter(FilterStep::Not(args.single_traversal()?)),
        "and" => {
            args.at_least(1)?;
            Step::filter(FilterStep::And(args.traversals()?))
        }
        "or" => {
            args.at_least(1)?;
            Step::filter(FilterStep::Or(args.traversals()?))
        }
        "simplePath" => {
            args.exactly(0)?;
            Step::filter(FilterStep::SimplePath)
        }
        "dedup" => {
            args.exactly(0)?;
            Step::filter(FilterStep::Dedup)
        }
        "limit" => {
            args.exactly(1)?;
            Step::filter(FilterStep::Range {
                low: 0,
                high: Some(args.count(0)?),
            })
        }
        "skip" => {
            args.exactly(1)?;
            Step::filter(FilterStep::Range {
                low: args.count(0)?,
                high: None,
            })
        }
        "range" => {
            args.exactly(2)?;
            let low = args.count(0)?;
            let high = match args.value(1)? {
                Value::Int(-1) => None,
                _ => Some(args.count(1)?),
            };
            if high.is_some_and(|high| high < low) {
                return Err(args.invalid("upper bound is below lower bound"));
            }
            Step::filter(FilterStep::Range { low, high })
        }

        "property" => {
            args.exactly(2)?;
            let value = match &args.args[1] {
                Argument::Bytecode(b) => PropertyValue::Traversal(assemble_child(b)?),
                Argument::Value(v) => PropertyValue::Constant(v.clone()),
                _ => return Err(args.invalid("expected a value or a traversal")),
            };
            Step::side_effect(SideEffectStep::Property {
                key: args.string(0)?,
                value,
            })
        }
        "store" => {
            args.exactly(1)?;
            Step::side_effect(SideEffectStep::Store {
                key: args.string(0)?,
            })
        }
        "sideEffect" => Step::side_effect(SideEffectStep::Traversal(args.single_traversal()?)),

        "sum" => args.nullary_barrier(BarrierStep::Sum)?,
        "min" => args.nullary_barrier(BarrierStep::Min)?,
        "max" => args.nullary_barrier(BarrierStep::Max)?,
        "mean" => args.nullary_barrier(BarrierStep::Mean)?,
        "fold" => args.nullary_barrier(BarrierStep::Fold)?,
        "order" => args.nullary_barrier(BarrierStep::Order { by: Vec::new() })?,
        "groupCount" => args.nullary_barrier(BarrierStep::GroupCount { by: By::Identity })?,
        "aggregate" => {
            args.exactly(1)?;
            Step::barrier(BarrierStep::Aggregate {
                key: args.string(0)?,
            })
        }
        "barrier" => {
            args.between(0, 1, "0 or 1")?;
            let max_size = match args.args.len() {
                0 => None,
                _ => Some(args.count(0)? as usize),
            };
            Step::barrier(BarrierStep::NoOp { max_size })
        }

        "union" => {
            args.at_least(1)?;
            Step::branch(BranchStep::Union(args.traversals()?))
        }
        "repeat" => Step::branch(BranchStep::Repeat {
            body: args.single_traversal()?,
            times: None,
            until: None,
            emit: None,
        }),
        "choose" => {
            args.between(2, 3, "2 or 3")?;
            let on_false = match args.args.len() {
                3 => args.traversal(2)?,
                _ => Traversal::new(),
            };
            Step::branch(BranchStep::Choose {
                condition: args.traversal(0)?,
                on_true: args.traversal(1)?,
                on_false,
            })
        }
        "coalesce" => {
            args.at_least(1)?;
            Step::branch(BranchStep::Coalesce(args.traversals()?))
        }
        "optional" => Step::branch(BranchStep::Optional(args.single_traversal()?)),
        "local" => Step::branch(BranchStep::Local(args.single_traversal()?)),

        other => return Err(CompileError::UnknownOperator(other.to_owned())),
    };
    traversal.add_step(step)?;
    Ok(())
}

fn modulate(traversal: &mut Traversal, args: &Args<'_>) -> CompileResult<()> {
    let dangling = || CompileError::DanglingModulator(args.operator.to_owned());
    match args.operator {
        "as" => {
            args.at_least(1)?;
            if !traversal.add_labels(&args.strings()?)? {
                return Err(dangling());
            }
            Ok(())
        }
        "by" => {
            let (by, order) = args.by()?;
            traversal.steps_mut(|steps| {
                let Some(step) = steps.last_mut() else {
                    return Err(dangling());
                };
                match &mut step.kind {
                    StepKind::SideEffect(SideEffectStep::Sack { by: slot, .. })
                    | StepKind::Barrier(BarrierStep::GroupCount { by: slot })
                        if order.is_none() =>
                    {
                        *slot = by;
                    }
                    StepKind::Barrier(BarrierStep::Order { by: slots }) => {
                        slots.push((by, order.unwrap_or_default()));
                    }
                    StepKind::FlatMap(
                        FlatMapStep::Select { by: slots, .. }
                        | FlatMapStep::Project { by: slots, .. },
                    ) if order.is_none() => slots.push(by),
                    _ => return Err(dangling()),
                }
                Ok(())
            })?
        }
        "times" | "until" | "emit" => {
            let update = match args.operator {
                "times" => {
                    args.exactly(1)?;
                    let n = u32::try_from(args.count(0)?)
                        .map_err(|_| args.invalid("loop count is too large"))?;
                    RepeatUpdate::Times(n)
                }
                "until" => RepeatUpdate::Until(args.single_traversal()?),
                _ => match args.args.len() {
                    0 => RepeatUpdate::Emit(Emit::Always),
                    1 => RepeatUpdate::Emit(Emit::When(args.traversal(0)?)),
                    _ => return Err(args.arity("0 or 1")),
                },
            };
            traversal.steps_mut(|steps| {
                let Some(Step {
                    kind:
                        StepKind::Branch(BranchStep::Repeat {
                            times, until, emit, ..
                        }),
                    ..
                }) = steps.last_mut()
                else {
                    return Err(dangling());
                };
                match update {
                    RepeatUpdate::Times(n) => *times = Some(n),
                    RepeatUpdate::Until(t) => *until = Some(t),
                    RepeatUpdate::Emit(e) => *emit = Some(e),
                }
                Ok(())
            })?
        }
        other => Err(CompileError::UnknownOperator(other.to_owned())),
    }
}

enum RepeatUpdate {
    Times(u32),
    Until(Traversal),
    Emit(Emit),
}

fn direction_of(operator: &str) -> Direction {
    if operator.starts_with("out") {
        Direction::Out
    } else if operator.starts_with("in") {
        Direction::In
    } else {
        Direction::Both
    }
}

/// Typed access to an instruction's arguments.
struct Args<'a> {
    operator: &'a str,
    args: &'a [Argument],
}

impl<'a> Args<'a> {
    fn new(instruction: &'a Instruction) -> Self {
        Self {
            operator: instruction.operator(),
            args: instruction.arguments(),
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> CompileError {
        CompileError::InvalidArgument {
            operator: self.operator.to_owned(),
            reason: reason.into(),
        }
    }

    fn arity(&self, expected: &'static str) -> CompileError {
        CompileError::Arity {
            operator: self.operator.to_owned(),
            expected,
            found: self.args.len(),
        }
    }

    fn exactly(&self, n: usize) -> CompileResult<()> {
        const NAMES: [&str; 3] = ["0", "1", "2"];
        if self.args.len() != n {
            return Err(self.arity(NAMES.get(n).copied().unwrap_or("more")));
        }
        Ok(())
    }

    fn at_least(&self, n: usize) -> CompileResult<()> {
        if self.args.len() < n {
            return Err(self.arity("at least 1"));
        }
        Ok(())
    }

    fn between(&self, lo: usize, hi: usize, expected: &'static str) -> CompileResult<()> {
        if !(lo..=hi).contains(&self.args.len()) {
            return Err(self.arity(expected));
        }
        Ok(())
    }

    fn nullary(&self, step: FlatMapStep) -> CompileResult<Step> {
        self.exactly(0)?;
        Ok(Step::flat_map(step))
    }

    fn nullary_barrier(&self, step: BarrierStep) -> CompileResult<Step> {
        self.exactly(0)?;
        Ok(Step::barrier(step))
    }

    fn value(&self, i: usize) -> CompileResult<&'a Value> {
        match &self.args[i] {
            Argument::Value(v) => Ok(v),
            _ => Err(self.invalid(format!("argument {i} must be a value"))),
        }
    }

    fn values(&self) -> CompileResult<Vec<Value>> {
        (0..self.args.len())
            .map(|i| self.value(i).cloned())
            .collect()
    }

    fn string(&self, i: usize) -> CompileResult<String> {
        match &self.args[i] {
            Argument::Value(Value::String(s)) | Argument::Label(s) => Ok(s.clone()),
            _ => Err(self.invalid(format!("argument {i} must be a string"))),
        }
    }

    fn strings(&self) -> CompileResult<Vec<String>> {
        (0..self.args.len()).map(|i| self.string(i)).collect()
    }

    fn count(&self, i: usize) -> CompileResult<u64> {
        match self.value(i)? {
            Value::Int(n) if *n >= 0 => Ok(*n as u64),
            _ => Err(self.invalid(format!("argument {i} must be a non-negative integer"))),
        }
    }

    fn predicate(&self, i: usize) -> CompileResult<P> {
        match &self.args[i] {
            Argument::Predicate(p) => Ok(p.clone()),
            Argument::Value(v) => Ok(P::eq(v.clone())),
            _ => Err(self.invalid(format!("argument {i} must be a value or a predicate"))),
        }
    }

    fn traversal(&self, i: usize) -> CompileResult<Traversal> {
        match &self.args[i] {
            Argument::Bytecode(b) => assemble_child(b),
            _ => Err(self.invalid(format!("argument {i} must be a traversal"))),
        }
    }

    fn single_traversal(&self) -> CompileResult<Traversal> {
        self.exactly(1)?;
        self.traversal(0)
    }

    fn traversals(&self) -> CompileResult<Vec<Traversal>> {
        (0..self.args.len()).map(|i| self.traversal(i)).collect()
    }

    /// Decode `by([projection][, order])`.
    fn by(&self) -> CompileResult<(By, Option<Order>)> {
        let projection = |arg: &Argument| -> CompileResult<Option<By>> {
            Ok(match arg {
                Argument::Value(Value::String(key)) => Some(By::Key(key.clone())),
                Argument::Bytecode(b) => Some(By::Traversal(assemble_child(b)?)),
                Argument::Token(Token::T(t)) => Some(By::T(*t)),
                _ => None,
            })
        };
        match self.args {
            [] => Ok((By::Identity, None)),
            [Argument::Token(Token::Order(order))] => Ok((By::Identity, Some(*order))),
            [arg] => projection(arg)?
                .map(|by| (by, None))
                .ok_or_else(|| self.invalid("expected a key, a traversal, a T token or an order")),
            [arg, Argument::Token(Token::Order(order))] => projection(arg)?
                .map(|by| (by, Some(*order)))
                .ok_or_else(|| self.invalid("expected a key, a traversal or a T token")),
            [_, _] => Err(self.invalid("second argument must be an order")),
            _ => Err(self.arity("0 to 2")),
        }
    }
}
