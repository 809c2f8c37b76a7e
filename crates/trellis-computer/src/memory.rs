//! Global memory shared by all vertices of a run.
//!
//! Vertices only contribute: each partition accumulates a [`MemoryPartial`]
//! during a superstep, and the partials are reduced into [`Memory`] at the
//! barrier in partition order. The master step reads and overwrites memory
//! directly between supersteps.

use indexmap::IndexMap;
use trellis_core::{Operator, Traverser, Value};

use crate::error::ComputerError;

/// How contributions to a memory key combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Sum,
    Min,
    Max,
    And,
    Or,
    /// List concatenation; a non-list contribution is appended as one item.
    Append,
    /// Like `Append`, skipping items already present.
    Union,
    /// Concatenates traverser batches.
    Collect,
}

/// Contents of a memory key.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Value(Value),
    Traversers(Vec<Traverser>),
}

/// A memory key declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryKey {
    pub name: String,
    pub reducer: Reducer,
    pub initial: Slot,
}

impl MemoryKey {
    pub fn new(name: impl Into<String>, reducer: Reducer, initial: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            reducer,
            initial: Slot::Value(initial.into()),
        }
    }

    /// A key that parks traversers, starting empty.
    pub fn traversers(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reducer: Reducer::Collect,
            initial: Slot::Traversers(Vec::new()),
        }
    }
}

fn mismatch(key: &str, reason: impl Into<String>) -> ComputerError {
    ComputerError::MemoryType {
        key: key.to_owned(),
        reason: reason.into(),
    }
}

impl Reducer {
    fn combine(self, key: &str, current: Slot, incoming: Slot) -> Result<Slot, ComputerError> {
        match (self, current, incoming) {
            (Reducer::Collect, Slot::Traversers(mut parked), Slot::Traversers(more)) => {
                parked.extend(more);
                Ok(Slot::Traversers(parked))
            }
            (Reducer::Collect, _, _) => Err(mismatch(key, "holds traversers, not values")),
            (_, Slot::Value(current), Slot::Value(incoming)) => {
                self.combine_values(key, current, incoming).map(Slot::Value)
            }
            _ => Err(mismatch(key, "holds values, not traversers")),
        }
    }

    fn combine_values(self, key: &str, current: Value, incoming: Value) -> Result<Value, ComputerError> {
        let op = match self {
            Reducer::Sum => Operator::Sum,
            Reducer::Min => Operator::Min,
            Reducer::Max => Operator::Max,
            Reducer::And => Operator::And,
            Reducer::Or => Operator::Or,
            Reducer::Append => return Ok(append(current, incoming, false)),
            Reducer::Union => return Ok(append(current, incoming, true)),
            Reducer::Collect => return Err(mismatch(key, "holds traversers, not values")),
        };
        op.apply(&current, &incoming)
            .map_err(|e| mismatch(key, e.to_string()))
    }
}

fn append(current: Value, incoming: Value, distinct: bool) -> Value {
    let mut items = match current {
        Value::Null => Vec::new(),
        Value::List(items) => items,
        other => vec![other],
    };
    let incoming = match incoming {
        Value::List(more) => more,
        other => vec![other],
    };
    for item in incoming {
        if !distinct || !items.contains(&item) {
            items.push(item);
        }
    }
    Value::List(items)
}

/// Memory as the master sees it.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    reducers: IndexMap<String, Reducer>,
    slots: IndexMap<String, Slot>,
    superstep: u32,
}

impl Memory {
    pub fn new(keys: impl IntoIterator<Item = MemoryKey>) -> Self {
        let mut memory = Self::default();
        for key in keys {
            memory.reducers.insert(key.name.clone(), key.reducer);
            memory.slots.insert(key.name, key.initial);
        }
        memory
    }

    /// The superstep currently running, or just finished when read by the
    /// master.
    pub fn superstep(&self) -> u32 {
        self.superstep
    }

    pub(crate) fn set_superstep(&mut self, superstep: u32) {
        self.superstep = superstep;
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    pub(crate) fn reducer(&self, key: &str) -> Result<Reducer, ComputerError> {
        self.reducers
            .get(key)
            .copied()
            .ok_or_else(|| ComputerError::UndeclaredMemoryKey(key.to_owned()))
    }

    fn slot_mut(&mut self, key: &str) -> Result<&mut Slot, ComputerError> {
        self.slots
            .get_mut(key)
            .ok_or_else(|| ComputerError::UndeclaredMemoryKey(key.to_owned()))
    }

    pub fn get(&self, key: &str) -> Result<&Value, ComputerError> {
        match self.slots.get(key) {
            Some(Slot::Value(value)) => Ok(value),
            Some(Slot::Traversers(_)) => Err(mismatch(key, "holds traversers, not values")),
            None => Err(ComputerError::UndeclaredMemoryKey(key.to_owned())),
        }
    }

    pub fn traversers(&self, key: &str) -> Result<&[Traverser], ComputerError> {
        match self.slots.get(key) {
            Some(Slot::Traversers(parked)) => Ok(parked),
            Some(Slot::Value(_)) => Err(mismatch(key, "holds values, not traversers")),
            None => Err(ComputerError::UndeclaredMemoryKey(key.to_owned())),
        }
    }

    /// Overwrite a key, bypassing its reducer.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), ComputerError> {
        let slot = self.slot_mut(key)?;
        if matches!(slot, Slot::Traversers(_)) {
            return Err(mismatch(key, "holds traversers, not values"));
        }
        *slot = Slot::Value(value);
        Ok(())
    }

    /// Reduce `value` into a key.
    pub fn add(&mut self, key: &str, value: Value) -> Result<(), ComputerError> {
        self.reduce(key, Slot::Value(value))
    }

    pub fn park(&mut self, key: &str, traversers: Vec<Traverser>) -> Result<(), ComputerError> {
        self.reduce(key, Slot::Traversers(traversers))
    }

    /// Empty a traverser key, returning what was parked there.
    pub fn take_traversers(&mut self, key: &str) -> Result<Vec<Traverser>, ComputerError> {
        match self.slot_mut(key)? {
            Slot::Traversers(parked) => Ok(std::mem::take(parked)),
            Slot::Value(_) => Err(mismatch(key, "holds values, not traversers")),
        }
    }

    fn reduce(&mut self, key: &str, incoming: Slot) -> Result<(), ComputerError> {
        let reducer = self.reducer(key)?;
        let slot = self.slot_mut(key)?;
        let current = std::mem::replace(slot, Slot::Value(Value::Null));
        *slot = reducer.combine(key, current, incoming)?;
        Ok(())
    }

    pub(crate) fn merge(&mut self, partial: MemoryPartial) -> Result<(), ComputerError> {
        for (key, slot) in partial.slots {
            self.reduce(&key, slot)?;
        }
        Ok(())
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            slots: self.slots.clone(),
        }
    }

    pub(crate) fn into_snapshot(self) -> MemorySnapshot {
        MemorySnapshot { slots: self.slots }
    }
}

/// Contributions of one partition during one superstep.
#[derive(Debug, Default)]
pub struct MemoryPartial {
    slots: IndexMap<String, Slot>,
}

impl MemoryPartial {
    pub(crate) fn add(&mut self, memory: &Memory, key: &str, incoming: Slot) -> Result<(), ComputerError> {
        let reducer = memory.reducer(key)?;
        match self.slots.get_mut(key) {
            Some(slot) => {
                let current = std::mem::replace(slot, Slot::Value(Value::Null));
                *slot = reducer.combine(key, current, incoming)?;
            }
            None => {
                let parks = matches!(incoming, Slot::Traversers(_));
                if parks != (reducer == Reducer::Collect) {
                    let reason = if parks {
                        "holds values, not traversers"
                    } else {
                        "holds traversers, not values"
                    };
                    return Err(mismatch(key, reason));
                }
                self.slots.insert(key.to_owned(), incoming);
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Final memory of a completed run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySnapshot {
    slots: IndexMap<String, Slot>,
}

impl MemorySnapshot {
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.slots.get(key)? {
            Slot::Value(value) => Some(value),
            Slot::Traversers(_) => None,
        }
    }

    pub fn traversers(&self, key: &str) -> Option<&[Traverser]> {
        match self.slots.get(key)? {
            Slot::Traversers(parked) => Some(parked),
            Slot::Value(_) => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }
}
