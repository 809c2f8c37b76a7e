use std::cell::RefCell;

use indexmap::IndexMap;
use trellis_core::Value;

/// Named collections written by `store` and `aggregate`, seeded by
/// `withSideEffect`.
///
/// One instance belongs to one iteration; it is not shared across threads.
#[derive(Debug, Default)]
pub struct SideEffects {
    values: RefCell<IndexMap<String, Value>>,
}

impl SideEffects {
    pub fn new(initial: IndexMap<String, Value>) -> Self {
        Self {
            values: RefCell::new(initial),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }

    /// Append `items` to the list under `key`, creating it if missing.
    ///
    /// A non-list value already stored under `key` becomes the first item.
    pub fn append(&self, key: &str, items: impl IntoIterator<Item = Value>) {
        let mut values = self.values.borrow_mut();
        let slot = values
            .entry(key.to_owned())
            .or_insert_with(|| Value::List(Vec::new()));
        if !matches!(slot, Value::List(_)) {
            let previous = std::mem::replace(slot, Value::Null);
            *slot = Value::List(vec![previous]);
        }
        if let Value::List(list) = slot {
            list.extend(items);
        }
    }

    pub fn snapshot(&self) -> IndexMap<String, Value> {
        self.values.borrow().clone()
    }
}
