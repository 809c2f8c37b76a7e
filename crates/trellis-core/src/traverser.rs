//! Traversers: the unit of data flowing through a traversal.
//!
//! A traverser owns its path outright. Branching clones it (copy-on-branch),
//! so paths form a tree across traversers and never a shared mutable graph.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::operator::{Operator, OperatorError};
use crate::value::Value;

/// One entry of a traverser's path history.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathEntry {
    pub labels: Vec<String>,
    pub object: Value,
}

/// Append-only history of the objects a traverser visited.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path(Vec<PathEntry>);

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> &[PathEntry] {
        &self.0
    }

    pub fn push(&mut self, labels: Vec<String>, object: Value) {
        self.0.push(PathEntry { labels, object });
    }

    /// Most recent object bound to `label`.
    pub fn get(&self, label: &str) -> Option<&Value> {
        self.0
            .iter()
            .rev()
            .find(|entry| entry.labels.iter().any(|l| l == label))
            .map(|entry| &entry.object)
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.get(label).is_some()
    }

    pub fn objects(&self) -> impl Iterator<Item = &Value> {
        self.0.iter().map(|entry| &entry.object)
    }

    /// True when no object repeats along the path.
    pub fn is_simple(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.objects().all(|object| seen.insert(object))
    }

    pub fn to_value(&self) -> Value {
        Value::List(self.objects().cloned().collect())
    }

    fn last_mut(&mut self) -> Option<&mut PathEntry> {
        self.0.last_mut()
    }
}

/// How a sack behaves when a traverser splits into branches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SackSplit {
    /// Each branch receives a copy of the current sack.
    #[default]
    Copy,
    /// Each branch starts again from the initial sack value.
    Reset,
}

/// A single in-flight unit of data.
///
/// `bulk` counts how many identical traversers this instance stands for and
/// is never zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Traverser {
    pub object: Value,
    pub path: Path,
    pub sack: Option<Value>,
    pub loops: u32,
    bulk: u64,
}

impl Traverser {
    pub fn new(object: impl Into<Value>) -> Self {
        Self {
            object: object.into(),
            path: Path::new(),
            sack: None,
            loops: 0,
            bulk: 1,
        }
    }

    /// The traverser a root traversal starts from.
    pub fn seed(sack: Option<Value>) -> Self {
        Self {
            sack,
            ..Self::new(Value::Null)
        }
    }

    pub fn bulk(&self) -> u64 {
        self.bulk
    }

    pub fn with_bulk(mut self, bulk: u64) -> Self {
        debug_assert!(bulk >= 1, "traverser bulk must be at least 1");
        self.bulk = bulk.max(1);
        self
    }

    pub fn add_bulk(&mut self, bulk: u64) {
        self.bulk = self.bulk.saturating_add(bulk);
    }

    pub fn with_sack(mut self, sack: Option<Value>) -> Self {
        self.sack = sack;
        self
    }

    /// Child traverser positioned at `object`, sharing nothing with `self`.
    pub fn split(&self, object: Value) -> Self {
        Self {
            object,
            path: self.path.clone(),
            sack: self.sack.clone(),
            loops: self.loops,
            bulk: self.bulk,
        }
    }

    /// Child traverser for a branch, applying the configured sack split.
    pub fn branch(&self, split: SackSplit, initial: Option<&Value>) -> Self {
        let mut child = self.split(self.object.clone());
        if split == SackSplit::Reset {
            child.sack = initial.cloned();
        }
        child
    }

    /// Record the current object after a step moved the traverser.
    ///
    /// Unlabeled moves are only recorded when full path tracking is on.
    pub fn extend_path(&mut self, labels: &[String], track_path: bool) {
        if track_path || !labels.is_empty() {
            self.path.push(labels.to_vec(), self.object.clone());
        }
    }

    /// Bind `labels` to the current object without moving.
    pub fn add_labels(&mut self, labels: &[String], track_path: bool) {
        if labels.is_empty() {
            return;
        }
        if let Some(entry) = self.path.last_mut()
            && entry.object == self.object
            && (track_path || !entry.labels.is_empty())
        {
            for label in labels {
                if !entry.labels.contains(label) {
                    entry.labels.push(label.clone());
                }
            }
            return;
        }
        self.path.push(labels.to_vec(), self.object.clone());
    }

    pub fn sack_or_null(&self) -> Value {
        self.sack.clone().unwrap_or(Value::Null)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct TraverserKey {
    object: Value,
    path: Path,
    sack: Option<Value>,
    loops: u32,
}

/// Insertion-ordered multiset of traversers.
///
/// Equal traversers coalesce into one by summing bulk. With a sack merge
/// operator, sacks are excluded from equality and combined instead.
#[derive(Clone, Debug, Default)]
pub struct TraverserSet {
    entries: IndexMap<TraverserKey, Traverser>,
    merge: Option<Operator>,
}

impl TraverserSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_merge(merge: Option<Operator>) -> Self {
        Self {
            entries: IndexMap::new(),
            merge,
        }
    }

    pub fn merge_operator(&self) -> Option<Operator> {
        self.merge
    }

    pub fn add(&mut self, traverser: Traverser) -> Result<(), OperatorError> {
        let key = TraverserKey {
            object: traverser.object.clone(),
            path: traverser.path.clone(),
            sack: if self.merge.is_some() {
                None
            } else {
                traverser.sack.clone()
            },
            loops: traverser.loops,
        };
        match self.entries.get_mut(&key) {
            Some(existing) => {
                if let (Some(op), Some(incoming)) = (self.merge, traverser.sack.as_ref()) {
                    existing.sack = Some(match existing.sack.as_ref() {
                        Some(current) => op.apply(current, incoming)?,
                        None => incoming.clone(),
                    });
                }
                existing.add_bulk(traverser.bulk);
            }
            None => {
                self.entries.insert(key, traverser);
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of bulks across all traversers.
    pub fn total_bulk(&self) -> u64 {
        self.entries.values().fold(0, |n, t| n.saturating_add(t.bulk()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Traverser> {
        self.entries.values()
    }

    /// Stable sort of the traversers.
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&Traverser, &Traverser) -> std::cmp::Ordering,
    {
        self.entries.sort_by(|_, a, _, b| compare(a, b));
    }

    pub fn into_vec(self) -> Vec<Traverser> {
        self.entries.into_values().collect()
    }

    /// Fold `other` into `self`, coalescing as usual.
    pub fn absorb(&mut self, other: TraverserSet) -> Result<(), OperatorError> {
        for traverser in other.into_vec() {
            self.add(traverser)?;
        }
        Ok(())
    }
}

impl IntoIterator for TraverserSet {
    type Item = Traverser;
    type IntoIter = std::vec::IntoIter<Traverser>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().into_iter()
    }
}
