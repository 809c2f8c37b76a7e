//! Per-vertex state declarations.

use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use trellis_compiler::{CompileError, CompileResult};

/// A per-vertex state slot a program declares up front.
///
/// Transient keys are scratch space and are erased when the run ends;
/// persistent keys are written back as vertex properties. Keys compare by
/// name only.
#[derive(Debug, Clone, Eq)]
pub struct VertexComputeKey {
    key: String,
    transient: bool,
}

impl VertexComputeKey {
    pub fn of(key: impl Into<String>, transient: bool) -> Self {
        Self {
            key: key.into(),
            transient,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_transient(&self) -> bool {
        self.transient
    }
}

impl PartialEq for VertexComputeKey {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Hash for VertexComputeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// The validated set of compute keys of one program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputeKeys {
    /// key -> transient
    keys: IndexMap<String, bool>,
}

impl ComputeKeys {
    /// Duplicates are folded; the same key declared both transient and
    /// persistent is a conflict.
    pub fn new(keys: impl IntoIterator<Item = VertexComputeKey>) -> CompileResult<Self> {
        let mut declared = IndexMap::new();
        for key in keys {
            match declared.get(&key.key) {
                Some(&transient) if transient != key.transient => {
                    return Err(CompileError::ConflictingComputeKey(key.key));
                }
                Some(_) => {}
                None => {
                    declared.insert(key.key, key.transient);
                }
            }
        }
        Ok(Self { keys: declared })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    pub fn is_transient(&self, key: &str) -> Option<bool> {
        self.keys.get(key).copied()
    }

    /// Keys written back to the graph when the run completes.
    pub fn persistent(&self) -> impl Iterator<Item = &str> {
        self.keys
            .iter()
            .filter(|(_, transient)| !**transient)
            .map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
