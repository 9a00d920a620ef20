use std::collections::{HashMap, HashSet};

use super::Chunk;

/// What changed between two chunk lists of the same document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkDiff {
    /// Indices into the new list whose chunk equals one in the old list
    pub reused: Vec<usize>,
    /// Indices into the new list that need rendering
    pub changed: Vec<usize>,
    /// Identities present in the old list only
    pub removed: Vec<String>,
}

impl ChunkDiff {
    pub fn between(old: &[Chunk], new: &[Chunk]) -> Self {
        let previous: HashMap<&str, &Chunk> = old.iter().map(|c| (c.identity(), c)).collect();
        let current: HashSet<&str> = new.iter().map(Chunk::identity).collect();

        let (reused, changed) = new
            .iter()
            .partition::<Vec<_>, _>(|c| previous.get(c.identity()).is_some_and(|p| *p == *c));

        Self {
            reused: reused.into_iter().map(Chunk::index).collect(),
            changed: changed.into_iter().map(Chunk::index).collect(),
            removed: old
                .iter()
                .map(Chunk::identity)
                .filter(|id| !current.contains(id))
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn is_unchanged(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }
}
