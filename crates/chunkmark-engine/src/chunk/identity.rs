use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ChunkKind;

/// How a chunk's identity string is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityPolicy {
    /// `{kind}@{position of the first folded node}`: a chunk that starts at
    /// the same node with the same kind keeps its identity across passes.
    #[default]
    Structural,
    /// A fresh random token per chunk per pass; no chunk ever compares equal
    /// to one from an earlier pass.
    Random,
}

impl IdentityPolicy {
    pub fn identity(self, kind: ChunkKind, first_position: usize) -> String {
        match self {
            IdentityPolicy::Structural => format!("{}@{first_position}", kind.name()),
            IdentityPolicy::Random => Uuid::new_v4().simple().to_string(),
        }
    }
}
