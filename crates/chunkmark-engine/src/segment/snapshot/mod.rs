//! # Snapshot Testing Support
//!
//! Helpers for asserting on segmentation output.
//!
//! - **`normalize`**: turns chunks into a stable, serializable [`Snap`] (no
//!   fingerprints, no random identities) plus a one-line-per-chunk summary
//!   for inline `insta` snapshots
//! - **`invariants`**: runtime checks every segmentation pass must satisfy
//!   (full ordered coverage, single-node isolation, soft cap, dense indices)

pub mod invariants;
pub mod normalize;

pub use invariants::check as invariants;
pub use normalize::{ChunkSnap, Snap, kinds, normalize, summary};
