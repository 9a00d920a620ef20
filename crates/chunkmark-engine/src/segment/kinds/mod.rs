//! Sub-renders for chunks that hold a single node.

pub mod code;
pub mod flow;
pub mod formula;
pub mod image;
pub mod table;
pub mod thematic;

/// Gap between the code header and the code body, and below the body.
pub const CODE_GAP: f32 = 8.0;
