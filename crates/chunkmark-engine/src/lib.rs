//! Turns a markdown document into an ordered list of render-ready chunks.
//!
//! `preprocess → parse → segment`, with formula rendering and caches shared
//! across passes, and a streaming session for documents that grow while
//! they are displayed.

pub mod cache;
pub mod chunk;
pub mod fingerprint;
pub mod formula;
pub mod parsing;
pub mod preprocess;
pub mod segment;
pub mod session;
pub mod style;

// Re-export key types for easier usage
pub use cache::{CacheConfig, RenderCache, clear_all_caches};
pub use chunk::{Chunk, ChunkDiff, ChunkKind, ChunkPayload, IdentityPolicy};
pub use fingerprint::fingerprint;
pub use formula::{FormulaError, FormulaRenderer, RenderMethod, RenderResult};
pub use parsing::{BlockNode, parse};
pub use preprocess::{Preprocessor, PreprocessorChain, preprocess};
pub use segment::{Segmenter, SegmenterConfig, segment};
pub use session::{ChunkUpdate, RenderPipeline, SessionError, StreamingSession};
pub use style::{Measurer, Size, StyleConfig, StyledText, Visitor};
