pub mod code_fence;
pub mod formula;
pub mod image_tag;

pub use code_fence::CodeFenceBreak;
pub use formula::FormulaMarker;
pub use image_tag::ImageTag;
