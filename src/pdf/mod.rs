//! PDF manipulation module

pub mod document;
pub mod fonts;
pub mod merge;
pub mod metadata;
pub mod overlay;
pub mod raster;
pub mod security;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used items
pub use document::{load, save, PageGeometry};
pub use fonts::{FontBook, FontWeight};
pub use merge::{apply_overlay, merge_documents, PageMerger};
pub use metadata::{extract_metadata, PdfMetadata};
pub use overlay::{compose, OverlayComposer, OverlayElement, Position};
pub use raster::PreparedImage;
