//! Renderers module for the karaoke engine
//!
//! This module turns a parsed song into screen geometry: glyphs packed into
//! a texture atlas, display lines scheduled into rows, and per-line vertex
//! buffers ready for the GPU.

pub mod atlas;
pub mod display;
pub mod display_line;
pub mod display_list;
pub mod font;
pub mod layout;
pub mod scheduler;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use atlas::{AtlasError, Region, TextureAtlas};
pub use display::Display;
pub use display_line::{DisplayLine, GlyphInstance};
pub use display_list::{RenderedLine, FLOATS_PER_VERTEX};
pub use font::{
    Coverage, FaceMetrics, FontError, FontKey, FontSource, Glyph, GlyphCache, GlyphError,
    RasterGlyph, Strokes,
};
pub use layout::{LayoutConfig, LayoutError, LineRenderer, SongLayout};
