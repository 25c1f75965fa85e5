//! Texture fonts over an external rasterizer
//!
//! The core never opens font files itself. A [`FontSource`] (FreeType on a
//! native host, a canvas-backed shim in the browser, a fixed-width stub in
//! tests) supplies face metrics, kerning and three coverage bitmaps per
//! glyph: plain fill, fill stroked by the border width, and fill stroked by
//! border + outline width. [`TextureFont`] turns those into one 3-channel
//! glyph (fill, border ring, outline ring), packs it into the shared
//! [`TextureAtlas`] and caches the result.
//!
//! Source metrics are in pixels. Everything stored on a [`Glyph`] is in
//! screen units, where the display width is 1.0.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::atlas::{AtlasError, TextureAtlas};
use crate::models::style::Style;

/// Pixels of empty space kept around each glyph in the atlas
const GUTTER: usize = 1;

/// Stroke widths in style files are relative to a 330 pixel wide display
const STROKE_REFERENCE_WIDTH: f64 = 330.0;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("font {font}: {message}")]
pub struct FontError {
    pub font: String,
    pub message: String,
}

impl FontError {
    pub fn new(font: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            font: font.into(),
            message: message.into(),
        }
    }
}

/// Which face to rasterize, at what size
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FontKey {
    /// Font file name as written in the style
    pub file: String,

    /// Point size from the style
    pub size: f64,

    /// Display width in pixels
    pub resolution: f64,
}

impl FontKey {
    /// Pixel size: points at a resolution of `display width / 4` dpi
    pub fn pixel_size(&self) -> f64 {
        self.size * self.resolution / 4.0 / 72.0
    }
}

/// Face-wide metrics in pixels (y up, descender negative)
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct FaceMetrics {
    pub ascender: f64,
    pub descender: f64,
    pub height: f64,
}

/// An 8-bit coverage bitmap placed relative to the pen
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Coverage {
    /// Pixels from the pen to the left edge
    pub left: i32,

    /// Pixels from the baseline up to the top edge
    pub top: i32,
    pub width: usize,
    pub height: usize,

    /// Row-major, top row first
    pub data: Vec<u8>,
}

impl Coverage {
    /// Reject bitmaps whose data does not fill their declared size
    fn check(&self, font: &FontKey, c: char, layer: &str) -> Result<(), FontError> {
        let expected = self.width * self.height;
        if self.data.len() != expected {
            return Err(FontError::new(
                font.file.clone(),
                format!(
                    "{} bitmap of {:?} has {} bytes, expected {}x{}",
                    layer,
                    c,
                    self.data.len(),
                    self.width,
                    self.height
                ),
            ));
        }
        Ok(())
    }
}

/// Raw glyph as produced by a [`FontSource`]
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RasterGlyph {
    /// Pen advance in pixels
    pub advance: (f64, f64),
    pub fill: Coverage,
    pub border: Coverage,
    pub outline: Coverage,
}

/// Stroke widths in pixels for the two outer layers
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Strokes {
    pub border: f64,
    pub outline: f64,
}

pub trait FontSource {
    fn face_metrics(&self, font: &FontKey) -> Result<FaceMetrics, FontError>;

    fn glyph(&self, font: &FontKey, c: char, strokes: Strokes) -> Result<RasterGlyph, FontError>;

    /// Pen adjustment between two characters, in pixels
    fn kerning(&self, font: &FontKey, prev: char, cur: char) -> Result<(f64, f64), FontError>;
}

/// A glyph packed into the atlas, in screen units
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Glyph {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bot: f64,
    pub width: f64,
    pub height: f64,
    pub dx: f64,
    pub dy: f64,

    pub tex_left: f64,
    pub tex_right: f64,
    pub tex_top: f64,
    pub tex_bot: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GlyphError {
    #[error(transparent)]
    Font(#[from] FontError),

    #[error(transparent)]
    Atlas(#[from] AtlasError),
}

// ============================================================================
// TextureFont
// ============================================================================

#[derive(Clone, Debug)]
pub struct TextureFont {
    pub key: FontKey,
    pub strokes: Strokes,
    pub ascender: f64,
    pub descender: f64,
    pub height: f64,
    pub linegap: f64,
    glyphs: HashMap<char, Glyph>,
}

impl TextureFont {
    pub fn new(source: &dyn FontSource, key: FontKey, strokes: Strokes) -> Result<Self, FontError> {
        let metrics = source.face_metrics(&key)?;
        let hres = key.resolution;
        let ascender = to_screen(metrics.ascender, hres);
        let descender = to_screen(metrics.descender, hres);
        let height = to_screen(metrics.height, hres);
        Ok(Self {
            key,
            strokes,
            ascender,
            descender,
            height,
            linegap: height - ascender + descender,
            glyphs: HashMap::new(),
        })
    }

    pub fn cached(&self, c: char) -> Option<&Glyph> {
        self.glyphs.get(&c)
    }

    /// Look up a glyph, rasterizing and packing it on first use
    pub fn get_glyph(
        &mut self,
        source: &dyn FontSource,
        atlas: &mut TextureAtlas,
        c: char,
    ) -> Result<Glyph, GlyphError> {
        if let Some(glyph) = self.glyphs.get(&c) {
            return Ok(*glyph);
        }

        let raster = source.glyph(&self.key, c, self.strokes)?;
        raster.fill.check(&self.key, c, "fill")?;
        raster.border.check(&self.key, c, "border")?;
        raster.outline.check(&self.key, c, "outline")?;
        let layers = Layers::compose(&raster);
        let hres = self.key.resolution;

        let padded_w = layers.width + 2 * GUTTER;
        let padded_h = layers.height + 2 * GUTTER;
        let outer = atlas.get_region(padded_w, padded_h).ok_or(AtlasError::Full {
            width: padded_w,
            height: padded_h,
        })?;
        let inner = super::atlas::Region::new(
            outer.x + GUTTER,
            outer.y + GUTTER,
            layers.width,
            layers.height,
        );
        atlas.set_region(inner, &layers.data)?;

        let atlas_w = atlas.width() as f64;
        let atlas_h = atlas.height() as f64;
        let top = layers.top as f64 / hres;
        let left = layers.left as f64 / hres;
        let width = layers.width as f64 / hres;
        let height = layers.height as f64 / hres;
        let tex_top = inner.y as f64 / atlas_h;
        let tex_left = inner.x as f64 / atlas_w;

        let glyph = Glyph {
            left,
            right: left + width,
            top,
            bot: top - height,
            width,
            height,
            dx: to_screen(raster.advance.0, hres),
            dy: to_screen(raster.advance.1, hres),
            tex_left,
            tex_right: tex_left + inner.width as f64 / atlas_w,
            tex_top,
            tex_bot: tex_top + inner.height as f64 / atlas_h,
        };
        self.glyphs.insert(c, glyph);
        Ok(glyph)
    }

    pub fn kerning(&self, source: &dyn FontSource, prev: char, cur: char) -> Result<(f64, f64), FontError> {
        let (kx, ky) = source.kerning(&self.key, prev, cur)?;
        let hres = self.key.resolution;
        Ok((to_screen(kx, hres), to_screen(ky, hres)))
    }
}

/// Whole pixels to screen units
fn to_screen(px: f64, hres: f64) -> f64 {
    px.round() / hres
}

/// The three coverage layers aligned on their common bounding box
struct Layers {
    left: i32,
    top: i32,
    width: usize,
    height: usize,
    /// Interleaved fill, border ring, outline ring
    data: Vec<u8>,
}

impl Layers {
    fn compose(raster: &RasterGlyph) -> Self {
        let bitmaps = [&raster.fill, &raster.border, &raster.outline];
        let top = bitmaps.iter().map(|b| b.top).max().unwrap_or(0);
        let left = bitmaps.iter().map(|b| b.left).min().unwrap_or(0);
        let bot = bitmaps
            .iter()
            .map(|b| b.top - b.height as i32)
            .min()
            .unwrap_or(0);
        let right = bitmaps
            .iter()
            .map(|b| b.left + b.width as i32)
            .max()
            .unwrap_or(0);
        let width = (right - left).max(0) as usize;
        let height = (top - bot).max(0) as usize;

        let [fill, border, outline] = bitmaps.map(|b| expand(b, left, top, width, height));

        let mut data = Vec::with_capacity(width * height * 3);
        for i in 0..width * height {
            let f = fill[i];
            let b = border[i].saturating_sub(f);
            let o = outline[i].saturating_sub(border[i]);
            data.extend_from_slice(&[f, b, o]);
        }

        Self {
            left,
            top,
            width,
            height,
            data,
        }
    }
}

/// Copy `bitmap` into a zeroed `width` x `height` canvas whose top-left is (left, top)
fn expand(bitmap: &Coverage, left: i32, top: i32, width: usize, height: usize) -> Vec<u8> {
    let mut out = vec![0u8; width * height];
    let dx = (bitmap.left - left).max(0) as usize;
    let dy = (top - bitmap.top).max(0) as usize;
    for row in 0..bitmap.height.min(height.saturating_sub(dy)) {
        let cols = bitmap.width.min(width.saturating_sub(dx));
        let src = row * bitmap.width;
        let dst = (row + dy) * width + dx;
        if let (Some(src), Some(dst)) = (
            bitmap.data.get(src..src + cols),
            out.get_mut(dst..dst + cols),
        ) {
            dst.copy_from_slice(src);
        }
    }
    out
}

// ============================================================================
// GlyphCache
// ============================================================================

/// Index of a font inside a [`GlyphCache`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FontId(pub usize);

/// All fonts of one layout, sharing one atlas
#[derive(Clone, Debug)]
pub struct GlyphCache {
    pub atlas: TextureAtlas,
    fonts: Vec<TextureFont>,
    ids: HashMap<String, FontId>,
    resolution: f64,
}

impl GlyphCache {
    pub fn new(atlas: TextureAtlas, resolution: f64) -> Self {
        Self {
            atlas,
            fonts: Vec::new(),
            ids: HashMap::new(),
            resolution,
        }
    }

    /// Base or ruby font for `style`; `None` when the size is 0
    pub fn font_for(
        &mut self,
        source: &dyn FontSource,
        style: &Style,
        ruby: bool,
    ) -> Result<Option<FontId>, FontError> {
        let (file, size) = if ruby {
            (&style.ruby_font, style.ruby_size)
        } else {
            (&style.font, style.size)
        };
        if size == 0.0 {
            return Ok(None);
        }

        let ident = format!(
            "{}|{}|{}|{}",
            file, size, style.border_width, style.outline_width
        );
        if let Some(id) = self.ids.get(&ident) {
            return Ok(Some(*id));
        }

        let key = FontKey {
            file: file.clone(),
            size,
            resolution: self.resolution,
        };
        let strokes = Strokes {
            border: style.border_width * self.resolution / STROKE_REFERENCE_WIDTH,
            outline: (style.border_width + style.outline_width) * self.resolution
                / STROKE_REFERENCE_WIDTH,
        };
        let font = TextureFont::new(source, key, strokes)?;
        log::debug!("Loaded font {} ({} px)", ident, font.key.pixel_size());

        let id = FontId(self.fonts.len());
        self.fonts.push(font);
        self.ids.insert(ident, id);
        Ok(Some(id))
    }

    pub fn font(&self, id: FontId) -> Option<&TextureFont> {
        self.fonts.get(id.0)
    }

    pub fn glyph(&mut self, source: &dyn FontSource, id: FontId, c: char) -> Result<Glyph, GlyphError> {
        let font = self
            .fonts
            .get_mut(id.0)
            .ok_or_else(|| FontError::new(format!("#{}", id.0), "unknown font id"))?;
        font.get_glyph(source, &mut self.atlas, c)
    }

    pub fn kerning(&self, source: &dyn FontSource, id: FontId, prev: char, cur: char) -> Result<(f64, f64), FontError> {
        let font = self
            .fonts
            .get(id.0)
            .ok_or_else(|| FontError::new(format!("#{}", id.0), "unknown font id"))?;
        font.kerning(source, prev, cur)
    }

    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }
}
