//! Fixed-width font source for unit tests

use super::font::{Coverage, FaceMetrics, FontError, FontKey, FontSource, RasterGlyph, Strokes};

/// Every character advances by the font size in pixels; glyph bitmaps are 1 px
pub struct Monospace;

fn dot(value: u8) -> Coverage {
    Coverage {
        left: 0,
        top: 1,
        width: 1,
        height: 1,
        data: vec![value],
    }
}

impl FontSource for Monospace {
    fn face_metrics(&self, font: &FontKey) -> Result<FaceMetrics, FontError> {
        Ok(FaceMetrics {
            ascender: font.size * 0.8,
            descender: -font.size * 0.2,
            height: font.size * 1.2,
        })
    }

    fn glyph(&self, font: &FontKey, _c: char, _strokes: Strokes) -> Result<RasterGlyph, FontError> {
        Ok(RasterGlyph {
            advance: (font.size, 0.0),
            fill: dot(255),
            border: dot(255),
            outline: dot(255),
        })
    }

    fn kerning(&self, _font: &FontKey, _prev: char, _cur: char) -> Result<(f64, f64), FontError> {
        Ok((0.0, 0.0))
    }
}
