//! Font source backed by JavaScript
//!
//! Rasterization stays on the JavaScript side (a canvas or a FreeType
//! build). The object passed in must provide:
//!
//! ```js
//! {
//!   faceMetrics(file, size, resolution) -> { ascender, descender, height },
//!   glyph(file, size, resolution, char, border, outline) -> {
//!     advance: [x, y],
//!     fill:    { left, top, width, height, data: [..] },
//!     border:  { ... },
//!     outline: { ... },
//!   },
//!   kerning(file, size, resolution, prev, cur) -> [x, y],
//! }
//! ```
//!
//! All values are in pixels at `size * resolution / 288` px per em. Coverage
//! data is one byte per pixel, row-major, top row first.

use wasm_bindgen::prelude::*;

use super::helpers::deserialize;
use crate::renderers::font::{FaceMetrics, FontError, FontKey, FontSource, RasterGlyph, Strokes};

#[wasm_bindgen]
extern "C" {
    pub type JsFontSource;

    #[wasm_bindgen(method, catch, js_name = faceMetrics)]
    fn face_metrics_js(this: &JsFontSource, file: &str, size: f64, resolution: f64) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = glyph)]
    fn glyph_js(
        this: &JsFontSource,
        file: &str,
        size: f64,
        resolution: f64,
        c: &str,
        border: f64,
        outline: f64,
    ) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = kerning)]
    fn kerning_js(
        this: &JsFontSource,
        file: &str,
        size: f64,
        resolution: f64,
        prev: &str,
        cur: &str,
    ) -> Result<JsValue, JsValue>;
}

fn font_error(font: &FontKey, err: JsValue) -> FontError {
    let message = err.as_string().unwrap_or_else(|| format!("{:?}", err));
    FontError::new(font.file.clone(), message)
}

impl FontSource for JsFontSource {
    fn face_metrics(&self, font: &FontKey) -> Result<FaceMetrics, FontError> {
        let value = self
            .face_metrics_js(&font.file, font.size, font.resolution)
            .map_err(|e| font_error(font, e))?;
        deserialize(value, "faceMetrics result").map_err(|e| font_error(font, e))
    }

    fn glyph(&self, font: &FontKey, c: char, strokes: Strokes) -> Result<RasterGlyph, FontError> {
        let mut buf = [0u8; 4];
        let value = self
            .glyph_js(
                &font.file,
                font.size,
                font.resolution,
                c.encode_utf8(&mut buf),
                strokes.border,
                strokes.outline,
            )
            .map_err(|e| font_error(font, e))?;
        deserialize(value, "glyph result").map_err(|e| font_error(font, e))
    }

    fn kerning(&self, font: &FontKey, prev: char, cur: char) -> Result<(f64, f64), FontError> {
        let (mut a, mut b) = ([0u8; 4], [0u8; 4]);
        let value = self
            .kerning_js(
                &font.file,
                font.size,
                font.resolution,
                prev.encode_utf8(&mut a),
                cur.encode_utf8(&mut b),
            )
            .map_err(|e| font_error(font, e))?;
        deserialize(value, "kerning result").map_err(|e| font_error(font, e))
    }
}
