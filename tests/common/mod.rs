//! Shared fixtures for integration tests

#![allow(dead_code)]

use karaoke_wasm::renderers::{
    Coverage, FaceMetrics, FontError, FontKey, FontSource, RasterGlyph, Strokes,
};

/// Deterministic font: every character is one pixel wide on the atlas and
/// advances by the style size in pixels
pub struct Monospace;

fn dot() -> Coverage {
    Coverage {
        left: 0,
        top: 1,
        width: 1,
        height: 1,
        data: vec![255],
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
            fill: dot(),
            border: dot(),
            outline: dot(),
        })
    }

    fn kerning(&self, _font: &FontKey, _prev: char, _cur: char) -> Result<(f64, f64), FontError> {
        Ok((0.0, 0.0))
    }
}

/// Declares 2x2 fill bitmaps but only sends the first row
pub struct Truncated;

impl FontSource for Truncated {
    fn face_metrics(&self, font: &FontKey) -> Result<FaceMetrics, FontError> {
        Monospace.face_metrics(font)
    }

    fn glyph(&self, font: &FontKey, c: char, strokes: Strokes) -> Result<RasterGlyph, FontError> {
        let mut glyph = Monospace.glyph(font, c, strokes)?;
        glyph.fill = Coverage {
            left: 0,
            top: 2,
            width: 2,
            height: 2,
            data: vec![255, 255],
        };
        Ok(glyph)
    }

    fn kerning(&self, font: &FontKey, prev: char, cur: char) -> Result<(f64, f64), FontError> {
        Monospace.kerning(font, prev, cur)
    }
}

/// A font source whose files are all missing
pub struct Missing;

impl FontSource for Missing {
    fn face_metrics(&self, font: &FontKey) -> Result<FaceMetrics, FontError> {
        Err(FontError::new(font.file.clone(), "not found"))
    }

    fn glyph(&self, font: &FontKey, _c: char, _strokes: Strokes) -> Result<RasterGlyph, FontError> {
        Err(FontError::new(font.file.clone(), "not found"))
    }

    fn kerning(&self, _font: &FontKey, _prev: char, _cur: char) -> Result<(f64, f64), FontError> {
        Ok((0.0, 0.0))
    }
}

/// Styles and a two-edge variant shared by the layout tests; append a
/// `[Lyrics]` section
pub const HEADER: &str = "\
[Meta]
title=Sakura
title[en]=Cherry Blossoms
artist=Traditional

[Song]
audio=sakura.ogg

[Timing]
@0=0
@2=4

[Formats]
K=Japanese
E=English

[Styles]
{main}
font=Main.ttf
size=10
ruby_size=5
colors=ffffff,0000ff
colors_on=ff0000,ffffff,202020

[Variants]
{both}
name=Kanji + English
tags=K,E
style=main
default=1
E.edge=top

{english}
name=English only
tags=E
style=main
";
