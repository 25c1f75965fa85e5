//! Line builder
//!
//! A [`DisplayLine`] is a run of molecules laid out left to right on one
//! screen row. Each placed character is a [`GlyphInstance`] carrying the
//! map from its pen position to highlight time, so a renderer can sweep the
//! color across an atom while it is being sung.

use serde::Serialize;

use super::display::Display;
use super::font::{FontId, FontSource, GlyphCache, Glyph};
use super::layout::LayoutError;
use crate::models::lyrics::Molecule;
use crate::models::style::{Palette, Style};
use crate::models::timing::TimingError;

/// `(step, length)` → `(start, end)` seconds of a run of steps in a compound
pub type AtomTimer<'a> = dyn Fn(usize, usize) -> Result<(f64, f64), TimingError> + 'a;

/// Where glyphs come from while building lines
pub struct Typesetter<'a> {
    pub cache: &'a mut GlyphCache,
    pub source: &'a dyn FontSource,
    pub display: Display,
}

impl<'a> Typesetter<'a> {
    fn glyph(&mut self, font: FontId, c: char) -> Result<Glyph, LayoutError> {
        Ok(self.cache.glyph(self.source, font, c)?)
    }

    fn kerning(&self, font: FontId, prev: char, cur: char) -> Result<(f64, f64), LayoutError> {
        Ok(self.cache.kerning(self.source, font, prev, cur)?)
    }

    /// (ascender, descender) of a font
    fn metrics(&self, font: FontId) -> Result<(f64, f64), LayoutError> {
        let font = self.cache.font(font).ok_or(LayoutError::MissingFont(font.0))?;
        Ok((font.ascender, font.descender))
    }
}

/// One placed character
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct GlyphInstance {
    pub glyph: Glyph,
    pub x: f64,
    pub y: f64,

    /// Pen x range of the atom (or particle) this glyph belongs to
    pub tx1: f64,
    pub tx2: f64,

    /// Time range over which that range is highlighted
    pub t1: f64,
    pub t2: f64,

    pub colors: Palette,
    pub colors_on: Palette,
}

impl GlyphInstance {
    pub fn new(glyph: Glyph, x: f64, y: f64, style: &Style) -> Self {
        Self {
            glyph,
            x,
            y,
            tx1: 0.0,
            tx2: 0.0,
            t1: 0.0,
            t2: 0.0,
            colors: style.colors,
            colors_on: style.colors_on,
        }
    }

    pub fn set_timing(&mut self, tx1: f64, tx2: f64, t1: f64, t2: f64) {
        self.tx1 = tx1;
        self.tx2 = tx2;
        self.t1 = t1;
        self.t2 = t2;
    }

    /// Highlight time at pen x
    pub fn time_at(&self, x: f64) -> f64 {
        if self.tx2 == self.tx1 {
            return self.t1;
        }
        let frac = (x - self.tx1) / (self.tx2 - self.tx1);
        self.t1 + frac * (self.t2 - self.t1)
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct DisplayLine {
    pub glyphs: Vec<GlyphInstance>,
    pub text: String,

    /// Pen position after the last glyph
    pub px: f64,
    pub py: f64,

    /// Placement on screen, set by the scheduler
    pub x: f64,
    pub y: f64,

    start_t: Option<f64>,
    end_t: Option<f64>,

    /// Visible interval (highlight span padded by the fade time)
    pub start: f64,
    pub end: f64,
    pub fade: f64,

    pub ascender: f64,
    pub descender: f64,

    pub want_row: Option<u8>,
    pub row: usize,
}

impl DisplayLine {
    pub fn new(fade: f64) -> Self {
        Self {
            glyphs: Vec::new(),
            text: String::new(),
            px: 0.0,
            py: 0.0,
            x: 0.0,
            y: 0.0,
            start_t: None,
            end_t: None,
            start: 0.0,
            end: 0.0,
            fade,
            ascender: 0.0,
            descender: 0.0,
            want_row: None,
            row: 0,
        }
    }

    /// A glyphless line highlighted over `start..end`, with no fade
    #[cfg(test)]
    pub(crate) fn spanning(start: f64, end: f64, width: f64) -> Self {
        let mut line = Self::new(0.0);
        line.extend_span(start, end);
        line.start = start;
        line.end = end;
        line.px = width;
        line.ascender = 0.08;
        line.descender = -0.02;
        line
    }

    pub fn width(&self) -> f64 {
        self.px
    }

    pub fn height(&self) -> f64 {
        self.ascender - self.descender
    }

    /// First and last highlight times of the line
    pub fn sung_span(&self) -> Option<(f64, f64)> {
        Some((self.start_t?, self.end_t?))
    }

    pub fn lim_start(&self) -> f64 {
        self.start_t.unwrap_or(0.0) - self.fade
    }

    pub fn lim_end(&self) -> f64 {
        self.end_t.unwrap_or(0.0) + self.fade
    }

    fn extend_span(&mut self, start: f64, end: f64) {
        self.start_t = Some(self.start_t.map_or(start, |s| s.min(start)));
        self.end_t = Some(self.end_t.map_or(end, |e| e.max(end)));
    }

    /// Append a molecule, joined to any previous one by its script's space
    pub fn add(
        &mut self,
        ts: &mut Typesetter<'_>,
        molecule: &Molecule,
        get_atom_time: &AtomTimer<'_>,
        style: &Style,
        font: FontId,
        ruby_font: Option<FontId>,
    ) -> Result<(), LayoutError> {
        if !self.glyphs.is_empty() {
            let space = molecule.space();
            let glyph = ts.glyph(font, space)?;
            self.px += glyph.dx;
            self.py += glyph.dy;
            self.text.push(space);
        }

        let (font_asc, font_desc) = ts.metrics(font)?;
        let ruby_metrics = match ruby_font {
            Some(id) => Some(ts.metrics(id)?),
            None => None,
        };
        let mut new_ascender = font_asc;
        if let Some((ruby_asc, ruby_desc)) = ruby_metrics {
            new_ascender += ruby_asc - ruby_desc;
        }
        self.ascender = self.ascender.max(new_ascender);
        self.descender = self.descender.min(font_desc);

        let mut prev_char: Option<char> = None;
        let mut step = 0;

        for atom in &molecule.atoms {
            let (mut atom_x, atom_y) = (self.px, self.py);
            let mut edge_px = None;
            let mut edge_l_px = None;
            let first_glyph = self.glyphs.len();

            for (i, c) in atom.text.chars().enumerate() {
                if atom.particle_edge == Some(i) {
                    edge_px = Some(self.px);
                }
                if atom.particle_edge_l == Some(i) {
                    edge_l_px = Some(self.px);
                }
                if let Some(prev) = prev_char {
                    let (kx, ky) = ts.kerning(font, prev, c)?;
                    self.px += kx;
                    self.py += ky;
                }
                let glyph = ts.glyph(font, c)?;
                self.glyphs.push(GlyphInstance::new(glyph, self.px, self.py, style));
                self.text.push(c);
                self.px += glyph.dx;
                self.py += glyph.dy;
                prev_char = Some(c);
            }

            // atom_x (left) maps to the atom start, the pen (right) to its end
            let (start, end) = get_atom_time(step, atom.steps())?;
            if first_glyph < self.glyphs.len() {
                self.extend_span(start, end);
            }
            let atom_end_x = self.px;
            for glyph in &mut self.glyphs[first_glyph..] {
                glyph.set_timing(atom_x, atom_end_x, start, end);
            }

            if let (Some(particles), Some(ruby_id), Some((_, ruby_desc))) =
                (&atom.particles, ruby_font, ruby_metrics)
            {
                let mut ruby_px = 0.0;
                let mut ruby_py = ts.display.round_coord(atom_y + font_asc - ruby_desc);
                let mut ruby_prev: Option<char> = None;
                let mut ruby_glyphs: Vec<GlyphInstance> = Vec::new();
                let mut par_step = step;

                for particle in particles {
                    let particle_x = ruby_px;
                    let first = ruby_glyphs.len();
                    for c in particle.text.chars() {
                        if let Some(prev) = ruby_prev {
                            let (kx, ky) = ts.kerning(ruby_id, prev, c)?;
                            ruby_px += kx;
                            ruby_py += ky;
                        }
                        let glyph = ts.glyph(ruby_id, c)?;
                        ruby_glyphs.push(GlyphInstance::new(glyph, ruby_px, ruby_py, style));
                        ruby_px += glyph.dx;
                        ruby_py += glyph.dy;
                        ruby_prev = Some(c);
                    }
                    let (start, end) = get_atom_time(par_step, particle.steps())?;
                    for glyph in &mut ruby_glyphs[first..] {
                        glyph.set_timing(particle_x, ruby_px, start, end);
                    }
                    par_step += particle.steps();
                }

                // Center the ruby over the atom, or over its edge-bounded part
                if let Some(left) = edge_l_px {
                    atom_x = left;
                }
                let atom_width = match edge_px {
                    Some(edge) => edge - atom_x,
                    None => self.px - atom_x,
                };
                let dx = ts.display.round_coord(atom_x + (atom_width - ruby_px) / 2.0);
                for mut glyph in ruby_glyphs {
                    glyph.tx1 += dx;
                    glyph.tx2 += dx;
                    glyph.x += dx;
                    self.glyphs.push(glyph);
                }
            }

            step += atom.steps();
        }

        self.start = self.lim_start();
        self.end = self.lim_end();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lyrics::Compound;
    use crate::models::timing::Beat;
    use crate::parse::Script;
    use crate::renderers::atlas::TextureAtlas;
    use crate::renderers::testing::Monospace;

    fn style() -> Style {
        let mut style = Style::default();
        style.size = 10.0;
        style.ruby_size = 5.0;
        style
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    struct Fixture {
        cache: GlyphCache,
        display: Display,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                cache: GlyphCache::new(TextureAtlas::new(256, 256, 3), 100.0),
                display: Display::new(100.0, 50.0),
            }
        }

        fn line(&mut self, sources: &[(Script, &str)], start_beat: i64) -> DisplayLine {
            let style = style();
            let mut line = DisplayLine::new(1.0);
            let font = self.cache.font_for(&Monospace, &style, false).unwrap().unwrap();
            let ruby = self.cache.font_for(&Monospace, &style, true).unwrap();
            let mut ts = Typesetter {
                cache: &mut self.cache,
                source: &Monospace,
                display: self.display,
            };
            for (script, text) in sources {
                let mut compound = Compound::new();
                let molecule = script.parse(text).unwrap();
                let ruby_font = if molecule.has_ruby() { ruby } else { None };
                compound.insert("T", molecule.clone());
                compound.start = Beat::from_integer(start_beat);
                let timer = |step: usize, len: usize| compound.get_atom_time(None, step, len);
                line.add(&mut ts, &molecule, &timer, &style, font, ruby_font).unwrap();
            }
            line
        }
    }

    #[test]
    fn test_atoms_share_a_timing_map() {
        let mut fx = Fixture::new();
        let line = fx.line(&[(Script::Latin, "canto")], 0);

        assert_eq!(line.text, "canto");
        assert!(approx(line.width(), 0.5));
        // "can" spans 0.0..0.3 over step 0, "to" 0.3..0.5 over step 1
        let c = &line.glyphs[0];
        assert!(approx(c.tx1, 0.0) && approx(c.tx2, 0.3));
        assert_eq!((c.t1, c.t2), (0.0, 1.0));
        let t = &line.glyphs[3];
        assert!(approx(t.tx1, 0.3) && approx(t.tx2, 0.5));
        assert_eq!((t.t1, t.t2), (1.0, 2.0));
        assert!(approx(c.time_at(0.15), 0.5));
    }

    #[test]
    fn test_span_is_padded_by_fade() {
        let mut fx = Fixture::new();
        let line = fx.line(&[(Script::Japanese, "さくら")], 4);
        assert_eq!(line.sung_span(), Some((4.0, 7.0)));
        assert_eq!(line.start, 3.0);
        assert_eq!(line.end, 8.0);
    }

    #[test]
    fn test_molecules_joined_by_space() {
        let mut fx = Fixture::new();
        let line = fx.line(&[(Script::English, "hi"), (Script::English, "there")], 0);
        assert_eq!(line.text, "hi there");
        assert!(approx(line.width(), 0.8));
        assert_eq!(line.glyphs.len(), 7);
        assert!(approx(line.glyphs[2].x, 0.3));
    }

    #[test]
    fn test_ruby_sits_above_and_centered() {
        let mut fx = Fixture::new();
        let line = fx.line(&[(Script::Japanese, "{漢字}(かん)")], 0);

        assert_eq!(line.text, "漢字");
        assert_eq!(line.glyphs.len(), 4);
        // Base ascender 0.08 plus the ruby line height 0.05
        assert!(approx(line.ascender, 0.13));
        assert!(approx(line.descender, -0.02));

        let ka = &line.glyphs[2];
        let n = &line.glyphs[3];
        // 0.1 of ruby over 0.2 of base: shifted right by 0.05
        assert!(approx(ka.x, 0.05));
        assert!(approx(n.x, 0.10));
        // ascender 0.08 minus ruby descender -0.01
        assert!(approx(ka.y, 0.09));
        assert_eq!((ka.t1, ka.t2), (0.0, 1.0));
        assert_eq!((n.t1, n.t2), (1.0, 2.0));
        assert!(approx(n.tx1, 0.10) && approx(n.tx2, 0.15));
    }

    #[test]
    fn test_ruby_centering_respects_edges() {
        let style = style();
        let mut fx = Fixture::new();
        let font = fx.cache.font_for(&Monospace, &style, false).unwrap().unwrap();
        let ruby = fx.cache.font_for(&Monospace, &style, true).unwrap();

        // "君、" with ruby over the first character only
        let mut molecule = Script::Japanese.parse("君(き)、").unwrap();
        assert_eq!(molecule.atoms[0].particle_edge, Some(1));
        let mut ts = Typesetter {
            cache: &mut fx.cache,
            source: &Monospace,
            display: fx.display,
        };
        let mut line = DisplayLine::new(0.0);
        let timer = |step: usize, len: usize| -> Result<(f64, f64), TimingError> {
            Ok((step as f64, (step + len) as f64))
        };
        line.add(&mut ts, &molecule, &timer, &style, font, ruby).unwrap();
        // Ruby 0.05 wide centered over the first 0.1
        assert!(approx(line.glyphs[2].x, 0.03));

        // Bounding on the left too moves the center right
        molecule.atoms[0].text = "一君".into();
        molecule.atoms[0].particle_edge = Some(2);
        molecule.atoms[0].particle_edge_l = Some(1);
        let mut line = DisplayLine::new(0.0);
        line.add(&mut ts, &molecule, &timer, &style, font, ruby).unwrap();
        assert!(approx(line.glyphs[2].x, 0.13));
    }

    #[test]
    fn test_copy_leaves_original_untouched() {
        let mut fx = Fixture::new();
        let line = fx.line(&[(Script::English, "hi")], 0);
        let copy = line.clone();
        assert_eq!(line, copy);
    }
}
