//! Song layout
//!
//! Builds every display line of one song variant: molecules are wrapped into
//! lines per screen edge, the lines of each edge are scheduled into rows, and
//! each line is turned into a vertex buffer ready for drawing. The result is
//! read-only; [`SongLayout::draw`] can be called every frame.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::atlas::{AtlasError, TextureAtlas};
use super::display::Display;
use super::display_line::{DisplayLine, Typesetter};
use super::display_list::RenderedLine;
use super::font::{FontError, FontSource, GlyphCache, GlyphError};
use super::scheduler;
use crate::models::lyrics::{Compound, Molecule};
use crate::models::song::Song;
use crate::models::style::{Edge, TagInfo, Variant};
use crate::models::timing::TimingError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("song cannot be laid out at the current font and atlas size: {0}")]
    Atlas(#[from] AtlasError),

    #[error(transparent)]
    Font(#[from] FontError),

    #[error(transparent)]
    Timing(#[from] TimingError),

    #[error("unknown variant: {0}")]
    UnknownVariant(String),

    #[error("no font with id {0}")]
    MissingFont(usize),

    #[error("no free row for line {text:?} ({start:.2}s to {end:.2}s)")]
    RowOverflow { text: String, start: f64, end: f64 },

    #[error("invalid layout config: {0}")]
    Config(String),
}

impl From<GlyphError> for LayoutError {
    fn from(err: GlyphError) -> Self {
        match err {
            GlyphError::Font(e) => LayoutError::Font(e),
            GlyphError::Atlas(e) => LayoutError::Atlas(e),
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Layout tunables, in display-width units and seconds
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    /// Gap between the lines and the screen edges
    pub margin: f64,

    /// Extra space between rows
    pub row_spacing: f64,

    /// Time a line is shown before its first and after its last syllable
    pub fade_time: f64,

    /// Glyph atlas side in pixels (snapped to a power of two)
    pub atlas_size: usize,

    /// Longest a line may appear ahead of its own fade-in
    pub max_pull_back: f64,

    /// Delay after the previous line when a line appears on a higher row
    pub cross_row_gap: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin: 0.07,
            row_spacing: 0.01,
            fade_time: 1.0,
            atlas_size: 2048,
            max_pull_back: 5.0,
            cross_row_gap: 1.5,
        }
    }
}

impl LayoutConfig {
    /// Widest a line may get before it wraps
    pub fn wrap_width(&self) -> f64 {
        1.0 - self.margin * 2.0
    }

    pub fn from_yaml(text: &str) -> Result<Self, LayoutError> {
        serde_yaml::from_str(text).map_err(|e| LayoutError::Config(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self, LayoutError> {
        serde_json::from_str(text).map_err(|e| LayoutError::Config(e.to_string()))
    }
}

// ============================================================================
// SongLayout
// ============================================================================

/// Receives the lines to draw for one frame
pub trait LineRenderer {
    fn draw_line(&mut self, line: &RenderedLine);
}

pub struct SongLayout {
    display: Display,
    config: LayoutConfig,
    cache: GlyphCache,
    bottom: Vec<DisplayLine>,
    top: Vec<DisplayLine>,
    rendered: Vec<RenderedLine>,
}

impl SongLayout {
    /// Lay out `variant` of `song`
    ///
    /// Any failure aborts the whole build; no partial layout is returned.
    pub fn build(
        song: &Song,
        variant: &str,
        source: &dyn FontSource,
        display: Display,
        config: LayoutConfig,
    ) -> Result<Self, LayoutError> {
        let variant = song
            .variant(variant)
            .ok_or_else(|| LayoutError::UnknownVariant(variant.to_string()))?;

        let atlas = TextureAtlas::new(config.atlas_size, config.atlas_size, 3);
        let mut cache = GlyphCache::new(atlas, display.width);

        let (mut bottom, mut top) = {
            let mut ts = Typesetter {
                cache: &mut cache,
                source,
                display,
            };
            (
                merge_lines(song, variant, Edge::Bottom, &mut ts, &config)?,
                merge_lines(song, variant, Edge::Top, &mut ts, &config)?,
            )
        };

        scheduler::schedule(&mut bottom, Edge::Bottom, &config, &display)?;
        scheduler::schedule(&mut top, Edge::Top, &config, &display)?;

        let rendered = bottom
            .iter()
            .map(|line| RenderedLine::build(line, Edge::Bottom, &display))
            .chain(top.iter().map(|line| RenderedLine::build(line, Edge::Top, &display)))
            .collect();

        log::info!(
            "Laid out variant {:?}: {} bottom and {} top lines, {} fonts, atlas {}/{} px used",
            variant.name,
            bottom.len(),
            top.len(),
            cache.font_count(),
            cache.atlas.used(),
            cache.atlas.width() * cache.atlas.height()
        );

        Ok(Self {
            display,
            config,
            cache,
            bottom,
            top,
            rendered,
        })
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Display lines of one edge, sorted by start time
    pub fn lines(&self, edge: Edge) -> &[DisplayLine] {
        match edge {
            Edge::Bottom => &self.bottom,
            Edge::Top => &self.top,
        }
    }

    /// Every rendered line, bottom edge first
    pub fn rendered(&self) -> &[RenderedLine] {
        &self.rendered
    }

    pub fn visible_lines(&self, t: f64) -> impl Iterator<Item = &RenderedLine> + '_ {
        self.rendered.iter().filter(move |line| line.is_visible(t))
    }

    /// Hand every line visible at `t` to `renderer`; returns how many
    pub fn draw(&self, t: f64, renderer: &mut dyn LineRenderer) -> usize {
        let mut count = 0;
        for line in self.visible_lines(t) {
            renderer.draw_line(line);
            count += 1;
        }
        count
    }

    /// Time at which the last line disappears
    pub fn end_time(&self) -> f64 {
        self.rendered.iter().map(|l| l.end).fold(0.0, f64::max)
    }

    pub fn atlas(&self) -> &TextureAtlas {
        &self.cache.atlas
    }

    pub fn atlas_mut(&mut self) -> &mut TextureAtlas {
        &mut self.cache.atlas
    }
}

/// Wrap the molecules shown on `edge` into display lines
fn merge_lines(
    song: &Song,
    variant: &Variant,
    edge: Edge,
    ts: &mut Typesetter<'_>,
    config: &LayoutConfig,
) -> Result<Vec<DisplayLine>, LayoutError> {
    let molecules: Vec<(&Compound, &TagInfo, &Molecule)> = song
        .compounds
        .iter()
        .flat_map(|compound| {
            compound.molecules.iter().filter_map(move |(tag, molecule)| {
                variant
                    .tag_info(tag)
                    .filter(|info| info.edge == edge)
                    .map(|info| (compound, info, molecule))
            })
        })
        .collect();

    let wrap_width = config.wrap_width();
    let mut lines: Vec<DisplayLine> = Vec::new();
    let mut open = false;

    for (compound, info, molecule) in molecules {
        let style = &info.style;
        let Some(font) = ts.cache.font_for(ts.source, style, false)? else {
            log::warn!("Style with font size 0; skipping {:?}", molecule.text());
            continue;
        };
        let ruby_font = if molecule.has_ruby() {
            ts.cache.font_for(ts.source, style, true)?
        } else {
            None
        };
        let timer = |step: usize, len: usize| compound.get_atom_time(song.timing.as_ref(), step, len);

        let current = if open { lines.last_mut() } else { None };
        match current {
            Some(line) if !molecule.break_before => {
                let mut wider = line.clone();
                wider.add(ts, molecule, &timer, style, font, ruby_font)?;
                if wider.px > wrap_width {
                    let mut fresh = DisplayLine::new(config.fade_time);
                    fresh.add(ts, molecule, &timer, style, font, ruby_font)?;
                    log::debug!("Wrapped before {:?}", molecule.text());
                    lines.push(fresh);
                } else {
                    *line = wider;
                }
            }
            _ => {
                let mut fresh = DisplayLine::new(config.fade_time);
                fresh.add(ts, molecule, &timer, style, font, ruby_font)?;
                fresh.want_row = molecule.row;
                lines.push(fresh);
                open = true;
            }
        }

        if molecule.break_after {
            open = false;
        }
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderers::testing::Monospace;

    const SONG: &str = "\
[Formats]
J=Japanese
E=English

[Styles]
{main}
font=Main.ttf
size=10
ruby_size=5
colors=ffffff,0000ff
colors_on=ff0000,ffffff

[Variants]
{both}
name=Both
tags=J,E
style=main
J.edge=bottom
E.edge=top

[Lyrics]
J: {漢字}(かん)$
E: hello
@: 0 1 1

J: さくら
E: one two three
@: 4 1 1 1
";

    fn build(text: &str, config: LayoutConfig) -> Result<SongLayout, LayoutError> {
        let song = Song::parse(text).unwrap();
        SongLayout::build(&song, "both", &Monospace, Display::new(100.0, 50.0), config)
    }

    #[test]
    fn test_config_defaults_fill_missing_keys() {
        let config = LayoutConfig::from_yaml("margin: 0.1\nfade_time: 0.5\n").unwrap();
        assert_eq!(config.margin, 0.1);
        assert_eq!(config.fade_time, 0.5);
        assert_eq!(config.atlas_size, 2048);
        assert!((config.wrap_width() - 0.8).abs() < 1e-12);

        let config = LayoutConfig::from_json(r#"{"row_spacing": 0.02}"#).unwrap();
        assert_eq!(config.row_spacing, 0.02);
        assert_eq!(config.margin, 0.07);

        assert!(matches!(LayoutConfig::from_yaml("margin: [1"), Err(LayoutError::Config(_))));
    }

    #[test]
    fn test_edges_are_split() {
        let layout = build(SONG, LayoutConfig::default()).unwrap();
        let bottom = layout.lines(Edge::Bottom);
        let top = layout.lines(Edge::Top);
        assert_eq!(bottom.len(), 2);
        assert_eq!(top.len(), 2);
        assert_eq!(bottom[0].text, "漢字");
        assert_eq!(bottom[1].text, "さくら");
        // Too wide to join "hello", so it wraps
        assert_eq!(top[1].text, "one two three");
        assert_eq!(layout.rendered().len(), 4);
    }

    #[test]
    fn test_molecules_wrap_at_width() {
        let text = "\
[Formats]
E=English

[Styles]
{main}
size=10

[Variants]
{v}
name=V
tags=E
style=main

[Lyrics]
E: one

E: two

E: a
";
        let song = Song::parse(text).unwrap();
        let display = Display::new(100.0, 50.0);

        // 0.86 fits "one two" (0.7) but not "one two a" (0.9)
        let layout = SongLayout::build(&song, "v", &Monospace, display, LayoutConfig::default()).unwrap();
        let texts: Vec<&str> = layout.lines(Edge::Bottom).iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["one two", "a"]);

        let wide = LayoutConfig {
            margin: 0.0,
            ..LayoutConfig::default()
        };
        let layout = SongLayout::build(&song, "v", &Monospace, display, wide).unwrap();
        let texts: Vec<&str> = layout.lines(Edge::Bottom).iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["one two a"]);
    }

    #[test]
    fn test_unknown_variant() {
        let song = Song::parse(SONG).unwrap();
        let result = SongLayout::build(&song, "nope", &Monospace, Display::default(), LayoutConfig::default());
        assert!(matches!(result, Err(LayoutError::UnknownVariant(v)) if v == "nope"));
    }

    #[test]
    fn test_tiny_atlas_fails_whole_build() {
        let config = LayoutConfig {
            atlas_size: 2,
            ..LayoutConfig::default()
        };
        assert!(matches!(build(SONG, config), Err(LayoutError::Atlas(_))));
    }

    #[test]
    fn test_draw_filters_by_time() {
        struct Collect(Vec<String>);
        impl LineRenderer for Collect {
            fn draw_line(&mut self, line: &RenderedLine) {
                self.0.push(line.text.clone());
            }
        }

        let layout = build(SONG, LayoutConfig::default()).unwrap();
        let mut collect = Collect(Vec::new());
        assert_eq!(layout.draw(-5.0, &mut collect), 0);
        assert_eq!(layout.draw(0.5, &mut collect), 2);
        assert!(collect.0.contains(&"hello".to_string()));
        // The first lines fade out as the second ones fade in
        assert_eq!(layout.draw(3.0, &mut collect), 4);
        assert_eq!(layout.visible_lines(layout.end_time() + 1.0).count(), 0);
    }
}
