//! WASM API for song loading and layout
//!
//! The module keeps one session: the last parsed song and, once built, its
//! layout. JavaScript parses a script, builds a layout for one variant with
//! its own font backend, then polls visible lines and atlas pixels every
//! frame.

use std::sync::{Mutex, MutexGuard};

use js_sys::Uint8Array;
use lazy_static::lazy_static;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use super::fonts::JsFontSource;
use super::helpers::{deserialize_or_default, js_error, serialize};
use crate::models::{Edge, Song};
use crate::parse::SongOptions;
use crate::renderers::{Display, LayoutConfig, SongLayout};
use crate::{wasm_info, wasm_log, wasm_warn};

#[derive(Default)]
struct Session {
    song: Option<Song>,
    layout: Option<SongLayout>,
}

// WASM-owned song storage
lazy_static! {
    static ref SESSION: Mutex<Session> = Mutex::new(Session::default());
}

fn session() -> Result<MutexGuard<'static, Session>, JsValue> {
    SESSION
        .lock()
        .map_err(|_| js_error("Session", "lock poisoned by an earlier panic"))
}

fn with_song<T>(f: impl FnOnce(&Song) -> Result<T, JsValue>) -> Result<T, JsValue> {
    let guard = session()?;
    let song = guard
        .song
        .as_ref()
        .ok_or_else(|| js_error("Session", "no song loaded"))?;
    f(song)
}

fn with_layout<T>(f: impl FnOnce(&mut SongLayout) -> Result<T, JsValue>) -> Result<T, JsValue> {
    let mut guard = session()?;
    let layout = guard
        .layout
        .as_mut()
        .ok_or_else(|| js_error("Session", "no layout built"))?;
    f(layout)
}

// ============================================================================
// Result structures
// ============================================================================

#[derive(Serialize, Clone, Debug)]
struct VariantSummary {
    key: String,
    name: String,
    default: bool,
    tags: Vec<String>,
}

#[derive(Serialize, Clone, Debug)]
struct SongSummary {
    title: Option<String>,
    artist: Option<String>,
    compounds: usize,
    tags: Vec<String>,
    variants: Vec<VariantSummary>,
    default_variant: Option<String>,
    timed: bool,
}

impl SongSummary {
    fn new(song: &Song) -> Self {
        Self {
            title: song.meta("title", &[]).map(str::to_string),
            artist: song.meta("artist", &[]).map(str::to_string),
            compounds: song.compounds.len(),
            tags: song.formats.iter().map(|(tag, _)| tag.clone()).collect(),
            variants: song
                .variants
                .iter()
                .map(|(key, v)| VariantSummary {
                    key: key.clone(),
                    name: v.name.clone(),
                    default: v.default,
                    tags: v.tag_list.clone(),
                })
                .collect(),
            default_variant: song
                .variants
                .iter()
                .find(|(_, v)| v.default)
                .or_else(|| song.variants.first())
                .map(|(key, _)| key.clone()),
            timed: song.timing.is_some(),
        }
    }
}

#[derive(Serialize, Clone, Debug)]
struct LayoutSummary {
    bottom_lines: usize,
    top_lines: usize,
    end_time: f64,
    atlas: AtlasInfo,
}

#[derive(Serialize, Clone, Debug)]
struct AtlasInfo {
    width: usize,
    height: usize,
    depth: usize,
    used: usize,
    dirty: bool,
}

impl AtlasInfo {
    fn new(layout: &SongLayout) -> Self {
        let atlas = layout.atlas();
        Self {
            width: atlas.width(),
            height: atlas.height(),
            depth: atlas.depth(),
            used: atlas.used(),
            dirty: atlas.is_dirty(),
        }
    }
}

// ============================================================================
// Song
// ============================================================================

/// Parse a song script and make it the current song
///
/// # Parameters
/// - `text`: the script source
/// - `options_js`: optional `{ ignore_steps }`
///
/// # Returns
/// A summary: title, artist, tags, variants and whether the song is timed
#[wasm_bindgen(js_name = parseSong)]
pub fn parse_song(text: &str, options_js: JsValue) -> Result<JsValue, JsValue> {
    let options: SongOptions = deserialize_or_default(options_js, "Song options")?;
    wasm_info!("parseSong called: {} bytes, ignore_steps={}", text.len(), options.ignore_steps);

    let song = Song::parse_with_options(text, &options).map_err(|e| js_error("Parse error", e))?;
    let summary = SongSummary::new(&song);
    wasm_log!("  {} compounds, {} variants", summary.compounds, summary.variants.len());

    let mut guard = session()?;
    guard.song = Some(song);
    guard.layout = None;
    serialize(&summary, "Song summary")
}

/// Meta value for `key`, preferring the given languages
#[wasm_bindgen(js_name = songMeta)]
pub fn song_meta(key: &str, langs: Vec<String>) -> Result<Option<String>, JsValue> {
    let langs: Vec<&str> = langs.iter().map(String::as_str).collect();
    with_song(|song| Ok(song.meta(key, &langs).map(str::to_string)))
}

/// Short bottom-edge text of a variant for song lists
#[wasm_bindgen(js_name = lyricSnippet)]
pub fn lyric_snippet(variant: &str, length: usize) -> Result<Option<String>, JsValue> {
    with_song(|song| Ok(song.lyric_snippet(variant, length)))
}

/// Serialize the current song back to script text
#[wasm_bindgen(js_name = dumpSong)]
pub fn dump_song() -> Result<String, JsValue> {
    with_song(|song| Ok(song.dump()))
}

#[wasm_bindgen(js_name = beatToTime)]
pub fn beat_to_time(beat: f64) -> Result<f64, JsValue> {
    with_song(|song| {
        let timing = song
            .timing
            .as_ref()
            .ok_or_else(|| js_error("Timing", "song has no timing"))?;
        timing.beat_to_time(beat).map_err(|e| js_error("beatToTime", e))
    })
}

#[wasm_bindgen(js_name = timeToBeat)]
pub fn time_to_beat(time: f64) -> Result<f64, JsValue> {
    with_song(|song| {
        let timing = song
            .timing
            .as_ref()
            .ok_or_else(|| js_error("Timing", "song has no timing"))?;
        timing.time_to_beat(time).map_err(|e| js_error("timeToBeat", e))
    })
}

// ============================================================================
// Layout
// ============================================================================

/// Build the layout of one variant of the current song
///
/// # Parameters
/// - `variant`: variant key; empty for the song's default variant
/// - `fonts`: the JavaScript font backend (see `api::fonts`)
/// - `display_js`: optional `{ width, height }` in pixels
/// - `config_js`: optional layout config; missing keys take defaults
#[wasm_bindgen(js_name = layoutSong)]
pub fn layout_song(
    variant: &str,
    fonts: &JsFontSource,
    display_js: JsValue,
    config_js: JsValue,
) -> Result<JsValue, JsValue> {
    let display: Display = deserialize_or_default(display_js, "Display")?;
    let config: LayoutConfig = deserialize_or_default(config_js, "Layout config")?;
    wasm_info!(
        "layoutSong called: variant={:?}, display={}x{}",
        variant,
        display.width,
        display.height
    );

    let mut guard = session()?;
    let song = guard
        .song
        .as_ref()
        .ok_or_else(|| js_error("Session", "no song loaded"))?;

    let key = if variant.is_empty() {
        SongSummary::new(song)
            .default_variant
            .ok_or_else(|| js_error("Layout error", "song has no variants"))?
    } else {
        variant.to_string()
    };

    let layout =
        SongLayout::build(song, &key, fonts, display, config).map_err(|e| js_error("Layout error", e))?;

    let summary = LayoutSummary {
        bottom_lines: layout.lines(Edge::Bottom).len(),
        top_lines: layout.lines(Edge::Top).len(),
        end_time: layout.end_time(),
        atlas: AtlasInfo::new(&layout),
    };
    wasm_log!(
        "  {} bottom, {} top lines, atlas {} px used",
        summary.bottom_lines,
        summary.top_lines,
        summary.atlas.used
    );

    guard.layout = Some(layout);
    serialize(&summary, "Layout summary")
}

/// Parse a layout config from YAML text
#[wasm_bindgen(js_name = layoutConfigFromYaml)]
pub fn layout_config_from_yaml(text: &str) -> Result<JsValue, JsValue> {
    let config = LayoutConfig::from_yaml(text).map_err(|e| js_error("Config error", e))?;
    serialize(&config, "Layout config")
}

/// Lines to draw at time `t`, with their vertex and index buffers
#[wasm_bindgen(js_name = visibleLines)]
pub fn visible_lines(t: f64) -> Result<JsValue, JsValue> {
    with_layout(|layout| {
        let lines: Vec<_> = layout.visible_lines(t).collect();
        serialize(&lines, "Visible lines")
    })
}

/// Display lines of one edge (1 = bottom, 2 = top), for debugging
#[wasm_bindgen(js_name = layoutLines)]
pub fn layout_lines(edge: u8) -> Result<JsValue, JsValue> {
    let edge = match edge {
        1 => Edge::Bottom,
        2 => Edge::Top,
        other => {
            wasm_warn!("layoutLines: invalid edge {}", other);
            return Err(JsValue::from_str("Invalid edge"));
        }
    };
    with_layout(|layout| serialize(&layout.lines(edge), "Layout lines"))
}

#[wasm_bindgen(js_name = atlasInfo)]
pub fn atlas_info() -> Result<JsValue, JsValue> {
    with_layout(|layout| serialize(&AtlasInfo::new(layout), "Atlas info"))
}

/// Atlas pixels (RGB) if they changed since the last call
#[wasm_bindgen(js_name = takeAtlasPixels)]
pub fn take_atlas_pixels() -> Result<Option<Uint8Array>, JsValue> {
    with_layout(|layout| Ok(layout.atlas_mut().take_upload().map(Uint8Array::from)))
}
