//! Karaoke Lyric Layout WASM Module
//!
//! This is the main WASM module for the karaoke player. It reads song
//! scripts, segments lyrics into timed syllables, schedules display lines
//! into screen rows and packs glyphs into a texture atlas; the JavaScript
//! side only draws what it is handed.

pub mod models;
pub mod parse;
pub mod renderers;
pub mod api;

// Re-export commonly used types
pub use models::*;
pub use parse::{ParseError, ParseErrorKind, Script, SongOptions};
pub use renderers::{Display, LayoutConfig, LayoutError, SongLayout};

use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    #[cfg(feature = "console_log")]
    if console_log::init_with_level(log::Level::Debug).is_err() {
        wasm_warn!("Logger was already initialized");
    }

    log::info!("Karaoke WASM module initialized");
}
