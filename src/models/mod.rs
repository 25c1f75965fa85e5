//! Models module for the karaoke engine
//!
//! This module contains the song data model: beat timing, the lyric tree,
//! styles and variants, and the song aggregate that ties them together.

pub mod lyrics;
pub mod song;
pub mod style;
pub mod timing;

// Re-export commonly used types
pub use lyrics::{Atom, Compound, Molecule, Particle};
pub use song::{MultiString, Song};
pub use style::{Color, Edge, Palette, Style, TagInfo, Variant};
pub use timing::{Beat, BeatCounter, TimingError};
