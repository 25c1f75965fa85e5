//! Parsing module for song scripts
//!
//! This module turns lyric markup into atoms (one segmenter per script) and
//! reads whole song scripts into a [`crate::models::song::Song`].

pub mod error;
pub mod scanner;
pub mod script;
pub mod song_file;

mod japanese;
mod latin;
mod romaji;

// Re-export commonly used types
pub use error::{ParseError, ParseErrorKind};
pub use script::Script;
pub use song_file::SongOptions;
