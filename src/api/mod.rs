//! Karaoke WASM API
//!
//! This module provides the JavaScript-facing API for the karaoke engine.
//! It includes shared utilities for serialization, error handling and
//! logging, as well as the API functions themselves.
//!
//! # Module Structure
//!
//! - `helpers`: Shared utilities for serialization, error handling, and logging
//! - `fonts`: Font source implemented by a JavaScript object
//! - `core`: Song loading, layout building and per-frame queries

pub mod helpers;
pub mod fonts;
pub mod core;

// Re-export all public functions
pub use core::*;
pub use fonts::JsFontSource;
