//! Screen geometry
//!
//! Layout coordinates are normalized to the display width: x runs from 0 to
//! 1 and y from 0 (bottom) to `height / width` (top).

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Display {
    /// Width in pixels
    pub width: f64,

    /// Height in pixels
    pub height: f64,
}

impl Display {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// y of the top edge
    pub fn top(&self) -> f64 {
        self.height / self.width
    }

    /// Snap a coordinate to the nearest physical pixel
    pub fn round_coord(&self, c: f64) -> f64 {
        (c * self.width).round() / self.width
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_and_rounding() {
        let display = Display::new(200.0, 100.0);
        assert_eq!(display.top(), 0.5);
        assert_eq!(display.round_coord(0.0126), 0.015);
        assert_eq!(display.round_coord(0.0124), 0.01);
    }
}
