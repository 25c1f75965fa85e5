//! Beat/time mapping for a song
//!
//! A song is timed in beats. The `[Timing]` section anchors beats to real
//! seconds in the audio track; anything between (or beyond) two anchors is
//! linear. Lyric durations are written as exact beat values (integers,
//! decimals, fractions or mixed fractions) so summing many short steps never
//! drifts.

use num_rational::Ratio;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// An exact beat position or duration
pub type Beat = Ratio<i64>;

/// Errors raised by beat/time queries
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimingError {
    /// Interpolation needs at least two anchors
    #[error("beat counter needs at least 2 anchors, got {0}")]
    TooFewAnchors(usize),

    /// The two anchors used for extrapolation share the same key
    #[error("anchors at {0} and {1} span nothing; cannot extrapolate")]
    DegenerateSpan(f64, f64),
}

// ============================================================================
// BeatCounter
// ============================================================================

/// Ordered (time, beat) anchors, built once from the `[Timing]` section
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct BeatCounter {
    anchors: Vec<(f64, f64)>,
}

impl BeatCounter {
    pub fn new() -> Self {
        Self { anchors: Vec::new() }
    }

    pub fn from_anchors<I>(anchors: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        Self {
            anchors: anchors.into_iter().collect(),
        }
    }

    /// Append an anchor. Anchors must arrive in increasing time order.
    pub fn add(&mut self, time: f64, beat: f64) {
        self.anchors.push((time, beat));
    }

    pub fn anchors(&self) -> &[(f64, f64)] {
        &self.anchors
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Seconds at which `beat` falls
    pub fn beat_to_time(&self, beat: f64) -> Result<f64, TimingError> {
        self.map(beat, |&(time, beat)| (beat, time))
    }

    /// Beat position at `time` seconds
    pub fn time_to_beat(&self, time: f64) -> Result<f64, TimingError> {
        self.map(time, |&(time, beat)| (time, beat))
    }

    /// Piecewise-linear lookup. `pick` turns an anchor into (key, value).
    ///
    /// The first anchor whose key exceeds the query is interpolated against
    /// its predecessor. Queries before the first anchor map to 0, queries past
    /// the last anchor extrapolate along the last two.
    fn map<F>(&self, query: f64, pick: F) -> Result<f64, TimingError>
    where
        F: Fn(&(f64, f64)) -> (f64, f64),
    {
        if self.anchors.len() < 2 {
            return Err(TimingError::TooFewAnchors(self.anchors.len()));
        }

        let mut prev: Option<(f64, f64)> = None;
        for anchor in &self.anchors {
            let (key, value) = pick(anchor);
            if key > query {
                return Ok(match prev {
                    None => 0.0,
                    Some((key1, value1)) => lerp(query, (key1, value1), (key, value)),
                });
            }
            prev = Some((key, value));
        }

        let n = self.anchors.len();
        let (key1, value1) = pick(&self.anchors[n - 2]);
        let (key2, value2) = pick(&self.anchors[n - 1]);
        if key1 == key2 {
            return Err(TimingError::DegenerateSpan(key1, key2));
        }
        Ok(lerp(query, (key1, value1), (key2, value2)))
    }
}

fn lerp(x: f64, (x1, y1): (f64, f64), (x2, y2): (f64, f64)) -> f64 {
    let frac = (x - x1) / (x2 - x1);
    y1 + frac * (y2 - y1)
}

// ============================================================================
// Beat values
// ============================================================================

static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(-?)(\d+)\.(\d*)$").unwrap());
static MIXED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(-?\d+)\+(\d+)/(\d+)$").unwrap());
static FRACTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(-?\d+)(?:/(\d+))?$").unwrap());

/// Parse a beat value: `3`, `1.25`, `3/4` or `1+1/2`
///
/// Returns `None` for anything else (including a zero denominator).
pub fn parse_beat(s: &str) -> Option<Beat> {
    let s = s.trim();

    if let Some(caps) = DECIMAL.captures(s) {
        let negative = !caps[1].is_empty();
        let frac_digits = &caps[3];
        let digits = format!("{}{}", &caps[2], frac_digits);
        let numer: i64 = digits.parse().ok()?;
        let denom = 10i64.checked_pow(frac_digits.len() as u32)?;
        let value = Ratio::new(numer, denom);
        return Some(if negative { -value } else { value });
    }

    if let Some(caps) = MIXED.captures(s) {
        let whole: i64 = caps[1].parse().ok()?;
        let numer: i64 = caps[2].parse().ok()?;
        let denom: i64 = caps[3].parse().ok()?;
        if denom == 0 {
            return None;
        }
        return Some(Ratio::new(numer + whole * denom, denom));
    }

    let caps = FRACTION.captures(s)?;
    let numer: i64 = caps[1].parse().ok()?;
    let denom: i64 = match caps.get(2) {
        Some(d) => d.as_str().parse().ok()?,
        None => 1,
    };
    if denom == 0 {
        return None;
    }
    Some(Ratio::new(numer, denom))
}

pub fn beat_to_f64(beat: Beat) -> f64 {
    *beat.numer() as f64 / *beat.denom() as f64
}

/// Displays a beat the way song scripts write it: `3`, `3/4`, `1+1/2`
pub struct MixedFraction(pub Beat);

impl fmt::Display for MixedFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0.to_integer();
        let part = self.0 - Ratio::from_integer(whole);
        if *part.numer() == 0 {
            write!(f, "{}", whole)
        } else if whole == 0 {
            write!(f, "{}/{}", part.numer(), part.denom())
        } else {
            write!(f, "{}+{}/{}", whole, part.numer(), part.denom())
        }
    }
}
