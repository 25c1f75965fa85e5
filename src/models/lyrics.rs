//! Lyric tree: Compound → Molecule → Atom → Particle
//!
//! A [`Compound`] is one timing slot of the song. It holds one [`Molecule`]
//! per tag (the same phrase in each script), every molecule splitting into
//! the same number of timed steps. Atoms are the smallest highlightable
//! units; particles are the ruby annotation over an atom.

use serde::{Deserialize, Serialize};

use super::timing::{beat_to_f64, Beat, BeatCounter, TimingError};
use crate::parse::scanner::ScanRules;
use crate::parse::Script;

/// One unit of ruby text
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Particle {
    pub text: String,
}

impl Particle {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn steps(&self) -> usize {
        1
    }
}

/// A syllable-like unit of base text, optionally carrying ruby particles
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Atom {
    pub text: String,

    /// Ruby text. `Some(vec![])` is an explicitly empty ruby group.
    pub particles: Option<Vec<Particle>>,

    /// Character index in `text` where the ruby group ends
    pub particle_edge: Option<usize>,

    /// Character index in `text` where the ruby group starts
    pub particle_edge_l: Option<usize>,
}

impl Atom {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            particles: None,
            particle_edge: None,
            particle_edge_l: None,
        }
    }

    pub fn steps(&self) -> usize {
        match &self.particles {
            None => 1,
            Some(particles) => particles.iter().map(Particle::steps).sum(),
        }
    }

    pub fn has_ruby(&self) -> bool {
        self.particles.as_ref().map_or(false, |p| !p.is_empty())
    }
}

/// One script's rendering of a lyric phrase
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Molecule {
    pub script: Script,

    /// The markup this molecule was parsed from
    pub source: String,

    pub atoms: Vec<Atom>,
    pub break_before: bool,
    pub break_after: bool,

    /// Requested display row (from a `$^N` prefix)
    pub row: Option<u8>,
}

impl Molecule {
    pub fn steps(&self) -> usize {
        self.atoms.iter().map(Atom::steps).sum()
    }

    /// Base text with markup removed
    pub fn text(&self) -> String {
        self.atoms.iter().map(|a| a.text.as_str()).collect()
    }

    pub fn has_ruby(&self) -> bool {
        self.atoms.iter().any(Atom::has_ruby)
    }

    /// The character used to join this molecule to the previous one on a line
    pub fn space(&self) -> char {
        self.script.space()
    }

    /// Serialize the atom list back to markup, one explicit `{...}` group per
    /// atom and particle. Parsing the result with the same script reproduces
    /// the same atoms.
    pub fn to_source(&self) -> String {
        let rules = self.script.scan_rules();
        let mut out = String::new();

        if self.break_before {
            out.push('$');
            if let Some(row) = self.row {
                out.push('^');
                out.push_str(&row.to_string());
            }
        }

        for atom in &self.atoms {
            let chars: Vec<char> = atom.text.chars().collect();
            let ruby = atom.particles.as_ref().filter(|_| rules.ruby);
            let split = match ruby {
                Some(_) => atom.particle_edge.unwrap_or(chars.len()).min(chars.len()),
                None => chars.len(),
            };
            let base: String = chars[..split].iter().collect();
            push_group(&mut out, &base, rules);

            if let Some(particles) = ruby {
                out.push('(');
                for particle in particles {
                    push_group(&mut out, &particle.text, rules);
                }
                out.push(')');
                // Text after the ruby edge was merged in as combining characters
                for &c in &chars[split..] {
                    if rules.is_special(c) {
                        out.push('\\');
                    }
                    out.push(c);
                }
            }
        }

        if self.break_after {
            out.push('$');
        }
        out
    }
}

fn push_group(out: &mut String, text: &str, rules: ScanRules) {
    out.push('{');
    for c in text.chars() {
        if rules.is_special(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('}');
}

// ============================================================================
// Compound
// ============================================================================

/// The parallel molecules of one timing slot, keyed by tag in script order
#[derive(Clone, Debug, PartialEq)]
pub struct Compound {
    pub molecules: Vec<(String, Molecule)>,

    /// First beat of the slot
    pub start: Beat,

    /// Beat duration of each step, or `None` for an untimed song
    pub timing: Option<Vec<Beat>>,
}

impl Compound {
    pub fn new() -> Self {
        Self {
            molecules: Vec::new(),
            start: Beat::from_integer(0),
            timing: None,
        }
    }

    pub fn insert(&mut self, tag: impl Into<String>, molecule: Molecule) {
        let tag = tag.into();
        match self.molecules.iter_mut().find(|(t, _)| *t == tag) {
            Some(entry) => entry.1 = molecule,
            None => self.molecules.push((tag, molecule)),
        }
    }

    pub fn get(&self, tag: &str) -> Option<&Molecule> {
        self.molecules.iter().find(|(t, _)| t == tag).map(|(_, m)| m)
    }

    pub fn is_empty(&self) -> bool {
        self.molecules.is_empty()
    }

    /// Step count, taken from the first molecule
    pub fn steps(&self) -> usize {
        self.molecules.first().map_or(0, |(_, m)| m.steps())
    }

    pub fn end(&self) -> Beat {
        match &self.timing {
            Some(timing) => self.start + timing.iter().copied().sum::<Beat>(),
            None => self.start + Beat::from_integer(self.steps() as i64),
        }
    }

    /// (start, end) of `length` steps beginning at `step`
    ///
    /// Timed compounds resolve beats through `counter`; without timing (or
    /// without a counter) one step counts as one unit from `start`.
    pub fn get_atom_time(
        &self,
        counter: Option<&BeatCounter>,
        step: usize,
        length: usize,
    ) -> Result<(f64, f64), TimingError> {
        match (&self.timing, counter) {
            (Some(timing), Some(counter)) => {
                let beat_at = |n: usize| -> Beat {
                    self.start + timing.iter().take(n).copied().sum::<Beat>()
                };
                let start = beat_at(step);
                let end = beat_at(step + length);
                Ok((
                    counter.beat_to_time(beat_to_f64(start))?,
                    counter.beat_to_time(beat_to_f64(end))?,
                ))
            }
            _ => {
                let start = beat_to_f64(self.start) + step as f64;
                Ok((start, start + length as f64))
            }
        }
    }
}

impl Default for Compound {
    fn default() -> Self {
        Self::new()
    }
}
