//! Script dispatch
//!
//! Each tag in a song names one of four scripts. The script decides how
//! plain text splits into atoms and which character joins molecules on a
//! display line.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ParseErrorKind;
use super::scanner::{scan, ScanRules};
use super::{japanese, latin, romaji};
use crate::models::lyrics::Molecule;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Script {
    Japanese,
    Romaji,
    Latin,
    English,
}

impl Script {
    pub const ALL: [Script; 4] = [Script::Japanese, Script::Romaji, Script::Latin, Script::English];

    pub fn name(&self) -> &'static str {
        match self {
            Script::Japanese => "Japanese",
            Script::Romaji => "Romaji",
            Script::Latin => "Latin",
            Script::English => "English",
        }
    }

    pub fn space(&self) -> char {
        match self {
            Script::Japanese => '\u{3000}',
            Script::Romaji | Script::Latin | Script::English => ' ',
        }
    }

    pub fn scan_rules(&self) -> ScanRules {
        match self {
            Script::Japanese => ScanRules {
                fullwidth: true,
                ruby: true,
            },
            Script::Romaji | Script::Latin | Script::English => ScanRules {
                fullwidth: false,
                ruby: false,
            },
        }
    }

    /// Parse lyric markup into a molecule
    pub fn parse(&self, source: &str) -> Result<Molecule, ParseErrorKind> {
        let (markers, tokens) = scan(source, self.scan_rules())?;
        let atoms = match self {
            Script::Japanese => japanese::segment(&tokens)?,
            Script::Romaji => romaji::segment(&tokens),
            Script::Latin => latin::segment(&tokens, &latin::LATIN),
            Script::English => latin::segment(&tokens, &latin::ENGLISH),
        };
        Ok(Molecule {
            script: *self,
            source: source.to_string(),
            atoms,
            break_before: markers.break_before,
            break_after: markers.break_after,
            row: markers.row,
        })
    }
}

impl FromStr for Script {
    type Err = ParseErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Script::ALL
            .iter()
            .copied()
            .find(|script| script.name() == s)
            .ok_or_else(|| ParseErrorKind::UnknownFormat(s.to_string()))
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
