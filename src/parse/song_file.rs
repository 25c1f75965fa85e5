//! Song script reader
//!
//! A song script is a UTF-8 text file split into `[Section]` blocks:
//!
//! ```text
//! [Meta]
//! title=さくら
//! title[en]=Cherry Blossoms
//!
//! [Song]
//! audio=sakura.ogg
//!
//! [Timing]
//! @0.5=0
//! @2.5=4
//!
//! [Formats]
//! K=Japanese
//! R=Romaji
//!
//! [Styles]
//! {main}
//! font=TakaoPGothic.ttf
//! size=16
//!
//! [Variants]
//! {both}
//! name=Kanji + Romaji
//! tags=K,R
//! style=main
//! R.edge=top
//!
//! [Lyrics]
//! K: さ{く}ら
//! R: sakura
//! @: 0 1 1 2
//! ```
//!
//! Lines starting with `#` are comments. In `[Lyrics]`, blank lines separate
//! compounds; each compound has one `tag: text` line per tag and an optional
//! `@: start d0 d1 ...` timing line with one duration per step.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{ParseError, ParseErrorKind};
use super::Script;
use crate::models::lyrics::Compound;
use crate::models::song::{MultiString, Song};
use crate::models::style::{Style, Variant};
use crate::models::timing::{beat_to_f64, parse_beat, Beat, BeatCounter};

/// Reader options
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct SongOptions {
    /// Drop `@:` timing lines, leaving every compound untimed
    pub ignore_steps: bool,
}

/// A script line with its 1-based line number
type Line<'a> = (usize, &'a str);

type Result<T> = std::result::Result<T, ParseError>;

impl Song {
    /// Parse a song script
    pub fn parse(text: &str) -> Result<Song> {
        Song::parse_with_options(text, &SongOptions::default())
    }

    pub fn parse_with_options(text: &str, options: &SongOptions) -> Result<Song> {
        let mut reader = Reader {
            song: Song::new(),
            options,
            fake_time: 0,
        };

        let mut section: Option<(usize, &str)> = None;
        let mut lines: Vec<Line> = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let lineno = index + 1;
            let line = raw.trim_end_matches('\r');
            if line.starts_with('#') {
                continue;
            }

            let header = line
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'));

            match (section, header) {
                (None, _) if line.is_empty() => continue,
                (None, None) => {
                    return Err(ParseError::at(lineno, ParseErrorKind::ExpectedSection))
                }
                (_, Some(name)) => {
                    if let Some((start, current)) = section {
                        reader.section(current, start, &lines)?;
                        lines.clear();
                    }
                    section = Some((lineno, name));
                }
                (Some(_), None) => lines.push((lineno, line)),
            }
        }

        if let Some((start, current)) = section {
            reader.section(current, start, &lines)?;
        }

        let mut song = reader.song;
        let styles = &song.styles;
        if !styles.is_empty() {
            for (_, variant) in song.variants.iter_mut() {
                variant.load_tags(styles).map_err(ParseError::new)?;
            }
        }

        log::info!(
            "Loaded song: {} compounds, {} tags, {} variants",
            song.compounds.len(),
            song.formats.len(),
            song.variants.len()
        );
        Ok(song)
    }

    /// Read and parse a script from disk
    ///
    /// Media and font paths of the song resolve against the script's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Song> {
        Song::load_with_options(path, &SongOptions::default())
    }

    pub fn load_with_options(path: impl AsRef<Path>, options: &SongOptions) -> Result<Song> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| ParseError::new(ParseErrorKind::Io(format!("{}: {}", path.display(), e))))?;
        let mut song = Song::parse_with_options(&text, options)?;
        song.pathbase = path.parent().map(Path::to_path_buf);
        Ok(song)
    }
}

struct Reader<'o> {
    song: Song,
    options: &'o SongOptions,
    /// Running start beat for untimed compounds
    fake_time: i64,
}

impl<'o> Reader<'o> {
    fn section(&mut self, name: &str, header_line: usize, lines: &[Line]) -> Result<()> {
        match name {
            "Meta" => self.meta(lines),
            "Song" => {
                self.song.song = key_values(lines)?
                    .into_iter()
                    .map(|(_, k, v)| (k.to_string(), v.to_string()))
                    .collect();
                Ok(())
            }
            "Timing" => self.timing(lines),
            "Formats" => self.formats(lines),
            "Styles" => {
                for (lineno, name, data) in two_level(lines)? {
                    let style = Style::from_data(data).map_err(|k| ParseError::at(lineno, k))?;
                    self.song.styles.push((name, style));
                }
                Ok(())
            }
            "Variants" => {
                for (lineno, name, data) in two_level(lines)? {
                    let variant = Variant::from_data(data).map_err(|k| ParseError::at(lineno, k))?;
                    self.song.variants.push((name, variant));
                }
                Ok(())
            }
            "Lyrics" => self.lyrics(lines),
            other => Err(ParseError::at(
                header_line,
                ParseErrorKind::UnknownSection(other.to_string()),
            )),
        }
    }

    fn meta(&mut self, lines: &[Line]) -> Result<()> {
        for (_, key, value) in key_values(lines)? {
            let (key, lang) = match key.strip_suffix(']').and_then(|k| k.split_once('[')) {
                Some((key, lang)) => (key, Some(lang.to_string())),
                None => (key, None),
            };
            let meta = &mut self.song.meta;
            let index = match meta.iter().position(|(k, _)| k == key) {
                Some(index) => index,
                None => {
                    meta.push((key.to_string(), MultiString::default()));
                    meta.len() - 1
                }
            };
            meta[index].1.set(lang, value.to_string());
        }
        Ok(())
    }

    fn timing(&mut self, lines: &[Line]) -> Result<()> {
        let mut counter = BeatCounter::new();
        for (lineno, time, beat) in key_values(lines)? {
            let time = time
                .strip_prefix('@')
                .ok_or_else(|| ParseError::at(lineno, ParseErrorKind::ExpectedTimeAnchor))?;
            let time: f64 = time
                .trim()
                .parse()
                .map_err(|_| ParseError::at(lineno, ParseErrorKind::InvalidNumber(time.to_string())))?;
            let beat = parse_beat(beat)
                .ok_or_else(|| ParseError::at(lineno, ParseErrorKind::InvalidNumber(beat.to_string())))?;
            counter.add(time, beat_to_f64(beat));
        }
        self.song.timing = Some(counter);
        Ok(())
    }

    fn formats(&mut self, lines: &[Line]) -> Result<()> {
        for (lineno, tag, format) in key_values(lines)? {
            let script: Script = format.parse().map_err(|k| ParseError::at(lineno, k))?;
            self.song.formats.push((tag.to_string(), script));
        }
        Ok(())
    }

    fn lyrics(&mut self, lines: &[Line]) -> Result<()> {
        let mut compound: Option<Compound> = None;
        // A trailing blank line closes the last compound
        let sentinel: Line = (lines.last().map_or(0, |(n, _)| n + 1), "");

        for &(lineno, line) in lines.iter().chain(std::iter::once(&sentinel)) {
            let line = line.trim();
            if line.is_empty() {
                if let Some(done) = compound.take() {
                    let done = self.finish_compound(done, lineno)?;
                    self.song.compounds.push(done);
                }
                continue;
            }

            let current = compound.get_or_insert_with(Compound::new);
            let (tag, text) = line
                .split_once(':')
                .ok_or_else(|| ParseError::at(lineno, ParseErrorKind::ExpectedTagValue(line.to_string())))?;
            let (tag, text) = (tag.trim(), text.trim());

            if tag == "@" {
                if self.options.ignore_steps {
                    continue;
                }
                let mut values = Vec::new();
                for value in text.split_whitespace() {
                    values.push(parse_beat(value).ok_or_else(|| {
                        ParseError::at(lineno, ParseErrorKind::InvalidNumber(value.to_string()))
                    })?);
                }
                if values.is_empty() {
                    return Err(ParseError::at(lineno, ParseErrorKind::ExpectedTimeAnchor));
                }
                current.start = values[0];
                let timing = values.split_off(1);
                if !current.is_empty() && current.steps() != timing.len() {
                    return Err(ParseError::at(
                        lineno,
                        ParseErrorKind::TimingLengthMismatch {
                            timing: timing.len(),
                            steps: current.steps(),
                        },
                    ));
                }
                current.timing = Some(timing);
                continue;
            }

            let script = self
                .song
                .format(tag)
                .ok_or_else(|| ParseError::at(lineno, ParseErrorKind::UndefinedTag(tag.to_string())))?;
            let molecule = script.parse(text).map_err(|k| ParseError::at(lineno, k))?;
            current.insert(tag, molecule);
        }
        Ok(())
    }

    /// Validate a compound's step counts and give untimed ones a start
    fn finish_compound(&mut self, mut compound: Compound, lineno: usize) -> Result<Compound> {
        if let Some((first_tag, first)) = compound.molecules.first() {
            for (tag, molecule) in &compound.molecules[1..] {
                if molecule.steps() != first.steps() {
                    return Err(ParseError::at(
                        lineno,
                        ParseErrorKind::DurationMismatch {
                            first_tag: first_tag.clone(),
                            first: first.steps(),
                            other_tag: tag.clone(),
                            other: molecule.steps(),
                        },
                    ));
                }
            }
        }

        match &compound.timing {
            Some(timing) => {
                if compound.steps() != timing.len() {
                    return Err(ParseError::at(
                        lineno,
                        ParseErrorKind::TimingLengthMismatch {
                            timing: timing.len(),
                            steps: compound.steps(),
                        },
                    ));
                }
            }
            None => {
                compound.start = Beat::from_integer(self.fake_time);
                self.fake_time += compound.steps() as i64;
            }
        }
        Ok(compound)
    }
}

/// Split `key=value` lines, skipping blanks
fn key_values<'a>(lines: &[Line<'a>]) -> Result<Vec<(usize, &'a str, &'a str)>> {
    lines
        .iter()
        .filter(|(_, line)| !line.is_empty())
        .map(|&(lineno, line)| {
            line.split_once('=')
                .map(|(k, v)| (lineno, k, v))
                .ok_or_else(|| ParseError::at(lineno, ParseErrorKind::ExpectedKeyValue(line.to_string())))
        })
        .collect()
}

/// Parse `{name}` headed groups of `key=value` lines
fn two_level(lines: &[Line]) -> Result<Vec<(usize, String, Vec<(String, String)>)>> {
    let mut groups: Vec<(usize, String, Vec<(String, String)>)> = Vec::new();

    for &(lineno, line) in lines {
        if line.is_empty() {
            continue;
        }
        if line.starts_with('{') {
            let name = line
                .strip_prefix('{')
                .and_then(|l| l.strip_suffix('}'))
                .ok_or_else(|| {
                    ParseError::at(lineno, ParseErrorKind::ExpectedGroupHeader(line.to_string()))
                })?;
            groups.push((lineno, name.to_string(), Vec::new()));
            continue;
        }
        let group = groups.last_mut().ok_or_else(|| {
            ParseError::at(lineno, ParseErrorKind::ExpectedGroupHeader(line.to_string()))
        })?;
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| ParseError::at(lineno, ParseErrorKind::ExpectedKeyValue(line.to_string())))?;
        group.2.push((key.to_string(), value.to_string()));
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "\
# a comment before anything
[Meta]
title=Sakura
title[en]=Cherry

[Formats]
K=Japanese
R=Romaji

[Lyrics]
K: さくら
R: sakura

K: $はな$
R: hana
";

    #[test]
    fn test_untimed_compounds_get_running_start() {
        let song = Song::parse(SCRIPT).unwrap();
        assert_eq!(song.compounds.len(), 2);
        assert_eq!(song.compounds[0].start, Beat::from_integer(0));
        assert_eq!(song.compounds[1].start, Beat::from_integer(3));
        assert!(song.compounds[1].get("K").unwrap().break_before);
        assert_eq!(song.meta("title", &["en"]), Some("Cherry"));
    }

    #[test]
    fn test_duration_mismatch_reports_line() {
        let err = Song::parse("[Formats]\nK=Japanese\nR=Romaji\n[Lyrics]\nK: さくら\nR: saku\n\n")
            .unwrap_err();
        assert_eq!(err.line, Some(7));
        assert!(matches!(err.kind, ParseErrorKind::DurationMismatch { first: 3, other: 2, .. }));
    }

    #[test]
    fn test_timing_line_length_checked() {
        let err = Song::parse("[Formats]\nK=Japanese\n[Lyrics]\nK: さくら\n@: 0 1 1\n").unwrap_err();
        assert_eq!(err.line, Some(5));
        assert_eq!(
            err.kind,
            ParseErrorKind::TimingLengthMismatch { timing: 2, steps: 3 }
        );
    }

    #[test]
    fn test_ignore_steps_drops_timing() {
        let text = "[Formats]\nK=Japanese\n[Lyrics]\nK: さくら\n@: 4 1 1 1\n";
        let song = Song::parse_with_options(text, &SongOptions { ignore_steps: true }).unwrap();
        assert_eq!(song.compounds[0].timing, None);
        assert_eq!(song.compounds[0].start, Beat::from_integer(0));
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(
            Song::parse("title=x\n").unwrap_err(),
            ParseError::at(1, ParseErrorKind::ExpectedSection)
        );
        assert_eq!(
            Song::parse("[Bogus]\na=b\n").unwrap_err(),
            ParseError::at(1, ParseErrorKind::UnknownSection("Bogus".into()))
        );
        assert_eq!(
            Song::parse("[Formats]\nK=Japanese\n[Lyrics]\nX: hi\n").unwrap_err(),
            ParseError::at(4, ParseErrorKind::UndefinedTag("X".into()))
        );
        assert_eq!(
            Song::parse("[Timing]\n1.0=4\n").unwrap_err(),
            ParseError::at(2, ParseErrorKind::ExpectedTimeAnchor)
        );
    }

    #[test]
    fn test_markup_error_carries_line() {
        let err = Song::parse("[Formats]\nK=Japanese\n[Lyrics]\nK: {さ{く}}\n").unwrap_err();
        assert_eq!(err, ParseError::at(4, ParseErrorKind::NestedAtom));
    }
}
