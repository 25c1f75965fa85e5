//! The song aggregate
//!
//! A song is read from a sectioned text script (see `parse::song_file`) and
//! holds everything the layout needs: the tag → script table, styles,
//! variants, the beat counter and the ordered list of compounds.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::lyrics::Compound;
use super::style::{Edge, Style, Variant};
use super::timing::{BeatCounter, MixedFraction};
use crate::parse::Script;

/// A meta value with optional per-language translations
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultiString {
    /// (language, text); `None` is the unlocalized value, `"*"` the fallback
    pub values: Vec<(Option<String>, String)>,
}

impl MultiString {
    pub fn set(&mut self, lang: Option<String>, text: String) {
        match self.values.iter_mut().find(|(l, _)| *l == lang) {
            Some(entry) => entry.1 = text,
            None => self.values.push((lang, text)),
        }
    }

    fn lookup(&self, lang: Option<&str>) -> Option<&str> {
        self.values
            .iter()
            .find(|(l, _)| l.as_deref() == lang)
            .map(|(_, text)| text.as_str())
    }

    /// First match among `langs`, then `*`, then the unlocalized value
    pub fn get(&self, langs: &[&str]) -> &str {
        langs
            .iter()
            .find_map(|lang| self.lookup(Some(lang)))
            .or_else(|| {
                if langs.is_empty() {
                    None
                } else {
                    self.lookup(Some("*"))
                }
            })
            .or_else(|| self.lookup(None))
            .unwrap_or("")
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Song {
    /// Directory the script was loaded from; media paths resolve against it
    pub pathbase: Option<PathBuf>,

    pub meta: Vec<(String, MultiString)>,
    pub song: Vec<(String, String)>,
    pub timing: Option<BeatCounter>,
    pub formats: Vec<(String, Script)>,
    pub styles: Vec<(String, Style)>,
    pub variants: Vec<(String, Variant)>,
    pub compounds: Vec<Compound>,
}

impl Song {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn meta(&self, key: &str, langs: &[&str]) -> Option<&str> {
        self.meta
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.get(langs))
    }

    pub fn song_value(&self, key: &str) -> Option<&str> {
        self.song
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn format(&self, tag: &str) -> Option<Script> {
        self.formats
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, script)| *script)
    }

    pub fn style(&self, name: &str) -> Option<&Style> {
        self.styles.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn variant(&self, name: &str) -> Option<&Variant> {
        self.variants.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// The variant flagged `default=1`, else the first one
    pub fn default_variant(&self) -> Option<&Variant> {
        self.variants
            .iter()
            .map(|(_, v)| v)
            .find(|v| v.default)
            .or_else(|| self.variants.first().map(|(_, v)| v))
    }

    fn media_path(&self, key: &str) -> Option<PathBuf> {
        let file = self.song_value(key)?;
        Some(match &self.pathbase {
            Some(base) => base.join(file),
            None => PathBuf::from(file),
        })
    }

    pub fn audio_file(&self) -> Option<PathBuf> {
        self.media_path("audio")
    }

    pub fn video_file(&self) -> Option<PathBuf> {
        self.media_path("video")
    }

    pub fn cover_file(&self) -> Option<PathBuf> {
        self.media_path("cover")
    }

    /// Video aspect ratio from `aspect=` (a fraction such as `16/9`)
    pub fn aspect(&self) -> Option<f64> {
        let value = self.song_value("aspect")?;
        crate::models::timing::parse_beat(value).map(crate::models::timing::beat_to_f64)
    }

    /// Locate a font file shipped next to the script
    pub fn font_path(&self, font: &str) -> Option<PathBuf> {
        let path = self.pathbase.as_deref().unwrap_or_else(|| Path::new("")).join(font);
        path.exists().then_some(path)
    }

    /// Bottom-edge lyrics of a variant as one line of text, `/` at line breaks
    ///
    /// Stops adding compounds once `length` characters are reached.
    pub fn lyric_snippet(&self, variant: &str, length: usize) -> Option<String> {
        let variant = self.variant(variant)?;
        let tags: Vec<&str> = variant
            .tags
            .iter()
            .filter(|(_, info)| info.edge == Edge::Bottom)
            .map(|(tag, _)| tag.as_str())
            .collect();

        let mut lyrics = String::new();
        let mut broke = false;
        for compound in &self.compounds {
            if lyrics.chars().count() >= length {
                break;
            }
            for (tag, molecule) in &compound.molecules {
                if !tags.contains(&tag.as_str()) {
                    continue;
                }
                let space = molecule.space();
                if molecule.break_before && !broke {
                    lyrics.push('/');
                    lyrics.push(space);
                }
                broke = false;
                lyrics.push_str(&molecule.text());
                lyrics.push(space);
                if molecule.break_after {
                    lyrics.push('/');
                    lyrics.push(space);
                    broke = true;
                }
            }
        }
        Some(lyrics)
    }

    /// Serialize back to a script that loads into an equal song
    pub fn dump(&self) -> String {
        let mut s = String::new();

        if !self.meta.is_empty() {
            s.push_str("[Meta]\n");
            for (key, value) in &self.meta {
                for (lang, text) in &value.values {
                    match lang {
                        Some(lang) => {
                            let _ = writeln!(s, "{}[{}]={}", key, lang, text);
                        }
                        None => {
                            let _ = writeln!(s, "{}={}", key, text);
                        }
                    }
                }
            }
            s.push('\n');
        }

        if !self.song.is_empty() {
            s.push_str("[Song]\n");
            for (key, value) in &self.song {
                let _ = writeln!(s, "{}={}", key, value);
            }
            s.push('\n');
        }

        if let Some(timing) = &self.timing {
            s.push_str("[Timing]\n");
            for (time, beat) in timing.anchors() {
                let _ = writeln!(s, "@{:.6}={}", time, beat);
            }
            s.push('\n');
        }

        if !self.formats.is_empty() {
            s.push_str("[Formats]\n");
            for (tag, script) in &self.formats {
                let _ = writeln!(s, "{}={}", tag, script);
            }
            s.push('\n');
        }

        if !self.styles.is_empty() {
            s.push_str("[Styles]\n");
            for (name, style) in &self.styles {
                let _ = writeln!(s, "{{{}}}", name);
                for (key, value) in &style.data {
                    let _ = writeln!(s, "{}={}", key, value);
                }
                s.push('\n');
            }
        }

        if !self.variants.is_empty() {
            s.push_str("[Variants]\n");
            for (name, variant) in &self.variants {
                let _ = writeln!(s, "{{{}}}", name);
                for (key, value) in &variant.data {
                    let _ = writeln!(s, "{}={}", key, value);
                }
                s.push('\n');
            }
        }

        s.push_str("[Lyrics]\n\n");
        for compound in &self.compounds {
            for (tag, molecule) in &compound.molecules {
                let _ = writeln!(s, "{}: {}", tag, molecule.source);
            }
            if let Some(timing) = &compound.timing {
                let steps: Vec<String> = timing.iter().map(|b| MixedFraction(*b).to_string()).collect();
                let _ = writeln!(s, "@: {}  {}", MixedFraction(compound.start), steps.join(" "));
            }
            s.push('\n');
            if compound
                .molecules
                .iter()
                .any(|(_, m)| m.break_before || m.break_after)
            {
                s.push('\n');
            }
        }
        s
    }
}
