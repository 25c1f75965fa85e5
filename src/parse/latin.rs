//! Latin and English segmentation
//!
//! Words split into syllables around vowel runs. A consonant cluster between
//! two vowel runs is shared out, the first half closing the previous
//! syllable and the rest opening the next; leading consonants join the
//! first vowel and trailing ones the last. A `.` forces a syllable break and
//! is dropped. Anything else (spaces, punctuation) sticks to the previous
//! syllable.
//!
//! The two scripts differ only in which letters may end a word as a vowel
//! or a consonant: in English a final `e` is silent and a final `y` sings.

use super::scanner::Token;
use crate::models::lyrics::Atom;

/// Letter classes for one Latin-family script
pub struct LetterClasses {
    pub vowels: &'static str,
    pub consonants: &'static str,
    /// Vowels when the letter ends a word
    pub vowels_end: &'static str,
    /// Consonants when the letter ends a word
    pub consonants_end: &'static str,
}

const VOWELS: &str = "aeiouáéíóúäëïöü";
const CONSONANTS: &str = "bcdfghjklmnñpqrstvwxyz0123456789'";

pub const LATIN: LetterClasses = LetterClasses {
    vowels: VOWELS,
    consonants: CONSONANTS,
    vowels_end: VOWELS,
    consonants_end: CONSONANTS,
};

pub const ENGLISH: LetterClasses = LetterClasses {
    vowels: VOWELS,
    consonants: CONSONANTS,
    vowels_end: "aiouy",
    consonants_end: "bcdfghjklmnñpqrstvwxz0123456789'",
};

impl LetterClasses {
    /// Whether `c` continues a word. Case-sensitive: an uppercase letter
    /// does not, so shouted words end every syllable with word-final rules.
    fn is_letter(&self, c: char) -> bool {
        self.vowels.contains(c) || self.consonants.contains(c)
    }
}

fn lower(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Segmenter state while walking a molecule
#[derive(Default)]
struct Syllables {
    atoms: Vec<Atom>,
    /// Consonants seen since the last vowel. `Some("")` right after a vowel.
    consonants: Option<String>,
    preceding_vowel: bool,
    /// The current atom was opened by punctuation; the next vowel joins it
    smash_first: bool,
    last_break: bool,
}

impl Syllables {
    fn append(&mut self, text: &str) {
        if let Some(last) = self.atoms.last_mut() {
            last.text.push_str(text);
        }
    }

    /// Attach pending consonants to the previous vowel, or give them their own atom
    fn flush_consonants(&mut self) {
        if let Some(consonants) = self.consonants.take() {
            if consonants.is_empty() {
                return;
            }
            if self.preceding_vowel {
                self.append(&consonants);
            } else {
                self.atoms.push(Atom::new(consonants));
            }
        }
    }

    fn consonant(&mut self, c: char) {
        match self.consonants.as_mut() {
            Some(consonants) => consonants.push(c),
            None => {
                self.preceding_vowel = false;
                self.consonants = Some(c.to_string());
            }
        }
    }

    fn vowel(&mut self, c: char) {
        // `None` means a group or punctuation came last: always open an atom
        match (self.preceding_vowel, self.consonants.take()) {
            (true, Some(consonants)) if consonants.is_empty() => self.append(&c.to_string()),
            (true, Some(consonants)) => {
                let chars: Vec<char> = consonants.chars().collect();
                let (close, open) = chars.split_at(chars.len() / 2);
                self.append(&close.iter().collect::<String>());
                let mut text: String = open.iter().collect();
                text.push(c);
                self.atoms.push(Atom::new(text));
            }
            (_, consonants) => {
                if !self.smash_first {
                    self.atoms.push(Atom::new(""));
                }
                if let Some(consonants) = consonants {
                    self.append(&consonants);
                }
                self.append(&c.to_string());
            }
        }
        self.preceding_vowel = true;
        self.consonants = Some(String::new());
        self.smash_first = false;
    }

    fn other(&mut self, c: char) {
        if self.consonants.as_ref().map_or(false, |s| !s.is_empty()) {
            self.flush_consonants();
        }
        if !self.atoms.is_empty() && !self.last_break {
            self.append(&c.to_string());
        } else {
            self.atoms.push(Atom::new(c.to_string()));
            self.smash_first = true;
        }
        self.preceding_vowel = false;
    }

    fn hard_break(&mut self) {
        self.smash_first = false;
        self.last_break = true;
        self.flush_consonants();
        self.preceding_vowel = false;
    }
}

pub fn segment(tokens: &[Token], classes: &LetterClasses) -> Vec<Atom> {
    let mut s = Syllables::default();

    for token in tokens {
        match token {
            Token::Group(text) => {
                if s.consonants.as_ref().map_or(false, |c| !c.is_empty()) {
                    s.flush_consonants();
                }
                s.atoms.push(Atom::new(text.clone()));
            }
            Token::Char {
                c: '.',
                escaped: false,
                ..
            } => {
                s.hard_break();
                continue;
            }
            Token::Char { c, next, .. } => {
                let word_goes_on = next.map_or(false, |n| classes.is_letter(n));
                let (vowels, consonants) = if word_goes_on {
                    (classes.vowels, classes.consonants)
                } else {
                    (classes.vowels_end, classes.consonants_end)
                };
                let l = lower(*c);
                if consonants.contains(l) {
                    s.consonant(*c);
                } else if vowels.contains(l) {
                    s.vowel(*c);
                } else {
                    s.other(*c);
                }
            }
            // No ruby in Latin scripts; the scanner never emits these
            Token::RubyOpen | Token::RubyClose => continue,
        }
        s.last_break = false;
    }

    if s.consonants.as_ref().map_or(false, |c| !c.is_empty()) {
        s.flush_consonants();
    }
    s.atoms
}
