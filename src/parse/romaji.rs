//! Romaji segmentation
//!
//! Splits romanized Japanese into morae: a vowel closes the atom its
//! consonant opened, `n` doubled or standing alone is its own mora, a
//! doubled consonant (the small tsu) is its own atom, and the digraphs
//! `sh`, `ts`, `ch`, `dz` (or any consonant followed by `y`) stay together.
//! Anything that is not a letter sticks to the previous atom.

use super::scanner::Token;
use crate::models::lyrics::Atom;

const DIGRAPHS: [&str; 4] = ["sh", "ts", "ch", "dz"];

fn is_letter(c: char) -> bool {
    c.is_ascii_alphabetic()
}

fn is_vowel(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), 'a' | 'i' | 'u' | 'e' | 'o')
}

pub fn segment(tokens: &[Token]) -> Vec<Atom> {
    let mut atoms: Vec<Atom> = Vec::new();
    // Consonant that opened the current atom and still waits for its vowel
    let mut last_consonant: Option<char> = None;

    for token in tokens {
        let c = match token {
            Token::Char { c, .. } => *c,
            Token::Group(text) => {
                atoms.push(Atom::new(text.clone()));
                last_consonant = None;
                continue;
            }
            // Romaji has no ruby; the scanner never emits these
            Token::RubyOpen | Token::RubyClose => continue,
        };

        if !is_letter(c) && !atoms.is_empty() {
            append(&mut atoms, c);
            last_consonant = None;
        } else if is_vowel(c) {
            if last_consonant.is_some() {
                append(&mut atoms, c);
            } else {
                atoms.push(Atom::new(c.to_string()));
            }
            last_consonant = None;
        } else if Some(c) == last_consonant {
            if c.to_ascii_lowercase() == 'n' {
                append(&mut atoms, c);
                last_consonant = None;
            } else {
                atoms.push(Atom::new(c.to_string()));
                last_consonant = Some(c);
            }
        } else if let Some(prev) = last_consonant {
            let pair: String = [prev, c].iter().map(|c| c.to_ascii_lowercase()).collect();
            if DIGRAPHS.contains(&pair.as_str()) || c.to_ascii_lowercase() == 'y' {
                append(&mut atoms, c);
            } else {
                atoms.push(Atom::new(c.to_string()));
            }
            last_consonant = Some(c);
        } else {
            atoms.push(Atom::new(c.to_string()));
            last_consonant = Some(c);
        }
    }

    atoms
}

fn append(atoms: &mut [Atom], c: char) {
    if let Some(last) = atoms.last_mut() {
        last.text.push(c);
    }
}
