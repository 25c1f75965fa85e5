//! Japanese segmentation
//!
//! Every character is its own atom, except small kana, punctuation and
//! spaces, which ride along with the character before them. Ruby groups in
//! parentheses annotate the preceding atom, one particle per character.

use super::error::ParseErrorKind;
use super::scanner::Token;
use crate::models::lyrics::{Atom, Particle};

const COMBINE_CHARS: &str = "ぁぃぅぇぉゃゅょァィゥェォャュョ 　？！?!…。、.,-「」―";

pub fn is_combining(c: char) -> bool {
    COMBINE_CHARS.contains(c)
}

pub fn segment(tokens: &[Token]) -> Result<Vec<Atom>, ParseErrorKind> {
    let mut atoms: Vec<Atom> = Vec::new();
    let mut in_ruby = false;

    for token in tokens {
        match token {
            Token::Char { c, escaped, .. } => {
                let combines = !escaped && is_combining(*c);
                if in_ruby {
                    let particles = ruby_of(&mut atoms)?;
                    if combines && !particles.is_empty() {
                        if let Some(last) = particles.last_mut() {
                            last.text.push(*c);
                        }
                    } else {
                        particles.push(Particle::new(c.to_string()));
                    }
                } else if combines && !atoms.is_empty() {
                    if let Some(last) = atoms.last_mut() {
                        last.text.push(*c);
                    }
                } else {
                    atoms.push(Atom::new(c.to_string()));
                }
            }
            Token::Group(text) => {
                if in_ruby {
                    ruby_of(&mut atoms)?.push(Particle::new(text.clone()));
                } else {
                    atoms.push(Atom::new(text.clone()));
                }
            }
            Token::RubyOpen => {
                let atom = atoms.last_mut().ok_or(ParseErrorKind::RubyWithoutAtom)?;
                atom.particles = Some(Vec::new());
                in_ruby = true;
            }
            Token::RubyClose => {
                if let Some(atom) = atoms.last_mut() {
                    atom.particle_edge = Some(atom.text.chars().count());
                }
                in_ruby = false;
            }
        }
    }

    Ok(atoms)
}

fn ruby_of(atoms: &mut [Atom]) -> Result<&mut Vec<Particle>, ParseErrorKind> {
    atoms
        .last_mut()
        .and_then(|atom| atom.particles.as_mut())
        .ok_or(ParseErrorKind::RubyWithoutAtom)
}
