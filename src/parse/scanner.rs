//! Shared lyric markup scanner
//!
//! All scripts share one small markup language on top of plain text:
//!
//! - `\x` makes `x` a literal character
//! - `{...}` is an explicit atom (or, inside ruby, an explicit particle)
//! - `(...)` after an atom holds its ruby text (only where the script allows it)
//! - a leading `$` breaks the line before the molecule, `$^N` also asks for row N
//! - a trailing unescaped `$` breaks the line after it
//!
//! Japanese text also accepts the fullwidth forms (`＼｛｝（）＄＾`).
//!
//! The scanner turns a source string into [`Token`]s; each script's segmenter
//! decides what a plain character means.

use super::error::ParseErrorKind;

/// Which markup forms a script understands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanRules {
    pub fullwidth: bool,
    pub ruby: bool,
}

/// Line-break and row hints stripped from the ends of a molecule
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Markers {
    pub break_before: bool,
    pub break_after: bool,
    pub row: Option<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// A plain character. `next` is the raw character that follows it in the source.
    Char {
        c: char,
        escaped: bool,
        next: Option<char>,
    },
    /// Verbatim `{...}` content
    Group(String),
    RubyOpen,
    RubyClose,
}

impl ScanRules {
    fn is_escape(&self, c: char) -> bool {
        c == '\\' || (self.fullwidth && c == '＼')
    }

    fn is_group_open(&self, c: char) -> bool {
        c == '{' || (self.fullwidth && c == '｛')
    }

    fn is_group_close(&self, c: char) -> bool {
        c == '}' || (self.fullwidth && c == '｝')
    }

    fn is_ruby_open(&self, c: char) -> bool {
        self.ruby && (c == '(' || (self.fullwidth && c == '（'))
    }

    fn is_ruby_close(&self, c: char) -> bool {
        self.ruby && (c == ')' || (self.fullwidth && c == '）'))
    }

    fn is_break(&self, c: char) -> bool {
        c == '$' || (self.fullwidth && c == '＄')
    }

    fn is_row(&self, c: char) -> bool {
        c == '^' || (self.fullwidth && c == '＾')
    }

    /// True if `c` would be read as markup when written bare
    pub fn is_special(&self, c: char) -> bool {
        self.is_escape(c)
            || self.is_group_open(c)
            || self.is_group_close(c)
            || self.is_ruby_open(c)
            || self.is_ruby_close(c)
    }
}

/// Strip break/row markers from both ends of `source`
pub fn split_markers(source: &str, rules: ScanRules) -> Result<(Markers, &str), ParseErrorKind> {
    let mut markers = Markers::default();
    let mut rest = source;

    let mut chars = rest.chars();
    if let Some(c) = chars.next() {
        if rules.is_break(c) {
            markers.break_before = true;
            rest = chars.as_str();

            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                if rules.is_row(c) {
                    let digit = chars.next();
                    let row = digit
                        .and_then(|d| d.to_digit(10))
                        .ok_or(ParseErrorKind::InvalidRowHint(digit))?;
                    markers.row = Some(row as u8);
                    rest = chars.as_str();
                }
            }
        }
    }

    let mut tail = rest.chars().rev();
    if let Some(last) = tail.next() {
        if rules.is_break(last) {
            let escaped = tail.next().map_or(false, |c| rules.is_escape(c));
            if !escaped {
                markers.break_after = true;
                rest = &rest[..rest.len() - last.len_utf8()];
            }
        }
    }

    Ok((markers, rest))
}

/// Tokenize marker-free lyric text
pub fn tokenize(body: &str, rules: ScanRules) -> Result<Vec<Token>, ParseErrorKind> {
    let chars: Vec<char> = body.chars().collect();
    let mut tokens = Vec::with_capacity(chars.len());
    let mut group: Option<String> = None;
    let mut in_ruby = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if escaped {
            escaped = false;
            match group.as_mut() {
                Some(text) => text.push(c),
                None => tokens.push(Token::Char {
                    c,
                    escaped: true,
                    next: chars.get(i + 1).copied(),
                }),
            }
            continue;
        }

        if rules.is_escape(c) {
            escaped = true;
            continue;
        }

        if let Some(text) = group.as_mut() {
            if rules.is_group_close(c) {
                if text.is_empty() {
                    return Err(ParseErrorKind::EmptyGroup);
                }
                tokens.push(Token::Group(std::mem::take(text)));
                group = None;
            } else if rules.is_group_open(c) {
                return Err(ParseErrorKind::NestedAtom);
            } else if rules.is_ruby_open(c) {
                return Err(ParseErrorKind::RubyInsideAtom);
            } else {
                text.push(c);
            }
            continue;
        }

        if rules.is_group_open(c) {
            group = Some(String::new());
        } else if rules.is_ruby_open(c) {
            if in_ruby {
                return Err(ParseErrorKind::NestedRuby);
            }
            in_ruby = true;
            tokens.push(Token::RubyOpen);
        } else if in_ruby && rules.is_ruby_close(c) {
            in_ruby = false;
            tokens.push(Token::RubyClose);
        } else {
            tokens.push(Token::Char {
                c,
                escaped: false,
                next: chars.get(i + 1).copied(),
            });
        }
    }

    if group.is_some() {
        return Err(ParseErrorKind::UnterminatedGroup);
    }
    if in_ruby {
        return Err(ParseErrorKind::UnterminatedRuby);
    }
    if escaped {
        return Err(ParseErrorKind::UnterminatedEscape);
    }

    Ok(tokens)
}

/// Split markers and tokenize in one go
pub fn scan(source: &str, rules: ScanRules) -> Result<(Markers, Vec<Token>), ParseErrorKind> {
    let (markers, body) = split_markers(source, rules)?;
    Ok((markers, tokenize(body, rules)?))
}
