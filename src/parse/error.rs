//! Error types for song script parsing
//!
//! Every parse failure is fatal to the song load. Segmenters report a bare
//! [`ParseErrorKind`]; the song reader wraps it into a [`ParseError`] carrying
//! the 1-based line of the script it came from.

use std::fmt;
use thiserror::Error;

/// A fatal song script error, optionally tied to a source line
#[derive(Debug, Clone, PartialEq, Error)]
pub struct ParseError {
    pub line: Option<usize>,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind) -> Self {
        Self { line: None, kind }
    }

    pub fn at(line: usize, kind: ParseErrorKind) -> Self {
        Self {
            line: Some(line),
            kind,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl From<ParseErrorKind> for ParseError {
    fn from(kind: ParseErrorKind) -> Self {
        ParseError::new(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    // Lyric markup
    #[error("nested atoms")]
    NestedAtom,

    #[error("empty group")]
    EmptyGroup,

    #[error("incomplete group")]
    UnterminatedGroup,

    #[error("nested furigana")]
    NestedRuby,

    #[error("furigana within atom")]
    RubyInsideAtom,

    #[error("furigana with no atom")]
    RubyWithoutAtom,

    #[error("incomplete furigana")]
    UnterminatedRuby,

    #[error("incomplete escape")]
    UnterminatedEscape,

    #[error("expected a row digit after '^', found {0:?}")]
    InvalidRowHint(Option<char>),

    // Compounds
    #[error("duration mismatch: {first}!={other} ({first_tag} vs {other_tag})")]
    DurationMismatch {
        first_tag: String,
        first: usize,
        other_tag: String,
        other: usize,
    },

    #[error("timing line length mismatch: {timing}!={steps}")]
    TimingLengthMismatch { timing: usize, steps: usize },

    #[error("expected 'X: value': {0:?}")]
    ExpectedTagValue(String),

    #[error("undefined format {0:?}")]
    UndefinedTag(String),

    // Script structure
    #[error("expected section header")]
    ExpectedSection,

    #[error("unknown section {0}")]
    UnknownSection(String),

    #[error("expected key=value format ({0})")]
    ExpectedKeyValue(String),

    #[error("expected {{...}} ({0})")]
    ExpectedGroupHeader(String),

    #[error("expected @time")]
    ExpectedTimeAnchor,

    #[error("invalid number {0:?}")]
    InvalidNumber(String),

    #[error("unknown format {0}")]
    UnknownFormat(String),

    // Styles and variants
    #[error("unknown style option {0}={1}")]
    UnknownStyleOption(String, String),

    #[error("invalid colors: {0}")]
    InvalidColors(String),

    #[error("unknown variant option {0}={1}")]
    UnknownVariantOption(String, String),

    #[error("variant {variant} must have a {field} entry")]
    MissingVariantField { variant: String, field: &'static str },

    #[error("unknown style {style} for variant {variant}")]
    UnknownStyle { style: String, variant: String },

    #[error("unknown edge {edge} in variant {variant} tag {tag}")]
    UnknownEdge {
        edge: String,
        variant: String,
        tag: String,
    },

    #[error("unknown key {key} in variant {variant} tag {tag}")]
    UnknownTagKey {
        key: String,
        variant: String,
        tag: String,
    },

    #[error("tag {tag} in variant {variant} must have a style")]
    MissingTagStyle { tag: String, variant: String },

    #[error("cannot read song: {0}")]
    Io(String),
}
