//! Styles, edges and variants
//!
//! A style picks fonts, sizes, stroke widths and the before/after highlight
//! colors. A variant selects which tags are shown and, per tag, the style
//! and the screen edge (top or bottom) its lines are laid out against.

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::parse::error::ParseErrorKind;

/// RGB color
pub type Color = [u8; 3];

/// Fill, border and outline colors
pub type Palette = [Color; 3];

const DEFAULT_FONT: &str = "TakaoPGothic.ttf";
const DEFAULT_COLORS: Palette = [[255, 255, 255], [0, 128, 255], [0, 0, 0]];
const DEFAULT_COLORS_ON: Palette = [[0, 128, 255], [255, 255, 255], [0, 0, 0]];

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Style {
    /// Raw `key=value` entries, kept for serialization
    #[serde(skip)]
    pub data: Vec<(String, String)>,

    pub font: String,
    pub ruby_font: String,
    pub size: f64,

    /// Ruby text size; 0 disables ruby rendering
    pub ruby_size: f64,
    pub outline_width: f64,
    pub border_width: f64,

    /// Colors before the syllable is sung
    pub colors: Palette,

    /// Colors once the syllable is sung
    pub colors_on: Palette,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            font: DEFAULT_FONT.to_string(),
            ruby_font: DEFAULT_FONT.to_string(),
            size: 16.0,
            ruby_size: 8.0,
            outline_width: 0.1,
            border_width: 0.8,
            colors: DEFAULT_COLORS,
            colors_on: DEFAULT_COLORS_ON,
        }
    }
}

impl Style {
    /// Build a style from its `key=value` entries
    pub fn from_data(data: Vec<(String, String)>) -> Result<Self, ParseErrorKind> {
        let mut style = Style::default();
        let mut ruby_font = None;
        let mut ruby_size = None;

        for (key, value) in &data {
            match key.as_str() {
                "font" => style.font = value.clone(),
                "ruby_font" => ruby_font = Some(value.clone()),
                "size" => style.size = parse_f64(value)?,
                "ruby_size" => ruby_size = Some(parse_f64(value)?),
                "outline_width" => style.outline_width = parse_f64(value)?,
                "border_width" => style.border_width = parse_f64(value)?,
                "colors" => style.colors = parse_colors(value)?,
                "colors_on" => style.colors_on = parse_colors(value)?,
                _ => {
                    return Err(ParseErrorKind::UnknownStyleOption(key.clone(), value.clone()))
                }
            }
        }

        style.ruby_font = ruby_font.unwrap_or_else(|| style.font.clone());
        style.ruby_size = ruby_size.unwrap_or(style.size / 2.0);
        style.data = data;
        Ok(style)
    }
}

fn parse_f64(value: &str) -> Result<f64, ParseErrorKind> {
    value
        .trim()
        .parse()
        .map_err(|_| ParseErrorKind::InvalidNumber(value.to_string()))
}

/// Parse `RRGGBB,RRGGBB[,RRGGBB]`; a missing outline color is black
pub fn parse_colors(value: &str) -> Result<Palette, ParseErrorKind> {
    let vals: Vec<&str> = value.split(',').map(str::trim).collect();
    if vals.len() != 2 && vals.len() != 3 {
        return Err(ParseErrorKind::InvalidColors(format!(
            "expected 2 or 3 colors: {}",
            value
        )));
    }

    let mut palette: Palette = [[0, 0, 0]; 3];
    for (slot, val) in palette.iter_mut().zip(vals) {
        if val.len() != 6 || !val.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseErrorKind::InvalidColors(format!(
                "expected 6 hex digits: {}",
                val
            )));
        }
        for (i, channel) in slot.iter_mut().enumerate() {
            *channel = u8::from_str_radix(&val[i * 2..i * 2 + 2], 16)
                .map_err(|_| ParseErrorKind::InvalidColors(val.to_string()))?;
        }
    }
    Ok(palette)
}

// ============================================================================
// Edges and variants
// ============================================================================

/// Screen edge a tag's lines are stacked against
#[derive(Serialize_repr, Deserialize_repr, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Edge {
    Bottom = 1,
    Top = 2,
}

impl Edge {
    pub fn parse(value: &str) -> Option<Edge> {
        match value.to_uppercase().as_str() {
            "BOTTOM" => Some(Edge::Bottom),
            "TOP" => Some(Edge::Top),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Edge::Bottom => "BOTTOM",
            Edge::Top => "TOP",
        }
    }
}

/// How one tag is shown in a variant
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TagInfo {
    pub style: Style,
    pub edge: Edge,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Variant {
    /// Raw `key=value` entries, kept for serialization
    #[serde(skip)]
    pub data: Vec<(String, String)>,

    pub name: String,

    /// Default style for tags without their own
    pub style: Option<String>,
    pub default: bool,
    pub tag_list: Vec<String>,

    /// Per-tag `tag.key=value` options
    #[serde(skip)]
    pub tag_data: Vec<(String, Vec<(String, String)>)>,

    /// Resolved tag display info, in `tag_list` order
    pub tags: Vec<(String, TagInfo)>,
}

impl Variant {
    pub fn from_data(data: Vec<(String, String)>) -> Result<Self, ParseErrorKind> {
        let mut name = None;
        let mut tag_list = None;
        let mut variant = Variant::default();

        for (key, value) in &data {
            match key.as_str() {
                "name" => name = Some(value.clone()),
                "style" => variant.style = Some(value.clone()),
                "tags" => {
                    tag_list = Some(if value.is_empty() {
                        Vec::new()
                    } else {
                        value.split(',').map(|t| t.trim().to_string()).collect()
                    })
                }
                "default" => variant.default = matches!(value.to_lowercase().as_str(), "1" | "true"),
                _ => match key.split_once('.') {
                    Some((tag, option)) => {
                        match variant.tag_data.iter_mut().find(|(t, _)| t == tag) {
                            Some((_, options)) => options.push((option.to_string(), value.clone())),
                            None => variant
                                .tag_data
                                .push((tag.to_string(), vec![(option.to_string(), value.clone())])),
                        }
                    }
                    None => {
                        return Err(ParseErrorKind::UnknownVariantOption(key.clone(), value.clone()))
                    }
                },
            }
        }

        variant.name = name.ok_or_else(|| ParseErrorKind::MissingVariantField {
            variant: "?".to_string(),
            field: "name=",
        })?;
        variant.tag_list = tag_list.ok_or_else(|| ParseErrorKind::MissingVariantField {
            variant: variant.name.clone(),
            field: "tags=",
        })?;
        variant.data = data;
        Ok(variant)
    }

    /// Resolve every listed tag to a style and an edge
    pub fn load_tags(&mut self, styles: &[(String, Style)]) -> Result<(), ParseErrorKind> {
        let find_style = |name: &str| styles.iter().find(|(n, _)| n == name).map(|(_, s)| s.clone());

        let default_style = match &self.style {
            Some(name) => Some(find_style(name).ok_or_else(|| ParseErrorKind::UnknownStyle {
                style: name.clone(),
                variant: self.name.clone(),
            })?),
            None => None,
        };

        let mut tags = Vec::with_capacity(self.tag_list.len());
        for tag in &self.tag_list {
            let mut style = None;
            let mut edge = Edge::Bottom;

            let options = self
                .tag_data
                .iter()
                .find(|(t, _)| t == tag)
                .map(|(_, options)| options.as_slice())
                .unwrap_or(&[]);
            for (key, value) in options {
                match key.as_str() {
                    "style" => {
                        style = Some(find_style(value).ok_or_else(|| ParseErrorKind::UnknownStyle {
                            style: value.clone(),
                            variant: format!("{} tag {}", self.name, tag),
                        })?)
                    }
                    "edge" => {
                        edge = Edge::parse(value).ok_or_else(|| ParseErrorKind::UnknownEdge {
                            edge: value.clone(),
                            variant: self.name.clone(),
                            tag: tag.clone(),
                        })?
                    }
                    _ => {
                        return Err(ParseErrorKind::UnknownTagKey {
                            key: key.clone(),
                            variant: self.name.clone(),
                            tag: tag.clone(),
                        })
                    }
                }
            }

            let style = style.or_else(|| default_style.clone()).ok_or_else(|| {
                ParseErrorKind::MissingTagStyle {
                    tag: tag.clone(),
                    variant: self.name.clone(),
                }
            })?;
            tags.push((tag.clone(), TagInfo { style, edge }));
        }

        self.tags = tags;
        Ok(())
    }

    pub fn tag_info(&self, tag: &str) -> Option<&TagInfo> {
        self.tags.iter().find(|(t, _)| t == tag).map(|(_, info)| info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kv(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_style_defaults_ruby_from_base() {
        let style = Style::from_data(kv(&[("font", "a.ttf"), ("size", "20")])).unwrap();
        assert_eq!(style.ruby_font, "a.ttf");
        assert_eq!(style.ruby_size, 10.0);
    }

    #[test]
    fn test_style_colors() {
        let style = Style::from_data(kv(&[("colors", "ff0000, 00ff00")])).unwrap();
        assert_eq!(style.colors, [[255, 0, 0], [0, 255, 0], [0, 0, 0]]);
        assert!(Style::from_data(kv(&[("colors", "ff0000")])).is_err());
        assert!(Style::from_data(kv(&[("colors", "ff00,00ff00")])).is_err());
    }

    #[test]
    fn test_style_unknown_option() {
        assert_eq!(
            Style::from_data(kv(&[("weight", "bold")])),
            Err(ParseErrorKind::UnknownStyleOption("weight".into(), "bold".into()))
        );
    }

    #[test]
    fn test_variant_resolves_tags() {
        let styles = vec![
            ("main".to_string(), Style::default()),
            ("small".to_string(), Style::from_data(kv(&[("size", "8")])).unwrap()),
        ];
        let mut variant = Variant::from_data(kv(&[
            ("name", "Both"),
            ("tags", "K, R"),
            ("style", "main"),
            ("R.style", "small"),
            ("R.edge", "top"),
        ]))
        .unwrap();
        variant.load_tags(&styles).unwrap();

        let k = variant.tag_info("K").unwrap();
        assert_eq!(k.edge, Edge::Bottom);
        assert_eq!(k.style.size, 16.0);
        let r = variant.tag_info("R").unwrap();
        assert_eq!(r.edge, Edge::Top);
        assert_eq!(r.style.size, 8.0);
    }

    #[test]
    fn test_variant_requires_name_and_tags() {
        assert!(matches!(
            Variant::from_data(kv(&[("tags", "K")])),
            Err(ParseErrorKind::MissingVariantField { field: "name=", .. })
        ));
        assert!(matches!(
            Variant::from_data(kv(&[("name", "X")])),
            Err(ParseErrorKind::MissingVariantField { field: "tags=", .. })
        ));
    }

    #[test]
    fn test_tag_without_style_fails() {
        let mut variant = Variant::from_data(kv(&[("name", "X"), ("tags", "K")])).unwrap();
        assert!(matches!(
            variant.load_tags(&[]),
            Err(ParseErrorKind::MissingTagStyle { .. })
        ));
    }
}
