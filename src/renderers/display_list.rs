//! Render-ready line buffers
//!
//! A [`RenderedLine`] is the output handed to JavaScript for drawing: one
//! interleaved vertex buffer and one index buffer per display line. The
//! renderer only has to upload them and draw triangles; every position,
//! texture coordinate, color and time is already computed here.
//!
//! Each glyph is a quad of 4 vertices and 6 indices. A vertex is
//! [`FLOATS_PER_VERTEX`] floats:
//!
//! | floats | content                                         |
//! |--------|-------------------------------------------------|
//! | 0-1    | position relative to the line origin            |
//! | 2-3    | atlas texture coordinate                        |
//! | 4      | time at which the highlight reaches this corner |
//! | 5-13   | fill, border and outline colors (0-1)           |
//! | 14-22  | the same colors while highlighted               |
//! | 23-24  | start and end time of the glyph's atom          |
//! | 25-26  | visible start and end time of the line          |

use serde::{Deserialize, Serialize};

use super::display::Display;
use super::display_line::DisplayLine;
use crate::models::style::{Edge, Palette};

pub const FLOATS_PER_VERTEX: usize = 27;
pub const VERTICES_PER_GLYPH: usize = 4;
pub const INDICES_PER_GLYPH: usize = 6;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RenderedLine {
    pub text: String,
    pub edge: Edge,
    pub row: usize,

    /// Line origin, snapped to whole pixels
    pub x: f64,
    pub y: f64,

    /// Visible interval
    pub start: f64,
    pub end: f64,

    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

fn push_palette(out: &mut Vec<f32>, palette: &Palette) {
    for color in palette {
        out.extend(color.iter().map(|&c| c as f32 / 255.0));
    }
}

impl RenderedLine {
    pub fn build(line: &DisplayLine, edge: Edge, display: &Display) -> Self {
        let count = line.glyphs.len();
        let mut vertices = Vec::with_capacity(count * VERTICES_PER_GLYPH * FLOATS_PER_VERTEX);
        let mut indices = Vec::with_capacity(count * INDICES_PER_GLYPH);

        for (i, instance) in line.glyphs.iter().enumerate() {
            let g = &instance.glyph;
            let left = instance.x + g.left;
            let right = instance.x + g.right;
            let top = instance.y + g.top;
            let bot = instance.y + g.bot;
            let t_left = instance.time_at(left);
            let t_right = instance.time_at(right);

            let corners = [
                (left, bot, g.tex_left, g.tex_bot, t_left),
                (left, top, g.tex_left, g.tex_top, t_left),
                (right, top, g.tex_right, g.tex_top, t_right),
                (right, bot, g.tex_right, g.tex_bot, t_right),
            ];
            for (x, y, u, v, t) in corners {
                vertices.extend([x as f32, y as f32, u as f32, v as f32, t as f32]);
                push_palette(&mut vertices, &instance.colors);
                push_palette(&mut vertices, &instance.colors_on);
                vertices.extend([
                    instance.t1 as f32,
                    instance.t2 as f32,
                    line.start as f32,
                    line.end as f32,
                ]);
            }

            let base = (i * VERTICES_PER_GLYPH) as u32;
            indices.extend([base, base + 1, base + 2, base + 2, base + 3, base]);
        }

        Self {
            text: line.text.clone(),
            edge,
            row: line.row,
            x: display.round_coord(line.x),
            y: display.round_coord(line.y),
            start: line.start,
            end: line.end,
            vertices,
            indices,
        }
    }

    pub fn glyph_count(&self) -> usize {
        self.indices.len() / INDICES_PER_GLYPH
    }

    pub fn is_visible(&self, t: f64) -> bool {
        self.start <= t && t <= self.end
    }

    /// Floats of vertex `n`
    pub fn vertex(&self, n: usize) -> Option<&[f32]> {
        let start = n * FLOATS_PER_VERTEX;
        self.vertices.get(start..start + FLOATS_PER_VERTEX)
    }
}
