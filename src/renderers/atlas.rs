//! Glyph texture atlas
//!
//! Packs glyph bitmaps into one power-of-two texture with the skyline
//! bottom-left strategy: the free space is described by a list of
//! `(x, y, width)` segments tracing its lower boundary from left to right,
//! and each new box goes where its top edge ends up lowest.
//!
//! The atlas only manages pixels. Uploading them to the GPU is the
//! renderer's job; it polls [`TextureAtlas::take_upload`] each frame.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AtlasError {
    #[error("atlas is full: no room for a {width}x{height} region")]
    Full { width: usize, height: usize },

    #[error("region data is {got} bytes, expected {expected}")]
    DataSize { expected: usize, got: usize },

    #[error("region {0:?} lies outside the atlas")]
    OutOfBounds(Region),
}

/// An allocated rectangle, in pixels
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Region {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> usize {
        self.x + self.width
    }

    pub fn bottom(&self) -> usize {
        self.y + self.height
    }

    pub fn intersects(&self, other: &Region) -> bool {
        self.x < other.right() && other.x < self.right() && self.y < other.bottom() && other.y < self.bottom()
    }
}

/// One skyline segment. Signed so that shrinking past zero can be detected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Node {
    x: i64,
    y: i64,
    width: i64,
}

#[derive(Clone, Debug)]
pub struct TextureAtlas {
    width: usize,
    height: usize,
    depth: usize,
    nodes: Vec<Node>,
    data: Vec<u8>,
    used: usize,
    dirty: bool,
}

/// Round to the nearest power of two (in log space)
fn nearest_pow2(n: usize) -> usize {
    let exp = ((n.max(1) as f64).log2() + 0.5).floor() as u32;
    1usize << exp
}

impl TextureAtlas {
    /// Create an empty atlas; sizes snap to the nearest power of two
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        let width = nearest_pow2(width);
        let height = nearest_pow2(height);
        Self {
            width,
            height,
            depth,
            nodes: vec![Node {
                x: 0,
                y: 0,
                width: width as i64,
            }],
            data: vec![0; width * height * depth],
            used: 0,
            dirty: true,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Allocated area in pixels
    pub fn used(&self) -> usize {
        self.used
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Pixels to upload, if anything changed since the last call
    pub fn take_upload(&mut self) -> Option<&[u8]> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(&self.data)
    }

    /// Forget every allocation and zero the pixels
    pub fn clear(&mut self) {
        self.nodes = vec![Node {
            x: 0,
            y: 0,
            width: self.width as i64,
        }];
        self.data.iter_mut().for_each(|b| *b = 0);
        self.used = 0;
        self.dirty = true;
    }

    /// Allocate a `width` x `height` region, or `None` if nothing fits
    pub fn get_region(&mut self, width: usize, height: usize) -> Option<Region> {
        let mut best: Option<(usize, i64, i64, Region)> = None;

        for index in 0..self.nodes.len() {
            let Some(y) = self.fit(index, width, height) else {
                continue;
            };
            let node = self.nodes[index];
            let top = y + height as i64;
            let better = match best {
                None => true,
                Some((_, best_top, best_width, _)) => {
                    top < best_top || (top == best_top && node.width < best_width)
                }
            };
            if better {
                let region = Region::new(node.x as usize, y as usize, width, height);
                best = Some((index, top, node.width, region));
            }
        }

        let (index, _, _, region) = best?;

        self.nodes.insert(
            index,
            Node {
                x: region.x as i64,
                y: (region.y + height) as i64,
                width: width as i64,
            },
        );

        // Trim the segments now hidden under the new one
        let mut i = index + 1;
        while i < self.nodes.len() {
            let prev = self.nodes[i - 1];
            let prev_end = prev.x + prev.width;
            let node = &mut self.nodes[i];
            if node.x >= prev_end {
                break;
            }
            let shrink = prev_end - node.x;
            node.x += shrink;
            node.width -= shrink;
            if node.width > 0 {
                break;
            }
            self.nodes.remove(i);
        }

        self.merge();
        self.used += width * height;
        Some(region)
    }

    /// Lowest y at which a box fits starting at segment `index`
    fn fit(&self, index: usize, width: usize, height: usize) -> Option<i64> {
        let node = self.nodes[index];
        if node.x + width as i64 > self.width as i64 {
            return None;
        }

        let mut y = node.y;
        let mut width_left = width as i64;
        let mut i = index;
        while width_left > 0 {
            let node = self.nodes.get(i)?;
            y = y.max(node.y);
            if y + height as i64 > self.height as i64 {
                return None;
            }
            width_left -= node.width;
            i += 1;
        }
        Some(y)
    }

    /// Join neighbouring segments at the same height
    fn merge(&mut self) {
        let mut i = 0;
        while i + 1 < self.nodes.len() {
            if self.nodes[i].y == self.nodes[i + 1].y {
                self.nodes[i].width += self.nodes[i + 1].width;
                self.nodes.remove(i + 1);
            } else {
                i += 1;
            }
        }
    }

    /// Copy row-major `depth`-channel pixels into `region`
    pub fn set_region(&mut self, region: Region, data: &[u8]) -> Result<(), AtlasError> {
        if region.right() > self.width || region.bottom() > self.height {
            return Err(AtlasError::OutOfBounds(region));
        }
        let row_len = region.width * self.depth;
        let expected = row_len * region.height;
        if data.len() != expected {
            return Err(AtlasError::DataSize {
                expected,
                got: data.len(),
            });
        }

        for (row, src) in data.chunks_exact(row_len.max(1)).enumerate().take(region.height) {
            let start = ((region.y + row) * self.width + region.x) * self.depth;
            self.data[start..start + row_len].copy_from_slice(src);
        }
        self.dirty = true;
        Ok(())
    }

    /// Read back the pixels of `region`
    pub fn get_pixels(&self, region: Region) -> Option<Vec<u8>> {
        if region.right() > self.width || region.bottom() > self.height {
            return None;
        }
        let row_len = region.width * self.depth;
        let mut out = Vec::with_capacity(row_len * region.height);
        for row in 0..region.height {
            let start = ((region.y + row) * self.width + region.x) * self.depth;
            out.extend_from_slice(&self.data[start..start + row_len]);
        }
        Some(out)
    }
}
