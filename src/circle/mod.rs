//
// circlecmp - Circle detection and center-aligned image comparison
// Copyright (c) 2020 Filip Szczerek <ga.software@yahoo.com>
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Circle center and radius estimation from an edge mask.
//!

use cgmath::Vector2;
use crate::image::{Image, PixelFormat};

pub mod annotate;
pub mod edges;
pub mod table;

pub use edges::{detect_edges, EdgeDetectionParams};
pub use table::{CircleInfoTable, CircleStatistics};

/// Binary edge map.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeMask {
    width: u32,
    height: u32,
    edges: Vec<bool>
}

impl EdgeMask {
    /// Creates a mask with no edges.
    pub fn new(width: u32, height: u32) -> EdgeMask {
        EdgeMask{ width, height, edges: vec![false; width as usize * height as usize] }
    }

    /// Returns a `Mono8` image with edges white (255) and everything else black.
    pub fn to_image(&self) -> Image {
        Image::new_from_pixels(
            self.width,
            self.height,
            PixelFormat::Mono8,
            self.edges.iter().map(|&e| if e { 0xFF } else { 0 }).collect::<Vec<u8>>()
        )
    }

    pub fn is_edge(&self, x: u32, y: u32) -> bool {
        self.edges[(x + y * self.width) as usize]
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().filter(|&&e| e).count()
    }

    /// Returns the first edge pixel in the `(x, y)` visiting order.
    fn find_first<I: Iterator<Item=(u32, u32)>>(&self, order: I) -> Option<Vector2<i32>> {
        order
            .filter(|&(x, y)| self.is_edge(x, y))
            .map(|(x, y)| Vector2{ x: x as i32, y: y as i32 })
            .next()
    }

    /// Rows top to bottom, each row left to right.
    pub fn topmost(&self) -> Option<Vector2<i32>> {
        let w = self.width;
        self.find_first((0..self.height).flat_map(move |y| (0..w).map(move |x| (x, y))))
    }

    /// Rows bottom to top, each row left to right.
    pub fn bottommost(&self) -> Option<Vector2<i32>> {
        let w = self.width;
        self.find_first((0..self.height).rev().flat_map(move |y| (0..w).map(move |x| (x, y))))
    }

    /// Columns left to right, each column top to bottom.
    pub fn leftmost(&self) -> Option<Vector2<i32>> {
        let h = self.height;
        self.find_first((0..self.width).flat_map(move |x| (0..h).map(move |y| (x, y))))
    }

    /// Columns right to left, each column top to bottom.
    pub fn rightmost(&self) -> Option<Vector2<i32>> {
        let h = self.height;
        self.find_first((0..self.width).rev().flat_map(move |x| (0..h).map(move |y| (x, y))))
    }
}

#[cfg(test)]
impl EdgeMask {
    /// Every non-zero pixel of a `Mono8` image is an edge.
    pub fn from_image(image: &Image) -> EdgeMask {
        assert!(image.pixel_format() == PixelFormat::Mono8);
        EdgeMask{
            width: image.width(),
            height: image.height(),
            edges: image.pixels::<u8>().iter().map(|&v| v != 0).collect()
        }
    }

    pub fn set(&mut self, x: u32, y: u32, edge: bool) {
        self.edges[(x + y * self.width) as usize] = edge;
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, strum_macros::EnumIter)]
pub enum RadiusRounding {
    /// Horizontal and vertical half-extents are floored separately, then their average is floored.
    PerAxis,
    /// Single floor of the averaged half-extents.
    Final
}

impl RadiusRounding {
    pub fn name(self) -> &'static str {
        match self {
            RadiusRounding::PerAxis => "per-axis",
            RadiusRounding::Final   => "final"
        }
    }
}

impl Default for RadiusRounding {
    fn default() -> RadiusRounding { RadiusRounding::PerAxis }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CircleEstimate {
    pub center: Vector2<i32>,
    pub radius: i32
}

/// First edge pixels found from each direction.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ExtremalPoints {
    pub top: Vector2<i32>,
    pub bottom: Vector2<i32>,
    pub left: Vector2<i32>,
    pub right: Vector2<i32>
}

impl ExtremalPoints {
    /// Returns `None` if the mask has no edges.
    pub fn find(edges: &EdgeMask) -> Option<ExtremalPoints> {
        Some(ExtremalPoints{
            top: edges.topmost()?,
            bottom: edges.bottommost()?,
            left: edges.leftmost()?,
            right: edges.rightmost()?
        })
    }
}

/// Estimates the circle from the bounding extent of all edge pixels.
///
/// Assumes the circle is the only edge feature in the mask; any other edges (noise, background objects)
/// move the extremal points. Returns `None` if no edges were found.
///
pub fn estimate(edges: &EdgeMask, rounding: RadiusRounding) -> Option<CircleEstimate> {
    let ExtremalPoints{ top, bottom, left, right } = ExtremalPoints::find(edges)?;

    // all differences are non-negative, so `/` is floor division
    let center = Vector2{ x: (left.x + right.x) / 2, y: (top.y + bottom.y) / 2 };

    let width = right.x - left.x;
    let height = bottom.y - top.y;
    let radius = match rounding {
        RadiusRounding::PerAxis => (width / 2 + height / 2) / 2,
        RadiusRounding::Final => (width + height) / 4
    };

    Some(CircleEstimate{ center, radius })
}
