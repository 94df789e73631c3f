//
// circlecmp - Circle detection and center-aligned image comparison
// Copyright (c) 2020 Filip Szczerek <ga.software@yahoo.com>
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Marking the detected circle on a copy of the input image.
//!

use cgmath::Vector2;
use crate::circle::CircleEstimate;
use crate::image::{Image, PixelFormat, Point};

const OUTLINE_COLOR: [u8; 3] = [0, 0xFF, 0];
const OUTLINE_THICKNESS: u32 = 2;
const CENTER_COLOR: [u8; 3] = [0xFF, 0, 0];
const CENTER_DOT_RADIUS: i32 = 3;

const LABEL_COLOR: [u8; 3] = [0, 0xFF, 0];
/// Glyph cells are drawn as squares of this size.
const LABEL_SCALE: i32 = 2;
/// Top-left corners of the "Center" and "Radius" lines.
const LABEL_POSITIONS: [Vector2<i32>; 2] = [Vector2{ x: 10, y: 16 }, Vector2{ x: 10, y: 46 }];

const GLYPH_WIDTH: i32 = 5;
const GLYPH_HEIGHT: i32 = 7;

/// Returns an `RGB8` copy of `image` with the circle outlined, its center marked and center/radius labels
/// in the top-left corner.
#[must_use]
pub fn annotate(image: &Image, circle: &CircleEstimate) -> Image {
    let mut result = image.convert_pix_fmt(PixelFormat::RGB8);

    let radius = circle.radius.max(0) as u32;
    for r in (0..OUTLINE_THICKNESS).filter_map(|i| radius.checked_sub(i)) {
        for p in rasterize_circle(r) {
            put_pixel(&mut result, &(circle.center + p), &OUTLINE_COLOR);
        }
    }

    for dy in -CENTER_DOT_RADIUS..=CENTER_DOT_RADIUS {
        for dx in -CENTER_DOT_RADIUS..=CENTER_DOT_RADIUS {
            if dx.pow(2) + dy.pow(2) <= CENTER_DOT_RADIUS.pow(2) {
                put_pixel(&mut result, &(circle.center + Vector2{ x: dx, y: dy }), &CENTER_COLOR);
            }
        }
    }

    let labels = [
        format!("Center: ({}, {})", circle.center.x, circle.center.y),
        format!("Radius: {}", circle.radius)
    ];
    for (text, pos) in labels.iter().zip(LABEL_POSITIONS.iter()) {
        draw_text(&mut result, text, *pos, &LABEL_COLOR);
    }

    result
}

/// Draws `text` with its top-left corner at `pos`; characters without a glyph are left blank.
fn draw_text(image: &mut Image, text: &str, pos: Vector2<i32>, color: &[u8; 3]) {
    for (i, c) in text.chars().enumerate() {
        let rows = match glyph(c) {
            Some(rows) => rows,
            None => continue
        };
        let origin = pos + Vector2{ x: i as i32 * (GLYPH_WIDTH + 1) * LABEL_SCALE, y: 0 };
        for (gy, row) in rows.iter().enumerate() {
            for gx in 0..GLYPH_WIDTH {
                if row & (1 << (GLYPH_WIDTH - 1 - gx)) == 0 {
                    continue;
                }
                for sy in 0..LABEL_SCALE {
                    for sx in 0..LABEL_SCALE {
                        let offset = Vector2{ x: gx * LABEL_SCALE + sx, y: gy as i32 * LABEL_SCALE + sy };
                        put_pixel(image, &(origin + offset), color);
                    }
                }
            }
        }
    }
}

/// 5x7 glyphs of the characters used in labels; bit 4 of each row is the leftmost column.
fn glyph(c: char) -> Option<[u8; GLYPH_HEIGHT as usize]> {
    Some(match c {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'a' => [0x00, 0x00, 0x0E, 0x01, 0x0F, 0x11, 0x0F],
        'd' => [0x01, 0x01, 0x0D, 0x13, 0x11, 0x11, 0x0F],
        'e' => [0x00, 0x00, 0x0E, 0x11, 0x1F, 0x10, 0x0E],
        'i' => [0x04, 0x00, 0x0C, 0x04, 0x04, 0x04, 0x0E],
        'n' => [0x00, 0x00, 0x16, 0x19, 0x11, 0x11, 0x11],
        'r' => [0x00, 0x00, 0x16, 0x19, 0x10, 0x10, 0x10],
        's' => [0x00, 0x00, 0x0E, 0x10, 0x0E, 0x01, 0x1E],
        't' => [0x08, 0x08, 0x1C, 0x08, 0x08, 0x09, 0x06],
        'u' => [0x00, 0x00, 0x11, 0x11, 0x11, 0x13, 0x0D],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '(' => [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02],
        ')' => [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08],
        ',' => [0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        _ => return None
    })
}

/// Points outside the image are ignored.
fn put_pixel(image: &mut Image, pos: &Vector2<i32>, color: &[u8; 3]) {
    if image.contains(&Point::from(*pos)) {
        image.pixel_mut::<u8>(pos.x as u32, pos.y as u32).copy_from_slice(color);
    }
}

// Returns circle points clockwise (in a right-handed coordinate system), starting from the leftmost point.
fn rasterize_circle(radius: u32) -> Vec<Vector2<i32>> {
    let mut octant = vec![];

    let mut point = Vector2{ x: -(radius as i32), y: 0 };

    // Is `Some` if the point having x=y belongs to the circle.
    let mut diagonal_point: Option<Vector2<i32>> = None;

    while -point.x > point.y {
        point.x += 1;
        point.y += 1;
        if point.x.pow(2) + point.y.pow(2) < radius.pow(2) as i32 {
            point.x -= 1;
        }
        if point.x.abs() == point.y.abs() {
            diagonal_point = Some(point);
        } else {
            octant.push(point);
        }
    }

    let mut points = vec![];

    points.push(Vector2{ x: -(radius as i32), y: 0 });
    points.extend_from_slice(&octant);
    if let Some(p) = diagonal_point { points.push(p); }
    points.extend(octant.iter().rev().map(|p| Vector2{ x: -p.y, y: -p.x }));
    points.push(Vector2{ x: 0, y: radius as i32 });
    points.extend(octant.iter().map(|p| Vector2{ x: p.y, y: -p.x }));
    if let Some(p) = diagonal_point { points.push(Vector2{ x: -p.x, y: p.y }); }
    points.extend(octant.iter().rev().map(|p| Vector2{ x: -p.x, y: p.y }));
    points.push(Vector2{ x: radius as i32, y: 0 });
    points.extend(octant.iter().map(|p| Vector2{ x: -p.x, y: -p.y }));
    if let Some(p) = diagonal_point { points.push(Vector2{ x: -p.x, y: -p.y }); }
    points.extend(octant.iter().rev().map(|p| Vector2{ x: p.y, y: p.x }));
    points.push(Vector2{ x: 0, y: -(radius as i32) });
    points.extend(octant.iter().map(|p| Vector2{ x: -p.y, y: p.x }));
    if let Some(p) = diagonal_point { points.push(Vector2{ x: p.x, y: -p.y }); }
    points.extend(octant.iter().rev().map(|p| Vector2{ x: p.x, y: -p.y }));

    points
}
