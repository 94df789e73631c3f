//
// circlecmp - Circle detection and center-aligned image comparison
// Copyright (c) 2020 Filip Szczerek <ga.software@yahoo.com>
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Edge detection: grayscale conversion, Gaussian blur and Canny edge detector.
//!

use crate::circle::EdgeMask;
use crate::image::{Image, PixelFormat};
use crate::image::filter::gaussian_blur;

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeDetectionParams {
    /// Size (odd) of the square Gaussian kernel.
    pub blur_kernel_size: usize,
    pub blur_sigma: f32,
    /// Gradient magnitudes above this value extend existing edges.
    pub low_threshold: f32,
    /// Gradient magnitudes above this value start new edges.
    pub high_threshold: f32
}

impl Default for EdgeDetectionParams {
    fn default() -> EdgeDetectionParams {
        EdgeDetectionParams {
            blur_kernel_size: 9,
            blur_sigma: 2.0,
            low_threshold: 50.0,
            high_threshold: 150.0
        }
    }
}

/// Returns the edge mask of an image of any pixel format.
pub fn detect_edges(image: &Image, params: &EdgeDetectionParams) -> EdgeMask {
    let blurred = gaussian_blur(
        &image.convert_pix_fmt(PixelFormat::Mono8).convert_pix_fmt(PixelFormat::Mono32f),
        params.blur_kernel_size,
        params.blur_sigma
    ).convert_pix_fmt(PixelFormat::Mono8);

    canny(&blurred, params.low_threshold, params.high_threshold)
}

#[derive(Copy, Clone, PartialEq)]
enum Candidate {
    None,
    Weak,
    Strong
}

/// tan(22.5°) in 17.15 fixed point.
const TG22: i64 = 13573;

/// Canny edge detector (3x3 Sobel, L1 gradient magnitude). Image must be `PixelFormat::Mono8`.
pub fn canny(image: &Image, low_threshold: f32, high_threshold: f32) -> EdgeMask {
    assert!(image.pixel_format() == PixelFormat::Mono8);
    assert!(low_threshold <= high_threshold);

    let width = image.width() as usize;
    let height = image.height() as usize;
    let mut mask = EdgeMask::new(image.width(), image.height());
    if width == 0 || height == 0 {
        return mask;
    }

    let (grad_x, grad_y) = sobel(image);
    let magnitude: Vec<i32> = grad_x.iter().zip(grad_y.iter()).map(|(gx, gy)| gx.abs() + gy.abs()).collect();

    // magnitude outside the image is 0
    let mag_at = |x: isize, y: isize| -> i32 {
        if x < 0 || y < 0 || x >= width as isize || y >= height as isize {
            0
        } else {
            magnitude[x as usize + y as usize * width]
        }
    };

    // non-maximum suppression along the gradient direction (quantized to 4 sectors)
    let mut candidates = vec![Candidate::None; width * height];
    let mut stack: Vec<usize> = vec![];
    for y in 0..height as isize {
        for x in 0..width as isize {
            let i = x as usize + y as usize * width;
            let m = magnitude[i];
            if m as f32 <= low_threshold {
                continue;
            }

            let gx = grad_x[i];
            let gy = grad_y[i];
            let ax = gx.abs() as i64;
            let ay_shifted = (gy.abs() as i64) << 15;
            let tg22x = ax * TG22;
            let tg67x = tg22x + (ax << 16);

            let is_local_max = if ay_shifted < tg22x {
                m > mag_at(x - 1, y) && m >= mag_at(x + 1, y)
            } else if ay_shifted > tg67x {
                m > mag_at(x, y - 1) && m >= mag_at(x, y + 1)
            } else {
                let s = if (gx ^ gy) < 0 { -1 } else { 1 };
                m > mag_at(x - s, y - 1) && m > mag_at(x + s, y + 1)
            };

            if is_local_max {
                if m as f32 > high_threshold {
                    candidates[i] = Candidate::Strong;
                    stack.push(i);
                } else {
                    candidates[i] = Candidate::Weak;
                }
            }
        }
    }

    // hysteresis: grow strong edges into 8-connected weak ones
    for &i in &stack {
        mask.edges[i] = true;
    }
    while let Some(i) = stack.pop() {
        let x = (i % width) as isize;
        let y = (i / width) as isize;
        for dy in -1..=1 {
            for dx in -1..=1 {
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0 || ny < 0 || nx >= width as isize || ny >= height as isize {
                    continue;
                }
                let n = nx as usize + ny as usize * width;
                if candidates[n] == Candidate::Weak && !mask.edges[n] {
                    mask.edges[n] = true;
                    stack.push(n);
                }
            }
        }
    }

    mask
}

/// Returns horizontal and vertical 3x3 Sobel derivatives; border pixels are replicated.
fn sobel(image: &Image) -> (Vec<i32>, Vec<i32>) {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let pixels = image.pixels::<u8>();
    let vals_per_line = image.values_per_line::<u8>();

    let value = |x: isize, y: isize| -> i32 {
        let x = x.max(0).min(width as isize - 1) as usize;
        let y = y.max(0).min(height as isize - 1) as usize;
        pixels[x + y * vals_per_line] as i32
    };

    let mut grad_x = vec![0i32; width * height];
    let mut grad_y = vec![0i32; width * height];
    for y in 0..height as isize {
        for x in 0..width as isize {
            let i = x as usize + y as usize * width;
            grad_x[i] = value(x + 1, y - 1) + 2 * value(x + 1, y) + value(x + 1, y + 1)
                      - value(x - 1, y - 1) - 2 * value(x - 1, y) - value(x - 1, y + 1);
            grad_y[i] = value(x - 1, y + 1) + 2 * value(x, y + 1) + value(x + 1, y + 1)
                      - value(x - 1, y - 1) - 2 * value(x, y - 1) - value(x + 1, y - 1);
        }
    }

    (grad_x, grad_y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circle::{estimate, RadiusRounding};

    /// Returns an `RGB8` image with a white disk on black background.
    fn disk_image(size: u32, center: (i32, i32), radius: i32) -> Image {
        let mut image = Image::new(size, size, PixelFormat::RGB8);
        for y in 0..size {
            for x in 0..size {
                if (x as i32 - center.0).pow(2) + (y as i32 - center.1).pow(2) <= radius.pow(2) {
                    image.pixel_mut::<u8>(x, y).copy_from_slice(&[0xFF, 0xFF, 0xFF]);
                }
            }
        }
        image
    }

    #[test]
    fn given_uniform_image_no_edges() {
        let image = Image::new_from_pixels(16, 16, PixelFormat::Mono8, vec![120u8; 256]);
        assert_eq!(0, detect_edges(&image, &EdgeDetectionParams::default()).edge_count());
    }

    #[test]
    fn given_vertical_step_sobel_responds_horizontally() {
        let mut values = vec![0u8; 36];
        for y in 0..6 { for x in 3..6 { values[x + y * 6] = 100; } }
        let (gx, gy) = sobel(&Image::new_from_pixels(6, 6, PixelFormat::Mono8, values));

        assert_eq!(400, gx[2 + 2 * 6]);
        assert_eq!(400, gx[3 + 2 * 6]);
        assert_eq!(0, gx[0 + 2 * 6]);
        assert!(gy.iter().all(|&v| v == 0));
    }

    #[test]
    fn given_ramp_sobel_replicates_border() {
        let (gx, gy) = sobel(&Image::new_from_pixels(3, 1, PixelFormat::Mono8, vec![10u8, 20, 50]));

        // outside pixels repeat the nearest ones: (20 - 10) * 4 and (50 - 20) * 4
        assert_eq!(vec![40, 160, 120], gx);
        assert_eq!(vec![0, 0, 0], gy);
    }

    #[test]
    fn given_vertical_step_canny_finds_thin_line() {
        let mut values = vec![0u8; 64];
        for y in 0..8 { for x in 4..8 { values[x + y * 8] = 200; } }
        let mask = canny(&Image::new_from_pixels(8, 8, PixelFormat::Mono8, values), 50.0, 150.0);

        for y in 0..8 {
            let row: Vec<u32> = (0..8).filter(|&x| mask.is_edge(x, y)).collect();
            assert_eq!(vec![3], row);
        }
    }

    #[test]
    fn given_weak_gradient_only_no_edges() {
        let mut values = vec![0u8; 64];
        for y in 0..8 { for x in 4..8 { values[x + y * 8] = 20; } }
        // |gx| = 80: above the low threshold, but nothing reaches the high one
        let mask = canny(&Image::new_from_pixels(8, 8, PixelFormat::Mono8, values), 50.0, 150.0);
        assert_eq!(0, mask.edge_count());
    }

    #[test]
    fn given_disk_estimate_center_and_radius() {
        let image = disk_image(41, (20, 20), 10);
        let mask = detect_edges(&image, &EdgeDetectionParams::default());
        let circle = estimate(&mask, RadiusRounding::PerAxis).unwrap();

        assert!((circle.center.x - 20).abs() <= 1, "{:?}", circle);
        assert!((circle.center.y - 20).abs() <= 1, "{:?}", circle);
        assert!((circle.radius - 10).abs() <= 2, "{:?}", circle);
    }
}
