//
// circlecmp - Circle detection and center-aligned image comparison
// Copyright (c) 2020 Filip Szczerek <ga.software@yahoo.com>
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Center alignment of image pairs and difference metrics.
//!

use cgmath::Vector2;
use crate::image::{Image, PixelFormat, Point};

const MAX_PIXEL_VALUE: f64 = 255.0;

/// Difference metrics of an aligned pair.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PairMetrics {
    /// Mean squared difference over all pixel values (all channels).
    pub mse: f64,
    pub rmse: f64,
    /// Mean absolute difference.
    pub mae: f64,
    /// Peak signal-to-noise ratio in dB; `f64::INFINITY` for identical images.
    pub psnr: f64,
    /// Percentage of pixel values which differ.
    pub diff_percentage: f64,
    /// Mean absolute difference per channel: red, green, blue.
    pub channel_diff: [f64; 3]
}

/// Translates `candidate` by whole pixels so that `candidate_center` lands on `base_center`.
///
/// Returns (aligned candidate, absolute difference between `base` and the aligned candidate). Both have the size
/// and pixel format of `base`; areas not covered by the candidate are zero.
///
/// `base` must be `Mono8` or `RGB8`; `candidate` is converted to the pixel format of `base` if needed.
///
pub fn align(
    base: &Image,
    candidate: &Image,
    base_center: &Vector2<i32>,
    candidate_center: &Vector2<i32>
) -> (Image, Image) {
    assert!(base.pixel_format() == PixelFormat::Mono8 || base.pixel_format() == PixelFormat::RGB8);

    let converted;
    let candidate = if candidate.pixel_format() != base.pixel_format() {
        converted = candidate.convert_pix_fmt(base.pixel_format());
        &converted
    } else {
        candidate
    };

    let shift = Point::from(*base_center - *candidate_center);

    let mut aligned = Image::new(base.width(), base.height(), base.pixel_format());
    candidate.resize_and_translate_into(
        &mut aligned,
        Point::zero(),
        candidate.width(),
        candidate.height(),
        shift,
        true
    );

    let diff_values: Vec<u8> = base.pixels::<u8>().iter()
        .zip(aligned.pixels::<u8>().iter())
        .map(|(&b, &a)| if b > a { b - a } else { a - b })
        .collect();
    let diff = Image::new_from_pixels(base.width(), base.height(), base.pixel_format(), diff_values);

    (aligned, diff)
}

/// Computes metrics of the pair (`base`, `aligned`) whose absolute difference is `diff`.
///
/// All images must have the same size and pixel format (`Mono8` or `RGB8`).
///
pub fn metrics(base: &Image, aligned: &Image, diff: &Image) -> PairMetrics {
    assert!(base.width() == aligned.width() && base.height() == aligned.height());
    assert!(base.pixel_format() == aligned.pixel_format() && base.pixel_format() == diff.pixel_format());

    let values = diff.pixels::<u8>();
    if values.is_empty() {
        return PairMetrics{
            mse: 0.0, rmse: 0.0, mae: 0.0, psnr: f64::INFINITY, diff_percentage: 0.0, channel_diff: [0.0; 3]
        };
    }

    let count = values.len() as f64;
    let mut sum_sq = 0.0;
    let mut sum_abs = 0.0;
    let mut num_nonzero = 0usize;
    for &v in values {
        let v = v as f64;
        sum_sq += v * v;
        sum_abs += v;
        if v != 0.0 { num_nonzero += 1; }
    }

    let mse = sum_sq / count;
    let psnr = if mse == 0.0 { f64::INFINITY } else { 20.0 * (MAX_PIXEL_VALUE / mse.sqrt()).log10() };

    PairMetrics{
        mse,
        rmse: mse.sqrt(),
        mae: sum_abs / count,
        psnr,
        diff_percentage: num_nonzero as f64 / count * 100.0,
        channel_diff: channel_means(diff)
    }
}

/// Returns mean values per channel (red, green, blue); single channel mean is replicated.
fn channel_means(image: &Image) -> [f64; 3] {
    let values = image.pixels::<u8>();
    match image.pixel_format() {
        PixelFormat::RGB8 => {
            let mut sums = [0.0f64; 3];
            for rgb in values.chunks_exact(3) {
                for ch in 0..3 { sums[ch] += rgb[ch] as f64; }
            }
            let num_pixels = (values.len() / 3) as f64;
            [sums[0] / num_pixels, sums[1] / num_pixels, sums[2] / num_pixels]
        },

        _ => {
            let mean = values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64;
            [mean; 3]
        }
    }
}
