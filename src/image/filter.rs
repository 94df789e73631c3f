//
// circlecmp - Circle detection and center-aligned image comparison
// Copyright (c) 2020 Filip Szczerek <ga.software@yahoo.com>
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Image filters.
//!

use crate::image::{Image, PixelFormat};

#[must_use]
pub fn gaussian_blur(image: &Image, kernel_size: usize, sigma: f32) -> Image {
    let mut result = image.clone();
    gaussian_blur_in_place(&mut result, kernel_size, sigma);
    result
}

/// Convolves with a separable `kernel_size`x`kernel_size` Gaussian kernel; borders are mirrored
/// without repeating the edge pixel (e.g. `cba|abcd|dcb` becomes `dcb|abcd|cba`, "reflect 101").
pub fn gaussian_blur_in_place(image: &mut Image, kernel_size: usize, sigma: f32) {
    assert!(image.pixel_format() == PixelFormat::Mono32f);
    assert!(kernel_size % 2 == 1);
    assert!(sigma > 0.0);

    let width = image.width() as usize;
    let height = image.height() as usize;
    if width == 0 || height == 0 {
        return;
    }

    let kernel = gaussian_kernel(kernel_size, sigma);
    let mut buffer = vec![0.0f32; width.max(height)];

    // convolve rows
    for y in 0..height {
        let line = image.line_mut::<f32>(y as u32);
        convolve_values(line, width, 1, &kernel, &mut buffer);
    }

    // convolve columns
    let vals_per_line = image.values_per_line::<f32>();
    let pixels = image.pixels_mut::<f32>();
    for x in 0..width {
        convolve_values(&mut pixels[x..], height, vals_per_line, &kernel, &mut buffer);
    }
}

/// Returns normalized Gaussian weights of length `size`, centered at `size / 2`.
#[must_use]
fn gaussian_kernel(size: usize, sigma: f32) -> Vec<f32> {
    let half = (size / 2) as f32;
    let mut kernel: Vec<f32> = (0..size)
        .map(|i| (-(i as f32 - half).powi(2) / (2.0 * sigma.powi(2))).exp())
        .collect();

    let sum: f32 = kernel.iter().sum();
    for k in kernel.iter_mut() { *k /= sum; }

    kernel
}

/// Mirrors `i` into `0..len` ("reflect 101").
pub(crate) fn reflect_101(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }

    let period = 2 * (len as isize - 1);
    let mut i = i.rem_euclid(period);
    if i >= len as isize {
        i = period - i;
    }

    i as usize
}

/// Convolves `count` values spaced by `stride` with `kernel`, in place.
fn convolve_values(values: &mut [f32], count: usize, stride: usize, kernel: &[f32], buffer: &mut [f32]) {
    let half = (kernel.len() / 2) as isize;

    for i in 0..count {
        let mut sum = 0.0;
        for (k, weight) in kernel.iter().enumerate() {
            let src = reflect_101(i as isize + k as isize - half, count);
            sum += weight * values[src * stride];
        }
        buffer[i] = sum;
    }

    for i in 0..count {
        values[i * stride] = buffer[i];
    }
}
