//
// circlecmp - Circle detection and center-aligned image comparison
// Copyright (c) 2020 Filip Szczerek <ga.software@yahoo.com>
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Image data structure, I/O and basic operations.
//!

pub mod filter;
pub mod point;

pub use point::Point;
use std::path::{Path, PathBuf};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FileType {
    /// Determined automatically from file name extension
    Auto,
    Png,
    Jpeg,
    Bmp
}

/// Extensions accepted as input images (lower case).
pub const INPUT_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

fn file_type_from_ext(file_name: &Path) -> Result<FileType, ImageError> {
    match file_name.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => match ext.to_lowercase().as_str() {
            "png" => Ok(FileType::Png),
            "jpg" | "jpeg" => Ok(FileType::Jpeg),
            "bmp" => Ok(FileType::Bmp),
            _ => Err(ImageError::UnsupportedFileType(file_name.to_path_buf()))
        },
        None => Err(ImageError::UnsupportedFileType(file_name.to_path_buf()))
    }
}

fn resolve_file_type(file_name: &Path, file_type: FileType) -> Result<::image::ImageFormat, ImageError> {
    let ftype = if file_type == FileType::Auto { file_type_from_ext(file_name)? } else { file_type };
    match ftype {
        FileType::Png => Ok(::image::ImageFormat::Png),
        FileType::Jpeg => Ok(::image::ImageFormat::Jpeg),
        FileType::Bmp => Ok(::image::ImageFormat::Bmp),
        FileType::Auto => unreachable!()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PixelFormat {
    Mono8,
    /// Channel order: R, G, B.
    RGB8,
    /// Values from 0.0 (black) to 1.0 (white).
    Mono32f
}

pub fn num_channels(pix_fmt: PixelFormat) -> usize {
    match pix_fmt {
        PixelFormat::Mono8 | PixelFormat::Mono32f => 1,
        PixelFormat::RGB8 => 3
    }
}

/// Pixel storage; the variant is determined by the pixel format.
#[derive(Clone, Debug)]
pub enum PixelData {
    U8(Vec<u8>),
    F32(Vec<f32>)
}

/// Type of pixel values (in each channel).
pub trait PixelValue: Copy + Default + Send + Sync + 'static {
    fn belongs_to(pix_fmt: PixelFormat) -> bool;
    fn slice(data: &PixelData) -> Option<&[Self]>;
    fn slice_mut(data: &mut PixelData) -> Option<&mut [Self]>;
    fn wrap(values: Vec<Self>) -> PixelData;
}

impl PixelValue for u8 {
    fn belongs_to(pix_fmt: PixelFormat) -> bool {
        pix_fmt == PixelFormat::Mono8 || pix_fmt == PixelFormat::RGB8
    }

    fn slice(data: &PixelData) -> Option<&[u8]> {
        match data { PixelData::U8(values) => Some(values), _ => None }
    }

    fn slice_mut(data: &mut PixelData) -> Option<&mut [u8]> {
        match data { PixelData::U8(values) => Some(values), _ => None }
    }

    fn wrap(values: Vec<u8>) -> PixelData { PixelData::U8(values) }
}

impl PixelValue for f32 {
    fn belongs_to(pix_fmt: PixelFormat) -> bool { pix_fmt == PixelFormat::Mono32f }

    fn slice(data: &PixelData) -> Option<&[f32]> {
        match data { PixelData::F32(values) => Some(values), _ => None }
    }

    fn slice_mut(data: &mut PixelData) -> Option<&mut [f32]> {
        match data { PixelData::F32(values) => Some(values), _ => None }
    }

    fn wrap(values: Vec<f32>) -> PixelData { PixelData::F32(values) }
}

/// Asserts that `T` is the type of pixel values (in each channel) corresponding to `pix_fmt`.
fn verify_pix_type<T: PixelValue>(pix_fmt: PixelFormat) {
    assert!(T::belongs_to(pix_fmt), "Pixel value type does not match pixel format {:?}.", pix_fmt);
}

#[derive(Debug)]
pub enum ImageError {
    Decode { file: PathBuf, source: ::image::ImageError },
    Encode { file: PathBuf, source: ::image::ImageError },
    UnsupportedFileType(PathBuf)
}

impl std::fmt::Display for ImageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageError::Decode{ file, source } => write!(f, "cannot read image {}: {}", file.display(), source),
            ImageError::Encode{ file, source } => write!(f, "cannot save image {}: {}", file.display(), source),
            ImageError::UnsupportedFileType(file) => write!(f, "unsupported image file type: {}", file.display())
        }
    }
}

impl std::error::Error for ImageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImageError::Decode{ source, .. } | ImageError::Encode{ source, .. } => Some(source),
            ImageError::UnsupportedFileType(_) => None
        }
    }
}

#[derive(Clone)]
pub struct Image {
    width: u32,
    height: u32,
    pix_fmt: PixelFormat,
    pixels: PixelData
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Image {}x{}, {:?}", self.width, self.height, self.pix_fmt)
    }
}

impl Image {
    /// Loads an image as `RGB8`; grayscale and alpha inputs are expanded/dropped accordingly.
    pub fn load<P: AsRef<Path>>(file_name: P, file_type: FileType) -> Result<Image, ImageError> {
        let path = file_name.as_ref();
        let format = resolve_file_type(path, file_type)?;

        let mut reader = ::image::ImageReader::open(path)
            .map_err(|e| ImageError::Decode{ file: path.to_path_buf(), source: ::image::ImageError::IoError(e) })?;
        reader.set_format(format);
        let decoded = reader.decode().map_err(|e| ImageError::Decode{ file: path.to_path_buf(), source: e })?;

        let rgb = decoded.to_rgb8();
        let (width, height) = rgb.dimensions();

        Ok(Image::new_from_pixels(width, height, PixelFormat::RGB8, rgb.into_raw()))
    }

    /// Overwrites existing file. `Mono32f` images are saved as `Mono8`.
    pub fn save<P: AsRef<Path>>(&self, file_name: P, file_type: FileType) -> Result<(), ImageError> {
        let path = file_name.as_ref();
        let format = resolve_file_type(path, file_type)?;

        let color_type = match self.pix_fmt {
            PixelFormat::Mono8 => ::image::ColorType::L8,
            PixelFormat::RGB8 => ::image::ColorType::Rgb8,
            PixelFormat::Mono32f => return self.convert_pix_fmt(PixelFormat::Mono8).save(path, file_type)
        };

        ::image::save_buffer_with_format(path, self.pixels::<u8>(), self.width, self.height, color_type, format)
            .map_err(|e| ImageError::Encode{ file: path.to_path_buf(), source: e })
    }

    /// Creates a new zero-filled image.
    pub fn new(width: u32, height: u32, pix_fmt: PixelFormat) -> Image {
        let len = width as usize * height as usize * num_channels(pix_fmt);
        let pixels = match pix_fmt {
            PixelFormat::Mono8 | PixelFormat::RGB8 => PixelData::U8(vec![0; len]),
            PixelFormat::Mono32f => PixelData::F32(vec![0.0; len])
        };

        Image{ width, height, pix_fmt, pixels }
    }

    /// Creates a new image using the specified storage.
    ///
    /// `pixels` must contain exactly `width`*`height`*channels values, without row padding.
    ///
    pub fn new_from_pixels<T: PixelValue>(width: u32, height: u32, pix_fmt: PixelFormat, pixels: Vec<T>) -> Image {
        verify_pix_type::<T>(pix_fmt);
        assert!(pixels.len() == width as usize * height as usize * num_channels(pix_fmt));

        Image{ width, height, pix_fmt, pixels: T::wrap(pixels) }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pix_fmt
    }

    /// Returns channel values per line.
    pub fn values_per_line<T: PixelValue>(&self) -> usize {
        verify_pix_type::<T>(self.pix_fmt);
        self.width as usize * num_channels(self.pix_fmt)
    }

    /// `T` must correspond to the image's pixel format.
    pub fn pixels<T: PixelValue>(&self) -> &[T] {
        verify_pix_type::<T>(self.pix_fmt);
        match T::slice(&self.pixels) {
            Some(values) => values,
            None => unreachable!()
        }
    }

    /// `T` must correspond to the image's pixel format.
    pub fn pixels_mut<T: PixelValue>(&mut self) -> &mut [T] {
        verify_pix_type::<T>(self.pix_fmt);
        match T::slice_mut(&mut self.pixels) {
            Some(values) => values,
            None => unreachable!()
        }
    }

    pub fn line<T: PixelValue>(&self, y: u32) -> &[T] {
        let vals_per_line = self.values_per_line::<T>();
        &self.pixels::<T>()[y as usize * vals_per_line .. (y + 1) as usize * vals_per_line]
    }

    pub fn line_mut<T: PixelValue>(&mut self, y: u32) -> &mut [T] {
        let vals_per_line = self.values_per_line::<T>();
        &mut self.pixels_mut::<T>()[y as usize * vals_per_line .. (y + 1) as usize * vals_per_line]
    }

    /// Returns the channel values of pixel (`x`, `y`).
    #[cfg(test)]
    pub fn pixel<T: PixelValue>(&self, x: u32, y: u32) -> &[T] {
        let nch = num_channels(self.pix_fmt);
        &self.line::<T>(y)[x as usize * nch .. (x as usize + 1) * nch]
    }

    pub fn pixel_mut<T: PixelValue>(&mut self, x: u32, y: u32) -> &mut [T] {
        let nch = num_channels(self.pix_fmt);
        &mut self.line_mut::<T>(y)[x as usize * nch .. (x as usize + 1) * nch]
    }

    pub fn contains(&self, p: &Point) -> bool {
        p.x >= 0 && p.y >= 0 && p.x < self.width as i32 && p.y < self.height as i32
    }

    /// Returns a copy of the image converted to `dest_pix_fmt`.
    pub fn convert_pix_fmt(&self, dest_pix_fmt: PixelFormat) -> Image {
        if dest_pix_fmt == self.pix_fmt {
            return self.clone();
        }

        match (self.pix_fmt, dest_pix_fmt) {
            (PixelFormat::RGB8, PixelFormat::Mono8) => {
                // fixed-point ITU-R BT.601 luma
                let values = self.pixels::<u8>().chunks_exact(3).map(|rgb| {
                    ((rgb[0] as u32 * 4899 + rgb[1] as u32 * 9617 + rgb[2] as u32 * 1868 + (1 << 13)) >> 14) as u8
                }).collect();
                Image::new_from_pixels(self.width, self.height, PixelFormat::Mono8, values)
            },

            (PixelFormat::Mono8, PixelFormat::RGB8) => {
                let values = self.pixels::<u8>().iter().flat_map(|&v| [v, v, v]).collect();
                Image::new_from_pixels(self.width, self.height, PixelFormat::RGB8, values)
            },

            (PixelFormat::Mono8, PixelFormat::Mono32f) => {
                let values = self.pixels::<u8>().iter().map(|&v| v as f32 / 0xFF as f32).collect();
                Image::new_from_pixels(self.width, self.height, PixelFormat::Mono32f, values)
            },

            (PixelFormat::Mono32f, PixelFormat::Mono8) => {
                let values = self.pixels::<f32>().iter()
                    .map(|&v| (v * 0xFF as f32).round().max(0.0).min(0xFF as f32) as u8)
                    .collect();
                Image::new_from_pixels(self.width, self.height, PixelFormat::Mono8, values)
            },

            (PixelFormat::RGB8, PixelFormat::Mono32f) =>
                self.convert_pix_fmt(PixelFormat::Mono8).convert_pix_fmt(PixelFormat::Mono32f),

            (PixelFormat::Mono32f, PixelFormat::RGB8) =>
                self.convert_pix_fmt(PixelFormat::Mono8).convert_pix_fmt(PixelFormat::RGB8),

            _ => unreachable!()
        }
    }

    /// Copies (with cropping or padding) a fragment of image to another. There is no scaling.
    ///
    /// Pixel formats of source and destination must be the same.
    /// The fragment to copy is `width`x`height` pixels and starts at `src_pos` in `&self`
    /// and at `dest_pos` at `dest_img`. If `clear_to_zero` is true, `dest_img`'s areas not copied on
    /// will be cleared to zero.
    ///
    pub fn resize_and_translate_into(
        &self,
        dest_img: &mut Image,
        src_pos: Point,
        width: u32,
        height: u32,
        dest_pos: Point,
        clear_to_zero: bool
    ) {
        assert!(self.pix_fmt == dest_img.pix_fmt);

        if clear_to_zero {
            match &mut dest_img.pixels {
                PixelData::U8(values) => values.iter_mut().for_each(|v| *v = 0),
                PixelData::F32(values) => values.iter_mut().for_each(|v| *v = 0.0)
            }
        }

        // Start and end (exclusive) of the destination area, clipped to both images
        let dest_x_start = dest_pos.x.max(dest_pos.x - src_pos.x).max(0);
        let dest_y_start = dest_pos.y.max(dest_pos.y - src_pos.y).max(0);
        let dest_x_end = (dest_pos.x + width as i32)
            .min(dest_pos.x - src_pos.x + self.width as i32)
            .min(dest_img.width as i32);
        let dest_y_end = (dest_pos.y + height as i32)
            .min(dest_pos.y - src_pos.y + self.height as i32)
            .min(dest_img.height as i32);

        if dest_x_end <= dest_x_start || dest_y_end <= dest_y_start {
            // Nothing to copy
            return;
        }

        let nch = num_channels(self.pix_fmt);
        let span = (dest_x_start as usize * nch, (dest_x_end - dest_x_start) as usize * nch);
        let src_x_ofs = (dest_x_start - dest_pos.x + src_pos.x) as usize * nch;

        // Copy the pixels line by line
        for dest_y in dest_y_start..dest_y_end {
            let src_y = (dest_y - dest_pos.y + src_pos.y) as u32;
            match self.pix_fmt {
                PixelFormat::Mono8 | PixelFormat::RGB8 => copy_span(
                    &self.line::<u8>(src_y)[src_x_ofs..], dest_img.line_mut::<u8>(dest_y as u32), span
                ),
                PixelFormat::Mono32f => copy_span(
                    &self.line::<f32>(src_y)[src_x_ofs..], dest_img.line_mut::<f32>(dest_y as u32), span
                )
            }
        }
    }
}

/// Copies `span.1` values from the start of `src` to `dest[span.0..]`.
fn copy_span<T: PixelValue>(src: &[T], dest: &mut [T], span: (usize, usize)) {
    let (dest_ofs, len) = span;
    dest[dest_ofs..dest_ofs + len].copy_from_slice(&src[..len]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono8_from(width: u32, height: u32, values: &[u8]) -> Image {
        Image::new_from_pixels(width, height, PixelFormat::Mono8, values.to_vec())
    }

    #[test]
    fn given_positive_offset_translate_with_zero_fill() {
        let src = mono8_from(3, 2, &[1, 2, 3,
                                     4, 5, 6]);
        let mut dest = Image::new(3, 2, PixelFormat::Mono8);
        src.resize_and_translate_into(&mut dest, Point::zero(), 3, 2, Point{ x: 1, y: 1 }, true);

        assert_eq!(&[0, 0, 0,
                     0, 1, 2], dest.pixels::<u8>());
    }

    #[test]
    fn given_negative_offset_translate_with_zero_fill() {
        let src = mono8_from(3, 2, &[1, 2, 3,
                                     4, 5, 6]);
        let mut dest = Image::new(3, 2, PixelFormat::Mono8);
        src.resize_and_translate_into(&mut dest, Point::zero(), 3, 2, Point{ x: -2, y: 0 }, true);

        assert_eq!(&[3, 0, 0,
                     6, 0, 0], dest.pixels::<u8>());
    }

    #[test]
    fn when_translated_out_of_bounds_all_zero() {
        let src = mono8_from(2, 2, &[9, 9, 9, 9]);
        let mut dest = mono8_from(2, 2, &[7, 7, 7, 7]);
        src.resize_and_translate_into(&mut dest, Point::zero(), 2, 2, Point{ x: 5, y: -5 }, true);

        assert!(dest.pixels::<u8>().iter().all(|&v| v == 0));
    }

    #[test]
    fn given_rgb8_translate_whole_pixels() {
        let src = Image::new_from_pixels(2, 1, PixelFormat::RGB8, vec![1u8, 2, 3, 4, 5, 6]);
        let mut dest = Image::new(2, 1, PixelFormat::RGB8);
        src.resize_and_translate_into(&mut dest, Point::zero(), 2, 1, Point{ x: 1, y: 0 }, true);

        assert_eq!(&[0, 0, 0, 1, 2, 3], dest.pixels::<u8>());
    }

    #[test]
    fn given_gray_rgb_convert_to_same_mono_value() {
        let rgb = Image::new_from_pixels(2, 1, PixelFormat::RGB8, vec![200u8, 200, 200, 0, 0, 0]);
        let mono = rgb.convert_pix_fmt(PixelFormat::Mono8);

        assert_eq!(&[200, 0], mono.pixels::<u8>());
    }

    #[test]
    fn given_mono8_convert_to_mono32f_and_back() {
        let mono = mono8_from(3, 1, &[0, 128, 255]);
        let back = mono.convert_pix_fmt(PixelFormat::Mono32f).convert_pix_fmt(PixelFormat::Mono8);

        assert_eq!(mono.pixels::<u8>(), back.pixels::<u8>());
    }

    #[test]
    #[should_panic]
    fn when_pixel_type_mismatched_fail() {
        let mono = Image::new(1, 1, PixelFormat::Mono8);
        let _ = mono.pixels::<f32>();
    }

    #[test]
    fn given_unknown_extension_fail() {
        let result = Image::new(1, 1, PixelFormat::Mono8).save("image.xyz", FileType::Auto);
        assert!(matches!(result, Err(ImageError::UnsupportedFileType(_))));
    }

    #[test]
    fn given_png_save_and_load() {
        let dir = std::env::temp_dir().join(format!("circlecmp-image-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("rgb.png");

        let rgb = Image::new_from_pixels(2, 1, PixelFormat::RGB8, vec![10u8, 20, 30, 40, 50, 60]);
        rgb.save(&file, FileType::Auto).unwrap();
        let loaded = Image::load(&file, FileType::Auto).unwrap();

        assert_eq!(rgb.pixels::<u8>(), loaded.pixels::<u8>());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
