//
// circlecmp - Circle detection and center-aligned image comparison
// Copyright (c) 2020 Filip Szczerek <ga.software@yahoo.com>
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Utilities.
//!

use crate::image::INPUT_EXTENSIONS;
use std::path::Path;

/// Returns sorted names of input image files in `dir` (extensions are matched case-insensitively).
pub fn list_input_images<P: AsRef<Path>>(dir: P) -> Result<Vec<String>, std::io::Error> {
    let mut file_names = vec![];
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(file_name) = entry.file_name().to_str() {
            if is_input_image(file_name) {
                file_names.push(file_name.to_string());
            }
        }
    }
    file_names.sort();

    Ok(file_names)
}

fn is_input_image(file_name: &str) -> bool {
    match Path::new(file_name).extension().and_then(|ext| ext.to_str()) {
        Some(ext) => INPUT_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false
    }
}

/// Returns the file name without extension (or the whole name if there is none).
pub fn file_stem(file_name: &str) -> &str {
    Path::new(file_name).file_stem().and_then(|s| s.to_str()).unwrap_or(file_name)
}

/// Creates `dir` and its parents unless it already exists.
pub fn ensure_dir<P: AsRef<Path>>(dir: P) -> Result<(), std::io::Error> {
    std::fs::create_dir_all(dir)
}
