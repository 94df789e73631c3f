//
// circlecmp - Circle detection and center-aligned image comparison
// Copyright (c) 2020 Filip Szczerek <ga.software@yahoo.com>
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Entry point and main functions of the `circlecmp` executable.
//!

mod args;
mod circle;
mod compare;
mod image;
mod logging;
mod report;
mod utils;

use args::{Configuration, ModeOfOperation};
use circle::CircleInfoTable;
use crate::image::{FileType, Image};
use logging::Logger;
use report::ReportError;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;

const VERSION_STRING: &'static str = include_str!(concat!(env!("OUT_DIR"), "/version"));

/// Subdirectory of the output directory for annotated input images.
const PROCESSED_SUBDIR: &str = "processed";
/// Subdirectory of the output directory for aligned and difference images.
const COMPARE_SUBDIR: &str = "compare";

fn print_header() {
    println!(r#"
_________________

   {}
   Circle detection and center-aligned image comparison

   Copyright © 2020 Filip Szczerek <ga.software@yahoo.com>

   This program is licensed under MIT license (see LICENSE for details).

_________________
"#,
        VERSION_STRING
    );
}

/// Saves an artifact; failures are logged and do not stop processing.
fn save_artifact(image: &Image, path: &Path, logger: &Logger) {
    match image.save(path, FileType::Auto) {
        Ok(()) => logger.verbose(&format!("saved: {}", path.display())),
        Err(e) => logger.error(&format!("Failed to save artifact: {}", e))
    }
}

fn detect_circles(config: &Configuration, logger: &Logger) -> Result<(), Box<dyn Error>> {
    let input_dir = Path::new(config.input_dir());
    let output_dir = Path::new(config.output_dir());
    let processed_dir = output_dir.join(PROCESSED_SUBDIR);

    if !input_dir.is_dir() {
        return Err(format!("input directory not found: {}", input_dir.display()).into());
    }
    let file_names = utils::list_input_images(input_dir)
        .map_err(|e| format!("cannot list input directory {}: {}", input_dir.display(), e))?;

    utils::ensure_dir(output_dir).map_err(|e| format!("cannot create {}: {}", output_dir.display(), e))?;
    if config.save_artifacts() {
        utils::ensure_dir(&processed_dir).map_err(|e| format!("cannot create {}: {}", processed_dir.display(), e))?;
    }

    logger.info(&format!("Detecting circles in {} image(s)...\n", file_names.len()));

    let mut entries = BTreeMap::new();
    for file_name in &file_names {
        let image = match Image::load(input_dir.join(file_name), FileType::Auto) {
            Ok(image) => image,
            Err(e) => { logger.error(&format!("Skipping {}: {}", file_name, e)); continue; }
        };

        logger.verbose(&format!("processing: {} ({}x{})", file_name, image.width(), image.height()));

        let edges = circle::detect_edges(&image, config.edge_detection());
        logger.verbose(&format!("edge pixels: {}", edges.edge_count()));
        match circle::estimate(&edges, config.radius_rounding()) {
            Some(found) => {
                report::log_circle(logger, file_name, &found);
                if config.save_artifacts() {
                    save_artifact(&edges.to_image(), &output_dir.join(format!("edges_{}", file_name)), logger);
                    save_artifact(&circle::annotate::annotate(&image, &found), &processed_dir.join(file_name), logger);
                }
                entries.insert(file_name.clone(), found);
            },
            None => logger.info(&format!("{}: no circle found", file_name))
        }
    }

    let table = CircleInfoTable::new(entries);
    if table.is_empty() {
        logger.info("\nNo circles found.");
    } else {
        logger.info(&format!("\nCircle found in {} of {} image(s).", table.len(), file_names.len()));
    }
    if let Some(stats) = table.aggregate() {
        report::log_statistics(logger, stats);
    }

    let info_file = output_dir.join(report::CIRCLE_INFO_FILE);
    report::save_circle_info(&info_file, &table)?;
    logger.info(&format!("\nCircle information saved to {}.", info_file.display()));

    Ok(())
}

fn compare_images(config: &Configuration, logger: &Logger) -> Result<(), Box<dyn Error>> {
    let input_dir = Path::new(config.input_dir());
    let output_dir = Path::new(config.output_dir());
    let compare_dir = output_dir.join(COMPARE_SUBDIR);

    if !input_dir.is_dir() {
        return Err(format!("input directory not found: {}", input_dir.display()).into());
    }

    let table = match report::load_circle_info(&output_dir.join(report::CIRCLE_INFO_FILE)) {
        Err(ReportError::MissingFile(file)) => return Err(format!(
            "{} not found; run with --{} {} first", file.display(),
            args::cmdline::MODE_OF_OPERATION, ModeOfOperation::Circles.name()
        ).into()),
        other => other?
    };

    if config.save_artifacts() {
        utils::ensure_dir(&compare_dir).map_err(|e| format!("cannot create {}: {}", compare_dir.display(), e))?;
    }

    let mut images = BTreeMap::new();
    for id in table.entries().keys() {
        match Image::load(input_dir.join(id), FileType::Auto) {
            Ok(image) => { images.insert(id.clone(), image); },
            Err(e) => logger.error(&format!("Skipping {}: {}", id, e))
        }
    }

    let artifact_handler = |file_name: &str, image: &Image| {
        save_artifact(image, &compare_dir.join(file_name), logger);
    };

    let result = compare::compare(
        &images,
        &table,
        if config.save_artifacts() { Some(artifact_handler) } else { None },
        logger
    )?;

    report::log_analysis(logger, &result);

    let analysis_file = output_dir.join(report::ANALYSIS_FILE);
    report::save_analysis(&analysis_file, &result)?;
    logger.info(&format!("\nAnalysis saved to {}.", analysis_file.display()));

    Ok(())
}

fn run_program() -> bool {
    print_header();
    println!();

    let config = match args::parse_command_line(std::env::args()) {
        Ok(config) => match config {
            None => return true, // help was requested
            Some(config) => config
        },
        Err(_) => { println!("\nUse --{} for more information.\n", args::cmdline::HELP); return false; }
    };

    let logger = Logger::new(config.log_level());

    let metadata = config.run_metadata();
    logger.info(&format!("Started at {} by {}.\n", metadata.timestamp, metadata.user));

    let tstart = std::time::Instant::now();

    let stages: &[ModeOfOperation] = match config.mode() {
        ModeOfOperation::Circles => &[ModeOfOperation::Circles],
        ModeOfOperation::Compare => &[ModeOfOperation::Compare],
        ModeOfOperation::All => &[ModeOfOperation::Circles, ModeOfOperation::Compare]
    };

    for &stage in stages {
        let result = match stage {
            ModeOfOperation::Circles => detect_circles(&config, &logger),
            _ => compare_images(&config, &logger)
        };
        if let Err(e) = result {
            logger.error(&format!("\nError in stage \"{}\": {}", stage.name(), e));
            return false;
        }
    }

    let elapsed = tstart.elapsed();
    let mins = elapsed.as_secs() / 60;
    let secs = elapsed.as_secs() % 60;
    let frac_secs = elapsed.as_secs_f32() - (mins * 60) as f32 - secs as f32;
    logger.info(&format!("\nCompleted in {} min {:02}.{:0.0} s.", mins, secs, frac_secs * 10.0));

    true
}

fn main() {
    std::process::exit(if run_program() { 0 } else { 1 });
}
