//
// circlecmp - Circle detection and center-aligned image comparison
// Copyright (c) 2020 Filip Szczerek <ga.software@yahoo.com>
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Command-line options definitions and parsing.
//!

use crate::circle::{EdgeDetectionParams, RadiusRounding};
use crate::logging;
use std::collections::HashMap;
use strum::IntoEnumIterator;

#[derive(Copy, Clone, Debug, PartialEq, strum_macros::EnumIter)]
pub enum ModeOfOperation {
    /// Detect circles and write `circle_info.json`.
    Circles,
    /// Compare images using a previously written `circle_info.json`.
    Compare,
    /// `Circles`, then `Compare`.
    All
}

impl ModeOfOperation {
    pub fn name(self) -> &'static str {
        match self {
            ModeOfOperation::Circles => "circles",
            ModeOfOperation::Compare => "compare",
            ModeOfOperation::All     => "all"
        }
    }
}

pub mod cmdline {
    pub const HELP:              &str = "help";
    pub const MODE_OF_OPERATION: &str = "mode";
    pub const INPUT_DIRECTORY:   &str = "input_dir";
    pub const OUTPUT_DIRECTORY:  &str = "output_dir";
    pub const SAVE_ARTIFACTS:    &str = "save_artifacts";
    pub const BLUR:              &str = "blur";
    pub const EDGE_THRESHOLDS:   &str = "edge_thresholds";
    pub const RADIUS_ROUNDING:   &str = "radius_rounding";
    pub const USER:              &str = "user";
    pub const TIMESTAMP:         &str = "timestamp";
    pub const LOG_LEVEL:         &str = "log_level";
}

const DEFAULT_INPUT_DIR: &str = "image";
const DEFAULT_OUTPUT_DIR: &str = "output";

/// Who started the run and when; only reported, never used in computations.
#[derive(Clone, Debug, PartialEq)]
pub struct RunMetadata {
    pub user: String,
    pub timestamp: String
}

impl RunMetadata {
    /// Uses the `USER` environment variable and the current local time.
    pub fn current() -> RunMetadata {
        RunMetadata{
            user: std::env::var("USER").unwrap_or_else(|_| "unknown".to_string()),
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
        }
    }
}

#[derive(Debug)]
pub struct Configuration {
    mode: ModeOfOperation,
    input_dir: String,
    output_dir: String,
    save_artifacts: bool,
    edge_detection: EdgeDetectionParams,
    radius_rounding: RadiusRounding,
    run_metadata: RunMetadata,
    log_level: logging::Level
}

impl Configuration {
    pub fn mode(&self) -> ModeOfOperation { self.mode }
    pub fn input_dir(&self) -> &str { &self.input_dir }
    pub fn output_dir(&self) -> &str { &self.output_dir }
    pub fn save_artifacts(&self) -> bool { self.save_artifacts }
    pub fn edge_detection(&self) -> &EdgeDetectionParams { &self.edge_detection }
    pub fn radius_rounding(&self) -> RadiusRounding { self.radius_rounding }
    pub fn run_metadata(&self) -> &RunMetadata { &self.run_metadata }
    pub fn log_level(&self) -> logging::Level { self.log_level }
}

impl std::str::FromStr for logging::Level {
    type Err = ();
    fn from_str(s: &str) -> Result<logging::Level, ()> {
        logging::Level::iter().find(|level| s == level.name()).ok_or(())
    }
}

impl std::str::FromStr for RadiusRounding {
    type Err = ();
    fn from_str(s: &str) -> Result<RadiusRounding, ()> {
        RadiusRounding::iter().find(|r| s == r.name()).ok_or(())
    }
}

impl std::str::FromStr for ModeOfOperation {
    type Err = ();
    fn from_str(s: &str) -> Result<ModeOfOperation, ()> {
        ModeOfOperation::iter().find(|m| s == m.name()).ok_or(())
    }
}

pub fn print_help() {
    let defaults = EdgeDetectionParams::default();

    println!(
r#"Command-line options:

  --{} <mode>

    Mode of operation. Possible values:

        {:8}    detect circles in the input images and save their centers and radii
        {:8}    compare center-aligned image pairs and select the best reference image
                    (requires circle information saved by a previous run)
        {:8}    both of the above


    --{} <directory>

      Directory with input images (*.png, *.jpg, *.jpeg). Default: "{}".


    --{} <directory>

      Output directory. Default: "{}".


    --{} <yes|no>

      Whether to save edge masks, annotated, aligned and difference images. Default: yes.


    --{} <kernel size> <sigma>

      Gaussian blur applied before edge detection. Kernel size must be odd. Default: {} {:.1}.


    --{} <low> <high>

      Thresholds of the edge detector. Default: {} {}.


    --{} <{}|{}>

      Rounding of the estimated radius: floor each half-extent first, or floor once at the end.
      Default: {}.


    --{} <name>

      User name shown in the run information. Default: value of the USER environment variable.


    --{} <text>

      Timestamp shown in the run information. Default: current local time.


    --{} <{}|{}|{}>

      Chooses the amount of messages to print during processing.

"#,
        cmdline::MODE_OF_OPERATION,
        ModeOfOperation::Circles.name(),
        ModeOfOperation::Compare.name(),
        ModeOfOperation::All.name(),

        cmdline::INPUT_DIRECTORY, DEFAULT_INPUT_DIR,

        cmdline::OUTPUT_DIRECTORY, DEFAULT_OUTPUT_DIR,

        cmdline::SAVE_ARTIFACTS,

        cmdline::BLUR, defaults.blur_kernel_size, defaults.blur_sigma,

        cmdline::EDGE_THRESHOLDS, defaults.low_threshold, defaults.high_threshold,

        cmdline::RADIUS_ROUNDING,
        RadiusRounding::PerAxis.name(),
        RadiusRounding::Final.name(),
        RadiusRounding::default().name(),

        cmdline::USER,

        cmdline::TIMESTAMP,

        cmdline::LOG_LEVEL,
        logging::Level::Quiet.name(),
        logging::Level::Info.name(),
        logging::Level::Verbose.name()
    );
}

/// Returns the value of a single-valued option of type `T`.
fn get_option_value<T: std::str::FromStr>(
    option: &str,
    option_values: &HashMap::<String, Vec<String>>
) -> Result<Option<T>, ()> {
    match option_values.get(option) {
        None => Ok(None),
        Some(vals) => if vals.is_empty() {
            eprintln!("Value missing for option {}.", option);
            Err(())
        } else if vals.len() > 1 {
            eprintln!("Too many values for option {}.", option);
            Err(())
        } else {
            match vals[0].parse::<T>() {
                Ok(value) => Ok(Some(value)),
                Err(_) => {
                    eprintln!("Invalid value for option {}: {}.", option, vals[0]);
                    Err(())
                }
            }
        }
    }
}

/// Returns the values of an option which takes two values of types `T1`, `T2`.
fn get_option_value_pair<T1: std::str::FromStr, T2: std::str::FromStr>(
    option: &str,
    option_values: &HashMap::<String, Vec<String>>
) -> Result<Option<(T1, T2)>, ()> {
    match option_values.get(option) {
        None => Ok(None),
        Some(vals) => if vals.len() != 2 {
            eprintln!("Expected 2 values for option {}, got {}.", option, vals.len());
            Err(())
        } else {
            match (vals[0].parse::<T1>(), vals[1].parse::<T2>()) {
                (Ok(v1), Ok(v2)) => Ok(Some((v1, v2))),
                _ => {
                    eprintln!("Invalid values for option {}: {} {}.", option, vals[0], vals[1]);
                    Err(())
                }
            }
        }
    }
}

/// Returns Ok(None) if help was requested.
pub fn parse_command_line<I: Iterator<Item=String>>(stream: I) -> Result<Option<Configuration>, ()> {
    let allowed_options = vec![
     cmdline::HELP,
     cmdline::MODE_OF_OPERATION,
     cmdline::INPUT_DIRECTORY,
     cmdline::OUTPUT_DIRECTORY,
     cmdline::SAVE_ARTIFACTS,
     cmdline::BLUR,
     cmdline::EDGE_THRESHOLDS,
     cmdline::RADIUS_ROUNDING,
     cmdline::USER,
     cmdline::TIMESTAMP,
     cmdline::LOG_LEVEL
    ];

    // key: option name
    let mut option_values = HashMap::<String, Vec<String>>::new();

    let mut current: Option<&mut Vec<String>> = None;

    for arg in stream.skip(1) /*skip the binary name*/ {
        if arg.starts_with("--") {
            match &arg[2..] {
                cmdline::HELP => { print_help(); return Ok(None); },
                x if !allowed_options.contains(&x) => {
                    eprintln!("Unknown command-line option: {}.", x); return Err(());
                },
                opt => current = Some(option_values.entry(opt.to_string()).or_insert(vec![])),
            }
        } else {
            match current.as_mut() {
                Some(values) => values.push(arg),
                None => { eprintln!("Unexpected value: {}.", arg); return Err(()); }
            }
        }
    }

    let mode = match get_option_value::<String>(cmdline::MODE_OF_OPERATION, &option_values)? {
        None => { eprintln!("Mode not specified."); return Err(()); },
        Some(name) => match name.parse::<ModeOfOperation>() {
            Ok(mode) => mode,
            Err(_) => {
                eprintln!("Invalid mode of operation: {}. Expected one of: {}, {}, {}.",
                    name,
                    ModeOfOperation::Circles.name(),
                    ModeOfOperation::Compare.name(),
                    ModeOfOperation::All.name()
                );
                return Err(());
            }
        }
    };

    let input_dir = get_option_value::<String>(cmdline::INPUT_DIRECTORY, &option_values)?
        .unwrap_or_else(|| DEFAULT_INPUT_DIR.to_string());

    let output_dir = get_option_value::<String>(cmdline::OUTPUT_DIRECTORY, &option_values)?
        .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string());

    let save_artifacts = match get_option_value::<String>(cmdline::SAVE_ARTIFACTS, &option_values)? {
        None => true,
        Some(value) => match value.as_str() {
            "yes" => true,
            "no" => false,
            _ => {
                eprintln!("Invalid value for option {}: {}.", cmdline::SAVE_ARTIFACTS, value);
                return Err(());
            }
        }
    };

    let mut edge_detection = EdgeDetectionParams::default();

    if let Some((kernel_size, sigma)) = get_option_value_pair::<usize, f32>(cmdline::BLUR, &option_values)? {
        if kernel_size % 2 == 0 || !(sigma > 0.0) {
            eprintln!("Invalid blur parameters: {} {}. Kernel size must be odd and sigma positive.", kernel_size, sigma);
            return Err(());
        }
        edge_detection.blur_kernel_size = kernel_size;
        edge_detection.blur_sigma = sigma;
    }

    if let Some((low, high)) = get_option_value_pair::<f32, f32>(cmdline::EDGE_THRESHOLDS, &option_values)? {
        if !(low >= 0.0) || !(high >= low) {
            eprintln!("Invalid edge thresholds: {} {}. Expected 0 <= low <= high.", low, high);
            return Err(());
        }
        edge_detection.low_threshold = low;
        edge_detection.high_threshold = high;
    }

    let radius_rounding = get_option_value::<RadiusRounding>(cmdline::RADIUS_ROUNDING, &option_values)?
        .unwrap_or_default();

    let mut run_metadata = RunMetadata::current();
    if let Some(user) = get_option_value::<String>(cmdline::USER, &option_values)? {
        run_metadata.user = user;
    }
    if let Some(timestamp) = get_option_value::<String>(cmdline::TIMESTAMP, &option_values)? {
        run_metadata.timestamp = timestamp;
    }

    let log_level = get_option_value::<logging::Level>(cmdline::LOG_LEVEL, &option_values)?
        .unwrap_or(logging::Level::Info);

    Ok(Some(Configuration{
        mode,
        input_dir,
        output_dir,
        save_artifacts,
        edge_detection,
        radius_rounding,
        run_metadata,
        log_level
    }))
}
