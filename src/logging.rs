//
// circlecmp - Circle detection and center-aligned image comparison
// Copyright (c) 2020 Filip Szczerek <ga.software@yahoo.com>
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Logger struct.
//!

#[derive(Copy, Clone, Debug, strum_macros::EnumIter, PartialEq)]
pub enum Level {
    Quiet,
    Info,
    Verbose
}

impl Level {
    pub fn name(self) -> &'static str {
        match self {
            Level::Quiet   => "quiet",
            Level::Info    => "info",
            Level::Verbose => "verbose"
        }
    }
}

pub struct Logger {
    level: Level
}

impl Logger {
    pub fn new(level: Level) -> Logger { Logger{ level } }

    pub fn info(&self, msg: &str) {
        if self.enabled(Level::Info) {
            println!("{}", msg);
        }
    }

    pub fn verbose(&self, msg: &str) {
        if self.enabled(Level::Verbose) {
            println!("{}", msg);
        }
    }

    /// Printed to stderr regardless of the level.
    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg);
    }

    fn enabled(&self, level: Level) -> bool {
        self.level as i32 >= level as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_quiet_level_info_is_disabled() {
        let logger = Logger::new(Level::Quiet);
        assert!(!logger.enabled(Level::Info));
        assert!(!logger.enabled(Level::Verbose));
    }

    #[test]
    fn given_verbose_level_all_enabled() {
        let logger = Logger::new(Level::Verbose);
        assert!(logger.enabled(Level::Info));
        assert!(logger.enabled(Level::Verbose));
    }
}
