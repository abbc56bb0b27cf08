// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Logger initialisation shared by the binaries
//!
//! Lines are written as `<timestamp> - <LEVEL> - <message>`. The level comes
//! from the configuration, can be overridden by `RUST_LOG`, and finally by
//! the `--verbose` / `--quiet` command line flags.

use std::fs::OpenOptions;
use std::io::Write;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::Local;
use env_logger::{Builder, Target};
use log::LevelFilter;

use crate::config::LoggingConfig;

/// Pick the command line level override from the `--verbose` / `--quiet` flags.
pub fn verbosity(verbose: bool, quiet: bool) -> Option<LevelFilter> {
    if quiet {
        Some(LevelFilter::Off)
    } else if verbose {
        Some(LevelFilter::Debug)
    } else {
        None
    }
}

/// Install the global logger.
///
/// # Errors
///
/// Fails when the configured level is unknown, the log file cannot be
/// opened, or a logger is already installed.
pub fn init_logging(config: &LoggingConfig, level_override: Option<LevelFilter>) -> Result<()> {
    let configured = LevelFilter::from_str(&config.level)
        .with_context(|| format!("Unknown log level: {}", config.level))?;

    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .filter_level(configured)
        .parse_default_env();

    if let Some(level) = level_override {
        builder.filter_level(level);
    }

    if let Some(path) = &config.file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path))?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    builder.try_init().context("Logger already initialized")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_wins_over_verbose() {
        assert_eq!(verbosity(true, true), Some(LevelFilter::Off));
        assert_eq!(verbosity(true, false), Some(LevelFilter::Debug));
        assert_eq!(verbosity(false, false), None);
    }

    #[test]
    fn unknown_level_is_rejected() {
        let config = LoggingConfig {
            level: "chatty".to_string(),
            file: None,
        };
        assert!(init_logging(&config, None).is_err());
    }
}
