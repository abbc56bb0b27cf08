// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Logging configuration

use serde::{Deserialize, Serialize};

/// Accepted values for [`LoggingConfig::level`].
pub const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Log output settings.
///
/// The `RUST_LOG` environment variable takes precedence over `level`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Maximum level written (`off`, `error`, `warn`, `info`, `debug`, `trace`).
    pub level: String,

    /// Append log lines to this file instead of stderr.
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}
