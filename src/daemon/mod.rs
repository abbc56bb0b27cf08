// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Module
//!
//! The daemon module runs and manages the background services of the
//! server process: the Modbus TCP listener, the optional robot data
//! simulator, and a heartbeat monitor.
//!
//! ## Usage
//!
//! ```no_run
//! use frc_modbus_server::{config::Config, daemon::launch_daemon::Daemon};
//!
//! async fn run() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!
//!     // Create and launch daemon
//!     let mut daemon = Daemon::new();
//!     daemon.launch(&config).await?;
//!
//!     // Wait for shutdown signal (e.g., Ctrl+C)
//!     tokio::signal::ctrl_c().await?;
//!
//!     // Clean shutdown
//!     daemon.shutdown();
//!     daemon.join().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod launch_daemon;

pub use launch_daemon::Daemon;
