// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP server configuration
//!
//! This module defines the structures for configuring the network side of
//! the Modbus TCP server.

use serde::{Deserialize, Serialize};

/// Configuration for the Modbus TCP server component.
///
/// # Fields
///
/// * `address` - Network address the server binds to (default: 127.0.0.1)
/// * `port` - TCP port number (default: 502)
/// * `idle_timeout_secs` - Seconds of silence before a session is closed, 0 disables it (default: 300)
/// * `max_connections` - Maximum number of concurrent sessions (default: 32)
///
/// # Example
///
/// ```
/// use frc_modbus_server::config::ModbusConfig;
///
/// let modbus_config = ModbusConfig {
///     address: "0.0.0.0".to_string(),
///     port: 5020,
///     ..Default::default()
/// };
/// assert_eq!(modbus_config.max_connections, 32);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModbusConfig {
    /// The network address the Modbus server will bind to.
    ///
    /// Can be an IPv4/IPv6 address or "localhost". Use "0.0.0.0" to listen
    /// on every IPv4 interface of the robot controller.
    pub address: String,

    /// The TCP port the Modbus server will listen on.
    ///
    /// Default value is 502, the standard Modbus TCP port. Binding it usually
    /// requires elevated privileges; port 0 picks an ephemeral port.
    pub port: u16,

    /// Seconds a client may stay silent between two requests.
    pub idle_timeout_secs: u64,

    /// Maximum number of simultaneously connected clients.
    pub max_connections: usize,
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 502,
            idle_timeout_secs: 300,
            max_connections: 32,
        }
    }
}

impl ModbusConfig {
    /// `address:port` string suitable for binding, with IPv6 literals bracketed.
    pub fn bind_address(&self) -> String {
        if self.address.contains(':') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }
}
