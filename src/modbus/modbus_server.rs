// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP listener
//!
//! For avoiding confusion with the Modbus master/slave terminology, this module uses
//! the terms "server" and "client" instead. The server is the device that provides data,
//! while the client is the device that requests data.
//!
//! The listener accepts connections and spawns one independent [`Session`]
//! task per client. All sessions share the same [`RegisterMap`]; a slow or
//! silent client only ever blocks its own task.
//!
//! ## Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use frc_modbus_server::modbus::{ModbusTcpServer, ServerOptions};
//! use frc_modbus_server::RegisterMap;
//!
//! # async fn run() -> std::io::Result<()> {
//! let map = Arc::new(RegisterMap::default());
//! let server = ModbusTcpServer::bind("127.0.0.1:502", map, ServerOptions::default()).await?;
//! server.run().await;
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time;

use super::handler::RequestHandler;
use super::session::{Session, SessionError};
use crate::config::ModbusConfig;
use crate::registers::RegisterMap;

const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Resource limits applied to client sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerOptions {
    /// Close sessions that send nothing for this long (`None` disables it).
    pub idle_timeout: Option<Duration>,
    /// Maximum number of simultaneously open sessions.
    pub max_connections: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self::from(&ModbusConfig::default())
    }
}

impl From<&ModbusConfig> for ServerOptions {
    fn from(config: &ModbusConfig) -> Self {
        Self {
            idle_timeout: (config.idle_timeout_secs > 0)
                .then(|| Duration::from_secs(config.idle_timeout_secs)),
            max_connections: config.max_connections,
        }
    }
}

/// A Modbus TCP server exposing a shared [`RegisterMap`].
pub struct ModbusTcpServer {
    listener: TcpListener,
    handler: RequestHandler,
    options: ServerOptions,
    sessions: Arc<Semaphore>,
}

impl ModbusTcpServer {
    /// Bind a listener on `addr`.
    pub async fn bind<A: ToSocketAddrs>(
        addr: A,
        map: Arc<RegisterMap>,
        options: ServerOptions,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(listener, map, options))
    }

    pub fn from_listener(
        listener: TcpListener,
        map: Arc<RegisterMap>,
        options: ServerOptions,
    ) -> Self {
        Self {
            listener,
            handler: RequestHandler::new(map),
            options,
            sessions: Arc::new(Semaphore::new(options.max_connections)),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn register_map(&self) -> Arc<RegisterMap> {
        Arc::clone(self.handler.register_map())
    }

    /// Accept clients forever, one spawned session per connection.
    ///
    /// Accept failures (for instance file descriptor exhaustion) are logged
    /// and retried after a short pause. Sessions belong to this future:
    /// dropping it aborts every open session and closes its socket.
    pub async fn run(self) {
        let mut sessions = JoinSet::new();
        loop {
            let accepted = tokio::select! {
                accepted = self.listener.accept() => accepted,
                Some(_) = sessions.join_next(), if !sessions.is_empty() => continue,
            };
            let (stream, peer) = match accepted {
                Ok(connection) => connection,
                Err(err) => {
                    error!("Failed to accept Modbus connection: {}", err);
                    time::sleep(ACCEPT_RETRY_DELAY).await;
                    continue;
                }
            };

            let permit = match Arc::clone(&self.sessions).try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    warn!(
                        "Rejecting client {}: {} sessions already open",
                        peer, self.options.max_connections
                    );
                    continue;
                }
            };

            if let Err(err) = stream.set_nodelay(true) {
                debug!("Could not disable Nagle for {}: {}", peer, err);
            }
            info!("Client connected: {}", peer);

            let session = Session::new(
                stream,
                peer,
                self.handler.clone(),
                self.options.idle_timeout,
            );
            sessions.spawn(async move {
                let _permit = permit;
                match session.run().await {
                    Ok(requests) => {
                        info!("Client {} disconnected after {} request(s)", peer, requests)
                    }
                    Err(SessionError::IdleTimeout(limit)) => {
                        info!("Closing idle session with {} after {:?}", peer, limit)
                    }
                    Err(err) => warn!("Session with {} closed: {}", peer, err),
                }
            });
        }
    }
}
