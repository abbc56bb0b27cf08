// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::Config;
use crate::modbus::{ModbusTcpServer, ServerOptions};
use crate::registers::{MetadataTable, RegisterMap, MOTOR_POSITION_REGISTER};
use crate::utility::robot_simulator::{RobotSimulator, GYRO_ANGLE_INPUT_REGISTER};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns the background tasks of the server process
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    shutdown: watch::Sender<bool>,
    register_map: Option<Arc<RegisterMap>>,
    modbus_addr: Option<SocketAddr>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Daemon {
            tasks: Vec::new(),
            shutdown,
            register_map: None,
            modbus_addr: None,
        }
    }

    /// Launch all configured tasks based on configuration
    ///
    /// The listener is bound before this returns, so a port that is already
    /// in use is reported here rather than from a background task.
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        let metadata = MetadataTable::load(&config.registers.metadata_file).with_context(|| {
            format!(
                "Failed to load register metadata from {}",
                config.registers.metadata_file
            )
        })?;

        let sizes = config.registers.bank_sizes();
        for address in metadata.out_of_bounds(&sizes) {
            warn!("Metadata entry {} lies outside the configured banks", address);
        }

        let map = Arc::new(RegisterMap::with_metadata(sizes, metadata));
        self.register_map = Some(Arc::clone(&map));

        self.start_modbus_server(config, Arc::clone(&map)).await?;

        if config.simulator.enabled {
            self.start_simulator(config, map)?;
        }

        self.start_heartbeat()?;

        Ok(())
    }

    /// Bind the Modbus TCP listener and serve it in the background
    async fn start_modbus_server(&mut self, config: &Config, map: Arc<RegisterMap>) -> Result<()> {
        let bind_address = config.modbus.bind_address();
        let options = ServerOptions::from(&config.modbus);
        let server = ModbusTcpServer::bind(&bind_address, map, options)
            .await
            .with_context(|| format!("Failed to bind Modbus server on {}", bind_address))?;
        let local_addr = server.local_addr()?;
        self.modbus_addr = Some(local_addr);
        info!("Modbus TCP server listening on {}", local_addr);

        let shutdown = self.shutdown.subscribe();
        let task = tokio::spawn(async move {
            tokio::select! {
                _ = server.run() => {}
                _ = wait_for_shutdown(shutdown) => {
                    info!("Modbus TCP server stopped");
                }
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Start the robot data simulator
    fn start_simulator(&mut self, config: &Config, map: Arc<RegisterMap>) -> Result<()> {
        let sizes = map.sizes();
        if sizes.holding_registers <= MOTOR_POSITION_REGISTER as usize
            || sizes.input_registers <= GYRO_ANGLE_INPUT_REGISTER as usize
        {
            anyhow::bail!(
                "Simulator needs at least {} holding and {} input registers",
                MOTOR_POSITION_REGISTER + 1,
                GYRO_ANGLE_INPUT_REGISTER + 1
            );
        }

        let period = Duration::from_millis(config.simulator.interval_ms);
        info!("Starting robot simulator, publishing every {:?}", period);

        let mut simulator = RobotSimulator::new(config.simulator.clone());
        let mut shutdown = self.shutdown.subscribe();
        let task = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match simulator.apply(&map) {
                            Ok(data) => debug!(
                                "Simulated arm position {} gyro {:.2}",
                                data.arm_position, data.gyro_angle
                            ),
                            Err(err) => error!("Simulator failed to publish: {}", err),
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
            debug!("Robot simulator stopped");
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Start a heartbeat task that logs system status periodically
    fn start_heartbeat(&mut self) -> Result<()> {
        debug!("Starting heartbeat monitor");

        let mut shutdown = self.shutdown.subscribe();
        let addr = self.modbus_addr;
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = time::sleep(HEARTBEAT_INTERVAL) => {
                        debug!("Daemon heartbeat: serving Modbus on {:?}", addr);
                    }
                    _ = shutdown.changed() => break,
                }
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Shared register map, available once [`Daemon::launch`] succeeded.
    pub fn register_map(&self) -> Option<Arc<RegisterMap>> {
        self.register_map.clone()
    }

    /// Address the Modbus listener is bound to.
    pub fn modbus_addr(&self) -> Option<SocketAddr> {
        self.modbus_addr
    }

    /// Stop all running tasks
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.shutdown.send_replace(true);
    }

    /// Wait for all tasks to complete
    ///
    /// Tasks still running after 5 seconds are aborted.
    pub async fn join(self) -> Result<()> {
        for mut task in self.tasks {
            match time::timeout(JOIN_TIMEOUT, &mut task).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(err))) => error!("Task failed: {:#}", err),
                Ok(Err(err)) => error!("Task panicked: {}", err),
                Err(_) => {
                    warn!("Task did not stop within {:?}, aborting", JOIN_TIMEOUT);
                    task.abort();
                }
            }
        }
        Ok(())
    }
}

/// Resolves once shutdown was requested or the daemon was dropped.
async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
