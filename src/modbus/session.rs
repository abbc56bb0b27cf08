// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Per-connection session loop
//!
//! A session repeatedly walks through the request states
//! `AwaitingHeader → AwaitingBody → Dispatching → Responding` until the
//! client disconnects, sends a frame that cannot be delimited, or stays
//! silent longer than the idle timeout. Only the socket is owned by the
//! session; the register map is shared through the [`RequestHandler`].

use std::net::SocketAddr;
use std::time::Duration;

use log::{debug, trace};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time;

use super::frame::{FrameError, MbapHeader, MBAP_HEADER_LEN};
use super::handler::RequestHandler;

/// Reasons a session ended other than a clean client disconnect
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol decode error: {0}")]
    Decode(#[from] FrameError),

    #[error("no request received for {0:?}")]
    IdleTimeout(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingHeader,
    AwaitingBody,
    Dispatching,
    Responding,
    Closed,
}

pub struct Session<S> {
    stream: S,
    peer: SocketAddr,
    handler: RequestHandler,
    idle_timeout: Option<Duration>,
    state: SessionState,
    requests: u64,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        peer: SocketAddr,
        handler: RequestHandler,
        idle_timeout: Option<Duration>,
    ) -> Self {
        Self {
            stream,
            peer,
            handler,
            idle_timeout,
            state: SessionState::AwaitingHeader,
            requests: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Serve requests until the connection ends.
    ///
    /// Returns the number of requests answered when the client closed the
    /// connection between two frames.
    pub async fn run(mut self) -> Result<u64, SessionError> {
        let result = self.serve().await;
        self.transition(SessionState::Closed);
        result.map(|()| self.requests)
    }

    async fn serve(&mut self) -> Result<(), SessionError> {
        loop {
            self.transition(SessionState::AwaitingHeader);
            let mut header_bytes = [0u8; MBAP_HEADER_LEN];
            let received = self.read_part(&mut header_bytes).await?;
            if received == 0 {
                debug!("Client {} closed the connection", self.peer);
                return Ok(());
            }
            if received < MBAP_HEADER_LEN {
                return Err(FrameError::Truncated {
                    expected: MBAP_HEADER_LEN,
                    received,
                }
                .into());
            }
            let header = MbapHeader::decode(&header_bytes)?;

            self.transition(SessionState::AwaitingBody);
            let mut pdu = vec![0u8; header.pdu_len()];
            let received = self.read_part(&mut pdu).await?;
            if received < pdu.len() {
                return Err(FrameError::Truncated {
                    expected: pdu.len(),
                    received,
                }
                .into());
            }

            self.transition(SessionState::Dispatching);
            let response = self.handler.handle_frame(&header, &pdu);

            self.transition(SessionState::Responding);
            self.stream.write_all(&response).await?;
            self.stream.flush().await?;
            self.requests += 1;
        }
    }

    /// Fill `buf` from the socket, returning fewer bytes only on EOF.
    async fn read_part(&mut self, buf: &mut [u8]) -> Result<usize, SessionError> {
        match self.idle_timeout {
            Some(limit) => time::timeout(limit, read_full(&mut self.stream, buf))
                .await
                .map_err(|_| SessionError::IdleTimeout(limit))?
                .map_err(SessionError::from),
            None => Ok(read_full(&mut self.stream, buf).await?),
        }
    }

    fn transition(&mut self, next: SessionState) {
        trace!("Session {}: {:?} -> {:?}", self.peer, self.state, next);
        self.state = next;
    }
}

async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{BankKind, RegisterMap};
    use std::sync::Arc;
    use tokio::io::duplex;

    fn peer() -> SocketAddr {
        "127.0.0.1:50200".parse().unwrap()
    }

    fn spawn_session(
        idle_timeout: Option<Duration>,
    ) -> (
        tokio::io::DuplexStream,
        Arc<RegisterMap>,
        tokio::task::JoinHandle<Result<u64, SessionError>>,
    ) {
        let map = Arc::new(RegisterMap::default());
        let (client, server) = duplex(1024);
        let session = Session::new(
            server,
            peer(),
            RequestHandler::new(Arc::clone(&map)),
            idle_timeout,
        );
        (client, map, tokio::spawn(session.run()))
    }

    #[tokio::test]
    async fn answers_requests_until_client_closes() {
        let (mut client, map, task) = spawn_session(None);

        // write holding register 0 = 50
        client
            .write_all(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x06, 0x00, 0x00, 0x00, 0x32])
            .await
            .unwrap();
        let mut response = [0u8; 12];
        client.read_exact(&mut response).await.unwrap();
        assert_eq!(
            response,
            [0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x06, 0x00, 0x00, 0x00, 0x32]
        );

        // unsupported function code keeps the session open
        client
            .write_all(&[0x00, 0x02, 0x00, 0x00, 0x00, 0x02, 0x01, 0x07])
            .await
            .unwrap();
        let mut response = [0u8; 9];
        client.read_exact(&mut response).await.unwrap();
        assert_eq!(response, [0x00, 0x02, 0x00, 0x00, 0x00, 0x03, 0x01, 0x87, 0x01]);

        drop(client);
        assert_eq!(task.await.unwrap().unwrap(), 2);
        assert_eq!(map.read(BankKind::HoldingRegister, 0, 1).unwrap(), vec![50]);
    }

    #[tokio::test]
    async fn bad_protocol_id_closes_session() {
        let (mut client, _map, task) = spawn_session(None);
        client
            .write_all(&[0x00, 0x01, 0x00, 0x07, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x01])
            .await
            .unwrap();

        let result = task.await.unwrap();
        assert!(matches!(
            result,
            Err(SessionError::Decode(FrameError::InvalidProtocolId(7)))
        ));
    }

    #[tokio::test]
    async fn truncated_header_closes_session() {
        let (mut client, _map, task) = spawn_session(None);
        client.write_all(&[0x00, 0x01, 0x00]).await.unwrap();
        drop(client);

        let result = task.await.unwrap();
        assert!(matches!(
            result,
            Err(SessionError::Decode(FrameError::Truncated {
                expected: 7,
                received: 3
            }))
        ));
    }

    #[tokio::test]
    async fn truncated_body_closes_session() {
        let (mut client, _map, task) = spawn_session(None);
        client
            .write_all(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00])
            .await
            .unwrap();
        drop(client);

        let result = task.await.unwrap();
        assert!(matches!(
            result,
            Err(SessionError::Decode(FrameError::Truncated {
                expected: 5,
                received: 2
            }))
        ));
    }

    #[tokio::test]
    async fn idle_client_is_disconnected() {
        let (_client, _map, task) = spawn_session(Some(Duration::from_millis(50)));
        let result = time::timeout(Duration::from_secs(5), task)
            .await
            .expect("session should end on its own")
            .unwrap();
        assert!(matches!(result, Err(SessionError::IdleTimeout(_))));
    }
}
