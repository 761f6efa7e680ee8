//! Single-instance lock over a loopback TCP port.
//!
//! The first launch binds `127.0.0.1:<port>` and keeps listening.  A later
//! launch finds the port taken, connects, sends `focus`, and exits; the first
//! instance turns that into [`HostEvent::SecondInstance`] and shows its
//! window.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::orchestrator::{HostEvent, HostEventSender};

/// Default loopback port for the lock.
pub const DEFAULT_INSTANCE_PORT: u16 = 47615;

const FOCUS_REQUEST: &str = "focus";
const PEER_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Error type for the single-instance lock.
#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("failed to bind single-instance lock on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("port {addr} is taken but the running instance did not answer: {source}")]
    Handoff {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Outcome of [`acquire`].
#[derive(Debug)]
pub enum InstanceRole {
    /// This process is the only instance and holds the lock.
    Primary(InstanceLock),
    /// Another instance is running and has been asked to show its window.
    Secondary,
}

/// The held lock.  Dropping it releases the port.
#[derive(Debug)]
pub struct InstanceLock {
    listener: TcpListener,
}

/// Takes the lock on `port`, or hands off to the instance holding it.
///
/// # Errors
///
/// [`InstanceError::Bind`] if the port cannot be bound for a reason other
/// than being in use; [`InstanceError::Handoff`] if it is in use but the
/// holder cannot be reached.
pub async fn acquire(port: u16) -> Result<InstanceRole, InstanceError> {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    match TcpListener::bind(addr).await {
        Ok(listener) => {
            debug!(%addr, "single-instance lock acquired");
            Ok(InstanceRole::Primary(InstanceLock { listener }))
        }
        Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
            hand_off(addr)
                .await
                .map_err(|source| InstanceError::Handoff { addr, source })?;
            info!(%addr, "another instance is running; asked it to show its window");
            Ok(InstanceRole::Secondary)
        }
        Err(source) => Err(InstanceError::Bind { addr, source }),
    }
}

async fn hand_off(addr: SocketAddr) -> io::Result<()> {
    let mut stream = TcpStream::connect(addr).await?;
    stream
        .write_all(format!("{FOCUS_REQUEST}\n").as_bytes())
        .await?;
    stream.shutdown().await
}

impl InstanceLock {
    /// Address the lock is listening on.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Answers later launches until the host event channel closes.
    pub fn serve(self, events: HostEventSender) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = events.closed() => break,
                    accepted = self.listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            debug!(%peer, "single-instance connection");
                            tokio::spawn(handle_peer(stream, events.clone()));
                        }
                        Err(e) => warn!("single-instance accept failed: {e}"),
                    },
                }
            }
        })
    }
}

async fn handle_peer(stream: TcpStream, events: HostEventSender) {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    match tokio::time::timeout(PEER_READ_TIMEOUT, reader.read_line(&mut line)).await {
        Ok(Ok(_)) if line.trim() == FOCUS_REQUEST => {
            // The loop being gone means we are shutting down anyway.
            let _ = events.send(HostEvent::SecondInstance);
        }
        Ok(Ok(_)) => debug!(request = line.trim(), "ignoring unknown single-instance request"),
        Ok(Err(e)) => debug!("single-instance peer read failed: {e}"),
        Err(_) => debug!("single-instance peer timed out"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::orchestrator::host_channel;

    async fn primary_on_free_port() -> (InstanceLock, u16) {
        match acquire(0).await.unwrap() {
            InstanceRole::Primary(lock) => {
                let port = lock.local_addr().unwrap().port();
                (lock, port)
            }
            InstanceRole::Secondary => panic!("port 0 is never taken"),
        }
    }

    #[tokio::test]
    async fn test_second_acquire_hands_off_to_primary() {
        // Arrange
        let (lock, port) = primary_on_free_port().await;
        let (tx, mut rx) = host_channel();
        let _server = lock.serve(tx);

        // Act
        let role = acquire(port).await.unwrap();

        // Assert
        assert!(matches!(role, InstanceRole::Secondary));
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for hand-off")
            .expect("channel closed");
        assert!(matches!(event, HostEvent::SecondInstance));
    }

    #[tokio::test]
    async fn test_unknown_request_is_ignored() {
        let (lock, port) = primary_on_free_port().await;
        let (tx, mut rx) = host_channel();
        let _server = lock.serve(tx);

        let mut stream = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await.unwrap();
        stream.write_all(b"hello\n").await.unwrap();
        stream.shutdown().await.unwrap();

        let result = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
        assert!(result.is_err(), "no host event expected");
    }

    #[tokio::test]
    async fn test_serve_stops_when_event_loop_is_gone() {
        let (lock, _port) = primary_on_free_port().await;
        let (tx, rx) = host_channel();
        let server = lock.serve(tx);

        drop(rx);

        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server should stop")
            .unwrap();
    }
}
