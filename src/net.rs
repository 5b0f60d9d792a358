//! TCP server and client built on [`Connection`].

use crate::codec::AnyMessage;
use crate::config::ConnectionConfig;
use crate::connection::{CloseReason, Connection, ConnectionHandle, ConnectionId, MessageHandler};
use crate::error::Result;
use crate::registry::Registry;
use crate::traits::Message;
use std::collections::HashMap;
use std::io::{self, ErrorKind};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, info, warn};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

type ClientMap = Arc<Mutex<HashMap<ConnectionId, ConnectionHandle>>>;

fn lock(clients: &ClientMap) -> MutexGuard<'_, HashMap<ConnectionId, ConnectionHandle>> {
    clients.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Pause before the next accept after `error`. Failures of a single incoming
/// connection retry at once; anything else, such as running out of file
/// descriptors, waits [`ACCEPT_BACKOFF`].
fn accept_backoff(error: &io::Error) -> Duration {
    match error.kind() {
        ErrorKind::ConnectionAborted
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionRefused
        | ErrorKind::Interrupted
        | ErrorKind::WouldBlock => Duration::ZERO,
        _ => ACCEPT_BACKOFF,
    }
}

/// Keeps the server's client map in step with connection lifetimes.
struct Tracked<H: ?Sized> {
    clients: ClientMap,
    handler: Arc<H>,
}

impl<H: MessageHandler + ?Sized> MessageHandler for Tracked<H> {
    fn on_connected(&self, connection: &ConnectionHandle) {
        lock(&self.clients).insert(connection.id(), connection.clone());
        self.handler.on_connected(connection);
    }

    fn on_message(&self, connection: &ConnectionHandle, message: AnyMessage) {
        self.handler.on_message(connection, message);
    }

    fn on_closed(&self, id: ConnectionId, reason: CloseReason) {
        lock(&self.clients).remove(&id);
        self.handler.on_closed(id, reason);
    }
}

/// Accepts TCP connections and serves each with [`Connection::spawn`].
pub struct Server {
    listener: TcpListener,
    registry: Arc<Registry>,
    config: ConnectionConfig,
    clients: ClientMap,
}

impl Server {
    pub async fn bind(
        addr: impl ToSocketAddrs,
        registry: Arc<Registry>,
        config: ConnectionConfig,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            registry,
            config,
            clients: Arc::default(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until the future is dropped. Failed accepts are
    /// logged and retried.
    pub async fn run<H: MessageHandler + ?Sized>(&self, handler: Arc<H>) -> Result<()> {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    let pause = accept_backoff(&e);
                    if !pause.is_zero() {
                        tokio::time::sleep(pause).await;
                    }
                    continue;
                }
            };
            if let Err(e) = stream.set_nodelay(self.config.nodelay) {
                warn!("Could not set TCP_NODELAY for {}: {}", peer, e);
            }
            let tracked = Arc::new(Tracked {
                clients: self.clients.clone(),
                handler: handler.clone(),
            });
            let handle = Connection::spawn(stream, self.registry.clone(), &self.config, tracked);
            debug!("Accepted {} as connection {}", peer, handle.id());
        }
    }

    /// Handles of the connections currently open.
    pub fn clients(&self) -> Vec<ConnectionHandle> {
        lock(&self.clients).values().cloned().collect()
    }

    pub fn client_count(&self) -> usize {
        lock(&self.clients).len()
    }

    /// Queues a copy of `message` on every open connection and returns how
    /// many accepted it.
    pub fn broadcast<M: Message + Clone>(&self, message: &M) -> usize {
        self.clients()
            .iter()
            .filter(|client| client.send(message.clone()).is_ok())
            .count()
    }

    /// Closes every open connection.
    pub fn disconnect_all(&self) {
        for client in self.clients() {
            client.close();
        }
    }
}

/// A single outgoing TCP connection.
#[derive(Debug, Clone)]
pub struct Client {
    handle: ConnectionHandle,
    peer: SocketAddr,
}

impl Client {
    pub async fn connect<H: MessageHandler + ?Sized>(
        addr: impl ToSocketAddrs,
        registry: Arc<Registry>,
        config: &ConnectionConfig,
        handler: Arc<H>,
    ) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(config.nodelay)?;
        let peer = stream.peer_addr()?;
        let handle = Connection::spawn(stream, registry, config, handler);
        debug!("Connected to {} as connection {}", peer, handle.id());
        Ok(Self { handle, peer })
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn send<M: Message>(&self, message: M) -> Result<()> {
        self.handle.send(message)
    }

    pub fn close(&self) {
        self.handle.close();
    }

    pub async fn closed(&self) {
        self.handle.closed().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_connection_accept_errors_retry_at_once() {
        for kind in [ErrorKind::ConnectionAborted, ErrorKind::ConnectionReset] {
            assert_eq!(accept_backoff(&io::Error::from(kind)), Duration::ZERO);
        }
    }

    #[test]
    fn descriptor_exhaustion_backs_off() {
        // EMFILE
        let error = io::Error::from_raw_os_error(24);
        assert_eq!(accept_backoff(&error), ACCEPT_BACKOFF);
    }
}
