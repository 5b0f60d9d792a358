//! Async connections over any `AsyncRead + AsyncWrite` stream.
//!
//! [`Connection::spawn`] starts one task per connection. The task reads into a
//! [`StreamAssembler`] and writes through a [`SendQueue`]; the two paths run
//! concurrently but each is sequential on its own. Application code sees
//! decoded messages and a single close notification through a
//! [`MessageHandler`].

use crate::assembler::{Arrival, StreamAssembler};
use crate::codec::AnyMessage;
use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::send_queue::SendQueue;
use crate::traits::{Message, Outbound};
use std::fmt;
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

/// Process-unique identifier of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a connection ended.
#[derive(Debug)]
pub enum CloseReason {
    /// The peer closed the stream (a zero-length read).
    PeerClosed,
    /// [`ConnectionHandle::close`] was called.
    Local,
    /// The peer sent bytes that do not decode, or a message failed to encode.
    Protocol(Error),
    /// A read or write failed.
    Transport(Error),
}

impl CloseReason {
    fn from_error(error: Error) -> Self {
        match error {
            Error::Io(_) | Error::UnexpectedEof => Self::Transport(error),
            other => Self::Protocol(other),
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::Protocol(e) | Self::Transport(e) => Some(e),
            Self::PeerClosed | Self::Local => None,
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerClosed => f.write_str("closed by peer"),
            Self::Local => f.write_str("closed locally"),
            Self::Protocol(e) => write!(f, "protocol error: {e}"),
            Self::Transport(e) => write!(f, "transport error: {e}"),
        }
    }
}

/// Receives the events of a connection.
///
/// Callbacks run on the connection's task and should not block. Replies can
/// be sent through the handle passed to `on_message`.
pub trait MessageHandler: Send + Sync + 'static {
    /// Called once, before any message of the connection is delivered.
    fn on_connected(&self, _connection: &ConnectionHandle) {}

    /// Called once per fully assembled message, in arrival order.
    fn on_message(&self, connection: &ConnectionHandle, message: AnyMessage);

    /// Called exactly once when the connection ends, for any reason.
    fn on_closed(&self, _id: ConnectionId, _reason: CloseReason) {}
}

struct Shared {
    id: ConnectionId,
    registry: Arc<Registry>,
    outgoing: mpsc::UnboundedSender<Box<dyn Outbound>>,
    shutdown: watch::Sender<bool>,
    done: watch::Sender<bool>,
    closed: AtomicBool,
}

/// Cloneable handle to a running connection.
#[derive(Clone)]
pub struct ConnectionHandle {
    shared: Arc<Shared>,
}

impl ConnectionHandle {
    pub fn id(&self) -> ConnectionId {
        self.shared.id
    }

    /// Queues `message` for sending. Messages go out in the order they were
    /// submitted.
    ///
    /// A type without a discriminator in this connection's registry is
    /// refused with `Error::UnknownType` and the connection stays open.
    pub fn send<M: Message>(&self, message: M) -> Result<()> {
        self.send_boxed(Box::new(message))
    }

    pub fn send_boxed(&self, message: Box<dyn Outbound>) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        let registered = self
            .shared
            .registry
            .by_type(message.message_type())
            .and_then(|descriptor| descriptor.discriminator())
            .is_some();
        if !registered {
            return Err(Error::UnknownType(message.message_name()));
        }
        self.shared
            .outgoing
            .send(message)
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Asks the connection to stop. Pending reads and writes are abandoned.
    pub fn close(&self) {
        self.shared.shutdown.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Waits until the connection has ended and `on_closed` has run.
    pub async fn closed(&self) {
        let mut done = self.shared.done.subscribe();
        // The sender lives in `self`, so this only fails if it was dropped.
        let _ = done.wait_for(|done| *done).await;
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.shared.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Entry point for running a connection.
pub struct Connection;

impl Connection {
    /// Starts serving `stream` on a new task and returns its handle.
    ///
    /// `handler.on_connected` runs before this returns. Must be called from
    /// within a tokio runtime.
    pub fn spawn<S, H>(
        stream: S,
        registry: Arc<Registry>,
        config: &ConnectionConfig,
        handler: Arc<H>,
    ) -> ConnectionHandle
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
        H: MessageHandler + ?Sized,
    {
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let handle = ConnectionHandle {
            shared: Arc::new(Shared {
                id: ConnectionId::next(),
                registry: registry.clone(),
                outgoing,
                shutdown: watch::Sender::new(false),
                done: watch::Sender::new(false),
                closed: AtomicBool::new(false),
            }),
        };

        let assembler = StreamAssembler::new(registry.clone(), config.receive_buffer_size);
        let queue = SendQueue::new(registry, config.send_buffer_capacity);
        debug!("Connection {} opened", handle.id());
        handler.on_connected(&handle);

        tokio::spawn(run(handle.clone(), stream, assembler, queue, outgoing_rx, handler));
        handle
    }
}

async fn run<S, H>(
    handle: ConnectionHandle,
    stream: S,
    assembler: StreamAssembler,
    queue: SendQueue,
    outgoing: mpsc::UnboundedReceiver<Box<dyn Outbound>>,
    handler: Arc<H>,
) where
    S: AsyncRead + AsyncWrite + Send + 'static,
    H: MessageHandler + ?Sized,
{
    let (reader, writer) = tokio::io::split(stream);
    let mut shutdown = handle.shared.shutdown.subscribe();

    let reason = tokio::select! {
        reason = read_loop(&handle, reader, assembler, &*handler) => reason,
        reason = write_loop(writer, queue, outgoing) => reason,
        _ = shutdown.wait_for(|stop| *stop) => CloseReason::Local,
    };

    handle.shared.closed.store(true, Ordering::Release);
    match reason.error() {
        Some(_) => warn!("Connection {} {}", handle.id(), reason),
        None => debug!("Connection {} {}", handle.id(), reason),
    }
    handler.on_closed(handle.id(), reason);
    handle.shared.done.send_replace(true);
}

async fn read_loop<R, H>(
    handle: &ConnectionHandle,
    mut reader: R,
    mut assembler: StreamAssembler,
    handler: &H,
) -> CloseReason
where
    R: AsyncRead + Unpin,
    H: MessageHandler + ?Sized,
{
    loop {
        let len = match reader.read(assembler.read_buf()).await {
            Ok(len) => len,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return CloseReason::Transport(e.into()),
        };
        match assembler.bytes_arrived(len, |message| handler.on_message(handle, message)) {
            Ok(Arrival::Open) => {}
            Ok(Arrival::Closed { discarded }) => {
                if discarded > 0 {
                    debug!(
                        "Connection {} dropped {} bytes of an unfinished frame",
                        handle.id(),
                        discarded
                    );
                }
                return CloseReason::PeerClosed;
            }
            Err(e) => return CloseReason::from_error(e),
        }
    }
}

async fn write_loop<W>(
    mut writer: W,
    mut queue: SendQueue,
    mut outgoing: mpsc::UnboundedReceiver<Box<dyn Outbound>>,
) -> CloseReason
where
    W: AsyncWrite + Unpin,
{
    match drain(&mut writer, &mut queue, &mut outgoing).await {
        Ok(()) => CloseReason::Local,
        Err(e) => {
            queue.fail();
            CloseReason::from_error(e)
        }
    }
}

/// Writes queued frames one at a time. Messages submitted while a write is
/// in flight wait in the queue behind it.
async fn drain<W>(
    writer: &mut W,
    queue: &mut SendQueue,
    outgoing: &mut mpsc::UnboundedReceiver<Box<dyn Outbound>>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = outgoing.recv().await {
        let mut frame = queue.enqueue(message)?;
        while let Some(bytes) = frame {
            writer.write_all(bytes).await?;
            while let Ok(message) = outgoing.try_recv() {
                queue.enqueue(message)?;
            }
            frame = queue.complete()?;
        }
        writer.flush().await?;
    }
    Ok(())
}
