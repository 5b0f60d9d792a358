//! Single-flight FIFO of outgoing messages.

use crate::codec::write_message;
use crate::error::Result;
use crate::registry::Registry;
use crate::traits::Outbound;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Serializes outgoing messages one at a time, in submission order.
///
/// At most one frame is handed to the transport at once. The returned slices
/// borrow the queue's encode buffer and stay valid until the next call.
///
/// ```rust
/// use msgsock::{message, Registry, SendQueue};
/// use std::sync::Arc;
///
/// message! {
///     pub struct Tick { pub n: u8 }
/// }
///
/// let registry = Arc::new(Registry::builder().register::<Tick>().build()?);
/// let mut queue = SendQueue::new(registry, 64);
///
/// assert_eq!(queue.enqueue(Box::new(Tick { n: 1 }))?, Some(&[0, 0, 1, 1][..]));
/// assert_eq!(queue.enqueue(Box::new(Tick { n: 2 }))?, None);
/// assert_eq!(queue.complete()?, Some(&[0, 0, 1, 2][..]));
/// assert_eq!(queue.complete()?, None);
/// assert!(!queue.is_in_flight());
/// # Ok::<(), msgsock::Error>(())
/// ```
pub struct SendQueue {
    registry: Arc<Registry>,
    pending: VecDeque<Box<dyn Outbound>>,
    buffer: Vec<u8>,
    in_flight: bool,
}

impl SendQueue {
    pub fn new(registry: Arc<Registry>, capacity: usize) -> Self {
        Self {
            registry,
            pending: VecDeque::new(),
            buffer: Vec::with_capacity(capacity),
            in_flight: false,
        }
    }

    /// Submits a message.
    ///
    /// Returns the frame to write if nothing was in flight, or `None` if the
    /// message was queued behind the current write.
    pub fn enqueue(&mut self, message: Box<dyn Outbound>) -> Result<Option<&[u8]>> {
        if self.in_flight {
            trace!(
                "Queued {} behind the write in flight ({} waiting)",
                message.message_name(),
                self.pending.len() + 1
            );
            self.pending.push_back(message);
            return Ok(None);
        }
        self.start(message.as_ref()).map(Some)
    }

    /// Reports that the frame in flight was written.
    ///
    /// Returns the next frame to write, or `None` once the queue is drained.
    /// If the next message fails to encode it is dropped and the error is
    /// returned; the queue stays in flight, so call `complete` again to move on.
    pub fn complete(&mut self) -> Result<Option<&[u8]>> {
        match self.pending.pop_front() {
            Some(next) => self.start(next.as_ref()).map(Some),
            None => {
                self.in_flight = false;
                self.buffer.clear();
                Ok(None)
            }
        }
    }

    /// Reports that the write in flight failed. Everything still queued is
    /// discarded; returns how many messages were dropped.
    pub fn fail(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        self.buffer.clear();
        self.in_flight = false;
        if dropped > 0 {
            warn!("Discarding {} queued messages after a failed write", dropped);
        }
        dropped
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Number of messages waiting behind the write in flight.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn start(&mut self, message: &dyn Outbound) -> Result<&[u8]> {
        self.buffer.clear();
        let size = write_message(&self.registry, message, &mut self.buffer)?;
        self.in_flight = true;
        debug!("Sending {} ({} bytes)", message.message_name(), size);
        Ok(&self.buffer)
    }
}

impl std::fmt::Debug for SendQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendQueue")
            .field("in_flight", &self.in_flight)
            .field("pending", &self.pending.len())
            .finish()
    }
}
