//! Reassembles frames from a byte stream that arrives in arbitrary chunks.

use crate::codec::{read_message, AnyMessage, Decoded};
use crate::error::{Error, Result};
use crate::framing::MAX_FRAME_SIZE;
use crate::registry::Registry;
use std::io;
use std::sync::Arc;
use tracing::{debug, trace};

/// Whether bytes from an unfinished frame are being held over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    Idle,
    /// `n` bytes of an incomplete frame sit at the front of the buffer.
    Carrying(usize),
}

/// What a read of `len` bytes meant for the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// The stream is still open; read more into [`StreamAssembler::read_buf`].
    Open,
    /// A zero-length read: the peer closed the stream. `discarded` is the size
    /// of the partial frame that was dropped, if any.
    Closed { discarded: usize },
}

/// Per-connection receive state machine.
///
/// The transport reads into [`read_buf`](Self::read_buf) and reports how many
/// bytes it got with [`bytes_arrived`](Self::bytes_arrived). Every complete
/// frame is decoded and handed to the callback in arrival order; a trailing
/// partial frame is moved to the front of the buffer and completed by later
/// reads.
///
/// ```rust
/// use msgsock::{message, Registry, StreamAssembler};
/// use std::sync::Arc;
///
/// message! {
///     #[derive(Debug, PartialEq)]
///     pub struct Ping { pub seq: u32 }
/// }
///
/// let registry = Arc::new(Registry::builder().register::<Ping>().build()?);
/// let bytes = msgsock::encode(&registry, &Ping { seq: 1 })?;
///
/// let mut assembler = StreamAssembler::new(registry, 0);
/// let mut seen = Vec::new();
/// assembler.feed(&bytes[..2], |m| seen.push(m))?;
/// assert!(seen.is_empty());
/// assembler.feed(&bytes[2..], |m| seen.push(m))?;
/// assert_eq!(seen[0].downcast_ref::<Ping>(), Some(&Ping { seq: 1 }));
/// # Ok::<(), msgsock::Error>(())
/// ```
pub struct StreamAssembler {
    registry: Arc<Registry>,
    buffer: Vec<u8>,
    carry: usize,
}

impl StreamAssembler {
    /// Creates an assembler with a receive buffer of `capacity` bytes.
    ///
    /// The buffer always holds at least one maximum-size frame, so any
    /// smaller capacity is raised to [`MAX_FRAME_SIZE`].
    pub fn new(registry: Arc<Registry>, capacity: usize) -> Self {
        Self {
            registry,
            buffer: vec![0; capacity.max(MAX_FRAME_SIZE)],
            carry: 0,
        }
    }

    pub fn state(&self) -> AssemblerState {
        match self.carry {
            0 => AssemblerState::Idle,
            n => AssemblerState::Carrying(n),
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The free part of the buffer, after any carried bytes. Never empty.
    pub fn read_buf(&mut self) -> &mut [u8] {
        &mut self.buffer[self.carry..]
    }

    /// Processes `len` new bytes written to the front of [`read_buf`](Self::read_buf).
    ///
    /// A decode error leaves the assembler idle; the connection it serves is
    /// no longer usable.
    pub fn bytes_arrived<F>(&mut self, len: usize, mut emit: F) -> Result<Arrival>
    where
        F: FnMut(AnyMessage),
    {
        if len == 0 {
            let discarded = std::mem::take(&mut self.carry);
            if discarded > 0 {
                debug!("Stream closed with {} bytes of an unfinished frame", discarded);
            }
            return Ok(Arrival::Closed { discarded });
        }
        if len > self.buffer.len() - self.carry {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "{} bytes reported but only {} fit after the carried frame",
                    len,
                    self.buffer.len() - self.carry
                ),
            )));
        }

        let effective = self.carry + len;
        trace!("Received {} bytes ({} effective)", len, effective);
        let mut offset = 0;
        while offset < effective {
            match read_message(&self.registry, &self.buffer[..effective], offset) {
                Ok(Decoded::Message { message, consumed }) => {
                    offset += consumed;
                    emit(message);
                }
                Ok(Decoded::Incomplete(frame)) => {
                    self.buffer
                        .copy_within(frame.offset..frame.offset + frame.available, 0);
                    self.carry = frame.available;
                    trace!(
                        "Carrying {} bytes of a frame declaring {} payload bytes",
                        frame.available,
                        frame.declared_len()
                    );
                    return Ok(Arrival::Open);
                }
                Err(e) => {
                    self.carry = 0;
                    return Err(e);
                }
            }
        }
        self.carry = 0;
        Ok(Arrival::Open)
    }

    /// Runs `bytes` through the assembler as if the transport had read them,
    /// splitting them into buffer-sized reads as needed.
    pub fn feed<F>(&mut self, mut bytes: &[u8], mut emit: F) -> Result<()>
    where
        F: FnMut(AnyMessage),
    {
        while !bytes.is_empty() {
            let buf = self.read_buf();
            let n = buf.len().min(bytes.len());
            buf[..n].copy_from_slice(&bytes[..n]);
            self.bytes_arrived(n, &mut emit)?;
            bytes = &bytes[n..];
        }
        Ok(())
    }

    /// Drops any carried bytes and returns how many there were.
    pub fn reset(&mut self) -> usize {
        std::mem::take(&mut self.carry)
    }
}

impl std::fmt::Debug for StreamAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamAssembler")
            .field("capacity", &self.buffer.len())
            .field("state", &self.state())
            .finish()
    }
}
