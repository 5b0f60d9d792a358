//! A blocking message writer over any `std::io::Write`.

use crate::codec::write_message;
use crate::error::Result;
use crate::registry::Registry;
use crate::traits::{Message, Outbound};
use std::io::Write;
use std::sync::Arc;

/// Writes framed messages to a byte stream.
///
/// Each message is encoded into an internal buffer that is reused between
/// writes, then written out in one `write_all`.
pub struct MessageWriter<W: Write> {
    writer: W,
    registry: Arc<Registry>,
    buffer: Vec<u8>,
}

impl<W: Write> MessageWriter<W> {
    /// Creates a new `MessageWriter`.
    pub fn new(writer: W, registry: Arc<Registry>) -> Self {
        Self {
            writer,
            registry,
            buffer: Vec::new(),
        }
    }

    /// Encodes and writes one message.
    pub fn write<M: Message>(&mut self, message: &M) -> Result<()> {
        self.write_dyn(message)
    }

    /// Encodes and writes a message whose type is only known at runtime.
    pub fn write_dyn(&mut self, message: &dyn Outbound) -> Result<()> {
        self.buffer.clear();
        write_message(&self.registry, message, &mut self.buffer)?;
        self.writer.write_all(&self.buffer)?;
        Ok(())
    }

    /// Flushes the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Consumes the writer, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
