//! A blocking message reader over any `std::io::Read`.

use crate::assembler::{Arrival, StreamAssembler};
use crate::codec::AnyMessage;
use crate::error::{Error, Result};
use crate::registry::Registry;
use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use std::sync::Arc;

/// Reads decoded messages from a byte stream.
///
/// The reader drives a [`StreamAssembler`] with plain blocking reads, so a
/// frame may arrive in any number of pieces. It provides two APIs:
///
/// 1. **Processor API** (`process_all()`): closure-based processing of every message
/// 2. **Expert API** (`messages()`): manual iteration for more control
///
/// ```rust
/// use msgsock::{message, MessageReader, MessageWriter, Registry};
/// use std::io::Cursor;
/// use std::sync::Arc;
///
/// message! {
///     #[derive(Debug, PartialEq)]
///     pub struct Line { pub text: String }
/// }
///
/// let registry = Arc::new(Registry::builder().register::<Line>().build()?);
/// let mut writer = MessageWriter::new(Vec::new(), registry.clone());
/// writer.write(&Line { text: "one".into() })?;
/// writer.write(&Line { text: "two".into() })?;
///
/// let mut reader = MessageReader::new(Cursor::new(writer.into_inner()), registry);
/// let mut lines = Vec::new();
/// reader.process_all(|message| {
///     lines.push(message.downcast::<Line>().unwrap().text);
///     Ok(())
/// })?;
/// assert_eq!(lines, ["one", "two"]);
/// # Ok::<(), msgsock::Error>(())
/// ```
pub struct MessageReader<R: Read> {
    reader: R,
    assembler: StreamAssembler,
    ready: VecDeque<AnyMessage>,
    failure: Option<Error>,
    finished: bool,
}

impl<R: Read> MessageReader<R> {
    /// Creates a reader with a receive buffer of one maximum-size frame.
    pub fn new(reader: R, registry: Arc<Registry>) -> Self {
        Self::with_capacity(reader, registry, 0)
    }

    /// Creates a reader with a receive buffer of `capacity` bytes, raised to
    /// one maximum-size frame if smaller.
    pub fn with_capacity(reader: R, registry: Arc<Registry>, capacity: usize) -> Self {
        Self {
            reader,
            assembler: StreamAssembler::new(registry, capacity),
            ready: VecDeque::new(),
            failure: None,
            finished: false,
        }
    }

    /// Reads the next message.
    /// Returns Ok(Some(message)) on success, Ok(None) on clean EOF.
    ///
    /// EOF in the middle of a frame is `Error::UnexpectedEof`. A decode error
    /// ends the stream: messages decoded before it are still returned, then
    /// the error once, then `Ok(None)` from every later call. Transport errors
    /// are passed through and the read can be retried.
    pub fn read_message(&mut self) -> Result<Option<AnyMessage>> {
        loop {
            if let Some(message) = self.ready.pop_front() {
                return Ok(Some(message));
            }
            if let Some(e) = self.failure.take() {
                return Err(e);
            }
            if self.finished {
                return Ok(None);
            }

            let len = match self.reader.read(self.assembler.read_buf()) {
                Ok(len) => len,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            let ready = &mut self.ready;
            match self.assembler.bytes_arrived(len, |m| ready.push_back(m)) {
                Ok(Arrival::Open) => {}
                Ok(Arrival::Closed { discarded: 0 }) => self.finished = true,
                Ok(Arrival::Closed { .. }) => {
                    self.finished = true;
                    self.failure = Some(Error::UnexpectedEof);
                }
                Err(e) => {
                    self.finished = true;
                    self.failure = Some(e);
                }
            }
        }
    }

    /// Processes all messages in the stream using a closure.
    ///
    /// The closure should return `Ok(())` to continue or an error to stop.
    pub fn process_all<F>(&mut self, mut processor: F) -> Result<()>
    where
        F: FnMut(AnyMessage) -> Result<()>,
    {
        while let Some(message) = self.read_message()? {
            processor(message)?;
        }
        Ok(())
    }

    /// Returns an iterator-like object for manual message processing.
    pub fn messages(&mut self) -> Messages<'_, R> {
        Messages { reader: self }
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Manual iteration over a [`MessageReader`].
pub struct Messages<'a, R: Read> {
    reader: &'a mut MessageReader<R>,
}

impl<R: Read> Messages<'_, R> {
    /// Returns the next message.
    ///
    /// # Returns
    /// * `Ok(Some(message))` - A message was successfully read
    /// * `Ok(None)` - End of stream reached
    /// * `Err(e)` - An error occurred during reading
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<AnyMessage>> {
        self.reader.read_message()
    }
}
