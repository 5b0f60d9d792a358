//! # msgsock
//!
//! Typed, fixed-layout message records over byte-stream sockets.
//!
//! ## Overview
//!
//! `msgsock` turns plain Rust structs into compact binary frames and back, and
//! carries them over any ordered byte stream. Each frame is
//! `[1-byte discriminator | 2-byte big-endian payload length | payload]`; the
//! payload is the record's fields in declaration order with no tags or
//! padding.
//!
//! ## Key Features
//!
//! * **Compile-time registration**: `message!` and `record!` declare the wire layout
//! * **Deterministic discriminators**: explicit ids first, then the lowest free byte
//! * **Partial-frame reassembly**: frames split across reads are carried and completed
//! * **Single-flight sends**: one write in flight per connection, strict FIFO order
//! * **Async transport**: optional tokio connection, server and client (feature `tokio`)
//!
//! ## Quick Start
//!
//! ```rust
//! use msgsock::*;
//! use std::sync::Arc;
//!
//! record! {
//!     #[derive(Debug, Clone, PartialEq)]
//!     pub struct Position {
//!         pub x: f32,
//!         pub y: f32,
//!     }
//! }
//!
//! message! {
//!     #[derive(Debug, Clone, PartialEq)]
//!     pub struct Hello {
//!         pub id: u64,
//!         pub author: String,
//!         pub at: Position,
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let registry = Arc::new(Registry::builder().register::<Hello>().build()?);
//!
//!     let hello = Hello {
//!         id: 1,
//!         author: "Cloudy".to_string(),
//!         at: Position { x: 1.0, y: 2.0 },
//!     };
//!     let bytes = encode(&registry, &hello)?;
//!
//!     match read_message(&registry, &bytes, 0)? {
//!         Decoded::Message { message, consumed } => {
//!             assert_eq!(consumed, bytes.len());
//!             assert_eq!(message.downcast_ref::<Hello>(), Some(&hello));
//!         }
//!         Decoded::Incomplete(_) => unreachable!(),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! * **`Registry`**: maps message types to discriminators and caches every field layout
//! * **`codec`**: encodes one message into a frame and decodes one frame at an offset
//! * **`StreamAssembler`**: feeds arbitrary read chunks through the codec
//! * **`SendQueue`**: orders outgoing frames so only one write is outstanding
//!
//! `MessageReader` and `MessageWriter` wrap these for blocking `std::io`
//! streams; `Connection`, `Server` and `Client` do the same for tokio.

pub mod assembler;
pub mod codec;
pub mod config;
pub mod error;
pub mod framing;
#[doc(hidden)]
pub mod macros;
pub mod reader;
pub mod registry;
pub mod send_queue;
pub mod shape;
pub mod traits;
pub mod writer;

#[cfg(feature = "tokio")]
pub mod connection;
#[cfg(feature = "tokio")]
pub mod net;

// Re-export the main public API for user convenience.
pub use assembler::{Arrival, AssemblerState, StreamAssembler};
pub use codec::{encode, read_message, write_message, AnyMessage, Decoded, IncompleteFrame};
pub use config::ConnectionConfig;
pub use error::{Error, Result};
pub use framing::{FrameHeader, FRAME_HEADER_SIZE, MAX_FRAME_SIZE, MAX_PAYLOAD_LEN};
pub use reader::{MessageReader, Messages};
pub use registry::{MessageDescriptor, Registry, RegistryBuilder, Visibility, VisibilityFilter};
pub use send_queue::SendQueue;
pub use shape::{FieldDescriptor, RecordRef, ScalarKind, Shape, Value};
pub use traits::{Field, Message, Outbound, Record, Skip};
pub use writer::MessageWriter;

#[cfg(feature = "tokio")]
pub use connection::{CloseReason, Connection, ConnectionHandle, ConnectionId, MessageHandler};
#[cfg(feature = "tokio")]
pub use net::{Client, Server};
