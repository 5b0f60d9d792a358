//! Frame header layout: `[1-byte discriminator | 2-byte big-endian payload length | payload]`.

/// Frame header size in bytes.
pub const FRAME_HEADER_SIZE: usize = 3;

/// Largest payload the 2-byte length field can describe.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Largest complete frame on the wire.
pub const MAX_FRAME_SIZE: usize = FRAME_HEADER_SIZE + MAX_PAYLOAD_LEN;

/// Width of one character unit on the wire.
#[cfg(not(feature = "narrow-chars"))]
pub const CHAR_UNIT_SIZE: usize = 2;

/// Width of one character unit on the wire.
#[cfg(feature = "narrow-chars")]
pub const CHAR_UNIT_SIZE: usize = 1;

/// Length prefix marking a null string or array.
pub const NULL_LENGTH: i16 = -1;

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub discriminator: u8,
    /// Encoded size of everything after the header.
    pub payload_len: u16,
}

impl FrameHeader {
    pub const fn new(discriminator: u8, payload_len: u16) -> Self {
        Self {
            discriminator,
            payload_len,
        }
    }

    pub fn encode(&self) -> [u8; FRAME_HEADER_SIZE] {
        let len = self.payload_len.to_be_bytes();
        [self.discriminator, len[0], len[1]]
    }

    /// Reads a header from the front of `bytes`, or `None` if fewer than
    /// [`FRAME_HEADER_SIZE`] bytes are present.
    pub fn peek(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [discriminator, hi, lo, ..] => Some(Self {
                discriminator: *discriminator,
                payload_len: u16::from_be_bytes([*hi, *lo]),
            }),
            _ => None,
        }
    }

    /// Size of the whole frame this header announces.
    pub fn frame_len(&self) -> usize {
        FRAME_HEADER_SIZE + self.payload_len as usize
    }
}
