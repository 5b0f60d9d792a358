use thiserror::Error;

/// Custom error types for the msgsock library.
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying I/O errors from the transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Two message types requested the same explicit discriminator.
    #[error("Message id {0} is already taken")]
    DiscriminatorConflict(u8),

    /// More than 256 top-level message types were registered.
    #[error("Discriminator space exhausted: at most 256 message types can be registered")]
    RegistryOverflow,

    /// A record type reaches itself through its own fields.
    #[error("Record type {0} contains itself through its fields")]
    RecursiveRecord(&'static str),

    /// The value's type has no descriptor in the registry.
    #[error("Unknown message type {0}")]
    UnknownType(&'static str),

    /// The leading frame byte does not map to a registered message type.
    #[error("Unknown message type b{0}")]
    UnknownDiscriminator(u8),

    /// A field value cannot be mapped onto the wire layout.
    #[error("Unsupported field shape for `{field}`: {message}")]
    UnsupportedFieldShape {
        field: &'static str,
        message: String,
    },

    /// A null string or array arrived for a field that cannot hold one.
    #[error("Field `{field}` received a null value but is not nullable")]
    UnexpectedNull { field: &'static str },

    /// The encoded payload does not fit the 2-byte length header.
    #[error("Payload of {size} bytes exceeds the {max} byte frame limit")]
    PayloadTooLarge { size: usize, max: usize },

    /// A string or array holds more elements than the 2-byte signed prefix allows.
    #[error("Length {len} of `{field}` exceeds the {max} element limit")]
    LengthOverflow {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// A complete frame whose payload does not match its descriptor.
    #[error("Malformed frame: {message}")]
    MalformedFrame { message: String },

    /// A string payload is not valid UTF-16.
    #[error("Invalid UTF-16 in field `{field}`")]
    InvalidUtf16 { field: &'static str },

    /// A character does not fit in a single wire character unit.
    #[error("Character {0:?} does not fit in one character unit")]
    UnrepresentableChar(char),

    /// The stream ended in the middle of a frame.
    #[error("Unexpected end of file while reading stream")]
    UnexpectedEof,

    /// The connection was torn down before the operation could complete.
    #[error("Connection closed")]
    ConnectionClosed,
}

impl Error {
    /// Create a new `MalformedFrame` error with a descriptive message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedFrame {
            message: message.into(),
        }
    }

    /// Create a new `UnsupportedFieldShape` error for the named field.
    pub fn unsupported(field: &'static str, message: impl Into<String>) -> Self {
        Self::UnsupportedFieldShape {
            field,
            message: message.into(),
        }
    }

    /// Registration errors are fatal to the whole session. Every other error
    /// is fatal only to the connection it happened on.
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            Self::DiscriminatorConflict(_) | Self::RegistryOverflow | Self::RecursiveRecord(_)
        )
    }
}

/// Result type alias for the library operations.
pub type Result<T> = std::result::Result<T, Error>;
