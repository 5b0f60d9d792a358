//! Per-connection settings.

use crate::framing::MAX_FRAME_SIZE;

/// Buffer sizing and socket options for a connection.
///
/// ```rust
/// use msgsock::ConnectionConfig;
///
/// let config = ConnectionConfig::default()
///     .with_receive_buffer_size(1 << 20)
///     .with_nodelay(false);
/// assert_eq!(config.receive_buffer_size, 1 << 20);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Receive buffer size in bytes. Values below one maximum-size frame
    /// (3 + 65535 bytes) are raised to that.
    pub receive_buffer_size: usize,
    /// Initial capacity of the send-side encode buffer.
    pub send_buffer_capacity: usize,
    /// Sets `TCP_NODELAY` on TCP connections.
    pub nodelay: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            receive_buffer_size: MAX_FRAME_SIZE,
            send_buffer_capacity: MAX_FRAME_SIZE,
            nodelay: true,
        }
    }
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_receive_buffer_size(mut self, size: usize) -> Self {
        self.receive_buffer_size = size;
        self
    }

    pub fn with_send_buffer_capacity(mut self, capacity: usize) -> Self {
        self.send_buffer_capacity = capacity;
        self
    }

    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// The receive buffer size actually used.
    pub fn effective_receive_buffer_size(&self) -> usize {
        self.receive_buffer_size.max(MAX_FRAME_SIZE)
    }
}
