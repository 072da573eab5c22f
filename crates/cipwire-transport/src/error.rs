use std::time::Duration;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to connect to the specified address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No reply arrived before the deadline.
    #[error("receive timed out after {0:?}")]
    Timeout(Duration),

    /// An operation needed a connection but none is open.
    #[error("transport not connected")]
    NotConnected,

    /// The received bytes do not form a valid encapsulation frame.
    #[error("framing error: {0}")]
    Frame(#[from] cipwire_frame::FrameError),

    /// The remote end closed the connection.
    #[error("connection closed by peer")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
