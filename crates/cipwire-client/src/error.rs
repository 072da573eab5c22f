use cipwire_cip::{CipError, CipStatus};
use cipwire_frame::status::describe_status;
use cipwire_transport::TransportError;

/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error, including receive timeouts.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Encapsulation framing error.
    #[error("frame error: {0}")]
    Frame(#[from] cipwire_frame::FrameError),

    /// Error from the CIP message layer.
    #[error(transparent)]
    Cip(#[from] CipError),

    /// The reply's encapsulation status word was nonzero.
    #[error("encapsulation error: status {description}")]
    Encapsulation { status: u32, description: String },

    /// `establish_secure_session` called outside the idle state.
    #[error("secure session already active")]
    SessionAlreadyActive,

    /// A secure operation was attempted without an active session.
    #[error("secure session not active")]
    SessionNotActive,

    /// The device rejected or garbled the session registration.
    #[error("session registration failed: {0}")]
    SessionRegistrationFailed(String),

    /// A reply carried a session handle other than ours.
    #[error("session handle mismatch: expected 0x{expected:08X}, got 0x{actual:08X}")]
    SessionHandleMismatch { expected: u32, actual: u32 },

    /// Secure data is only defined for point-to-point connections.
    #[error("secure data requires a point-to-point connection")]
    NotPointToPoint,

    /// A secure reply was too short to carry its framing.
    #[error("invalid secure message length: {len} bytes (minimum {min})")]
    InvalidLength { len: usize, min: usize },

    /// Message authentication or sequencing failed.
    #[error("security error: {0}")]
    Security(String),

    /// An object id is outside 0..=65535.
    #[error("invalid object id {field}={value} (expected 0..=65535)")]
    InvalidObjectId { field: &'static str, value: i64 },

    /// A failure while reading a specific attribute.
    #[error("attribute {class_id}/{instance_id}/{attribute_id}: {source}")]
    Attribute {
        class_id: u16,
        instance_id: u16,
        attribute_id: u16,
        source: Box<ClientError>,
    },

    /// A well-known attribute decoded to a value of the wrong shape.
    #[error("attribute {attribute} returned unexpected {kind} value")]
    UnexpectedValue { attribute: u16, kind: &'static str },
}

impl ClientError {
    pub(crate) fn encapsulation(status: u32) -> Self {
        ClientError::Encapsulation {
            status,
            description: describe_status(status),
        }
    }

    /// True when the failure was a receive timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            ClientError::Transport(TransportError::Timeout(_)) => true,
            ClientError::Attribute { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// The CIP status descriptor, if the device reported one.
    pub fn cip_status(&self) -> Option<&CipStatus> {
        match self {
            ClientError::Cip(err) => err.status(),
            ClientError::Attribute { source, .. } => source.cip_status(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
