use std::fmt;

use serde::Serialize;

use crate::status::CipStatus;

/// The service a status error was reported for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    GetAttribute,
    SetAttribute,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::GetAttribute => f.write_str("GET_ATTRIBUTE"),
            Operation::SetAttribute => f.write_str("SET_ATTRIBUTE"),
        }
    }
}

/// Errors produced while building CIP requests or interpreting replies.
#[derive(Debug, thiserror::Error)]
pub enum CipError {
    /// A path needs at least one of class, instance or attribute.
    #[error("at least one of class_id, instance_id or attribute_id is required")]
    MissingIdentifier,

    /// An identifier is outside the 16-bit range.
    #[error("invalid {field}: {value} (expected an integer in 0..=65535)")]
    InvalidIdentifier { field: &'static str, value: i64 },

    /// The type code is not in the registry.
    #[error("unsupported data type 0x{0:04X}")]
    UnsupportedDataType(u16),

    /// The value variant cannot be encoded as the requested type.
    #[error("cannot encode {found} value as {expected}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The value does not fit the requested type.
    #[error("value {value} out of range for {data_type}")]
    ValueOutOfRange {
        data_type: &'static str,
        value: String,
    },

    /// Fewer bytes than the type requires.
    #[error("insufficient data for {data_type}: need {needed} bytes, have {available}")]
    InsufficientData {
        data_type: &'static str,
        needed: usize,
        available: usize,
    },

    /// ARRAY/STRUCT nesting exceeds the decoder's depth limit.
    #[error("nesting deeper than {limit} levels")]
    NestingTooDeep { limit: usize },

    /// The reply is structurally malformed.
    #[error("{0}")]
    ResponseFormat(String),

    /// The device answered with a nonzero general status.
    #[error("{operation} failed: {status}")]
    ProtocolStatus {
        operation: Operation,
        status: CipStatus,
        /// The complete reply, hex encoded.
        raw_hex: String,
    },

    /// Decoding reply data failed; carries the undecoded bytes.
    #[error("{source} (data: {data_hex})")]
    Decode {
        data_hex: String,
        source: Box<CipError>,
    },
}

impl CipError {
    /// The status descriptor for [`CipError::ProtocolStatus`].
    pub fn status(&self) -> Option<&CipStatus> {
        match self {
            CipError::ProtocolStatus { status, .. } => Some(status),
            _ => None,
        }
    }

    /// Whether retrying the same request later may succeed.
    pub fn is_recoverable(&self) -> bool {
        self.status().is_some_and(|status| status.recoverable)
    }
}

pub type Result<T> = std::result::Result<T, CipError>;
