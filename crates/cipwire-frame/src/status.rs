//! Encapsulation-level status codes (the header's status word).
//!
//! These are distinct from CIP general status codes, which travel inside
//! the payload.

pub const SUCCESS: u32 = 0x0000;
pub const INVALID_COMMAND: u32 = 0x0001;
pub const INSUFFICIENT_MEMORY: u32 = 0x0002;
pub const INCORRECT_DATA: u32 = 0x0003;
pub const INVALID_SESSION_HANDLE: u32 = 0x0064;
pub const INVALID_LENGTH: u32 = 0x0065;
pub const UNSUPPORTED_PROTOCOL_REVISION: u32 = 0x0069;

/// Symbolic name for a known encapsulation status.
pub fn status_name(status: u32) -> Option<&'static str> {
    match status {
        SUCCESS => Some("success"),
        INVALID_COMMAND => Some("invalid or unsupported command"),
        INSUFFICIENT_MEMORY => Some("insufficient memory"),
        INCORRECT_DATA => Some("poorly formed or incorrect data"),
        INVALID_SESSION_HANDLE => Some("invalid session handle"),
        INVALID_LENGTH => Some("invalid length"),
        UNSUPPORTED_PROTOCOL_REVISION => Some("unsupported encapsulation protocol revision"),
        _ => None,
    }
}

/// Render a status word as `0x%08X`, with its name when known.
pub fn describe_status(status: u32) -> String {
    match status_name(status) {
        Some(name) => format!("0x{status:08X} ({name})"),
        None => format!("0x{status:08X}"),
    }
}
