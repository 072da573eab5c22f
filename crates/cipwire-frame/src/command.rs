//! Encapsulation command codes.
//!
//! Only the TCP explicit-messaging subset is used by the client; the list
//! commands are named for diagnostics.

/// No operation; may be sent by either side, never answered.
pub const NOP: u16 = 0x0000;

/// Query the services a device supports.
pub const LIST_SERVICES: u16 = 0x0004;

/// Query the identity of a device.
pub const LIST_IDENTITY: u16 = 0x0063;

/// Query non-CIP communication interfaces.
pub const LIST_INTERFACES: u16 = 0x0064;

/// Open a session and obtain a session handle.
pub const REGISTER_SESSION: u16 = 0x0065;

/// Close a session.
pub const UNREGISTER_SESSION: u16 = 0x0066;

/// Unconnected request/response exchange.
pub const SEND_RR_DATA: u16 = 0x006F;

/// Connected data exchange.
pub const SEND_UNIT_DATA: u16 = 0x0070;

/// Returns a human-readable name for a command code.
pub fn command_name(command: u16) -> &'static str {
    match command {
        NOP => "NOP",
        LIST_SERVICES => "LIST_SERVICES",
        LIST_IDENTITY => "LIST_IDENTITY",
        LIST_INTERFACES => "LIST_INTERFACES",
        REGISTER_SESSION => "REGISTER_SESSION",
        UNREGISTER_SESSION => "UNREGISTER_SESSION",
        SEND_RR_DATA => "SEND_RR_DATA",
        SEND_UNIT_DATA => "SEND_UNIT_DATA",
        _ => "UNKNOWN",
    }
}

/// Returns true for commands that carry a session handle.
pub fn is_session_command(command: u16) -> bool {
    matches!(
        command,
        REGISTER_SESSION | UNREGISTER_SESSION | SEND_RR_DATA | SEND_UNIT_DATA
    )
}
