//! EtherNet/IP encapsulation framing for CIP services.
//!
//! Every message travels behind a fixed 24-byte little-endian header:
//! - command (2B), payload length (2B), session handle (4B)
//! - status (4B, zero on send), sender context (8B), options (4B)
//!
//! The header is followed by exactly `length` payload bytes.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod command;
pub mod error;
pub mod reader;
pub mod status;

#[cfg(feature = "async")]
pub use async_codec::EncapsulationCodec;
pub use codec::{
    decode_message, encode_message, EncapsulationHeader, EncapsulationMessage, FrameConfig,
    HEADER_SIZE, MAX_PAYLOAD,
};
pub use command::{
    LIST_IDENTITY, LIST_INTERFACES, LIST_SERVICES, NOP, REGISTER_SESSION, SEND_RR_DATA,
    SEND_UNIT_DATA, UNREGISTER_SESSION,
};
pub use error::{FrameError, Result};
pub use reader::MessageReader;
