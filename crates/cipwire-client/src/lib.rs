//! CIP explicit-messaging client.
//!
//! This is the "just works" layer: connect to a device, register a
//! session, read and write attributes. [`SecureClient`] adds a
//! nonce-keyed session with sequence-numbered, MAC-authenticated messages
//! on top of the same request path.
//!
//! Every client keeps at most one request in flight; replies are matched
//! to requests purely by arrival order.

pub mod client;
pub mod config;
pub mod error;
pub mod secure;

pub use client::{CipClient, IdentityInfo};
pub use config::{
    ClientConfig, ConnectionType, ProductionTrigger, SecureConfig, TransportDirection,
};
pub use error::{ClientError, Result};
pub use secure::{SecureClient, SessionState};
