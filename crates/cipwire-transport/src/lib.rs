//! Frame transport for CIP encapsulation traffic.
//!
//! The protocol layers above depend on a transport only through the
//! [`Transport`] trait: connect, disconnect, send a buffer, receive one
//! complete encapsulation frame with a deadline. Two implementations ship here:
//! - [`TcpTransport`] over `std::net::TcpStream`
//! - [`MemoryTransport`], a scripted in-memory peer
//!
//! Frame boundaries come from the header codec in `cipwire-frame`. The
//! client layer builds on the trait provided here.

pub mod error;
pub mod memory;
pub mod tcp;
pub mod traits;

pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
pub use tcp::TcpTransport;
pub use traits::Transport;
