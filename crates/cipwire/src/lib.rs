//! Client-side engine for the Common Industrial Protocol over EtherNet/IP.
//!
//! # Crate Structure
//!
//! - [`transport`]: frame transport abstraction (TCP, in-memory)
//! - [`frame`]: 24-byte encapsulation header framing
//! - [`cip`]: object paths, data-type codec, status catalog, reply parsing
//! - [`client`]: request driver and secure session (behind `client` feature)
//!
//! ```no_run
//! use cipwire::client::CipClient;
//!
//! let mut client = CipClient::connect("192.168.1.10", 44818)?;
//! let identity = client.get_identity_info()?;
//! println!("vendor {} serial {:08X}", identity.vendor_id, identity.serial_number);
//! client.close()?;
//! # Ok::<(), cipwire::client::ClientError>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use cipwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use cipwire_frame::*;
}

/// Re-export CIP message-layer types.
pub mod cip {
    pub use cipwire_cip::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use cipwire_client::*;
}
