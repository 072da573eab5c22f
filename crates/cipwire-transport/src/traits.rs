use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// The frame transport a CIP client drives.
///
/// `send` writes bytes as given. `receive` yields one complete encapsulation
/// frame, header included. A client keeps at most one request in flight, so
/// a reply is always the next frame `receive` yields.
pub trait Transport {
    /// Open a connection to `host:port`.
    fn connect(&mut self, host: &str, port: u16) -> Result<()>;

    /// Close the connection. Closing an already closed transport is a no-op.
    fn disconnect(&mut self) -> Result<()>;

    /// Transmit a complete buffer.
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Wait up to `timeout` for the next complete frame.
    ///
    /// Returns [`TransportError::Timeout`](crate::TransportError::Timeout)
    /// when nothing arrives in time. A timeout cancels only the wait; the
    /// connection stays open.
    fn receive(&mut self, timeout: Duration) -> Result<Bytes>;

    /// Whether a connection is currently open.
    fn is_connected(&self) -> bool;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        (**self).connect(host, port)
    }

    fn disconnect(&mut self) -> Result<()> {
        (**self).disconnect()
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).send(bytes)
    }

    fn receive(&mut self, timeout: Duration) -> Result<Bytes> {
        (**self).receive(timeout)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}
