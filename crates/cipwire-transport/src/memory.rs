use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Scripted in-memory transport.
///
/// Replies are queued up front with [`push_reply`](Self::push_reply) and
/// handed out one per `receive`. Every buffer passed to `send` is recorded.
/// Clones share state, so a test can keep a handle for inspection after
/// moving the transport into a client.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    connected: bool,
    endpoint: Option<(String, u16)>,
    sent: Vec<Bytes>,
    replies: VecDeque<Bytes>,
    fail_sends: bool,
    fail_disconnect: bool,
    disconnects: usize,
}

impl MemoryTransport {
    /// Create a disconnected transport with no scripted replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport that already reports an open connection.
    pub fn connected() -> Self {
        let transport = Self::new();
        transport.lock().connected = true;
        transport
    }

    /// Queue a reply for a future `receive`.
    pub fn push_reply(&self, reply: impl Into<Bytes>) {
        self.lock().replies.push_back(reply.into());
    }

    /// All buffers sent so far, oldest first.
    pub fn sent(&self) -> Vec<Bytes> {
        self.lock().sent.clone()
    }

    /// The most recently sent buffer.
    pub fn last_sent(&self) -> Option<Bytes> {
        self.lock().sent.last().cloned()
    }

    /// Number of replies still queued.
    pub fn pending_replies(&self) -> usize {
        self.lock().replies.len()
    }

    /// Endpoint passed to the last successful `connect`.
    pub fn endpoint(&self) -> Option<(String, u16)> {
        self.lock().endpoint.clone()
    }

    /// Number of `disconnect` calls observed, successful or not.
    pub fn disconnect_count(&self) -> usize {
        self.lock().disconnects
    }

    /// Make subsequent `send` calls fail with a broken-pipe I/O error.
    pub fn set_fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }

    /// Make subsequent `disconnect` calls fail (the connection still closes).
    pub fn set_fail_disconnect(&self, fail: bool) {
        self.lock().fail_disconnect = fail;
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for MemoryTransport {
    fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        let mut state = self.lock();
        state.connected = true;
        state.endpoint = Some((host.to_string(), port));
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.disconnects += 1;
        state.connected = false;
        if state.fail_disconnect {
            return Err(TransportError::Io(std::io::Error::other(
                "scripted disconnect failure",
            )));
        }
        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let mut state = self.lock();
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        if state.fail_sends {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "scripted send failure",
            )));
        }
        trace!(len = bytes.len(), "memory transport send");
        state.sent.push(Bytes::copy_from_slice(bytes));
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<Bytes> {
        let mut state = self.lock();
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        state
            .replies
            .pop_front()
            .ok_or(TransportError::Timeout(timeout))
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("MemoryTransport")
            .field("connected", &state.connected)
            .field("sent", &state.sent.len())
            .field("pending_replies", &state.replies.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replies_are_delivered_in_order() {
        let mut transport = MemoryTransport::connected();
        transport.push_reply(&b"first"[..]);
        transport.push_reply(&b"second"[..]);

        let timeout = Duration::from_millis(10);
        assert_eq!(transport.receive(timeout).unwrap().as_ref(), b"first");
        assert_eq!(transport.receive(timeout).unwrap().as_ref(), b"second");
        assert!(matches!(
            transport.receive(timeout),
            Err(TransportError::Timeout(t)) if t == timeout
        ));
    }

    #[test]
    fn clones_share_sent_log() {
        let handle = MemoryTransport::new();
        let mut transport = handle.clone();
        transport.connect("plc.local", 44818).unwrap();
        transport.send(b"abc").unwrap();

        assert_eq!(handle.sent().len(), 1);
        assert_eq!(handle.last_sent().unwrap().as_ref(), b"abc");
        assert_eq!(handle.endpoint(), Some(("plc.local".to_string(), 44818)));
    }

    #[test]
    fn send_requires_connection() {
        let mut transport = MemoryTransport::new();
        assert!(matches!(
            transport.send(b"x"),
            Err(TransportError::NotConnected)
        ));
    }

    #[test]
    fn scripted_failures() {
        let mut transport = MemoryTransport::connected();
        transport.set_fail_sends(true);
        assert!(matches!(transport.send(b"x"), Err(TransportError::Io(_))));

        transport.set_fail_disconnect(true);
        assert!(transport.disconnect().is_err());
        assert!(!transport.is_connected());
        assert_eq!(transport.disconnect_count(), 1);
    }
}
