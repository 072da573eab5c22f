use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use cipwire_frame::{EncapsulationHeader, HEADER_SIZE};
use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

const READ_CHUNK_SIZE: usize = 4 * 1024;

/// TCP transport for EtherNet/IP encapsulation traffic.
///
/// `receive` yields exactly one encapsulation frame, sized by the length
/// field of its header. A frame split across segments is reassembled, and
/// bytes that arrive past the end of a frame stay buffered for the next
/// call. The deadline covers the whole frame, not each read.
pub struct TcpTransport {
    stream: Option<TcpStream>,
    connect_timeout: Duration,
    buffer: BytesMut,
}

impl TcpTransport {
    /// Well-known EtherNet/IP explicit messaging port.
    pub const DEFAULT_PORT: u16 = 44818;
    /// Default connect timeout.
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
    /// `set_read_timeout` rejects a zero duration.
    const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

    /// Create an unconnected transport with default settings.
    pub fn new() -> Self {
        Self::with_connect_timeout(Self::DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create an unconnected transport with an explicit connect timeout.
    pub fn with_connect_timeout(connect_timeout: Duration) -> Self {
        Self {
            stream: None,
            connect_timeout,
            buffer: BytesMut::new(),
        }
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream) -> Self {
        Self {
            stream: Some(stream),
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            buffer: BytesMut::new(),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "tcp"
    }

    /// Bytes received but not yet returned as a frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn stream_mut(&mut self) -> Result<&mut TcpStream> {
        self.stream.as_mut().ok_or(TransportError::NotConnected)
    }

    /// Split one complete frame off the front of the buffer.
    fn take_frame(&mut self) -> Result<Option<Bytes>> {
        if self.buffer.len() < HEADER_SIZE {
            return Ok(None);
        }
        let header = EncapsulationHeader::decode(&self.buffer)?;
        let total = HEADER_SIZE + header.length as usize;
        if self.buffer.len() < total {
            return Ok(None);
        }
        trace!(
            command = header.command,
            len = header.length,
            "received encapsulation frame"
        );
        Ok(Some(self.buffer.split_to(total).freeze()))
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        let addr = format!("{host}:{port}");
        let candidates = (host, port)
            .to_socket_addrs()
            .map_err(|source| TransportError::Connect {
                addr: addr.clone(),
                source,
            })?;

        let mut last_err = None;
        for candidate in candidates {
            match TcpStream::connect_timeout(&candidate, self.connect_timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    info!(%addr, peer = %candidate, "connected to device");
                    self.stream = Some(stream);
                    self.buffer.clear();
                    return Ok(());
                }
                Err(err) => {
                    debug!(peer = %candidate, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }

        Err(TransportError::Connect {
            addr,
            source: last_err.unwrap_or_else(|| {
                std::io::Error::new(ErrorKind::NotFound, "host resolved to no addresses")
            }),
        })
    }

    fn disconnect(&mut self) -> Result<()> {
        self.buffer.clear();
        if let Some(stream) = self.stream.take() {
            debug!("closing tcp connection");
            match stream.shutdown(Shutdown::Both) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotConnected => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let stream = self.stream_mut()?;
        stream.write_all(bytes)?;
        stream.flush()?;
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<Bytes> {
        self.stream_mut()?;
        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        loop {
            if let Some(frame) = self.take_frame()? {
                return Ok(frame);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::Timeout(timeout));
            }
            let stream = self.stream_mut()?;
            stream.set_read_timeout(Some(remaining.max(Self::MIN_READ_TIMEOUT)))?;

            match stream.read(&mut chunk) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
                {
                    return Err(TransportError::Timeout(timeout));
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("connected", &self.stream.is_some())
            .field("connect_timeout", &self.connect_timeout)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cipwire_frame::{encode_message, FrameError, SEND_RR_DATA};
    use std::net::TcpListener;
    use std::sync::mpsc;

    fn frame(handle: u32, payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_message(SEND_RR_DATA, handle, [0; 8], payload, &mut buf).unwrap();
        buf.to_vec()
    }

    fn listen() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[test]
    fn test_connect_send_receive() {
        let (listener, port) = listen();

        let handle = std::thread::spawn(move || {
            let (mut server, _addr) = listener.accept().unwrap();
            let mut buf = [0u8; 5];
            server.read_exact(&mut buf).unwrap();
            assert_eq!(&buf, b"hello");
            server.write_all(&frame(1, b"world")).unwrap();
        });

        let mut client = TcpTransport::new();
        client.connect("127.0.0.1", port).unwrap();
        assert!(client.is_connected());
        client.send(b"hello").unwrap();
        let reply = client.receive(Duration::from_secs(5)).unwrap();
        assert_eq!(reply.len(), HEADER_SIZE + 5);
        assert_eq!(&reply[HEADER_SIZE..], b"world");

        handle.join().unwrap();
        client.disconnect().unwrap();
        assert!(!client.is_connected());
    }

    #[test]
    fn test_header_and_body_in_separate_segments() {
        let (listener, port) = listen();

        let handle = std::thread::spawn(move || {
            let (mut server, _addr) = listener.accept().unwrap();
            let wire = frame(7, &[0xCC, 0x00, 0x00, 0x00, 0xC4, 0x2A, 0x00, 0x00, 0x00]);
            server.write_all(&wire[..HEADER_SIZE]).unwrap();
            server.flush().unwrap();
            std::thread::sleep(Duration::from_millis(100));
            server.write_all(&wire[HEADER_SIZE..HEADER_SIZE + 3]).unwrap();
            server.flush().unwrap();
            std::thread::sleep(Duration::from_millis(100));
            server.write_all(&wire[HEADER_SIZE + 3..]).unwrap();
        });

        let mut client = TcpTransport::new();
        client.connect("127.0.0.1", port).unwrap();
        let reply = client.receive(Duration::from_secs(5)).unwrap();
        assert_eq!(reply.len(), HEADER_SIZE + 9);
        assert_eq!(&reply[HEADER_SIZE + 4..], &[0xC4, 0x2A, 0x00, 0x00, 0x00]);
        assert_eq!(client.buffered(), 0);

        handle.join().unwrap();
    }

    #[test]
    fn test_coalesced_frames_are_returned_one_at_a_time() {
        let (listener, port) = listen();

        let handle = std::thread::spawn(move || {
            let (mut server, _addr) = listener.accept().unwrap();
            let mut wire = frame(1, b"first");
            wire.extend_from_slice(&frame(2, b"second"));
            server.write_all(&wire).unwrap();
        });

        let mut client = TcpTransport::new();
        client.connect("127.0.0.1", port).unwrap();
        handle.join().unwrap();

        let first = client.receive(Duration::from_secs(5)).unwrap();
        assert_eq!(&first[HEADER_SIZE..], b"first");
        let second = client.receive(Duration::from_secs(5)).unwrap();
        assert_eq!(&second[HEADER_SIZE..], b"second");
        assert_eq!(
            EncapsulationHeader::decode(&second).unwrap().session_handle,
            2
        );
    }

    #[test]
    fn test_partial_frame_survives_timeout() {
        let (listener, port) = listen();
        let (tx, rx) = mpsc::channel::<()>();

        let handle = std::thread::spawn(move || {
            let (mut server, _addr) = listener.accept().unwrap();
            let wire = frame(3, b"late body");
            server.write_all(&wire[..HEADER_SIZE + 2]).unwrap();
            rx.recv().unwrap();
            server.write_all(&wire[HEADER_SIZE + 2..]).unwrap();
        });

        let mut client = TcpTransport::new();
        client.connect("127.0.0.1", port).unwrap();

        let err = client.receive(Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)));
        assert!(client.is_connected());
        assert_eq!(client.buffered(), HEADER_SIZE + 2);

        tx.send(()).unwrap();
        let reply = client.receive(Duration::from_secs(5)).unwrap();
        assert_eq!(&reply[HEADER_SIZE..], b"late body");

        handle.join().unwrap();
    }

    #[test]
    fn test_receive_timeout_keeps_connection() {
        let (listener, port) = listen();
        let (tx, rx) = mpsc::channel::<()>();

        let handle = std::thread::spawn(move || {
            let (mut server, _addr) = listener.accept().unwrap();
            rx.recv().unwrap();
            server.write_all(&frame(1, b"late")).unwrap();
        });

        let mut client = TcpTransport::new();
        client.connect("127.0.0.1", port).unwrap();

        let err = client.receive(Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)));
        assert!(client.is_connected());

        tx.send(()).unwrap();
        let reply = client.receive(Duration::from_secs(5)).unwrap();
        assert_eq!(&reply[HEADER_SIZE..], b"late");

        handle.join().unwrap();
    }

    #[test]
    fn test_peer_close_mid_frame_reported() {
        let (listener, port) = listen();

        let handle = std::thread::spawn(move || {
            let (mut server, _addr) = listener.accept().unwrap();
            let wire = frame(1, b"cut short");
            server.write_all(&wire[..HEADER_SIZE + 3]).unwrap();
        });

        let mut client = TcpTransport::new();
        client.connect("127.0.0.1", port).unwrap();
        handle.join().unwrap();

        let err = client.receive(Duration::from_secs(5)).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Closed | TransportError::Io(_)
        ));
    }

    #[test]
    fn test_peer_close_reported() {
        let (listener, port) = listen();

        let handle = std::thread::spawn(move || {
            let (server, _addr) = listener.accept().unwrap();
            drop(server);
        });

        let mut client = TcpTransport::new();
        client.connect("127.0.0.1", port).unwrap();
        handle.join().unwrap();

        let err = client.receive(Duration::from_secs(5)).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Closed | TransportError::Io(_)
        ));
    }

    #[test]
    fn test_frame_error_converts() {
        let err: TransportError = FrameError::ConnectionClosed.into();
        assert!(matches!(err, TransportError::Frame(_)));
    }

    #[test]
    fn test_send_without_connection() {
        let mut client = TcpTransport::new();
        let err = client.send(b"x").unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
        let err = client.receive(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[test]
    fn test_connect_refused() {
        let (listener, port) = listen();
        drop(listener);

        let mut client = TcpTransport::with_connect_timeout(Duration::from_millis(500));
        let err = client.connect("127.0.0.1", port).unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let mut client = TcpTransport::new();
        client.disconnect().unwrap();
        client.disconnect().unwrap();
    }

    #[test]
    fn test_debug_reports_state() {
        let client = TcpTransport::new();
        let text = format!("{client:?}");
        assert!(text.contains("connected: false"));
        assert!(text.contains("buffered: 0"));
    }
}
