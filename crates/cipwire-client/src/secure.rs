//! Authenticated session layer.
//!
//! Establishment registers a session using a fresh random nonce, which then
//! keys an HMAC-SHA-256 over every secure message. Each outgoing message
//! carries a strictly increasing sequence number and an 8-byte truncated tag:
//!
//! ```text
//! ┌───────────────────┬─────────┬──────────────┬─────────┐
//! │ Encapsulation hdr │ Payload │ Sequence u32 │ MAC (8) │
//! │ 24B, SendRRData   │ N bytes │ little-endian│         │
//! └───────────────────┴─────────┴──────────────┴─────────┘
//! ```
//!
//! The MAC input is `payload ‖ sequence_le` in both directions.

use std::fmt;
use std::time::Instant;

use bytes::{BufMut, Bytes, BytesMut};
use cipwire_cip::{validate_id, AttributeResponse, ObjectPath};
use cipwire_frame::{EncapsulationHeader, FrameError, HEADER_SIZE, REGISTER_SESSION, SEND_RR_DATA, UNREGISTER_SESSION};
use cipwire_transport::{TcpTransport, Transport};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use tracing::{debug, info, warn};

use crate::client::CipClient;
use crate::config::{ClientConfig, ConnectionType, SecureConfig};
use crate::error::{ClientError, Result};

type HmacSha256 = Hmac<Sha256>;

pub const NONCE_LEN: usize = 16;
pub const MAC_LEN: usize = 8;
pub const SEQUENCE_LEN: usize = 4;
/// Size of the secure registration packet.
pub const REGISTRATION_LEN: usize = 28;
/// Smallest well-formed secure reply: header, sequence and MAC.
pub const MIN_SECURE_REPLY_LEN: usize = HEADER_SIZE + SEQUENCE_LEN + MAC_LEN;

/// Lifecycle of a [`SecureClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Establishing,
    Active,
    /// Terminal.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Establishing => "establishing",
            SessionState::Active => "active",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

struct SecureSession {
    nonce: [u8; NONCE_LEN],
    session_handle: u32,
    sequence: u32,
    peer_sequence: Option<u32>,
    last_activity: Instant,
}

impl fmt::Debug for SecureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureSession")
            .field("nonce", &"<redacted>")
            .field("session_handle", &self.session_handle)
            .field("sequence", &self.sequence)
            .field("peer_sequence", &self.peer_sequence)
            .finish()
    }
}

/// CIP client with a nonce-keyed, sequence-numbered secure session.
#[derive(Debug)]
pub struct SecureClient<T: Transport = TcpTransport> {
    client: CipClient<T>,
    config: SecureConfig,
    state: SessionState,
    session: Option<SecureSession>,
}

impl SecureClient<TcpTransport> {
    /// Connect over TCP and establish a secure session.
    pub fn connect(
        host: &str,
        port: u16,
        client_config: ClientConfig,
        config: SecureConfig,
    ) -> Result<Self> {
        let mut transport = TcpTransport::with_connect_timeout(client_config.connect_timeout);
        transport.connect(host, port)?;
        let mut client = Self::new(CipClient::new(transport, client_config), config);
        client.establish_secure_session()?;
        Ok(client)
    }
}

impl<T: Transport> SecureClient<T> {
    /// Wrap a client whose transport is already connected.
    pub fn new(client: CipClient<T>, config: SecureConfig) -> Self {
        Self {
            client,
            config,
            state: SessionState::Idle,
            session: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SecureConfig {
        &self.config
    }

    pub fn session_handle(&self) -> Option<u32> {
        self.session.as_ref().map(|s| s.session_handle)
    }

    /// Sequence number of the last message sent.
    pub fn sequence_number(&self) -> Option<u32> {
        self.session.as_ref().map(|s| s.sequence)
    }

    pub fn last_activity(&self) -> Option<Instant> {
        self.session.as_ref().map(|s| s.last_activity)
    }

    pub fn client(&self) -> &CipClient<T> {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut CipClient<T> {
        &mut self.client
    }

    /// Register a session keyed by a fresh nonce.
    ///
    /// Only valid from [`SessionState::Idle`]. On failure the state returns
    /// to idle.
    pub fn establish_secure_session(&mut self) -> Result<u32> {
        if self.state != SessionState::Idle {
            return Err(ClientError::SessionAlreadyActive);
        }

        self.state = SessionState::Establishing;
        match self.register() {
            Ok(session) => {
                let handle = session.session_handle;
                self.client.set_session_handle(handle);
                self.session = Some(session);
                self.state = SessionState::Active;
                info!(session_handle = handle, "secure session established");
                Ok(handle)
            }
            Err(err) => {
                self.state = SessionState::Idle;
                Err(err)
            }
        }
    }

    fn register(&mut self) -> Result<SecureSession> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let mut packet = BytesMut::with_capacity(REGISTRATION_LEN);
        packet.put_u16_le(REGISTER_SESSION);
        packet.put_u16_le(self.config.protocol_version);
        packet.put_slice(&nonce);
        packet.put_u8(self.config.connection_params());
        packet.put_bytes(0, REGISTRATION_LEN - packet.len());

        let reply = self.client.exchange(&packet, self.config.timeout)?;
        if reply.len() < HEADER_SIZE {
            return Err(ClientError::SessionRegistrationFailed(format!(
                "reply too short: {} bytes",
                reply.len()
            )));
        }
        let header = EncapsulationHeader::decode(&reply)?;
        if header.status != 0 {
            return Err(ClientError::SessionRegistrationFailed(format!(
                "device returned status 0x{:08X}",
                header.status
            )));
        }

        Ok(SecureSession {
            nonce,
            session_handle: header.session_handle,
            sequence: 0,
            peer_sequence: None,
            last_activity: Instant::now(),
        })
    }

    /// Send `data` with the next sequence number and its MAC.
    pub fn send_secure_data(&mut self, data: &[u8]) -> Result<()> {
        if self.config.connection_type != ConnectionType::PointToPoint {
            return Err(ClientError::NotPointToPoint);
        }
        let session = self.active_session()?;

        let sequence = session
            .sequence
            .checked_add(1)
            .ok_or_else(|| ClientError::Security("sequence number exhausted".to_string()))?;
        session.sequence = sequence;
        let mac = compute_mac(&session.nonce, data, sequence)?;
        let handle = session.session_handle;

        let mut payload = BytesMut::with_capacity(data.len() + SEQUENCE_LEN + MAC_LEN);
        payload.put_slice(data);
        payload.put_u32_le(sequence);
        payload.put_slice(&mac);

        let frame = self.client.frame(SEND_RR_DATA, handle, &payload)?;
        self.client.transport_mut().send(&frame)?;
        debug!(sequence, len = data.len(), "secure data sent");

        if let Some(session) = self.session.as_mut() {
            session.last_activity = Instant::now();
        }
        Ok(())
    }

    /// Receive one secure message and return its authenticated payload.
    pub fn receive_with_validation(&mut self) -> Result<Bytes> {
        let timeout = self.config.timeout;
        let handle = self.active_session()?.session_handle;

        let reply = self.client.transport_mut().receive(timeout)?;
        if reply.len() < HEADER_SIZE {
            return Err(ClientError::InvalidLength {
                len: reply.len(),
                min: HEADER_SIZE,
            });
        }
        let header = EncapsulationHeader::decode(&reply)?;
        let declared = HEADER_SIZE + header.length as usize;
        if reply.len() != declared {
            return Err(FrameError::LengthMismatch {
                declared,
                actual: reply.len(),
            }
            .into());
        }
        if header.session_handle != handle {
            return Err(ClientError::SessionHandleMismatch {
                expected: handle,
                actual: header.session_handle,
            });
        }
        if reply.len() < MIN_SECURE_REPLY_LEN {
            return Err(ClientError::InvalidLength {
                len: reply.len(),
                min: MIN_SECURE_REPLY_LEN,
            });
        }

        let mac_start = reply.len() - MAC_LEN;
        let seq_start = mac_start - SEQUENCE_LEN;
        let payload = reply.slice(HEADER_SIZE..seq_start);
        let mut seq_bytes = [0u8; SEQUENCE_LEN];
        seq_bytes.copy_from_slice(&reply[seq_start..mac_start]);
        let sequence = u32::from_le_bytes(seq_bytes);

        let session = self.active_session()?;
        if !verify_mac(&session.nonce, &payload, sequence, &reply[mac_start..])? {
            warn!(sequence, "secure message failed MAC verification");
            return Err(ClientError::Security("MAC verification failed".to_string()));
        }
        if session.peer_sequence.is_some_and(|last| sequence <= last) {
            warn!(sequence, "replayed secure message rejected");
            return Err(ClientError::Security(format!(
                "replayed sequence number {sequence}"
            )));
        }

        session.peer_sequence = Some(sequence);
        session.last_activity = Instant::now();
        debug!(sequence, len = payload.len(), "secure data received");
        Ok(payload)
    }

    /// Get_Attribute_Single with range-checked ids. Failures after
    /// validation carry the ids that were requested.
    pub fn safe_get_attribute(
        &mut self,
        class_id: i64,
        instance_id: i64,
        attribute_id: i64,
    ) -> Result<AttributeResponse> {
        let class_id = object_id("class_id", class_id)?;
        let instance_id = object_id("instance_id", instance_id)?;
        let attribute_id = object_id("attribute_id", attribute_id)?;

        let path = ObjectPath::attribute(class_id, instance_id, attribute_id);
        let response = self
            .client
            .get_attribute_at(&path)
            .map_err(|source| ClientError::Attribute {
                class_id,
                instance_id,
                attribute_id,
                source: Box::new(source),
            })?;

        if let Some(session) = self.session.as_mut() {
            session.last_activity = Instant::now();
        }
        Ok(response)
    }

    /// Best-effort teardown. Never fails; always ends in
    /// [`SessionState::Closed`] with the transport disconnected.
    pub fn graceful_shutdown(&mut self) {
        if self.state == SessionState::Active {
            if let Err(err) = self.unregister() {
                warn!(error = %err, "failed to unregister secure session");
            }
        }

        if let Err(err) = self.client.transport_mut().disconnect() {
            debug!(error = %err, "disconnect failed during shutdown");
        }
        self.client.set_session_handle(0);
        self.session = None;
        self.state = SessionState::Closed;
        info!("secure session closed");
    }

    fn unregister(&mut self) -> Result<()> {
        let handle = self.session_handle().unwrap_or_default();
        let frame = self.client.frame(UNREGISTER_SESSION, handle, &[])?;
        self.client.transport_mut().send(&frame)?;
        Ok(())
    }

    fn active_session(&mut self) -> Result<&mut SecureSession> {
        match (self.state, self.session.as_mut()) {
            (SessionState::Active, Some(session)) => Ok(session),
            _ => Err(ClientError::SessionNotActive),
        }
    }
}

fn object_id(field: &'static str, value: i64) -> Result<u16> {
    validate_id(field, value).map_err(|_| ClientError::InvalidObjectId { field, value })
}

fn keyed_mac(key: &[u8], data: &[u8], sequence: u32) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|_| ClientError::Security("invalid MAC key length".to_string()))?;
    mac.update(data);
    mac.update(&sequence.to_le_bytes());
    Ok(mac)
}

/// HMAC-SHA-256 of `data ‖ sequence_le`, truncated to [`MAC_LEN`] bytes.
pub fn compute_mac(key: &[u8], data: &[u8], sequence: u32) -> Result<[u8; MAC_LEN]> {
    let tag = keyed_mac(key, data, sequence)?.finalize().into_bytes();
    let mut out = [0u8; MAC_LEN];
    out.copy_from_slice(&tag[..MAC_LEN]);
    Ok(out)
}

/// Constant-time check of a truncated tag.
pub fn verify_mac(key: &[u8], data: &[u8], sequence: u32, tag: &[u8]) -> Result<bool> {
    if tag.len() != MAC_LEN {
        return Ok(false);
    }
    Ok(keyed_mac(key, data, sequence)?
        .verify_truncated_left(tag)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use cipwire_cip::{CipError, Value};
    use cipwire_transport::MemoryTransport;

    use super::*;
    use crate::client::tests::reply;

    const HANDLE: u32 = 0x0102_0304;

    fn idle() -> (SecureClient<MemoryTransport>, MemoryTransport) {
        idle_with(SecureConfig::default())
    }

    fn idle_with(config: SecureConfig) -> (SecureClient<MemoryTransport>, MemoryTransport) {
        let transport = MemoryTransport::connected();
        let client = CipClient::new(transport.clone(), ClientConfig::default());
        (SecureClient::new(client, config), transport)
    }

    fn active() -> (SecureClient<MemoryTransport>, MemoryTransport) {
        let (mut client, transport) = idle();
        transport.push_reply(reply(REGISTER_SESSION, HANDLE, 0, &[]));
        client
            .establish_secure_session()
            .expect("session should establish");
        (client, transport)
    }

    fn nonce(client: &SecureClient<MemoryTransport>) -> [u8; NONCE_LEN] {
        client.session.as_ref().expect("session should exist").nonce
    }

    fn secure_reply(handle: u32, key: &[u8], payload: &[u8], sequence: u32) -> Bytes {
        let mac = compute_mac(key, payload, sequence).expect("mac should compute");
        let mut body = payload.to_vec();
        body.extend_from_slice(&sequence.to_le_bytes());
        body.extend_from_slice(&mac);
        reply(SEND_RR_DATA, handle, 0, &body)
    }

    #[test]
    fn establish_builds_registration_packet() {
        let (client, transport) = active();
        assert_eq!(client.state(), SessionState::Active);
        assert_eq!(client.session_handle(), Some(HANDLE));
        assert_eq!(client.sequence_number(), Some(0));
        assert_eq!(client.client().session_handle(), HANDLE);

        let packet = transport.last_sent().expect("registration should be sent");
        assert_eq!(packet.len(), REGISTRATION_LEN);
        assert_eq!(&packet[0..2], &[0x65, 0x00]);
        assert_eq!(&packet[2..4], &[0x01, 0x00]);
        assert_eq!(&packet[4..20], &nonce(&client));
        assert_eq!(packet[20], 0x00);
        assert!(packet[21..].iter().all(|b| *b == 0));
    }

    #[test]
    fn registration_carries_connection_params() {
        let config = SecureConfig {
            transport_direction: crate::TransportDirection::Server,
            production_trigger: crate::ProductionTrigger::ChangeOfState,
            ..SecureConfig::default()
        };
        let (mut client, transport) = idle_with(config);
        transport.push_reply(reply(REGISTER_SESSION, HANDLE, 0, &[]));
        client
            .establish_secure_session()
            .expect("session should establish");
        let packet = transport.last_sent().expect("registration should be sent");
        assert_eq!(packet[20], 0x90);
    }

    #[test]
    fn nonces_differ_between_sessions() {
        let (first, _) = active();
        let (second, _) = active();
        assert_ne!(nonce(&first), nonce(&second));
    }

    #[test]
    fn double_establish_rejected() {
        let (mut client, transport) = active();
        let err = client.establish_secure_session().unwrap_err();
        assert!(matches!(err, ClientError::SessionAlreadyActive));
        assert_eq!(client.state(), SessionState::Active);
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn rejected_registration_returns_to_idle() {
        let (mut client, transport) = idle();
        transport.push_reply(reply(REGISTER_SESSION, 0, 0x01, &[]));

        let err = client.establish_secure_session().unwrap_err();
        assert!(matches!(err, ClientError::SessionRegistrationFailed(_)));
        assert_eq!(client.state(), SessionState::Idle);
        assert!(client.session_handle().is_none());
    }

    #[test]
    fn short_registration_reply() {
        let (mut client, transport) = idle();
        transport.push_reply(Bytes::from_static(&[0x65, 0x00, 0x00, 0x00]));

        let err = client.establish_secure_session().unwrap_err();
        assert!(matches!(err, ClientError::SessionRegistrationFailed(_)));
        assert_eq!(client.state(), SessionState::Idle);
    }

    #[test]
    fn registration_timeout_returns_to_idle() {
        let (mut client, _transport) = idle();
        let err = client.establish_secure_session().unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(client.state(), SessionState::Idle);
    }

    #[test]
    fn send_increments_sequence_and_signs() {
        let (mut client, transport) = active();
        client.send_secure_data(b"cmd-1").expect("send should succeed");
        client.send_secure_data(b"cmd-2").expect("send should succeed");
        assert_eq!(client.sequence_number(), Some(2));

        let frame = transport.last_sent().expect("data should be sent");
        let header = EncapsulationHeader::decode(&frame).expect("header should decode");
        assert_eq!(header.command, SEND_RR_DATA);
        assert_eq!(header.session_handle, HANDLE);
        assert_eq!(header.length as usize, 5 + SEQUENCE_LEN + MAC_LEN);

        let body = &frame[HEADER_SIZE..];
        assert_eq!(&body[..5], b"cmd-2");
        assert_eq!(&body[5..9], &2u32.to_le_bytes());
        assert!(verify_mac(&nonce(&client), b"cmd-2", 2, &body[9..]).expect("verify should run"));
    }

    #[test]
    fn send_requires_active_session() {
        let (mut client, transport) = idle();
        let err = client.send_secure_data(b"x").unwrap_err();
        assert!(matches!(err, ClientError::SessionNotActive));
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn send_requires_point_to_point() {
        let config = SecureConfig {
            connection_type: ConnectionType::Multicast,
            ..SecureConfig::default()
        };
        let (mut client, _transport) = idle_with(config);
        let err = client.send_secure_data(b"x").unwrap_err();
        assert!(matches!(err, ClientError::NotPointToPoint));
    }

    #[test]
    fn sequence_exhaustion() {
        let (mut client, _transport) = active();
        if let Some(session) = client.session.as_mut() {
            session.sequence = u32::MAX;
        }
        let err = client.send_secure_data(b"x").unwrap_err();
        assert!(matches!(err, ClientError::Security(_)));
    }

    #[test]
    fn receive_returns_authenticated_payload() {
        let (mut client, transport) = active();
        let key = nonce(&client);
        transport.push_reply(secure_reply(HANDLE, &key, b"status-ok", 1));

        let payload = client
            .receive_with_validation()
            .expect("receive should succeed");
        assert_eq!(payload.as_ref(), b"status-ok");
    }

    #[test]
    fn receive_rejects_flipped_bit() {
        let (mut client, transport) = active();
        let key = nonce(&client);
        let mut tampered = secure_reply(HANDLE, &key, b"status-ok", 1).to_vec();
        tampered[HEADER_SIZE] ^= 0x01;
        transport.push_reply(tampered);

        let err = client.receive_with_validation().unwrap_err();
        assert!(matches!(err, ClientError::Security(_)));
    }

    #[test]
    fn receive_rejects_wrong_key() {
        let (mut client, transport) = active();
        transport.push_reply(secure_reply(HANDLE, &[0u8; NONCE_LEN], b"data", 1));
        let err = client.receive_with_validation().unwrap_err();
        assert!(matches!(err, ClientError::Security(_)));
    }

    #[test]
    fn receive_rejects_replay() {
        let (mut client, transport) = active();
        let key = nonce(&client);
        let message = secure_reply(HANDLE, &key, b"once", 5);
        transport.push_reply(message.clone());
        transport.push_reply(message);

        client
            .receive_with_validation()
            .expect("first delivery should pass");
        let err = client.receive_with_validation().unwrap_err();
        assert!(matches!(err, ClientError::Security(ref msg) if msg.contains("replayed")));
    }

    #[test]
    fn receive_rejects_foreign_handle() {
        let (mut client, transport) = active();
        let key = nonce(&client);
        transport.push_reply(secure_reply(0xDEAD_BEEF, &key, b"x", 1));

        let err = client.receive_with_validation().unwrap_err();
        assert!(matches!(
            err,
            ClientError::SessionHandleMismatch {
                expected: HANDLE,
                actual: 0xDEAD_BEEF
            }
        ));
    }

    #[test]
    fn receive_length_checks() {
        let (mut client, transport) = active();
        transport.push_reply(Bytes::from_static(&[0u8; 10]));
        assert!(matches!(
            client.receive_with_validation().unwrap_err(),
            ClientError::InvalidLength { len: 10, min: HEADER_SIZE }
        ));

        transport.push_reply(reply(SEND_RR_DATA, HANDLE, 0, &[1, 2, 3, 4, 5]));
        assert!(matches!(
            client.receive_with_validation().unwrap_err(),
            ClientError::InvalidLength {
                min: MIN_SECURE_REPLY_LEN,
                ..
            }
        ));
    }

    #[test]
    fn receive_rejects_frame_shorter_than_header_length() {
        let (mut client, transport) = active();
        let key = nonce(&client);
        let full = secure_reply(HANDLE, &key, b"truncated", 1);
        transport.push_reply(full.slice(..full.len() - 3));

        let err = client.receive_with_validation().unwrap_err();
        assert!(matches!(
            err,
            ClientError::Frame(FrameError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn empty_payload_is_valid() {
        let (mut client, transport) = active();
        let key = nonce(&client);
        transport.push_reply(secure_reply(HANDLE, &key, b"", 1));
        let payload = client
            .receive_with_validation()
            .expect("receive should succeed");
        assert!(payload.is_empty());
    }

    #[test]
    fn safe_get_attribute_validates_ids() {
        let (mut client, transport) = active();
        let err = client.safe_get_attribute(1, 70000, 1).unwrap_err();
        assert!(matches!(
            err,
            ClientError::InvalidObjectId {
                field: "instance_id",
                value: 70000
            }
        ));
        let err = client.safe_get_attribute(-1, 1, 1).unwrap_err();
        assert!(matches!(err, ClientError::InvalidObjectId { field: "class_id", .. }));
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn safe_get_attribute_reads_value() {
        let (mut client, transport) = active();
        transport.push_reply(reply(SEND_RR_DATA, HANDLE, 0, &[0, 0, 0x00, 0xC2, 0xF6]));

        let response = client
            .safe_get_attribute(0x04, 100, 3)
            .expect("read should succeed");
        assert_eq!(response.value, Value::Sint(-10));

        let request = transport.last_sent().expect("request should be sent");
        assert_eq!(&request[4..8], &HANDLE.to_le_bytes());
    }

    #[test]
    fn safe_get_attribute_wraps_failures() {
        let (mut client, transport) = active();
        transport.push_reply(reply(SEND_RR_DATA, HANDLE, 0, &[0x05, 0x00, 0x00, 0x00]));

        let err = client.safe_get_attribute(1, 2, 3).unwrap_err();
        let ClientError::Attribute {
            class_id,
            instance_id,
            attribute_id,
            ref source,
        } = err
        else {
            panic!("expected Attribute");
        };
        assert_eq!((class_id, instance_id, attribute_id), (1, 2, 3));
        assert!(matches!(
            **source,
            ClientError::Cip(CipError::ProtocolStatus { .. })
        ));
        assert_eq!(
            err.cip_status().map(|s| s.name),
            Some("PathDestinationUnknown")
        );
        assert!(err.to_string().starts_with("attribute 1/2/3:"));
    }

    #[test]
    fn shutdown_unregisters_and_closes() {
        let (mut client, transport) = active();
        client.graceful_shutdown();

        assert_eq!(client.state(), SessionState::Closed);
        assert!(client.session_handle().is_none());
        assert!(!transport.is_connected());

        let frame = transport.last_sent().expect("unregister should be sent");
        assert_eq!(&frame[0..2], &[0x66, 0x00]);
        assert_eq!(&frame[4..8], &HANDLE.to_le_bytes());
    }

    #[test]
    fn closed_is_terminal() {
        let (mut client, _transport) = active();
        client.graceful_shutdown();
        assert!(matches!(
            client.establish_secure_session(),
            Err(ClientError::SessionAlreadyActive)
        ));
        assert!(matches!(
            client.receive_with_validation(),
            Err(ClientError::SessionNotActive)
        ));
    }

    #[test]
    fn shutdown_from_idle_only_disconnects() {
        let (mut client, transport) = idle();
        client.graceful_shutdown();
        assert_eq!(client.state(), SessionState::Closed);
        assert!(transport.sent().is_empty());
        assert_eq!(transport.disconnect_count(), 1);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0
                .lock()
                .expect("log buffer lock should not be poisoned")
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn shutdown_swallows_and_logs_failures() {
        let (mut client, transport) = active();
        transport.set_fail_sends(true);
        transport.set_fail_disconnect(true);

        let logs = Captured::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        tracing::subscriber::with_default(subscriber, || client.graceful_shutdown());

        assert_eq!(client.state(), SessionState::Closed);
        assert_eq!(transport.disconnect_count(), 1);

        let output = String::from_utf8(
            logs.0
                .lock()
                .expect("log buffer lock should not be poisoned")
                .clone(),
        )
        .expect("logs should be utf-8");
        assert!(output.contains("failed to unregister secure session"), "{output}");
        assert!(output.contains("WARN"), "{output}");
    }

    #[test]
    fn debug_output_redacts_nonce() {
        let (client, _transport) = active();
        let key = nonce(&client);
        let text = format!("{client:?}");
        assert!(text.contains("<redacted>"));
        assert!(!text.contains(&format!("{:?}", key)));
    }
}
