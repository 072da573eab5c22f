use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use cipwire_cip::service::{identity, GET_ATTRIBUTE_SINGLE, IDENTITY_CLASS, SET_ATTRIBUTE_SINGLE};
use cipwire_cip::{
    encode, parse_attribute_response, parse_set_attribute_response, AttributeResponse,
    ObjectPath, SetAttributeResponse, Value,
};
use cipwire_frame::{
    encode_message, EncapsulationHeader, FrameError, HEADER_SIZE, REGISTER_SESSION, SEND_RR_DATA,
    UNREGISTER_SESSION,
};
use cipwire_transport::{TcpTransport, Transport};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Identity object summary read by [`CipClient::get_identity_info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IdentityInfo {
    pub vendor_id: u16,
    pub product_code: u16,
    pub serial_number: u32,
}

/// Explicit-messaging client bound to one transport and one session.
///
/// Every request is sent and its reply awaited before the call returns.
#[derive(Debug)]
pub struct CipClient<T: Transport = TcpTransport> {
    transport: T,
    config: ClientConfig,
    session_handle: u32,
}

impl CipClient<TcpTransport> {
    /// Connect over TCP and register a session with default settings.
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        Self::connect_with_config(host, port, ClientConfig::default())
    }

    /// Connect over TCP and register a session.
    pub fn connect_with_config(host: &str, port: u16, config: ClientConfig) -> Result<Self> {
        let transport = TcpTransport::with_connect_timeout(config.connect_timeout);
        let mut client = Self::new(transport, config);
        client.open(host, port)?;
        Ok(client)
    }
}

impl<T: Transport> CipClient<T> {
    /// Wrap a transport. No I/O happens until [`open`](Self::open) or a
    /// request is made.
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            session_handle: 0,
        }
    }

    /// Connect the transport and register a session.
    pub fn open(&mut self, host: &str, port: u16) -> Result<u32> {
        self.transport.connect(host, port)?;
        debug!(host, port, "transport connected");
        self.register_session()
    }

    /// Send RegisterSession and adopt the handle from the reply header.
    pub fn register_session(&mut self) -> Result<u32> {
        let mut payload = BytesMut::with_capacity(4);
        payload.put_u16_le(self.config.protocol_version);
        payload.put_u16_le(0); // option flags

        let request = self.frame(REGISTER_SESSION, 0, &payload)?;
        let reply = self.exchange(&request, self.config.timeout)?;
        let header = reply_header(&reply)?;

        self.session_handle = header.session_handle;
        info!(session_handle = header.session_handle, "session registered");
        Ok(header.session_handle)
    }

    /// Send UnRegisterSession. Devices close the connection instead of
    /// replying, so no reply is awaited.
    pub fn unregister_session(&mut self) -> Result<()> {
        if self.session_handle == 0 {
            return Ok(());
        }
        let request = self.frame(UNREGISTER_SESSION, self.session_handle, &[])?;
        self.transport.send(&request)?;
        info!(session_handle = self.session_handle, "session unregistered");
        self.session_handle = 0;
        Ok(())
    }

    /// Issue one CIP service request inside SendRRData and return the reply
    /// bytes that follow the encapsulation header.
    pub fn send_cip_request(
        &mut self,
        service: u8,
        path: &ObjectPath,
        request_data: &[u8],
    ) -> Result<Bytes> {
        let mut payload = BytesMut::with_capacity(2 + path.encoded_len() + request_data.len());
        payload.put_u8(service);
        payload.put_u8(path.len_words());
        path.encode(&mut payload);
        payload.put_slice(request_data);

        let request = self.frame(SEND_RR_DATA, self.session_handle, &payload)?;
        debug!(service, len = request.len(), "sending CIP request");
        let reply = self.exchange(&request, self.config.timeout)?;
        reply_header(&reply)?;
        Ok(reply.slice(HEADER_SIZE..))
    }

    /// Get_Attribute_Single.
    pub fn get_attribute(
        &mut self,
        class_id: u16,
        instance_id: u16,
        attribute_id: u16,
    ) -> Result<AttributeResponse> {
        self.get_attribute_at(&ObjectPath::attribute(class_id, instance_id, attribute_id))
    }

    pub(crate) fn get_attribute_at(&mut self, path: &ObjectPath) -> Result<AttributeResponse> {
        let reply = self.send_cip_request(GET_ATTRIBUTE_SINGLE, path, &[])?;
        Ok(parse_attribute_response(&reply, self.config.big_endian)?)
    }

    /// Set_Attribute_Single with `value` encoded as `type_code`.
    pub fn set_attribute(
        &mut self,
        class_id: u16,
        instance_id: u16,
        attribute_id: u16,
        value: &Value,
        type_code: u16,
    ) -> Result<SetAttributeResponse> {
        let data = encode(value, type_code, self.config.big_endian)?;
        let path = ObjectPath::attribute(class_id, instance_id, attribute_id);
        let reply = self.send_cip_request(SET_ATTRIBUTE_SINGLE, &path, &data)?;
        Ok(parse_set_attribute_response(&reply)?)
    }

    /// Read vendor id, product code and serial number from Identity/1.
    pub fn get_identity_info(&mut self) -> Result<IdentityInfo> {
        let vendor_id = self.identity_attribute(identity::VENDOR_ID)?;
        let product_code = self.identity_attribute(identity::PRODUCT_CODE)?;
        let serial_number = self.identity_attribute(identity::SERIAL_NUMBER)?;

        let narrow = |attribute: u16, value: u32| {
            u16::try_from(value).map_err(|_| ClientError::UnexpectedValue {
                attribute,
                kind: "out-of-range",
            })
        };
        Ok(IdentityInfo {
            vendor_id: narrow(identity::VENDOR_ID, vendor_id)?,
            product_code: narrow(identity::PRODUCT_CODE, product_code)?,
            serial_number,
        })
    }

    fn identity_attribute(&mut self, attribute: u16) -> Result<u32> {
        let response = self.get_attribute(IDENTITY_CLASS, identity::INSTANCE, attribute)?;
        response
            .value
            .as_unsigned()
            .ok_or(ClientError::UnexpectedValue {
                attribute,
                kind: response.value.kind(),
            })
    }

    /// Unregister the session and disconnect the transport.
    pub fn close(mut self) -> Result<()> {
        let unregistered = self.unregister_session();
        self.transport.disconnect()?;
        unregistered
    }

    /// Handle assigned by the device; 0 when no session is registered.
    pub fn session_handle(&self) -> u32 {
        self.session_handle
    }

    pub(crate) fn set_session_handle(&mut self, handle: u32) {
        self.session_handle = handle;
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Encode a request frame, enforcing the configured payload limit.
    pub(crate) fn frame(&self, command: u16, session_handle: u32, payload: &[u8]) -> Result<Bytes> {
        if payload.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_size,
            }
            .into());
        }
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
        encode_message(
            command,
            session_handle,
            self.config.sender_context,
            payload,
            &mut buf,
        )?;
        Ok(buf.freeze())
    }

    pub(crate) fn exchange(&mut self, request: &[u8], timeout: Duration) -> Result<Bytes> {
        self.transport.send(request)?;
        Ok(self.transport.receive(timeout)?)
    }
}

/// Decode a reply header, requiring the reply to be exactly one frame with
/// a zero status.
fn reply_header(reply: &[u8]) -> Result<EncapsulationHeader> {
    let header = EncapsulationHeader::decode(reply)?;
    let declared = HEADER_SIZE + header.length as usize;
    if reply.len() != declared {
        return Err(FrameError::LengthMismatch {
            declared,
            actual: reply.len(),
        }
        .into());
    }
    if header.status != 0 {
        return Err(ClientError::encapsulation(header.status));
    }
    Ok(header)
}
