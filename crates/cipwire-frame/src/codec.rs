use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Encapsulation header: command (2) + length (2) + session handle (4)
/// + status (4) + sender context (8) + options (4) = 24 bytes.
pub const HEADER_SIZE: usize = 24;

/// The length field is 16 bits wide.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// Fixed encapsulation header.
///
/// Wire format (all fields little-endian):
/// ```text
/// ┌─────────┬────────┬────────────────┬────────┬────────────────┬─────────┐
/// │ Command │ Length │ Session handle │ Status │ Sender context │ Options │
/// │ u16 @0  │ u16 @2 │ u32 @4         │ u32 @8 │ 8B @12         │ u32 @20 │
/// └─────────┴────────┴────────────────┴────────┴────────────────┴─────────┘
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncapsulationHeader {
    pub command: u16,
    /// Payload byte count following the header.
    pub length: u16,
    pub session_handle: u32,
    /// Always zero on requests; nonzero on replies signals an error.
    pub status: u32,
    /// Opaque bytes echoed back by the device.
    pub sender_context: [u8; 8],
    pub options: u32,
}

impl EncapsulationHeader {
    /// Write the 24 header bytes.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(HEADER_SIZE);
        dst.put_u16_le(self.command);
        dst.put_u16_le(self.length);
        dst.put_u32_le(self.session_handle);
        dst.put_u32_le(self.status);
        dst.put_slice(&self.sender_context);
        dst.put_u32_le(self.options);
    }

    /// Read a header from the first 24 bytes of `src`.
    pub fn decode(mut src: &[u8]) -> Result<Self> {
        if src.len() < HEADER_SIZE {
            return Err(FrameError::Truncated {
                len: src.len(),
                needed: HEADER_SIZE,
            });
        }

        let command = src.get_u16_le();
        let length = src.get_u16_le();
        let session_handle = src.get_u32_le();
        let status = src.get_u32_le();
        let mut sender_context = [0u8; 8];
        src.copy_to_slice(&mut sender_context);
        let options = src.get_u32_le();

        Ok(Self {
            command,
            length,
            session_handle,
            status,
            sender_context,
            options,
        })
    }
}

/// A complete encapsulation frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncapsulationMessage {
    pub header: EncapsulationHeader,
    pub payload: Bytes,
}

impl EncapsulationMessage {
    /// Build a request frame. The length field is derived from the payload.
    pub fn new(
        command: u16,
        session_handle: u32,
        sender_context: [u8; 8],
        payload: impl Into<Bytes>,
    ) -> Result<Self> {
        let payload = payload.into();
        let length = checked_length(payload.len())?;
        Ok(Self {
            header: EncapsulationHeader {
                command,
                length,
                session_handle,
                status: 0,
                sender_context,
                options: 0,
            },
            payload,
        })
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Append the frame to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.wire_size());
        self.header.encode(dst);
        dst.put_slice(&self.payload);
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Parse one complete frame from the start of `src`.
    ///
    /// Bytes past the declared payload length are ignored.
    pub fn parse(src: &[u8]) -> Result<Self> {
        let header = EncapsulationHeader::decode(src)?;
        let total = HEADER_SIZE + header.length as usize;
        if src.len() < total {
            return Err(FrameError::Truncated {
                len: src.len(),
                needed: total,
            });
        }
        Ok(Self {
            header,
            payload: Bytes::copy_from_slice(&src[HEADER_SIZE..total]),
        })
    }
}

/// Encode a frame directly into the wire format.
pub fn encode_message(
    command: u16,
    session_handle: u32,
    sender_context: [u8; 8],
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    let header = EncapsulationHeader {
        command,
        length: checked_length(payload.len())?,
        session_handle,
        status: 0,
        sender_context,
        options: 0,
    };
    dst.reserve(HEADER_SIZE + payload.len());
    header.encode(dst);
    dst.put_slice(payload);
    Ok(())
}

/// Decode a frame from a stream buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_message(
    src: &mut BytesMut,
    max_payload: usize,
) -> Result<Option<EncapsulationMessage>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    let header = EncapsulationHeader::decode(&src[..HEADER_SIZE])?;
    let payload_len = header.length as usize;
    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + payload_len;
    if src.len() < total {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(EncapsulationMessage { header, payload }))
}

fn checked_length(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| FrameError::PayloadTooLarge {
        size: len,
        max: MAX_PAYLOAD,
    })
}

/// Configuration for streaming frame decoding.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum accepted payload size in bytes. Default: 65535.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD,
        }
    }
}
