use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_message, EncapsulationMessage, MAX_PAYLOAD};
use crate::error::FrameError;

/// `tokio_util` codec for encapsulation frames on an async byte stream.
#[derive(Debug, Clone)]
pub struct EncapsulationCodec {
    max_payload_size: usize,
}

impl EncapsulationCodec {
    pub fn new() -> Self {
        Self::with_max_payload(MAX_PAYLOAD)
    }

    pub fn with_max_payload(max_payload_size: usize) -> Self {
        Self { max_payload_size }
    }
}

impl Default for EncapsulationCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for EncapsulationCodec {
    type Item = EncapsulationMessage;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_message(src, self.max_payload_size)
    }
}

impl Encoder<EncapsulationMessage> for EncapsulationCodec {
    type Error = FrameError;

    fn encode(&mut self, item: EncapsulationMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.payload.len() > self.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: item.payload.len(),
                max: self.max_payload_size,
            });
        }
        item.encode(dst);
        Ok(())
    }
}
