use serde::Serialize;

use crate::codec::{decode, Value};
use crate::error::{CipError, Operation, Result};
use crate::status::{parse_status, CipStatus};

/// Minimum Get_Attribute_Single reply: status, one spare byte, type code.
const MIN_GET_RESPONSE_LEN: usize = 4;

/// Decoded Get_Attribute_Single reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeResponse {
    pub data_type: u16,
    pub value: Value,
}

/// Set_Attribute_Single reply; only produced for a zero status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SetAttributeResponse {
    pub success: bool,
}

/// Parse a Get_Attribute_Single reply.
///
/// Layout: `status u8`, then for status 0 a big-endian `u16` type code at
/// offset 2 followed by the value bytes. A nonzero status carries a
/// big-endian extended status at offset 1.
pub fn parse_attribute_response(response: &[u8], big_endian: bool) -> Result<AttributeResponse> {
    if response.len() < MIN_GET_RESPONSE_LEN {
        return Err(CipError::ResponseFormat("Invalid response length".to_string()));
    }

    let status = reply_status(response);
    if !status.is_success() {
        return Err(CipError::ProtocolStatus {
            operation: Operation::GetAttribute,
            status,
            raw_hex: hex::encode(response),
        });
    }

    let data_type = u16::from_be_bytes([response[2], response[3]]);
    let data = &response[MIN_GET_RESPONSE_LEN..];
    let value = decode(data_type, data, big_endian).map_err(|source| CipError::Decode {
        data_hex: hex::encode(data),
        source: Box::new(source),
    })?;

    Ok(AttributeResponse { data_type, value })
}

/// Parse a Set_Attribute_Single reply (a single status byte).
pub fn parse_set_attribute_response(response: &[u8]) -> Result<SetAttributeResponse> {
    if response.is_empty() {
        return Err(CipError::ResponseFormat("Empty response".to_string()));
    }

    let status = reply_status(response);
    if !status.is_success() {
        return Err(CipError::ProtocolStatus {
            operation: Operation::SetAttribute,
            status,
            raw_hex: hex::encode(response),
        });
    }

    Ok(SetAttributeResponse { success: true })
}

fn reply_status(response: &[u8]) -> CipStatus {
    let code = response[0] as u16;
    let extended = if code != 0 && response.len() >= 3 {
        u16::from_be_bytes([response[1], response[2]])
    } else {
        0
    };
    parse_status(code, extended)
}
