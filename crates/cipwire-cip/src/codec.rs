//! CIP data-type registry and value codec.
//!
//! Scalars honor the caller's endianness flag. Compound headers (ARRAY
//! element type and count, STRUCT member count and member type codes) are
//! always big-endian.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::Serialize;
use tracing::trace;

use crate::error::{CipError, Result};

pub const BOOL: u16 = 0xC1;
pub const SINT: u16 = 0xC2;
pub const INT: u16 = 0xC3;
pub const DINT: u16 = 0xC4;
pub const REAL: u16 = 0xCA;
pub const LREAL: u16 = 0xCB;
pub const STRING: u16 = 0xDA;
pub const ARRAY: u16 = 0xE0;
pub const STRUCT: u16 = 0xE1;

/// Longest STRING payload; longer input is truncated.
pub const MAX_STRING_LEN: usize = u8::MAX as usize;
/// Deepest ARRAY/STRUCT nesting `decode` accepts.
pub const MAX_NESTING_DEPTH: usize = 32;

/// The closed set of supported wire types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Bool,
    Sint,
    Int,
    Dint,
    Real,
    Lreal,
    String,
    Array,
    Struct,
}

impl DataType {
    pub const ALL: [DataType; 9] = [
        DataType::Bool,
        DataType::Sint,
        DataType::Int,
        DataType::Dint,
        DataType::Real,
        DataType::Lreal,
        DataType::String,
        DataType::Array,
        DataType::Struct,
    ];

    pub const fn code(self) -> u16 {
        match self {
            DataType::Bool => BOOL,
            DataType::Sint => SINT,
            DataType::Int => INT,
            DataType::Dint => DINT,
            DataType::Real => REAL,
            DataType::Lreal => LREAL,
            DataType::String => STRING,
            DataType::Array => ARRAY,
            DataType::Struct => STRUCT,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.code() == code)
    }

    /// Wire size of fixed-size types; `None` for variable-length ones.
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            DataType::Bool | DataType::Sint => Some(1),
            DataType::Int => Some(2),
            DataType::Dint | DataType::Real => Some(4),
            DataType::Lreal => Some(8),
            DataType::String | DataType::Array | DataType::Struct => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            DataType::Bool => "BOOL",
            DataType::Sint => "SINT",
            DataType::Int => "INT",
            DataType::Dint => "DINT",
            DataType::Real => "REAL",
            DataType::Lreal => "LREAL",
            DataType::String => "STRING",
            DataType::Array => "ARRAY",
            DataType::Struct => "STRUCT",
        }
    }
}

/// One STRUCT member: its type code and value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Member {
    pub type_code: u16,
    pub value: Value,
}

/// A decoded CIP value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Value {
    Bool(bool),
    Sint(i8),
    Int(i16),
    Dint(i32),
    Real(f32),
    Lreal(f64),
    String(String),
    Array {
        element_type: u16,
        elements: Vec<Value>,
    },
    Struct(Vec<Member>),
    /// Bytes of a nested element whose type code is not in the registry.
    Raw(Vec<u8>),
}

impl Value {
    /// Variant name, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "BOOL",
            Value::Sint(_) => "SINT",
            Value::Int(_) => "INT",
            Value::Dint(_) => "DINT",
            Value::Real(_) => "REAL",
            Value::Lreal(_) => "LREAL",
            Value::String(_) => "STRING",
            Value::Array { .. } => "ARRAY",
            Value::Struct(_) => "STRUCT",
            Value::Raw(_) => "RAW",
        }
    }

    /// Integer view of BOOL and integer variants.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Bool(b) => Some(b as i64),
            Value::Sint(v) => Some(v.into()),
            Value::Int(v) => Some(v.into()),
            Value::Dint(v) => Some(v.into()),
            _ => None,
        }
    }

    /// Floating-point view of any numeric variant.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Real(v) => Some(v.into()),
            Value::Lreal(v) => Some(v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    /// Integer variants reinterpreted as their unsigned bit pattern.
    pub fn as_unsigned(&self) -> Option<u32> {
        match *self {
            Value::Sint(v) => Some(v as u8 as u32),
            Value::Int(v) => Some(v as u16 as u32),
            Value::Dint(v) => Some(v as u32),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Encode `value` as the type identified by `type_code`.
pub fn encode(value: &Value, type_code: u16, big_endian: bool) -> Result<Bytes> {
    let data_type = DataType::from_code(type_code).ok_or(CipError::UnsupportedDataType(type_code))?;
    let mut buf = BytesMut::new();
    encode_into(value, data_type, big_endian, &mut buf)?;
    Ok(buf.freeze())
}

fn encode_into(value: &Value, data_type: DataType, big_endian: bool, dst: &mut BytesMut) -> Result<()> {
    match data_type {
        DataType::Bool => {
            let flag = match value {
                Value::Bool(b) => *b,
                other => integer(other, data_type)? != 0,
            };
            dst.put_u8(if flag { 0xFF } else { 0x00 });
        }
        DataType::Sint => {
            let v = integer_in(value, data_type, i8::MIN.into(), i8::MAX.into())?;
            dst.put_i8(v as i8);
        }
        DataType::Int => {
            let v = integer_in(value, data_type, i16::MIN.into(), i16::MAX.into())? as i16;
            if big_endian {
                dst.put_i16(v);
            } else {
                dst.put_i16_le(v);
            }
        }
        DataType::Dint => {
            let v = integer_in(value, data_type, i32::MIN.into(), i32::MAX.into())? as i32;
            if big_endian {
                dst.put_i32(v);
            } else {
                dst.put_i32_le(v);
            }
        }
        DataType::Real => {
            let v = float(value, data_type)? as f32;
            if big_endian {
                dst.put_f32(v);
            } else {
                dst.put_f32_le(v);
            }
        }
        DataType::Lreal => {
            let v = float(value, data_type)?;
            if big_endian {
                dst.put_f64(v);
            } else {
                dst.put_f64_le(v);
            }
        }
        DataType::String => {
            let Value::String(text) = value else {
                return Err(mismatch(value, data_type));
            };
            let bytes: Vec<u8> = text
                .chars()
                .take(MAX_STRING_LEN)
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect();
            dst.put_u8(bytes.len() as u8);
            dst.put_slice(&bytes);
        }
        DataType::Array => {
            let Value::Array {
                element_type,
                elements,
            } = value
            else {
                return Err(mismatch(value, data_type));
            };
            let element_data_type = DataType::from_code(*element_type)
                .ok_or(CipError::UnsupportedDataType(*element_type))?;
            dst.put_u16(*element_type);
            dst.put_u16(count(elements.len(), data_type)?);
            for element in elements {
                encode_into(element, element_data_type, big_endian, dst)?;
            }
        }
        DataType::Struct => {
            let Value::Struct(members) = value else {
                return Err(mismatch(value, data_type));
            };
            dst.put_u16(count(members.len(), data_type)?);
            for member in members {
                let member_type = DataType::from_code(member.type_code)
                    .ok_or(CipError::UnsupportedDataType(member.type_code))?;
                dst.put_u16(member.type_code);
                encode_into(&member.value, member_type, big_endian, dst)?;
            }
        }
    }
    Ok(())
}

fn mismatch(value: &Value, data_type: DataType) -> CipError {
    CipError::TypeMismatch {
        expected: data_type.name(),
        found: value.kind(),
    }
}

fn integer(value: &Value, data_type: DataType) -> Result<i64> {
    value.as_i64().ok_or_else(|| mismatch(value, data_type))
}

fn integer_in(value: &Value, data_type: DataType, min: i64, max: i64) -> Result<i64> {
    let v = integer(value, data_type)?;
    if v < min || v > max {
        return Err(CipError::ValueOutOfRange {
            data_type: data_type.name(),
            value: v.to_string(),
        });
    }
    Ok(v)
}

fn float(value: &Value, data_type: DataType) -> Result<f64> {
    value.as_f64().ok_or_else(|| mismatch(value, data_type))
}

fn count(len: usize, data_type: DataType) -> Result<u16> {
    u16::try_from(len).map_err(|_| CipError::ValueOutOfRange {
        data_type: data_type.name(),
        value: format!("{len} items"),
    })
}

/// Decode `data` as the type identified by `type_code`.
///
/// Unknown codes fail with [`CipError::UnsupportedDataType`]. Inside ARRAY
/// and STRUCT, an unknown element or member type is not an error: the
/// remaining bytes are returned untouched as [`Value::Raw`].
pub fn decode(type_code: u16, data: &[u8], big_endian: bool) -> Result<Value> {
    let data_type = DataType::from_code(type_code).ok_or(CipError::UnsupportedDataType(type_code))?;
    decode_typed(data_type, data, big_endian, 0).map(|(value, _)| value)
}

/// Decode a nested element, returning the value and the bytes it used.
fn decode_nested(
    type_code: u16,
    data: &[u8],
    big_endian: bool,
    depth: usize,
) -> Result<(Value, usize)> {
    if depth > MAX_NESTING_DEPTH {
        return Err(CipError::NestingTooDeep {
            limit: MAX_NESTING_DEPTH,
        });
    }
    match DataType::from_code(type_code) {
        Some(data_type) => decode_typed(data_type, data, big_endian, depth),
        None => {
            trace!(type_code, len = data.len(), "unknown nested type, keeping raw bytes");
            Ok((Value::Raw(data.to_vec()), data.len()))
        }
    }
}

fn decode_typed(
    data_type: DataType,
    data: &[u8],
    big_endian: bool,
    depth: usize,
) -> Result<(Value, usize)> {
    if let Some(size) = data_type.fixed_size() {
        need(data, size, data_type)?;
    }
    let mut buf = data;

    let decoded = match data_type {
        DataType::Bool => (Value::Bool(buf.get_u8() != 0), 1),
        DataType::Sint => (Value::Sint(buf.get_i8()), 1),
        DataType::Int => {
            let v = if big_endian { buf.get_i16() } else { buf.get_i16_le() };
            (Value::Int(v), 2)
        }
        DataType::Dint => {
            let v = if big_endian { buf.get_i32() } else { buf.get_i32_le() };
            (Value::Dint(v), 4)
        }
        DataType::Real => {
            let v = if big_endian { buf.get_f32() } else { buf.get_f32_le() };
            (Value::Real(v), 4)
        }
        DataType::Lreal => {
            let v = if big_endian { buf.get_f64() } else { buf.get_f64_le() };
            (Value::Lreal(v), 8)
        }
        DataType::String => {
            need(data, 1, data_type)?;
            let len = buf.get_u8() as usize;
            need(data, 1 + len, data_type)?;
            let text = buf[..len].iter().map(|&b| b as char).collect();
            (Value::String(text), 1 + len)
        }
        DataType::Array => {
            need(data, 4, data_type)?;
            let element_type = buf.get_u16();
            let len = buf.get_u16() as usize;
            let mut offset = 4;
            let mut elements = Vec::with_capacity(len.min(data.len()));
            for _ in 0..len {
                let (element, used) =
                    decode_nested(element_type, &data[offset..], big_endian, depth + 1)?;
                let raw = matches!(element, Value::Raw(_));
                elements.push(element);
                offset += used;
                if raw {
                    break;
                }
            }
            (
                Value::Array {
                    element_type,
                    elements,
                },
                offset,
            )
        }
        DataType::Struct => {
            need(data, 2, data_type)?;
            let len = buf.get_u16() as usize;
            let mut offset = 2;
            let mut members = Vec::with_capacity(len.min(data.len()));
            for _ in 0..len {
                need(data, offset + 2, data_type)?;
                let type_code = u16::from_be_bytes([data[offset], data[offset + 1]]);
                offset += 2;
                let (value, used) =
                    decode_nested(type_code, &data[offset..], big_endian, depth + 1)?;
                let raw = matches!(value, Value::Raw(_));
                members.push(Member { type_code, value });
                offset += used;
                if raw {
                    break;
                }
            }
            (Value::Struct(members), offset)
        }
    };
    Ok(decoded)
}

fn need(data: &[u8], needed: usize, data_type: DataType) -> Result<()> {
    if data.len() < needed {
        return Err(CipError::InsufficientData {
            data_type: data_type.name(),
            needed,
            available: data.len(),
        });
    }
    Ok(())
}
