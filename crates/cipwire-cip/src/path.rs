use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{CipError, Result};

/// Logical segment type byte for a class id (8-bit format).
pub const CLASS_SEGMENT: u8 = 0x20;
/// Logical segment type byte for an instance id (8-bit format).
pub const INSTANCE_SEGMENT: u8 = 0x24;
/// Logical segment type byte for an attribute id (8-bit format).
pub const ATTRIBUTE_SEGMENT: u8 = 0x30;

/// Logical format bits selecting a 16-bit value (padded, little-endian).
const FORMAT_16_BIT: u8 = 0x01;

/// Which object level a segment addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Class,
    Instance,
    Attribute,
}

impl SegmentKind {
    /// The 8-bit-format segment type byte.
    pub fn type_byte(self) -> u8 {
        match self {
            SegmentKind::Class => CLASS_SEGMENT,
            SegmentKind::Instance => INSTANCE_SEGMENT,
            SegmentKind::Attribute => ATTRIBUTE_SEGMENT,
        }
    }

    /// Argument name used in validation errors.
    pub fn field_name(self) -> &'static str {
        match self {
            SegmentKind::Class => "class_id",
            SegmentKind::Instance => "instance_id",
            SegmentKind::Attribute => "attribute_id",
        }
    }
}

/// One class, instance or attribute segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalSegment {
    pub kind: SegmentKind,
    pub id: u16,
}

impl LogicalSegment {
    /// Encoded size: 2 bytes for ids up to 255, 4 bytes otherwise.
    pub fn encoded_len(&self) -> usize {
        if self.id <= u8::MAX as u16 {
            2
        } else {
            4
        }
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        match u8::try_from(self.id) {
            Ok(id) => {
                dst.put_u8(self.kind.type_byte());
                dst.put_u8(id);
            }
            Err(_) => {
                dst.put_u8(self.kind.type_byte() | FORMAT_16_BIT);
                dst.put_u8(0);
                dst.put_u16_le(self.id);
            }
        }
    }
}

/// An object address: class → instance → attribute, each optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPath {
    segments: Vec<LogicalSegment>,
}

impl ObjectPath {
    /// Validate the identifiers and build a path from the ones present.
    pub fn new(
        class_id: Option<i64>,
        instance_id: Option<i64>,
        attribute_id: Option<i64>,
    ) -> Result<Self> {
        let mut segments = Vec::with_capacity(3);
        for (kind, id) in [
            (SegmentKind::Class, class_id),
            (SegmentKind::Instance, instance_id),
            (SegmentKind::Attribute, attribute_id),
        ] {
            if let Some(value) = id {
                let id = validate_id(kind.field_name(), value)?;
                segments.push(LogicalSegment { kind, id });
            }
        }

        if segments.is_empty() {
            return Err(CipError::MissingIdentifier);
        }
        Ok(Self { segments })
    }

    /// Full class/instance/attribute address from already-typed ids.
    pub fn attribute(class_id: u16, instance_id: u16, attribute_id: u16) -> Self {
        Self {
            segments: vec![
                LogicalSegment {
                    kind: SegmentKind::Class,
                    id: class_id,
                },
                LogicalSegment {
                    kind: SegmentKind::Instance,
                    id: instance_id,
                },
                LogicalSegment {
                    kind: SegmentKind::Attribute,
                    id: attribute_id,
                },
            ],
        }
    }

    pub fn segments(&self) -> &[LogicalSegment] {
        &self.segments
    }

    /// Encoded size in bytes; always even.
    pub fn encoded_len(&self) -> usize {
        self.segments.iter().map(LogicalSegment::encoded_len).sum()
    }

    /// Encoded size in 16-bit words, as carried in the request header.
    pub fn len_words(&self) -> u8 {
        // At most three 4-byte segments, so this always fits.
        (self.encoded_len() / 2) as u8
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());
        for segment in &self.segments {
            segment.encode(dst);
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf.freeze()
    }
}

/// Build the encoded path for the identifiers that are present.
pub fn build_object_path(
    class_id: Option<i64>,
    instance_id: Option<i64>,
    attribute_id: Option<i64>,
) -> Result<Bytes> {
    ObjectPath::new(class_id, instance_id, attribute_id).map(|path| path.to_bytes())
}

/// Check that `value` is a valid 16-bit identifier.
pub fn validate_id(field: &'static str, value: i64) -> Result<u16> {
    u16::try_from(value).map_err(|_| CipError::InvalidIdentifier { field, value })
}
