//! Common Industrial Protocol (CIP) message layer.
//!
//! Everything that lives inside an encapsulation payload:
//! - [`path`]: logical-segment object paths (class/instance/attribute)
//! - [`codec`]: the data-type registry and value encoding
//! - [`status`]: the general status catalog
//! - [`response`]: Get/Set_Attribute_Single reply parsing
//! - [`service`]: service codes and well-known class ids
//!
//! No I/O happens here; see `cipwire-client` for the request/response driver.

pub mod codec;
pub mod error;
pub mod path;
pub mod response;
pub mod service;
pub mod status;

pub use codec::{decode, encode, DataType, Member, Value};
pub use error::{CipError, Operation, Result};
pub use path::{build_object_path, validate_id, LogicalSegment, ObjectPath, SegmentKind};
pub use response::{
    parse_attribute_response, parse_set_attribute_response, AttributeResponse,
    SetAttributeResponse,
};
pub use status::{parse_status, CipStatus};
