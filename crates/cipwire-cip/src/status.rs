//! CIP general status catalog.
//!
//! The table is a frozen static; lookups never allocate.

use std::fmt;

use serde::Serialize;

pub const SUCCESS: u16 = 0x00;
pub const RESOURCE_UNAVAILABLE: u16 = 0x02;
pub const PARTIAL_TRANSFER: u16 = 0x06;
pub const CONNECTION_LOST: u16 = 0x07;
pub const AUTHENTICATION_FAILED: u16 = 0x61;
pub const INTEGRITY_CHECK_FAILED: u16 = 0xFB;
pub const GENERAL_FAILURE: u16 = 0xFF;
/// First code of the vendor-specific range.
pub const VENDOR_RANGE_START: u16 = 0x1000;

/// Codes for which a later retry may succeed.
const RECOVERABLE: [u16; 3] = [RESOURCE_UNAVAILABLE, PARTIAL_TRANSFER, CONNECTION_LOST];

/// Names and descriptions for general status 0x00..=0x2F, indexed by code.
static GENERAL_STATUS: [(&str, &str); 0x30] = [
    ("Success", "Service was successfully performed"),
    ("ConnectionFailure", "A connection related service failed along the connection path"),
    ("ResourceUnavailable", "Resources needed for the object to perform the service were unavailable"),
    ("InvalidParameterValue", "The request parameter is invalid for this service"),
    ("PathSegmentError", "The path segment identifier or segment syntax was not understood"),
    ("PathDestinationUnknown", "The path references an object class, instance or structure element that is not known"),
    ("PartialTransfer", "Only part of the expected data was transferred"),
    ("ConnectionLost", "The messaging connection was lost"),
    ("ServiceNotSupported", "The requested service was not implemented or defined for this object"),
    ("InvalidAttributeValue", "Invalid attribute data detected"),
    ("AttributeListError", "An attribute in the Get_Attribute_List or Set_Attribute_List response has a nonzero status"),
    ("AlreadyInRequestedMode", "The object is already in the mode or state being requested"),
    ("ObjectStateConflict", "The object cannot perform the requested service in its current mode or state"),
    ("ObjectAlreadyExists", "The requested instance of the object to be created already exists"),
    ("AttributeNotSettable", "A request to modify a non-modifiable attribute was received"),
    ("PrivilegeViolation", "A permission or privilege check failed"),
    ("DeviceStateConflict", "The device's current mode or state prohibits the execution of the service"),
    ("ReplyDataTooLarge", "The data to be transmitted in the response buffer is larger than the allocated buffer"),
    ("FragmentationOfPrimitive", "The service specified an operation that would fragment a primitive data value"),
    ("NotEnoughData", "The service did not supply enough data to perform the requested operation"),
    ("AttributeNotSupported", "The attribute specified in the request is not supported"),
    ("TooMuchData", "The service supplied more data than was expected"),
    ("ObjectDoesNotExist", "The object specified does not exist in the device"),
    ("ServiceFragmentationSequenceNotInProgress", "The fragmentation sequence for this service is not currently active"),
    ("NoStoredAttributeData", "The attribute data of this object was not saved prior to the requested service"),
    ("StoreOperationFailure", "The attribute data of this object was not saved due to a failure during the attempt"),
    ("RoutingFailureRequestTooLarge", "The service request packet was too large for transmission on a network in the path"),
    ("RoutingFailureResponseTooLarge", "The service response packet was too large for transmission on a network in the path"),
    ("MissingAttributeListEntryData", "The service did not supply an attribute in a list of attributes that was needed"),
    ("InvalidAttributeValueList", "The service is returning the list of attributes with status information for invalid attributes"),
    ("EmbeddedServiceError", "An embedded service resulted in an error"),
    ("VendorSpecificError", "A vendor specific error has been encountered"),
    ("InvalidParameter", "A parameter associated with the request was invalid"),
    ("WriteOnceValueAlreadyWritten", "An attempt was made to write to a write-once medium that has already been written"),
    ("InvalidReplyReceived", "An invalid reply is received"),
    ("BufferOverflow", "The message received is larger than the receiving buffer can handle"),
    ("MessageFormatError", "The format of the received message is not supported by the server"),
    ("KeyFailureInPath", "The key segment included as the first segment in the path does not match the destination module"),
    ("PathSizeInvalid", "The size of the path sent with the service request is either not large enough or too large"),
    ("UnexpectedAttributeInList", "An attempt was made to set an attribute that is not able to be set at this time"),
    ("InvalidMemberId", "The member ID specified in the request does not exist in the specified class, instance or attribute"),
    ("MemberNotSettable", "A request to modify a non-modifiable member was received"),
    ("GroupTwoOnlyServerGeneralFailure", "A DeviceNet group 2 only server general failure occurred"),
    ("UnknownModbusError", "A CIP to Modbus translator received an unknown Modbus exception code"),
    ("AttributeNotGettable", "A request to read a non-readable attribute was received"),
    ("InstanceNotDeletable", "The requested object instance cannot be deleted"),
    ("ServiceNotSupportedForPath", "The object supports the service, but not for the designated application path"),
    ("ReservedGeneralStatus", "Status code reserved for future use"),
];

/// Structured descriptor for a CIP status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CipStatus {
    pub code: u16,
    pub extended_code: u16,
    pub name: &'static str,
    pub description: &'static str,
    /// True only for resource-unavailable, partial-transfer and connection-lost.
    pub recoverable: bool,
}

impl CipStatus {
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS
    }

    /// True when the code was not found in the catalog.
    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN_NAME
    }
}

impl fmt::Display for CipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X}", self.name, self.code)?;
        if self.extended_code != 0 {
            write!(f, ", extended 0x{:04X}", self.extended_code)?;
        }
        write!(f, "): {}", self.description)
    }
}

const UNKNOWN_NAME: &str = "UnknownError";

/// Look up the name and description of a status code.
pub fn lookup(code: u16) -> Option<(&'static str, &'static str)> {
    match code {
        0x00..=0x2F => Some(GENERAL_STATUS[code as usize]),
        AUTHENTICATION_FAILED => Some((
            "AuthenticationFailed",
            "The device rejected the credentials or security association of the request",
        )),
        INTEGRITY_CHECK_FAILED => Some((
            "IntegrityCheckFailed",
            "The message failed integrity or authentication code verification",
        )),
        GENERAL_FAILURE => Some(("GeneralFailure", "An unspecified general failure occurred")),
        VENDOR_RANGE_START.. => Some((
            "VendorSpecific",
            "Vendor specific status; consult the device documentation",
        )),
        _ => None,
    }
}

/// Whether `code` is in the recoverable set.
pub fn is_recoverable(code: u16) -> bool {
    RECOVERABLE.contains(&code)
}

/// Build the descriptor for a status code and its extended status.
///
/// Unknown codes yield an `UnknownError` descriptor that still carries the
/// numeric code.
pub fn parse_status(code: u16, extended_code: u16) -> CipStatus {
    let (name, description) =
        lookup(code).unwrap_or((UNKNOWN_NAME, "Unrecognized CIP status code"));
    CipStatus {
        code,
        extended_code,
        name,
        description,
        recoverable: is_recoverable(code),
    }
}
