//! CIP service codes and well-known object classes.

/// Read every attribute of an instance.
pub const GET_ATTRIBUTES_ALL: u8 = 0x01;
/// Write every settable attribute of an instance.
pub const SET_ATTRIBUTES_ALL: u8 = 0x02;
pub const GET_ATTRIBUTE_LIST: u8 = 0x03;
pub const SET_ATTRIBUTE_LIST: u8 = 0x04;
pub const RESET: u8 = 0x05;
/// Read one attribute.
pub const GET_ATTRIBUTE_SINGLE: u8 = 0x0E;
/// Write one attribute.
pub const SET_ATTRIBUTE_SINGLE: u8 = 0x10;

/// Set on the service byte of a reply.
pub const REPLY_MASK: u8 = 0x80;

/// Identity object class.
pub const IDENTITY_CLASS: u16 = 0x01;
pub const MESSAGE_ROUTER_CLASS: u16 = 0x02;
pub const ASSEMBLY_CLASS: u16 = 0x04;
pub const CONNECTION_MANAGER_CLASS: u16 = 0x06;
pub const TCP_IP_INTERFACE_CLASS: u16 = 0xF5;
pub const ETHERNET_LINK_CLASS: u16 = 0xF6;

/// Identity object attributes (instance 1).
pub mod identity {
    pub const INSTANCE: u16 = 1;
    pub const VENDOR_ID: u16 = 1;
    pub const DEVICE_TYPE: u16 = 2;
    pub const PRODUCT_CODE: u16 = 3;
    pub const REVISION: u16 = 4;
    pub const STATUS: u16 = 5;
    pub const SERIAL_NUMBER: u16 = 6;
    pub const PRODUCT_NAME: u16 = 7;
}

/// Returns a human-readable name for a service code (reply bit ignored).
pub fn service_name(code: u8) -> &'static str {
    match code & !REPLY_MASK {
        GET_ATTRIBUTES_ALL => "Get_Attributes_All",
        SET_ATTRIBUTES_ALL => "Set_Attributes_All",
        GET_ATTRIBUTE_LIST => "Get_Attribute_List",
        SET_ATTRIBUTE_LIST => "Set_Attribute_List",
        RESET => "Reset",
        GET_ATTRIBUTE_SINGLE => "Get_Attribute_Single",
        SET_ATTRIBUTE_SINGLE => "Set_Attribute_Single",
        _ => "Unknown",
    }
}

/// Returns true if the service byte has the reply bit set.
pub fn is_reply(code: u8) -> bool {
    code & REPLY_MASK != 0
}
