use std::time::Duration;

use cipwire_frame::MAX_PAYLOAD;

/// Settings for a plain CIP client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Deadline for each reply.
    pub timeout: Duration,
    /// Deadline for establishing the TCP connection.
    pub connect_timeout: Duration,
    /// Decode scalar attribute values as big-endian.
    pub big_endian: bool,
    /// Echoed back by the device in every reply header.
    pub sender_context: [u8; 8],
    /// Encapsulation protocol version sent in RegisterSession.
    pub protocol_version: u16,
    /// Largest encapsulation payload this client will send.
    pub max_payload_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
            big_endian: false,
            sender_context: [0; 8],
            protocol_version: 1,
            max_payload_size: MAX_PAYLOAD,
        }
    }
}

/// How the connection is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionType {
    #[default]
    PointToPoint,
    Multicast,
}

/// Transport direction bit of the transport class/trigger byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportDirection {
    #[default]
    Client,
    Server,
}

impl TransportDirection {
    pub fn bits(self) -> u8 {
        match self {
            TransportDirection::Client => 0x00,
            TransportDirection::Server => 0x80,
        }
    }
}

/// Production trigger bits (4..=6) of the transport class/trigger byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductionTrigger {
    #[default]
    Cyclic,
    ChangeOfState,
    Application,
}

impl ProductionTrigger {
    pub fn bits(self) -> u8 {
        match self {
            ProductionTrigger::Cyclic => 0x00,
            ProductionTrigger::ChangeOfState => 0x10,
            ProductionTrigger::Application => 0x20,
        }
    }
}

/// Settings for the authenticated session layer.
#[derive(Debug, Clone)]
pub struct SecureConfig {
    /// Deadline for each secure reply. Longer than the plain default to
    /// allow for industrial network latency.
    pub timeout: Duration,
    /// Protocol version carried in the registration packet.
    pub protocol_version: u16,
    pub connection_type: ConnectionType,
    pub transport_direction: TransportDirection,
    pub production_trigger: ProductionTrigger,
}

impl SecureConfig {
    /// The transport-direction | production-trigger byte.
    pub fn connection_params(&self) -> u8 {
        self.transport_direction.bits() | self.production_trigger.bits()
    }
}

impl Default for SecureConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            protocol_version: 1,
            connection_type: ConnectionType::PointToPoint,
            transport_direction: TransportDirection::Client,
            production_trigger: ProductionTrigger::Cyclic,
        }
    }
}
