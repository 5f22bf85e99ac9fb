//! Well-known native API message type ids.

pub const HELLO_REQUEST: u32 = 1;
pub const HELLO_RESPONSE: u32 = 2;
pub const CONNECT_REQUEST: u32 = 3;
pub const CONNECT_RESPONSE: u32 = 4;
pub const DISCONNECT_REQUEST: u32 = 5;
pub const DISCONNECT_RESPONSE: u32 = 6;
pub const PING_REQUEST: u32 = 7;
pub const PING_RESPONSE: u32 = 8;
pub const DEVICE_INFO_REQUEST: u32 = 9;
pub const DEVICE_INFO_RESPONSE: u32 = 10;

/// Returns a human-readable name for a message type id.
pub fn message_name(msg_type: u32) -> &'static str {
    match msg_type {
        HELLO_REQUEST => "HelloRequest",
        HELLO_RESPONSE => "HelloResponse",
        CONNECT_REQUEST => "ConnectRequest",
        CONNECT_RESPONSE => "ConnectResponse",
        DISCONNECT_REQUEST => "DisconnectRequest",
        DISCONNECT_RESPONSE => "DisconnectResponse",
        PING_REQUEST => "PingRequest",
        PING_RESPONSE => "PingResponse",
        DEVICE_INFO_REQUEST => "DeviceInfoRequest",
        DEVICE_INFO_RESPONSE => "DeviceInfoResponse",
        11 => "ListEntitiesRequest",
        12..=18 => "ListEntitiesResponse",
        19 => "ListEntitiesDoneResponse",
        20 => "SubscribeStatesRequest",
        21..=27 => "StateResponse",
        28 => "SubscribeLogsRequest",
        29 => "SubscribeLogsResponse",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_handshake_messages() {
        assert_eq!(message_name(HELLO_RESPONSE), "HelloResponse");
        assert_eq!(message_name(PING_REQUEST), "PingRequest");
        assert_eq!(message_name(16), "ListEntitiesResponse");
        assert_eq!(message_name(4242), "Unknown");
    }
}
