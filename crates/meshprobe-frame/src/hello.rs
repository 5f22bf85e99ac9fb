use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::{encode_frame, encode_varint};
use crate::error::{FrameError, Result};
use crate::message::HELLO_REQUEST;

/// Client name announced by the reference Home Assistant integration.
pub const DEFAULT_CLIENT_INFO: &str = "aioesphomeapi";
pub const DEFAULT_API_VERSION_MAJOR: u32 = 1;
pub const DEFAULT_API_VERSION_MINOR: u32 = 7;

/// Wire bytes of [`HelloRequest::default`].
pub const DEFAULT_HELLO_FRAME: &[u8] = &[
    0x00, 0x13, 0x01, // preamble, length 19, HelloRequest
    0x0a, 0x0d, b'a', b'i', b'o', b'e', b's', b'p', b'h', b'o', b'm', b'e', b'a', b'p', b'i',
    0x10, 0x01, 0x18, 0x07,
];

const TAG_CLIENT_INFO: u8 = 0x0a; // field 1, length-delimited
const TAG_API_VERSION_MAJOR: u8 = 0x10; // field 2, varint
const TAG_API_VERSION_MINOR: u8 = 0x18; // field 3, varint

/// `HelloRequest`, the first message a native API client sends.
///
/// Fields holding their protobuf default (empty string, zero) are omitted
/// from the encoding, as a proto3 encoder would.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloRequest {
    pub client_info: String,
    pub api_version_major: u32,
    pub api_version_minor: u32,
}

impl Default for HelloRequest {
    fn default() -> Self {
        Self {
            client_info: DEFAULT_CLIENT_INFO.to_string(),
            api_version_major: DEFAULT_API_VERSION_MAJOR,
            api_version_minor: DEFAULT_API_VERSION_MINOR,
        }
    }
}

impl HelloRequest {
    /// Protobuf body of the message.
    pub fn encode_payload(&self) -> Result<Bytes> {
        let info = self.client_info.as_bytes();
        let info_len = u32::try_from(info.len()).map_err(|_| FrameError::PayloadTooLarge {
            size: info.len(),
            max: u32::MAX as usize,
        })?;

        let mut buf = BytesMut::with_capacity(info.len() + 16);
        if !info.is_empty() {
            buf.put_u8(TAG_CLIENT_INFO);
            encode_varint(info_len, &mut buf);
            buf.put_slice(info);
        }
        if self.api_version_major != 0 {
            buf.put_u8(TAG_API_VERSION_MAJOR);
            encode_varint(self.api_version_major, &mut buf);
        }
        if self.api_version_minor != 0 {
            buf.put_u8(TAG_API_VERSION_MINOR);
            encode_varint(self.api_version_minor, &mut buf);
        }
        Ok(buf.freeze())
    }

    /// The complete plaintext frame, ready to write to the socket.
    pub fn to_frame_bytes(&self) -> Result<Bytes> {
        let payload = self.encode_payload()?;
        let mut buf = BytesMut::with_capacity(payload.len() + 8);
        encode_frame(HELLO_REQUEST, &payload, &mut buf)?;
        Ok(buf.freeze())
    }
}
