//! ESPHome native API plaintext framing.
//!
//! Every plaintext message is framed with:
//! - A 1-byte preamble (`0x00`)
//! - A varint payload length
//! - A varint message type
//!
//! The session layer treats frames as opaque bytes; this crate builds the
//! outbound hello frame and splits received chunks back into frames for display.

pub mod codec;
pub mod error;
pub mod hello;
pub mod hex;
pub mod message;
pub mod scanner;

pub use codec::{
    decode_frame, decode_varint, encode_frame, encode_varint, varint_len, Frame,
    DEFAULT_MAX_PAYLOAD, PREAMBLE,
};
pub use error::{FrameError, Result};
pub use hello::{
    HelloRequest, DEFAULT_API_VERSION_MAJOR, DEFAULT_API_VERSION_MINOR, DEFAULT_CLIENT_INFO,
    DEFAULT_HELLO_FRAME,
};
pub use hex::{from_hex, to_hex};
pub use message::{message_name, HELLO_REQUEST, HELLO_RESPONSE, PING_REQUEST, PING_RESPONSE};
pub use scanner::FrameScanner;
