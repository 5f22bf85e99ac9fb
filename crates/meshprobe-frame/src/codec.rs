use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Plaintext frame preamble.
pub const PREAMBLE: u8 = 0x00;

/// Default maximum payload size accepted when decoding: 64 KiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024;

/// Longest encoding of a 32-bit varint.
const MAX_VARINT_LEN: usize = 5;

/// A decoded plaintext frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// ESPHome message type id.
    pub msg_type: u32,
    /// Protobuf-encoded message body, untouched.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(msg_type: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            msg_type,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (preamble + varints + payload).
    pub fn wire_size(&self) -> usize {
        1 + varint_len(self.payload.len() as u64) + varint_len(self.msg_type as u64)
            + self.payload.len()
    }

    /// Encode this frame into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        encode_frame(self.msg_type, &self.payload, &mut buf)?;
        Ok(buf.freeze())
    }
}

/// Number of bytes `value` occupies as a varint.
pub fn varint_len(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

/// Append `value` as a little-endian base-128 varint.
pub fn encode_varint(mut value: u32, dst: &mut BytesMut) {
    while value >= 0x80 {
        dst.put_u8((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    dst.put_u8(value as u8);
}

/// Decode a varint from the start of `src`.
///
/// Returns `Ok(None)` if `src` ends before the varint does, otherwise the
/// value and the number of bytes it used.
pub fn decode_varint(src: &[u8]) -> Result<Option<(u32, usize)>> {
    let mut value: u64 = 0;
    for (i, byte) in src.iter().take(MAX_VARINT_LEN).enumerate() {
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            let value = u32::try_from(value).map_err(|_| FrameError::VarintOverflow)?;
            return Ok(Some((value, i + 1)));
        }
    }
    if src.len() >= MAX_VARINT_LEN {
        return Err(FrameError::VarintOverflow);
    }
    Ok(None)
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────────┬──────────────┬─────────────────┐
/// │ Preamble │ Length       │ Type         │ Payload         │
/// │ 0x00     │ (varint)     │ (varint)     │ (Length bytes)  │
/// └──────────┴──────────────┴──────────────┴─────────────────┘
/// ```
pub fn encode_frame(msg_type: u32, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: payload.len(),
        max: u32::MAX as usize,
    })?;
    dst.reserve(1 + 2 * MAX_VARINT_LEN + payload.len());
    dst.put_u8(PREAMBLE);
    encode_varint(len, dst);
    encode_varint(msg_type, dst);
    dst.put_slice(payload);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    let Some(&first) = src.first() else {
        return Ok(None);
    };
    if first != PREAMBLE {
        return Err(FrameError::InvalidPreamble(first));
    }

    let Some((payload_len, len_size)) = decode_varint(&src[1..])? else {
        return Ok(None);
    };
    let payload_len = payload_len as usize;
    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let Some((msg_type, type_size)) = decode_varint(&src[1 + len_size..])? else {
        return Ok(None);
    };

    let header = 1 + len_size + type_size;
    if src.len() < header + payload_len {
        return Ok(None);
    }

    src.advance(header);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(Frame { msg_type, payload }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_single_and_multi_byte() {
        let mut buf = BytesMut::new();
        encode_varint(0x13, &mut buf);
        assert_eq!(buf.as_ref(), &[0x13]);

        buf.clear();
        encode_varint(300, &mut buf);
        assert_eq!(buf.as_ref(), &[0xac, 0x02]);
        assert_eq!(decode_varint(&buf).unwrap(), Some((300, 2)));
        assert_eq!(varint_len(300), 2);
    }

    #[test]
    fn varint_incomplete_and_overflow() {
        assert_eq!(decode_varint(&[0x80]).unwrap(), None);
        assert_eq!(decode_varint(&[]).unwrap(), None);
        assert_eq!(
            decode_varint(&[0xff, 0xff, 0xff, 0xff, 0xff, 0x01]),
            Err(FrameError::VarintOverflow)
        );
        assert_eq!(
            decode_varint(&[0xff, 0xff, 0xff, 0xff, 0x7f]),
            Err(FrameError::VarintOverflow)
        );
        assert_eq!(
            decode_varint(&[0xff, 0xff, 0xff, 0xff, 0x0f]).unwrap(),
            Some((u32::MAX, 5))
        );
    }

    #[test]
    fn decode_reference_hello_frame() {
        let mut buf = BytesMut::from(
            &[
                0x00, 0x13, 0x01, 0x0a, 0x0d, b'a', b'i', b'o', b'e', b's', b'p', b'h', b'o', b'm',
                b'e', b'a', b'p', b'i', 0x10, 0x01, 0x18, 0x07,
            ][..],
        );
        let frame = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        assert_eq!(frame.msg_type, 1);
        assert_eq!(frame.payload.len(), 0x13);
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_incomplete_header() {
        let mut buf = BytesMut::from(&[0x00][..]);
        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());

        let mut buf = BytesMut::from(&[0x00, 0x05][..]);
        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
        assert_eq!(buf.len(), 2, "incomplete input must not be consumed");
    }

    #[test]
    fn decode_incomplete_payload() {
        let mut buf = BytesMut::new();
        encode_frame(8, b"pong", &mut buf).unwrap();
        buf.truncate(buf.len() - 1);

        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
    }

    #[test]
    fn decode_invalid_preamble() {
        let mut buf = BytesMut::from(&[0x01, 0x00, 0x07][..]);
        assert_eq!(
            decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD),
            Err(FrameError::InvalidPreamble(0x01))
        );
    }

    #[test]
    fn decode_payload_too_large() {
        let mut buf = BytesMut::new();
        buf.put_u8(PREAMBLE);
        encode_varint(4096, &mut buf);
        encode_varint(1, &mut buf);

        assert!(matches!(
            decode_frame(&mut buf, 1024),
            Err(FrameError::PayloadTooLarge { size: 4096, max: 1024 })
        ));
    }

    #[test]
    fn multiple_frames_and_empty_payload() {
        let mut buf = BytesMut::new();
        encode_frame(7, b"", &mut buf).unwrap();
        encode_frame(2, b"second", &mut buf).unwrap();

        let f1 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert_eq!(f1, Frame::new(7, Bytes::new()));
        assert_eq!(buf.len(), 9);

        let f2 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert_eq!(f2.msg_type, 2);
        assert_eq!(f2.payload.as_ref(), b"second");
        assert!(buf.is_empty());
    }

    #[test]
    fn frame_wire_size_matches_encoding() {
        let frame = Frame::new(300, vec![0xAB; 200]);
        let bytes = frame.to_bytes().unwrap();
        assert_eq!(frame.wire_size(), bytes.len());
        assert_eq!(frame.wire_size(), 1 + 2 + 2 + 200);
    }
}
