use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{Result, TransportError};

/// Frame header: magic (2) + kind (1) + flags (1) + length (4) + call id (8) = 16 bytes.
pub const HEADER_SIZE: usize = 16;

/// Magic bytes: "HC" (0x48 0x43).
pub const MAGIC: [u8; 2] = *b"HC";

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// What a frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    /// Client to host: a serialized `CallRequest`.
    Request = 1,
    /// Host to client: the envelope answering the request with the same call id.
    Response = 2,
    /// Host to client: a serialized `HostEvent`. Call id is zero.
    Event = 3,
}

impl TryFrom<u8> for FrameKind {
    type Error = TransportError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(FrameKind::Request),
            2 => Ok(FrameKind::Response),
            3 => Ok(FrameKind::Event),
            other => Err(TransportError::UnknownFrameKind(other)),
        }
    }
}

/// A framed JSON message.
#[derive(Debug, Clone)]
pub struct Frame {
    pub kind: FrameKind,
    /// Pairs a response with its request on one connection.
    pub call_id: u64,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(kind: FrameKind, call_id: u64, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            call_id,
            payload: payload.into(),
        }
    }

    /// Serialize `value` as the payload of a new frame.
    pub fn json<T: Serialize + ?Sized>(kind: FrameKind, call_id: u64, value: &T) -> Result<Self> {
        let payload = serde_json::to_vec(value)?;
        Ok(Self::new(kind, call_id, payload))
    }

    /// Deserialize the payload.
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.payload)?)
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Encode a frame into the wire format.
///
/// ```text
/// ┌────────────┬──────────┬───────────┬───────────┬────────────┬──────────────┐
/// │ Magic (2B) │ Kind (1B)│ Flags (1B)│ Length    │ Call id    │ Payload      │
/// │ "HC"       │ 1|2|3    │ 0         │ (4B LE)   │ (8B LE)    │ JSON         │
/// └────────────┴──────────┴───────────┴───────────┴────────────┴──────────────┘
/// ```
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    let len = frame.payload.len();
    if len > u32::MAX as usize {
        return Err(TransportError::PayloadTooLarge {
            size: len,
            max: u32::MAX as usize,
        });
    }
    dst.reserve(HEADER_SIZE + len);
    dst.put_slice(&MAGIC);
    dst.put_u8(frame.kind as u8);
    dst.put_u8(0);
    dst.put_u32_le(len as u32);
    dst.put_u64_le(frame.call_id);
    dst.put_slice(&frame.payload);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    if src[0..2] != MAGIC {
        return Err(TransportError::InvalidMagic);
    }

    let mut header = &src[2..HEADER_SIZE];
    let kind = FrameKind::try_from(header.get_u8())?;
    let flags = header.get_u8();
    if flags != 0 {
        return Err(TransportError::UnsupportedFlags(flags));
    }
    let payload_len = header.get_u32_le() as usize;
    let call_id = header.get_u64_le();

    if payload_len > max_payload {
        return Err(TransportError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + payload_len;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(Frame {
        kind,
        call_id,
        payload,
    }))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

/// `tokio_util` codec over [`encode_frame`] / [`decode_frame`].
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_payload_size: usize,
}

impl FrameCodec {
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            max_payload_size: config.max_payload_size,
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(&CodecConfig::default())
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        decode_frame(src, self.max_payload_size)
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = TransportError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        if frame.payload.len() > self.max_payload_size {
            return Err(TransportError::PayloadTooLarge {
                size: frame.payload.len(),
                max: self.max_payload_size,
            });
        }
        encode_frame(&frame, dst)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_encode_layout() {
        let mut buf = BytesMut::new();
        let frame = Frame::new(FrameKind::Response, 0x0102, Bytes::from_static(b"{}"));
        encode_frame(&frame, &mut buf).unwrap();

        assert_eq!(buf.len(), frame.wire_size());
        assert_eq!(&buf[0..2], b"HC");
        assert_eq!(buf[2], 2);
        assert_eq!(buf[3], 0);
        assert_eq!(&buf[4..8], &2u32.to_le_bytes());
        assert_eq!(&buf[8..16], &0x0102u64.to_le_bytes());
        assert_eq!(&buf[16..], b"{}");
    }

    #[test]
    fn test_decode_incomplete_header() {
        let mut buf = BytesMut::from(&b"HC\x01"[..]);
        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
    }

    #[test]
    fn test_decode_incomplete_payload() {
        let mut buf = BytesMut::new();
        let frame = Frame::new(FrameKind::Request, 1, Bytes::from_static(b"hello"));
        encode_frame(&frame, &mut buf).unwrap();
        buf.truncate(HEADER_SIZE + 2);

        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
    }

    #[test]
    fn test_decode_invalid_magic() {
        let mut buf = BytesMut::from(&[0xFFu8; HEADER_SIZE][..]);
        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(result, Err(TransportError::InvalidMagic)));
    }

    #[test]
    fn test_decode_rejects_unknown_kind_and_flags() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u8(9);
        buf.put_u8(0);
        buf.put_u32_le(0);
        buf.put_u64_le(0);
        assert!(matches!(
            decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD),
            Err(TransportError::UnknownFrameKind(9))
        ));

        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u8(1);
        buf.put_u8(0x80);
        buf.put_u32_le(0);
        buf.put_u64_le(0);
        assert!(matches!(
            decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD),
            Err(TransportError::UnsupportedFlags(0x80))
        ));
    }

    #[test]
    fn test_decode_payload_too_large() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u8(1);
        buf.put_u8(0);
        buf.put_u32_le(32 * 1024 * 1024);
        buf.put_u64_le(7);

        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(result, Err(TransportError::PayloadTooLarge { .. })));
    }

    #[test]
    fn test_encoder_enforces_configured_limit() {
        let mut codec = FrameCodec::new(&CodecConfig {
            max_payload_size: 4,
        });
        let mut buf = BytesMut::new();
        let frame = Frame::new(FrameKind::Event, 0, Bytes::from_static(b"too long"));
        assert!(matches!(
            codec.encode(frame, &mut buf),
            Err(TransportError::PayloadTooLarge { size: 8, max: 4 })
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_multiple_frames_through_codec() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::new();
        codec
            .encode(Frame::json(FrameKind::Request, 1, &json!({"a": 1})).unwrap(), &mut buf)
            .unwrap();
        codec
            .encode(Frame::json(FrameKind::Request, 2, &json!([2])).unwrap(), &mut buf)
            .unwrap();

        let f1 = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(f1.call_id, 1);
        assert_eq!(f1.decode_json::<serde_json::Value>().unwrap(), json!({"a": 1}));

        let f2 = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(f2.call_id, 2);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }
}
