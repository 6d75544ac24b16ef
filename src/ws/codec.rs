//! Frame-level encoder/decoder for use with `tokio_util::codec::Framed`.
//!
//! Wire layout (RFC 6455 subset): byte 0 carries FIN (bit 7, must be 1) and
//! the opcode (bits 0-3); byte 1 carries the mask flag (bit 7) and a 7-bit
//! length-or-marker: 0-125 literal, 126 = next 2 bytes are a big-endian u16
//! length, 127 = next 8 bytes are a big-endian u64 length. Masked payloads
//! are XOR-unmasked with the 4-byte key that follows the length. A declared
//! length above [`MAX_PAYLOAD_SIZE`] is rejected before any buffer space is
//! reserved. The encoder picks the minimal length encoding and never sets the
//! mask bit.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::{Frame, OpCode, WebSocketError};

/// Largest possible frame header: 2 fixed bytes + 8 length bytes + 4 mask
/// bytes.
const MAX_HEADER_SIZE: usize = 14;

/// Largest payload accepted from a peer. The declared length is checked
/// against this before any buffer space is reserved, so a hostile length
/// header cannot force a huge allocation.
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// Stateless per-frame codec. One full frame is produced per decode and one
/// full frame is serialized per encode; flushing is left to the `Framed`
/// wrapper, which flushes on every send.
#[derive(Debug, Default)]
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = WebSocketError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, WebSocketError> {
        if src.len() < 2 {
            src.reserve(MAX_HEADER_SIZE);
            return Ok(None);
        }

        let fin = src[0] & 0x80 != 0;
        if !fin {
            return Err(WebSocketError::FragmentationUnsupported);
        }

        let opcode_bits = src[0] & 0x0F;
        let masked = src[1] & 0x80 != 0;
        let length_code = src[1] & 0x7F;

        let extra = match length_code {
            126 => 2,
            127 => 8,
            _ => 0,
        };
        let header_len = 2 + extra + if masked { 4 } else { 0 };
        if src.len() < header_len {
            src.reserve(header_len - src.len());
            return Ok(None);
        }

        let declared_len = match extra {
            0 => u64::from(length_code),
            2 => u64::from(u16::from_be_bytes([src[2], src[3]])),
            _ => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&src[2..10]);
                u64::from_be_bytes(raw)
            }
        };
        if declared_len > MAX_PAYLOAD_SIZE as u64 {
            return Err(WebSocketError::FrameTooLarge(declared_len));
        }
        let payload_len = declared_len as usize;

        if src.len() < header_len + payload_len {
            src.reserve(header_len + payload_len - src.len());
            return Ok(None);
        }

        let opcode = OpCode::try_from(opcode_bits)?;

        src.advance(2 + extra);
        let mask = if masked {
            let mut key = [0u8; 4];
            key.copy_from_slice(&src[..4]);
            src.advance(4);
            Some(key)
        } else {
            None
        };

        let mut payload = src.split_to(payload_len);
        if let Some(key) = mask {
            for (i, byte) in payload.iter_mut().enumerate() {
                *byte ^= key[i % 4];
            }
        }

        Ok(Some(Frame {
            opcode,
            payload: payload.freeze(),
            masked,
        }))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = WebSocketError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), WebSocketError> {
        let payload_len = frame.payload.len();
        dst.reserve(MAX_HEADER_SIZE + payload_len);

        // FIN always set; the server never fragments.
        dst.put_u8(0x80 | frame.opcode as u8);

        if payload_len <= 125 {
            dst.put_u8(payload_len as u8);
        } else if payload_len <= u16::MAX as usize {
            dst.put_u8(126);
            dst.put_u16(payload_len as u16);
        } else {
            dst.put_u8(127);
            dst.put_u64(payload_len as u64);
        }

        dst.extend_from_slice(&frame.payload);
        Ok(())
    }
}
