//! Length-prefixed transport codec for backchannel messages.
//!
//! Each frame is a 4-byte big-endian payload length followed by the JSON
//! encoding of one [`Message`]. The prefix delimits messages over the
//! stream socket; JSON carries the structure.

use bytes::{Buf, BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

use crate::protocol::Message;

/// Frames larger than this are treated as protocol corruption (8 MB).
const MAX_FRAME_SIZE: usize = 8 * 1024 * 1024;

const PREFIX_SIZE: usize = 4;

/// Codec for length-prefixed JSON messages.
#[derive(Debug, Default)]
pub struct WireCodec;

impl WireCodec {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for WireCodec {
    type Item = Message;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < PREFIX_SIZE {
            return Ok(None);
        }

        let mut prefix = [0u8; PREFIX_SIZE];
        prefix.copy_from_slice(&src[..PREFIX_SIZE]);
        let frame_len = u32::from_be_bytes(prefix) as usize;

        if frame_len > MAX_FRAME_SIZE {
            return Err(CodecError::FrameTooLarge(frame_len));
        }

        if src.len() < PREFIX_SIZE + frame_len {
            // Leave the prefix in place until the whole frame has arrived.
            src.reserve(PREFIX_SIZE + frame_len - src.len());
            return Ok(None);
        }

        src.advance(PREFIX_SIZE);
        let payload = src.split_to(frame_len);

        let message: Message = serde_json::from_slice(&payload)?;
        Ok(Some(message))
    }
}

impl Encoder<Message> for WireCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = serde_json::to_vec(&item)?;

        if payload.len() > MAX_FRAME_SIZE {
            return Err(CodecError::FrameTooLarge(payload.len()));
        }

        dst.reserve(PREFIX_SIZE + payload.len());
        // Checked against MAX_FRAME_SIZE above, so the length fits in u32
        #[allow(clippy::cast_possible_truncation)]
        dst.put_u32(payload.len() as u32);
        dst.put_slice(&payload);

        Ok(())
    }
}

/// Errors raised while framing or unframing messages.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame too large: {0} bytes (max: {MAX_FRAME_SIZE})")]
    FrameTooLarge(usize),
}
