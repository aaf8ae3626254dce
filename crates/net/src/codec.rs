//! Length-prefixed CBOR frames: a 4-byte big-endian body length followed by
//! the CBOR encoding of one [`ServerMessage`].

use sightline_view::ServerMessage;

/// Largest body accepted in either direction.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

const HEADER_LEN: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("CBOR encode failed: {0}")]
    Encode(String),
    #[error("CBOR decode failed: {0}")]
    Decode(String),
    #[error("frame body of {len} bytes exceeds {MAX_FRAME_LEN}")]
    FrameTooLarge { len: usize },
}

pub fn encode_frame(message: &ServerMessage) -> Result<Vec<u8>, CodecError> {
    let mut buf = vec![0u8; HEADER_LEN];
    ciborium::into_writer(message, &mut buf).map_err(|e| CodecError::Encode(e.to_string()))?;

    let len = buf.len() - HEADER_LEN;
    let header = u32::try_from(len)
        .ok()
        .filter(|_| len <= MAX_FRAME_LEN)
        .ok_or(CodecError::FrameTooLarge { len })?;
    buf[..HEADER_LEN].copy_from_slice(&header.to_be_bytes());
    Ok(buf)
}

/// Decode the frame at the front of `bytes`. Returns the message and the
/// number of bytes consumed, or `None` if the frame is not complete yet.
pub fn decode_frame(bytes: &[u8]) -> Result<Option<(ServerMessage, usize)>, CodecError> {
    let Some(header) = bytes.first_chunk::<HEADER_LEN>() else {
        return Ok(None);
    };
    let len = u32::from_be_bytes(*header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(CodecError::FrameTooLarge { len });
    }
    let end = HEADER_LEN + len;
    let Some(body) = bytes.get(HEADER_LEN..end) else {
        return Ok(None);
    };
    let message = ciborium::from_reader(body).map_err(|e| CodecError::Decode(e.to_string()))?;
    Ok(Some((message, end)))
}
