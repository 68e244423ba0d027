//! Additive 16-bit checksum.
//!
//! Command packets and responses carry the big-endian sum of their payload
//! bytes as a two-byte prefix. Stream frames carry the same sum in the first
//! two header bytes, computed over the rest of the header and the payload.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Size of the checksum prefix.
pub const CHECKSUM_SIZE: usize = 2;

/// Wrapping 16-bit sum of `payload`.
pub fn compute(payload: &[u8]) -> u16 {
    payload
        .iter()
        .fold(0u16, |sum, &byte| sum.wrapping_add(u16::from(byte)))
}

/// [`compute`] as big-endian bytes.
pub fn encode(payload: &[u8]) -> [u8; CHECKSUM_SIZE] {
    compute(payload).to_be_bytes()
}

/// Build `checksum ++ payload`.
pub fn prepend(payload: &[u8]) -> Bytes {
    let mut dst = BytesMut::with_capacity(CHECKSUM_SIZE + payload.len());
    dst.put_u16(compute(payload));
    dst.put_slice(payload);
    dst.freeze()
}

/// Check a checksum-prefixed buffer and return its payload.
pub fn verify(framed: &[u8]) -> Result<&[u8]> {
    if framed.len() < CHECKSUM_SIZE {
        return Err(FrameError::Truncated { len: framed.len() });
    }
    let (prefix, payload) = framed.split_at(CHECKSUM_SIZE);
    let expected = u16::from_be_bytes([prefix[0], prefix[1]]);
    let actual = compute(payload);
    if expected != actual {
        return Err(FrameError::Integrity { expected, actual });
    }
    Ok(payload)
}

/// Sum used by stream frames: `header[2..] ++ payload`.
pub fn stream_sum(header: &[u8], payload: &[u8]) -> u16 {
    let tail = header.get(CHECKSUM_SIZE..).unwrap_or_default();
    compute(tail).wrapping_add(compute(payload))
}

/// Whether a stream frame's embedded checksum matches its contents.
pub fn stream_matches(header: &[u8], payload: &[u8]) -> bool {
    match header {
        [hi, lo, ..] => u16::from_be_bytes([*hi, *lo]) == stream_sum(header, payload),
        _ => false,
    }
}
