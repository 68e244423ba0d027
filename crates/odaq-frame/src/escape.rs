//! Byte stuffing for stream frames.
//!
//! The delimiter and the escape marker never appear literally inside a frame.
//! Either value is sent as `ESCAPE, byte ^ ESCAPE_XOR`.

use bytes::BufMut;

use crate::error::{FrameError, Result};

/// Frame start delimiter.
pub const DELIMITER: u8 = 0x7E;

/// Escape marker.
pub const ESCAPE: u8 = 0x7D;

/// Bit flipped on escaped bytes.
pub const ESCAPE_XOR: u8 = 0x20;

/// Whether `byte` must be escaped on the wire.
#[inline]
pub fn needs_escape(byte: u8) -> bool {
    byte == DELIMITER || byte == ESCAPE
}

/// Recover the original value of the byte that followed an escape marker.
#[inline]
pub fn unescape_byte(byte: u8) -> u8 {
    byte ^ ESCAPE_XOR
}

/// Append the stuffed form of `byte` to `dst`.
#[inline]
pub fn escape_byte(byte: u8, dst: &mut impl BufMut) {
    if needs_escape(byte) {
        dst.put_u8(ESCAPE);
        dst.put_u8(byte ^ ESCAPE_XOR);
    } else {
        dst.put_u8(byte);
    }
}

/// Append the stuffed form of `data` to `dst`.
pub fn escape(data: &[u8], dst: &mut impl BufMut) {
    for &byte in data {
        escape_byte(byte, dst);
    }
}

/// Undo [`escape`].
pub fn unescape(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut iter = data.iter();
    while let Some(&byte) = iter.next() {
        if byte == ESCAPE {
            match iter.next() {
                Some(&next) => out.push(unescape_byte(next)),
                None => return Err(FrameError::DanglingEscape),
            }
        } else {
            out.push(byte);
        }
    }
    Ok(out)
}
