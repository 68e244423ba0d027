use bytes::{BufMut, Bytes, BytesMut};

use crate::checksum;
use crate::error::{FrameError, Result};
use crate::escape::{escape, DELIMITER};

/// Unescaped header length.
pub const HEADER_SIZE: usize = 8;

/// Header value at offset 2 that marks a stop frame.
pub const STOP_MARKER: u8 = 80;

/// Header offset inspected for [`STOP_MARKER`].
pub const STOP_MARKER_OFFSET: usize = 2;

/// Raw bytes that follow a stop marker (filler, then the channel number).
pub const STOP_TAIL_SIZE: usize = 2;

/// The length field counts the payload plus this many header bytes.
pub const LENGTH_OVERHEAD: u8 = 4;

/// Largest payload the one-byte length field can describe.
pub const MAX_PAYLOAD: usize = (u8::MAX - LENGTH_OVERHEAD) as usize;

/// Decoded stream frame header.
///
/// Wire layout after unescaping:
/// ```text
/// ┌────────────┬──────┬────────┬─────────┬──────────┐
/// │ Checksum   │ Kind │ Length │ Channel │ Reserved │
/// │ (2B BE)    │ (1B) │ (1B)   │ (1B)    │ (3B)     │
/// └────────────┴──────┴────────┴─────────┴──────────┘
/// ```
/// `Length` is the payload size plus [`LENGTH_OVERHEAD`]; `Channel` is
/// 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamHeader {
    pub checksum: u16,
    pub kind: u8,
    pub length: u8,
    pub channel: u8,
    pub reserved: [u8; 3],
}

impl StreamHeader {
    /// Parse the 8 unescaped header bytes.
    pub fn from_bytes(raw: [u8; HEADER_SIZE]) -> Self {
        Self {
            checksum: u16::from_be_bytes([raw[0], raw[1]]),
            kind: raw[2],
            length: raw[3],
            channel: raw[4],
            reserved: [raw[5], raw[6], raw[7]],
        }
    }

    /// Serialize to the 8 unescaped header bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let [hi, lo] = self.checksum.to_be_bytes();
        [
            hi,
            lo,
            self.kind,
            self.length,
            self.channel,
            self.reserved[0],
            self.reserved[1],
            self.reserved[2],
        ]
    }

    /// Payload bytes announced by the length field.
    ///
    /// A length below [`LENGTH_OVERHEAD`] announces an empty payload.
    pub fn payload_len(&self) -> usize {
        payload_len(self.length)
    }

    /// 0-based channel id.
    pub fn channel_id(&self) -> u8 {
        channel_id(self.channel)
    }
}

/// A fully decoded stream frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFrame {
    pub header: StreamHeader,
    /// Unescaped payload bytes.
    pub payload: Bytes,
    /// Signed samples decoded from the payload.
    pub samples: Vec<i16>,
    /// Whether the embedded stream checksum matched.
    pub checksum_ok: bool,
}

impl StreamFrame {
    /// Build a frame from its unescaped parts.
    pub fn new(header: StreamHeader, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let checksum_ok = checksum::stream_matches(&header.to_bytes(), &payload);
        let samples = decode_samples(&payload);
        Self {
            header,
            payload,
            samples,
            checksum_ok,
        }
    }

    /// 0-based channel id.
    pub fn channel(&self) -> u8 {
        self.header.channel_id()
    }
}

/// Payload size for a header length field.
pub fn payload_len(length: u8) -> usize {
    length.saturating_sub(LENGTH_OVERHEAD) as usize
}

/// Map a 1-based wire channel to a 0-based id. Wire channel 0 maps to 255.
pub fn channel_id(wire: u8) -> u8 {
    wire.wrapping_sub(1)
}

/// Two's-complement value of a big-endian byte pair.
#[inline]
pub fn decode_sample(hi: u8, lo: u8) -> i16 {
    i16::from_be_bytes([hi, lo])
}

/// Decode consecutive big-endian pairs. A trailing odd byte is ignored.
pub fn decode_samples(payload: &[u8]) -> Vec<i16> {
    payload
        .chunks_exact(2)
        .map(|pair| decode_sample(pair[0], pair[1]))
        .collect()
}

/// Encode a data frame carrying `samples` for the 0-based `channel`.
pub fn encode_stream_frame(channel: u8, samples: &[i16], dst: &mut BytesMut) -> Result<StreamHeader> {
    let mut payload = BytesMut::with_capacity(samples.len() * 2);
    for &sample in samples {
        payload.put_i16(sample);
    }
    let template = StreamHeader {
        channel: channel.wrapping_add(1),
        ..StreamHeader::default()
    };
    encode_payload_frame(&template, &payload, dst)
}

/// Encode a data frame with an arbitrary payload.
///
/// The checksum and length in `template` are recomputed; the returned header
/// is what went on the wire.
///
/// Wire format:
/// ```text
/// ┌────────┬──────────────────────┬──────────────────────────┐
/// │ 0x7E   │ Header (8B, escaped) │ Payload (escaped)        │
/// └────────┴──────────────────────┴──────────────────────────┘
/// ```
pub fn encode_payload_frame(
    template: &StreamHeader,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<StreamHeader> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    if template.kind == STOP_MARKER {
        return Err(FrameError::ReservedMarker(template.kind));
    }

    let mut header = StreamHeader {
        length: payload.len() as u8 + LENGTH_OVERHEAD,
        ..*template
    };
    header.checksum = checksum::stream_sum(&header.to_bytes(), payload);

    dst.reserve(1 + 2 * (HEADER_SIZE + payload.len()));
    dst.put_u8(DELIMITER);
    escape(&header.to_bytes(), dst);
    escape(payload, dst);
    Ok(header)
}

/// Encode the short frame a device sends when `channel` (0-based) stops.
pub fn encode_stop_frame(channel: u8, dst: &mut BytesMut) {
    dst.reserve(1 + STOP_MARKER_OFFSET + 1 + STOP_TAIL_SIZE);
    dst.put_u8(DELIMITER);
    dst.put_u16(0);
    dst.put_u8(STOP_MARKER);
    // The tail is read raw, so it is written raw.
    dst.put_u8(0);
    dst.put_u8(channel.wrapping_add(1));
}
