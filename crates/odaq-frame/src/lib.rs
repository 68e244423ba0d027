//! Framing and decoding for the openDAQ wire protocols.
//!
//! Two framings share this crate:
//! - Command packets and responses: a 2-byte big-endian additive checksum
//!   followed by the payload ([`checksum`]).
//! - Stream frames: a `0x7E` delimiter, an 8-byte header and a sample
//!   payload, both byte-stuffed with `0x7D` escapes ([`escape`], [`codec`]).
//!
//! [`FrameDecoder`] rebuilds stream frames from a byte-at-a-time feed,
//! [`StreamReader`] drives it against a transport and [`StreamSession`]
//! accumulates samples over many polls.

pub mod checksum;
pub mod codec;
pub mod decoder;
pub mod error;
pub mod escape;
pub mod reader;
pub mod session;

#[cfg(feature = "async")]
pub mod async_codec;

pub use codec::{
    decode_sample, decode_samples, encode_payload_frame, encode_stop_frame, encode_stream_frame,
    StreamFrame, StreamHeader, HEADER_SIZE, MAX_PAYLOAD, STOP_MARKER,
};
pub use decoder::{DecodeEvent, DecoderConfig, DecoderState, DecoderStats, FrameDecoder};
pub use error::{FrameError, Result};
pub use escape::{DELIMITER, ESCAPE};
pub use reader::{append_event, read_event, StreamReader, StreamStatus};
pub use session::{Sample, Samples, SessionConfig, SessionStats, StreamSession};

#[cfg(feature = "async")]
pub use async_codec::StreamCodec;
