use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::decoder::{DecodeEvent, DecoderConfig, FrameDecoder};
use crate::error::FrameError;

/// `tokio_util` codec that yields stream events from chunked reads.
///
/// The wrapped [`FrameDecoder`] keeps partial frames between chunks, so read
/// boundaries may fall anywhere, including inside an escape sequence.
#[derive(Debug, Default)]
pub struct StreamCodec {
    decoder: FrameDecoder,
}

impl StreamCodec {
    /// Create a codec with default decoder configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with explicit decoder configuration.
    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            decoder: FrameDecoder::with_config(config),
        }
    }

    /// Borrow the decoder.
    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }
}

impl Decoder for StreamCodec {
    type Item = DecodeEvent;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while src.has_remaining() {
            let byte = src.get_u8();
            if let Some(event) = self.decoder.push(byte) {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let event = self.decode(src)?;
        if event.is_none() && self.decoder.in_frame() {
            tracing::debug!("stream ended inside a frame");
            self.decoder.reset();
        }
        Ok(event)
    }
}
