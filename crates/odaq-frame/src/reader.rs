use odaq_transport::Transport;

use crate::decoder::{DecodeEvent, DecoderConfig, FrameDecoder};
use crate::error::Result;

/// Outcome of one [`StreamReader::poll`] call.
///
/// The numeric codes are the ones the device driver has always reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StreamStatus {
    /// Nothing arrived within the read timeout.
    Idle = 0,
    /// One frame was decoded.
    Frame = 1,
    /// A byte arrived outside any frame.
    Stray = 2,
    /// The device stopped a channel.
    Stop = 3,
}

impl StreamStatus {
    /// Numeric status code.
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Reads stream events from a [`Transport`].
///
/// Each call reads bytes until one event completes or the transport times
/// out. A timeout in the middle of a frame keeps the partial frame for the
/// next call.
#[derive(Debug)]
pub struct StreamReader<T> {
    inner: T,
    decoder: FrameDecoder,
}

impl<T: Transport> StreamReader<T> {
    /// Create a reader with default decoder configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, DecoderConfig::default())
    }

    /// Create a reader with explicit decoder configuration.
    pub fn with_config(inner: T, config: DecoderConfig) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::with_config(config),
        }
    }

    /// Read until the next event. `Ok(None)` means the transport went idle.
    pub fn next_event(&mut self) -> Result<Option<DecodeEvent>> {
        read_event(&mut self.inner, &mut self.decoder)
    }

    /// Read one event and append its contents to the caller's sequences.
    ///
    /// See [`append_event`] for what goes where.
    pub fn poll(&mut self, data: &mut Vec<i16>, channels: &mut Vec<u8>) -> Result<StreamStatus> {
        let event = self.next_event()?;
        Ok(append_event(event, data, channels))
    }

    /// Borrow the decoder.
    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    /// Mutably borrow the decoder.
    pub fn decoder_mut(&mut self) -> &mut FrameDecoder {
        &mut self.decoder
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the transport. Any partial frame is lost.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

/// Feed bytes from `transport` into `decoder` until an event completes or the
/// transport times out.
///
/// A timeout leaves any partial frame in the decoder. A transport failure
/// resets it.
pub fn read_event<T: Transport + ?Sized>(
    transport: &mut T,
    decoder: &mut FrameDecoder,
) -> Result<Option<DecodeEvent>> {
    loop {
        let byte = match transport.read_byte() {
            Ok(Some(byte)) => byte,
            Ok(None) => return Ok(None),
            Err(err) => {
                decoder.reset();
                return Err(err.into());
            }
        };
        if let Some(event) = decoder.push(byte) {
            return Ok(Some(event));
        }
    }
}

/// Append an event to the caller's sequences and classify it.
///
/// - `Frame`: every sample goes to `data`, the channel id once to `channels`.
/// - `Stray`: the byte goes to `data`, read as a signed 8-bit value.
/// - `Stop`: the stopped channel id goes to `channels`.
/// - `None` (idle): nothing is touched.
pub fn append_event(
    event: Option<DecodeEvent>,
    data: &mut Vec<i16>,
    channels: &mut Vec<u8>,
) -> StreamStatus {
    match event {
        None => StreamStatus::Idle,
        Some(DecodeEvent::Frame(frame)) => {
            data.extend_from_slice(&frame.samples);
            channels.push(frame.channel());
            StreamStatus::Frame
        }
        Some(DecodeEvent::Stray(byte)) => {
            data.push(i16::from(byte as i8));
            StreamStatus::Stray
        }
        Some(DecodeEvent::Stop { channel }) => {
            channels.push(channel);
            StreamStatus::Stop
        }
    }
}
