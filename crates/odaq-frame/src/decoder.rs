use bytes::{BufMut, BytesMut};
use tracing::{debug, trace};

use crate::codec::{
    channel_id, payload_len, StreamFrame, StreamHeader, HEADER_SIZE, MAX_PAYLOAD, STOP_MARKER,
    STOP_MARKER_OFFSET, STOP_TAIL_SIZE,
};
use crate::escape::{unescape_byte, DELIMITER, ESCAPE};

/// Frame decoder configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Drop frames whose stream checksum does not match.
    ///
    /// Off by default: mismatches are counted and the frame is still
    /// delivered with `checksum_ok == false`.
    pub strict_checksum: bool,
}

impl DecoderConfig {
    /// Configuration that drops frames with a bad stream checksum.
    pub fn strict() -> Self {
        Self {
            strict_checksum: true,
        }
    }
}

/// Something the decoder recognized in the byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEvent {
    /// A complete data frame.
    Frame(StreamFrame),
    /// The device stopped streaming on this 0-based channel.
    Stop { channel: u8 },
    /// A byte seen outside any frame.
    Stray(u8),
}

/// Where the decoder is inside the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Waiting for a delimiter.
    Seek,
    /// Collecting the 8 header bytes.
    Header,
    /// Reading the raw bytes after a stop marker.
    StopTail { seen: usize },
    /// Collecting `len` payload bytes.
    Payload { len: usize },
}

/// Running totals kept by a decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    pub frames: u64,
    pub stops: u64,
    pub stray_bytes: u64,
    pub checksum_mismatches: u64,
    pub dropped_frames: u64,
}

/// Resumable stream frame decoder.
///
/// Bytes are pushed one at a time; partial frames survive between pushes, so
/// the caller may feed whatever the transport produced and come back later.
/// All accumulation state is cleared whenever an event is produced or a frame
/// is dropped.
#[derive(Debug)]
pub struct FrameDecoder {
    config: DecoderConfig,
    state: DecoderState,
    pending_escape: bool,
    header: [u8; HEADER_SIZE],
    header_len: usize,
    payload: BytesMut,
    stats: DecoderStats,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a decoder with default configuration.
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    /// Create a decoder with explicit configuration.
    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            config,
            state: DecoderState::Seek,
            pending_escape: false,
            header: [0; HEADER_SIZE],
            header_len: 0,
            payload: BytesMut::with_capacity(MAX_PAYLOAD),
            stats: DecoderStats::default(),
        }
    }

    /// Feed one raw byte.
    pub fn push(&mut self, byte: u8) -> Option<DecodeEvent> {
        match self.state {
            DecoderState::Seek => {
                if byte == DELIMITER {
                    trace!("frame start");
                    self.state = DecoderState::Header;
                    None
                } else {
                    self.stats.stray_bytes += 1;
                    Some(DecodeEvent::Stray(byte))
                }
            }
            DecoderState::Header => {
                let byte = self.unstuff(byte)?;
                self.header[self.header_len] = byte;
                self.header_len += 1;

                if self.header_len == STOP_MARKER_OFFSET + 1 && byte == STOP_MARKER {
                    trace!("stop marker");
                    self.state = DecoderState::StopTail { seen: 0 };
                    return None;
                }
                if self.header_len == HEADER_SIZE {
                    let len = payload_len(self.header[3]);
                    if len == 0 {
                        return self.finish_frame();
                    }
                    self.state = DecoderState::Payload { len };
                }
                None
            }
            DecoderState::StopTail { seen } => {
                if seen + 1 < STOP_TAIL_SIZE {
                    self.state = DecoderState::StopTail { seen: seen + 1 };
                    return None;
                }
                let channel = channel_id(byte);
                self.reset();
                self.stats.stops += 1;
                debug!(channel, "stream stopped");
                Some(DecodeEvent::Stop { channel })
            }
            DecoderState::Payload { len } => {
                let byte = self.unstuff(byte)?;
                self.payload.put_u8(byte);
                if self.payload.len() == len {
                    return self.finish_frame();
                }
                None
            }
        }
    }

    /// Feed a slice and collect every event it completes.
    pub fn decode_all(&mut self, bytes: &[u8]) -> Vec<DecodeEvent> {
        bytes.iter().filter_map(|&byte| self.push(byte)).collect()
    }

    /// Discard any partially collected frame.
    pub fn reset(&mut self) {
        self.state = DecoderState::Seek;
        self.pending_escape = false;
        self.header_len = 0;
        self.payload.clear();
    }

    /// Current position in the frame grammar.
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Whether a frame is partially collected.
    pub fn in_frame(&self) -> bool {
        self.state != DecoderState::Seek
    }

    /// Running totals.
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Current configuration.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Toggle strict checksum validation for subsequent frames.
    pub fn set_strict_checksum(&mut self, strict: bool) {
        self.config.strict_checksum = strict;
    }

    fn unstuff(&mut self, byte: u8) -> Option<u8> {
        if self.pending_escape {
            self.pending_escape = false;
            Some(unescape_byte(byte))
        } else if byte == ESCAPE {
            self.pending_escape = true;
            None
        } else {
            Some(byte)
        }
    }

    fn finish_frame(&mut self) -> Option<DecodeEvent> {
        let header = StreamHeader::from_bytes(self.header);
        let payload = self.payload.split().freeze();
        self.reset();

        if payload.len() % 2 != 0 {
            debug!(len = payload.len(), "odd payload length, trailing byte ignored");
        }

        let frame = StreamFrame::new(header, payload);
        if !frame.checksum_ok {
            self.stats.checksum_mismatches += 1;
            if self.config.strict_checksum {
                self.stats.dropped_frames += 1;
                debug!(channel = frame.channel(), "dropping frame with bad stream checksum");
                return None;
            }
            debug!(channel = frame.channel(), "stream checksum mismatch");
        }

        self.stats.frames += 1;
        trace!(
            channel = frame.channel(),
            samples = frame.samples.len(),
            "frame decoded"
        );
        Some(DecodeEvent::Frame(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_payload_frame, encode_stop_frame, encode_stream_frame};

    fn frame_of(event: Option<DecodeEvent>) -> StreamFrame {
        match event {
            Some(DecodeEvent::Frame(frame)) => frame,
            other => panic!("expected frame, got {other:?}"),
        }
    }

    #[test]
    fn decodes_reference_frame() {
        let wire = [0x7E, 0x00, 0x00, 0x00, 6, 2, 0x00, 0x00, 0x00, 0x01, 0x02];
        let mut decoder = FrameDecoder::new();

        let (last, head) = wire.split_last().unwrap();
        for &byte in head {
            assert_eq!(decoder.push(byte), None);
        }
        let frame = frame_of(decoder.push(*last));

        assert_eq!(frame.channel(), 1);
        assert_eq!(frame.samples, vec![258]);
        assert!(!frame.checksum_ok);
        assert_eq!(decoder.state(), DecoderState::Seek);
    }

    #[test]
    fn consumes_exactly_the_announced_payload() {
        let mut wire = BytesMut::new();
        encode_stream_frame(0, &[1, 2, 3], &mut wire).unwrap();
        wire.extend_from_slice(&[0xAA]);

        let mut decoder = FrameDecoder::new();
        let events = decoder.decode_all(&wire);

        assert_eq!(events.len(), 2);
        match &events[0] {
            DecodeEvent::Frame(frame) => {
                assert_eq!(frame.payload.len(), 6);
                assert_eq!(frame.samples, vec![1, 2, 3]);
                assert!(frame.checksum_ok);
            }
            other => panic!("expected frame, got {other:?}"),
        }
        assert_eq!(events[1], DecodeEvent::Stray(0xAA));
    }

    #[test]
    fn unescapes_header_and_payload() {
        let template = StreamHeader {
            kind: 0x7D,
            channel: 0x7E,
            ..StreamHeader::default()
        };
        let payload = [0x7E, 0x7D, 0x7D, 0x7E];
        let mut wire = BytesMut::new();
        encode_payload_frame(&template, &payload, &mut wire).unwrap();

        let mut decoder = FrameDecoder::new();
        let frame = frame_of(decoder.decode_all(&wire).pop());

        assert_eq!(frame.header.kind, 0x7D);
        assert_eq!(frame.header.channel, 0x7E);
        assert_eq!(frame.payload.as_ref(), &payload);
        assert!(frame.checksum_ok);
    }

    #[test]
    fn stop_short_circuits_after_two_raw_bytes() {
        let mut decoder = FrameDecoder::new();
        for byte in [0x7E, 0x00, 0x00, STOP_MARKER] {
            assert_eq!(decoder.push(byte), None);
        }
        assert_eq!(decoder.state(), DecoderState::StopTail { seen: 0 });

        // Tail bytes are raw: an escape marker here is not special.
        assert_eq!(decoder.push(ESCAPE), None);
        assert_eq!(decoder.push(3), Some(DecodeEvent::Stop { channel: 2 }));
        assert_eq!(decoder.state(), DecoderState::Seek);
        assert_eq!(decoder.stats().stops, 1);
    }

    #[test]
    fn escaped_stop_marker_still_stops() {
        // 0x7D 0x70 unescapes to 80 at the third header byte.
        let wire = [0x7E, 0x00, 0x00, ESCAPE, STOP_MARKER ^ 0x20, 0x00, 0x02];
        let mut decoder = FrameDecoder::new();

        assert_eq!(decoder.decode_all(&wire), vec![DecodeEvent::Stop { channel: 1 }]);
        assert_eq!(decoder.state(), DecoderState::Seek);
        assert_eq!(decoder.stats().stops, 1);
        assert_eq!(decoder.stats().frames, 0);
    }

    #[test]
    fn encoded_stop_frame_decodes() {
        let mut wire = BytesMut::new();
        encode_stop_frame(0, &mut wire);
        let events = FrameDecoder::new().decode_all(&wire);
        assert_eq!(events, vec![DecodeEvent::Stop { channel: 0 }]);
    }

    #[test]
    fn stop_marker_elsewhere_is_data() {
        let template = StreamHeader {
            channel: STOP_MARKER,
            reserved: [STOP_MARKER; 3],
            ..StreamHeader::default()
        };
        let mut wire = BytesMut::new();
        encode_payload_frame(&template, &[STOP_MARKER, STOP_MARKER], &mut wire).unwrap();

        let frame = frame_of(FrameDecoder::new().decode_all(&wire).pop());
        assert_eq!(frame.channel(), STOP_MARKER - 1);
        assert_eq!(frame.samples, vec![i16::from_be_bytes([STOP_MARKER, STOP_MARKER])]);
    }

    #[test]
    fn stray_bytes_outside_frames() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.push(0x41), Some(DecodeEvent::Stray(0x41)));
        assert_eq!(decoder.push(0xFF), Some(DecodeEvent::Stray(0xFF)));
        assert_eq!(decoder.stats().stray_bytes, 2);
        assert!(!decoder.in_frame());
    }

    #[test]
    fn partial_frame_resumes_across_pushes() {
        let mut wire = BytesMut::new();
        encode_stream_frame(3, &[-2, 0x7E7D], &mut wire).unwrap();

        let mut decoder = FrameDecoder::new();
        let (first, second) = wire.split_at(5);
        assert!(decoder.decode_all(first).is_empty());
        assert!(decoder.in_frame());

        let frame = frame_of(decoder.decode_all(second).pop());
        assert_eq!(frame.channel(), 3);
        assert_eq!(frame.samples, vec![-2, 0x7E7D]);
    }

    #[test]
    fn split_inside_escape_sequence_resumes() {
        let mut wire = BytesMut::new();
        encode_payload_frame(&StreamHeader::default(), &[0x7E, 0x01], &mut wire).unwrap();
        let split = wire.iter().position(|&b| b == ESCAPE).unwrap() + 1;

        let mut decoder = FrameDecoder::new();
        assert!(decoder.decode_all(&wire[..split]).is_empty());
        let frame = frame_of(decoder.decode_all(&wire[split..]).pop());
        assert_eq!(frame.payload.as_ref(), &[0x7E, 0x01]);
    }

    #[test]
    fn empty_payload_frame_completes_on_header() {
        let wire = [0x7E, 0x00, 0x00, 0x00, 4, 1, 0x00, 0x00, 0x00];
        let frame = frame_of(FrameDecoder::new().decode_all(&wire).pop());
        assert!(frame.samples.is_empty());
        assert_eq!(frame.channel(), 0);
    }

    #[test]
    fn length_below_overhead_completes_on_header() {
        let wire = [0x7E, 0x00, 0x00, 0x00, 1, 2, 0x00, 0x00, 0x00, 0x33];
        let events = FrameDecoder::new().decode_all(&wire);
        assert!(matches!(&events[0], DecodeEvent::Frame(f) if f.payload.is_empty()));
        assert_eq!(events[1], DecodeEvent::Stray(0x33));
    }

    #[test]
    fn bad_checksum_is_advisory_by_default() {
        let mut wire = BytesMut::new();
        encode_stream_frame(0, &[100], &mut wire).unwrap();
        wire[1] ^= 0x01;

        let mut decoder = FrameDecoder::new();
        let frame = frame_of(decoder.decode_all(&wire).pop());
        assert!(!frame.checksum_ok);
        assert_eq!(frame.samples, vec![100]);
        assert_eq!(decoder.stats().checksum_mismatches, 1);
        assert_eq!(decoder.stats().frames, 1);
    }

    #[test]
    fn strict_mode_drops_bad_frames() {
        let mut wire = BytesMut::new();
        encode_stream_frame(0, &[100], &mut wire).unwrap();
        wire[1] ^= 0x01;
        encode_stream_frame(1, &[200], &mut wire).unwrap();

        let mut decoder = FrameDecoder::with_config(DecoderConfig::strict());
        let events = decoder.decode_all(&wire);

        assert_eq!(events.len(), 1);
        let frame = frame_of(events.into_iter().next());
        assert_eq!(frame.channel(), 1);
        assert_eq!(decoder.stats().dropped_frames, 1);
        assert_eq!(decoder.state(), DecoderState::Seek);
    }

    #[test]
    fn reset_discards_partial_frame() {
        let mut decoder = FrameDecoder::new();
        decoder.decode_all(&[0x7E, 0x00, ESCAPE]);
        assert!(decoder.in_frame());

        decoder.reset();
        assert!(!decoder.in_frame());
        assert_eq!(decoder.push(0x10), Some(DecodeEvent::Stray(0x10)));
    }

    #[test]
    fn no_state_leaks_between_frames() {
        let mut wire = BytesMut::new();
        encode_stream_frame(0, &[1, 2, 3, 4], &mut wire).unwrap();
        encode_stream_frame(1, &[5], &mut wire).unwrap();

        let events = FrameDecoder::new().decode_all(&wire);
        let samples: Vec<Vec<i16>> = events
            .into_iter()
            .map(|e| frame_of(Some(e)).samples)
            .collect();
        assert_eq!(samples, vec![vec![1, 2, 3, 4], vec![5]]);
    }
}
