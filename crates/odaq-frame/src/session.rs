use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use odaq_transport::Transport;
use tracing::{debug, info};

use crate::decoder::{DecodeEvent, DecoderConfig};
use crate::error::Result;
use crate::reader::{StreamReader, StreamStatus};

/// Default number of consecutive idle polls that ends [`Samples`].
pub const DEFAULT_IDLE_LIMIT: usize = 10;

/// One decoded sample and the channel it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sample {
    /// 0-based channel id.
    pub channel: u8,
    pub value: i16,
}

/// Stream session configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub decoder: DecoderConfig,
    /// Consecutive idle polls after which [`StreamSession::samples_iter`]
    /// and [`StreamSession::poll_until_idle`] give up.
    pub idle_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            decoder: DecoderConfig::default(),
            idle_limit: DEFAULT_IDLE_LIMIT,
        }
    }
}

/// Counters kept across a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub polls: u64,
    pub idle_polls: u64,
    pub frames: u64,
    pub samples: u64,
    pub stray_bytes: u64,
    pub stops: u64,
    pub checksum_mismatches: u64,
}

/// Accumulates `(channel, sample)` pairs from a live stream.
///
/// Every poll runs the decoder once. Idle, stray and stop outcomes never end
/// the session; the caller decides when to stop polling (usually after
/// sending a stop command), then should clear the transport input before the
/// next session.
#[derive(Debug)]
pub struct StreamSession<T> {
    reader: StreamReader<T>,
    config: SessionConfig,
    samples: Vec<Sample>,
    stray: Vec<u8>,
    stopped: BTreeSet<u8>,
    stats: SessionStats,
    idle_streak: usize,
    /// Samples already handed out by [`Samples`].
    yielded: usize,
}

impl<T: Transport> StreamSession<T> {
    /// Start a session with default configuration.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, SessionConfig::default())
    }

    /// Start a session with explicit configuration.
    pub fn with_config(transport: T, config: SessionConfig) -> Self {
        Self {
            reader: StreamReader::with_config(transport, config.decoder),
            config,
            samples: Vec::new(),
            stray: Vec::new(),
            stopped: BTreeSet::new(),
            stats: SessionStats::default(),
            idle_streak: 0,
            yielded: 0,
        }
    }

    /// Run the decoder once.
    pub fn poll(&mut self) -> Result<StreamStatus> {
        self.stats.polls += 1;
        let Some(event) = self.reader.next_event()? else {
            self.stats.idle_polls += 1;
            self.idle_streak += 1;
            return Ok(StreamStatus::Idle);
        };
        self.idle_streak = 0;

        let status = match event {
            DecodeEvent::Frame(frame) => {
                let channel = frame.channel();
                if !frame.checksum_ok {
                    self.stats.checksum_mismatches += 1;
                }
                if self.stopped.remove(&channel) {
                    debug!(channel, "stopped channel resumed");
                }
                self.stats.frames += 1;
                self.stats.samples += frame.samples.len() as u64;
                self.samples.extend(
                    frame
                        .samples
                        .iter()
                        .map(|&value| Sample { channel, value }),
                );
                StreamStatus::Frame
            }
            DecodeEvent::Stray(byte) => {
                self.stats.stray_bytes += 1;
                self.stray.push(byte);
                debug!(byte, "stray byte, stream may be out of sync");
                StreamStatus::Stray
            }
            DecodeEvent::Stop { channel } => {
                self.stats.stops += 1;
                self.stopped.insert(channel);
                info!(channel, "channel stopped streaming");
                StreamStatus::Stop
            }
        };
        Ok(status)
    }

    /// Poll `count` times. Returns the number of frames decoded.
    pub fn poll_n(&mut self, count: usize) -> Result<u64> {
        let before = self.stats.frames;
        for _ in 0..count {
            self.poll()?;
        }
        Ok(self.stats.frames - before)
    }

    /// Poll until `duration` has elapsed. Returns the number of frames decoded.
    pub fn poll_for(&mut self, duration: Duration) -> Result<u64> {
        let before = self.stats.frames;
        let start = Instant::now();
        while start.elapsed() < duration {
            self.poll()?;
        }
        Ok(self.stats.frames - before)
    }

    /// Poll until the configured number of consecutive idle polls is reached.
    pub fn poll_until_idle(&mut self) -> Result<u64> {
        let before = self.stats.frames;
        self.idle_streak = 0;
        while self.idle_streak < self.config.idle_limit {
            self.poll()?;
        }
        Ok(self.stats.frames - before)
    }

    /// Lazily yield the samples of this session, polling as needed.
    ///
    /// Collected samples not yet yielded come first. The iterator ends after
    /// `idle_limit` consecutive idle polls or after yielding an error. The
    /// cursor lives in the session, so a later call picks up after the last
    /// sample handed out and never replays one; only a fresh session starts
    /// from the beginning.
    pub fn samples_iter(&mut self) -> Samples<'_, T> {
        self.idle_streak = 0;
        Samples {
            session: self,
            done: false,
        }
    }

    /// Samples collected so far.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Sample values collected so far for one channel.
    pub fn channel_samples(&self, channel: u8) -> Vec<i16> {
        self.samples
            .iter()
            .filter(|s| s.channel == channel)
            .map(|s| s.value)
            .collect()
    }

    /// Take the collected samples, leaving the session empty.
    pub fn take_samples(&mut self) -> Vec<Sample> {
        self.yielded = 0;
        std::mem::take(&mut self.samples)
    }

    /// Bytes seen outside any frame.
    pub fn stray(&self) -> &[u8] {
        &self.stray
    }

    /// Channels the device reported as stopped.
    pub fn stopped_channels(&self) -> impl Iterator<Item = u8> + '_ {
        self.stopped.iter().copied()
    }

    /// Whether the device reported `channel` as stopped.
    pub fn is_stopped(&self, channel: u8) -> bool {
        self.stopped.contains(&channel)
    }

    /// Session counters.
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Current configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Borrow the underlying reader.
    pub fn reader(&self) -> &StreamReader<T> {
        &self.reader
    }

    /// Mutably borrow the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        self.reader.get_mut()
    }

    /// End the session and return the transport.
    pub fn into_inner(self) -> T {
        self.reader.into_inner()
    }
}

/// Lazy sample sequence returned by [`StreamSession::samples_iter`].
#[derive(Debug)]
pub struct Samples<'a, T> {
    session: &'a mut StreamSession<T>,
    done: bool,
}

impl<T: Transport> Iterator for Samples<'_, T> {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if let Some(sample) = self.session.samples.get(self.session.yielded) {
                self.session.yielded += 1;
                return Some(Ok(*sample));
            }
            if self.session.idle_streak >= self.session.config.idle_limit {
                self.done = true;
                return None;
            }
            if let Err(err) = self.session.poll() {
                self.done = true;
                return Some(Err(err));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use odaq_transport::MemoryTransport;

    use super::*;
    use crate::codec::{encode_stop_frame, encode_stream_frame};

    fn wire_with(build: impl FnOnce(&mut BytesMut)) -> MemoryTransport {
        let mut wire = BytesMut::new();
        build(&mut wire);
        MemoryTransport::with_inbound(&wire)
    }

    #[test]
    fn accumulates_pairs_across_polls() {
        let link = wire_with(|w| {
            encode_stream_frame(0, &[10, 11], w).unwrap();
            encode_stream_frame(1, &[-20], w).unwrap();
        });
        let mut session = StreamSession::new(link);

        assert_eq!(session.poll().unwrap(), StreamStatus::Frame);
        assert_eq!(session.poll().unwrap(), StreamStatus::Frame);
        assert_eq!(session.poll().unwrap(), StreamStatus::Idle);

        assert_eq!(
            session.samples(),
            &[
                Sample { channel: 0, value: 10 },
                Sample { channel: 0, value: 11 },
                Sample { channel: 1, value: -20 },
            ]
        );
        assert_eq!(session.channel_samples(0), vec![10, 11]);
        assert_eq!(session.stats().frames, 2);
        assert_eq!(session.stats().samples, 3);
    }

    #[test]
    fn noise_and_stop_do_not_end_session() {
        let link = wire_with(|w| {
            w.extend_from_slice(&[0x01, 0x02]);
            encode_stop_frame(1, w);
            encode_stream_frame(0, &[5], w).unwrap();
        });
        let mut session = StreamSession::new(link);

        let frames = session.poll_until_idle().unwrap();
        assert_eq!(frames, 1);
        assert_eq!(session.stray(), &[0x01, 0x02]);
        assert!(session.is_stopped(1));
        assert!(!session.is_stopped(0));
        assert_eq!(session.channel_samples(0), vec![5]);
        assert_eq!(session.stats().stops, 1);
        assert_eq!(session.stats().stray_bytes, 2);
    }

    #[test]
    fn long_idle_gaps_are_tolerated() {
        let mut session = StreamSession::new(MemoryTransport::new());
        assert_eq!(session.poll_n(50).unwrap(), 0);
        assert_eq!(session.stats().idle_polls, 50);

        let mut wire = BytesMut::new();
        encode_stream_frame(2, &[7], &mut wire).unwrap();
        session.transport_mut().feed(&wire);

        assert_eq!(session.poll().unwrap(), StreamStatus::Frame);
        assert_eq!(session.channel_samples(2), vec![7]);
    }

    #[test]
    fn samples_iter_is_lazy_and_ends_on_idle() {
        let link = wire_with(|w| {
            encode_stream_frame(0, &[1, 2], w).unwrap();
            encode_stream_frame(3, &[3], w).unwrap();
        });
        let mut session = StreamSession::with_config(
            link,
            SessionConfig {
                idle_limit: 3,
                ..SessionConfig::default()
            },
        );

        let collected: Vec<Sample> = session.samples_iter().map(|s| s.unwrap()).collect();
        assert_eq!(
            collected,
            vec![
                Sample { channel: 0, value: 1 },
                Sample { channel: 0, value: 2 },
                Sample { channel: 3, value: 3 },
            ]
        );
        assert_eq!(session.stats().idle_polls, 3);
    }

    #[test]
    fn samples_iter_never_replays_yielded_samples() {
        let link = wire_with(|w| {
            encode_stream_frame(0, &[1, 2], w).unwrap();
        });
        let mut session = StreamSession::with_config(
            link,
            SessionConfig {
                idle_limit: 2,
                ..SessionConfig::default()
            },
        );

        let first: Vec<i16> = session.samples_iter().map(|s| s.unwrap().value).collect();
        assert_eq!(first, vec![1, 2]);

        let second: Vec<i16> = session.samples_iter().map(|s| s.unwrap().value).collect();
        assert!(second.is_empty());

        let mut wire = BytesMut::new();
        encode_stream_frame(0, &[3], &mut wire).unwrap();
        session.transport_mut().feed(&wire);

        let third: Vec<i16> = session.samples_iter().map(|s| s.unwrap().value).collect();
        assert_eq!(third, vec![3]);
        assert_eq!(session.samples().len(), 3);
    }

    #[test]
    fn samples_iter_resumes_after_partial_read() {
        let link = wire_with(|w| {
            encode_stream_frame(1, &[4, 5, 6], w).unwrap();
        });
        let mut session = StreamSession::new(link);

        let head: Vec<i16> = session.samples_iter().take(1).map(|s| s.unwrap().value).collect();
        assert_eq!(head, vec![4]);

        let rest: Vec<i16> = session.samples_iter().map(|s| s.unwrap().value).collect();
        assert_eq!(rest, vec![5, 6]);
    }

    #[test]
    fn resumed_channel_is_no_longer_stopped() {
        let link = wire_with(|w| {
            encode_stop_frame(0, w);
            encode_stream_frame(0, &[1], w).unwrap();
        });
        let mut session = StreamSession::new(link);

        assert_eq!(session.poll().unwrap(), StreamStatus::Stop);
        assert_eq!(session.stopped_channels().collect::<Vec<_>>(), vec![0]);
        assert_eq!(session.poll().unwrap(), StreamStatus::Frame);
        assert!(!session.is_stopped(0));
    }

    #[test]
    fn strict_session_counts_no_mismatch_for_dropped_frames() {
        let mut wire = BytesMut::new();
        encode_stream_frame(0, &[1], &mut wire).unwrap();
        wire[1] ^= 0x01;
        encode_stream_frame(0, &[2], &mut wire).unwrap();

        let config = SessionConfig {
            decoder: DecoderConfig::strict(),
            ..SessionConfig::default()
        };
        let mut session = StreamSession::with_config(MemoryTransport::with_inbound(&wire), config);

        assert_eq!(session.poll().unwrap(), StreamStatus::Frame);
        assert_eq!(session.channel_samples(0), vec![2]);
        assert_eq!(session.stats().checksum_mismatches, 0);
        assert_eq!(session.reader().decoder().stats().dropped_frames, 1);
    }

    #[test]
    fn take_samples_and_into_inner() {
        let link = wire_with(|w| {
            encode_stream_frame(0, &[9], w).unwrap();
            w.extend_from_slice(&[0x42]);
        });
        let mut session = StreamSession::new(link);
        session.poll().unwrap();

        assert_eq!(session.take_samples().len(), 1);
        assert!(session.samples().is_empty());

        let mut link = session.into_inner();
        assert_eq!(link.pending_inbound(), 1);
        assert_eq!(odaq_transport::Transport::read_byte(&mut link).unwrap(), Some(0x42));
    }
}
