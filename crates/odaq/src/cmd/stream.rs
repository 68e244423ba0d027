use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use odaq_device::{ChannelConfig, Daq};
use odaq_frame::{DecoderConfig, Sample, SessionConfig, SessionStats};
use odaq_transport::Transport;
use serde::Serialize;
use tracing::{info, warn};

use crate::cmd::{parse_duration, StreamArgs};
use crate::exit::{device_error, frame_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Serialize)]
struct StreamOutput {
    polls: u64,
    frames: u64,
    stray_bytes: u64,
    checksum_mismatches: u64,
    /// Samples keyed by channel id.
    channels: BTreeMap<u8, Vec<i16>>,
}

/// When polling ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Budget {
    Polls(u64),
    Duration(Duration),
}

impl Budget {
    fn exhausted(self, polls: u64, started: Instant) -> bool {
        match self {
            Budget::Polls(limit) => polls >= limit,
            Budget::Duration(limit) => started.elapsed() >= limit,
        }
    }
}

pub fn run(args: StreamArgs, format: OutputFormat) -> CliResult<i32> {
    let budget = match args.duration.as_deref() {
        Some(input) => Budget::Duration(parse_duration(input)?),
        None => Budget::Polls(args.polls),
    };
    let channel = ChannelConfig {
        gain: args.gain,
        ninput: args.ninput,
        ..ChannelConfig::new(args.channel, args.mode, args.pinput)
    };

    let mut daq = args.port.open()?;
    daq.create_stream(args.channel, args.period)
        .map_err(|err| device_error("create_stream failed", err))?;
    daq.conf_channel(&channel)
        .map_err(|err| device_error("conf_channel failed", err))?;
    daq.setup_channel(args.channel, args.npoints, !args.single)
        .map_err(|err| device_error("setup_channel failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    daq.start().map_err(|err| device_error("start failed", err))?;

    let config = SessionConfig {
        decoder: DecoderConfig {
            strict_checksum: args.strict,
        },
        ..SessionConfig::default()
    };
    let acquired = acquire(&mut daq, config, budget, &running);

    // Stop the device even when reading failed.
    let drained = daq
        .stop_streaming()
        .map_err(|err| device_error("stop failed", err));
    let (mut samples, stats) = acquired?;
    for frame in drained? {
        let channel = frame.channel();
        samples.extend(frame.samples.iter().map(|&value| Sample { channel, value }));
    }

    info!(
        polls = stats.polls,
        frames = stats.frames,
        samples = samples.len(),
        stray = stats.stray_bytes,
        "stream finished"
    );
    if stats.checksum_mismatches > 0 {
        warn!(
            count = stats.checksum_mismatches,
            "frames with mismatched stream checksum"
        );
    }

    print_stream(&samples, &stats, format);
    Ok(SUCCESS)
}

fn acquire<T: Transport>(
    daq: &mut Daq<T>,
    config: SessionConfig,
    budget: Budget,
    running: &AtomicBool,
) -> CliResult<(Vec<Sample>, SessionStats)> {
    let mut session = daq.stream_session_with(config);
    let started = Instant::now();
    let mut polls = 0u64;

    while running.load(Ordering::SeqCst) && !budget.exhausted(polls, started) {
        session
            .poll()
            .map_err(|err| frame_error("stream read failed", err))?;
        polls += 1;
    }

    Ok((session.take_samples(), session.stats()))
}

fn by_channel(samples: &[Sample]) -> BTreeMap<u8, Vec<i16>> {
    let mut channels: BTreeMap<u8, Vec<i16>> = BTreeMap::new();
    for sample in samples {
        channels.entry(sample.channel).or_default().push(sample.value);
    }
    channels
}

fn print_stream(samples: &[Sample], stats: &SessionStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&StreamOutput {
            polls: stats.polls,
            frames: stats.frames,
            stray_bytes: stats.stray_bytes,
            checksum_mismatches: stats.checksum_mismatches,
            channels: by_channel(samples),
        }),
        OutputFormat::Table => print_table(
            &["CHANNEL", "SAMPLES", "MIN", "MAX", "MEAN"],
            by_channel(samples).into_iter().map(|(channel, values)| {
                let min = values.iter().min().copied().unwrap_or_default();
                let max = values.iter().max().copied().unwrap_or_default();
                let mean = values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len() as f64;
                [
                    channel.to_string(),
                    values.len().to_string(),
                    min.to_string(),
                    max.to_string(),
                    format!("{mean:.1}"),
                ]
            }),
        ),
        OutputFormat::Pretty => {
            for (channel, values) in by_channel(samples) {
                println!("channel {channel}: {values:?}");
            }
        }
        OutputFormat::Raw => {
            for sample in samples {
                println!("{} {}", sample.channel, sample.value);
            }
        }
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
