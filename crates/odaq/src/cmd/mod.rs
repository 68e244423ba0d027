use std::time::Duration;

use clap::{Args, Subcommand};
use odaq_device::{ChannelMode, Daq, LedColor};
use odaq_transport::{SerialConfig, SerialTransport};

use crate::exit::{device_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod cal;
pub mod info;
pub mod led;
pub mod ports;
pub mod stream;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print hardware and firmware versions and the device id.
    Info(InfoArgs),
    /// Set the status LED.
    Led(LedArgs),
    /// Print the calibration table.
    Cal(CalArgs),
    /// Acquire one analog stream and print the samples.
    Stream(StreamArgs),
    /// List serial ports.
    Ports,
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Info(args) => info::run(args, format),
        Command::Led(args) => led::run(args, format),
        Command::Cal(args) => cal::run(args, format),
        Command::Stream(args) => stream::run(args, format),
        Command::Ports => ports::run(format),
        Command::Version(args) => version::run(args),
    }
}

/// Serial link options shared by every device command.
#[derive(Args, Debug, Clone)]
pub struct PortArgs {
    /// Serial device, e.g. /dev/ttyUSB0 or COM3.
    #[arg(long, short = 'p', env = "ODAQ_PORT", default_value = "/dev/ttyUSB0")]
    pub port: String,
    /// Per-read timeout (e.g. 100ms, 1s).
    #[arg(long, default_value = "100ms")]
    pub timeout: String,
    /// Wait after opening while the board resets (e.g. 2s, 0s).
    #[arg(long, default_value = "2s")]
    pub settle: String,
}

impl PortArgs {
    pub fn serial_config(&self) -> CliResult<SerialConfig> {
        let timeout = parse_duration(&self.timeout)?;
        if timeout.is_zero() {
            return Err(CliError::new(USAGE, "timeout must be greater than zero"));
        }
        Ok(SerialConfig {
            timeout,
            settle_delay: parse_duration(&self.settle)?,
            ..SerialConfig::new(self.port.as_str())
        })
    }

    pub fn open(&self) -> CliResult<Daq<SerialTransport>> {
        let config = self.serial_config()?;
        Daq::open(&config).map_err(|err| device_error("open failed", err))
    }
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub port: PortArgs,
}

#[derive(Args, Debug)]
pub struct LedArgs {
    #[command(flatten)]
    pub port: PortArgs,
    /// off, green or red.
    pub color: LedColor,
}

#[derive(Args, Debug)]
pub struct CalArgs {
    #[command(flatten)]
    pub port: PortArgs,
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    #[command(flatten)]
    pub port: PortArgs,
    /// Stream channel, 1 to 4.
    #[arg(long, short = 'c', default_value = "1")]
    pub channel: u8,
    /// Sampling period in milliseconds.
    #[arg(long, default_value = "100")]
    pub period: u16,
    /// Channel mode (name or code).
    #[arg(long, default_value = "analog-input")]
    pub mode: ChannelMode,
    /// Positive analog input.
    #[arg(long, default_value = "1")]
    pub pinput: u8,
    /// Negative analog input, 0 for single-ended.
    #[arg(long, default_value = "0")]
    pub ninput: u8,
    #[arg(long, default_value = "1")]
    pub gain: u8,
    /// Points to acquire before the channel restarts or stops.
    #[arg(long, default_value = "200")]
    pub npoints: u16,
    /// Stop the channel after npoints instead of restarting.
    #[arg(long)]
    pub single: bool,
    /// Number of stream polls.
    #[arg(long, default_value = "20", conflicts_with = "duration")]
    pub polls: u64,
    /// Poll for this long instead of a fixed count (e.g. 5s).
    #[arg(long)]
    pub duration: Option<String>,
    /// Drop frames whose stream checksum does not match.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `150ms`, `2s` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input}")))?;

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
