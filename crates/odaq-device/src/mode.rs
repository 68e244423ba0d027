use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DeviceError;

/// What a stream channel measures or drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelMode {
    AnalogInput,
    AnalogOutput,
    DigitalInput,
    DigitalOutput,
    CounterInput,
    CaptureInput,
}

impl ChannelMode {
    pub const ALL: [ChannelMode; 6] = [
        Self::AnalogInput,
        Self::AnalogOutput,
        Self::DigitalInput,
        Self::DigitalOutput,
        Self::CounterInput,
        Self::CaptureInput,
    ];

    /// Wire code.
    pub fn code(self) -> u8 {
        match self {
            Self::AnalogInput => 0,
            Self::AnalogOutput => 1,
            Self::DigitalInput => 2,
            Self::DigitalOutput => 3,
            Self::CounterInput => 4,
            Self::CaptureInput => 5,
        }
    }

    /// Mode for a wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.code() == code)
    }

    /// Canonical name, e.g. `ANALOG_INPUT`.
    pub fn name(self) -> &'static str {
        match self {
            Self::AnalogInput => "ANALOG_INPUT",
            Self::AnalogOutput => "ANALOG_OUTPUT",
            Self::DigitalInput => "DIGITAL_INPUT",
            Self::DigitalOutput => "DIGITAL_OUTPUT",
            Self::CounterInput => "COUNTER_INPUT",
            Self::CaptureInput => "CAPTURE_INPUT",
        }
    }
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts `ANALOG_INPUT`, `analog-input`, `analog_input` or the numeric code.
impl FromStr for ChannelMode {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_uppercase();
        if let Some(mode) = Self::ALL.into_iter().find(|m| m.name() == normalized) {
            return Ok(mode);
        }
        normalized
            .parse::<u8>()
            .ok()
            .and_then(Self::from_code)
            .ok_or_else(|| DeviceError::invalid(format!("unknown channel mode: {s}")))
    }
}

/// Status LED color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedColor {
    Off,
    Green,
    Red,
}

impl LedColor {
    /// Wire code.
    pub fn code(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Green => 1,
            Self::Red => 2,
        }
    }

    /// Color for a wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Off),
            1 => Some(Self::Green),
            2 => Some(Self::Red),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Green => "green",
            Self::Red => "red",
        }
    }
}

impl fmt::Display for LedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LedColor {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "0" => Ok(Self::Off),
            "green" | "1" => Ok(Self::Green),
            "red" | "2" => Ok(Self::Red),
            _ => Err(DeviceError::invalid(format!("unknown LED color: {s}"))),
        }
    }
}
