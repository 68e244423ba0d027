//! Typed results and settings for device commands.

use serde::Serialize;

use crate::mode::ChannelMode;

/// Number of calibration slots the firmware keeps.
pub const CALIBRATION_SLOTS: u8 = 5;

/// Identification returned by `get_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub hardware_version: i8,
    pub firmware_version: i8,
    pub device_id: u32,
}

/// Analog input selection for single reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdcConfig {
    /// Positive input.
    pub pinput: u8,
    /// Negative input, 0 for single-ended.
    pub ninput: u8,
    pub gain: u8,
    /// Samples averaged per reading.
    pub nsamples: u8,
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            pinput: 8,
            ninput: 0,
            gain: 1,
            nsamples: 20,
        }
    }
}

/// Reading returned by `conf_adc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdcReading {
    pub value: i16,
    #[serde(flatten)]
    pub config: AdcConfig,
}

/// One calibration slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Calibration {
    pub gain_id: u8,
    pub gain: u16,
    pub offset: i16,
}

/// Stream channel configuration, sent by `conf_channel` and echoed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelConfig {
    /// Channel number, 1 to 4.
    pub number: u8,
    pub mode: ChannelMode,
    pub pinput: u8,
    pub ninput: u8,
    pub gain: u8,
    pub nsamples: u8,
}

impl ChannelConfig {
    /// Single-ended, unity gain, one sample per point.
    pub fn new(number: u8, mode: ChannelMode, pinput: u8) -> Self {
        Self {
            number,
            mode,
            pinput,
            ninput: 0,
            gain: 1,
            nsamples: 1,
        }
    }
}

/// Acquisition length of a channel, as echoed by `setup_channel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelSetup {
    pub number: u8,
    /// Points to acquire.
    pub npoints: u16,
    /// Restart after `npoints`.
    pub continuous: bool,
}

/// Periodic stream, as echoed by `create_stream`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamSetup {
    pub number: u8,
    /// Sampling period in milliseconds.
    pub period: u16,
}

/// Externally triggered stream, as echoed by `create_external`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExternalSetup {
    pub number: u8,
    pub edge: u8,
}

/// Result of `get_capture`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capture {
    pub mode: u8,
    pub period: u16,
}

/// PWM settings, as echoed by `init_pwm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PwmConfig {
    pub duty: u16,
    pub period: u16,
}

/// Acknowledgement of `load_signal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SignalLoad {
    /// Samples the device accepted.
    pub count: u8,
    pub offset: i16,
}

/// PIO line state, as echoed by `set_pio` and `set_pio_dir`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PioState {
    pub number: u8,
    pub value: u8,
}
