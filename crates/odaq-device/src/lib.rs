//! Command/response layer for openDAQ devices.
//!
//! [`CommandTransceiver`] performs one checksummed exchange per command.
//! [`Daq`] builds the firmware's command catalog on top of it and shares the
//! same link with the stream decoder from `odaq-frame`.

pub mod command;
pub mod device;
pub mod error;
pub mod field;
pub mod mode;
pub mod transceiver;
pub mod types;

pub use command::{id, Command};
pub use device::{dac_millivolts, Daq, DAC_LIMIT_MV, MAX_CHANNEL, MAX_PIO};
pub use error::{DeviceError, Result};
pub use field::{FieldKind, FieldValue, Fields};
pub use mode::{ChannelMode, LedColor};
pub use transceiver::{encode_response, response_len, CommandTransceiver};
pub use types::{
    AdcConfig, AdcReading, Calibration, Capture, ChannelConfig, ChannelSetup, DeviceInfo,
    ExternalSetup, PioState, PwmConfig, SignalLoad, StreamSetup, CALIBRATION_SLOTS,
};
