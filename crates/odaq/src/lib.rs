//! Driver for openDAQ data-acquisition boards.
//!
//! The board speaks two protocols over one serial link: checksummed
//! command/response packets and a byte-stuffed stream of sample frames.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte-level link abstraction (serial port, in-memory, any `Read + Write`)
//! - [`frame`]: checksums, stream frame decoding and stream sessions
//! - [`device`]: command transceiver and the device command catalog
//!
//! ```no_run
//! use odaq::device::{ChannelConfig, ChannelMode, Daq};
//! use odaq::transport::SerialConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut daq = Daq::open(&SerialConfig::new("/dev/ttyUSB0"))?;
//! daq.create_stream(1, 100)?;
//! daq.conf_channel(&ChannelConfig::new(1, ChannelMode::AnalogInput, 1))?;
//! daq.setup_channel(1, 200, true)?;
//! daq.start()?;
//!
//! let (mut data, mut channels) = (Vec::new(), Vec::new());
//! for _ in 0..20 {
//!     daq.get_stream(&mut data, &mut channels)?;
//! }
//! daq.stop_streaming()?;
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use odaq_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use odaq_frame::*;
}

/// Re-export device types.
pub mod device {
    pub use odaq_device::*;
}
