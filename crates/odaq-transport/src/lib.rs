//! Byte-oriented transport abstraction for openDAQ devices.
//!
//! The wire protocols only need two things from the link: read the next byte
//! (or learn that none arrived within the read timeout) and write a buffer.
//! Everything above this crate is written against the [`Transport`] trait:
//! - [`SerialTransport`] talks to real hardware through `serialport`
//! - [`MemoryTransport`] is a scripted in-memory device for tests and tooling
//! - [`IoTransport`] adapts any `Read + Write` stream

pub mod error;
pub mod io;
pub mod memory;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use io::IoTransport;
pub use memory::MemoryTransport;
pub use serial::{SerialConfig, SerialTransport, DEFAULT_BAUD_RATE};
pub use traits::Transport;
