use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Line rate used by openDAQ firmware.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Serial link configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM3`.
    pub port: String,
    /// Line rate. Default: 115200.
    pub baud_rate: u32,
    /// Per-read timeout. A read that waits longer reports "no byte".
    pub timeout: Duration,
    /// Pause after opening while the board comes out of reset.
    pub settle_delay: Duration,
    /// Level driven on RTS after opening. The board resets while RTS is high.
    pub request_to_send: bool,
}

impl SerialConfig {
    /// Default configuration for `port`.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: Duration::from_millis(100),
            settle_delay: Duration::from_secs(2),
            request_to_send: false,
        }
    }
}

/// Serial port transport.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialTransport {
    /// Open the port described by `config` and wait for the board to settle.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let mut port = serialport::new(config.port.as_str(), config.baud_rate)
            .timeout(config.timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: config.port.clone(),
                source,
            })?;

        port.write_request_to_send(config.request_to_send)?;
        if !config.settle_delay.is_zero() {
            debug!(delay = ?config.settle_delay, "waiting for device to settle");
            std::thread::sleep(config.settle_delay);
        }

        info!(port = %config.port, baud = config.baud_rate, "serial port opened");
        Ok(Self {
            port,
            name: config.port.clone(),
        })
    }

    /// Names of the serial ports visible on this machine.
    pub fn available_ports() -> Result<Vec<String>> {
        let ports = serialport::available_ports()?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }

    /// Change the per-read timeout.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port.set_timeout(timeout).map_err(Into::into)
    }

    /// Device path this transport was opened on.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Transport for SerialTransport {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::TimedOut => return Ok(None),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    fn clear_input(&mut self) -> Result<()> {
        self.port.clear(ClearBuffer::Input)?;
        Ok(())
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port", &self.name)
            .finish()
    }
}
