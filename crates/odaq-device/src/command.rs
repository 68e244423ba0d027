use bytes::{BufMut, Bytes, BytesMut};
use odaq_frame::checksum;

use crate::error::{DeviceError, Result};

/// Command identifiers understood by the firmware.
pub mod id {
    pub const READ_ADC: u8 = 1;
    pub const CONF_ADC: u8 = 2;
    pub const SET_PIO: u8 = 3;
    pub const SET_PIO_DIR: u8 = 5;
    pub const SET_PORT: u8 = 7;
    pub const SET_PORT_DIR: u8 = 9;
    pub const INIT_PWM: u8 = 10;
    pub const STOP_PWM: u8 = 11;
    pub const SET_DAC: u8 = 13;
    pub const INIT_CAPTURE: u8 = 14;
    pub const STOP_CAPTURE: u8 = 15;
    pub const GET_CAPTURE: u8 = 16;
    pub const SET_LED: u8 = 18;
    pub const CREATE_STREAM: u8 = 19;
    pub const CREATE_EXTERNAL: u8 = 20;
    pub const CREATE_BURST: u8 = 21;
    pub const CONF_CHANNEL: u8 = 22;
    pub const LOAD_SIGNAL: u8 = 23;
    pub const SETUP_CHANNEL: u8 = 32;
    pub const GET_CALIB: u8 = 36;
    pub const SET_CALIB: u8 = 37;
    pub const GET_INFO: u8 = 39;
    pub const INIT_COUNTER: u8 = 41;
    pub const GET_COUNTER: u8 = 42;
    pub const INIT_ENCODER: u8 = 50;
    pub const STOP_ENCODER: u8 = 51;
    pub const GET_ENCODER: u8 = 52;
    pub const ENABLE_CRC: u8 = 55;
    pub const DESTROY_CHANNEL: u8 = 57;
    pub const START: u8 = 64;
    pub const STOP: u8 = 80;
}

/// A command payload: id, parameter length, parameters.
///
/// Parameters are appended big-endian with the builder methods. The length
/// byte defaults to the parameter byte count; a few commands declare a count
/// of items instead, see [`declared_len`](Self::declared_len).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    id: u8,
    params: BytesMut,
    declared_len: Option<u8>,
}

impl Command {
    /// Start a command with no parameters.
    pub fn new(id: u8) -> Self {
        Self {
            id,
            params: BytesMut::new(),
            declared_len: None,
        }
    }

    pub fn u8(mut self, value: u8) -> Self {
        self.params.put_u8(value);
        self
    }

    pub fn i8(mut self, value: i8) -> Self {
        self.params.put_i8(value);
        self
    }

    pub fn u16(mut self, value: u16) -> Self {
        self.params.put_u16(value);
        self
    }

    pub fn i16(mut self, value: i16) -> Self {
        self.params.put_i16(value);
        self
    }

    /// Override the length byte.
    pub fn declared_len(mut self, len: u8) -> Self {
        self.declared_len = Some(len);
        self
    }

    /// Command id.
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Raw parameter bytes.
    pub fn params(&self) -> &[u8] {
        &self.params
    }

    /// Value of the length byte.
    ///
    /// Fails when no override is set and the parameters do not fit a byte.
    pub fn len_byte(&self) -> Result<u8> {
        match self.declared_len {
            Some(len) => Ok(len),
            None => u8::try_from(self.params.len()).map_err(|_| {
                DeviceError::invalid(format!(
                    "command {} carries {} parameter bytes, at most 255 fit",
                    self.id,
                    self.params.len()
                ))
            }),
        }
    }

    /// `[id, length, params...]`.
    pub fn payload(&self) -> Result<Bytes> {
        let len = self.len_byte()?;
        let mut dst = BytesMut::with_capacity(2 + self.params.len());
        dst.put_u8(self.id);
        dst.put_u8(len);
        dst.put_slice(&self.params);
        Ok(dst.freeze())
    }

    /// Checksum-prefixed packet, ready for the wire.
    pub fn packet(&self) -> Result<Bytes> {
        Ok(checksum::prepend(&self.payload()?))
    }
}
