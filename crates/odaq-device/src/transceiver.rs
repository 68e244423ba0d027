use std::fmt;

use odaq_frame::checksum::{self, CHECKSUM_SIZE};
use odaq_frame::FrameError;
use odaq_transport::Transport;
use tracing::{debug, warn};

use crate::command::Command;
use crate::error::{DeviceError, Result};
use crate::field::{fields_size, FieldKind, Fields, RESPONSE_PREFIX_SIZE};

/// Synchronous command/response exchange over a [`Transport`].
///
/// One call writes one packet and reads one fixed-size response. There are
/// no retries: an exchange either returns its fields or fails with a length
/// or integrity error.
#[derive(Debug)]
pub struct CommandTransceiver<T> {
    inner: T,
}

impl<T: Transport> CommandTransceiver<T> {
    /// Wrap a transport.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Send `command` and decode a response laid out as `layout`.
    ///
    /// The response must be exactly `2 + 2 + fields_size(layout)` bytes:
    /// checksum, command echo, declared length, fields.
    pub fn send(&mut self, command: &Command, layout: &[FieldKind]) -> Result<Fields> {
        let packet = command.packet()?;
        let expected = response_len(layout);

        self.inner.write_all(&packet)?;
        let response = self.inner.read_up_to(expected)?;
        debug!(
            command = command.id(),
            packet = %Hex(&packet),
            response = %Hex(&response),
            "command exchange"
        );

        if response.len() < expected {
            return Err(DeviceError::Length {
                expected,
                actual: response.len(),
            });
        }

        let payload = checksum::verify(&response).map_err(|err| match err {
            FrameError::Integrity { expected, actual } => {
                DeviceError::Integrity { expected, actual }
            }
            other => DeviceError::Frame(other),
        })?;

        let (echo, declared) = (payload[0], usize::from(payload[1]));
        if echo != command.id() {
            warn!(command = command.id(), echo, "response echoes a different command");
        }

        let fields_len = expected - CHECKSUM_SIZE - RESPONSE_PREFIX_SIZE;
        if declared != fields_len {
            return Err(DeviceError::DeclaredLength {
                expected: fields_len,
                declared,
            });
        }

        Ok(Fields::decode(&payload[RESPONSE_PREFIX_SIZE..], layout))
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the transceiver and return the transport.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

/// Wire size of a response with the given field layout.
pub fn response_len(layout: &[FieldKind]) -> usize {
    CHECKSUM_SIZE + RESPONSE_PREFIX_SIZE + fields_size(layout)
}

/// Build a well-formed response, as a device would send it.
pub fn encode_response(echo: u8, fields: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(RESPONSE_PREFIX_SIZE + fields.len());
    payload.push(echo);
    payload.push(fields.len() as u8);
    payload.extend_from_slice(fields);
    checksum::prepend(&payload).to_vec()
}

struct Hex<'a>(&'a [u8]);

impl fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use odaq_transport::MemoryTransport;

    use super::*;
    use crate::command::id;

    fn transceiver_with(response: Vec<u8>) -> CommandTransceiver<MemoryTransport> {
        let mut link = MemoryTransport::new();
        link.queue_response(response);
        CommandTransceiver::new(link)
    }

    #[test]
    fn one_byte_field_round_trip() {
        let mut tx = transceiver_with(encode_response(id::SET_LED, &[1]));
        let fields = tx.send(&Command::new(id::SET_LED).u8(1), &[FieldKind::U8]).unwrap();

        assert_eq!(fields.u8(0).unwrap(), 1);
        assert_eq!(tx.get_ref().written(), &[0x00, 20, 18, 1, 1]);
    }

    #[test]
    fn declared_length_mismatch_is_length_error() {
        // Declared length 2 while the layout expects 1 byte; checksum valid.
        let response = checksum::prepend(&[id::SET_LED, 2, 1]).to_vec();
        let mut tx = transceiver_with(response);

        let err = tx
            .send(&Command::new(id::SET_LED).u8(1), &[FieldKind::U8])
            .unwrap_err();
        assert!(err.is_length_error());
        assert!(matches!(
            err,
            DeviceError::DeclaredLength {
                expected: 1,
                declared: 2
            }
        ));
    }

    #[test]
    fn short_response_is_length_error() {
        let mut response = encode_response(id::READ_ADC, &[0x01, 0x02]);
        response.pop();
        let mut tx = transceiver_with(response);

        let err = tx.send(&Command::new(id::READ_ADC), &[FieldKind::I16]).unwrap_err();
        assert!(matches!(
            err,
            DeviceError::Length {
                expected: 6,
                actual: 5
            }
        ));
    }

    #[test]
    fn silent_device_is_length_error() {
        let mut tx = CommandTransceiver::new(MemoryTransport::new());
        let err = tx.send(&Command::new(id::START), &[]).unwrap_err();
        assert!(matches!(
            err,
            DeviceError::Length {
                expected: 4,
                actual: 0
            }
        ));
    }

    #[test]
    fn corrupted_response_is_integrity_error() {
        let mut response = encode_response(id::READ_ADC, &[0x01, 0x02]);
        response[5] ^= 0x10;
        let mut tx = transceiver_with(response);

        let err = tx.send(&Command::new(id::READ_ADC), &[FieldKind::I16]).unwrap_err();
        assert!(err.is_integrity_error());
    }

    #[test]
    fn extra_bytes_stay_in_transport() {
        let mut response = encode_response(id::GET_ENCODER, &[0x00, 0x10]);
        response.push(0x7E);
        let mut tx = transceiver_with(response);

        let fields = tx.send(&Command::new(id::GET_ENCODER), &[FieldKind::U16]).unwrap();
        assert_eq!(fields.u16(0).unwrap(), 16);
        assert_eq!(tx.get_ref().pending_inbound(), 1);
    }

    #[test]
    fn echo_mismatch_is_tolerated() {
        let mut tx = transceiver_with(encode_response(id::SET_PORT, &[0xAA]));
        let fields = tx.send(&Command::new(id::SET_PORT_DIR).u8(0xAA), &[FieldKind::U8]).unwrap();
        assert_eq!(fields.u8(0).unwrap(), 0xAA);
    }

    #[test]
    fn empty_layout_response() {
        let mut tx = transceiver_with(encode_response(id::STOP, &[]));
        let fields = tx.send(&Command::new(id::STOP), &[]).unwrap();
        assert!(fields.is_empty());
    }

    #[test]
    fn signed_and_wide_fields() {
        let mut tx = transceiver_with(encode_response(id::GET_INFO, &[0x01, 0xFF, 0x00, 0x00, 0x30, 0x39]));
        let fields = tx
            .send(
                &Command::new(id::GET_INFO),
                &[FieldKind::I8, FieldKind::I8, FieldKind::U32],
            )
            .unwrap();
        assert_eq!(fields.i8(0).unwrap(), 1);
        assert_eq!(fields.i8(1).unwrap(), -1);
        assert_eq!(fields.u32(2).unwrap(), 12345);
    }

    #[test]
    fn oversized_command_is_not_written() {
        let mut tx = CommandTransceiver::new(MemoryTransport::new());
        let cmd = (0..300).fold(Command::new(id::SET_PORT), |cmd, _| cmd.u8(1));

        let err = tx.send(&cmd, &[FieldKind::U8]).unwrap_err();
        assert!(matches!(err, DeviceError::InvalidArgument(_)));
        assert_eq!(tx.get_ref().writes(), 0);
        assert!(tx.get_ref().written().is_empty());
    }

    #[test]
    fn hex_dump_format() {
        assert_eq!(Hex(&[0x00, 0x7E, 0xAB]).to_string(), "00 7E AB");
        assert_eq!(Hex(&[]).to_string(), "");
    }
}
